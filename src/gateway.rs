//! Gateway health test

use reqwest::StatusCode;

use crate::assertions::assert_status;
use crate::common::{ok, Session, TestResult};
use crate::http::ApiRequest;
use crate::readiness::HEALTH_PATH;

pub async fn test_ping(session: &mut Session) -> TestResult {
    println!("=== Test: Gateway Ping ===\n");
    let resp = session.api().send(ApiRequest::get(HEALTH_PATH)).await?;
    assert_status(&resp, StatusCode::OK, "ping")?;
    ok("Gateway answers");
    println!("\n✅ Ping test PASSED\n");
    Ok(())
}
