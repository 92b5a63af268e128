//! User event tests

use crate::assertions::assert_event;
use crate::common::{blocking, ok, step, Session, TestResult};
use crate::fixtures::{new_identity, register};
use crate::predicates::field_equals;
use crate::stream::USER_REGISTRATIONS;

/// Signup publishes a registration event carrying the new user's id
pub async fn test_user_registration_emits_event(session: &mut Session) -> TestResult {
    println!("=== Test: Registration Event ===\n");
    let mut lease = session.lease_cursor()?;
    let api = lease.api();

    step("Registering user");
    let user = register(api, new_identity()).await?;
    ok(&format!("User id={}", user.id));

    step(&format!("Waiting for '{}'", USER_REGISTRATIONS));
    let options = lease.options();
    blocking(|| {
        assert_event(
            &mut *lease,
            USER_REGISTRATIONS,
            field_equals("user_id", user.id.as_str()),
            options,
            &format!("user_id == {}", user.id),
        )
    })?;
    ok("Registration event confirmed");

    println!("\n✅ Registration event test PASSED\n");
    Ok(())
}
