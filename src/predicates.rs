//! Message matchers
//!
//! A predicate is any `Fn(&EventMessage) -> Result<bool, PredicateError>`.
//! The helpers here prefer exact, field-level comparisons over substring
//! search: a short identifier such as `"12"` must not match inside `"112"`
//! or inside a timestamp.

use serde_json::Value;

use crate::error::PredicateError;
use crate::stream::EventMessage;

/// Capability to decide whether one message is the expected event
pub trait MessagePredicate {
    fn matches(&self, message: &EventMessage) -> Result<bool, PredicateError>;
}

impl<F> MessagePredicate for F
where
    F: Fn(&EventMessage) -> Result<bool, PredicateError>,
{
    fn matches(&self, message: &EventMessage) -> Result<bool, PredicateError> {
        self(message)
    }
}

/// Boxed predicate, for building lists of matchers at runtime
pub type BoxedPredicate =
    Box<dyn Fn(&EventMessage) -> Result<bool, PredicateError> + Send + Sync>;

/// Top-level JSON field `name` is a string or number equal to `expected`
pub fn field_equals(
    name: impl Into<String>,
    expected: impl Into<String>,
) -> impl Fn(&EventMessage) -> Result<bool, PredicateError> {
    let name = name.into();
    let expected = expected.into();
    move |msg| {
        let doc = msg.value_json()?;
        Ok(doc.get(&name).map_or(false, |v| scalar_eq(v, &expected)))
    }
}

/// Some scalar anywhere in the JSON document equals `expected` exactly
///
/// Used when the field name of an event schema is not pinned down.
pub fn has_value(
    expected: impl Into<String>,
) -> impl Fn(&EventMessage) -> Result<bool, PredicateError> {
    let expected = expected.into();
    move |msg| {
        let doc = msg.value_json()?;
        Ok(contains_scalar(&doc, &expected))
    }
}

/// Raw value contains `needle` as a substring
pub fn value_contains(
    needle: impl Into<String>,
) -> impl Fn(&EventMessage) -> Result<bool, PredicateError> {
    let needle = needle.into();
    move |msg| Ok(msg.value.contains(&needle))
}

/// Message key equals `expected`
pub fn key_equals(
    expected: impl Into<String>,
) -> impl Fn(&EventMessage) -> Result<bool, PredicateError> {
    let expected = expected.into();
    move |msg| Ok(msg.key.as_deref() == Some(expected.as_str()))
}

/// Every predicate matches; stops at the first miss or error
pub fn all_of(
    predicates: Vec<BoxedPredicate>,
) -> impl Fn(&EventMessage) -> Result<bool, PredicateError> {
    move |msg| {
        for p in &predicates {
            if !p(msg)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Box a predicate for use with [`all_of`]
pub fn boxed<P>(predicate: P) -> BoxedPredicate
where
    P: Fn(&EventMessage) -> Result<bool, PredicateError> + Send + Sync + 'static,
{
    Box::new(predicate)
}

fn scalar_eq(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Number(n) => n.to_string() == expected,
        _ => false,
    }
}

fn contains_scalar(value: &Value, expected: &str) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|v| contains_scalar(v, expected)),
        Value::Object(map) => map.values().any(|v| contains_scalar(v, expected)),
        other => scalar_eq(other, expected),
    }
}
