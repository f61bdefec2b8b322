//! Value validation against a record's declared type.
//!
//! Structural validation happens inside each codec while it parses bytes.
//! The checks here apply to the [`Value`] on either side of a codec call:
//! the engine runs them on every decoded value and on every value handed to
//! the encoder (unless the caller opts out).

use crate::error::ValidationError;
use crate::model::{RecordContext, RecordDescriptor, Value, ValueType};

/// Validates that `value` has the `expected` type and obeys value-level rules.
///
/// Value-level rules (see [`Value::validate`]):
/// - Floats are never NaN
/// - Date/time fields are in calendar range
/// - List elements share one type
pub fn validate_value(value: &Value, expected: ValueType) -> Result<(), ValidationError> {
    let actual = value.value_type();
    if actual != expected {
        return Err(ValidationError::TypeMismatch { expected, actual });
    }
    match value.validate() {
        Some(reason) => Err(ValidationError::InvalidValue { reason }),
        None => Ok(()),
    }
}

/// Validates a value against the type its descriptor declares.
pub fn validate_for(descriptor: &RecordDescriptor, value: &Value) -> Result<(), ValidationError> {
    validate_value(value, descriptor.expected_type())
}

/// Checks that every successful sibling in `ctx` carries a valid value.
///
/// Contexts built by the engine always pass. Callers assembling a context by
/// hand (see [`RecordContext::from_results`]) can use this before threading
/// it into a single-record decode.
pub fn validate_context(ctx: &RecordContext<'_>) -> Result<(), ValidationError> {
    for result in ctx.iter() {
        let (Some(value), Some(expected)) = (result.value(), result.expected_type()) else {
            continue;
        };
        validate_value(value, expected)?;
    }
    Ok(())
}
