//! Reference codecs for a handful of standard records.
//!
//! Each record is a unit type implementing [`KnownRecord`](crate::model::KnownRecord) and
//! [`RecordCodec`](crate::model::RecordCodec), with a `descriptor()`
//! constructor. [`standard_descriptors`] collects them all; it backs
//! [`Registry::with_standard_records`](crate::Registry::with_standard_records).
//!
//! | Id | Record | Dependencies |
//! |---|---|---|
//! | 0x2A19 | [`BatteryLevel`] | |
//! | 0x2A6E | [`Temperature`] | |
//! | 0x2A6F | [`Humidity`] | |
//! | 0x2A6D | [`Pressure`] | |
//! | 0x2A38 | [`BodySensorLocation`] | |
//! | 0x2A37 | [`HeartRateMeasurement`] | optional: [`BodySensorLocation`] |
//! | 0x2A18 | [`GlucoseMeasurement`] | |
//! | 0x2A34 | [`GlucoseMeasurementContext`] | required: [`GlucoseMeasurement`] |

mod battery;
mod environmental;
mod glucose;
mod heart_rate;

pub use battery::BatteryLevel;
pub use environmental::{Humidity, Pressure, Temperature};
pub use glucose::{GlucoseMeasurement, GlucoseMeasurementContext};
pub use heart_rate::{BodySensorLocation, HeartRateMeasurement};

use crate::error::EncodeError;
use crate::model::{RecordDescriptor, Value, ValueType};

/// Descriptors for every record in this module, in table order.
pub fn standard_descriptors() -> Vec<RecordDescriptor> {
    vec![
        BatteryLevel::descriptor(),
        Temperature::descriptor(),
        Humidity::descriptor(),
        Pressure::descriptor(),
        BodySensorLocation::descriptor(),
        HeartRateMeasurement::descriptor(),
        GlucoseMeasurement::descriptor(),
        GlucoseMeasurementContext::descriptor(),
    ]
}

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Looks `code` up in a label table; unknown codes are labelled "reserved".
fn labelled(code: u16, labels: &[(u16, &'static str)]) -> Value {
    let label = labels
        .iter()
        .find(|(c, _)| *c == code)
        .map_or("reserved", |(_, label)| *label);
    Value::label(code, label)
}

fn unsupported(field: &'static str, expected: ValueType, actual: &Value) -> EncodeError {
    EncodeError::UnsupportedValue {
        field,
        expected,
        actual: actual.value_type(),
    }
}

/// Returns the named member of a structured value.
fn field<'a>(value: &'a Value, name: &'static str) -> Result<&'a Value, EncodeError> {
    match value {
        Value::Fields(_) => value.field(name).ok_or(EncodeError::MissingField { field: name }),
        other => Err(unsupported(name, ValueType::Fields, other)),
    }
}

fn unsigned(value: &Value, field: &'static str, max: u64) -> Result<u64, EncodeError> {
    match value {
        Value::Unsigned { value, .. } if *value <= max => Ok(*value),
        Value::Unsigned { value, .. } => Err(EncodeError::ValueOutOfRange {
            field,
            value: *value as f64,
            min: 0.0,
            max: max as f64,
        }),
        other => Err(unsupported(field, ValueType::Unsigned, other)),
    }
}

fn signed(value: &Value, field: &'static str, min: i64, max: i64) -> Result<i64, EncodeError> {
    match value {
        Value::Signed { value, .. } if (min..=max).contains(value) => Ok(*value),
        Value::Signed { value, .. } => Err(EncodeError::ValueOutOfRange {
            field,
            value: *value as f64,
            min: min as f64,
            max: max as f64,
        }),
        other => Err(unsupported(field, ValueType::Signed, other)),
    }
}

fn enum_code(value: &Value, field: &'static str, max: u16) -> Result<u16, EncodeError> {
    match value {
        Value::Enum { code, .. } if *code <= max => Ok(*code),
        Value::Enum { code, .. } => Err(EncodeError::ValueOutOfRange {
            field,
            value: *code as f64,
            min: 0.0,
            max: max as f64,
        }),
        other => Err(unsupported(field, ValueType::Enum, other)),
    }
}

fn boolean(value: &Value, field: &'static str) -> Result<bool, EncodeError> {
    value
        .as_bool()
        .ok_or_else(|| unsupported(field, ValueType::Bool, value))
}

/// Converts a float quantity to its fixed-point wire integer.
///
/// `steps` is the number of wire steps per unit (100 for hundredths); the
/// matching decode is `raw as f64 / steps`. Lossy: the result is rounded to
/// the nearest step.
fn fixed_point(
    value: &Value,
    field: &'static str,
    steps: f64,
    min_raw: i64,
    max_raw: i64,
) -> Result<i64, EncodeError> {
    let v = match value {
        Value::Float { value, .. } => *value,
        other => return Err(unsupported(field, ValueType::Float, other)),
    };
    if v.is_nan() {
        return Err(EncodeError::FloatIsNan { field });
    }
    let raw = (v * steps).round();
    if raw < min_raw as f64 || raw > max_raw as f64 {
        return Err(EncodeError::ValueOutOfRange {
            field,
            value: v,
            min: min_raw as f64 / steps,
            max: max_raw as f64 / steps,
        });
    }
    Ok(raw as i64)
}
