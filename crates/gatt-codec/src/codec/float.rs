//! IEEE-11073 16-bit medical floating point (SFLOAT).
//!
//! 4-bit signed exponent, 12-bit signed mantissa,
//! value = mantissa * 10^exponent. A handful of exponent-0 codes are
//! reserved for special values.

use crate::error::EncodeError;
use crate::model::{Unit, Value};

const SFLOAT_NAN: u16 = 0x07FF;
const SFLOAT_NRES: u16 = 0x0800;
const SFLOAT_POS_INF: u16 = 0x07FE;
const SFLOAT_NEG_INF: u16 = 0x0802;
const SFLOAT_RESERVED: u16 = 0x0801;

/// Largest mantissa magnitude usable for ordinary SFLOAT values.
const SFLOAT_MANTISSA_MAX: i64 = 2045;

/// A decoded medical float, including its special values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MedFloat {
    Value(f64),
    /// Not a number.
    NaN,
    /// Not at this resolution.
    NRes,
    PositiveInfinity,
    NegativeInfinity,
    /// Reserved for future use.
    Reserved,
}

impl MedFloat {
    /// Numeric view; infinities map to `f64` infinities, other specials to `None`.
    pub fn as_f64(self) -> Option<f64> {
        match self {
            MedFloat::Value(v) => Some(v),
            MedFloat::PositiveInfinity => Some(f64::INFINITY),
            MedFloat::NegativeInfinity => Some(f64::NEG_INFINITY),
            MedFloat::NaN | MedFloat::NRes | MedFloat::Reserved => None,
        }
    }

    /// Converts into a [`Value`].
    ///
    /// Numbers become `Float` values in `unit`; NaN, NRes and the reserved
    /// code become `Enum` values labelled with their meaning and carrying the
    /// raw SFLOAT code.
    pub fn into_value(self, unit: Unit) -> Value {
        match self {
            MedFloat::NaN => Value::label(SFLOAT_NAN, "NaN"),
            MedFloat::NRes => Value::label(SFLOAT_NRES, "NRes"),
            MedFloat::Reserved => Value::label(SFLOAT_RESERVED, "reserved"),
            other => Value::float(other.as_f64().unwrap_or(f64::NAN), unit),
        }
    }

    /// Inverse of [`into_value`](Self::into_value).
    pub fn from_value(value: &Value) -> Option<MedFloat> {
        match value {
            Value::Float { value, .. } if *value == f64::INFINITY => Some(MedFloat::PositiveInfinity),
            Value::Float { value, .. } if *value == f64::NEG_INFINITY => {
                Some(MedFloat::NegativeInfinity)
            }
            Value::Float { value, .. } if value.is_nan() => Some(MedFloat::NaN),
            Value::Float { value, .. } => Some(MedFloat::Value(*value)),
            Value::Unsigned { value, .. } => Some(MedFloat::Value(*value as f64)),
            Value::Signed { value, .. } => Some(MedFloat::Value(*value as f64)),
            Value::Enum { code, .. } => match *code {
                SFLOAT_NAN => Some(MedFloat::NaN),
                SFLOAT_NRES => Some(MedFloat::NRes),
                SFLOAT_RESERVED => Some(MedFloat::Reserved),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Computes mantissa * 10^exponent with a single rounding step.
fn scale(mantissa: i64, exponent: i32) -> f64 {
    if exponent >= 0 {
        mantissa as f64 * 10f64.powi(exponent)
    } else {
        mantissa as f64 / 10f64.powi(-exponent)
    }
}

/// Finds the smallest exponent whose rounded mantissa fits `max_mantissa`.
fn quantize(
    value: f64,
    exponents: std::ops::RangeInclusive<i32>,
    max_mantissa: i64,
    field: &'static str,
) -> Result<(i64, i32), EncodeError> {
    for exponent in exponents.clone() {
        let scaled = if exponent >= 0 {
            value / 10f64.powi(exponent)
        } else {
            value * 10f64.powi(-exponent)
        };
        let mantissa = scaled.round();
        if mantissa.abs() <= max_mantissa as f64 {
            return Ok((mantissa as i64, exponent));
        }
    }
    let max = max_mantissa as f64 * 10f64.powi(*exponents.end());
    Err(EncodeError::ValueOutOfRange {
        field,
        value,
        min: -max,
        max,
    })
}

/// Decodes a raw SFLOAT.
pub fn sfloat_from_raw(raw: u16) -> MedFloat {
    match raw {
        SFLOAT_NAN => MedFloat::NaN,
        SFLOAT_NRES => MedFloat::NRes,
        SFLOAT_POS_INF => MedFloat::PositiveInfinity,
        SFLOAT_NEG_INF => MedFloat::NegativeInfinity,
        SFLOAT_RESERVED => MedFloat::Reserved,
        _ => {
            // Sign-extend the 4-bit exponent and 12-bit mantissa
            let exponent = ((raw as i16) >> 12) as i32;
            let mantissa = (((raw << 4) as i16) >> 4) as i64;
            MedFloat::Value(scale(mantissa, exponent))
        }
    }
}

/// Encodes an SFLOAT, choosing the most precise exponent that fits.
///
/// Lossy: values are rounded to a 12-bit mantissa.
pub fn sfloat_to_raw(value: MedFloat, field: &'static str) -> Result<u16, EncodeError> {
    match value {
        MedFloat::NaN => Ok(SFLOAT_NAN),
        MedFloat::NRes => Ok(SFLOAT_NRES),
        MedFloat::PositiveInfinity => Ok(SFLOAT_POS_INF),
        MedFloat::NegativeInfinity => Ok(SFLOAT_NEG_INF),
        MedFloat::Reserved => Ok(SFLOAT_RESERVED),
        MedFloat::Value(v) if v.is_nan() => Ok(SFLOAT_NAN),
        MedFloat::Value(v) if v == f64::INFINITY => Ok(SFLOAT_POS_INF),
        MedFloat::Value(v) if v == f64::NEG_INFINITY => Ok(SFLOAT_NEG_INF),
        MedFloat::Value(v) => {
            let (mantissa, exponent) = quantize(v, -8..=7, SFLOAT_MANTISSA_MAX, field)?;
            Ok((((exponent as u16) & 0x0F) << 12) | ((mantissa as u16) & 0x0FFF))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sfloat_decode_known_values() {
        // mantissa 114, exponent -1 => 11.4
        assert_eq!(sfloat_from_raw(0xF072), MedFloat::Value(11.4));
        // mantissa -1, exponent 0 => -1
        assert_eq!(sfloat_from_raw(0x0FFF), MedFloat::Value(-1.0));
        // mantissa 5, exponent 2 => 500
        assert_eq!(sfloat_from_raw(0x2005), MedFloat::Value(500.0));
    }

    #[test]
    fn test_sfloat_specials() {
        assert_eq!(sfloat_from_raw(0x07FF), MedFloat::NaN);
        assert_eq!(sfloat_from_raw(0x0800), MedFloat::NRes);
        assert_eq!(sfloat_from_raw(0x07FE), MedFloat::PositiveInfinity);
        assert_eq!(sfloat_from_raw(0x0802), MedFloat::NegativeInfinity);
        assert_eq!(sfloat_from_raw(0x0801), MedFloat::Reserved);
        for special in [0x07FFu16, 0x0800, 0x07FE, 0x0802, 0x0801] {
            assert_eq!(sfloat_to_raw(sfloat_from_raw(special), "x").unwrap(), special);
        }
    }

    #[test]
    fn test_sfloat_value_roundtrip() {
        for v in [0.0, 1.0, -1.0, 11.4, 0.00012, 123.0, -2.5, 2045.0, 0.05] {
            let raw = sfloat_to_raw(MedFloat::Value(v), "x").unwrap();
            assert_eq!(sfloat_from_raw(raw), MedFloat::Value(v), "failed for {}", v);
        }
    }

    #[test]
    fn test_sfloat_is_lossy() {
        let raw = sfloat_to_raw(MedFloat::Value(123.456), "x").unwrap();
        assert_eq!(sfloat_from_raw(raw), MedFloat::Value(123.5));
    }

    #[test]
    fn test_sfloat_out_of_range() {
        assert!(matches!(
            sfloat_to_raw(MedFloat::Value(1e12), "x"),
            Err(EncodeError::ValueOutOfRange { field: "x", .. })
        ));
    }

    #[test]
    fn test_value_conversion() {
        let v = MedFloat::Value(5.5).into_value(Unit::Kilogram);
        assert_eq!(v, Value::float(5.5, Unit::Kilogram));
        assert_eq!(MedFloat::from_value(&v), Some(MedFloat::Value(5.5)));

        let nan = MedFloat::NaN.into_value(Unit::Kilogram);
        assert_eq!(nan.as_str(), Some("NaN"));
        assert_eq!(MedFloat::from_value(&nan), Some(MedFloat::NaN));

        let inf = MedFloat::PositiveInfinity.into_value(Unit::Kilogram);
        assert_eq!(MedFloat::from_value(&inf), Some(MedFloat::PositiveInfinity));
        assert_eq!(MedFloat::from_value(&Value::Bool(true)), None);
    }
}
