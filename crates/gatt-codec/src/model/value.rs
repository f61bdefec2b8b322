//! Typed, unit-aware record values.
//!
//! Every codec turns raw bytes into a [`Value`] and back. Scalar values
//! carry an optional [`Unit`]; structured records are [`Value::Fields`].

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::util::datetime::{
    format_datetime_iso8601, parse_datetime_iso8601, validate_datetime, DateTimeParseError,
};

/// Type tag of a [`Value`], used by descriptors to declare what they produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Unsigned,
    Signed,
    Float,
    Text,
    Bytes,
    Enum,
    DateTime,
    List,
    Fields,
}

/// Units of measurement used by record values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Unitless,
    Percentage,
    DegreeCelsius,
    Pascal,
    Second,
    Minute,
    Joule,
    Kilogram,
    Litre,
    BeatsPerMinute,
    KilogramPerLitre,
    MolePerLitre,
}

impl Unit {
    /// Returns the SIG-assigned unit UUID (16-bit form), where one exists.
    pub fn sig_id(self) -> Option<u16> {
        match self {
            Unit::Unitless => Some(0x2700),
            Unit::Kilogram => Some(0x2702),
            Unit::Second => Some(0x2703),
            Unit::Pascal => Some(0x2724),
            Unit::Joule => Some(0x2725),
            Unit::DegreeCelsius => Some(0x272F),
            Unit::Minute => Some(0x2760),
            Unit::Litre => Some(0x2767),
            Unit::BeatsPerMinute => Some(0x27A7),
            Unit::Percentage => Some(0x27AD),
            Unit::KilogramPerLitre | Unit::MolePerLitre => None,
        }
    }

    /// Returns the display symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Unitless => "",
            Unit::Percentage => "%",
            Unit::DegreeCelsius => "°C",
            Unit::Pascal => "Pa",
            Unit::Second => "s",
            Unit::Minute => "min",
            Unit::Joule => "J",
            Unit::Kilogram => "kg",
            Unit::Litre => "L",
            Unit::BeatsPerMinute => "bpm",
            Unit::KilogramPerLitre => "kg/L",
            Unit::MolePerLitre => "mol/L",
        }
    }
}

/// Calendar date and wall-clock time (GATT Date Time layout).
///
/// Zero in `year`, `month` or `day` means "not known", as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateTime {
    /// 1582..=9999, or 0 if unknown.
    pub year: u16,
    /// 1..=12, or 0 if unknown.
    pub month: u8,
    /// 1..=31, or 0 if unknown.
    pub day: u8,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl DateTime {
    pub fn new(year: u16, month: u8, day: u8, hours: u8, minutes: u8, seconds: u8) -> Self {
        Self {
            year,
            month,
            day,
            hours,
            minutes,
            seconds,
        }
    }

    /// Returns true if year, month and day are all known.
    pub fn is_date_known(&self) -> bool {
        self.year != 0 && self.month != 0 && self.day != 0
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_datetime_iso8601(self))
    }
}

impl FromStr for DateTime {
    type Err = DateTimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_datetime_iso8601(s)
    }
}

/// A named member of a structured value.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: Cow<'static, str>,
    pub value: Value,
}

impl Field {
    pub fn new(name: impl Into<Cow<'static, str>>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A decoded record value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),

    /// Unsigned integer with optional unit.
    Unsigned { value: u64, unit: Option<Unit> },

    /// Signed integer with optional unit.
    Signed { value: i64, unit: Option<Unit> },

    /// Floating point quantity with optional unit (NaN not allowed).
    Float { value: f64, unit: Option<Unit> },

    /// UTF-8 text.
    Text(String),

    /// Opaque bytes.
    Bytes(Vec<u8>),

    /// An enumerated code and its label.
    Enum {
        code: u16,
        label: Cow<'static, str>,
    },

    DateTime(DateTime),

    /// Homogeneous sequence (e.g. RR intervals).
    List(Vec<Value>),

    /// Structured record, fields in wire order.
    Fields(Vec<Field>),
}

impl Value {
    /// Unsigned value with a unit.
    pub fn unsigned(value: u64, unit: Unit) -> Self {
        Value::Unsigned {
            value,
            unit: Some(unit),
        }
    }

    /// Signed value with a unit.
    pub fn signed(value: i64, unit: Unit) -> Self {
        Value::Signed {
            value,
            unit: Some(unit),
        }
    }

    /// Float value with a unit.
    pub fn float(value: f64, unit: Unit) -> Self {
        Value::Float {
            value,
            unit: Some(unit),
        }
    }

    /// Enumerated value with a static label.
    pub fn label(code: u16, label: &'static str) -> Self {
        Value::Enum {
            code,
            label: Cow::Borrowed(label),
        }
    }

    /// Returns the type tag of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Unsigned { .. } => ValueType::Unsigned,
            Value::Signed { .. } => ValueType::Signed,
            Value::Float { .. } => ValueType::Float,
            Value::Text(_) => ValueType::Text,
            Value::Bytes(_) => ValueType::Bytes,
            Value::Enum { .. } => ValueType::Enum,
            Value::DateTime(_) => ValueType::DateTime,
            Value::List(_) => ValueType::List,
            Value::Fields(_) => ValueType::Fields,
        }
    }

    /// Returns the unit of a scalar value.
    pub fn unit(&self) -> Option<Unit> {
        match self {
            Value::Unsigned { unit, .. } | Value::Signed { unit, .. } | Value::Float { unit, .. } => {
                *unit
            }
            _ => None,
        }
    }

    /// Looks up a field of a structured value by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Fields(fields) => fields.iter().find(|f| f.name == name).map(|f| &f.value),
            _ => None,
        }
    }

    /// Numeric view of a scalar value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Unsigned { value, .. } => Some(*value as f64),
            Value::Signed { value, .. } => Some(*value as f64),
            Value::Float { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Unsigned { value, .. } => Some(*value),
            Value::Signed { value, .. } => u64::try_from(*value).ok(),
            Value::Enum { code, .. } => Some(*code as u64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Signed { value, .. } => Some(*value),
            Value::Unsigned { value, .. } => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            Value::Enum { label, .. } => Some(label.as_ref()),
            _ => None,
        }
    }

    /// Validates value-level rules, recursing into lists and fields.
    ///
    /// Returns an error description if invalid, None if valid.
    pub fn validate(&self) -> Option<&'static str> {
        match self {
            Value::Float { value, .. } => {
                if value.is_nan() {
                    return Some("NaN is not allowed in Float");
                }
            }
            Value::DateTime(dt) => {
                if let Err(msg) = validate_datetime(dt) {
                    return Some(msg);
                }
            }
            Value::List(items) => {
                if let Some(first) = items.first() {
                    let ty = first.value_type();
                    if items.iter().any(|v| v.value_type() != ty) {
                        return Some("List elements must share one type");
                    }
                }
                return items.iter().find_map(Value::validate);
            }
            Value::Fields(fields) => {
                return fields.iter().find_map(|f| f.value.validate());
            }
            _ => {}
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_types() {
        assert_eq!(Value::Bool(true).value_type(), ValueType::Bool);
        assert_eq!(Value::unsigned(5, Unit::Percentage).value_type(), ValueType::Unsigned);
        assert_eq!(Value::label(1, "Chest").value_type(), ValueType::Enum);
        assert_eq!(Value::Fields(vec![]).value_type(), ValueType::Fields);
    }

    #[test]
    fn test_field_lookup() {
        let value = Value::Fields(vec![
            Field::new("heart_rate", Value::unsigned(72, Unit::BeatsPerMinute)),
            Field::new("sensor_contact", Value::Bool(true)),
        ]);
        assert_eq!(value.field("heart_rate").and_then(Value::as_u64), Some(72));
        assert_eq!(value.field("sensor_contact").and_then(Value::as_bool), Some(true));
        assert!(value.field("missing").is_none());
        assert!(Value::Bool(true).field("heart_rate").is_none());
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::signed(-5, Unit::Minute).as_u64(), None);
        assert_eq!(Value::signed(-5, Unit::Minute).as_i64(), Some(-5));
        assert_eq!(Value::unsigned(u64::MAX, Unit::Unitless).as_i64(), None);
        assert_eq!(Value::float(2.5, Unit::Second).as_f64(), Some(2.5));
        assert_eq!(Value::float(2.5, Unit::Second).unit(), Some(Unit::Second));
    }

    #[test]
    fn test_value_validation_nan() {
        assert!(Value::float(f64::NAN, Unit::Unitless).validate().is_some());
        assert!(Value::float(f64::INFINITY, Unit::Unitless).validate().is_none());
        let nested = Value::Fields(vec![Field::new(
            "x",
            Value::List(vec![Value::float(f64::NAN, Unit::Second)]),
        )]);
        assert!(nested.validate().is_some());
    }

    #[test]
    fn test_list_must_be_homogeneous() {
        let mixed = Value::List(vec![Value::Bool(true), Value::Text("x".into())]);
        assert!(mixed.validate().is_some());
        let same = Value::List(vec![Value::Bool(true), Value::Bool(false)]);
        assert!(same.validate().is_none());
    }

    #[test]
    fn test_datetime_validation() {
        assert!(Value::DateTime(DateTime::new(2024, 2, 29, 12, 0, 0)).validate().is_none());
        assert!(Value::DateTime(DateTime::new(2023, 2, 29, 12, 0, 0)).validate().is_some());
        assert!(Value::DateTime(DateTime::new(2024, 1, 1, 24, 0, 0)).validate().is_some());
        assert!(Value::DateTime(DateTime::new(0, 0, 0, 0, 0, 0)).validate().is_none());
    }

    #[test]
    fn test_datetime_text_form() {
        let dt: DateTime = "2024-03-01T08:30:00".parse().unwrap();
        assert_eq!(dt, DateTime::new(2024, 3, 1, 8, 30, 0));
        assert_eq!(dt.to_string(), "2024-03-01T08:30:00");
        assert!("2024-02-30T00:00:00".parse::<DateTime>().is_err());
    }

    #[test]
    fn test_unit_ids() {
        assert_eq!(Unit::Percentage.sig_id(), Some(0x27AD));
        assert_eq!(Unit::DegreeCelsius.symbol(), "°C");
        assert_eq!(Unit::MolePerLitre.sig_id(), None);
    }
}
