//! Glucose measurement and its context record.
//!
//! A context record carries the sequence number of the measurement it
//! belongs to, so it can only be decoded next to that measurement.

use crate::codec::{MedFloat, Reader, Writer};
use crate::error::{DecodeError, EncodeError};
use crate::model::{
    DescriptorBuilder, FieldsBuilder, KnownRecord, RecordCodec, RecordContext, RecordDescriptor,
    RecordId, Unit, Value, ValueType,
};
use crate::util::add_minutes;

use super::{boolean, enum_code, field, labelled, signed, unsigned, unsupported};

// =============================================================================
// GLUCOSE MEASUREMENT
// =============================================================================

/// Glucose Measurement (0x2A18).
///
/// | Field | Type | Present |
/// |---|---|---|
/// | `sequence_number` | Unsigned | always |
/// | `base_time` | DateTime | always |
/// | `time_offset` | Signed, min | flag bit 0 |
/// | `measurement_time` | DateTime | flag bit 0, when the base date is known |
/// | `concentration` | Float kg/L or mol/L, or Enum for NaN/NRes | flag bit 1 |
/// | `type` | Enum | flag bit 1 |
/// | `sample_location` | Enum | flag bit 1 |
/// | `sensor_status` | Unsigned | flag bit 3 |
/// | `context_follows` | Bool | always |
///
/// `measurement_time` is derived and ignored when encoding. A special
/// concentration (NaN, NRes) carries no unit and is encoded as kg/L.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlucoseMeasurement;

impl KnownRecord for GlucoseMeasurement {
    const ID: RecordId = RecordId::from_u16(0x2A18);
    const NAME: &'static str = "Glucose Measurement";
}

const GM_TIME_OFFSET: u8 = 0x01;
const GM_CONCENTRATION: u8 = 0x02;
const GM_MOL_PER_LITRE: u8 = 0x04;
const GM_SENSOR_STATUS: u8 = 0x08;
const GM_CONTEXT_FOLLOWS: u8 = 0x10;
const GM_RESERVED: u8 = 0xE0;

const SAMPLE_TYPES: &[(u16, &str)] = &[
    (1, "Capillary Whole blood"),
    (2, "Capillary Plasma"),
    (3, "Venous Whole blood"),
    (4, "Venous Plasma"),
    (5, "Arterial Whole blood"),
    (6, "Arterial Plasma"),
    (7, "Undetermined Whole blood"),
    (8, "Undetermined Plasma"),
    (9, "Interstitial Fluid (ISF)"),
    (10, "Control Solution"),
];

const SAMPLE_LOCATIONS: &[(u16, &str)] = &[
    (1, "Finger"),
    (2, "Alternate Site Test (AST)"),
    (3, "Earlobe"),
    (4, "Control solution"),
    (15, "Sample Location value not available"),
];

impl GlucoseMeasurement {
    pub fn descriptor() -> RecordDescriptor {
        DescriptorBuilder::for_record::<Self>()
            .min_length(10)
            .max_length(17)
            .expects(ValueType::Fields)
            .codec(Self)
            .build()
    }
}

impl RecordCodec for GlucoseMeasurement {
    fn decode(&self, data: &[u8], _ctx: &RecordContext<'_>) -> Result<Value, DecodeError> {
        let mut reader = Reader::new(data);
        let flags = reader.read_u8("flags")?;
        if flags & GM_RESERVED != 0 {
            return Err(DecodeError::ReservedBitsSet { context: "glucose measurement flags" });
        }

        let sequence = reader.read_u16("sequence number")?;
        let base_time = reader.read_datetime("base time")?;
        let mut fields = FieldsBuilder::new()
            .field("sequence_number", Value::Unsigned { value: sequence as u64, unit: None })
            .field("base_time", Value::DateTime(base_time));

        if flags & GM_TIME_OFFSET != 0 {
            let offset = reader.read_i16("time offset")? as i64;
            fields.push("time_offset", Value::signed(offset, Unit::Minute));
            if let Some(at) = add_minutes(&base_time, offset) {
                fields.push("measurement_time", Value::DateTime(at));
            }
        }

        if flags & GM_CONCENTRATION != 0 {
            let unit = if flags & GM_MOL_PER_LITRE != 0 {
                Unit::MolePerLitre
            } else {
                Unit::KilogramPerLitre
            };
            let concentration = read_amount(&mut reader, "glucose concentration")?;
            let nibbles = reader.read_u8("type and sample location")?;
            fields.push("concentration", concentration.into_value(unit));
            fields.push("type", labelled((nibbles & 0x0F) as u16, SAMPLE_TYPES));
            fields.push("sample_location", labelled((nibbles >> 4) as u16, SAMPLE_LOCATIONS));
        }

        if flags & GM_SENSOR_STATUS != 0 {
            let status = reader.read_u16("sensor status annunciation")?;
            fields.push("sensor_status", Value::Unsigned { value: status as u64, unit: None });
        }
        reader.finish()?;

        fields.push("context_follows", Value::Bool(flags & GM_CONTEXT_FOLLOWS != 0));
        Ok(fields.build())
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        let sequence = unsigned(field(value, "sequence_number")?, "sequence_number", u16::MAX as u64)?;
        let base_time = match field(value, "base_time")? {
            Value::DateTime(dt) => *dt,
            other => return Err(unsupported("base_time", ValueType::DateTime, other)),
        };

        let mut flags = 0u8;
        let mut writer = Writer::with_capacity(17);
        writer.write_u8(0);
        writer.write_u16(sequence as u16);
        writer.write_datetime(&base_time);

        if let Some(offset) = value.field("time_offset") {
            let offset = signed(offset, "time_offset", i16::MIN as i64, i16::MAX as i64)?;
            flags |= GM_TIME_OFFSET;
            writer.write_i16(offset as i16);
        }

        if let Some(concentration) = value.field("concentration") {
            let (medfloat, unit) = sfloat_field(
                concentration,
                "concentration",
                &[Unit::KilogramPerLitre, Unit::MolePerLitre],
            )?;
            if unit == Some(Unit::MolePerLitre) {
                flags |= GM_MOL_PER_LITRE;
            }
            let sample_type = enum_code(field(value, "type")?, "type", 0x0F)?;
            let location = enum_code(field(value, "sample_location")?, "sample_location", 0x0F)?;
            flags |= GM_CONCENTRATION;
            writer.write_sfloat(medfloat, "concentration")?;
            writer.write_u8((sample_type as u8) | ((location as u8) << 4));
        }

        if let Some(status) = value.field("sensor_status") {
            let status = unsigned(status, "sensor_status", u16::MAX as u64)?;
            flags |= GM_SENSOR_STATUS;
            writer.write_u16(status as u16);
        }

        if let Some(follows) = value.field("context_follows") {
            if boolean(follows, "context_follows")? {
                flags |= GM_CONTEXT_FOLLOWS;
            }
        }

        writer.set_byte(0, flags);
        Ok(writer.into_bytes())
    }
}

// =============================================================================
// GLUCOSE MEASUREMENT CONTEXT
// =============================================================================

/// Glucose Measurement Context (0x2A34).
///
/// Requires the [`GlucoseMeasurement`] of the same batch and fails with
/// [`DecodeError::DependencyMismatch`] if the sequence numbers differ.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlucoseMeasurementContext;

impl KnownRecord for GlucoseMeasurementContext {
    const ID: RecordId = RecordId::from_u16(0x2A34);
    const NAME: &'static str = "Glucose Measurement Context";
}

const GC_CARBOHYDRATE: u8 = 0x01;
const GC_MEAL: u8 = 0x02;
const GC_TESTER_HEALTH: u8 = 0x04;
const GC_EXERCISE: u8 = 0x08;
const GC_MEDICATION: u8 = 0x10;
const GC_MEDICATION_LITRES: u8 = 0x20;
const GC_HBA1C: u8 = 0x40;
const GC_EXTENDED_FLAGS: u8 = 0x80;

const CARBOHYDRATES: &[(u16, &str)] = &[
    (1, "Breakfast"),
    (2, "Lunch"),
    (3, "Dinner"),
    (4, "Snack"),
    (5, "Drink"),
    (6, "Supper"),
    (7, "Brunch"),
];

const MEALS: &[(u16, &str)] = &[
    (1, "Preprandial (before meal)"),
    (2, "Postprandial (after meal)"),
    (3, "Fasting"),
    (4, "Casual (snacks, drinks, etc.)"),
    (5, "Bedtime"),
];

const TESTERS: &[(u16, &str)] = &[
    (1, "Self"),
    (2, "Health Care Professional"),
    (3, "Lab test"),
    (15, "Tester value not available"),
];

const HEALTH: &[(u16, &str)] = &[
    (1, "Minor health issues"),
    (2, "Major health issues"),
    (3, "During menses"),
    (4, "Under stress"),
    (5, "No health issues"),
    (15, "Health value not available"),
];

const MEDICATIONS: &[(u16, &str)] = &[
    (1, "Rapid acting insulin"),
    (2, "Short acting insulin"),
    (3, "Intermediate acting insulin"),
    (4, "Long acting insulin"),
    (5, "Pre-mixed insulin"),
];

impl GlucoseMeasurementContext {
    pub fn descriptor() -> RecordDescriptor {
        DescriptorBuilder::for_record::<Self>()
            .min_length(3)
            .max_length(17)
            .expects(ValueType::Fields)
            .requires_record::<GlucoseMeasurement>()
            .codec(Self)
            .build()
    }
}

fn check_sequence(ctx: &RecordContext<'_>, sequence: u16) -> Result<(), DecodeError> {
    let measurement = ctx.require(&GlucoseMeasurement::ID)?;
    let expected = measurement
        .field("sequence_number")
        .and_then(Value::as_u64)
        .ok_or_else(|| DecodeError::DependencyMismatch {
            id: GlucoseMeasurement::ID,
            reason: "measurement has no sequence number".to_string(),
        })?;
    if expected != sequence as u64 {
        return Err(DecodeError::DependencyMismatch {
            id: GlucoseMeasurement::ID,
            reason: format!("sequence number {sequence} does not match measurement {expected}"),
        });
    }
    Ok(())
}

impl RecordCodec for GlucoseMeasurementContext {
    fn decode(&self, data: &[u8], ctx: &RecordContext<'_>) -> Result<Value, DecodeError> {
        let mut reader = Reader::new(data);
        let flags = reader.read_u8("flags")?;
        let sequence = reader.read_u16("sequence number")?;
        check_sequence(ctx, sequence)?;

        let mut fields = FieldsBuilder::new()
            .field("sequence_number", Value::Unsigned { value: sequence as u64, unit: None });

        if flags & GC_EXTENDED_FLAGS != 0 {
            // No extended flag bits are assigned yet
            if reader.read_u8("extended flags")? != 0 {
                return Err(DecodeError::ReservedBitsSet { context: "extended flags" });
            }
        }

        if flags & GC_CARBOHYDRATE != 0 {
            let id = reader.read_u8("carbohydrate id")?;
            let amount = read_amount(&mut reader, "carbohydrate")?;
            fields.push("carbohydrate_id", labelled(id as u16, CARBOHYDRATES));
            fields.push("carbohydrate", amount.into_value(Unit::Kilogram));
        }

        if flags & GC_MEAL != 0 {
            let meal = reader.read_u8("meal")?;
            fields.push("meal", labelled(meal as u16, MEALS));
        }

        if flags & GC_TESTER_HEALTH != 0 {
            let nibbles = reader.read_u8("tester and health")?;
            fields.push("tester", labelled((nibbles & 0x0F) as u16, TESTERS));
            fields.push("health", labelled((nibbles >> 4) as u16, HEALTH));
        }

        if flags & GC_EXERCISE != 0 {
            let duration = reader.read_u16("exercise duration")?;
            let intensity = reader.read_u8("exercise intensity")?;
            if intensity > 100 {
                return Err(DecodeError::ValueOutOfRange {
                    field: "exercise intensity",
                    value: intensity as i64,
                    min: 0,
                    max: 100,
                });
            }
            fields.push("exercise_duration", Value::unsigned(duration as u64, Unit::Second));
            fields.push("exercise_intensity", Value::unsigned(intensity as u64, Unit::Percentage));
        }

        if flags & GC_MEDICATION != 0 {
            let unit = if flags & GC_MEDICATION_LITRES != 0 {
                Unit::Litre
            } else {
                Unit::Kilogram
            };
            let id = reader.read_u8("medication id")?;
            let amount = read_amount(&mut reader, "medication")?;
            fields.push("medication_id", labelled(id as u16, MEDICATIONS));
            fields.push("medication", amount.into_value(unit));
        } else if flags & GC_MEDICATION_LITRES != 0 {
            return Err(DecodeError::MalformedEncoding {
                context: "medication unit set without medication",
            });
        }

        if flags & GC_HBA1C != 0 {
            let hba1c = read_amount(&mut reader, "HbA1c")?;
            fields.push("hba1c", hba1c.into_value(Unit::Percentage));
        }
        reader.finish()?;

        Ok(fields.build())
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        let sequence = unsigned(field(value, "sequence_number")?, "sequence_number", u16::MAX as u64)?;

        let mut flags = 0u8;
        let mut writer = Writer::with_capacity(17);
        writer.write_u8(0);
        writer.write_u16(sequence as u16);

        if let Some(carbohydrate) = value.field("carbohydrate") {
            let id = enum_code(field(value, "carbohydrate_id")?, "carbohydrate_id", u8::MAX as u16)?;
            flags |= GC_CARBOHYDRATE;
            writer.write_u8(id as u8);
            let (amount, _) = sfloat_field(carbohydrate, "carbohydrate", &[Unit::Kilogram])?;
            writer.write_sfloat(amount, "carbohydrate")?;
        }

        if let Some(meal) = value.field("meal") {
            flags |= GC_MEAL;
            writer.write_u8(enum_code(meal, "meal", u8::MAX as u16)? as u8);
        }

        let tester = value.field("tester");
        let health = value.field("health");
        if tester.is_some() || health.is_some() {
            // A missing half is written as "not available"
            let tester = match tester {
                Some(v) => enum_code(v, "tester", 0x0F)?,
                None => 0x0F,
            };
            let health = match health {
                Some(v) => enum_code(v, "health", 0x0F)?,
                None => 0x0F,
            };
            flags |= GC_TESTER_HEALTH;
            writer.write_u8((tester as u8) | ((health as u8) << 4));
        }

        if let Some(duration) = value.field("exercise_duration") {
            let duration = unsigned(duration, "exercise_duration", u16::MAX as u64)?;
            let intensity = unsigned(field(value, "exercise_intensity")?, "exercise_intensity", 100)?;
            flags |= GC_EXERCISE;
            writer.write_u16(duration as u16);
            writer.write_u8(intensity as u8);
        }

        if let Some(medication) = value.field("medication") {
            let id = enum_code(field(value, "medication_id")?, "medication_id", u8::MAX as u16)?;
            let (amount, unit) = sfloat_field(medication, "medication", &[Unit::Kilogram, Unit::Litre])?;
            flags |= GC_MEDICATION;
            if unit == Some(Unit::Litre) {
                flags |= GC_MEDICATION_LITRES;
            }
            writer.write_u8(id as u8);
            writer.write_sfloat(amount, "medication")?;
        }

        if let Some(hba1c) = value.field("hba1c") {
            flags |= GC_HBA1C;
            let (amount, _) = sfloat_field(hba1c, "hba1c", &[Unit::Percentage])?;
            writer.write_sfloat(amount, "hba1c")?;
        }

        writer.set_byte(0, flags);
        Ok(writer.into_bytes())
    }
}

/// Reads an SFLOAT amount. The reserved code is never a valid reading.
fn read_amount(reader: &mut Reader<'_>, context: &'static str) -> Result<MedFloat, DecodeError> {
    match reader.read_sfloat(context)? {
        MedFloat::Reserved => Err(DecodeError::ReservedValue {
            field: context,
            value: 0x0801,
        }),
        amount => Ok(amount),
    }
}

/// Converts an amount for `write_sfloat`, returning the unit it is in.
///
/// Numbers must carry one of `units`; only the NaN/NRes specials may be
/// unitless.
fn sfloat_field(
    value: &Value,
    name: &'static str,
    units: &[Unit],
) -> Result<(MedFloat, Option<Unit>), EncodeError> {
    let amount = match MedFloat::from_value(value) {
        Some(MedFloat::Reserved) | None => return Err(unsupported(name, ValueType::Float, value)),
        Some(amount) => amount,
    };
    match value.unit() {
        None if matches!(value, Value::Enum { .. }) => Ok((amount, None)),
        Some(unit) if units.contains(&unit) => Ok((amount, Some(unit))),
        unit => Err(EncodeError::UnsupportedUnit { field: name, unit }),
    }
}
