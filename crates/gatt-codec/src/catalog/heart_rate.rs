//! Heart rate records.

use crate::codec::{Reader, Writer};
use crate::error::{DecodeError, EncodeError};
use crate::limits::MAX_LIST_LEN;
use crate::model::{
    DescriptorBuilder, FieldsBuilder, KnownRecord, RecordCodec, RecordContext, RecordDescriptor,
    RecordId, Unit, Value, ValueType,
};

use super::{enum_code, field, labelled, unsigned, unsupported};

// =============================================================================
// BODY SENSOR LOCATION
// =============================================================================

/// Body Sensor Location (0x2A38): where a sensor is worn.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodySensorLocation;

impl KnownRecord for BodySensorLocation {
    const ID: RecordId = RecordId::from_u16(0x2A38);
    const NAME: &'static str = "Body Sensor Location";
}

const LOCATIONS: &[(u16, &str)] = &[
    (0, "Other"),
    (1, "Chest"),
    (2, "Wrist"),
    (3, "Finger"),
    (4, "Hand"),
    (5, "Ear Lobe"),
    (6, "Foot"),
];

impl BodySensorLocation {
    pub fn descriptor() -> RecordDescriptor {
        DescriptorBuilder::for_record::<Self>()
            .fixed_length(1)
            .expects(ValueType::Enum)
            .codec(Self)
            .build()
    }
}

impl RecordCodec for BodySensorLocation {
    fn decode(&self, data: &[u8], _ctx: &RecordContext<'_>) -> Result<Value, DecodeError> {
        let mut reader = Reader::new(data);
        let code = reader.read_u8("body sensor location")?;
        reader.finish()?;
        if code as usize >= LOCATIONS.len() {
            return Err(DecodeError::ReservedValue {
                field: "body sensor location",
                value: code as u64,
            });
        }
        Ok(labelled(code as u16, LOCATIONS))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        let code = enum_code(value, "body sensor location", LOCATIONS.len() as u16 - 1)?;
        Ok(vec![code as u8])
    }
}

// =============================================================================
// HEART RATE MEASUREMENT
// =============================================================================

/// Heart Rate Measurement (0x2A37).
///
/// Decodes to fields, in wire order:
///
/// | Field | Type | Present |
/// |---|---|---|
/// | `heart_rate` | Unsigned, bpm | always |
/// | `sensor_contact` | Enum (flag bits 1-2) | always |
/// | `energy_expended` | Unsigned, J | flag bit 3 |
/// | `rr_intervals` | List of Float, s | flag bit 4 |
/// | `sensor_location` | Enum | when [`BodySensorLocation`] decoded in the same batch |
///
/// The wire carries energy in kilojoules; it is exposed in joules. Encoding
/// rounds energy to the nearest kilojoule and RR intervals to the nearest
/// 1/1024 s, picks the 8-bit heart rate format whenever the rate fits, and
/// ignores `sensor_location`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeartRateMeasurement;

impl KnownRecord for HeartRateMeasurement {
    const ID: RecordId = RecordId::from_u16(0x2A37);
    const NAME: &'static str = "Heart Rate Measurement";
}

const FLAG_HR_U16: u8 = 0x01;
const FLAG_CONTACT_MASK: u8 = 0x06;
const FLAG_ENERGY: u8 = 0x08;
const FLAG_RR: u8 = 0x10;
const FLAG_RESERVED: u8 = 0xE0;

const CONTACT_STATUS: &[(u16, &str)] = &[
    (0, "not supported"),
    (1, "not supported"),
    (2, "not detected"),
    (3, "detected"),
];

const RR_STEPS_PER_SECOND: f64 = 1024.0;
const JOULES_PER_KJ: u64 = 1000;

impl HeartRateMeasurement {
    pub fn descriptor() -> RecordDescriptor {
        DescriptorBuilder::for_record::<Self>()
            .min_length(2)
            .expects(ValueType::Fields)
            .enriched_by_record::<BodySensorLocation>()
            .codec(Self)
            .build()
    }
}

impl RecordCodec for HeartRateMeasurement {
    fn decode(&self, data: &[u8], ctx: &RecordContext<'_>) -> Result<Value, DecodeError> {
        let mut reader = Reader::new(data);
        let flags = reader.read_u8("flags")?;
        if flags & FLAG_RESERVED != 0 {
            return Err(DecodeError::ReservedBitsSet { context: "heart rate flags" });
        }

        let heart_rate = if flags & FLAG_HR_U16 != 0 {
            reader.read_u16("heart rate")? as u64
        } else {
            reader.read_u8("heart rate")? as u64
        };

        let mut fields = FieldsBuilder::new()
            .field("heart_rate", Value::unsigned(heart_rate, Unit::BeatsPerMinute))
            .field(
                "sensor_contact",
                labelled(((flags & FLAG_CONTACT_MASK) >> 1) as u16, CONTACT_STATUS),
            );

        if flags & FLAG_ENERGY != 0 {
            let kj = reader.read_u16("energy expended")? as u64;
            fields.push("energy_expended", Value::unsigned(kj * JOULES_PER_KJ, Unit::Joule));
        }

        if flags & FLAG_RR != 0 {
            if reader.is_empty() {
                return Err(DecodeError::MalformedEncoding {
                    context: "RR interval flag set without intervals",
                });
            }
            let mut intervals = Vec::with_capacity((reader.remaining_len() / 2).min(MAX_LIST_LEN));
            while !reader.is_empty() {
                if intervals.len() == MAX_LIST_LEN {
                    return Err(DecodeError::LengthExceedsLimit {
                        context: "rr intervals",
                        max: MAX_LIST_LEN,
                    });
                }
                let raw = reader.read_u16("rr interval")?;
                intervals.push(Value::float(raw as f64 / RR_STEPS_PER_SECOND, Unit::Second));
            }
            fields.push("rr_intervals", Value::List(intervals));
        }
        reader.finish()?;

        if let Some(location) = ctx.value(&BodySensorLocation::ID) {
            fields.push("sensor_location", location.clone());
        }
        Ok(fields.build())
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        let heart_rate = unsigned(field(value, "heart_rate")?, "heart_rate", u16::MAX as u64)?;
        let contact = match value.field("sensor_contact") {
            Some(contact) => enum_code(contact, "sensor_contact", 3)? as u8,
            None => 0,
        };

        let mut writer = Writer::new();
        let mut flags = contact << 1;
        writer.write_u8(0);

        if heart_rate > u8::MAX as u64 {
            flags |= FLAG_HR_U16;
            writer.write_u16(heart_rate as u16);
        } else {
            writer.write_u8(heart_rate as u8);
        }

        if let Some(energy) = value.field("energy_expended") {
            let joules = unsigned(energy, "energy_expended", u16::MAX as u64 * JOULES_PER_KJ)?;
            flags |= FLAG_ENERGY;
            writer.write_u16(((joules + JOULES_PER_KJ / 2) / JOULES_PER_KJ).min(u16::MAX as u64) as u16);
        }

        if let Some(rr) = value.field("rr_intervals") {
            let intervals = match rr {
                Value::List(items) => items,
                other => return Err(unsupported("rr_intervals", ValueType::List, other)),
            };
            if intervals.len() > MAX_LIST_LEN {
                return Err(EncodeError::LengthExceedsLimit {
                    field: "rr_intervals",
                    len: intervals.len(),
                    max: MAX_LIST_LEN,
                });
            }
            if !intervals.is_empty() {
                flags |= FLAG_RR;
            }
            for interval in intervals {
                let seconds = match interval {
                    Value::Float { value, .. } if !value.is_nan() => *value,
                    Value::Float { .. } => return Err(EncodeError::FloatIsNan { field: "rr_intervals" }),
                    other => return Err(unsupported("rr_intervals", ValueType::Float, other)),
                };
                let raw = (seconds * RR_STEPS_PER_SECOND).round();
                if !(0.0..=u16::MAX as f64).contains(&raw) {
                    return Err(EncodeError::ValueOutOfRange {
                        field: "rr_intervals",
                        value: seconds,
                        min: 0.0,
                        max: u16::MAX as f64 / RR_STEPS_PER_SECOND,
                    });
                }
                writer.write_u16(raw as u16);
            }
        }

        writer.set_byte(0, flags);
        Ok(writer.into_bytes())
    }
}
