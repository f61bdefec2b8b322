//! Environmental sensing records.
//!
//! All three are fixed-point quantities. Encoding rounds to the wire
//! resolution, so a value survives a round trip only if it is already a
//! multiple of that resolution.

use crate::codec::{Reader, Writer};
use crate::error::{DecodeError, EncodeError};
use crate::model::{
    DescriptorBuilder, KnownRecord, RecordCodec, RecordContext, RecordDescriptor, RecordId, Unit,
    Value, ValueType,
};

use super::fixed_point;

/// Temperature (0x2A6E): signed, 0.01 °C resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct Temperature;

impl KnownRecord for Temperature {
    const ID: RecordId = RecordId::from_u16(0x2A6E);
    const NAME: &'static str = "Temperature";
}

const TEMPERATURE_UNKNOWN: i16 = i16::MIN;

impl Temperature {
    pub fn descriptor() -> RecordDescriptor {
        DescriptorBuilder::for_record::<Self>()
            .fixed_length(2)
            .expects(ValueType::Float)
            .codec(Self)
            .build()
    }
}

impl RecordCodec for Temperature {
    fn decode(&self, data: &[u8], _ctx: &RecordContext<'_>) -> Result<Value, DecodeError> {
        let mut reader = Reader::new(data);
        let raw = reader.read_i16("temperature")?;
        reader.finish()?;
        if raw == TEMPERATURE_UNKNOWN {
            return Err(DecodeError::ReservedValue {
                field: "temperature",
                value: raw as u16 as u64,
            });
        }
        Ok(Value::float(raw as f64 / 100.0, Unit::DegreeCelsius))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        let raw = fixed_point(value, "temperature", 100.0, i16::MIN as i64 + 1, i16::MAX as i64)?;
        let mut writer = Writer::with_capacity(2);
        writer.write_i16(raw as i16);
        Ok(writer.into_bytes())
    }
}

/// Humidity (0x2A6F): relative humidity, 0.01 % resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct Humidity;

impl KnownRecord for Humidity {
    const ID: RecordId = RecordId::from_u16(0x2A6F);
    const NAME: &'static str = "Humidity";
}

const HUMIDITY_UNKNOWN: u16 = 0xFFFF;
const HUMIDITY_MAX: u16 = 10_000;

impl Humidity {
    pub fn descriptor() -> RecordDescriptor {
        DescriptorBuilder::for_record::<Self>()
            .fixed_length(2)
            .expects(ValueType::Float)
            .codec(Self)
            .build()
    }
}

impl RecordCodec for Humidity {
    fn decode(&self, data: &[u8], _ctx: &RecordContext<'_>) -> Result<Value, DecodeError> {
        let mut reader = Reader::new(data);
        let raw = reader.read_u16("humidity")?;
        reader.finish()?;
        match raw {
            HUMIDITY_UNKNOWN => Err(DecodeError::ReservedValue {
                field: "humidity",
                value: raw as u64,
            }),
            raw if raw > HUMIDITY_MAX => Err(DecodeError::ValueOutOfRange {
                field: "humidity",
                value: raw as i64,
                min: 0,
                max: HUMIDITY_MAX as i64,
            }),
            raw => Ok(Value::float(raw as f64 / 100.0, Unit::Percentage)),
        }
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        let raw = fixed_point(value, "humidity", 100.0, 0, HUMIDITY_MAX as i64)?;
        let mut writer = Writer::with_capacity(2);
        writer.write_u16(raw as u16);
        Ok(writer.into_bytes())
    }
}

/// Pressure (0x2A6D): 0.1 Pa resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pressure;

impl KnownRecord for Pressure {
    const ID: RecordId = RecordId::from_u16(0x2A6D);
    const NAME: &'static str = "Pressure";
}

impl Pressure {
    pub fn descriptor() -> RecordDescriptor {
        DescriptorBuilder::for_record::<Self>()
            .fixed_length(4)
            .expects(ValueType::Float)
            .codec(Self)
            .build()
    }
}

impl RecordCodec for Pressure {
    fn decode(&self, data: &[u8], _ctx: &RecordContext<'_>) -> Result<Value, DecodeError> {
        let mut reader = Reader::new(data);
        let raw = reader.read_u32("pressure")?;
        reader.finish()?;
        Ok(Value::float(raw as f64 / 10.0, Unit::Pascal))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        let raw = fixed_point(value, "pressure", 10.0, 0, u32::MAX as i64)?;
        let mut writer = Writer::with_capacity(4);
        writer.write_u32(raw as u32);
        Ok(writer.into_bytes())
    }
}
