use crate::codec::{Reader, Writer};
use crate::error::{DecodeError, EncodeError};
use crate::model::{
    DescriptorBuilder, KnownRecord, RecordCodec, RecordContext, RecordDescriptor, RecordId, Unit,
    Value, ValueType,
};

use super::unsigned;

/// Battery Level (0x2A19): remaining charge, 0..=100 percent.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatteryLevel;

impl KnownRecord for BatteryLevel {
    const ID: RecordId = RecordId::from_u16(0x2A19);
    const NAME: &'static str = "Battery Level";
}

impl BatteryLevel {
    pub fn descriptor() -> RecordDescriptor {
        DescriptorBuilder::for_record::<Self>()
            .fixed_length(1)
            .expects(ValueType::Unsigned)
            .codec(Self)
            .build()
    }
}

impl RecordCodec for BatteryLevel {
    fn decode(&self, data: &[u8], _ctx: &RecordContext<'_>) -> Result<Value, DecodeError> {
        let mut reader = Reader::new(data);
        let level = reader.read_u8("battery level")?;
        reader.finish()?;
        if level > 100 {
            return Err(DecodeError::ValueOutOfRange {
                field: "battery level",
                value: level as i64,
                min: 0,
                max: 100,
            });
        }
        Ok(Value::unsigned(level as u64, Unit::Percentage))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        let level = unsigned(value, "battery level", 100)?;
        let mut writer = Writer::with_capacity(1);
        writer.write_u8(level as u8);
        Ok(writer.into_bytes())
    }
}
