//! Record descriptors and the codec contract.
//!
//! A [`RecordDescriptor`] is the static description of one record type:
//! identifier, length bounds, expected value type, declared dependencies and
//! the [`RecordCodec`] that turns bytes into a [`Value`] and back.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::{DecodeError, EncodeError};
use crate::model::{RecordContext, RecordId, Value, ValueType};

/// Codec for a single record layout.
///
/// Implementations are stateless with respect to decoding: the same bytes
/// and the same context must always produce the same result. Failures are
/// reported through the returned `Result`; the decode pipeline also
/// contains panics, but codecs should not rely on that.
pub trait RecordCodec: Send + Sync {
    /// Decodes a payload. `ctx` exposes already-decoded sibling records.
    fn decode(&self, data: &[u8], ctx: &RecordContext<'_>) -> Result<Value, DecodeError>;

    /// Encodes a value into its wire payload.
    fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError>;
}

/// Static metadata and codec for one record type.
#[derive(Clone)]
pub struct RecordDescriptor {
    pub(crate) id: RecordId,
    pub(crate) name: Cow<'static, str>,
    pub(crate) min_length: usize,
    pub(crate) max_length: Option<usize>,
    pub(crate) expected_type: ValueType,
    pub(crate) required: Vec<RecordId>,
    pub(crate) optional: Vec<RecordId>,
    pub(crate) codec: Arc<dyn RecordCodec>,
}

impl RecordDescriptor {
    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Minimum payload length for well-formed input.
    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Maximum payload length, if the layout bounds it.
    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    /// Type of the value the codec produces and accepts.
    pub fn expected_type(&self) -> ValueType {
        self.expected_type
    }

    /// Records whose successful decode is mandatory for this one.
    pub fn required_dependencies(&self) -> &[RecordId] {
        &self.required
    }

    /// Records that enrich this one when present.
    pub fn optional_dependencies(&self) -> &[RecordId] {
        &self.optional
    }

    /// All declared dependencies, required first.
    pub fn dependencies(&self) -> impl Iterator<Item = &RecordId> {
        self.required.iter().chain(self.optional.iter())
    }

    /// Returns true if this record declares `id` as a dependency of either kind.
    pub fn depends_on(&self, id: &RecordId) -> bool {
        self.required.contains(id) || self.optional.contains(id)
    }

    /// Invokes the codec directly, without validation or error wrapping.
    ///
    /// Most callers want [`Engine::decode_one`](crate::Engine::decode_one).
    pub fn decode(&self, data: &[u8], ctx: &RecordContext<'_>) -> Result<Value, DecodeError> {
        self.codec.decode(data, ctx)
    }

    /// Invokes the codec's encoder directly, without type checks.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        self.codec.encode(value)
    }
}

impl fmt::Debug for RecordDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("expected_type", &self.expected_type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .finish_non_exhaustive()
    }
}

/// Codec that passes the payload through as [`Value::Bytes`].
///
/// Used when a descriptor is built without an explicit codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl RecordCodec for RawCodec {
    fn decode(&self, data: &[u8], _ctx: &RecordContext<'_>) -> Result<Value, DecodeError> {
        Ok(Value::Bytes(data.to_vec()))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        match value {
            Value::Bytes(bytes) => Ok(bytes.clone()),
            other => Err(EncodeError::UnsupportedValue {
                field: "payload",
                expected: ValueType::Bytes,
                actual: other.value_type(),
            }),
        }
    }
}

/// Codec assembled from a pair of closures.
///
/// ```rust
/// use gatt_codec::model::{FnCodec, RecordCodec, RecordContext, Unit, Value};
/// use gatt_codec::DecodeError;
///
/// let codec = FnCodec::decode_only(|data: &[u8], _ctx: &RecordContext<'_>| {
///     let raw = *data.first().ok_or(DecodeError::UnexpectedEof { context: "level" })?;
///     Ok(Value::unsigned(raw as u64, Unit::Percentage))
/// });
/// let value = codec.decode(&[42], &RecordContext::empty()).unwrap();
/// assert_eq!(value.as_u64(), Some(42));
/// ```
pub struct FnCodec<D, E> {
    decode: D,
    encode: E,
}

type EncodeFn = fn(&Value) -> Result<Vec<u8>, EncodeError>;

fn encode_unsupported(_value: &Value) -> Result<Vec<u8>, EncodeError> {
    Err(EncodeError::Other("codec does not support encoding".to_string()))
}

impl<D, E> FnCodec<D, E>
where
    D: Fn(&[u8], &RecordContext<'_>) -> Result<Value, DecodeError> + Send + Sync,
    E: Fn(&Value) -> Result<Vec<u8>, EncodeError> + Send + Sync,
{
    pub fn new(decode: D, encode: E) -> Self {
        Self { decode, encode }
    }
}

impl<D> FnCodec<D, EncodeFn>
where
    D: Fn(&[u8], &RecordContext<'_>) -> Result<Value, DecodeError> + Send + Sync,
{
    /// Codec for read-only records; encoding always fails.
    pub fn decode_only(decode: D) -> Self {
        Self {
            decode,
            encode: encode_unsupported,
        }
    }
}

impl<D, E> RecordCodec for FnCodec<D, E>
where
    D: Fn(&[u8], &RecordContext<'_>) -> Result<Value, DecodeError> + Send + Sync,
    E: Fn(&Value) -> Result<Vec<u8>, EncodeError> + Send + Sync,
{
    fn decode(&self, data: &[u8], ctx: &RecordContext<'_>) -> Result<Value, DecodeError> {
        (self.decode)(data, ctx)
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        (self.encode)(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DescriptorBuilder;

    #[test]
    fn test_raw_codec_passthrough() {
        let ctx = RecordContext::empty();
        assert_eq!(RawCodec.decode(&[1, 2, 3], &ctx), Ok(Value::Bytes(vec![1, 2, 3])));
        assert_eq!(RawCodec.encode(&Value::Bytes(vec![9])), Ok(vec![9]));
        assert!(RawCodec.encode(&Value::Bool(true)).is_err());
    }

    #[test]
    fn test_descriptor_accessors() {
        let a = RecordId::from_u16(0xFF01);
        let b = RecordId::from_u16(0xFF02);
        let c = RecordId::from_u16(0xFF03);
        let desc = DescriptorBuilder::new(a, "A")
            .min_length(2)
            .max_length(4)
            .requires(b)
            .enriched_by(c)
            .build();

        assert_eq!(desc.id(), a);
        assert_eq!(desc.name(), "A");
        assert_eq!(desc.min_length(), 2);
        assert_eq!(desc.max_length(), Some(4));
        assert_eq!(desc.expected_type(), ValueType::Bytes);
        assert_eq!(desc.dependencies().copied().collect::<Vec<_>>(), vec![b, c]);
        assert!(desc.depends_on(&c));
        assert!(!desc.depends_on(&a));
        assert!(format!("{:?}", desc).contains("RecordDescriptor"));
    }

    #[test]
    fn test_decode_only_codec_refuses_encode() {
        let codec = FnCodec::decode_only(|data: &[u8], _ctx: &RecordContext<'_>| {
            Ok(Value::Bytes(data.to_vec()))
        });
        assert!(codec.encode(&Value::Bytes(vec![])).is_err());
    }
}
