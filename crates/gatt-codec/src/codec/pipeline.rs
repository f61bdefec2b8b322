//! The per-record decode pipeline and its encode mirror.
//!
//! Decode: length check, required-dependency gate, codec call, value check,
//! wrap into a [`RecordResult`]. Every failure along the way, including a
//! panicking codec, ends up in the result; nothing escapes this boundary.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::engine::EngineOptions;
use crate::error::{EncodeError, RecordError, ValidationError};
use crate::model::{RecordContext, RecordDescriptor, RecordResult, Value};
use crate::validate::validate_for;

// =============================================================================
// DECODING
// =============================================================================

/// Decodes one payload against its descriptor.
///
/// `ctx` holds the sibling records visible to this call. The record being
/// decoded is never visible as its own sibling, even if `ctx` contains it.
pub fn decode_record(
    descriptor: &RecordDescriptor,
    raw: &[u8],
    ctx: &RecordContext<'_>,
    options: &EngineOptions,
) -> RecordResult {
    let outcome = run_decode(descriptor, raw, ctx, options);
    RecordResult::from_descriptor(descriptor, raw.to_vec(), outcome)
}

fn run_decode(
    descriptor: &RecordDescriptor,
    raw: &[u8],
    ctx: &RecordContext<'_>,
    options: &EngineOptions,
) -> Result<Value, RecordError> {
    check_length(descriptor, raw.len(), options.max_record_len)?;

    let view = ctx.excluding(descriptor.id());
    check_required(descriptor, &view)?;

    let value = call_decode(descriptor, raw, &view, options.catch_panics)?;

    if options.check_value_type {
        validate_for(descriptor, &value).map_err(|err| match err {
            ValidationError::TypeMismatch { expected, actual } => {
                RecordError::UnexpectedValueType { expected, actual }
            }
            ValidationError::InvalidValue { reason } => RecordError::InvalidDecodedValue { reason },
        })?;
    }

    Ok(value)
}

fn check_length(descriptor: &RecordDescriptor, len: usize, limit: usize) -> Result<(), RecordError> {
    if len < descriptor.min_length() {
        return Err(RecordError::InsufficientData {
            min: descriptor.min_length(),
            actual: len,
        });
    }
    let max = descriptor.max_length().map_or(limit, |max| max.min(limit));
    if len > max {
        return Err(RecordError::PayloadTooLarge { max, actual: len });
    }
    Ok(())
}

/// Fails unless every required dependency is present and succeeded.
///
/// Optional dependencies are never checked here.
fn check_required(descriptor: &RecordDescriptor, ctx: &RecordContext<'_>) -> Result<(), RecordError> {
    let mut missing = Vec::new();
    let mut failed = Vec::new();
    for dep in descriptor.required_dependencies() {
        match ctx.get(dep) {
            None => missing.push(*dep),
            Some(result) if !result.success() => failed.push(*dep),
            Some(_) => {}
        }
    }
    if missing.is_empty() && failed.is_empty() {
        Ok(())
    } else {
        Err(RecordError::MissingRequiredDependency { missing, failed })
    }
}

fn call_decode(
    descriptor: &RecordDescriptor,
    raw: &[u8],
    ctx: &RecordContext<'_>,
    catch_panics: bool,
) -> Result<Value, RecordError> {
    if !catch_panics {
        return descriptor.decode(raw, ctx).map_err(RecordError::from);
    }
    match panic::catch_unwind(AssertUnwindSafe(|| descriptor.decode(raw, ctx))) {
        Ok(result) => result.map_err(RecordError::from),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(id = %descriptor.id(), %message, "record codec panicked during decode");
            Err(RecordError::DecodePanicked { message })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes a value into the payload of `descriptor`'s record.
///
/// With `check_type` set the value must have the descriptor's expected type
/// and pass value-level validation before the codec sees it. The produced
/// payload is held to the same length limit as decode input.
pub fn encode_record(
    descriptor: &RecordDescriptor,
    value: &Value,
    options: &EngineOptions,
    check_type: bool,
) -> Result<Vec<u8>, RecordError> {
    if check_type {
        validate_for(descriptor, value).map_err(|err| match err {
            ValidationError::TypeMismatch { expected, actual } => {
                RecordError::TypeMismatch { expected, actual }
            }
            ValidationError::InvalidValue { reason } => RecordError::InvalidValue { reason },
        })?;
    }

    let bytes = call_encode(descriptor, value, options.catch_panics)?;

    if bytes.len() > options.max_record_len {
        return Err(EncodeError::LengthExceedsLimit {
            field: "payload",
            len: bytes.len(),
            max: options.max_record_len,
        }
        .into());
    }
    Ok(bytes)
}

fn call_encode(
    descriptor: &RecordDescriptor,
    value: &Value,
    catch_panics: bool,
) -> Result<Vec<u8>, RecordError> {
    if !catch_panics {
        return descriptor.encode(value).map_err(RecordError::from);
    }
    match panic::catch_unwind(AssertUnwindSafe(|| descriptor.encode(value))) {
        Ok(result) => result.map_err(RecordError::from),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(id = %descriptor.id(), %message, "record codec panicked during encode");
            Err(RecordError::EncodePanicked { message })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::error::DecodeError;
    use crate::model::{DescriptorBuilder, FnCodec, RecordCodec, RecordId, Unit, ValueType};

    const A: RecordId = RecordId::from_u16(0xFFA0);
    const B: RecordId = RecordId::from_u16(0xFFB0);

    /// Counts decode calls so tests can assert the codec was never reached.
    struct Counting(Arc<AtomicUsize>);

    impl RecordCodec for Counting {
        fn decode(&self, data: &[u8], _ctx: &RecordContext<'_>) -> Result<Value, DecodeError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Bytes(data.to_vec()))
        }

        fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
            match value {
                Value::Bytes(b) => Ok(b.clone()),
                _ => Err(EncodeError::Other("bytes only".into())),
            }
        }
    }

    fn counting(min: usize) -> (RecordDescriptor, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let desc = DescriptorBuilder::new(A, "Counting")
            .min_length(min)
            .codec(Counting(calls.clone()))
            .build();
        (desc, calls)
    }

    #[test]
    fn test_short_payload_never_reaches_codec() {
        let (desc, calls) = counting(4);
        let result = decode_record(&desc, &[1], &RecordContext::empty(), &EngineOptions::default());
        assert!(!result.success());
        assert_eq!(
            result.error(),
            Some(&RecordError::InsufficientData { min: 4, actual: 1 })
        );
        assert_eq!(result.raw_bytes(), &[1]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_oversized_payload() {
        let (desc, calls) = counting(0);
        let options = EngineOptions {
            max_record_len: 8,
            ..EngineOptions::default()
        };
        let result = decode_record(&desc, &[0; 9], &RecordContext::empty(), &options);
        assert_eq!(
            result.error(),
            Some(&RecordError::PayloadTooLarge { max: 8, actual: 9 })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let bounded = DescriptorBuilder::new(A, "Bounded").max_length(2).build();
        let result = decode_record(&bounded, &[0; 3], &RecordContext::empty(), &options);
        assert_eq!(
            result.error(),
            Some(&RecordError::PayloadTooLarge { max: 2, actual: 3 })
        );
    }

    #[test]
    fn test_required_gate_names_missing_and_failed() {
        let desc = DescriptorBuilder::new(A, "Dependent")
            .requires(B)
            .requires(RecordId::from_u16(0xFFC0))
            .build();
        let ctx = RecordContext::from_results([RecordResult::err(
            B,
            vec![],
            RecordError::InsufficientData { min: 1, actual: 0 },
        )]);
        let result = decode_record(&desc, &[], &ctx, &EngineOptions::default());
        assert_eq!(
            result.error(),
            Some(&RecordError::MissingRequiredDependency {
                missing: vec![RecordId::from_u16(0xFFC0)],
                failed: vec![B],
            })
        );
        let message = result.error_message().unwrap();
        assert!(message.contains("0xFFC0"), "{message}");
        assert!(message.contains("0xFFB0"), "{message}");
    }

    #[test]
    fn test_optional_dependency_is_not_gated() {
        let desc = DescriptorBuilder::new(A, "Enriched").enriched_by(B).build();
        let result = decode_record(&desc, &[7], &RecordContext::empty(), &EngineOptions::default());
        assert!(result.success());
        assert_eq!(result.value(), Some(&Value::Bytes(vec![7])));
    }

    #[test]
    fn test_self_is_hidden_from_codec() {
        let codec = FnCodec::decode_only(|_data: &[u8], ctx: &RecordContext<'_>| {
            Ok(Value::Bool(ctx.contains(&A)))
        });
        let desc = DescriptorBuilder::new(A, "Introspective")
            .expects(ValueType::Bool)
            .codec(codec)
            .build();
        let ctx = RecordContext::from_results([RecordResult::ok(A, vec![], Value::Bool(true))]);
        let result = decode_record(&desc, &[], &ctx, &EngineOptions::default());
        assert_eq!(result.value(), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_codec_error_is_wrapped() {
        let codec = FnCodec::decode_only(|_data: &[u8], _ctx: &RecordContext<'_>| {
            Err(DecodeError::ReservedValue { field: "level", value: 0xFF })
        });
        let desc = DescriptorBuilder::new(A, "Failing").codec(codec).build();
        let result = decode_record(&desc, &[0xFF], &RecordContext::empty(), &EngineOptions::default());
        assert_eq!(
            result.error(),
            Some(&RecordError::Decode(DecodeError::ReservedValue { field: "level", value: 0xFF }))
        );
        assert!(result.error_message().unwrap().contains("reserved value 0xff"));
    }

    #[test]
    fn test_codec_panic_is_contained() {
        let codec = FnCodec::decode_only(|data: &[u8], _ctx: &RecordContext<'_>| {
            let first = data[10];
            Ok(Value::unsigned(first as u64, Unit::Unitless))
        });
        let desc = DescriptorBuilder::new(A, "Panicking").codec(codec).build();
        let result = decode_record(&desc, &[1], &RecordContext::empty(), &EngineOptions::default());
        match result.error() {
            Some(RecordError::DecodePanicked { message }) => {
                assert!(message.contains("index out of bounds"), "{message}")
            }
            other => panic!("expected DecodePanicked, got {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_value_type() {
        let desc = DescriptorBuilder::new(A, "Mislabelled")
            .expects(ValueType::Unsigned)
            .build();
        let result = decode_record(&desc, &[1], &RecordContext::empty(), &EngineOptions::default());
        assert_eq!(
            result.error(),
            Some(&RecordError::UnexpectedValueType {
                expected: ValueType::Unsigned,
                actual: ValueType::Bytes,
            })
        );

        let lenient = EngineOptions {
            check_value_type: false,
            ..EngineOptions::default()
        };
        assert!(decode_record(&desc, &[1], &RecordContext::empty(), &lenient).success());
    }

    #[test]
    fn test_encode_type_check_and_bypass() {
        let desc = DescriptorBuilder::new(A, "Raw").build();
        let options = EngineOptions::default();

        assert_eq!(encode_record(&desc, &Value::Bytes(vec![1, 2]), &options, true), Ok(vec![1, 2]));
        assert_eq!(
            encode_record(&desc, &Value::Bool(true), &options, true),
            Err(RecordError::TypeMismatch {
                expected: ValueType::Bytes,
                actual: ValueType::Bool,
            })
        );
        // Bypassing the check hands the value to the codec, which rejects it itself
        assert!(matches!(
            encode_record(&desc, &Value::Bool(true), &options, false),
            Err(RecordError::Encode(EncodeError::UnsupportedValue { .. }))
        ));
    }

    #[test]
    fn test_encode_output_limit() {
        let desc = DescriptorBuilder::new(A, "Raw").build();
        let options = EngineOptions {
            max_record_len: 2,
            ..EngineOptions::default()
        };
        assert!(matches!(
            encode_record(&desc, &Value::Bytes(vec![0; 3]), &options, true),
            Err(RecordError::Encode(EncodeError::LengthExceedsLimit { len: 3, max: 2, .. }))
        ));
    }

    #[test]
    fn test_encode_panic_is_contained() {
        let codec = FnCodec::new(
            |_data: &[u8], _ctx: &RecordContext<'_>| Ok(Value::Bytes(vec![])),
            |_value: &Value| -> Result<Vec<u8>, EncodeError> { panic!("encoder exploded") },
        );
        let desc = DescriptorBuilder::new(A, "Exploding").codec(codec).build();
        assert_eq!(
            encode_record(&desc, &Value::Bytes(vec![]), &EngineOptions::default(), true),
            Err(RecordError::EncodePanicked {
                message: "encoder exploded".to_string()
            })
        );
    }
}
