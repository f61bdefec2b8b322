//! The dependency-aware batch engine.
//!
//! [`Engine`] resolves each record through a [`Resolve`] implementation,
//! orders the batch so dependencies decode before their dependents, and
//! runs the decode pipeline once per record with a read-only view of the
//! results produced so far. A failure is always recorded against the record
//! it belongs to; it never aborts the batch.
//!
//! # Example
//!
//! ```rust
//! use gatt_codec::catalog::{BatteryLevel, HeartRateMeasurement};
//! use gatt_codec::{Batch, Engine, KnownRecord, Registry};
//!
//! let engine = Engine::new(Registry::with_standard_records());
//! let batch = Batch::new()
//!     .with(HeartRateMeasurement::ID, vec![0x00, 72])
//!     .with(BatteryLevel::ID, vec![0x64]);
//!
//! let results = engine.decode_batch(batch);
//! assert!(results.all_succeeded());
//! assert_eq!(results[BatteryLevel::ID].value().and_then(|v| v.as_u64()), Some(100));
//! ```

pub mod batch;
pub(crate) mod graph;

use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::codec::pipeline::{decode_record, encode_record};
use crate::error::RecordError;
use crate::limits::MAX_RECORD_LEN;
use crate::model::{RecordContext, RecordDescriptor, RecordId, RecordResult, Value};
use crate::registry::Resolve;

pub use batch::{Batch, DecodedBatch};
use graph::DecodePlan;

/// What to do with records that sit on a dependency cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePolicy {
    /// Decode the cyclic records in batch insertion order.
    ///
    /// Records on the cycle still run through the dependency gate, so a
    /// required dependency that has not been decoded yet fails the record.
    #[default]
    InsertionOrder,
    /// Fail every record on a cycle with [`RecordError::CyclicDependency`].
    Reject,
}

/// Options for decoding and encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Handling of dependency cycles within a batch.
    pub cycle_policy: CyclePolicy,

    /// Upper bound on any payload, in either direction.
    ///
    /// A descriptor's own maximum length applies on top of this.
    pub max_record_len: usize,

    /// Convert a panicking codec into a failed result.
    ///
    /// When disabled a codec panic unwinds through the caller.
    pub catch_panics: bool,

    /// Fail decoded values whose type differs from the descriptor's
    /// expected type, or that break value-level rules.
    pub check_value_type: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            cycle_policy: CyclePolicy::InsertionOrder,
            max_record_len: MAX_RECORD_LEN,
            catch_panics: true,
            check_value_type: true,
        }
    }
}

impl EngineOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default options, except that dependency cycles are rejected.
    pub fn strict() -> Self {
        Self {
            cycle_policy: CyclePolicy::Reject,
            ..Self::default()
        }
    }
}

/// Decodes and encodes records through a resolver.
///
/// The engine holds no state between calls. With a `Sync` resolver it can
/// be shared across threads and used concurrently.
#[derive(Debug, Clone)]
pub struct Engine<R> {
    resolver: R,
    options: EngineOptions,
}

impl<R: Resolve> Engine<R> {
    /// Creates an engine with default options.
    pub fn new(resolver: R) -> Self {
        Self::with_options(resolver, EngineOptions::default())
    }

    pub fn with_options(resolver: R, options: EngineOptions) -> Self {
        Self { resolver, options }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Looks up an identifier from its string form or a record name.
    ///
    /// Tries `"0x2A19"`-style and UUID forms first, then the resolver's
    /// name lookup.
    pub fn lookup(&self, key: &str) -> Option<RecordId> {
        RecordId::parse(key).or_else(|| self.resolver.resolve_name(key).map(RecordDescriptor::id))
    }

    // =========================================================================
    // DECODING
    // =========================================================================

    /// Decodes a single record.
    ///
    /// `ctx` supplies sibling records the caller decoded elsewhere; `None`
    /// means no siblings, so required dependencies fail the record.
    pub fn decode_one(&self, id: RecordId, raw: &[u8], ctx: Option<&RecordContext<'_>>) -> RecordResult {
        let Some(descriptor) = self.resolver.resolve(&id) else {
            debug!(id = %id, len = raw.len(), "unresolved record");
            return RecordResult::err(id, raw.to_vec(), RecordError::UnresolvedIdentifier { id });
        };
        let empty = RecordContext::empty();
        let result = decode_record(descriptor, raw, ctx.unwrap_or(&empty), &self.options);
        log_outcome(&result);
        result
    }

    /// Decodes a batch of records in dependency order.
    ///
    /// Returns exactly one result per distinct input identifier.
    pub fn decode_batch(&self, batch: impl Into<Batch>) -> DecodedBatch {
        let batch = batch.into();

        let descriptors: Vec<Option<&RecordDescriptor>> =
            batch.ids().map(|id| self.resolver.resolve(&id)).collect();

        let dependencies: Vec<Vec<usize>> = descriptors
            .iter()
            .map(|descriptor| match descriptor {
                Some(d) => d.dependencies().filter_map(|dep| batch.position(dep)).collect(),
                None => Vec::new(),
            })
            .collect();

        let plan = DecodePlan::compute(&dependencies);
        let order: Vec<RecordId> = plan.order.iter().map(|&pos| batch.entry(pos).0).collect();
        let cycles: Vec<Vec<RecordId>> = plan
            .cycles
            .iter()
            .map(|members| members.iter().map(|&pos| batch.entry(pos).0).collect())
            .collect();

        trace!(order = ?order, "computed decode order");
        for cycle in &cycles {
            warn!(
                cycle = ?cycle,
                policy = ?self.options.cycle_policy,
                "dependency cycle in batch"
            );
        }

        let mut results: FxHashMap<RecordId, RecordResult> =
            FxHashMap::with_capacity_and_hasher(batch.len(), Default::default());

        for &pos in &plan.order {
            let (id, raw) = batch.entry(pos);
            let result = match descriptors[pos] {
                None => RecordResult::err(id, raw.to_vec(), RecordError::UnresolvedIdentifier { id }),
                Some(descriptor) => match plan.cycle_of(pos) {
                    Some(members) if self.options.cycle_policy == CyclePolicy::Reject => {
                        let cycle = members.iter().map(|&m| batch.entry(m).0).collect();
                        RecordResult::from_descriptor(
                            descriptor,
                            raw.to_vec(),
                            Err(RecordError::CyclicDependency { cycle }),
                        )
                    }
                    _ => {
                        let ctx = RecordContext::borrowed(&results);
                        decode_record(descriptor, raw, &ctx, &self.options)
                    }
                },
            };
            log_outcome(&result);
            results.insert(id, result);
        }

        let ordered = batch
            .ids()
            .filter_map(|id| results.remove(&id))
            .collect();
        DecodedBatch::new(ordered, order, cycles)
    }

    // =========================================================================
    // ENCODING
    // =========================================================================

    /// Encodes a value for record `id`, checking it against the expected type.
    pub fn encode_one(&self, id: RecordId, value: &Value) -> Result<Vec<u8>, RecordError> {
        self.encode_inner(id, value, true)
    }

    /// Encodes a value without the expected-type check.
    ///
    /// The codec still rejects values it cannot represent.
    pub fn encode_one_unchecked(&self, id: RecordId, value: &Value) -> Result<Vec<u8>, RecordError> {
        self.encode_inner(id, value, false)
    }

    fn encode_inner(&self, id: RecordId, value: &Value, check_type: bool) -> Result<Vec<u8>, RecordError> {
        let descriptor = self
            .resolver
            .resolve(&id)
            .ok_or(RecordError::UnresolvedIdentifier { id })?;
        let bytes = encode_record(descriptor, value, &self.options, check_type)?;
        debug!(id = %id, len = bytes.len(), "encoded record");
        Ok(bytes)
    }
}

fn log_outcome(result: &RecordResult) {
    match result.error() {
        None => debug!(id = %result.id(), len = result.raw_bytes().len(), "decoded record"),
        Some(err) => debug!(
            id = %result.id(),
            len = result.raw_bytes().len(),
            code = err.code().code(),
            error = %err,
            "record failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecodeError, EncodeError};
    use crate::model::{DescriptorBuilder, FnCodec, RecordCodec, Unit, ValueType};
    use crate::registry::{Registry, RegistryBuilder};

    const A: RecordId = RecordId::from_u16(0xFF0A);
    const B: RecordId = RecordId::from_u16(0xFF0B);
    const C: RecordId = RecordId::from_u16(0xFF0C);

    fn byte_codec() -> impl RecordCodec {
        FnCodec::new(
            |data: &[u8], _ctx: &RecordContext<'_>| -> Result<Value, DecodeError> {
                let b = *data.first().ok_or(DecodeError::UnexpectedEof { context: "value" })?;
                Ok(Value::unsigned(b as u64, Unit::Unitless))
            },
            |value: &Value| -> Result<Vec<u8>, EncodeError> {
                Ok(vec![value.as_u64().unwrap_or(0) as u8])
            },
        )
    }

    fn descriptor(id: RecordId, requires: &[RecordId]) -> RecordDescriptor {
        let mut builder = DescriptorBuilder::new(id, format!("Record {}", id))
            .min_length(1)
            .expects(ValueType::Unsigned)
            .codec(byte_codec());
        for dep in requires {
            builder = builder.requires(*dep);
        }
        builder.build()
    }

    fn registry(descriptors: Vec<RecordDescriptor>) -> Registry {
        let mut builder = RegistryBuilder::new();
        for d in descriptors {
            builder.register(d).unwrap();
        }
        builder.build()
    }

    #[test]
    fn test_unresolved_id_still_yields_result() {
        let engine = Engine::new(registry(vec![descriptor(A, &[])]));
        let results = engine.decode_batch([(A, vec![1u8]), (B, vec![2])]);
        assert_eq!(results.len(), 2);
        assert!(results[A].success());
        assert_eq!(
            results[B].error(),
            Some(&RecordError::UnresolvedIdentifier { id: B })
        );
        assert_eq!(results[B].raw_bytes(), &[2]);
    }

    #[test]
    fn test_results_in_input_order_decode_in_dependency_order() {
        let engine = Engine::new(registry(vec![descriptor(A, &[B]), descriptor(B, &[])]));
        let results = engine.decode_batch([(A, vec![1u8]), (B, vec![2])]);
        assert!(results.all_succeeded());
        assert_eq!(results.decode_order(), &[B, A]);
        let ids: Vec<_> = results.iter().map(RecordResult::id).collect();
        assert_eq!(ids, vec![A, B]);
    }

    #[test]
    fn test_cycle_insertion_order_policy() {
        let engine = Engine::new(registry(vec![descriptor(A, &[B]), descriptor(B, &[A])]));
        let results = engine.decode_batch([(A, vec![1u8]), (B, vec![2])]);
        assert_eq!(results.cycles(), &[vec![A, B]]);
        // A runs first and cannot see B; B then sees A failed
        assert_eq!(
            results[A].error(),
            Some(&RecordError::MissingRequiredDependency {
                missing: vec![B],
                failed: vec![],
            })
        );
        assert_eq!(
            results[B].error(),
            Some(&RecordError::MissingRequiredDependency {
                missing: vec![],
                failed: vec![A],
            })
        );
    }

    #[test]
    fn test_cycle_reject_policy() {
        let engine = Engine::with_options(
            registry(vec![descriptor(A, &[B]), descriptor(B, &[A]), descriptor(C, &[])]),
            EngineOptions::strict(),
        );
        let results = engine.decode_batch([(A, vec![1u8]), (B, vec![2]), (C, vec![3])]);
        for id in [A, B] {
            assert_eq!(
                results[id].error(),
                Some(&RecordError::CyclicDependency { cycle: vec![A, B] })
            );
        }
        assert!(results[C].success());
    }

    #[test]
    fn test_decode_one_with_explicit_context() {
        let engine = Engine::new(registry(vec![descriptor(A, &[B])]));
        assert!(!engine.decode_one(A, &[1], None).success());

        let ctx = RecordContext::from_results([RecordResult::ok(
            B,
            vec![9],
            Value::unsigned(9, Unit::Unitless),
        )]);
        assert!(engine.decode_one(A, &[1], Some(&ctx)).success());

        let unknown = engine.decode_one(C, &[1], None);
        assert_eq!(unknown.error(), Some(&RecordError::UnresolvedIdentifier { id: C }));
    }

    #[test]
    fn test_encode_one() {
        let engine = Engine::new(registry(vec![descriptor(A, &[])]));
        assert_eq!(engine.encode_one(A, &Value::unsigned(7, Unit::Unitless)), Ok(vec![7]));
        assert_eq!(
            engine.encode_one(A, &Value::Bool(true)),
            Err(RecordError::TypeMismatch {
                expected: ValueType::Unsigned,
                actual: ValueType::Bool,
            })
        );
        assert_eq!(engine.encode_one_unchecked(A, &Value::Bool(true)), Ok(vec![0]));
        assert_eq!(
            engine.encode_one(B, &Value::Bool(true)),
            Err(RecordError::UnresolvedIdentifier { id: B })
        );
    }

    #[test]
    fn test_lookup_by_id_or_name() {
        let engine = Engine::new(registry(vec![descriptor(A, &[])]));
        assert_eq!(engine.lookup("0xFF0A"), Some(A));
        assert_eq!(engine.lookup("record 0xff0a"), Some(A));
        assert_eq!(engine.lookup("nothing"), None);
    }

    #[test]
    fn test_strict_options() {
        let options = EngineOptions::strict();
        assert_eq!(options.cycle_policy, CyclePolicy::Reject);
        assert_eq!(options.max_record_len, MAX_RECORD_LEN);
        assert_eq!(EngineOptions::new().cycle_policy, CyclePolicy::InsertionOrder);
    }
}
