//! Dependency-aware decoding and encoding of Bluetooth GATT characteristic values.
//!
//! A GATT characteristic value is a short binary payload whose layout is
//! defined per characteristic. Some payloads cannot be interpreted on their
//! own: a glucose context record must be paired with the measurement that
//! shares its sequence number, a heart-rate measurement can be enriched with
//! the body sensor location read alongside it. This crate decodes whole
//! batches of such records, ordering the work so every record sees the
//! siblings it depends on, and isolating failures so one bad payload never
//! takes the rest of the batch down with it.
//!
//! # Quick Start
//!
//! ```rust
//! use gatt_codec::catalog::{BatteryLevel, GlucoseMeasurement, GlucoseMeasurementContext};
//! use gatt_codec::{Batch, Engine, KnownRecord, Registry};
//!
//! let engine = Engine::new(Registry::standard());
//!
//! // The context arrives first but is decoded after its measurement.
//! let batch = Batch::new()
//!     .with(GlucoseMeasurementContext::ID, [0x02, 0x07, 0x00, 0x01])
//!     .with(
//!         GlucoseMeasurement::ID,
//!         [0x10, 0x07, 0x00, 0xE8, 0x07, 0x03, 0x01, 0x08, 0x1E, 0x00],
//!     )
//!     .with(BatteryLevel::ID, [0x64]);
//!
//! let results = engine.decode_batch(batch);
//! assert!(results.all_succeeded());
//! assert_eq!(results.decode_order()[0], GlucoseMeasurement::ID);
//!
//! let meal = results[GlucoseMeasurementContext::ID].value().and_then(|v| v.field("meal"));
//! assert_eq!(meal.and_then(|m| m.as_str()), Some("Preprandial (before meal)"));
//! ```
//!
//! # Modules
//!
//! - [`model`]: Identifiers, values, descriptors, context and results
//! - [`registry`]: Identifier and name resolution
//! - [`engine`]: Batch ordering and the decode/encode entry points
//! - [`codec`]: Wire primitives, IEEE-11073 floats and the per-record pipeline
//! - [`catalog`]: Reference codecs for standard records
//! - [`validate`]: Value validation against a descriptor
//! - [`error`]: Error types
//! - [`limits`]: Security limits and wire constants
//!
//! # Failure isolation
//!
//! Every entry point returns a [`RecordResult`] (or a [`DecodedBatch`] of
//! them) rather than an error. Malformed input, a missing dependency, or a
//! codec that panics each produce a failed result carrying a [`RecordError`];
//! siblings that do not depend on it decode as if it were not there.
//!
//! ```rust
//! use gatt_codec::catalog::{GlucoseMeasurement, GlucoseMeasurementContext};
//! use gatt_codec::{Batch, Engine, ErrorCode, KnownRecord, Registry};
//!
//! let engine = Engine::new(Registry::standard());
//! let results = engine.decode_batch(Batch::new()
//!     .with(GlucoseMeasurement::ID, [0x00])
//!     .with(GlucoseMeasurementContext::ID, [0x00, 0x07, 0x00]));
//!
//! let context = &results[GlucoseMeasurementContext::ID];
//! assert_eq!(context.error().map(|e| e.code()), Some(ErrorCode::MissingDependency));
//! ```

pub mod catalog;
pub mod codec;
pub mod engine;
pub mod error;
pub mod limits;
pub mod model;
pub mod registry;
pub mod util;
pub mod validate;

// Re-export commonly used types at crate root
pub use engine::{Batch, CyclePolicy, DecodedBatch, Engine, EngineOptions};
pub use error::{DecodeError, EncodeError, ErrorCode, RecordError, RegistryError, ValidationError};
pub use model::{
    DateTime, DescriptorBuilder, Field, FieldsBuilder, FnCodec, KnownRecord, RecordCodec,
    RecordContext, RecordDescriptor, RecordId, RecordResult, Unit, Value, ValueType,
};
pub use registry::{Registry, RegistryBuilder, Resolve};
pub use validate::validate_value;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
