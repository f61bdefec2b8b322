//! Data model types.
//!
//! This module contains the core types the engine works with:
//! - Identifiers (UUIDs, SIG short forms)
//! - Values (typed, unit-aware)
//! - Descriptors and the codec contract
//! - Context (sibling view) and results
//! - Builders (ergonomic construction)

pub mod builder;
pub mod context;
pub mod descriptor;
pub mod id;
pub mod result;
pub mod value;

pub use builder::{DescriptorBuilder, FieldsBuilder};
pub use context::RecordContext;
pub use descriptor::{FnCodec, RawCodec, RecordCodec, RecordDescriptor};
pub use id::{KnownRecord, ParseRecordIdError, RecordId};
pub use result::RecordResult;
pub use value::{DateTime, Field, Unit, Value, ValueType};
