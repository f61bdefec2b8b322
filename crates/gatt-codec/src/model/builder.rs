//! Builder API for descriptors and structured values.
//!
//! # Example
//!
//! ```rust
//! use gatt_codec::catalog::GlucoseMeasurement;
//! use gatt_codec::model::{DescriptorBuilder, RecordId, ValueType};
//!
//! let descriptor = DescriptorBuilder::new(RecordId::from_u16(0xFFF1), "Calibrated Sensor")
//!     .min_length(2)
//!     .expects(ValueType::Float)
//!     .requires(RecordId::from_u16(0xFFF0))
//!     .enriched_by_record::<GlucoseMeasurement>()
//!     .build();
//!
//! assert_eq!(descriptor.required_dependencies(), &[RecordId::from_u16(0xFFF0)]);
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use crate::model::descriptor::RawCodec;
use crate::model::{Field, KnownRecord, RecordCodec, RecordDescriptor, RecordId, Value, ValueType};

/// Builder for a [`RecordDescriptor`].
#[derive(Clone)]
pub struct DescriptorBuilder {
    id: RecordId,
    name: Cow<'static, str>,
    min_length: usize,
    max_length: Option<usize>,
    expected_type: ValueType,
    required: Vec<RecordId>,
    optional: Vec<RecordId>,
    codec: Option<Arc<dyn RecordCodec>>,
}

impl DescriptorBuilder {
    /// Starts a descriptor for `id`. Defaults: no length bounds, raw bytes.
    pub fn new(id: RecordId, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id,
            name: name.into(),
            min_length: 0,
            max_length: None,
            expected_type: ValueType::Bytes,
            required: Vec::new(),
            optional: Vec::new(),
            codec: None,
        }
    }

    /// Starts a descriptor for a record known at compile time.
    pub fn for_record<R: KnownRecord>() -> Self {
        Self::new(R::ID, R::NAME)
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = len;
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Sets minimum and maximum length to the same value.
    pub fn fixed_length(self, len: usize) -> Self {
        self.min_length(len).max_length(len)
    }

    /// Declares the type of value the codec produces.
    pub fn expects(mut self, value_type: ValueType) -> Self {
        self.expected_type = value_type;
        self
    }

    /// Adds a required dependency.
    pub fn requires(mut self, id: RecordId) -> Self {
        if !self.required.contains(&id) {
            self.required.push(id);
        }
        self
    }

    /// Adds a required dependency named by type.
    pub fn requires_record<R: KnownRecord>(self) -> Self {
        self.requires(R::ID)
    }

    /// Adds an optional (enriching) dependency.
    pub fn enriched_by(mut self, id: RecordId) -> Self {
        if !self.optional.contains(&id) {
            self.optional.push(id);
        }
        self
    }

    /// Adds an optional dependency named by type.
    pub fn enriched_by_record<R: KnownRecord>(self) -> Self {
        self.enriched_by(R::ID)
    }

    pub fn codec(self, codec: impl RecordCodec + 'static) -> Self {
        self.shared_codec(Arc::new(codec))
    }

    /// Uses a codec shared with other descriptors.
    pub fn shared_codec(mut self, codec: Arc<dyn RecordCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn build(self) -> RecordDescriptor {
        RecordDescriptor {
            id: self.id,
            name: self.name,
            min_length: self.min_length,
            max_length: self.max_length,
            expected_type: self.expected_type,
            required: self.required,
            optional: self.optional,
            codec: self.codec.unwrap_or_else(|| Arc::new(RawCodec)),
        }
    }
}

/// Builder for [`Value::Fields`].
#[derive(Debug, Clone, Default)]
pub struct FieldsBuilder {
    fields: Vec<Field>,
}

impl FieldsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field.
    pub fn field(mut self, name: &'static str, value: Value) -> Self {
        self.fields.push(Field::new(name, value));
        self
    }

    /// Appends a field only if the value is present.
    pub fn field_opt(self, name: &'static str, value: Option<Value>) -> Self {
        match value {
            Some(value) => self.field(name, value),
            None => self,
        }
    }

    /// Appends a field in place (for loops and conditionals).
    pub fn push(&mut self, name: &'static str, value: Value) {
        self.fields.push(Field::new(name, value));
    }

    pub fn build(self) -> Value {
        Value::Fields(self.fields)
    }
}
