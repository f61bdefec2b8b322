//! Outcome of one decode attempt.

use std::borrow::Cow;
use std::fmt;

use crate::error::RecordError;
use crate::model::{RecordDescriptor, RecordId, Value, ValueType};

/// The result of decoding one record.
///
/// Holds the raw bytes verbatim alongside either the decoded value or the
/// error. The `Result` inside makes "exactly one of value / error" hold by
/// construction. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordResult {
    id: RecordId,
    name: Option<Cow<'static, str>>,
    expected_type: Option<ValueType>,
    raw: Vec<u8>,
    outcome: Result<Value, RecordError>,
}

impl RecordResult {
    /// A successful result without descriptor metadata.
    pub fn ok(id: RecordId, raw: Vec<u8>, value: Value) -> Self {
        Self {
            id,
            name: None,
            expected_type: None,
            raw,
            outcome: Ok(value),
        }
    }

    /// A failed result without descriptor metadata.
    pub fn err(id: RecordId, raw: Vec<u8>, error: RecordError) -> Self {
        Self {
            id,
            name: None,
            expected_type: None,
            raw,
            outcome: Err(error),
        }
    }

    /// A result echoing the descriptor's metadata.
    pub(crate) fn from_descriptor(
        descriptor: &RecordDescriptor,
        raw: Vec<u8>,
        outcome: Result<Value, RecordError>,
    ) -> Self {
        Self {
            id: descriptor.id,
            name: Some(descriptor.name.clone()),
            expected_type: Some(descriptor.expected_type),
            raw,
            outcome,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Name of the record type, if a descriptor was resolved.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Expected value type declared by the descriptor, if one was resolved.
    pub fn expected_type(&self) -> Option<ValueType> {
        self.expected_type
    }

    /// The input bytes, verbatim.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Decoded value; present iff [`success`](Self::success).
    pub fn value(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    /// Failure; present iff not [`success`](Self::success).
    pub fn error(&self) -> Option<&RecordError> {
        self.outcome.as_ref().err()
    }

    /// Human-readable error description.
    pub fn error_message(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }

    pub fn outcome(&self) -> &Result<Value, RecordError> {
        &self.outcome
    }

    pub fn into_outcome(self) -> Result<Value, RecordError> {
        self.outcome
    }
}

impl fmt::Display for RecordResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if let Some(name) = &self.name {
            write!(f, " ({})", name)?;
        }
        match &self.outcome {
            Ok(value) => write!(f, ": {:?}", value),
            Err(err) => write!(f, ": {}", err),
        }
    }
}
