//! Error types for record decoding, encoding and registration.

use thiserror::Error;

use crate::model::{RecordId, Unit, ValueType};

/// Stable error codes carried by every [`RecordError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// R001: No descriptor for the identifier
    UnresolvedIdentifier,
    /// R002: Payload too short or too long
    InvalidLength,
    /// R003: Required dependency absent or failed
    MissingDependency,
    /// R004: Codec rejected the payload (or panicked)
    DecodeFailure,
    /// R005: Value cannot be encoded for this record
    EncodeFailure,
    /// R006: Record sits on a dependency cycle
    CyclicDependency,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "R001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::UnresolvedIdentifier => "R001",
            ErrorCode::InvalidLength => "R002",
            ErrorCode::MissingDependency => "R003",
            ErrorCode::DecodeFailure => "R004",
            ErrorCode::EncodeFailure => "R005",
            ErrorCode::CyclicDependency => "R006",
        }
    }
}

/// Why a single record could not be decoded or encoded.
///
/// This is the error half of a [`RecordResult`](crate::RecordResult). The
/// engine never returns it through `Err` on the batch path; it is always
/// stored next to the raw bytes of the record it belongs to.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    // === R001 ===
    #[error("[R001] no descriptor registered for record {id}")]
    UnresolvedIdentifier { id: RecordId },

    // === R002 ===
    #[error("[R002] insufficient data: need at least {min} bytes, got {actual}")]
    InsufficientData { min: usize, actual: usize },

    #[error("[R002] payload length {actual} exceeds maximum {max}")]
    PayloadTooLarge { max: usize, actual: usize },

    // === R003 ===
    #[error("[R003] required dependencies unavailable: {}", describe_unavailable(.missing, .failed))]
    MissingRequiredDependency {
        /// Required dependencies that were never decoded in this context.
        missing: Vec<RecordId>,
        /// Required dependencies that were decoded but failed.
        failed: Vec<RecordId>,
    },

    // === R004 ===
    #[error("[R004] decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("[R004] codec panicked: {message}")]
    DecodePanicked { message: String },

    #[error("[R004] decoded value has type {actual:?} but record declares {expected:?}")]
    UnexpectedValueType { expected: ValueType, actual: ValueType },

    #[error("[R004] decoded value is invalid: {reason}")]
    InvalidDecodedValue { reason: &'static str },

    // === R005 ===
    #[error("[R005] value type mismatch: record expects {expected:?}, got {actual:?}")]
    TypeMismatch { expected: ValueType, actual: ValueType },

    #[error("[R005] value is invalid: {reason}")]
    InvalidValue { reason: &'static str },

    #[error("[R005] encode failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("[R005] codec panicked while encoding: {message}")]
    EncodePanicked { message: String },

    // === R006 ===
    #[error("[R006] dependency cycle between {}", join_ids(.cycle))]
    CyclicDependency { cycle: Vec<RecordId> },
}

impl RecordError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            RecordError::UnresolvedIdentifier { .. } => ErrorCode::UnresolvedIdentifier,
            RecordError::InsufficientData { .. } | RecordError::PayloadTooLarge { .. } => {
                ErrorCode::InvalidLength
            }
            RecordError::MissingRequiredDependency { .. } => ErrorCode::MissingDependency,
            RecordError::Decode(_)
            | RecordError::DecodePanicked { .. }
            | RecordError::UnexpectedValueType { .. }
            | RecordError::InvalidDecodedValue { .. } => ErrorCode::DecodeFailure,
            RecordError::TypeMismatch { .. }
            | RecordError::InvalidValue { .. }
            | RecordError::Encode(_)
            | RecordError::EncodePanicked { .. } => ErrorCode::EncodeFailure,
            RecordError::CyclicDependency { .. } => ErrorCode::CyclicDependency,
        }
    }

    /// Identifiers this error names as unavailable dependencies, if any.
    pub fn unavailable_dependencies(&self) -> impl Iterator<Item = &RecordId> {
        let (missing, failed) = match self {
            RecordError::MissingRequiredDependency { missing, failed } => {
                (missing.as_slice(), failed.as_slice())
            }
            _ => (&[][..], &[][..]),
        };
        missing.iter().chain(failed.iter())
    }
}

fn join_ids(ids: &[RecordId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_unavailable(missing: &[RecordId], failed: &[RecordId]) -> String {
    match (missing.is_empty(), failed.is_empty()) {
        (false, true) => format!("missing {}", join_ids(missing)),
        (true, false) => format!("failed {}", join_ids(failed)),
        _ => format!("missing {}; failed {}", join_ids(missing), join_ids(failed)),
    }
}

/// Error raised by a record codec while parsing a payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("{count} unexpected trailing bytes")]
    TrailingBytes { count: usize },

    #[error("{field} uses reserved value {value:#x}")]
    ReservedValue { field: &'static str, value: u64 },

    #[error("{field} value {value} out of range [{min}, {max}]")]
    ValueOutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("reserved bits are non-zero in {context}")]
    ReservedBitsSet { context: &'static str },

    #[error("{context} has more than {max} elements")]
    LengthExceedsLimit { context: &'static str, max: usize },

    #[error("dependency {id} is not available")]
    DependencyUnavailable { id: RecordId },

    #[error("dependency {id} does not match: {reason}")]
    DependencyMismatch { id: RecordId, reason: String },

    #[error("malformed encoding: {context}")]
    MalformedEncoding { context: &'static str },

    #[error("{0}")]
    Other(String),
}

/// Error raised by a record codec while producing a payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("{field}: expected {expected:?} value, got {actual:?}")]
    UnsupportedValue {
        field: &'static str,
        expected: ValueType,
        actual: ValueType,
    },

    #[error("{field}: unit {unit:?} is not accepted")]
    UnsupportedUnit { field: &'static str, unit: Option<Unit> },

    #[error("missing field {field}")]
    MissingField { field: &'static str },

    #[error("{field} value {value} out of range [{min}, {max}]")]
    ValueOutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} is NaN")]
    FloatIsNan { field: &'static str },

    #[error("{field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("record {id} cannot be encoded")]
    NotEncodable { id: RecordId },

    #[error("{0}")]
    Other(String),
}

/// Value rejected by [`validate_value`](crate::validate::validate_value).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("expected {expected:?} value, got {actual:?}")]
    TypeMismatch { expected: ValueType, actual: ValueType },

    #[error("{reason}")]
    InvalidValue { reason: &'static str },
}

/// Error while populating a [`RegistryBuilder`](crate::RegistryBuilder).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("record {id} is already registered")]
    DuplicateIdentifier { id: RecordId },

    #[error("record name {name:?} is already registered")]
    DuplicateName { name: String },

    #[error("record {id} declares itself as a dependency")]
    SelfDependency { id: RecordId },

    #[error("record {id} declares {dependency} as both required and optional")]
    ConflictingDependency { id: RecordId, dependency: RecordId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let id = RecordId::from_u16(0x2A19);
        assert_eq!(RecordError::UnresolvedIdentifier { id }.code().code(), "R001");
        assert_eq!(
            RecordError::InsufficientData { min: 4, actual: 1 }.code(),
            ErrorCode::InvalidLength
        );
        assert_eq!(
            RecordError::Decode(DecodeError::TrailingBytes { count: 1 }).code().code(),
            "R004"
        );
        assert_eq!(
            RecordError::CyclicDependency { cycle: vec![id] }.code(),
            ErrorCode::CyclicDependency
        );
    }

    #[test]
    fn test_missing_dependency_message_names_ids() {
        let err = RecordError::MissingRequiredDependency {
            missing: vec![RecordId::from_u16(0x2A18)],
            failed: vec![],
        };
        let msg = err.to_string();
        assert!(msg.contains("0x2A18"), "{msg}");
        assert!(msg.contains("missing"), "{msg}");

        let err = RecordError::MissingRequiredDependency {
            missing: vec![RecordId::from_u16(0x2A18)],
            failed: vec![RecordId::from_u16(0x2A19)],
        };
        let msg = err.to_string();
        assert!(msg.contains("missing 0x2A18; failed 0x2A19"), "{msg}");
        assert_eq!(err.unavailable_dependencies().count(), 2);
    }

    #[test]
    fn test_decode_error_wraps_cause() {
        let err: RecordError = DecodeError::UnexpectedEof { context: "flags" }.into();
        assert!(err.to_string().contains("unexpected end of input while reading flags"));
    }
}
