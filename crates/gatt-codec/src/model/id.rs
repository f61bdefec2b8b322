//! Record identifiers.
//!
//! Every record type is identified by a 128-bit UUID. Records assigned by
//! the Bluetooth SIG live on the Bluetooth Base UUID and are usually written
//! in their 16-bit short form (`0x2A19` for Battery Level).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use uuid::Uuid;

use crate::limits::{BLUETOOTH_BASE_MASK, BLUETOOTH_BASE_UUID};

/// Identifier of one record type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Expands a SIG 16-bit short identifier onto the Bluetooth Base UUID.
    pub const fn from_u16(short: u16) -> Self {
        Self::from_u32(short as u32)
    }

    /// Expands a SIG 32-bit identifier onto the Bluetooth Base UUID.
    pub const fn from_u32(value: u32) -> Self {
        RecordId(Uuid::from_u128(BLUETOOTH_BASE_UUID | ((value as u128) << 96)))
    }

    /// Wraps a full 128-bit UUID (vendor-specific records).
    pub const fn from_uuid(uuid: Uuid) -> Self {
        RecordId(uuid)
    }

    /// Returns the full UUID.
    pub const fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns the 16-bit short form when this id lies on the Bluetooth Base UUID.
    pub fn short(&self) -> Option<u16> {
        let value = self.0.as_u128();
        if value & BLUETOOTH_BASE_MASK == BLUETOOTH_BASE_UUID {
            Some((value >> 96) as u16)
        } else {
            None
        }
    }

    /// Returns true if this is a SIG-assigned (base UUID) identifier.
    pub fn is_sig_assigned(&self) -> bool {
        self.short().is_some()
    }

    /// Parses `"2A19"`, `"0x2A19"`, `"00002A19"` or any UUID string form.
    pub fn parse(s: &str) -> Option<RecordId> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        let is_hex = digits.bytes().all(|b| b.is_ascii_hexdigit());
        match digits.len() {
            // from_str_radix alone would take a leading sign
            4 if is_hex => u16::from_str_radix(digits, 16).ok().map(RecordId::from_u16),
            8 if is_hex => u32::from_str_radix(digits, 16).ok().map(RecordId::from_u32),
            4 | 8 => None,
            _ => Uuid::parse_str(s).ok().map(RecordId),
        }
    }
}

impl From<u16> for RecordId {
    fn from(short: u16) -> Self {
        RecordId::from_u16(short)
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        RecordId(uuid)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.short() {
            Some(short) => write!(f, "0x{:04X}", short),
            None => write!(f, "{}", self.0.hyphenated()),
        }
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self)
    }
}

/// Error returned when a string is not a recognisable record identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid record identifier: {input:?}")]
pub struct ParseRecordIdError {
    pub input: String,
}

impl FromStr for RecordId {
    type Err = ParseRecordIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s).ok_or_else(|| ParseRecordIdError {
            input: s.to_string(),
        })
    }
}

/// Type-level handle for a record whose identifier is known at compile time.
///
/// Lets a descriptor declare a dependency on another record by type instead
/// of repeating its identifier:
///
/// ```rust
/// use gatt_codec::catalog::GlucoseMeasurement;
/// use gatt_codec::model::KnownRecord;
///
/// assert_eq!(GlucoseMeasurement::ID.short(), Some(0x2A18));
/// ```
pub trait KnownRecord {
    /// Identifier of the record.
    const ID: RecordId;
    /// Human-readable record name.
    const NAME: &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_form_roundtrip() {
        let id = RecordId::from_u16(0x2A19);
        assert_eq!(id.short(), Some(0x2A19));
        assert!(id.is_sig_assigned());
        assert_eq!(
            id.uuid().hyphenated().to_string(),
            "00002a19-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_vendor_uuid_has_no_short_form() {
        let uuid = Uuid::parse_str("6e400001-b5a3-f393-e0a9-e50e24dcca9e").unwrap();
        let id = RecordId::from_uuid(uuid);
        assert_eq!(id.short(), None);
        assert_eq!(id.to_string(), "6e400001-b5a3-f393-e0a9-e50e24dcca9e");
    }

    #[test]
    fn test_u32_form_outside_short_range() {
        let id = RecordId::from_u32(0x0001_2A19);
        assert_eq!(id.short(), None);
        assert_eq!(RecordId::from_u32(0x2A19), RecordId::from_u16(0x2A19));
    }

    #[test]
    fn test_parse_forms() {
        let expected = RecordId::from_u16(0x2A19);
        for s in [
            "2A19",
            "2a19",
            "0x2A19",
            "0X2a19",
            "00002A19",
            " 0x2A19 ",
            "00002a19-0000-1000-8000-00805f9b34fb",
            "00002a1900001000800000805f9b34fb",
        ] {
            assert_eq!(RecordId::parse(s), Some(expected), "failed for {:?}", s);
        }
        assert_eq!(RecordId::parse("xyz"), None);
        assert_eq!(RecordId::parse("2A1"), None);
        assert!("nope".parse::<RecordId>().is_err());
    }

    #[test]
    fn test_parse_rejects_signs() {
        for s in ["0x+A19", "+A19", "-A19", "+0002A19", "0x-002A19"] {
            assert_eq!(RecordId::parse(s), None, "accepted {:?}", s);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(RecordId::from_u16(0x2A37).to_string(), "0x2A37");
        assert_eq!(format!("{:?}", RecordId::from_u16(0x2A37)), "RecordId(0x2A37)");
    }
}
