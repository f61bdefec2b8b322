//! Security limits and wire constants.
//!
//! Record payloads arrive straight off the radio, so every length the
//! engine accepts is bounded here.

/// Maximum length of a single attribute value (ATT protocol limit).
pub const MAX_RECORD_LEN: usize = 512;

/// Maximum number of elements a codec may produce for one list field.
pub const MAX_LIST_LEN: usize = 256;

/// Bluetooth Base UUID (`00000000-0000-1000-8000-00805F9B34FB`).
///
/// SIG-assigned 16-bit identifiers are embedded in bytes 2..4.
pub const BLUETOOTH_BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5F9B_34FB;

/// Mask selecting every bit of a base UUID except the 16-bit short id.
pub const BLUETOOTH_BASE_MASK: u128 = 0xFFFF_0000_FFFF_FFFF_FFFF_FFFF_FFFF_FFFF;

/// Standard prefix of characteristic names in the SIG assigned-numbers registry.
pub const CHARACTERISTIC_NAME_PREFIX: &str = "org.bluetooth.characteristic.";
