//! Primitive types crossing the HAL boundary
//!
//! Everything here is plain data: status codes, hardware-assigned identifiers,
//! device addresses and the advertising parameter block. Newtypes are used so
//! that a client identifier can never be confused with a connection or
//! attribute handle.

use core::fmt;

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Hardware Status
// ----------------------------------------------------------------------------

/// Status codes reported by the hardware layer.
///
/// The service layer collapses these to a simple success/failure verdict
/// before surfacing them to callers; the richer code is kept only so that
/// failures can be logged with the value the hardware actually reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BtStatus {
    Success,
    Fail,
    NotReady,
    NoMem,
    Busy,
    Unsupported,
}

impl BtStatus {
    /// Whether this code reports success.
    pub fn is_success(self) -> bool {
        self == BtStatus::Success
    }
}

impl fmt::Display for BtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BtStatus::Success => "success",
            BtStatus::Fail => "fail",
            BtStatus::NotReady => "not-ready",
            BtStatus::NoMem => "no-mem",
            BtStatus::Busy => "busy",
            BtStatus::Unsupported => "unsupported",
        };
        write!(f, "{name}")
    }
}

// ----------------------------------------------------------------------------
// Hardware-Assigned Identifiers
// ----------------------------------------------------------------------------

/// Client-role interface identifier assigned by the hardware on registration.
///
/// Unknown until the registration callback delivers it; immutable for the
/// lifetime of the registered client afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(i32);

impl ClientId {
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-role interface identifier, the server-side counterpart of
/// [`ClientId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServerId(i32);

impl ServerId {
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Device Address
// ----------------------------------------------------------------------------

/// 48-bit Bluetooth device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BdAddr([u8; 6]);

impl BdAddr {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

// ----------------------------------------------------------------------------
// Advertising Parameters
// ----------------------------------------------------------------------------

/// Advertising event type codes understood by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvertiseEventType {
    /// Connectable undirected advertising (ADV_IND).
    Connectable,
    /// Scannable undirected advertising (ADV_SCAN_IND).
    Scannable,
    /// Non-connectable undirected advertising (ADV_NONCONN_IND).
    NonConnectable,
}

impl AdvertiseEventType {
    /// The raw event type code passed to the controller.
    pub fn code(self) -> u8 {
        match self {
            AdvertiseEventType::Connectable => 0x00,
            AdvertiseEventType::Scannable => 0x02,
            AdvertiseEventType::NonConnectable => 0x03,
        }
    }
}

/// Parameter block for an enable-advertising command.
///
/// Intervals are in 0.625 ms units. This is the already-translated form; the
/// service layer owns the mapping from user-facing settings to these codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertiseParams {
    pub min_interval: u16,
    pub max_interval: u16,
    pub event_type: AdvertiseEventType,
    pub channel_map: u8,
    pub tx_power_dbm: i8,
    pub timeout_s: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_success() {
        assert!(BtStatus::Success.is_success());
        assert!(!BtStatus::Fail.is_success());
        assert!(!BtStatus::Busy.is_success());
    }

    #[test]
    fn test_event_type_codes() {
        assert_eq!(AdvertiseEventType::Connectable.code(), 0x00);
        assert_eq!(AdvertiseEventType::Scannable.code(), 0x02);
        assert_eq!(AdvertiseEventType::NonConnectable.code(), 0x03);
    }

    #[test]
    fn test_bd_addr_display() {
        let addr = BdAddr::new([0xab, 0xcd, 0xef, 0x01, 0x02, 0x03]);
        assert_eq!(addr.to_string(), "abcdef010203");
    }
}
