//! Advertising payloads

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Link-layer budget for a legacy advertising or scan-response payload.
pub const MAX_ADVERTISING_PAYLOAD: usize = 31;

/// AD type for the Flags field, which the stack owns.
const FLAGS_AD_TYPE: u8 = 0x01;

// ----------------------------------------------------------------------------
// Advertise Data
// ----------------------------------------------------------------------------

/// One advertising or scan-response payload.
///
/// `data` is the raw sequence of length-prefixed AD fields. The structure is
/// checked at the API boundary (see [`AdvertiseData::validate`]); the
/// contents of individual fields are the stack's business, not ours. The two
/// include flags ask the stack to append the device name or transmit power
/// on the payload's behalf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertiseData {
    data: Vec<u8>,
    include_device_name: bool,
    include_tx_power: bool,
}

impl AdvertiseData {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            include_device_name: false,
            include_tx_power: false,
        }
    }

    /// Ask the stack to append the device name.
    pub fn with_device_name(mut self, include: bool) -> Self {
        self.include_device_name = include;
        self
    }

    /// Ask the stack to append the transmit power level.
    pub fn with_tx_power(mut self, include: bool) -> Self {
        self.include_tx_power = include;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn include_device_name(&self) -> bool {
        self.include_device_name
    }

    pub fn include_tx_power(&self) -> bool {
        self.include_tx_power
    }

    /// Whether this payload carries nothing at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && !self.include_device_name && !self.include_tx_power
    }

    /// Structural validity of the raw payload: it must fit the link-layer
    /// budget, every length-prefixed field must stay inside the payload and
    /// be non-empty, and the Flags field is reserved for the stack.
    pub fn validate(&self) -> core::result::Result<(), &'static str> {
        if self.data.len() > MAX_ADVERTISING_PAYLOAD {
            return Err("payload exceeds the 31 byte advertising budget");
        }

        let mut i = 0;
        while i < self.data.len() {
            let field_len = self.data[i] as usize;
            if field_len == 0 || i + field_len >= self.data.len() {
                return Err("malformed length-prefixed field");
            }
            if self.data[i + 1] == FLAGS_AD_TYPE {
                return Err("the flags field is set by the stack");
            }
            i += field_len + 1;
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MANUFACTURER_SPECIFIC: u8 = 0xff;

    #[test]
    fn test_empty_payload_valid() {
        assert!(AdvertiseData::default().is_valid());
        assert!(AdvertiseData::default().is_empty());
    }

    #[test]
    fn test_well_formed_field_valid() {
        let data = AdvertiseData::new(vec![0x04, MANUFACTURER_SPECIFIC, 0x01, 0x02, 0x00]);
        assert!(data.is_valid());
        assert!(!data.is_empty());
    }

    #[test]
    fn test_flags_field_rejected() {
        let data = AdvertiseData::new(vec![0x02, 0x01, 0x00]);
        assert_eq!(data.validate(), Err("the flags field is set by the stack"));
    }

    #[test]
    fn test_short_field_content_is_stacks_problem() {
        // A one-byte manufacturer field is nonsense content but sound
        // structure; the stack gets to reject it, not us.
        let data = AdvertiseData::new(vec![0x01, MANUFACTURER_SPECIFIC]);
        assert!(data.is_valid());
    }

    #[test]
    fn test_truncated_field_rejected() {
        let data = AdvertiseData::new(vec![0x04, MANUFACTURER_SPECIFIC, 0x01]);
        assert!(!data.is_valid());
    }

    #[test]
    fn test_zero_length_field_rejected() {
        let data = AdvertiseData::new(vec![0x00, 0x02, MANUFACTURER_SPECIFIC, 0x01]);
        assert!(!data.is_valid());
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let mut raw = vec![31, MANUFACTURER_SPECIFIC];
        raw.extend(std::iter::repeat(0u8).take(30));
        assert_eq!(raw.len(), 32);
        let data = AdvertiseData::new(raw);
        assert_eq!(
            data.validate(),
            Err("payload exceeds the 31 byte advertising budget")
        );
    }

    #[test]
    fn test_full_budget_payload_valid() {
        let mut raw = vec![30, MANUFACTURER_SPECIFIC];
        raw.extend(std::iter::repeat(0u8).take(29));
        assert_eq!(raw.len(), 31);
        assert!(AdvertiseData::new(raw).is_valid());
    }

    #[test]
    fn test_include_flags_count_as_content() {
        let data = AdvertiseData::default().with_tx_power(true);
        assert!(!data.is_empty());
        assert!(data.is_valid());
    }
}
