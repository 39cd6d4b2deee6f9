//! Advertising settings and their translation to hardware parameters
//!
//! The translation is a pure table lookup: settings in, parameter codes out.
//! Nothing here touches the state machine.

use std::time::Duration;

use gattd_hal::{AdvertiseEventType, AdvertiseParams};
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

// Advertising intervals in 0.625 ms units.
const INTERVAL_LOW_POWER_UNITS: u16 = 1600; // 1 s
const INTERVAL_BALANCED_UNITS: u16 = 400; // 250 ms
const INTERVAL_LOW_LATENCY_UNITS: u16 = 160; // 100 ms

/// Spread between the minimum and maximum interval handed to the controller.
const INTERVAL_DELTA_UNITS: u16 = 10;

/// All three advertising channels (37, 38, 39).
const CHANNEL_MAP_ALL: u8 = 0x07;

// ----------------------------------------------------------------------------
// Settings
// ----------------------------------------------------------------------------

/// Trade-off between discovery latency and power draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvertiseMode {
    LowPower,
    Balanced,
    LowLatency,
}

impl AdvertiseMode {
    fn interval_units(self) -> u16 {
        match self {
            AdvertiseMode::LowPower => INTERVAL_LOW_POWER_UNITS,
            AdvertiseMode::Balanced => INTERVAL_BALANCED_UNITS,
            AdvertiseMode::LowLatency => INTERVAL_LOW_LATENCY_UNITS,
        }
    }
}

/// Transmit power level for advertisements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxPowerLevel {
    UltraLow,
    Low,
    Medium,
    High,
}

impl TxPowerLevel {
    fn dbm(self) -> i8 {
        match self {
            TxPowerLevel::UltraLow => -21,
            TxPowerLevel::Low => -15,
            TxPowerLevel::Medium => -7,
            TxPowerLevel::High => 1,
        }
    }
}

/// User-facing advertising settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertiseSettings {
    pub mode: AdvertiseMode,
    pub tx_power_level: TxPowerLevel,
    pub timeout: Duration,
    pub connectable: bool,
}

impl Default for AdvertiseSettings {
    fn default() -> Self {
        Self {
            mode: AdvertiseMode::LowPower,
            tx_power_level: TxPowerLevel::Medium,
            timeout: Duration::ZERO,
            connectable: true,
        }
    }
}

impl AdvertiseSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: AdvertiseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_tx_power_level(mut self, level: TxPowerLevel) -> Self {
        self.tx_power_level = level;
        self
    }

    /// Zero means no timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connectable(mut self, connectable: bool) -> Self {
        self.connectable = connectable;
        self
    }

    /// Translate to the parameter block the hardware takes. Whether a scan
    /// response payload exists decides between scannable and non-connectable
    /// event types for a non-connectable advertiser.
    pub fn to_params(&self, has_scan_response: bool) -> AdvertiseParams {
        let min_interval = self.mode.interval_units();
        AdvertiseParams {
            min_interval,
            max_interval: min_interval + INTERVAL_DELTA_UNITS,
            event_type: advertise_event_type(self, has_scan_response),
            channel_map: CHANNEL_MAP_ALL,
            tx_power_dbm: self.tx_power_level.dbm(),
            timeout_s: self.timeout.as_secs().min(u16::MAX as u64) as u16,
        }
    }
}

/// Event type for the given settings.
pub fn advertise_event_type(
    settings: &AdvertiseSettings,
    has_scan_response: bool,
) -> AdvertiseEventType {
    if settings.connectable {
        AdvertiseEventType::Connectable
    } else if has_scan_response {
        AdvertiseEventType::Scannable
    } else {
        AdvertiseEventType::NonConnectable
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
