//! Service layer for BLE GAP client operations
//!
//! This crate sits between applications and the hardware boundary exposed
//! by `gattd-hal`. It turns the raw fire-and-confirm hardware interface
//! into per-application handles with real state machines behind them:
//!
//! - [`LowEnergyClientFactory`] registers applications with the stack and
//!   hands each a [`LowEnergyClient`] bound to its hardware-assigned
//!   identifier
//! - [`LowEnergyClient`] drives the advertising lifecycle - start, payload
//!   updates, stop - and keeps the hardware's single-threaded command
//!   protocol honest under concurrent callers
//! - [`AdvertiseSettings`] and [`AdvertiseData`] describe what to
//!   broadcast, validated at the API boundary before anything reaches the
//!   hardware
//!
//! Accepted calls complete asynchronously through single-shot completions
//! invoked on the hardware callback thread; rejected calls return an error
//! and leave no state behind.

mod advertise_data;
mod advertise_settings;
mod error;
mod low_energy_client;
mod status;

pub use advertise_data::{AdvertiseData, MAX_ADVERTISING_PAYLOAD};
pub use advertise_settings::{
    advertise_event_type, AdvertiseMode, AdvertiseSettings, TxPowerLevel,
};
pub use error::{GattServiceError, Result};
pub use low_energy_client::{
    LowEnergyClient, LowEnergyClientFactory, RegisterCallback, StatusCallback,
};
pub use status::BleStatus;
