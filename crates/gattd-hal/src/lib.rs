//! Hardware abstraction boundary for the gattd BLE service layer
//!
//! This crate owns everything that crosses the line between the service
//! layer and the Bluetooth hardware:
//!
//! - [`types`] - status codes, hardware-assigned identifiers, device
//!   addresses and the advertising parameter block
//! - [`events`] - the hardware callback table as two closed event enums,
//!   one per observer role
//! - [`interface`] - the [`GattHal`] command trait and the
//!   [`GattInterface`] multiplexer that fans raw hardware events out to
//!   registered observers
//! - [`fake`] - a scripted [`FakeGattHal`](fake::FakeGattHal) double,
//!   available to downstream test suites through the `testing` feature
//!
//! The hardware invokes callbacks on threads this crate does not control;
//! see [`interface`] for the ownership model that makes teardown races
//! impossible rather than merely unlikely.

mod events;
mod interface;
mod types;

#[cfg(any(test, feature = "testing"))]
pub mod fake;

pub use events::{ClientEvent, ServerEvent};
pub use interface::{
    ClientObserver, GattEventSink, GattHal, GattInterface, HalError, ObserverList, ServerObserver,
};
pub use types::{AdvertiseEventType, AdvertiseParams, BdAddr, BtStatus, ClientId, ServerId};
