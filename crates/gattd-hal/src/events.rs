//! Typed hardware events
//!
//! The raw callback table of the hardware layer is modeled as two closed
//! enums, one per observer role. Observers match on the variants they care
//! about and fall through for the rest, which is how an unimplemented
//! callback slot defaults to a no-op.

use uuid::Uuid;

use crate::types::{BdAddr, BtStatus, ClientId, ServerId};

// ----------------------------------------------------------------------------
// Client-Role Events
// ----------------------------------------------------------------------------

/// Events delivered to client-role observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A register-client command completed. `app_uuid` echoes the identifier
    /// the application chose; `client_id` is only meaningful on success.
    ClientRegistered {
        status: BtStatus,
        client_id: ClientId,
        app_uuid: Uuid,
    },
    /// Acknowledgement for an enable-advertising command.
    AdvertiseEnabled { client_id: ClientId, status: BtStatus },
    /// Acknowledgement for a set-advertise-data command (advertising payload
    /// or scan response, whichever was last issued for this client).
    AdvertiseDataSet { client_id: ClientId, status: BtStatus },
    /// Acknowledgement for a disable-advertising command.
    AdvertiseDisabled { client_id: ClientId, status: BtStatus },
}

// ----------------------------------------------------------------------------
// Server-Role Events
// ----------------------------------------------------------------------------

/// Events delivered to server-role observers.
///
/// Only the dispatch plumbing is provided here; attribute-table semantics
/// live with whatever observer chooses to handle these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    ServerRegistered {
        status: BtStatus,
        server_id: ServerId,
        app_uuid: Uuid,
    },
    Connection {
        conn_id: i32,
        server_id: ServerId,
        connected: bool,
        address: BdAddr,
    },
    ServiceAdded {
        status: BtStatus,
        server_id: ServerId,
        service_handle: u16,
    },
    ServiceStarted {
        status: BtStatus,
        server_id: ServerId,
        service_handle: u16,
    },
    ServiceStopped {
        status: BtStatus,
        server_id: ServerId,
        service_handle: u16,
    },
    ReadRequest {
        conn_id: i32,
        trans_id: i32,
        address: BdAddr,
        attribute_handle: u16,
        offset: u16,
        is_long: bool,
    },
    WriteRequest {
        conn_id: i32,
        trans_id: i32,
        address: BdAddr,
        attribute_handle: u16,
        offset: u16,
        need_response: bool,
        is_prepare: bool,
        value: Vec<u8>,
    },
    ExecuteWriteRequest {
        conn_id: i32,
        trans_id: i32,
        address: BdAddr,
        execute: bool,
    },
}
