//! Error types for the service layer

use gattd_hal::BtStatus;
use thiserror::Error;
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Synchronous rejections of service-layer calls.
///
/// An `Err` means the call was refused before anything was committed: no
/// completion will ever fire for the attempt and no state changed. The real
/// outcome of an accepted call always arrives later through its completion.
#[derive(Error, Debug)]
pub enum GattServiceError {
    #[error("a registration is already pending for {0}")]
    RegistrationPending(Uuid),

    #[error("an advertising operation is already in flight")]
    OperationPending,

    #[error("advertising has not been started")]
    NotAdvertising,

    #[error("advertising is already started")]
    AlreadyAdvertising,

    #[error("invalid advertising payload: {0}")]
    InvalidAdvertiseData(&'static str),

    #[error("hardware call rejected: {0}")]
    HalRejected(BtStatus),
}

pub type Result<T> = core::result::Result<T, GattServiceError>;
