//! Caller-facing operation status

use core::fmt;

use gattd_hal::BtStatus;

// ----------------------------------------------------------------------------
// Status
// ----------------------------------------------------------------------------

/// The closed status set surfaced to service callers. The richer hardware
/// codes collapse to this at the service boundary; callers who need the raw
/// code can find it in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleStatus {
    Success,
    Failure,
}

impl BleStatus {
    pub fn is_success(self) -> bool {
        self == BleStatus::Success
    }
}

impl From<BtStatus> for BleStatus {
    fn from(status: BtStatus) -> Self {
        if status.is_success() {
            BleStatus::Success
        } else {
            BleStatus::Failure
        }
    }
}

impl fmt::Display for BleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BleStatus::Success => write!(f, "success"),
            BleStatus::Failure => write!(f, "failure"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse() {
        assert_eq!(BleStatus::from(BtStatus::Success), BleStatus::Success);
        assert_eq!(BleStatus::from(BtStatus::Fail), BleStatus::Failure);
        assert_eq!(BleStatus::from(BtStatus::NotReady), BleStatus::Failure);
        assert_eq!(BleStatus::from(BtStatus::Busy), BleStatus::Failure);
    }
}
