//! Scripted hardware double for tests
//!
//! [`FakeGattHal`] records every command issued against it, answers each
//! with a scripted status (success unless a result was queued), and lets a
//! test inject hardware events into the installed sink on the test's own
//! thread, which stands in for the hardware callback thread.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;
use uuid::Uuid;

use crate::events::{ClientEvent, ServerEvent};
use crate::interface::{GattEventSink, GattHal};
use crate::types::{AdvertiseParams, BtStatus, ClientId};

// ----------------------------------------------------------------------------
// Recorded Commands
// ----------------------------------------------------------------------------

/// One command the service layer issued against the fake.
#[derive(Debug, Clone, PartialEq)]
pub enum HalCommand {
    RegisterClient {
        app_uuid: Uuid,
    },
    UnregisterClient {
        client_id: ClientId,
    },
    EnableAdvertising {
        client_id: ClientId,
        params: AdvertiseParams,
    },
    SetAdvertiseData {
        client_id: ClientId,
        set_scan_rsp: bool,
        data: Vec<u8>,
        include_device_name: bool,
        include_tx_power: bool,
    },
    DisableAdvertising {
        client_id: ClientId,
    },
}

/// Command discriminant, used to queue scripted results and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    RegisterClient,
    UnregisterClient,
    EnableAdvertising,
    SetAdvertiseData,
    DisableAdvertising,
}

impl HalCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            HalCommand::RegisterClient { .. } => CommandKind::RegisterClient,
            HalCommand::UnregisterClient { .. } => CommandKind::UnregisterClient,
            HalCommand::EnableAdvertising { .. } => CommandKind::EnableAdvertising,
            HalCommand::SetAdvertiseData { .. } => CommandKind::SetAdvertiseData,
            HalCommand::DisableAdvertising { .. } => CommandKind::DisableAdvertising,
        }
    }
}

// ----------------------------------------------------------------------------
// Fake HAL
// ----------------------------------------------------------------------------

#[derive(Default)]
struct FakeState {
    sink: Option<Arc<dyn GattEventSink>>,
    commands: Vec<HalCommand>,
    scripted: HashMap<CommandKind, VecDeque<BtStatus>>,
}

/// In-memory [`GattHal`] double.
#[derive(Default)]
pub struct FakeGattHal {
    state: Mutex<FakeState>,
}

impl FakeGattHal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the status the next command of `kind` will return. Unqueued
    /// commands succeed.
    pub fn queue_result(&self, kind: CommandKind, status: BtStatus) {
        self.lock().scripted.entry(kind).or_default().push_back(status);
    }

    /// Every command issued so far, in order.
    pub fn commands(&self) -> Vec<HalCommand> {
        self.lock().commands.clone()
    }

    /// Drain the recorded commands.
    pub fn take_commands(&self) -> Vec<HalCommand> {
        std::mem::take(&mut self.lock().commands)
    }

    /// How many commands of `kind` have been issued so far.
    pub fn command_count(&self, kind: CommandKind) -> usize {
        self.lock()
            .commands
            .iter()
            .filter(|command| command.kind() == kind)
            .count()
    }

    /// The currently installed event sink, if the interface is open.
    pub fn sink(&self) -> Option<Arc<dyn GattEventSink>> {
        self.lock().sink.clone()
    }

    /// Inject a client-registered event, as the hardware would after a
    /// register-client command.
    pub fn notify_client_registered(&self, status: BtStatus, client_id: ClientId, app_uuid: Uuid) {
        self.notify_client_event(ClientEvent::ClientRegistered {
            status,
            client_id,
            app_uuid,
        });
    }

    pub fn notify_advertise_enabled(&self, client_id: ClientId, status: BtStatus) {
        self.notify_client_event(ClientEvent::AdvertiseEnabled { client_id, status });
    }

    pub fn notify_advertise_data_set(&self, client_id: ClientId, status: BtStatus) {
        self.notify_client_event(ClientEvent::AdvertiseDataSet { client_id, status });
    }

    pub fn notify_advertise_disabled(&self, client_id: ClientId, status: BtStatus) {
        self.notify_client_event(ClientEvent::AdvertiseDisabled { client_id, status });
    }

    /// Inject an arbitrary client-role event.
    pub fn notify_client_event(&self, event: ClientEvent) {
        // The sink is invoked outside the state lock: dispatch may issue
        // further commands against this fake re-entrantly.
        match self.sink() {
            Some(sink) => sink.client_event(event),
            None => warn!(?event, "no sink installed, dropping injected event"),
        }
    }

    /// Inject an arbitrary server-role event.
    pub fn notify_server_event(&self, event: ServerEvent) {
        match self.sink() {
            Some(sink) => sink.server_event(event),
            None => warn!(?event, "no sink installed, dropping injected event"),
        }
    }

    fn record(&self, command: HalCommand) -> Result<(), BtStatus> {
        let mut state = self.lock();
        let kind = command.kind();
        state.commands.push(command);
        let status = state
            .scripted
            .get_mut(&kind)
            .and_then(VecDeque::pop_front)
            .unwrap_or(BtStatus::Success);
        if status.is_success() {
            Ok(())
        } else {
            Err(status)
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake hal state lock poisoned")
    }
}

impl GattHal for FakeGattHal {
    fn open(&self, sink: Arc<dyn GattEventSink>) -> Result<(), BtStatus> {
        let mut state = self.lock();
        if state.sink.is_some() {
            return Err(BtStatus::Busy);
        }
        state.sink = Some(sink);
        Ok(())
    }

    fn close(&self) {
        self.lock().sink = None;
    }

    fn register_client(&self, app_uuid: Uuid) -> Result<(), BtStatus> {
        self.record(HalCommand::RegisterClient { app_uuid })
    }

    fn unregister_client(&self, client_id: ClientId) -> Result<(), BtStatus> {
        self.record(HalCommand::UnregisterClient { client_id })
    }

    fn enable_advertising(
        &self,
        client_id: ClientId,
        params: &AdvertiseParams,
    ) -> Result<(), BtStatus> {
        self.record(HalCommand::EnableAdvertising {
            client_id,
            params: *params,
        })
    }

    fn set_advertise_data(
        &self,
        client_id: ClientId,
        set_scan_rsp: bool,
        data: &[u8],
        include_device_name: bool,
        include_tx_power: bool,
    ) -> Result<(), BtStatus> {
        self.record(HalCommand::SetAdvertiseData {
            client_id,
            set_scan_rsp,
            data: data.to_vec(),
            include_device_name,
            include_tx_power,
        })
    }

    fn disable_advertising(&self, client_id: ClientId) -> Result<(), BtStatus> {
        self.record(HalCommand::DisableAdvertising { client_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_results_consumed_in_order() {
        let fake = FakeGattHal::new();
        fake.queue_result(CommandKind::RegisterClient, BtStatus::Fail);
        fake.queue_result(CommandKind::RegisterClient, BtStatus::Busy);

        let uuid = Uuid::new_v4();
        assert_eq!(fake.register_client(uuid), Err(BtStatus::Fail));
        assert_eq!(fake.register_client(uuid), Err(BtStatus::Busy));
        assert_eq!(fake.register_client(uuid), Ok(()));
        assert_eq!(fake.command_count(CommandKind::RegisterClient), 3);
    }

    #[test]
    fn test_rejected_commands_still_recorded() {
        let fake = FakeGattHal::new();
        fake.queue_result(CommandKind::DisableAdvertising, BtStatus::Fail);
        assert_eq!(
            fake.disable_advertising(ClientId::new(2)),
            Err(BtStatus::Fail)
        );
        assert_eq!(
            fake.take_commands(),
            vec![HalCommand::DisableAdvertising {
                client_id: ClientId::new(2)
            }]
        );
        assert!(fake.commands().is_empty());
    }

    #[test]
    fn test_notify_without_sink_is_harmless() {
        let fake = FakeGattHal::new();
        fake.notify_advertise_enabled(ClientId::new(1), BtStatus::Success);
    }
}
