//! Client registration and the per-client advertising state machine
//!
//! [`LowEnergyClientFactory`] owns the map of registrations awaiting their
//! hardware-assigned identifier; [`LowEnergyClient`] is the handle it
//! constructs once that identifier arrives, carrying the advertising state
//! machine for that one client.
//!
//! Every operation here is fire-and-confirm: the call returns an immediate
//! accepted/rejected verdict and the real outcome arrives later through a
//! completion invoked on the hardware callback thread. Completions are
//! single-shot by construction (`FnOnce` taken out of its slot) and are
//! always invoked after the internal locks are released, so a completion may
//! immediately call back into the service layer.
//!
//! A hardware call that is accepted but never acknowledged leaves the state
//! machine parked in its transitional state; no timeout is imposed here.
//! If that needs a policy, it belongs to the layer that owns user intent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use gattd_hal::{BtStatus, ClientEvent, ClientId, ClientObserver, GattInterface};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::advertise_data::AdvertiseData;
use crate::advertise_settings::AdvertiseSettings;
use crate::error::{GattServiceError, Result};
use crate::status::BleStatus;

/// Completion for a start/stop/update operation.
pub type StatusCallback = Box<dyn FnOnce(BleStatus) + Send>;

/// Completion for a registration. On success the client handle is passed to
/// the caller, who takes ownership of it.
pub type RegisterCallback = Box<dyn FnOnce(BleStatus, Uuid, Option<Arc<LowEnergyClient>>) + Send>;

// ----------------------------------------------------------------------------
// Advertising Session
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdvState {
    Idle,
    Starting,
    Started,
    Stopping,
}

/// What happened when the session tried to push the next queued payload.
enum PumpOutcome {
    /// A set-data command is now in flight.
    Issued,
    /// The hardware refused the command synchronously.
    Rejected(BtStatus),
    /// Both slots were empty.
    Drained,
}

/// Mutable advertising state for one client, guarded by the client's lock.
///
/// The two pending slots form the dirty queue: the advertising payload is
/// always flushed before the scan response, and overwriting a slot while a
/// set-data command is in flight coalesces rapid updates into a single
/// trailing command.
struct AdvertisingSession {
    state: AdvState,
    settings: AdvertiseSettings,
    advertise_data: AdvertiseData,
    scan_response: AdvertiseData,
    pending_advertise_data: Option<AdvertiseData>,
    pending_scan_response: Option<AdvertiseData>,
    is_setting_data: bool,
    start_callback: Option<StatusCallback>,
    stop_callback: Option<StatusCallback>,
}

impl Default for AdvertisingSession {
    fn default() -> Self {
        Self {
            state: AdvState::Idle,
            settings: AdvertiseSettings::default(),
            advertise_data: AdvertiseData::default(),
            scan_response: AdvertiseData::default(),
            pending_advertise_data: None,
            pending_scan_response: None,
            is_setting_data: false,
            start_callback: None,
            stop_callback: None,
        }
    }
}

impl AdvertisingSession {
    /// Abort an in-progress start: back to idle, queue cleared, completion
    /// handed out for a failure invocation.
    fn fail_start(&mut self) -> Option<(StatusCallback, BleStatus)> {
        self.state = AdvState::Idle;
        self.pending_advertise_data = None;
        self.pending_scan_response = None;
        self.is_setting_data = false;
        self.start_callback
            .take()
            .map(|callback| (callback, BleStatus::Failure))
    }

    /// Everything flushed: advertising is up.
    fn complete_start(&mut self) -> Option<(StatusCallback, BleStatus)> {
        self.state = AdvState::Started;
        self.start_callback
            .take()
            .map(|callback| (callback, BleStatus::Success))
    }
}

// ----------------------------------------------------------------------------
// Low Energy Client
// ----------------------------------------------------------------------------

/// An application's handle for BLE GAP operations, bound to the identifier
/// the hardware assigned at registration.
///
/// Obtained through [`LowEnergyClientFactory::register_client`], never
/// constructed directly. Dropping the handle makes a best-effort attempt to
/// disable advertising and unregister from the hardware; the multiplexer
/// only ever held a weak reference, so an acknowledgement racing the drop is
/// skipped rather than delivered into freed state.
pub struct LowEnergyClient {
    app_identifier: Uuid,
    client_id: ClientId,
    gatt: Arc<GattInterface>,
    session: Mutex<AdvertisingSession>,
}

impl LowEnergyClient {
    /// The app-chosen identifier used while registering this client.
    pub fn app_identifier(&self) -> Uuid {
        self.app_identifier
    }

    /// The hardware-assigned client identifier.
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// The settings from the most recent accepted start.
    pub fn settings(&self) -> AdvertiseSettings {
        self.lock_session().settings
    }

    pub fn is_advertising_started(&self) -> bool {
        self.lock_session().state == AdvState::Started
    }

    pub fn is_starting_advertising(&self) -> bool {
        self.lock_session().state == AdvState::Starting
    }

    pub fn is_stopping_advertising(&self) -> bool {
        self.lock_session().state == AdvState::Stopping
    }

    /// Start advertising with the given settings and payloads. The
    /// completion reports the eventual outcome once the enable and the data
    /// flush have all been acknowledged.
    pub fn start_advertising(
        &self,
        settings: AdvertiseSettings,
        advertise_data: AdvertiseData,
        scan_response: AdvertiseData,
        callback: impl FnOnce(BleStatus) + Send + 'static,
    ) -> Result<()> {
        let mut session = self.lock_session();
        match session.state {
            AdvState::Idle => {}
            AdvState::Started => return Err(GattServiceError::AlreadyAdvertising),
            AdvState::Starting | AdvState::Stopping => {
                return Err(GattServiceError::OperationPending)
            }
        }
        advertise_data
            .validate()
            .map_err(GattServiceError::InvalidAdvertiseData)?;
        scan_response
            .validate()
            .map_err(GattServiceError::InvalidAdvertiseData)?;

        let has_scan_response = !scan_response.is_empty();
        let params = settings.to_params(has_scan_response);

        // A refusal must leave the session exactly as it was; nothing is
        // committed until the hardware accepts the enable.
        if let Err(status) = self.gatt.hal().enable_advertising(self.client_id, &params) {
            warn!(client_id = %self.client_id, %status, "enable advertising rejected");
            return Err(GattServiceError::HalRejected(status));
        }

        // Queue the payloads; the flush happens once the enable is
        // acknowledged. An empty scan response is not worth a set-data
        // round-trip.
        session.pending_advertise_data = Some(advertise_data.clone());
        session.pending_scan_response = has_scan_response.then(|| scan_response.clone());
        session.advertise_data = advertise_data;
        session.scan_response = scan_response;
        session.settings = settings;
        session.start_callback = Some(Box::new(callback));
        session.state = AdvState::Starting;
        Ok(())
    }

    /// Stop advertising. The completion reports the disable acknowledgement.
    pub fn stop_advertising(&self, callback: impl FnOnce(BleStatus) + Send + 'static) -> Result<()> {
        let mut session = self.lock_session();
        match session.state {
            AdvState::Started => {}
            AdvState::Idle => return Err(GattServiceError::NotAdvertising),
            AdvState::Starting | AdvState::Stopping => {
                return Err(GattServiceError::OperationPending)
            }
        }

        if let Err(status) = self.gatt.hal().disable_advertising(self.client_id) {
            warn!(client_id = %self.client_id, %status, "disable advertising rejected");
            return Err(GattServiceError::HalRejected(status));
        }

        session.stop_callback = Some(Box::new(callback));
        session.state = AdvState::Stopping;
        Ok(())
    }

    /// Replace the advertising and/or scan-response payload while
    /// advertising is up, without restarting it.
    ///
    /// If a set-data command is already in flight the new payload waits in
    /// its slot and a later call overwrites it, so only the latest payload
    /// reaches the hardware once the in-flight command completes.
    pub fn update_advertising_data(
        &self,
        advertise_data: Option<AdvertiseData>,
        scan_response: Option<AdvertiseData>,
    ) -> Result<()> {
        let mut session = self.lock_session();
        match session.state {
            AdvState::Started => {}
            AdvState::Idle => return Err(GattServiceError::NotAdvertising),
            AdvState::Starting | AdvState::Stopping => {
                return Err(GattServiceError::OperationPending)
            }
        }
        for payload in advertise_data.iter().chain(scan_response.iter()) {
            payload
                .validate()
                .map_err(GattServiceError::InvalidAdvertiseData)?;
        }

        if session.is_setting_data {
            // A command is in flight; the new payloads only wait in their
            // slots and the acknowledgement handler flushes them.
            if let Some(data) = advertise_data {
                session.advertise_data = data.clone();
                session.pending_advertise_data = Some(data);
            }
            if let Some(data) = scan_response {
                session.scan_response = data.clone();
                session.pending_scan_response = Some(data);
            }
            return Ok(());
        }

        // Nothing in flight: push the first payload now. A refusal must
        // leave the session exactly as it was, so nothing is committed until
        // the hardware accepts the command.
        let (first, set_scan_rsp) = match (&advertise_data, &scan_response) {
            (Some(data), _) => (data, false),
            (None, Some(data)) => (data, true),
            (None, None) => return Ok(()),
        };
        if let Err(status) = self.gatt.hal().set_advertise_data(
            self.client_id,
            set_scan_rsp,
            first.data(),
            first.include_device_name(),
            first.include_tx_power(),
        ) {
            warn!(client_id = %self.client_id, %status, "advertising data update rejected");
            return Err(GattServiceError::HalRejected(status));
        }
        session.is_setting_data = true;

        if let Some(data) = advertise_data {
            // The advertising payload is the one in flight; a scan response
            // passed alongside it waits its turn in the slot.
            session.advertise_data = data;
            if let Some(data) = scan_response {
                session.scan_response = data.clone();
                session.pending_scan_response = Some(data);
            }
        } else if let Some(data) = scan_response {
            session.scan_response = data;
        }
        Ok(())
    }

    /// Push the next queued payload to the hardware, advertising data
    /// strictly before scan response.
    fn issue_next_pending(&self, session: &mut AdvertisingSession) -> PumpOutcome {
        let (data, set_scan_rsp) = if let Some(data) = session.pending_advertise_data.take() {
            (data, false)
        } else if let Some(data) = session.pending_scan_response.take() {
            (data, true)
        } else {
            return PumpOutcome::Drained;
        };

        match self.gatt.hal().set_advertise_data(
            self.client_id,
            set_scan_rsp,
            data.data(),
            data.include_device_name(),
            data.include_tx_power(),
        ) {
            Ok(()) => {
                session.is_setting_data = true;
                PumpOutcome::Issued
            }
            Err(status) => PumpOutcome::Rejected(status),
        }
    }

    fn handle_advertise_enabled(&self, status: BtStatus) {
        let completion = {
            let mut session = self.lock_session();
            if session.state != AdvState::Starting {
                debug!(client_id = %self.client_id, %status, state = ?session.state,
                       "enable acknowledgement outside a start, ignoring");
                return;
            }
            if !status.is_success() {
                warn!(client_id = %self.client_id, %status, "advertising enable failed");
                session.fail_start()
            } else {
                match self.issue_next_pending(&mut session) {
                    PumpOutcome::Issued => None,
                    PumpOutcome::Rejected(status) => {
                        // A refused follow-up call will never be acked;
                        // treat it like a failure acknowledgement.
                        warn!(client_id = %self.client_id, %status,
                              "set advertise data rejected during start");
                        session.fail_start()
                    }
                    PumpOutcome::Drained => session.complete_start(),
                }
            }
        };
        if let Some((callback, status)) = completion {
            callback(status);
        }
    }

    fn handle_advertise_data_set(&self, status: BtStatus) {
        let completion = {
            let mut session = self.lock_session();
            if !session.is_setting_data {
                debug!(client_id = %self.client_id, %status,
                       "data acknowledgement with no command in flight, ignoring");
                return;
            }
            session.is_setting_data = false;
            match session.state {
                AdvState::Starting => {
                    if !status.is_success() {
                        warn!(client_id = %self.client_id, %status,
                              "set advertise data failed during start");
                        session.fail_start()
                    } else {
                        match self.issue_next_pending(&mut session) {
                            PumpOutcome::Issued => None,
                            PumpOutcome::Rejected(status) => {
                                warn!(client_id = %self.client_id, %status,
                                      "set advertise data rejected during start");
                                session.fail_start()
                            }
                            PumpOutcome::Drained => session.complete_start(),
                        }
                    }
                }
                AdvState::Started => {
                    // Deferred update path; there is no completion to fire
                    // and no retry policy at this layer.
                    if !status.is_success() {
                        warn!(client_id = %self.client_id, %status,
                              "deferred advertising data update failed");
                    }
                    if let PumpOutcome::Rejected(status) = self.issue_next_pending(&mut session) {
                        warn!(client_id = %self.client_id, %status,
                              "queued advertising data update rejected");
                    }
                    None
                }
                _ => {
                    debug!(client_id = %self.client_id, %status, state = ?session.state,
                           "stale data acknowledgement, ignoring");
                    None
                }
            }
        };
        if let Some((callback, status)) = completion {
            callback(status);
        }
    }

    fn handle_advertise_disabled(&self, status: BtStatus) {
        let completion = {
            let mut session = self.lock_session();
            if session.state != AdvState::Stopping {
                debug!(client_id = %self.client_id, %status, state = ?session.state,
                       "disable acknowledgement outside a stop, ignoring");
                return;
            }
            if !status.is_success() {
                warn!(client_id = %self.client_id, %status, "advertising disable reported failure");
            }
            session.state = AdvState::Idle;
            session.pending_advertise_data = None;
            session.pending_scan_response = None;
            session.is_setting_data = false;
            session
                .stop_callback
                .take()
                .map(|callback| (callback, BleStatus::from(status)))
        };
        if let Some((callback, status)) = completion {
            callback(status);
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, AdvertisingSession> {
        self.session.lock().expect("advertising session lock poisoned")
    }
}

impl ClientObserver for LowEnergyClient {
    fn on_client_event(&self, _gatt: &Arc<GattInterface>, event: &ClientEvent) {
        match *event {
            ClientEvent::AdvertiseEnabled { client_id, status } if client_id == self.client_id => {
                self.handle_advertise_enabled(status)
            }
            ClientEvent::AdvertiseDataSet { client_id, status } if client_id == self.client_id => {
                self.handle_advertise_data_set(status)
            }
            ClientEvent::AdvertiseDisabled { client_id, status } if client_id == self.client_id => {
                self.handle_advertise_disabled(status)
            }
            _ => {}
        }
    }
}

impl Drop for LowEnergyClient {
    fn drop(&mut self) {
        // Best-effort hardware teardown; the stack may already have torn
        // this client down on its side.
        if let Err(status) = self.gatt.hal().disable_advertising(self.client_id) {
            debug!(client_id = %self.client_id, %status, "disable on teardown rejected");
        }
        if let Err(status) = self.gatt.hal().unregister_client(self.client_id) {
            debug!(client_id = %self.client_id, %status, "unregister on teardown rejected");
        }
    }
}

// ----------------------------------------------------------------------------
// Client Factory
// ----------------------------------------------------------------------------

/// Registers per-application [`LowEnergyClient`] instances with the stack.
///
/// One registration may be pending per app identifier at a time; the
/// hardware-assigned identifier arrives asynchronously and out of order
/// relative to other registrations, and is matched back to its completion
/// by the echoed identifier.
pub struct LowEnergyClientFactory {
    gatt: Arc<GattInterface>,
    pending_registrations: Mutex<HashMap<Uuid, RegisterCallback>>,
}

impl LowEnergyClientFactory {
    /// Create the factory and subscribe it to client-role events for its
    /// own lifetime.
    pub fn new(gatt: Arc<GattInterface>) -> Arc<Self> {
        let factory = Arc::new(Self {
            gatt: gatt.clone(),
            pending_registrations: Mutex::new(HashMap::new()),
        });
        gatt.add_client_observer(Arc::downgrade(&factory) as Weak<dyn ClientObserver>);
        factory
    }

    /// Register a client for `app_uuid`. On acceptance the completion
    /// eventually fires exactly once with the outcome; on rejection it never
    /// fires and nothing was sent to the hardware for a duplicate identifier.
    pub fn register_client(
        &self,
        app_uuid: Uuid,
        callback: impl FnOnce(BleStatus, Uuid, Option<Arc<LowEnergyClient>>) + Send + 'static,
    ) -> Result<()> {
        let mut pending = self.lock_pending();
        if pending.contains_key(&app_uuid) {
            warn!(%app_uuid, "registration already pending for this identifier");
            return Err(GattServiceError::RegistrationPending(app_uuid));
        }

        if let Err(status) = self.gatt.hal().register_client(app_uuid) {
            warn!(%app_uuid, %status, "register client rejected");
            return Err(GattServiceError::HalRejected(status));
        }

        pending.insert(app_uuid, Box::new(callback));
        Ok(())
    }

    /// Number of registrations still waiting for their acknowledgement.
    pub fn pending_count(&self) -> usize {
        self.lock_pending().len()
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<Uuid, RegisterCallback>> {
        self.pending_registrations
            .lock()
            .expect("pending registration lock poisoned")
    }
}

impl ClientObserver for LowEnergyClientFactory {
    fn on_client_event(&self, gatt: &Arc<GattInterface>, event: &ClientEvent) {
        let &ClientEvent::ClientRegistered {
            status,
            client_id,
            app_uuid,
        } = event
        else {
            return;
        };

        // Take the completion out under the lock, invoke it outside, so the
        // completion itself may register clients or observers.
        let Some(callback) = self.lock_pending().remove(&app_uuid) else {
            warn!(%app_uuid, %status, "registration acknowledgement for an unknown identifier, dropping");
            return;
        };

        if status.is_success() {
            let client = Arc::new(LowEnergyClient {
                app_identifier: app_uuid,
                client_id,
                gatt: gatt.clone(),
                session: Mutex::new(AdvertisingSession::default()),
            });
            gatt.add_client_observer(Arc::downgrade(&client) as Weak<dyn ClientObserver>);
            debug!(%app_uuid, %client_id, "client registered");
            callback(BleStatus::Success, app_uuid, Some(client));
        } else {
            warn!(%app_uuid, %status, "client registration failed");
            callback(BleStatus::Failure, app_uuid, None);
        }
    }
}
