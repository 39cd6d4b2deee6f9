//! GATT interface multiplexer and observer registry
//!
//! The hardware layer invokes its callbacks on threads this crate does not
//! control. [`GattInterface`] is the single funnel those callbacks pass
//! through: it fans each event out to the currently registered observers of
//! the matching role, in registration order, handing every observer a
//! back-reference so it can issue further hardware commands without holding
//! a global.
//!
//! There is no process-wide singleton. Callers own the interface through an
//! `Arc`; the hardware backend only ever holds a `Weak`, so an event that
//! races with teardown fails the upgrade, gets logged and is dropped instead
//! of touching freed state. Observers are likewise held weakly: a dropped
//! observer can no longer be upgraded and is skipped, which makes the
//! "never call into a destroyed observer" rule structural rather than a
//! protocol the observer has to follow.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::events::{ClientEvent, ServerEvent};
use crate::types::{AdvertiseParams, BtStatus, ClientId};

// ----------------------------------------------------------------------------
// Hardware Command Surface
// ----------------------------------------------------------------------------

/// Commands the service layer issues against the hardware.
///
/// Every command is fire-and-confirm: `Ok(())` means the hardware accepted
/// the call and will report the real outcome later through an event; an
/// `Err` is a synchronous refusal carrying the reported status code, and no
/// event will follow for that attempt.
pub trait GattHal: Send + Sync {
    /// Install the event sink and bring the hardware interface up. At most
    /// one sink may be installed at a time.
    fn open(&self, sink: Arc<dyn GattEventSink>) -> Result<(), BtStatus>;

    /// Tear the hardware interface down and drop the installed sink.
    fn close(&self);

    fn register_client(&self, app_uuid: Uuid) -> Result<(), BtStatus>;

    fn unregister_client(&self, client_id: ClientId) -> Result<(), BtStatus>;

    fn enable_advertising(
        &self,
        client_id: ClientId,
        params: &AdvertiseParams,
    ) -> Result<(), BtStatus>;

    fn set_advertise_data(
        &self,
        client_id: ClientId,
        set_scan_rsp: bool,
        data: &[u8],
        include_device_name: bool,
        include_tx_power: bool,
    ) -> Result<(), BtStatus>;

    fn disable_advertising(&self, client_id: ClientId) -> Result<(), BtStatus>;
}

/// Where a [`GattHal`] backend delivers its raw events. Implementations must
/// tolerate being called from arbitrary threads.
pub trait GattEventSink: Send + Sync {
    fn client_event(&self, event: ClientEvent);
    fn server_event(&self, event: ServerEvent);
}

// ----------------------------------------------------------------------------
// Observers
// ----------------------------------------------------------------------------

/// A client-role observer. Match the events you care about and fall through
/// for the rest.
pub trait ClientObserver: Send + Sync {
    fn on_client_event(&self, gatt: &Arc<GattInterface>, event: &ClientEvent);
}

/// A server-role observer.
pub trait ServerObserver: Send + Sync {
    fn on_server_event(&self, gatt: &Arc<GattInterface>, event: &ServerEvent);
}

/// Thread-safe, order-preserving list of weakly-held observers.
pub struct ObserverList<T: ?Sized> {
    entries: Mutex<Vec<Weak<T>>>,
}

impl<T: ?Sized> ObserverList<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Append an observer. The list never owns the observer; once the last
    /// strong reference elsewhere goes away the entry is pruned on the next
    /// dispatch.
    pub fn add(&self, observer: Weak<T>) {
        self.lock().push(observer);
    }

    /// Remove a specific observer, pruning dead entries along the way.
    pub fn remove(&self, observer: &Arc<T>) {
        self.lock().retain(|entry| match entry.upgrade() {
            Some(live) => !Arc::ptr_eq(&live, observer),
            None => false,
        });
    }

    /// Upgrade the current membership to a stable snapshot, pruning dead
    /// entries. Iterating the snapshot outside the lock keeps dispatch free
    /// of a torn list while still allowing observers to add or remove
    /// entries re-entrantly.
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        let mut entries = self.lock();
        entries.retain(|entry| entry.strong_count() > 0);
        entries.iter().filter_map(Weak::upgrade).collect()
    }

    /// Number of currently live observers.
    pub fn live_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Weak<T>>> {
        // A poisoned list means an observer panicked mid-dispatch; there is
        // no state worth salvaging past that.
        self.entries.lock().expect("observer list lock poisoned")
    }
}

impl<T: ?Sized> Default for ObserverList<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Errors
// ----------------------------------------------------------------------------

/// Errors raised while bringing up the hardware interface.
#[derive(Error, Debug)]
pub enum HalError {
    #[error("failed to open the GATT hardware interface: {0}")]
    OpenFailed(BtStatus),
}

// ----------------------------------------------------------------------------
// Interface Multiplexer
// ----------------------------------------------------------------------------

/// Owner of the hardware handle and the two observer registries.
///
/// Created with [`GattInterface::open`]; torn down when the last `Arc`
/// owner drops it, which closes the hardware interface.
pub struct GattInterface {
    hal: Arc<dyn GattHal>,
    self_handle: Weak<GattInterface>,
    /// Whether this instance's `hal.open` succeeded. A refused open (another
    /// instance already owns the hardware) must not close that instance's
    /// sink on the error-path drop.
    opened: AtomicBool,
    client_observers: ObserverList<dyn ClientObserver>,
    server_observers: ObserverList<dyn ServerObserver>,
}

/// The sink handed to the hardware backend. Holds only a weak reference so
/// an event delivered after teardown is dropped instead of dereferencing a
/// dead interface.
struct EventRouter {
    interface: Weak<GattInterface>,
}

impl GattEventSink for EventRouter {
    fn client_event(&self, event: ClientEvent) {
        match self.interface.upgrade() {
            Some(interface) => interface.dispatch_client_event(&event),
            None => warn!(?event, "client event received after interface teardown, dropping"),
        }
    }

    fn server_event(&self, event: ServerEvent) {
        match self.interface.upgrade() {
            Some(interface) => interface.dispatch_server_event(&event),
            None => warn!(?event, "server event received after interface teardown, dropping"),
        }
    }
}

impl GattInterface {
    /// Open the hardware interface and install the event funnel.
    pub fn open(hal: Arc<dyn GattHal>) -> Result<Arc<Self>, HalError> {
        let interface = Arc::new_cyclic(|weak| Self {
            hal: hal.clone(),
            self_handle: weak.clone(),
            opened: AtomicBool::new(false),
            client_observers: ObserverList::new(),
            server_observers: ObserverList::new(),
        });
        let router: Arc<dyn GattEventSink> = Arc::new(EventRouter {
            interface: Arc::downgrade(&interface),
        });
        hal.open(router).map_err(HalError::OpenFailed)?;
        interface.opened.store(true, Ordering::Release);
        Ok(interface)
    }

    /// The hardware command surface. Observers receiving an event may issue
    /// further commands through this without re-resolving anything.
    pub fn hal(&self) -> &dyn GattHal {
        self.hal.as_ref()
    }

    pub fn add_client_observer(&self, observer: Weak<dyn ClientObserver>) {
        self.client_observers.add(observer);
    }

    pub fn remove_client_observer(&self, observer: &Arc<dyn ClientObserver>) {
        self.client_observers.remove(observer);
    }

    pub fn add_server_observer(&self, observer: Weak<dyn ServerObserver>) {
        self.server_observers.add(observer);
    }

    pub fn remove_server_observer(&self, observer: &Arc<dyn ServerObserver>) {
        self.server_observers.remove(observer);
    }

    /// Number of live client-role observers.
    pub fn client_observer_count(&self) -> usize {
        self.client_observers.live_count()
    }

    /// Number of live server-role observers.
    pub fn server_observer_count(&self) -> usize {
        self.server_observers.live_count()
    }

    /// Deliver one client-role event to every live client observer, in
    /// registration order, synchronously on the calling thread.
    pub fn dispatch_client_event(&self, event: &ClientEvent) {
        debug!(?event, "dispatching client event");
        let this = self
            .self_handle
            .upgrade()
            .expect("event dispatched on a torn-down interface");
        for observer in self.client_observers.snapshot() {
            observer.on_client_event(&this, event);
        }
    }

    /// Deliver one server-role event to every live server observer.
    pub fn dispatch_server_event(&self, event: &ServerEvent) {
        debug!(?event, "dispatching server event");
        let this = self
            .self_handle
            .upgrade()
            .expect("event dispatched on a torn-down interface");
        for observer in self.server_observers.snapshot() {
            observer.on_server_event(&this, event);
        }
    }
}

impl Drop for GattInterface {
    fn drop(&mut self) {
        if self.opened.load(Ordering::Acquire) {
            self.hal.close();
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
