use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use domain::printer::{DeviceCandidate, DeviceChannel, InitializationState, PrinterDriver, UsbId};
use domain::PrintError;

/// How long `reset` waits for the discarded channel to close. A close that
/// takes longer is finished by the next session before it opens anything.
const RESET_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// A connection to the printer, as built by the driver
pub struct DeviceHandle {
    id: u64,
    label: String,
    channel: Mutex<Box<dyn DeviceChannel>>,
}

impl DeviceHandle {
    fn new(id: u64, channel: Box<dyn DeviceChannel>) -> Self {
        Self {
            id,
            label: channel.describe(),
            channel: Mutex::new(channel),
        }
    }

    /// Process-unique sequence number; a new handle always gets a new id
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    async fn close(&self) -> Result<(), PrintError> {
        self.channel.lock().await.close().await
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish()
    }
}

/// Exclusive use of the printer through the current handle.
///
/// Only one session exists at a time. Channels of discarded handles are
/// closed before a session is handed out, so a session never opens its
/// channel while another one is still open.
pub struct DeviceSession {
    handle: Arc<DeviceHandle>,
    _device: OwnedMutexGuard<()>,
}

impl DeviceSession {
    pub fn handle(&self) -> &Arc<DeviceHandle> {
        &self.handle
    }

    pub async fn channel(&self) -> MutexGuard<'_, Box<dyn DeviceChannel>> {
        self.handle.channel.lock().await
    }
}

type InitOutcome = Result<Arc<DeviceHandle>, PrintError>;
type InitFuture = Shared<BoxFuture<'static, InitOutcome>>;

enum Slot {
    Uninitialized,
    Initializing { generation: u64, init: InitFuture },
    Ready(Arc<DeviceHandle>),
}

struct Inner {
    slot: Slot,
    /// Bumped on every new initialization and every reset, so a stale
    /// initialization never overwrites newer state.
    generation: u64,
    /// Discarded handles whose channel has not been closed yet
    retired: Vec<Arc<DeviceHandle>>,
}

/// Owns the printer handle lifecycle: lazy single-flight creation, reuse,
/// forced reset and bounded close.
pub struct ConnectionManager {
    driver: Arc<dyn PrinterDriver>,
    preferred: Option<UsbId>,
    inner: Mutex<Inner>,
    device: Arc<Mutex<()>>,
    next_handle_id: Arc<AtomicU64>,
}

impl ConnectionManager {
    pub fn new(driver: Arc<dyn PrinterDriver>, preferred: Option<UsbId>) -> Self {
        Self {
            driver,
            preferred,
            inner: Mutex::new(Inner {
                slot: Slot::Uninitialized,
                generation: 0,
                retired: Vec::new(),
            }),
            device: Arc::new(Mutex::new(())),
            next_handle_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Get the live handle, creating it if needed.
    ///
    /// Concurrent callers during initialization share its outcome.
    pub async fn acquire(&self) -> Result<Arc<DeviceHandle>, PrintError> {
        let (generation, init) = {
            let mut inner = self.inner.lock().await;
            match &inner.slot {
                Slot::Ready(handle) => return Ok(handle.clone()),
                Slot::Initializing { generation, init } => (*generation, init.clone()),
                Slot::Uninitialized => {
                    inner.generation += 1;
                    let generation = inner.generation;
                    let init = self.initialize().shared();
                    inner.slot = Slot::Initializing {
                        generation,
                        init: init.clone(),
                    };
                    debug!(generation, "Starting printer initialization");
                    (generation, init)
                }
            }
        };

        let outcome = init.await;

        let mut inner = self.inner.lock().await;
        let current = matches!(
            &inner.slot,
            Slot::Initializing { generation: g, .. } if *g == generation
        );
        if current {
            inner.slot = match &outcome {
                Ok(handle) => {
                    info!(handle_id = handle.id(), device = %handle.label(), "Printer handle ready");
                    Slot::Ready(handle.clone())
                }
                Err(e) => {
                    warn!(error = %e, "Printer initialization failed");
                    Slot::Uninitialized
                }
            };
        }

        outcome
    }

    /// Wait for exclusive use of the printer through the current handle.
    ///
    /// A handle that was reset while waiting is dropped and a fresh one
    /// acquired in its place.
    pub async fn session(&self) -> Result<DeviceSession, PrintError> {
        loop {
            let handle = self.acquire().await?;
            let device = self.device.clone().lock_owned().await;
            self.close_retired().await;

            if self.is_current(&handle).await {
                return Ok(DeviceSession {
                    handle,
                    _device: device,
                });
            }
            debug!(handle_id = handle.id(), "Handle reset while waiting for the printer, acquiring again");
        }
    }

    fn initialize(&self) -> BoxFuture<'static, InitOutcome> {
        let driver = self.driver.clone();
        let preferred = self.preferred;
        let ids = self.next_handle_id.clone();

        async move {
            let candidates = driver.discover().await?;
            let count = candidates.len();
            let candidate =
                DeviceCandidate::select(candidates, preferred).ok_or(PrintError::NoDeviceFound)?;
            debug!(
                driver = driver.kind(),
                candidates = count,
                preferred = ?preferred,
                device = %candidate.path.display(),
                "Printer discovery complete"
            );

            let channel = driver.construct(&candidate).await?;
            let id = ids.fetch_add(1, Ordering::Relaxed);
            Ok(Arc::new(DeviceHandle::new(id, channel)))
        }
        .boxed()
    }

    /// Drop the current handle and return to uninitialized.
    ///
    /// The discarded channel is closed if the printer is idle, waiting at
    /// most a second. Close errors are logged and swallowed. Safe to call
    /// repeatedly.
    pub async fn reset(&self) {
        self.retire_current().await;

        // A busy printer means a session is running; the next session
        // closes whatever is still retired
        let Ok(_device) = self.device.try_lock() else {
            return;
        };
        if timeout(RESET_CLOSE_TIMEOUT, self.close_retired()).await.is_err() {
            warn!(
                timeout_ms = RESET_CLOSE_TIMEOUT.as_millis() as u64,
                "Printer close still pending after reset, deferring it to the next session"
            );
        }
    }

    /// Close the current handle, giving up after `deadline`.
    ///
    /// Only meant for process shutdown.
    pub async fn close_gracefully(&self, deadline: Duration) {
        self.retire_current().await;

        let closing = async {
            let _device = self.device.lock().await;
            self.close_retired().await;
        };
        match timeout(deadline, closing).await {
            Ok(()) => info!("Printer closed"),
            Err(_) => warn!(
                deadline_ms = deadline.as_millis() as u64,
                "Printer close did not finish before deadline, abandoning it"
            ),
        }
    }

    async fn retire_current(&self) {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        if let Slot::Ready(handle) = std::mem::replace(&mut inner.slot, Slot::Uninitialized) {
            debug!(handle_id = handle.id(), "Printer handle discarded");
            inner.retired.push(handle);
        }
    }

    /// Close every retired handle. Callers hold the device lock.
    async fn close_retired(&self) {
        loop {
            let next = self.inner.lock().await.retired.first().cloned();
            let Some(handle) = next else {
                return;
            };
            if let Err(e) = handle.close().await {
                debug!(handle_id = handle.id(), error = %e, "Ignoring close error on discarded handle");
            }
            // Removed only once closed, so an abandoned close is retried
            self.inner
                .lock()
                .await
                .retired
                .retain(|retired| !Arc::ptr_eq(retired, &handle));
        }
    }

    async fn is_current(&self, handle: &Arc<DeviceHandle>) -> bool {
        matches!(&self.inner.lock().await.slot, Slot::Ready(current) if Arc::ptr_eq(current, handle))
    }

    /// Current handle, if any. Never starts an initialization.
    pub async fn current_handle(&self) -> Option<Arc<DeviceHandle>> {
        match &self.inner.lock().await.slot {
            Slot::Ready(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    pub async fn state(&self) -> InitializationState {
        match &self.inner.lock().await.slot {
            Slot::Uninitialized => InitializationState::Uninitialized,
            Slot::Initializing { .. } => InitializationState::Initializing,
            Slot::Ready(_) => InitializationState::Ready,
        }
    }
}
