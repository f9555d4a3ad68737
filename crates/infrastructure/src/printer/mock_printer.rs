use async_trait::async_trait;
use domain::printer::{DeviceCandidate, DeviceChannel, PrinterCommand, PrinterDriver, UsbId};
use domain::PrintError;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

#[derive(Default)]
struct MockState {
    candidates: Mutex<Vec<DeviceCandidate>>,
    printed: Mutex<Vec<Vec<PrinterCommand>>>,
    send_error: Mutex<Option<String>>,

    discover_delay_ms: AtomicU64,
    open_delay_ms: AtomicU64,
    send_delay_ms: AtomicU64,
    close_delay_ms: AtomicU64,

    failing_opens: AtomicUsize,
    failing_sends: AtomicUsize,

    discover_calls: AtomicUsize,
    construct_calls: AtomicUsize,
    open_calls: AtomicUsize,
    send_calls: AtomicUsize,
    close_calls: AtomicUsize,

    open_channels: AtomicUsize,
    max_open_channels: AtomicUsize,
}

/// In-memory printer with call counters, delays and fault injection.
///
/// Clones share state, so a test can keep one clone for inspection and hand
/// another to the connection manager.
#[derive(Clone)]
pub struct MockPrinterDriver {
    state: Arc<MockState>,
}

impl MockPrinterDriver {
    /// A driver that discovers one printer
    pub fn new() -> Self {
        let state = MockState {
            candidates: Mutex::new(vec![Self::candidate(0)]),
            ..Default::default()
        };
        Self {
            state: Arc::new(state),
        }
    }

    /// A driver whose discovery comes back empty
    pub fn without_devices() -> Self {
        Self {
            state: Arc::new(MockState::default()),
        }
    }

    fn candidate(index: usize) -> DeviceCandidate {
        DeviceCandidate {
            id: Some(UsbId::new(0x0416, 0x5011)),
            path: PathBuf::from(format!("mock://lp{index}")),
        }
    }

    pub async fn set_candidates(&self, candidates: Vec<DeviceCandidate>) {
        *self.state.candidates.lock().await = candidates;
    }

    pub async fn attach(&self) {
        self.set_candidates(vec![Self::candidate(0)]).await;
    }

    pub fn set_discover_delay(&self, delay: Duration) {
        store_delay(&self.state.discover_delay_ms, delay);
    }

    pub fn set_open_delay(&self, delay: Duration) {
        store_delay(&self.state.open_delay_ms, delay);
    }

    pub fn set_send_delay(&self, delay: Duration) {
        store_delay(&self.state.send_delay_ms, delay);
    }

    pub fn set_close_delay(&self, delay: Duration) {
        store_delay(&self.state.close_delay_ms, delay);
    }

    /// Make the next `count` opens fail with a transient error
    pub fn fail_next_opens(&self, count: usize) {
        self.state.failing_opens.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` sends fail with `message`
    pub async fn fail_next_sends(&self, count: usize, message: &str) {
        *self.state.send_error.lock().await = Some(message.to_string());
        self.state.failing_sends.store(count, Ordering::SeqCst);
    }

    pub fn discover_calls(&self) -> usize {
        self.state.discover_calls.load(Ordering::SeqCst)
    }

    pub fn construct_calls(&self) -> usize {
        self.state.construct_calls.load(Ordering::SeqCst)
    }

    pub fn open_calls(&self) -> usize {
        self.state.open_calls.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> usize {
        self.state.send_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.state.close_calls.load(Ordering::SeqCst)
    }

    /// Channels currently open
    pub fn open_channels(&self) -> usize {
        self.state.open_channels.load(Ordering::SeqCst)
    }

    /// Most channels ever open at the same time
    pub fn max_open_channels(&self) -> usize {
        self.state.max_open_channels.load(Ordering::SeqCst)
    }

    /// Every command stream sent successfully, in order
    pub async fn printed(&self) -> Vec<Vec<PrinterCommand>> {
        self.state.printed.lock().await.clone()
    }
}

impl Default for MockPrinterDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn store_delay(slot: &AtomicU64, delay: Duration) {
    slot.store(delay.as_millis() as u64, Ordering::SeqCst);
}

async fn wait(slot: &AtomicU64) {
    let ms = slot.load(Ordering::SeqCst);
    if ms > 0 {
        sleep(Duration::from_millis(ms)).await;
    }
}

/// Decrement a fault counter; true while faults remain
fn take_fault(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl PrinterDriver for MockPrinterDriver {
    async fn discover(&self) -> Result<Vec<DeviceCandidate>, PrintError> {
        self.state.discover_calls.fetch_add(1, Ordering::SeqCst);
        wait(&self.state.discover_delay_ms).await;
        Ok(self.state.candidates.lock().await.clone())
    }

    async fn construct(
        &self,
        candidate: &DeviceCandidate,
    ) -> Result<Box<dyn DeviceChannel>, PrintError> {
        self.state.construct_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockChannel {
            state: self.state.clone(),
            path: candidate.path.clone(),
            open: false,
        }))
    }

    fn kind(&self) -> &'static str {
        "mock"
    }
}

struct MockChannel {
    state: Arc<MockState>,
    path: PathBuf,
    open: bool,
}

#[async_trait]
impl DeviceChannel for MockChannel {
    async fn open(&mut self) -> Result<(), PrintError> {
        if self.open {
            return Ok(());
        }
        self.state.open_calls.fetch_add(1, Ordering::SeqCst);
        wait(&self.state.open_delay_ms).await;
        if take_fault(&self.state.failing_opens) {
            return Err(PrintError::OpenFailed(
                "failed to open mock printer: device busy".to_string(),
            ));
        }
        self.open = true;
        let open = self.state.open_channels.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_open_channels.fetch_max(open, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&mut self, commands: &[PrinterCommand]) -> Result<(), PrintError> {
        if !self.open {
            return Err(PrintError::EmissionFailed(
                "mock printer is not open".to_string(),
            ));
        }
        self.state.send_calls.fetch_add(1, Ordering::SeqCst);
        wait(&self.state.send_delay_ms).await;
        if take_fault(&self.state.failing_sends) {
            let message = self
                .state
                .send_error
                .lock()
                .await
                .clone()
                .unwrap_or_else(|| "write failed".to_string());
            return Err(PrintError::EmissionFailed(message));
        }

        for command in commands {
            if let PrinterCommand::Text(line) = command {
                debug!(device = %self.path.display(), "| {}", line);
            }
        }
        self.state.printed.lock().await.push(commands.to_vec());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PrintError> {
        if !self.open {
            return Ok(());
        }
        wait(&self.state.close_delay_ms).await;
        self.state.close_calls.fetch_add(1, Ordering::SeqCst);
        self.state.open_channels.fetch_sub(1, Ordering::SeqCst);
        self.open = false;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("mock printer at {}", self.path.display())
    }
}
