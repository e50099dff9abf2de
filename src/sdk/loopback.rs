//! Loopback Backend
//!
//! Simuliert ein Voice SDK im Prozess: Registrierung nach kurzer Pause,
//! jeder Anruf wird nach `answer_delay` angenommen. Gedacht für lokale
//! Läufe ohne Telefonie-Zugangsdaten.

use super::device::{
    CallEvent, ConnectParams, DeviceEvent, DeviceFactory, DeviceOptions, SdkError, VoiceCall,
    VoiceDevice,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const EVENT_CHANNEL_SIZE: usize = 100;

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopbackOptions {
    /// Pause bis `registering` gemeldet wird
    pub registration_delay: Duration,
    /// Pause bis ein Anruf angenommen wird
    pub answer_delay: Duration,
}

impl Default for LoopbackOptions {
    fn default() -> Self {
        Self {
            registration_delay: Duration::from_millis(20),
            answer_delay: Duration::from_millis(300),
        }
    }
}

// ============================================================================
// FACTORY
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LoopbackDeviceFactory {
    options: LoopbackOptions,
}

impl LoopbackDeviceFactory {
    pub fn new(options: LoopbackOptions) -> Self {
        Self { options }
    }
}

impl DeviceFactory for LoopbackDeviceFactory {
    fn create(
        &self,
        token: &str,
        options: DeviceOptions,
    ) -> Result<Arc<dyn VoiceDevice>, SdkError> {
        if token.trim().is_empty() {
            return Err(SdkError::new(
                SdkError::INVALID_TOKEN,
                "AccessTokenInvalid: token is missing",
            ));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SdkError::new(SdkError::GENERAL, e.to_string()))?;

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let device = Arc::new(LoopbackDevice {
            event_tx,
            debug: options.debug,
            options: self.options,
            destroyed: AtomicBool::new(false),
            registration: Mutex::new(None),
        });

        let registration = runtime.spawn(Arc::clone(&device).register());
        *device.registration.lock() = Some(registration);

        Ok(device)
    }
}

// ============================================================================
// DEVICE
// ============================================================================

struct LoopbackDevice {
    event_tx: broadcast::Sender<DeviceEvent>,
    debug: bool,
    options: LoopbackOptions,
    destroyed: AtomicBool,
    registration: Mutex<Option<JoinHandle<()>>>,
}

impl LoopbackDevice {
    async fn register(self: Arc<Self>) {
        tokio::time::sleep(self.options.registration_delay).await;
        self.emit(DeviceEvent::Registering);
        tokio::task::yield_now().await;
        self.emit(DeviceEvent::Registered);
    }

    fn emit(&self, event: DeviceEvent) {
        if self.debug {
            tracing::debug!("loopback device event: {:?}", event);
        }
        let _ = self.event_tx.send(event);
    }
}

#[async_trait]
impl VoiceDevice for LoopbackDevice {
    fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.event_tx.subscribe()
    }

    async fn connect(&self, params: ConnectParams) -> Result<Arc<dyn VoiceCall>, SdkError> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(SdkError::new(SdkError::GENERAL, "Device has been destroyed"));
        }

        let destination = params
            .get("To")
            .ok_or_else(|| SdkError::new(SdkError::CONNECTION, "Missing 'To' parameter"))?
            .to_string();

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let call = Arc::new(LoopbackCall {
            event_tx,
            device_tx: self.event_tx.clone(),
            ended: AtomicBool::new(false),
            debug: self.debug,
        });

        if self.debug {
            tracing::debug!("loopback dialing '{}'", destination);
        }

        let answering = Arc::clone(&call);
        let answer_delay = self.options.answer_delay;
        tokio::spawn(async move {
            tokio::time::sleep(answer_delay).await;
            if !answering.ended.load(Ordering::SeqCst) {
                answering.emit(CallEvent::Accept);
                let _ = answering.device_tx.send(DeviceEvent::Connect);
            }
        });

        Ok(call)
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        if let Some(registration) = self.registration.lock().take() {
            registration.abort();
        }
    }
}

// ============================================================================
// CALL
// ============================================================================

struct LoopbackCall {
    event_tx: broadcast::Sender<CallEvent>,
    device_tx: broadcast::Sender<DeviceEvent>,
    ended: AtomicBool,
    debug: bool,
}

impl LoopbackCall {
    fn emit(&self, event: CallEvent) {
        if self.debug {
            tracing::debug!("loopback call event: {:?}", event);
        }
        let _ = self.event_tx.send(event);
    }
}

impl VoiceCall for LoopbackCall {
    fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.event_tx.subscribe()
    }

    fn disconnect(&self) {
        if self.ended.swap(true, Ordering::SeqCst) {
            return;
        }
        self.emit(CallEvent::Disconnect);
        let _ = self.device_tx.send(DeviceEvent::Disconnect);
    }
}

// ============================================================================
// TESTS
// ============================================================================
