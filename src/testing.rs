//! Fakes für alle Capability-Traits
//!
//! Kein Netzwerk, kein Audio. Events werden von den Tests per `emit`
//! ausgelöst.

use crate::call_engine::{CallCoordinator, Collaborators, CoordinatorOptions};
use crate::media::{MediaAccess, MediaError};
use crate::sdk::{
    CallEvent, ConnectParams, DeviceEvent, DeviceFactory, DeviceOptions, SdkError, VoiceCall,
    VoiceDevice,
};
use crate::status::{CallView, MemoryView, StatusReporter};
use crate::token::{TokenError, TokenResponse, TokenSource};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

pub const FAKE_TOKEN: &str = "header.payload.sig";

// ============================================================================
// MEDIA
// ============================================================================

#[derive(Default)]
pub struct FakeMedia {
    denied: AtomicBool,
}

impl FakeMedia {
    pub fn deny(&self, denied: bool) {
        self.denied.store(denied, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaAccess for FakeMedia {
    async fn request_microphone(&self) -> Result<(), MediaError> {
        if self.denied.load(Ordering::SeqCst) {
            Err(MediaError::PermissionDenied)
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// TOKENS
// ============================================================================

pub struct FakeTokens {
    result: Mutex<Result<TokenResponse, TokenError>>,
    gate: Mutex<Option<Arc<Notify>>>,
    fetches: AtomicUsize,
}

impl Default for FakeTokens {
    fn default() -> Self {
        Self {
            result: Mutex::new(Ok(TokenResponse::new(FAKE_TOKEN))),
            gate: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        }
    }
}

impl FakeTokens {
    pub fn respond(&self, result: Result<TokenResponse, TokenError>) {
        *self.result.lock() = result;
    }

    /// Jeder Abruf wartet, bis der zurückgegebene Notify ausgelöst wird
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSource for FakeTokens {
    async fn fetch_token(&self) -> Result<TokenResponse, TokenError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.result.lock().clone()
    }
}

// ============================================================================
// DEVICES
// ============================================================================

#[derive(Default)]
pub struct FakeDeviceFactory {
    failure: Mutex<Option<SdkError>>,
    devices: Mutex<Vec<Arc<FakeDevice>>>,
}

impl FakeDeviceFactory {
    pub fn fail_with(&self, err: SdkError) {
        *self.failure.lock() = Some(err);
    }

    pub fn created(&self) -> usize {
        self.devices.lock().len()
    }

    pub fn device(&self, index: usize) -> Arc<FakeDevice> {
        Arc::clone(&self.devices.lock()[index])
    }
}

impl DeviceFactory for FakeDeviceFactory {
    fn create(
        &self,
        token: &str,
        options: DeviceOptions,
    ) -> Result<Arc<dyn VoiceDevice>, SdkError> {
        if let Some(err) = self.failure.lock().clone() {
            return Err(err);
        }
        let (events, _) = broadcast::channel(16);
        let device = Arc::new(FakeDevice {
            token: token.to_string(),
            options,
            events,
            connect_failure: Mutex::new(None),
            connect_gate: Mutex::new(None),
            connect_params: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            destroyed: AtomicBool::new(false),
        });
        self.devices.lock().push(Arc::clone(&device));
        Ok(device)
    }
}

pub struct FakeDevice {
    pub token: String,
    pub options: DeviceOptions,
    events: broadcast::Sender<DeviceEvent>,
    connect_failure: Mutex<Option<SdkError>>,
    connect_gate: Mutex<Option<Arc<Notify>>>,
    connect_params: Mutex<Vec<ConnectParams>>,
    calls: Mutex<Vec<Arc<FakeCall>>>,
    destroyed: AtomicBool,
}

impl FakeDevice {
    pub fn emit(&self, event: DeviceEvent) {
        let _ = self.events.send(event);
    }

    pub fn fail_connect(&self, err: SdkError) {
        *self.connect_failure.lock() = Some(err);
    }

    /// `connect` wartet, bis der zurückgegebene Notify ausgelöst wird
    pub fn hold_connect(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.connect_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn connect_params(&self) -> Vec<ConnectParams> {
        self.connect_params.lock().clone()
    }

    pub fn call(&self, index: usize) -> Arc<FakeCall> {
        Arc::clone(&self.calls.lock()[index])
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceDevice for FakeDevice {
    fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    async fn connect(&self, params: ConnectParams) -> Result<Arc<dyn VoiceCall>, SdkError> {
        self.connect_params.lock().push(params);
        let gate = self.connect_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(err) = self.connect_failure.lock().clone() {
            return Err(err);
        }
        let (events, _) = broadcast::channel(16);
        let call = Arc::new(FakeCall {
            events: Mutex::new(Some(events)),
            disconnects: AtomicUsize::new(0),
        });
        self.calls.lock().push(Arc::clone(&call));
        Ok(call)
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }
}

pub struct FakeCall {
    events: Mutex<Option<broadcast::Sender<CallEvent>>>,
    disconnects: AtomicUsize,
}

impl FakeCall {
    pub fn emit(&self, event: CallEvent) {
        if let Some(events) = self.events.lock().as_ref() {
            let _ = events.send(event);
        }
    }

    /// Schließt den Event-Kanal ohne `disconnect`
    pub fn kill(&self) {
        self.events.lock().take();
    }

    pub fn disconnect_requests(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl VoiceCall for FakeCall {
    fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        match self.events.lock().as_ref() {
            Some(events) => events.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// HARNESS
// ============================================================================

pub struct Harness {
    pub coordinator: CallCoordinator,
    pub view: Arc<MemoryView>,
    pub media: Arc<FakeMedia>,
    pub tokens: Arc<FakeTokens>,
    pub factory: Arc<FakeDeviceFactory>,
}

impl Harness {
    pub fn new() -> Self {
        let tokens = Arc::new(FakeTokens::default());
        Self::build(Arc::clone(&tokens), tokens)
    }

    /// Harness mit einer echten Token-Quelle
    pub fn with_tokens(source: Arc<dyn TokenSource>) -> Self {
        Self::build(Arc::new(FakeTokens::default()), source)
    }

    fn build(tokens: Arc<FakeTokens>, source: Arc<dyn TokenSource>) -> Self {
        let view = Arc::new(MemoryView::new());
        let media = Arc::new(FakeMedia::default());
        let factory = Arc::new(FakeDeviceFactory::default());
        let reporter = Arc::new(StatusReporter::new(
            Arc::clone(&view) as Arc<dyn CallView>,
            "DealSmart",
        ));

        let coordinator = CallCoordinator::new(
            Collaborators {
                media: Arc::clone(&media) as Arc<dyn MediaAccess>,
                tokens: source,
                devices: Arc::clone(&factory) as Arc<dyn DeviceFactory>,
                view: Arc::clone(&view) as Arc<dyn CallView>,
            },
            reporter,
            CoordinatorOptions::default(),
        );

        Self {
            coordinator,
            view,
            media,
            tokens,
            factory,
        }
    }
}

/// Wartet bis die Bedingung erfüllt ist (max. 2 Sekunden)
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached within 2s");
}
