//! Call Lifecycle Coordinator
//!
//! Besitzt genau ein optionales Device und einen optionalen aktiven Call.
//! Die Initialisierung läuft als feste Pipeline:
//! Mikrofon → Token → Device → Event-Abos.
//!
//! Buttons werden nur an zwei Stellen gesetzt: nach erfolgreichem
//! `connect` (IN_CALL) und wenn der Call endet (IDLE).

use crate::media::{MediaAccess, MediaError};
use crate::sdk::{
    CallEvent, ConnectParams, DeviceEvent, DeviceFactory, DeviceOptions, SdkError, VoiceCall,
    VoiceDevice,
};
use crate::status::{ButtonState, CallView, StatusReporter};
use crate::token::{TokenClaims, TokenError, TokenSource};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Ausgänge der Initialisierungs-Pipeline
#[derive(Error, Debug)]
pub enum InitError {
    #[error("Device initialization already in progress")]
    AlreadyInitializing,

    #[error("Mic permission denied")]
    Permission(#[source] MediaError),

    #[error("Token error: {0}")]
    Token(#[source] TokenError),

    #[error("Device error: {0}")]
    Construct(#[source] SdkError),

    #[error("Session has been shut down")]
    ShutDown,
}

#[derive(Error, Debug)]
pub enum CallError {
    #[error("Device not ready")]
    DeviceNotReady(#[source] InitError),

    #[error("Connect failed: {0}")]
    Connect(#[source] SdkError),

    #[error("Session has been shut down")]
    ShutDown,
}

// ============================================================================
// CALL STATE
// ============================================================================

/// Sicht von außen auf den Session-Zustand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Noch kein Device
    NoDevice,
    /// Device wird gerade aufgebaut
    Initializing,
    /// Device bereit, kein Anruf
    Ready,
    /// Anruf aktiv
    InCall { call_id: Uuid },
}

// ============================================================================
// COLLABORATORS
// ============================================================================

/// Alle externen Abhängigkeiten des Coordinators
pub struct Collaborators {
    pub media: Arc<dyn MediaAccess>,
    pub tokens: Arc<dyn TokenSource>,
    pub devices: Arc<dyn DeviceFactory>,
    pub view: Arc<dyn CallView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorOptions {
    /// Wert für den `To` Parameter
    pub destination: String,
    pub debug: bool,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            destination: crate::config::DEFAULT_DESTINATION.to_string(),
            debug: true,
        }
    }
}

// ============================================================================
// SESSION STATE
// ============================================================================

struct ActiveCall {
    id: Uuid,
    handle: Arc<dyn VoiceCall>,
}

#[derive(Default)]
struct SessionState {
    device: Option<Arc<dyn VoiceDevice>>,
    active_call: Option<ActiveCall>,
    initializing: bool,
    /// Nach `shutdown` wird nichts mehr gespeichert oder gestartet
    shut_down: bool,
}

/// Gibt das Init-Flag beim Drop wieder frei
struct InitGuard {
    state: Arc<Mutex<SessionState>>,
}

impl Drop for InitGuard {
    fn drop(&mut self) {
        self.state.lock().initializing = false;
    }
}

// ============================================================================
// COORDINATOR
// ============================================================================

pub struct CallCoordinator {
    media: Arc<dyn MediaAccess>,
    tokens: Arc<dyn TokenSource>,
    devices: Arc<dyn DeviceFactory>,
    view: Arc<dyn CallView>,
    reporter: Arc<StatusReporter>,
    options: CoordinatorOptions,
    state: Arc<Mutex<SessionState>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl CallCoordinator {
    /// Erstellt den Coordinator und setzt die Buttons auf den Ausgangszustand
    pub fn new(
        collaborators: Collaborators,
        reporter: Arc<StatusReporter>,
        options: CoordinatorOptions,
    ) -> Self {
        let Collaborators {
            media,
            tokens,
            devices,
            view,
        } = collaborators;

        view.set_buttons(ButtonState::IDLE);

        Self {
            media,
            tokens,
            devices,
            view,
            reporter,
            options,
            state: Arc::new(Mutex::new(SessionState::default())),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Gibt das aktuelle Device zurück (falls initialisiert)
    pub fn device(&self) -> Option<Arc<dyn VoiceDevice>> {
        self.state.lock().device.clone()
    }

    pub fn has_active_call(&self) -> bool {
        self.state.lock().active_call.is_some()
    }

    pub fn state(&self) -> CallState {
        let state = self.state.lock();
        match (&state.active_call, &state.device, state.initializing) {
            (Some(call), _, _) => CallState::InCall { call_id: call.id },
            (None, Some(_), _) => CallState::Ready,
            (None, None, true) => CallState::Initializing,
            (None, None, false) => CallState::NoDevice,
        }
    }

    /// Initialisiert das Device
    ///
    /// Läuft bereits eine Initialisierung, wird sofort mit
    /// `AlreadyInitializing` abgebrochen. Jeder Fehler lässt das Device
    /// leer, ein späterer Aufruf kann es erneut versuchen.
    pub async fn initialize_device(&self) -> Result<Arc<dyn VoiceDevice>, InitError> {
        let _guard = match self.begin_init() {
            Ok(InitStart::Existing(device)) => return Ok(device),
            Ok(InitStart::Fresh(guard)) => guard,
            Err(err) => {
                tracing::debug!("Skipping device initialization: {}", err);
                return Err(err);
            }
        };

        let result = self.run_init_pipeline().await;
        if let Err(err @ InitError::ShutDown) = &result {
            tracing::debug!("Discarding device initialization: {}", err);
        } else if let Err(err) = &result {
            tracing::warn!("Device initialization failed: {:?}", err);
            self.reporter.log(err.to_string());
        }
        result
    }

    /// Handler für den Call-Button
    ///
    /// Gibt die ID des neuen Calls zurück.
    pub async fn on_call_button_pressed(&self) -> Result<Uuid, CallError> {
        self.reporter.log("Call button clicked");

        let device = match self.device() {
            Some(device) => device,
            None => match self.initialize_device().await {
                Ok(device) => device,
                Err(InitError::ShutDown) => return Err(CallError::ShutDown),
                Err(err) => {
                    self.reporter.log("Device not ready");
                    return Err(CallError::DeviceNotReady(err));
                }
            },
        };

        self.reporter.log("Calling...");
        let params = ConnectParams::to(self.options.destination.clone());
        let handle = match device.connect(params).await {
            Ok(handle) => handle,
            Err(err) => {
                let err = CallError::Connect(err);
                self.reporter.log(err.to_string());
                return Err(err);
            }
        };

        let call_id = Uuid::new_v4();
        let events = handle.subscribe();
        {
            let mut state = self.state.lock();
            if state.shut_down {
                drop(state);
                tracing::info!("Session shut down while connecting, disconnecting call");
                handle.disconnect();
                return Err(CallError::ShutDown);
            }
            state.active_call = Some(ActiveCall { id: call_id, handle });
        }
        self.view.set_buttons(ButtonState::IN_CALL);

        let watcher = watch_call(
            call_id,
            events,
            Arc::clone(&self.reporter),
            Arc::clone(&self.view),
            Arc::clone(&self.state),
        );
        self.spawn_task(watcher.instrument(tracing::info_span!("call", %call_id)));

        tracing::info!("Call {} started", call_id);
        Ok(call_id)
    }

    /// Handler für den Hangup-Button
    ///
    /// Ohne aktiven Call passiert nichts. Die Buttons setzt erst das
    /// `disconnect` Event zurück.
    pub fn on_hangup_button_pressed(&self) -> bool {
        let active = self
            .state
            .lock()
            .active_call
            .as_ref()
            .map(|call| (call.id, Arc::clone(&call.handle)));

        match active {
            Some((call_id, handle)) => {
                tracing::info!("Hanging up call {}", call_id);
                handle.disconnect();
                true
            }
            None => false,
        }
    }

    /// Beendet die Session: legt auf, gibt das Device frei und stoppt alle
    /// Beobachter.
    pub async fn shutdown(&self) {
        let (device, call) = {
            let mut state = self.state.lock();
            state.shut_down = true;
            (state.device.take(), state.active_call.take())
        };

        if let Some(call) = call {
            tracing::info!("Disconnecting call {} on shutdown", call.id);
            call.handle.disconnect();
        }
        if let Some(device) = device {
            device.destroy();
        }

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in &tasks {
            task.abort();
        }
        futures::future::join_all(tasks).await;

        self.view.set_buttons(ButtonState::IDLE);
        tracing::info!("Call coordinator shut down");
    }

    // ========================================================================
    // PRIVATE METHODS
    // ========================================================================

    fn begin_init(&self) -> Result<InitStart, InitError> {
        let mut state = self.state.lock();
        if state.shut_down {
            return Err(InitError::ShutDown);
        }
        if let Some(device) = &state.device {
            return Ok(InitStart::Existing(Arc::clone(device)));
        }
        if state.initializing {
            return Err(InitError::AlreadyInitializing);
        }
        state.initializing = true;
        Ok(InitStart::Fresh(InitGuard {
            state: Arc::clone(&self.state),
        }))
    }

    async fn run_init_pipeline(&self) -> Result<Arc<dyn VoiceDevice>, InitError> {
        // 1. Mikrofon
        self.media
            .request_microphone()
            .await
            .map_err(InitError::Permission)?;

        // 2. Token
        let response = self.tokens.fetch_token().await.map_err(InitError::Token)?;

        // 3. Nur Diagnose, keine Validierung
        self.reporter.log(format!(
            "Token OK (len={}), initializing device...",
            response.token_len_label()
        ));
        if let Some(claims) = response.token.as_deref().and_then(TokenClaims::decode) {
            tracing::debug!(
                identity = ?claims.identity(),
                expires_at = ?claims.expires_at(),
                voice_grant = claims.has_voice_grant(),
                "Access token claims"
            );
        }

        // 4. Device
        let token = response.token.unwrap_or_default();
        let device = self
            .devices
            .create(
                &token,
                DeviceOptions {
                    debug: self.options.debug,
                },
            )
            .map_err(InitError::Construct)?;

        let events = device.subscribe();
        {
            let mut state = self.state.lock();
            if state.shut_down {
                drop(state);
                device.destroy();
                return Err(InitError::ShutDown);
            }
            state.device = Some(Arc::clone(&device));
        }
        self.spawn_task(forward_device_events(events, Arc::clone(&self.reporter)));

        // 5. Fertig
        self.reporter.log("Device initialized");
        Ok(device)
    }

    fn spawn_task<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock();
        // `shutdown` setzt das Flag bevor es die Tasks einsammelt
        if self.state.lock().shut_down {
            return;
        }
        tasks.retain(|task| !task.is_finished());
        tasks.push(tokio::spawn(future));
    }
}

impl Drop for CallCoordinator {
    fn drop(&mut self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl std::fmt::Debug for CallCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallCoordinator")
            .field("state", &self.state())
            .field("options", &self.options)
            .finish()
    }
}

enum InitStart {
    Existing(Arc<dyn VoiceDevice>),
    Fresh(InitGuard),
}

// ============================================================================
// EVENT FORWARDING
// ============================================================================

fn describe_device_event(event: &DeviceEvent) -> String {
    match event {
        DeviceEvent::Registered => "Registered (for inbound)".to_string(),
        DeviceEvent::Registering => "Registering device...".to_string(),
        DeviceEvent::Error(err) => format!("Error: {err}"),
        DeviceEvent::Connect => "Call connected".to_string(),
        DeviceEvent::Disconnect => "Call disconnected".to_string(),
    }
}

/// Leitet Device-Events bis zum Ende des Kanals an den Reporter weiter
async fn forward_device_events(
    mut events: broadcast::Receiver<DeviceEvent>,
    reporter: Arc<StatusReporter>,
) {
    loop {
        match events.recv().await {
            Ok(event) => reporter.log(describe_device_event(&event)),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Dropped {} device events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Beobachtet einen Call bis `disconnect` oder bis der Kanal geschlossen wird
///
/// Danach werden die Buttons zurückgesetzt, aber nur wenn dieser Call noch
/// der aktive ist.
async fn watch_call(
    call_id: Uuid,
    mut events: broadcast::Receiver<CallEvent>,
    reporter: Arc<StatusReporter>,
    view: Arc<dyn CallView>,
    state: Arc<Mutex<SessionState>>,
) {
    loop {
        match events.recv().await {
            Ok(CallEvent::Error(err)) => reporter.log(format!("Call error: {err}")),
            Ok(CallEvent::Accept) => reporter.log("Call accepted"),
            Ok(CallEvent::Disconnect) => {
                reporter.log("Call ended");
                break;
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Dropped {} call events", skipped);
            }
            Err(RecvError::Closed) => {
                // SDK hat den Call ohne disconnect verloren
                reporter.log("Call lost");
                break;
            }
        }
    }

    let was_active = {
        let mut state = state.lock();
        let current = state.active_call.as_ref().map(|c| c.id) == Some(call_id);
        if current {
            state.active_call = None;
        }
        current
    };
    if was_active {
        view.set_buttons(ButtonState::IDLE);
    }
}

// ============================================================================
// TESTS
// ============================================================================
