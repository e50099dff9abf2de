//! DealSmart Voice - Outbound Voice Client
//!
//! Ein minimaler Voice-Client mit:
//! - Access Token vom Backend (`GET /token`)
//! - Voice SDK hinter Capability-Traits (Device, Call)
//! - Status-Log mit Spiegelung ins Tracing
//! - Konsolen-Frontend mit Call- und Hangup-Button

pub mod call_engine;
pub mod config;
pub mod media;
pub mod sdk;
pub mod status;
pub mod token;

#[cfg(test)]
mod testing;

use anyhow::Context;
use call_engine::{CallCoordinator, Collaborators, CoordinatorOptions};
use config::ClientConfig;
use media::MediaAccess;
use once_cell::sync::OnceCell;
use sdk::LoopbackDeviceFactory;
use status::{install_panic_hook, CallView, ConsoleView, StatusReporter};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use token::HttpTokenSource;

// ============================================================================
// LOGGING
// ============================================================================

const DEFAULT_LOG_DIRECTIVES: &str = "dealsmart_voice_lib=debug,dealsmart_voice=debug,reqwest=warn";

static TRACING: OnceCell<()> = OnceCell::new();

/// Der Panic-Hook gehört der ersten `VoiceApp` im Prozess
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

/// Initialisiert das Logging (nur beim ersten Aufruf)
///
/// `RUST_LOG` überschreibt die Default-Direktiven.
pub fn init_tracing() {
    TRACING.get_or_init(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_DIRECTIVES));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

/// Application State des Konsolen-Clients
pub struct VoiceApp {
    config: ClientConfig,
    view: Arc<ConsoleView>,
    coordinator: Arc<CallCoordinator>,
}

impl VoiceApp {
    /// Baut alle Komponenten aus der Konfiguration
    pub fn init(config: ClientConfig) -> Arc<Self> {
        let view = Arc::new(ConsoleView::new());
        let reporter = Arc::new(StatusReporter::new(
            Arc::clone(&view) as Arc<dyn CallView>,
            config.log_tag.clone(),
        ));
        PANIC_HOOK.get_or_init(|| install_panic_hook(Arc::clone(&reporter)));

        let coordinator = CallCoordinator::new(
            Collaborators {
                media: default_media(),
                tokens: Arc::new(HttpTokenSource::new(&config)),
                devices: Arc::new(LoopbackDeviceFactory::default()),
                view: Arc::clone(&view) as Arc<dyn CallView>,
            },
            reporter,
            CoordinatorOptions {
                destination: config.destination.clone(),
                debug: config.debug,
            },
        );

        Arc::new(Self {
            config,
            view,
            coordinator: Arc::new(coordinator),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Arc<CallCoordinator> {
        &self.coordinator
    }

    /// Call-Button. Läuft als eigener Task, damit weitere Eingaben
    /// verarbeitet werden während die Initialisierung wartet.
    pub fn press_call(&self) {
        if !self.view.buttons().call_enabled {
            println!("(call button is disabled)");
            return;
        }
        let coordinator = Arc::clone(&self.coordinator);
        tokio::spawn(async move {
            if let Err(e) = coordinator.on_call_button_pressed().await {
                tracing::debug!("Call attempt failed: {:?}", e);
            }
        });
    }

    /// Hangup-Button
    pub fn press_hangup(&self) {
        if !self.view.buttons().hangup_enabled {
            println!("(hangup button is disabled)");
            return;
        }
        self.coordinator.on_hangup_button_pressed();
    }

    pub async fn shutdown(&self) {
        self.coordinator.shutdown().await;
    }
}

fn default_media() -> Arc<dyn MediaAccess> {
    #[cfg(feature = "native-audio")]
    {
        Arc::new(media::CpalMicrophone)
    }
    #[cfg(not(feature = "native-audio"))]
    {
        Arc::new(media::AssumeGranted)
    }
}

// ============================================================================
// CONSOLE COMMANDS
// ============================================================================

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown command '{0}', type 'help'")]
pub struct UnknownCommand(String);

/// Eingaben des Konsolen-Frontends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Call,
    Hangup,
    State,
    Log,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "call" | "c" => Ok(Self::Call),
            "hangup" | "h" => Ok(Self::Hangup),
            "state" | "s" => Ok(Self::State),
            "log" | "l" => Ok(Self::Log),
            "help" | "?" => Ok(Self::Help),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

fn print_help() {
    println!("Commands: call (c), hangup (h), state (s), log (l), help (?), quit (q)");
}

// ============================================================================
// APP RUNNER
// ============================================================================

/// Startet den Konsolen-Client und liest Befehle von stdin
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    let config = ClientConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        "Starting voice client (token endpoint: {}, destination: {})",
        config.token_url,
        config.destination
    );

    let app = VoiceApp::init(config);
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(Command::Call) => app.press_call(),
            Ok(Command::Hangup) => app.press_hangup(),
            Ok(Command::State) => println!("{:?}", app.coordinator.state()),
            Ok(Command::Log) => app.view.print_log(),
            Ok(Command::Help) => print_help(),
            Ok(Command::Quit) => break,
            Err(e) => println!("{e}"),
        }
    }

    app.shutdown().await;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
