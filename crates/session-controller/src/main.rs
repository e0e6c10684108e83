//! Session Controller
//!
//! Joins a real-time channel and drives cloud recording from line commands.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Create the token and recording clients
//! 3. Spawn the session actor (permissions, engine, local video)
//! 4. Start the join flow: token fetch races the join timer
//! 5. Read commands from stdin until `quit`, end of input or a shutdown signal
//!
//! # Commands
//!
//! - `record` - start cloud recording, or stop the one held
//! - `mute` - toggle local audio
//! - `switch` - switch camera
//! - `status` - print the session state
//! - `leave` / `quit` - leave the channel and exit

#![warn(clippy::pedantic)]

use std::sync::Arc;

use session_controller::actor::{SessionActor, SessionActorHandle, SessionDeps, SessionSettings};
use session_controller::clients::{RecordingClient, TokenClient};
use session_controller::config::Config;
use session_controller::headless::{GrantAllPermissions, HeadlessEngineFactory, HeadlessSurfaces};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Toggles held by the UI, flipped before each request like the buttons they
/// stand in for. Recording has no flag here: its direction comes from the
/// session, since the HTTP outcome arrives after the request is accepted.
#[derive(Debug, Default)]
struct UiState {
    audio_muted: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_controller=debug,common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Session Controller");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        recording_api_base_url = %config.recording_api_base_url,
        channel = %config.channel_name,
        join_delay = ?config.join_delay,
        "Configuration loaded successfully"
    );

    let token_client = TokenClient::new(&config.recording_api_base_url).map_err(|e| {
        error!(error = %e, "Failed to create token client");
        e
    })?;
    let recording_client = RecordingClient::new(&config.recording_api_base_url).map_err(|e| {
        error!(error = %e, "Failed to create recording client");
        e
    })?;

    let deps = SessionDeps {
        token_source: Arc::new(token_client),
        recording_service: Arc::new(recording_client),
        engine_factory: Box::new(HeadlessEngineFactory),
        surfaces: Box::new(HeadlessSurfaces::default()),
        permissions: Box::new(GrantAllPermissions),
    };

    let (session, session_task) = SessionActor::spawn(
        SessionSettings::from_config(&config),
        deps,
        CancellationToken::new(),
    );

    if let Err(e) = session.start_join_flow().await {
        warn!(error = %e, "Failed to start join flow");
    }

    info!("Session Controller running - type `quit` or press Ctrl+C to exit");

    tokio::select! {
        () = command_loop(&session) => {
            info!("Command input finished");
        }
        () = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    match session.leave().await {
        Ok(true) => info!("Left channel"),
        Ok(false) => {}
        Err(e) => warn!(error = %e, "Failed to leave channel"),
    }
    session.shutdown();

    if let Err(e) = session_task.await {
        warn!(error = %e, "Session task ended abnormally");
    }

    info!("Session Controller shutdown complete");
    Ok(())
}

/// Apply stdin commands until `leave`/`quit` or end of input.
async fn command_loop(session: &SessionActorHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ui = UiState::default();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Failed to read command");
                return;
            }
        };

        match line.trim() {
            "" => {}
            "record" => match session.toggle_recording_from_state().await {
                Ok(true) => info!("Recording start requested"),
                Ok(false) => info!("Recording stop requested"),
                Err(e) => warn!(error = %e, "Recording toggle rejected"),
            },
            "mute" => {
                ui.audio_muted = !ui.audio_muted;
                if let Err(e) = session.mute_local_audio(ui.audio_muted).await {
                    warn!(error = %e, "Mute failed");
                    ui.audio_muted = !ui.audio_muted;
                }
            }
            "switch" => {
                if let Err(e) = session.switch_camera().await {
                    warn!(error = %e, "Camera switch failed");
                }
            }
            "status" => match session.snapshot().await {
                Ok(snapshot) => info!(
                    channel = %snapshot.channel,
                    uid = %snapshot.local_uid,
                    has_token = snapshot.has_token,
                    engine_available = snapshot.engine_available,
                    joined = snapshot.join_attempted,
                    audio_muted = snapshot.audio_muted,
                    recording = snapshot.recording.is_some(),
                    recording_start_pending = snapshot.recording_start_pending,
                    remote_participants = ?snapshot.remote_participants,
                    "Session status"
                ),
                Err(e) => warn!(error = %e, "Failed to read session status"),
            },
            "leave" | "quit" => return,
            other => warn!(command = %other, "Unknown command"),
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
