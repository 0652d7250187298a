//! Pathways command-line host.
//!
//! Resolves the launch gate against the configured endpoint and, when the
//! gate picks the web experience, drives the session headlessly until the
//! page settles.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use pathways::application::launch::Destination;
use pathways::application::session::{NavigationState, WebSessionController};
use pathways::domain::GateError;
use pathways::infra::app_config::{config_path, load_config};
use pathways::infra::db::Database;
use pathways::infra::web_surface::HeadlessSurface;
use pathways::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "pathways")]
#[command(version)]
#[command(about = "Launch gate and persistent web session", long_about = None)]
struct Args {
    /// Database file (defaults to PATHWAYS_DB_PATH or the data directory)
    #[arg(long)]
    db: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve the gate and open the chosen experience (default)
    Launch,

    /// Show the persisted gate state
    Status,

    /// Print the device context sent to the gate
    Fingerprint,

    /// Forget the gate decision, profile and session cookies
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let db = match args.db {
        Some(path) => Database::open_at(path)?,
        None => Database::open()?,
    };
    log::debug!(target: "storage", "config path {}", config_path().display());
    let state = AppState::new(load_config(), Arc::new(db.kv_store()))?;

    match args.command.unwrap_or(Commands::Launch) {
        Commands::Launch => launch(&state).await,
        Commands::Status => status(&state),
        Commands::Fingerprint => {
            let device = state.device().probe();
            println!("{}", serde_json::to_string_pretty(&device)?);
            Ok(())
        }
        Commands::Reset => {
            state.gate.clear().context("Failed to clear gate state")?;
            state
                .session_controller()
                .forget_cookies()
                .context("Failed to clear session cookies")?;
            println!("Gate state, profile and session cookies cleared");
            Ok(())
        }
    }
}

async fn launch(state: &AppState) -> Result<()> {
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let outcome = match state.launch.launch(&cancel).await {
        Ok(outcome) => outcome,
        Err(GateError::Cancelled) => {
            println!("Launch cancelled");
            return Ok(());
        }
    };
    log::info!(target: "gate", "resolved {:?}", outcome.resolution.source);

    match outcome.destination {
        Destination::Native => {
            let onboarded = state.profiles.is_onboarding_completed().unwrap_or(false);
            println!(
                "Native experience ({})",
                if onboarded { "home" } else { "onboarding" }
            );
            Ok(())
        }
        Destination::Web { url } => {
            println!("Web session at {url}");
            let controller = state.session_controller();
            run_session(state, &controller, &cancel).await
        }
    }
}

async fn run_session(
    state: &AppState,
    controller: &WebSessionController,
    cancel: &CancellationToken,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let surface = HeadlessSurface::new(state.cookies.clone(), tx)?;
    if controller.initialize(&surface)?.is_none() {
        println!("No usable destination saved");
        return Ok(());
    }

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        match controller.handle(event) {
            NavigationState::Loaded => {
                let destination = state.gate.usable_destination()?.unwrap_or_default();
                println!("Loaded {destination} ({} cookies)", state.cookies.len());
                break;
            }
            NavigationState::Failed => {
                println!("Page failed to load; saved state left unchanged");
                break;
            }
            NavigationState::Idle | NavigationState::Loading => {}
        }
    }
    Ok(())
}

fn status(state: &AppState) -> Result<()> {
    let gate = state.gate.load().context("Failed to read gate state")?;
    println!("resolved:        {}", gate.resolved);
    println!("web session:     {}", gate.use_web_session);
    println!(
        "destination:     {}",
        gate.saved_destination_url.as_deref().unwrap_or("-")
    );
    println!(
        "onboarding done: {}",
        state.profiles.is_onboarding_completed()?
    );
    Ok(())
}
