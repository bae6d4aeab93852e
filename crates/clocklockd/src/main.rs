//! clocklockd - The clocklock background service
//!
//! This is the main entry point for the clocklockd service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - Tracking engine behind the session facade
//! - IPC server

use anyhow::{Context, Result};
use clap::Parser;
use clocklock_api::{
    API_VERSION, ClientInfo, Command, ErrorCode, ErrorInfo, Event, Response,
};
use clocklock_config::load_config_or_default;
use clocklock_core::{CoreEvent, SessionFacade, TrackingEngine};
use clocklock_ipc::{IpcServer, ServerMessage};
use clocklock_store::{SqliteStore, Store};
use clocklock_util::{RateLimiter, default_config_path, is_mock_time_active};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Clients idle for this long lose their rate-limit window
const LIMITER_IDLE: Duration = Duration::from_secs(300);

/// clocklockd - Per-domain time budgets with cooldowns
#[derive(Parser, Debug)]
#[command(name = "clocklockd")]
#[command(about = "Per-domain time budgets with cooldowns", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/clocklock/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set CLOCKLOCK_SOCKET env var)
    #[arg(short, long, env = "CLOCKLOCK_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set CLOCKLOCK_DATA_DIR env var)
    #[arg(short, long, env = "CLOCKLOCK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    facade: SessionFacade,
    ipc: Arc<IpcServer>,
    rate_limiter: RateLimiter,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let config = load_config_or_default(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            seed_rules = config.rules.len(),
            bootstrap_domain = %config.daemon.bootstrap_domain,
            "Configuration loaded"
        );

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| config.daemon.socket_path.clone());

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| config.daemon.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join("clocklock.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        let engine =
            TrackingEngine::with_bootstrap_domain(store, config.daemon.bootstrap_domain.clone());
        let mut facade = SessionFacade::new(engine);
        facade.reload().context("Failed to load tracking state")?;
        facade
            .seed_rules(&config.rules)
            .context("Failed to apply seed rules")?;

        if is_mock_time_active() {
            warn!("Mock time is active; all cooldowns are computed against a shifted clock");
        }

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        let rate_limiter =
            RateLimiter::new(config.daemon.requests_per_second, Duration::from_secs(1));

        Ok(Self {
            facade,
            ipc: Arc::new(ipc),
            rate_limiter,
        })
    }

    async fn run(self) -> Result<()> {
        let ipc = self.ipc.clone();
        let mut ipc_messages = ipc
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        let facade = Arc::new(Mutex::new(self.facade));
        let rate_limiter = Arc::new(Mutex::new(self.rate_limiter));

        let ipc_accept = ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup =
            signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        let mut prune_timer = tokio::time::interval(Duration::from_secs(60));

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }

                // SIGHUP: rules were edited outside the daemon
                _ = sighup.recv() => {
                    info!("Received SIGHUP, reloading rules");
                    let result = facade.lock().await.reload();
                    match result {
                        Ok(event) => broadcast(&ipc, vec![event]),
                        Err(e) => warn!(error = %e, "Reload failed, keeping previous state"),
                    }
                }

                _ = prune_timer.tick() => {
                    rate_limiter.lock().await.prune(LIMITER_IDLE);
                }

                Some(msg) = ipc_messages.recv() => {
                    Self::handle_ipc_message(&facade, &ipc, &rate_limiter, msg).await;
                }
            }
        }

        info!("Shutting down clocklockd");
        ipc.shutdown();
        info!("Shutdown complete");
        Ok(())
    }

    async fn handle_ipc_message(
        facade: &Arc<Mutex<SessionFacade>>,
        ipc: &Arc<IpcServer>,
        rate_limiter: &Arc<Mutex<RateLimiter>>,
        msg: ServerMessage,
    ) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                {
                    let mut limiter = rate_limiter.lock().await;
                    if !limiter.check(&client_id) {
                        let response = Response::error(
                            request.request_id,
                            ErrorInfo::new(ErrorCode::RateLimited, "Too many requests"),
                        );
                        let _ = ipc.send_response(&client_id, response).await;
                        return;
                    }
                }

                if request.api_version != API_VERSION {
                    let response = Response::error(
                        request.request_id,
                        ErrorInfo::new(
                            ErrorCode::UnsupportedVersion,
                            format!(
                                "API version {} not supported (expected {})",
                                request.api_version, API_VERSION
                            ),
                        ),
                    );
                    let _ = ipc.send_response(&client_id, response).await;
                    return;
                }

                let Some(info) = ipc.get_client_info(&client_id).await else {
                    debug!(client_id = %client_id, "Request from departed client dropped");
                    return;
                };

                let response =
                    Self::handle_command(facade, ipc, &info, request.request_id, request.command)
                        .await;

                let _ = ipc.send_response(&client_id, response).await;
            }

            ServerMessage::ClientConnected { client_id, info } => {
                debug!(
                    client_id = %client_id,
                    role = ?info.role,
                    uid = ?info.uid,
                    "Client registered"
                );
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");
                rate_limiter.lock().await.remove(&client_id);
            }
        }
    }

    async fn handle_command(
        facade: &Arc<Mutex<SessionFacade>>,
        ipc: &Arc<IpcServer>,
        client: &ClientInfo,
        request_id: u64,
        command: Command,
    ) -> Response {
        let now = clocklock_util::now();
        let dispatch = facade.lock().await.handle(client, command, now);

        broadcast(ipc, dispatch.events);
        Response::new(request_id, dispatch.result)
    }
}

fn broadcast(ipc: &IpcServer, events: Vec<CoreEvent>) {
    let now = clocklock_util::now();
    for event in events {
        ipc.broadcast_event(Event::new(event.to_payload(now)));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "clocklockd starting");

    let service = Service::new(&args).await?;
    service.run().await
}
