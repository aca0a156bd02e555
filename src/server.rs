use crate::config::{log_config, Config, ServerConfig};
use crate::core_auth::Credentials;
use crate::core_daemon::signals::spawn_signal_listener;
use crate::core_daemon::{PidFile, Readiness};
use crate::core_network::network::FtpListener;
use crate::core_vfs::VirtualFs;
use crate::session::SessionRegistry;
use anyhow::{Context, Result};
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Bounds applied to every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_line_length: usize,
    pub idle_timeout: Duration,
    pub data_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl SessionLimits {
    pub fn from_config(server: &ServerConfig) -> Self {
        Self {
            max_line_length: server.max_line_length,
            idle_timeout: server.idle_timeout(),
            data_timeout: server.data_timeout(),
            shutdown_grace: server.shutdown_grace(),
        }
    }
}

/// Everything shared by the listener and the sessions. Only the registry
/// changes after startup.
#[derive(Debug)]
pub struct ServerState {
    pub config: Config,
    pub vfs: VirtualFs,
    pub credentials: Credentials,
    pub limits: SessionLimits,
    pub registry: SessionRegistry,
}

impl ServerState {
    pub fn new(config: Config) -> Result<Self> {
        let vfs = VirtualFs::new(&config.server.root_dir).with_context(|| {
            format!(
                "Root directory is not accessible: {}",
                config.server.root_dir.display()
            )
        })?;
        let credentials = Credentials::from_users(&config.users);
        let limits = SessionLimits::from_config(&config.server);
        info!(
            "Serving {} with {} configured user(s)",
            vfs.root().display(),
            credentials.len()
        );

        Ok(Self {
            config,
            vfs,
            credentials,
            limits,
            registry: SessionRegistry::new(),
        })
    }
}

/// A bound listener whose PID file is on disk.
struct Started {
    listener: FtpListener,
    pid_file: PidFile,
}

/// Runs the FTP server until a termination signal arrives.
pub async fn run(config: Config, mut readiness: Readiness) -> Result<()> {
    info!("Starting server with config:");
    log_config(&config);

    let shutdown = CancellationToken::new();
    let started = start(config, &mut readiness).await?;

    let pid_path = started.pid_file.path().to_path_buf();
    if let Err(e) = spawn_signal_listener(shutdown.clone(), pid_path) {
        readiness.notify_failed(&e);
        return Err(e.into());
    }

    finish(started, readiness, shutdown).await
}

/// Same as `run`, but stops when `shutdown` is cancelled instead of on
/// signals.
pub async fn serve_until(
    config: Config,
    mut readiness: Readiness,
    shutdown: CancellationToken,
) -> Result<()> {
    let started = start(config, &mut readiness).await?;
    finish(started, readiness, shutdown).await
}

async fn start(config: Config, readiness: &mut Readiness) -> Result<Started> {
    let result = async {
        let state = Arc::new(ServerState::new(config)?);
        let listener = FtpListener::bind(Arc::clone(&state)).await?;
        let pid_file = PidFile::create(&state.config.server.pid_file)?;
        Ok::<_, anyhow::Error>(Started { listener, pid_file })
    }
    .await;

    if let Err(e) = &result {
        error!("Failed to start server: {:#}", e);
        readiness.notify_failed(&format!("{:#}", e));
    }
    result
}

async fn finish(started: Started, mut readiness: Readiness, shutdown: CancellationToken) -> Result<()> {
    let Started { listener, pid_file } = started;
    readiness.notify_ready();

    listener.serve(shutdown).await;

    drop(pid_file);
    info!("Server stopped.");
    Ok(())
}
