use crate::constants::{SHUTDOWN_NOTICE_TIMEOUT_MS, WELCOME_MESSAGE};
use crate::core_ftpcommand::handlers::{initialize_command_handlers, CommandHandlers};
use crate::core_ftpcommand::reply::{send_reply, ControlWriter, Reply};
use crate::core_network::connection::handle_connection;
use crate::server::ServerState;
use crate::session::{Session, SessionHandle, SessionId};
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;

/// The bound control port plus everything a new session needs.
pub struct FtpListener {
    listener: TcpListener,
    state: Arc<ServerState>,
    handlers: Arc<CommandHandlers>,
}

impl FtpListener {
    pub async fn bind(state: Arc<ServerState>) -> Result<Self> {
        let address = format!(
            "{}:{}",
            state.config.server.listen_address, state.config.server.listen_port
        );
        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind control port {}", address))?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            state,
            handlers: Arc::new(initialize_command_handlers()),
        })
    }

    #[cfg(test)]
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown` fires, then closes every live
    /// session and waits for them, bounded by the configured grace period.
    pub async fn serve(self, shutdown: CancellationToken) {
        let FtpListener {
            listener,
            state,
            handlers,
        } = self;
        let mut sessions = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = finished {
                        error!("Session task failed: {}", e);
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((socket, addr)) => {
                        let state = Arc::clone(&state);
                        let handlers = Arc::clone(&handlers);
                        match start_session(socket, addr, state, handlers).await {
                            Ok(task) => {
                                sessions.spawn(task);
                            }
                            Err(e) => warn!("Could not set up session for {}: {}", addr, e),
                        }
                    }
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
            }
        }

        drop(listener);
        info!("Shutting down, {} session(s) open", state.registry.len().await);
        drain_sessions(&state, &mut sessions).await;
    }
}

/// Greets the client, registers it and returns the task that runs it.
async fn start_session(
    socket: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<ServerState>,
    handlers: Arc<CommandHandlers>,
) -> std::io::Result<impl std::future::Future<Output = ()> + Send + 'static> {
    let local_addr = socket.local_addr()?;
    let (reader, writer) = socket.into_split();
    let writer = ControlWriter::new(writer, state.limits.idle_timeout);

    let id = state.registry.allocate_id();
    info!("New connection from {} (session {})", peer_addr, id);

    let cancel = CancellationToken::new();
    state
        .registry
        .insert(SessionHandle {
            id,
            peer_addr,
            writer: Arc::clone(&writer),
            cancel: cancel.clone(),
        })
        .await;

    if let Err(e) = send_reply(&writer, &Reply::new(220, WELCOME_MESSAGE)).await {
        state.registry.remove(id).await;
        return Err(e);
    }

    let session = Arc::new(Mutex::new(Session::new(id, peer_addr, local_addr)));
    Ok(async move {
        let registry_state = Arc::clone(&state);
        if let Err(e) = handle_connection(reader, writer, state, handlers, session, cancel).await {
            warn!("Connection error in session {}: {}", id, e);
        }
        end_session(&registry_state, id).await;
    })
}

async fn end_session(state: &ServerState, id: SessionId) {
    state.registry.remove(id).await;
    info!("Connection closed for session {}", id);
}

/// Sends every live session the 421 notice and waits for the session
/// tasks. Notices and sessions share one deadline, after which whatever is
/// left is aborted.
async fn drain_sessions(state: &ServerState, sessions: &mut JoinSet<()>) {
    let grace = state.limits.shutdown_grace;
    let deadline = Instant::now() + grace;
    let notice = Reply::new(421, "Service going down, closing control connection.");
    let notice_timeout = Duration::from_millis(SHUTDOWN_NOTICE_TIMEOUT_MS).min(grace);

    let mut notices = JoinSet::new();
    for handle in state.registry.drain().await {
        debug!("Closing session {} ({})", handle.id, handle.peer_addr);
        let notice = notice.clone();
        notices.spawn(async move { handle.close_with_notice(&notice, notice_timeout).await });
    }

    let wait_all = async {
        while notices.join_next().await.is_some() {}
        while let Some(finished) = sessions.join_next().await {
            if let Err(e) = finished {
                error!("Session task failed: {}", e);
            }
        }
    };
    if timeout_at(deadline, wait_all).await.is_err() {
        warn!(
            "{} session(s) still running after {:?}, aborting them",
            sessions.len(),
            grace
        );
        notices.abort_all();
        sessions.abort_all();
        while sessions.join_next().await.is_some() {}
    }
    info!("All sessions closed");
}
