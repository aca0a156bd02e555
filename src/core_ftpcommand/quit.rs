use crate::core_ftpcommand::reply::{send_reply, Reply, SharedWriter};
use crate::server::ServerState;
use crate::session::{Session, SessionState};
use log::info;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handles the QUIT FTP command.
///
/// Marks the session closed; the engine tears the connection down once
/// the reply is out.
pub async fn handle_quit_command(
    writer: SharedWriter,
    _state: Arc<ServerState>,
    session: Arc<Mutex<Session>>,
    _arg: String,
) -> Result<(), std::io::Error> {
    {
        let mut session = session.lock().await;
        info!("Session {}: QUIT received, closing connection.", session.id);
        session.state = SessionState::Closed;
    }
    send_reply(&writer, &Reply::new(221, "Service closing control connection.")).await
}
