use crate::core_ftpcommand::reply::{send_reply, Reply, SharedWriter};
use crate::server::ServerState;
use crate::session::Session;
use log::info;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handles the USER FTP command.
///
/// The name is only remembered as a candidate; whether it exists is not
/// revealed until PASS, and then only as a generic 530.
///
/// # Arguments
///
/// * `writer` - The shared control connection writer.
/// * `_state` - The server state (not used by this command).
/// * `session` - The session of the client.
/// * `username` - The username provided by the client.
pub async fn handle_user_command(
    writer: SharedWriter,
    _state: Arc<ServerState>,
    session: Arc<Mutex<Session>>,
    username: String,
) -> Result<(), std::io::Error> {
    if username.is_empty() {
        return send_reply(&writer, &Reply::new(501, "Syntax error in parameters or arguments.")).await;
    }

    {
        let mut session = session.lock().await;
        if let Some(previous) = session.username() {
            info!("Session {}: {} starts a new login as {}", session.id, previous, username);
        } else {
            info!("Session {}: USER {}", session.id, username);
        }
        session.begin_login(username);
    }

    send_reply(&writer, &Reply::new(331, "User name okay, need password.")).await
}
