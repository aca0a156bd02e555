use crate::core_ftpcommand::reply::{send_reply, Reply, SharedWriter};
use crate::server::ServerState;
use crate::session::Session;
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

pub async fn handle_cwd_command(
    writer: SharedWriter,
    state: Arc<ServerState>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    if arg.is_empty() {
        return send_reply(&writer, &Reply::new(501, "Syntax error in parameters or arguments.")).await;
    }
    change_directory(&writer, &state, &session, &arg).await
}

/// Moves the session to `target`, leaving the working directory untouched
/// on any failure.
pub async fn change_directory(
    writer: &SharedWriter,
    state: &ServerState,
    session: &Mutex<Session>,
    target: &str,
) -> Result<(), std::io::Error> {
    let mut session = session.lock().await;

    match state.vfs.resolve_dir(&session.current_dir, target) {
        Ok(resolved) => {
            info!(
                "Session {}: directory changed to {}",
                session.id, resolved.virtual_path
            );
            session.current_dir = resolved.virtual_path;
            send_reply(writer, &Reply::new(250, "Directory successfully changed.")).await
        }
        Err(e) => {
            warn!(
                "Session {}: CWD {:?} from {} failed: {}",
                session.id, target, session.current_dir, e
            );
            send_reply(writer, &Reply::new(550, "Failed to change directory.")).await
        }
    }
}
