use crate::core_ftpcommand::cwd::change_directory;
use crate::core_ftpcommand::reply::SharedWriter;
use crate::server::ServerState;
use crate::session::Session;
use std::sync::Arc;
use tokio::sync::Mutex;

/// CDUP is `CWD ..`; at the root it fails like any other escape attempt.
pub async fn handle_cdup_command(
    writer: SharedWriter,
    state: Arc<ServerState>,
    session: Arc<Mutex<Session>>,
    _arg: String,
) -> Result<(), std::io::Error> {
    change_directory(&writer, &state, &session, "..").await
}
