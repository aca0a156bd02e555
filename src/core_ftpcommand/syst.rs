use crate::core_ftpcommand::reply::{send_reply, Reply, SharedWriter};
use crate::server::ServerState;
use crate::session::Session;
use log::debug;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handles the SYST (System) FTP command.
///
/// Listings are produced in `ls -l` style whatever the host, so the server
/// always reports itself as UNIX.
pub async fn handle_syst_command(
    writer: SharedWriter,
    _state: Arc<ServerState>,
    _session: Arc<Mutex<Session>>,
    _arg: String,
) -> Result<(), std::io::Error> {
    debug!("Responding to SYST command with system type.");
    send_reply(&writer, &Reply::new(215, "UNIX Type: L8")).await
}
