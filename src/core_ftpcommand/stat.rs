use crate::core_ftpcommand::reply::{send_reply, Reply, SharedWriter};
use crate::core_ftpcommand::list::listing_target;
use crate::core_vfs::listing::{list_directory, ListFormat};
use crate::server::ServerState;
use crate::session::{DataMode, Session, TransferType};
use log::warn;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handles STAT. Without an argument it describes the session (211), with
/// one it lists that directory over the control connection (213).
pub async fn handle_stat_command(
    writer: SharedWriter,
    state: Arc<ServerState>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    let target = listing_target(&arg);
    if target.is_empty() {
        let reply = session_status(&*session.lock().await);
        return send_reply(&writer, &reply).await;
    }

    let resolved = {
        let session = session.lock().await;
        match state.vfs.resolve_dir(&session.current_dir, target) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("Session {}: STAT {:?} failed: {}", session.id, target, e);
                return send_reply(&writer, &e.to_ftp_response()).await;
            }
        }
    };

    let reply = match list_directory(&resolved.real_path, ListFormat::Long).await {
        Ok(entries) => {
            let mut lines = Vec::with_capacity(entries.len() + 2);
            lines.push(format!("Status of {}:", resolved.virtual_path));
            lines.extend(entries);
            lines.push(String::from("End of status."));
            Reply::multiline(213, lines)
        }
        Err(e) => e.to_ftp_response(),
    };
    send_reply(&writer, &reply).await
}

pub fn session_status(session: &Session) -> Reply {
    let login = match session.username() {
        Some(name) => format!(" Logged in as {}", name),
        None => String::from(" Not logged in"),
    };
    let transfer_type = match session.transfer_type {
        TransferType::Ascii => "ASCII",
        TransferType::Image => "BINARY",
    };
    let data = match &session.data_mode {
        DataMode::None => String::from("none"),
        DataMode::Active(addr) => format!("active to {}", addr),
        DataMode::Passive(listener) => match listener.local_addr() {
            Ok(addr) => format!("passive on {}", addr),
            Err(_) => String::from("passive"),
        },
    };

    Reply::multiline(
        211,
        vec![
            String::from("FTP server status:"),
            format!(" Connected to {}", session.peer_addr),
            login,
            format!(" Working directory {}", session.current_dir),
            format!(" TYPE: {}", transfer_type),
            format!(" Data connection: {}", data),
            String::from("End of status."),
        ],
    )
}
