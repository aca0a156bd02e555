use crate::core_ftpcommand::reply::{send_reply, Reply, SharedWriter};
use crate::core_network::data::send_over_data_connection;
use crate::core_vfs::listing::{list_directory, ListFormat};
use crate::server::ServerState;
use crate::session::{DataMode, Session};
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

pub async fn handle_list_command(
    writer: SharedWriter,
    state: Arc<ServerState>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    send_listing(&writer, &state, &session, &arg, ListFormat::Long).await
}

pub async fn handle_nlst_command(
    writer: SharedWriter,
    state: Arc<ServerState>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    send_listing(&writer, &state, &session, &arg, ListFormat::NamesOnly).await
}

/// Drops leading `ls`-style options such as `-la`, which many clients send.
pub fn listing_target(arg: &str) -> &str {
    let mut rest = arg.trim_start();
    while rest.starts_with('-') {
        rest = match rest.find(char::is_whitespace) {
            Some(end) => rest[end..].trim_start(),
            None => "",
        };
    }
    rest
}

async fn send_listing(
    writer: &SharedWriter,
    state: &ServerState,
    session: &Mutex<Session>,
    arg: &str,
    format: ListFormat,
) -> Result<(), std::io::Error> {
    let target = match listing_target(arg) {
        "" => ".",
        target => target,
    };

    // The negotiated data mode is used up by this command, whatever the outcome.
    let (resolved, mode, client) = {
        let mut session = session.lock().await;
        let mode = session.take_data_mode();
        match state.vfs.resolve_dir(&session.current_dir, target) {
            Ok(resolved) => (resolved, mode, session.peer_addr.ip()),
            Err(e) => {
                warn!("Session {}: cannot list {:?}: {}", session.id, target, e);
                return send_reply(writer, &e.to_ftp_response()).await;
            }
        }
    };

    let lines = match list_directory(&resolved.real_path, format).await {
        Ok(lines) => lines,
        Err(e) => {
            warn!("Error reading directory {:?}: {}", resolved.real_path, e);
            return send_reply(writer, &e.to_ftp_response()).await;
        }
    };
    info!(
        "Listing {} ({} entries)",
        resolved.virtual_path,
        lines.len()
    );

    match mode {
        DataMode::None => {
            let mut reply_lines = Vec::with_capacity(lines.len() + 2);
            reply_lines.push(format!("Listing of {}:", resolved.virtual_path));
            reply_lines.extend(lines);
            reply_lines.push(String::from("Transfer complete."));
            send_reply(writer, &Reply::multiline(226, reply_lines)).await
        }
        mode => {
            let mut payload = lines.join("\r\n");
            if !payload.is_empty() {
                payload.push_str("\r\n");
            }
            send_over_data_connection(
                writer,
                mode,
                client,
                payload.as_bytes(),
                state.limits.data_timeout,
            )
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_target_skips_options() {
        assert_eq!(listing_target(""), "");
        assert_eq!(listing_target("-la"), "");
        assert_eq!(listing_target("-l -a /pub"), "/pub");
        assert_eq!(listing_target("/pub"), "/pub");
        assert_eq!(listing_target("my dir"), "my dir");
    }
}
