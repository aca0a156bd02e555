use crate::core_ftpcommand::reply::{send_reply, Reply, SharedWriter};
use crate::server::ServerState;
use crate::session::Session;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Extensions announced by FEAT, beyond RFC 959.
pub const FEATURES: &[&str] = &["EPRT", "EPSV"];

pub fn feat_reply() -> Reply {
    let mut lines = vec![String::from("Features:")];
    lines.extend(FEATURES.iter().map(|feature| format!(" {}", feature)));
    lines.push(String::from("End"));
    Reply::multiline(211, lines)
}

/// Handles the FEAT (Feature) FTP command.
pub async fn handle_feat_command(
    writer: SharedWriter,
    _state: Arc<ServerState>,
    _session: Arc<Mutex<Session>>,
    _arg: String,
) -> Result<(), std::io::Error> {
    send_reply(&writer, &feat_reply()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feat_reply_lists_extensions() {
        assert_eq!(
            feat_reply().to_wire(),
            "211-Features:\r\n211- EPRT\r\n211- EPSV\r\n211 End\r\n"
        );
    }
}
