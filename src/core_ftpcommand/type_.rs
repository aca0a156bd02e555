use crate::core_ftpcommand::reply::{send_reply, Reply, SharedWriter};
use crate::server::ServerState;
use crate::session::{Session, TransferType};
use log::debug;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Maps a TYPE argument onto a transfer type. Only the parameters a Unix
/// server can honour are accepted: `A`, `A N`, `I` and `L 8`.
pub fn parse_type_argument(arg: &str) -> Option<TransferType> {
    let parts: Vec<String> = arg.split_whitespace().map(|s| s.to_ascii_uppercase()).collect();
    let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
    match parts.as_slice() {
        ["A"] | ["A", "N"] => Some(TransferType::Ascii),
        ["I"] | ["L", "8"] => Some(TransferType::Image),
        _ => None,
    }
}

/// Handles the TYPE FTP command.
pub async fn handle_type_command(
    writer: SharedWriter,
    _state: Arc<ServerState>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    if arg.trim().is_empty() {
        return send_reply(&writer, &Reply::new(501, "Syntax error in parameters or arguments.")).await;
    }

    let reply = match parse_type_argument(&arg) {
        Some(transfer_type) => {
            let mut session = session.lock().await;
            session.transfer_type = transfer_type;
            debug!("Session {}: TYPE {}", session.id, transfer_type.code());
            Reply::new(200, format!("Type set to {}.", transfer_type.code()))
        }
        None => Reply::new(504, "Command not implemented for that parameter."),
    };
    send_reply(&writer, &reply).await
}

/// Handles MODE. Stream mode is the only one supported.
pub async fn handle_mode_command(
    writer: SharedWriter,
    _state: Arc<ServerState>,
    _session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    let reply = match arg.trim().to_ascii_uppercase().as_str() {
        "" => Reply::new(501, "Syntax error in parameters or arguments."),
        "S" => Reply::new(200, "Mode set to S."),
        _ => Reply::new(504, "Command not implemented for that parameter."),
    };
    send_reply(&writer, &reply).await
}

/// Handles STRU. File structure is the only one supported.
pub async fn handle_stru_command(
    writer: SharedWriter,
    _state: Arc<ServerState>,
    _session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    let reply = match arg.trim().to_ascii_uppercase().as_str() {
        "" => Reply::new(501, "Syntax error in parameters or arguments."),
        "F" => Reply::new(200, "Structure set to F."),
        _ => Reply::new(504, "Command not implemented for that parameter."),
    };
    send_reply(&writer, &reply).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_argument() {
        assert_eq!(parse_type_argument("A"), Some(TransferType::Ascii));
        assert_eq!(parse_type_argument("a n"), Some(TransferType::Ascii));
        assert_eq!(parse_type_argument("I"), Some(TransferType::Image));
        assert_eq!(parse_type_argument("L 8"), Some(TransferType::Image));
        assert_eq!(parse_type_argument("E"), None);
        assert_eq!(parse_type_argument("L 7"), None);
        assert_eq!(parse_type_argument("A T"), None);
    }
}
