use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_ftpcommand::reply::{send_reply, Reply, SharedWriter};
use crate::server::ServerState;
use crate::session::Session;
use std::sync::Arc;
use tokio::sync::Mutex;

const VERBS_PER_LINE: usize = 8;

pub fn help_reply() -> Reply {
    let verbs: Vec<&str> = FtpCommand::all().iter().map(|cmd| cmd.as_str()).collect();

    let mut lines = vec![String::from("The following commands are recognized:")];
    lines.extend(verbs.chunks(VERBS_PER_LINE).map(|chunk| format!(" {}", chunk.join(" "))));
    lines.push(String::from("Help OK."));
    Reply::multiline(214, lines)
}

/// Handles HELP. Arguments are accepted but ignored.
pub async fn handle_help_command(
    writer: SharedWriter,
    _state: Arc<ServerState>,
    _session: Arc<Mutex<Session>>,
    _arg: String,
) -> Result<(), std::io::Error> {
    send_reply(&writer, &help_reply()).await
}
