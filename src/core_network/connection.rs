use crate::core_ftpcommand::ftpcommand::{Command, FtpCommand};
use crate::core_ftpcommand::handlers::CommandHandlers;
use crate::core_ftpcommand::reply::{send_reply, Reply, SharedWriter};
use crate::server::ServerState;
use crate::session::Session;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Debug, PartialEq, Eq)]
pub enum LineRead {
    Line(String),
    /// A complete line that is not valid UTF-8. Paths are handled as
    /// UTF-8 throughout, so such a line is refused rather than altered.
    NotUtf8,
    TooLong,
    Eof,
}

/// Reads one `\n`-terminated line of at most `max_len` bytes, terminator
/// included. Never buffers more than `max_len + 1` bytes of a line.
pub async fn read_command_line<R>(reader: &mut R, max_len: usize) -> std::io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let limit = max_len as u64 + 1;
    let n = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;

    if n == 0 {
        return Ok(LineRead::Eof);
    }
    if buf.len() > max_len {
        return Ok(LineRead::TooLong);
    }
    if buf.last() != Some(&b'\n') {
        // Peer closed in the middle of a line.
        return Ok(LineRead::Eof);
    }
    match String::from_utf8(buf) {
        Ok(line) => Ok(LineRead::Line(line)),
        Err(_) => Ok(LineRead::NotUtf8),
    }
}

/// Drives one control connection until QUIT, disconnect, a limit is hit
/// or `cancel` fires. Replies are written through `writer`, which the
/// registry shares for the shutdown notice.
pub async fn handle_connection(
    reader: OwnedReadHalf,
    writer: SharedWriter,
    state: Arc<ServerState>,
    handlers: Arc<CommandHandlers>,
    session: Arc<Mutex<Session>>,
    cancel: CancellationToken,
) -> Result<(), std::io::Error> {
    let id = session.lock().await.id;
    let limits = state.limits;
    let mut reader = BufReader::new(reader);

    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Session {}: cancelled", id);
                break;
            }
            read = tokio::time::timeout(
                limits.idle_timeout,
                read_command_line(&mut reader, limits.max_line_length),
            ) => read,
        };

        let line = match read {
            Err(_) => {
                info!("Session {}: idle for {:?}, closing", id, limits.idle_timeout);
                let reply = Reply::new(421, "Timeout, closing control connection.");
                let _ = send_reply(&writer, &reply).await;
                break;
            }
            Ok(Err(e)) => {
                warn!("Session {}: read error: {}", id, e);
                break;
            }
            Ok(Ok(LineRead::Eof)) => {
                info!("Session {}: client disconnected", id);
                break;
            }
            Ok(Ok(LineRead::TooLong)) => {
                warn!(
                    "Session {}: command line longer than {} bytes",
                    id, limits.max_line_length
                );
                let reply = Reply::new(421, "Command line too long, closing control connection.");
                let _ = send_reply(&writer, &reply).await;
                break;
            }
            Ok(Ok(LineRead::NotUtf8)) => {
                debug!("Session {}: command line is not valid UTF-8", id);
                let reply = Reply::new(501, "Syntax error in parameters or arguments.");
                if let Err(e) = send_reply(&writer, &reply).await {
                    warn!("Session {}: error sending reply: {}", id, e);
                    break;
                }
                continue;
            }
            Ok(Ok(LineRead::Line(line))) => line,
        };

        if let Err(e) = dispatch(&line, &writer, &state, &handlers, &session).await {
            warn!("Session {}: error handling command: {}", id, e);
            break;
        }

        if session.lock().await.is_closed() {
            break;
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!("Session {}: shutdown of control connection failed: {}", id, e);
    }
    Ok(())
}

/// Parses one line, applies the login gate and runs the matching handler.
async fn dispatch(
    line: &str,
    writer: &SharedWriter,
    state: &Arc<ServerState>,
    handlers: &CommandHandlers,
    session: &Arc<Mutex<Session>>,
) -> Result<(), std::io::Error> {
    let command = Command::parse(line);
    let ftp_command = match FtpCommand::from_str(&command.verb) {
        Some(cmd) => cmd,
        None => {
            debug!("Unrecognized command: {:?}", command.verb);
            return send_reply(writer, &Reply::new(500, "Syntax error, command unrecognized.")).await;
        }
    };

    {
        let session = session.lock().await;
        debug!("Session {}: <- {}", session.id, loggable(ftp_command, &command));
        if ftp_command.requires_login() && !session.is_authenticated() {
            return send_reply(writer, &Reply::new(530, "Please login with USER and PASS.")).await;
        }
    }

    match handlers.get(&ftp_command) {
        Some(handler) => {
            handler(
                Arc::clone(writer),
                Arc::clone(state),
                Arc::clone(session),
                command.argument.unwrap_or_default(),
            )
            .await
        }
        None => send_reply(writer, &Reply::new(502, "Command not implemented.")).await,
    }
}

/// The command as it may appear in logs: secrets are masked.
fn loggable(ftp_command: FtpCommand, command: &Command) -> String {
    match (&command.argument, ftp_command) {
        (Some(_), FtpCommand::PASS) => String::from("PASS ****"),
        (Some(arg), _) => format!("{} {}", command.verb, arg),
        (None, _) => command.verb.clone(),
    }
}
