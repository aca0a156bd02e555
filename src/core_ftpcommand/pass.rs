use crate::core_ftpcommand::reply::{send_reply, Reply, SharedWriter};
use crate::server::ServerState;
use crate::session::{Session, SessionState};
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handles the PASS FTP command.
///
/// Only valid right after USER. A failed attempt sends the session back
/// to its initial state and forgets the candidate username.
pub async fn handle_pass_command(
    writer: SharedWriter,
    state: Arc<ServerState>,
    session: Arc<Mutex<Session>>,
    password: String,
) -> Result<(), std::io::Error> {
    let mut session = session.lock().await;

    let candidate = match &session.state {
        SessionState::UsernameGiven(name) => name.clone(),
        _ => {
            return send_reply(&writer, &Reply::new(503, "Bad sequence of commands.")).await;
        }
    };

    if state.credentials.verify(&candidate, &password).await {
        info!("Session {}: user {} logged in", session.id, candidate);
        session.state = SessionState::Authenticated(candidate);
        send_reply(&writer, &Reply::new(230, "User logged in, proceed.")).await
    } else {
        warn!(
            "Session {}: failed login for {:?} from {}",
            session.id, candidate, session.peer_addr
        );
        session.state = SessionState::Connected;
        send_reply(&writer, &Reply::new(530, "Login incorrect.")).await
    }
}
