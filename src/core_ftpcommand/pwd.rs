// src/core_ftpcommand/pwd.rs
use crate::core_ftpcommand::reply::{send_reply, Reply, SharedWriter};
use crate::core_vfs::path::quote_path;
use crate::server::ServerState;
use crate::session::Session;
use std::sync::Arc;
use tokio::sync::Mutex;

pub async fn handle_pwd_command(
    writer: SharedWriter,
    _state: Arc<ServerState>,
    session: Arc<Mutex<Session>>,
    _arg: String,
) -> Result<(), std::io::Error> {
    let current_dir = session.lock().await.current_dir.clone();
    let reply = Reply::new(
        257,
        format!("{} is the current directory.", quote_path(&current_dir)),
    );
    send_reply(&writer, &reply).await
}
