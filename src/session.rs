use crate::core_ftpcommand::reply::{send_reply, Reply, SharedWriter};
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Login progress of a control connection. The username only exists once
/// authenticated, so an anonymous session can never carry one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    UsernameGiven(String),
    Authenticated(String),
    Closed,
}

/// How the next LIST/NLST reaches the client.
#[derive(Debug, Default)]
pub enum DataMode {
    /// Nothing negotiated, listings are sent inline on the control connection.
    #[default]
    None,
    /// PORT/EPRT: connect to the client.
    Active(SocketAddr),
    /// PASV/EPSV: the client connects to this listener.
    Passive(TcpListener),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Ascii,
    Image,
}

impl TransferType {
    pub fn code(self) -> &'static str {
        match self {
            TransferType::Ascii => "A",
            TransferType::Image => "I",
        }
    }
}

#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub peer_addr: SocketAddr,
    pub local_addr: SocketAddr,
    pub state: SessionState,
    pub current_dir: String,
    pub data_mode: DataMode,
    pub transfer_type: TransferType,
}

impl Session {
    pub fn new(id: SessionId, peer_addr: SocketAddr, local_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            local_addr,
            state: SessionState::Connected,
            current_dir: String::from("/"),
            data_mode: DataMode::None,
            transfer_type: TransferType::Ascii,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated(_))
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn username(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated(name) => Some(name),
            _ => None,
        }
    }

    /// Starts a new login attempt, dropping whatever the previous login set up.
    pub fn begin_login(&mut self, username: String) {
        self.state = SessionState::UsernameGiven(username);
        self.current_dir = String::from("/");
        self.data_mode = DataMode::None;
    }

    pub fn take_data_mode(&mut self) -> DataMode {
        std::mem::take(&mut self.data_mode)
    }
}

/// What the listener keeps about a live session: enough to tell it the
/// server is going away and to make it stop.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    pub peer_addr: SocketAddr,
    pub writer: SharedWriter,
    pub cancel: CancellationToken,
}

impl SessionHandle {
    /// Best-effort 421 notice followed by cancellation of the session task.
    pub async fn close_with_notice(&self, reply: &Reply, write_timeout: Duration) {
        match tokio::time::timeout(write_timeout, send_reply(&self.writer, reply)).await {
            Ok(Ok(())) => debug!("Shutdown notice sent to session {}", self.id),
            Ok(Err(e)) => debug!("Could not notify session {}: {}", self.id, e),
            Err(_) => warn!("Timed out notifying session {} ({})", self.id, self.peer_addr),
        }
        self.cancel.cancel();
    }
}

/// Live sessions keyed by id. Every access goes through the mutex.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    next_id: AtomicU64,
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_id(&self) -> SessionId {
        SessionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub async fn insert(&self, handle: SessionHandle) {
        self.sessions.lock().await.insert(handle.id, handle);
    }

    pub async fn remove(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions.lock().await.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Empties the registry, handing back every session that was live.
    pub async fn drain(&self) -> Vec<SessionHandle> {
        let mut sessions = self.sessions.lock().await;
        let mut handles: Vec<SessionHandle> = sessions.drain().map(|(_, h)| h).collect();
        handles.sort_by_key(|h| h.id);
        handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_ftpcommand::reply::ControlWriter;
    use tokio::net::{TcpListener, TcpStream};

    fn addr() -> SocketAddr {
        "127.0.0.1:21".parse().unwrap()
    }

    #[test]
    fn test_new_session_starts_at_root_unauthenticated() {
        let session = Session::new(SessionId(1), addr(), addr());
        assert_eq!(session.current_dir, "/");
        assert_eq!(session.state, SessionState::Connected);
        assert!(!session.is_authenticated());
        assert_eq!(session.username(), None);
        assert!(matches!(session.data_mode, DataMode::None));
    }

    #[test]
    fn test_username_only_visible_once_authenticated() {
        let mut session = Session::new(SessionId(1), addr(), addr());
        session.begin_login("jt".to_string());
        assert_eq!(session.username(), None);
        session.state = SessionState::Authenticated("jt".to_string());
        assert_eq!(session.username(), Some("jt"));
    }

    #[test]
    fn test_begin_login_resets_directory_and_data_mode() {
        let mut session = Session::new(SessionId(1), addr(), addr());
        session.current_dir = "/pub".to_string();
        session.data_mode = DataMode::Active(addr());
        session.begin_login("jt".to_string());
        assert_eq!(session.current_dir, "/");
        assert!(matches!(session.data_mode, DataMode::None));
    }

    #[test]
    fn test_take_data_mode_is_one_shot() {
        let mut session = Session::new(SessionId(1), addr(), addr());
        session.data_mode = DataMode::Active(addr());
        assert!(matches!(session.take_data_mode(), DataMode::Active(_)));
        assert!(matches!(session.take_data_mode(), DataMode::None));
    }

    #[test]
    fn test_session_ids_are_monotonic() {
        let registry = SessionRegistry::new();
        let first = registry.allocate_id();
        let second = registry.allocate_id();
        assert!(second > first);
        assert_eq!(first.to_string(), "#1");
    }

    #[tokio::test]
    async fn test_registry_insert_remove_drain() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let local = listener.local_addr().unwrap();
        let _client_a = TcpStream::connect(local).await.unwrap();
        let (a, _) = listener.accept().await.unwrap();
        let _client_b = TcpStream::connect(local).await.unwrap();
        let (b, _) = listener.accept().await.unwrap();

        let registry = SessionRegistry::new();
        let mut ids = Vec::new();
        for stream in [a, b] {
            let (_read, write) = stream.into_split();
            let id = registry.allocate_id();
            ids.push(id);
            registry
                .insert(SessionHandle {
                    id,
                    peer_addr: local,
                    writer: ControlWriter::new(write, Duration::from_secs(5)),
                    cancel: CancellationToken::new(),
                })
                .await;
        }
        assert_eq!(registry.len().await, 2);

        assert!(registry.remove(ids[0]).await.is_some());
        assert!(registry.remove(ids[0]).await.is_none());
        assert_eq!(registry.len().await, 1);

        let drained = registry.drain().await;
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].id, ids[1]);
        assert_eq!(registry.len().await, 0);
    }
}
