use log::trace;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

/// The write half of a control connection. A client that stops reading
/// can hold a reply for at most `write_timeout`.
#[derive(Debug)]
pub struct ControlWriter {
    stream: Mutex<OwnedWriteHalf>,
    write_timeout: Duration,
}

/// Shared between the session engine and the registry (for the shutdown
/// notice).
pub type SharedWriter = Arc<ControlWriter>;

impl ControlWriter {
    pub fn new(stream: OwnedWriteHalf, write_timeout: Duration) -> SharedWriter {
        Arc::new(Self {
            stream: Mutex::new(stream),
            write_timeout,
        })
    }

    /// Writes and flushes `bytes`, giving up with `TimedOut` once the
    /// write timeout has passed, waiting for the lock included.
    pub async fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        let write = async {
            let mut stream = self.stream.lock().await;
            stream.write_all(bytes).await?;
            stream.flush().await
        };
        match tokio::time::timeout(self.write_timeout, write).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("client did not accept a reply within {:?}", self.write_timeout),
            )),
        }
    }

    /// Half-closes the connection. Bounded like a write.
    pub async fn shutdown(&self) -> io::Result<()> {
        let shutdown = async { self.stream.lock().await.shutdown().await };
        tokio::time::timeout(self.write_timeout, shutdown)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "shutdown timed out"))?
    }
}

/// A numeric status reply. More than one line uses continuation framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: u16,
    lines: Vec<String>,
}

impl Reply {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            lines: vec![message.into()],
        }
    }

    /// Every line but the last is sent as `<code>-<line>`, the last as
    /// `<code> <line>`. An empty `lines` yields a bare `<code> ` reply.
    pub fn multiline(code: u16, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    pub fn to_wire(&self) -> String {
        let mut wire = String::new();
        let last = self.lines.len().saturating_sub(1);
        for (i, line) in self.lines.iter().enumerate() {
            let separator = if i == last { ' ' } else { '-' };
            // A bare CR or LF inside a line would end the reply early.
            let line = line.replace(['\r', '\n'], "?");
            wire.push_str(&format!("{}{}{}\r\n", self.code, separator, line));
        }
        if self.lines.is_empty() {
            wire.push_str(&format!("{} \r\n", self.code));
        }
        wire
    }
}

/// Sends a reply to the client and flushes it.
pub async fn send_reply(writer: &SharedWriter, reply: &Reply) -> Result<(), std::io::Error> {
    let wire = reply.to_wire();
    trace!("-> {}", wire.trim_end());
    writer.write_all(wire.as_bytes()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_reply() {
        assert_eq!(
            Reply::new(331, "User name okay, need password.").to_wire(),
            "331 User name okay, need password.\r\n"
        );
    }

    #[test]
    fn test_welcome_banner_keeps_trailing_space() {
        let welcome = Reply::new(220, crate::constants::WELCOME_MESSAGE);
        assert_eq!(welcome.to_wire().as_bytes(), b"220 Service Ready. \r\n");
    }

    #[test]
    fn test_multiline_reply_framing() {
        let reply = Reply::multiline(
            211,
            vec!["Features:".to_string(), "EPSV".to_string(), "End".to_string()],
        );
        assert_eq!(reply.to_wire(), "211-Features:\r\n211-EPSV\r\n211 End\r\n");
    }

    #[test]
    fn test_empty_multiline_reply() {
        assert_eq!(Reply::multiline(226, Vec::new()).to_wire(), "226 \r\n");
    }

    #[test]
    fn test_line_breaks_inside_a_line_are_replaced() {
        let reply = Reply::multiline(
            226,
            vec!["x\r\n226 done".to_string(), "Transfer complete.".to_string()],
        );
        assert_eq!(reply.to_wire(), "226-x??226 done\r\n226 Transfer complete.\r\n");
    }

    #[tokio::test]
    async fn test_write_gives_up_when_client_stops_reading() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let _client = tokio::net::TcpStream::connect(listener.local_addr().unwrap())
            .await
            .unwrap();
        let (server, _) = listener.accept().await.unwrap();
        let (_read, write) = server.into_split();
        let writer = ControlWriter::new(write, Duration::from_millis(200));

        // Nothing reads on the client side, so the socket buffers fill up.
        let chunk = vec![b'x'; 1 << 20];
        let mut result = Ok(());
        for _ in 0..256 {
            result = writer.write_all(&chunk).await;
            if result.is_err() {
                break;
            }
        }
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::TimedOut);
    }
}
