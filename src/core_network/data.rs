use crate::core_ftpcommand::reply::{send_reply, Reply, SharedWriter};
use crate::core_network::port::same_host;
use crate::session::DataMode;
use log::{debug, error, info, warn};
use std::io;
use std::net::IpAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};

/// Opens the data connection negotiated by PASV/EPSV or PORT/EPRT. A
/// passive listener only hands out connections coming from `client`.
pub async fn open_data_stream(
    mode: DataMode,
    client: IpAddr,
    limit: Duration,
) -> io::Result<TcpStream> {
    match mode {
        DataMode::None => Err(io::Error::new(
            io::ErrorKind::NotConnected,
            "no data connection negotiated",
        )),
        DataMode::Active(addr) => {
            debug!("Connecting to client data port {}", addr);
            timeout(limit, TcpStream::connect(addr))
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "data connect timed out"))?
        }
        DataMode::Passive(listener) => {
            let deadline = Instant::now() + limit;
            loop {
                let (stream, peer) = timeout_at(deadline, listener.accept())
                    .await
                    .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "data accept timed out"))??;
                if same_host(peer.ip(), client) {
                    debug!("Accepted data connection from: {}", peer);
                    return Ok(stream);
                }
                warn!(
                    "Refusing data connection from {}, control connection is from {}",
                    peer, client
                );
            }
        }
    }
}

/// Runs one transfer over a fresh data connection, framed by the 150/226
/// replies on the control connection.
pub async fn send_over_data_connection(
    writer: &SharedWriter,
    mode: DataMode,
    client: IpAddr,
    payload: &[u8],
    limit: Duration,
) -> Result<(), io::Error> {
    send_reply(writer, &Reply::new(150, "Here comes the directory listing.")).await?;

    let mut data_stream = match open_data_stream(mode, client, limit).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to open data connection: {}", e);
            return send_reply(writer, &Reply::new(425, "Can't open data connection.")).await;
        }
    };

    let transfer = async {
        data_stream.write_all(payload).await?;
        data_stream.shutdown().await
    };
    match timeout(limit, transfer).await {
        Ok(Ok(())) => {
            info!("Sent {} bytes over the data connection.", payload.len());
            send_reply(writer, &Reply::new(226, "Transfer complete.")).await
        }
        Ok(Err(e)) => {
            error!("Failed to send data: {:?}", e);
            send_reply(writer, &Reply::new(426, "Connection closed; transfer aborted.")).await
        }
        Err(_) => {
            error!("Data transfer timed out after {:?}", limit);
            send_reply(writer, &Reply::new(426, "Connection closed; transfer aborted.")).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(target_os = "linux")]
    use tokio::net::{TcpListener, TcpSocket};

    #[cfg(target_os = "linux")]
    async fn connect_from(source: &str, target: std::net::SocketAddr) -> TcpStream {
        let socket = TcpSocket::new_v4().unwrap();
        socket.bind(format!("{}:0", source).parse().unwrap()).unwrap();
        socket.connect(target).await.unwrap()
    }

    // Linux routes all of 127.0.0.0/8 to loopback, so a second local
    // address stands in for a foreign host.
    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_passive_accept_skips_other_hosts() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap();
        let _intruder = connect_from("127.0.0.2", target).await;
        let _client = connect_from("127.0.0.1", target).await;

        let client_ip: IpAddr = "127.0.0.1".parse().unwrap();
        let mode = DataMode::Passive(listener);
        let stream = open_data_stream(mode, client_ip, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(stream.peer_addr().unwrap().ip(), client_ip);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_passive_accept_times_out_without_the_client() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap();
        let _intruder = connect_from("127.0.0.2", target).await;

        let err = open_data_stream(
            DataMode::Passive(listener),
            "127.0.0.1".parse().unwrap(),
            Duration::from_millis(300),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn test_no_data_mode_is_not_connected() {
        let client = "127.0.0.1".parse().unwrap();
        let err = open_data_stream(DataMode::None, client, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }
}
