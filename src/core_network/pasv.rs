use crate::core_ftpcommand::reply::{send_reply, Reply, SharedWriter};
use crate::server::ServerState;
use crate::session::{DataMode, Session};
use log::{debug, error};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// Sets up a passive mode (PASV) listener and sends the 227 reply.
pub async fn handle_pasv_command(
    writer: SharedWriter,
    state: Arc<ServerState>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    if !arg.is_empty() {
        return send_reply(&writer, &Reply::new(501, "Syntax error in parameters or arguments.")).await;
    }

    let mut session = session.lock().await;
    let advertised = match advertised_ipv4(state.config.server.pasv_address.as_deref(), session.local_addr.ip()) {
        Some(ip) => ip,
        None => {
            return send_reply(
                &writer,
                &Reply::new(425, "Can't open data connection, use EPSV over IPv6."),
            )
            .await;
        }
    };

    let listener = match setup_pasv_listener(session.local_addr.ip()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to set up PASV listener: {}", e);
            return send_reply(&writer, &Reply::new(425, "Can't open data connection.")).await;
        }
    };
    let port = listener.local_addr()?.port();
    session.data_mode = DataMode::Passive(listener);

    let reply = Reply::new(
        227,
        format!("Entering Passive Mode ({}).", format_pasv_address(advertised, port)),
    );
    send_reply(&writer, &reply).await
}

/// Handles EPSV (RFC 2428). Only the port is announced, the client reuses
/// the control connection's address.
pub async fn handle_epsv_command(
    writer: SharedWriter,
    _state: Arc<ServerState>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    match arg.to_ascii_uppercase().as_str() {
        "" | "1" | "2" => {}
        "ALL" => return send_reply(&writer, &Reply::new(200, "EPSV ALL ok.")).await,
        _ => {
            return send_reply(&writer, &Reply::new(501, "Syntax error in parameters or arguments.")).await;
        }
    }

    let mut session = session.lock().await;
    let listener = match setup_pasv_listener(session.local_addr.ip()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to set up EPSV listener: {}", e);
            return send_reply(&writer, &Reply::new(425, "Can't open data connection.")).await;
        }
    };
    let port = listener.local_addr()?.port();
    session.data_mode = DataMode::Passive(listener);

    let reply = Reply::new(229, format!("Entering Extended Passive Mode (|||{}|)", port));
    send_reply(&writer, &reply).await
}

/// Binds an ephemeral data port on the interface the client reached us on.
pub async fn setup_pasv_listener(ip: IpAddr) -> Result<TcpListener, std::io::Error> {
    let listener = TcpListener::bind((ip, 0)).await?;
    debug!("PASV listener set up on {}", listener.local_addr()?);
    Ok(listener)
}

/// The configured public address wins; otherwise the local address of the
/// control connection, if it is (or maps to) IPv4.
pub fn advertised_ipv4(configured: Option<&str>, local: IpAddr) -> Option<Ipv4Addr> {
    if let Some(configured) = configured {
        return configured.parse().ok();
    }
    match local {
        IpAddr::V4(ip) => Some(ip),
        IpAddr::V6(ip) => ip.to_ipv4_mapped(),
    }
}

pub fn format_pasv_address(ip: Ipv4Addr, port: u16) -> String {
    let [a, b, c, d] = ip.octets();
    format!("{},{},{},{},{},{}", a, b, c, d, port >> 8, port & 0xff)
}
