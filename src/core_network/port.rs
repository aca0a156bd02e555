use crate::core_ftpcommand::reply::{send_reply, Reply, SharedWriter};
use crate::server::ServerState;
use crate::session::{DataMode, Session};
use log::{info, warn};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, PartialEq, Eq)]
pub enum EprtError {
    Syntax,
    UnsupportedProtocol,
}

/// Parses the `h1,h2,h3,h4,p1,p2` argument of PORT.
pub fn parse_port_argument(arg: &str) -> Option<SocketAddr> {
    let parts: Vec<u8> = arg
        .trim()
        .split(',')
        .map(|part| part.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .ok()?;
    if parts.len() != 6 {
        return None;
    }

    let ip = Ipv4Addr::new(parts[0], parts[1], parts[2], parts[3]);
    let port = (parts[4] as u16) << 8 | parts[5] as u16;
    if port == 0 {
        return None;
    }
    Some(SocketAddr::new(IpAddr::V4(ip), port))
}

/// Parses the `<d>af<d>addr<d>port<d>` argument of EPRT (RFC 2428).
pub fn parse_eprt_argument(arg: &str) -> Result<SocketAddr, EprtError> {
    let delimiter = arg.chars().next().ok_or(EprtError::Syntax)?;
    if !('!'..='~').contains(&delimiter) {
        return Err(EprtError::Syntax);
    }

    let fields: Vec<&str> = arg.split(delimiter).collect();
    if fields.len() != 5 || !fields[0].is_empty() || !fields[4].is_empty() {
        return Err(EprtError::Syntax);
    }

    let ip = match fields[1] {
        "1" => IpAddr::V4(fields[2].parse::<Ipv4Addr>().map_err(|_| EprtError::Syntax)?),
        "2" => IpAddr::V6(fields[2].parse::<Ipv6Addr>().map_err(|_| EprtError::Syntax)?),
        _ => return Err(EprtError::UnsupportedProtocol),
    };
    let port = fields[3].parse::<u16>().map_err(|_| EprtError::Syntax)?;
    if port == 0 {
        return Err(EprtError::Syntax);
    }
    Ok(SocketAddr::new(ip, port))
}

/// Compares two addresses, treating IPv4-mapped IPv6 as the IPv4 address.
pub fn same_host(a: IpAddr, b: IpAddr) -> bool {
    fn canonical(ip: IpAddr) -> IpAddr {
        match ip {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
            ip => ip,
        }
    }
    canonical(a) == canonical(b)
}

/// Handles the PORT (Active Mode) FTP command.
pub async fn handle_port_command(
    writer: SharedWriter,
    _state: Arc<ServerState>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    match parse_port_argument(&arg) {
        Some(addr) => set_active_mode(&writer, &session, addr).await,
        None => send_reply(&writer, &Reply::new(501, "Syntax error in parameters or arguments.")).await,
    }
}

/// Handles the EPRT (Extended Active Mode) FTP command.
pub async fn handle_eprt_command(
    writer: SharedWriter,
    _state: Arc<ServerState>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    match parse_eprt_argument(&arg) {
        Ok(addr) => set_active_mode(&writer, &session, addr).await,
        Err(EprtError::UnsupportedProtocol) => {
            send_reply(&writer, &Reply::new(522, "Network protocol not supported, use (1,2)")).await
        }
        Err(EprtError::Syntax) => {
            send_reply(&writer, &Reply::new(501, "Syntax error in parameters or arguments.")).await
        }
    }
}

/// Records the client's data address. The address must belong to the
/// client itself, so the server can't be used to connect to third parties.
async fn set_active_mode(
    writer: &SharedWriter,
    session: &Mutex<Session>,
    addr: SocketAddr,
) -> Result<(), std::io::Error> {
    let mut session = session.lock().await;
    if !same_host(addr.ip(), session.peer_addr.ip()) {
        warn!(
            "Session {}: refusing data address {} for client {}",
            session.id, addr, session.peer_addr
        );
        return send_reply(writer, &Reply::new(501, "Illegal PORT command.")).await;
    }

    info!("Session {}: active data address {}", session.id, addr);
    session.data_mode = DataMode::Active(addr);
    send_reply(writer, &Reply::new(200, "PORT command successful.")).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_port_argument() {
        assert_eq!(
            parse_port_argument("127,0,0,1,195,80"),
            Some("127.0.0.1:50000".parse().unwrap())
        );
        assert_eq!(parse_port_argument("127,0,0,1,195"), None);
        assert_eq!(parse_port_argument("127,0,0,1,195,80,1"), None);
        assert_eq!(parse_port_argument("256,0,0,1,195,80"), None);
        assert_eq!(parse_port_argument("a,b,c,d,e,f"), None);
        assert_eq!(parse_port_argument("127,0,0,1,0,0"), None);
        assert_eq!(parse_port_argument(""), None);
    }

    #[test]
    fn test_parse_eprt_argument() {
        assert_eq!(
            parse_eprt_argument("|1|132.235.1.2|6275|"),
            Ok("132.235.1.2:6275".parse().unwrap())
        );
        assert_eq!(
            parse_eprt_argument("|2|::1|5282|"),
            Ok("[::1]:5282".parse().unwrap())
        );
        assert_eq!(parse_eprt_argument("|3|foo|21|"), Err(EprtError::UnsupportedProtocol));
        assert_eq!(parse_eprt_argument("|1|::1|21|"), Err(EprtError::Syntax));
        assert_eq!(parse_eprt_argument("|1|127.0.0.1|0|"), Err(EprtError::Syntax));
        assert_eq!(parse_eprt_argument("|1|127.0.0.1|21"), Err(EprtError::Syntax));
        assert_eq!(parse_eprt_argument(""), Err(EprtError::Syntax));
    }

    #[test]
    fn test_same_host_handles_mapped_addresses() {
        let v4: IpAddr = "127.0.0.1".parse().unwrap();
        let mapped: IpAddr = "::ffff:127.0.0.1".parse().unwrap();
        let other: IpAddr = "10.0.0.1".parse().unwrap();
        assert!(same_host(v4, mapped));
        assert!(same_host(mapped, v4));
        assert!(!same_host(v4, other));
    }
}
