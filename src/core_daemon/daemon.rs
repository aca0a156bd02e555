use crate::core_daemon::error::DaemonError;
use log::warn;
use std::io::Write;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

const READY_LINE: &str = "READY";
const ERROR_PREFIX: &str = "ERROR ";

/// Reports startup success or failure to whoever launched the process.
/// In the foreground there is nobody to tell and both calls are no-ops.
#[derive(Debug, Default)]
pub struct Readiness {
    #[cfg(unix)]
    channel: Option<UnixStream>,
}

impl Readiness {
    pub fn foreground() -> Self {
        Self::default()
    }

    #[cfg(unix)]
    fn with_channel(channel: UnixStream) -> Self {
        Self {
            channel: Some(channel),
        }
    }

    pub fn notify_ready(&mut self) {
        self.send(READY_LINE.to_string());
    }

    pub fn notify_failed(&mut self, error: &dyn std::fmt::Display) {
        let message = error.to_string().replace(['\r', '\n'], " ");
        self.send(format!("{}{}", ERROR_PREFIX, message));
    }

    #[cfg(unix)]
    fn send(&mut self, line: String) {
        // One message per process: the channel is closed after it.
        if let Some(mut channel) = self.channel.take() {
            if let Err(e) = writeln!(channel, "{}", line) {
                warn!("Could not report readiness to the launcher: {}", e);
            }
        }
    }

    #[cfg(not(unix))]
    fn send(&mut self, _line: String) {}
}

/// What the launcher learned from the detached server.
#[derive(Debug, PartialEq, Eq)]
pub enum LaunchOutcome {
    Ready,
    Failed(String),
}

pub fn parse_readiness_line(line: &str) -> LaunchOutcome {
    let line = line.trim_end_matches(['\r', '\n']);
    if line == READY_LINE {
        LaunchOutcome::Ready
    } else if let Some(message) = line.strip_prefix(ERROR_PREFIX) {
        LaunchOutcome::Failed(message.to_string())
    } else {
        LaunchOutcome::Failed(String::from("server exited before becoming ready"))
    }
}

pub enum Detached {
    /// The launching process; it should exit with this code.
    Parent { exit_code: i32 },
    /// The background server, which must report through `Readiness`.
    Child(Readiness),
}

/// Forks into the background. Must run before any thread (the tokio
/// runtime included) is started.
#[cfg(unix)]
pub fn detach() -> Result<Detached, DaemonError> {
    use nix::unistd::{fork, ForkResult};

    let (launcher_end, server_end) =
        UnixStream::pair().map_err(|e| DaemonError::Detach(e.to_string()))?;

    // SAFETY: the process is still single-threaded at this point.
    match unsafe { fork() }.map_err(|e| DaemonError::Detach(e.to_string()))? {
        ForkResult::Parent { child } => {
            drop(server_end);
            let exit_code = match wait_for_server(launcher_end) {
                LaunchOutcome::Ready => {
                    println!("ftrd started (pid {})", child);
                    0
                }
                LaunchOutcome::Failed(message) => {
                    eprintln!("ftrd: {}", message);
                    1
                }
            };
            Ok(Detached::Parent { exit_code })
        }
        ForkResult::Child => {
            drop(launcher_end);
            become_session_leader()?;
            Ok(Detached::Child(Readiness::with_channel(server_end)))
        }
    }
}

#[cfg(not(unix))]
pub fn detach() -> Result<Detached, DaemonError> {
    Err(DaemonError::Unsupported)
}

#[cfg(unix)]
fn wait_for_server(stream: UnixStream) -> LaunchOutcome {
    use std::io::{BufRead, BufReader};

    let mut line = String::new();
    match BufReader::new(stream).read_line(&mut line) {
        Ok(_) => parse_readiness_line(&line),
        Err(e) => LaunchOutcome::Failed(format!("lost contact with the server: {}", e)),
    }
}

#[cfg(unix)]
fn become_session_leader() -> Result<(), DaemonError> {
    use nix::unistd::{chdir, dup2, setsid};
    use std::os::unix::io::AsRawFd;

    setsid().map_err(|e| DaemonError::Detach(format!("setsid: {}", e)))?;
    chdir("/").map_err(|e| DaemonError::Detach(format!("chdir: {}", e)))?;

    let devnull = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")
        .map_err(|e| DaemonError::Detach(format!("/dev/null: {}", e)))?;
    for fd in 0..=2 {
        dup2(devnull.as_raw_fd(), fd).map_err(|e| DaemonError::Detach(format!("dup2: {}", e)))?;
    }
    Ok(())
}
