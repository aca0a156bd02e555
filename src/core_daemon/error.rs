// Process lifecycle errors: PID file, detachment, signals
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("ftrd is already running (pid {pid}, PID file {})", .path.display())]
    AlreadyRunning { pid: u32, path: PathBuf },

    #[error("Failed to write PID file {}: {source}", .path.display())]
    PidFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to detach from the terminal: {0}")]
    Detach(String),

    #[error("Failed to install signal handlers: {0}")]
    Signals(#[from] std::io::Error),

    #[cfg(not(unix))]
    #[error("Running as a daemon is not supported on this platform")]
    Unsupported,
}

impl DaemonError {
    pub fn pid_file(path: &std::path::Path, source: std::io::Error) -> Self {
        DaemonError::PidFile {
            path: path.to_path_buf(),
            source,
        }
    }
}
