use crate::core_daemon::error::DaemonError;
use log::{info, warn};
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Waits for termination signals. The first one cancels `shutdown`; a
/// second one removes the PID file and exits at once.
#[cfg(unix)]
pub fn spawn_signal_listener(
    shutdown: CancellationToken,
    pid_file: PathBuf,
) -> Result<JoinHandle<()>, DaemonError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigquit = signal(SignalKind::quit())?;

    Ok(tokio::spawn(async move {
        let name = next_signal(&mut sigterm, &mut sigint, &mut sigquit).await;
        info!("Received {}, shutting down", name);
        shutdown.cancel();

        let name = next_signal(&mut sigterm, &mut sigint, &mut sigquit).await;
        force_exit(name, &pid_file);
    }))
}

#[cfg(unix)]
async fn next_signal(
    sigterm: &mut tokio::signal::unix::Signal,
    sigint: &mut tokio::signal::unix::Signal,
    sigquit: &mut tokio::signal::unix::Signal,
) -> &'static str {
    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
        _ = sigquit.recv() => "SIGQUIT",
    }
}

#[cfg(not(unix))]
pub fn spawn_signal_listener(
    shutdown: CancellationToken,
    pid_file: PathBuf,
) -> Result<JoinHandle<()>, DaemonError> {
    Ok(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        info!("Received Ctrl+C, shutting down");
        shutdown.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            force_exit("Ctrl+C", &pid_file);
        }
    }))
}

fn force_exit(signal_name: &str, pid_file: &Path) -> ! {
    std::process::exit(abandon_shutdown(signal_name, pid_file));
}

/// Cleanup for a second signal: the PID file goes, graceful shutdown is
/// given up. Returns the exit status.
fn abandon_shutdown(signal_name: &str, pid_file: &Path) -> i32 {
    warn!("Received {} during shutdown, exiting immediately", signal_name);
    if let Err(e) = std::fs::remove_file(pid_file) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove PID file {}: {}", pid_file.display(), e);
        }
    }
    1
}
