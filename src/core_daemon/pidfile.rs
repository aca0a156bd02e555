use crate::core_daemon::error::DaemonError;
use log::{info, warn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Holds the PID file for as long as the server runs and removes it on drop.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Writes the current pid to `path`. Fails if the file names another
    /// process that is still alive; a stale file is replaced.
    pub fn create(path: &Path) -> Result<Self, DaemonError> {
        if let Some(pid) = read_pid(path) {
            if pid != std::process::id() && process_is_alive(pid) {
                return Err(DaemonError::AlreadyRunning {
                    pid,
                    path: path.to_path_buf(),
                });
            }
            warn!("Replacing stale PID file {} (pid {})", path.display(), pid);
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| DaemonError::pid_file(path, e))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)
            .map_err(|e| DaemonError::pid_file(path, e))?;
        writeln!(file, "{}", std::process::id()).map_err(|e| DaemonError::pid_file(path, e))?;
        file.sync_all().map_err(|e| DaemonError::pid_file(path, e))?;

        info!("PID file written: {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => info!("PID file removed: {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove PID file {}: {}", self.path.display(), e),
        }
    }
}

/// The pid recorded in `path`, if the file exists and holds one.
pub fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(unix)]
pub fn process_is_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let pid = match i32::try_from(pid) {
        Ok(pid) if pid > 0 => pid,
        _ => return false,
    };
    // Signal 0 only checks that the process exists. EPERM means it does,
    // under another user.
    match kill(Pid::from_raw(pid), None) {
        Ok(()) | Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
pub fn process_is_alive(_pid: u32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_file_written_and_removed() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("run").join("ftrd.pid");

        let guard = PidFile::create(&path).unwrap();
        assert_eq!(guard.path(), path.as_path());
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, format!("{}\n", std::process::id()));
        assert_eq!(read_pid(&path), Some(std::process::id()));

        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn test_stale_pid_file_is_replaced() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ftrd.pid");
        fs::write(&path, "not a pid\n").unwrap();

        let guard = PidFile::create(&path).unwrap();
        assert_eq!(read_pid(&path), Some(std::process::id()));
        drop(guard);
    }

    #[cfg(unix)]
    #[test]
    fn test_live_pid_file_is_refused() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ftrd.pid");
        // The test harness's parent is certainly alive.
        let parent = std::os::unix::process::parent_id();
        fs::write(&path, format!("{}\n", parent)).unwrap();

        match PidFile::create(&path) {
            Err(DaemonError::AlreadyRunning { pid, .. }) => assert_eq!(pid, parent),
            other => panic!("expected AlreadyRunning, got {:?}", other),
        }
        // The other instance's file is left alone.
        assert_eq!(read_pid(&path), Some(parent));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_liveness() {
        assert!(process_is_alive(std::process::id()));
        assert!(!process_is_alive(0));
        assert!(!process_is_alive(u32::MAX));
    }
}
