// Filesystem errors surfaced to FTP clients
use crate::core_ftpcommand::reply::Reply;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("Path escapes the server root: {0}")]
    OutsideRoot(String),

    #[error("No such file or directory: {0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FsError {
    pub fn from_io(path: &str, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => FsError::PermissionDenied(path.to_string()),
            _ => FsError::Io(error),
        }
    }

    /// Every filesystem failure is reported as 550; only the text differs.
    pub fn to_ftp_response(&self) -> Reply {
        match self {
            FsError::NotFound(_) => Reply::new(550, "No such file or directory."),
            FsError::NotADirectory(_) => Reply::new(550, "Not a directory."),
            FsError::OutsideRoot(_) | FsError::PermissionDenied(_) => {
                Reply::new(550, "Permission denied.")
            }
            FsError::Io(_) => Reply::new(550, "Requested action not taken."),
        }
    }
}
