pub mod daemon;
pub mod error;
pub mod pidfile;
pub mod signals;

pub use daemon::{detach, Detached, Readiness};
pub use pidfile::PidFile;
