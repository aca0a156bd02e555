// src/constants.rs

pub const USERNAME_REGEX: &str = r"^[a-zA-Z0-9_.-]{1,32}$";

pub const DEFAULT_CONFIG_PATH: &str = "ftrd.toml";
pub const DEFAULT_PID_FILE: &str = "ftrd.pid";
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_LISTEN_PORT: u16 = 9090;

/// Longest command line accepted from a client, terminator included.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 512;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_DATA_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

/// Upper bound for writing the 421 notice to one session during shutdown.
pub const SHUTDOWN_NOTICE_TIMEOUT_MS: u64 = 500;

pub const WELCOME_MESSAGE: &str = "Service Ready. ";
