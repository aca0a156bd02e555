use crate::constants::{
    DEFAULT_DATA_TIMEOUT_SECS, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_LISTEN_ADDRESS,
    DEFAULT_LISTEN_PORT, DEFAULT_MAX_LINE_LENGTH, DEFAULT_PID_FILE, DEFAULT_SHUTDOWN_GRACE_SECS,
    USERNAME_REGEX,
};
use anyhow::{bail, Context, Result};
use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_address: String,
    pub listen_port: u16,
    pub root_dir: PathBuf,
    pub pid_file: PathBuf,
    pub pasv_address: Option<String>, // Public IPv4 address advertised in PASV replies
    pub log_file: Option<PathBuf>,
    pub max_line_length: usize,
    pub idle_timeout_secs: u64,
    pub data_timeout_secs: u64,
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserConfig {
    pub username: String,
    /// Plain text secret, or a bcrypt hash (`$2a$`, `$2b$`, `$2y$`).
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: String::from(DEFAULT_LISTEN_ADDRESS),
            listen_port: DEFAULT_LISTEN_PORT,
            root_dir: PathBuf::from("."),
            pid_file: PathBuf::from(DEFAULT_PID_FILE),
            pasv_address: None,
            log_file: None,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            data_timeout_secs: DEFAULT_DATA_TIMEOUT_SECS,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
        }
    }
}

impl ServerConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn data_timeout(&self) -> Duration {
        Duration::from_secs(self.data_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks everything that can be checked without touching the filesystem.
    pub fn validate(&self) -> Result<()> {
        if self.users.is_empty() {
            bail!("at least one [[users]] entry is required");
        }

        let username_re = Regex::new(USERNAME_REGEX)?;
        let mut seen = HashSet::new();
        for user in &self.users {
            if !username_re.is_match(&user.username) {
                bail!("invalid username {:?}", user.username);
            }
            if !seen.insert(user.username.as_str()) {
                bail!("duplicate username {:?}", user.username);
            }
            if user.password.is_empty() {
                bail!("empty password for user {:?}", user.username);
            }
        }

        let server = &self.server;
        if server.max_line_length == 0 {
            bail!("max_line_length cannot be zero");
        }
        if server.idle_timeout_secs == 0 || server.data_timeout_secs == 0 {
            bail!("timeouts cannot be zero");
        }
        if let Some(pasv) = &server.pasv_address {
            pasv.parse::<std::net::Ipv4Addr>()
                .with_context(|| format!("pasv_address must be an IPv4 address: {}", pasv))?;
        }
        Ok(())
    }

    /// Anchors the relative paths of the configuration to `base`, so they
    /// survive the `chdir("/")` performed when detaching.
    pub fn resolve_paths(&mut self, base: &Path) -> Result<()> {
        let server = &mut self.server;
        if server.root_dir.is_relative() {
            server.root_dir = base.join(&server.root_dir);
        }
        if server.pid_file.is_relative() {
            server.pid_file = base.join(&server.pid_file);
        }
        if let Some(log_file) = server.log_file.as_mut() {
            if log_file.is_relative() {
                *log_file = base.join(&*log_file);
            }
        }

        server.root_dir = server.root_dir.canonicalize().with_context(|| {
            format!("Root directory is not accessible: {}", server.root_dir.display())
        })?;
        if !server.root_dir.is_dir() {
            bail!("Root directory is not a directory: {}", server.root_dir.display());
        }
        Ok(())
    }
}

// Helper function to log configuration options
pub fn log_config(config: &Config) {
    info!("  Listen Address: {}", config.server.listen_address);
    info!("  Listen Port: {}", config.server.listen_port);
    info!("  Root Directory: {}", config.server.root_dir.display());
    info!("  PID File: {}", config.server.pid_file.display());
    info!(
        "  PASV Address: {}",
        config.server.pasv_address.as_deref().unwrap_or("<control connection address>")
    );
    info!("  Idle Timeout: {}s", config.server.idle_timeout_secs);
    if let Some(log_file) = &config.server.log_file {
        info!("  Log File: {}", log_file.display());
    }
}
