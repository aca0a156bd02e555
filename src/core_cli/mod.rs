use crate::constants::DEFAULT_CONFIG_PATH;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "ftrd", version, about = "A small FTP daemon written in Rust.")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Detach from the terminal and run in the background
    #[arg(short, long)]
    pub daemon: bool,

    /// Listen on this port instead of the configured one
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Check the configuration and exit
    #[arg(short, long)]
    pub test_config: bool,

    /// Enable verbose mode
    #[arg(short, long)]
    pub verbose: bool,

    /// Print a bcrypt hash of SECRET for the configuration file and exit
    #[arg(long, value_name = "SECRET")]
    pub hash_password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["ftrd"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("ftrd.toml"));
        assert!(!cli.daemon);
        assert!(!cli.test_config);
        assert_eq!(cli.port, None);
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from(["ftrd", "-d", "-c", "/etc/ftrd.toml", "-p", "2121", "-v"]).unwrap();
        assert!(cli.daemon);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("/etc/ftrd.toml"));
        assert_eq!(cli.port, Some(2121));

        let cli = Cli::try_parse_from(["ftrd", "-t"]).unwrap();
        assert!(cli.test_config);
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Cli::try_parse_from(["ftrd", "-p", "70000"]).is_err());
    }
}
