mod config;
mod constants;
mod core_auth;
mod core_cli;
mod core_daemon;
mod core_ftpcommand;
mod core_log;
mod core_network;
mod core_vfs;
mod server;
mod session;

use crate::config::Config;
use crate::core_auth::helper::hash_password;
use crate::core_cli::Cli;
use crate::core_daemon::{detach, Detached, Readiness};
use crate::core_log::init_logger;
use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Parse CLI arguments
    let args = Cli::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ftrd: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> Result<ExitCode> {
    if let Some(secret) = &args.hash_password {
        let hashed = hash_password(secret).context("Failed to hash password")?;
        println!("{}", hashed);
        return Ok(ExitCode::SUCCESS);
    }

    // Load configuration from the TOML file
    let mut config = Config::load_from_file(&args.config)?;
    if let Some(port) = args.port {
        config.server.listen_port = port;
    }
    let cwd = std::env::current_dir().context("Failed to determine the working directory")?;
    config.resolve_paths(&cwd)?;

    if args.test_config {
        println!("Configuration {} is valid.", args.config.display());
        return Ok(ExitCode::SUCCESS);
    }

    // Detaching forks, so it has to happen before the runtime starts threads.
    let mut readiness = if args.daemon {
        match detach()? {
            Detached::Parent { exit_code } => return Ok(ExitCode::from(exit_code as u8)),
            Detached::Child(readiness) => readiness,
        }
    } else {
        Readiness::foreground()
    };

    if let Err(e) = init_logger(args.verbose, config.server.log_file.as_deref()) {
        readiness.notify_failed(&format!("{:#}", e));
        return Err(e);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            readiness.notify_failed(&e);
            return Err(e).context("Failed to start the async runtime");
        }
    };

    runtime.block_on(server::run(config, readiness))?;
    Ok(ExitCode::SUCCESS)
}
