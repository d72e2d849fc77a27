//! neuralfx CLI
//!
//! Offline front end for the neural processor.

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::info;

use neuralfx::cli::{commands, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("neuralfx v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("neuralfx v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    };

    if let Err(err) = &result {
        for hint in commands::recovery_hints(err) {
            eprintln!("hint: {}", hint);
        }
    }
    result
}

fn handle_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Process(args) => commands::process(&args),
        Commands::Inspect { path } => commands::inspect(&path),
        Commands::Scan { dir, max_depth } => commands::scan(&dir, max_depth),
    }
}
