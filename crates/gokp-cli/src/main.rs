//! gokp - one KeePass index over many KeePass databases
//!
//! Built with clap on top of gokp-core.

mod app;
mod cli;
mod prompt;
mod render;

use anyhow::Result;
use clap::Parser;
use gokp_core::keystore::OsKeyring;
use gokp_core::Paths;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use app::App;
use cli::Cli;
use prompt::Terminal;

const DEFAULT_LOG_FILTER: &str = "gokp=warn";

fn main() -> ExitCode {
    // Logs go to stderr so they never mix with command output
    let filter = match std::env::var_os(EnvFilter::DEFAULT_ENV) {
        Some(_) => EnvFilter::from_default_env(),
        None => EnvFilter::new(DEFAULT_LOG_FILTER),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("Starting gokp (test profile: {})", cli.test);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if app::is_fatal(&err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
        Err(err) => {
            println!("{err:#}");
            ExitCode::SUCCESS
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = Paths::resolve(cli.test)?;
    let keystore = OsKeyring;
    let mut prompt = Terminal;
    let mut stdout = io::stdout();

    App::new(paths, &keystore, &mut prompt, &mut stdout).run(cli.command)
}
