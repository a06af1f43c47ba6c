//! nfslock: lease-based mutual exclusion on shared filesystems.
//!
//! This is the main entry point for the `nfslock` CLI. It parses arguments,
//! sets up logging and the run context, runs the lock lifecycle, and maps
//! the outcome to an exit code.

mod cli;
mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod locks;
mod logging;
pub mod supervisor;

use clap::Parser;
use clap::error::ErrorKind;
use cli::Cli;
use context::LockContext;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => exit_code(exit_codes::FAILURE),
            };
        }
    };

    let config = match commands::resolve_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("nfslock: {}", err);
            return exit_code(err.exit_code());
        }
    };

    logging::init(config.effective_verbosity());

    let ctx = LockContext::new(config);
    ctx.shutdown.install_signal_handler();

    match commands::run(&ctx, &cli.lockfile, &cli.command) {
        Ok(status) => exit_code(status),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("nfslock: {}", err);
            exit_code(err.exit_code())
        }
    }
}

fn exit_code(status: i32) -> ExitCode {
    ExitCode::from(u8::try_from(status).unwrap_or(exit_codes::FAILURE as u8))
}
