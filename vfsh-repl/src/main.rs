//! vfsh entry point.
//!
//! Usage:
//!   vfsh                          # Interactive shell rooted at $VFSH_ROOT or the cwd
//!   vfsh --root <dir>             # Interactive shell rooted at <dir>
//!   vfsh -c 'MKDIR a' -c 'DIR'    # Run command lines, save, exit
//!   vfsh --hash-password <pw>     # Print a VFSH_ADMIN_HASH value

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vfsh_core::{hash_password, Shell, ShellConfig};

#[derive(Parser, Debug)]
#[command(name = "vfsh", version, about = "Shell over a virtual filesystem mirrored to disk")]
struct Cli {
    /// Application root; the virtual tree is mirrored into <ROOT>/data.
    #[arg(long, env = "VFSH_ROOT")]
    root: Option<PathBuf>,

    /// Identity to start as.
    #[arg(long, env = "VFSH_USER")]
    user: Option<String>,

    /// Command line to run instead of the prompt. Repeatable.
    #[arg(short = 'c', long = "command", value_name = "LINE")]
    commands: Vec<String>,

    /// Print the argon2 hash of PASSWORD for VFSH_ADMIN_HASH and exit.
    #[arg(long, value_name = "PASSWORD")]
    hash_password: Option<String>,
}

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    if let Some(password) = cli.hash_password {
        println!("{}", hash_password(&password)?);
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = ShellConfig::from_env().context("Invalid VFSH_* environment")?;
    if let Some(root) = cli.root {
        config.app_root = root;
    }
    if let Some(user) = cli.user {
        config.start_user = user;
    }
    tracing::info!(root = %config.app_root.display(), user = %config.start_user, "starting");

    let mut shell = Shell::open(config).context("Failed to start the shell")?;

    if cli.commands.is_empty() {
        vfsh_repl::run(&mut shell)?;
        return Ok(ExitCode::SUCCESS);
    }
    if vfsh_repl::run_commands(&mut shell, &cli.commands)? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
