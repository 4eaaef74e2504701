//! Subpath reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ net listener ──▶ http server ──▶ routing ──┬──▶ static files
//!                                                          │
//!                                                          ▼
//!                                                    cache lookup
//!                                                          │
//!     Client ◀── rewrite / hide headers ◀── forwarder ◀────┴──▶ upstream origin
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use subpath_proxy::config::{load_config, ProxyConfig};
use subpath_proxy::lifecycle::startup;

#[derive(Parser)]
#[command(name = "subpath-proxy")]
#[command(about = "Reverse proxy mounting web applications under URL prefixes", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => ProxyConfig::default(),
    };

    if cli.check {
        println!("configuration OK ({} routes)", config.routes.len());
        return ExitCode::SUCCESS;
    }

    if cli.print_config {
        return match toml::to_string_pretty(&config) {
            Ok(text) => {
                print!("{}", text);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("failed to render configuration: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    match startup::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Fatal startup error");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
