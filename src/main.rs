//! Command-line entry point.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-annotations [OPTIONS] <PROJECT_PATH>
//! ```
//!
//! Generate YAML documentation:
//! ```bash
//! openapi-from-annotations ./my-service -o openapi.yaml
//! ```
//!
//! Extend a hand-written document and emit JSON:
//! ```bash
//! openapi-from-annotations ./my-service -b base.yaml -f json -o openapi.json
//! ```
//!
//! Configuration keys can also come from a file (`-c openapi.yaml`) or from
//! `OPENAPI__*` environment variables.

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_annotations::cli;

fn main() -> Result<()> {
    // Parse once up front so the verbose flag can pick the log level
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("openapi-from-annotations starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");
    Ok(())
}
