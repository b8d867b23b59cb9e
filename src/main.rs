//! slnresolve CLI
//!
//! Entry point for the slnresolve command-line application.

use clap::Parser;

use slnresolve::cli::output::{display_error, OutputConfig};
use slnresolve::cli::Cli;

fn main() {
    let cli = Cli::parse();

    let output_config = OutputConfig::new(cli.quiet, cli.json, cli.verbose);
    output_config.apply_global();

    // RUST_LOG wins over the verbosity flags
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default().add_directive(output_config.log_level().into())
        });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    if let Err(e) = cli.run() {
        display_error(&e);
        std::process::exit(1);
    }
}
