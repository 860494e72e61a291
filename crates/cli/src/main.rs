//! `crease`: score a cricket match from the command line.

mod args;
mod render;
mod run;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::args::Cli;

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
///
/// Uses `try_init()`: a second call finds a subscriber already installed and
/// leaves it in place, which is the only way it can fail.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_logging();

    if let Err(e) = run::run(Cli::parse()) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_twice_keeps_first_subscriber() {
        init_logging();
        init_logging();
        tracing::info!("still logging");
    }
}
