// Keytable — Application Entry Point
//
// Parses CLI arguments, initializes structured logging (with a filter that
// never emits key material), and dispatches to the command handler.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use keytable::cli::{execute, Cli};

fn main() {
    // Initialize tracing with env filter (RUST_LOG=keytable=debug for verbose output).
    // Log output goes to stderr so command output on stdout stays scriptable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("keytable=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = execute(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
