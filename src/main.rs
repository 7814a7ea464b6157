//! Entry point for the `sk` binary.
//!
//! All real work happens in [`sk::cli::run`]; this function only sets up
//! logging, hands over the argument vector, and turns the result into the
//! process exit status.

fn main() {
    setup_logging();

    let argv: Vec<String> = std::env::args().collect();
    let code = match sk::cli::run(&argv) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("sk: {e}");
            e.exit_code()
        }
    };

    std::process::exit(code);
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the default `warn`
/// level.
fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
