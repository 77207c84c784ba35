use tracing_subscriber::EnvFilter;

fn main() {
    // Reports go to stdout; diagnostics stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = labelhub::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
