use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    if let Err(error) = overlay_cli::run(std::env::args_os()) {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

/// Log to stderr so stdout stays machine readable
fn init_tracing() {
    let filter = EnvFilter::try_from_env("OVERLAY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
