use tracing_subscriber::EnvFilter;

fn init_tracing() {
    // The TUI owns stdout; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_app(
    run_tui: impl FnOnce() -> Result<(), shrike_tui::TuiError>,
) -> Result<(), Box<dyn std::error::Error>> {
    let _ = shrike_core::domain_name();
    let _ = shrike_adapters::adapter_name();
    run_tui()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    run_app(shrike_tui::run)
}
