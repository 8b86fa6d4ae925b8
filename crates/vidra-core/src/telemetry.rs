use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for binaries: RUST_LOG-driven filter plus fmt output.
pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "vidra=info,info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Telemetry initialized, logging to stdout");
}
