use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the stderr tracing subscriber. Stdout stays reserved for
/// command output.
///
/// # Errors
///
/// Fails when `filter` is not a valid `EnvFilter` directive or a global
/// subscriber is already set.
pub fn init_tracing(filter: &str) -> Result<(), String> {
    let filter_layer = EnvFilter::try_new(filter).map_err(|e| e.to_string())?;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| e.to_string())
}
