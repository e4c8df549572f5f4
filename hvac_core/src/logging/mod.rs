pub mod csv;

use tracing_subscriber::EnvFilter;

/// Structured logging setup: env-filtered, compact formatter, matching the
/// operational log style used across the rest of this workspace.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("hvac_core=info".parse().unwrap())
                .add_directive("hvac_protocol=info".parse().unwrap())
                .add_directive("tokio=warn".parse().unwrap()),
        )
        .compact()
        .init();
}
