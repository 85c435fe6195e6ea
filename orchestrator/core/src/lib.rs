pub mod config;
pub mod errors;
pub mod orchestrator;
pub mod properties;
pub mod provider;
pub mod readiness;
pub mod registry;
pub mod validate;

use std::{env, time::Duration};

pub use config::{ContainerLink, StartConfiguration};
pub use errors::{RunError, RunErrorKind};
pub use orchestrator::{RunReport, StartOrchestrator, StartOutcome};
pub use properties::PropertySink;
pub use provider::{
    ContainerId, ContainerProvider, ExposedPort, ProviderError, ResolvedLink, ResolvedStartSpec,
};
pub use registry::BuiltImageRegistry;

const TIMEOUT_MULTIPLIER_ENV: &str = "STACKSTART_TIMEOUT_MULTIPLIER";

/// Scale an operational timeout by `STACKSTART_TIMEOUT_MULTIPLIER` so slow
/// hosts can stretch wall-clock bounds without editing configuration.
///
/// Declared startup timeouts are not scaled; this applies to transport-level
/// bounds only.
#[must_use]
pub fn adjust_timeout(base: Duration) -> Duration {
    env::var(TIMEOUT_MULTIPLIER_ENV)
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|multiplier| *multiplier > 1)
        .map_or(base, |multiplier| base * multiplier)
}
