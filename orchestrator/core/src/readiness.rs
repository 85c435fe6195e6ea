use std::time::Duration;

use regex::Regex;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, warn};

use crate::provider::{ContainerId, ContainerProvider};

/// Pause between unsuccessful log fetches; the run's only suspension point.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Result of waiting for a container's startup pattern.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadinessOutcome {
    /// The pattern appeared in the log output.
    Matched,
    /// The timeout elapsed without the pattern appearing.
    TimedOut,
}

/// A declared startup pattern, compiled once per container.
pub struct StartupPattern {
    raw: String,
    compiled: Option<Regex>,
}

impl StartupPattern {
    /// Compile the pattern as a regex, keeping the raw text for literal
    /// containment when it does not compile.
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let compiled = match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(_) => {
                debug!(pattern, "startup pattern is not a valid regex; matching literally");
                None
            }
        };
        Self {
            raw: pattern.to_owned(),
            compiled,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn matches(&self, logs: &str) -> bool {
        match &self.compiled {
            Some(regex) => regex.is_match(logs),
            None => logs.contains(&self.raw),
        }
    }
}

/// Poll a container's logs until the pattern appears or the deadline passes.
///
/// The deadline is anchored at `started_at`, the instant the start call
/// returned, so work done between starting and polling does not extend the
/// window. Empty output and failed fetches both count as "no output yet".
pub async fn wait_for_startup<P>(
    provider: &P,
    container: &ContainerId,
    pattern: &StartupPattern,
    started_at: Instant,
    startup_timeout: Duration,
) -> ReadinessOutcome
where
    P: ContainerProvider + ?Sized,
{
    let deadline = started_at + startup_timeout;
    let poll = async {
        loop {
            if let Some(logs) = fetch_logs(provider, container).await
                && pattern.matches(&logs)
            {
                return;
            }
            sleep(POLL_INTERVAL).await;
        }
    };

    match timeout_at(deadline, poll).await {
        Ok(()) => ReadinessOutcome::Matched,
        Err(_) => ReadinessOutcome::TimedOut,
    }
}

async fn fetch_logs<P>(provider: &P, container: &ContainerId) -> Option<String>
where
    P: ContainerProvider + ?Sized,
{
    match provider.logs(container).await {
        Ok(Some(text)) if !text.is_empty() => Some(text),
        Ok(_) => None,
        Err(err) => {
            warn!(
                container = %container,
                error = %err,
                "log fetch failed; treating as no output yet"
            );
            None
        }
    }
}
