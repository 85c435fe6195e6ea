use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Runtime identifier the container engine assigned to a started container.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ContainerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failures surfaced by a container provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("image '{image}' is not known to the container engine")]
    ImageNotFound { image: String },
    #[error("container engine rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("container engine request failed: {source}")]
    Transport {
        #[source]
        source: anyhow::Error,
    },
}

impl ProviderError {
    pub fn transport(source: impl Into<anyhow::Error>) -> Self {
        Self::Transport {
            source: source.into(),
        }
    }
}

/// A link in the provider's representation: a runtime container reference
/// plus the alias the dependent container uses for it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedLink {
    pub container: String,
    pub alias: String,
}

/// Start request with image resolution and link mapping already applied.
///
/// Optional engine parameters stay unset here rather than being filled with
/// engine-specific zero values.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedStartSpec {
    /// Name the container is created under (the configuration's id).
    pub name: String,
    /// Concrete image reference, post registry resolution.
    pub image: String,
    pub links: Vec<ResolvedLink>,
}

/// A network endpoint the engine mapped onto the host.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct ExposedPort {
    spec: String,
    host_port: u16,
    host_address: String,
}

impl ExposedPort {
    #[must_use]
    pub fn new(spec: impl Into<String>, host_port: u16, host_address: impl Into<String>) -> Self {
        Self {
            spec: spec.into(),
            host_port,
            host_address: host_address.into(),
        }
    }

    /// Protocol-first port spec, e.g. `tcp/8080`.
    pub fn spec(&self) -> &str {
        &self.spec
    }

    pub fn host_port(&self) -> u16 {
        self.host_port
    }

    pub fn host_address(&self) -> &str {
        &self.host_address
    }
}

/// Capability surface of a container engine, injected into the orchestrator
/// at construction time.
#[async_trait]
pub trait ContainerProvider: Send + Sync {
    /// Create and start a container, returning the engine-assigned id.
    async fn start_container(&self, spec: &ResolvedStartSpec)
    -> Result<ContainerId, ProviderError>;

    /// Accumulated log text. `None` while the container has produced no
    /// output yet; this is a normal interim state, not a failure.
    async fn logs(&self, id: &ContainerId) -> Result<Option<String>, ProviderError>;

    /// Ports the engine mapped onto the host for this container.
    async fn exposed_ports(&self, id: &ContainerId) -> Result<Vec<ExposedPort>, ProviderError>;

    async fn stop_container(&self, id: &ContainerId) -> Result<(), ProviderError>;

    async fn remove_container(&self, id: &ContainerId) -> Result<(), ProviderError>;
}
