use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Startup wait applied when a configuration declares a pattern but no
/// timeout, or declares a timeout of zero.
pub const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 30;

/// A declared dependency on a container started earlier in the same run.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct ContainerLink {
    target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alias: Option<String>,
}

impl ContainerLink {
    /// Start a link pointing at the configuration id of the dependency.
    #[must_use]
    pub fn to_container(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            alias: None,
        }
    }

    /// Name by which the dependent container addresses the dependency.
    #[must_use]
    pub fn with_alias(self, alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            ..self
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Effective alias: the declared alias, falling back to the target id.
    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.target)
    }
}

/// One container to start, as declared by the build.
///
/// Values are immutable once built; the `with_*` methods consume and return
/// new instances. Unset fields stay unset until resolved through
/// [`Self::effective_id`] and [`Self::startup_timeout`].
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct StartConfiguration {
    image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    links: Vec<ContainerLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wait_for_startup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    startup_timeout_secs: Option<u64>,
}

impl StartConfiguration {
    /// Start a configuration from an image reference or built-image alias.
    #[must_use]
    pub fn from_image(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            id: None,
            links: Vec::new(),
            wait_for_startup: None,
            startup_timeout_secs: None,
        }
    }

    #[must_use]
    pub fn with_id(self, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..self
        }
    }

    #[must_use]
    pub fn with_link(mut self, link: ContainerLink) -> Self {
        self.links.push(link);
        self
    }

    #[must_use]
    pub fn with_links(mut self, links: impl IntoIterator<Item = ContainerLink>) -> Self {
        self.links.extend(links);
        self
    }

    /// Pattern the container must log before it counts as started.
    #[must_use]
    pub fn wait_for_startup(self, pattern: impl Into<String>) -> Self {
        Self {
            wait_for_startup: Some(pattern.into()),
            ..self
        }
    }

    /// Maximum seconds to wait for the startup pattern.
    #[must_use]
    pub fn with_startup_timeout(self, seconds: u64) -> Self {
        Self {
            startup_timeout_secs: Some(seconds),
            ..self
        }
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    /// Effective id: the declared id, falling back to the image reference.
    pub fn effective_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.image)
    }

    pub fn links(&self) -> &[ContainerLink] {
        &self.links
    }

    /// Declared startup pattern, treating an empty string as unset.
    pub fn startup_pattern(&self) -> Option<&str> {
        self.wait_for_startup
            .as_deref()
            .filter(|pattern| !pattern.is_empty())
    }

    /// Effective startup timeout, never below one second: an unset or zero
    /// declaration resolves to [`DEFAULT_STARTUP_TIMEOUT_SECS`].
    pub fn startup_timeout(&self) -> Duration {
        match self.startup_timeout_secs {
            Some(seconds) if seconds >= 1 => Duration::from_secs(seconds),
            _ => Duration::from_secs(DEFAULT_STARTUP_TIMEOUT_SECS),
        }
    }
}
