use std::collections::BTreeMap;

use tracing::debug;

use crate::provider::ExposedPort;

/// Flat string-keyed property surface handed to the surrounding build tool.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PropertySink {
    entries: BTreeMap<String, String>,
}

impl PropertySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Publish one container's exposed ports under
/// `containers.<id>.ports.<spec>.host` / `.port`.
///
/// Writes nothing when the engine reports no exposed ports.
pub fn publish_ports(sink: &mut PropertySink, config_id: &str, ports: &[ExposedPort]) {
    for port in ports {
        let prefix = format!("containers.{config_id}.ports.{}", port.spec());
        sink.set(format!("{prefix}.host"), port.host_address());
        sink.set(format!("{prefix}.port"), port.host_port().to_string());
        debug!(
            container = config_id,
            spec = port.spec(),
            host = port.host_address(),
            port = port.host_port(),
            "published container port"
        );
    }
}
