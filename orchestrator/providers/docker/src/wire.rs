//! Wire models for the Docker Engine remote API.
//!
//! Only fields that are actually set are serialized; engine defaults are
//! often wrong. Unknown response fields are ignored so newer engines keep
//! working.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stackstart_core::ExposedPort;

#[derive(Clone, Debug, Default, Serialize)]
pub struct ContainerCreateRequest {
    #[serde(rename = "Image")]
    pub image: String,
    #[serde(rename = "Hostname", skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(rename = "User", skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(rename = "Cmd", skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Vec<String>>,
    #[serde(rename = "HostConfig", skip_serializing_if = "Option::is_none")]
    pub host_config: Option<HostConfig>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct HostConfig {
    /// `container:alias` pairs for the engine's link mechanism.
    #[serde(rename = "Links", skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    #[serde(rename = "PublishAllPorts")]
    pub publish_all_ports: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ContainerCreateResponse {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Warnings", default)]
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ContainerInspectResponse {
    #[serde(rename = "NetworkSettings", default)]
    pub network_settings: NetworkSettings,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NetworkSettings {
    /// Engine port spec (`8080/tcp`) to host bindings; unmapped ports are
    /// present with a null binding list.
    #[serde(rename = "Ports", default)]
    pub ports: BTreeMap<String, Option<Vec<PortBinding>>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PortBinding {
    #[serde(rename = "HostIp", default)]
    pub host_ip: String,
    #[serde(rename = "HostPort", default)]
    pub host_port: String,
}

/// Flip the engine's `8080/tcp` spec into the published `tcp/8080` form.
pub fn protocol_first_spec(engine_spec: &str) -> String {
    match engine_spec.split_once('/') {
        Some((port, protocol)) => format!("{protocol}/{port}"),
        None => engine_spec.to_owned(),
    }
}

/// Translate an inspect response into the exposed-port list, skipping
/// unmapped ports and bindings the engine reports without a parsable host
/// port.
pub fn exposed_ports_from_inspect(inspect: &ContainerInspectResponse) -> Vec<ExposedPort> {
    let mut ports = Vec::new();
    for (engine_spec, bindings) in &inspect.network_settings.ports {
        let Some(bindings) = bindings else { continue };
        let Some(binding) = bindings.first() else {
            continue;
        };
        let Ok(host_port) = binding.host_port.parse::<u16>() else {
            continue;
        };
        ports.push(ExposedPort::new(
            protocol_first_spec(engine_spec),
            host_port,
            host_address(&binding.host_ip),
        ));
    }
    ports
}

/// Engines report wildcard binds as empty or `0.0.0.0`; callers need an
/// address they can actually connect to.
fn host_address(host_ip: &str) -> String {
    match host_ip {
        "" | "0.0.0.0" | "::" => "localhost".to_owned(),
        other => other.to_owned(),
    }
}
