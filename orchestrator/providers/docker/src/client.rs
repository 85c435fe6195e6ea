use std::{env, time::Duration};

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use stackstart_core::{
    ContainerId, ContainerProvider, ExposedPort, ProviderError, ResolvedStartSpec, adjust_timeout,
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    stream::demux_log_stream,
    wire::{
        ContainerCreateRequest, ContainerCreateResponse, ContainerInspectResponse, HostConfig,
        exposed_ports_from_inspect,
    },
};

/// Engine API version the client pins its requests to.
const API_VERSION: &str = "v1.41";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const ENDPOINT_ENV: &str = "DOCKER_HOST";
const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:2375";

/// Container provider backed by the Docker Engine remote API.
pub struct DockerProvider {
    http: reqwest::Client,
    base_url: Url,
}

impl DockerProvider {
    /// Connect to the engine at `endpoint`, e.g. `http://127.0.0.1:2375`.
    /// A `tcp://` scheme is accepted and treated as `http://`.
    pub fn new(endpoint: &str) -> Result<Self, ProviderError> {
        let base_url = parse_endpoint(endpoint)?;
        let http = reqwest::Client::builder()
            .timeout(adjust_timeout(REQUEST_TIMEOUT))
            .build()
            .map_err(ProviderError::transport)?;
        Ok(Self { http, base_url })
    }

    /// Resolve the endpoint from `DOCKER_HOST`, falling back to the local
    /// TCP socket.
    pub fn from_env() -> Result<Self, ProviderError> {
        let endpoint = env::var(ENDPOINT_ENV).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_owned());
        Self::new(&endpoint)
    }

    pub fn endpoint(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(&format!("{API_VERSION}/{path}"))
            .map_err(ProviderError::transport)
    }

    async fn create_container(
        &self,
        spec: &ResolvedStartSpec,
    ) -> Result<ContainerCreateResponse, ProviderError> {
        let request = ContainerCreateRequest {
            image: spec.image.clone(),
            host_config: Some(HostConfig {
                links: spec
                    .links
                    .iter()
                    .map(|link| format!("{}:{}", link.container, link.alias))
                    .collect(),
                publish_all_ports: true,
            }),
            ..Default::default()
        };

        let mut url = self.url("containers/create")?;
        url.query_pairs_mut().append_pair("name", &spec.name);

        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::transport)?;
        let response = check_status(response, Some(&spec.image)).await?;
        response
            .json::<ContainerCreateResponse>()
            .await
            .map_err(ProviderError::transport)
    }

    async fn start_created(&self, id: &ContainerId, image: &str) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(self.url(&format!("containers/{id}/start"))?)
            .send()
            .await
            .map_err(ProviderError::transport)?;
        check_status(response, Some(image)).await.map(|_| ())
    }
}

#[async_trait]
impl ContainerProvider for DockerProvider {
    async fn start_container(
        &self,
        spec: &ResolvedStartSpec,
    ) -> Result<ContainerId, ProviderError> {
        let created = self.create_container(spec).await?;
        for warning in &created.warnings {
            warn!(container = spec.name, warning, "engine warning on create");
        }

        let id = ContainerId::from(created.id);
        debug!(container = spec.name, runtime_id = %id, "container created");
        self.start_created(&id, &spec.image).await?;
        Ok(id)
    }

    async fn logs(&self, id: &ContainerId) -> Result<Option<String>, ProviderError> {
        let mut url = self.url(&format!("containers/{id}/logs"))?;
        url.query_pairs_mut()
            .append_pair("stdout", "true")
            .append_pair("stderr", "true");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(ProviderError::transport)?;
        let response = check_status(response, None).await?;
        let raw = response.bytes().await.map_err(ProviderError::transport)?;

        if raw.is_empty() {
            Ok(None)
        } else {
            Ok(Some(demux_log_stream(&raw)))
        }
    }

    async fn exposed_ports(&self, id: &ContainerId) -> Result<Vec<ExposedPort>, ProviderError> {
        let response = self
            .http
            .get(self.url(&format!("containers/{id}/json"))?)
            .send()
            .await
            .map_err(ProviderError::transport)?;
        let response = check_status(response, None).await?;
        let inspect = response
            .json::<ContainerInspectResponse>()
            .await
            .map_err(ProviderError::transport)?;
        Ok(exposed_ports_from_inspect(&inspect))
    }

    async fn stop_container(&self, id: &ContainerId) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(self.url(&format!("containers/{id}/stop"))?)
            .send()
            .await
            .map_err(ProviderError::transport)?;
        check_status(response, None).await.map(|_| ())
    }

    async fn remove_container(&self, id: &ContainerId) -> Result<(), ProviderError> {
        let response = self
            .http
            .delete(self.url(&format!("containers/{id}"))?)
            .send()
            .await
            .map_err(ProviderError::transport)?;
        check_status(response, None).await.map(|_| ())
    }
}

/// Map an engine response onto the provider error taxonomy. A 304 is a
/// success for the lifecycle endpoints (already started / already stopped);
/// a 404 on an image-targeting request means the image is unknown.
async fn check_status(
    response: Response,
    image_hint: Option<&str>,
) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() || status == StatusCode::NOT_MODIFIED {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_default()
        .trim()
        .to_owned();

    if status == StatusCode::NOT_FOUND
        && let Some(image) = image_hint
    {
        return Err(ProviderError::ImageNotFound {
            image: image.to_owned(),
        });
    }

    Err(ProviderError::Rejected {
        status: status.as_u16(),
        message,
    })
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ProviderError> {
    let normalized = endpoint
        .strip_prefix("tcp://")
        .map_or_else(|| endpoint.to_owned(), |rest| format!("http://{rest}"));

    let mut url = Url::parse(&normalized).map_err(ProviderError::transport)?;
    // Url::join replaces the last path segment unless the base ends in '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
