use tokio::time::Instant;
use tracing::{info, warn};

use crate::{
    config::StartConfiguration,
    errors::RunError,
    properties::{PropertySink, publish_ports},
    provider::{ContainerId, ContainerProvider, ExposedPort, ResolvedLink, ResolvedStartSpec},
    readiness::{ReadinessOutcome, StartupPattern, wait_for_startup},
    registry::BuiltImageRegistry,
    validate::validate_start_configurations,
};

/// A container the provider reports as started.
#[derive(Clone, Debug)]
pub struct StartOutcome {
    config_id: String,
    runtime_id: ContainerId,
    exposed_ports: Vec<ExposedPort>,
}

impl StartOutcome {
    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    pub fn runtime_id(&self) -> &ContainerId {
        &self.runtime_id
    }

    pub fn exposed_ports(&self) -> &[ExposedPort] {
        &self.exposed_ports
    }
}

/// Everything a run produced: started containers, recorded errors in the
/// order they occurred, and the published properties.
///
/// A non-empty error list marks the run as failed, but it is a normal
/// result value; callers decide whether that fails the enclosing build.
#[derive(Debug, Default)]
pub struct RunReport {
    outcomes: Vec<StartOutcome>,
    errors: Vec<RunError>,
    properties: PropertySink,
}

impl RunReport {
    pub fn outcomes(&self) -> &[StartOutcome] {
        &self.outcomes
    }

    pub fn errors(&self) -> &[RunError] {
        &self.errors
    }

    pub fn properties(&self) -> &PropertySink {
        &self.properties
    }

    /// A run succeeds exactly when no error was recorded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Sequential start driver.
///
/// Consumes the declared configuration set in order: validates the link
/// graph up front, then per configuration resolves the image, starts the
/// container through the injected provider, publishes its ports, and waits
/// for its startup pattern. One failed start does not halt the remainder.
pub struct StartOrchestrator<P> {
    provider: P,
    registry: BuiltImageRegistry,
    skip: bool,
}

impl<P> StartOrchestrator<P>
where
    P: ContainerProvider,
{
    #[must_use]
    pub fn new(provider: P, registry: BuiltImageRegistry) -> Self {
        Self {
            provider,
            registry,
            skip: false,
        }
    }

    /// Returns the orchestrator with the global skip flag set; a skipped
    /// run performs no provider calls and reports no errors.
    #[must_use]
    pub const fn with_skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn run(&self, configurations: &[StartConfiguration]) -> RunReport {
        let mut report = RunReport::default();

        if self.skip {
            info!("container startup skipped by configuration");
            return report;
        }

        let validation_errors = validate_start_configurations(configurations);
        if !validation_errors.is_empty() {
            warn!(
                errors = validation_errors.len(),
                "start configuration set is invalid; no containers will be started"
            );
            report.errors = validation_errors;
            return report;
        }

        for configuration in configurations {
            self.start_one(configuration, &mut report).await;
        }

        info!(
            started = report.outcomes.len(),
            errors = report.errors.len(),
            properties = report.properties.len(),
            "container startup finished"
        );
        report
    }

    async fn start_one(&self, configuration: &StartConfiguration, report: &mut RunReport) {
        let config_id = configuration.effective_id();
        let image = self.registry.resolve(configuration.image()).to_owned();
        let spec = ResolvedStartSpec {
            name: config_id.to_owned(),
            image: image.clone(),
            links: self.resolve_links(configuration, report),
        };

        info!(container = config_id, image = %image, "starting container");
        let runtime_id = match self.provider.start_container(&spec).await {
            Ok(id) => id,
            Err(source) => {
                warn!(container = config_id, error = %source, "container failed to start");
                report.errors.push(RunError::StartFailed {
                    config_id: config_id.to_owned(),
                    source,
                });
                return;
            }
        };
        let started_at = Instant::now();

        let exposed_ports = self
            .publish_exposed_ports(config_id, &runtime_id, &mut report.properties)
            .await;
        report.outcomes.push(StartOutcome {
            config_id: config_id.to_owned(),
            runtime_id: runtime_id.clone(),
            exposed_ports,
        });

        if let Some(raw_pattern) = configuration.startup_pattern() {
            let pattern = StartupPattern::new(raw_pattern);
            let timeout = configuration.startup_timeout();
            info!(
                container = config_id,
                pattern = raw_pattern,
                timeout_secs = timeout.as_secs(),
                "waiting for container startup"
            );
            match wait_for_startup(&self.provider, &runtime_id, &pattern, started_at, timeout)
                .await
            {
                ReadinessOutcome::Matched => {
                    info!(container = config_id, "container reported startup");
                }
                ReadinessOutcome::TimedOut => {
                    warn!(
                        container = config_id,
                        timeout_secs = timeout.as_secs(),
                        "container did not report startup in time"
                    );
                    report.errors.push(RunError::StartupTimeout {
                        config_id: config_id.to_owned(),
                        pattern: raw_pattern.to_owned(),
                        timeout,
                    });
                }
            }
        }
    }

    /// Map declared links to the provider's representation. A target that
    /// started maps to its runtime id; one that did not keeps the declared
    /// id so the engine rejects it naturally.
    fn resolve_links(
        &self,
        configuration: &StartConfiguration,
        report: &RunReport,
    ) -> Vec<ResolvedLink> {
        configuration
            .links()
            .iter()
            .map(|link| {
                let container = report
                    .outcomes
                    .iter()
                    .find(|outcome| outcome.config_id() == link.target())
                    .map_or_else(
                        || link.target().to_owned(),
                        |outcome| outcome.runtime_id().to_string(),
                    );
                ResolvedLink {
                    container,
                    alias: link.alias().to_owned(),
                }
            })
            .collect()
    }

    async fn publish_exposed_ports(
        &self,
        config_id: &str,
        runtime_id: &ContainerId,
        sink: &mut PropertySink,
    ) -> Vec<ExposedPort> {
        match self.provider.exposed_ports(runtime_id).await {
            Ok(ports) => {
                publish_ports(sink, config_id, &ports);
                ports
            }
            Err(err) => {
                warn!(
                    container = config_id,
                    error = %err,
                    "failed to discover exposed ports; publishing none"
                );
                Vec::new()
            }
        }
    }
}
