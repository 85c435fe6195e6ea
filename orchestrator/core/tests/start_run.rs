use std::{collections::BTreeMap, sync::Mutex, time::Duration};

use async_trait::async_trait;
use stackstart_core::{
    BuiltImageRegistry, ContainerId, ContainerLink, ContainerProvider, ExposedPort, ProviderError,
    ResolvedStartSpec, RunErrorKind, StartConfiguration, StartOrchestrator,
};
use tokio::time::Instant;

/// What the fake engine answers to log fetches for one container.
enum LogScript {
    Always(Option<String>),
    /// Output appears only once the container has been running this long.
    After(Duration, String),
}

/// In-memory engine recording every call it receives.
#[derive(Default)]
struct FakeProvider {
    start_specs: Mutex<Vec<ResolvedStartSpec>>,
    log_fetches: Mutex<Vec<ContainerId>>,
    rejected_images: Vec<String>,
    logs: BTreeMap<String, LogScript>,
    ports: BTreeMap<String, Vec<ExposedPort>>,
    started_at: Mutex<BTreeMap<String, Instant>>,
}

impl FakeProvider {
    fn new() -> Self {
        Self::default()
    }

    fn rejecting(mut self, image: &str) -> Self {
        self.rejected_images.push(image.to_owned());
        self
    }

    fn with_logs(mut self, config_id: &str, script: LogScript) -> Self {
        self.logs.insert(config_id.to_owned(), script);
        self
    }

    fn with_ports(mut self, config_id: &str, ports: Vec<ExposedPort>) -> Self {
        self.ports.insert(config_id.to_owned(), ports);
        self
    }

    fn start_count(&self) -> usize {
        self.start_specs.lock().unwrap().len()
    }

    fn started_names(&self) -> Vec<String> {
        self.start_specs
            .lock()
            .unwrap()
            .iter()
            .map(|spec| spec.name.clone())
            .collect()
    }

    fn spec_for(&self, name: &str) -> ResolvedStartSpec {
        self.start_specs
            .lock()
            .unwrap()
            .iter()
            .find(|spec| spec.name == name)
            .unwrap_or_else(|| panic!("no start call recorded for '{name}'"))
            .clone()
    }

    fn log_fetch_count(&self) -> usize {
        self.log_fetches.lock().unwrap().len()
    }
}

fn runtime_id(config_id: &str) -> String {
    format!("{config_id}-runtime")
}

fn config_id_of(runtime: &ContainerId) -> String {
    runtime
        .as_str()
        .strip_suffix("-runtime")
        .expect("fake runtime ids end in -runtime")
        .to_owned()
}

#[async_trait]
impl ContainerProvider for FakeProvider {
    async fn start_container(
        &self,
        spec: &ResolvedStartSpec,
    ) -> Result<ContainerId, ProviderError> {
        if self.rejected_images.contains(&spec.image) {
            return Err(ProviderError::ImageNotFound {
                image: spec.image.clone(),
            });
        }
        self.start_specs.lock().unwrap().push(spec.clone());
        self.started_at
            .lock()
            .unwrap()
            .insert(spec.name.clone(), Instant::now());
        Ok(ContainerId::from(runtime_id(&spec.name)))
    }

    async fn logs(&self, id: &ContainerId) -> Result<Option<String>, ProviderError> {
        self.log_fetches.lock().unwrap().push(id.clone());
        let config_id = config_id_of(id);
        match self.logs.get(&config_id) {
            None => Ok(None),
            Some(LogScript::Always(text)) => Ok(text.clone()),
            Some(LogScript::After(delay, text)) => {
                let started = self.started_at.lock().unwrap()[&config_id];
                if started.elapsed() >= *delay {
                    Ok(Some(text.clone()))
                } else {
                    Ok(None)
                }
            }
        }
    }

    async fn exposed_ports(&self, id: &ContainerId) -> Result<Vec<ExposedPort>, ProviderError> {
        let config_id = config_id_of(id);
        Ok(self.ports.get(&config_id).cloned().unwrap_or_default())
    }

    async fn stop_container(&self, _id: &ContainerId) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn remove_container(&self, _id: &ContainerId) -> Result<(), ProviderError> {
        Ok(())
    }
}

fn orchestrator(provider: FakeProvider) -> StartOrchestrator<FakeProvider> {
    StartOrchestrator::new(provider, BuiltImageRegistry::new())
}

fn kinds(report: &stackstart_core::RunReport) -> Vec<RunErrorKind> {
    report.errors().iter().map(|error| error.kind()).collect()
}

#[tokio::test]
async fn starts_declared_containers_in_order() {
    let orchestrator = orchestrator(FakeProvider::new());
    let set = [
        StartConfiguration::from_image("postgres").with_id("db"),
        StartConfiguration::from_image("nginx").with_id("web"),
    ];

    let report = orchestrator.run(&set).await;

    assert!(report.is_success());
    assert_eq!(orchestrator.provider().started_names(), ["db", "web"]);
    let ids: Vec<_> = report
        .outcomes()
        .iter()
        .map(|outcome| outcome.config_id())
        .collect();
    assert_eq!(ids, ["db", "web"]);
    assert_eq!(
        report.outcomes()[0].runtime_id().as_str(),
        "db-runtime"
    );
}

#[tokio::test]
async fn skip_performs_no_provider_calls() {
    let orchestrator = orchestrator(FakeProvider::new()).with_skip(true);
    let set = [
        // Even an invalid set reports nothing when skipped.
        StartConfiguration::from_image("a").with_id("dup"),
        StartConfiguration::from_image("b").with_id("dup"),
    ];

    let report = orchestrator.run(&set).await;

    assert!(report.is_success());
    assert!(report.outcomes().is_empty());
    assert_eq!(orchestrator.provider().start_count(), 0);
}

#[tokio::test]
async fn duplicate_ids_abort_before_any_start() {
    let orchestrator = orchestrator(FakeProvider::new());
    let set = [
        StartConfiguration::from_image("a").with_id("duplicate-id"),
        StartConfiguration::from_image("b").with_id("duplicate-id"),
    ];

    let report = orchestrator.run(&set).await;

    assert_eq!(kinds(&report), [RunErrorKind::DuplicateId]);
    assert_eq!(orchestrator.provider().start_count(), 0);
}

#[tokio::test]
async fn unknown_link_target_aborts_before_any_start() {
    let orchestrator = orchestrator(FakeProvider::new());
    let set = [StartConfiguration::from_image("app")
        .with_id("container1")
        .with_link(ContainerLink::to_container("container2").with_alias("db"))];

    let report = orchestrator.run(&set).await;

    assert_eq!(kinds(&report), [RunErrorKind::UnknownLinkTarget]);
    assert_eq!(orchestrator.provider().start_count(), 0);
}

#[tokio::test]
async fn out_of_order_link_aborts_before_any_start() {
    let orchestrator = orchestrator(FakeProvider::new());
    let set = [
        StartConfiguration::from_image("app")
            .with_id("container1")
            .with_link(ContainerLink::to_container("container2").with_alias("db")),
        StartConfiguration::from_image("postgres").with_id("container2"),
    ];

    let report = orchestrator.run(&set).await;

    assert_eq!(kinds(&report), [RunErrorKind::LinkNotYetStarted]);
    assert_eq!(orchestrator.provider().start_count(), 0);
}

#[tokio::test]
async fn built_image_alias_resolves_before_the_provider_sees_it() {
    let mut registry = BuiltImageRegistry::new();
    registry.register("built-image", "the-image-id");
    let orchestrator = StartOrchestrator::new(FakeProvider::new(), registry);

    let set = [StartConfiguration::from_image("built-image").with_id("someId")];
    let report = orchestrator.run(&set).await;

    assert!(report.is_success());
    assert_eq!(orchestrator.provider().spec_for("someId").image, "the-image-id");
}

#[tokio::test]
async fn failed_start_is_recorded_and_the_run_continues() {
    let orchestrator = orchestrator(FakeProvider::new().rejecting("broken-image"));
    let set = [
        StartConfiguration::from_image("broken-image").with_id("first"),
        StartConfiguration::from_image("nginx").with_id("second"),
    ];

    let report = orchestrator.run(&set).await;

    assert_eq!(kinds(&report), [RunErrorKind::StartFailed]);
    assert_eq!(report.errors()[0].config_id(), Some("first"));
    assert_eq!(orchestrator.provider().started_names(), ["second"]);
    assert_eq!(report.outcomes().len(), 1);
}

#[tokio::test]
async fn links_map_to_runtime_ids_of_started_targets() {
    let orchestrator = orchestrator(FakeProvider::new());
    let set = [
        StartConfiguration::from_image("postgres").with_id("db"),
        StartConfiguration::from_image("app")
            .with_id("web")
            .with_link(ContainerLink::to_container("db").with_alias("database")),
    ];

    let report = orchestrator.run(&set).await;

    assert!(report.is_success());
    let spec = orchestrator.provider().spec_for("web");
    assert_eq!(spec.links.len(), 1);
    assert_eq!(spec.links[0].container, "db-runtime");
    assert_eq!(spec.links[0].alias, "database");
}

#[tokio::test]
async fn link_to_a_failed_target_keeps_the_declared_id() {
    let orchestrator = orchestrator(FakeProvider::new().rejecting("broken-image"));
    let set = [
        StartConfiguration::from_image("broken-image").with_id("db"),
        StartConfiguration::from_image("app")
            .with_id("web")
            .with_link(ContainerLink::to_container("db")),
    ];

    let report = orchestrator.run(&set).await;

    // The dependent is still attempted; the engine is left to reject it.
    assert_eq!(kinds(&report), [RunErrorKind::StartFailed]);
    let spec = orchestrator.provider().spec_for("web");
    assert_eq!(spec.links[0].container, "db");
    assert_eq!(spec.links[0].alias, "db");
}

#[tokio::test]
async fn exposed_ports_become_properties() {
    let provider = FakeProvider::new().with_ports(
        "ubuntu",
        vec![
            ExposedPort::new("tcp/8080", 1337, "172.42.123.10"),
            ExposedPort::new("tcp/9000", 41329, "localhost"),
        ],
    );
    let orchestrator = orchestrator(provider);

    let set = [StartConfiguration::from_image("debian").with_id("ubuntu")];
    let report = orchestrator.run(&set).await;

    assert!(report.is_success());
    let properties = report.properties();
    assert_eq!(
        properties.get("containers.ubuntu.ports.tcp/8080.host"),
        Some("172.42.123.10")
    );
    assert_eq!(
        properties.get("containers.ubuntu.ports.tcp/8080.port"),
        Some("1337")
    );
    assert_eq!(
        properties.get("containers.ubuntu.ports.tcp/9000.host"),
        Some("localhost")
    );
    assert_eq!(
        properties.get("containers.ubuntu.ports.tcp/9000.port"),
        Some("41329")
    );
    assert_eq!(report.outcomes()[0].exposed_ports().len(), 2);
}

#[tokio::test]
async fn containers_without_ports_publish_nothing() {
    let orchestrator = orchestrator(FakeProvider::new());
    let set = [StartConfiguration::from_image("debian").with_id("quiet")];

    let report = orchestrator.run(&set).await;

    assert!(report.is_success());
    assert!(report.properties().is_empty());
}

#[tokio::test(start_paused = true)]
async fn startup_pattern_match_completes_without_error() {
    let provider = FakeProvider::new().with_logs(
        "some-container",
        LogScript::Always(Some("Oh hello world!".to_owned())),
    );
    let orchestrator = orchestrator(provider);

    let set = [StartConfiguration::from_image("some-image")
        .with_id("some-container")
        .wait_for_startup("hello world!")
        .with_startup_timeout(1)];

    let report = orchestrator.run(&set).await;

    assert!(report.is_success());
    assert!(orchestrator.provider().log_fetch_count() >= 1);
}

#[tokio::test(start_paused = true)]
async fn startup_timeout_is_recorded_after_about_the_configured_bound() {
    let provider = FakeProvider::new().with_logs(
        "some-container",
        LogScript::Always(Some("Oh dear, something went wrong!".to_owned())),
    );
    let orchestrator = orchestrator(provider);

    let set = [StartConfiguration::from_image("some-image")
        .with_id("some-container")
        .wait_for_startup("hello world!")
        .with_startup_timeout(1)];

    let before = Instant::now();
    let report = orchestrator.run(&set).await;
    let elapsed = before.elapsed();

    assert_eq!(kinds(&report), [RunErrorKind::StartupTimeout]);
    assert_eq!(report.errors()[0].config_id(), Some("some-container"));
    assert!(elapsed >= Duration::from_secs(1), "timed out too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "timed out too late: {elapsed:?}");
    assert!(orchestrator.provider().log_fetch_count() >= 1);
    // The container still counts as started and keeps its outcome.
    assert_eq!(report.outcomes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn waits_long_enough_for_slow_startups() {
    let provider = FakeProvider::new().with_logs(
        "some-container",
        LogScript::After(Duration::from_secs(1), "Well... hello world!".to_owned()),
    );
    let orchestrator = orchestrator(provider);

    let set = [StartConfiguration::from_image("some-image")
        .with_id("some-container")
        .wait_for_startup("hello world!")
        .with_startup_timeout(2)];

    let before = Instant::now();
    let report = orchestrator.run(&set).await;
    let elapsed = before.elapsed();

    assert!(report.is_success());
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(2), "matched later than expected: {elapsed:?}");
}
