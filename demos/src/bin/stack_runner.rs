use std::{env, path::PathBuf, process::ExitCode};

use stackstart_core::{ContainerProvider, StartOrchestrator, StartOutcome};
use stackstart_demos::load_stack_file;
use stackstart_provider_docker::DockerProvider;
use tracing::{info, warn};

const STACK_FILE_ENV: &str = "STACKSTART_STACK_FILE";
const SKIP_ENV: &str = "STACKSTART_SKIP";
const TEARDOWN_ENV: &str = "STACKSTART_TEARDOWN";
const DEFAULT_STACK_FILE: &str = "stack.yaml";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let path = stack_file_path();
    match run(&path).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            warn!("stack run finished with errors");
            ExitCode::FAILURE
        }
        Err(err) => {
            warn!("stack runner failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(path: &std::path::Path) -> anyhow::Result<bool> {
    let stack = load_stack_file(path)?;
    info!(
        path = %path.display(),
        containers = stack.containers.len(),
        "starting declared stack"
    );

    let provider = DockerProvider::from_env()?;
    info!(endpoint = %provider.endpoint(), "using docker engine");

    let orchestrator =
        StartOrchestrator::new(provider, stack.registry()).with_skip(env_flag(SKIP_ENV));
    let report = orchestrator.run(&stack.containers).await;

    for (key, value) in report.properties().iter() {
        println!("{key}={value}");
    }
    for error in report.errors() {
        warn!(container = error.config_id().unwrap_or("-"), "{error}");
    }

    if env_flag(TEARDOWN_ENV) {
        teardown(orchestrator.provider(), report.outcomes()).await;
    }

    Ok(report.is_success())
}

/// Stop and remove every container the run started, keeping going past
/// individual failures.
async fn teardown(provider: &DockerProvider, outcomes: &[StartOutcome]) {
    for outcome in outcomes {
        let id = outcome.runtime_id();
        if let Err(err) = provider.stop_container(id).await {
            warn!(container = outcome.config_id(), error = %err, "failed to stop container");
        }
        if let Err(err) = provider.remove_container(id).await {
            warn!(container = outcome.config_id(), error = %err, "failed to remove container");
        }
    }
}

fn stack_file_path() -> PathBuf {
    env::args()
        .nth(1)
        .or_else(|| env::var(STACK_FILE_ENV).ok())
        .unwrap_or_else(|| DEFAULT_STACK_FILE.to_owned())
        .into()
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|raw| matches!(raw.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
