//! rollhookd — the rollhook daemon.
//!
//! Listens for image-registry push webhooks and rolls one
//! ReplicationController over to a fresh copy of itself per accepted
//! notification, at most one at a time, always for the freshest push.
//!
//! # Usage
//!
//! ```text
//! rollhookd serve --controller-name web --namespace prod
//! rollhookd serve --controller-name web --dry-run
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, ensure};
use clap::{Args, Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use rollhook_kube::KubeOrchestrator;
use rollhook_rollout::{
    MemoryOrchestrator, Orchestrator, ReplaceConfig, ReplicaController, ReplacementExecutor,
    RolloutTiming,
};
use rollhook_scheduler::{Coordinator, Worker};

const DEFAULT_FILTER: &str = "info,rollhookd=debug,rollhook_scheduler=debug,rollhook_rollout=debug";

/// How long an in-progress update may keep running after the server stops.
const WORKER_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "rollhookd", about = "Rolling updates triggered by registry webhooks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the webhook endpoint and run updates.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "ROLLHOOK_LISTEN", default_value = "0.0.0.0:9500")]
    listen: SocketAddr,

    /// Label key that distinguishes pods of the new controller.
    #[arg(long, env = "ROLLHOOK_DEPLOYMENT_KEY", default_value = "deployment")]
    deployment_key: String,

    /// Replication controller to update.
    #[arg(long, env = "ROLLHOOK_CONTROLLER_NAME")]
    controller_name: String,

    #[arg(long, env = "ROLLHOOK_NAMESPACE", default_value = "default")]
    namespace: String,

    /// Kubernetes API server URL. Inferred from the environment when unset.
    #[arg(long, env = "ROLLHOOK_K8S_ENDPOINT")]
    k8s_endpoint: Option<String>,

    /// Pause between scale steps, in seconds.
    #[arg(long, env = "ROLLHOOK_UPDATE_PERIOD_SECS", default_value = "3")]
    update_period_secs: u64,

    /// Readiness poll interval, in seconds.
    #[arg(long, env = "ROLLHOOK_INTERVAL_SECS", default_value = "3")]
    interval_secs: u64,

    /// Bound on one whole update, in seconds.
    #[arg(long, env = "ROLLHOOK_TIMEOUT_SECS", default_value = "300")]
    timeout_secs: u64,

    /// Roll an in-memory example controller instead of a cluster.
    #[arg(long, env = "ROLLHOOK_DRY_RUN")]
    dry_run: bool,
}

impl ServeArgs {
    fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.controller_name.trim().is_empty(), "--controller-name must not be empty");
        ensure!(!self.deployment_key.trim().is_empty(), "--deployment-key must not be empty");
        ensure!(self.interval_secs > 0, "--interval-secs must be positive");
        Ok(())
    }

    fn replace_config(&self) -> ReplaceConfig {
        let timing = RolloutTiming::from_secs(
            self.update_period_secs,
            self.interval_secs,
            self.timeout_secs,
        );
        ReplaceConfig::new(&self.namespace, &self.controller_name, &self.deployment_key)
            .with_timing(timing)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => serve(args).await,
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    args.validate()?;
    info!(
        controller = %args.controller_name,
        namespace = %args.namespace,
        key = %args.deployment_key,
        dry_run = args.dry_run,
        "rollhook daemon starting"
    );

    // ── Subsystems ─────────────────────────────────────────────

    let orchestrator = orchestrator(&args).await?;
    let executor = ReplacementExecutor::new(orchestrator, args.replace_config());
    let (coordinator, queue) = Coordinator::new();
    let worker = Worker::new(coordinator.log().clone(), Arc::new(executor));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut worker_handle = tokio::spawn(worker.run(queue, shutdown_rx));

    // ── HTTP ───────────────────────────────────────────────────

    let router = rollhook_api::build_router(coordinator, &args.controller_name);
    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!(addr = %args.listen, "webhook server listening");

    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // ── Drain ──────────────────────────────────────────────────

    let _ = shutdown_tx.send(true);
    if tokio::time::timeout(WORKER_GRACE, &mut worker_handle).await.is_err() {
        warn!(grace = ?WORKER_GRACE, "update still running at shutdown; abandoning it");
        worker_handle.abort();
    }

    info!("rollhook daemon stopped");
    Ok(())
}

async fn orchestrator(args: &ServeArgs) -> anyhow::Result<Arc<dyn Orchestrator>> {
    if args.dry_run {
        info!("dry run: using in-memory orchestrator");
        let memory = MemoryOrchestrator::new()
            .with_controller(&args.namespace, example_controller(&args.controller_name));
        return Ok(Arc::new(memory));
    }
    let kube = match &args.k8s_endpoint {
        Some(endpoint) => KubeOrchestrator::from_endpoint(endpoint)?,
        None => KubeOrchestrator::try_default().await?,
    };
    Ok(Arc::new(kube))
}

/// Three-replica controller for dry runs.
fn example_controller(name: &str) -> ReplicaController {
    let mut rc = ReplicaController::new(name, 3);
    for labels in [&mut rc.labels, &mut rc.selector, &mut rc.template_labels] {
        labels.insert("app".to_string(), name.to_string());
    }
    rc.template = serde_json::json!({
        "spec": {"containers": [{"name": name, "image": format!("example/{name}:latest")}]}
    });
    rc
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServeArgs {
        let cli = Cli::try_parse_from(["rollhookd", "serve"].iter().chain(args)).unwrap();
        match cli.command {
            Command::Serve(args) => args,
        }
    }

    #[test]
    fn defaults() {
        let args = parse(&["--controller-name", "web"]);
        assert_eq!(args.listen, "0.0.0.0:9500".parse::<SocketAddr>().unwrap());
        assert_eq!(args.deployment_key, "deployment");
        assert_eq!(args.namespace, "default");
        assert_eq!(args.k8s_endpoint, None);
        assert!(!args.dry_run);

        let config = args.replace_config();
        assert_eq!(config.timing, RolloutTiming::default());
        assert_eq!(config.controller_name, "web");
    }

    #[test]
    fn controller_name_is_required() {
        assert!(Cli::try_parse_from(["rollhookd", "serve"]).is_err());
    }

    #[test]
    fn empty_names_are_rejected() {
        assert!(parse(&["--controller-name", ""]).validate().is_err());
        assert!(parse(&["--controller-name", "web", "--deployment-key", " "]).validate().is_err());
        assert!(parse(&["--controller-name", "web"]).validate().is_ok());
    }

    #[test]
    fn timing_flags() {
        let args = parse(&[
            "--controller-name", "web",
            "--update-period-secs", "1",
            "--interval-secs", "2",
            "--timeout-secs", "30",
        ]);
        assert_eq!(args.replace_config().timing, RolloutTiming::from_secs(1, 2, 30));
    }

    #[tokio::test]
    async fn dry_run_seeds_the_controller() {
        let args = parse(&["--controller-name", "web", "--namespace", "prod", "--dry-run"]);
        let orch = orchestrator(&args).await.unwrap();
        let rc = orch.get("prod", "web").await.unwrap();
        assert_eq!(rc.replicas, 3);
        assert_eq!(rc.selector["app"], "web");
    }
}
