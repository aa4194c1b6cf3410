//! skyliftd — the Skylift daemon.
//!
//! Single binary that assembles the platform:
//! - Log broker (per-project build log pub/sub)
//! - Build runner + artifact uploader behind the orchestrator
//! - REST + SSE API for triggering deploys and tailing logs
//! - Edge proxy resolving `{project}.{domain}` to stored assets
//!
//! # Usage
//!
//! ```text
//! skyliftd standalone --config skylift.toml
//! skyliftd deploy --project my-site --dir ./my-site
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use skylift_api::{ApiState, build_router};
use skylift_core::{BuildJob, ProjectId, SkyliftConfig};
use skylift_deploy::{DeployPhase, DeployRegistry, orchestrator_with};
use skylift_logs::{LogBroker, LogEvent};
use skylift_proxy::EdgeProxy;
use skylift_store::HttpObjectStore;

#[derive(Parser)]
#[command(name = "skyliftd", about = "Skylift daemon")]
struct Cli {
    /// Path to skylift.toml. Defaults to ./skylift.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the API and the edge proxy in one process.
    Standalone {
        /// Port for the REST/SSE API (overrides config).
        #[arg(long)]
        api_port: Option<u16>,

        /// Port for the edge proxy (overrides config).
        #[arg(long)]
        proxy_port: Option<u16>,
    },

    /// Build and publish one project in the foreground.
    Deploy {
        /// Project id (subdomain label and storage prefix).
        #[arg(long)]
        project: String,

        /// Source directory the build command runs in.
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Build command (overrides config).
        #[arg(long = "command")]
        build_command: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,skyliftd=debug,skylift=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Standalone {
            api_port,
            proxy_port,
        } => run_standalone(config, api_port, proxy_port).await,
        Command::Deploy {
            project,
            dir,
            build_command,
        } => run_deploy(config, &project, dir, build_command).await,
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<SkyliftConfig> {
    match path {
        Some(path) => SkyliftConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => {
            let default = std::path::Path::new("skylift.toml");
            if default.is_file() {
                SkyliftConfig::from_file(default).context("failed to load ./skylift.toml")
            } else {
                Ok(SkyliftConfig::from_env())
            }
        }
    }
}

async fn run_standalone(
    config: SkyliftConfig,
    api_port: Option<u16>,
    proxy_port: Option<u16>,
) -> anyhow::Result<()> {
    info!("skylift daemon starting in standalone mode");

    let api_port = api_port.unwrap_or(config.api.port);
    let proxy_port = proxy_port.unwrap_or(config.proxy.port);

    // ── Initialize subsystems ──────────────────────────────────

    let broker = LogBroker::new();
    let registry = DeployRegistry::new();
    let store = Arc::new(HttpObjectStore::new(&config.storage.endpoint));
    let orchestrator = Arc::new(orchestrator_with(
        store,
        broker.clone(),
        registry.clone(),
        config.storage.upload_concurrency,
    ));

    let api_state = ApiState {
        orchestrator,
        registry,
        broker: broker.clone(),
        default_command: config.build.command.clone(),
        output_dir: config.build.output_dir.clone(),
    };
    let router = build_router(api_state);

    let proxy_addr: SocketAddr = ([0, 0, 0, 0], proxy_port).into();
    let proxy = EdgeProxy::new(proxy_addr, config.storage_base());

    // ── Shutdown wiring ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    // Idle log channels accumulate one sender per finished deploy;
    // sweep them in the background.
    let prune_broker = broker.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(60));
        loop {
            tick.tick().await;
            prune_broker.prune();
        }
    });

    // ── Serve ──────────────────────────────────────────────────

    let api_addr: SocketAddr = ([0, 0, 0, 0], api_port).into();
    let listener = tokio::net::TcpListener::bind(api_addr)
        .await
        .with_context(|| format!("failed to bind API on {api_addr}"))?;
    info!(addr = %api_addr, "api listening");

    let mut api_shutdown = shutdown_rx.clone();
    let api = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = api_shutdown.changed().await;
    });

    tokio::try_join!(
        async { api.await.context("api server failed") },
        async { proxy.serve(shutdown_rx).await.context("edge proxy failed") },
    )?;

    info!("skylift daemon stopped");
    Ok(())
}

async fn run_deploy(
    config: SkyliftConfig,
    project: &str,
    dir: PathBuf,
    build_command: Option<String>,
) -> anyhow::Result<()> {
    let project_id = ProjectId::parse(project).context("invalid project id")?;
    let command = build_command.unwrap_or_else(|| config.build.command.clone());
    let output_root = dir.join(&config.build.output_dir);

    let broker = LogBroker::new();
    let registry = DeployRegistry::new();
    let store = Arc::new(HttpObjectStore::new(&config.storage.endpoint));
    let orchestrator = orchestrator_with(
        store,
        broker.clone(),
        registry,
        config.storage.upload_concurrency,
    );

    // Echo build logs to stdout while the deploy runs.
    let mut rx = broker.subscribe(&project_id);
    let printer = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(payload) => match serde_json::from_str::<LogEvent>(&payload) {
                    Ok(event) => println!("{}", event.log),
                    Err(_) => println!("{payload}"),
                },
                // A lagged tail skips ahead; only a closed channel ends it.
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let job = BuildJob::new(project_id.clone(), dir, command);
    let phase = orchestrator.deploy(job, &output_root).await;

    // Dropping every broker handle closes the channel; the printer
    // drains what is buffered and exits.
    drop(orchestrator);
    drop(broker);
    let _ = printer.await;

    match phase {
        DeployPhase::Succeeded => {
            info!(project = %project_id, "deploy succeeded");
            Ok(())
        }
        DeployPhase::Failed { reason } => {
            anyhow::bail!("deploy failed: {reason}")
        }
        other => anyhow::bail!("deploy ended in non-terminal phase {other:?}"),
    }
}
