//! secgroup-reconciler: runs one security group reconciliation pass.
//!
//! The provider is the in-memory backend, persisted to a JSON state file
//! between runs. Each invocation:
//! - Loads the cluster configuration and the provider state
//! - Reconciles (or deletes) the cluster's managed security groups
//! - Saves the provider state, including partial progress on failure
//! - Prints the resulting status as JSON

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use secgroup_reconciler::{
    ClusterAuditLogger, ClusterConfig, MemoryNetworking, Reconciler, SecurityGroupReconciler,
    TimeoutClient,
};

/// Cluster security group reconciler
#[derive(Parser, Debug)]
#[command(name = "secgroup-reconciler", version, about)]
struct Args {
    /// Cluster configuration (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Provider state file, created if missing
    #[arg(long, default_value = "provider-state.json")]
    state: PathBuf,

    /// Override the cluster name from the configuration
    #[arg(long)]
    cluster_name: Option<String>,

    /// Override the project ID from the configuration
    #[arg(long)]
    project_id: Option<String>,

    /// Timeout for each provider call in seconds
    #[arg(long, default_value = "30")]
    call_timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or update the cluster's security groups
    Reconcile,
    /// Delete the cluster's security groups
    Delete,
}

fn load_config(path: &Path) -> Result<ClusterConfig> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    ClusterConfig::from_json(&data)
        .with_context(|| format!("Invalid cluster config {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "secgroup_reconciler=info,audit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(name) = args.cluster_name {
        config.name = name;
    }
    if let Some(project_id) = args.project_id {
        config.project_id = Some(project_id);
    }

    info!("Cluster: {}", config.name);
    info!("Provider state: {}", args.state.display());

    let backend = Arc::new(
        MemoryNetworking::load(&args.state, config.project_id.clone())
            .context("Failed to load provider state")?,
    );
    let client = TimeoutClient::new(
        backend.clone(),
        Duration::from_secs(args.call_timeout_secs),
    );

    let audit = ClusterAuditLogger::new(&config.name);
    let reconciler = SecurityGroupReconciler::new(Arc::new(client), audit);

    let result = match args.command {
        Command::Reconcile => reconciler
            .reconcile(&config.name, &config)
            .await
            .map(Some),
        Command::Delete => reconciler.finalize(&config.name, &config).await.map(|_| None),
    };

    // Saved on failure too: partial progress is provider state.
    backend
        .save(&args.state)
        .context("Failed to save provider state")?;

    match result {
        Ok(Some(status)) => {
            println!("{}", serde_json::to_string_pretty(&status)?);
            info!("Security groups reconciled");
        }
        Ok(None) => info!("Security groups deleted"),
        Err(e) => {
            error!("Reconciliation failed: {}", e);
            if e.is_config() {
                return Err(e).context("Configuration error, fix the config before retrying");
            }
            return Err(e).context("Reconciliation failed");
        }
    }

    Ok(())
}
