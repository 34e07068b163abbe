//! # Graphload CLI
//!
//! Command-line front end for the bulk graph loader.
//!
//! ```bash
//! # Generate an example config file
//! graphload --init-config > graphload.toml
//!
//! # Run the full load described by the config
//! graphload --config graphload.toml load
//!
//! # Load from explicit source files
//! graphload --config graphload.toml load --nodes people.csv --edges follows.csv
//!
//! # Run an operator query against the loaded graph
//! graphload --config graphload.toml task children alice
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use graphload_client::{OrientClient, StoreConfig};
use graphload_config::{LoaderConfig, LogSection};
use graphload_pipeline::{Coordinator, LoadSettings};

mod tasks;

#[derive(Parser)]
#[command(name = "graphload")]
#[command(about = "Bulk-load a directed property graph from flat record sources into OrientDB")]
#[command(version)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Path to graphload.toml config file.
    /// Can also be set via GRAPHLOAD_CONFIG env var.
    #[arg(short, long, env = "GRAPHLOAD_CONFIG", global = true)]
    config: Option<String>,

    /// Print an example config file with documentation and exit.
    #[arg(long)]
    init_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full ingestion pipeline: records, nodes, identifiers, edges.
    Load {
        /// Node source path, overriding [sources].nodes from the config.
        #[arg(long)]
        nodes: Option<PathBuf>,

        /// Edge source path, overriding [sources].edges from the config.
        #[arg(long)]
        edges: Option<PathBuf>,
    },
    /// Run one query from the operator task library.
    ///
    /// Invoke with an unknown name to list the available tasks.
    Task {
        /// Task name, e.g. "children" or "roots-count".
        name: String,

        /// Positional task arguments.
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.init_config {
        print!("{}", LoaderConfig::example_toml_commented());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => LoaderConfig::from_file(path)?,
        None => {
            let mut config = LoaderConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            config
        }
    };

    init_tracing(&config.log);

    match cli.command {
        Some(Commands::Load { nodes, edges }) => run_load(&config, nodes, edges).await,
        Some(Commands::Task { name, args }) => run_task(&config, &name, &args).await,
        None => bail!("no command given; run `graphload --help` for usage"),
    }
}

fn init_tracing(log: &LogSection) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));

    let use_json = log.format == "json";
    let json_layer = use_json.then(|| tracing_subscriber::fmt::layer().json());
    let text_layer = (!use_json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
    });

    // Exactly one of the two fmt layers is Some; a None layer is a no-op.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

fn store_client(config: &LoaderConfig) -> Result<OrientClient> {
    OrientClient::new(StoreConfig {
        base_url: config.store.base_url.clone(),
        database: config.store.database.clone(),
        username: config.store.username.clone(),
        password: config.store.password.clone(),
        request_timeout: Duration::from_secs(config.store.request_timeout_secs),
        node_class: config.store.node_class.clone(),
        edge_class: config.store.edge_class.clone(),
    })
    .context("failed to build the store client")
}

async fn run_load(
    config: &LoaderConfig,
    nodes: Option<PathBuf>,
    edges: Option<PathBuf>,
) -> Result<()> {
    let client = store_client(config)?;

    tracing::info!(
        "Graphload starting against {} (database {})",
        config.store.base_url,
        config.store.database
    );

    if config.load.ensure_schema {
        let created = client
            .ensure_database()
            .await
            .context("failed to ensure the database exists")?;
        if created {
            tracing::info!("Created database {}", config.store.database);
        }
        client
            .ensure_schema()
            .await
            .context("failed to ensure the graph schema")?;
        tracing::info!(
            "Schema ready: unique name index on {}",
            config.store.node_class
        );
    }

    let settings = LoadSettings {
        nodes_path: nodes.unwrap_or_else(|| PathBuf::from(&config.sources.nodes)),
        edges_path: edges.unwrap_or_else(|| PathBuf::from(&config.sources.edges)),
        batch_size: config.load.batch_size,
        workers: config.load.workers,
        channel_capacity: config.load.channel_capacity,
        transactional: config.load.transactional,
    };

    let mut coordinator = Coordinator::new(client, settings);
    let summary = coordinator.run().await?;

    println!("Load completed:");
    println!("  distinct names:  {}", summary.distinct_names);
    println!(
        "  nodes created:   {} in {} batches",
        summary.nodes_created, summary.node_batches
    );
    println!(
        "  edges created:   {} in {} batches",
        summary.edges_created, summary.edge_batches
    );
    println!("  dangling edges:  {}", summary.edges_dangling);
    println!(
        "  skipped lines:   {} node, {} edge",
        summary.skipped_node_lines, summary.skipped_edge_lines
    );
    println!("  elapsed:         {} ms", summary.elapsed_ms);
    Ok(())
}

async fn run_task(config: &LoaderConfig, name: &str, args: &[String]) -> Result<()> {
    let client = store_client(config)?;
    let rows = tasks::run_task(&client, name, args).await?;

    if rows.is_empty() {
        println!("(no rows)");
        return Ok(());
    }
    for row in &rows {
        println!("{}", serde_json::to_string(row)?);
    }
    println!("{} row(s)", rows.len());
    Ok(())
}
