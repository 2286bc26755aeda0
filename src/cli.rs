//! CLI parsing and command execution
//!
//! A minimal host around the source registry: select a source with
//! `name=config`, then describe it or resolve secrets through it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

use azkeyvault::config::SourceSpec;
use azkeyvault::sources::{registry, SecretSource, SourceParams};

#[derive(Parser)]
#[command(name = "azkv")]
#[command(about = "Resolve load-test secrets from Azure Key Vault", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Secret source to use, as name=config (e.g. azkeyvault=https://myvault.vault.azure.net/)
    #[arg(long, env = "K6_SECRET_SOURCE")]
    pub secret_source: Option<SourceSpec>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered secret sources
    Sources,

    /// Show the description of the selected source
    Describe,

    /// Resolve one or more secrets concurrently
    Get {
        /// Secret names
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    registry::init();

    if let Commands::Sources = cli.command {
        for name in registry::extension_names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let spec = cli
        .secret_source
        .context("--secret-source is required (format: name=config)")?;
    let source = build_source(&spec)?;

    match cli.command {
        Commands::Sources => unreachable!(), // Handled above

        Commands::Describe => {
            println!("{}", source.describe());
        }

        Commands::Get { keys } => {
            let failures = resolve_all(source, keys).await;
            if failures > 0 {
                anyhow::bail!("{} secret(s) could not be resolved", failures);
            }
        }
    }

    Ok(())
}

fn build_source(spec: &SourceSpec) -> Result<Arc<dyn SecretSource>> {
    let factory = registry::get_extension(&spec.name)?;
    let source = factory(&SourceParams::new(spec.config.clone()))
        .with_context(|| format!("Failed to initialize secret source '{}'", spec.name))?;

    info!("Using secret source: {}", source.describe());
    Ok(Arc::from(source))
}

/// Resolve every key on its own task; prints values in argument order
async fn resolve_all(source: Arc<dyn SecretSource>, keys: Vec<String>) -> usize {
    let mut tasks = JoinSet::new();
    for (index, key) in keys.iter().cloned().enumerate() {
        let source = Arc::clone(&source);
        tasks.spawn(async move {
            let result = source.get(&key).await;
            (index, result)
        });
    }

    let mut results: Vec<Option<_>> = keys.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => error!("Lookup task failed: {}", e),
        }
    }

    let mut failures = 0;
    for (key, result) in keys.iter().zip(results) {
        match result {
            Some(Ok(value)) => println!("{}={}", key, value),
            Some(Err(e)) => {
                error!("{}", e);
                failures += 1;
            }
            None => failures += 1,
        }
    }
    failures
}
