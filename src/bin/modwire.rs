//! modwire command line
//!
//! Usage:
//!   modwire plan <app-manifest> [--config <engine-config>]
//!   modwire check <app-manifest> [--config <engine-config>]

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use modwire::module::loader::LoadedApp;
use modwire::utils::init_logging_from_config;
use modwire::{Bootstrap, EngineConfig, ModuleLoader};

#[derive(Parser, Debug)]
#[command(name = "modwire", version, about = "Inspect declarative module wiring")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Engine configuration file (JSON or TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, overrides the configuration file (RUST_LOG still wins)
    #[arg(long, global = true)]
    log_filter: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the activation order, one module per line
    Plan {
        /// App manifest (package.json or *.toml)
        manifest: PathBuf,
    },

    /// Check that the wiring resolves and print a summary
    Check {
        /// App manifest (package.json or *.toml)
        manifest: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let engine = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load engine config {:?}", path))?,
        None => EngineConfig::default(),
    };

    let mut logging = engine.logging.clone().unwrap_or_default();
    if cli.log_filter.is_some() {
        logging.filter = cli.log_filter.clone();
    }
    init_logging_from_config(Some(&logging));

    match &cli.command {
        Command::Plan { manifest } => run_plan(manifest, &engine),
        Command::Check { manifest } => run_check(manifest, &engine),
    }
}

fn load(manifest: &Path, engine: &EngineConfig) -> anyhow::Result<(LoadedApp, Vec<String>)> {
    let loaded = ModuleLoader::load_app(manifest, engine)?;
    let order = Bootstrap::plan(&loaded.declarations())?;
    Ok((loaded, order))
}

fn run_plan(manifest: &Path, engine: &EngineConfig) -> anyhow::Result<()> {
    let (_, order) = load(manifest, engine)?;
    for module in order {
        println!("{module}");
    }
    Ok(())
}

fn run_check(manifest: &Path, engine: &EngineConfig) -> anyhow::Result<()> {
    let (loaded, order) = load(manifest, engine)?;
    let declarations = loaded.declarations();
    let provides: usize = declarations.iter().map(|d| d.provides.len()).sum();
    let consumes: usize = declarations.iter().map(|d| d.consumes.len()).sum();
    let extends: usize = declarations.iter().map(|d| d.extends.len()).sum();

    info!("Checked {:?}", manifest);
    println!(
        "ok: {} modules, {} provided, {} consumed, {} extended",
        order.len(),
        provides,
        consumes,
        extends
    );
    Ok(())
}
