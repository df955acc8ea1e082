//! idfcheck - validate and reformat IDF files against a schema

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use bemkit_core::{config, SchemaRegistry, Workspace, WorkspaceConfig};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod cli;

use crate::cli::{CheckArgs, Cli, Command, FormatArgs};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(&cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            2
        }
    };
    std::process::exit(exit_code);
}

/// RUST_LOG wins; otherwise -v flags pick the level
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: &Cli) -> Result<i32> {
    let registry = load_schema(cli.schema.as_deref())?;
    match &cli.command {
        Command::Check(args) => {
            let config = load_config(cli.config.as_deref())?;
            check(Workspace::with_config(registry, config), args)
        }
        Command::Format(args) => {
            let config = load_config(cli.config.as_deref())?;
            reformat(Workspace::with_config(registry, config), args)
        }
        Command::Types => {
            for object_type in registry.object_types() {
                println!("{}", object_type);
            }
            Ok(0)
        }
    }
}

fn load_schema(path: Option<&Path>) -> Result<Arc<SchemaRegistry>> {
    let registry = match path {
        Some(path) => SchemaRegistry::from_path(path)
            .with_context(|| format!("failed to load schema {}", path.display()))?,
        None => bemkit_model::schema().context("bundled schema is invalid")?,
    };
    Ok(Arc::new(registry))
}

/// Explicit path, else the default location if a file exists there, else defaults
fn load_config(path: Option<&Path>) -> Result<WorkspaceConfig> {
    if let Some(path) = path {
        return WorkspaceConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()));
    }
    let default_path = config::workspace_config_path()?;
    if default_path.exists() {
        debug!("Using config at {}", default_path.display());
        return Ok(WorkspaceConfig::load(&default_path)?);
    }
    Ok(WorkspaceConfig::default())
}

fn load_file(ws: &Workspace, path: &Path) -> Result<usize> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let handles = ws
        .load_idf(&text)
        .with_context(|| format!("failed to load {}", path.display()))?;
    info!("Read {} objects from {}", handles.len(), path.display());
    Ok(handles.len())
}

fn check(ws: Workspace, args: &CheckArgs) -> Result<i32> {
    let count = load_file(&ws, &args.file)?;
    let level = args
        .strictness
        .map(Into::into)
        .unwrap_or(ws.config().strictness);

    let report = ws.validity_report(level);
    println!("{}: {} objects", args.file.display(), count);
    print!("{}", report);
    Ok(if report.is_valid() { 0 } else { 1 })
}

fn reformat(ws: Workspace, args: &FormatArgs) -> Result<i32> {
    load_file(&ws, &args.file)?;
    let text = ws.to_idf_string();
    match &args.output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => print!("{}", text),
    }
    Ok(0)
}
