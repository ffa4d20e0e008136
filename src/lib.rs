pub mod aggregate;
pub mod analysis;
pub mod classify;
pub mod cli;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod io_utils;
pub mod loader;
pub mod query;
pub mod rows;
pub mod session;

use std::{env, path::PathBuf, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};
use serde::Serialize;

use crate::{
    classify::StockStatus,
    cli::{Cli, Commands, SourceArgs},
    config::EngineConfig,
    engine::InventoryEngine,
    loader::LoadOptions,
    query::{SearchFilters, parse_sort_keys},
    session::SessionId,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("inventory_lens", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Load(args) => {
            let (engine, session) = open(&args)?;
            let summary = LoadSummary {
                health: engine.health(&session)?,
                metadata: engine.metadata(&session)?,
            };
            emit(&summary)
        }
        Commands::Kpis(args) => {
            let (engine, session) = open(&args)?;
            emit(&engine.kpis(&session)?)
        }
        Commands::Status(args) => {
            let (engine, session) = open(&args)?;
            emit(&engine.stock_status_distribution(&session)?)
        }
        Commands::Abc(args) => {
            let (engine, session) = open(&args)?;
            emit(&engine.abc_summary(&session)?)
        }
        Commands::Group(args) => {
            let (engine, session) = open(&args.source)?;
            emit(&engine.group_by(&session, args.by.into())?)
        }
        Commands::Brands(args) => {
            let (engine, session) = open(&args.source)?;
            emit(&engine.unique_brands(&session, args.category.as_deref())?)
        }
        Commands::Search(args) => handle_search(&args),
        Commands::Alerts(args) => {
            let (engine, session) = open(&args)?;
            emit(&engine.alerts(&session)?)
        }
        Commands::Top(args) => {
            let (engine, session) = open(&args)?;
            emit(&engine.top_products(&session)?)
        }
        Commands::Analysis(args) => {
            let (engine, session) = open(&args)?;
            emit(&engine.full_analysis(&session)?)
        }
    }
}

#[derive(Serialize)]
struct LoadSummary {
    #[serde(flatten)]
    health: engine::Health,
    metadata: session::SessionMetadata,
}

fn handle_search(args: &cli::SearchArgs) -> Result<()> {
    let status = args
        .status
        .as_deref()
        .map(str::parse::<StockStatus>)
        .transpose()
        .context("Parsing --status")?;
    let filters = SearchFilters {
        q: args.q.clone(),
        status,
        category: args.category.clone(),
        brand: args.brand.clone(),
    };
    let keys = parse_sort_keys(&args.sort);
    debug!("Search filters: {filters:?}; sort keys: {keys:?}");

    let (engine, session) = open(&args.source)?;
    let page = engine.search(&session, &filters, &keys, args.page, args.limit)?;
    emit(&page)
}

/// Loads the configured inventory into a fresh session and builds its analysis.
fn open(args: &SourceArgs) -> Result<(InventoryEngine, SessionId)> {
    let config = EngineConfig::load_or_default(args.config.as_deref())?;
    let input = resolve_input(args, &config)?;
    info!("Loading inventory from {input:?}");

    let loaded = loader::load_inventory(
        &input,
        &config.ingest,
        LoadOptions {
            delimiter: args.delimiter,
            encoding: args.input_encoding.as_deref(),
        },
    )?;
    debug!(
        "Header found after {} skipped row(s) in {input:?}",
        loaded.skipped_rows
    );

    let engine = InventoryEngine::standalone(config);
    let session = SessionId::generate();
    engine.ingest(&session, loaded.table, loaded.source_name)?;
    if let Err(err) = engine.get_analysis(&session) {
        warn!("Pre-building the analysis failed: {err}");
    }
    Ok((engine, session))
}

fn resolve_input(args: &SourceArgs, config: &EngineConfig) -> Result<PathBuf> {
    args.input
        .clone()
        .or_else(|| config.ingest.default_inventory.clone())
        .ok_or_else(|| {
            anyhow!("No inventory given: pass --input or set ingest.default_inventory in the config")
        })
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Serializing output")?;
    println!("{rendered}");
    Ok(())
}
