mod cli;

use clap::Parser;
use cli::{Cli, Command};
use lootwarden::collector::Collector;
use lootwarden::config::{self, Config};
use lootwarden::database::{self, Store};
use lootwarden::http::AppState;
use lootwarden::logger::{self, LogTag};
use lootwarden::paths;
use lootwarden::process_lock::ProcessLock;
use lootwarden::services::implementations::{CloudSyncService, CollectorService, HttpService};
use lootwarden::services::ServiceManager;
use lootwarden::valuation::ValuationEngine;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init();

    let result = match cli.command {
        Command::Init { seed } => run_init(seed.as_deref()),
        Command::Serve {
            port,
            no_window: _,
            portable,
            overlay: _,
            overlay_only: _,
        } => run_serve(portable, port),
        Command::Tail { portable } => run_tail(portable),
        Command::ShowRuns { portable, limit } => run_show_runs(portable, limit),
        Command::ShowState { portable } => run_show_state(portable),
    };

    match result {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            logger::error(LogTag::System, &e);
            ExitCode::from(1)
        }
    }
}

/// Resolves path mode and ensures directories exist. Must run before
/// `ProcessLock::acquire()`, whose lock file path depends on it.
fn prepare_paths(portable: bool) -> Result<(), String> {
    paths::set_portable_mode(portable);
    paths::ensure_all_directories()
}

fn bootstrap(portable: bool) -> Result<(Store, Config), String> {
    prepare_paths(portable)?;
    config::load_config()?;
    let config = config::get_config_clone();

    let db_path = paths::get_store_db_path();
    database::migrate_legacy_store_if_present(&db_path).map_err(|e| e.to_string())?;
    let store = Store::new(&db_path).map_err(|e| e.to_string())?;
    Ok((store, config))
}

fn run_init(seed: Option<&str>) -> Result<(), String> {
    paths::ensure_all_directories()?;
    config::load_config()?;
    config::save_config(None)?;

    let store = Store::new(&paths::get_store_db_path()).map_err(|e| e.to_string())?;

    if let Some(path) = seed {
        let count = cli::seed_items_from_file(&store, path)?;
        logger::info(LogTag::System, &format!("seeded {count} items from {path}"));
    }

    logger::info(
        LogTag::System,
        &format!("initialized data directory at {:?}", paths::get_base_directory()),
    );
    Ok(())
}

fn run_serve(portable: bool, port: Option<u16>) -> Result<(), String> {
    prepare_paths(portable)?;
    let _lock = ProcessLock::acquire()?;
    let (store, mut config) = bootstrap(portable)?;
    if let Some(port) = port {
        config.webserver.port = port;
    }
    let store = Arc::new(store);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| e.to_string())?;

    runtime.block_on(async move {
        let collector = Collector::new(store.clone(), &config.tailer).map_err(|e| e.to_string())?;
        let collector_handle = collector.handle();

        let valuation = Arc::new(ValuationEngine::new(store.clone()));
        let state = AppState {
            store: store.clone(),
            valuation,
            collector: collector_handle.clone(),
            config: config.clone(),
        };

        let mut manager = ServiceManager::new(config);
        manager.register(Box::new(CollectorService::new(collector)));
        manager.register(Box::new(
            CloudSyncService::new(store.clone(), &collector_handle).map_err(|e| e.to_string())?,
        ));
        manager.register(Box::new(HttpService::new(state)));

        manager.start_all().await?;
        logger::info(LogTag::System, "lootwarden is running, press Ctrl+C to stop");

        tokio::signal::ctrl_c().await.map_err(|e| e.to_string())?;
        logger::info(LogTag::System, "shutdown requested");
        manager.stop_all().await
    })
}

fn run_tail(portable: bool) -> Result<(), String> {
    prepare_paths(portable)?;
    let _lock = ProcessLock::acquire()?;
    let (store, config) = bootstrap(portable)?;
    let store = Arc::new(store);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| e.to_string())?;

    runtime.block_on(async move {
        let collector = Collector::new(store, &config.tailer).map_err(|e| e.to_string())?;
        logger::info(LogTag::System, "tailing log in the foreground, press Ctrl+C to stop");
        let shutdown = Arc::new(tokio::sync::Notify::new());
        let shutdown_for_signal = shutdown.clone();
        let collector_task = tokio::spawn(collector.run(shutdown));
        tokio::signal::ctrl_c().await.map_err(|e| e.to_string())?;
        shutdown_for_signal.notify_waiters();
        let _ = collector_task.await;
        Ok(())
    })
}

fn resolve_scope(store: &Store) -> Result<String, String> {
    store
        .most_recent_scope()
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "no runs recorded yet; no player scope known".to_string())
}

fn run_show_runs(portable: bool, limit: u32) -> Result<(), String> {
    let (store, _config) = bootstrap(portable)?;
    let scope = resolve_scope(&store)?;
    let runs = store.list_runs(&scope, limit, 0).map_err(|e| e.to_string())?;

    println!("{:<24} {:<20} {:<24} {:<24}", "id", "zone", "start", "end");
    for run in runs {
        println!(
            "{:<24} {:<20} {:<24} {:<24}",
            run.id,
            run.zone_signature,
            run.start_ts.to_rfc3339(),
            run.end_ts.map(|t| t.to_rfc3339()).unwrap_or_else(|| "open".to_string()),
        );
    }
    Ok(())
}

fn run_show_state(portable: bool) -> Result<(), String> {
    let (store, _config) = bootstrap(portable)?;
    let scope = resolve_scope(&store)?;
    let rows = store.load_slot_state(&scope).map_err(|e| e.to_string())?;

    println!("{:<8} {:<8} {:<10} {:<10}", "page", "slot", "type_id", "qty");
    for row in rows {
        println!("{:<8} {:<8} {:<10} {:<10}", row.page_id, row.slot_id, row.type_id, row.quantity);
    }
    Ok(())
}
