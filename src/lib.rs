pub mod bracket;
pub mod config;
pub mod layout;
pub mod projection;
pub mod resolve;
pub mod server;
pub mod store;
pub mod topology;
pub mod types;

use std::fs;
use std::sync::{Arc, Mutex};

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{data_file_path, load_config_inner, load_env_file, repo_root, static_dir};
use crate::server::{router, ServerState};
use crate::store::{AssignmentStore, PesertaStore, StoreSnapshot};
use crate::topology::BattleGraph;
use crate::types::AppConfig;

// ── Entry point ────────────────────────────────────────────────────────

pub async fn run() {
    load_env_file();

    // Initialize tracing with file + stderr output
    let logs_dir = repo_root().join("logs");
    fs::create_dir_all(&logs_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&logs_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    info!("Bagan bracket server starting");

    let config = match load_config_inner() {
        Ok(config) => config,
        Err(e) => {
            warn!("{e}; falling back to defaults");
            AppConfig::default()
        }
    };

    let graph = match BattleGraph::new() {
        Ok(graph) => Arc::new(graph),
        Err(e) => {
            error!("invalid battle configuration: {e}");
            return;
        }
    };

    let data_path = data_file_path(&config);
    let snapshot = match StoreSnapshot::load(&data_path) {
        Ok(Some(snapshot)) => {
            info!(
                "loaded {} participants and {} assignments from {}",
                snapshot.peserta.len(),
                snapshot.assignments.len(),
                data_path.display()
            );
            snapshot
        }
        Ok(None) => StoreSnapshot::default(),
        Err(e) => {
            error!("{e}");
            return;
        }
    };

    let state = ServerState {
        graph,
        peserta: Arc::new(Mutex::new(PesertaStore::from_records(snapshot.peserta))),
        assignments: Arc::new(Mutex::new(AssignmentStore::from_records(
            snapshot.assignments,
        ))),
        data_path,
    };

    let app = router(state, static_dir(&config));
    let addr = config.bind_addr.clone();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind {addr}: {e}");
            return;
        }
    };
    info!("bagan server listening at http://{addr}/");
    if let Err(e) = axum::serve(listener, app).await {
        error!("bagan server error: {e}");
    }
}
