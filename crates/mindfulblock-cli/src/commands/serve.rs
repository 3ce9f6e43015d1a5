//! Local companion endpoint for the browser extension.
//!
//! - `GET /rules`: active rules and UI language
//! - `POST /report`: `{ "type": "block" | "override", "domain" }`
//! - `GET /health`: sync/enforcement status
//!
//! Rule edits made by other `mindfulblock` invocations land in the same
//! database; a background refresh picks them up and re-applies the hosts
//! file.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use clap::Args;
use mindfulblock_core::protocol::RuleList;
use mindfulblock_core::{
    Config, Database, Event, HostsFileSink, ReportEvent, RuleStore, SyncBridge, SyncStatus,
};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::{apply_settings, hosts_sink, report_events, Bridge, CliResult};

const REFRESH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides server.bind)
    #[arg(long)]
    pub bind: Option<String>,
}

pub struct ServerState {
    config: Config,
    bridge: Bridge,
    store: RuleStore,
}

impl ServerState {
    /// Load rules and apply them once.
    pub fn start(config: Config, db: Database, sink: HostsFileSink, now: DateTime<Utc>) -> Self {
        let mut bridge = SyncBridge::new(db, sink);
        let (store, mut events) = bridge.load(now);
        events.push(bridge.apply(&store, apply_settings(&config), now));
        report_events(&events);
        Self {
            config,
            bridge,
            store,
        }
    }

    /// Swap in a newer rule set or config and re-apply when anything changed.
    pub fn refresh(&mut self, config: Config, now: DateTime<Utc>) -> Option<Event> {
        let before = apply_settings(&self.config);
        self.config = config;
        let (fresh, _) = self.bridge.load(now);
        if !self.bridge.status().is_online() {
            return None;
        }
        let rules_changed = fresh.snapshot() != self.store.snapshot();
        if rules_changed {
            self.store = fresh;
        }
        if rules_changed || before != apply_settings(&self.config) {
            info!(rules = self.store.rules().len(), "rules changed; re-applying");
            return Some(self.bridge.apply(&self.store, apply_settings(&self.config), now));
        }
        None
    }

    pub fn rule_list(&self) -> RuleList {
        RuleList::from_store(&self.store, self.config.blocking.enabled, self.config.language)
    }

    pub fn status(&self) -> &SyncStatus {
        self.bridge.status()
    }

    pub fn db(&self) -> &Database {
        self.bridge.repository()
    }

    pub fn clean(&mut self) -> mindfulblock_core::error::Result<()> {
        self.bridge.clean()
    }
}

/// Application state shared across handlers.
pub struct AppState {
    inner: Mutex<ServerState>,
}

impl AppState {
    pub fn new(state: ServerState) -> Self {
        Self {
            inner: Mutex::new(state),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ServerState>, StatusCode> {
        self.inner.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub sync: SyncStatus,
}

/// GET /rules
pub async fn rules_handler(State(state): State<Arc<AppState>>) -> Result<Json<RuleList>, StatusCode> {
    Ok(Json(state.lock()?.rule_list()))
}

/// POST /report
pub async fn report_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<ReportEvent>,
) -> StatusCode {
    let Ok(guard) = state.lock() else {
        return StatusCode::INTERNAL_SERVER_ERROR;
    };
    match guard.db().record_report(&event, Utc::now().date_naive()) {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) => {
            warn!(error = %e, "rejected report");
            StatusCode::BAD_REQUEST
        }
    }
}

/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, StatusCode> {
    Ok(Json(HealthResponse {
        status: "ok",
        sync: state.lock()?.status().clone(),
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/rules", get(rules_handler))
        .route("/report", post(report_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn refresh_loop(state: Arc<AppState>) {
    let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let config = match Config::load() {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "config reload failed");
                continue;
            }
        };
        if let Ok(mut guard) = state.inner.lock() {
            if let Some(event) = guard.refresh(config, Utc::now()) {
                report_events(&[event]);
            }
        }
    }
}

pub fn run(args: ServeArgs) -> CliResult {
    let config = Config::load()?;
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let clean_on_exit = config.blocking.clean_on_exit;
    let sink = hosts_sink(&config);
    let state = Arc::new(AppState::new(ServerState::start(
        config,
        Database::open()?,
        sink,
        Utc::now(),
    )));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        tokio::spawn(refresh_loop(state.clone()));

        let listener = tokio::net::TcpListener::bind(&bind).await?;
        info!("Companion endpoint listening on http://{bind}");
        println!("Listening on http://{bind} (Ctrl-C to stop)");

        axum::serve(listener, router(state.clone()))
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "failed to listen for Ctrl-C");
                }
            })
            .await?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    if clean_on_exit {
        match state.inner.lock() {
            Ok(mut guard) => {
                guard.clean()?;
                println!("Hosts file cleaned");
            }
            Err(_) => warn!("state lock poisoned; hosts file left as is"),
        }
    }
    Ok(())
}
