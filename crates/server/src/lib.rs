use axum::Router;
use db::DBService;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod routes;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    db: DBService,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(db: DBService, shutdown: CancellationToken) -> Self {
        Self { db, shutdown }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    /// Cancelled when the process starts shutting down; batch jobs stop
    /// between items.
    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::router(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
