//! HTTP route definitions and handlers.
//!
//! Every route, the fallback included, is wrapped by the request metrics middleware.

mod health_routes;
mod metrics;

use crate::metrics::track_http_metrics;
use crate::state::AppState;
use axum::{middleware, Router};

/// Creates the application router with all configured routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(metrics::routes(&state.config.metrics.endpoint))
        .merge(health_routes::routes())
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            track_http_metrics,
        ))
        .with_state(state)
}
