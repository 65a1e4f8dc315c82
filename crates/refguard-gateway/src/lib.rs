//! refguard HTTP gateway.
//!
//! axum middleware that runs every delete-style request through a
//! [`RouteProtection`] before it reaches the handler. Referenced rows are
//! refused with `405 Method Not Allowed`.

pub mod config;
pub mod error;
pub mod middleware;

pub use config::{GuardConfig, IN_USE_MESSAGE};
pub use error::{AppError, ErrorResponse};
pub use middleware::protect_deletes;

use std::sync::Arc;

use axum::Router;
use refguard_core::RouteProtection;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// State shared by the middleware.
#[derive(Clone)]
pub struct GuardState {
    /// Protection consulted for every delete.
    pub protection: Arc<RouteProtection>,
    /// Middleware configuration.
    pub config: GuardConfig,
}

impl GuardState {
    /// Create new middleware state.
    pub fn new(protection: Arc<RouteProtection>, config: GuardConfig) -> Self {
        Self { protection, config }
    }
}

/// Wrap every route of `router` with request tracing and the delete guard.
pub fn protect_router<S>(router: Router<S>, state: GuardState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(axum::middleware::from_fn_with_state(state, protect_deletes)),
    )
}
