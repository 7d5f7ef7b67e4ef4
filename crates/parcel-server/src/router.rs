use axum::routing::{get, post};
use axum::Router;
use parcel_protocol::node;
use tower_http::trace::TraceLayer;

use crate::handler::{self, NodeState};

/// Public listener: announcements from the tracker.
pub fn notify_router(state: NodeState) -> Router {
    Router::new()
        .route(node::NOTIFY, post(handler::notify))
        .route(node::HEALTH, get(handler::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Local listener: application registration.
pub fn admin_router(state: NodeState) -> Router {
    Router::new()
        .route(node::REGISTER_APP, post(handler::register_app))
        .route(node::APPS, get(handler::list_apps))
        .route(node::HEALTH, get(handler::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
