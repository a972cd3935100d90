use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState) -> Router {
    let gated_routes = Router::new()
        .route("/api-key", post(handlers::api_keys::create_api_key_handler))
        .route("/hello-world", get(handlers::hello::hello_world_handler))
        .route(
            "/hello-world-key",
            get(handlers::hello::hello_world_key_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::rate_limit,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(gated_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
