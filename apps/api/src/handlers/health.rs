use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use redis::AsyncCommands;

use crate::dto::HealthResponse;
use crate::state::AppState;

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let Some(redis_client) = state.redis_client else {
        return (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                store: "memory",
                detail: None,
            }),
        );
    };

    match check_redis(&redis_client).await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                store: "redis",
                detail: None,
            }),
        ),
        Err(detail) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "degraded",
                store: "redis",
                detail: Some(detail),
            }),
        ),
    }
}

async fn check_redis(redis_client: &redis::Client) -> Result<(), String> {
    let mut connection = redis_client
        .get_multiplexed_async_connection()
        .await
        .map_err(|error| format!("redis connection failed: {error}"))?;

    match connection.ping::<String>().await {
        Ok(value) if value.eq_ignore_ascii_case("pong") => Ok(()),
        Ok(value) => Err(format!("unexpected redis ping response: {value}")),
        Err(error) => Err(format!("redis ping failed: {error}")),
    }
}
