use axum::Json;

use crate::dto::MessageResponse;

pub async fn hello_world_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Hello, World!",
    })
}

pub async fn hello_world_key_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Hello, World! (api key)",
    })
}
