use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use ratewall_core::AppError;

use crate::dto::{CreateApiKeyRequest, CreateApiKeyResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn create_api_key_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateApiKeyRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateApiKeyResponse>)> {
    let Json(payload) = payload.map_err(|rejection| {
        AppError::Validation(format!("invalid api key request: {}", rejection.body_text()))
    })?;

    let api_key = state.api_key_service.create_api_key(payload.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateApiKeyResponse {
            api_key: api_key.value().as_str().to_owned(),
        }),
    ))
}
