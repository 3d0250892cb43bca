// src/handlers/health.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::{common::error::ApiError, config::AppState, middleware::i18n::Locale};

// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, description = "Service en ligne"))
)]
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// GET /api/health/db
#[utoipa::path(
    get,
    path = "/api/health/db",
    tag = "Health",
    responses(
        (status = 200, description = "Base de données joignable"),
        (status = 503, description = "Base indisponible ou schéma absent")
    )
)]
pub async fn health_db(State(app_state): State<AppState>, locale: Locale) -> Result<impl IntoResponse, ApiError> {
    let stores = app_state
        .store_service
        .count_stores()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(json!({ "status": "ok", "database": "connected", "stores": stores })))
}
