// src/handlers/demo.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{common::error::ApiError, config::AppState, middleware::i18n::Locale, models::demo::DemoSeedSummary};

// POST /api/demo/seed
#[utoipa::path(
    post,
    path = "/api/demo/seed",
    tag = "Démo",
    responses(
        (status = 201, description = "Magasin, terminal, clients et tickets de démonstration", body = DemoSeedSummary)
    ),
    security(("api_jwt" = []))
)]
pub async fn seed_demo_data(State(app_state): State<AppState>, locale: Locale) -> Result<impl IntoResponse, ApiError> {
    let summary = app_state
        .demo_service
        .seed(&app_state.db_pool)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(summary)))
}
