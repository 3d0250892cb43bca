// src/handlers/stores.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::store::{CreateStorePayload, CreateTerminalPayload, PosTerminal, Store, StoreWithStats, TerminalWithStore},
};

// =============================================================================
//  STORES
// =============================================================================

// GET /api/stores
#[utoipa::path(
    get,
    path = "/api/stores",
    tag = "Magasins",
    responses(
        (status = 200, description = "Magasins et chiffres sur 30 jours", body = Vec<StoreWithStats>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_stores(State(app_state): State<AppState>, locale: Locale) -> Result<impl IntoResponse, ApiError> {
    let stores = app_state
        .store_service
        .list_stores_with_stats()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(stores))
}

// POST /api/stores
#[utoipa::path(
    post,
    path = "/api/stores",
    tag = "Magasins",
    request_body = CreateStorePayload,
    responses(
        (status = 201, description = "Magasin créé", body = Store),
        (status = 400, description = "Données invalides")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_store(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateStorePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let store = app_state
        .store_service
        .create_store(&app_state.db_pool, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(store)))
}

// =============================================================================
//  TERMINALS
// =============================================================================

// GET /api/terminals
#[utoipa::path(
    get,
    path = "/api/terminals",
    tag = "Magasins",
    responses(
        (status = 200, description = "Terminaux de paiement", body = Vec<TerminalWithStore>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_terminals(State(app_state): State<AppState>, locale: Locale) -> Result<impl IntoResponse, ApiError> {
    let terminals = app_state
        .store_service
        .list_terminals()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(terminals))
}

// POST /api/terminals
#[utoipa::path(
    post,
    path = "/api/terminals",
    tag = "Magasins",
    request_body = CreateTerminalPayload,
    responses(
        (status = 201, description = "Terminal créé", body = PosTerminal),
        (status = 400, description = "Données invalides"),
        (status = 404, description = "Magasin introuvable")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_terminal(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateTerminalPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let terminal = app_state
        .store_service
        .create_terminal(&app_state.db_pool, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(terminal)))
}
