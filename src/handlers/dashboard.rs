// src/handlers/dashboard.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::analytics::{DailyReceipts, DashboardOverview, WindowQuery},
};

// GET /api/dashboard/overview
#[utoipa::path(
    get,
    path = "/api/dashboard/overview",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Indicateurs des 30 derniers jours", body = DashboardOverview)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_overview(State(app_state): State<AppState>, locale: Locale) -> Result<impl IntoResponse, ApiError> {
    let overview = app_state
        .analytics_service
        .dashboard_overview()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(overview))
}

// GET /api/dashboard/receipts-by-day?days=30
#[utoipa::path(
    get,
    path = "/api/dashboard/receipts-by-day",
    tag = "Dashboard",
    params(("days" = Option<i64>, Query, description = "Nombre de jours (30 par défaut)")),
    responses(
        (status = 200, description = "Série quotidienne continue", body = Vec<DailyReceipts>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_receipts_by_day(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(window): Query<WindowQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let series = app_state
        .analytics_service
        .receipts_by_day(window.days)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(series))
}
