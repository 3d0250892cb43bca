// src/handlers/analytics.rs

use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::analytics::{CategoryAnalytics, EnvironmentalImpact, LoyaltyComparison, SegmentSummary, WindowQuery},
};

// GET /api/analytics/categories
#[utoipa::path(
    get,
    path = "/api/analytics/categories",
    tag = "Analytique",
    responses(
        (status = 200, description = "Chiffres par catégorie sur 90 jours", body = Vec<CategoryAnalytics>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_categories(State(app_state): State<AppState>, locale: Locale) -> Result<impl IntoResponse, ApiError> {
    let categories = app_state
        .analytics_service
        .category_analytics()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(categories))
}

// GET /api/analytics/segments?days=30
#[utoipa::path(
    get,
    path = "/api/analytics/segments",
    tag = "Analytique",
    params(("days" = Option<i64>, Query, description = "Fenêtre d'analyse en jours (30 par défaut)")),
    responses(
        (status = 200, description = "Une synthèse par segment", body = Vec<SegmentSummary>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_segments(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(window): Query<WindowQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let segments = app_state
        .analytics_service
        .segments(window.days)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(segments))
}

// GET /api/analytics/loyalty-comparison
#[utoipa::path(
    get,
    path = "/api/analytics/loyalty-comparison",
    tag = "Analytique",
    responses(
        (status = 200, description = "Adhérents contre non-adhérents sur 30 jours", body = LoyaltyComparison)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_loyalty_comparison(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let comparison = app_state
        .analytics_service
        .loyalty_comparison()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(comparison))
}

// GET /api/analytics/environment
#[utoipa::path(
    get,
    path = "/api/analytics/environment",
    tag = "Analytique",
    responses(
        (status = 200, description = "Papier et CO2 économisés sur un an", body = EnvironmentalImpact)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_environment(State(app_state): State<AppState>, locale: Locale) -> Result<impl IntoResponse, ApiError> {
    let impact = app_state
        .analytics_service
        .environmental_impact()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(impact))
}

// GET /api/analytics/export
#[utoipa::path(
    get,
    path = "/api/analytics/export",
    tag = "Analytique",
    responses(
        (status = 200, description = "Export CSV des tickets", content_type = "text/csv")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_receipts(State(app_state): State<AppState>, locale: Locale) -> Result<Response, ApiError> {
    let csv = app_state
        .receipt_service
        .export_receipts_csv()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
        (header::CONTENT_DISPOSITION, "attachment; filename=\"tickets.csv\""),
    ];

    Ok((headers, csv).into_response())
}
