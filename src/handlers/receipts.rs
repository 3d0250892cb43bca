// src/handlers/receipts.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::receipt::{
        ClaimOutcome, ClaimReceiptPayload, IssueReceiptPayload, ReceiptDetail, ReceiptFilter,
        ReceiptListEntry, ReceiptStatus, ReceiptWithItems,
    },
};

// GET /api/receipts
#[utoipa::path(
    get,
    path = "/api/receipts",
    tag = "Tickets",
    params(
        ("status" = Option<ReceiptStatus>, Query, description = "Filtre sur le statut"),
        ("storeId" = Option<Uuid>, Query, description = "Filtre sur le magasin"),
        ("query" = Option<String>, Query, description = "Début d'identifiant ou e-mail client")
    ),
    responses(
        (status = 200, description = "100 tickets les plus récents", body = Vec<ReceiptListEntry>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_receipts(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(filter): Query<ReceiptFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let receipts = app_state
        .receipt_service
        .list_receipts(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(receipts))
}

// POST /api/receipts
#[utoipa::path(
    post,
    path = "/api/receipts",
    tag = "Tickets",
    request_body = IssueReceiptPayload,
    responses(
        (status = 201, description = "Ticket émis", body = ReceiptWithItems),
        (status = 400, description = "Données invalides"),
        (status = 404, description = "Terminal ou client introuvable")
    ),
    security(("api_jwt" = []))
)]
pub async fn issue_receipt(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<IssueReceiptPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let receipt = app_state
        .receipt_service
        .issue_receipt(&app_state.db_pool, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

// GET /api/receipts/{id}
#[utoipa::path(
    get,
    path = "/api/receipts/{id}",
    tag = "Tickets",
    params(("id" = Uuid, Path, description = "Identifiant du ticket")),
    responses(
        (status = 200, description = "Détail du ticket", body = ReceiptDetail),
        (status = 404, description = "Ticket introuvable")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_receipt(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(receipt_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .receipt_service
        .get_receipt_detail(receipt_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(detail))
}

// POST /api/receipts/{id}/claim
#[utoipa::path(
    post,
    path = "/api/receipts/{id}/claim",
    tag = "Tickets",
    params(("id" = Uuid, Path, description = "Identifiant du ticket")),
    request_body = ClaimReceiptPayload,
    responses(
        (status = 200, description = "Ticket rattaché au client", body = ClaimOutcome),
        (status = 404, description = "Ticket introuvable"),
        (status = 409, description = "Ticket déjà réclamé, remboursé ou annulé")
    ),
    security(("api_jwt" = []))
)]
pub async fn claim_receipt(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(receipt_id): Path<Uuid>,
    Json(payload): Json<ClaimReceiptPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let outcome = app_state
        .receipt_service
        .claim_receipt(&app_state.db_pool, receipt_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(outcome))
}

// GET /api/receipts/{id}/pdf
#[utoipa::path(
    get,
    path = "/api/receipts/{id}/pdf",
    tag = "Tickets",
    params(("id" = Uuid, Path, description = "Identifiant du ticket")),
    responses(
        (status = 200, description = "Ticket numérique", content_type = "application/pdf"),
        (status = 404, description = "Ticket introuvable")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_receipt_pdf(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(receipt_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let detail = app_state
        .receipt_service
        .get_receipt_detail(receipt_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let document_service = app_state.document_service.clone();
    // genpdf layout is synchronous and CPU-bound
    let pdf_bytes = tokio::task::spawn_blocking(move || document_service.receipt_pdf(&detail))
        .await
        .map_err(|e| AppError::InternalServerError(e.into()).to_api_error(&locale, &app_state.i18n_store))?
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"ticket_{}.pdf\"", receipt_id),
        ),
    ];

    Ok((headers, pdf_bytes).into_response())
}
