// src/handlers/loyalty.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::loyalty::{
        CreateCampaignPayload, InitializeOutcome, LoyaltyCampaign, LoyaltyOverview, LoyaltyProgram, LoyaltyTier,
        ProgramChangePreview, ProgramChangePreviewRequest, ProgramRulesUpdate, SimulationRequest,
        SimulationResult, TierInput, TopMember,
    },
};

// =============================================================================
//  PROGRAM
// =============================================================================

// GET /api/loyalty/program
#[utoipa::path(
    get,
    path = "/api/loyalty/program",
    tag = "Fidélité",
    responses(
        (status = 200, description = "Programme, paliers et statistiques", body = LoyaltyOverview),
        (status = 404, description = "Aucun programme")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_program(State(app_state): State<AppState>, locale: Locale) -> Result<impl IntoResponse, ApiError> {
    let overview = app_state
        .loyalty_service
        .get_overview()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(overview))
}

// POST /api/loyalty/program/initialize
#[utoipa::path(
    post,
    path = "/api/loyalty/program/initialize",
    tag = "Fidélité",
    responses(
        (status = 201, description = "Programme par défaut créé", body = InitializeOutcome),
        (status = 200, description = "Programme déjà existant", body = InitializeOutcome),
        (status = 503, description = "Base indisponible, réessayer")
    ),
    security(("api_jwt" = []))
)]
pub async fn initialize_program(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = app_state
        .loyalty_service
        .initialize_program(&app_state.db_pool)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let status = if outcome.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(outcome)))
}

// PATCH /api/loyalty/program/{id}
#[utoipa::path(
    patch,
    path = "/api/loyalty/program/{id}",
    tag = "Fidélité",
    params(("id" = Uuid, Path, description = "Identifiant du programme")),
    request_body = ProgramRulesUpdate,
    responses(
        (status = 200, description = "Règles mises à jour", body = LoyaltyProgram),
        (status = 400, description = "Valeurs non positives"),
        (status = 404, description = "Programme introuvable")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_program(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(program_id): Path<Uuid>,
    Json(payload): Json<ProgramRulesUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let program = app_state
        .loyalty_service
        .update_rules(&app_state.db_pool, program_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(program))
}

// PUT /api/loyalty/program/{id}/tiers
#[utoipa::path(
    put,
    path = "/api/loyalty/program/{id}/tiers",
    tag = "Fidélité",
    params(("id" = Uuid, Path, description = "Identifiant du programme")),
    request_body = Vec<TierInput>,
    responses(
        (status = 200, description = "Paliers remplacés", body = Vec<LoyaltyTier>),
        (status = 400, description = "Tranches invalides"),
        (status = 404, description = "Programme introuvable")
    ),
    security(("api_jwt" = []))
)]
pub async fn replace_tiers(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(program_id): Path<Uuid>,
    Json(payload): Json<Vec<TierInput>>,
) -> Result<impl IntoResponse, ApiError> {
    let tiers = app_state
        .loyalty_service
        .replace_tiers(&app_state.db_pool, program_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(tiers))
}

// GET /api/loyalty/members/top
#[utoipa::path(
    get,
    path = "/api/loyalty/members/top",
    tag = "Fidélité",
    responses(
        (status = 200, description = "Les 10 adhérents qui dépensent le plus", body = Vec<TopMember>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_top_members(State(app_state): State<AppState>, locale: Locale) -> Result<impl IntoResponse, ApiError> {
    let members = app_state
        .loyalty_service
        .top_members()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(members))
}

// =============================================================================
//  CAMPAIGNS
// =============================================================================

// GET /api/loyalty/campaigns
#[utoipa::path(
    get,
    path = "/api/loyalty/campaigns",
    tag = "Fidélité",
    responses(
        (status = 200, description = "Campagnes, plus récentes d'abord", body = Vec<LoyaltyCampaign>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_campaigns(State(app_state): State<AppState>, locale: Locale) -> Result<impl IntoResponse, ApiError> {
    let campaigns = app_state
        .loyalty_service
        .list_campaigns()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(campaigns))
}

// POST /api/loyalty/campaigns
#[utoipa::path(
    post,
    path = "/api/loyalty/campaigns",
    tag = "Fidélité",
    request_body = CreateCampaignPayload,
    responses(
        (status = 201, description = "Campagne créée", body = LoyaltyCampaign),
        (status = 400, description = "Champs obligatoires manquants"),
        (status = 404, description = "Programme introuvable")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_campaign(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateCampaignPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let campaign = app_state
        .loyalty_service
        .create_campaign(&app_state.db_pool, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(campaign)))
}

// =============================================================================
//  SIMULATION
// =============================================================================

// POST /api/loyalty/simulate
#[utoipa::path(
    post,
    path = "/api/loyalty/simulate",
    tag = "Fidélité",
    request_body = SimulationRequest,
    responses(
        (status = 200, description = "Impact estimé sur 90 jours", body = SimulationResult),
        (status = 404, description = "Aucun programme")
    ),
    security(("api_jwt" = []))
)]
pub async fn simulate(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<SimulationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = app_state
        .loyalty_service
        .simulate(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(result))
}

// POST /api/loyalty/preview
#[utoipa::path(
    post,
    path = "/api/loyalty/preview",
    tag = "Fidélité",
    request_body = ProgramChangePreviewRequest,
    responses(
        (status = 200, description = "Aperçu d'un changement de règles", body = ProgramChangePreview)
    ),
    security(("api_jwt" = []))
)]
pub async fn preview_change(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<ProgramChangePreviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let preview = app_state
        .loyalty_service
        .preview_change(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(preview))
}
