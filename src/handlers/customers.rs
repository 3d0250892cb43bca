// src/handlers/customers.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::customer::{CustomerFilter, CustomerListEntry, CustomerProfile},
};

// GET /api/customers
#[utoipa::path(
    get,
    path = "/api/customers",
    tag = "Clients",
    params(
        ("query" = Option<String>, Query, description = "Recherche nom, prénom ou e-mail"),
        ("tier" = Option<String>, Query, description = "all, none ou nom de palier"),
        ("activity" = Option<String>, Query, description = "active ou inactive")
    ),
    responses(
        (status = 200, description = "Clients avec dépenses et visites", body = Vec<CustomerListEntry>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(filter): Query<CustomerFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let customers = app_state
        .customer_service
        .list_customers(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(customers))
}

// GET /api/customers/{id}
#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    tag = "Clients",
    params(("id" = Uuid, Path, description = "Identifiant du client")),
    responses(
        (status = 200, description = "Fiche client", body = CustomerProfile),
        (status = 404, description = "Client introuvable")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(customer_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = app_state
        .customer_service
        .get_customer_profile(customer_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(profile))
}
