// src/models/store.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "terminal_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminalStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: Uuid,
    #[schema(example = "Magasin Bastille")]
    pub name: String,
    #[schema(example = "Paris")]
    pub city: String,
    #[schema(example = "4 Place de la Bastille, 75011 Paris")]
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PosTerminal {
    pub id: Uuid,
    pub store_id: Uuid,
    #[schema(example = "TPE Caisse 1")]
    pub name: String,
    #[schema(example = "TPE-LXK2M9Q1-4F7Z")]
    pub identifier: String,
    pub status: TerminalStatus,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// Terminal row joined with the name of its store (TPE listing)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TerminalWithStore {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub terminal: PosTerminal,
    pub store_name: String,
}

// Store card of the stores page (30-day figures)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreWithStats {
    #[serde(flatten)]
    pub store: Store,
    #[schema(example = "1520.40")]
    pub revenue: Decimal,
    pub receipt_count: usize,
    #[schema(example = 68.5)]
    pub claimed_rate: f64,
    pub terminal_count: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStorePayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Magasin Bastille")]
    pub name: String,
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Paris")]
    pub city: String,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTerminalPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "TPE Caisse 1")]
    pub name: String,
    pub store_id: Uuid,
}
