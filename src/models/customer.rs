// src/models/customer.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::analytics::SegmentKind;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    #[schema(example = "Camille")]
    pub first_name: String,
    #[schema(example = "Martin")]
    pub last_name: String,
    #[schema(example = "camille.martin@exemple.fr")]
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// Query string of GET /api/customers
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerFilter {
    pub query: Option<String>,
    // "all", "none" or a tier name
    pub tier: Option<String>,
    // "active" or "inactive"
    pub activity: Option<String>,
}

// Aggregated row behind the customer list
#[derive(Debug, Clone, FromRow)]
pub struct CustomerListRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub tier: Option<String>,
    pub receipt_count: i64,
    pub last_visit: Option<DateTime<Utc>>,
    pub total_spend: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerListEntry {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub tier: Option<String>,
    pub receipt_count: i64,
    pub last_visit: Option<DateTime<Utc>>,
    pub total_spend: Decimal,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerStats {
    pub total_spend: Decimal,
    pub visits: usize,
    #[schema(example = json!(["Livres", "Vinyles"]))]
    pub top_categories: Vec<String>,
    pub main_store: Option<String>,
    pub avg_days_between_visits: f64,
    pub segments: Vec<SegmentKind>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    #[serde(flatten)]
    pub customer: Customer,
    pub tier: Option<String>,
    pub points: Option<i64>,
    pub stats: CustomerStats,
}
