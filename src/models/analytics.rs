// src/models/analytics.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Customer cohorts. Also the target of a loyalty campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "segment_kind")]
pub enum SegmentKind {
    #[serde(rename = "small-recurring")]
    #[sqlx(rename = "SMALL_RECURRING")]
    SmallRecurring,
    #[serde(rename = "big-occasional")]
    #[sqlx(rename = "BIG_OCCASIONAL")]
    BigOccasional,
    #[serde(rename = "inactive-40d")]
    #[sqlx(rename = "INACTIVE_40D")]
    Inactive40d,
    #[serde(rename = "explorers")]
    #[sqlx(rename = "EXPLORERS")]
    Explorers,
    #[serde(rename = "new-customers")]
    #[sqlx(rename = "NEW_CUSTOMERS")]
    NewCustomers,
    #[serde(rename = "big-point-users")]
    #[sqlx(rename = "BIG_POINT_USERS")]
    BigPointUsers,
}

impl SegmentKind {
    pub const ALL: [SegmentKind; 6] = [
        SegmentKind::SmallRecurring,
        SegmentKind::BigOccasional,
        SegmentKind::Inactive40d,
        SegmentKind::Explorers,
        SegmentKind::NewCustomers,
        SegmentKind::BigPointUsers,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SegmentKind::SmallRecurring => "Petits paniers récurrents",
            SegmentKind::BigOccasional => "Gros paniers occasionnels",
            SegmentKind::Inactive40d => "Clients inactifs 40j+",
            SegmentKind::Explorers => "Explorateurs multi-catégories",
            SegmentKind::NewCustomers => "Nouveaux clients",
            SegmentKind::BigPointUsers => "Gros utilisateurs de points",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSummary {
    pub id: SegmentKind,
    pub name: String,
    pub customer_count: usize,
    pub average_basket: Decimal,
    // mean visit count per member over the window
    pub average_frequency: f64,
    pub revenue: Decimal,
    // % of members holding a loyalty account
    pub loyalty_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAnalytics {
    #[schema(example = "Livres")]
    pub category: String,
    pub revenue: Decimal,
    pub units_sold: i64,
    pub ticket_count: usize,
    pub avg_basket: Decimal,
    pub avg_days_between_visits: f64,
    pub customer_count: usize,
    pub new_customers: usize,
    pub returning_customers: usize,
    pub new_customer_rate: f64,
    pub returning_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyReceipts {
    #[schema(value_type = String, format = Date, example = "2024-11-15")]
    pub date: NaiveDate,
    pub count: usize,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorePerformance {
    pub store_id: Uuid,
    pub name: String,
    pub count: usize,
    pub revenue: Decimal,
    pub claimed_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub total_receipts: usize,
    pub total_revenue: Decimal,
    pub claimed_rate: f64,
    pub active_customers: usize,
    pub average_basket: Decimal,
    // receipts per identified customer
    pub average_frequency: f64,
    pub identification_rate: f64,
    pub identified_avg_basket: Decimal,
    pub anonymous_avg_basket: Decimal,
    pub store_performance: Vec<StorePerformance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyComparison {
    pub loyalty_revenue: Decimal,
    pub loyalty_count: usize,
    pub loyalty_avg_basket: Decimal,
    pub non_loyalty_revenue: Decimal,
    pub non_loyalty_count: usize,
    pub non_loyalty_avg_basket: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorePaperSaving {
    pub store_name: String,
    pub kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalImpact {
    pub digital_receipts: usize,
    // kilograms
    pub paper_saved: f64,
    pub co2_avoided: f64,
    pub trees_equivalent: f64,
    pub paper_saved_by_store: Vec<StorePaperSaving>,
}

// Query string shared by the analytics endpoints that accept a window
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WindowQuery {
    pub days: Option<i64>,
}
