// src/models/loyalty.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::analytics::SegmentKind;

// --- Enums (Postgres types) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "campaign_channel", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignChannel {
    Email,
    Push,
    InApp,
    Sms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "offer_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferType {
    BonusPoints,
    Discount,
    Gift,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "campaign_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Scheduled,
    Running,
    Completed,
}

// --- Program ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyProgram {
    pub id: Uuid,
    #[schema(example = "Programme de fidélité")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "1")]
    pub points_per_unit: Decimal,
    // points needed for one conversion
    #[schema(example = 100)]
    pub conversion_rate: i32,
    // currency value of one conversion
    #[schema(example = "5")]
    pub conversion_value: Decimal,
    #[sqlx(json)]
    #[schema(example = json!({"Livres": 2, "Vinyles": 2}))]
    pub bonus_categories: HashMap<String, Decimal>,
    #[schema(example = 365)]
    pub points_expiry_days: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoyaltyProgram {
    // Category multiplier applied on accrual, 1 when the category has no bonus
    pub fn category_multiplier(&self, category: &str) -> Decimal {
        self.bonus_categories
            .get(category)
            .copied()
            .unwrap_or(Decimal::ONE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyTier {
    pub id: Uuid,
    pub program_id: Uuid,
    #[schema(example = "Argent")]
    pub name: String,
    #[schema(example = "100")]
    pub min_spend: Decimal,
    #[schema(example = "500")]
    pub max_spend: Option<Decimal>,
    #[schema(example = json!({"Remise": "5% sur les achats"}))]
    pub benefits: Value,
    pub sort_order: i32,
}

impl LoyaltyTier {
    // Band is [min, max); an open max is unbounded
    pub fn contains(&self, spend: Decimal) -> bool {
        spend >= self.min_spend && self.max_spend.is_none_or(|max| spend < max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyAccount {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub program_id: Uuid,
    pub tier_id: Option<Uuid>,
    pub points: i64,
    pub total_spend: Decimal,
    pub last_activity: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// --- Campaigns ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CampaignStats {
    pub sent: i64,
    pub opened: i64,
    pub clicked: i64,
    pub conversions: i64,
    pub extra_revenue: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct EstimatedImpact {
    pub clients: i64,
    pub estimated_revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyCampaign {
    pub id: Uuid,
    pub program_id: Uuid,
    #[schema(example = "Relance Inactifs 40j+")]
    pub name: String,
    pub description: Option<String>,
    pub target_segment: SegmentKind,
    pub channel: CampaignChannel,
    pub offer_type: OfferType,
    #[schema(example = json!({"bonusPoints": 50}))]
    pub offer_payload: Value,
    pub status: CampaignStatus,
    #[sqlx(json)]
    pub estimated_impact: EstimatedImpact,
    #[sqlx(json)]
    pub stats: CampaignStats,
    pub created_at: DateTime<Utc>,
}

// --- Writes ---

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgramRulesUpdate {
    #[schema(example = "1.5")]
    pub points_per_unit: Option<Decimal>,
    #[schema(example = 100)]
    pub conversion_rate: Option<i32>,
    #[schema(example = "5")]
    pub conversion_value: Option<Decimal>,
    #[schema(example = 540)]
    pub points_expiry_days: Option<i32>,
    pub bonus_categories: Option<HashMap<String, Decimal>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TierInput {
    #[schema(example = "Or")]
    pub name: String,
    #[schema(example = "500")]
    pub min_spend: Decimal,
    pub max_spend: Option<Decimal>,
    #[serde(default)]
    pub benefits: Option<Value>,
}

// Required fields are optional here so a missing one reads as a validation failure
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignPayload {
    #[validate(required(message = "required"))]
    pub program_id: Option<Uuid>,
    #[validate(required(message = "required"), length(min = 1, message = "required"))]
    #[schema(example = "Relance Inactifs 40j+")]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(required(message = "required"))]
    pub target_segment: Option<SegmentKind>,
    #[validate(required(message = "required"))]
    pub channel: Option<CampaignChannel>,
    #[validate(required(message = "required"))]
    pub offer_type: Option<OfferType>,
    pub offer_payload: Option<Value>,
    pub status: Option<CampaignStatus>,
}

#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub program_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub target_segment: SegmentKind,
    pub channel: CampaignChannel,
    pub offer_type: OfferType,
    pub offer_payload: Value,
    pub status: CampaignStatus,
    pub estimated_impact: EstimatedImpact,
}

// --- Reads for the console ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TierDistributionEntry {
    pub tier: String,
    pub count: usize,
    pub min_spend: Decimal,
    pub max_spend: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyStats {
    pub total_members: usize,
    pub total_points: i64,
    // estimate, there is no point ledger
    pub points_used: i64,
    pub points_in_circulation: i64,
    pub engagement_rate: f64,
    pub loyalty_revenue: Decimal,
    pub tier_distribution: Vec<TierDistributionEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyOverview {
    pub program: LoyaltyProgram,
    pub tiers: Vec<LoyaltyTier>,
    pub stats: LoyaltyStats,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitializeOutcome {
    pub created: bool,
    pub program_id: Uuid,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopMember {
    pub customer_id: Uuid,
    pub name: String,
    pub email: String,
    pub tier: String,
    pub points: i64,
    pub total_spend: Decimal,
    pub frequency: f64,
    pub top_categories: Vec<String>,
}

// --- Simulation ---

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BonusCategory {
    #[schema(example = "Livres")]
    pub category: String,
    // percent
    #[schema(example = "20")]
    pub bonus: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRequest {
    // percent change of points per currency unit
    #[schema(example = "10")]
    pub points_rate_change: Option<Decimal>,
    pub bonus_category: Option<BonusCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub additional_revenue: Decimal,
    pub points_cost: i64,
    pub customers_affected: usize,
    // percentage points
    pub engagement_lift: f64,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgramChangePreviewRequest {
    #[schema(example = "20")]
    pub points_rate_change: Option<Decimal>,
    #[schema(example = "Livres")]
    pub bonus_category: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgramChangePreview {
    pub revenue_impact: i64,
    pub customers_touched: i64,
    pub points_cost: i64,
    pub engagement_impact: f64,
    pub comment: String,
}
