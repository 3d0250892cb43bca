// src/models/receipt.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Flat enumeration; the only enforced move is ISSUED -> CLAIMED (see ReceiptService::claim_receipt)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "receipt_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptStatus {
    Issued,
    Claimed,
    Refunded,
    Cancelled,
}

impl ReceiptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptStatus::Issued => "ISSUED",
            ReceiptStatus::Claimed => "CLAIMED",
            ReceiptStatus::Refunded => "REFUNDED",
            ReceiptStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: Uuid,
    pub store_id: Uuid,
    pub terminal_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub status: ReceiptStatus,
    #[schema(example = "42.90")]
    pub total_amount: Decimal,
    #[schema(example = "EUR")]
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: Uuid,
    pub receipt_id: Uuid,
    #[schema(example = "Livres")]
    pub category: String,
    #[schema(example = "Le Petit Prince")]
    pub product_name: String,
    #[schema(example = 2)]
    pub quantity: i32,
    #[schema(example = "8.50")]
    pub unit_price: Decimal,
}

impl LineItem {
    pub fn revenue(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

// Receipt plus its lines, the unit every analytics fold works on
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptWithItems {
    #[serde(flatten)]
    pub receipt: Receipt,
    pub line_items: Vec<LineItem>,
}

impl ReceiptWithItems {
    pub fn touches_category(&self, category: &str) -> bool {
        self.line_items.iter().any(|li| li.category == category)
    }
}

// Row of the tickets table
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptListEntry {
    pub id: Uuid,
    pub status: ReceiptStatus,
    pub total_amount: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub store_id: Uuid,
    pub store_name: String,
    pub terminal_name: String,
    pub customer_id: Option<Uuid>,
    pub customer_email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptDetail {
    #[serde(flatten)]
    pub receipt: Receipt,
    #[schema(example = "A1B2C3D4")]
    pub short_id: String,
    pub store_name: String,
    pub terminal_name: String,
    pub terminal_identifier: String,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub line_items: Vec<LineItem>,
    pub subtotal: Decimal,
}

// Query string of GET /api/receipts
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptFilter {
    pub status: Option<ReceiptStatus>,
    pub store_id: Option<Uuid>,
    pub query: Option<String>,
}

// One line of an issued receipt, before persistence
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewLineItem {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Vinyles")]
    pub category: String,
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Abbey Road")]
    pub product_name: String,
    #[validate(range(min = 1, message = "invalid_quantity"))]
    #[schema(example = 1)]
    pub quantity: i32,
    #[schema(example = "29.99")]
    pub unit_price: Decimal,
}

impl NewLineItem {
    pub fn revenue(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

// Result of a claim: the receipt and the points credited, if any
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimOutcome {
    pub receipt: Receipt,
    pub customer_id: Uuid,
    pub points_earned: i64,
    pub tier_name: Option<String>,
}

// Receipt joined with its store, terminal and customer (detail page)
#[derive(Debug, Clone, FromRow)]
pub struct ReceiptDetailRow {
    #[sqlx(flatten)]
    pub receipt: Receipt,
    pub store_name: String,
    pub terminal_name: String,
    pub terminal_identifier: String,
    pub customer_first_name: Option<String>,
    pub customer_last_name: Option<String>,
    pub customer_email: Option<String>,
}

// One line of the CSV export
#[derive(Debug, Clone, FromRow)]
pub struct ReceiptExportRow {
    pub created_at: DateTime<Utc>,
    pub store_name: String,
    pub total_amount: Decimal,
    pub currency: String,
    pub status: ReceiptStatus,
    pub customer_email: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueReceiptPayload {
    pub store_id: Uuid,
    pub terminal_id: Uuid,
    pub customer_id: Option<Uuid>,
    #[validate(length(equal = 3, message = "invalid_currency"))]
    #[schema(example = "EUR")]
    pub currency: Option<String>,
    #[validate(length(min = 1, message = "empty_items"))]
    pub line_items: Vec<NewLineItem>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReceiptPayload {
    #[validate(email(message = "invalid_email"))]
    #[schema(example = "camille.martin@exemple.fr")]
    pub email: String,
    #[schema(example = "Camille")]
    pub first_name: Option<String>,
    #[schema(example = "Martin")]
    pub last_name: Option<String>,
}
