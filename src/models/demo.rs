// src/models/demo.rs

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

// What POST /api/demo/seed created
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DemoSeedSummary {
    pub store_id: Uuid,
    pub terminal_id: Uuid,
    #[schema(example = 10)]
    pub customers: usize,
    #[schema(example = 50)]
    pub receipts: usize,
    #[schema(example = 34)]
    pub identified_receipts: usize,
    // 0 when no loyalty program exists yet
    #[schema(example = 6)]
    pub enrolled_members: usize,
}
