// src/db/loyalty_repo.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{Executor, PgPool, Postgres, types::Json};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::loyalty::{
        CampaignStats, LoyaltyAccount, LoyaltyCampaign, LoyaltyProgram, LoyaltyTier, NewCampaign,
        ProgramRulesUpdate, TierInput,
    },
};

const PROGRAM_COLUMNS: &str = "id, name, description, points_per_unit, conversion_rate, conversion_value, \
                               bonus_categories, points_expiry_days, created_at, updated_at";
const TIER_COLUMNS: &str = "id, program_id, name, min_spend, max_spend, benefits, sort_order";
const ACCOUNT_COLUMNS: &str = "id, customer_id, program_id, tier_id, points, total_spend, last_activity, created_at";
const CAMPAIGN_COLUMNS: &str = "id, program_id, name, description, target_segment, channel, offer_type, \
                                offer_payload, status, estimated_impact, stats, created_at";

// Totals over every loyalty account
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct AccountAggregates {
    pub account_count: i64,
    pub total_points: i64,
    pub total_spend: Decimal,
}

#[derive(Clone)]
pub struct LoyaltyRepository {
    pool: PgPool,
}

impl LoyaltyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  PROGRAM
    // =========================================================================

    /// The loyalty program (the oldest one if several were ever created).
    pub async fn find_program(&self) -> Result<Option<LoyaltyProgram>, AppError> {
        let program = sqlx::query_as::<_, LoyaltyProgram>(&format!(
            "SELECT {PROGRAM_COLUMNS} FROM loyalty_programs ORDER BY created_at ASC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(program)
    }

    pub async fn find_program_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<LoyaltyProgram>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let program = sqlx::query_as::<_, LoyaltyProgram>(&format!(
            "SELECT {PROGRAM_COLUMNS} FROM loyalty_programs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(program)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_program<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
        points_per_unit: Decimal,
        conversion_rate: i32,
        conversion_value: Decimal,
        bonus_categories: &HashMap<String, Decimal>,
        points_expiry_days: Option<i32>,
    ) -> Result<LoyaltyProgram, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let program = sqlx::query_as::<_, LoyaltyProgram>(&format!(
            r#"
            INSERT INTO loyalty_programs (
                name, description, points_per_unit, conversion_rate, conversion_value,
                bonus_categories, points_expiry_days
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PROGRAM_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(description)
        .bind(points_per_unit)
        .bind(conversion_rate)
        .bind(conversion_value)
        .bind(Json(bonus_categories))
        .bind(points_expiry_days)
        .fetch_one(executor)
        .await?;

        Ok(program)
    }

    /// Applies the fields present in `update`, leaves the others untouched.
    pub async fn update_rules<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        update: &ProgramRulesUpdate,
    ) -> Result<Option<LoyaltyProgram>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let program = sqlx::query_as::<_, LoyaltyProgram>(&format!(
            r#"
            UPDATE loyalty_programs SET
                points_per_unit = COALESCE($2, points_per_unit),
                conversion_rate = COALESCE($3, conversion_rate),
                conversion_value = COALESCE($4, conversion_value),
                points_expiry_days = COALESCE($5, points_expiry_days),
                bonus_categories = COALESCE($6, bonus_categories),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROGRAM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.points_per_unit)
        .bind(update.conversion_rate)
        .bind(update.conversion_value)
        .bind(update.points_expiry_days)
        .bind(update.bonus_categories.as_ref().map(Json))
        .fetch_optional(executor)
        .await?;

        Ok(program)
    }

    // =========================================================================
    //  TIERS
    // =========================================================================

    pub async fn list_tiers(&self, program_id: Uuid) -> Result<Vec<LoyaltyTier>, AppError> {
        self.list_tiers_in(&self.pool, program_id).await
    }

    pub async fn list_tiers_in<'e, E>(&self, executor: E, program_id: Uuid) -> Result<Vec<LoyaltyTier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tiers = sqlx::query_as::<_, LoyaltyTier>(&format!(
            "SELECT {TIER_COLUMNS} FROM loyalty_tiers WHERE program_id = $1 ORDER BY sort_order ASC, min_spend ASC"
        ))
        .bind(program_id)
        .fetch_all(executor)
        .await?;

        Ok(tiers)
    }

    pub async fn delete_tiers<'e, E>(&self, executor: E, program_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM loyalty_tiers WHERE program_id = $1")
            .bind(program_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn insert_tier<'e, E>(
        &self,
        executor: E,
        program_id: Uuid,
        tier: &TierInput,
        sort_order: i32,
    ) -> Result<LoyaltyTier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let benefits = tier.benefits.clone().unwrap_or_else(|| json!({}));
        let created = sqlx::query_as::<_, LoyaltyTier>(&format!(
            r#"
            INSERT INTO loyalty_tiers (program_id, name, min_spend, max_spend, benefits, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TIER_COLUMNS}
            "#
        ))
        .bind(program_id)
        .bind(&tier.name)
        .bind(tier.min_spend)
        .bind(tier.max_spend)
        .bind(benefits)
        .bind(sort_order)
        .fetch_one(executor)
        .await?;

        Ok(created)
    }

    /// Re-places every account of the program in the band matching its spend.
    pub async fn reassign_tiers<'e, E>(&self, executor: E, program_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE loyalty_accounts a SET tier_id = (
                SELECT t.id
                FROM loyalty_tiers t
                WHERE t.program_id = a.program_id
                  AND a.total_spend >= t.min_spend
                  AND (t.max_spend IS NULL OR a.total_spend < t.max_spend)
                ORDER BY t.min_spend DESC
                LIMIT 1
            )
            WHERE a.program_id = $1
            "#,
        )
        .bind(program_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    //  ACCOUNTS
    // =========================================================================

    pub async fn list_accounts(&self) -> Result<Vec<LoyaltyAccount>, AppError> {
        let accounts = sqlx::query_as::<_, LoyaltyAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM loyalty_accounts ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    pub async fn top_accounts(&self, limit: i64) -> Result<Vec<LoyaltyAccount>, AppError> {
        let accounts = sqlx::query_as::<_, LoyaltyAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM loyalty_accounts ORDER BY total_spend DESC, points DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    pub async fn aggregates(&self) -> Result<AccountAggregates, AppError> {
        let totals = sqlx::query_as::<_, AccountAggregates>(
            r#"
            SELECT
                COUNT(*) AS account_count,
                COALESCE(SUM(points), 0)::BIGINT AS total_points,
                COALESCE(SUM(total_spend), 0) AS total_spend
            FROM loyalty_accounts
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }

    pub async fn count_accounts<'e, E>(&self, executor: E, program_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loyalty_accounts WHERE program_id = $1")
            .bind(program_id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    /// (tier name, points) of a customer's account, if enrolled.
    pub async fn account_summary(&self, customer_id: Uuid) -> Result<Option<(Option<String>, i64)>, AppError> {
        let summary: Option<(Option<String>, i64)> = sqlx::query_as(
            r#"
            SELECT t.name, a.points
            FROM loyalty_accounts a
            LEFT JOIN loyalty_tiers t ON t.id = a.tier_id
            WHERE a.customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Row-locks the customer's account for the rest of the transaction.
    pub async fn lock_account_for_customer<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
    ) -> Result<Option<LoyaltyAccount>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let account = sqlx::query_as::<_, LoyaltyAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM loyalty_accounts WHERE customer_id = $1 FOR UPDATE"
        ))
        .bind(customer_id)
        .fetch_optional(executor)
        .await?;

        Ok(account)
    }

    pub async fn record_accrual<'e, E>(
        &self,
        executor: E,
        account_id: Uuid,
        points: i64,
        spend: Decimal,
        tier_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> Result<LoyaltyAccount, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let account = sqlx::query_as::<_, LoyaltyAccount>(&format!(
            r#"
            UPDATE loyalty_accounts SET
                points = points + $2,
                total_spend = total_spend + $3,
                tier_id = $4,
                last_activity = $5
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(account_id)
        .bind(points)
        .bind(spend)
        .bind(tier_id)
        .bind(at)
        .fetch_one(executor)
        .await?;

        Ok(account)
    }

    pub async fn create_account<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        program_id: Uuid,
        tier_id: Option<Uuid>,
    ) -> Result<LoyaltyAccount, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let account = sqlx::query_as::<_, LoyaltyAccount>(&format!(
            r#"
            INSERT INTO loyalty_accounts (customer_id, program_id, tier_id)
            VALUES ($1, $2, $3)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(customer_id)
        .bind(program_id)
        .bind(tier_id)
        .fetch_one(executor)
        .await?;

        Ok(account)
    }

    // =========================================================================
    //  CAMPAIGNS
    // =========================================================================

    pub async fn create_campaign<'e, E>(
        &self,
        executor: E,
        campaign: &NewCampaign,
    ) -> Result<LoyaltyCampaign, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, LoyaltyCampaign>(&format!(
            r#"
            INSERT INTO loyalty_campaigns (
                program_id, name, description, target_segment, channel, offer_type,
                offer_payload, status, estimated_impact, stats
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {CAMPAIGN_COLUMNS}
            "#
        ))
        .bind(campaign.program_id)
        .bind(&campaign.name)
        .bind(campaign.description.as_deref())
        .bind(campaign.target_segment)
        .bind(campaign.channel)
        .bind(campaign.offer_type)
        .bind(&campaign.offer_payload)
        .bind(campaign.status)
        .bind(Json(&campaign.estimated_impact))
        .bind(Json(CampaignStats::default()))
        .fetch_one(executor)
        .await?;

        Ok(created)
    }

    pub async fn list_campaigns(&self) -> Result<Vec<LoyaltyCampaign>, AppError> {
        let campaigns = sqlx::query_as::<_, LoyaltyCampaign>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM loyalty_campaigns ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(campaigns)
    }
}
