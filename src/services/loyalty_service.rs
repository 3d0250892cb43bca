// src/services/loyalty_service.rs

use std::collections::HashMap;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;
use validator::Validate;

use crate::{
    analytics::loyalty::{
        self as loyalty_math, PreviewInput, REVENUE_WINDOW_DAYS, SIMULATION_WINDOW_DAYS, SimulationInput,
        TOP_MEMBERS_LIMIT,
    },
    common::{error::AppError, retry::RetryPolicy},
    db::{CustomerRepository, LoyaltyRepository, ReceiptRepository},
    models::loyalty::{
        CampaignStatus, CreateCampaignPayload, EstimatedImpact, InitializeOutcome, LoyaltyCampaign,
        LoyaltyOverview, LoyaltyProgram, LoyaltyTier, NewCampaign, ProgramChangePreview,
        ProgramChangePreviewRequest, ProgramRulesUpdate, SimulationRequest, SimulationResult, TierInput,
        TopMember,
    },
};

// --- default program ---
const DEFAULT_PROGRAM_NAME: &str = "Programme de fidélité";
const DEFAULT_PROGRAM_DESCRIPTION: &str = "Programme de fidélité par défaut";
const DEFAULT_CONVERSION_RATE: i32 = 100;
const DEFAULT_CONVERSION_VALUE: i64 = 5;
const DEFAULT_EXPIRY_DAYS: i32 = 365;
const DEFAULT_BONUS_MULTIPLIER: i64 = 2;

// Campaign reach heuristic: 30 % of members, fixed revenue estimate
const CAMPAIGN_REACH_NUMERATOR: i64 = 3;
const CAMPAIGN_REACH_DENOMINATOR: i64 = 10;
const CAMPAIGN_ESTIMATED_REVENUE: i64 = 1500;

// Accepted what-if percentages
const MIN_RATE_CHANGE: i64 = -100;
const MAX_PERCENT: i64 = 1000;

fn default_tiers() -> Vec<TierInput> {
    vec![
        TierInput {
            name: "Bronze".into(),
            min_spend: Decimal::ZERO,
            max_spend: Some(Decimal::from(100)),
            benefits: Some(json!({ "Points standard": "1 point par euro" })),
        },
        TierInput {
            name: "Argent".into(),
            min_spend: Decimal::from(100),
            max_spend: Some(Decimal::from(500)),
            benefits: Some(json!({
                "Points bonus": "1.5 points par euro",
                "Remise": "5% sur les achats",
            })),
        },
        TierInput {
            name: "Or".into(),
            min_spend: Decimal::from(500),
            max_spend: None,
            benefits: Some(json!({
                "Points premium": "2 points par euro",
                "Remise": "10% sur les achats",
                "Livraison gratuite": "Toujours",
            })),
        },
    ]
}

/// Every rate present in the patch must be strictly positive.
pub fn check_rules_update(update: &ProgramRulesUpdate) -> Result<(), AppError> {
    if update.points_per_unit.is_some_and(|v| v <= Decimal::ZERO) {
        return Err(AppError::invalid_field("pointsPerUnit", "must_be_positive"));
    }
    if update.conversion_rate.is_some_and(|v| v <= 0) {
        return Err(AppError::invalid_field("conversionRate", "must_be_positive"));
    }
    if update.conversion_value.is_some_and(|v| v <= Decimal::ZERO) {
        return Err(AppError::invalid_field("conversionValue", "must_be_positive"));
    }
    if update.points_expiry_days.is_some_and(|v| v <= 0) {
        return Err(AppError::invalid_field("pointsExpiryDays", "must_be_positive"));
    }
    if let Some(bonus) = &update.bonus_categories {
        if bonus.iter().any(|(category, m)| category.trim().is_empty() || *m <= Decimal::ZERO) {
            return Err(AppError::invalid_field("bonusCategories", "must_be_positive"));
        }
    }
    Ok(())
}

/// Named bands, non-negative bounds, max above min when present.
pub fn check_tier_bands(tiers: &[TierInput]) -> Result<(), AppError> {
    for tier in tiers {
        if tier.name.trim().is_empty() {
            return Err(AppError::invalid_field("name", "required"));
        }
        let negative = tier.min_spend < Decimal::ZERO || tier.max_spend.is_some_and(|m| m < Decimal::ZERO);
        let inverted = tier.max_spend.is_some_and(|max| max <= tier.min_spend);
        if negative || inverted {
            return Err(AppError::invalid_field("tiers", "invalid_band"));
        }
    }
    Ok(())
}

fn check_rate_change(change: Option<Decimal>) -> Result<(), AppError> {
    let in_range = |c: &Decimal| *c >= Decimal::from(MIN_RATE_CHANGE) && *c <= Decimal::from(MAX_PERCENT);
    if change.is_some_and(|c| !in_range(&c)) {
        return Err(AppError::invalid_field("pointsRateChange", "out_of_range"));
    }
    Ok(())
}

/// Rate change within -100..=1000 %, category bonus within 0..=1000 %.
pub fn check_simulation_request(request: &SimulationRequest) -> Result<(), AppError> {
    check_rate_change(request.points_rate_change)?;
    if let Some(bonus) = &request.bonus_category {
        if bonus.bonus < Decimal::ZERO || bonus.bonus > Decimal::from(MAX_PERCENT) {
            return Err(AppError::invalid_field("bonusCategory", "out_of_range"));
        }
    }
    Ok(())
}

pub fn check_preview_request(request: &ProgramChangePreviewRequest) -> Result<(), AppError> {
    check_rate_change(request.points_rate_change)
}

pub fn campaign_estimate(account_count: i64) -> EstimatedImpact {
    EstimatedImpact {
        clients: account_count * CAMPAIGN_REACH_NUMERATOR / CAMPAIGN_REACH_DENOMINATOR,
        estimated_revenue: Decimal::from(CAMPAIGN_ESTIMATED_REVENUE),
    }
}

#[derive(Clone)]
pub struct LoyaltyService {
    loyalty_repo: LoyaltyRepository,
    receipt_repo: ReceiptRepository,
    customer_repo: CustomerRepository,
    retry: RetryPolicy,
}

impl LoyaltyService {
    pub fn new(
        loyalty_repo: LoyaltyRepository,
        receipt_repo: ReceiptRepository,
        customer_repo: CustomerRepository,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            loyalty_repo,
            receipt_repo,
            customer_repo,
            retry,
        }
    }

    async fn current_program(&self) -> Result<LoyaltyProgram, AppError> {
        self.loyalty_repo
            .find_program()
            .await?
            .ok_or(AppError::NotFound("program"))
    }

    // =========================================================================
    //  PROGRAM
    // =========================================================================

    pub async fn get_overview(&self) -> Result<LoyaltyOverview, AppError> {
        let program = self.current_program().await?;
        let tiers = self.loyalty_repo.list_tiers(program.id).await?;
        let accounts = self.loyalty_repo.list_accounts().await?;

        let since = Utc::now() - Duration::days(REVENUE_WINDOW_DAYS);
        let receipts = self.receipt_repo.member_receipts_with_items(since).await?;

        let stats = loyalty_math::loyalty_stats(&accounts, &tiers, &receipts, Utc::now());
        Ok(LoyaltyOverview { program, tiers, stats })
    }

    /// Returns the existing program, or creates the default one with its
    /// three tiers in a single transaction.
    pub async fn initialize_program<'e, E>(&self, executor: E) -> Result<InitializeOutcome, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let existing = self
            .retry
            .run("find loyalty program", || self.loyalty_repo.find_program())
            .await?;
        if let Some(program) = existing {
            return Ok(InitializeOutcome {
                created: false,
                program_id: program.id,
            });
        }

        let bonus = HashMap::from([
            ("Livres".to_string(), Decimal::from(DEFAULT_BONUS_MULTIPLIER)),
            ("Vinyles".to_string(), Decimal::from(DEFAULT_BONUS_MULTIPLIER)),
        ]);

        let mut tx = executor.begin().await?;

        let program = self
            .loyalty_repo
            .create_program(
                &mut *tx,
                DEFAULT_PROGRAM_NAME,
                Some(DEFAULT_PROGRAM_DESCRIPTION),
                Decimal::ONE,
                DEFAULT_CONVERSION_RATE,
                Decimal::from(DEFAULT_CONVERSION_VALUE),
                &bonus,
                Some(DEFAULT_EXPIRY_DAYS),
            )
            .await?;
        for (index, tier) in default_tiers().iter().enumerate() {
            self.loyalty_repo
                .insert_tier(&mut *tx, program.id, tier, index as i32)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(program_id = %program.id, "loyalty program initialized");
        Ok(InitializeOutcome {
            created: true,
            program_id: program.id,
        })
    }

    pub async fn update_rules<'e, E>(
        &self,
        executor: E,
        program_id: Uuid,
        update: &ProgramRulesUpdate,
    ) -> Result<LoyaltyProgram, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        check_rules_update(update)?;

        self.loyalty_repo
            .update_rules(executor, program_id, update)
            .await?
            .ok_or(AppError::NotFound("program"))
    }

    /// Deletes and recreates the tiers, then re-places every account.
    pub async fn replace_tiers<'e, E>(
        &self,
        executor: E,
        program_id: Uuid,
        tiers: &[TierInput],
    ) -> Result<Vec<LoyaltyTier>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        check_tier_bands(tiers)?;

        let mut tx = executor.begin().await?;

        self.loyalty_repo
            .find_program_by_id(&mut *tx, program_id)
            .await?
            .ok_or(AppError::NotFound("program"))?;

        self.loyalty_repo.delete_tiers(&mut *tx, program_id).await?;
        let mut created = Vec::with_capacity(tiers.len());
        for (index, tier) in tiers.iter().enumerate() {
            created.push(
                self.loyalty_repo
                    .insert_tier(&mut *tx, program_id, tier, index as i32)
                    .await?,
            );
        }
        let moved = self.loyalty_repo.reassign_tiers(&mut *tx, program_id).await?;

        tx.commit().await?;

        tracing::info!(%program_id, tiers = created.len(), accounts = moved, "loyalty tiers replaced");
        Ok(created)
    }

    // =========================================================================
    //  MEMBERS
    // =========================================================================

    pub async fn top_members(&self) -> Result<Vec<TopMember>, AppError> {
        let tier_names: HashMap<Uuid, String> = match self.loyalty_repo.find_program().await? {
            Some(program) => self
                .loyalty_repo
                .list_tiers(program.id)
                .await?
                .into_iter()
                .map(|t| (t.id, t.name))
                .collect(),
            None => HashMap::new(),
        };

        let accounts = self.loyalty_repo.top_accounts(TOP_MEMBERS_LIMIT).await?;
        let mut members = Vec::with_capacity(accounts.len());
        for account in &accounts {
            let Some(customer) = self.customer_repo.find_by_id(account.customer_id).await? else {
                continue;
            };
            let receipts = self
                .receipt_repo
                .receipts_with_items(None, Some(account.customer_id))
                .await?;
            let tier = account.tier_id.and_then(|id| tier_names.get(&id)).map(String::as_str);

            members.push(loyalty_math::top_member(&customer, account, tier, &receipts));
        }

        Ok(members)
    }

    // =========================================================================
    //  CAMPAIGNS
    // =========================================================================

    pub async fn list_campaigns(&self) -> Result<Vec<LoyaltyCampaign>, AppError> {
        self.loyalty_repo.list_campaigns().await
    }

    pub async fn create_campaign<'e, E>(
        &self,
        executor: E,
        payload: &CreateCampaignPayload,
    ) -> Result<LoyaltyCampaign, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        payload.validate()?;

        let name = payload.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err(AppError::invalid_field("name", "required"));
        }
        let (Some(program_id), Some(target_segment), Some(channel), Some(offer_type)) = (
            payload.program_id,
            payload.target_segment,
            payload.channel,
            payload.offer_type,
        ) else {
            return Err(AppError::invalid_field("campaign", "required"));
        };

        let mut tx = executor.begin().await?;

        self.loyalty_repo
            .find_program_by_id(&mut *tx, program_id)
            .await?
            .ok_or(AppError::NotFound("program"))?;
        let account_count = self.loyalty_repo.count_accounts(&mut *tx, program_id).await?;

        let campaign = NewCampaign {
            program_id,
            name: name.to_string(),
            description: payload
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            target_segment,
            channel,
            offer_type,
            offer_payload: payload.offer_payload.clone().unwrap_or_else(|| json!({})),
            status: payload.status.unwrap_or(CampaignStatus::Draft),
            estimated_impact: campaign_estimate(account_count),
        };
        let created = self.loyalty_repo.create_campaign(&mut *tx, &campaign).await?;

        tx.commit().await?;

        tracing::info!(campaign_id = %created.id, segment = ?created.target_segment, "campaign created");
        Ok(created)
    }

    // =========================================================================
    //  SIMULATION
    // =========================================================================

    pub async fn simulate(&self, request: &SimulationRequest) -> Result<SimulationResult, AppError> {
        check_simulation_request(request)?;
        let program = self.current_program().await?;
        let totals = self.loyalty_repo.aggregates().await?;

        let since = Utc::now() - Duration::days(SIMULATION_WINDOW_DAYS);
        let receipts = self.receipt_repo.member_receipts_with_items(since).await?;

        let input = SimulationInput {
            account_count: totals.account_count.max(0) as usize,
            points_per_unit: program.points_per_unit,
            member_receipts: &receipts,
        };
        Ok(loyalty_math::simulate(request, &input))
    }

    pub async fn preview_change(
        &self,
        request: &ProgramChangePreviewRequest,
    ) -> Result<ProgramChangePreview, AppError> {
        check_preview_request(request)?;
        let totals = self.loyalty_repo.aggregates().await?;

        let input = PreviewInput {
            account_count: totals.account_count,
            total_points: totals.total_points,
            total_spend: totals.total_spend,
        };
        Ok(loyalty_math::preview_program_change(request, &input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::loyalty::BonusCategory;

    fn band(name: &str, min: i64, max: Option<i64>) -> TierInput {
        TierInput {
            name: name.into(),
            min_spend: Decimal::from(min),
            max_spend: max.map(Decimal::from),
            benefits: None,
        }
    }

    #[test]
    fn default_tiers_form_contiguous_bands() {
        let tiers = default_tiers();
        assert!(check_tier_bands(&tiers).is_ok());
        assert_eq!(tiers[0].max_spend, Some(tiers[1].min_spend));
        assert_eq!(tiers[1].max_spend, Some(tiers[2].min_spend));
        assert!(tiers[2].max_spend.is_none());
    }

    #[test]
    fn bands_reject_inverted_or_negative_bounds() {
        assert!(check_tier_bands(&[band("Or", 500, Some(100))]).is_err());
        assert!(check_tier_bands(&[band("Or", 100, Some(100))]).is_err());
        assert!(check_tier_bands(&[band("Bronze", -1, None)]).is_err());
        assert!(check_tier_bands(&[band("  ", 0, None)]).is_err());
        assert!(check_tier_bands(&[]).is_ok());
    }

    #[test]
    fn rule_patch_requires_positive_values() {
        assert!(check_rules_update(&ProgramRulesUpdate::default()).is_ok());

        let zero_rate = ProgramRulesUpdate {
            conversion_rate: Some(0),
            ..Default::default()
        };
        assert!(check_rules_update(&zero_rate).is_err());

        let negative_points = ProgramRulesUpdate {
            points_per_unit: Some(Decimal::new(-5, 1)),
            ..Default::default()
        };
        assert!(check_rules_update(&negative_points).is_err());

        let valid = ProgramRulesUpdate {
            points_per_unit: Some(Decimal::new(15, 1)),
            points_expiry_days: Some(540),
            bonus_categories: Some(HashMap::from([("Livres".to_string(), Decimal::from(3))])),
            ..Default::default()
        };
        assert!(check_rules_update(&valid).is_ok());
    }

    #[test]
    fn huge_percentages_are_rejected_before_simulating() {
        let huge: Decimal = "100000000000000000000".parse().unwrap();

        let rate = SimulationRequest {
            points_rate_change: Some(huge),
            bonus_category: None,
        };
        assert!(matches!(check_simulation_request(&rate), Err(AppError::ValidationError(_))));

        let bonus = SimulationRequest {
            points_rate_change: None,
            bonus_category: Some(BonusCategory {
                category: "Livres".into(),
                bonus: huge,
            }),
        };
        assert!(check_simulation_request(&bonus).is_err());

        let preview = ProgramChangePreviewRequest {
            points_rate_change: Some(-huge),
            bonus_category: None,
        };
        assert!(check_preview_request(&preview).is_err());
    }

    #[test]
    fn percentage_bounds_are_inclusive() {
        let at_bounds = [Decimal::from(-100), Decimal::ZERO, Decimal::from(1000)];
        for change in at_bounds {
            let request = SimulationRequest {
                points_rate_change: Some(change),
                bonus_category: None,
            };
            assert!(check_simulation_request(&request).is_ok());
        }

        let below = SimulationRequest {
            points_rate_change: Some(Decimal::new(-1001, 1)),
            bonus_category: None,
        };
        assert!(check_simulation_request(&below).is_err());

        let negative_bonus = SimulationRequest {
            points_rate_change: None,
            bonus_category: Some(BonusCategory {
                category: "Livres".into(),
                bonus: Decimal::from(-5),
            }),
        };
        assert!(check_simulation_request(&negative_bonus).is_err());
        assert!(check_simulation_request(&SimulationRequest::default()).is_ok());
    }

    #[test]
    fn campaign_estimate_reaches_thirty_percent_of_members() {
        assert_eq!(campaign_estimate(10).clients, 3);
        assert_eq!(campaign_estimate(7).clients, 2);
        assert_eq!(campaign_estimate(0).clients, 0);
        assert_eq!(campaign_estimate(7).estimated_revenue, Decimal::from(1500));
    }
}
