// src/analytics/loyalty.rs
//
// Point accrual, tier placement, program statistics and the two impact
// heuristics of the loyalty console.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::{
    analytics::{customers, percentage},
    common::format::format_grouped,
    models::{
        customer::Customer,
        loyalty::{
            LoyaltyAccount, LoyaltyProgram, LoyaltyStats, LoyaltyTier, ProgramChangePreview,
            ProgramChangePreviewRequest, SimulationRequest, SimulationResult, TierDistributionEntry,
            TopMember,
        },
        receipt::{LineItem, ReceiptWithItems},
    },
};

pub const SIMULATION_WINDOW_DAYS: i64 = 90;
pub const ENGAGEMENT_WINDOW_DAYS: i64 = 60;
pub const REVENUE_WINDOW_DAYS: i64 = 30;
pub const TOP_MEMBERS_LIMIT: i64 = 10;
pub const UNCLASSIFIED_TIER: &str = "Non classé";

const ADOPTION_RATE: Decimal = Decimal::from_parts(3, 0, 0, false, 1); // 0.3
const SPEND_UPLIFT: Decimal = Decimal::from_parts(1, 0, 0, false, 1); // 0.1
const CATEGORY_BOOST: Decimal = Decimal::from_parts(2, 0, 0, false, 1); // 0.2
const POINTS_USED_SHARE: Decimal = Decimal::from_parts(3, 0, 0, false, 1); // 0.3
const ENGAGEMENT_SCALE: f64 = 10.0;
const TOP_MEMBER_CATEGORIES: usize = 3;

const PREVIEW_DEFAULT_SPEND: i64 = 10_000;
const PREVIEW_DEFAULT_POINTS: i64 = 50_000;
const PREVIEW_BONUS_CATEGORY_BOOST: i64 = 5;

fn floor_to_i64(value: Decimal) -> i64 {
    value.floor().to_i64().unwrap_or(0)
}

fn round_to_i64(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

// =============================================================================
//  ACCRUAL & TIERS
// =============================================================================

/// ⌊Σ line revenue × points per unit × category multiplier⌋
pub fn accrued_points(program: &LoyaltyProgram, items: &[LineItem]) -> i64 {
    let raw: Decimal = items
        .iter()
        .map(|li| li.revenue() * program.points_per_unit * program.category_multiplier(&li.category))
        .sum();
    floor_to_i64(raw)
}

/// Highest band containing the spend.
pub fn tier_for_spend(tiers: &[LoyaltyTier], spend: Decimal) -> Option<&LoyaltyTier> {
    tiers
        .iter()
        .filter(|t| t.contains(spend))
        .max_by(|a, b| a.min_spend.cmp(&b.min_spend))
}

// =============================================================================
//  STATISTICS
// =============================================================================

pub fn loyalty_stats(
    accounts: &[LoyaltyAccount],
    tiers: &[LoyaltyTier],
    receipts: &[ReceiptWithItems],
    now: DateTime<Utc>,
) -> LoyaltyStats {
    let total_points: i64 = accounts.iter().map(|a| a.points).sum();
    // no point ledger: usage is an estimate
    let points_used = floor_to_i64(Decimal::from(total_points) * POINTS_USED_SHARE);

    let engaged_since = now - Duration::days(ENGAGEMENT_WINDOW_DAYS);
    let engaged = accounts
        .iter()
        .filter(|a| a.last_activity.is_some_and(|at| at >= engaged_since))
        .count();

    let members: HashSet<Uuid> = accounts.iter().map(|a| a.customer_id).collect();
    let revenue_since = now - Duration::days(REVENUE_WINDOW_DAYS);
    let loyalty_revenue = receipts
        .iter()
        .filter(|r| r.receipt.created_at >= revenue_since)
        .filter(|r| r.receipt.customer_id.is_some_and(|id| members.contains(&id)))
        .map(|r| r.receipt.total_amount)
        .sum();

    let tier_distribution = tiers
        .iter()
        .map(|tier| TierDistributionEntry {
            tier: tier.name.clone(),
            count: accounts.iter().filter(|a| a.tier_id == Some(tier.id)).count(),
            min_spend: tier.min_spend,
            max_spend: tier.max_spend,
        })
        .collect();

    LoyaltyStats {
        total_members: accounts.len(),
        total_points,
        points_used,
        points_in_circulation: total_points - points_used,
        engagement_rate: percentage(engaged, accounts.len()),
        loyalty_revenue,
        tier_distribution,
    }
}

pub fn top_member(
    customer: &Customer,
    account: &LoyaltyAccount,
    tier_name: Option<&str>,
    receipts: &[ReceiptWithItems],
) -> TopMember {
    TopMember {
        customer_id: customer.id,
        name: customer.full_name(),
        email: customer.email.clone(),
        tier: tier_name.unwrap_or(UNCLASSIFIED_TIER).to_string(),
        points: account.points,
        total_spend: account.total_spend,
        frequency: customers::average_days_between_visits(receipts),
        top_categories: customers::top_categories(receipts, TOP_MEMBER_CATEGORIES),
    }
}

// =============================================================================
//  IMPACT SIMULATOR
// =============================================================================

pub struct SimulationInput<'a> {
    pub account_count: usize,
    pub points_per_unit: Decimal,
    /// Receipts of loyalty members over the simulation window.
    pub member_receipts: &'a [ReceiptWithItems],
}

/// Deterministic what-if on the program rules.
///
/// A category bonus, when present, takes precedence over a points-rate
/// change, even at 0 %. Percentages are expected within the bounds checked by
/// `LoyaltyService` before this runs.
pub fn simulate(request: &SimulationRequest, input: &SimulationInput<'_>) -> SimulationResult {
    let accounts = Decimal::from(input.account_count);

    let (additional_revenue, points_cost, customers_affected) = match (
        request.bonus_category.as_ref(),
        request.points_rate_change.filter(|c| !c.is_zero()),
    ) {
        (Some(bonus), _) => {
            let bonus_share = bonus.bonus / Decimal::ONE_HUNDRED;
            let category_revenue: Decimal = input
                .member_receipts
                .iter()
                .flat_map(|r| r.line_items.iter())
                .filter(|li| li.category == bonus.category)
                .map(LineItem::revenue)
                .sum();
            let revenue = category_revenue * bonus_share * CATEGORY_BOOST;
            let points = revenue * input.points_per_unit * bonus_share;
            let affected: HashSet<Uuid> = input
                .member_receipts
                .iter()
                .filter(|r| r.touches_category(&bonus.category))
                .filter_map(|r| r.receipt.customer_id)
                .collect();
            (revenue, points, affected.len())
        }
        (None, Some(change)) => {
            let multiplier = Decimal::ONE + change / Decimal::ONE_HUNDRED;
            let receipt_count = input.member_receipts.len();
            let average_receipt = if receipt_count > 0 {
                input
                    .member_receipts
                    .iter()
                    .map(|r| r.receipt.total_amount)
                    .sum::<Decimal>()
                    / Decimal::from(receipt_count)
            } else {
                Decimal::ZERO
            };
            let extra_spend = average_receipt * SPEND_UPLIFT * multiplier;
            let revenue = extra_spend * accounts * ADOPTION_RATE;
            let points = revenue * input.points_per_unit * multiplier;
            let affected = floor_to_i64(accounts * ADOPTION_RATE).max(0) as usize;
            (revenue, points, affected)
        }
        (None, None) => (Decimal::ZERO, Decimal::ZERO, 0),
    };

    let engagement_lift = if input.account_count > 0 {
        customers_affected as f64 / input.account_count as f64 * ENGAGEMENT_SCALE
    } else {
        0.0
    };

    SimulationResult {
        additional_revenue: additional_revenue.round_dp(2),
        points_cost: floor_to_i64(points_cost),
        customers_affected,
        engagement_lift,
    }
}

// =============================================================================
//  PROGRAM CHANGE PREVIEW
// =============================================================================

pub struct PreviewInput {
    pub account_count: i64,
    pub total_points: i64,
    pub total_spend: Decimal,
}

pub fn preview_program_change(
    request: &ProgramChangePreviewRequest,
    input: &PreviewInput,
) -> ProgramChangePreview {
    let base_revenue = if input.total_spend.is_zero() {
        Decimal::from(PREVIEW_DEFAULT_SPEND)
    } else {
        input.total_spend
    };
    let base_points = if input.total_points == 0 {
        Decimal::from(PREVIEW_DEFAULT_POINTS)
    } else {
        Decimal::from(input.total_points)
    };

    let change = request.points_rate_change.unwrap_or(Decimal::ZERO);
    let points_cost = base_points * change / Decimal::ONE_HUNDRED;

    let has_bonus_category = request
        .bonus_category
        .as_deref()
        .is_some_and(|c| !c.trim().is_empty());
    let boost = if has_bonus_category {
        Decimal::from(PREVIEW_BONUS_CATEGORY_BOOST)
    } else {
        change * Decimal::new(1, 1)
    };
    // +1 point of engagement is worth +0.5 % of revenue
    let revenue_impact = base_revenue * boost / Decimal::ONE_HUNDRED * Decimal::new(5, 1);

    let customers_touched = round_to_i64(Decimal::from(input.account_count) * ADOPTION_RATE);
    let revenue_share = (revenue_impact / base_revenue * Decimal::ONE_HUNDRED).round_dp(1);
    let points_cost = round_to_i64(points_cost);

    let comment = format!(
        "Cette configuration pourrait générer +{}% de CA sur 30 jours, en touchant ~{} clients, pour un coût estimé de {} points.",
        format!("{:.1}", revenue_share).replace('.', ","),
        customers_touched,
        format_grouped(points_cost)
    );

    ProgramChangePreview {
        revenue_impact: round_to_i64(revenue_impact),
        customers_touched,
        points_cost,
        engagement_impact: boost.to_f64().unwrap_or(0.0),
        comment,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::analytics::test_support::{owned_by, receipt, receipt_with};
    use crate::models::loyalty::BonusCategory;

    fn now() -> DateTime<Utc> {
        "2024-11-30T12:00:00Z".parse().unwrap()
    }

    fn program(ppu: i64) -> LoyaltyProgram {
        LoyaltyProgram {
            id: Uuid::new_v4(),
            name: "Programme".into(),
            description: None,
            points_per_unit: Decimal::from(ppu),
            conversion_rate: 100,
            conversion_value: Decimal::from(5),
            bonus_categories: HashMap::from([("Livres".to_string(), Decimal::from(2))]),
            points_expiry_days: Some(365),
            created_at: now(),
            updated_at: now(),
        }
    }

    fn tier(name: &str, min: i64, max: Option<i64>) -> LoyaltyTier {
        LoyaltyTier {
            id: Uuid::new_v4(),
            program_id: Uuid::nil(),
            name: name.into(),
            min_spend: Decimal::from(min),
            max_spend: max.map(Decimal::from),
            benefits: json!({}),
            sort_order: 0,
        }
    }

    fn account(points: i64, last_activity: Option<DateTime<Utc>>) -> LoyaltyAccount {
        LoyaltyAccount {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            program_id: Uuid::nil(),
            tier_id: None,
            points,
            total_spend: Decimal::ZERO,
            last_activity,
            created_at: now(),
        }
    }

    #[test]
    fn accrual_applies_category_multiplier_and_floors() {
        let r = receipt_with(now(), &[("Livres", 1, 10), ("Jeux", 1, 5)]);
        let mut items = r.line_items;
        items[1].unit_price = Decimal::new(575, 2);
        // 10 * 2 + 5.75 * 1
        assert_eq!(accrued_points(&program(1), &items), 25);
    }

    #[test]
    fn tier_bands_are_half_open() {
        let tiers = vec![tier("Bronze", 0, Some(100)), tier("Argent", 100, Some(500)), tier("Or", 500, None)];
        assert_eq!(tier_for_spend(&tiers, Decimal::from(99)).unwrap().name, "Bronze");
        assert_eq!(tier_for_spend(&tiers, Decimal::from(100)).unwrap().name, "Argent");
        assert_eq!(tier_for_spend(&tiers, Decimal::from(5000)).unwrap().name, "Or");
        assert!(tier_for_spend(&[], Decimal::from(10)).is_none());
    }

    #[test]
    fn category_bonus_scenario() {
        let member = Uuid::new_v4();
        let receipts = vec![
            owned_by(receipt_with(now(), &[("Livres", 10, 100)]), member),
            owned_by(receipt_with(now(), &[("Jeux", 1, 70)]), Uuid::new_v4()),
        ];
        let request = SimulationRequest {
            points_rate_change: Some(Decimal::from(50)),
            bonus_category: Some(BonusCategory {
                category: "Livres".into(),
                bonus: Decimal::from(20),
            }),
        };
        let input = SimulationInput {
            account_count: 10,
            points_per_unit: Decimal::ONE,
            member_receipts: &receipts,
        };

        let result = simulate(&request, &input);

        // 1000 × 20 % × 20 %
        assert_eq!(result.additional_revenue, Decimal::from(40));
        assert_eq!(result.points_cost, 8);
        assert_eq!(result.customers_affected, 1);
        assert_eq!(result.engagement_lift, 1.0);
    }

    #[test]
    fn points_rate_change_scenario() {
        let receipts: Vec<ReceiptWithItems> = (0..4)
            .map(|_| owned_by(receipt(now(), 50), Uuid::new_v4()))
            .collect();
        let request = SimulationRequest {
            points_rate_change: Some(Decimal::from(10)),
            bonus_category: None,
        };
        let input = SimulationInput {
            account_count: 10,
            points_per_unit: Decimal::ONE,
            member_receipts: &receipts,
        };

        let result = simulate(&request, &input);

        // 50 × 0.1 × 1.1 × (10 × 0.3)
        assert_eq!(result.additional_revenue, Decimal::new(165, 1));
        // 16.5 × 1.1 = 18.15
        assert_eq!(result.points_cost, 18);
        assert_eq!(result.customers_affected, 3);
        assert_eq!(result.engagement_lift, 3.0);
    }

    #[test]
    fn zero_bonus_category_still_overrides_rate_change() {
        let member = Uuid::new_v4();
        let receipts = vec![owned_by(receipt_with(now(), &[("Livres", 10, 100)]), member)];
        let request = SimulationRequest {
            points_rate_change: Some(Decimal::from(50)),
            bonus_category: Some(BonusCategory {
                category: "Livres".into(),
                bonus: Decimal::ZERO,
            }),
        };
        let input = SimulationInput {
            account_count: 10,
            points_per_unit: Decimal::ONE,
            member_receipts: &receipts,
        };

        let result = simulate(&request, &input);

        assert_eq!(result.additional_revenue, Decimal::ZERO);
        assert_eq!(result.points_cost, 0);
        assert_eq!(result.customers_affected, 1);
    }

    #[test]
    fn largest_accepted_percentages_stay_in_decimal_range() {
        let receipts: Vec<ReceiptWithItems> = (0..50)
            .map(|_| owned_by(receipt_with(now(), &[("Livres", 1_000, 1_000_000)]), Uuid::new_v4()))
            .collect();
        let input = SimulationInput {
            account_count: 1_000_000,
            points_per_unit: Decimal::from(100),
            member_receipts: &receipts,
        };
        let rate = SimulationRequest {
            points_rate_change: Some(Decimal::from(1_000)),
            bonus_category: None,
        };
        let bonus = SimulationRequest {
            points_rate_change: None,
            bonus_category: Some(BonusCategory {
                category: "Livres".into(),
                bonus: Decimal::from(1_000),
            }),
        };

        assert!(simulate(&rate, &input).additional_revenue > Decimal::ZERO);
        assert!(simulate(&bonus, &input).points_cost > 0);

        let preview = ProgramChangePreviewRequest {
            points_rate_change: Some(Decimal::from(-100)),
            bonus_category: None,
        };
        let totals = PreviewInput {
            account_count: 1_000_000,
            total_points: i64::MAX / 2,
            total_spend: Decimal::from(1_000_000_000_000i64),
        };
        assert!(preview_program_change(&preview, &totals).points_cost < 0);
    }

    #[test]
    fn zero_request_yields_zero_result() {
        let input = SimulationInput {
            account_count: 0,
            points_per_unit: Decimal::ONE,
            member_receipts: &[],
        };
        let zero = SimulationRequest {
            points_rate_change: Some(Decimal::ZERO),
            bonus_category: None,
        };
        for request in [SimulationRequest::default(), zero] {
            let result = simulate(&request, &input);
            assert_eq!(result.additional_revenue, Decimal::ZERO);
            assert_eq!(result.points_cost, 0);
            assert_eq!(result.customers_affected, 0);
            assert_eq!(result.engagement_lift, 0.0);
        }
    }

    #[test]
    fn stats_estimate_usage_and_engagement() {
        let now = now();
        let gold = tier("Or", 500, None);
        let mut a = account(1000, Some(now - Duration::days(10)));
        a.tier_id = Some(gold.id);
        let b = account(501, Some(now - Duration::days(90)));
        let member_receipt = owned_by(receipt(now - Duration::days(3), 80), a.customer_id);
        let stranger_receipt = owned_by(receipt(now - Duration::days(3), 999), Uuid::new_v4());

        let stats = loyalty_stats(&[a, b], &[gold], &[member_receipt, stranger_receipt], now);

        assert_eq!(stats.total_members, 2);
        assert_eq!(stats.total_points, 1501);
        assert_eq!(stats.points_used, 450);
        assert_eq!(stats.points_in_circulation, 1051);
        assert_eq!(stats.engagement_rate, 50.0);
        assert_eq!(stats.loyalty_revenue, Decimal::from(80));
        assert_eq!(stats.tier_distribution[0].count, 1);
    }

    #[test]
    fn stats_of_an_empty_program_are_zero() {
        let stats = loyalty_stats(&[], &[], &[], now());
        assert_eq!(stats.total_points, 0);
        assert_eq!(stats.engagement_rate, 0.0);
    }

    #[test]
    fn preview_uses_defaults_on_empty_program() {
        let request = ProgramChangePreviewRequest {
            points_rate_change: Some(Decimal::from(20)),
            bonus_category: None,
        };
        let input = PreviewInput {
            account_count: 10,
            total_points: 0,
            total_spend: Decimal::ZERO,
        };

        let preview = preview_program_change(&request, &input);

        // boost 2 → 10000 × 2 % × 0.5
        assert_eq!(preview.revenue_impact, 100);
        assert_eq!(preview.points_cost, 10_000);
        assert_eq!(preview.customers_touched, 3);
        assert_eq!(preview.engagement_impact, 2.0);
        assert!(preview.comment.contains("+1,0% de CA"));
        assert!(preview.comment.contains("~3 clients"));
    }

    #[test]
    fn preview_bonus_category_sets_fixed_boost() {
        let request = ProgramChangePreviewRequest {
            points_rate_change: None,
            bonus_category: Some("Vinyles".into()),
        };
        let input = PreviewInput {
            account_count: 5,
            total_points: 2000,
            total_spend: Decimal::from(4000),
        };

        let preview = preview_program_change(&request, &input);

        assert_eq!(preview.engagement_impact, 5.0);
        assert_eq!(preview.revenue_impact, 100);
        assert_eq!(preview.points_cost, 0);
        // 1.5 rounds away from zero
        assert_eq!(preview.customers_touched, 2);
    }
}
