// src/analytics/overview.rs

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    analytics::percentage,
    common::format::round2,
    models::{
        analytics::{
            DailyReceipts, DashboardOverview, EnvironmentalImpact, LoyaltyComparison,
            StorePaperSaving, StorePerformance,
        },
        receipt::{Receipt, ReceiptStatus},
        store::{Store, StoreWithStats},
    },
};

pub const DASHBOARD_WINDOW_DAYS: i64 = 30;
pub const ENVIRONMENT_WINDOW_DAYS: i64 = 365;

const PAPER_KG_PER_RECEIPT: f64 = 0.003;
const CO2_KG_PER_PAPER_KG: f64 = 0.8;
const TREES_PER_PAPER_KG: f64 = 0.1;

fn average(total: Decimal, count: usize) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        (total / Decimal::from(count)).round_dp(2)
    }
}

fn claimed_rate(receipts: &[&Receipt]) -> f64 {
    let claimed = receipts
        .iter()
        .filter(|r| r.status == ReceiptStatus::Claimed)
        .count();
    percentage(claimed, receipts.len())
}

pub fn store_with_stats(store: Store, receipts: &[Receipt], terminal_count: i64) -> StoreWithStats {
    let own: Vec<&Receipt> = receipts.iter().filter(|r| r.store_id == store.id).collect();
    StoreWithStats {
        revenue: own.iter().map(|r| r.total_amount).sum(),
        receipt_count: own.len(),
        claimed_rate: claimed_rate(&own),
        terminal_count,
        store,
    }
}

pub fn dashboard_overview(receipts: &[Receipt], stores: &[Store]) -> DashboardOverview {
    let total_revenue: Decimal = receipts.iter().map(|r| r.total_amount).sum();
    let all: Vec<&Receipt> = receipts.iter().collect();

    let (identified, anonymous): (Vec<&Receipt>, Vec<&Receipt>) =
        receipts.iter().partition(|r| r.customer_id.is_some());
    let customers: HashSet<Uuid> = identified.iter().filter_map(|r| r.customer_id).collect();

    let identified_revenue: Decimal = identified.iter().map(|r| r.total_amount).sum();
    let anonymous_revenue: Decimal = anonymous.iter().map(|r| r.total_amount).sum();

    let mut store_performance: Vec<StorePerformance> = stores
        .iter()
        .map(|store| {
            let own: Vec<&Receipt> = receipts.iter().filter(|r| r.store_id == store.id).collect();
            StorePerformance {
                store_id: store.id,
                name: store.name.clone(),
                count: own.len(),
                revenue: own.iter().map(|r| r.total_amount).sum(),
                claimed_rate: claimed_rate(&own),
            }
        })
        .collect();
    store_performance.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.name.cmp(&b.name)));

    DashboardOverview {
        total_receipts: receipts.len(),
        total_revenue,
        claimed_rate: claimed_rate(&all),
        active_customers: customers.len(),
        average_basket: average(total_revenue, receipts.len()),
        average_frequency: if customers.is_empty() {
            0.0
        } else {
            identified.len() as f64 / customers.len() as f64
        },
        identification_rate: percentage(identified.len(), receipts.len()),
        identified_avg_basket: average(identified_revenue, identified.len()),
        anonymous_avg_basket: average(anonymous_revenue, anonymous.len()),
        store_performance,
    }
}

/// Continuous daily series ending today, days without receipts included.
pub fn receipts_by_day(receipts: &[Receipt], now: DateTime<Utc>, days: i64) -> Vec<DailyReceipts> {
    let today = now.date_naive();
    let first_day = today - Duration::days(days.max(1) - 1);

    let mut series: BTreeMap<NaiveDate, (usize, Decimal)> = first_day
        .iter_days()
        .take_while(|d| *d <= today)
        .map(|d| (d, (0, Decimal::ZERO)))
        .collect();

    for r in receipts {
        if let Some(entry) = series.get_mut(&r.created_at.date_naive()) {
            entry.0 += 1;
            entry.1 += r.total_amount;
        }
    }

    series
        .into_iter()
        .map(|(date, (count, revenue))| DailyReceipts { date, count, revenue })
        .collect()
}

pub fn loyalty_comparison(receipts: &[Receipt], members: &HashSet<Uuid>) -> LoyaltyComparison {
    let (loyal, others): (Vec<&Receipt>, Vec<&Receipt>) = receipts
        .iter()
        .partition(|r| r.customer_id.is_some_and(|id| members.contains(&id)));

    let loyalty_revenue: Decimal = loyal.iter().map(|r| r.total_amount).sum();
    let non_loyalty_revenue: Decimal = others.iter().map(|r| r.total_amount).sum();

    LoyaltyComparison {
        loyalty_revenue,
        loyalty_count: loyal.len(),
        loyalty_avg_basket: average(loyalty_revenue, loyal.len()),
        non_loyalty_revenue,
        non_loyalty_count: others.len(),
        non_loyalty_avg_basket: average(non_loyalty_revenue, others.len()),
    }
}

/// `claimed_by_store`: (store name, digital receipts) over the last year.
pub fn environmental_impact(claimed_by_store: &[(String, i64)]) -> EnvironmentalImpact {
    let digital_receipts: i64 = claimed_by_store.iter().map(|(_, n)| *n).sum();
    let paper_saved = digital_receipts as f64 * PAPER_KG_PER_RECEIPT;

    let mut paper_saved_by_store: Vec<StorePaperSaving> = claimed_by_store
        .iter()
        .map(|(store_name, n)| StorePaperSaving {
            store_name: store_name.clone(),
            kg: round2(*n as f64 * PAPER_KG_PER_RECEIPT),
        })
        .collect();
    paper_saved_by_store.sort_by(|a, b| b.kg.total_cmp(&a.kg));

    EnvironmentalImpact {
        digital_receipts: digital_receipts.max(0) as usize,
        paper_saved: round2(paper_saved),
        co2_avoided: round2(paper_saved * CO2_KG_PER_PAPER_KG),
        trees_equivalent: round2(paper_saved * TREES_PER_PAPER_KG),
        paper_saved_by_store,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::{at_store, owned_by, receipt, with_status};

    fn now() -> DateTime<Utc> {
        "2024-11-30T12:00:00Z".parse().unwrap()
    }

    fn store(name: &str) -> Store {
        Store {
            id: Uuid::new_v4(),
            name: name.into(),
            city: "Paris".into(),
            address: None,
            created_at: now(),
        }
    }

    #[test]
    fn overview_splits_identified_and_anonymous() {
        let now = now();
        let bastille = store("Bastille");
        let alice = Uuid::new_v4();
        let receipts: Vec<Receipt> = vec![
            with_status(owned_by(at_store(receipt(now, 60), bastille.id), alice), ReceiptStatus::Claimed),
            owned_by(at_store(receipt(now, 40), bastille.id), alice),
            at_store(receipt(now, 20), bastille.id),
            receipt(now, 80),
        ]
        .into_iter()
        .map(|r| r.receipt)
        .collect();

        let o = dashboard_overview(&receipts, std::slice::from_ref(&bastille));

        assert_eq!(o.total_receipts, 4);
        assert_eq!(o.total_revenue, Decimal::from(200));
        assert_eq!(o.claimed_rate, 25.0);
        assert_eq!(o.active_customers, 1);
        assert_eq!(o.average_basket, Decimal::from(50));
        assert_eq!(o.average_frequency, 2.0);
        assert_eq!(o.identification_rate, 50.0);
        assert_eq!(o.identified_avg_basket, Decimal::from(50));
        assert_eq!(o.anonymous_avg_basket, Decimal::from(50));
        assert_eq!(o.store_performance[0].count, 3);
        assert_eq!(o.store_performance[0].revenue, Decimal::from(120));
    }

    #[test]
    fn empty_overview_has_no_nan() {
        let o = dashboard_overview(&[], &[]);
        assert_eq!(o.claimed_rate, 0.0);
        assert_eq!(o.average_frequency, 0.0);
        assert_eq!(o.average_basket, Decimal::ZERO);
    }

    #[test]
    fn daily_series_fills_gaps() {
        let now = now();
        let receipts: Vec<Receipt> = vec![receipt(now, 10), receipt(now, 5), receipt(now - Duration::days(2), 7)]
            .into_iter()
            .map(|r| r.receipt)
            .collect();

        let series = receipts_by_day(&receipts, now, 3);

        assert_eq!(series.len(), 3);
        assert_eq!(series[0].count, 1);
        assert_eq!(series[1].count, 0);
        assert_eq!(series[2].count, 2);
        assert_eq!(series[2].revenue, Decimal::from(15));
        assert_eq!(series[2].date, now.date_naive());
    }

    #[test]
    fn loyalty_comparison_partitions_by_membership() {
        let now = now();
        let member = Uuid::new_v4();
        let receipts: Vec<Receipt> = vec![
            owned_by(receipt(now, 100), member),
            owned_by(receipt(now, 30), Uuid::new_v4()),
            receipt(now, 10),
        ]
        .into_iter()
        .map(|r| r.receipt)
        .collect();

        let c = loyalty_comparison(&receipts, &HashSet::from([member]));

        assert_eq!(c.loyalty_count, 1);
        assert_eq!(c.loyalty_avg_basket, Decimal::from(100));
        assert_eq!(c.non_loyalty_count, 2);
        assert_eq!(c.non_loyalty_avg_basket, Decimal::from(20));
    }

    #[test]
    fn environment_converts_receipts_to_paper() {
        let impact = environmental_impact(&[("Bastille".into(), 1000), ("Lyon".into(), 2000)]);

        assert_eq!(impact.digital_receipts, 3000);
        assert_eq!(impact.paper_saved, 9.0);
        assert_eq!(impact.co2_avoided, 7.2);
        assert_eq!(impact.trees_equivalent, 0.9);
        assert_eq!(impact.paper_saved_by_store[0].store_name, "Lyon");
        assert_eq!(impact.paper_saved_by_store[0].kg, 6.0);
    }

    #[test]
    fn store_stats_only_count_own_receipts() {
        let now = now();
        let s = store("Bastille");
        let receipts: Vec<Receipt> = vec![
            with_status(at_store(receipt(now, 10), s.id), ReceiptStatus::Claimed),
            at_store(receipt(now, 30), s.id),
            receipt(now, 500),
        ]
        .into_iter()
        .map(|r| r.receipt)
        .collect();

        let stats = store_with_stats(s, &receipts, 2);

        assert_eq!(stats.receipt_count, 2);
        assert_eq!(stats.revenue, Decimal::from(40));
        assert_eq!(stats.claimed_rate, 50.0);
        assert_eq!(stats.terminal_count, 2);
    }
}
