// src/analytics/segments.rs
//
// Customer cohorts. One rule set, shared by the segments endpoint and the
// customer profile.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    analytics::percentage,
    models::{
        analytics::{SegmentKind, SegmentSummary},
        receipt::ReceiptWithItems,
    },
};

pub const DEFAULT_WINDOW_DAYS: i64 = 30;

const SMALL_BASKET_CEILING: i64 = 50;
const BIG_BASKET_FLOOR: i64 = 100;
const RECURRING_MIN_VISITS: usize = 3;
const INACTIVITY_DAYS: i64 = 40;
const EXPLORER_MIN_CATEGORIES: usize = 3;
const NEW_CUSTOMER_DAYS: i64 = 30;
const BIG_POINTS_THRESHOLD: i64 = 500;

/// Everything the classifier needs to know about one customer.
#[derive(Debug, Clone)]
pub struct CustomerHistory {
    pub customer_id: Uuid,
    /// Full receipt history, any order.
    pub receipts: Vec<ReceiptWithItems>,
    /// `Some(points)` when the customer holds a loyalty account.
    pub loyalty_points: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerMetrics {
    pub customer_id: Uuid,
    // windowed
    pub visits: usize,
    pub revenue: Decimal,
    pub average_basket: Decimal,
    pub distinct_categories: usize,
    // full history
    pub first_receipt_at: Option<DateTime<Utc>>,
    pub last_receipt_at: Option<DateTime<Utc>>,
    pub loyalty_points: Option<i64>,
}

impl CustomerMetrics {
    pub fn compute(history: &CustomerHistory, now: DateTime<Utc>, window_days: i64) -> Self {
        let window_start = now - Duration::days(window_days);

        let mut visits = 0usize;
        let mut revenue = Decimal::ZERO;
        let mut categories: HashSet<&str> = HashSet::new();

        for r in history.receipts.iter().filter(|r| r.receipt.created_at >= window_start) {
            visits += 1;
            revenue += r.receipt.total_amount;
            categories.extend(r.line_items.iter().map(|li| li.category.as_str()));
        }

        let average_basket = if visits > 0 {
            revenue / Decimal::from(visits)
        } else {
            Decimal::ZERO
        };

        let timestamps = history.receipts.iter().map(|r| r.receipt.created_at);

        Self {
            customer_id: history.customer_id,
            visits,
            revenue,
            average_basket,
            distinct_categories: categories.len(),
            first_receipt_at: timestamps.clone().min(),
            last_receipt_at: timestamps.max(),
            loyalty_points: history.loyalty_points,
        }
    }

    pub fn has_loyalty_account(&self) -> bool {
        self.loyalty_points.is_some()
    }
}

pub fn matches(kind: SegmentKind, m: &CustomerMetrics, now: DateTime<Utc>) -> bool {
    match kind {
        SegmentKind::SmallRecurring => {
            m.average_basket < Decimal::from(SMALL_BASKET_CEILING) && m.visits >= RECURRING_MIN_VISITS
        }
        SegmentKind::BigOccasional => {
            m.average_basket >= Decimal::from(BIG_BASKET_FLOOR)
                && m.visits >= 1
                && m.visits < RECURRING_MIN_VISITS
        }
        // customers who never bought count as inactive too
        SegmentKind::Inactive40d => m
            .last_receipt_at
            .is_none_or(|last| last < now - Duration::days(INACTIVITY_DAYS)),
        SegmentKind::Explorers => m.distinct_categories >= EXPLORER_MIN_CATEGORIES,
        SegmentKind::NewCustomers => m
            .first_receipt_at
            .is_some_and(|first| first >= now - Duration::days(NEW_CUSTOMER_DAYS)),
        SegmentKind::BigPointUsers => m.loyalty_points.is_some_and(|p| p > BIG_POINTS_THRESHOLD),
    }
}

/// Kinds a single customer belongs to, in canonical order.
pub fn classify(m: &CustomerMetrics, now: DateTime<Utc>) -> Vec<SegmentKind> {
    SegmentKind::ALL
        .into_iter()
        .filter(|kind| matches(*kind, m, now))
        .collect()
}

pub fn summarize(kind: SegmentKind, members: &[&CustomerMetrics]) -> SegmentSummary {
    let count = members.len();

    let (average_basket, average_frequency, loyalty_rate) = if count == 0 {
        (Decimal::ZERO, 0.0, 0.0)
    } else {
        let basket_sum: Decimal = members.iter().map(|m| m.average_basket).sum();
        let visit_sum: usize = members.iter().map(|m| m.visits).sum();
        let with_account = members.iter().filter(|m| m.has_loyalty_account()).count();
        (
            (basket_sum / Decimal::from(count)).round_dp(2),
            visit_sum as f64 / count as f64,
            percentage(with_account, count),
        )
    };

    SegmentSummary {
        id: kind,
        name: kind.label().to_string(),
        customer_count: count,
        average_basket,
        average_frequency,
        revenue: members.iter().map(|m| m.revenue).sum(),
        loyalty_rate,
    }
}

/// One summary per cohort, every cohort present even when empty.
pub fn segment_customers(
    histories: &[CustomerHistory],
    now: DateTime<Utc>,
    window_days: i64,
) -> Vec<SegmentSummary> {
    let metrics: Vec<CustomerMetrics> = histories
        .iter()
        .map(|h| CustomerMetrics::compute(h, now, window_days))
        .collect();

    SegmentKind::ALL
        .into_iter()
        .map(|kind| {
            let members: Vec<&CustomerMetrics> =
                metrics.iter().filter(|m| matches(kind, m, now)).collect();
            summarize(kind, &members)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::{receipt, receipt_with};

    fn now() -> DateTime<Utc> {
        "2024-11-30T12:00:00Z".parse().unwrap()
    }

    fn history(receipts: Vec<ReceiptWithItems>, points: Option<i64>) -> CustomerHistory {
        CustomerHistory {
            customer_id: Uuid::new_v4(),
            receipts,
            loyalty_points: points,
        }
    }

    fn summary_of(summaries: &[SegmentSummary], kind: SegmentKind) -> &SegmentSummary {
        summaries.iter().find(|s| s.id == kind).unwrap()
    }

    #[test]
    fn three_small_visits_make_a_small_recurring_customer() {
        let now = now();
        let h = history(
            vec![
                receipt(now - Duration::days(2), 40),
                receipt(now - Duration::days(9), 40),
                receipt(now - Duration::days(16), 40),
            ],
            None,
        );

        let summaries = segment_customers(&[h], now, DEFAULT_WINDOW_DAYS);
        let small = summary_of(&summaries, SegmentKind::SmallRecurring);

        assert_eq!(small.customer_count, 1);
        assert_eq!(small.average_basket, Decimal::from(40));
        assert_eq!(small.average_frequency, 3.0);
        assert_eq!(small.revenue, Decimal::from(120));
        assert_eq!(small.loyalty_rate, 0.0);
    }

    #[test]
    fn inactivity_needs_more_than_forty_days() {
        let now = now();
        let idle = history(vec![receipt(now - Duration::days(45), 20)], None);
        let recent = history(vec![receipt(now - Duration::days(39), 20)], None);

        let summaries = segment_customers(&[idle, recent], now, DEFAULT_WINDOW_DAYS);
        assert_eq!(summary_of(&summaries, SegmentKind::Inactive40d).customer_count, 1);
    }

    #[test]
    fn customers_without_receipts_are_inactive() {
        let now = now();
        let m = CustomerMetrics::compute(&history(vec![], Some(10)), now, DEFAULT_WINDOW_DAYS);
        assert!(matches(SegmentKind::Inactive40d, &m, now));
        assert_eq!(classify(&m, now), vec![SegmentKind::Inactive40d]);

        let summaries = segment_customers(&[history(vec![], None)], now, DEFAULT_WINDOW_DAYS);
        let inactive = summary_of(&summaries, SegmentKind::Inactive40d);
        assert_eq!(inactive.customer_count, 1);
        assert_eq!(inactive.average_basket, Decimal::ZERO);
        assert_eq!(inactive.average_frequency, 0.0);
    }

    #[test]
    fn big_occasional_requires_at_least_one_visit() {
        let now = now();
        let h = history(vec![receipt(now - Duration::days(3), 150)], None);
        let m = CustomerMetrics::compute(&h, now, DEFAULT_WINDOW_DAYS);

        assert!(matches(SegmentKind::BigOccasional, &m, now));
        assert!(!matches(SegmentKind::SmallRecurring, &m, now));
    }

    #[test]
    fn explorers_count_distinct_categories_in_window() {
        let now = now();
        let h = history(
            vec![
                receipt_with(now - Duration::days(1), &[("Livres", 1, 10), ("Vinyles", 1, 20)]),
                receipt_with(now - Duration::days(5), &[("Jeux", 2, 15)]),
                // outside the window, ignored
                receipt_with(now - Duration::days(60), &[("Papeterie", 1, 5)]),
            ],
            None,
        );
        let m = CustomerMetrics::compute(&h, now, DEFAULT_WINDOW_DAYS);
        assert_eq!(m.distinct_categories, 3);
        assert!(matches(SegmentKind::Explorers, &m, now));
    }

    #[test]
    fn new_customers_and_point_holders() {
        let now = now();
        let newcomer = history(vec![receipt(now - Duration::days(4), 30)], Some(800));
        let veteran = history(
            vec![receipt(now - Duration::days(4), 30), receipt(now - Duration::days(200), 30)],
            Some(100),
        );

        let summaries = segment_customers(&[newcomer, veteran], now, DEFAULT_WINDOW_DAYS);
        assert_eq!(summary_of(&summaries, SegmentKind::NewCustomers).customer_count, 1);

        let points = summary_of(&summaries, SegmentKind::BigPointUsers);
        assert_eq!(points.customer_count, 1);
        assert_eq!(points.loyalty_rate, 100.0);
    }

    #[test]
    fn empty_input_yields_zeroed_cohorts() {
        let summaries = segment_customers(&[], now(), DEFAULT_WINDOW_DAYS);
        assert_eq!(summaries.len(), SegmentKind::ALL.len());
        for s in &summaries {
            assert_eq!(s.customer_count, 0);
            assert_eq!(s.average_basket, Decimal::ZERO);
            assert_eq!(s.average_frequency, 0.0);
            assert_eq!(s.loyalty_rate, 0.0);
            assert!(!s.average_frequency.is_nan());
        }
    }
}
