// src/analytics/customers.rs

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    analytics::segments::{self, CustomerHistory, CustomerMetrics},
    models::{
        customer::{CustomerFilter, CustomerListEntry, CustomerListRow, CustomerStats},
        receipt::ReceiptWithItems,
    },
};

pub const ACTIVE_WINDOW_DAYS: i64 = 30;
const PROFILE_TOP_CATEGORIES: usize = 5;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// (last - first visit, in whole days rounded up) / (visits - 1).
/// 0 with fewer than two visits or when every visit falls on the same instant.
pub fn average_days_between_visits(receipts: &[ReceiptWithItems]) -> f64 {
    let visits = receipts.len();
    let first = receipts.iter().map(|r| r.receipt.created_at).min();
    let last = receipts.iter().map(|r| r.receipt.created_at).max();

    let (Some(first), Some(last)) = (first, last) else {
        return 0.0;
    };
    let span_days = ((last - first).num_seconds() as f64 / SECONDS_PER_DAY).ceil();

    if visits > 1 && span_days > 0.0 {
        span_days / (visits - 1) as f64
    } else {
        0.0
    }
}

/// Categories ranked by number of lines, ties broken alphabetically.
pub fn top_categories(receipts: &[ReceiptWithItems], limit: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for item in receipts.iter().flat_map(|r| r.line_items.iter()) {
        *counts.entry(item.category.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(category, _)| category.to_string())
        .collect()
}

/// Most visited store.
pub fn main_store(receipts: &[ReceiptWithItems]) -> Option<Uuid> {
    let mut visits: HashMap<Uuid, usize> = HashMap::new();
    for r in receipts {
        *visits.entry(r.receipt.store_id).or_default() += 1;
    }
    visits
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(store_id, _)| store_id)
}

pub fn is_active(last_visit: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    last_visit.is_some_and(|last| last >= now - Duration::days(ACTIVE_WINDOW_DAYS))
}

pub fn customer_stats(
    customer_id: Uuid,
    receipts: Vec<ReceiptWithItems>,
    store_names: &HashMap<Uuid, String>,
    loyalty_points: Option<i64>,
    now: DateTime<Utc>,
) -> CustomerStats {
    let total_spend: Decimal = receipts.iter().map(|r| r.receipt.total_amount).sum();
    let main_store = main_store(&receipts).and_then(|id| store_names.get(&id).cloned());
    let top = top_categories(&receipts, PROFILE_TOP_CATEGORIES);
    let avg_days = average_days_between_visits(&receipts);
    let visits = receipts.len();

    let history = CustomerHistory {
        customer_id,
        receipts,
        loyalty_points,
    };
    let metrics = CustomerMetrics::compute(&history, now, segments::DEFAULT_WINDOW_DAYS);

    CustomerStats {
        total_spend,
        visits,
        top_categories: top,
        main_store,
        avg_days_between_visits: avg_days,
        segments: segments::classify(&metrics, now),
    }
}

fn filter_accepts(filter: &CustomerFilter, entry: &CustomerListEntry) -> bool {
    if let Some(query) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let needle = query.to_lowercase();
        let hit = [&entry.first_name, &entry.last_name, &entry.email]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }

    match filter.tier.as_deref() {
        None | Some("all") | Some("") => {}
        Some("none") => {
            if entry.tier.is_some() {
                return false;
            }
        }
        Some(name) => {
            if !entry.tier.as_deref().is_some_and(|t| t.eq_ignore_ascii_case(name)) {
                return false;
            }
        }
    }

    match filter.activity.as_deref() {
        Some("active") => entry.is_active,
        Some("inactive") => !entry.is_active,
        _ => true,
    }
}

pub fn list_entries(
    rows: Vec<CustomerListRow>,
    filter: &CustomerFilter,
    now: DateTime<Utc>,
) -> Vec<CustomerListEntry> {
    rows.into_iter()
        .map(|row| CustomerListEntry {
            is_active: is_active(row.last_visit, now),
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            tier: row.tier,
            receipt_count: row.receipt_count,
            last_visit: row.last_visit,
            total_spend: row.total_spend,
        })
        .filter(|entry| filter_accepts(filter, entry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::{at_store, receipt, receipt_with};
    use crate::models::analytics::SegmentKind;

    fn now() -> DateTime<Utc> {
        "2024-11-30T12:00:00Z".parse().unwrap()
    }

    fn row(first: &str, tier: Option<&str>, last_visit: Option<DateTime<Utc>>) -> CustomerListRow {
        CustomerListRow {
            id: Uuid::new_v4(),
            first_name: first.to_string(),
            last_name: "Durand".to_string(),
            email: format!("{}@exemple.fr", first.to_lowercase()),
            tier: tier.map(str::to_string),
            receipt_count: 1,
            last_visit,
            total_spend: Decimal::from(10),
        }
    }

    #[test]
    fn average_days_spreads_the_span_over_visits() {
        let now = now();
        let receipts = vec![
            receipt(now - Duration::days(20), 10),
            receipt(now - Duration::days(10), 10),
            receipt(now, 10),
        ];
        assert_eq!(average_days_between_visits(&receipts), 10.0);
    }

    #[test]
    fn average_days_is_zero_for_single_or_same_instant_visits() {
        let now = now();
        assert_eq!(average_days_between_visits(&[receipt(now, 10)]), 0.0);
        assert_eq!(average_days_between_visits(&[receipt(now, 10), receipt(now, 12)]), 0.0);
        assert_eq!(average_days_between_visits(&[]), 0.0);
    }

    #[test]
    fn partial_days_round_up() {
        let now = now();
        let receipts = vec![receipt(now - Duration::hours(30), 10), receipt(now, 10)];
        assert_eq!(average_days_between_visits(&receipts), 2.0);
    }

    #[test]
    fn top_categories_rank_by_line_count() {
        let now = now();
        let receipts = vec![
            receipt_with(now, &[("Vinyles", 1, 20), ("Livres", 1, 10)]),
            receipt_with(now, &[("Livres", 3, 10)]),
            receipt_with(now, &[("Jeux", 1, 10)]),
        ];
        assert_eq!(top_categories(&receipts, 2), vec!["Livres", "Jeux"]);
    }

    #[test]
    fn profile_stats_name_the_main_store_and_segments() {
        let now = now();
        let bastille = Uuid::new_v4();
        let lyon = Uuid::new_v4();
        let names = HashMap::from([(bastille, "Bastille".to_string()), (lyon, "Lyon".to_string())]);
        let receipts = vec![
            at_store(receipt(now - Duration::days(1), 30), bastille),
            at_store(receipt(now - Duration::days(2), 30), bastille),
            at_store(receipt(now - Duration::days(3), 30), lyon),
        ];

        let stats = customer_stats(Uuid::new_v4(), receipts, &names, None, now);

        assert_eq!(stats.visits, 3);
        assert_eq!(stats.total_spend, Decimal::from(90));
        assert_eq!(stats.main_store.as_deref(), Some("Bastille"));
        assert!(stats.segments.contains(&SegmentKind::SmallRecurring));
    }

    #[test]
    fn list_filters_combine() {
        let now = now();
        let rows = vec![
            row("Camille", Some("Or"), Some(now - Duration::days(2))),
            row("Hugo", None, Some(now - Duration::days(60))),
            row("Lea", Some("Bronze"), None),
        ];

        let gold = CustomerFilter {
            tier: Some("or".into()),
            ..Default::default()
        };
        assert_eq!(list_entries(rows.clone(), &gold, now).len(), 1);

        let untiered_inactive = CustomerFilter {
            tier: Some("none".into()),
            activity: Some("inactive".into()),
            ..Default::default()
        };
        let found = list_entries(rows.clone(), &untiered_inactive, now);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].first_name, "Hugo");

        let search = CustomerFilter {
            query: Some("LEA@".into()),
            ..Default::default()
        };
        assert_eq!(list_entries(rows, &search, now)[0].first_name, "Lea");
    }
}
