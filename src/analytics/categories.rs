// src/analytics/categories.rs

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    analytics::percentage,
    models::{analytics::CategoryAnalytics, receipt::ReceiptWithItems},
};

pub const CATEGORY_WINDOW_DAYS: i64 = 90;

#[derive(Default)]
struct CategoryAccumulator {
    revenue: Decimal,
    units: i64,
    tickets: HashSet<Uuid>,
    dates: BTreeSet<NaiveDate>,
    customers: HashSet<Uuid>,
}

/// Mean gap in days between consecutive distinct dates, 0 below two dates.
pub fn average_gap_days(dates: &BTreeSet<NaiveDate>) -> f64 {
    if dates.len() < 2 {
        return 0.0;
    }
    let ordered: Vec<&NaiveDate> = dates.iter().collect();
    let total_gap: i64 = ordered
        .windows(2)
        .map(|pair| (*pair[1] - *pair[0]).num_days())
        .sum();
    total_gap as f64 / (dates.len() - 1) as f64
}

/// Per-category figures over `receipts` (already restricted to the window).
///
/// `first_seen` maps each customer to their first-ever receipt. A customer is
/// new when that first receipt falls on or after `window_start`.
pub fn aggregate_categories(
    receipts: &[ReceiptWithItems],
    first_seen: &HashMap<Uuid, DateTime<Utc>>,
    window_start: DateTime<Utc>,
) -> Vec<CategoryAnalytics> {
    let mut by_category: HashMap<&str, CategoryAccumulator> = HashMap::new();

    for r in receipts {
        for item in &r.line_items {
            let acc = by_category.entry(item.category.as_str()).or_default();
            acc.revenue += item.revenue();
            acc.units += i64::from(item.quantity);
            acc.tickets.insert(r.receipt.id);
            acc.dates.insert(r.receipt.created_at.date_naive());
            if let Some(customer_id) = r.receipt.customer_id {
                acc.customers.insert(customer_id);
            }
        }
    }

    let mut rows: Vec<CategoryAnalytics> = by_category
        .into_iter()
        .map(|(category, acc)| {
            let ticket_count = acc.tickets.len();
            let customer_count = acc.customers.len();
            let new_customers = acc
                .customers
                .iter()
                .filter(|id| first_seen.get(*id).is_none_or(|first| *first >= window_start))
                .count();
            let returning_customers = customer_count - new_customers;

            CategoryAnalytics {
                category: category.to_string(),
                revenue: acc.revenue,
                units_sold: acc.units,
                ticket_count,
                avg_basket: if ticket_count > 0 {
                    (acc.revenue / Decimal::from(ticket_count)).round_dp(2)
                } else {
                    Decimal::ZERO
                },
                avg_days_between_visits: average_gap_days(&acc.dates),
                customer_count,
                new_customers,
                returning_customers,
                new_customer_rate: percentage(new_customers, customer_count),
                returning_rate: percentage(returning_customers, customer_count),
            }
        })
        .collect();

    rows.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.category.cmp(&b.category)));
    rows
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::analytics::test_support::{owned_by, receipt_with};

    fn now() -> DateTime<Utc> {
        "2024-11-30T12:00:00Z".parse().unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn gap_average_uses_distinct_sorted_dates() {
        let dates: BTreeSet<NaiveDate> =
            [date("2024-11-10"), date("2024-11-01"), date("2024-11-04"), date("2024-11-04")]
                .into_iter()
                .collect();
        // gaps 3 and 6
        assert_eq!(average_gap_days(&dates), 4.5);
    }

    #[test]
    fn gap_average_of_a_single_date_is_zero() {
        let dates: BTreeSet<NaiveDate> = [date("2024-11-01")].into_iter().collect();
        assert_eq!(average_gap_days(&dates), 0.0);
        assert_eq!(average_gap_days(&BTreeSet::new()), 0.0);
    }

    #[test]
    fn revenue_is_exact_and_rows_sorted_by_revenue() {
        let now = now();
        let mut book = receipt_with(now, &[("Livres", 2, 0)]);
        book.line_items[0].unit_price = Decimal::new(1999, 2);
        let vinyl = receipt_with(now - Duration::days(1), &[("Vinyles", 1, 100), ("Livres", 1, 2)]);

        let rows = aggregate_categories(&[book, vinyl], &HashMap::new(), now - Duration::days(90));

        assert_eq!(rows[0].category, "Vinyles");
        assert_eq!(rows[0].revenue, Decimal::from(100));
        let livres = &rows[1];
        assert_eq!(livres.revenue, Decimal::new(4198, 2));
        assert_eq!(livres.units_sold, 3);
        assert_eq!(livres.ticket_count, 2);
        assert_eq!(livres.avg_basket, Decimal::new(2099, 2));
        assert_eq!(livres.avg_days_between_visits, 1.0);
    }

    #[test]
    fn new_versus_returning_uses_first_ever_receipt() {
        let now = now();
        let window_start = now - Duration::days(90);
        let newcomer = Uuid::new_v4();
        let regular = Uuid::new_v4();

        let receipts = vec![
            owned_by(receipt_with(now - Duration::days(5), &[("Jeux", 1, 30)]), newcomer),
            owned_by(receipt_with(now - Duration::days(6), &[("Jeux", 2, 15)]), regular),
        ];
        let first_seen = HashMap::from([
            (newcomer, now - Duration::days(5)),
            (regular, now - Duration::days(400)),
        ]);

        let rows = aggregate_categories(&receipts, &first_seen, window_start);
        let jeux = &rows[0];

        assert_eq!(jeux.customer_count, 2);
        assert_eq!(jeux.new_customers, 1);
        assert_eq!(jeux.returning_customers, 1);
        assert_eq!(jeux.new_customer_rate, 50.0);
        assert_eq!(jeux.returning_rate, 50.0);
    }

    #[test]
    fn anonymous_receipts_count_as_tickets_but_not_customers() {
        let now = now();
        let rows = aggregate_categories(
            &[receipt_with(now, &[("Papeterie", 2, 3)])],
            &HashMap::new(),
            now - Duration::days(90),
        );
        assert_eq!(rows[0].ticket_count, 1);
        assert_eq!(rows[0].customer_count, 0);
        assert_eq!(rows[0].new_customer_rate, 0.0);
    }

    #[test]
    fn no_receipts_no_rows() {
        assert!(aggregate_categories(&[], &HashMap::new(), now()).is_empty());
    }
}
