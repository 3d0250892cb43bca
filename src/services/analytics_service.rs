// src/services/analytics_service.rs

use std::collections::{HashMap, HashSet};

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    analytics::{
        categories::{self, CATEGORY_WINDOW_DAYS},
        overview::{self, DASHBOARD_WINDOW_DAYS, ENVIRONMENT_WINDOW_DAYS},
        segments::{self, CustomerHistory},
    },
    common::error::AppError,
    db::{CustomerRepository, LoyaltyRepository, ReceiptRepository, StoreRepository},
    models::{
        analytics::{
            CategoryAnalytics, DailyReceipts, DashboardOverview, EnvironmentalImpact, LoyaltyComparison,
            SegmentSummary,
        },
        receipt::ReceiptWithItems,
    },
};

// Longest window accepted from a query string
const MAX_WINDOW_DAYS: i64 = 365;

fn clamp_window(days: Option<i64>, default: i64) -> i64 {
    days.unwrap_or(default).clamp(1, MAX_WINDOW_DAYS)
}

#[derive(Clone)]
pub struct AnalyticsService {
    receipt_repo: ReceiptRepository,
    customer_repo: CustomerRepository,
    store_repo: StoreRepository,
    loyalty_repo: LoyaltyRepository,
}

impl AnalyticsService {
    pub fn new(
        receipt_repo: ReceiptRepository,
        customer_repo: CustomerRepository,
        store_repo: StoreRepository,
        loyalty_repo: LoyaltyRepository,
    ) -> Self {
        Self {
            receipt_repo,
            customer_repo,
            store_repo,
            loyalty_repo,
        }
    }

    // =========================================================================
    //  DASHBOARD
    // =========================================================================

    pub async fn dashboard_overview(&self) -> Result<DashboardOverview, AppError> {
        let since = Utc::now() - Duration::days(DASHBOARD_WINDOW_DAYS);
        let receipts = self.receipt_repo.receipts_since(Some(since)).await?;
        let stores = self.store_repo.list_stores().await?;

        Ok(overview::dashboard_overview(&receipts, &stores))
    }

    pub async fn receipts_by_day(&self, days: Option<i64>) -> Result<Vec<DailyReceipts>, AppError> {
        let days = clamp_window(days, DASHBOARD_WINDOW_DAYS);
        let now = Utc::now();
        // whole calendar days, the first one included from midnight
        let first_day = (now - Duration::days(days - 1)).date_naive();
        let since = first_day.and_hms_opt(0, 0, 0).map(|d| d.and_utc());

        let receipts = self.receipt_repo.receipts_since(since).await?;
        Ok(overview::receipts_by_day(&receipts, now, days))
    }

    pub async fn loyalty_comparison(&self) -> Result<LoyaltyComparison, AppError> {
        let since = Utc::now() - Duration::days(DASHBOARD_WINDOW_DAYS);
        let receipts = self.receipt_repo.receipts_since(Some(since)).await?;
        let members: HashSet<Uuid> = self
            .loyalty_repo
            .list_accounts()
            .await?
            .into_iter()
            .map(|a| a.customer_id)
            .collect();

        Ok(overview::loyalty_comparison(&receipts, &members))
    }

    pub async fn environmental_impact(&self) -> Result<EnvironmentalImpact, AppError> {
        let since = Utc::now() - Duration::days(ENVIRONMENT_WINDOW_DAYS);
        let claimed = self.receipt_repo.claimed_counts_by_store(since).await?;

        Ok(overview::environmental_impact(&claimed))
    }

    // =========================================================================
    //  CATEGORIES & SEGMENTS
    // =========================================================================

    pub async fn category_analytics(&self) -> Result<Vec<CategoryAnalytics>, AppError> {
        let window_start = Utc::now() - Duration::days(CATEGORY_WINDOW_DAYS);
        let receipts = self.receipt_repo.receipts_with_items(Some(window_start), None).await?;
        let first_seen = self.customer_repo.first_seen_index().await?;

        Ok(categories::aggregate_categories(&receipts, &first_seen, window_start))
    }

    /// Cohorts over every customer; inactivity needs the full history.
    pub async fn segments(&self, window_days: Option<i64>) -> Result<Vec<SegmentSummary>, AppError> {
        let window_days = clamp_window(window_days, segments::DEFAULT_WINDOW_DAYS);

        let customers = self.customer_repo.list_customers().await?;
        let receipts = self.receipt_repo.receipts_with_items(None, None).await?;
        let points: HashMap<Uuid, i64> = self
            .loyalty_repo
            .list_accounts()
            .await?
            .into_iter()
            .map(|a| (a.customer_id, a.points))
            .collect();

        let mut by_customer: HashMap<Uuid, Vec<ReceiptWithItems>> = HashMap::new();
        for r in receipts {
            if let Some(customer_id) = r.receipt.customer_id {
                by_customer.entry(customer_id).or_default().push(r);
            }
        }

        let histories: Vec<CustomerHistory> = customers
            .into_iter()
            .map(|c| CustomerHistory {
                customer_id: c.id,
                receipts: by_customer.remove(&c.id).unwrap_or_default(),
                loyalty_points: points.get(&c.id).copied(),
            })
            .collect();

        Ok(segments::segment_customers(&histories, Utc::now(), window_days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_are_clamped() {
        assert_eq!(clamp_window(None, 30), 30);
        assert_eq!(clamp_window(Some(0), 30), 1);
        assert_eq!(clamp_window(Some(-4), 30), 1);
        assert_eq!(clamp_window(Some(7), 30), 7);
        assert_eq!(clamp_window(Some(10_000), 30), MAX_WINDOW_DAYS);
    }
}
