// src/services/customer_service.rs

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    analytics::customers,
    common::error::AppError,
    db::{CustomerRepository, LoyaltyRepository, ReceiptRepository, StoreRepository},
    models::customer::{CustomerFilter, CustomerListEntry, CustomerProfile},
};

#[derive(Clone)]
pub struct CustomerService {
    customer_repo: CustomerRepository,
    receipt_repo: ReceiptRepository,
    store_repo: StoreRepository,
    loyalty_repo: LoyaltyRepository,
}

impl CustomerService {
    pub fn new(
        customer_repo: CustomerRepository,
        receipt_repo: ReceiptRepository,
        store_repo: StoreRepository,
        loyalty_repo: LoyaltyRepository,
    ) -> Self {
        Self {
            customer_repo,
            receipt_repo,
            store_repo,
            loyalty_repo,
        }
    }

    pub async fn list_customers(&self, filter: &CustomerFilter) -> Result<Vec<CustomerListEntry>, AppError> {
        let rows = self.customer_repo.list_rows().await?;
        Ok(customers::list_entries(rows, filter, Utc::now()))
    }

    pub async fn get_customer_profile(&self, customer_id: Uuid) -> Result<CustomerProfile, AppError> {
        let customer = self
            .customer_repo
            .find_by_id(customer_id)
            .await?
            .ok_or(AppError::NotFound("customer"))?;

        let receipts = self.receipt_repo.receipts_with_items(None, Some(customer_id)).await?;
        let store_names: HashMap<Uuid, String> = self
            .store_repo
            .list_stores()
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();
        let (tier, points) = match self.loyalty_repo.account_summary(customer_id).await? {
            Some((tier, points)) => (tier, Some(points)),
            None => (None, None),
        };

        let stats = customers::customer_stats(customer_id, receipts, &store_names, points, Utc::now());

        Ok(CustomerProfile {
            customer,
            tier,
            points,
            stats,
        })
    }
}
