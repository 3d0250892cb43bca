// src/services/store_service.rs

use chrono::{Duration, Utc};
use rand::Rng;
use sqlx::{Executor, Postgres};

use crate::{
    analytics::overview::{self, DASHBOARD_WINDOW_DAYS},
    common::error::AppError,
    db::{ReceiptRepository, StoreRepository},
    models::store::{CreateStorePayload, CreateTerminalPayload, PosTerminal, Store, StoreWithStats, TerminalWithStore},
};

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const IDENTIFIER_SUFFIX_LEN: usize = 4;

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// `TPE-<base36 millis>-<4 random base36>`, upper-cased.
pub fn terminal_identifier<R: Rng + ?Sized>(millis: u64, rng: &mut R) -> String {
    let suffix: String = (0..IDENTIFIER_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("TPE-{}-{}", to_base36(millis), suffix).to_uppercase()
}

#[derive(Clone)]
pub struct StoreService {
    store_repo: StoreRepository,
    receipt_repo: ReceiptRepository,
}

impl StoreService {
    pub fn new(store_repo: StoreRepository, receipt_repo: ReceiptRepository) -> Self {
        Self { store_repo, receipt_repo }
    }

    /// Every store with its figures over the last 30 days.
    pub async fn list_stores_with_stats(&self) -> Result<Vec<StoreWithStats>, AppError> {
        let since = Utc::now() - Duration::days(DASHBOARD_WINDOW_DAYS);

        let stores = self.store_repo.list_stores().await?;
        let receipts = self.receipt_repo.receipts_since(Some(since)).await?;
        let terminal_counts = self.store_repo.terminal_counts().await?;

        Ok(stores
            .into_iter()
            .map(|store| {
                let terminals = terminal_counts.get(&store.id).copied().unwrap_or(0);
                overview::store_with_stats(store, &receipts, terminals)
            })
            .collect())
    }

    pub async fn create_store<'e, E>(&self, executor: E, payload: &CreateStorePayload) -> Result<Store, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let address = payload.address.as_deref().map(str::trim).filter(|a| !a.is_empty());
        let store = self
            .store_repo
            .create_store(executor, payload.name.trim(), payload.city.trim(), address)
            .await?;

        tracing::info!(store_id = %store.id, "store created");
        Ok(store)
    }

    pub async fn count_stores(&self) -> Result<i64, AppError> {
        self.store_repo.count_stores().await
    }

    pub async fn list_terminals(&self) -> Result<Vec<TerminalWithStore>, AppError> {
        self.store_repo.list_terminals().await
    }

    pub async fn create_terminal<'e, E>(
        &self,
        executor: E,
        payload: &CreateTerminalPayload,
    ) -> Result<PosTerminal, AppError>
    where
        E: Executor<'e, Database = Postgres> + sqlx::Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        self.store_repo
            .find_store(&mut *tx, payload.store_id)
            .await?
            .ok_or(AppError::NotFound("store"))?;

        let millis = Utc::now().timestamp_millis().max(0) as u64;
        let identifier = terminal_identifier(millis, &mut rand::thread_rng());

        let terminal = self
            .store_repo
            .create_terminal(&mut *tx, payload.store_id, payload.name.trim(), &identifier)
            .await?;

        tx.commit().await?;

        tracing::info!(terminal_id = %terminal.id, identifier = %terminal.identifier, "terminal created");
        Ok(terminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn base36_matches_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_700_000_000_000), "loyw3v28");
    }

    #[test]
    fn identifier_has_the_expected_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let id = terminal_identifier(1_700_000_000_000, &mut rng);

        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "TPE");
        assert_eq!(parts[1], "LOYW3V28");
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }
}
