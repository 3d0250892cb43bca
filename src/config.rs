// src/config.rs

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, bail};
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    common::{i18n::I18nStore, retry::RetryPolicy},
    db::{CustomerRepository, LoyaltyRepository, ReceiptRepository, StoreRepository, UserRepository},
    services::{
        analytics_service::AnalyticsService, auth::AuthService, customer_service::CustomerService,
        demo_service::DemoService, document_service::DocumentService, loyalty_service::LoyaltyService,
        receipt_service::ReceiptService, store_service::StoreService,
    },
};

// =============================================================================
//  CONFIGURATION
// =============================================================================

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub retry: RetryPolicy,
    pub fonts_dir: PathBuf,
    pub public_base_url: String,
}

fn var_or<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", name, raw)),
        _ => Ok(default),
    }
}

/// Accepts postgres:// and postgresql:// URLs and forces TLS unless the URL
/// already says otherwise.
pub fn normalize_database_url(raw: &str) -> anyhow::Result<String> {
    let url = raw.trim();
    if url.is_empty() {
        bail!("DATABASE_URL is empty");
    }
    if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
        bail!("DATABASE_URL must use the postgres:// or postgresql:// scheme");
    }
    if url.contains("sslmode=") {
        return Ok(url.to_string());
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    Ok(format!("{}{}sslmode=require", url, separator))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = normalize_database_url(
            &env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
        )?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:3000".to_string())?,
            db_max_connections: var_or("DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(var_or("DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            retry: RetryPolicy::new(
                var_or("DB_RETRY_ATTEMPTS", 3)?,
                Duration::from_millis(var_or("DB_RETRY_DELAY_MS", 100)?),
            ),
            fonts_dir: PathBuf::from(var_or("FONTS_DIR", "./fonts".to_string())?),
            public_base_url: var_or("PUBLIC_BASE_URL", "http://localhost:3000".to_string())?
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

// =============================================================================
//  APPLICATION STATE
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub i18n_store: Arc<I18nStore>,

    pub auth_service: AuthService,
    pub store_service: StoreService,
    pub receipt_service: ReceiptService,
    pub document_service: DocumentService,
    pub customer_service: CustomerService,
    pub loyalty_service: LoyaltyService,
    pub analytics_service: AnalyticsService,
    pub demo_service: DemoService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect(&config.database_url)
            .await
            .context("failed to connect to the database")?;

        tracing::info!("database pool ready ({} max connections)", config.db_max_connections);

        Ok(Self::from_parts(config, db_pool))
    }

    /// Wires repositories and services around an existing pool.
    pub fn from_parts(config: &Config, db_pool: PgPool) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let store_repo = StoreRepository::new(db_pool.clone());
        let customer_repo = CustomerRepository::new(db_pool.clone());
        let receipt_repo = ReceiptRepository::new(db_pool.clone());
        let loyalty_repo = LoyaltyRepository::new(db_pool.clone());

        Self {
            auth_service: AuthService::new(user_repo, config.jwt_secret.clone()),
            store_service: StoreService::new(store_repo.clone(), receipt_repo.clone()),
            receipt_service: ReceiptService::new(
                receipt_repo.clone(),
                store_repo.clone(),
                customer_repo.clone(),
                loyalty_repo.clone(),
            ),
            document_service: DocumentService::new(config.fonts_dir.clone(), config.public_base_url.clone()),
            customer_service: CustomerService::new(
                customer_repo.clone(),
                receipt_repo.clone(),
                store_repo.clone(),
                loyalty_repo.clone(),
            ),
            loyalty_service: LoyaltyService::new(
                loyalty_repo.clone(),
                receipt_repo.clone(),
                customer_repo.clone(),
                config.retry,
            ),
            analytics_service: AnalyticsService::new(
                receipt_repo.clone(),
                customer_repo.clone(),
                store_repo.clone(),
                loyalty_repo.clone(),
            ),
            demo_service: DemoService::new(store_repo, customer_repo, receipt_repo, loyalty_repo),
            i18n_store: Arc::new(I18nStore::new()),
            db_pool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_sslmode_when_missing() {
        assert_eq!(
            normalize_database_url("postgres://u:p@db:5432/app").unwrap(),
            "postgres://u:p@db:5432/app?sslmode=require"
        );
        assert_eq!(
            normalize_database_url("postgresql://db/app?application_name=bo").unwrap(),
            "postgresql://db/app?application_name=bo&sslmode=require"
        );
    }

    #[test]
    fn keeps_explicit_sslmode() {
        assert_eq!(
            normalize_database_url(" postgres://db/app?sslmode=disable ").unwrap(),
            "postgres://db/app?sslmode=disable"
        );
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(normalize_database_url("mysql://db/app").is_err());
        assert!(normalize_database_url("").is_err());
    }
}
