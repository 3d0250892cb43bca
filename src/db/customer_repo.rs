// src/db/customer_repo.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::customer::{Customer, CustomerListRow},
};

// No-op update so RETURNING yields the existing row on conflict.
const UPSERT_BY_EMAIL: &str = r#"
    INSERT INTO customers (first_name, last_name, email)
    VALUES ($1, $2, $3)
    ON CONFLICT ((lower(email))) DO UPDATE SET email = customers.email
    RETURNING id, first_name, last_name, email, created_at
"#;

#[derive(Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

impl CustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, first_name, last_name, email, created_at FROM customers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Finds the customer by e-mail (case-insensitive) or creates it, in one statement.
    /// An existing customer keeps its names.
    pub async fn upsert_by_email<'e, E>(
        &self,
        executor: E,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>(UPSERT_BY_EMAIL)
            .bind(first_name)
            .bind(last_name)
            .bind(email)
            .fetch_one(executor)
            .await?;

        Ok(customer)
    }

    pub async fn create_customer<'e, E>(
        &self,
        executor: E,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (first_name, last_name, email)
            VALUES ($1, $2, $3)
            RETURNING id, first_name, last_name, email, created_at
            "#,
        )
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .fetch_one(executor)
        .await?;

        Ok(customer)
    }

    pub async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, first_name, last_name, email, created_at
            FROM customers
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// One row per customer with lifetime spend, visits and current tier.
    pub async fn list_rows(&self) -> Result<Vec<CustomerListRow>, AppError> {
        let rows = sqlx::query_as::<_, CustomerListRow>(
            r#"
            SELECT
                c.id, c.first_name, c.last_name, c.email,
                t.name AS tier,
                COUNT(r.id) AS receipt_count,
                MAX(r.created_at) AS last_visit,
                COALESCE(SUM(r.total_amount), 0) AS total_spend
            FROM customers c
            LEFT JOIN loyalty_accounts a ON a.customer_id = c.id
            LEFT JOIN loyalty_tiers t ON t.id = a.tier_id
            LEFT JOIN receipts r ON r.customer_id = c.id
            GROUP BY c.id, t.name
            ORDER BY c.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// First-ever receipt per identified customer, over the full history.
    pub async fn first_seen_index(&self) -> Result<HashMap<Uuid, DateTime<Utc>>, AppError> {
        let rows: Vec<(Uuid, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT customer_id, MIN(created_at)
            FROM receipts
            WHERE customer_id IS NOT NULL
            GROUP BY customer_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_upsert_resolves_conflicts_without_overwriting_names() {
        assert!(UPSERT_BY_EMAIL.contains("ON CONFLICT ((lower(email))) DO UPDATE"));
        assert!(!UPSERT_BY_EMAIL.contains("first_name = EXCLUDED"));
        assert!(!UPSERT_BY_EMAIL.contains("last_name = EXCLUDED"));
        assert!(UPSERT_BY_EMAIL.contains("RETURNING id"));
    }
}
