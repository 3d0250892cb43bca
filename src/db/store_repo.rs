// src/db/store_repo.rs

use std::collections::HashMap;

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::store::{PosTerminal, Store, TerminalWithStore},
};

#[derive(Clone)]
pub struct StoreRepository {
    pool: PgPool,
}

impl StoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  STORES
    // =========================================================================

    pub async fn list_stores(&self) -> Result<Vec<Store>, AppError> {
        let stores = sqlx::query_as::<_, Store>(
            r#"
            SELECT id, name, city, address, created_at
            FROM stores
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(stores)
    }

    pub async fn find_store<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Store>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let store = sqlx::query_as::<_, Store>(
            "SELECT id, name, city, address, created_at FROM stores WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(store)
    }

    pub async fn find_store_by_name<'e, E>(
        &self,
        executor: E,
        name: &str,
    ) -> Result<Option<Store>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let store = sqlx::query_as::<_, Store>(
            r#"
            SELECT id, name, city, address, created_at
            FROM stores
            WHERE name = $1
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(executor)
        .await?;

        Ok(store)
    }

    pub async fn create_store<'e, E>(
        &self,
        executor: E,
        name: &str,
        city: &str,
        address: Option<&str>,
    ) -> Result<Store, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let store = sqlx::query_as::<_, Store>(
            r#"
            INSERT INTO stores (name, city, address)
            VALUES ($1, $2, $3)
            RETURNING id, name, city, address, created_at
            "#,
        )
        .bind(name)
        .bind(city)
        .bind(address)
        .fetch_one(executor)
        .await?;

        Ok(store)
    }

    /// Cheapest query that proves the schema is reachable.
    pub async fn count_stores(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stores")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    //  TERMINALS (TPE)
    // =========================================================================

    pub async fn terminal_counts(&self) -> Result<HashMap<Uuid, i64>, AppError> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            "SELECT store_id, COUNT(*) FROM pos_terminals GROUP BY store_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    pub async fn list_terminals(&self) -> Result<Vec<TerminalWithStore>, AppError> {
        let terminals = sqlx::query_as::<_, TerminalWithStore>(
            r#"
            SELECT
                t.id, t.store_id, t.name, t.identifier, t.status,
                t.last_seen_at, t.created_at,
                s.name AS store_name
            FROM pos_terminals t
            JOIN stores s ON s.id = t.store_id
            ORDER BY t.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(terminals)
    }

    pub async fn find_terminal<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<PosTerminal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let terminal = sqlx::query_as::<_, PosTerminal>(
            r#"
            SELECT id, store_id, name, identifier, status, last_seen_at, created_at
            FROM pos_terminals
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(terminal)
    }

    pub async fn create_terminal<'e, E>(
        &self,
        executor: E,
        store_id: Uuid,
        name: &str,
        identifier: &str,
    ) -> Result<PosTerminal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let terminal = sqlx::query_as::<_, PosTerminal>(
            r#"
            INSERT INTO pos_terminals (store_id, name, identifier, status, last_seen_at)
            VALUES ($1, $2, $3, 'ACTIVE', NOW())
            RETURNING id, store_id, name, identifier, status, last_seen_at, created_at
            "#,
        )
        .bind(store_id)
        .bind(name)
        .bind(identifier)
        .fetch_one(executor)
        .await?;

        Ok(terminal)
    }

    pub async fn touch_terminal<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE pos_terminals SET last_seen_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
