// src/db/receipt_repo.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::receipt::{
        LineItem, NewLineItem, Receipt, ReceiptDetailRow, ReceiptExportRow, ReceiptFilter,
        ReceiptListEntry, ReceiptStatus, ReceiptWithItems,
    },
};

const RECEIPT_COLUMNS: &str = "r.id, r.store_id, r.terminal_id, r.customer_id, r.status, \
                               r.total_amount, r.currency, r.created_at, r.updated_at";

// Cap of the tickets table
const LIST_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct ReceiptRepository {
    pool: PgPool,
}

impl ReceiptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  WRITES
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_receipt<'e, E>(
        &self,
        executor: E,
        store_id: Uuid,
        terminal_id: Uuid,
        customer_id: Option<Uuid>,
        total_amount: Decimal,
        currency: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Receipt, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let receipt = sqlx::query_as::<_, Receipt>(
            r#"
            INSERT INTO receipts (store_id, terminal_id, customer_id, status, total_amount, currency, created_at, updated_at)
            VALUES ($1, $2, $3, 'ISSUED', $4, $5, $6, $6)
            RETURNING id, store_id, terminal_id, customer_id, status, total_amount, currency, created_at, updated_at
            "#,
        )
        .bind(store_id)
        .bind(terminal_id)
        .bind(customer_id)
        .bind(total_amount)
        .bind(currency)
        .bind(created_at)
        .fetch_one(executor)
        .await?;

        Ok(receipt)
    }

    /// Inserts every line of a receipt in a single statement.
    pub async fn insert_line_items<'e, E>(
        &self,
        executor: E,
        receipt_id: Uuid,
        items: &[NewLineItem],
    ) -> Result<Vec<LineItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let categories: Vec<&str> = items.iter().map(|i| i.category.as_str()).collect();
        let names: Vec<&str> = items.iter().map(|i| i.product_name.as_str()).collect();
        let quantities: Vec<i32> = items.iter().map(|i| i.quantity).collect();
        let prices: Vec<Decimal> = items.iter().map(|i| i.unit_price).collect();

        let lines = sqlx::query_as::<_, LineItem>(
            r#"
            INSERT INTO receipt_line_items (receipt_id, category, product_name, quantity, unit_price)
            SELECT $1, u.category, u.product_name, u.quantity, u.unit_price
            FROM UNNEST($2::text[], $3::text[], $4::int4[], $5::numeric[])
                AS u(category, product_name, quantity, unit_price)
            RETURNING id, receipt_id, category, product_name, quantity, unit_price
            "#,
        )
        .bind(receipt_id)
        .bind(&categories)
        .bind(&names)
        .bind(&quantities)
        .bind(&prices)
        .fetch_all(executor)
        .await?;

        Ok(lines)
    }

    /// Row-locks the receipt for the rest of the transaction.
    pub async fn lock_receipt<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Receipt>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let receipt = sqlx::query_as::<_, Receipt>(
            r#"
            SELECT id, store_id, terminal_id, customer_id, status, total_amount, currency, created_at, updated_at
            FROM receipts
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(receipt)
    }

    pub async fn mark_claimed<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        customer_id: Uuid,
    ) -> Result<Receipt, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let receipt = sqlx::query_as::<_, Receipt>(
            r#"
            UPDATE receipts
            SET status = $2, customer_id = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, store_id, terminal_id, customer_id, status, total_amount, currency, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(ReceiptStatus::Claimed)
        .bind(customer_id)
        .fetch_one(executor)
        .await?;

        Ok(receipt)
    }

    // =========================================================================
    //  READS
    // =========================================================================

    pub async fn list_entries(&self, filter: &ReceiptFilter) -> Result<Vec<ReceiptListEntry>, AppError> {
        let query = filter
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty());

        let entries = sqlx::query_as::<_, ReceiptListEntry>(
            r#"
            SELECT
                r.id, r.status, r.total_amount, r.currency, r.created_at,
                r.store_id, s.name AS store_name,
                t.name AS terminal_name,
                r.customer_id, c.email AS customer_email
            FROM receipts r
            JOIN stores s ON s.id = r.store_id
            JOIN pos_terminals t ON t.id = r.terminal_id
            LEFT JOIN customers c ON c.id = r.customer_id
            WHERE ($1::receipt_status IS NULL OR r.status = $1)
              AND ($2::uuid IS NULL OR r.store_id = $2)
              AND (
                    $3::text IS NULL
                    OR r.id::text ILIKE $3 || '%'
                    OR c.email ILIKE '%' || $3 || '%'
              )
            ORDER BY r.created_at DESC
            LIMIT $4
            "#,
        )
        .bind(filter.status)
        .bind(filter.store_id)
        .bind(query)
        .bind(LIST_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn find_detail(&self, id: Uuid) -> Result<Option<ReceiptDetailRow>, AppError> {
        let row = sqlx::query_as::<_, ReceiptDetailRow>(&format!(
            r#"
            SELECT
                {RECEIPT_COLUMNS},
                s.name AS store_name,
                t.name AS terminal_name,
                t.identifier AS terminal_identifier,
                c.first_name AS customer_first_name,
                c.last_name AS customer_last_name,
                c.email AS customer_email
            FROM receipts r
            JOIN stores s ON s.id = r.store_id
            JOIN pos_terminals t ON t.id = r.terminal_id
            LEFT JOIN customers c ON c.id = r.customer_id
            WHERE r.id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn line_items_for(&self, receipt_ids: &[Uuid]) -> Result<Vec<LineItem>, AppError> {
        self.line_items_in(&self.pool, receipt_ids).await
    }

    pub async fn line_items_in<'e, E>(&self, executor: E, receipt_ids: &[Uuid]) -> Result<Vec<LineItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, LineItem>(
            r#"
            SELECT id, receipt_id, category, product_name, quantity, unit_price
            FROM receipt_line_items
            WHERE receipt_id = ANY($1)
            ORDER BY receipt_id, id
            "#,
        )
        .bind(receipt_ids)
        .fetch_all(executor)
        .await?;

        Ok(items)
    }

    /// Receipts created at or after `since` (all history when `None`).
    pub async fn receipts_since(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Receipt>, AppError> {
        let receipts = sqlx::query_as::<_, Receipt>(&format!(
            r#"
            SELECT {RECEIPT_COLUMNS}
            FROM receipts r
            WHERE ($1::timestamptz IS NULL OR r.created_at >= $1)
            ORDER BY r.created_at ASC
            "#
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(receipts)
    }

    /// Receipts with their lines, optionally narrowed to one customer.
    pub async fn receipts_with_items(
        &self,
        since: Option<DateTime<Utc>>,
        customer_id: Option<Uuid>,
    ) -> Result<Vec<ReceiptWithItems>, AppError> {
        let receipts = sqlx::query_as::<_, Receipt>(&format!(
            r#"
            SELECT {RECEIPT_COLUMNS}
            FROM receipts r
            WHERE ($1::timestamptz IS NULL OR r.created_at >= $1)
              AND ($2::uuid IS NULL OR r.customer_id = $2)
            ORDER BY r.created_at ASC
            "#
        ))
        .bind(since)
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        self.attach_items(receipts).await
    }

    /// Receipts of customers holding a loyalty account.
    pub async fn member_receipts_with_items(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<ReceiptWithItems>, AppError> {
        let receipts = sqlx::query_as::<_, Receipt>(&format!(
            r#"
            SELECT {RECEIPT_COLUMNS}
            FROM receipts r
            JOIN loyalty_accounts a ON a.customer_id = r.customer_id
            WHERE r.created_at >= $1
            ORDER BY r.created_at ASC
            "#
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        self.attach_items(receipts).await
    }

    async fn attach_items(&self, receipts: Vec<Receipt>) -> Result<Vec<ReceiptWithItems>, AppError> {
        if receipts.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = receipts.iter().map(|r| r.id).collect();
        let mut by_receipt: HashMap<Uuid, Vec<LineItem>> = HashMap::new();
        for item in self.line_items_for(&ids).await? {
            by_receipt.entry(item.receipt_id).or_default().push(item);
        }

        Ok(receipts
            .into_iter()
            .map(|receipt| ReceiptWithItems {
                line_items: by_receipt.remove(&receipt.id).unwrap_or_default(),
                receipt,
            })
            .collect())
    }

    /// (store name, claimed receipts) since the given instant, stores without claims omitted.
    pub async fn claimed_counts_by_store(&self, since: DateTime<Utc>) -> Result<Vec<(String, i64)>, AppError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT s.name, COUNT(r.id)
            FROM receipts r
            JOIN stores s ON s.id = r.store_id
            WHERE r.status = 'CLAIMED' AND r.created_at >= $1
            GROUP BY s.id, s.name
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn export_rows(&self) -> Result<Vec<ReceiptExportRow>, AppError> {
        let rows = sqlx::query_as::<_, ReceiptExportRow>(
            r#"
            SELECT r.created_at, s.name AS store_name, r.total_amount, r.currency, r.status,
                   c.email AS customer_email
            FROM receipts r
            JOIN stores s ON s.id = r.store_id
            LEFT JOIN customers c ON c.id = r.customer_id
            ORDER BY r.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
