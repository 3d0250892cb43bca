// src/services/receipt_service.rs

use chrono::{SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;
use validator::Validate;

use crate::{
    analytics::loyalty::{accrued_points, tier_for_spend},
    common::{error::AppError, format::short_receipt_id},
    db::{CustomerRepository, LoyaltyRepository, ReceiptRepository, StoreRepository},
    models::receipt::{
        ClaimOutcome, ClaimReceiptPayload, IssueReceiptPayload, NewLineItem, ReceiptDetail,
        ReceiptExportRow, ReceiptFilter, ReceiptListEntry, ReceiptStatus, ReceiptWithItems,
    },
};

const DEFAULT_CURRENCY: &str = "EUR";
const ANONYMOUS_CUSTOMER: &str = "Anonymous";

/// Line checks `validator` cannot express on a list.
pub fn check_line_items(items: &[NewLineItem]) -> Result<(), AppError> {
    if items.is_empty() {
        return Err(AppError::invalid_field("lineItems", "empty_items"));
    }
    for item in items {
        item.validate()?;
        if item.unit_price.is_sign_negative() && !item.unit_price.is_zero() {
            return Err(AppError::invalid_field("unitPrice", "invalid_price"));
        }
    }
    Ok(())
}

/// Best-effort first/last name from the local part of an e-mail.
pub fn names_from_email(email: &str) -> (String, String) {
    fn capitalize(word: &str) -> String {
        let mut chars = word.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            None => String::new(),
        }
    }

    let local = email.split('@').next().unwrap_or_default();
    let mut parts = local
        .split(['.', '_', '-', '+'])
        .filter(|p| !p.is_empty())
        .map(capitalize);

    let first = parts.next().unwrap_or_default();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

/// RFC-4180 CSV of the export rows, header included.
pub fn export_csv(rows: &[ReceiptExportRow]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Date", "Store", "Amount", "Currency", "Status", "Customer Email"])?;

    for row in rows {
        writer.write_record([
            row.created_at.to_rfc3339_opts(SecondsFormat::Millis, true).as_str(),
            row.store_name.as_str(),
            row.total_amount.to_string().as_str(),
            row.currency.as_str(),
            row.status.as_str(),
            row.customer_email.as_deref().unwrap_or(ANONYMOUS_CUSTOMER),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("csv flush failed: {}", e))?;
    String::from_utf8(bytes).map_err(|e| AppError::InternalServerError(e.into()))
}

#[derive(Clone)]
pub struct ReceiptService {
    receipt_repo: ReceiptRepository,
    store_repo: StoreRepository,
    customer_repo: CustomerRepository,
    loyalty_repo: LoyaltyRepository,
}

impl ReceiptService {
    pub fn new(
        receipt_repo: ReceiptRepository,
        store_repo: StoreRepository,
        customer_repo: CustomerRepository,
        loyalty_repo: LoyaltyRepository,
    ) -> Self {
        Self {
            receipt_repo,
            store_repo,
            customer_repo,
            loyalty_repo,
        }
    }

    // =========================================================================
    //  ISSUE
    // =========================================================================

    pub async fn issue_receipt<'e, E>(
        &self,
        executor: E,
        payload: &IssueReceiptPayload,
    ) -> Result<ReceiptWithItems, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        check_line_items(&payload.line_items)?;

        if let Some(customer_id) = payload.customer_id {
            self.customer_repo
                .find_by_id(customer_id)
                .await?
                .ok_or(AppError::NotFound("customer"))?;
        }

        let mut tx = executor.begin().await?;

        let terminal = self
            .store_repo
            .find_terminal(&mut *tx, payload.terminal_id)
            .await?
            .ok_or(AppError::NotFound("terminal"))?;
        if terminal.store_id != payload.store_id {
            return Err(AppError::invalid_field("terminalId", "terminal_not_in_store"));
        }

        // the total is always derived from the lines
        let total: Decimal = payload.line_items.iter().map(NewLineItem::revenue).sum();
        let currency = payload
            .currency
            .as_deref()
            .map(str::to_uppercase)
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let receipt = self
            .receipt_repo
            .insert_receipt(
                &mut *tx,
                payload.store_id,
                terminal.id,
                payload.customer_id,
                total,
                &currency,
                Utc::now(),
            )
            .await?;
        let line_items = self
            .receipt_repo
            .insert_line_items(&mut *tx, receipt.id, &payload.line_items)
            .await?;
        self.store_repo.touch_terminal(&mut *tx, terminal.id).await?;

        tx.commit().await?;

        tracing::info!(receipt_id = %receipt.id, total = %receipt.total_amount, "receipt issued");
        Ok(ReceiptWithItems { receipt, line_items })
    }

    // =========================================================================
    //  CLAIM
    // =========================================================================

    /// Attaches an issued receipt to a customer (created on first claim) and
    /// credits loyalty points when the customer is enrolled.
    pub async fn claim_receipt<'e, E>(
        &self,
        executor: E,
        receipt_id: Uuid,
        payload: &ClaimReceiptPayload,
    ) -> Result<ClaimOutcome, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let receipt = self
            .receipt_repo
            .lock_receipt(&mut *tx, receipt_id)
            .await?
            .ok_or(AppError::NotFound("receipt"))?;
        if receipt.status != ReceiptStatus::Issued {
            return Err(AppError::ReceiptNotClaimable(receipt.status));
        }

        let email = payload.email.trim();
        let (derived_first, derived_last) = names_from_email(email);
        let first_name = payload.first_name.clone().unwrap_or(derived_first);
        let last_name = payload.last_name.clone().unwrap_or(derived_last);
        let customer = self
            .customer_repo
            .upsert_by_email(&mut *tx, &first_name, &last_name, email)
            .await?;

        let claimed = self
            .receipt_repo
            .mark_claimed(&mut *tx, receipt.id, customer.id)
            .await?;

        let mut points_earned = 0;
        let mut tier_name = None;

        if let Some(account) = self
            .loyalty_repo
            .lock_account_for_customer(&mut *tx, customer.id)
            .await?
        {
            let program = self
                .loyalty_repo
                .find_program_by_id(&mut *tx, account.program_id)
                .await?
                .ok_or(AppError::NotFound("program"))?;
            let items = self.receipt_repo.line_items_in(&mut *tx, &[claimed.id]).await?;
            let tiers = self.loyalty_repo.list_tiers_in(&mut *tx, program.id).await?;

            points_earned = accrued_points(&program, &items);
            let new_spend = account.total_spend + claimed.total_amount;
            let tier = tier_for_spend(&tiers, new_spend);
            tier_name = tier.map(|t| t.name.clone());

            self.loyalty_repo
                .record_accrual(
                    &mut *tx,
                    account.id,
                    points_earned,
                    claimed.total_amount,
                    tier.map(|t| t.id),
                    Utc::now(),
                )
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            receipt_id = %claimed.id,
            customer_id = %customer.id,
            points_earned,
            "receipt claimed"
        );

        Ok(ClaimOutcome {
            receipt: claimed,
            customer_id: customer.id,
            points_earned,
            tier_name,
        })
    }

    // =========================================================================
    //  READS
    // =========================================================================

    pub async fn list_receipts(&self, filter: &ReceiptFilter) -> Result<Vec<ReceiptListEntry>, AppError> {
        self.receipt_repo.list_entries(filter).await
    }

    pub async fn get_receipt_detail(&self, receipt_id: Uuid) -> Result<ReceiptDetail, AppError> {
        let row = self
            .receipt_repo
            .find_detail(receipt_id)
            .await?
            .ok_or(AppError::NotFound("receipt"))?;
        let line_items = self.receipt_repo.line_items_for(&[receipt_id]).await?;

        let customer_name = match (row.customer_first_name, row.customer_last_name) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last).trim().to_string()),
            (Some(first), None) => Some(first),
            _ => None,
        };

        Ok(ReceiptDetail {
            short_id: short_receipt_id(row.receipt.id),
            subtotal: line_items.iter().map(|li| li.revenue()).sum(),
            receipt: row.receipt,
            store_name: row.store_name,
            terminal_name: row.terminal_name,
            terminal_identifier: row.terminal_identifier,
            customer_name,
            customer_email: row.customer_email,
            line_items,
        })
    }

    pub async fn export_receipts_csv(&self) -> Result<String, AppError> {
        let rows = self.receipt_repo.export_rows().await?;
        export_csv(&rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use sqlx::PgConnection;

    // Compile-time: the claim reads run on the claim's own connection.
    #[test]
    fn claim_reads_take_the_transaction_connection() {
        fn claim_reads(service: &ReceiptService, conn: &mut PgConnection, id: Uuid) {
            let _ = service.customer_repo.upsert_by_email(&mut *conn, "Camille", "", "camille@exemple.fr");
            let _ = service.receipt_repo.line_items_in(&mut *conn, &[id]);
            let _ = service.loyalty_repo.list_tiers_in(&mut *conn, id);
        }
        let _ = claim_reads;
    }

    fn line(quantity: i32, unit_price: Decimal) -> NewLineItem {
        NewLineItem {
            category: "Livres".into(),
            product_name: "Le Petit Prince".into(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn empty_receipts_are_rejected() {
        let err = check_line_items(&[]).unwrap_err();
        assert_eq!(err.code(), "validation_failed");
    }

    #[test]
    fn line_checks_cover_quantity_and_price() {
        assert!(check_line_items(&[line(1, Decimal::new(850, 2))]).is_ok());
        assert!(check_line_items(&[line(1, Decimal::ZERO)]).is_ok());
        assert!(check_line_items(&[line(0, Decimal::ONE)]).is_err());
        assert!(check_line_items(&[line(1, Decimal::new(-1, 2))]).is_err());
    }

    #[test]
    fn names_are_derived_from_the_local_part() {
        assert_eq!(
            names_from_email("camille.martin@exemple.fr"),
            ("Camille".to_string(), "Martin".to_string())
        );
        assert_eq!(
            names_from_email("JEAN_de-la-tour@exemple.fr"),
            ("Jean".to_string(), "De La Tour".to_string())
        );
        assert_eq!(names_from_email("hugo@exemple.fr"), ("Hugo".to_string(), String::new()));
    }

    #[test]
    fn export_quotes_fields_and_marks_anonymous_receipts() {
        let at: DateTime<Utc> = "2024-11-30T12:00:00Z".parse().unwrap();
        let rows = vec![
            ReceiptExportRow {
                created_at: at,
                store_name: "Magasin, Centre".into(),
                total_amount: Decimal::new(4290, 2),
                currency: "EUR".into(),
                status: ReceiptStatus::Claimed,
                customer_email: Some("camille@exemple.fr".into()),
            },
            ReceiptExportRow {
                created_at: at,
                store_name: "Bastille".into(),
                total_amount: Decimal::new(1000, 2),
                currency: "EUR".into(),
                status: ReceiptStatus::Issued,
                customer_email: None,
            },
        ];

        let csv = export_csv(&rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "Date,Store,Amount,Currency,Status,Customer Email");
        assert_eq!(
            lines[1],
            "2024-11-30T12:00:00.000Z,\"Magasin, Centre\",42.90,EUR,CLAIMED,camille@exemple.fr"
        );
        assert_eq!(lines[2], "2024-11-30T12:00:00.000Z,Bastille,10.00,EUR,ISSUED,Anonymous");
    }
}
