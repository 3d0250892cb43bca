// src/analytics.rs
//
// Pure aggregations over already-loaded rows. No I/O in here: services load,
// these functions fold, handlers serialize.

pub mod categories;
pub mod customers;
pub mod loyalty;
pub mod overview;
pub mod segments;

/// part / whole as a percentage, 0 when whole is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use crate::models::receipt::{LineItem, Receipt, ReceiptStatus, ReceiptWithItems};

    /// Anonymous ISSUED receipt with one "Divers" line worth `total`.
    pub fn receipt(at: DateTime<Utc>, total: i64) -> ReceiptWithItems {
        receipt_with(at, &[("Divers", 1, total)])
    }

    /// Anonymous ISSUED receipt; lines are (category, quantity, unit price).
    pub fn receipt_with(at: DateTime<Utc>, lines: &[(&str, i32, i64)]) -> ReceiptWithItems {
        let id = Uuid::new_v4();
        let line_items: Vec<LineItem> = lines
            .iter()
            .map(|(category, quantity, unit)| LineItem {
                id: Uuid::new_v4(),
                receipt_id: id,
                category: category.to_string(),
                product_name: format!("Article {}", category),
                quantity: *quantity,
                unit_price: Decimal::from(*unit),
            })
            .collect();
        let total_amount = line_items.iter().map(|li| li.revenue()).sum();

        ReceiptWithItems {
            receipt: Receipt {
                id,
                store_id: Uuid::nil(),
                terminal_id: Uuid::nil(),
                customer_id: None,
                status: ReceiptStatus::Issued,
                total_amount,
                currency: "EUR".to_string(),
                created_at: at,
                updated_at: at,
            },
            line_items,
        }
    }

    pub fn owned_by(mut r: ReceiptWithItems, customer_id: Uuid) -> ReceiptWithItems {
        r.receipt.customer_id = Some(customer_id);
        r
    }

    pub fn with_status(mut r: ReceiptWithItems, status: ReceiptStatus) -> ReceiptWithItems {
        r.receipt.status = status;
        r
    }

    pub fn at_store(mut r: ReceiptWithItems, store_id: Uuid) -> ReceiptWithItems {
        r.receipt.store_id = store_id;
        r
    }
}

#[cfg(test)]
mod tests {
    use super::percentage;

    #[test]
    fn percentage_of_nothing_is_zero() {
        assert_eq!(percentage(3, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
    }
}
