// src/services/demo_service.rs

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, seq::SliceRandom};
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    analytics::loyalty::{accrued_points, tier_for_spend},
    common::error::AppError,
    db::{CustomerRepository, LoyaltyRepository, ReceiptRepository, StoreRepository},
    models::{
        demo::DemoSeedSummary,
        receipt::{LineItem, NewLineItem},
    },
};

const DEMO_STORE_NAME: &str = "Magasin Démo";
const DEMO_STORE_CITY: &str = "Paris";
const DEMO_STORE_ADDRESS: &str = "123 Rue de la Démo";
const DEMO_TERMINAL_NAME: &str = "TPE Démo 1";

const CATEGORIES: [&str; 7] = ["Livres", "Hi-Tech", "Gaming", "Vinyles", "Accessoires", "Musique", "Cinéma"];
const FIRST_NAMES: [&str; 8] = ["Jean", "Marie", "Pierre", "Sophie", "Antoine", "Camille", "Lucas", "Emma"];
const LAST_NAMES: [&str; 8] = ["Martin", "Bernard", "Dubois", "Thomas", "Robert", "Richard", "Petit", "Durand"];

const CUSTOMER_COUNT: usize = 10;
// the first seeded customers join the loyalty program
const ENROLLED_COUNT: usize = 6;
const RECEIPT_COUNT: usize = 50;
const SPREAD_DAYS: i64 = 30;
const IDENTIFIED_SHARE: f64 = 0.7;

const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn random_token<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, values: &'a [&'a str]) -> &'a str {
    values.choose(rng).copied().unwrap_or_default()
}

pub struct DemoCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

pub fn demo_customer<R: Rng + ?Sized>(rng: &mut R) -> DemoCustomer {
    let first_name = pick(rng, &FIRST_NAMES).to_string();
    let last_name = pick(rng, &LAST_NAMES).to_string();
    let email = format!(
        "{}.{}.{}@demo.com",
        first_name.to_lowercase(),
        last_name.to_lowercase(),
        random_token(rng, 3).to_lowercase()
    );
    DemoCustomer {
        first_name,
        last_name,
        email,
    }
}

pub struct DemoReceipt {
    // index into the seeded customers, None for an anonymous sale
    pub customer: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub line_items: Vec<NewLineItem>,
}

/// One receipt over the last 30 days, 1 to 5 lines of 10 to 100 EUR.
pub fn demo_receipt<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>, customer_count: usize) -> DemoReceipt {
    let customer = (customer_count > 0 && rng.gen_bool(IDENTIFIED_SHARE)).then(|| rng.gen_range(0..customer_count));
    let offset_secs = rng.gen_range(0..Duration::days(SPREAD_DAYS).num_seconds());

    let line_items = (0..rng.gen_range(1..=5))
        .map(|_| NewLineItem {
            category: pick(rng, &CATEGORIES).to_string(),
            product_name: format!("Produit Démo {}", rng.gen_range(1..=100)),
            quantity: rng.gen_range(1..=2),
            unit_price: Decimal::new(rng.gen_range(1_000..=10_000), 2),
        })
        .collect();

    DemoReceipt {
        customer,
        created_at: now - Duration::seconds(offset_secs),
        line_items,
    }
}

// Spend, lines and last visit collected per enrolled customer while seeding
#[derive(Default)]
struct MemberActivity {
    spend: Decimal,
    items: Vec<LineItem>,
    last_visit: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct DemoService {
    store_repo: StoreRepository,
    customer_repo: CustomerRepository,
    receipt_repo: ReceiptRepository,
    loyalty_repo: LoyaltyRepository,
}

impl DemoService {
    pub fn new(
        store_repo: StoreRepository,
        customer_repo: CustomerRepository,
        receipt_repo: ReceiptRepository,
        loyalty_repo: LoyaltyRepository,
    ) -> Self {
        Self {
            store_repo,
            customer_repo,
            receipt_repo,
            loyalty_repo,
        }
    }

    pub async fn seed<'e, E>(&self, executor: E) -> Result<DemoSeedSummary, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        // ThreadRng is not Send, so everything random is drawn before the first await
        let now = Utc::now();
        let (terminal_identifier, customers, receipts) = {
            let mut rng = rand::thread_rng();
            let identifier = format!("DEMO-{}", random_token(&mut rng, 6));
            let customers: Vec<DemoCustomer> = (0..CUSTOMER_COUNT).map(|_| demo_customer(&mut rng)).collect();
            let receipts: Vec<DemoReceipt> = (0..RECEIPT_COUNT)
                .map(|_| demo_receipt(&mut rng, now, CUSTOMER_COUNT))
                .collect();
            (identifier, customers, receipts)
        };

        let program = self.loyalty_repo.find_program().await?;
        let tiers = match &program {
            Some(program) => self.loyalty_repo.list_tiers(program.id).await?,
            None => Vec::new(),
        };

        let mut tx = executor.begin().await?;

        let store = match self.store_repo.find_store_by_name(&mut *tx, DEMO_STORE_NAME).await? {
            Some(store) => store,
            None => {
                self.store_repo
                    .create_store(&mut *tx, DEMO_STORE_NAME, DEMO_STORE_CITY, Some(DEMO_STORE_ADDRESS))
                    .await?
            }
        };
        let terminal = self
            .store_repo
            .create_terminal(&mut *tx, store.id, DEMO_TERMINAL_NAME, &terminal_identifier)
            .await?;

        let mut customer_ids = Vec::with_capacity(customers.len());
        for c in &customers {
            let created = self
                .customer_repo
                .create_customer(&mut *tx, &c.first_name, &c.last_name, &c.email)
                .await?;
            customer_ids.push(created.id);
        }

        let mut identified = 0;
        let mut activity: HashMap<Uuid, MemberActivity> = HashMap::new();
        for r in &receipts {
            let customer_id = r.customer.and_then(|i| customer_ids.get(i).copied());
            if customer_id.is_some() {
                identified += 1;
            }
            let total: Decimal = r.line_items.iter().map(NewLineItem::revenue).sum();
            let receipt = self
                .receipt_repo
                .insert_receipt(&mut *tx, store.id, terminal.id, customer_id, total, "EUR", r.created_at)
                .await?;
            let lines = self
                .receipt_repo
                .insert_line_items(&mut *tx, receipt.id, &r.line_items)
                .await?;

            let member_id = r.customer.filter(|i| *i < ENROLLED_COUNT).and_then(|i| customer_ids.get(i));
            if let Some(id) = member_id {
                let member = activity.entry(*id).or_default();
                member.spend += total;
                member.items.extend(lines);
                member.last_visit = member.last_visit.max(Some(r.created_at));
            }
        }

        let mut enrolled = 0;
        if let Some(program) = &program {
            for id in customer_ids.iter().take(ENROLLED_COUNT) {
                let member = activity.remove(id).unwrap_or_default();
                let tier_id = tier_for_spend(&tiers, member.spend).map(|t| t.id);
                let account = self
                    .loyalty_repo
                    .create_account(&mut *tx, *id, program.id, tier_id)
                    .await?;
                self.loyalty_repo
                    .record_accrual(
                        &mut *tx,
                        account.id,
                        accrued_points(program, &member.items),
                        member.spend,
                        tier_id,
                        member.last_visit.unwrap_or(now),
                    )
                    .await?;
                enrolled += 1;
            }
        }

        tx.commit().await?;

        tracing::info!(
            store_id = %store.id,
            customers = customer_ids.len(),
            receipts = receipts.len(),
            enrolled,
            "demo data seeded"
        );

        Ok(DemoSeedSummary {
            store_id: store.id,
            terminal_id: terminal.id,
            customers: customer_ids.len(),
            receipts: receipts.len(),
            identified_receipts: identified,
            enrolled_members: enrolled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn demo_receipts_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let now = Utc::now();

        for _ in 0..200 {
            let r = demo_receipt(&mut rng, now, CUSTOMER_COUNT);
            assert!((1..=5).contains(&r.line_items.len()));
            assert!(r.created_at <= now && r.created_at > now - Duration::days(SPREAD_DAYS));
            assert!(r.customer.is_none_or(|i| i < CUSTOMER_COUNT));
            for item in &r.line_items {
                assert!((1..=2).contains(&item.quantity));
                assert!(item.unit_price >= Decimal::from(10) && item.unit_price <= Decimal::from(100));
                assert!(CATEGORIES.contains(&item.category.as_str()));
            }
        }
    }

    #[test]
    fn about_seventy_percent_of_receipts_are_identified() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = Utc::now();
        let identified = (0..1_000)
            .filter(|_| demo_receipt(&mut rng, now, CUSTOMER_COUNT).customer.is_some())
            .count();
        assert!((600..=800).contains(&identified), "{identified}");
    }

    #[test]
    fn demo_emails_are_lowercase_and_on_the_demo_domain() {
        let mut rng = StdRng::seed_from_u64(3);
        let c = demo_customer(&mut rng);
        assert!(c.email.ends_with("@demo.com"));
        assert_eq!(c.email, c.email.to_lowercase());
        assert!(c.email.starts_with(&c.first_name.to_lowercase()));
    }

    #[test]
    fn receipts_without_customers_stay_anonymous() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(demo_receipt(&mut rng, Utc::now(), 0).customer.is_none());
    }
}
