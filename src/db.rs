pub mod user_repo;
pub use user_repo::UserRepository;
pub mod store_repo;
pub use store_repo::StoreRepository;
pub mod customer_repo;
pub use customer_repo::CustomerRepository;
pub mod receipt_repo;
pub use receipt_repo::ReceiptRepository;
pub mod loyalty_repo;
pub use loyalty_repo::LoyaltyRepository;
