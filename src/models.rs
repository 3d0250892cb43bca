pub mod analytics;
pub mod auth;
pub mod customer;
pub mod demo;
pub mod loyalty;
pub mod receipt;
pub mod store;
