pub mod analytics;
pub mod auth;
pub mod customers;
pub mod dashboard;
pub mod demo;
pub mod health;
pub mod loyalty;
pub mod receipts;
pub mod stores;
