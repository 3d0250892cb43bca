pub mod analytics_service;
pub mod auth;
pub mod customer_service;
pub mod demo_service;
pub mod document_service;
pub mod loyalty_service;
pub mod receipt_service;
pub mod store_service;
