pub mod admin;
pub mod auth;
pub mod billing;
pub mod customers;
pub mod dashboard;
pub mod guest;
pub mod health;
pub mod invoices;
pub mod settings;
pub mod tracking;
