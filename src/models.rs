pub mod auth;
pub mod billing;
pub mod customer;
pub mod dashboard;
pub mod guest;
pub mod invoice;
pub mod payment;
pub mod workspace;
