pub mod auth;
pub mod customer_service;
pub mod dashboard_service;
pub mod document_service;
pub mod entitlement;
pub mod guest;
pub mod identity;
pub mod invoice_service;
pub mod notification;
pub mod payment_link;
pub mod tasks;
pub mod workspace_service;
