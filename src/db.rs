pub mod user_repo;
pub use user_repo::{NewAccount, TrialUsage, UserRepository, UserStore};
pub mod workspace_repo;
pub use workspace_repo::{WorkspaceRepository, WorkspaceStore};
pub mod customer_repo;
pub use customer_repo::{CustomerRepository, CustomerStore};
pub mod invoice_repo;
pub use invoice_repo::{InvoiceRepository, InvoiceStore};
pub mod payment_repo;
pub use payment_repo::{PaymentRepository, PaymentStore};
