// src/testing.rs
//
// Implementações em memória das stores e provedores falsos, para testar os
// serviços sem Postgres nem rede.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{counter::CappedCounter, error::AppError},
    config::{AppState, Config, Integrations, Stores},
    db::{
        CustomerStore, InvoiceStore, NewAccount, PaymentStore, TrialUsage, UserStore, WorkspaceStore,
    },
    integrations::{
        EmailMessage, MailDomain, MailReceipt, Mailer, PaymentLink, PaymentLinkRequest,
        PaymentProvider, PaymentProviderFactory, ProviderCustomer, SmsSender,
    },
    models::{
        auth::{SubscriptionStatus, User},
        customer::{Customer, CustomerPayload, CustomerType},
        invoice::{
            format_invoice_number, Invoice, InvoiceDetail, InvoiceEvent, InvoiceLine, InvoiceStatus,
            NewInvoice,
        },
        payment::{Payment, PaymentStatus},
        workspace::{
            slugify, BillingCredentials, Membership, MembershipRole, UpdateWorkspaceSettingsPayload,
            Workspace, WorkspaceSummary,
        },
    },
};

#[derive(Default)]
struct DbState {
    users: Vec<User>,
    workspaces: Vec<Workspace>,
    memberships: Vec<Membership>,
    reset_tokens: Vec<ResetTokenRow>,
    customers: Vec<Customer>,
    invoices: Vec<Invoice>,
    lines: Vec<InvoiceLine>,
    counters: HashMap<Uuid, i32>,
    payments: Vec<Payment>,
    events: Vec<InvoiceEvent>,
}

struct ResetTokenRow {
    user_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
    used: bool,
}

/// Banco em memória que implementa todas as stores.
#[derive(Default)]
pub struct MemoryDb {
    state: Mutex<DbState>,
}

impl MemoryDb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stores(self: &Arc<Self>) -> Stores {
        Stores {
            users: self.clone(),
            workspaces: self.clone(),
            customers: self.clone(),
            invoices: self.clone(),
            payments: self.clone(),
        }
    }

    pub fn seed_workspace(&self, name: &str) -> Workspace {
        let now = Utc::now();
        let workspace = Workspace {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slugify(name),
            square_access_token: None,
            square_location_id: None,
            square_environment: None,
            company_name: None,
            company_email: None,
            company_phone: None,
            company_address: None,
            tax_id: None,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().workspaces.push(workspace.clone());
        workspace
    }

    pub fn seed_billing_credentials(&self, workspace_id: Uuid, token: &str) {
        let mut state = self.state.lock();
        if let Some(ws) = state.workspaces.iter_mut().find(|w| w.id == workspace_id) {
            ws.square_access_token = Some(token.to_string());
            ws.square_location_id = Some("LOC-1".to_string());
            ws.square_environment = Some("sandbox".to_string());
        }
    }

    pub fn seed_user(&self, email: &str, default_workspace_id: Option<Uuid>) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: String::new(),
            name: Some("Teste".to_string()),
            is_admin: false,
            default_workspace_id,
            subscription_status: SubscriptionStatus::Trial,
            subscription_id: None,
            subscription_expiry: None,
            free_invoices_used: 0,
            free_invoices_limit: 3,
            trial_started_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        self.state.lock().users.push(user.clone());
        user
    }

    pub fn update_user(&self, id: Uuid, change: impl FnOnce(&mut User)) {
        let mut state = self.state.lock();
        if let Some(user) = state.users.iter_mut().find(|u| u.id == id) {
            change(user);
        }
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.state.lock().users.iter().find(|u| u.id == id).cloned()
    }

    pub fn add_membership(&self, user_id: Uuid, workspace_id: Uuid, created_at: DateTime<Utc>) {
        self.state.lock().memberships.push(Membership {
            id: Uuid::new_v4(),
            user_id,
            workspace_id,
            role: MembershipRole::Member,
            created_at,
        });
    }

    pub fn seed_customer(&self, workspace_id: Uuid, name: &str, email: Option<&str>, phone: Option<&str>) -> Customer {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4(),
            workspace_id,
            business_name: name.to_string(),
            contact_name: None,
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
            address_line1: None,
            address_line2: None,
            city: None,
            state: None,
            postal_code: None,
            country: None,
            customer_type: CustomerType::Business,
            tax_id: None,
            provider_customer_id: None,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().customers.push(customer.clone());
        customer
    }

    pub fn customer(&self, id: Uuid) -> Option<Customer> {
        self.state.lock().customers.iter().find(|c| c.id == id).cloned()
    }

    pub fn seed_payment(&self, invoice_id: Uuid, amount: Decimal, status: PaymentStatus) {
        self.state.lock().payments.push(Payment {
            id: Uuid::new_v4(),
            invoice_id,
            amount,
            currency: "USD".to_string(),
            method: "card".to_string(),
            status,
            provider_payment_id: None,
            processed_at: Some(Utc::now()),
            created_at: Utc::now(),
        });
    }

    pub fn events(&self) -> Vec<InvoiceEvent> {
        self.state.lock().events.clone()
    }
}

#[async_trait]
impl UserStore for MemoryDb {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let state = self.state.lock();
        Ok(state.users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.user(id))
    }

    async fn create_account(&self, account: NewAccount) -> Result<(User, Workspace), AppError> {
        if self.find_by_email(&account.email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }

        let base = slugify(&account.workspace_name);
        let mut workspace = self.seed_workspace(&account.workspace_name);
        {
            let mut state = self.state.lock();
            let mut attempt = 1;
            let slug = loop {
                let slug = if attempt == 1 { base.clone() } else { format!("{}-{}", base, attempt) };
                let taken = state.workspaces.iter().any(|w| w.slug == slug && w.id != workspace.id);
                if !taken {
                    break slug;
                }
                attempt += 1;
            };
            if let Some(ws) = state.workspaces.iter_mut().find(|w| w.id == workspace.id) {
                ws.slug = slug.clone();
            }
            workspace.slug = slug;
        }

        let mut user = self.seed_user(&account.email, Some(workspace.id));
        self.update_user(user.id, |u| {
            u.password_hash = account.password_hash.clone();
            u.name = Some(account.name.clone());
            u.free_invoices_limit = account.free_invoices_limit;
        });
        user = self.user(user.id).ok_or(AppError::NotFound("Usuário"))?;

        self.state.lock().memberships.push(Membership {
            id: Uuid::new_v4(),
            user_id: user.id,
            workspace_id: workspace.id,
            role: MembershipRole::Owner,
            created_at: Utc::now(),
        });
        Ok((user, workspace))
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<(), AppError> {
        let mut state = self.state.lock();
        let user = state.users.iter_mut().find(|u| u.id == user_id).ok_or(AppError::NotFound("Usuário"))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn create_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.state.lock().reset_tokens.push(ResetTokenRow {
            user_id,
            token_hash: token_hash.to_string(),
            expires_at,
            used: false,
        });
        Ok(())
    }

    async fn reset_password(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Uuid, AppError> {
        let mut state = self.state.lock();
        let row = state
            .reset_tokens
            .iter_mut()
            .find(|t| t.token_hash == token_hash && !t.used && t.expires_at > now)
            .ok_or(AppError::InvalidResetToken)?;
        row.used = true;
        let user_id = row.user_id;

        for other in state.reset_tokens.iter_mut().filter(|t| t.user_id == user_id) {
            other.used = true;
        }
        if let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(user_id)
    }

    async fn increment_trial_usage(&self, user_id: Uuid) -> Result<Option<TrialUsage>, AppError> {
        let mut state = self.state.lock();
        let Some(user) = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id && u.subscription_status == SubscriptionStatus::Trial)
        else {
            return Ok(None);
        };

        let previous = CappedCounter::from_db(user.free_invoices_used, user.free_invoices_limit);
        user.free_invoices_used += 1;
        // Mesmo efeito do CASE no UPDATE do Postgres.
        if previous.consume().map_or(true, |c| c.crossed_limit) {
            user.subscription_status = SubscriptionStatus::TrialExpired;
        }
        Ok(Some(TrialUsage { previous }))
    }

    async fn set_subscription_status(&self, user_id: Uuid, status: SubscriptionStatus) -> Result<(), AppError> {
        self.update_user(user_id, |u| u.subscription_status = status);
        Ok(())
    }
}

#[async_trait]
impl WorkspaceStore for MemoryDb {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Workspace>, AppError> {
        Ok(self.state.lock().workspaces.iter().find(|w| w.id == id).cloned())
    }

    async fn oldest_membership_workspace(&self, user_id: Uuid) -> Result<Option<Workspace>, AppError> {
        let state = self.state.lock();
        let oldest = state
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .min_by_key(|m| m.created_at);
        Ok(oldest.and_then(|m| state.workspaces.iter().find(|w| w.id == m.workspace_id).cloned()))
    }

    async fn is_member(&self, user_id: Uuid, workspace_id: Uuid) -> Result<bool, AppError> {
        let state = self.state.lock();
        Ok(state.memberships.iter().any(|m| m.user_id == user_id && m.workspace_id == workspace_id))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<WorkspaceSummary>, AppError> {
        let state = self.state.lock();
        let mut memberships: Vec<_> = state.memberships.iter().filter(|m| m.user_id == user_id).collect();
        memberships.sort_by_key(|m| m.created_at);
        Ok(memberships
            .into_iter()
            .filter_map(|m| {
                let ws = state.workspaces.iter().find(|w| w.id == m.workspace_id)?;
                Some(WorkspaceSummary { id: ws.id, name: ws.name.clone(), role: m.role, joined_at: m.created_at })
            })
            .collect())
    }

    async fn update_settings(
        &self,
        workspace_id: Uuid,
        payload: &UpdateWorkspaceSettingsPayload,
    ) -> Result<Workspace, AppError> {
        let mut state = self.state.lock();
        let ws = state
            .workspaces
            .iter_mut()
            .find(|w| w.id == workspace_id)
            .ok_or(AppError::NotFound("Workspace"))?;

        fn keep(target: &mut Option<String>, value: &Option<String>) {
            if value.is_some() {
                target.clone_from(value);
            }
        }
        if let Some(name) = &payload.name {
            ws.name = name.clone();
        }
        keep(&mut ws.company_name, &payload.company_name);
        keep(&mut ws.company_email, &payload.company_email);
        keep(&mut ws.company_phone, &payload.company_phone);
        keep(&mut ws.company_address, &payload.company_address);
        keep(&mut ws.tax_id, &payload.tax_id);
        keep(&mut ws.square_access_token, &payload.square_access_token);
        keep(&mut ws.square_location_id, &payload.square_location_id);
        keep(&mut ws.square_environment, &payload.square_environment);
        ws.updated_at = Utc::now();
        Ok(ws.clone())
    }
}

fn customer_from_payload(workspace_id: Uuid, id: Uuid, payload: &CustomerPayload, created_at: DateTime<Utc>) -> Customer {
    Customer {
        id,
        workspace_id,
        business_name: payload.business_name.clone(),
        contact_name: payload.contact_name.clone(),
        email: payload.email.clone(),
        phone: payload.phone.clone(),
        address_line1: payload.address_line1.clone(),
        address_line2: payload.address_line2.clone(),
        city: payload.city.clone(),
        state: payload.state.clone(),
        postal_code: payload.postal_code.clone(),
        country: payload.country.clone(),
        customer_type: payload.customer_type,
        tax_id: payload.tax_id.clone(),
        provider_customer_id: None,
        created_at,
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl CustomerStore for MemoryDb {
    async fn create(&self, workspace_id: Uuid, payload: &CustomerPayload) -> Result<Customer, AppError> {
        let customer = customer_from_payload(workspace_id, Uuid::new_v4(), payload, Utc::now());
        self.state.lock().customers.push(customer.clone());
        Ok(customer)
    }

    async fn list(&self, workspace_id: Uuid) -> Result<Vec<Customer>, AppError> {
        let state = self.state.lock();
        let mut customers: Vec<_> = state.customers.iter().filter(|c| c.workspace_id == workspace_id).cloned().collect();
        customers.sort_by(|a, b| a.business_name.cmp(&b.business_name));
        Ok(customers)
    }

    async fn find(&self, workspace_id: Uuid, id: Uuid) -> Result<Option<Customer>, AppError> {
        let state = self.state.lock();
        Ok(state.customers.iter().find(|c| c.id == id && c.workspace_id == workspace_id).cloned())
    }

    async fn update(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        payload: &CustomerPayload,
    ) -> Result<Option<Customer>, AppError> {
        let mut state = self.state.lock();
        let Some(existing) = state.customers.iter_mut().find(|c| c.id == id && c.workspace_id == workspace_id) else {
            return Ok(None);
        };
        let provider_customer_id = existing.provider_customer_id.clone();
        *existing = customer_from_payload(workspace_id, id, payload, existing.created_at);
        existing.provider_customer_id = provider_customer_id;
        Ok(Some(existing.clone()))
    }

    async fn set_provider_customer_id(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        provider_customer_id: &str,
    ) -> Result<(), AppError> {
        let mut state = self.state.lock();
        if let Some(c) = state
            .customers
            .iter_mut()
            .find(|c| c.id == id && c.workspace_id == workspace_id && c.provider_customer_id.is_none())
        {
            c.provider_customer_id = Some(provider_customer_id.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl InvoiceStore for MemoryDb {
    async fn create(&self, new_invoice: NewInvoice) -> Result<InvoiceDetail, AppError> {
        let mut state = self.state.lock();
        let sequence = {
            let counter = state.counters.entry(new_invoice.workspace_id).or_insert(0);
            *counter += 1;
            *counter
        };

        let now = Utc::now();
        let deposit = new_invoice.deposit;
        let invoice = Invoice {
            id: Uuid::new_v4(),
            workspace_id: new_invoice.workspace_id,
            customer_id: new_invoice.customer_id,
            sequence,
            number: format_invoice_number(sequence),
            issue_date: new_invoice.issue_date,
            due_date: new_invoice.due_date,
            currency: new_invoice.currency,
            status: InvoiceStatus::Draft,
            notes: new_invoice.notes,
            payment_link_url: None,
            payment_link_id: None,
            requires_deposit: deposit.is_some(),
            deposit_type: deposit.map(|d| d.kind),
            deposit_value: deposit.map(|d| d.value),
            deposit_due_date: deposit.map(|d| d.due_date),
            total: new_invoice.total,
            created_by: Some(new_invoice.created_by),
            created_at: now,
            updated_at: now,
        };

        let lines: Vec<InvoiceLine> = new_invoice
            .lines
            .into_iter()
            .enumerate()
            .map(|(position, line)| InvoiceLine {
                id: Uuid::new_v4(),
                invoice_id: invoice.id,
                position: position as i32,
                description: line.description,
                quantity: line.quantity,
                unit_price: line.unit_price,
                line_total: line.line_total,
            })
            .collect();

        state.invoices.push(invoice.clone());
        state.lines.extend(lines.iter().cloned());
        Ok(InvoiceDetail::new(invoice, lines))
    }

    async fn find(&self, workspace_id: Uuid, id: Uuid) -> Result<Option<InvoiceDetail>, AppError> {
        let state = self.state.lock();
        let Some(invoice) = state.invoices.iter().find(|i| i.id == id && i.workspace_id == workspace_id) else {
            return Ok(None);
        };
        let mut lines: Vec<_> = state.lines.iter().filter(|l| l.invoice_id == id).cloned().collect();
        lines.sort_by_key(|l| l.position);
        Ok(Some(InvoiceDetail::new(invoice.clone(), lines)))
    }

    async fn list(&self, workspace_id: Uuid) -> Result<Vec<Invoice>, AppError> {
        let state = self.state.lock();
        let mut invoices: Vec<_> = state.invoices.iter().filter(|i| i.workspace_id == workspace_id).cloned().collect();
        invoices.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        Ok(invoices)
    }

    async fn update_status(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        from: InvoiceStatus,
        to: InvoiceStatus,
    ) -> Result<Option<Invoice>, AppError> {
        let mut state = self.state.lock();
        let invoice = state
            .invoices
            .iter_mut()
            .find(|i| i.id == id && i.workspace_id == workspace_id && i.status == from);
        Ok(invoice.map(|i| {
            i.status = to;
            i.updated_at = Utc::now();
            i.clone()
        }))
    }

    async fn set_payment_link(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        url: &str,
        link_id: &str,
    ) -> Result<Option<Invoice>, AppError> {
        let mut state = self.state.lock();
        let invoice = state
            .invoices
            .iter_mut()
            .find(|i| i.id == id && i.workspace_id == workspace_id && i.payment_link_url.is_none());
        Ok(invoice.map(|i| {
            i.payment_link_url = Some(url.to_string());
            i.payment_link_id = Some(link_id.to_string());
            i.clone()
        }))
    }

    async fn record_event(&self, event: InvoiceEvent) -> Result<bool, AppError> {
        let mut state = self.state.lock();
        if !state.invoices.iter().any(|i| i.id == event.invoice_id) {
            return Ok(false);
        }
        state.events.push(event);
        Ok(true)
    }
}

#[async_trait]
impl PaymentStore for MemoryDb {
    async fn list_for_invoice(&self, workspace_id: Uuid, invoice_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let state = self.state.lock();
        let owned = state.invoices.iter().any(|i| i.id == invoice_id && i.workspace_id == workspace_id);
        if !owned {
            return Ok(Vec::new());
        }
        Ok(state.payments.iter().filter(|p| p.invoice_id == invoice_id).cloned().collect())
    }

    async fn list_for_workspace(&self, workspace_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let state = self.state.lock();
        Ok(state
            .payments
            .iter()
            .filter(|p| state.invoices.iter().any(|i| i.id == p.invoice_id && i.workspace_id == workspace_id))
            .cloned()
            .collect())
    }
}

// =============================================================================
//  PROVEDORES FALSOS
// =============================================================================

#[derive(Default)]
pub struct FakeProvider {
    pub fail: AtomicBool,
    pub link_requests: Mutex<Vec<PaymentLinkRequest>>,
    pub customers_created: Mutex<Vec<String>>,
    pub canceled: Mutex<Vec<String>>,
    pub resumed: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let provider = Self::default();
        provider.fail.store(true, Ordering::SeqCst);
        Arc::new(provider)
    }

    fn check(&self) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::ProviderError("Square respondeu 500".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<PaymentLink, AppError> {
        self.check()?;
        let mut requests = self.link_requests.lock();
        requests.push(request.clone());
        Ok(PaymentLink {
            id: format!("link-{}", requests.len()),
            url: format!("https://pay.test/{}", request.idempotency_key),
        })
    }

    async fn create_customer(&self, name: &str, _email: Option<&str>) -> Result<ProviderCustomer, AppError> {
        self.check()?;
        self.customers_created.lock().push(name.to_string());
        Ok(ProviderCustomer { id: format!("cust-{}", name) })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), AppError> {
        self.check()?;
        self.canceled.lock().push(subscription_id.to_string());
        Ok(())
    }

    async fn resume_subscription(&self, subscription_id: &str) -> Result<(), AppError> {
        self.check()?;
        self.resumed.lock().push(subscription_id.to_string());
        Ok(())
    }
}

/// Sempre devolve o mesmo provedor falso e conta quantas vezes montou um cliente.
pub struct FakeProviderFactory {
    pub provider: Arc<FakeProvider>,
    pub builds: AtomicUsize,
}

impl FakeProviderFactory {
    pub fn new(provider: Arc<FakeProvider>) -> Arc<Self> {
        Arc::new(Self { provider, builds: AtomicUsize::new(0) })
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl PaymentProviderFactory for FakeProviderFactory {
    fn build(&self, _credentials: &BillingCredentials) -> Arc<dyn PaymentProvider> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.provider.clone()
    }
}

#[derive(Default)]
pub struct FakeMailer {
    pub fail: AtomicBool,
    pub sent: Mutex<Vec<EmailMessage>>,
}

impl FakeMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let mailer = Self::default();
        mailer.fail.store(true, Ordering::SeqCst);
        Arc::new(mailer)
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, message: &EmailMessage) -> Result<MailReceipt, AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::ProviderError("Resend respondeu 503".into()));
        }
        self.sent.lock().push(message.clone());
        Ok(MailReceipt { id: Some(format!("mail-{}", self.sent.lock().len())) })
    }

    async fn list_domains(&self) -> Result<Vec<MailDomain>, AppError> {
        Ok(vec![MailDomain {
            id: "dom-1".into(),
            name: "faturas.test".into(),
            status: "pending".into(),
            region: Some("us-east-1".into()),
            created_at: None,
        }])
    }

    async fn get_domain(&self, id: &str) -> Result<MailDomain, AppError> {
        self.list_domains()
            .await?
            .into_iter()
            .find(|d| d.id == id)
            .ok_or(AppError::NotFound("Domínio"))
    }

    async fn verify_domain(&self, id: &str) -> Result<MailDomain, AppError> {
        let mut domain = self.get_domain(id).await?;
        domain.status = "verified".into();
        Ok(domain)
    }
}

#[derive(Default)]
pub struct FakeSms {
    pub fail: AtomicBool,
    pub sent: Mutex<Vec<(String, String)>>,
}

impl FakeSms {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl SmsSender for FakeSms {
    async fn send(&self, to: &str, body: &str) -> Result<String, AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::ProviderError("Twilio respondeu 400".into()));
        }
        self.sent.lock().push((to.to_string(), body.to_string()));
        Ok("SM123".to_string())
    }
}

// =============================================================================
//  APLICAÇÃO MONTADA
// =============================================================================

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/teste".into(),
        jwt_secret: "segredo-de-teste".into(),
        bind_addr: "127.0.0.1:0".into(),
        app_base_url: "https://app.test".into(),
        database_max_connections: 1,
        free_invoice_limit: 3,
        provider_cache_capacity: 4,
        trusted_proxies: Vec::new(),
        square: None,
        resend_api_key: None,
        mail_from: "Faturas <faturas@app.test>".into(),
        twilio: None,
    }
}

/// Tudo que um teste precisa para montar e inspecionar o `AppState`.
pub struct TestApp {
    pub db: Arc<MemoryDb>,
    pub provider: Arc<FakeProvider>,
    pub factory: Arc<FakeProviderFactory>,
    pub platform: Arc<FakeProvider>,
    pub mailer: Arc<FakeMailer>,
    pub sms: Arc<FakeSms>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_mailer(FakeMailer::new())
    }

    pub fn with_mailer(mailer: Arc<FakeMailer>) -> Self {
        let db = MemoryDb::new();
        let provider = FakeProvider::new();
        let factory = FakeProviderFactory::new(provider.clone());
        let platform = FakeProvider::new();
        let sms = FakeSms::new();

        let integrations = Integrations {
            provider_factory: factory.clone(),
            platform_provider: Some(platform.clone()),
            mailer: Some(mailer.clone()),
            sms: Some(sms.clone()),
        };
        let state = AppState::build(Arc::new(test_config()), db.stores(), integrations);

        Self { db, provider, factory, platform, mailer, sms, state }
    }

    /// Usuário em trial com um workspace próprio (membership de dono).
    pub fn seed_account(&self, email: &str) -> (User, Workspace) {
        let workspace = self.db.seed_workspace(&format!("Empresa {}", email));
        let user = self.db.seed_user(email, Some(workspace.id));
        self.db.add_membership(user.id, workspace.id, Utc::now() - Duration::days(1));
        (user, workspace)
    }
}
