// src/config.rs

use std::{env, net::IpAddr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        CustomerRepository, CustomerStore, InvoiceRepository, InvoiceStore, PaymentRepository,
        PaymentStore, UserRepository, UserStore, WorkspaceRepository, WorkspaceStore,
    },
    integrations::{
        http_client, resend::ResendMailer, square::{SquareClient, SquareClientFactory},
        twilio::TwilioSms, Mailer, PaymentProvider, PaymentProviderFactory, SmsSender,
    },
    middleware::rate_limit::RateLimiter,
    services::{
        auth::AuthService, customer_service::CustomerService, dashboard_service::DashboardService,
        document_service::DocumentService, entitlement::EntitlementService,
        identity::WorkspaceResolver, invoice_service::InvoiceService,
        notification::NotificationDispatcher, payment_link::PaymentLinkProvisioner,
        tasks::BackgroundTasks, workspace_service::WorkspaceService,
    },
};

/// Conta Square da própria plataforma (assinaturas dos usuários).
#[derive(Debug, Clone)]
pub struct SquareConfig {
    pub access_token: String,
    pub environment: String,
    pub location_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub app_base_url: String,
    pub database_max_connections: u32,
    pub free_invoice_limit: i32,
    pub provider_cache_capacity: usize,
    /// Proxies cujo X-Forwarded-For é aceito como IP do cliente.
    pub trusted_proxies: Vec<IpAddr>,
    pub square: Option<SquareConfig>,
    pub resend_api_key: Option<String>,
    pub mail_from: String,
    pub twilio: Option<TwilioConfig>,
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match optional(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} inválido ({}): {}", key, raw, e)),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let square = optional("SQUARE_ACCESS_TOKEN").map(|access_token| SquareConfig {
            access_token,
            environment: optional("SQUARE_ENVIRONMENT").unwrap_or_else(|| "sandbox".to_string()),
            location_id: optional("SQUARE_LOCATION_ID"),
        });

        let twilio = match (
            optional("TWILIO_ACCOUNT_SID"),
            optional("TWILIO_AUTH_TOKEN"),
            optional("TWILIO_FROM_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => None,
        };

        let trusted_proxies = optional("TRUSTED_PROXIES")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| v.parse::<IpAddr>().with_context(|| format!("TRUSTED_PROXIES inválido: {}", v)))
                    .collect::<anyhow::Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            app_base_url: optional("APP_BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            database_max_connections: parsed("DATABASE_MAX_CONNECTIONS", 5)?,
            free_invoice_limit: parsed("FREE_INVOICE_LIMIT", 3)?,
            provider_cache_capacity: parsed("PROVIDER_CACHE_CAPACITY", 64)?,
            trusted_proxies,
            square,
            resend_api_key: optional("RESEND_API_KEY"),
            mail_from: optional("MAIL_FROM").unwrap_or_else(|| "Invoices <onboarding@resend.dev>".to_string()),
            twilio,
        })
    }

    pub async fn connect_pool(&self) -> anyhow::Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(self.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&self.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
        Ok(pool)
    }
}

/// As stores usadas pelos serviços (Postgres em produção, memória nos testes).
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub workspaces: Arc<dyn WorkspaceStore>,
    pub customers: Arc<dyn CustomerStore>,
    pub invoices: Arc<dyn InvoiceStore>,
    pub payments: Arc<dyn PaymentStore>,
}

impl Stores {
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            workspaces: Arc::new(WorkspaceRepository::new(pool.clone())),
            customers: Arc::new(CustomerRepository::new(pool.clone())),
            invoices: Arc::new(InvoiceRepository::new(pool.clone())),
            payments: Arc::new(PaymentRepository::new(pool.clone())),
        }
    }
}

/// Provedores externos. Os opcionais ficam desligados sem configuração.
pub struct Integrations {
    pub provider_factory: Arc<dyn PaymentProviderFactory>,
    pub platform_provider: Option<Arc<dyn PaymentProvider>>,
    pub mailer: Option<Arc<dyn Mailer>>,
    pub sms: Option<Arc<dyn SmsSender>>,
}

impl Integrations {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = http_client()?;

        let platform_provider = config.square.as_ref().map(|square| {
            Arc::new(SquareClient::new(http.clone(), &square.access_token, &square.environment))
                as Arc<dyn PaymentProvider>
        });
        let mailer = config
            .resend_api_key
            .as_ref()
            .map(|key| Arc::new(ResendMailer::new(http.clone(), key)) as Arc<dyn Mailer>);
        let sms = config.twilio.as_ref().map(|t| {
            Arc::new(TwilioSms::new(http.clone(), &t.account_sid, &t.auth_token, &t.from_number))
                as Arc<dyn SmsSender>
        });

        if mailer.is_none() {
            tracing::warn!("RESEND_API_KEY ausente: envio de e-mails desativado");
        }
        if platform_provider.is_none() {
            tracing::warn!("SQUARE_ACCESS_TOKEN ausente: cancelamento/reativação de assinaturas desativados");
        }

        Ok(Self {
            provider_factory: Arc::new(SquareClientFactory::new(http)),
            platform_provider,
            mailer,
            sms,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tasks: BackgroundTasks,
    pub rate_limiter: RateLimiter,
    pub mailer: Option<Arc<dyn Mailer>>,

    // --- Serviços ---
    pub auth_service: AuthService,
    pub resolver: WorkspaceResolver,
    pub entitlement_service: EntitlementService,
    pub customer_service: CustomerService,
    pub invoice_service: InvoiceService,
    pub dashboard_service: DashboardService,
    pub document_service: DocumentService,
    pub workspace_service: WorkspaceService,
    pub notifier: NotificationDispatcher,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<(Self, PgPool)> {
        let pool = config.connect_pool().await?;
        let integrations = Integrations::from_config(&config)?;
        let state = Self::build(Arc::new(config), Stores::postgres(&pool), integrations);
        Ok((state, pool))
    }

    // --- Monta o gráfico de dependências ---
    pub fn build(config: Arc<Config>, stores: Stores, integrations: Integrations) -> Self {
        let tasks = BackgroundTasks::new();

        let resolver = WorkspaceResolver::new(stores.users.clone(), stores.workspaces.clone());
        let notifier = NotificationDispatcher::new(
            stores.invoices.clone(),
            integrations.mailer.clone(),
            integrations.sms.clone(),
            config.mail_from.clone(),
            config.app_base_url.clone(),
        );
        let auth_service = AuthService::new(
            stores.users.clone(),
            stores.workspaces.clone(),
            notifier.clone(),
            config.jwt_secret.clone(),
            config.free_invoice_limit,
        );
        let entitlement_service =
            EntitlementService::new(stores.users.clone(), integrations.platform_provider.clone());
        let payment_links = PaymentLinkProvisioner::new(
            stores.invoices.clone(),
            stores.customers.clone(),
            stores.workspaces.clone(),
            integrations.provider_factory.clone(),
            config.provider_cache_capacity,
            tasks.clone(),
        );
        let invoice_service = InvoiceService::new(
            stores.invoices.clone(),
            stores.customers.clone(),
            stores.payments.clone(),
            stores.workspaces.clone(),
            entitlement_service.clone(),
            payment_links.clone(),
            notifier.clone(),
            tasks.clone(),
        );
        let customer_service = CustomerService::new(stores.customers.clone());
        let dashboard_service = DashboardService::new(
            stores.invoices.clone(),
            stores.payments.clone(),
            stores.customers.clone(),
        );
        let document_service = DocumentService::new(
            stores.invoices.clone(),
            stores.customers.clone(),
            stores.workspaces.clone(),
        );
        let workspace_service = WorkspaceService::new(stores.workspaces.clone(), payment_links);

        let rate_limiter = RateLimiter::with_trusted_proxies(config.trusted_proxies.clone());

        Self {
            config,
            tasks,
            rate_limiter,
            mailer: integrations.mailer,
            auth_service,
            resolver,
            entitlement_service,
            customer_service,
            invoice_service,
            dashboard_service,
            document_service,
            workspace_service,
            notifier,
        }
    }
}
