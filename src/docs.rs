// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::forgot_password,
        handlers::auth::reset_password,
        handlers::auth::change_password,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::get_my_workspaces,
        handlers::auth::switch_workspace,

        // --- Customers ---
        handlers::customers::create_customer,
        handlers::customers::list_customers,
        handlers::customers::get_customer,
        handlers::customers::update_customer,

        // --- Invoices ---
        handlers::invoices::create_invoice,
        handlers::invoices::list_invoices,
        handlers::invoices::get_invoice,
        handlers::invoices::update_status,
        handlers::invoices::send_invoice,
        handlers::invoices::issue_payment_link,
        handlers::invoices::list_payments,
        handlers::invoices::invoice_pdf,

        // --- Billing ---
        handlers::billing::get_status,
        handlers::billing::track_usage,
        handlers::billing::cancel_subscription,
        handlers::billing::reactivate_subscription,

        // --- Dashboard ---
        handlers::dashboard::get_summary,

        // --- Settings ---
        handlers::settings::get_settings,
        handlers::settings::update_settings,

        // --- Admin ---
        handlers::admin::list_domains,
        handlers::admin::get_domain,
        handlers::admin::verify_domain,

        // --- Público ---
        handlers::tracking::open_pixel,
        handlers::guest::send_guest_invoice,
        handlers::health::health,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::SubscriptionStatus,
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::ChangePasswordPayload,
            models::auth::ForgotPasswordPayload,
            models::auth::ResetPasswordPayload,
            models::auth::SwitchWorkspacePayload,
            models::auth::AuthResponse,

            // --- Workspaces ---
            models::workspace::Workspace,
            models::workspace::WorkspaceSummary,
            models::workspace::MembershipRole,
            models::workspace::UpdateWorkspaceSettingsPayload,

            // --- Customers ---
            models::customer::CustomerType,
            models::customer::Customer,
            models::customer::CustomerPayload,

            // --- Invoices ---
            models::invoice::InvoiceStatus,
            models::invoice::DepositType,
            models::invoice::Invoice,
            models::invoice::InvoiceLine,
            models::invoice::InvoiceDetail,
            models::invoice::LineItemInput,
            models::invoice::DepositInput,
            models::invoice::CreateInvoicePayload,
            models::invoice::UpdateStatusPayload,
            models::payment::PaymentStatus,
            models::payment::Payment,
            crate::services::notification::ChannelOutcome,
            crate::services::notification::SendOutcome,

            // --- Billing ---
            models::billing::BillingStatus,
            models::billing::SubscriptionActionResponse,

            // --- Dashboard ---
            models::dashboard::DashboardSummary,

            // --- Admin ---
            crate::integrations::MailDomain,

            // --- Guest ---
            models::guest::GuestInvoiceStatus,
            models::guest::GuestLineItem,
            models::guest::GuestInvoice,
            models::guest::SendGuestInvoicePayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação, registro e redefinição de senha"),
        (name = "Users", description = "Dados do usuário e troca de workspace"),
        (name = "Customers", description = "Clientes do workspace"),
        (name = "Invoices", description = "Faturas, links de pagamento e envio"),
        (name = "Billing", description = "Trial e assinatura da plataforma"),
        (name = "Dashboard", description = "Indicadores do workspace"),
        (name = "Settings", description = "Perfil da empresa e credenciais do Square"),
        (name = "Admin", description = "Domínios de envio de e-mail"),
        (name = "Tracking", description = "Pixel de abertura de e-mail"),
        (name = "Guest", description = "Faturas sem conta"),
        (name = "System", description = "Saúde do servidor")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
