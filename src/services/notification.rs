// src/services/notification.rs

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::InvoiceStore,
    integrations::{EmailMessage, Mailer, SmsSender},
    models::{
        customer::Customer,
        guest::SendGuestInvoicePayload,
        invoice::{InvoiceDetail, InvoiceEvent, InvoiceEventKind},
        workspace::Workspace,
    },
};

/// Resultado de um canal de entrega.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ChannelOutcome {
    /// Canal desligado ou cliente sem contato para ele.
    Skipped,
    Sent,
    Failed { error: String },
}

impl ChannelOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, ChannelOutcome::Sent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    pub email: ChannelOutcome,
    pub sms: ChannelOutcome,
}

impl SendOutcome {
    /// A fatura conta como enviada se pelo menos um canal funcionou.
    pub fn any_succeeded(&self) -> bool {
        self.email.succeeded() || self.sms.succeeded()
    }
}

/// Envia e-mails/SMS e registra os eventos de entrega.
#[derive(Clone)]
pub struct NotificationDispatcher {
    invoices: Arc<dyn InvoiceStore>,
    mailer: Option<Arc<dyn Mailer>>,
    sms: Option<Arc<dyn SmsSender>>,
    mail_from: String,
    base_url: String,
}

impl NotificationDispatcher {
    pub fn new(
        invoices: Arc<dyn InvoiceStore>,
        mailer: Option<Arc<dyn Mailer>>,
        sms: Option<Arc<dyn SmsSender>>,
        mail_from: String,
        base_url: String,
    ) -> Self {
        Self { invoices, mailer, sms, mail_from, base_url }
    }

    pub fn tracking_pixel_url(&self, invoice_id: Uuid) -> String {
        format!("{}/api/track/open/{}", self.base_url, invoice_id)
    }

    /// Um disparo por canal, sem retentativa.
    pub async fn send_invoice(
        &self,
        workspace: &Workspace,
        customer: &Customer,
        detail: &InvoiceDetail,
    ) -> SendOutcome {
        let invoice_id = detail.invoice.id;

        let email = match (&self.mailer, customer.email.as_deref()) {
            (Some(mailer), Some(to)) => {
                let message = EmailMessage {
                    from: self.mail_from.clone(),
                    to: to.to_string(),
                    subject: format!("Fatura {} de {}", detail.invoice.number, workspace.display_name()),
                    html: render_invoice_email(workspace, customer, detail, &self.tracking_pixel_url(invoice_id)),
                    reply_to: workspace.company_email.clone(),
                };
                match mailer.send(&message).await {
                    Ok(_) => ChannelOutcome::Sent,
                    Err(e) => ChannelOutcome::Failed { error: e.to_string() },
                }
            }
            _ => ChannelOutcome::Skipped,
        };

        let sms = match (&self.sms, customer.phone.as_deref()) {
            (Some(sender), Some(to)) => {
                let body = render_invoice_sms(workspace, detail);
                match sender.send(to, &body).await {
                    Ok(_) => ChannelOutcome::Sent,
                    Err(e) => ChannelOutcome::Failed { error: e.to_string() },
                }
            }
            _ => ChannelOutcome::Skipped,
        };

        self.record_delivery(invoice_id, &email, InvoiceEventKind::EmailSent, InvoiceEventKind::EmailFailed)
            .await;
        self.record_delivery(invoice_id, &sms, InvoiceEventKind::SmsSent, InvoiceEventKind::SmsFailed)
            .await;

        SendOutcome { email, sms }
    }

    async fn record_delivery(
        &self,
        invoice_id: Uuid,
        outcome: &ChannelOutcome,
        sent: InvoiceEventKind,
        failed: InvoiceEventKind,
    ) {
        let (kind, detail) = match outcome {
            ChannelOutcome::Skipped => return,
            ChannelOutcome::Sent => (sent, None),
            ChannelOutcome::Failed { error } => {
                tracing::warn!(invoice_id = %invoice_id, channel = failed.as_str(), error = %error, "⚠️ Falha no envio da fatura");
                (failed, Some(error.clone()))
            }
        };

        let event = InvoiceEvent { invoice_id, kind, detail, ip: None, user_agent: None, at: Utc::now() };
        if let Err(e) = self.invoices.record_event(event).await {
            tracing::warn!(invoice_id = %invoice_id, error = %e, "Falha ao registrar evento de entrega");
        }
    }

    /// E-mail da fatura de convidado. Aqui o envio é a operação principal, então o erro sobe.
    pub async fn send_guest_invoice(&self, payload: &SendGuestInvoicePayload) -> Result<(), AppError> {
        let mailer = self
            .mailer
            .as_ref()
            .ok_or_else(|| AppError::ProviderError("Envio de e-mail não configurado".into()))?;

        let message = EmailMessage {
            from: self.mail_from.clone(),
            to: payload.invoice.customer_email.clone(),
            subject: format!("Fatura {} de {}", payload.invoice.invoice_number, payload.sender_name),
            html: render_guest_email(payload),
            reply_to: None,
        };
        mailer.send(&message).await?;
        Ok(())
    }

    /// Link de redefinição de senha.
    pub async fn send_password_reset(&self, to: &str, token: &str) -> Result<(), AppError> {
        let Some(mailer) = &self.mailer else {
            tracing::warn!("E-mail de redefinição não enviado: provedor de e-mail desativado");
            return Ok(());
        };

        let link = format!("{}/reset-password?token={}", self.base_url, token);
        let message = EmailMessage {
            from: self.mail_from.clone(),
            to: to.to_string(),
            subject: "Redefinição de senha".to_string(),
            html: format!(
                "<p>Recebemos um pedido para redefinir sua senha.</p>\
                 <p><a href=\"{link}\">Clique aqui para escolher uma nova senha</a>. \
                 O link expira em 1 hora.</p>\
                 <p>Se não foi você, ignore este e-mail.</p>",
                link = escape_html(&link)
            ),
            reply_to: None,
        };
        mailer.send(&message).await?;
        Ok(())
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_invoice_email(workspace: &Workspace, customer: &Customer, detail: &InvoiceDetail, pixel_url: &str) -> String {
    let invoice = &detail.invoice;
    let mut html = String::new();

    html.push_str(&format!("<p>Olá, {}.</p>", escape_html(customer.greeting_name())));
    html.push_str(&format!(
        "<p>{} enviou a fatura <strong>{}</strong> no valor de <strong>{} {:.2}</strong>, com vencimento em {}.</p>",
        escape_html(workspace.display_name()),
        escape_html(&invoice.number),
        escape_html(&invoice.currency),
        invoice.total,
        invoice.due_date.format("%d/%m/%Y"),
    ));

    html.push_str("<table>");
    for line in &detail.lines {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td></tr>",
            escape_html(&line.description),
            line.quantity.normalize(),
            line.unit_price,
            line.line_total,
        ));
    }
    html.push_str("</table>");

    if let (Some(amount), Some(due)) = (detail.deposit_amount, invoice.deposit_due_date) {
        html.push_str(&format!(
            "<p>Sinal de {} {:.2} até {}.</p>",
            escape_html(&invoice.currency),
            amount,
            due.format("%d/%m/%Y")
        ));
    }

    if let Some(url) = &invoice.payment_link_url {
        html.push_str(&format!("<p><a href=\"{}\">Pagar agora</a></p>", escape_html(url)));
    }
    if let Some(notes) = &invoice.notes {
        html.push_str(&format!("<p>{}</p>", escape_html(notes)));
    }

    html.push_str(&format!(
        "<img src=\"{}\" width=\"1\" height=\"1\" alt=\"\" style=\"display:none\" />",
        escape_html(pixel_url)
    ));
    html
}

fn render_invoice_sms(workspace: &Workspace, detail: &InvoiceDetail) -> String {
    let invoice = &detail.invoice;
    let mut body = format!(
        "{}: fatura {} de {} {:.2}, vence em {}.",
        workspace.display_name(),
        invoice.number,
        invoice.currency,
        invoice.total,
        invoice.due_date.format("%d/%m/%Y"),
    );
    if let Some(url) = &invoice.payment_link_url {
        body.push_str(&format!(" Pague em {}", url));
    }
    body
}

fn render_guest_email(payload: &SendGuestInvoicePayload) -> String {
    let invoice = &payload.invoice;
    let mut html = format!(
        "<p>Olá, {}.</p><p>{} enviou a fatura <strong>{}</strong> no valor de <strong>{:.2}</strong>, com vencimento em {}.</p>",
        escape_html(&invoice.customer_name),
        escape_html(&payload.sender_name),
        escape_html(&invoice.invoice_number),
        invoice.amount,
        invoice.due_date.format("%d/%m/%Y"),
    );
    if let Some(description) = &invoice.description {
        html.push_str(&format!("<p>{}</p>", escape_html(description)));
    }
    if !invoice.line_items.is_empty() {
        html.push_str("<table>");
        for item in &invoice.line_items {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td></tr>",
                escape_html(&item.description),
                item.quantity.normalize(),
                item.rate,
                item.amount,
            ));
        }
        html.push_str("</table>");
    }
    if let Some(message) = &payload.message {
        html.push_str(&format!("<p>{}</p>", escape_html(message)));
    }
    html
}
