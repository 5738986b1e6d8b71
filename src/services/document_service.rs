// src/services/document_service.rs

use std::sync::Arc;

use genpdf::{elements, style, Element};
use image::Luma;
use qrcode::QrCode;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CustomerStore, InvoiceStore, WorkspaceStore},
    models::{
        customer::Customer,
        invoice::InvoiceDetail,
        workspace::{Workspace, WorkspaceContext},
    },
};

const FONT_DIR: &str = "./fonts";
const FONT_FAMILY: &str = "Roboto";

fn pdf_error(e: impl std::fmt::Display) -> AppError {
    AppError::internal(format!("Falha ao gerar PDF: {}", e))
}

/// QR code do link de pagamento, pronto para ir no PDF.
pub fn payment_qr(url: &str) -> Result<image::DynamicImage, AppError> {
    let code = QrCode::new(url.as_bytes()).map_err(pdf_error)?;
    let buffer = code.render::<Luma<u8>>().build();
    Ok(image::DynamicImage::ImageLuma8(buffer))
}

#[derive(Clone)]
pub struct DocumentService {
    invoices: Arc<dyn InvoiceStore>,
    customers: Arc<dyn CustomerStore>,
    workspaces: Arc<dyn WorkspaceStore>,
}

impl DocumentService {
    pub fn new(
        invoices: Arc<dyn InvoiceStore>,
        customers: Arc<dyn CustomerStore>,
        workspaces: Arc<dyn WorkspaceStore>,
    ) -> Self {
        Self { invoices, customers, workspaces }
    }

    pub async fn generate_invoice_pdf(&self, ctx: &WorkspaceContext, invoice_id: Uuid) -> Result<Vec<u8>, AppError> {
        // 1. Busca os dados (tudo no escopo do workspace)
        let detail = self
            .invoices
            .find(ctx.workspace_id, invoice_id)
            .await?
            .ok_or(AppError::NotFound("Fatura"))?;
        let customer = self
            .customers
            .find(ctx.workspace_id, detail.invoice.customer_id)
            .await?
            .ok_or(AppError::NotFound("Cliente"))?;
        let workspace = self
            .workspaces
            .find_by_id(ctx.workspace_id)
            .await?
            .ok_or(AppError::NotFound("Workspace"))?;

        // 2. Renderização é CPU-bound
        tokio::task::spawn_blocking(move || render_invoice(&workspace, &customer, &detail))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task do PDF: {}", e))?
    }
}

fn render_invoice(workspace: &Workspace, customer: &Customer, detail: &InvoiceDetail) -> Result<Vec<u8>, AppError> {
    let invoice = &detail.invoice;

    let font_family = genpdf::fonts::from_files(FONT_DIR, FONT_FAMILY, None)
        .map_err(|e| AppError::internal(format!("Fonte não encontrada na pasta {}: {}", FONT_DIR, e)))?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(format!("Fatura {}", invoice.number));
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    // --- CABEÇALHO ---
    doc.push(
        elements::Paragraph::new(workspace.display_name())
            .styled(style::Style::new().bold().with_font_size(18)),
    );
    if let Some(tax_id) = &workspace.tax_id {
        doc.push(elements::Paragraph::new(format!("Tax ID: {}", tax_id)).styled(style::Style::new().with_font_size(10)));
    }
    if let Some(email) = &workspace.company_email {
        doc.push(elements::Paragraph::new(email.as_str()).styled(style::Style::new().with_font_size(10)));
    }

    doc.push(elements::Break::new(1.5));
    doc.push(
        elements::Paragraph::new(format!("FATURA {}", invoice.number))
            .styled(style::Style::new().bold().with_font_size(14)),
    );
    doc.push(elements::Paragraph::new(format!("Emissão: {}", invoice.issue_date.format("%d/%m/%Y"))));
    doc.push(elements::Paragraph::new(format!("Vencimento: {}", invoice.due_date.format("%d/%m/%Y"))));
    doc.push(elements::Paragraph::new(format!("Status: {}", invoice.status)));
    doc.push(elements::Paragraph::new(format!("Cliente: {}", customer.business_name)));
    if let Some(email) = &customer.email {
        doc.push(elements::Paragraph::new(email.as_str()));
    }

    doc.push(elements::Break::new(2));

    // --- TABELA DE ITENS ---
    // Pesos das colunas: Descrição (4), Qtd (1), Preço (2), Total (2)
    let mut table = elements::TableLayout::new(vec![4, 1, 2, 2]);
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

    let bold = style::Style::new().bold();
    table
        .row()
        .element(elements::Paragraph::new("Descrição").styled(bold))
        .element(elements::Paragraph::new("Qtd").styled(bold))
        .element(elements::Paragraph::new("Unitário").styled(bold))
        .element(elements::Paragraph::new("Total").styled(bold))
        .push()
        .map_err(pdf_error)?;

    for line in &detail.lines {
        table
            .row()
            .element(elements::Paragraph::new(line.description.as_str()))
            .element(elements::Paragraph::new(line.quantity.normalize().to_string()))
            .element(elements::Paragraph::new(format!("{} {:.2}", invoice.currency, line.unit_price)))
            .element(elements::Paragraph::new(format!("{} {:.2}", invoice.currency, line.line_total)))
            .push()
            .map_err(pdf_error)?;
    }

    doc.push(table);
    doc.push(elements::Break::new(2));

    // --- TOTAIS ---
    let mut total = elements::Paragraph::new(format!("TOTAL: {} {:.2}", invoice.currency, invoice.total));
    total.set_alignment(genpdf::Alignment::Right);
    doc.push(total.styled(style::Style::new().bold().with_font_size(12)));

    if let (Some(amount), Some(due)) = (detail.deposit_amount, invoice.deposit_due_date) {
        let mut deposit = elements::Paragraph::new(format!(
            "Sinal: {} {:.2} até {}",
            invoice.currency,
            amount,
            due.format("%d/%m/%Y")
        ));
        deposit.set_alignment(genpdf::Alignment::Right);
        doc.push(deposit);
    }

    // --- PAGAMENTO (QR CODE) ---
    if let Some(url) = &invoice.payment_link_url {
        doc.push(elements::Break::new(2));
        doc.push(elements::Paragraph::new("PAGUE ONLINE").styled(style::Style::new().bold().with_font_size(12)));
        doc.push(elements::Paragraph::new(url.as_str()).styled(style::Style::new().with_font_size(8)));

        let qr = elements::Image::from_dynamic_image(payment_qr(url)?)
            .map_err(pdf_error)?
            .with_scale(genpdf::Scale::new(0.5, 0.5));
        doc.push(qr);
    }

    // --- RODAPÉ ---
    if let Some(notes) = &invoice.notes {
        doc.push(elements::Break::new(2));
        doc.push(elements::Paragraph::new(notes.as_str()).styled(style::Style::new().italic().with_font_size(9)));
    }
    if let Some(address) = &workspace.company_address {
        doc.push(elements::Break::new(1));
        doc.push(elements::Paragraph::new(address.as_str()).styled(style::Style::new().italic().with_font_size(8)));
    }

    // 3. Renderiza para memória
    let mut buffer = Vec::new();
    doc.render(&mut buffer).map_err(pdf_error)?;
    Ok(buffer)
}
