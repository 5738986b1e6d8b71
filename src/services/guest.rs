// src/services/guest.rs
//
// Fluxo de convidado: faturas sem conta, guardadas só no cliente. O servidor
// nunca persiste estes dados; a store abaixo é a mesma regra que o navegador
// aplica, com o armazenamento plugável.

use std::path::PathBuf;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    common::{counter::CappedCounter, error::AppError},
    models::guest::{GuestInvoice, GuestInvoicePatch, GuestInvoiceStatus, GuestLineItem, NewGuestInvoice},
};

pub const GUEST_INVOICE_LIMIT: u32 = 3;

/// Estado completo guardado pelo cliente.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestState {
    pub invoices: Vec<GuestInvoice>,
    // Total já criado: apagar uma fatura não devolve a vaga.
    pub created_total: u32,
}

pub trait GuestStorage {
    fn load(&self) -> Result<GuestState, AppError>;

    fn save(&mut self, state: &GuestState) -> Result<(), AppError>;
}

/// Armazenamento efêmero (some junto com o processo).
#[derive(Debug, Default)]
pub struct MemoryGuestStorage {
    state: GuestState,
}

impl GuestStorage for MemoryGuestStorage {
    fn load(&self) -> Result<GuestState, AppError> {
        Ok(self.state.clone())
    }

    fn save(&mut self, state: &GuestState) -> Result<(), AppError> {
        self.state = state.clone();
        Ok(())
    }
}

/// Snapshot em JSON num arquivo, no mesmo formato do localStorage do navegador.
#[derive(Debug, Clone)]
pub struct JsonFileGuestStorage {
    path: PathBuf,
}

impl JsonFileGuestStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl GuestStorage for JsonFileGuestStorage {
    fn load(&self) -> Result<GuestState, AppError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| AppError::internal(format!("Snapshot de convidado corrompido: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(GuestState::default()),
            Err(e) => Err(AppError::internal(format!("Falha ao ler snapshot de convidado: {}", e))),
        }
    }

    fn save(&mut self, state: &GuestState) -> Result<(), AppError> {
        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| AppError::internal(format!("Falha ao serializar snapshot: {}", e)))?;
        std::fs::write(&self.path, bytes)
            .map_err(|e| AppError::internal(format!("Falha ao gravar snapshot de convidado: {}", e)))
    }
}

/// Recalcula `amount` de cada item e devolve a soma.
pub fn price_line_items(items: &mut [GuestLineItem]) -> Decimal {
    items
        .iter_mut()
        .map(|item| {
            item.amount = item.quantity * item.rate;
            item.amount
        })
        .sum()
}

pub struct GuestInvoiceStore<S: GuestStorage> {
    storage: S,
    state: GuestState,
    limit: u32,
}

impl<S: GuestStorage> GuestInvoiceStore<S> {
    pub fn open(storage: S) -> Result<Self, AppError> {
        Self::with_limit(storage, GUEST_INVOICE_LIMIT)
    }

    pub fn with_limit(storage: S, limit: u32) -> Result<Self, AppError> {
        let state = storage.load()?;
        Ok(Self { storage, state, limit })
    }

    fn counter(&self) -> CappedCounter {
        CappedCounter::new(self.state.created_total, self.limit)
    }

    pub fn remaining(&self) -> u32 {
        self.counter().remaining()
    }

    pub fn list(&self) -> &[GuestInvoice] {
        &self.state.invoices
    }

    pub fn create(&mut self, new_invoice: NewGuestInvoice) -> Result<GuestInvoice, AppError> {
        let consumption = self
            .counter()
            .consume()
            .map_err(|reached| AppError::GuestLimitReached { limit: reached.limit })?;

        let mut line_items = new_invoice.line_items;
        let amount = price_line_items(&mut line_items);

        let invoice = GuestInvoice {
            id: Uuid::new_v4(),
            invoice_number: format!("GUEST-{:03}", consumption.counter.used),
            customer_name: new_invoice.customer_name,
            customer_email: new_invoice.customer_email,
            description: new_invoice.description,
            amount,
            due_date: new_invoice.due_date,
            status: GuestInvoiceStatus::Draft,
            line_items,
            created_at: Utc::now(),
        };

        let mut next = self.state.clone();
        next.invoices.push(invoice.clone());
        next.created_total = consumption.counter.used;
        self.commit(next)?;

        Ok(invoice)
    }

    /// Atualização parcial; itens novos recalculam o valor.
    pub fn update_invoice(&mut self, id: Uuid, patch: GuestInvoicePatch) -> Result<GuestInvoice, AppError> {
        let mut next = self.state.clone();
        let invoice = next
            .invoices
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(AppError::NotFound("Fatura"))?;

        if let Some(name) = patch.customer_name {
            invoice.customer_name = name;
        }
        if let Some(email) = patch.customer_email {
            invoice.customer_email = email;
        }
        if patch.description.is_some() {
            invoice.description = patch.description;
        }
        if let Some(due_date) = patch.due_date {
            invoice.due_date = due_date;
        }
        if let Some(status) = patch.status {
            invoice.status = status;
        }
        if let Some(mut items) = patch.line_items {
            invoice.amount = price_line_items(&mut items);
            invoice.line_items = items;
        }

        let updated = invoice.clone();
        self.commit(next)?;
        Ok(updated)
    }

    // Só troca o estado em memória se o armazenamento aceitou.
    fn commit(&mut self, next: GuestState) -> Result<(), AppError> {
        self.storage.save(&next)?;
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_invoice(name: &str) -> NewGuestInvoice {
        NewGuestInvoice {
            customer_name: name.into(),
            customer_email: "cliente@test.com".into(),
            description: None,
            due_date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            line_items: vec![GuestLineItem {
                description: "Logo".into(),
                quantity: Decimal::from(2),
                rate: "12.50".parse().unwrap(),
                amount: Decimal::ZERO,
            }],
        }
    }

    #[test]
    fn caps_at_three_invoices_ever_created() {
        let mut store = GuestInvoiceStore::open(MemoryGuestStorage::default()).unwrap();

        for n in 1..=3 {
            let invoice = store.create(new_invoice("Ana")).unwrap();
            assert_eq!(invoice.invoice_number, format!("GUEST-{:03}", n));
            assert_eq!(invoice.amount, "25.00".parse::<Decimal>().unwrap());
        }
        assert_eq!(store.remaining(), 0);

        let err = store.create(new_invoice("Bia")).unwrap_err();
        assert!(matches!(err, AppError::GuestLimitReached { limit: 3 }));
        assert_eq!(store.list().len(), 3);
    }

    #[test]
    fn patch_flips_status_after_send() {
        let mut store = GuestInvoiceStore::open(MemoryGuestStorage::default()).unwrap();
        let invoice = store.create(new_invoice("Ana")).unwrap();

        let sent = store
            .update_invoice(invoice.id, GuestInvoicePatch { status: Some(GuestInvoiceStatus::Sent), ..Default::default() })
            .unwrap();
        assert_eq!(sent.status, GuestInvoiceStatus::Sent);
        assert_eq!(sent.customer_name, "Ana");
        assert_eq!(store.list()[0].status, GuestInvoiceStatus::Sent);

        let missing = store.update_invoice(Uuid::new_v4(), GuestInvoicePatch::default());
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[test]
    fn json_snapshot_survives_reopen() {
        let path = std::env::temp_dir().join(format!("guest-{}.json", Uuid::new_v4()));

        let mut store = GuestInvoiceStore::open(JsonFileGuestStorage::new(&path)).unwrap();
        store.create(new_invoice("Ana")).unwrap();
        store.create(new_invoice("Bia")).unwrap();
        drop(store);

        let mut reopened = GuestInvoiceStore::open(JsonFileGuestStorage::new(&path)).unwrap();
        assert_eq!(reopened.list().len(), 2);
        assert_eq!(reopened.remaining(), 1);
        reopened.create(new_invoice("Caio")).unwrap();
        assert!(reopened.create(new_invoice("Duda")).is_err());

        std::fs::remove_file(&path).unwrap();
    }
}
