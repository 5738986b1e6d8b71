// src/services/tasks.rs

use std::{future::Future, sync::Arc};

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::common::error::AppError;

/// Executor dos efeitos colaterais "dispara e esquece" (uso do trial, sync de
/// clientes no Square, registro de aberturas).
///
/// Cada tarefa tem nome e o resultado sempre vai para o log. Os handles ficam
/// guardados para que o desligamento (e os testes) possam esperar o que ainda
/// está em andamento.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            match task.await {
                Ok(()) => tracing::debug!(task = name, "Tarefa em segundo plano concluída"),
                Err(e) => tracing::warn!(task = name, error = %e, "⚠️ Tarefa em segundo plano falhou"),
            }
        });

        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Quantas tarefas ainda não terminaram.
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.handles.lock().iter().filter(|h| !h.is_finished()).count()
    }

    /// Espera todas as tarefas pendentes (inclusive as criadas durante a espera).
    pub async fn drain(&self) {
        loop {
            let batch: Vec<_> = std::mem::take(&mut *self.handles.lock());
            if batch.is_empty() {
                return;
            }
            for handle in batch {
                if let Err(e) = handle.await {
                    tracing::error!(error = %e, "🔥 Tarefa em segundo plano abortou");
                }
            }
        }
    }
}
