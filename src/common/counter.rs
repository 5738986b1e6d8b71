// src/common/counter.rs

use serde::{Deserialize, Serialize};

/// Contador com teto: "quantos já foram usados" contra "quantos são permitidos".
///
/// É a mesma regra para as faturas grátis do trial (persistidas no banco) e para as
/// faturas de convidado (guardadas localmente no navegador). Quem persiste o estado
/// é responsabilidade do chamador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CappedCounter {
    pub used: u32,
    pub limit: u32,
}

/// Resultado de consumir uma unidade do contador.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consumption {
    pub counter: CappedCounter,
    /// `true` apenas na chamada que levou `used` até o teto.
    pub crossed_limit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitReached {
    pub limit: u32,
}

impl CappedCounter {
    pub fn new(used: u32, limit: u32) -> Self {
        Self { used, limit }
    }

    /// Constrói a partir das colunas INTEGER do Postgres (valores negativos viram 0).
    pub fn from_db(used: i32, limit: i32) -> Self {
        Self::new(used.max(0) as u32, limit.max(0) as u32)
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.limit
    }

    /// Consome uma unidade. Falha se o teto já foi atingido.
    pub fn consume(self) -> Result<Consumption, LimitReached> {
        if self.is_exhausted() {
            return Err(LimitReached { limit: self.limit });
        }

        let counter = Self::new(self.used + 1, self.limit);
        Ok(Consumption {
            counter,
            crossed_limit: counter.is_exhausted(),
        })
    }
}
