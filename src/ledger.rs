//! Per-phase cost accounting for one orchestrator run.
//!
//! Costs only accumulate. There is no way to remove or lower an entry, since
//! usage already billed by the agent runtime cannot be taken back.

use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;

/// Cost recorded for one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseCost {
    pub phase: String,
    pub cost_usd: f64,
}

/// Exportable `{phase -> cost, total}` summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub phases: Vec<PhaseCost>,
    pub total_usd: f64,
}

/// Phase costs in execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostLedger {
    entries: Vec<PhaseCost>,
}

impl CostLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the cost of a phase. Each phase may be recorded once.
    pub fn record_phase_cost(&mut self, phase: &str, cost_usd: f64) -> Result<(), LedgerError> {
        if !cost_usd.is_finite() || cost_usd < 0.0 {
            return Err(LedgerError::InvalidCost {
                phase: phase.to_string(),
                cost: cost_usd,
            });
        }
        if self.get(phase).is_some() {
            return Err(LedgerError::DuplicatePhase {
                phase: phase.to_string(),
            });
        }
        self.entries.push(PhaseCost {
            phase: phase.to_string(),
            cost_usd,
        });
        Ok(())
    }

    pub fn total_cost(&self) -> f64 {
        self.entries.iter().map(|e| e.cost_usd).sum()
    }

    /// Entries in the order phases were recorded.
    pub fn breakdown(&self) -> &[PhaseCost] {
        &self.entries
    }

    pub fn get(&self, phase: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.phase == phase)
            .map(|e| e.cost_usd)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> CostSummary {
        CostSummary {
            phases: self.entries.clone(),
            total_usd: self.total_cost(),
        }
    }
}
