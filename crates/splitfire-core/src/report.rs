//! Run report structures

use serde::{Deserialize, Serialize};

use crate::reconcile::SyncDecision;

/// An expense left for manual handling, with enough context to find it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedExpense {
    pub description: String,
    pub amount: String,
    pub currency: String,
    pub date: String,
}

/// Tally of everything one run decided
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    /// Transactions created in the ledger
    pub created: usize,
    /// Transactions updated in the ledger
    pub updated: usize,
    /// Drafts that already matched their remote transaction
    pub unchanged: usize,
    /// Expenses skipped for manual handling
    pub skipped: Vec<SkippedExpense>,
}

impl SyncReport {
    /// Count one engine decision
    pub fn record(&mut self, decision: SyncDecision) {
        match decision {
            SyncDecision::Created => self.created += 1,
            SyncDecision::Updated => self.updated += 1,
            SyncDecision::Unchanged => self.unchanged += 1,
        }
    }

    /// Note an expense skipped for manual handling
    pub fn skip(&mut self, description: &str, amount: &str, currency: &str, date: &str) {
        self.skipped.push(SkippedExpense {
            description: description.to_string(),
            amount: amount.to_string(),
            currency: currency.to_string(),
            date: date.to_string(),
        });
    }

    /// Whether the run wrote anything to the ledger
    pub fn wrote_anything(&self) -> bool {
        self.created > 0 || self.updated > 0
    }

    /// One-line summary for the end of the run
    pub fn summary(&self) -> String {
        format!(
            "{} created, {} updated, {} unchanged, {} skipped for manual handling",
            self.created,
            self.updated,
            self.unchanged,
            self.skipped.len()
        )
    }
}

// ==================== Tests ====================
