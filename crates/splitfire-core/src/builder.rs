//! Canonical draft assembly
//!
//! Builds the shared shell of every ledger draft from an expense, the acting
//! user's share, the resolved override fields and the configured defaults.
//! The amount is left unset; the active strategy picks which share amount
//! applies and runs it through the currency normalizer.

use splitfire_config::SyncConfig;

use crate::directive::Directive;
use crate::models::{ExpenseRecord, ShareRecord, TransactionDraft, TransactionKind};
use crate::reconcile::base_reference;

/// Assembles canonical transaction drafts from expenses
#[derive(Debug, Clone)]
pub struct TransactionBodyBuilder {
    default_category: Option<String>,
    default_spend_account: String,
    default_transfer_account: String,
}

impl TransactionBodyBuilder {
    /// Create a builder with explicit defaults
    pub fn new(
        default_category: Option<String>,
        default_spend_account: String,
        default_transfer_account: String,
    ) -> Self {
        Self {
            default_category,
            default_spend_account,
            default_transfer_account,
        }
    }

    /// Create a builder from the sync configuration
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.default_category.clone(),
            config.default_spend_account.clone(),
            config.default_transfer_account.clone(),
        )
    }

    /// Build the draft shell for an expense.
    ///
    /// Override positions: destination, category, description, source. An
    /// absent or empty override falls back to the default for that position.
    pub fn build(
        &self,
        expense: &ExpenseRecord,
        share: &ShareRecord,
        overrides: &[String],
    ) -> TransactionDraft {
        let pick = |index: usize| {
            overrides
                .get(index)
                .map(|s| s.as_str())
                .filter(|s| !s.is_empty())
        };

        let destination_name = pick(0).unwrap_or(&expense.description).to_string();

        let category_name = match pick(1) {
            Some(category) => category.to_string(),
            None => self
                .default_category
                .clone()
                .unwrap_or_else(|| expense.category.clone()),
        };

        let description = pick(2).unwrap_or(&expense.description).to_string();

        // When the user paid nothing out of pocket the money effectively
        // moves out of the transfer account that tracks debts to the group.
        let default_source = if share.paid.is_zero() {
            &self.default_transfer_account
        } else {
            &self.default_spend_account
        };
        let source_name = pick(3).unwrap_or(default_source).to_string();

        // The details field doubles as the directive carrier; only genuine
        // free text is worth keeping as notes.
        let notes = if Directive::parse(expense.details.as_deref()).is_resolved() {
            String::new()
        } else {
            expense.details.clone().unwrap_or_default()
        };

        TransactionDraft {
            source_name,
            destination_name,
            category_name,
            kind: TransactionKind::Withdrawal,
            amount: None,
            foreign_amount: None,
            foreign_currency_code: None,
            date: expense.created_at,
            payment_date: expense.date,
            description,
            notes,
            external_reference: base_reference(expense.id),
            tags: Vec::new(),
        }
    }
}

// ==================== Tests ====================
