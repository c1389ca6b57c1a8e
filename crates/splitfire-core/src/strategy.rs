//! Draft expansion strategies
//!
//! A strategy turns one canonical draft shell into the final ordered list of
//! drafts for an expense. Which strategy runs is a configuration-time choice:
//! a configured balance account enables the balance-account strategy,
//! otherwise every expense becomes a single transaction over the owed amount.

use rust_decimal::Decimal;
use splitfire_config::SyncConfig;

use crate::builder::TransactionBodyBuilder;
use crate::currency::CurrencyNormalizer;
use crate::error::SyncError;
use crate::models::{ExpenseRecord, ShareRecord, TransactionDraft, TransactionKind};

/// Expansion strategy for one expense
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStrategy {
    /// One withdrawal over the amount the user owes
    Standard,
    /// A real-money leg over the paid amount plus a second leg settling the
    /// difference against a virtual balance account
    BalanceAccount {
        /// Name of the virtual settlement account
        account: String,
    },
}

impl TransactionStrategy {
    /// Pick the strategy the configuration asks for
    pub fn from_config(config: &SyncConfig) -> Self {
        if config.uses_balance_account() {
            TransactionStrategy::BalanceAccount {
                account: config.balance_account.clone(),
            }
        } else {
            TransactionStrategy::Standard
        }
    }

    /// Expand an expense into its ordered list of drafts.
    ///
    /// Zero-amount legs are never emitted; the list may be empty.
    pub fn expand(
        &self,
        builder: &TransactionBodyBuilder,
        normalizer: &CurrencyNormalizer<'_>,
        expense: &ExpenseRecord,
        share: &ShareRecord,
        overrides: &[String],
    ) -> Result<Vec<TransactionDraft>, SyncError> {
        match self {
            TransactionStrategy::Standard => {
                if share.owed.is_zero() {
                    return Ok(Vec::new());
                }
                let mut draft = builder.build(expense, share, overrides);
                normalizer.normalize(&mut draft, &expense.currency_code, share.owed)?;
                Ok(vec![draft])
            }
            TransactionStrategy::BalanceAccount { account } => {
                self.expand_with_balance(account, builder, normalizer, expense, share, overrides)
            }
        }
    }

    fn expand_with_balance(
        &self,
        account: &str,
        builder: &TransactionBodyBuilder,
        normalizer: &CurrencyNormalizer<'_>,
        expense: &ExpenseRecord,
        share: &ShareRecord,
        overrides: &[String],
    ) -> Result<Vec<TransactionDraft>, SyncError> {
        let shell = builder.build(expense, share, overrides);
        let mut drafts = Vec::with_capacity(2);

        if !share.paid.is_zero() {
            let mut paid = shell.clone();
            normalizer.normalize(&mut paid, &expense.currency_code, share.paid)?;
            drafts.push(paid);
        }

        let balance = share.net_balance;
        if balance.is_zero() {
            return Ok(drafts);
        }

        let mut leg = shell.clone();
        leg.description = format!("Balance transfer for: {}", shell.description);
        if balance > Decimal::ZERO {
            // The user fronted more than their share; the surplus flows into
            // the balance account until the group settles up.
            leg.kind = TransactionKind::Deposit;
            leg.source_name = format!("{} balancer", account);
            leg.destination_name = account.to_string();
            normalizer.normalize(&mut leg, &expense.currency_code, balance)?;
        } else {
            // The user paid less than they owe; the shortfall is covered out
            // of the balance account.
            leg.kind = TransactionKind::Withdrawal;
            leg.source_name = account.to_string();
            leg.destination_name = shell.destination_name.clone();
            normalizer.normalize(&mut leg, &expense.currency_code, -balance)?;
        }
        drafts.push(leg);

        Ok(drafts)
    }
}

// ==================== Tests ====================
