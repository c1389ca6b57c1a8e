//! Account currency directory and foreign-currency normalization

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::error::SyncError;
use crate::models::{AccountInfo, TransactionDraft, TransactionKind};

/// Nonzero stand-in for the primary amount of a foreign-currency draft; the
/// ledger schema rejects zero amounts, and the review tag routes the draft to
/// a human for the real value.
const PLACEHOLDER_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Immutable account-name to currency snapshot, built once per run
#[derive(Debug, Clone, Default)]
pub struct AccountDirectory {
    currencies: HashMap<String, String>,
}

impl AccountDirectory {
    /// Build the directory from the ledger's account listing
    pub fn new(accounts: Vec<AccountInfo>) -> Self {
        Self {
            currencies: accounts
                .into_iter()
                .map(|a| (a.name, a.currency_code))
                .collect(),
        }
    }

    /// Look up the currency an account is kept in
    pub fn currency_of(&self, name: &str) -> Result<&str, SyncError> {
        self.currencies
            .get(name)
            .map(|c| c.as_str())
            .ok_or_else(|| SyncError::UnknownAccount {
                name: name.to_string(),
            })
    }

    /// Number of known accounts
    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    /// Whether the directory is empty
    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }
}

/// Sets a draft's amount, switching to the foreign-currency representation
/// when the target account is kept in a different currency than the expense
#[derive(Debug, Clone)]
pub struct CurrencyNormalizer<'a> {
    directory: &'a AccountDirectory,
    review_tag: &'a str,
}

impl<'a> CurrencyNormalizer<'a> {
    /// Create a normalizer over the run's account directory
    pub fn new(directory: &'a AccountDirectory, review_tag: &'a str) -> Self {
        Self {
            directory,
            review_tag,
        }
    }

    /// Set the draft's amount in the representation its target account needs.
    ///
    /// The account under test is the source for withdrawals and transfers and
    /// the destination for deposits. On a currency mismatch the real amount
    /// moves to the foreign side, the primary amount gets a placeholder and
    /// the draft is tagged for manual review; no conversion is attempted.
    pub fn normalize(
        &self,
        draft: &mut TransactionDraft,
        expense_currency: &str,
        amount: Decimal,
    ) -> Result<(), SyncError> {
        let account = match draft.kind {
            TransactionKind::Withdrawal | TransactionKind::Transfer => &draft.source_name,
            TransactionKind::Deposit => &draft.destination_name,
        };

        let account_currency = self.directory.currency_of(account)?;
        if account_currency == expense_currency {
            draft.amount = Some(amount);
        } else {
            draft.foreign_amount = Some(amount);
            draft.foreign_currency_code = Some(expense_currency.to_string());
            draft.amount = Some(PLACEHOLDER_AMOUNT);
            draft.add_tag(self.review_tag);
        }

        Ok(())
    }
}

// ==================== Tests ====================
