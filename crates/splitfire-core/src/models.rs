//! Core data models for the synchronization engine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A shared expense retrieved from the expense source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseRecord {
    /// Unique expense identifier
    pub id: i64,
    /// Expense description as entered by the group
    pub description: String,
    /// Currency the expense was recorded in
    pub currency_code: String,
    /// Date the expense is dated for
    pub date: DateTime<Utc>,
    /// Moment the expense was entered
    pub created_at: DateTime<Utc>,
    /// Moment the expense was last modified
    pub updated_at: DateTime<Utc>,
    /// Free-text details field; may carry an embedded directive
    pub details: Option<String>,
    /// Set when the expense was deleted upstream
    pub deleted_at: Option<DateTime<Utc>>,
    /// True for settlement payments between group members
    pub is_payment: bool,
    /// User who entered the expense
    pub created_by: i64,
    /// User who last edited the expense, if ever edited
    pub updated_by: Option<i64>,
    /// Category name assigned upstream
    pub category: String,
    /// Per-user shares of the expense
    pub shares: Vec<ShareRecord>,
}

impl ExpenseRecord {
    /// Find the share belonging to the given user
    pub fn share_for(&self, user_id: i64) -> Option<&ShareRecord> {
        self.shares.iter().find(|s| s.user_id == user_id)
    }
}

/// One user's slice of a shared expense
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRecord {
    /// User the share belongs to
    pub user_id: i64,
    /// Amount the user owes for this expense
    pub owed: Decimal,
    /// Amount the user actually paid
    pub paid: Decimal,
    /// Signed difference; positive = owed to the user, negative = user owes
    pub net_balance: Decimal,
}

/// A comment attached to an expense
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// User who wrote the comment
    pub author_id: i64,
    /// Comment body; may carry an embedded directive
    pub text: String,
    /// Moment the comment was posted
    pub posted_at: DateTime<Utc>,
}

/// Ledger transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money leaving an asset account
    Withdrawal,
    /// Money entering an asset account
    Deposit,
    /// Money moving between asset accounts
    Transfer,
}

impl Default for TransactionKind {
    fn default() -> Self {
        TransactionKind::Withdrawal
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "withdrawal" => Ok(TransactionKind::Withdrawal),
            "deposit" => Ok(TransactionKind::Deposit),
            "transfer" => Ok(TransactionKind::Transfer),
            _ => Err(format!("Invalid transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Withdrawal => write!(f, "withdrawal"),
            TransactionKind::Deposit => write!(f, "deposit"),
            TransactionKind::Transfer => write!(f, "transfer"),
        }
    }
}

/// An in-memory, not-yet-committed ledger transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDraft {
    /// Account the money leaves
    pub source_name: String,
    /// Account the money arrives at
    pub destination_name: String,
    /// Category name
    pub category_name: String,
    /// Transaction type
    pub kind: TransactionKind,
    /// Primary amount in the target account's currency; None until the
    /// currency normalizer has run
    pub amount: Option<Decimal>,
    /// Amount in the expense currency when it differs from the account's
    pub foreign_amount: Option<Decimal>,
    /// Expense currency when it differs from the account's
    pub foreign_currency_code: Option<String>,
    /// Booking date
    pub date: DateTime<Utc>,
    /// Date the underlying expense is dated for
    pub payment_date: DateTime<Utc>,
    /// Transaction description
    pub description: String,
    /// Free-text notes carried over from the expense
    pub notes: String,
    /// Stable reference linking back to the originating expense and leg
    pub external_reference: String,
    /// Tags; kept unique
    pub tags: Vec<String>,
}

impl TransactionDraft {
    /// Append a tag unless it is already present
    pub fn add_tag(&mut self, tag: &str) {
        if !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
    }
}

/// Snapshot of a transaction already present in the remote ledger
///
/// Fields are kept exactly as the remote formats them; amounts and dates are
/// normalized only at diff time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteTransaction {
    /// Remote transaction identifier
    pub id: String,
    /// Stable reference linking back to the originating expense and leg
    pub external_reference: Option<String>,
    /// Transaction type as reported by the remote
    pub kind: Option<String>,
    /// Primary amount as reported by the remote
    pub amount: Option<String>,
    /// Foreign amount as reported by the remote
    pub foreign_amount: Option<String>,
    /// Foreign currency as reported by the remote
    pub foreign_currency_code: Option<String>,
    /// Booking date as reported by the remote
    pub date: Option<String>,
    /// Payment date as reported by the remote
    pub payment_date: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Notes
    pub notes: Option<String>,
    /// Source account name
    pub source_name: Option<String>,
    /// Destination account name
    pub destination_name: Option<String>,
    /// Category name
    pub category_name: Option<String>,
    /// Tags
    pub tags: Vec<String>,
}

/// Ledger account entry used to build the currency directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Account name
    pub name: String,
    /// Currency the account is kept in
    pub currency_code: String,
}

// ==================== Tests ====================
