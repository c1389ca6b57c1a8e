//! Expense-to-ledger transaction synthesis and reconciliation engine
//!
//! Converts shared-expense records into canonical ledger-transaction drafts
//! and reconciles them against a remote ledger through an idempotent upsert
//! keyed by a stable reference. The remote systems sit behind the
//! [`ExpenseSource`] and [`LedgerSink`] ports; everything in between is pure
//! and deterministic.

pub mod builder;
pub mod currency;
pub mod directive;
pub mod error;
pub mod models;
pub mod reconcile;
pub mod report;
pub mod strategy;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use splitfire_config::SyncConfig;

pub use builder::TransactionBodyBuilder;
pub use currency::{AccountDirectory, CurrencyNormalizer};
pub use directive::{resolve_directive, Directive};
pub use error::{ErrorCode, SyncError};
pub use models::{
    AccountInfo, Comment, ExpenseRecord, RemoteTransaction, ShareRecord, TransactionDraft,
    TransactionKind,
};
pub use reconcile::{base_reference, leg_reference, ReconciliationEngine, SyncDecision};
pub use report::{SkippedExpense, SyncReport};
pub use strategy::TransactionStrategy;

// ==================== Remote Ports ====================

/// Source of shared expenses (Splitwise-shaped)
#[async_trait]
pub trait ExpenseSource: Send + Sync {
    /// Identity of the acting user
    async fn current_user(&self) -> Result<i64, SyncError>;

    /// Expenses updated since the given moment, in retrieval order
    async fn expenses_updated_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<ExpenseRecord>, SyncError>;

    /// Comments on an expense, in chronological order
    async fn comments(&self, expense_id: i64) -> Result<Vec<Comment>, SyncError>;
}

/// Target ledger (Firefly-shaped)
#[async_trait]
pub trait LedgerSink: Send + Sync {
    /// All ledger accounts, for the currency directory
    async fn accounts(&self) -> Result<Vec<AccountInfo>, SyncError>;

    /// Transactions dated since the given moment, for the reconciliation map
    async fn transactions_since(
        &self,
        start: DateTime<Utc>,
    ) -> Result<Vec<RemoteTransaction>, SyncError>;

    /// Transactions carrying exactly the given external reference
    async fn search_by_reference(
        &self,
        reference: &str,
    ) -> Result<Vec<RemoteTransaction>, SyncError>;

    /// Commit a new transaction
    async fn create(&self, draft: &TransactionDraft) -> Result<(), SyncError>;

    /// Replace the mutable fields of an existing transaction
    async fn update(&self, id: &str, draft: &TransactionDraft) -> Result<(), SyncError>;
}

// ==================== Synchronizer ====================

/// One-shot orchestrator for a full synchronization run
pub struct Synchronizer<'a> {
    source: &'a dyn ExpenseSource,
    sink: &'a dyn LedgerSink,
    config: &'a SyncConfig,
}

impl<'a> Synchronizer<'a> {
    /// Wire a run over the two remote systems
    pub fn new(
        source: &'a dyn ExpenseSource,
        sink: &'a dyn LedgerSink,
        config: &'a SyncConfig,
    ) -> Self {
        Self {
            source,
            sink,
            config,
        }
    }

    /// Run one synchronization pass.
    ///
    /// `now` is the caller's clock; the sync window reaches
    /// `config.window_days` back from it. Remote calls are awaited strictly
    /// in sequence. The first real error aborts the run; expenses that
    /// cannot be classified are reported and skipped instead.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<SyncReport, SyncError> {
        let cutoff = now - Duration::days(self.config.window_days);
        log::debug!("sync window starts at {}", cutoff);

        let user = self.source.current_user().await?;
        let directory = AccountDirectory::new(self.sink.accounts().await?);
        log::debug!("account directory holds {} accounts", directory.len());

        let remote: HashMap<String, RemoteTransaction> = self
            .sink
            .transactions_since(cutoff)
            .await?
            .into_iter()
            .filter_map(|t| t.external_reference.clone().map(|r| (r, t)))
            .collect();

        let builder = TransactionBodyBuilder::from_config(self.config);
        let strategy = TransactionStrategy::from_config(self.config);
        let normalizer = CurrencyNormalizer::new(&directory, &self.config.foreign_currency_tag);
        let engine = ReconciliationEngine::new(
            self.sink,
            &strategy,
            &builder,
            normalizer,
            cutoff,
            self.config.dry_run,
        );

        let mut report = SyncReport::default();
        for expense in self.source.expenses_updated_since(cutoff).await? {
            if expense.deleted_at.is_some() {
                log::debug!("ignoring deleted expense '{}'", expense.description);
                continue;
            }
            if expense.is_payment {
                log::debug!("ignoring settlement payment '{}'", expense.description);
                continue;
            }

            let share = expense
                .share_for(user)
                .ok_or_else(|| SyncError::Validation {
                    message: format!(
                        "expense {} '{}' has no share for user {}",
                        expense.id, expense.description, user
                    ),
                })?;
            if share.owed.is_zero() {
                log::debug!("nothing owed for '{}'", expense.description);
                continue;
            }

            let comments = self.source.comments(expense.id).await?;
            match resolve_directive(&expense, &comments, user) {
                Directive::Unresolved => {
                    log::warn!(
                        "cannot classify expense '{}' for {} {} on {}; left for manual handling",
                        expense.description,
                        expense.currency_code,
                        share.owed,
                        expense.date.date_naive()
                    );
                    report.skip(
                        &expense.description,
                        &share.owed.to_string(),
                        &expense.currency_code,
                        &expense.date.date_naive().to_string(),
                    );
                }
                Directive::Resolved(overrides) => {
                    let decisions = engine
                        .process_expense(&expense, share, &overrides, &remote)
                        .await?;
                    for decision in decisions {
                        report.record(decision);
                    }
                }
            }
        }

        Ok(report)
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    struct FakeSource {
        user: i64,
        expenses: Vec<ExpenseRecord>,
        comments: HashMap<i64, Vec<Comment>>,
    }

    #[async_trait]
    impl ExpenseSource for FakeSource {
        async fn current_user(&self) -> Result<i64, SyncError> {
            Ok(self.user)
        }

        async fn expenses_updated_since(
            &self,
            _since: DateTime<Utc>,
        ) -> Result<Vec<ExpenseRecord>, SyncError> {
            Ok(self.expenses.clone())
        }

        async fn comments(&self, expense_id: i64) -> Result<Vec<Comment>, SyncError> {
            Ok(self.comments.get(&expense_id).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct FakeSink {
        accounts: Vec<AccountInfo>,
        prefetched: Vec<RemoteTransaction>,
        created: Mutex<Vec<TransactionDraft>>,
        updated: Mutex<Vec<(String, TransactionDraft)>>,
    }

    #[async_trait]
    impl LedgerSink for FakeSink {
        async fn accounts(&self) -> Result<Vec<AccountInfo>, SyncError> {
            Ok(self.accounts.clone())
        }

        async fn transactions_since(
            &self,
            _start: DateTime<Utc>,
        ) -> Result<Vec<RemoteTransaction>, SyncError> {
            Ok(self.prefetched.clone())
        }

        async fn search_by_reference(
            &self,
            _reference: &str,
        ) -> Result<Vec<RemoteTransaction>, SyncError> {
            Ok(Vec::new())
        }

        async fn create(&self, draft: &TransactionDraft) -> Result<(), SyncError> {
            self.created.lock().unwrap().push(draft.clone());
            Ok(())
        }

        async fn update(&self, id: &str, draft: &TransactionDraft) -> Result<(), SyncError> {
            self.updated
                .lock()
                .unwrap()
                .push((id.to_string(), draft.clone()));
            Ok(())
        }
    }

    const USER: i64 = 12345;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 9, 11, 8, 0, 0).unwrap()
    }

    fn config() -> SyncConfig {
        SyncConfig {
            window_days: 1,
            dry_run: false,
            default_category: None,
            default_spend_account: "Amex".to_string(),
            default_transfer_account: "Splitwise Wallet".to_string(),
            balance_account: String::new(),
            foreign_currency_tag: "fix-currency-mismatch".to_string(),
        }
    }

    fn usd_accounts() -> Vec<AccountInfo> {
        vec![
            AccountInfo {
                name: "Amex".to_string(),
                currency_code: "USD".to_string(),
            },
            AccountInfo {
                name: "Splitwise Wallet".to_string(),
                currency_code: "USD".to_string(),
            },
        ]
    }

    fn expense(
        id: i64,
        description: &str,
        details: Option<&str>,
        owed: &str,
        paid: &str,
    ) -> ExpenseRecord {
        let instant = Utc.with_ymd_and_hms(2023, 9, 10, 12, 0, 0).unwrap();
        let owed: Decimal = owed.parse().unwrap();
        let paid: Decimal = paid.parse().unwrap();
        ExpenseRecord {
            id,
            description: description.to_string(),
            currency_code: "USD".to_string(),
            date: instant,
            created_at: instant,
            updated_at: instant,
            details: details.map(|d| d.to_string()),
            deleted_at: None,
            is_payment: false,
            created_by: USER,
            updated_by: None,
            category: "General".to_string(),
            shares: vec![ShareRecord {
                user_id: USER,
                owed,
                paid,
                net_balance: paid - owed,
            }],
        }
    }

    /// Render a committed draft the way the remote would report it back,
    /// with trailing-zero and timezone-offset noise
    fn remote_echo(draft: &TransactionDraft, id: &str) -> RemoteTransaction {
        RemoteTransaction {
            id: id.to_string(),
            external_reference: Some(draft.external_reference.clone()),
            kind: Some(draft.kind.to_string()),
            amount: draft.amount.map(|a| format!("{}0000", a)),
            foreign_amount: draft.foreign_amount.map(|a| a.to_string()),
            foreign_currency_code: draft.foreign_currency_code.clone(),
            date: Some(draft.date.format("%Y-%m-%dT%H:%M:%S+00:00").to_string()),
            payment_date: Some(
                draft
                    .payment_date
                    .format("%Y-%m-%dT%H:%M:%S+00:00")
                    .to_string(),
            ),
            description: Some(draft.description.clone()),
            notes: Some(draft.notes.clone()),
            source_name: Some(draft.source_name.clone()),
            destination_name: Some(draft.destination_name.clone()),
            category_name: Some(draft.category_name.clone()),
            tags: draft.tags.clone(),
        }
    }

    #[tokio::test]
    async fn test_end_to_end_dinner_example() {
        let source = FakeSource {
            user: USER,
            expenses: vec![expense(
                67890,
                "Dinner",
                Some("firefly/Groceries/Dinner split"),
                "25.00",
                "0.00",
            )],
            comments: HashMap::new(),
        };
        let sink = FakeSink {
            accounts: usd_accounts(),
            ..Default::default()
        };

        let cfg = config();
        let report = Synchronizer::new(&source, &sink, &cfg)
            .run(now())
            .await
            .unwrap();

        assert_eq!(report.created, 1);
        let created = sink.created.lock().unwrap();
        let draft = &created[0];
        assert_eq!(draft.destination_name, "Groceries");
        assert_eq!(draft.category_name, "Dinner split");
        assert_eq!(draft.source_name, "Splitwise Wallet");
        assert_eq!(draft.amount, Some("25.00".parse().unwrap()));
        assert_eq!(draft.kind, TransactionKind::Withdrawal);
        assert_eq!(draft.description, "Dinner");
    }

    #[tokio::test]
    async fn test_unresolved_expense_is_skipped_not_fatal() {
        let source = FakeSource {
            user: USER,
            expenses: vec![
                expense(1, "Mystery", Some("just some notes"), "10.00", "10.00"),
                expense(2, "Marked", Some("firefly"), "10.00", "10.00"),
            ],
            comments: HashMap::new(),
        };
        let sink = FakeSink {
            accounts: usd_accounts(),
            ..Default::default()
        };

        let cfg = config();
        let report = Synchronizer::new(&source, &sink, &cfg)
            .run(now())
            .await
            .unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].description, "Mystery");
        assert_eq!(report.skipped[0].currency, "USD");
        assert_eq!(report.skipped[0].amount, "10.00");
    }

    #[tokio::test]
    async fn test_directive_from_comment_applies() {
        let mut comments = HashMap::new();
        comments.insert(
            2,
            vec![Comment {
                author_id: 777,
                text: "firefly/Category2/Description2".to_string(),
                posted_at: Utc.with_ymd_and_hms(2023, 9, 10, 13, 0, 0).unwrap(),
            }],
        );
        let source = FakeSource {
            user: USER,
            expenses: vec![expense(2, "Expense 2", Some("plain details"), "10.00", "10.00")],
            comments,
        };
        let sink = FakeSink {
            accounts: usd_accounts(),
            ..Default::default()
        };

        let cfg = config();
        Synchronizer::new(&source, &sink, &cfg).run(now()).await.unwrap();

        let created = sink.created.lock().unwrap();
        assert_eq!(created[0].destination_name, "Category2");
        assert_eq!(created[0].category_name, "Description2");
    }

    #[tokio::test]
    async fn test_payments_deleted_and_unowed_are_ignored() {
        let mut payment = expense(1, "Settle up", Some("firefly"), "10.00", "10.00");
        payment.is_payment = true;
        let mut deleted = expense(2, "Deleted", Some("firefly"), "10.00", "10.00");
        deleted.deleted_at = Some(now());
        let unowed = expense(3, "Not mine", Some("firefly"), "0.00", "0.00");

        let source = FakeSource {
            user: USER,
            expenses: vec![payment, deleted, unowed],
            comments: HashMap::new(),
        };
        let sink = FakeSink {
            accounts: usd_accounts(),
            ..Default::default()
        };

        let cfg = config();
        let report = Synchronizer::new(&source, &sink, &cfg)
            .run(now())
            .await
            .unwrap();

        assert_eq!(report.summary(), "0 created, 0 updated, 0 unchanged, 0 skipped for manual handling");
        assert!(sink.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_share_is_a_validation_error() {
        let mut exp = expense(1, "Odd one", Some("firefly"), "10.00", "10.00");
        exp.shares[0].user_id = 999;

        let source = FakeSource {
            user: USER,
            expenses: vec![exp],
            comments: HashMap::new(),
        };
        let sink = FakeSink {
            accounts: usd_accounts(),
            ..Default::default()
        };

        let cfg = config();
        let err = Synchronizer::new(&source, &sink, &cfg)
            .run(now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let expenses = vec![
            expense(1, "Dinner", Some("firefly/Groceries"), "25.00", "0.00"),
            expense(2, "Taxi", Some("firefly"), "8.40", "8.40"),
        ];
        let source = FakeSource {
            user: USER,
            expenses: expenses.clone(),
            comments: HashMap::new(),
        };
        let sink = FakeSink {
            accounts: usd_accounts(),
            ..Default::default()
        };

        let cfg = config();
        let first = Synchronizer::new(&source, &sink, &cfg)
            .run(now())
            .await
            .unwrap();
        assert_eq!(first.created, 2);

        // Echo the committed drafts back as remote state, noise included.
        let created = sink.created.lock().unwrap().clone();
        let second_sink = FakeSink {
            accounts: usd_accounts(),
            prefetched: created
                .iter()
                .enumerate()
                .map(|(i, d)| remote_echo(d, &i.to_string()))
                .collect(),
            ..Default::default()
        };

        let second = Synchronizer::new(&source, &second_sink, &cfg)
            .run(now())
            .await
            .unwrap();
        assert!(!second.wrote_anything());
        assert_eq!(second.unchanged, 2);
        assert!(second_sink.created.lock().unwrap().is_empty());
        assert!(second_sink.updated.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_balance_mode_run_creates_both_legs() {
        let mut cfg = config();
        cfg.balance_account = "Splitwise Balance".to_string();

        let mut accounts = usd_accounts();
        accounts.push(AccountInfo {
            name: "Splitwise Balance".to_string(),
            currency_code: "USD".to_string(),
        });

        let source = FakeSource {
            user: USER,
            expenses: vec![expense(5, "Groceries run", Some("firefly"), "30.00", "90.00")],
            comments: HashMap::new(),
        };
        let sink = FakeSink {
            accounts,
            ..Default::default()
        };

        let report = Synchronizer::new(&source, &sink, &cfg)
            .run(now())
            .await
            .unwrap();
        assert_eq!(report.created, 2);

        let created = sink.created.lock().unwrap();
        assert_eq!(created[0].amount, Some("90.00".parse().unwrap()));
        assert_eq!(created[1].kind, TransactionKind::Deposit);
        assert_eq!(created[1].destination_name, "Splitwise Balance");
        assert_eq!(created[1].amount, Some("60.00".parse().unwrap()));
    }
}
