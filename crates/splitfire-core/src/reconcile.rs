//! Reconciliation of drafts against the remote ledger
//!
//! Every draft carries a reference that is stable in the originating expense
//! and leg index. A draft whose reference is already present remotely is
//! field-diffed and updated only when something real changed; amounts are
//! compared numerically and dates as instants, so representational noise
//! (trailing zeros, timezone-offset spelling) never triggers a write.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::builder::TransactionBodyBuilder;
use crate::currency::CurrencyNormalizer;
use crate::error::SyncError;
use crate::models::{ExpenseRecord, RemoteTransaction, ShareRecord, TransactionDraft};
use crate::strategy::TransactionStrategy;
use crate::LedgerSink;

/// Web address of an expense; stable in the expense id and usable as an
/// audit link from the ledger back to the expense source
const EXPENSE_URL: &str = "https://secure.splitwise.com/expenses";

/// Suffix separating follow-up legs from the first one
const LEG_SUFFIX: &str = "-balance_transfer-";

/// Reference of an expense's first draft
pub fn base_reference(expense_id: i64) -> String {
    format!("{}/{}", EXPENSE_URL, expense_id)
}

/// Reference of the draft at the given leg index
pub fn leg_reference(base: &str, index: usize) -> String {
    if index == 0 {
        base.to_string()
    } else {
        format!("{}{}{}", base, LEG_SUFFIX, index)
    }
}

/// What the engine decided to do with one draft
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// Draft was new and has been created remotely
    Created,
    /// Remote transaction existed but differed; it has been updated
    Updated,
    /// Remote transaction already matches the draft
    Unchanged,
}

/// Parse a remote timestamp; date-only values are read as midnight UTC
fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn text_differs(remote: &Option<String>, local: &str) -> bool {
    remote.as_deref().unwrap_or("") != local
}

fn amount_differs(remote: &Option<String>, local: Option<Decimal>) -> bool {
    match (remote.as_deref().and_then(|s| s.parse::<Decimal>().ok()), local) {
        (Some(r), Some(l)) => r != l,
        (None, None) => false,
        _ => true,
    }
}

/// Foreign amounts compare like amounts, except that the remote reports an
/// unset foreign side as null or zero depending on version
fn foreign_amount_differs(remote: &Option<String>, local: Option<Decimal>) -> bool {
    let remote_value = remote
        .as_deref()
        .and_then(|s| s.parse::<Decimal>().ok())
        .filter(|v| !v.is_zero());
    match (remote_value, local) {
        (Some(r), Some(l)) => r != l,
        (None, None) => false,
        _ => true,
    }
}

fn instant_differs(remote: &Option<String>, local: DateTime<Utc>) -> bool {
    match remote.as_deref().and_then(parse_instant) {
        Some(instant) => instant != local,
        None => true,
    }
}

/// Whether any tracked field of the draft differs from the remote snapshot
pub fn draft_differs(draft: &TransactionDraft, remote: &RemoteTransaction) -> bool {
    text_differs(&remote.kind, &draft.kind.to_string())
        || text_differs(&remote.source_name, &draft.source_name)
        || text_differs(&remote.destination_name, &draft.destination_name)
        || text_differs(&remote.category_name, &draft.category_name)
        || text_differs(&remote.description, &draft.description)
        || text_differs(&remote.notes, &draft.notes)
        || amount_differs(&remote.amount, draft.amount)
        || foreign_amount_differs(&remote.foreign_amount, draft.foreign_amount)
        || text_differs(
            &remote.foreign_currency_code,
            draft.foreign_currency_code.as_deref().unwrap_or(""),
        )
        || instant_differs(&remote.date, draft.date)
        || instant_differs(&remote.payment_date, draft.payment_date)
        || draft.tags.iter().any(|t| !remote.tags.contains(t))
}

/// Maps drafts to create/update/no-op decisions against the remote ledger
pub struct ReconciliationEngine<'a> {
    sink: &'a dyn LedgerSink,
    strategy: &'a TransactionStrategy,
    builder: &'a TransactionBodyBuilder,
    normalizer: CurrencyNormalizer<'a>,
    cutoff: DateTime<Utc>,
    dry_run: bool,
}

impl<'a> ReconciliationEngine<'a> {
    /// Create an engine for one run
    pub fn new(
        sink: &'a dyn LedgerSink,
        strategy: &'a TransactionStrategy,
        builder: &'a TransactionBodyBuilder,
        normalizer: CurrencyNormalizer<'a>,
        cutoff: DateTime<Utc>,
        dry_run: bool,
    ) -> Self {
        Self {
            sink,
            strategy,
            builder,
            normalizer,
            cutoff,
            dry_run,
        }
    }

    /// Reconcile all drafts of one expense, in emission order.
    ///
    /// A failure aborts the expense's remaining legs; a later run repairs a
    /// half-committed pair through the reference keys.
    pub async fn process_expense(
        &self,
        expense: &ExpenseRecord,
        share: &ShareRecord,
        overrides: &[String],
        remote: &HashMap<String, RemoteTransaction>,
    ) -> Result<Vec<SyncDecision>, SyncError> {
        let drafts = self
            .strategy
            .expand(self.builder, &self.normalizer, expense, share, overrides)?;

        let base = base_reference(expense.id);
        let mut decisions = Vec::with_capacity(drafts.len());
        for (index, mut draft) in drafts.into_iter().enumerate() {
            draft.external_reference = leg_reference(&base, index);
            let decision = self.reconcile_draft(expense, draft, remote).await?;
            decisions.push(decision);
        }

        Ok(decisions)
    }

    async fn reconcile_draft(
        &self,
        expense: &ExpenseRecord,
        mut draft: TransactionDraft,
        remote: &HashMap<String, RemoteTransaction>,
    ) -> Result<SyncDecision, SyncError> {
        if let Some(existing) = remote.get(&draft.external_reference) {
            if !draft_differs(&draft, existing) {
                self.report(expense, &draft, SyncDecision::Unchanged);
                return Ok(SyncDecision::Unchanged);
            }
            merge_tags(&mut draft, existing);
            return self.update(expense, existing.id.clone(), draft).await;
        }

        // An expense older than the sync window would not show up in the
        // pre-fetched map even when its transaction exists, so ask the
        // ledger directly before creating a duplicate.
        if expense.created_at < self.cutoff || expense.date < self.cutoff {
            let matches = self
                .sink
                .search_by_reference(&draft.external_reference)
                .await?;
            if let Some(first) = matches.first() {
                if matches.len() > 1 {
                    log::warn!(
                        "{} transactions share reference {}; updating the first only",
                        matches.len(),
                        draft.external_reference
                    );
                }
                merge_tags(&mut draft, first);
                return self.update(expense, first.id.clone(), draft).await;
            }
        }

        self.create(expense, draft).await
    }

    async fn create(
        &self,
        expense: &ExpenseRecord,
        draft: TransactionDraft,
    ) -> Result<SyncDecision, SyncError> {
        if !self.dry_run {
            self.sink.create(&draft).await?;
        }
        self.report(expense, &draft, SyncDecision::Created);
        Ok(SyncDecision::Created)
    }

    async fn update(
        &self,
        expense: &ExpenseRecord,
        id: String,
        draft: TransactionDraft,
    ) -> Result<SyncDecision, SyncError> {
        if !self.dry_run {
            self.sink.update(&id, &draft).await?;
        }
        self.report(expense, &draft, SyncDecision::Updated);
        Ok(SyncDecision::Updated)
    }

    fn report(&self, expense: &ExpenseRecord, draft: &TransactionDraft, decision: SyncDecision) {
        let action = match decision {
            SyncDecision::Created => "created",
            SyncDecision::Updated => "updated",
            SyncDecision::Unchanged => "unchanged",
        };
        let prefix = if self.dry_run { "dry-run: " } else { "" };
        log::info!(
            "{}{} '{}' for {} {} on {} ({})",
            prefix,
            action,
            draft.description,
            expense.currency_code,
            draft
                .amount
                .map(|a| a.to_string())
                .unwrap_or_else(|| "?".to_string()),
            draft.payment_date.date_naive(),
            draft.external_reference
        );
    }
}

/// Keep tags other tools or humans put on the remote transaction
fn merge_tags(draft: &mut TransactionDraft, remote: &RemoteTransaction) {
    for tag in &remote.tags {
        draft.add_tag(tag);
    }
}

// ==================== Tests ====================
