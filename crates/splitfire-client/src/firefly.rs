//! Firefly III API client
//!
//! Implements the [`LedgerSink`] port over the v1 REST API. Listing and
//! search endpoints are paged; splitfire only ever writes single-split
//! transaction groups, and reads back the first split of whatever it finds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use splitfire_core::{AccountInfo, LedgerSink, RemoteTransaction, SyncError, TransactionDraft};

use crate::error::ClientError;

/// Firefly III REST client
pub struct FireflyClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl FireflyClient {
    /// Create a client for the given instance
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        page: usize,
    ) -> Result<PageEnvelope<T>, ClientError> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .query(query)
            .query(&[("page", page.to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                operation: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<PageEnvelope<T>>().await?)
    }

    /// Drain every page of a listing endpoint
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ClientError> {
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            let envelope = self.get_page::<T>(path, query, page).await?;
            let empty = envelope.data.is_empty();
            all.extend(envelope.data);
            if empty || !has_more(&envelope.meta, page) {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    async fn write(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<(), SyncError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(ClientError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                operation: operation.to_string(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Ok(())
    }
}

#[async_trait]
impl LedgerSink for FireflyClient {
    async fn accounts(&self) -> Result<Vec<AccountInfo>, SyncError> {
        let accounts: Vec<AccountDto> = self.get_all("accounts", &[]).await?;
        Ok(accounts
            .into_iter()
            .filter_map(|a| {
                let currency_code = a.attributes.currency_code?;
                Some(AccountInfo {
                    name: a.attributes.name,
                    currency_code,
                })
            })
            .collect())
    }

    async fn transactions_since(
        &self,
        start: DateTime<Utc>,
    ) -> Result<Vec<RemoteTransaction>, SyncError> {
        let groups: Vec<GroupDto> = self
            .get_all(
                "transactions",
                &[("start", start.format("%Y-%m-%d").to_string())],
            )
            .await?;
        Ok(groups.into_iter().filter_map(remote_from_group).collect())
    }

    async fn search_by_reference(
        &self,
        reference: &str,
    ) -> Result<Vec<RemoteTransaction>, SyncError> {
        let groups: Vec<GroupDto> = self
            .get_all(
                "search/transactions",
                &[("query", format!("external_url_is:\"{}\"", reference))],
            )
            .await?;
        Ok(groups.into_iter().filter_map(remote_from_group).collect())
    }

    async fn create(&self, draft: &TransactionDraft) -> Result<(), SyncError> {
        let payload = TransactionPayload {
            error_if_duplicate_hash: true,
            transactions: vec![split_payload(draft)?],
        };
        self.write(
            "create",
            self.http.post(self.url("transactions")).json(&payload),
        )
        .await
    }

    async fn update(&self, id: &str, draft: &TransactionDraft) -> Result<(), SyncError> {
        let payload = UpdatePayload {
            transactions: vec![split_payload(draft)?],
        };
        self.write(
            "update",
            self.http
                .put(self.url(&format!("transactions/{}", id)))
                .json(&payload),
        )
        .await
    }
}

/// Whether the listing has pages beyond the one just fetched
fn has_more(meta: &Option<MetaDto>, fetched_page: usize) -> bool {
    match meta {
        Some(meta) => fetched_page < meta.pagination.total_pages,
        None => false,
    }
}

// ==================== Wire Types ====================

#[derive(Debug, Deserialize)]
struct PageEnvelope<T> {
    data: Vec<T>,
    #[serde(default)]
    meta: Option<MetaDto>,
}

#[derive(Debug, Deserialize)]
struct MetaDto {
    pagination: PaginationDto,
}

#[derive(Debug, Deserialize)]
struct PaginationDto {
    total_pages: usize,
}

#[derive(Debug, Deserialize)]
struct AccountDto {
    attributes: AccountAttributes,
}

#[derive(Debug, Deserialize)]
struct AccountAttributes {
    name: String,
    currency_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroupDto {
    id: String,
    attributes: GroupAttributes,
}

#[derive(Debug, Deserialize)]
struct GroupAttributes {
    transactions: Vec<SplitDto>,
}

#[derive(Debug, Deserialize)]
struct SplitDto {
    #[serde(rename = "type")]
    kind: Option<String>,
    amount: Option<String>,
    foreign_amount: Option<String>,
    foreign_currency_code: Option<String>,
    date: Option<String>,
    payment_date: Option<String>,
    description: Option<String>,
    notes: Option<String>,
    source_name: Option<String>,
    destination_name: Option<String>,
    category_name: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    external_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct TransactionPayload {
    error_if_duplicate_hash: bool,
    transactions: Vec<SplitPayload>,
}

#[derive(Debug, Serialize)]
struct UpdatePayload {
    transactions: Vec<SplitPayload>,
}

#[derive(Debug, Serialize)]
struct SplitPayload {
    #[serde(rename = "type")]
    kind: String,
    date: String,
    payment_date: String,
    amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    foreign_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    foreign_currency_code: Option<String>,
    description: String,
    source_name: String,
    destination_name: String,
    category_name: String,
    notes: String,
    external_url: String,
    tags: Vec<String>,
}

// ==================== Conversions ====================

/// Flatten a transaction group to its first split; splitfire never writes
/// multi-split groups
fn remote_from_group(group: GroupDto) -> Option<RemoteTransaction> {
    let split = group.attributes.transactions.into_iter().next()?;
    Some(RemoteTransaction {
        id: group.id,
        external_reference: split.external_url,
        kind: split.kind,
        amount: split.amount,
        foreign_amount: split.foreign_amount,
        foreign_currency_code: split.foreign_currency_code,
        date: split.date,
        payment_date: split.payment_date,
        description: split.description,
        notes: split.notes,
        source_name: split.source_name,
        destination_name: split.destination_name,
        category_name: split.category_name,
        tags: split.tags,
    })
}

fn split_payload(draft: &TransactionDraft) -> Result<SplitPayload, SyncError> {
    let amount = draft.amount.ok_or_else(|| SyncError::Validation {
        message: format!("draft '{}' has no amount set", draft.description),
    })?;

    Ok(SplitPayload {
        kind: draft.kind.to_string(),
        date: draft.date.to_rfc3339(),
        payment_date: draft.payment_date.to_rfc3339(),
        amount: amount.to_string(),
        foreign_amount: draft.foreign_amount.map(|a| a.to_string()),
        foreign_currency_code: draft.foreign_currency_code.clone(),
        description: draft.description.clone(),
        source_name: draft.source_name.clone(),
        destination_name: draft.destination_name.clone(),
        category_name: draft.category_name.clone(),
        notes: draft.notes.clone(),
        external_url: draft.external_reference.clone(),
        tags: draft.tags.clone(),
    })
}

// ==================== Tests ====================
