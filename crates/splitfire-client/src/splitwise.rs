//! Splitwise API client
//!
//! Implements the [`ExpenseSource`] port over the v3.0 REST API. Expense
//! listings are paged with offset/limit; comments are returned in
//! chronological order regardless of how the API sorts them.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use splitfire_core::{Comment, ExpenseRecord, ExpenseSource, ShareRecord, SyncError};

use crate::error::ClientError;

const DEFAULT_BASE_URL: &str = "https://secure.splitwise.com/api/v3.0";

/// Expenses fetched per page
const PAGE_SIZE: usize = 20;

/// Splitwise REST client
pub struct SplitwiseClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SplitwiseClient {
    /// Create a client against the public API
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Create a client against a different endpoint
    pub fn with_base_url(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(query)
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

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ExpenseSource for SplitwiseClient {
    async fn current_user(&self) -> Result<i64, SyncError> {
        let envelope: CurrentUserEnvelope = self.get_json("get_current_user", &[]).await?;
        Ok(envelope.user.id)
    }

    async fn expenses_updated_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<ExpenseRecord>, SyncError> {
        let mut all = Vec::new();
        let mut offset = 0usize;
        loop {
            let envelope: ExpensesEnvelope = self
                .get_json(
                    "get_expenses",
                    &[
                        ("updated_after", since.to_rfc3339()),
                        ("offset", offset.to_string()),
                        ("limit", PAGE_SIZE.to_string()),
                    ],
                )
                .await?;

            if envelope.expenses.is_empty() {
                break;
            }
            for dto in envelope.expenses {
                all.push(expense_from_dto(dto)?);
            }
            offset += PAGE_SIZE;
        }

        log::debug!("fetched {} expenses from splitwise", all.len());
        Ok(all)
    }

    async fn comments(&self, expense_id: i64) -> Result<Vec<Comment>, SyncError> {
        let envelope: CommentsEnvelope = self
            .get_json("get_comments", &[("expense_id", expense_id.to_string())])
            .await?;

        let mut comments = envelope
            .comments
            .into_iter()
            .map(comment_from_dto)
            .collect::<Result<Vec<_>, _>>()?;
        comments.sort_by_key(|c| c.posted_at);
        Ok(comments)
    }
}

// ==================== Wire Types ====================

#[derive(Debug, Deserialize)]
struct CurrentUserEnvelope {
    user: UserRef,
}

#[derive(Debug, Deserialize)]
struct UserRef {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct ExpensesEnvelope {
    expenses: Vec<ExpenseDto>,
}

#[derive(Debug, Deserialize)]
struct ExpenseDto {
    id: i64,
    description: String,
    currency_code: Option<String>,
    date: String,
    created_at: String,
    updated_at: String,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    deleted_at: Option<String>,
    #[serde(default)]
    payment: bool,
    created_by: Option<UserRef>,
    #[serde(default)]
    updated_by: Option<UserRef>,
    #[serde(default)]
    category: Option<CategoryDto>,
    #[serde(default)]
    users: Vec<ExpenseUserDto>,
}

#[derive(Debug, Deserialize)]
struct CategoryDto {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ExpenseUserDto {
    user: UserRef,
    owed_share: String,
    paid_share: String,
    net_balance: String,
}

#[derive(Debug, Deserialize)]
struct CommentsEnvelope {
    comments: Vec<CommentDto>,
}

#[derive(Debug, Deserialize)]
struct CommentDto {
    content: String,
    user: UserRef,
    created_at: String,
}

// ==================== Conversions ====================

/// Parse an API timestamp; plain dates are read as midnight UTC
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ClientError> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| ClientError::decode(format!("unparseable timestamp '{}'", value)))
}

fn parse_amount(value: &str) -> Result<Decimal, ClientError> {
    value
        .parse()
        .map_err(|_| ClientError::decode(format!("unparseable amount '{}'", value)))
}

fn expense_from_dto(dto: ExpenseDto) -> Result<ExpenseRecord, ClientError> {
    let created_by = dto
        .created_by
        .ok_or_else(|| ClientError::decode(format!("expense {} has no creator", dto.id)))?;
    let currency_code = dto
        .currency_code
        .ok_or_else(|| ClientError::decode(format!("expense {} has no currency", dto.id)))?;

    let shares = dto
        .users
        .into_iter()
        .map(|u| {
            Ok(ShareRecord {
                user_id: u.user.id,
                owed: parse_amount(&u.owed_share)?,
                paid: parse_amount(&u.paid_share)?,
                net_balance: parse_amount(&u.net_balance)?,
            })
        })
        .collect::<Result<Vec<_>, ClientError>>()?;

    Ok(ExpenseRecord {
        id: dto.id,
        description: dto.description,
        currency_code,
        date: parse_timestamp(&dto.date)?,
        created_at: parse_timestamp(&dto.created_at)?,
        updated_at: parse_timestamp(&dto.updated_at)?,
        details: dto.details,
        deleted_at: dto.deleted_at.as_deref().map(parse_timestamp).transpose()?,
        is_payment: dto.payment,
        created_by: created_by.id,
        updated_by: dto.updated_by.map(|u| u.id),
        category: dto.category.map(|c| c.name).unwrap_or_default(),
        shares,
    })
}

fn comment_from_dto(dto: CommentDto) -> Result<Comment, ClientError> {
    Ok(Comment {
        author_id: dto.user.id,
        text: dto.content,
        posted_at: parse_timestamp(&dto.created_at)?,
    })
}

// ==================== Tests ====================
