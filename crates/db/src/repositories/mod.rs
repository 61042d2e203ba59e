use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use thiserror::Error;

use roomquote_core::domain::discount::DiscountRule;
use roomquote_core::domain::quote::{Quote, QuoteId, QuoteNumber, QuoteStatus};
use roomquote_core::domain::room_type::RoomType;

pub mod discount_rule;
pub mod memory;
pub mod notification;
pub mod quote;
pub mod room_type;

pub use discount_rule::SqlDiscountRuleRepository;
pub use memory::{
    InMemoryDiscountRuleRepository, InMemoryNotificationLogRepository, InMemoryQuoteRepository,
    InMemoryRoomTypeRepository,
};
pub use notification::SqlNotificationLogRepository;
pub use quote::SqlQuoteRepository;
pub use room_type::SqlRoomTypeRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("quote {number} is {}, expected {}", .actual.as_str(), .expected.as_str())]
    StatusChanged { number: String, expected: QuoteStatus, actual: QuoteStatus },
}

/// Narrowing criteria for quote listings. Results are newest first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuoteFilter {
    pub status: Option<QuoteStatus>,
    pub client_email: Option<String>,
    pub limit: Option<u32>,
}

impl QuoteFilter {
    pub fn matches(&self, quote: &Quote) -> bool {
        self.status.map_or(true, |status| quote.status == status)
            && self
                .client_email
                .as_deref()
                .map_or(true, |email| quote.client.email.eq_ignore_ascii_case(email))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationOutcome {
    Delivered,
    Failed,
}

impl NotificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for NotificationOutcome {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "delivered" => Ok(Self::Delivered),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown notification outcome `{other}`")),
        }
    }
}

/// One delivery attempt of one quote over one channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub quote_id: QuoteId,
    pub quote_number: QuoteNumber,
    pub channel: String,
    pub outcome: NotificationOutcome,
    pub error_message: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn new(
        quote: &Quote,
        channel: &str,
        outcome: NotificationOutcome,
        error_message: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            quote_id: quote.id.clone(),
            quote_number: quote.quote_number.clone(),
            channel: channel.to_string(),
            outcome,
            error_message,
            attempted_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotificationFilter {
    pub outcome: Option<NotificationOutcome>,
    pub limit: Option<u32>,
}

#[async_trait]
pub trait RoomTypeRepository: Send + Sync {
    /// Every stored room type, inactive ones included.
    async fn load_room_types(&self) -> Result<Vec<RoomType>, RepositoryError>;
    async fn save(&self, room_type: RoomType) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait DiscountRuleRepository: Send + Sync {
    async fn load_discount_rules(&self) -> Result<Vec<DiscountRule>, RepositoryError>;
    async fn save(&self, rule: DiscountRule) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn save_quote(&self, quote: Quote) -> Result<QuoteId, RepositoryError>;
    async fn find_by_number(&self, number: &QuoteNumber) -> Result<Option<Quote>, RepositoryError>;
    async fn list_quotes(&self, filter: &QuoteFilter) -> Result<Vec<Quote>, RepositoryError>;

    /// Reserves the next quote sequence value. Values are strictly increasing
    /// and never reused, even if the quote using one is never saved.
    async fn next_quote_sequence(&self) -> Result<u64, RepositoryError>;

    /// Moves a quote from `expected` to `status`. Fails with
    /// `StatusChanged` when the stored status is no longer `expected`.
    async fn update_status(
        &self,
        number: &QuoteNumber,
        expected: QuoteStatus,
        status: QuoteStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait NotificationLogRepository: Send + Sync {
    async fn record(&self, record: NotificationRecord) -> Result<(), RepositoryError>;
    async fn list(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<NotificationRecord>, RepositoryError>;
}

fn column<T>(row: &sqlx::sqlite::SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn decimal_column(row: &sqlx::sqlite::SqliteRow, name: &str) -> Result<Decimal, RepositoryError> {
    let raw: String = column(row, name)?;
    Decimal::from_str(&raw)
        .map_err(|e| RepositoryError::Decode(format!("column {name} value `{raw}`: {e}")))
}

fn timestamp_column(
    row: &sqlx::sqlite::SqliteRow,
    name: &str,
) -> Result<DateTime<Utc>, RepositoryError> {
    let raw: String = column(row, name)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("column {name} value `{raw}`: {e}")))
}
