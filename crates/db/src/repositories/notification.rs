use sqlx::{QueryBuilder, Sqlite};

use roomquote_core::domain::quote::{QuoteId, QuoteNumber};

use super::{
    column, timestamp_column, NotificationFilter, NotificationLogRepository, NotificationOutcome,
    NotificationRecord, RepositoryError,
};
use crate::DbPool;

pub struct SqlNotificationLogRepository {
    pool: DbPool,
}

impl SqlNotificationLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<NotificationRecord, RepositoryError> {
    let outcome: String = column(row, "outcome")?;

    Ok(NotificationRecord {
        id: column(row, "id")?,
        quote_id: QuoteId(column(row, "quote_id")?),
        quote_number: QuoteNumber(column(row, "quote_number")?),
        channel: column(row, "channel")?,
        outcome: outcome.parse::<NotificationOutcome>().map_err(RepositoryError::Decode)?,
        error_message: column(row, "error_message")?,
        attempted_at: timestamp_column(row, "attempted_at")?,
    })
}

#[async_trait::async_trait]
impl NotificationLogRepository for SqlNotificationLogRepository {
    async fn record(&self, record: NotificationRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO notification_delivery (id, quote_id, quote_number, channel, outcome,
                                                error_message, attempted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.quote_id.0)
        .bind(&record.quote_number.0)
        .bind(&record.channel)
        .bind(record.outcome.as_str())
        .bind(record.error_message.as_deref())
        .bind(record.attempted_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<NotificationRecord>, RepositoryError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, quote_id, quote_number, channel, outcome, error_message, attempted_at
             FROM notification_delivery WHERE 1 = 1",
        );
        if let Some(outcome) = filter.outcome {
            builder.push(" AND outcome = ").push_bind(outcome.as_str());
        }
        builder.push(" ORDER BY attempted_at DESC, id ASC");
        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }
}
