use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

use roomquote_core::domain::discount::DiscountRuleId;
use roomquote_core::domain::quote::{
    AppliedDiscount, ClientContact, Quote, QuoteId, QuoteLine, QuoteNumber, QuoteStatus,
};
use roomquote_core::domain::room_type::RoomTypeId;

use super::{column, decimal_column, timestamp_column, QuoteFilter, QuoteRepository, RepositoryError};
use crate::DbPool;

const QUOTE_COLUMNS: &str = "id, quote_number, sequence, client_name, client_email, client_phone,
     notes, subtotal, discount_total, total, currency, status, created_at, updated_at";

pub struct SqlQuoteRepository {
    pool: DbPool,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_children(&self, quote: &mut Quote) -> Result<(), RepositoryError> {
        let lines = sqlx::query(
            "SELECT room_type_id, room_type_name, area, rate, computed_price
             FROM quote_line WHERE quote_id = ? ORDER BY line_no ASC",
        )
        .bind(&quote.id.0)
        .fetch_all(&self.pool)
        .await?;

        quote.line_items = lines
            .iter()
            .map(|row| {
                Ok(QuoteLine {
                    room_type_id: RoomTypeId(column(row, "room_type_id")?),
                    room_type_name: column(row, "room_type_name")?,
                    area: decimal_column(row, "area")?,
                    rate: decimal_column(row, "rate")?,
                    computed_price: decimal_column(row, "computed_price")?,
                })
            })
            .collect::<Result<_, RepositoryError>>()?;

        let discounts = sqlx::query(
            "SELECT rule_id, label, amount
             FROM quote_discount WHERE quote_id = ? ORDER BY position ASC",
        )
        .bind(&quote.id.0)
        .fetch_all(&self.pool)
        .await?;

        quote.applied_discounts = discounts
            .iter()
            .map(|row| {
                Ok(AppliedDiscount {
                    rule_id: DiscountRuleId(column(row, "rule_id")?),
                    label: column(row, "label")?,
                    amount: decimal_column(row, "amount")?,
                })
            })
            .collect::<Result<_, RepositoryError>>()?;

        Ok(())
    }
}

fn row_to_quote_header(row: &sqlx::sqlite::SqliteRow) -> Result<Quote, RepositoryError> {
    let sequence: i64 = column(row, "sequence")?;
    let status: String = column(row, "status")?;

    Ok(Quote {
        id: QuoteId(column(row, "id")?),
        quote_number: QuoteNumber(column(row, "quote_number")?),
        sequence: u64::try_from(sequence)
            .map_err(|_| RepositoryError::Decode(format!("negative quote sequence {sequence}")))?,
        client: ClientContact {
            name: column(row, "client_name")?,
            email: column(row, "client_email")?,
            phone: column(row, "client_phone")?,
        },
        notes: column(row, "notes")?,
        line_items: Vec::new(),
        subtotal: decimal_column(row, "subtotal")?,
        applied_discounts: Vec::new(),
        discount_total: decimal_column(row, "discount_total")?,
        total: decimal_column(row, "total")?,
        currency: column(row, "currency")?,
        status: status.parse::<QuoteStatus>().map_err(RepositoryError::Decode)?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

fn sequence_to_i64(sequence: u64) -> Result<i64, RepositoryError> {
    i64::try_from(sequence)
        .map_err(|_| RepositoryError::Decode(format!("quote sequence {sequence} overflows i64")))
}

#[async_trait::async_trait]
impl QuoteRepository for SqlQuoteRepository {
    async fn save_quote(&self, quote: Quote) -> Result<QuoteId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO quote (id, quote_number, sequence, client_name, client_email, client_phone,
                                notes, subtotal, discount_total, total, currency, status,
                                created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&quote.id.0)
        .bind(&quote.quote_number.0)
        .bind(sequence_to_i64(quote.sequence)?)
        .bind(&quote.client.name)
        .bind(&quote.client.email)
        .bind(quote.client.phone.as_deref())
        .bind(quote.notes.as_deref())
        .bind(quote.subtotal.to_string())
        .bind(quote.discount_total.to_string())
        .bind(quote.total.to_string())
        .bind(&quote.currency)
        .bind(quote.status.as_str())
        .bind(quote.created_at.to_rfc3339())
        .bind(quote.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for (line_no, line) in quote.line_items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO quote_line (quote_id, line_no, room_type_id, room_type_name,
                                         area, rate, computed_price)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&quote.id.0)
            .bind(line_no as i64)
            .bind(&line.room_type_id.0)
            .bind(&line.room_type_name)
            .bind(line.area.to_string())
            .bind(line.rate.to_string())
            .bind(line.computed_price.to_string())
            .execute(&mut *tx)
            .await?;
        }

        for (position, discount) in quote.applied_discounts.iter().enumerate() {
            sqlx::query(
                "INSERT INTO quote_discount (quote_id, position, rule_id, label, amount)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&quote.id.0)
            .bind(position as i64)
            .bind(&discount.rule_id.0)
            .bind(&discount.label)
            .bind(discount.amount.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(quote.id)
    }

    async fn find_by_number(&self, number: &QuoteNumber) -> Result<Option<Quote>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {QUOTE_COLUMNS} FROM quote WHERE quote_number = ?"))
            .bind(&number.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => {
                let mut quote = row_to_quote_header(r)?;
                self.load_children(&mut quote).await?;
                Ok(Some(quote))
            }
            None => Ok(None),
        }
    }

    async fn list_quotes(&self, filter: &QuoteFilter) -> Result<Vec<Quote>, RepositoryError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {QUOTE_COLUMNS} FROM quote WHERE 1 = 1"));
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(email) = &filter.client_email {
            builder.push(" AND client_email = ").push_bind(email.clone()).push(" COLLATE NOCASE");
        }
        builder.push(" ORDER BY sequence DESC");
        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        let mut quotes = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut quote = row_to_quote_header(row)?;
            self.load_children(&mut quote).await?;
            quotes.push(quote);
        }
        Ok(quotes)
    }

    async fn next_quote_sequence(&self) -> Result<u64, RepositoryError> {
        // Single statement, so concurrent callers are serialised by SQLite's write lock.
        let value: i64 = sqlx::query_scalar(
            "INSERT INTO quote_sequence (name, value) VALUES ('quote', 1)
             ON CONFLICT(name) DO UPDATE SET value = value + 1
             RETURNING value",
        )
        .fetch_one(&self.pool)
        .await?;

        u64::try_from(value)
            .map_err(|_| RepositoryError::Decode(format!("negative quote sequence {value}")))
    }

    async fn update_status(
        &self,
        number: &QuoteNumber,
        expected: QuoteStatus,
        status: QuoteStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE quote SET status = ?, updated_at = ? WHERE quote_number = ? AND status = ?",
        )
        .bind(status.as_str())
        .bind(updated_at.to_rfc3339())
        .bind(&number.0)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM quote WHERE quote_number = ?")
                .bind(&number.0)
                .fetch_optional(&self.pool)
                .await?;
        match current {
            None => Err(RepositoryError::NotFound(format!("quote {number}"))),
            Some(raw) => Err(RepositoryError::StatusChanged {
                number: number.0.clone(),
                expected,
                actual: raw.parse::<QuoteStatus>().map_err(RepositoryError::Decode)?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use roomquote_core::domain::discount::DiscountRuleId;
    use roomquote_core::domain::quote::{
        AppliedDiscount, ClientContact, Quote, QuoteId, QuoteLine, QuoteNumber, QuoteStatus,
    };
    use roomquote_core::domain::room_type::RoomTypeId;

    use super::SqlQuoteRepository;
    use crate::repositories::{QuoteFilter, QuoteRepository, RepositoryError};
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn parse_ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).expect("valid rfc3339").with_timezone(&Utc)
    }

    fn sample_quote(sequence: u64, email: &str) -> Quote {
        Quote {
            id: QuoteId(format!("quote-{sequence}")),
            quote_number: QuoteNumber::format("Q-", 6, sequence),
            sequence,
            client: ClientContact {
                name: "Ada Client".to_string(),
                email: email.to_string(),
                phone: Some("+1 555 0100".to_string()),
            },
            notes: Some("Ground floor".to_string()),
            line_items: vec![
                QuoteLine {
                    room_type_id: RoomTypeId("standard".to_string()),
                    room_type_name: "Standard".to_string(),
                    area: Decimal::new(20, 0),
                    rate: Decimal::new(250, 2),
                    computed_price: Decimal::new(5000, 2),
                },
                QuoteLine {
                    room_type_id: RoomTypeId("standard".to_string()),
                    room_type_name: "Standard".to_string(),
                    area: Decimal::new(30, 0),
                    rate: Decimal::new(250, 2),
                    computed_price: Decimal::new(7500, 2),
                },
            ],
            subtotal: Decimal::new(12500, 2),
            applied_discounts: vec![AppliedDiscount {
                rule_id: DiscountRuleId("over-100".to_string()),
                label: "10% over 100".to_string(),
                amount: Decimal::new(1250, 2),
            }],
            discount_total: Decimal::new(1250, 2),
            total: Decimal::new(11250, 2),
            currency: "EUR".to_string(),
            status: QuoteStatus::Pending,
            created_at: parse_ts("2026-03-01T09:00:00Z"),
            updated_at: parse_ts("2026-03-01T09:00:00Z"),
        }
    }

    #[tokio::test]
    async fn sql_quote_repo_round_trips_lines_and_discounts() {
        let pool = setup_pool().await;
        let repo = SqlQuoteRepository::new(pool.clone());
        let quote = sample_quote(1, "ada@example.com");

        let id = repo.save_quote(quote.clone()).await.expect("save quote");
        assert_eq!(id, quote.id);

        let found = repo.find_by_number(&quote.quote_number).await.expect("find quote");
        assert_eq!(found, Some(quote));

        let missing =
            repo.find_by_number(&QuoteNumber("Q-999999".to_string())).await.expect("find");
        assert!(missing.is_none());

        pool.close().await;
    }

    #[tokio::test]
    async fn duplicate_quote_number_is_rejected() {
        let pool = setup_pool().await;
        let repo = SqlQuoteRepository::new(pool.clone());
        repo.save_quote(sample_quote(1, "ada@example.com")).await.expect("first save");

        let mut clash = sample_quote(1, "bob@example.com");
        clash.id = QuoteId("another-id".to_string());
        let error = repo.save_quote(clash).await.expect_err("unique quote number");
        assert!(matches!(error, RepositoryError::Database(_)));

        pool.close().await;
    }

    #[tokio::test]
    async fn list_quotes_filters_and_orders_newest_first() {
        let pool = setup_pool().await;
        let repo = SqlQuoteRepository::new(pool.clone());
        for (sequence, email) in
            [(1, "ada@example.com"), (2, "bob@example.com"), (3, "ada@example.com")]
        {
            repo.save_quote(sample_quote(sequence, email)).await.expect("save");
        }
        repo.update_status(
            &QuoteNumber::format("Q-", 6, 3),
            QuoteStatus::Pending,
            QuoteStatus::Confirmed,
            Utc::now(),
        )
        .await
        .expect("confirm");

        let all = repo.list_quotes(&QuoteFilter::default()).await.expect("list");
        let sequences: Vec<u64> = all.iter().map(|quote| quote.sequence).collect();
        assert_eq!(sequences, vec![3, 2, 1]);

        let ada = repo
            .list_quotes(&QuoteFilter {
                client_email: Some("ADA@example.com".to_string()),
                ..QuoteFilter::default()
            })
            .await
            .expect("list by email");
        assert_eq!(ada.len(), 2);

        let pending = repo
            .list_quotes(&QuoteFilter {
                status: Some(QuoteStatus::Pending),
                limit: Some(1),
                ..QuoteFilter::default()
            })
            .await
            .expect("list pending");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].sequence, 2);

        pool.close().await;
    }

    #[tokio::test]
    async fn update_status_of_unknown_quote_is_not_found() {
        let pool = setup_pool().await;
        let repo = SqlQuoteRepository::new(pool.clone());

        let error = repo
            .update_status(
                &QuoteNumber("Q-000404".to_string()),
                QuoteStatus::Pending,
                QuoteStatus::Rejected,
                Utc::now(),
            )
            .await
            .expect_err("missing quote");
        assert!(matches!(error, RepositoryError::NotFound(_)));

        pool.close().await;
    }

    #[tokio::test]
    async fn terminal_status_is_not_overwritten() {
        let pool = setup_pool().await;
        let repo = SqlQuoteRepository::new(pool.clone());
        let saved = sample_quote(1, "ada@example.com");
        repo.save_quote(saved.clone()).await.expect("save");

        repo.update_status(
            &saved.quote_number,
            QuoteStatus::Pending,
            QuoteStatus::Confirmed,
            Utc::now(),
        )
        .await
        .expect("confirm");
        let error = repo
            .update_status(
                &saved.quote_number,
                QuoteStatus::Pending,
                QuoteStatus::Rejected,
                Utc::now(),
            )
            .await
            .expect_err("already confirmed");

        assert!(matches!(
            error,
            RepositoryError::StatusChanged { actual: QuoteStatus::Confirmed, .. }
        ));
        let stored = repo.find_by_number(&saved.quote_number).await.expect("find").expect("saved");
        assert_eq!(stored.status, QuoteStatus::Confirmed);

        pool.close().await;
    }

    #[tokio::test]
    async fn sequence_is_independent_of_saved_quotes() {
        let pool = setup_pool().await;
        let repo = SqlQuoteRepository::new(pool.clone());

        assert_eq!(repo.next_quote_sequence().await.expect("first"), 1);
        assert_eq!(repo.next_quote_sequence().await.expect("second"), 2);

        sqlx::query("DELETE FROM quote").execute(&pool).await.expect("delete quotes");
        assert_eq!(repo.next_quote_sequence().await.expect("third"), 3);

        pool.close().await;
    }

    #[tokio::test]
    async fn concurrent_sequence_reservations_are_distinct() {
        let dir = TempDir::new().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("sequence.db").display());
        let pool = connect_with_settings(&url, 4, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let repo = Arc::new(SqlQuoteRepository::new(pool.clone()));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move { repo.next_quote_sequence().await }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            let value = handle.await.expect("join").expect("reserve");
            assert!(seen.insert(value), "sequence {value} handed out twice");
        }
        assert_eq!(seen, (1..=16).collect::<HashSet<u64>>());

        pool.close().await;
    }
}
