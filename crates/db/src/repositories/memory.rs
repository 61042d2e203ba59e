use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use roomquote_core::domain::discount::DiscountRule;
use roomquote_core::domain::quote::{Quote, QuoteId, QuoteNumber, QuoteStatus};
use roomquote_core::domain::room_type::RoomType;

use super::{
    DiscountRuleRepository, NotificationFilter, NotificationLogRepository, NotificationRecord,
    QuoteFilter, QuoteRepository, RepositoryError, RoomTypeRepository,
};

#[derive(Default)]
pub struct InMemoryRoomTypeRepository {
    room_types: RwLock<HashMap<String, RoomType>>,
}

impl InMemoryRoomTypeRepository {
    pub fn with_room_types(room_types: Vec<RoomType>) -> Self {
        let map = room_types.into_iter().map(|room| (room.id.0.clone(), room)).collect();
        Self { room_types: RwLock::new(map) }
    }
}

#[async_trait::async_trait]
impl RoomTypeRepository for InMemoryRoomTypeRepository {
    async fn load_room_types(&self) -> Result<Vec<RoomType>, RepositoryError> {
        let room_types = self.room_types.read().await;
        let mut loaded: Vec<RoomType> = room_types.values().cloned().collect();
        loaded.sort_by(|left, right| {
            left.display_order.cmp(&right.display_order).then_with(|| left.name.cmp(&right.name))
        });
        Ok(loaded)
    }

    async fn save(&self, room_type: RoomType) -> Result<(), RepositoryError> {
        let mut room_types = self.room_types.write().await;
        room_types.insert(room_type.id.0.clone(), room_type);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryDiscountRuleRepository {
    rules: RwLock<HashMap<String, DiscountRule>>,
}

impl InMemoryDiscountRuleRepository {
    pub fn with_rules(rules: Vec<DiscountRule>) -> Self {
        let map = rules.into_iter().map(|rule| (rule.id.0.clone(), rule)).collect();
        Self { rules: RwLock::new(map) }
    }
}

#[async_trait::async_trait]
impl DiscountRuleRepository for InMemoryDiscountRuleRepository {
    async fn load_discount_rules(&self) -> Result<Vec<DiscountRule>, RepositoryError> {
        let rules = self.rules.read().await;
        let mut loaded: Vec<DiscountRule> = rules.values().cloned().collect();
        loaded.sort_by(|left, right| {
            left.priority.cmp(&right.priority).then_with(|| left.id.cmp(&right.id))
        });
        Ok(loaded)
    }

    async fn save(&self, rule: DiscountRule) -> Result<(), RepositoryError> {
        let mut rules = self.rules.write().await;
        rules.insert(rule.id.0.clone(), rule);
        Ok(())
    }
}

/// Quotes keyed by quote number, with a counter that lives apart from them.
#[derive(Default)]
pub struct InMemoryQuoteRepository {
    quotes: RwLock<HashMap<String, Quote>>,
    sequence: AtomicU64,
}

impl InMemoryQuoteRepository {
    /// Last value handed out by `next_quote_sequence`, or 0.
    pub fn current_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn save_quote(&self, quote: Quote) -> Result<QuoteId, RepositoryError> {
        let mut quotes = self.quotes.write().await;
        if quotes.contains_key(&quote.quote_number.0) {
            return Err(RepositoryError::Conflict(format!(
                "quote number {} already exists",
                quote.quote_number
            )));
        }
        let id = quote.id.clone();
        quotes.insert(quote.quote_number.0.clone(), quote);
        Ok(id)
    }

    async fn find_by_number(&self, number: &QuoteNumber) -> Result<Option<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.get(&number.0).cloned())
    }

    async fn list_quotes(&self, filter: &QuoteFilter) -> Result<Vec<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        let mut listed: Vec<Quote> =
            quotes.values().filter(|quote| filter.matches(quote)).cloned().collect();
        listed.sort_by(|left, right| right.sequence.cmp(&left.sequence));
        if let Some(limit) = filter.limit {
            listed.truncate(limit as usize);
        }
        Ok(listed)
    }

    async fn next_quote_sequence(&self) -> Result<u64, RepositoryError> {
        Ok(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn update_status(
        &self,
        number: &QuoteNumber,
        expected: QuoteStatus,
        status: QuoteStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut quotes = self.quotes.write().await;
        let quote = quotes
            .get_mut(&number.0)
            .ok_or_else(|| RepositoryError::NotFound(format!("quote {number}")))?;
        if quote.status != expected {
            return Err(RepositoryError::StatusChanged {
                number: number.0.clone(),
                expected,
                actual: quote.status,
            });
        }
        quote.status = status;
        quote.updated_at = updated_at;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryNotificationLogRepository {
    records: RwLock<Vec<NotificationRecord>>,
}

#[async_trait::async_trait]
impl NotificationLogRepository for InMemoryNotificationLogRepository {
    async fn record(&self, record: NotificationRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.push(record);
        Ok(())
    }

    async fn list(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<NotificationRecord>, RepositoryError> {
        let records = self.records.read().await;
        let mut listed: Vec<NotificationRecord> = records
            .iter()
            .filter(|record| filter.outcome.map_or(true, |outcome| record.outcome == outcome))
            .cloned()
            .collect();
        listed.sort_by(|left, right| {
            right.attempted_at.cmp(&left.attempted_at).then_with(|| left.id.cmp(&right.id))
        });
        if let Some(limit) = filter.limit {
            listed.truncate(limit as usize);
        }
        Ok(listed)
    }
}
