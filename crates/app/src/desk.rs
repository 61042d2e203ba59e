use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use roomquote_core::config::{AppConfig, QuoteNumberingConfig};
use roomquote_core::domain::discount::DiscountRule;
use roomquote_core::domain::quote::{ClientContact, Quote, QuoteId, QuoteNumber, QuoteStatus};
use roomquote_core::domain::room_type::{RoomEntry, RoomType};
use roomquote_core::errors::{ApplicationError, DomainError};
use roomquote_core::pricing::catalog::RoomTypeRegistry;
use roomquote_core::pricing::discount::RuleBasedDiscountEngine;
use roomquote_core::pricing::engine::DeterministicPricingEngine;
use roomquote_core::pricing::{PricingResult, QuoteCalculator};
use roomquote_core::submission::QuoteSubmission;
use roomquote_core::MalformedDiscountRule;
use roomquote_db::repositories::{
    DiscountRuleRepository, InMemoryDiscountRuleRepository, InMemoryNotificationLogRepository,
    InMemoryQuoteRepository, InMemoryRoomTypeRepository, NotificationFilter,
    NotificationLogRepository, NotificationRecord, QuoteFilter, QuoteRepository, RepositoryError,
    RoomTypeRepository, SqlDiscountRuleRepository, SqlNotificationLogRepository,
    SqlQuoteRepository, SqlRoomTypeRepository,
};
use roomquote_db::DbPool;

use crate::notify::{DeliveryHandle, NotificationDispatcher};

#[derive(Clone)]
pub struct DeskRepositories {
    pub room_types: Arc<dyn RoomTypeRepository>,
    pub discount_rules: Arc<dyn DiscountRuleRepository>,
    pub quotes: Arc<dyn QuoteRepository>,
    pub notifications: Arc<dyn NotificationLogRepository>,
}

impl DeskRepositories {
    pub fn sql(pool: DbPool) -> Self {
        Self {
            room_types: Arc::new(SqlRoomTypeRepository::new(pool.clone())),
            discount_rules: Arc::new(SqlDiscountRuleRepository::new(pool.clone())),
            quotes: Arc::new(SqlQuoteRepository::new(pool.clone())),
            notifications: Arc::new(SqlNotificationLogRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            room_types: Arc::new(InMemoryRoomTypeRepository::default()),
            discount_rules: Arc::new(InMemoryDiscountRuleRepository::default()),
            quotes: Arc::new(InMemoryQuoteRepository::default()),
            notifications: Arc::new(InMemoryNotificationLogRepository::default()),
        }
    }
}

/// A quote that was numbered and stored. `delivery` completes once every
/// notification channel has been attempted.
pub struct SubmittedQuote {
    pub quote: Quote,
    pub warnings: Vec<MalformedDiscountRule>,
    pub delivery: DeliveryHandle,
}

/// Entry point for pricing, recording and managing quotes.
pub struct QuoteDesk {
    repos: DeskRepositories,
    calculator: QuoteCalculator<DeterministicPricingEngine, RuleBasedDiscountEngine>,
    numbering: QuoteNumberingConfig,
    dispatcher: NotificationDispatcher,
}

impl QuoteDesk {
    pub fn new(repos: DeskRepositories, config: &AppConfig, dispatcher: NotificationDispatcher) -> Self {
        Self {
            repos,
            calculator: QuoteCalculator::from_config(&config.pricing),
            numbering: config.quotes.clone(),
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    /// Prices `entries` against the stored catalogue without recording anything.
    pub async fn calculate(&self, entries: &[RoomEntry]) -> Result<PricingResult, ApplicationError> {
        let (registry, rules) = self.load_catalog().await?;
        Ok(self.calculator.calculate(entries, &registry, &rules)?)
    }

    /// Validates, prices, numbers and stores a submission, then hands the
    /// stored quote to the notification channels.
    ///
    /// The quote counter is only touched once validation and pricing have
    /// succeeded. A storage failure after that point leaves a gap in the
    /// numbering.
    pub async fn submit_quote(
        &self,
        submission: QuoteSubmission,
    ) -> Result<SubmittedQuote, ApplicationError> {
        submission.check()?;

        let (registry, rules) = self.load_catalog().await?;
        let priced = self.calculator.calculate(&submission.entries, &registry, &rules)?;

        let sequence =
            self.repos.quotes.next_quote_sequence().await.map_err(repository_error)?;
        let quote_number = QuoteNumber::format(
            &self.numbering.number_prefix,
            self.numbering.number_width,
            sequence,
        );

        let now = Utc::now();
        let quote = Quote {
            id: QuoteId::generate(),
            quote_number,
            sequence,
            client: normalize_contact(submission.client),
            notes: submission
                .notes
                .map(|notes| notes.trim().to_string())
                .filter(|notes| !notes.is_empty()),
            line_items: priced.line_items,
            subtotal: priced.subtotal,
            applied_discounts: priced.applied_discounts,
            discount_total: priced.discount_total,
            total: priced.total,
            currency: priced.currency,
            status: QuoteStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        quote.check_totals()?;

        self.repos.quotes.save_quote(quote.clone()).await.map_err(repository_error)?;
        info!(
            event_name = "quote.submitted",
            quote_number = %quote.quote_number,
            sequence = quote.sequence,
            total = %quote.total,
            currency = %quote.currency,
            "quote recorded"
        );

        let delivery = self.dispatcher.dispatch(quote.clone());
        Ok(SubmittedQuote { quote, warnings: priced.warnings, delivery })
    }

    pub async fn update_status(
        &self,
        number: &QuoteNumber,
        next: QuoteStatus,
    ) -> Result<Quote, ApplicationError> {
        let mut quote = self.find_quote(number).await?;
        let previous = quote.status;
        quote.transition_to(next)?;

        self.repos
            .quotes
            .update_status(&quote.quote_number, previous, quote.status, quote.updated_at)
            .await
            .map_err(|error| match error {
                RepositoryError::StatusChanged { actual, .. } => ApplicationError::from(
                    DomainError::InvalidQuoteTransition { from: actual, to: next },
                ),
                other => repository_error(other),
            })?;
        info!(
            event_name = "quote.status_changed",
            quote_number = %quote.quote_number,
            from = previous.as_str(),
            to = quote.status.as_str(),
            "quote status changed"
        );
        Ok(quote)
    }

    pub async fn find_quote(&self, number: &QuoteNumber) -> Result<Quote, ApplicationError> {
        self.repos
            .quotes
            .find_by_number(number)
            .await
            .map_err(repository_error)?
            .ok_or_else(|| ApplicationError::NotFound(format!("quote {number}")))
    }

    pub async fn list_quotes(&self, filter: &QuoteFilter) -> Result<Vec<Quote>, ApplicationError> {
        self.repos.quotes.list_quotes(filter).await.map_err(repository_error)
    }

    pub async fn list_notifications(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<NotificationRecord>, ApplicationError> {
        self.repos.notifications.list(filter).await.map_err(repository_error)
    }

    pub async fn room_types(&self) -> Result<Vec<RoomType>, ApplicationError> {
        self.repos.room_types.load_room_types().await.map_err(repository_error)
    }

    pub async fn upsert_room_type(&self, room_type: RoomType) -> Result<RoomType, ApplicationError> {
        if room_type.id.0.trim().is_empty() {
            return Err(DomainError::validation("id", "room type id is required").into());
        }
        if room_type.name.trim().is_empty() {
            return Err(DomainError::validation("name", "room type name is required").into());
        }
        if room_type.price_per_area < Decimal::ZERO {
            return Err(DomainError::validation(
                "price_per_area",
                "price per area must be zero or greater",
            )
            .into());
        }

        self.repos.room_types.save(room_type.clone()).await.map_err(repository_error)?;
        Ok(room_type)
    }

    pub async fn discount_rules(&self) -> Result<Vec<DiscountRule>, ApplicationError> {
        self.repos.discount_rules.load_discount_rules().await.map_err(repository_error)
    }

    /// Stores a rule after checking it can be evaluated. Rules written
    /// directly to the store bypass this and are skipped at pricing time.
    pub async fn upsert_discount_rule(
        &self,
        rule: DiscountRule,
    ) -> Result<DiscountRule, ApplicationError> {
        if rule.id.0.trim().is_empty() {
            return Err(DomainError::validation("id", "discount rule id is required").into());
        }
        rule.parse_condition().map_err(|malformed| DomainError::Validation {
            fields: vec!["condition".to_string()],
            message: malformed.to_string(),
        })?;

        self.repos.discount_rules.save(rule.clone()).await.map_err(repository_error)?;
        Ok(rule)
    }

    async fn load_catalog(&self) -> Result<(RoomTypeRegistry, Vec<DiscountRule>), ApplicationError> {
        let room_types = self.room_types().await?;
        let rules = self.discount_rules().await?;
        Ok((RoomTypeRegistry::new(room_types), rules))
    }
}

fn normalize_contact(client: ClientContact) -> ClientContact {
    ClientContact {
        name: client.name.trim().to_string(),
        email: client.email.trim().to_string(),
        phone: client
            .phone
            .map(|phone| phone.trim().to_string())
            .filter(|phone| !phone.is_empty()),
    }
}

fn repository_error(error: RepositoryError) -> ApplicationError {
    match error {
        RepositoryError::NotFound(message) => ApplicationError::NotFound(message),
        other => ApplicationError::Persistence(other.to_string()),
    }
}
