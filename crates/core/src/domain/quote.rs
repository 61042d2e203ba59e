use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::discount::DiscountRuleId;
use crate::domain::room_type::RoomTypeId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

impl QuoteId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Human-readable quote reference, e.g. `Q-000042`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteNumber(pub String);

impl QuoteNumber {
    pub fn format(prefix: &str, width: usize, sequence: u64) -> Self {
        Self(format!("{prefix}{sequence:0width$}"))
    }
}

impl std::fmt::Display for QuoteNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Rejected)
    }
}

impl std::str::FromStr for QuoteStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown quote status `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ClientContact {
    #[validate(length(min = 1, max = 200), custom(function = "not_blank"))]
    pub name: String,
    #[validate(email, length(max = 254))]
    pub email: String,
    #[validate(length(max = 32), custom(function = "phone_characters"))]
    pub phone: Option<String>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn phone_characters(value: &str) -> Result<(), ValidationError> {
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')');
    if value.trim().is_empty() || !value.chars().all(allowed) {
        return Err(ValidationError::new("phone"));
    }
    Ok(())
}

/// A priced room entry. `rate` and `room_type_name` are captured when the
/// quote is calculated and are not refreshed if the catalogue changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteLine {
    pub room_type_id: RoomTypeId,
    pub room_type_name: String,
    pub area: Decimal,
    pub rate: Decimal,
    pub computed_price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub rule_id: DiscountRuleId,
    pub label: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub quote_number: QuoteNumber,
    pub sequence: u64,
    pub client: ClientContact,
    pub notes: Option<String>,
    pub line_items: Vec<QuoteLine>,
    pub subtotal: Decimal,
    pub applied_discounts: Vec<AppliedDiscount>,
    pub discount_total: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub status: QuoteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    pub fn can_transition_to(&self, next: QuoteStatus) -> bool {
        matches!(
            (self.status, next),
            (QuoteStatus::Pending, QuoteStatus::Confirmed)
                | (QuoteStatus::Pending, QuoteStatus::Rejected)
        )
    }

    pub fn transition_to(&mut self, next: QuoteStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            self.updated_at = Utc::now();
            return Ok(());
        }

        Err(DomainError::InvalidQuoteTransition { from: self.status, to: next })
    }

    /// Checks `total = subtotal - sum(discounts)` and `total >= 0`.
    pub fn check_totals(&self) -> Result<(), DomainError> {
        let discounts: Decimal = self.applied_discounts.iter().map(|d| d.amount).sum();
        if discounts != self.discount_total {
            return Err(DomainError::InvariantViolation(format!(
                "quote {} discount_total {} does not match applied discounts {}",
                self.quote_number, self.discount_total, discounts
            )));
        }
        if self.total != self.subtotal - discounts || self.total < Decimal::ZERO {
            return Err(DomainError::InvariantViolation(format!(
                "quote {} total {} is inconsistent with subtotal {} and discounts {}",
                self.quote_number, self.total, self.subtotal, discounts
            )));
        }
        Ok(())
    }
}
