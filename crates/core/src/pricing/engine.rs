use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::quote::QuoteLine;
use crate::domain::room_type::RoomEntry;
use crate::errors::DomainError;
use crate::pricing::catalog::RoomTypeRegistry;
use crate::pricing::discount::QuoteAggregates;

/// Largest accepted area for a single room entry.
pub const MAX_AREA: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Round half-up (midpoint away from zero) to `precision` decimal places.
pub fn round_half_up(value: Decimal, precision: u32) -> Decimal {
    value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinePricing {
    pub line_items: Vec<QuoteLine>,
    pub aggregates: QuoteAggregates,
}

pub trait PricingEngine: Send + Sync {
    fn price(
        &self,
        entries: &[RoomEntry],
        registry: &RoomTypeRegistry,
    ) -> Result<LinePricing, DomainError>;
}

pub struct DeterministicPricingEngine {
    precision: u32,
}

impl DeterministicPricingEngine {
    pub fn new(precision: u32) -> Self {
        Self { precision }
    }
}

impl Default for DeterministicPricingEngine {
    fn default() -> Self {
        Self::new(2)
    }
}

impl PricingEngine for DeterministicPricingEngine {
    fn price(
        &self,
        entries: &[RoomEntry],
        registry: &RoomTypeRegistry,
    ) -> Result<LinePricing, DomainError> {
        price_entries(entries, registry, self.precision)
    }
}

/// Prices every entry or none: the first unknown room type, out-of-range
/// area or overflowing amount rejects the whole request.
pub fn price_entries(
    entries: &[RoomEntry],
    registry: &RoomTypeRegistry,
    precision: u32,
) -> Result<LinePricing, DomainError> {
    let mut line_items = Vec::with_capacity(entries.len());
    let mut total_area = Decimal::ZERO;
    let mut subtotal = Decimal::ZERO;

    for entry in entries {
        let room_type = registry
            .find(&entry.room_type_id)
            .ok_or_else(|| DomainError::UnknownRoomType(entry.room_type_id.clone()))?;

        if entry.area <= Decimal::ZERO || entry.area > MAX_AREA {
            return Err(DomainError::InvalidArea {
                room_type_id: entry.room_type_id.clone(),
                area: entry.area,
            });
        }

        let line_price = entry.area.checked_mul(room_type.price_per_area).ok_or_else(|| {
            DomainError::AmountOverflow(format!(
                "{} x {} for room type `{}`",
                entry.area, room_type.price_per_area, room_type.id
            ))
        })?;
        let computed_price = round_half_up(line_price, precision);
        total_area = total_area
            .checked_add(entry.area)
            .ok_or_else(|| DomainError::AmountOverflow("total area".to_string()))?;
        subtotal = subtotal
            .checked_add(computed_price)
            .ok_or_else(|| DomainError::AmountOverflow("subtotal".to_string()))?;

        line_items.push(QuoteLine {
            room_type_id: room_type.id.clone(),
            room_type_name: room_type.name.clone(),
            area: entry.area,
            rate: room_type.price_per_area,
            computed_price,
        });
    }

    let room_count = u32::try_from(line_items.len()).map_err(|_| {
        DomainError::InvariantViolation("room entry count exceeds u32::MAX".to_string())
    })?;

    Ok(LinePricing { line_items, aggregates: QuoteAggregates { total_area, room_count, subtotal } })
}
