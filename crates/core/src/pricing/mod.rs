pub mod catalog;
pub mod discount;
pub mod engine;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{PricingConfig, SymbolPosition};
use crate::domain::discount::{DiscountRule, MalformedDiscountRule};
use crate::domain::quote::{AppliedDiscount, QuoteLine};
use crate::domain::room_type::RoomEntry;
use crate::errors::DomainError;

use self::{
    catalog::RoomTypeRegistry,
    discount::{DiscountEngine, RuleBasedDiscountEngine},
    engine::{round_half_up, DeterministicPricingEngine, PricingEngine},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTrace {
    pub steps: Vec<PricingTraceStep>,
}

impl PricingTrace {
    fn push(&mut self, stage: &str, detail: impl Into<String>, amount: Decimal) {
        self.steps.push(PricingTraceStep {
            stage: stage.to_string(),
            detail: detail.into(),
            amount,
        });
    }
}

/// Result of pricing one set of room entries against the current catalogue
/// and discount rules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub line_items: Vec<QuoteLine>,
    pub total_area: Decimal,
    pub room_count: u32,
    pub subtotal: Decimal,
    pub applied_discounts: Vec<AppliedDiscount>,
    pub discount_total: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub warnings: Vec<MalformedDiscountRule>,
    pub trace: PricingTrace,
}

pub struct QuoteCalculator<P, D> {
    pricing_engine: P,
    discount_engine: D,
    currency: String,
}

impl<P, D> QuoteCalculator<P, D> {
    pub fn new(pricing_engine: P, discount_engine: D, currency: impl Into<String>) -> Self {
        Self { pricing_engine, discount_engine, currency: currency.into() }
    }
}

impl QuoteCalculator<DeterministicPricingEngine, RuleBasedDiscountEngine> {
    pub fn from_config(config: &PricingConfig) -> Self {
        Self::new(
            DeterministicPricingEngine::new(config.decimal_precision),
            RuleBasedDiscountEngine::new(config.discount_mode, config.decimal_precision),
            config.currency.clone(),
        )
    }
}

impl Default for QuoteCalculator<DeterministicPricingEngine, RuleBasedDiscountEngine> {
    fn default() -> Self {
        Self::from_config(&PricingConfig::default())
    }
}

impl<P, D> QuoteCalculator<P, D>
where
    P: PricingEngine,
    D: DiscountEngine,
{
    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn calculate(
        &self,
        entries: &[RoomEntry],
        registry: &RoomTypeRegistry,
        rules: &[DiscountRule],
    ) -> Result<PricingResult, DomainError> {
        let pricing = self.pricing_engine.price(entries, registry)?;
        let aggregates = pricing.aggregates;

        let mut trace = PricingTrace::default();
        for line in &pricing.line_items {
            trace.push(
                "line",
                format!("{} {} x {}", line.room_type_id, line.area, line.rate),
                line.computed_price,
            );
        }
        trace.push("subtotal", "sum(round(area * rate))", aggregates.subtotal);

        let outcome = self.discount_engine.apply(&aggregates, rules)?;
        for applied in &outcome.applied {
            trace.push("discount", format!("{} ({})", applied.label, applied.rule_id), applied.amount);
        }

        let total = aggregates.subtotal - outcome.discount_total;
        if total < Decimal::ZERO {
            return Err(DomainError::InvariantViolation(format!(
                "discounts {} exceed subtotal {}",
                outcome.discount_total, aggregates.subtotal
            )));
        }
        trace.push("total", "subtotal - discounts", total);

        info!(
            event_name = "quote.calculated",
            room_count = aggregates.room_count,
            subtotal = %aggregates.subtotal,
            discount_total = %outcome.discount_total,
            total = %total,
            skipped_rules = outcome.warnings.len(),
            "quote calculated"
        );

        Ok(PricingResult {
            line_items: pricing.line_items,
            total_area: aggregates.total_area,
            room_count: aggregates.room_count,
            subtotal: aggregates.subtotal,
            applied_discounts: outcome.applied,
            discount_total: outcome.discount_total,
            total,
            currency: self.currency.clone(),
            warnings: outcome.warnings,
            trace,
        })
    }
}

/// Renders `amount` with the configured symbol, e.g. `112.50 €` or `€112.50`.
pub fn format_amount(amount: Decimal, config: &PricingConfig) -> String {
    let mut rounded = round_half_up(amount, config.decimal_precision);
    rounded.rescale(config.decimal_precision);
    match config.symbol_position {
        SymbolPosition::Before => format!("{}{}", config.currency_symbol, rounded),
        SymbolPosition::After => format!("{} {}", rounded, config.currency_symbol),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{format_amount, QuoteCalculator};
    use crate::config::{PricingConfig, SymbolPosition};
    use crate::domain::discount::{
        Discount, DiscountCondition, DiscountKind, DiscountRule, DiscountRuleId,
    };
    use crate::domain::room_type::{RoomEntry, RoomType, RoomTypeId};
    use crate::errors::DomainError;
    use crate::pricing::catalog::RoomTypeRegistry;
    use crate::pricing::discount::DiscountMode;

    fn registry() -> RoomTypeRegistry {
        RoomTypeRegistry::new(vec![RoomType {
            id: RoomTypeId("standard".to_string()),
            name: "Standard".to_string(),
            price_per_area: Decimal::new(250, 2),
            active: true,
            display_order: 1,
        }])
    }

    fn over_100_rule() -> DiscountRule {
        DiscountRule {
            id: DiscountRuleId("over-100".to_string()),
            label: "10% off over 100".to_string(),
            condition: DiscountCondition {
                field: "subtotal".to_string(),
                operator: ">".to_string(),
                threshold: Decimal::new(100, 0),
            },
            discount: Discount { kind: DiscountKind::Percent, value: Decimal::TEN },
            active: true,
            priority: 1,
        }
    }

    fn entries() -> Vec<RoomEntry> {
        vec![
            RoomEntry::new("standard", Decimal::new(20, 0)),
            RoomEntry::new("standard", Decimal::new(30, 0)),
        ]
    }

    #[test]
    fn calculates_subtotal_discount_and_total() {
        let calculator = QuoteCalculator::default();
        let result =
            calculator.calculate(&entries(), &registry(), &[over_100_rule()]).expect("calculated");

        assert_eq!(result.subtotal, Decimal::new(12500, 2));
        assert_eq!(result.discount_total, Decimal::new(1250, 2));
        assert_eq!(result.total, Decimal::new(11250, 2));
        assert_eq!(result.currency, "EUR");
        assert_eq!(result.room_count, 2);
        assert_eq!(result.applied_discounts.len(), 1);

        let stages: Vec<&str> = result.trace.steps.iter().map(|s| s.stage.as_str()).collect();
        assert_eq!(stages, vec!["line", "line", "subtotal", "discount", "total"]);
    }

    #[test]
    fn without_rules_total_equals_subtotal() {
        let result =
            QuoteCalculator::default().calculate(&entries(), &registry(), &[]).expect("calculated");
        assert_eq!(result.total, result.subtotal);
        assert!(result.applied_discounts.is_empty());
    }

    #[test]
    fn empty_entries_calculate_to_zero() {
        let result = QuoteCalculator::default()
            .calculate(&[], &registry(), &[over_100_rule()])
            .expect("calculated");
        assert_eq!(result.total, Decimal::ZERO);
        assert!(result.line_items.is_empty());
    }

    #[test]
    fn unknown_room_type_propagates() {
        let error = QuoteCalculator::default()
            .calculate(&[RoomEntry::new("attic", Decimal::ONE)], &registry(), &[])
            .expect_err("unknown room type");
        assert!(matches!(error, DomainError::UnknownRoomType(_)));
    }

    #[test]
    fn calculator_honours_configured_mode() {
        let config = PricingConfig { discount_mode: DiscountMode::Stack, ..PricingConfig::default() };
        let mut second = over_100_rule();
        second.id = DiscountRuleId("two-rooms".to_string());
        second.condition.field = "room_count".to_string();
        second.condition.operator = ">=".to_string();
        second.condition.threshold = Decimal::new(2, 0);
        second.discount = Discount { kind: DiscountKind::Fixed, value: Decimal::new(5, 0) };
        second.priority = 2;

        let result = QuoteCalculator::from_config(&config)
            .calculate(&entries(), &registry(), &[over_100_rule(), second])
            .expect("calculated");
        assert_eq!(result.discount_total, Decimal::new(1750, 2));
        assert_eq!(result.total, Decimal::new(10750, 2));
    }

    #[test]
    fn formats_amount_with_symbol_position() {
        let mut config = PricingConfig::default();
        assert_eq!(format_amount(Decimal::new(1125, 1), &config), "112.50 €");

        config.symbol_position = SymbolPosition::Before;
        config.currency_symbol = "$".to_string();
        assert_eq!(format_amount(Decimal::new(4999, 3), &config), "$5.00");

        config.decimal_precision = 0;
        assert_eq!(format_amount(Decimal::new(25, 1), &config), "$3");
    }
}
