use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::discount::{ConditionField, DiscountKind, DiscountRule, MalformedDiscountRule};
use crate::domain::quote::AppliedDiscount;
use crate::errors::DomainError;
use crate::pricing::engine::round_half_up;

/// Whether every matching rule applies or only the first one in priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountMode {
    Stack,
    FirstMatch,
}

impl DiscountMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stack => "stack",
            Self::FirstMatch => "first_match",
        }
    }
}

impl std::str::FromStr for DiscountMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "stack" | "stacking" => Ok(Self::Stack),
            "first_match" | "first" => Ok(Self::FirstMatch),
            other => Err(format!("unsupported discount mode `{other}` (expected stack|first_match)")),
        }
    }
}

/// Aggregate fields of a priced quote that discount conditions can reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteAggregates {
    pub total_area: Decimal,
    pub room_count: u32,
    pub subtotal: Decimal,
}

impl QuoteAggregates {
    pub fn value_of(&self, field: ConditionField) -> Decimal {
        match field {
            ConditionField::TotalArea => self.total_area,
            ConditionField::RoomCount => Decimal::from(self.room_count),
            ConditionField::Subtotal => self.subtotal,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountOutcome {
    pub applied: Vec<AppliedDiscount>,
    pub discount_total: Decimal,
    pub warnings: Vec<MalformedDiscountRule>,
}

pub trait DiscountEngine: Send + Sync {
    fn apply(
        &self,
        aggregates: &QuoteAggregates,
        rules: &[DiscountRule],
    ) -> Result<DiscountOutcome, DomainError>;
}

pub struct RuleBasedDiscountEngine {
    mode: DiscountMode,
    precision: u32,
}

impl RuleBasedDiscountEngine {
    pub fn new(mode: DiscountMode, precision: u32) -> Self {
        Self { mode, precision }
    }
}

impl DiscountEngine for RuleBasedDiscountEngine {
    fn apply(
        &self,
        aggregates: &QuoteAggregates,
        rules: &[DiscountRule],
    ) -> Result<DiscountOutcome, DomainError> {
        evaluate_rules(aggregates, rules, self.mode, self.precision)
    }
}

/// Active rules in evaluation order: ascending `priority`, ties broken by id.
pub fn order_rules(rules: &[DiscountRule]) -> Vec<&DiscountRule> {
    let mut ordered: Vec<&DiscountRule> = rules.iter().filter(|rule| rule.active).collect();
    ordered.sort_by(|left, right| {
        left.priority.cmp(&right.priority).then_with(|| left.id.cmp(&right.id))
    });
    ordered
}

pub fn evaluate_rules(
    aggregates: &QuoteAggregates,
    rules: &[DiscountRule],
    mode: DiscountMode,
    precision: u32,
) -> Result<DiscountOutcome, DomainError> {
    let original_subtotal = aggregates.subtotal;
    let mut remaining = original_subtotal.max(Decimal::ZERO);
    let mut outcome = DiscountOutcome::default();

    for rule in order_rules(rules) {
        let condition = match rule.parse_condition() {
            Ok(condition) => condition,
            Err(malformed) => {
                warn!(
                    event_name = "discount.rule_skipped",
                    rule_id = %malformed.rule_id,
                    reason = %malformed.reason,
                    "skipping malformed discount rule"
                );
                outcome.warnings.push(malformed);
                continue;
            }
        };

        let actual = aggregates.value_of(condition.field);
        if !condition.operator.compare(actual, condition.threshold) {
            continue;
        }

        let raw_amount = match rule.discount.kind {
            DiscountKind::Percent => {
                let scaled = original_subtotal
                    .checked_mul(rule.discount.value)
                    .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
                    .ok_or_else(|| {
                        DomainError::AmountOverflow(format!(
                            "{}% of subtotal {original_subtotal} for rule `{}`",
                            rule.discount.value, rule.id
                        ))
                    })?;
                round_half_up(scaled, precision)
            }
            DiscountKind::Fixed => round_half_up(rule.discount.value, precision),
        };
        let amount = raw_amount.min(remaining);
        remaining -= amount;

        if amount > Decimal::ZERO {
            outcome.discount_total += amount;
            outcome.applied.push(AppliedDiscount {
                rule_id: rule.id.clone(),
                label: rule.label.clone(),
                amount,
            });
        }

        if mode == DiscountMode::FirstMatch {
            break;
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{evaluate_rules, order_rules, DiscountMode, QuoteAggregates};
    use crate::domain::discount::{
        Discount, DiscountCondition, DiscountKind, DiscountRule, DiscountRuleId,
    };

    fn aggregates(subtotal: Decimal) -> QuoteAggregates {
        QuoteAggregates { total_area: Decimal::new(50, 0), room_count: 2, subtotal }
    }

    fn rule(
        id: &str,
        field: &str,
        operator: &str,
        threshold: i64,
        kind: DiscountKind,
        value: Decimal,
        priority: i32,
    ) -> DiscountRule {
        DiscountRule {
            id: DiscountRuleId(id.to_string()),
            label: format!("rule {id}"),
            condition: DiscountCondition {
                field: field.to_string(),
                operator: operator.to_string(),
                threshold: Decimal::new(threshold, 0),
            },
            discount: Discount { kind, value },
            active: true,
            priority,
        }
    }

    #[test]
    fn ten_percent_over_100_first_match_gives_112_50() {
        let rules =
            vec![rule("over-100", "subtotal", ">", 100, DiscountKind::Percent, Decimal::TEN, 1)];
        let outcome =
            evaluate_rules(&aggregates(Decimal::new(12500, 2)), &rules, DiscountMode::FirstMatch, 2)
                .expect("evaluated");

        assert_eq!(outcome.discount_total, Decimal::new(1250, 2));
        assert_eq!(Decimal::new(12500, 2) - outcome.discount_total, Decimal::new(11250, 2));
        assert_eq!(outcome.applied.len(), 1);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn first_match_stops_after_highest_priority_match() {
        let rules = vec![
            rule("late", "subtotal", ">", 0, DiscountKind::Fixed, Decimal::new(5, 0), 20),
            rule("early", "total_area", ">=", 50, DiscountKind::Percent, Decimal::new(20, 0), 10),
            rule("never", "room_count", ">", 5, DiscountKind::Fixed, Decimal::new(99, 0), 1),
        ];
        let outcome =
            evaluate_rules(&aggregates(Decimal::new(200, 0)), &rules, DiscountMode::FirstMatch, 2)
                .expect("evaluated");

        assert_eq!(outcome.applied.len(), 1);
        assert_eq!(outcome.applied[0].rule_id.0, "early");
        assert_eq!(outcome.discount_total, Decimal::new(40, 0));
    }

    #[test]
    fn stacked_percentages_use_original_subtotal() {
        let rules = vec![
            rule("a", "subtotal", ">", 0, DiscountKind::Percent, Decimal::TEN, 1),
            rule("b", "subtotal", ">", 0, DiscountKind::Percent, Decimal::TEN, 2),
        ];
        let outcome =
            evaluate_rules(&aggregates(Decimal::new(200, 0)), &rules, DiscountMode::Stack, 2)
                .expect("evaluated");

        // 10% + 10% of 200, not 10% of 200 then 10% of 180.
        assert_eq!(outcome.discount_total, Decimal::new(40, 0));
        assert_eq!(outcome.applied.len(), 2);
    }

    #[test]
    fn stacking_is_order_independent_for_priority_ties() {
        let base = vec![
            rule("a", "subtotal", ">", 0, DiscountKind::Percent, Decimal::new(15, 0), 5),
            rule("b", "total_area", ">", 10, DiscountKind::Fixed, Decimal::new(7, 0), 5),
            rule("c", "room_count", ">=", 2, DiscountKind::Percent, Decimal::new(333, 2), 5),
        ];
        let permutations = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

        let expected =
            evaluate_rules(&aggregates(Decimal::new(31999, 2)), &base, DiscountMode::Stack, 2)
                .expect("evaluated")
                .discount_total;
        for permutation in permutations {
            let rules: Vec<DiscountRule> =
                permutation.iter().map(|index| base[*index].clone()).collect();
            let outcome =
                evaluate_rules(&aggregates(Decimal::new(31999, 2)), &rules, DiscountMode::Stack, 2)
                    .expect("evaluated");
            assert_eq!(outcome.discount_total, expected, "permutation {permutation:?}");
        }
    }

    #[test]
    fn discounts_never_exceed_subtotal() {
        let configurations = [
            vec![rule("huge", "subtotal", ">", 0, DiscountKind::Fixed, Decimal::new(1000, 0), 1)],
            vec![
                rule("a", "subtotal", ">", 0, DiscountKind::Percent, Decimal::new(80, 0), 1),
                rule("b", "subtotal", ">", 0, DiscountKind::Percent, Decimal::new(80, 0), 2),
                rule("c", "subtotal", ">", 0, DiscountKind::Fixed, Decimal::new(5, 0), 3),
            ],
        ];

        for rules in configurations {
            for mode in [DiscountMode::Stack, DiscountMode::FirstMatch] {
                let subtotal = Decimal::new(12500, 2);
                let outcome =
                    evaluate_rules(&aggregates(subtotal), &rules, mode, 2).expect("evaluated");
                let applied: Decimal = outcome.applied.iter().map(|d| d.amount).sum();

                assert!(outcome.discount_total <= subtotal);
                assert!(subtotal - outcome.discount_total >= Decimal::ZERO);
                assert_eq!(applied, outcome.discount_total);
            }
        }
    }

    #[test]
    fn malformed_rules_are_skipped_not_fatal() {
        let rules = vec![
            rule("bad-field", "weekday", ">", 0, DiscountKind::Fixed, Decimal::new(50, 0), 1),
            rule("bad-op", "subtotal", "~", 0, DiscountKind::Fixed, Decimal::new(50, 0), 2),
            rule("good", "subtotal", ">", 100, DiscountKind::Percent, Decimal::TEN, 3),
        ];
        let outcome =
            evaluate_rules(&aggregates(Decimal::new(12500, 2)), &rules, DiscountMode::FirstMatch, 2)
                .expect("evaluated");

        assert_eq!(outcome.warnings.len(), 2);
        assert_eq!(outcome.applied.len(), 1);
        assert_eq!(outcome.applied[0].rule_id.0, "good");
        assert_eq!(outcome.discount_total, Decimal::new(1250, 2));
    }

    #[test]
    fn inactive_rules_are_ignored_and_order_breaks_ties_by_id() {
        let mut inactive = rule("z", "subtotal", ">", 0, DiscountKind::Fixed, Decimal::ONE, 0);
        inactive.active = false;
        let rules = vec![
            rule("b", "subtotal", ">", 0, DiscountKind::Fixed, Decimal::ONE, 1),
            inactive,
            rule("a", "subtotal", ">", 0, DiscountKind::Fixed, Decimal::ONE, 1),
        ];

        let ids: Vec<&str> = order_rules(&rules).iter().map(|rule| rule.id.0.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn non_matching_conditions_apply_nothing() {
        let rules =
            vec![rule("over-100", "subtotal", ">", 100, DiscountKind::Percent, Decimal::TEN, 1)];
        let outcome =
            evaluate_rules(&aggregates(Decimal::new(9999, 2)), &rules, DiscountMode::Stack, 2)
                .expect("evaluated");

        assert!(outcome.applied.is_empty());
        assert_eq!(outcome.discount_total, Decimal::ZERO);
    }

    #[test]
    fn percent_of_oversized_subtotal_reports_overflow() {
        let rules =
            vec![rule("all", "subtotal", ">", 0, DiscountKind::Percent, Decimal::ONE_HUNDRED, 1)];
        let error = evaluate_rules(&aggregates(Decimal::MAX), &rules, DiscountMode::Stack, 2)
            .expect_err("subtotal x percent overflows");

        assert_eq!(error.reason_code(), "amount_overflow");
    }

    #[test]
    fn discount_mode_parses_aliases() {
        assert_eq!("first-match".parse::<DiscountMode>(), Ok(DiscountMode::FirstMatch));
        assert_eq!("STACK".parse::<DiscountMode>(), Ok(DiscountMode::Stack));
        assert!("best".parse::<DiscountMode>().is_err());
    }
}
