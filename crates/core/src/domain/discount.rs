use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiscountRuleId(pub String);

impl std::fmt::Display for DiscountRuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregate quote field a discount condition compares against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionField {
    TotalArea,
    Subtotal,
    RoomCount,
}

impl ConditionField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TotalArea => "total_area",
            Self::Subtotal => "subtotal",
            Self::RoomCount => "room_count",
        }
    }
}

impl FromStr for ConditionField {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "total_area" | "area" => Ok(Self::TotalArea),
            "subtotal" => Ok(Self::Subtotal),
            "room_count" | "rooms" => Ok(Self::RoomCount),
            other => Err(format!("unknown condition field `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Equal,
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GreaterThan => "gt",
            Self::GreaterOrEqual => "gte",
            Self::LessThan => "lt",
            Self::LessOrEqual => "lte",
            Self::Equal => "eq",
        }
    }

    pub fn compare(&self, actual: Decimal, threshold: Decimal) -> bool {
        match self {
            Self::GreaterThan => actual > threshold,
            Self::GreaterOrEqual => actual >= threshold,
            Self::LessThan => actual < threshold,
            Self::LessOrEqual => actual <= threshold,
            Self::Equal => actual == threshold,
        }
    }
}

impl FromStr for ComparisonOperator {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gt" | ">" => Ok(Self::GreaterThan),
            "gte" | ">=" => Ok(Self::GreaterOrEqual),
            "lt" | "<" => Ok(Self::LessThan),
            "lte" | "<=" => Ok(Self::LessOrEqual),
            "eq" | "=" | "==" => Ok(Self::Equal),
            other => Err(format!("unknown comparison operator `{other}`")),
        }
    }
}

/// Condition as stored. Field and operator stay untyped until evaluation so
/// that bad rows can be skipped instead of failing the whole rule set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCondition {
    pub field: String,
    pub operator: String,
    pub threshold: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Percent,
    Fixed,
}

impl DiscountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percent => "percent",
            Self::Fixed => "fixed",
        }
    }
}

impl FromStr for DiscountKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "percent" | "percentage" | "%" => Ok(Self::Percent),
            "fixed" | "amount" => Ok(Self::Fixed),
            other => Err(format!("unknown discount kind `{other}` (expected percent|fixed)")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub kind: DiscountKind,
    pub value: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRule {
    pub id: DiscountRuleId,
    pub label: String,
    pub condition: DiscountCondition,
    pub discount: Discount,
    pub active: bool,
    pub priority: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParsedCondition {
    pub field: ConditionField,
    pub operator: ComparisonOperator,
    pub threshold: Decimal,
}

/// A rule that cannot be evaluated. Recovered from: the rule is skipped.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("discount rule `{rule_id}` is malformed: {reason}")]
pub struct MalformedDiscountRule {
    pub rule_id: DiscountRuleId,
    pub reason: String,
}

impl DiscountRule {
    pub fn parse_condition(&self) -> Result<ParsedCondition, MalformedDiscountRule> {
        let malformed =
            |reason: String| MalformedDiscountRule { rule_id: self.id.clone(), reason };

        let field = self.condition.field.parse::<ConditionField>().map_err(malformed)?;
        let operator = self.condition.operator.parse::<ComparisonOperator>().map_err(malformed)?;

        if self.discount.value < Decimal::ZERO {
            return Err(malformed("discount value must be >= 0".to_string()));
        }
        if self.discount.kind == DiscountKind::Percent && self.discount.value > Decimal::ONE_HUNDRED
        {
            return Err(malformed("percent discount must be <= 100".to_string()));
        }

        Ok(ParsedCondition { field, operator, threshold: self.condition.threshold })
    }
}
