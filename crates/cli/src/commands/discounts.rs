use clap::Args;
use roomquote_core::config::LoadOptions;
use roomquote_core::domain::discount::{
    Discount, DiscountCondition, DiscountKind, DiscountRule, DiscountRuleId,
};
use rust_decimal::Decimal;

use crate::commands::{run_with_app, to_data, CommandFailure, CommandOutput, CommandResult};

#[derive(Debug, Clone, Args)]
pub struct DiscountUpsertArgs {
    #[arg(long)]
    pub id: String,
    #[arg(long)]
    pub label: String,
    #[arg(long, help = "total_area | room_count | subtotal")]
    pub field: String,
    #[arg(long, help = "One of > >= < <= = (or gt, gte, lt, lte, eq)")]
    pub operator: String,
    #[arg(long)]
    pub threshold: Decimal,
    #[arg(long, help = "percent | fixed")]
    pub kind: DiscountKind,
    #[arg(long)]
    pub value: Decimal,
    #[arg(long, default_value_t = 100, help = "Lower values are evaluated first")]
    pub priority: i32,
    #[arg(long)]
    pub inactive: bool,
}

pub fn list(options: LoadOptions) -> CommandResult {
    run_with_app("discounts list", options, |app| async move {
        let rules = app.desk.discount_rules().await?;
        Ok::<_, CommandFailure>(CommandOutput::new(
            format!("{} discount rules", rules.len()),
            to_data(&rules)?,
        ))
    })
}

pub fn upsert(options: LoadOptions, args: DiscountUpsertArgs) -> CommandResult {
    run_with_app("discounts upsert", options, |app| async move {
        let rule = app
            .desk
            .upsert_discount_rule(DiscountRule {
                id: DiscountRuleId(args.id.trim().to_string()),
                label: args.label,
                condition: DiscountCondition {
                    field: args.field,
                    operator: args.operator,
                    threshold: args.threshold,
                },
                discount: Discount { kind: args.kind, value: args.value },
                active: !args.inactive,
                priority: args.priority,
            })
            .await?;
        Ok::<_, CommandFailure>(CommandOutput::new(
            format!("saved discount rule `{}`", rule.id),
            to_data(&rule)?,
        ))
    })
}
