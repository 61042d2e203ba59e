use chrono::Utc;

use roomquote_core::domain::discount::{
    Discount, DiscountCondition, DiscountKind, DiscountRule, DiscountRuleId,
};

use super::{column, decimal_column, DiscountRuleRepository, RepositoryError};
use crate::DbPool;

pub struct SqlDiscountRuleRepository {
    pool: DbPool,
}

impl SqlDiscountRuleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// Field and operator are loaded verbatim; unrecognised values surface later as
// skipped rules rather than as decode failures.
fn row_to_rule(row: &sqlx::sqlite::SqliteRow) -> Result<DiscountRule, RepositoryError> {
    let kind: String = column(row, "discount_kind")?;

    Ok(DiscountRule {
        id: DiscountRuleId(column(row, "id")?),
        label: column(row, "label")?,
        condition: DiscountCondition {
            field: column(row, "condition_field")?,
            operator: column(row, "condition_operator")?,
            threshold: decimal_column(row, "threshold")?,
        },
        discount: Discount {
            kind: kind.parse::<DiscountKind>().map_err(RepositoryError::Decode)?,
            value: decimal_column(row, "discount_value")?,
        },
        active: column(row, "active")?,
        priority: column(row, "priority")?,
    })
}

#[async_trait::async_trait]
impl DiscountRuleRepository for SqlDiscountRuleRepository {
    async fn load_discount_rules(&self) -> Result<Vec<DiscountRule>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, label, condition_field, condition_operator, threshold,
                    discount_kind, discount_value, active, priority
             FROM discount_rule
             ORDER BY priority ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_rule).collect()
    }

    async fn save(&self, rule: DiscountRule) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO discount_rule (id, label, condition_field, condition_operator, threshold,
                                        discount_kind, discount_value, active, priority,
                                        created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 label = excluded.label,
                 condition_field = excluded.condition_field,
                 condition_operator = excluded.condition_operator,
                 threshold = excluded.threshold,
                 discount_kind = excluded.discount_kind,
                 discount_value = excluded.discount_value,
                 active = excluded.active,
                 priority = excluded.priority,
                 updated_at = excluded.updated_at",
        )
        .bind(&rule.id.0)
        .bind(&rule.label)
        .bind(&rule.condition.field)
        .bind(&rule.condition.operator)
        .bind(rule.condition.threshold.to_string())
        .bind(rule.discount.kind.as_str())
        .bind(rule.discount.value.to_string())
        .bind(rule.active)
        .bind(rule.priority)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use roomquote_core::domain::discount::{
        Discount, DiscountCondition, DiscountKind, DiscountRule, DiscountRuleId,
    };

    use super::SqlDiscountRuleRepository;
    use crate::repositories::DiscountRuleRepository;
    use crate::{connect_with_settings, migrations};

    fn rule(id: &str, field: &str, priority: i32) -> DiscountRule {
        DiscountRule {
            id: DiscountRuleId(id.to_string()),
            label: format!("Rule {id}"),
            condition: DiscountCondition {
                field: field.to_string(),
                operator: ">=".to_string(),
                threshold: Decimal::new(1005, 1),
            },
            discount: Discount { kind: DiscountKind::Percent, value: Decimal::new(75, 1) },
            active: true,
            priority,
        }
    }

    #[tokio::test]
    async fn sql_discount_rule_repo_keeps_malformed_fields_verbatim() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let repo = SqlDiscountRuleRepository::new(pool.clone());

        let good = rule("b-good", "subtotal", 5);
        let odd = rule("a-odd", "weekday", 5);
        let first = rule("z-first", "total_area", 1);
        for rule in [good.clone(), odd.clone(), first.clone()] {
            repo.save(rule).await.expect("save rule");
        }

        let loaded = repo.load_discount_rules().await.expect("load");
        assert_eq!(loaded, vec![first, odd, good]);

        pool.close().await;
    }
}
