use rust_decimal::Decimal;

use roomquote_core::domain::discount::{
    Discount, DiscountCondition, DiscountKind, DiscountRule, DiscountRuleId,
};
use roomquote_core::domain::room_type::{RoomType, RoomTypeId};

use crate::connection::DbPool;
use crate::repositories::{
    DiscountRuleRepository, RepositoryError, RoomTypeRepository, SqlDiscountRuleRepository,
    SqlRoomTypeRepository,
};

/// Demo catalogue: three active room types and one retired one.
pub fn demo_room_types() -> Vec<RoomType> {
    let room = |id: &str, name: &str, rate: Decimal, active: bool, order: i32| RoomType {
        id: RoomTypeId(id.to_string()),
        name: name.to_string(),
        price_per_area: rate,
        active,
        display_order: order,
    };

    vec![
        room("standard", "Standard room", Decimal::new(250, 2), true, 1),
        room("bathroom", "Bathroom", Decimal::new(400, 2), true, 2),
        room("kitchen", "Kitchen", Decimal::new(375, 2), true, 3),
        room("conservatory", "Conservatory", Decimal::new(300, 2), false, 4),
    ]
}

/// Demo rules: 10% off above 100 and a fixed 15 off for jobs of five rooms or more.
pub fn demo_discount_rules() -> Vec<DiscountRule> {
    vec![
        DiscountRule {
            id: DiscountRuleId("over-100".to_string()),
            label: "10% off orders over 100".to_string(),
            condition: DiscountCondition {
                field: "subtotal".to_string(),
                operator: ">".to_string(),
                threshold: Decimal::new(100, 0),
            },
            discount: Discount { kind: DiscountKind::Percent, value: Decimal::TEN },
            active: true,
            priority: 10,
        },
        DiscountRule {
            id: DiscountRuleId("five-rooms".to_string()),
            label: "15 off five rooms or more".to_string(),
            condition: DiscountCondition {
                field: "room_count".to_string(),
                operator: ">=".to_string(),
                threshold: Decimal::new(5, 0),
            },
            discount: Discount { kind: DiscountKind::Fixed, value: Decimal::new(15, 0) },
            active: true,
            priority: 20,
        },
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SeedResult {
    pub room_types: usize,
    pub discount_rules: usize,
}

/// Upserts the demo catalogue. Safe to run repeatedly.
pub async fn seed_demo_catalog(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
    let room_repo = SqlRoomTypeRepository::new(pool.clone());
    let rule_repo = SqlDiscountRuleRepository::new(pool.clone());

    let room_types = demo_room_types();
    let discount_rules = demo_discount_rules();
    let result = SeedResult { room_types: room_types.len(), discount_rules: discount_rules.len() };

    for room_type in room_types {
        room_repo.save(room_type).await?;
    }
    for rule in discount_rules {
        rule_repo.save(rule).await?;
    }

    Ok(result)
}
