use crate::domain::room_type::{RoomType, RoomTypeId};

/// Active room types in display order. Inactive entries are dropped on
/// construction so lookups treat them exactly like unknown ids.
#[derive(Clone, Debug, Default)]
pub struct RoomTypeRegistry {
    room_types: Vec<RoomType>,
}

impl RoomTypeRegistry {
    pub fn new(room_types: Vec<RoomType>) -> Self {
        let mut room_types: Vec<RoomType> =
            room_types.into_iter().filter(|room_type| room_type.active).collect();
        room_types.sort_by(|left, right| {
            left.display_order.cmp(&right.display_order).then_with(|| left.name.cmp(&right.name))
        });
        Self { room_types }
    }

    pub fn find(&self, room_type_id: &RoomTypeId) -> Option<&RoomType> {
        self.room_types.iter().find(|room_type| &room_type.id == room_type_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoomType> {
        self.room_types.iter()
    }

    pub fn len(&self) -> usize {
        self.room_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.room_types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::RoomTypeRegistry;
    use crate::domain::room_type::{RoomType, RoomTypeId};

    fn room_type(id: &str, name: &str, active: bool, display_order: i32) -> RoomType {
        RoomType {
            id: RoomTypeId(id.to_string()),
            name: name.to_string(),
            price_per_area: Decimal::new(250, 2),
            active,
            display_order,
        }
    }

    #[test]
    fn inactive_room_types_are_not_found() {
        let registry = RoomTypeRegistry::new(vec![
            room_type("standard", "Standard", true, 1),
            room_type("archive", "Archive", false, 2),
        ]);

        assert!(registry.find(&RoomTypeId("standard".to_string())).is_some());
        assert!(registry.find(&RoomTypeId("archive".to_string())).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_orders_by_display_order_then_name() {
        let registry = RoomTypeRegistry::new(vec![
            room_type("suite", "Suite", true, 2),
            room_type("kitchen", "Kitchen", true, 1),
            room_type("bath", "Bathroom", true, 1),
        ]);

        let ids: Vec<&str> = registry.iter().map(|room_type| room_type.id.0.as_str()).collect();
        assert_eq!(ids, vec!["bath", "kitchen", "suite"]);
    }
}
