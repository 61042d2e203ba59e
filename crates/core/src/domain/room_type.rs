use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomTypeId(pub String);

impl std::fmt::Display for RoomTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomType {
    pub id: RoomTypeId,
    pub name: String,
    pub price_per_area: Decimal,
    pub active: bool,
    pub display_order: i32,
}

/// One line of user input: a room category and its floor area.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomEntry {
    pub room_type_id: RoomTypeId,
    pub area: Decimal,
}

impl RoomEntry {
    pub fn new(room_type_id: impl Into<String>, area: Decimal) -> Self {
        Self { room_type_id: RoomTypeId(room_type_id.into()), area }
    }
}
