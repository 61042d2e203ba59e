pub mod discount;
pub mod quote;
pub mod room_type;
