use clap::Args;
use roomquote_core::config::LoadOptions;
use roomquote_core::domain::room_type::{RoomType, RoomTypeId};
use rust_decimal::Decimal;

use crate::commands::{run_with_app, to_data, CommandFailure, CommandOutput, CommandResult};

#[derive(Debug, Clone, Args)]
pub struct RoomUpsertArgs {
    #[arg(long, help = "Stable room type id, e.g. `standard`")]
    pub id: String,
    #[arg(long, help = "Display name")]
    pub name: String,
    #[arg(long, help = "Price per unit of area")]
    pub rate: Decimal,
    #[arg(long, default_value_t = 0, help = "Display order (ascending)")]
    pub order: i32,
    #[arg(long, help = "Store the room type as inactive")]
    pub inactive: bool,
}

pub fn list(options: LoadOptions) -> CommandResult {
    run_with_app("rooms list", options, |app| async move {
        let room_types = app.desk.room_types().await?;
        Ok::<_, CommandFailure>(CommandOutput::new(
            format!("{} room types", room_types.len()),
            to_data(&room_types)?,
        ))
    })
}

pub fn upsert(options: LoadOptions, args: RoomUpsertArgs) -> CommandResult {
    run_with_app("rooms upsert", options, |app| async move {
        let room_type = app
            .desk
            .upsert_room_type(RoomType {
                id: RoomTypeId(args.id.trim().to_string()),
                name: args.name.trim().to_string(),
                price_per_area: args.rate,
                active: !args.inactive,
                display_order: args.order,
            })
            .await?;
        Ok::<_, CommandFailure>(CommandOutput::new(
            format!("saved room type `{}`", room_type.id),
            to_data(&room_type)?,
        ))
    })
}
