use anyhow::{anyhow, Context};
use roomquote_core::config::{LoadOptions, PricingConfig};
use roomquote_core::domain::room_type::RoomEntry;
use roomquote_core::pricing::{format_amount, PricingResult};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::commands::{run_with_app, to_data, CommandFailure, CommandOutput, CommandResult};

/// Parses `<room_type>=<area>`, e.g. `standard=50` or `kitchen=12.5`.
pub fn parse_room_entry(raw: &str) -> anyhow::Result<RoomEntry> {
    let (room_type, area) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected <room_type>=<area>, got `{raw}`"))?;
    let room_type = room_type.trim();
    if room_type.is_empty() {
        return Err(anyhow!("room type is missing in `{raw}`"));
    }
    let area = area
        .trim()
        .parse::<Decimal>()
        .with_context(|| format!("area `{}` is not a number", area.trim()))?;
    Ok(RoomEntry::new(room_type, area))
}

pub fn run(options: LoadOptions, rooms: Vec<RoomEntry>) -> CommandResult {
    run_with_app("calculate", options, |app| async move {
        let result = app.desk.calculate(&rooms).await?;
        let message = format!("total {}", format_amount(result.total, &app.config.pricing));
        Ok::<_, CommandFailure>(CommandOutput::new(
            message,
            priced_data(&result, &app.config.pricing)?,
        ))
    })
}

/// Pricing result plus display strings for the money fields.
pub(crate) fn priced_data(
    result: &PricingResult,
    pricing: &PricingConfig,
) -> Result<Value, CommandFailure> {
    Ok(json!({
        "result": to_data(result)?,
        "display": {
            "subtotal": format_amount(result.subtotal, pricing),
            "discount_total": format_amount(result.discount_total, pricing),
            "total": format_amount(result.total, pricing),
        },
    }))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::parse_room_entry;

    #[test]
    fn parses_room_type_and_decimal_area() {
        let entry = parse_room_entry(" kitchen = 12.5 ").expect("valid entry");
        assert_eq!(entry.room_type_id.0, "kitchen");
        assert_eq!(entry.area, Decimal::new(125, 1));
    }

    #[test]
    fn negative_area_parses_and_is_left_to_pricing() {
        let entry = parse_room_entry("standard=-1").expect("parsed");
        assert_eq!(entry.area, Decimal::NEGATIVE_ONE);
    }

    #[test]
    fn rejects_malformed_entries() {
        assert!(parse_room_entry("standard").is_err());
        assert!(parse_room_entry("=10").is_err());
        let error = parse_room_entry("standard=big").expect_err("not a number");
        assert!(error.to_string().contains("not a number"));
    }
}
