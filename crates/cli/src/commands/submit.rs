use roomquote_core::config::LoadOptions;
use roomquote_core::domain::quote::ClientContact;
use roomquote_core::domain::room_type::RoomEntry;
use roomquote_core::pricing::format_amount;
use roomquote_core::submission::QuoteSubmission;
use serde_json::json;

use crate::commands::{run_with_app, to_data, CommandFailure, CommandOutput, CommandResult};

#[derive(Debug, Clone)]
pub struct SubmitArgs {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub rooms: Vec<RoomEntry>,
}

/// Records a quote and waits for its notifications before returning, so the
/// process does not exit with deliveries in flight.
pub fn run(options: LoadOptions, args: SubmitArgs) -> CommandResult {
    run_with_app("submit", options, |app| async move {
        let submission = QuoteSubmission {
            client: ClientContact { name: args.name, email: args.email, phone: args.phone },
            notes: args.notes,
            entries: args.rooms,
        };

        let submitted = app.desk.submit_quote(submission).await?;
        let notifications = submitted.delivery.wait().await;
        let quote = submitted.quote;

        let message = format!(
            "recorded quote {} for {}",
            quote.quote_number,
            format_amount(quote.total, &app.config.pricing)
        );
        Ok::<_, CommandFailure>(CommandOutput::new(
            message,
            json!({
                "quote": to_data(&quote)?,
                "warnings": to_data(&submitted.warnings)?,
                "notifications": to_data(&notifications)?,
            }),
        ))
    })
}
