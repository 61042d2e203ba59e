use roomquote_core::config::LoadOptions;
use roomquote_db::repositories::{NotificationFilter, NotificationOutcome};

use crate::commands::{run_with_app, to_data, CommandFailure, CommandOutput, CommandResult};

pub fn run(options: LoadOptions, failed_only: bool, limit: Option<u32>) -> CommandResult {
    let filter = NotificationFilter {
        outcome: failed_only.then_some(NotificationOutcome::Failed),
        limit,
    };
    run_with_app("notifications", options, |app| async move {
        let records = app.desk.list_notifications(&filter).await?;
        let noun = if failed_only { "failed deliveries" } else { "delivery attempts" };
        Ok::<_, CommandFailure>(CommandOutput::new(
            format!("{} {noun}", records.len()),
            to_data(&records)?,
        ))
    })
}
