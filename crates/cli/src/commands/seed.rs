use roomquote_core::config::LoadOptions;
use roomquote_db::seed_demo_catalog;

use crate::commands::{run_with_app, to_data, CommandFailure, CommandOutput, CommandResult};

/// Loads the demo catalogue. Re-running updates the same rows.
pub fn run(options: LoadOptions) -> CommandResult {
    run_with_app("seed", options, |app| async move {
        let seeded = seed_demo_catalog(&app.db_pool)
            .await
            .map_err(|error| CommandFailure::new("seed_execution", error.to_string(), 5))?;

        Ok::<_, CommandFailure>(CommandOutput::new(
            format!(
                "seeded {} room types and {} discount rules",
                seeded.room_types, seeded.discount_rules
            ),
            to_data(&seeded)?,
        ))
    })
}
