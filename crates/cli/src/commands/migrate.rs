use roomquote_core::config::LoadOptions;
use roomquote_db::migrations::MIGRATOR;
use serde_json::json;

use crate::commands::{run_with_app, CommandFailure, CommandOutput, CommandResult};

pub fn run(options: LoadOptions) -> CommandResult {
    run_with_app("migrate", options, |app| async move {
        let migrations: Vec<String> = MIGRATOR
            .iter()
            .map(|migration| format!("{}_{}", migration.version, migration.description))
            .collect();

        Ok::<_, CommandFailure>(CommandOutput::new(
            "applied pending migrations",
            json!({ "database_url": app.config.database.url, "migrations": migrations }),
        ))
    })
}
