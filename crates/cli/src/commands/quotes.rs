use roomquote_core::config::LoadOptions;
use roomquote_core::domain::quote::{QuoteNumber, QuoteStatus};
use roomquote_db::repositories::QuoteFilter;

use crate::commands::{run_with_app, to_data, CommandFailure, CommandOutput, CommandResult};

pub fn list(options: LoadOptions, filter: QuoteFilter) -> CommandResult {
    run_with_app("quotes list", options, |app| async move {
        let quotes = app.desk.list_quotes(&filter).await?;
        Ok::<_, CommandFailure>(CommandOutput::new(
            format!("{} quotes", quotes.len()),
            to_data(&quotes)?,
        ))
    })
}

pub fn show(options: LoadOptions, number: String) -> CommandResult {
    run_with_app("quotes show", options, |app| async move {
        let quote = app.desk.find_quote(&QuoteNumber(number)).await?;
        Ok::<_, CommandFailure>(CommandOutput::new(
            format!("quote {} is {}", quote.quote_number, quote.status.as_str()),
            to_data(&quote)?,
        ))
    })
}

pub fn confirm(options: LoadOptions, number: String) -> CommandResult {
    transition("quotes confirm", options, number, QuoteStatus::Confirmed)
}

pub fn reject(options: LoadOptions, number: String) -> CommandResult {
    transition("quotes reject", options, number, QuoteStatus::Rejected)
}

fn transition(
    command: &str,
    options: LoadOptions,
    number: String,
    status: QuoteStatus,
) -> CommandResult {
    run_with_app(command, options, |app| async move {
        let quote = app.desk.update_status(&QuoteNumber(number), status).await?;
        Ok::<_, CommandFailure>(CommandOutput::new(
            format!("quote {} is now {}", quote.quote_number, quote.status.as_str()),
            to_data(&quote)?,
        ))
    })
}
