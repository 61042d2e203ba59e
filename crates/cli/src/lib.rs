pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use roomquote_core::config::{AppConfig, LoadOptions, LogFormat};
use roomquote_core::domain::quote::QuoteStatus;
use roomquote_core::domain::room_type::RoomEntry;
use roomquote_db::repositories::QuoteFilter;
use tracing_subscriber::EnvFilter;

use crate::commands::calculate::parse_room_entry;
use crate::commands::discounts::DiscountUpsertArgs;
use crate::commands::rooms::RoomUpsertArgs;
use crate::commands::submit::SubmitArgs;

#[derive(Debug, Parser)]
#[command(
    name = "roomquote",
    about = "Room quote calculator operator CLI",
    long_about = "Price room entries, record numbered quotes, manage the room catalogue and discount rules, and inspect notification deliveries.",
    after_help = "Examples:\n  roomquote seed\n  roomquote calculate --room standard=50\n  roomquote submit --name 'Ada Client' --email ada@example.com --room standard=50\n  roomquote quotes confirm Q-000001\n  roomquote notifications --failed"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to roomquote.toml (must exist when given)")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations")]
    Migrate,
    #[command(about = "Load the demo room types and discount rules (idempotent)")]
    Seed,
    #[command(about = "Show effective configuration with source attribution and redaction")]
    Config,
    #[command(about = "Check configuration, notification channels, database and catalogue")]
    Doctor,
    #[command(about = "List or edit room types")]
    Rooms {
        #[command(subcommand)]
        action: RoomsCommand,
    },
    #[command(about = "List or edit discount rules")]
    Discounts {
        #[command(subcommand)]
        action: DiscountsCommand,
    },
    #[command(about = "Price room entries without recording a quote")]
    Calculate {
        #[arg(long = "room", value_name = "TYPE=AREA", value_parser = parse_room_entry)]
        rooms: Vec<RoomEntry>,
    },
    #[command(about = "Record a numbered quote and notify configured channels")]
    Submit {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long = "room", value_name = "TYPE=AREA", value_parser = parse_room_entry)]
        rooms: Vec<RoomEntry>,
    },
    #[command(about = "List, inspect, confirm or reject quotes")]
    Quotes {
        #[command(subcommand)]
        action: QuotesCommand,
    },
    #[command(about = "List notification delivery attempts")]
    Notifications {
        #[arg(long, help = "Only show failed deliveries")]
        failed: bool,
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Debug, Subcommand)]
enum RoomsCommand {
    List,
    Upsert(RoomUpsertArgs),
}

#[derive(Debug, Subcommand)]
enum DiscountsCommand {
    List,
    Upsert(DiscountUpsertArgs),
}

#[derive(Debug, Subcommand)]
enum QuotesCommand {
    List {
        #[arg(long)]
        status: Option<QuoteStatus>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Show {
        number: String,
    },
    Confirm {
        number: String,
    },
    Reject {
        number: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions {
        require_file: cli.config.is_some(),
        config_path: cli.config,
        ..LoadOptions::default()
    };
    init_logging(&options);

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(options),
        Command::Seed => commands::seed::run(options),
        Command::Config => commands::config::run(options),
        Command::Doctor => commands::doctor::run(options),
        Command::Rooms { action: RoomsCommand::List } => commands::rooms::list(options),
        Command::Rooms { action: RoomsCommand::Upsert(args) } => {
            commands::rooms::upsert(options, args)
        }
        Command::Discounts { action: DiscountsCommand::List } => {
            commands::discounts::list(options)
        }
        Command::Discounts { action: DiscountsCommand::Upsert(args) } => {
            commands::discounts::upsert(options, args)
        }
        Command::Calculate { rooms } => commands::calculate::run(options, rooms),
        Command::Submit { name, email, phone, notes, rooms } => {
            commands::submit::run(options, SubmitArgs { name, email, phone, notes, rooms })
        }
        Command::Quotes { action } => match action {
            QuotesCommand::List { status, email, limit } => commands::quotes::list(
                options,
                QuoteFilter { status, client_email: email, limit },
            ),
            QuotesCommand::Show { number } => commands::quotes::show(options, number),
            QuotesCommand::Confirm { number } => commands::quotes::confirm(options, number),
            QuotesCommand::Reject { number } => commands::quotes::reject(options, number),
        },
        Command::Notifications { failed, limit } => {
            commands::notifications::run(options, failed, limit)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout carries only the command's JSON. A config
/// that fails to load falls back to defaults here; the command reports it.
fn init_logging(options: &LoadOptions) {
    let config = AppConfig::load(options.clone()).unwrap_or_default();
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command, QuotesCommand};

    #[test]
    fn parses_repeated_room_entries() {
        let cli = Cli::try_parse_from([
            "roomquote",
            "calculate",
            "--room",
            "standard=50",
            "--room",
            "kitchen=12.5",
        ])
        .expect("valid args");

        match cli.command {
            Command::Calculate { rooms } => {
                assert_eq!(rooms.len(), 2);
                assert_eq!(rooms[1].room_type_id.0, "kitchen");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn malformed_room_entry_is_a_usage_error() {
        assert!(Cli::try_parse_from(["roomquote", "calculate", "--room", "standard"]).is_err());
    }

    #[test]
    fn quotes_list_accepts_status_filter() {
        let cli = Cli::try_parse_from(["roomquote", "quotes", "list", "--status", "pending"])
            .expect("valid args");
        assert!(matches!(
            cli.command,
            Command::Quotes { action: QuotesCommand::List { status: Some(_), .. } }
        ));
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["roomquote", "doctor", "--config", "custom.toml"])
            .expect("valid args");
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("custom.toml")));
    }
}
