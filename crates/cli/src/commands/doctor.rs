use std::sync::Arc;

use roomquote_app::NotificationDispatcher;
use roomquote_core::config::{AppConfig, LoadOptions};
use roomquote_db::connection::connect_from_config;
use roomquote_db::migrations;
use roomquote_db::repositories::{
    InMemoryNotificationLogRepository, RoomTypeRepository, SqlRoomTypeRepository,
};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions) -> CommandResult {
    let report = build_report(options);
    let summary = if report.overall_status == CheckStatus::Pass {
        "doctor: all readiness checks passed"
    } else {
        "doctor: one or more readiness checks failed"
    };

    let data = match serde_json::to_value(&report) {
        Ok(data) => data,
        Err(error) => {
            return CommandResult::failure("doctor", "serialization", error.to_string(), 10);
        }
    };
    if report.overall_status == CheckStatus::Pass {
        CommandResult::success_with_data("doctor", summary, data)
    } else {
        CommandResult::failure_with_data("doctor", "readiness", summary, 1, data)
    }
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_notification_channels(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["notification_channels", "database_connectivity", "room_catalogue"] {
                checks.push(DoctorCheck::skipped(name, "configuration did not load"));
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    DoctorReport { overall_status, checks }
}

fn check_notification_channels(config: &AppConfig) -> DoctorCheck {
    let log = Arc::new(InMemoryNotificationLogRepository::default());
    match NotificationDispatcher::from_config(config, log) {
        Ok(dispatcher) => {
            let channels = dispatcher.channels();
            let details = if channels.is_empty() {
                "no notification channels enabled".to_string()
            } else {
                format!("enabled channels: {}", channels.join(", "))
            };
            DoctorCheck { name: "notification_channels", status: CheckStatus::Pass, details }
        }
        Err(error) => DoctorCheck {
            name: "notification_channels",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

/// Connectivity, then an active room type once migrations are applied.
fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
                DoctorCheck::skipped("room_catalogue", "the async runtime did not start"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_from_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck {
                        name: "database_connectivity",
                        status: CheckStatus::Fail,
                        details: format!("failed to connect to database: {error}"),
                    },
                    DoctorCheck::skipped("room_catalogue", "the database is unreachable"),
                ];
            }
        };
        let connectivity = DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        };

        let catalogue = match migrations::run_pending(&pool).await {
            Err(error) => DoctorCheck {
                name: "room_catalogue",
                status: CheckStatus::Fail,
                details: format!("migrations failed: {error}"),
            },
            Ok(()) => match SqlRoomTypeRepository::new(pool.clone()).load_room_types().await {
                Ok(room_types) => {
                    let active = room_types.iter().filter(|room| room.active).count();
                    if active == 0 {
                        DoctorCheck {
                            name: "room_catalogue",
                            status: CheckStatus::Fail,
                            details: "no active room types; run `roomquote seed` or `roomquote rooms upsert`"
                                .to_string(),
                        }
                    } else {
                        DoctorCheck {
                            name: "room_catalogue",
                            status: CheckStatus::Pass,
                            details: format!("{active} active room types"),
                        }
                    }
                }
                Err(error) => DoctorCheck {
                    name: "room_catalogue",
                    status: CheckStatus::Fail,
                    details: error.to_string(),
                },
            },
        };

        pool.close().await;
        vec![connectivity, catalogue]
    })
}
