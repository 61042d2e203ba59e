pub mod calculate;
pub mod config;
pub mod discounts;
pub mod doctor;
pub mod migrate;
pub mod notifications;
pub mod quotes;
pub mod rooms;
pub mod seed;
pub mod submit;

use std::future::Future;

use roomquote_app::{bootstrap, Application, BootstrapError};
use roomquote_core::config::LoadOptions;
use roomquote_core::errors::{ApplicationError, InterfaceError};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    data: Value,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, Value::Null)
    }

    pub fn success_with_data(command: &str, message: impl Into<String>, data: Value) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::failure_with_data(command, error_class, message, exit_code, Value::Null)
    }

    pub fn failure_with_data(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        data: Value,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\",\"data\":null}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Successful body of a command run through [`run_with_app`].
#[derive(Debug)]
pub struct CommandOutput {
    pub message: String,
    pub data: Value,
}

impl CommandOutput {
    pub fn new(message: impl Into<String>, data: Value) -> Self {
        Self { message: message.into(), data }
    }
}

#[derive(Debug)]
pub struct CommandFailure {
    pub error_class: String,
    pub message: String,
    pub exit_code: u8,
    pub data: Value,
}

impl CommandFailure {
    pub fn new(error_class: &str, message: impl Into<String>, exit_code: u8) -> Self {
        Self {
            error_class: error_class.to_string(),
            message: message.into(),
            exit_code,
            data: Value::Null,
        }
    }
}

impl From<BootstrapError> for CommandFailure {
    fn from(error: BootstrapError) -> Self {
        match &error {
            BootstrapError::Config(_) => {
                Self::new("config_validation", format!("configuration issue: {error}"), 2)
            }
            BootstrapError::Notification(_) => {
                Self::new("notification_config", error.to_string(), 2)
            }
            BootstrapError::DatabaseConnect(_) => {
                Self::new("db_connectivity", error.to_string(), 4)
            }
            BootstrapError::Migration(_) => Self::new("migration", error.to_string(), 5),
        }
    }
}

impl From<ApplicationError> for CommandFailure {
    fn from(error: ApplicationError) -> Self {
        let reason = error.reason_code();
        let message = error.to_string();
        let correlation_id = format!("cli-{}", uuid::Uuid::new_v4().simple());
        let interface = error.into_interface(correlation_id.clone());

        let exit_code = match interface {
            InterfaceError::BadRequest { .. } => 6,
            InterfaceError::NotFound { .. } => 7,
            InterfaceError::ServiceUnavailable { .. } => 8,
            InterfaceError::Internal { .. } => 9,
        };
        Self {
            error_class: reason.to_string(),
            message,
            exit_code,
            data: json!({
                "correlation_id": correlation_id,
                "user_message": interface.user_message(),
            }),
        }
    }
}

pub(crate) fn to_data<T: Serialize>(value: &T) -> Result<Value, CommandFailure> {
    serde_json::to_value(value)
        .map_err(|error| CommandFailure::new("serialization", error.to_string(), 10))
}

/// Bootstraps the application on a current-thread runtime, runs `action`
/// and closes the pool before rendering the outcome.
pub(crate) fn run_with_app<F, Fut>(command: &str, options: LoadOptions, action: F) -> CommandResult
where
    F: FnOnce(Application) -> Fut,
    Fut: Future<Output = Result<CommandOutput, CommandFailure>>,
{
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let app = match bootstrap(options).await {
            Ok(app) => app,
            Err(error) => return Err(CommandFailure::from(error)),
        };
        let pool = app.db_pool.clone();
        let result = action(app).await;
        pool.close().await;
        result
    });

    match result {
        Ok(output) => CommandResult::success_with_data(command, output.message, output.data),
        Err(failure) => CommandResult::failure_with_data(
            command,
            &failure.error_class,
            failure.message,
            failure.exit_code,
            failure.data,
        ),
    }
}

#[cfg(test)]
mod tests {
    use roomquote_core::errors::{ApplicationError, DomainError};
    use serde_json::Value;

    use super::{CommandFailure, CommandResult};

    #[test]
    fn failure_payload_carries_error_class_and_null_data() {
        let result = CommandResult::failure("migrate", "db_connectivity", "refused", 4);
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 4);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "db_connectivity");
        assert!(payload["data"].is_null());
    }

    #[test]
    fn rejected_request_maps_to_reason_and_correlation_id() {
        let failure = CommandFailure::from(ApplicationError::from(DomainError::validation(
            "client.email",
            "invalid or missing fields: client.email",
        )));

        assert_eq!(failure.error_class, "validation_error");
        assert_eq!(failure.exit_code, 6);
        assert!(failure.data["correlation_id"].as_str().unwrap_or_default().starts_with("cli-"));
    }

    #[test]
    fn missing_record_maps_to_not_found_exit_code() {
        let failure =
            CommandFailure::from(ApplicationError::NotFound("quote Q-000009".to_string()));
        assert_eq!(failure.error_class, "not_found");
        assert_eq!(failure.exit_code, 7);
    }
}
