use std::env;
use std::fs;
use std::path::Path;

use roomquote_core::config::{resolve_config_path, AppConfig, LoadOptions, SettingKey};
use serde::Serialize;
use toml::Value;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct SettingLine {
    key: &'static str,
    value: String,
    source: String,
}

/// Effective settings with where each value came from. Precedence:
/// env > file > default.
pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let settings: Vec<SettingLine> = SettingKey::ALL
        .into_iter()
        .map(|key| SettingLine {
            key: key.as_str(),
            value: config.get_setting(key),
            source: field_source(key, config_file_doc.as_ref(), config_file_path.as_deref()),
        })
        .collect();

    let message = match &config_file_path {
        Some(path) => format!("effective config (file: {})", path.display()),
        None => "effective config (no config file found)".to_string(),
    };
    match serde_json::to_value(&settings) {
        Ok(data) => CommandResult::success_with_data("config", message, data),
        Err(error) => CommandResult::failure("config", "serialization", error.to_string(), 10),
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key: SettingKey,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    for env_key in env_keys(key) {
        if env::var_os(&env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key.as_str()) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn env_keys(key: SettingKey) -> Vec<String> {
    let mut keys = vec![key.env_var()];
    match key {
        SettingKey::LoggingLevel => keys.insert(0, "ROOMQUOTE_LOG_LEVEL".to_string()),
        SettingKey::LoggingFormat => keys.insert(0, "ROOMQUOTE_LOG_FORMAT".to_string()),
        _ => {}
    }
    keys
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
