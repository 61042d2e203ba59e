use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pricing::discount::DiscountMode;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub pricing: PricingConfig,
    pub quotes: QuoteNumberingConfig,
    pub notifications: NotificationConfig,
    pub email: EmailConfig,
    pub webhook: WebhookConfig,
    pub branding: BrandingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricingConfig {
    pub currency: String,
    pub currency_symbol: String,
    pub symbol_position: SymbolPosition,
    pub decimal_precision: u32,
    pub discount_mode: DiscountMode,
}

#[derive(Clone, Debug)]
pub struct QuoteNumberingConfig {
    pub number_prefix: String,
    pub number_width: usize,
}

#[derive(Clone, Debug)]
pub struct NotificationConfig {
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<SecretString>,
    pub from_address: String,
    pub admin_address: Option<String>,
    pub send_client_copy: bool,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub url: Option<String>,
    pub secret: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct BrandingConfig {
    pub company_name: String,
    pub primary_color: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolPosition {
    Before,
    After,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub discount_mode: Option<DiscountMode>,
    pub decimal_precision: Option<u32>,
    pub email_enabled: Option<bool>,
    pub webhook_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("unrecognized setting `{0}`")]
    UnknownSetting(String),
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://roomquote.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            pricing: PricingConfig::default(),
            quotes: QuoteNumberingConfig { number_prefix: "Q-".to_string(), number_width: 6 },
            notifications: NotificationConfig { timeout_secs: 10 },
            email: EmailConfig {
                enabled: false,
                smtp_host: None,
                smtp_port: 587,
                smtp_user: None,
                smtp_password: None,
                from_address: "noreply@roomquote.local".to_string(),
                admin_address: None,
                send_client_copy: true,
            },
            webhook: WebhookConfig { url: None, secret: None },
            branding: BrandingConfig {
                company_name: "Room Quote".to_string(),
                primary_color: "#1e73be".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: "EUR".to_string(),
            currency_symbol: "€".to_string(),
            symbol_position: SymbolPosition::After,
            decimal_precision: 2,
            discount_mode: DiscountMode::FirstMatch,
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for SymbolPosition {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "before" | "left" => Ok(Self::Before),
            "after" | "right" => Ok(Self::After),
            other => Err(ConfigError::Validation(format!(
                "unsupported currency symbol position `{other}` (expected before|after)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

/// Every setting the application recognizes, addressable as `section.key`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SettingKey {
    DatabaseUrl,
    DatabaseMaxConnections,
    DatabaseTimeoutSecs,
    PricingCurrency,
    PricingCurrencySymbol,
    PricingSymbolPosition,
    PricingDecimalPrecision,
    PricingDiscountMode,
    QuotesNumberPrefix,
    QuotesNumberWidth,
    NotificationsTimeoutSecs,
    EmailEnabled,
    EmailSmtpHost,
    EmailSmtpPort,
    EmailSmtpUser,
    EmailSmtpPassword,
    EmailFromAddress,
    EmailAdminAddress,
    EmailSendClientCopy,
    WebhookUrl,
    WebhookSecret,
    BrandingCompanyName,
    BrandingPrimaryColor,
    LoggingLevel,
    LoggingFormat,
}

impl SettingKey {
    pub const ALL: [SettingKey; 25] = [
        Self::DatabaseUrl,
        Self::DatabaseMaxConnections,
        Self::DatabaseTimeoutSecs,
        Self::PricingCurrency,
        Self::PricingCurrencySymbol,
        Self::PricingSymbolPosition,
        Self::PricingDecimalPrecision,
        Self::PricingDiscountMode,
        Self::QuotesNumberPrefix,
        Self::QuotesNumberWidth,
        Self::NotificationsTimeoutSecs,
        Self::EmailEnabled,
        Self::EmailSmtpHost,
        Self::EmailSmtpPort,
        Self::EmailSmtpUser,
        Self::EmailSmtpPassword,
        Self::EmailFromAddress,
        Self::EmailAdminAddress,
        Self::EmailSendClientCopy,
        Self::WebhookUrl,
        Self::WebhookSecret,
        Self::BrandingCompanyName,
        Self::BrandingPrimaryColor,
        Self::LoggingLevel,
        Self::LoggingFormat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DatabaseUrl => "database.url",
            Self::DatabaseMaxConnections => "database.max_connections",
            Self::DatabaseTimeoutSecs => "database.timeout_secs",
            Self::PricingCurrency => "pricing.currency",
            Self::PricingCurrencySymbol => "pricing.currency_symbol",
            Self::PricingSymbolPosition => "pricing.symbol_position",
            Self::PricingDecimalPrecision => "pricing.decimal_precision",
            Self::PricingDiscountMode => "pricing.discount_mode",
            Self::QuotesNumberPrefix => "quotes.number_prefix",
            Self::QuotesNumberWidth => "quotes.number_width",
            Self::NotificationsTimeoutSecs => "notifications.timeout_secs",
            Self::EmailEnabled => "email.enabled",
            Self::EmailSmtpHost => "email.smtp_host",
            Self::EmailSmtpPort => "email.smtp_port",
            Self::EmailSmtpUser => "email.smtp_user",
            Self::EmailSmtpPassword => "email.smtp_password",
            Self::EmailFromAddress => "email.from_address",
            Self::EmailAdminAddress => "email.admin_address",
            Self::EmailSendClientCopy => "email.send_client_copy",
            Self::WebhookUrl => "webhook.url",
            Self::WebhookSecret => "webhook.secret",
            Self::BrandingCompanyName => "branding.company_name",
            Self::BrandingPrimaryColor => "branding.primary_color",
            Self::LoggingLevel => "logging.level",
            Self::LoggingFormat => "logging.format",
        }
    }

    /// `database.url` -> `ROOMQUOTE_DATABASE_URL`.
    pub fn env_var(&self) -> String {
        format!("ROOMQUOTE_{}", self.as_str().replace('.', "_").to_ascii_uppercase())
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, Self::EmailSmtpPassword | Self::WebhookSecret)
    }
}

impl std::str::FromStr for SettingKey {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == normalized)
            .ok_or(ConfigError::UnknownSetting(normalized))
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("roomquote.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Effective value of a setting as display text. Secrets are redacted.
    pub fn get_setting(&self, key: SettingKey) -> String {
        fn optional(value: &Option<String>) -> String {
            value.clone().unwrap_or_else(|| "<unset>".to_string())
        }
        fn secret(value: &Option<SecretString>) -> String {
            if value.is_some() { "<redacted>" } else { "<unset>" }.to_string()
        }

        match key {
            SettingKey::DatabaseUrl => self.database.url.clone(),
            SettingKey::DatabaseMaxConnections => self.database.max_connections.to_string(),
            SettingKey::DatabaseTimeoutSecs => self.database.timeout_secs.to_string(),
            SettingKey::PricingCurrency => self.pricing.currency.clone(),
            SettingKey::PricingCurrencySymbol => self.pricing.currency_symbol.clone(),
            SettingKey::PricingSymbolPosition => match self.pricing.symbol_position {
                SymbolPosition::Before => "before".to_string(),
                SymbolPosition::After => "after".to_string(),
            },
            SettingKey::PricingDecimalPrecision => self.pricing.decimal_precision.to_string(),
            SettingKey::PricingDiscountMode => self.pricing.discount_mode.as_str().to_string(),
            SettingKey::QuotesNumberPrefix => self.quotes.number_prefix.clone(),
            SettingKey::QuotesNumberWidth => self.quotes.number_width.to_string(),
            SettingKey::NotificationsTimeoutSecs => self.notifications.timeout_secs.to_string(),
            SettingKey::EmailEnabled => self.email.enabled.to_string(),
            SettingKey::EmailSmtpHost => optional(&self.email.smtp_host),
            SettingKey::EmailSmtpPort => self.email.smtp_port.to_string(),
            SettingKey::EmailSmtpUser => optional(&self.email.smtp_user),
            SettingKey::EmailSmtpPassword => secret(&self.email.smtp_password),
            SettingKey::EmailFromAddress => self.email.from_address.clone(),
            SettingKey::EmailAdminAddress => optional(&self.email.admin_address),
            SettingKey::EmailSendClientCopy => self.email.send_client_copy.to_string(),
            SettingKey::WebhookUrl => optional(&self.webhook.url),
            SettingKey::WebhookSecret => secret(&self.webhook.secret),
            SettingKey::BrandingCompanyName => self.branding.company_name.clone(),
            SettingKey::BrandingPrimaryColor => self.branding.primary_color.clone(),
            SettingKey::LoggingLevel => self.logging.level.clone(),
            SettingKey::LoggingFormat => match self.logging.format {
                LogFormat::Compact => "compact".to_string(),
                LogFormat::Pretty => "pretty".to_string(),
                LogFormat::Json => "json".to_string(),
            },
        }
    }

    /// Assigns a setting from its textual form, as read from the environment.
    pub fn set_setting(&mut self, key: SettingKey, value: String) -> Result<(), ConfigError> {
        let name = key.env_var();
        match key {
            SettingKey::DatabaseUrl => self.database.url = value,
            SettingKey::DatabaseMaxConnections => {
                self.database.max_connections = parse_value(&name, &value)?
            }
            SettingKey::DatabaseTimeoutSecs => {
                self.database.timeout_secs = parse_value(&name, &value)?
            }
            SettingKey::PricingCurrency => self.pricing.currency = value,
            SettingKey::PricingCurrencySymbol => self.pricing.currency_symbol = value,
            SettingKey::PricingSymbolPosition => self.pricing.symbol_position = value.parse()?,
            SettingKey::PricingDecimalPrecision => {
                self.pricing.decimal_precision = parse_value(&name, &value)?
            }
            SettingKey::PricingDiscountMode => {
                self.pricing.discount_mode = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnvOverride { key: name, value })?
            }
            SettingKey::QuotesNumberPrefix => self.quotes.number_prefix = value,
            SettingKey::QuotesNumberWidth => {
                self.quotes.number_width = parse_value(&name, &value)?
            }
            SettingKey::NotificationsTimeoutSecs => {
                self.notifications.timeout_secs = parse_value(&name, &value)?
            }
            SettingKey::EmailEnabled => self.email.enabled = parse_value(&name, &value)?,
            SettingKey::EmailSmtpHost => self.email.smtp_host = Some(value),
            SettingKey::EmailSmtpPort => self.email.smtp_port = parse_value(&name, &value)?,
            SettingKey::EmailSmtpUser => self.email.smtp_user = Some(value),
            SettingKey::EmailSmtpPassword => {
                self.email.smtp_password = Some(secret_value(value)); // ubs:ignore
            }
            SettingKey::EmailFromAddress => self.email.from_address = value,
            SettingKey::EmailAdminAddress => self.email.admin_address = Some(value),
            SettingKey::EmailSendClientCopy => {
                self.email.send_client_copy = parse_value(&name, &value)?
            }
            SettingKey::WebhookUrl => self.webhook.url = Some(value),
            SettingKey::WebhookSecret => {
                self.webhook.secret = Some(secret_value(value)); // ubs:ignore
            }
            SettingKey::BrandingCompanyName => self.branding.company_name = value,
            SettingKey::BrandingPrimaryColor => self.branding.primary_color = value,
            SettingKey::LoggingLevel => self.logging.level = value,
            SettingKey::LoggingFormat => self.logging.format = value.parse()?,
        }
        Ok(())
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(currency) = pricing.currency {
                self.pricing.currency = currency;
            }
            if let Some(currency_symbol) = pricing.currency_symbol {
                self.pricing.currency_symbol = currency_symbol;
            }
            if let Some(symbol_position) = pricing.symbol_position {
                self.pricing.symbol_position = symbol_position;
            }
            if let Some(decimal_precision) = pricing.decimal_precision {
                self.pricing.decimal_precision = decimal_precision;
            }
            if let Some(discount_mode) = pricing.discount_mode {
                self.pricing.discount_mode = discount_mode;
            }
        }

        if let Some(quotes) = patch.quotes {
            if let Some(number_prefix) = quotes.number_prefix {
                self.quotes.number_prefix = number_prefix;
            }
            if let Some(number_width) = quotes.number_width {
                self.quotes.number_width = number_width;
            }
        }

        if let Some(notifications) = patch.notifications {
            if let Some(timeout_secs) = notifications.timeout_secs {
                self.notifications.timeout_secs = timeout_secs;
            }
        }

        if let Some(email) = patch.email {
            if let Some(enabled) = email.enabled {
                self.email.enabled = enabled;
            }
            if let Some(smtp_host) = email.smtp_host {
                self.email.smtp_host = Some(smtp_host);
            }
            if let Some(smtp_port) = email.smtp_port {
                self.email.smtp_port = smtp_port;
            }
            if let Some(smtp_user) = email.smtp_user {
                self.email.smtp_user = Some(smtp_user);
            }
            if let Some(smtp_password_value) = email.smtp_password {
                self.email.smtp_password = Some(secret_value(smtp_password_value)); // ubs:ignore
            }
            if let Some(from_address) = email.from_address {
                self.email.from_address = from_address;
            }
            if let Some(admin_address) = email.admin_address {
                self.email.admin_address = Some(admin_address);
            }
            if let Some(send_client_copy) = email.send_client_copy {
                self.email.send_client_copy = send_client_copy;
            }
        }

        if let Some(webhook) = patch.webhook {
            if let Some(url) = webhook.url {
                self.webhook.url = Some(url);
            }
            if let Some(webhook_secret_value) = webhook.secret {
                self.webhook.secret = Some(secret_value(webhook_secret_value)); // ubs:ignore
            }
        }

        if let Some(branding) = patch.branding {
            if let Some(company_name) = branding.company_name {
                self.branding.company_name = company_name;
            }
            if let Some(primary_color) = branding.primary_color {
                self.branding.primary_color = primary_color;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        for key in SettingKey::ALL {
            if let Some(value) = read_env(&key.env_var()) {
                self.set_setting(key, value)?;
            }
        }

        if let Some(value) = read_env("ROOMQUOTE_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("ROOMQUOTE_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(discount_mode) = overrides.discount_mode {
            self.pricing.discount_mode = discount_mode;
        }
        if let Some(decimal_precision) = overrides.decimal_precision {
            self.pricing.decimal_precision = decimal_precision;
        }
        if let Some(email_enabled) = overrides.email_enabled {
            self.email.enabled = email_enabled;
        }
        if let Some(webhook_url) = overrides.webhook_url {
            self.webhook.url = Some(webhook_url);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_pricing(&self.pricing)?;
        validate_quotes(&self.quotes)?;
        validate_notifications(&self.notifications)?;
        validate_email(&self.email)?;
        validate_webhook(&self.webhook)?;
        validate_branding(&self.branding)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("roomquote.toml"), PathBuf::from("config/roomquote.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    let currency = pricing.currency.trim();
    if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(
            "pricing.currency must be a three-letter uppercase ISO code such as `EUR`".to_string(),
        ));
    }

    if pricing.decimal_precision > 6 {
        return Err(ConfigError::Validation(
            "pricing.decimal_precision must be in range 0..=6".to_string(),
        ));
    }

    Ok(())
}

fn validate_quotes(quotes: &QuoteNumberingConfig) -> Result<(), ConfigError> {
    if quotes.number_width == 0 || quotes.number_width > 12 {
        return Err(ConfigError::Validation(
            "quotes.number_width must be in range 1..=12".to_string(),
        ));
    }

    if quotes.number_prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(
            "quotes.number_prefix must not contain whitespace".to_string(),
        ));
    }

    Ok(())
}

fn validate_notifications(notifications: &NotificationConfig) -> Result<(), ConfigError> {
    if notifications.timeout_secs == 0 || notifications.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "notifications.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    Ok(())
}

fn validate_email(email: &EmailConfig) -> Result<(), ConfigError> {
    if !email.enabled {
        return Ok(());
    }

    let missing_host = email.smtp_host.as_ref().map(|host| host.trim().is_empty()).unwrap_or(true);
    if missing_host {
        return Err(ConfigError::Validation(
            "email.smtp_host is required when email.enabled is true".to_string(),
        ));
    }

    let missing_admin =
        email.admin_address.as_ref().map(|address| !address.contains('@')).unwrap_or(true);
    if missing_admin {
        return Err(ConfigError::Validation(
            "email.admin_address must be a valid address when email.enabled is true".to_string(),
        ));
    }

    if !email.from_address.contains('@') {
        return Err(ConfigError::Validation(
            "email.from_address must be a valid address".to_string(),
        ));
    }

    if email.smtp_user.is_some() != email.smtp_password.is_some() {
        return Err(ConfigError::Validation(
            "email.smtp_user and email.smtp_password must be set together".to_string(),
        ));
    }

    if email.smtp_port == 0 {
        return Err(ConfigError::Validation(
            "email.smtp_port must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_webhook(webhook: &WebhookConfig) -> Result<(), ConfigError> {
    if let Some(url) = &webhook.url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "webhook.url must start with http:// or https://".to_string(),
            ));
        }
    }

    let empty_secret =
        webhook.secret.as_ref().map(|secret| secret.expose_secret().trim().is_empty());
    if empty_secret == Some(true) {
        return Err(ConfigError::Validation(
            "webhook.secret must not be empty when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_branding(branding: &BrandingConfig) -> Result<(), ConfigError> {
    if branding.company_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "branding.company_name must not be empty".to_string(),
        ));
    }

    if !is_hex_color(&branding.primary_color) {
        return Err(ConfigError::Validation(
            "branding.primary_color must be a hex colour like `#1e73be` or `#fff`".to_string(),
        ));
    }

    Ok(())
}

fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(hex) => matches!(hex.len(), 3 | 6) && hex.chars().all(|ch| ch.is_ascii_hexdigit()),
        None => false,
    }
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    pricing: Option<PricingPatch>,
    quotes: Option<QuotesPatch>,
    notifications: Option<NotificationsPatch>,
    email: Option<EmailPatch>,
    webhook: Option<WebhookPatch>,
    branding: Option<BrandingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    currency: Option<String>,
    currency_symbol: Option<String>,
    symbol_position: Option<SymbolPosition>,
    decimal_precision: Option<u32>,
    discount_mode: Option<DiscountMode>,
}

#[derive(Debug, Default, Deserialize)]
struct QuotesPatch {
    number_prefix: Option<String>,
    number_width: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct NotificationsPatch {
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EmailPatch {
    enabled: Option<bool>,
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
    smtp_user: Option<String>,
    smtp_password: Option<String>,
    from_address: Option<String>,
    admin_address: Option<String>,
    send_client_copy: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPatch {
    url: Option<String>,
    secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BrandingPatch {
    company_name: Option<String>,
    primary_color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
