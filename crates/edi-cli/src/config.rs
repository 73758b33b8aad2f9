//! Configuration file loading
//!
//! JSON by default, YAML when the file ends in `.yaml` or `.yml`. Keys are
//! camelCase. Missing keys take their defaults; empty strings are treated
//! as missing.

use std::fs;
use std::path::{Path, PathBuf};

use edi_adapter_sftp::SftpConfig;
use edi_adapter_spapi::SpApiConfig;
use edi_pipeline::{CycleConfig, IdOrdering, Integrations, Verbosity};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_PATH: &str = "configs/default.json";

const DEFAULT_BASE_URL: &str = "https://sellingpartnerapi-na.amazon.com";
const DEFAULT_TOKEN_URL: &str = "https://api.amazon.com/auth/o2/token";
const DEFAULT_ENDPOINT_URL: &str = "/vendor/orders/v1/purchaseOrders";
const DEFAULT_ID_FIELD: &str = "purchaseOrderNumber";
const DEFAULT_MAX_PAGES: usize = 20;
const DEFAULT_INBOUND_DIR: &str = "download";
const DEFAULT_OUTBOUND_DIR: &str = "upload";
const DEFAULT_PARTNER_ID: &str = "AMAZON";
const DEFAULT_SFTP_PORT: u16 = 22;
const DEFAULT_OUTPUT_FORMAT: &str = "json";
const DEFAULT_SAVE_PATH: &str = "output/";
const DEFAULT_FILE_NAME: &str = "data_dump";

/// Errors loading or validating a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file {0} does not exist")]
    NotFound(String),

    #[error("failed to read config {path}: {message}")]
    Read { path: String, message: String },

    #[error("invalid config {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub version: String,
    pub api: ApiConfig,
    pub edi: EdiConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiConfig {
    pub active: bool,
    pub auth: AuthConfig,
    pub base_url: String,
    pub token_url: String,
    pub endpoint_url: String,
    pub id_field: String,
    pub id_ordering: IdOrdering,
    pub max_pages: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            active: false,
            auth: AuthConfig::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            id_field: DEFAULT_ID_FIELD.to_string(),
            id_ordering: IdOrdering::Lexical,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EdiConfig {
    pub active: bool,
    /// SFTP server; when empty the mailbox directories are local
    pub host: String,
    pub port: u16,
    pub username: String,
    pub private_key_path: String,
    pub inbound_dir: String,
    pub outbound_dir: String,
    /// Our identity in acknowledgments and feeds
    pub sender_id: String,
    pub partner_id: String,
    pub delete_after_ack: bool,
    pub archive_inbound: bool,
}

impl Default for EdiConfig {
    fn default() -> Self {
        Self {
            active: false,
            host: String::new(),
            port: DEFAULT_SFTP_PORT,
            username: String::new(),
            private_key_path: String::new(),
            inbound_dir: DEFAULT_INBOUND_DIR.to_string(),
            outbound_dir: DEFAULT_OUTBOUND_DIR.to_string(),
            sender_id: String::new(),
            partner_id: DEFAULT_PARTNER_ID.to_string(),
            delete_after_ack: false,
            archive_inbound: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub output_format: String,
    pub save_path: String,
    pub file_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            save_path: DEFAULT_SAVE_PATH.to_string(),
            file_name: DEFAULT_FILE_NAME.to_string(),
        }
    }
}

/// Partial configuration layered over a loaded one; `None` keeps the value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigOverride {
    pub version: Option<String>,
    pub api: Option<ApiOverride>,
    pub edi: Option<EdiOverride>,
    pub storage: Option<StorageOverride>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthOverride {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiOverride {
    pub active: Option<bool>,
    pub auth: Option<AuthOverride>,
    pub base_url: Option<String>,
    pub token_url: Option<String>,
    pub endpoint_url: Option<String>,
    pub id_field: Option<String>,
    pub id_ordering: Option<IdOrdering>,
    pub max_pages: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EdiOverride {
    pub active: Option<bool>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub private_key_path: Option<String>,
    pub inbound_dir: Option<String>,
    pub outbound_dir: Option<String>,
    pub sender_id: Option<String>,
    pub partner_id: Option<String>,
    pub delete_after_ack: Option<bool>,
    pub archive_inbound: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageOverride {
    pub output_format: Option<String>,
    pub save_path: Option<String>,
    pub file_name: Option<String>,
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn default_if_empty(value: &mut String, default: &str) {
    if value.is_empty() {
        *value = default.to_string();
    }
}

/// Read and decode `path` by its extension
fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }

    let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let parse_error = |message: String| ConfigError::Parse {
        path: path.display().to_string(),
        message,
    };

    if path
        .extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
    {
        serde_yaml::from_str(&content).map_err(|e| parse_error(format!("YAML parse error: {e}")))
    } else {
        serde_json::from_str(&content).map_err(|e| parse_error(format!("JSON parse error: {e}")))
    }
}

impl Config {
    /// Load a configuration file and fill in defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config: Config = read_file(path)?;
        config.apply_defaults();
        info!(path = %path.display(), "Loaded config");
        debug!(
            integrations = ?config.integrations(),
            save_path = %config.storage.save_path,
            "Effective configuration"
        );
        Ok(config)
    }

    /// Replace empty values with their defaults.
    pub fn apply_defaults(&mut self) {
        default_if_empty(&mut self.api.base_url, DEFAULT_BASE_URL);
        default_if_empty(&mut self.api.token_url, DEFAULT_TOKEN_URL);
        default_if_empty(&mut self.api.endpoint_url, DEFAULT_ENDPOINT_URL);
        default_if_empty(&mut self.api.id_field, DEFAULT_ID_FIELD);
        if self.api.max_pages == 0 {
            self.api.max_pages = DEFAULT_MAX_PAGES;
        }
        if self.edi.port == 0 {
            self.edi.port = DEFAULT_SFTP_PORT;
        }
        default_if_empty(&mut self.edi.inbound_dir, DEFAULT_INBOUND_DIR);
        default_if_empty(&mut self.edi.outbound_dir, DEFAULT_OUTBOUND_DIR);
        default_if_empty(&mut self.edi.partner_id, DEFAULT_PARTNER_ID);
        default_if_empty(&mut self.storage.output_format, DEFAULT_OUTPUT_FORMAT);
        default_if_empty(&mut self.storage.save_path, DEFAULT_SAVE_PATH);
        default_if_empty(&mut self.storage.file_name, DEFAULT_FILE_NAME);
    }

    /// Load a partial configuration from `path` and layer it on top.
    pub fn apply_override_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let overrides: ConfigOverride = read_file(path)?;
        self.apply_override(overrides);
        self.apply_defaults();
        info!(path = %path.display(), "Applied config override");
        Ok(())
    }

    pub fn apply_override(&mut self, o: ConfigOverride) {
        set(&mut self.version, o.version);

        if let Some(api) = o.api {
            set(&mut self.api.active, api.active);
            if let Some(auth) = api.auth {
                set(&mut self.api.auth.client_id, auth.client_id);
                set(&mut self.api.auth.client_secret, auth.client_secret);
                set(&mut self.api.auth.refresh_token, auth.refresh_token);
            }
            set(&mut self.api.base_url, api.base_url);
            set(&mut self.api.token_url, api.token_url);
            set(&mut self.api.endpoint_url, api.endpoint_url);
            set(&mut self.api.id_field, api.id_field);
            set(&mut self.api.id_ordering, api.id_ordering);
            set(&mut self.api.max_pages, api.max_pages);
        }

        if let Some(edi) = o.edi {
            set(&mut self.edi.active, edi.active);
            set(&mut self.edi.host, edi.host);
            set(&mut self.edi.port, edi.port);
            set(&mut self.edi.username, edi.username);
            set(&mut self.edi.private_key_path, edi.private_key_path);
            set(&mut self.edi.inbound_dir, edi.inbound_dir);
            set(&mut self.edi.outbound_dir, edi.outbound_dir);
            set(&mut self.edi.sender_id, edi.sender_id);
            set(&mut self.edi.partner_id, edi.partner_id);
            set(&mut self.edi.delete_after_ack, edi.delete_after_ack);
            set(&mut self.edi.archive_inbound, edi.archive_inbound);
        }

        if let Some(storage) = o.storage {
            set(&mut self.storage.output_format, storage.output_format);
            set(&mut self.storage.save_path, storage.save_path);
            set(&mut self.storage.file_name, storage.file_name);
        }
    }

    pub fn integrations(&self) -> Integrations {
        Integrations::from_flags(self.edi.active, self.api.active)
    }

    /// Check that every enabled integration has what it needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.integrations() == Integrations::None {
            return Err(ConfigError::Invalid("no integration enabled".to_string()));
        }

        if self.edi.active {
            self.validate_edi()?;
        }

        if self.api.active {
            let auth = &self.api.auth;
            let missing: Vec<&str> = [
                ("clientId", &auth.client_id),
                ("clientSecret", &auth.client_secret),
                ("refreshToken", &auth.refresh_token),
            ]
            .into_iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(name, _)| name)
            .collect();
            if !missing.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "api.auth is missing {}",
                    missing.join(", ")
                )));
            }
        }

        if self.storage.output_format != DEFAULT_OUTPUT_FORMAT {
            return Err(ConfigError::Invalid(format!(
                "unsupported storage.outputFormat '{}'",
                self.storage.output_format
            )));
        }

        Ok(())
    }

    /// Check the fields used to address the partner mailbox.
    pub fn validate_edi(&self) -> Result<(), ConfigError> {
        if self.edi.sender_id.is_empty() {
            return Err(ConfigError::Invalid("edi.senderId is required".to_string()));
        }
        if self.uses_sftp() {
            if self.edi.username.is_empty() {
                return Err(ConfigError::Invalid(
                    "edi.username is required with edi.host".to_string(),
                ));
            }
            if self.edi.private_key_path.is_empty() {
                return Err(ConfigError::Invalid(
                    "edi.privateKeyPath is required with edi.host".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// The mailbox is on an SFTP server rather than in local directories
    pub fn uses_sftp(&self) -> bool {
        !self.edi.host.is_empty()
    }

    pub fn sftp_config(&self) -> SftpConfig {
        SftpConfig {
            host: self.edi.host.clone(),
            port: self.edi.port,
            username: self.edi.username.clone(),
            private_key_path: PathBuf::from(&self.edi.private_key_path),
            inbound_dir: self.edi.inbound_dir.clone(),
            outbound_dir: self.edi.outbound_dir.clone(),
            ..SftpConfig::default()
        }
    }

    pub fn storage_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.save_path)
    }

    pub fn cycle_config(&self, verbosity: Verbosity) -> CycleConfig {
        CycleConfig {
            integrations: self.integrations(),
            sender_id: self.edi.sender_id.clone(),
            partner_id: self.edi.partner_id.clone(),
            storage_dir: self.storage_dir(),
            file_prefix: self.storage.file_name.clone(),
            delete_after_ack: self.edi.delete_after_ack,
            archive_inbound: self.edi.archive_inbound,
            id_ordering: self.api.id_ordering,
            verbosity,
        }
    }

    pub fn sp_api_config(&self, verbosity: Verbosity) -> SpApiConfig {
        SpApiConfig {
            base_url: self.api.base_url.clone(),
            token_url: self.api.token_url.clone(),
            endpoint_url: self.api.endpoint_url.clone(),
            client_id: self.api.auth.client_id.clone(),
            client_secret: self.api.auth.client_secret.clone(),
            refresh_token: self.api.auth.refresh_token.clone(),
            id_field: self.api.id_field.clone(),
            max_pages: self.api.max_pages,
            verbosity,
        }
    }
}
