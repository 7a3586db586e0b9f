use chrono::Duration;
use serde::Deserialize;
use tokio::fs;

use crate::errors::AppResult;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

pub async fn load_config(path: &str) -> AppResult<Config> {
    let contents = fs::read_to_string(path).await?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> AppResult<Config> {
    let parsed: Config = toml::from_str(contents)?;
    parsed.validate()?;
    Ok(parsed)
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    pub address: String,
    pub port: u16,
    pub cors_origin: Option<String>,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_expiry_hours")]
    pub expiry_hours: u32,
}

impl GeneralConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn expiry_ttl(&self) -> Duration {
        Duration::hours(self.expiry_hours as _)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_public_domain")]
    pub public_domain: String,
    /// S3-compatible endpoint, e.g. MinIO. Path-style addressing is used when set.
    pub endpoint: Option<String>,
    /// Overrides the `https://<bucket>.<public_domain>` base of download links.
    pub public_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentationConfig {
    pub directives: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub instrumentation: InstrumentationConfig,
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.general.expiry_hours > 0, "general.expiry_hours must be positive");
        anyhow::ensure!(
            self.general.max_upload_bytes > 0,
            "general.max_upload_bytes must be positive"
        );
        anyhow::ensure!(!self.storage.bucket.is_empty(), "storage.bucket must not be empty");
        Ok(())
    }
}

fn default_max_connections() -> u32 {
    20
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_expiry_hours() -> u32 {
    24
}

fn default_key_prefix() -> String {
    String::from("files")
}

fn default_public_domain() -> String {
    String::from("s3.amazonaws.com")
}
