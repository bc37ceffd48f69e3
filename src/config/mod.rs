use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::utils::error::{AppError, Result};
use crate::utils::signature::SigningConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub webclient: WebClientConfig,
    pub paapi: PaapiConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub logger: LoggerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebClientConfig {
    /// Seconds before an outbound call is abandoned.
    pub timeout: u64,
    pub max_retries: u32,
    /// First backoff delay; doubled after every failed attempt.
    pub retry_delay_ms: u64,
}

impl Default for WebClientConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            max_retries: 3,
            retry_delay_ms: 500,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct PaapiConfig {
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub partner_tag: String,
    #[serde(default = "default_partner_type")]
    pub partner_type: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_service")]
    pub service: String,
    #[serde(default = "default_marketplace")]
    pub marketplace: String,
    /// Base URL override; defaults to `https://{host}`.
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_partner_type() -> String {
    "Associates".to_string()
}

fn default_host() -> String {
    "webservices.amazon.es".to_string()
}

fn default_region() -> String {
    "eu-west-1".to_string()
}

fn default_service() -> String {
    "ProductAdvertisingAPI".to_string()
}

fn default_marketplace() -> String {
    "www.amazon.es".to_string()
}

impl Default for PaapiConfig {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            secret_key: String::new(),
            partner_tag: String::new(),
            partner_type: default_partner_type(),
            host: default_host(),
            region: default_region(),
            service: default_service(),
            marketplace: default_marketplace(),
            endpoint: None,
        }
    }
}

// secret_key stays out of Debug output
impl std::fmt::Debug for PaapiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaapiConfig")
            .field("access_key", &self.access_key)
            .field("secret_key", &if self.secret_key.is_empty() { "" } else { "***" })
            .field("partner_tag", &self.partner_tag)
            .field("partner_type", &self.partner_type)
            .field("host", &self.host)
            .field("region", &self.region)
            .field("service", &self.service)
            .field("marketplace", &self.marketplace)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl PaapiConfig {
    pub fn has_credentials(&self) -> bool {
        !self.access_key.trim().is_empty() && !self.secret_key.trim().is_empty()
    }

    pub fn signing_config(&self) -> Result<SigningConfig> {
        let access_key_id = self.access_key.trim();
        let secret_key = self.secret_key.trim();
        if access_key_id.is_empty() {
            return Err(AppError::missing_credentials("paapi.access_key is not set"));
        }
        if secret_key.is_empty() {
            return Err(AppError::missing_credentials("paapi.secret_key is not set"));
        }

        Ok(SigningConfig {
            access_key_id: access_key_id.to_string(),
            secret_key: secret_key.to_string(),
            host: self.signing_host()?,
            region: self.region.clone(),
            service: self.service.clone(),
        })
    }

    /// Authority of `base_url()` as sent in the `Host` header, with the port
    /// only when it is not the scheme default.
    pub fn signing_host(&self) -> Result<String> {
        let base_url = self.base_url();
        let parsed = Url::parse(&base_url).map_err(|e| {
            AppError::configuration(format!("invalid paapi endpoint '{}': {}", base_url, e))
        })?;
        let host = parsed.host_str().ok_or_else(|| {
            AppError::configuration(format!("paapi endpoint '{}' has no host", base_url))
        })?;

        Ok(match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }

    pub fn base_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) if !endpoint.trim().is_empty() => {
                endpoint.trim().trim_end_matches('/').to_string()
            }
            _ => format!("https://{}", self.host),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub max_keywords: usize,
    pub items_per_keyword: u32,
    pub max_asins: usize,
    pub max_search_links: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_keywords: 2,
            items_per_keyword: 6,
            max_asins: 5,
            max_search_links: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub dir: String,
    pub file_name: String,
    pub local_time: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            dir: "log".to_string(),
            file_name: "paapi-client".to_string(),
            local_time: false,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from("config.yaml")
    }

    /// Reads `path`, then lets `APP__*` environment variables override it,
    /// e.g. `APP__PAAPI__SECRET_KEY`.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| AppError::configuration(format!("invalid YAML configuration: {}", e)))
    }
}
