use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tokio::time::sleep;

use crate::config::{AppConfig, PaapiConfig, WebClientConfig};
use crate::models::{
    GetItemsRequest, SearchItemsRequest, GET_ITEMS_PATH, GET_ITEMS_TARGET, SEARCH_ITEMS_PATH,
    SEARCH_ITEMS_TARGET,
};
use crate::providers::StructuredLogger;
use crate::utils::error::{AppError, Result};
use crate::utils::json::to_payload;
use crate::utils::signature::{Clock, RequestSigner, SignedRequest, SystemClock};

/// Remote product-data operations. Responses are returned as opaque JSON.
#[async_trait]
pub trait ProductApi {
    async fn search_items(&self, keywords: &str, item_count: u32, request_id: &str) -> Result<Value>;
    async fn get_items(&self, asins: &[String], request_id: &str) -> Result<Value>;
}

#[derive(Clone, Debug)]
pub struct PaapiClient {
    client: Client,
    signer: RequestSigner,
    base_url: String,
    paapi: PaapiConfig,
    webclient: WebClientConfig,
}

impl PaapiClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Fails with `MissingCredentials` before any client is built.
    pub fn with_clock(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let signing_config = config.paapi.signing_config()?;
        let timeout = Duration::from_secs(config.webclient.timeout);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            signer: RequestSigner::with_clock(signing_config, clock),
            base_url: config.paapi.base_url(),
            paapi: config.paapi.clone(),
            webclient: config.webclient.clone(),
        })
    }

    /// Serializes `payload` once and sends it, retrying transient failures.
    pub async fn call<T: Serialize + Sync>(
        &self,
        path: &str,
        target: &str,
        payload: &T,
        request_id: &str,
    ) -> Result<Value> {
        let body = to_payload(payload)?;
        let max_attempts = self.webclient.max_retries.max(1);
        let mut delay = Duration::from_millis(self.webclient.retry_delay_ms);

        for attempt in 1..=max_attempts {
            match self.send_signed(path, target, &body, request_id).await {
                Ok(response) => {
                    StructuredLogger::log_info(
                        &format!("{} succeeded on attempt {}", path, attempt),
                        Some(request_id),
                        None,
                    );
                    return Ok(response);
                }
                Err(e) if !e.is_retryable() => {
                    StructuredLogger::log_error(
                        &format!("{} failed and will not be retried: {}", path, e),
                        Some(request_id),
                    );
                    return Err(e);
                }
                Err(e) if attempt == max_attempts => {
                    StructuredLogger::log_error(
                        &format!("All {} attempts for {} failed: {}", max_attempts, path, e),
                        Some(request_id),
                    );
                    return Err(e);
                }
                Err(e) => {
                    StructuredLogger::log_warning(
                        &format!(
                            "{} attempt {} failed, retrying in {}ms: {}",
                            path,
                            attempt,
                            delay.as_millis(),
                            e
                        ),
                        Some(request_id),
                    );
                    sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
            }
        }

        Err(AppError::configuration("webclient.max_retries must allow at least one attempt"))
    }

    async fn send_signed(
        &self,
        path: &str,
        target: &str,
        body: &str,
        request_id: &str,
    ) -> Result<Value> {
        // signed per attempt: every retry carries its own timestamp
        let signed: SignedRequest = self.signer.sign(path, target, body)?;
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.client.post(&url);
        for (name, value) in &signed.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.body(signed.payload).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            StructuredLogger::log_warning(
                &format!("{} rejected with status {}", path, status.as_u16()),
                Some(request_id),
            );
            return Err(AppError::remote_rejection(status.as_u16(), &text));
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl ProductApi for PaapiClient {
    async fn search_items(&self, keywords: &str, item_count: u32, request_id: &str) -> Result<Value> {
        let payload = SearchItemsRequest::new(
            keywords,
            item_count,
            &self.paapi.partner_tag,
            &self.paapi.partner_type,
        );
        self.call(SEARCH_ITEMS_PATH, SEARCH_ITEMS_TARGET, &payload, request_id)
            .await
    }

    async fn get_items(&self, asins: &[String], request_id: &str) -> Result<Value> {
        let payload = GetItemsRequest::new(asins, &self.paapi.partner_tag, &self.paapi.partner_type);
        self.call(GET_ITEMS_PATH, GET_ITEMS_TARGET, &payload, request_id)
            .await
    }
}
