use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::{AppConfig, CatalogConfig, PaapiConfig};
use crate::models::{api_errors, products_from_response, CatalogResult, SearchLink};
use crate::providers::logging::StructuredLogger;
use crate::services::{PaapiClient, ProductApi};
use crate::utils::error::Result;
use crate::utils::request_id::generate_request_id;

/// Product data for page generation. Remote failures never escape: they are
/// logged and the result is marked degraded.
#[derive(Clone)]
pub struct CatalogService {
    api: Option<Arc<dyn ProductApi + Send + Sync>>,
    paapi: PaapiConfig,
    catalog: CatalogConfig,
}

impl CatalogService {
    /// Without credentials the service runs links-only; a bad HTTP client
    /// setup is still an error.
    pub fn new(config: AppConfig) -> Result<Self> {
        let api: Option<Arc<dyn ProductApi + Send + Sync>> = if config.paapi.has_credentials() {
            Some(Arc::new(PaapiClient::new(&config)?))
        } else {
            StructuredLogger::log_warning(
                "Product API credentials not configured, catalog will only build search links",
                None,
            );
            None
        };

        Ok(Self {
            api,
            paapi: config.paapi,
            catalog: config.catalog,
        })
    }

    pub fn with_api(config: AppConfig, api: Arc<dyn ProductApi + Send + Sync>) -> Self {
        Self {
            api: Some(api),
            paapi: config.paapi,
            catalog: config.catalog,
        }
    }

    pub fn links_only(config: AppConfig) -> Self {
        Self {
            api: None,
            paapi: config.paapi,
            catalog: config.catalog,
        }
    }

    pub fn is_live(&self) -> bool {
        self.api.is_some()
    }

    pub async fn search(&self, keywords: &[String]) -> CatalogResult {
        let request_id = generate_request_id();
        let mut result = CatalogResult::empty(&request_id);
        if keywords.is_empty() {
            return result;
        }

        StructuredLogger::log_info(
            "Searching catalog",
            Some(&request_id),
            Some(json!({
                "keywords": keywords.len(),
                "live": self.is_live(),
            })),
        );

        match &self.api {
            Some(api) => {
                let queried = keywords
                    .iter()
                    .map(|kw| kw.trim())
                    .filter(|kw| !kw.is_empty())
                    .take(self.catalog.max_keywords);
                for keyword in queried {
                    match api
                        .search_items(keyword, self.catalog.items_per_keyword, &request_id)
                        .await
                    {
                        Ok(response) => self.collect_products(&response, &mut result),
                        Err(e) => {
                            // keep what earlier keywords produced, skip the rest
                            self.record_failure(&mut result, &format!("search '{}'", keyword), &e.to_string());
                            break;
                        }
                    }
                }
            }
            None => result.degraded = true,
        }

        if result.products.is_empty() {
            result.search_links = self.search_links(keywords);
        }
        result
    }

    pub async fn lookup(&self, asins: &[String]) -> CatalogResult {
        let request_id = generate_request_id();
        let mut result = CatalogResult::empty(&request_id);
        if asins.is_empty() {
            return result;
        }

        let Some(api) = &self.api else {
            result.degraded = true;
            return result;
        };

        let asins: Vec<String> = asins.iter().take(self.catalog.max_asins).cloned().collect();
        StructuredLogger::log_info(
            "Looking up catalog items",
            Some(&request_id),
            Some(json!({ "asins": asins })),
        );

        match api.get_items(&asins, &request_id).await {
            Ok(response) => self.collect_products(&response, &mut result),
            Err(e) => self.record_failure(&mut result, "lookup", &e.to_string()),
        }
        result
    }

    pub fn search_links(&self, keywords: &[String]) -> Vec<SearchLink> {
        keywords
            .iter()
            .map(|kw| kw.trim())
            .filter(|kw| !kw.is_empty())
            .take(self.catalog.max_search_links)
            .map(|kw| SearchLink::new(kw, &self.paapi.marketplace, &self.paapi.partner_tag))
            .collect()
    }

    fn collect_products(&self, response: &Value, result: &mut CatalogResult) {
        for entry in api_errors(response) {
            StructuredLogger::log_warning(
                &format!("Product API reported {}: {}", entry.code, entry.message),
                Some(&result.request_id),
            );
        }
        result.products.extend(products_from_response(
            response,
            &self.paapi.marketplace,
            &self.paapi.partner_tag,
        ));
    }

    fn record_failure(&self, result: &mut CatalogResult, operation: &str, error: &str) {
        StructuredLogger::log_error(
            &format!("Catalog {} failed, continuing without live data: {}", operation, error),
            Some(&result.request_id),
        );
        result.degraded = true;
        result.errors.push(error.to_string());
    }
}
