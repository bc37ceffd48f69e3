use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;
use serde_json::{json, Value};

use paapi_client::config::{AppConfig, CatalogConfig, LoggerConfig, PaapiConfig, WebClientConfig};
use paapi_client::services::{CatalogService, ProductApi};
use paapi_client::utils::error::{AppError, Result};

mock! {
    pub Api {}

    #[async_trait]
    impl ProductApi for Api {
        async fn search_items(&self, keywords: &str, item_count: u32, request_id: &str) -> Result<Value>;
        async fn get_items(&self, asins: &[String], request_id: &str) -> Result<Value>;
    }
}

fn create_test_config() -> AppConfig {
    AppConfig {
        webclient: WebClientConfig::default(),
        paapi: PaapiConfig {
            partner_tag: "tag-21".to_string(),
            ..PaapiConfig::default()
        },
        catalog: CatalogConfig {
            max_keywords: 2,
            items_per_keyword: 6,
            max_asins: 5,
            max_search_links: 3,
        },
        logger: LoggerConfig::default(),
    }
}

fn search_response(asins: &[&str]) -> Value {
    let items: Vec<Value> = asins
        .iter()
        .map(|asin| json!({"ASIN": asin, "ItemInfo": {"Title": {"DisplayValue": format!("Producto {}", asin)}}}))
        .collect();
    json!({"SearchResult": {"Items": items}})
}

fn keywords(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn service_with(api: MockApi) -> CatalogService {
    CatalogService::with_api(create_test_config(), Arc::new(api))
}

#[tokio::test]
async fn test_new_without_credentials_is_links_only() {
    let service = CatalogService::new(create_test_config()).unwrap();
    assert!(!service.is_live());
}

#[tokio::test]
async fn test_new_with_credentials_is_live() {
    let mut config = create_test_config();
    config.paapi.access_key = "AKIDTEST".to_string();
    config.paapi.secret_key = "test-secret".to_string();

    let service = CatalogService::new(config).unwrap();
    assert!(service.is_live());
}

#[tokio::test]
async fn test_links_only_search_degrades_to_search_links() {
    let service = CatalogService::links_only(create_test_config());
    let result = service
        .search(&keywords(&["nevera 12v", "toldo", "  ", "placa solar", "inversor"]))
        .await;

    assert!(result.degraded);
    assert!(result.products.is_empty());
    let linked: Vec<&str> = result.search_links.iter().map(|l| l.keyword.as_str()).collect();
    assert_eq!(linked, vec!["nevera 12v", "toldo", "placa solar"]);
    assert_eq!(
        result.search_links[0].url,
        "https://www.amazon.es/s?k=nevera+12v&tag=tag-21"
    );
}

#[tokio::test]
async fn test_search_collects_products_for_first_keywords() {
    let mut api = MockApi::new();
    api.expect_search_items()
        .withf(|kw, count, _| kw == "nevera" && *count == 6)
        .times(1)
        .returning(|_, _, _| Ok(search_response(&["B0A", "B0B"])));
    api.expect_search_items()
        .withf(|kw, _, _| kw == "toldo")
        .times(1)
        .returning(|_, _, _| Ok(search_response(&["B0C"])));

    let service = service_with(api);
    // "placa solar" is past max_keywords and must not be queried
    let result = service.search(&keywords(&["nevera", "toldo", "placa solar"])).await;

    assert!(!result.degraded);
    assert!(result.errors.is_empty());
    assert!(result.search_links.is_empty());
    let asins: Vec<&str> = result.products.iter().map(|p| p.asin.as_str()).collect();
    assert_eq!(asins, vec!["B0A", "B0B", "B0C"]);
    assert_eq!(result.products[0].title, "Producto B0A");
    assert_eq!(result.products[0].detail_url, "https://www.amazon.es/dp/B0A?tag=tag-21");
}

#[tokio::test]
async fn test_search_skips_blank_keywords() {
    let mut api = MockApi::new();
    api.expect_search_items()
        .withf(|kw, _, _| kw == "nevera")
        .times(1)
        .returning(|_, _, _| Ok(search_response(&["B0A"])));
    api.expect_search_items()
        .withf(|kw, _, _| kw == "toldo")
        .times(1)
        .returning(|_, _, _| Ok(search_response(&["B0B"])));

    let service = service_with(api);
    let result = service.search(&keywords(&["   ", " nevera ", "", "toldo"])).await;

    assert!(!result.degraded);
    assert!(result.errors.is_empty());
    let asins: Vec<&str> = result.products.iter().map(|p| p.asin.as_str()).collect();
    assert_eq!(asins, vec!["B0A", "B0B"]);
}

#[tokio::test]
async fn test_search_first_failure_stops_and_falls_back_to_links() {
    let mut api = MockApi::new();
    api.expect_search_items()
        .withf(|kw, _, _| kw == "nevera")
        .times(1)
        .returning(|_, _, _| Err(AppError::remote_rejection(403, "InvalidSignature")));

    let service = service_with(api);
    let result = service.search(&keywords(&["nevera", "toldo"])).await;

    assert!(result.degraded);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("403"));
    assert!(result.products.is_empty());
    assert_eq!(result.search_links.len(), 2);
}

#[tokio::test]
async fn test_search_later_failure_keeps_earlier_products() {
    let mut api = MockApi::new();
    api.expect_search_items()
        .withf(|kw, _, _| kw == "nevera")
        .times(1)
        .returning(|_, _, _| Ok(search_response(&["B0A"])));
    api.expect_search_items()
        .withf(|kw, _, _| kw == "toldo")
        .times(1)
        .returning(|_, _, _| Err(AppError::remote_rejection(503, "Service Unavailable")));

    let service = service_with(api);
    let result = service.search(&keywords(&["nevera", "toldo"])).await;

    assert!(result.degraded);
    assert_eq!(result.products.len(), 1);
    assert!(result.search_links.is_empty());
    assert!(result.has_live_data());
}

#[tokio::test]
async fn test_search_without_keywords_makes_no_call() {
    let service = service_with(MockApi::new());
    let result = service.search(&[]).await;

    assert!(!result.degraded);
    assert!(result.products.is_empty());
    assert!(result.search_links.is_empty());
}

#[tokio::test]
async fn test_search_with_empty_results_adds_links() {
    let mut api = MockApi::new();
    api.expect_search_items()
        .times(2)
        .returning(|_, _, _| Ok(json!({"SearchResult": {"Items": []}})));

    let service = service_with(api);
    let result = service.search(&keywords(&["nevera", "toldo"])).await;

    assert!(!result.degraded);
    assert!(result.products.is_empty());
    assert_eq!(result.search_links.len(), 2);
}

#[tokio::test]
async fn test_search_tolerates_api_errors_in_body() {
    let mut api = MockApi::new();
    api.expect_search_items().times(1).returning(|_, _, _| {
        Ok(json!({
            "Errors": [{"Code": "NoResults", "Message": "No results found"}],
            "SearchResult": {"Items": [{"ASIN": "B0A"}]}
        }))
    });

    let service = service_with(api);
    let result = service.search(&keywords(&["nevera"])).await;

    assert!(!result.degraded);
    assert_eq!(result.products.len(), 1);
}

#[tokio::test]
async fn test_lookup_truncates_asins() {
    let mut api = MockApi::new();
    api.expect_get_items()
        .withf(|asins, _| asins.len() == 5 && asins[0] == "B01")
        .times(1)
        .returning(|_, _| {
            Ok(json!({"ItemsResult": {"Items": [
                {"ASIN": "B01", "Offers": {"Listings": [{"Price": {"DisplayAmount": "19,99 €"}}]}}
            ]}}))
        });

    let service = service_with(api);
    let asins = keywords(&["B01", "B02", "B03", "B04", "B05", "B06", "B07"]);
    let result = service.lookup(&asins).await;

    assert!(!result.degraded);
    assert_eq!(result.products.len(), 1);
    assert_eq!(result.products[0].price.as_deref(), Some("19,99 €"));
}

#[tokio::test]
async fn test_lookup_failure_degrades() {
    let mut api = MockApi::new();
    api.expect_get_items()
        .times(1)
        .returning(|_, _| Err(AppError::remote_rejection(500, "Internal Failure")));

    let service = service_with(api);
    let result = service.lookup(&keywords(&["B01"])).await;

    assert!(result.degraded);
    assert!(result.products.is_empty());
    assert!(result.search_links.is_empty());
    assert_eq!(result.errors.len(), 1);
}

#[tokio::test]
async fn test_lookup_links_only_degrades() {
    let service = CatalogService::links_only(create_test_config());
    let result = service.lookup(&keywords(&["B01"])).await;

    assert!(result.degraded);
    assert!(result.products.is_empty());
}

#[tokio::test]
async fn test_each_call_gets_its_own_request_id() {
    let service = CatalogService::links_only(create_test_config());
    let first = service.search(&keywords(&["nevera"])).await;
    let second = service.search(&keywords(&["nevera"])).await;

    assert!(first.request_id.starts_with("req-"));
    assert_ne!(first.request_id, second.request_id);
}
