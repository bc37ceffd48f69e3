use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::json::{json_path_str, navigate_json_path};

pub const SEARCH_ITEMS_PATH: &str = "/paapi5/searchitems";
pub const SEARCH_ITEMS_TARGET: &str = "com.amazon.paapi5.v1.ProductAdvertisingAPIv1.SearchItems";
pub const GET_ITEMS_PATH: &str = "/paapi5/getitems";
pub const GET_ITEMS_TARGET: &str = "com.amazon.paapi5.v1.ProductAdvertisingAPIv1.GetItems";

pub const DEFAULT_RESOURCES: [&str; 5] = [
    "Images.Primary.Medium",
    "ItemInfo.Title",
    "ItemInfo.Features",
    "Offers.Listings.Price",
    "Offers.Listings.Availability",
];

const MAX_FEATURES: usize = 5;
const MAX_TITLE_CHARS: usize = 100;

fn default_resources() -> Vec<String> {
    DEFAULT_RESOURCES.iter().map(|r| r.to_string()).collect()
}

/// Field order here is the key order on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct SearchItemsRequest {
    pub keywords: String,
    pub search_index: String,
    pub item_count: u32,
    pub partner_tag: String,
    pub partner_type: String,
    pub resources: Vec<String>,
}

impl SearchItemsRequest {
    pub fn new(keywords: &str, item_count: u32, partner_tag: &str, partner_type: &str) -> Self {
        Self {
            keywords: keywords.to_string(),
            search_index: "All".to_string(),
            item_count,
            partner_tag: partner_tag.to_string(),
            partner_type: partner_type.to_string(),
            resources: default_resources(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemsRequest {
    pub item_ids: Vec<String>,
    pub partner_tag: String,
    pub partner_type: String,
    pub resources: Vec<String>,
}

impl GetItemsRequest {
    pub fn new(item_ids: &[String], partner_tag: &str, partner_type: &str) -> Self {
        Self {
            item_ids: item_ids.to_vec(),
            partner_tag: partner_tag.to_string(),
            partner_type: partner_type.to_string(),
            resources: default_resources(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub asin: String,
    pub title: String,
    pub features: Vec<String>,
    pub price: Option<String>,
    pub availability: Option<String>,
    pub image_url: Option<String>,
    pub detail_url: String,
}

impl Product {
    /// Reads one item of a response. Every field except the ASIN is optional.
    pub fn from_item(item: &Value, marketplace: &str, partner_tag: &str) -> Option<Self> {
        let asin = json_path_str(item, &["ASIN"])?;
        let title = json_path_str(item, &["ItemInfo", "Title", "DisplayValue"])
            .map(|title| title.chars().take(MAX_TITLE_CHARS).collect())
            .unwrap_or_else(|| asin.clone());

        let features = navigate_json_path(item, &["ItemInfo", "Features", "DisplayValues", "[*]"])
            .into_iter()
            .filter_map(Value::as_str)
            .map(strip_markup)
            .filter(|f| !f.is_empty())
            .take(MAX_FEATURES)
            .collect();

        let price = json_path_str(item, &["Offers", "Listings", "[0]", "Price", "DisplayAmount"]);
        let availability =
            json_path_str(item, &["Offers", "Listings", "[0]", "Availability", "Message"]);
        let image_url = json_path_str(item, &["Images", "Primary", "Medium", "URL"]);
        let detail_url = affiliate_product_url(marketplace, &asin, partner_tag);

        Some(Self {
            asin,
            title,
            features,
            price,
            availability,
            image_url,
            detail_url,
        })
    }
}

/// Items of a SearchItems (`SearchResult`) or GetItems (`ItemsResult`) response.
pub fn products_from_response(response: &Value, marketplace: &str, partner_tag: &str) -> Vec<Product> {
    ["SearchResult", "ItemsResult"]
        .iter()
        .flat_map(|root| navigate_json_path(response, &[*root, "Items", "[*]"]))
        .filter_map(|item| Product::from_item(item, marketplace, partner_tag))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiErrorEntry {
    pub code: String,
    pub message: String,
}

/// Partial failures reported inside a successful response body.
pub fn api_errors(response: &Value) -> Vec<ApiErrorEntry> {
    navigate_json_path(response, &["Errors", "[*]"])
        .into_iter()
        .map(|entry| ApiErrorEntry {
            code: json_path_str(entry, &["Code"]).unwrap_or_default(),
            message: json_path_str(entry, &["Message"]).unwrap_or_default(),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchLink {
    pub keyword: String,
    pub url: String,
}

impl SearchLink {
    pub fn new(keyword: &str, marketplace: &str, partner_tag: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            url: affiliate_search_url(marketplace, keyword, partner_tag),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogResult {
    pub request_id: String,
    pub products: Vec<Product>,
    pub search_links: Vec<SearchLink>,
    /// Set when live data was wanted but a call failed or was impossible.
    pub degraded: bool,
    pub errors: Vec<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl CatalogResult {
    pub fn empty(request_id: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            products: Vec::new(),
            search_links: Vec::new(),
            degraded: false,
            errors: Vec::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn has_live_data(&self) -> bool {
        !self.products.is_empty()
    }
}

pub fn affiliate_product_url(marketplace: &str, asin: &str, partner_tag: &str) -> String {
    format!("https://{}/dp/{}?tag={}", marketplace, asin, partner_tag)
}

pub fn affiliate_search_url(marketplace: &str, keyword: &str, partner_tag: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("k", keyword)
        .append_pair("tag", partner_tag)
        .finish();
    format!("https://{}/s?{}", marketplace, query)
}

fn strip_markup(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => plain.push(c),
            _ => {}
        }
    }
    plain.trim().to_string()
}
