pub mod paapi_client;
pub mod catalog;

pub use paapi_client::{PaapiClient, ProductApi};
pub use catalog::CatalogService;
