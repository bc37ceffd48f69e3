pub mod error;
pub mod signature;
pub mod json;
pub mod request_id;

pub use error::*;
pub use signature::*;
pub use json::*;
pub use request_id::*;
