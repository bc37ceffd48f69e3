//! Request signing for the product-data API.
//!
//! Every outbound call carries an `Authorization` header computed with the
//! `AWS4-HMAC-SHA256` scheme: a canonical request is hashed, wrapped into a
//! string to sign, and signed with a key derived from the secret key, the
//! calendar date, the region and the service.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::utils::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub const CONTENT_ENCODING: &str = "amz-1.0";
pub const CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const SIGNED_HEADERS: &str = "content-encoding;content-type;host;x-amz-date;x-amz-target";

const SCOPE_TERMINATOR: &str = "aws4_request";
const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const DATE_STAMP_FORMAT: &str = "%Y%m%d";

/// Source of the current UTC instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Clone)]
pub struct SigningConfig {
    pub access_key_id: String,
    pub secret_key: String,
    pub host: String,
    pub region: String,
    pub service: String,
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningConfig")
            .field("access_key_id", &self.access_key_id)
            .field("host", &self.host)
            .field("region", &self.region)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

/// Everything produced for one outbound call. Never cached.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub amz_date: String,
    pub date_stamp: String,
    pub payload: String,
    pub canonical_request: String,
    pub string_to_sign: String,
    pub signature: String,
    pub headers: HashMap<String, String>,
}

impl SignedRequest {
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get("Authorization").map(String::as_str)
    }
}

#[derive(Clone)]
pub struct RequestSigner {
    config: SigningConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    pub fn new(config: SigningConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: SigningConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    /// Signs `payload` for a POST to `path`, reading the clock exactly once.
    pub fn sign(&self, path: &str, target: &str, payload: &str) -> Result<SignedRequest> {
        self.sign_at(path, target, payload, self.clock.now())
    }

    pub fn sign_at(
        &self,
        path: &str,
        target: &str,
        payload: &str,
        instant: DateTime<Utc>,
    ) -> Result<SignedRequest> {
        let config = &self.config;
        if config.secret_key.is_empty() {
            return Err(AppError::missing_credentials("secret key is empty"));
        }
        if config.access_key_id.is_empty() {
            return Err(AppError::missing_credentials("access key id is empty"));
        }

        let amz_date = instant.format(AMZ_DATE_FORMAT).to_string();
        let date_stamp = instant.format(DATE_STAMP_FORMAT).to_string();

        let canonical_request =
            build_canonical_request(path, &config.host, &amz_date, target, payload);
        let scope = credential_scope(&date_stamp, &config.region, &config.service);
        let string_to_sign = build_string_to_sign(&amz_date, &scope, &canonical_request);

        let signing_key =
            derive_signing_key(&config.secret_key, &date_stamp, &config.region, &config.service)?;
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, config.access_key_id, scope, SIGNED_HEADERS, signature
        );

        let mut headers = HashMap::new();
        headers.insert("content-encoding".to_string(), CONTENT_ENCODING.to_string());
        headers.insert("content-type".to_string(), CONTENT_TYPE.to_string());
        headers.insert("x-amz-date".to_string(), amz_date.clone());
        headers.insert("x-amz-target".to_string(), target.to_string());
        headers.insert("Authorization".to_string(), authorization);
        headers.insert("Accept".to_string(), "application/json".to_string());

        Ok(SignedRequest {
            amz_date,
            date_stamp,
            payload: payload.to_string(),
            canonical_request,
            string_to_sign,
            signature,
            headers,
        })
    }
}

/// The five signed header lines, each terminated by `\n`, in fixed order.
pub fn canonical_headers(host: &str, amz_date: &str, target: &str) -> String {
    format!(
        "content-encoding:{}\ncontent-type:{}\nhost:{}\nx-amz-date:{}\nx-amz-target:{}\n",
        CONTENT_ENCODING, CONTENT_TYPE, host, amz_date, target
    )
}

pub fn build_canonical_request(
    path: &str,
    host: &str,
    amz_date: &str,
    target: &str,
    payload: &str,
) -> String {
    // empty line for the query string
    format!(
        "POST\n{}\n\n{}\n{}\n{}",
        path,
        canonical_headers(host, amz_date, target),
        SIGNED_HEADERS,
        hash_payload(payload.as_bytes())
    )
}

pub fn credential_scope(date_stamp: &str, region: &str, service: &str) -> String {
    format!("{}/{}/{}/{}", date_stamp, region, service, SCOPE_TERMINATOR)
}

pub fn build_string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        hash_payload(canonical_request.as_bytes())
    )
}

/// Lower-case hex SHA-256.
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// kDate -> kRegion -> kService -> kSigning. Only valid for `date_stamp`.
pub fn derive_signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>> {
    let k_date = hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, SCOPE_TERMINATOR.as_bytes())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
