//! S3-compatible object storage over plain HTTP
//!
//! Uploads are single `PUT Object` requests signed with AWS Signature
//! Version 4. Without an endpoint override objects go to the virtual-hosted
//! AWS URL `https://<bucket>.s3.<region>.amazonaws.com/<key>`; with one, to
//! the path-style URL `<endpoint>/<bucket>/<key>`.

use crate::config::StorageConfig;
use crate::storage::traits::{ObjectStore, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::time::Duration;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";

/// Access keys read from the environment
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl AwsCredentials {
    /// Reads `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and the optional
    /// `AWS_SESSION_TOKEN`
    pub fn from_env() -> StorageResult<Self> {
        let access_key_id = non_empty_env("AWS_ACCESS_KEY_ID")
            .ok_or(StorageError::MissingCredentials("AWS_ACCESS_KEY_ID"))?;
        let secret_access_key = non_empty_env("AWS_SECRET_ACCESS_KEY")
            .ok_or(StorageError::MissingCredentials("AWS_SECRET_ACCESS_KEY"))?;

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: non_empty_env("AWS_SESSION_TOKEN"),
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// One bucket in one region
pub struct S3Store {
    client: Client,
    bucket: String,
    region: String,
    endpoint: Option<Url>,
    public_read: bool,
    credentials: AwsCredentials,
}

impl S3Store {
    pub fn new(config: &StorageConfig, credentials: AwsCredentials) -> StorageResult<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .map(|endpoint| {
                Url::parse(endpoint).map_err(|e| StorageError::InvalidEndpoint(format!("{}: {}", endpoint, e)))
            })
            .transpose()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            endpoint,
            public_read: config.public_read,
            credentials,
        })
    }

    /// Request URL for `key`
    fn object_url(&self, key: &str) -> StorageResult<Url> {
        let encoded = encode_key(key);
        let url = match &self.endpoint {
            Some(endpoint) => {
                let base = endpoint.as_str().trim_end_matches('/');
                format!("{}/{}/{}", base, self.bucket, encoded)
            }
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, encoded
            ),
        };
        Url::parse(&url).map_err(|e| StorageError::InvalidEndpoint(format!("{}: {}", url, e)))
    }

    /// Headers for a signed PUT of a payload with hash `payload_hash` at `now`
    fn signed_headers(
        &self,
        url: &Url,
        content_type: &str,
        payload_hash: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<Vec<(String, String)>> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(StorageError::InvalidEndpoint(url.to_string())),
        };

        // Canonical headers must be sorted by name.
        let mut headers: Vec<(String, String)> = vec![
            ("content-type".to_string(), content_type.to_string()),
            ("host".to_string(), host),
        ];
        if self.public_read {
            headers.push(("x-amz-acl".to_string(), "public-read".to_string()));
        }
        headers.push(("x-amz-content-sha256".to_string(), payload_hash.to_string()));
        headers.push(("x-amz-date".to_string(), amz_date.clone()));
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }

        let canonical_headers: String = headers
            .iter()
            .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
            .collect();
        let signed_header_names = headers
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let canonical_request = format!(
            "PUT\n{}\n{}\n{}\n{}\n{}",
            url.path(),
            url.query().unwrap_or(""),
            canonical_headers,
            signed_header_names,
            payload_hash
        );

        let scope = format!("{}/{}/{}/aws4_request", date, self.region, SERVICE);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let key = signing_key(&self.credentials.secret_access_key, &date, &self.region, SERVICE)?;
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, self.credentials.access_key_id, scope, signed_header_names, signature
        );

        // reqwest derives Host from the URL itself.
        headers.retain(|(name, _)| name != "host");
        headers.push(("authorization".to_string(), authorization));
        Ok(headers)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> StorageResult<()> {
        let url = self.object_url(key)?;
        let payload_hash = hex::encode(Sha256::digest(&body));
        let headers = self.signed_headers(&url, content_type, &payload_hash, Utc::now())?;

        let mut request = self.client.put(url.clone()).body(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                key: key.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("Uploaded {}", self.location(key));
        Ok(())
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }

    fn public_url(&self, key: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{}",
                endpoint.as_str().trim_end_matches('/'),
                self.bucket,
                encode_key(key)
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            ),
        }
    }
}

/// Percent-encodes each path segment of an object key, keeping `/`
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> StorageResult<Vec<u8>> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| StorageError::Signing(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// SigV4 signing key for one day, region and service
fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> StorageResult<Vec<u8>> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}
