//! HTTP fetcher
//!
//! This module performs the fetches described by request descriptors:
//! - Building HTTP clients, one per proxy endpoint plus a direct one
//! - Passing proxy credentials to the client so CONNECT tunnels carry them
//! - Classifying transport errors
//!
//! Status codes are not judged here. Every response that arrives is handed
//! back; the traversal driver decides what a non-2xx status means.

use crate::crawler::request::RequestDescriptor;
use crate::proxy::ProxyCredential;
use reqwest::header::{HeaderValue, PROXY_AUTHORIZATION};
use reqwest::{Client, Proxy};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// A response that arrived, whatever its status
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,

    /// URL after redirects; relative links resolve against it
    pub final_url: Url,

    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A recoverable fetch failure, handled by rotating proxies and reissuing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// Connection, TLS, timeout or body read error
    Transport(String),

    /// A response arrived with a status outside 2xx
    Status(u16),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(error) => write!(f, "transport error: {}", error),
            Self::Status(status) => write!(f, "HTTP {}", status),
        }
    }
}

/// Builds an HTTP client, optionally routed through `proxy`
///
/// # Arguments
///
/// * `timeout` - Whole-request timeout
/// * `proxy` - Proxy to route every request through, `None` for direct
/// * `authorization` - `Proxy-Authorization` value sent to the proxy
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Invalid proxy URL or TLS backend failure
pub fn build_http_client(
    timeout: Duration,
    proxy: Option<&ProxyCredential>,
    authorization: Option<&HeaderValue>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    builder = match proxy {
        Some(proxy) => {
            let mut route = Proxy::all(proxy.endpoint())?;
            if let Some(authorization) = authorization {
                route = route.custom_http_auth(authorization.clone());
            }
            builder.proxy(route)
        }
        // Ignore HTTP(S)_PROXY from the environment; proxying is explicit.
        None => builder.no_proxy(),
    };

    builder.build()
}

/// Performs fetches, caching one client per proxy
pub struct Fetcher {
    timeout: Duration,
    clients: Mutex<HashMap<Option<ProxyCredential>, Client>>,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Fetches one descriptor
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResponse)` - A response arrived (any status)
    /// * `Err(FetchFailure::Transport)` - No usable response
    pub async fn fetch(&self, descriptor: &RequestDescriptor) -> Result<FetchResponse, FetchFailure> {
        let client = self.client_for(descriptor)?;

        // Proxy credentials go to the proxy, never to the target site.
        let mut headers = descriptor.headers.clone();
        headers.remove(PROXY_AUTHORIZATION);

        let response = client
            .get(descriptor.url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let body = response.text().await.map_err(classify_error)?;

        tracing::debug!("{} {} ({} bytes)", status, final_url, body.len());

        Ok(FetchResponse {
            status,
            final_url,
            body,
        })
    }

    fn client_for(&self, descriptor: &RequestDescriptor) -> Result<Client, FetchFailure> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| FetchFailure::Transport("client cache poisoned".to_string()))?;

        if let Some(client) = clients.get(&descriptor.proxy) {
            return Ok(client.clone());
        }

        let client = build_http_client(
            self.timeout,
            descriptor.proxy.as_ref(),
            descriptor.proxy_authorization(),
        )
        .map_err(|e| FetchFailure::Transport(format!("cannot build client: {}", e)))?;

        match &descriptor.proxy {
            Some(proxy) => tracing::debug!("Built HTTP client for proxy {}", proxy),
            None => tracing::debug!("Built direct HTTP client"),
        }

        clients.insert(descriptor.proxy.clone(), client.clone());
        Ok(client)
    }
}

fn classify_error(error: reqwest::Error) -> FetchFailure {
    if error.is_timeout() {
        FetchFailure::Transport("request timeout".to_string())
    } else if error.is_connect() {
        FetchFailure::Transport(format!("connection failed: {}", error))
    } else {
        FetchFailure::Transport(error.to_string())
    }
}
