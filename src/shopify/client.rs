//! Admin REST API client.
//!
//! Thin JSON wrapper over reqwest. Maps HTTP status codes onto [`SyncError`]
//! so callers can match on not-found and rate-limit conditions, and follows
//! `Link: <...>; rel="next"` cursors for list endpoints.

use crate::credentials::Credentials;
use crate::error::{Result, SyncError};
use reqwest::header::{HeaderMap, LINK, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Page size requested from list endpoints (API maximum)
pub const PAGE_LIMIT: u32 = 250;

/// Longest error body kept in an error message
const MAX_ERROR_BODY: usize = 512;

#[derive(Clone)]
pub struct AdminClient {
    http: Client,
    base_url: String,
    access_token: String,
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl AdminClient {
    /// Client for `https://<site>/admin/api/<version>/`.
    pub fn new(credentials: &Credentials, api_version: &str) -> Result<Self> {
        let base_url = format!("https://{}/admin/api/{}", credentials.site, api_version);
        Self::with_base_url(credentials, base_url)
    }

    /// Client against an arbitrary API root (used by tests with a mock server).
    pub fn with_base_url(credentials: &Credentials, base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("shopsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: credentials.access_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn send(&self, what: &str, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        check_status(what, response).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        tracing::debug!("GET {}", path);
        let builder = self.request(Method::GET, &self.url(path)).query(query);
        let response = self.send(path, builder).await?;
        Ok(response.json().await?)
    }

    /// Fetch every item of a paginated list endpoint.
    ///
    /// `key` names the array in the response body (`{"pages": [...]}`).
    pub async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let limit = PAGE_LIMIT.to_string();
        let mut builder = self
            .request(Method::GET, &self.url(path))
            .query(query)
            .query(&[("limit", limit.as_str())]);
        let mut items = Vec::new();

        loop {
            let response = self.send(path, builder).await?;
            let next = response
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_page_url);
            let body: Value = response.json().await?;
            items.extend(take_items::<T>(body, key)?);

            match next {
                Some(url) => {
                    tracing::debug!("Following next page of {}", path);
                    builder = self.request(Method::GET, &url);
                }
                None => break,
            }
        }

        Ok(items)
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!("PUT {}", path);
        let builder = self.request(Method::PUT, &self.url(path)).json(body);
        let response = self.send(path, builder).await?;
        Ok(response.json().await?)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!("POST {}", path);
        let builder = self.request(Method::POST, &self.url(path)).json(body);
        let response = self.send(path, builder).await?;
        Ok(response.json().await?)
    }

    pub async fn delete(&self, path: &str, query: &[(&str, &str)]) -> Result<()> {
        tracing::debug!("DELETE {}", path);
        let builder = self.request(Method::DELETE, &self.url(path)).query(query);
        self.send(path, builder).await?;
        Ok(())
    }
}

async fn check_status(what: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();
    let body = truncate(body.trim(), MAX_ERROR_BODY);

    Err(match status {
        StatusCode::NOT_FOUND => SyncError::NotFound(what.to_string()),
        StatusCode::TOO_MANY_REQUESTS => SyncError::RateLimited { retry_after },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SyncError::Auth {
            status: status.as_u16(),
            message: body,
        },
        _ => SyncError::Http {
            status: status.as_u16(),
            body,
        },
    })
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs: f64 = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

fn take_items<T: DeserializeOwned>(mut body: Value, key: &str) -> Result<Vec<T>> {
    match body.get_mut(key).map(Value::take) {
        Some(items) => Ok(serde_json::from_value(items)?),
        None => Err(SyncError::Transport(format!(
            "response is missing the \"{}\" field",
            key
        ))),
    }
}

/// Extract the `rel="next"` target from a `Link` header.
pub fn next_page_url(link: &str) -> Option<String> {
    link.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|p| {
            let p = p.trim();
            p == "rel=\"next\"" || p == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}
