use std::collections::BTreeMap;
use std::time::Duration;

use ghas_core::{classify_status, retry_delay_ms, Integration, StatusClass};
use ghas_platform::{PlatformError, PlatformResult};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, LINK, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt after `attempt` retryable failures, or
    /// `None` once the attempt budget is spent.
    pub fn next_delay_ms(&self, attempt: u32, retry_after_secs: Option<u64>) -> Option<u64> {
        if attempt >= self.max_attempts {
            return None;
        }
        Some(retry_delay_ms(attempt, self.base_backoff_ms, retry_after_secs))
    }
}

/// Connection settings for the REST API.
#[derive(Debug, Clone)]
pub struct GitHubSettings {
    pub api_base_url: String,
    pub uploads_base_url: String,
    pub installations: BTreeMap<Integration, u64>,
    pub retry: RetryPolicy,
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
            uploads_base_url: "https://uploads.github.com".to_string(),
            installations: BTreeMap::new(),
            retry: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Authenticated HTTP client with retry and pagination.
pub struct GitHubClient {
    http: Client,
    token: SecretString,
    pub(crate) settings: GitHubSettings,
}

impl GitHubClient {
    pub fn new(token: SecretString, settings: GitHubSettings) -> PlatformResult<Self> {
        if token.expose_secret().trim().is_empty() {
            return Err(PlatformError::Configuration("API token is empty".into()));
        }
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static("2022-11-28"));
        headers.insert(USER_AGENT, HeaderValue::from_static("ghas-compliance"));
        let http = Client::builder()
            .default_headers(headers)
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| PlatformError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            http,
            token,
            settings,
        })
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.settings.api_base_url.trim_end_matches('/'), path)
    }

    pub fn uploads_url(&self, path: &str) -> String {
        format!("{}{}", self.settings.uploads_base_url.trim_end_matches('/'), path)
    }

    pub fn installation_id(&self, integration: Integration) -> PlatformResult<u64> {
        self.settings
            .installations
            .get(&integration)
            .copied()
            .ok_or_else(|| PlatformError::Configuration(format!("no installation id for the {integration} integration")))
    }

    /// Sends a request, retrying transient failures. `Ok(None)` is a 404.
    pub async fn execute<F>(&self, operation: &str, build: F) -> PlatformResult<Option<Response>>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let retry = &self.settings.retry;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let request = build(&self.http).bearer_auth(self.token.expose_secret());
            let (status, retry_after, message) = match request.send().await {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    match classify_status(status) {
                        StatusClass::Success => return Ok(Some(resp)),
                        StatusClass::NotFound => return Ok(None),
                        StatusClass::Fatal => {
                            let body = resp.text().await.unwrap_or_default();
                            return Err(PlatformError::rejected(operation, status, truncate(&body)));
                        }
                        StatusClass::Retryable => {
                            let retry_after = resp
                                .headers()
                                .get(RETRY_AFTER)
                                .and_then(|v| v.to_str().ok())
                                .and_then(|v| v.trim().parse::<u64>().ok());
                            let body = resp.text().await.unwrap_or_default();
                            (Some(status), retry_after, truncate(&body))
                        }
                    }
                }
                Err(e) => (None, None, e.to_string()),
            };
            let Some(delay) = retry.next_delay_ms(attempt, retry_after) else {
                warn!(operation, attempt, ?status, "giving up after retries");
                return Err(PlatformError::transient(operation, status, message));
            };
            debug!(operation, attempt, ?status, delay_ms = delay, "retrying");
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, operation: &str, url: &str) -> PlatformResult<Option<T>> {
        match self.execute(operation, |c| c.get(url)).await? {
            Some(resp) => decode(operation, resp).await.map(Some),
            None => Ok(None),
        }
    }

    /// Follows `Link: rel="next"` until the platform reports no further pages.
    pub async fn get_paginated<P, T, F>(&self, operation: &str, first_url: &str, unwrap: F) -> PlatformResult<Vec<T>>
    where
        P: DeserializeOwned,
        F: Fn(P) -> Vec<T> + Send + Sync,
    {
        let mut items = Vec::new();
        let mut next = Some(first_url.to_string());
        while let Some(url) = next.take() {
            let Some(resp) = self.execute(operation, |c| c.get(url.as_str())).await? else {
                break;
            };
            next = next_link(resp.headers());
            let page: P = decode(operation, resp).await?;
            items.extend(unwrap(page));
        }
        Ok(items)
    }

    /// Raw body of a successful response. A 404 is reported as rejected.
    pub async fn get_bytes(&self, operation: &str, url: &str, accept: &'static str) -> PlatformResult<Vec<u8>> {
        let resp = self
            .execute(operation, |c| c.get(url).header(ACCEPT, accept))
            .await?
            .ok_or_else(|| PlatformError::rejected(operation, 404, format!("{url} not found")))?;
        resp.bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| PlatformError::transient(operation, None, e.to_string()))
    }

    /// A write that must find its target; a 404 becomes `Rejected`.
    pub async fn require<F>(&self, operation: &str, build: F) -> PlatformResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        self.execute(operation, build)
            .await?
            .ok_or_else(|| PlatformError::rejected(operation, 404, "target not found"))
    }
}

pub(crate) async fn decode<T: DeserializeOwned>(operation: &str, resp: Response) -> PlatformResult<T> {
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| PlatformError::transient(operation, None, e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| PlatformError::malformed(operation, e.to_string()))
}

fn truncate(body: &str) -> String {
    const MAX: usize = 300;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// URL tagged `rel="next"` in a `Link` header.
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(LINK)?.to_str().ok()?;
    parse_next_link(value)
}

pub fn parse_next_link(value: &str) -> Option<String> {
    value.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let url = pieces.next()?.trim();
        let is_next = pieces.any(|p| p.trim() == r#"rel="next""#);
        if is_next && url.starts_with('<') && url.ends_with('>') {
            Some(url[1..url.len() - 1].to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_header_next() {
        let header = r#"<https://api.github.com/x?page=2>; rel="next", <https://api.github.com/x?page=5>; rel="last""#;
        assert_eq!(parse_next_link(header).as_deref(), Some("https://api.github.com/x?page=2"));
        let last_page = r#"<https://api.github.com/x?page=1>; rel="prev", <https://api.github.com/x?page=1>; rel="first""#;
        assert_eq!(parse_next_link(last_page), None);
    }

    #[test]
    fn empty_token_is_rejected() {
        let err = GitHubClient::new(SecretString::from(String::new()), GitHubSettings::default());
        assert!(matches!(err, Err(PlatformError::Configuration(_))));
    }

    #[test]
    fn retry_budget_runs_out_at_max_attempts() {
        let policy = RetryPolicy::default();
        let delays: Vec<_> = (1..=5).map(|attempt| policy.next_delay_ms(attempt, None)).collect();
        assert_eq!(delays, vec![Some(500), Some(1000), Some(2000), None, None]);
    }

    #[test]
    fn retry_after_header_sets_the_delay() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_backoff_ms: 500,
        };
        assert_eq!(policy.next_delay_ms(1, Some(2)), Some(2_000));
        assert_eq!(policy.next_delay_ms(2, Some(7200)), Some(60_000));
        assert_eq!(policy.next_delay_ms(3, Some(2)), None);
    }

    #[test]
    fn single_attempt_policy_never_retries() {
        let policy = RetryPolicy {
            max_attempts: 1,
            base_backoff_ms: 500,
        };
        assert_eq!(policy.next_delay_ms(1, None), None);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let long = "é".repeat(400);
        let cut = truncate(&long);
        assert!(cut.ends_with("..."));
        assert!(cut.len() < long.len());
    }
}
