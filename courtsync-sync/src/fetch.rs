//! The transport contract every source client shares: rate-limit, request,
//! classify, retry transient failures with jittered backoff, honor
//! `Retry-After` on 429, and surface anything else as a typed error.

use log::warn;
use std::time::Duration;

use crate::error::{SourceError, truncate_raw};
use crate::ratelimit::{RateLimiter, backoff};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// GET `url` and return the response body, retrying transient failures.
pub async fn fetch_text(
    source: &'static str,
    http: &reqwest::Client,
    limiter: &RateLimiter,
    policy: &RetryPolicy,
    url: &str,
) -> Result<String, SourceError> {
    let mut last_error: Option<SourceError> = None;

    for attempt in 0..=policy.max_retries {
        limiter.acquire(None).await;

        let error = match http.get(url).send().await {
            Ok(response) => {
                let status = response.status();

                if status.as_u16() == 429 {
                    let retry_after = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|h| h.to_str().ok())
                        .and_then(|s| s.parse::<f64>().ok());
                    SourceError::RateLimited {
                        provider: source,
                        retry_after,
                    }
                } else if status.as_u16() >= 400 {
                    let body = response.text().await.ok();
                    return Err(SourceError::Api {
                        provider: source,
                        status: status.as_u16(),
                        url: url.to_string(),
                        body: body.as_deref().map(truncate_raw),
                    });
                } else {
                    return response.text().await.map_err(|cause| {
                        SourceError::Transport {
                            provider: source,
                            url: url.to_string(),
                            cause,
                        }
                    });
                }
            }
            Err(cause) if cause.is_timeout() => SourceError::Timeout {
                provider: source,
                timeout: policy.request_timeout,
                url: url.to_string(),
            },
            Err(cause) => SourceError::Transport {
                provider: source,
                url: url.to_string(),
                cause,
            },
        };

        if attempt < policy.max_retries && error.is_retryable() {
            // A server-provided Retry-After wins over our own backoff.
            let delay = match &error {
                SourceError::RateLimited {
                    retry_after: Some(seconds),
                    ..
                } => Duration::from_secs_f64(*seconds),
                _ => backoff(attempt, policy.base_delay, policy.max_delay, true),
            };
            warn!(
                "[{source}] transient failure fetching {url} (attempt {}/{}), retrying in {:?}: {error}",
                attempt + 1,
                policy.max_retries,
                delay,
            );
            tokio::time::sleep(delay).await;
            last_error = Some(error);
            continue;
        }

        return Err(error);
    }

    // Retries exhausted; the loop above always recorded the failure.
    Err(last_error.unwrap_or(SourceError::RateLimited {
        provider: source,
        retry_after: None,
    }))
}

/// GET `url` and decode the body as JSON, carrying truncated raw context on
/// parse failure (a retry would return the same bytes, so none is made).
pub async fn fetch_json(
    source: &'static str,
    http: &reqwest::Client,
    limiter: &RateLimiter,
    policy: &RetryPolicy,
    url: &str,
    resource_type: &str,
    resource_id: &str,
) -> Result<serde_json::Value, SourceError> {
    let body = fetch_text(source, http, limiter, policy, url).await?;
    serde_json::from_str(&body).map_err(|e| {
        SourceError::parse(
            source,
            resource_type,
            resource_id,
            format!("invalid JSON: {e}"),
            Some(&body),
        )
    })
}

pub fn build_http_client(
    user_agent: &str,
    request_timeout: Duration,
) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(request_timeout)
        .build()
}
