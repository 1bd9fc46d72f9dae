use miette::Diagnostic;
use std::time::Duration;
use thiserror::Error;

/// How much raw payload to keep on a parse or HTTP error.
const RAW_CONTEXT_LIMIT: usize = 500;

/// Failure taxonomy shared by every source client. The `provider` tag carries
/// the provider name; the shape is identical across providers.
#[derive(Debug, Error, Diagnostic)]
pub enum SourceError {
    #[error("[{provider}] HTTP {status} fetching {url}")]
    Api {
        provider: &'static str,
        status: u16,
        url: String,
        body: Option<String>,
    },

    #[error("[{provider}] request to {url} failed")]
    Transport {
        provider: &'static str,
        url: String,
        #[source]
        cause: reqwest::Error,
    },

    #[error("[{provider}] rate limited by server (retry after {retry_after:?}s)")]
    RateLimited {
        provider: &'static str,
        retry_after: Option<f64>,
    },

    #[error("[{provider}] request to {url} timed out after {timeout:?}")]
    Timeout {
        provider: &'static str,
        timeout: Duration,
        url: String,
    },

    #[error("[{provider}] failed to parse {resource_type} {resource_id}: {message}")]
    Parse {
        provider: &'static str,
        resource_type: String,
        resource_id: String,
        message: String,
        raw: Option<String>,
    },

    #[error("database error")]
    Db(#[from] diesel::result::Error),
}

impl SourceError {
    pub fn parse(
        source: &'static str,
        resource_type: &str,
        resource_id: &str,
        message: impl Into<String>,
        raw: Option<&str>,
    ) -> Self {
        SourceError::Parse {
            provider: source,
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            message: message.into(),
            raw: raw.map(truncate_raw),
        }
    }

    /// Transient failures are retried by the client; everything else
    /// surfaces immediately (a retry would return the same bytes or the
    /// same status).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SourceError::Timeout { .. }
                | SourceError::RateLimited { .. }
                | SourceError::Transport { .. }
        )
    }
}

pub fn truncate_raw(raw: &str) -> String {
    if raw.len() <= RAW_CONTEXT_LIMIT {
        raw.to_string()
    } else {
        let mut end = RAW_CONTEXT_LIMIT;
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        raw[..end].to_string()
    }
}
