//! Reverse proxy in front of the local inference server.

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, Request, Response, header};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::ProxyConfig;
use crate::settings::{Settings, names};

/// Local prefixes stripped before forwarding, longest first.
pub const PROXY_PREFIXES: &[&str] = &["/localllm/ollama", "/ollama"];

/// Largest request body buffered for forwarding.
const MAX_REQUEST_BODY: usize = 32 * 1024 * 1024;

const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Invalid upstream URL {url:?}: {reason}")]
    Config { url: String, reason: String },

    #[error("Failed to read request body: {0}")]
    Request(String),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| name.as_str().eq_ignore_ascii_case(h))
}

/// Copies everything except hop-by-hop headers and `Host`.
fn copy_headers(src: &HeaderMap, dst: &mut HeaderMap) {
    for (name, value) in src {
        if is_hop_by_hop(name) || name == header::HOST {
            continue;
        }
        dst.append(name.clone(), value.clone());
    }
}

/// Strips one local prefix. `/localllm/ollama/api/tags` becomes `/api/tags`.
#[must_use]
pub fn rewrite_path(path: &str) -> &str {
    for prefix in PROXY_PREFIXES {
        if let Some(rest) = path.strip_prefix(prefix)
            && (rest.is_empty() || rest.starts_with('/'))
        {
            return if rest.is_empty() { "/" } else { rest };
        }
    }
    path
}

/// Parses the configured upstream base. Must be an absolute http(s) URL.
pub fn parse_upstream(raw: &str) -> Result<Url, ProxyError> {
    let config_err = |reason: String| ProxyError::Config {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| config_err(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(config_err(format!("unsupported scheme {}", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(config_err("missing host".to_string()));
    }
    Ok(url)
}

/// Scheme, host and port come from `base`; the path is the rewritten
/// request path and the query string is kept.
#[must_use]
pub fn upstream_url(base: &Url, path: &str, query: Option<&str>) -> Url {
    let mut target = base.clone();
    target.set_path(rewrite_path(path));
    target.set_query(query);
    target
}

pub struct InferenceProxy {
    client: reqwest::Client,
    settings: Arc<Settings>,
}

impl InferenceProxy {
    pub fn new(config: &ProxyConfig, settings: Arc<Settings>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(10);
        if config.request_timeout_seconds > 0 {
            builder = builder.timeout(Duration::from_secs(config.request_timeout_seconds));
        }

        let client = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build proxy HTTP client: {e}"))?;

        Ok(Self { client, settings })
    }

    pub async fn upstream_base(&self) -> Result<Url, ProxyError> {
        parse_upstream(&self.settings.get(names::LOCAL_LLM_SERVER_URL).await)
    }

    /// Relays `req` upstream and streams the answer back. Upstream statuses are
    /// passed through untouched; only a missing response is an error.
    pub async fn forward(&self, req: Request<Body>) -> Result<Response<Body>, ProxyError> {
        let base = self.upstream_base().await?;
        let (parts, body) = req.into_parts();
        let target = upstream_url(&base, parts.uri.path(), parts.uri.query());

        let mut headers = HeaderMap::new();
        copy_headers(&parts.headers, &mut headers);
        headers.remove(header::ORIGIN);
        headers.remove(header::CONTENT_LENGTH);

        let body = axum::body::to_bytes(body, MAX_REQUEST_BODY)
            .await
            .map_err(|e| ProxyError::Request(e.to_string()))?;

        debug!(method = %parts.method, upstream = %target, "Forwarding to inference server");

        let upstream = self
            .client
            .request(parts.method, target.clone())
            .headers(headers)
            .body(body)
            .send()
            .await
            .inspect_err(|e| warn!(upstream = %target, error = %e, "Inference server unreachable"))?;

        let mut response = Response::builder().status(upstream.status());
        if let Some(out) = response.headers_mut() {
            copy_headers(upstream.headers(), out);
        }

        response
            .body(Body::from_stream(upstream.bytes_stream()))
            .map_err(|e| ProxyError::Request(e.to_string()))
    }
}
