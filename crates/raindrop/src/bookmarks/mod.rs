use std::sync::Arc;
use std::time::Duration;

use crate::prelude::{eprintln, *};
use raindrop_core::pagination::{AggregatedResult, Pacing};
use tokio_util::sync::CancellationToken;

pub mod collections;
pub mod gateway;
pub mod get;
pub mod paginator;
pub mod search;
pub mod tags;

#[cfg(test)]
pub mod fake;

pub use gateway::{Gateway, HttpGateway};
pub use raindrop_core::bookmarks::SearchQuery;

pub const DEFAULT_BASE_URL: &str = "https://api.raindrop.io/rest/v1";

/// Raindrop.io connection settings, resolved from the global flags
#[derive(Debug, Clone)]
pub struct RaindropConfig {
    pub base_url: String,
    pub token: String,
    pub timeout: Duration,
}

impl RaindropConfig {
    pub fn from_global(global: &crate::Global) -> Result<Self, ApiError> {
        let token = global
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ApiError::Auth("RAINDROP_TOKEN environment variable not set".to_string())
            })?;

        Ok(Self {
            base_url: global.base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            timeout: Duration::from_secs(global.timeout.max(1)),
        })
    }
}

/// Create an HTTP client that sends the bearer token on every request
pub fn create_authenticated_client(config: &RaindropConfig) -> Result<reqwest::Client, ApiError> {
    use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};

    let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
        .map_err(|e| ApiError::Auth(format!("Invalid token: {e}")))?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .user_agent(concat!("raindrop/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ApiError::Transient(format!("Failed to build HTTP client: {e}")))
}

/// Pacing for API fetches as configured by the global flags
pub fn pacing(global: &crate::Global) -> Pacing {
    Pacing::default()
        .with_concurrency(global.max_concurrent)
        .with_batch_delay(Duration::from_millis(global.batch_delay_ms))
}

/// Token cancelled on Ctrl-C
pub fn shutdown_signal() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received, cancelling outstanding requests");
            trigger.cancel();
        }
    });

    cancel
}

/// Everything an operation needs to talk to Raindrop.io
#[derive(Clone)]
pub struct Session {
    pub gateway: Arc<dyn Gateway>,
    pub pacing: Pacing,
    pub cancel: CancellationToken,
}

impl Session {
    pub fn new(gateway: Arc<dyn Gateway>, pacing: Pacing, cancel: CancellationToken) -> Self {
        Self {
            gateway,
            pacing,
            cancel,
        }
    }

    pub fn connect(global: &crate::Global, cancel: CancellationToken) -> Result<Self, ApiError> {
        let config = RaindropConfig::from_global(global)?;
        let gateway = HttpGateway::new(&config)?;

        Ok(Self::new(Arc::new(gateway), pacing(global), cancel))
    }

    /// Fetch every page of a query under this session's pacing
    pub async fn fetch(&self, query: &SearchQuery) -> Result<AggregatedResult, ApiError> {
        paginator::fetch_all(self.gateway.as_ref(), query, &self.pacing, &self.cancel).await
    }

    /// Fetch every bookmark of a collection
    pub async fn fetch_collection(&self, collection_id: i64) -> Result<AggregatedResult, ApiError> {
        self.fetch(&SearchQuery::collection(collection_id)).await
    }
}

/// Print a warning when an aggregation came back partial
pub fn warn_if_partial(result: &AggregatedResult) {
    use colored::Colorize;

    if !result.is_complete() {
        eprintln!("{} {}", "warning:".yellow().bold(), result.summary().yellow());
    }
}
