//! Reachability probes for bookmarked URLs

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use log::{debug, info};
use raindrop_core::analytics::{BrokenLink, LinkStatus};
use raindrop_core::bookmarks::Bookmark;
use raindrop_core::pagination::Pacing;
use tokio_util::sync::CancellationToken;

use crate::prelude::*;

#[async_trait]
pub trait LinkProber: Send + Sync {
    async fn probe(&self, url: &str) -> LinkStatus;
}

/// HEAD probe following redirects, with a GET fallback for servers that
/// refuse HEAD
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(concat!("raindrop/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

        Ok(Self { client })
    }
}

fn classify_error(err: reqwest::Error) -> LinkStatus {
    if err.is_timeout() {
        LinkStatus::Timeout
    } else if err.is_connect() {
        LinkStatus::ConnectionFailed
    } else {
        LinkStatus::error(err.to_string())
    }
}

#[async_trait]
impl LinkProber for HttpProber {
    async fn probe(&self, url: &str) -> LinkStatus {
        let status = match self.client.head(url).send().await {
            Ok(response) => response.status().as_u16(),
            Err(err) => return classify_error(err),
        };

        if status == 405 || status == 501 {
            debug!("{url} refused HEAD ({status}), retrying with GET");
            return match self.client.get(url).send().await {
                Ok(response) => LinkStatus::from_status(response.status().as_u16()),
                Err(err) => classify_error(err),
            };
        }

        LinkStatus::from_status(status)
    }
}

/// Result of probing a set of bookmarks
#[derive(Debug, Clone, PartialEq)]
pub struct LinkCheck {
    /// Bookmarks probed before completion or cancellation
    pub checked: usize,
    /// Broken links in bookmark order
    pub broken: Vec<BrokenLink>,
    pub cancelled: bool,
}

/// Probe every bookmark URL with at most `pacing.cap()` probes in flight
///
/// Bookmarks without a URL are skipped and do not count as checked.
pub async fn check_links(
    prober: &dyn LinkProber,
    bookmarks: &[Bookmark],
    pacing: &Pacing,
    cancel: &CancellationToken,
) -> LinkCheck {
    let probes: Vec<_> = bookmarks
        .iter()
        .filter(|bookmark| !bookmark.url.trim().is_empty())
        .map(|bookmark| async move { (bookmark, prober.probe(bookmark.url.trim()).await) })
        .collect();
    let total = probes.len();

    info!("checking {total} link(s), {} at a time", pacing.cap());

    let results: Vec<(&Bookmark, LinkStatus)> = stream::iter(probes)
        .buffered(pacing.cap())
        .take_until(cancel.cancelled())
        .collect()
        .await;

    let checked = results.len();
    let broken: Vec<BrokenLink> = results
        .into_iter()
        .filter(|(_, status)| status.is_broken())
        .map(|(bookmark, status)| BrokenLink {
            bookmark: bookmark.clone(),
            status,
        })
        .collect();

    info!("{} of {checked} link(s) broken", broken.len());

    LinkCheck {
        checked,
        broken,
        cancelled: checked < total,
    }
}
