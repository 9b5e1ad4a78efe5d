//! Page arithmetic and result aggregation
//!
//! Pure half of the bounded concurrent paginator: how many pages a search
//! spans, how they are grouped into batches, and how fetched pages are
//! stitched back together. The I/O half lives in the binary crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bookmarks::Bookmark;

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageResult {
    /// Zero-based page number
    pub page: u32,
    pub items: Vec<Bookmark>,
    /// Total reported by the service when this page was served. Best effort.
    pub count: u64,
}

/// Outcome of an aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Complete,
    Partial,
}

/// Every fetched page concatenated in page order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatedResult {
    pub status: FetchStatus,
    pub items: Vec<Bookmark>,
    /// Pages that could not be fetched, ascending
    pub failed_pages: Vec<u32>,
    /// Total count reported by the first page
    pub total_reported: u64,
    pub pages_requested: u32,
    pub cancelled: bool,
}

impl AggregatedResult {
    pub fn is_complete(&self) -> bool {
        self.status == FetchStatus::Complete
    }

    /// One-line summary for logs, reports and the CLI
    pub fn summary(&self) -> String {
        match self.status {
            FetchStatus::Complete => format!(
                "complete: {} bookmarks from {} page(s)",
                self.items.len(),
                self.pages_requested
            ),
            FetchStatus::Partial => format!(
                "partial: {} bookmarks, {} of {} page(s) missing ({}){}",
                self.items.len(),
                self.failed_pages.len(),
                self.pages_requested,
                self.failed_pages
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                if self.cancelled { ", cancelled" } else { "" }
            ),
        }
    }
}

/// Rate-limit compliance policy for a fetch
///
/// Passed explicitly to the paginator and the link prober so tests can use
/// their own values instead of process-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pacing {
    /// Maximum requests in flight
    pub concurrency: usize,
    /// Wait after each full batch before dispatching the next one
    pub batch_delay: Duration,
    /// Wait after a 429 that carried no `Retry-After` hint
    pub rate_limit_wait: Duration,
    /// Additional attempts after a transient failure
    pub transient_retries: u32,
    pub transient_backoff: Duration,
}

impl Default for Pacing {
    /// Ten requests every six seconds stays under the 120 requests/minute
    /// published by Raindrop.io.
    fn default() -> Self {
        Self {
            concurrency: 10,
            batch_delay: Duration::from_secs(6),
            rate_limit_wait: Duration::from_secs(30),
            transient_retries: 2,
            transient_backoff: Duration::from_secs(1),
        }
    }
}

impl Pacing {
    /// Link probes hit arbitrary hosts, not the Raindrop.io API, so only the
    /// concurrency cap applies.
    pub fn for_probes() -> Self {
        Self {
            concurrency: 20,
            batch_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_batch_delay(mut self, batch_delay: Duration) -> Self {
        self.batch_delay = batch_delay;
        self
    }

    /// Concurrency cap, never below one
    pub fn cap(&self) -> usize {
        self.concurrency.max(1)
    }
}

/// Number of pages needed for `count` results
pub fn total_pages(count: u64, per_page: u32) -> u32 {
    if per_page == 0 {
        return 0;
    }
    let pages = count.div_ceil(per_page as u64);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Pages to request for a search, given what the first page reported
///
/// Always at least one: page 0 has been requested even when empty.
pub fn pages_to_request(count: u64, per_page: u32, max_pages: Option<u32>) -> u32 {
    let pages = total_pages(count, per_page).max(1);
    match max_pages {
        Some(limit) => pages.min(limit.max(1)),
        None => pages,
    }
}

/// Split pages `1..total` into dispatch batches of at most `cap`
pub fn batches(total: u32, cap: usize) -> Vec<Vec<u32>> {
    let remaining: Vec<u32> = (1..total).collect();
    remaining.chunks(cap.max(1)).map(<[u32]>::to_vec).collect()
}

/// Stitch page slots back together in page order
///
/// `slots[n]` holds page `n`; `None` means the page failed or was never
/// fetched. Items are concatenated without re-sorting or deduplication.
pub fn assemble(
    slots: Vec<Option<PageResult>>,
    total_reported: u64,
    cancelled: bool,
) -> AggregatedResult {
    let pages_requested = u32::try_from(slots.len()).unwrap_or(u32::MAX);
    let mut items = Vec::new();
    let mut failed_pages = Vec::new();

    for (index, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(page) => items.extend(page.items),
            None => failed_pages.push(index as u32),
        }
    }

    let status = if failed_pages.is_empty() && !cancelled {
        FetchStatus::Complete
    } else {
        FetchStatus::Partial
    };

    AggregatedResult {
        status,
        items,
        failed_pages,
        total_reported,
        pages_requested,
        cancelled,
    }
}
