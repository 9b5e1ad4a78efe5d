//! Collection-wide scans: duplicates, broken links, tags, statistics

use std::time::Duration;

use raindrop_core::analytics::{
    find_duplicates, percentage, redundant_count, statistics, tag_statistics, untagged,
    BrokenLink, DuplicateCluster, Statistics, TagCount,
};
use raindrop_core::bookmarks::Bookmark;
use raindrop_core::pagination::{AggregatedResult, FetchStatus, Pacing};
use serde::Serialize;

use crate::bookmarks::Session;
use crate::prelude::*;

pub mod check_links;
pub mod duplicates;
pub mod probe;
pub mod stats;
pub mod untagged;

pub use probe::{check_links, HttpProber, LinkProber};

/// Default per-probe timeout
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// How complete the underlying bookmark fetch was
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScanSummary {
    pub collection_id: i64,
    pub status: FetchStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_pages: Vec<u32>,
    pub scanned: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

impl ScanSummary {
    fn new(collection_id: i64, fetch: &AggregatedResult) -> Self {
        Self {
            collection_id,
            status: fetch.status,
            failed_pages: fetch.failed_pages.clone(),
            scanned: fetch.items.len(),
            cancelled: fetch.cancelled,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicatesOutput {
    #[serde(skip)]
    pub fetch: AggregatedResult,
    #[serde(flatten)]
    pub scan: ScanSummary,
    pub duplicate_urls: usize,
    pub redundant: usize,
    pub clusters: Vec<DuplicateCluster>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrokenLinksOutput {
    #[serde(skip)]
    pub fetch: AggregatedResult,
    #[serde(flatten)]
    pub scan: ScanSummary,
    pub checked: usize,
    pub broken_count: usize,
    pub success_rate: usize,
    /// Probing stopped before every bookmark was checked
    pub probe_cancelled: bool,
    pub broken: Vec<BrokenLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagStatisticsOutput {
    #[serde(skip)]
    pub fetch: AggregatedResult,
    #[serde(flatten)]
    pub scan: ScanSummary,
    pub tags: Vec<TagCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UntaggedOutput {
    #[serde(skip)]
    pub fetch: AggregatedResult,
    #[serde(flatten)]
    pub scan: ScanSummary,
    pub count: usize,
    pub percentage: usize,
    pub bookmarks: Vec<Bookmark>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatisticsOutput {
    #[serde(skip)]
    pub fetch: AggregatedResult,
    #[serde(flatten)]
    pub scan: ScanSummary,
    pub statistics: Statistics,
    pub untagged_percentage: usize,
    /// Link probing stopped before every bookmark was checked
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub probe_cancelled: bool,
}

/// Bookmarks sharing a normalized URL
pub async fn duplicates_data(
    session: &Session,
    collection_id: i64,
) -> Result<DuplicatesOutput, ApiError> {
    let fetch = session.fetch_collection(collection_id).await?;
    let clusters = find_duplicates(&fetch.items);

    Ok(DuplicatesOutput {
        scan: ScanSummary::new(collection_id, &fetch),
        duplicate_urls: clusters.len(),
        redundant: redundant_count(&clusters),
        clusters,
        fetch,
    })
}

/// Probe every bookmark of a collection and keep the unreachable ones
pub async fn broken_links_data(
    session: &Session,
    prober: &dyn LinkProber,
    probe_pacing: &Pacing,
    collection_id: i64,
) -> Result<BrokenLinksOutput, ApiError> {
    let fetch = session.fetch_collection(collection_id).await?;
    let check = check_links(prober, &fetch.items, probe_pacing, &session.cancel).await;

    Ok(BrokenLinksOutput {
        scan: ScanSummary::new(collection_id, &fetch),
        checked: check.checked,
        broken_count: check.broken.len(),
        success_rate: percentage(check.checked - check.broken.len(), check.checked),
        probe_cancelled: check.cancelled,
        broken: check.broken,
        fetch,
    })
}

/// Tag usage counted over the bookmarks themselves
pub async fn tag_statistics_data(
    session: &Session,
    collection_id: i64,
) -> Result<TagStatisticsOutput, ApiError> {
    let fetch = session.fetch_collection(collection_id).await?;

    Ok(TagStatisticsOutput {
        scan: ScanSummary::new(collection_id, &fetch),
        tags: tag_statistics(&fetch.items),
        fetch,
    })
}

pub async fn untagged_data(
    session: &Session,
    collection_id: i64,
) -> Result<UntaggedOutput, ApiError> {
    let fetch = session.fetch_collection(collection_id).await?;
    let bookmarks: Vec<Bookmark> = untagged(&fetch.items).into_iter().cloned().collect();

    Ok(UntaggedOutput {
        scan: ScanSummary::new(collection_id, &fetch),
        count: bookmarks.len(),
        percentage: percentage(bookmarks.len(), fetch.items.len()),
        bookmarks,
        fetch,
    })
}

/// Collection statistics, optionally probing every link
pub async fn statistics_data(
    session: &Session,
    prober: Option<(&dyn LinkProber, &Pacing)>,
    collection_id: i64,
) -> Result<StatisticsOutput, ApiError> {
    let fetch = session.fetch_collection(collection_id).await?;

    let (broken, probe_cancelled) = match prober {
        Some((prober, pacing)) => {
            let check = check_links(prober, &fetch.items, pacing, &session.cancel).await;
            (Some(check.broken.len()), check.cancelled)
        }
        None => (None, false),
    };
    let statistics = statistics(&fetch.items, broken);

    Ok(StatisticsOutput {
        scan: ScanSummary::new(collection_id, &fetch),
        untagged_percentage: percentage(statistics.untagged, statistics.total),
        statistics,
        probe_cancelled,
        fetch,
    })
}

#[cfg(test)]
mod tests {
    use super::probe::fake::FakeProber;
    use super::*;
    use crate::bookmarks::fake::{bookmark, FakeGateway};
    use raindrop_core::analytics::LinkStatus;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn session(library: Vec<Bookmark>) -> Session {
        Session::new(
            Arc::new(FakeGateway::with_library(library)),
            Pacing::default(),
            CancellationToken::new(),
        )
    }

    fn library() -> Vec<Bookmark> {
        vec![
            bookmark(1, "http://x.com/a", &["ai", "tools"]),
            bookmark(2, "http://x.com/a/", &["ai"]),
            bookmark(3, "https://X.com/a?ref=1", &[]),
            bookmark(4, "https://y.com", &["tools"]),
            bookmark(5, "https://z.com", &[]),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicates_data() {
        let output = duplicates_data(&session(library()), 0).await.unwrap();

        assert_eq!(output.scan.scanned, 5);
        assert_eq!(output.duplicate_urls, 1);
        assert_eq!(output.redundant, 2);
        let ids: Vec<i64> = output.clusters[0].members.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["status"], "complete");
        assert_eq!(json["redundant"], 2);
        assert!(json.get("fetch").is_none());
        assert!(json.get("failed_pages").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tag_statistics_data() {
        let output = tag_statistics_data(&session(library()), 0).await.unwrap();

        assert_eq!(
            output.tags,
            vec![
                TagCount {
                    tag: "ai".to_string(),
                    count: 2
                },
                TagCount {
                    tag: "tools".to_string(),
                    count: 2
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_untagged_data() {
        let output = untagged_data(&session(library()), 0).await.unwrap();

        assert_eq!(output.count, 2);
        assert_eq!(output.percentage, 40);
        let ids: Vec<i64> = output.bookmarks.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![3, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_broken_links_data() {
        let prober = FakeProber::with(&[("https://y.com", LinkStatus::ConnectionFailed)]);

        let output = broken_links_data(&session(library()), &prober, &Pacing::for_probes(), 0)
            .await
            .unwrap();

        assert_eq!(output.checked, 5);
        assert_eq!(output.broken_count, 1);
        assert_eq!(output.success_rate, 80);
        assert_eq!(output.broken[0].bookmark.id, 4);
        assert!(!output.probe_cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_statistics_data() {
        let fake = FakeProber::with(&[("https://z.com", LinkStatus::Timeout)]);
        let prober: &dyn LinkProber = &fake;
        let pacing = Pacing::for_probes();
        let session = session(library());

        let without = statistics_data(&session, None, 0).await.unwrap();
        assert_eq!(without.statistics.total, 5);
        assert_eq!(without.statistics.redundant, 2);
        assert_eq!(without.statistics.untagged, 2);
        assert_eq!(without.statistics.broken, None);
        assert_eq!(without.untagged_percentage, 40);

        let with = statistics_data(&session, Some((prober, &pacing)), 0)
            .await
            .unwrap();
        assert_eq!(with.statistics.broken, Some(1));
        assert!(!with.probe_cancelled);
        assert!(serde_json::to_value(&with).unwrap().get("probe_cancelled").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_statistics_data_reports_cancelled_probing() {
        let fake = FakeProber::with_latency(Duration::from_secs(1));
        let prober: &dyn LinkProber = &fake;
        let pacing = Pacing::for_probes().with_concurrency(1);
        let cancel = CancellationToken::new();
        let session = Session::new(
            Arc::new(FakeGateway::with_library(library())),
            Pacing::default(),
            cancel.clone(),
        );
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            cancel.cancel();
        });

        let output = statistics_data(&session, Some((prober, &pacing)), 0)
            .await
            .unwrap();

        assert!(output.probe_cancelled);
        assert_eq!(output.statistics.total, 5);
        assert_eq!(serde_json::to_value(&output).unwrap()["probe_cancelled"], true);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_reports_partial_fetch() {
        let gateway = FakeGateway::with_total(120).fail_page(
            1,
            vec![ApiError::Transient("HTTP 502".to_string()); 3],
        );
        let session = Session::new(
            Arc::new(gateway),
            Pacing::default(),
            CancellationToken::new(),
        );

        let output = duplicates_data(&session, 0).await.unwrap();

        assert_eq!(output.scan.status, FetchStatus::Partial);
        assert_eq!(output.scan.failed_pages, vec![1]);
        assert_eq!(output.scan.scanned, 70);
    }
}
