//! Derived views over a set of bookmarks
//!
//! Duplicate clusters, tag usage, untagged bookmarks, link-probe
//! classification and collection statistics. Deduplication only ever happens
//! here, never while paginating.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use url::Url;

use crate::bookmarks::Bookmark;

/// Normalize a URL into its deduplication key
///
/// Host (lower-cased, with a non-default port) plus path; scheme, query,
/// fragment and trailing slashes are dropped, so `http://x.com/a`,
/// `http://x.com/a/` and `https://X.com/a?ref=1` share a key. Strings that
/// do not parse as absolute URLs fall back to their trimmed lower-cased form.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();

    let parsed = match Url::parse(trimmed) {
        Ok(url) if url.host_str().is_some() => url,
        _ => return trimmed.trim_end_matches('/').to_lowercase(),
    };

    let mut key = parsed.host_str().unwrap_or_default().to_lowercase();
    if let Some(port) = parsed.port() {
        key.push_str(&format!(":{port}"));
    }
    key.push_str(parsed.path().trim_end_matches('/'));
    key
}

/// Bookmarks sharing one normalized URL
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DuplicateCluster {
    pub key: String,
    /// Ordered by id ascending
    pub members: Vec<Bookmark>,
}

impl DuplicateCluster {
    /// Copies beyond the first
    pub fn redundant(&self) -> usize {
        self.members.len().saturating_sub(1)
    }
}

/// Group bookmarks by normalized URL, keeping groups with more than one member
///
/// Clusters are ordered by size descending, then key ascending. Bookmarks
/// without a URL are ignored.
pub fn find_duplicates(bookmarks: &[Bookmark]) -> Vec<DuplicateCluster> {
    let mut groups: BTreeMap<String, Vec<Bookmark>> = BTreeMap::new();

    for bookmark in bookmarks.iter().filter(|b| !b.url.trim().is_empty()) {
        groups
            .entry(normalize_url(&bookmark.url))
            .or_default()
            .push(bookmark.clone());
    }

    let mut clusters: Vec<DuplicateCluster> = groups
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(key, mut members)| {
            members.sort_by_key(|b| b.id);
            DuplicateCluster { key, members }
        })
        .collect();

    clusters.sort_by(|a, b| {
        b.members
            .len()
            .cmp(&a.members.len())
            .then_with(|| a.key.cmp(&b.key))
    });
    clusters
}

/// Total redundant bookmarks across clusters
pub fn redundant_count(clusters: &[DuplicateCluster]) -> usize {
    clusters.iter().map(DuplicateCluster::redundant).sum()
}

/// Usage count of one tag
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

fn ranked(counts: BTreeMap<String, u64>) -> Vec<TagCount> {
    let mut tags: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount { tag, count })
        .collect();
    // BTreeMap iteration is already name-ascending; the stable sort keeps it
    // as the tie breaker.
    tags.sort_by(|a, b| b.count.cmp(&a.count));
    tags
}

/// Count how many bookmarks carry each tag
///
/// A tag repeated within one bookmark counts once. Ordered by count
/// descending, ties by tag name ascending.
pub fn tag_statistics(bookmarks: &[Bookmark]) -> Vec<TagCount> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();

    for bookmark in bookmarks {
        let unique: HashSet<&str> = bookmark
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        for tag in unique {
            *counts.entry(tag.to_string()).or_insert(0) += 1;
        }
    }

    ranked(counts)
}

/// Service-side tag counts filtered by `min_count`, ordered like [`tag_statistics`]
pub fn rank_tags(tags: &BTreeMap<String, u64>, min_count: u64) -> Vec<TagCount> {
    ranked(
        tags.iter()
            .filter(|(_, count)| **count >= min_count)
            .map(|(tag, count)| (tag.clone(), *count))
            .collect(),
    )
}

/// Bookmarks with an empty tag set
pub fn untagged(bookmarks: &[Bookmark]) -> Vec<&Bookmark> {
    bookmarks.iter().filter(|b| b.is_untagged()).collect()
}

/// Outcome of probing one URL
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LinkStatus {
    Reachable { status: u16 },
    HttpError { status: u16 },
    Timeout,
    ConnectionFailed,
    Error { message: String },
}

impl LinkStatus {
    /// Classify a received HTTP status
    pub fn from_status(status: u16) -> Self {
        if status >= 400 {
            LinkStatus::HttpError { status }
        } else {
            LinkStatus::Reachable { status }
        }
    }

    /// Build an `Error` outcome, truncating long messages
    pub fn error(message: impl AsRef<str>) -> Self {
        LinkStatus::Error {
            message: message.as_ref().chars().take(50).collect(),
        }
    }

    pub fn is_broken(&self) -> bool {
        !matches!(self, LinkStatus::Reachable { .. })
    }

    pub fn label(&self) -> String {
        match self {
            LinkStatus::Reachable { status } => status.to_string(),
            LinkStatus::HttpError { status } => format!("HTTP {status}"),
            LinkStatus::Timeout => "Timeout".to_string(),
            LinkStatus::ConnectionFailed => "Connection failed".to_string(),
            LinkStatus::Error { message } => format!("Error: {message}"),
        }
    }
}

/// A bookmark whose URL failed its probe
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BrokenLink {
    pub bookmark: Bookmark,
    pub status: LinkStatus,
}

/// Count of bookmarks per content type
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TypeCount {
    pub kind: String,
    pub count: usize,
}

/// Summary of a collection
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Statistics {
    pub total: usize,
    pub duplicate_urls: usize,
    pub redundant: usize,
    pub untagged: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broken: Option<usize>,
    pub content_types: Vec<TypeCount>,
}

/// Integer percentage of `part` over `total`, 0 when `total` is 0
pub fn percentage(part: usize, total: usize) -> usize {
    if total == 0 {
        0
    } else {
        part * 100 / total
    }
}

/// Compute collection statistics
///
/// `broken` is the number of broken links when a probe was run.
pub fn statistics(bookmarks: &[Bookmark], broken: Option<usize>) -> Statistics {
    let clusters = find_duplicates(bookmarks);

    let mut types: BTreeMap<&str, usize> = BTreeMap::new();
    for bookmark in bookmarks {
        *types.entry(bookmark.kind.as_str()).or_insert(0) += 1;
    }
    let mut content_types: Vec<TypeCount> = types
        .into_iter()
        .map(|(kind, count)| TypeCount {
            kind: kind.to_string(),
            count,
        })
        .collect();
    content_types.sort_by(|a, b| b.count.cmp(&a.count));

    Statistics {
        total: bookmarks.len(),
        duplicate_urls: clusters.len(),
        redundant: redundant_count(&clusters),
        untagged: untagged(bookmarks).len(),
        broken,
        content_types,
    }
}
