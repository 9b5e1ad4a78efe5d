//! Report rendering for search results and analytics scans
//!
//! Produces the content of report files in plain text, Markdown or JSON, plus
//! the file names they are saved under. Writing to disk is done by the binary.

use std::fmt::Write;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::analytics::{percentage, BrokenLink, DuplicateCluster};
use crate::bookmarks::{Bookmark, SearchQuery};
use crate::pagination::{AggregatedResult, FetchStatus};

const RULE_WIDTH: usize = 80;
const EXCERPT_LIMIT: usize = 200;
const FILE_STEM_LIMIT: usize = 50;
const COLLECTION_LEGEND: &str = "(0=all, -1=unsorted, -99=trash)";

/// Report file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Markdown,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Markdown => "md",
            ReportFormat::Json => "json",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "txt" | "text" => Ok(ReportFormat::Text),
            "md" | "markdown" => Ok(ReportFormat::Markdown),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!(
                "Invalid report format: {other}. Valid formats: txt, md, json"
            )),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Turn free-form query text into a file-name-safe stem
///
/// Keeps alphanumerics, spaces, `-` and `_`, trims, replaces spaces with `_`
/// and caps the length. Falls back to `fallback` when nothing is left.
pub fn sanitize_query(query: &str, fallback: &str) -> String {
    let kept: String = query
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();

    let stem: String = kept
        .trim()
        .replace(' ', "_")
        .chars()
        .take(FILE_STEM_LIMIT)
        .collect();

    if stem.is_empty() {
        fallback.to_string()
    } else {
        stem
    }
}

/// `{stem}_{YYYYmmdd_HHMMSS}.{ext}`
pub fn report_file_name(stem: &str, generated: NaiveDateTime, format: ReportFormat) -> String {
    format!(
        "{stem}_{}.{}",
        generated.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Text used to name a search report
pub fn query_text(query: &SearchQuery) -> String {
    let mut parts = Vec::new();
    if let Some(keyword) = query.keyword.as_deref() {
        parts.push(keyword.to_string());
    }
    parts.extend(query.tags.iter().cloned());
    parts.join(" ")
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let head: String = text.chars().take(limit).collect();
        format!("{head}...")
    }
}

fn rule(c: char) -> String {
    c.to_string().repeat(RULE_WIDTH)
}

fn status_line(result: &AggregatedResult) -> String {
    match result.status {
        FetchStatus::Complete => "complete".to_string(),
        FetchStatus::Partial => format!(
            "PARTIAL - {} of {} page(s) missing: {}{}",
            result.failed_pages.len(),
            result.pages_requested,
            result
                .failed_pages
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            if result.cancelled { " (cancelled)" } else { "" }
        ),
    }
}

fn timestamp(generated: NaiveDateTime) -> String {
    generated.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn iso_timestamp(generated: NaiveDateTime) -> String {
    generated.format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn saved_date(bookmark: &Bookmark) -> Option<String> {
    bookmark
        .created
        .map(|created| created.format("%Y-%m-%d").to_string())
}

// ============================================================================
// Search report
// ============================================================================

#[derive(Serialize)]
struct SearchReportJson<'a> {
    query: String,
    tags: &'a [String],
    collection_id: i64,
    generated: String,
    status: FetchStatus,
    failed_pages: &'a [u32],
    count: usize,
    results: &'a [Bookmark],
}

/// Render a search report
pub fn format_search_report(
    format: ReportFormat,
    query: &SearchQuery,
    result: &AggregatedResult,
    generated: NaiveDateTime,
) -> Result<String, String> {
    match format {
        ReportFormat::Text => Ok(format_search_text(query, result, generated)),
        ReportFormat::Markdown => Ok(format_search_markdown(query, result, generated)),
        ReportFormat::Json => serde_json::to_string_pretty(&SearchReportJson {
            query: query.keyword.clone().unwrap_or_default(),
            tags: &query.tags,
            collection_id: query.collection_id,
            generated: iso_timestamp(generated),
            status: result.status,
            failed_pages: &result.failed_pages,
            count: result.items.len(),
            results: &result.items,
        })
        .map_err(|e| format!("JSON serialization failed: {e}")),
    }
}

fn format_search_text(
    query: &SearchQuery,
    result: &AggregatedResult,
    generated: NaiveDateTime,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Raindrop.io Search Report");
    let _ = writeln!(output, "{}\n", rule('='));
    let _ = writeln!(
        output,
        "Query: '{}'",
        query.keyword.as_deref().unwrap_or_default()
    );
    if !query.tags.is_empty() {
        let _ = writeln!(output, "Tags: {}", query.tags.join(", "));
    }
    let _ = writeln!(
        output,
        "Collection: {} {COLLECTION_LEGEND}",
        query.collection_id
    );
    let _ = writeln!(output, "Generated: {}", timestamp(generated));
    let _ = writeln!(output, "Results: {} bookmarks", result.items.len());
    let _ = writeln!(output, "Status: {}\n", status_line(result));
    let _ = writeln!(output, "{}\n", rule('='));

    for (i, item) in result.items.iter().enumerate() {
        let _ = writeln!(output, "{}. {}", i + 1, item.display_title());
        let _ = writeln!(output, "   URL: {}", item.url);
        let _ = writeln!(output, "   ID: {}", item.id);
        if let Some(excerpt) = item.excerpt.as_deref() {
            let _ = writeln!(
                output,
                "   Description: {}",
                truncate(excerpt, EXCERPT_LIMIT)
            );
        }
        if !item.tags.is_empty() {
            let _ = writeln!(output, "   Tags: {}", item.tags.join(", "));
        }
        if let Some(domain) = item.domain.as_deref() {
            let _ = writeln!(output, "   Source: {domain}");
        }
        if let Some(created) = item.created {
            let _ = writeln!(output, "   Saved: {}", created.to_rfc3339());
        }
        output.push('\n');
    }

    let _ = writeln!(output, "{}", rule('='));
    let _ = writeln!(output, "End of Report - {} results", result.items.len());

    output
}

fn format_search_markdown(
    query: &SearchQuery,
    result: &AggregatedResult,
    generated: NaiveDateTime,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Raindrop.io Search Report\n");
    let _ = writeln!(
        output,
        "**Query:** `{}`  ",
        query.keyword.as_deref().unwrap_or_default()
    );
    if !query.tags.is_empty() {
        let _ = writeln!(output, "**Tags:** {}  ", query.tags.join(", "));
    }
    let _ = writeln!(
        output,
        "**Collection:** {} {COLLECTION_LEGEND}  ",
        query.collection_id
    );
    let _ = writeln!(output, "**Generated:** {}  ", timestamp(generated));
    let _ = writeln!(output, "**Results:** {} bookmarks  ", result.items.len());
    let _ = writeln!(output, "**Status:** {}\n", status_line(result));
    let _ = writeln!(output, "---\n");

    for (i, item) in result.items.iter().enumerate() {
        let _ = writeln!(
            output,
            "## {}. [{}]({})\n",
            i + 1,
            item.display_title(),
            item.url
        );
        let _ = writeln!(output, "**ID:** {}  ", item.id);
        if let Some(excerpt) = item.excerpt.as_deref() {
            let _ = writeln!(output, "\n{excerpt}\n");
        }
        if !item.tags.is_empty() {
            let badges: Vec<String> = item.tags.iter().map(|t| format!("`{t}`")).collect();
            let _ = writeln!(output, "**Tags:** {}  ", badges.join(" "));
        }
        if let Some(domain) = item.domain.as_deref() {
            let _ = writeln!(output, "**Source:** {domain}  ");
        }
        if let Some(created) = item.created {
            let _ = writeln!(output, "**Saved:** {}  ", created.to_rfc3339());
        }
        let _ = writeln!(output, "\n---\n");
    }

    let _ = writeln!(output, "\n**Total Results:** {}", result.items.len());

    output
}

// ============================================================================
// Duplicates report
// ============================================================================

#[derive(Serialize)]
struct DuplicatesReportJson<'a> {
    collection_id: i64,
    generated: String,
    status: FetchStatus,
    failed_pages: &'a [u32],
    scanned: usize,
    duplicate_urls: usize,
    redundant: usize,
    clusters: &'a [DuplicateCluster],
}

/// Render a duplicate bookmarks report
pub fn format_duplicates_report(
    format: ReportFormat,
    collection_id: i64,
    scanned: &AggregatedResult,
    clusters: &[DuplicateCluster],
    generated: NaiveDateTime,
) -> Result<String, String> {
    let redundant = crate::analytics::redundant_count(clusters);

    if format == ReportFormat::Json {
        return serde_json::to_string_pretty(&DuplicatesReportJson {
            collection_id,
            generated: iso_timestamp(generated),
            status: scanned.status,
            failed_pages: &scanned.failed_pages,
            scanned: scanned.items.len(),
            duplicate_urls: clusters.len(),
            redundant,
            clusters,
        })
        .map_err(|e| format!("JSON serialization failed: {e}"));
    }

    let markdown = format == ReportFormat::Markdown;
    let mut output = String::new();

    if markdown {
        let _ = writeln!(output, "# Duplicate Bookmarks Report\n");
    } else {
        let _ = writeln!(output, "Duplicate Bookmarks Report");
        let _ = writeln!(output, "{}\n", rule('='));
    }

    let suffix = if markdown { "  " } else { "" };
    let _ = writeln!(
        output,
        "Collection: {collection_id} {COLLECTION_LEGEND}{suffix}"
    );
    let _ = writeln!(output, "Generated: {}{suffix}", timestamp(generated));
    let _ = writeln!(
        output,
        "Total Bookmarks Scanned: {}{suffix}",
        scanned.items.len()
    );
    let _ = writeln!(output, "Status: {}{suffix}", status_line(scanned));
    let _ = writeln!(output, "Duplicate URLs: {}{suffix}", clusters.len());
    let _ = writeln!(output, "Redundant Bookmarks: {redundant}\n");

    if markdown {
        let _ = writeln!(output, "---\n");
    } else {
        let _ = writeln!(output, "{}\n", rule('='));
    }

    for cluster in clusters {
        if markdown {
            let _ = writeln!(output, "## `{}`\n", cluster.key);
            let _ = writeln!(output, "**Copies:** {}\n", cluster.members.len());
        } else {
            let _ = writeln!(output, "URL: {}", cluster.key);
            let _ = writeln!(output, "Copies: {}\n", cluster.members.len());
        }

        for (i, bookmark) in cluster.members.iter().enumerate() {
            if markdown {
                let _ = write!(
                    output,
                    "{}. [{}]({}) `{}`",
                    i + 1,
                    bookmark.display_title(),
                    bookmark.url,
                    bookmark.id
                );
                if let Some(created) = saved_date(bookmark) {
                    let _ = write!(output, " - created {created}");
                }
                output.push('\n');
            } else {
                let _ = writeln!(
                    output,
                    "  {}. [{}] {}",
                    i + 1,
                    bookmark.id,
                    bookmark.display_title()
                );
                let _ = writeln!(output, "     Link: {}", bookmark.url);
                if let Some(created) = saved_date(bookmark) {
                    let _ = writeln!(output, "     Created: {created}");
                }
                if !bookmark.tags.is_empty() {
                    let tags: Vec<&str> = bookmark.tags.iter().take(5).map(String::as_str).collect();
                    let _ = writeln!(output, "     Tags: {}", tags.join(", "));
                }
                output.push('\n');
            }
        }

        if markdown {
            output.push('\n');
        } else {
            let _ = writeln!(output, "{}\n", rule('-'));
        }
    }

    Ok(output)
}

// ============================================================================
// Broken links report
// ============================================================================

#[derive(Serialize)]
struct BrokenLinksReportJson<'a> {
    collection_id: i64,
    generated: String,
    status: FetchStatus,
    failed_pages: &'a [u32],
    checked: usize,
    broken_count: usize,
    success_rate: usize,
    broken: &'a [BrokenLink],
}

/// Render a broken links report
///
/// `checked` is the number of bookmarks actually probed.
pub fn format_broken_links_report(
    format: ReportFormat,
    collection_id: i64,
    scanned: &AggregatedResult,
    checked: usize,
    broken: &[BrokenLink],
    generated: NaiveDateTime,
) -> Result<String, String> {
    let success_rate = percentage(checked.saturating_sub(broken.len()), checked);

    if format == ReportFormat::Json {
        return serde_json::to_string_pretty(&BrokenLinksReportJson {
            collection_id,
            generated: iso_timestamp(generated),
            status: scanned.status,
            failed_pages: &scanned.failed_pages,
            checked,
            broken_count: broken.len(),
            success_rate,
            broken,
        })
        .map_err(|e| format!("JSON serialization failed: {e}"));
    }

    let markdown = format == ReportFormat::Markdown;
    let suffix = if markdown { "  " } else { "" };
    let mut output = String::new();

    if markdown {
        let _ = writeln!(output, "# Broken Links Report\n");
    } else {
        let _ = writeln!(output, "Broken Links Report");
        let _ = writeln!(output, "{}\n", rule('='));
    }

    let _ = writeln!(
        output,
        "Collection: {collection_id} {COLLECTION_LEGEND}{suffix}"
    );
    let _ = writeln!(output, "Generated: {}{suffix}", timestamp(generated));
    let _ = writeln!(output, "Total Bookmarks Checked: {checked}{suffix}");
    let _ = writeln!(output, "Status: {}{suffix}", status_line(scanned));
    let _ = writeln!(output, "Broken Links: {}{suffix}", broken.len());
    let _ = writeln!(output, "Success Rate: {success_rate}%\n");

    if markdown {
        let _ = writeln!(output, "---\n");
        let _ = writeln!(output, "| # | ID | Title | URL | Status |");
        let _ = writeln!(output, "|---|----|-------|-----|--------|");
        for (i, link) in broken.iter().enumerate() {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} |",
                i + 1,
                link.bookmark.id,
                link.bookmark.display_title().replace('|', "\\|"),
                link.bookmark.url,
                link.status.label()
            );
        }
        return Ok(output);
    }

    let _ = writeln!(output, "{}\n", rule('='));
    for (i, link) in broken.iter().enumerate() {
        let _ = writeln!(
            output,
            "{}. [{}] {}",
            i + 1,
            link.bookmark.id,
            link.bookmark.display_title()
        );
        let _ = writeln!(output, "   URL: {}", link.bookmark.url);
        let _ = writeln!(output, "   Status: {}", link.status.label());
        if !link.bookmark.tags.is_empty() {
            let tags: Vec<&str> = link.bookmark.tags.iter().take(5).map(String::as_str).collect();
            let _ = writeln!(output, "   Tags: {}", tags.join(", "));
        }
        output.push('\n');
    }

    Ok(output)
}
