use std::path::PathBuf;

use crate::prelude::{eprintln, *};
use colored::Colorize;
use raindrop_core::bookmarks::SearchQuery;
use raindrop_core::pagination::AggregatedResult;
use raindrop_core::report::{format_search_report, query_text, sanitize_query, ReportFormat};

use super::Session;

#[derive(Debug, clap::Args, Clone)]
pub struct SearchOptions {
    /// Search keywords
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Only bookmarks carrying this tag (repeatable)
    #[arg(short = 't', long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Collection to search (0 = all, -1 = unsorted, -99 = trash)
    #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
    pub collection: i64,

    /// Fetch only the first page of results
    #[arg(long)]
    pub first_page_only: bool,

    /// Fetch only this zero-based page
    #[arg(long, conflicts_with = "max_pages")]
    pub page: Option<u32>,

    /// Stop after this many pages
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Sort order (-created, created, score, title, -title, domain, -domain)
    #[arg(long, default_value = "-created", allow_hyphen_values = true)]
    pub sort: String,

    /// Report format: txt, md, json
    #[arg(short, long, default_value = "txt")]
    pub format: ReportFormat,

    /// Directory reports are written to
    #[arg(long, env = "RAINDROP_REPORTS_DIR", default_value = "reports")]
    pub output_dir: PathBuf,

    /// Print the report instead of saving it
    #[arg(long)]
    pub stdout: bool,
}

impl SearchOptions {
    pub fn to_query(&self) -> SearchQuery {
        SearchQuery {
            tags: self.tags.clone(),
            collection_id: self.collection,
            max_pages: self.max_pages,
            first_page_only: self.first_page_only || self.page.is_some(),
            start_page: self.page.unwrap_or(0),
            sort: self.sort.clone(),
            ..SearchQuery::keyword(self.query.clone())
        }
    }
}

pub async fn run(options: SearchOptions, global: crate::Global) -> Result<()> {
    let session = Session::connect(&global, super::shutdown_signal())?;
    let query = options.to_query();

    if global.verbose {
        eprintln!("Searching {}...", query.describe());
    }

    let result = search_data(&session, &query).await?;
    let generated = crate::report::now();
    let content = format_search_report(options.format, &query, &result, generated)
        .map_err(|e| eyre!(e))?;

    super::warn_if_partial(&result);

    if options.stdout {
        print!("{content}");
        return Ok(());
    }

    let stem = sanitize_query(&query_text(&query), "search");
    let path = crate::report::write_report(
        &options.output_dir,
        &stem,
        generated,
        options.format,
        &content,
    )?;

    print!("{}", format_search_summary(&query, &result, &path));
    Ok(())
}

/// Runs a search and returns every fetched bookmark in page order
pub async fn search_data(
    session: &Session,
    query: &SearchQuery,
) -> Result<AggregatedResult, ApiError> {
    session.fetch(query).await
}

fn format_search_summary(
    query: &SearchQuery,
    result: &AggregatedResult,
    path: &std::path::Path,
) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{} {} {}\n",
        "Found".green(),
        result.items.len().to_string().bright_cyan().bold(),
        format!("bookmarks for {}", query.describe()).green()
    ));
    if result.total_reported as usize != result.items.len() {
        output.push_str(&format!(
            "  {}\n",
            format!("(Raindrop.io reports {} matches)", result.total_reported).bright_black()
        ));
    }

    for (idx, item) in result.items.iter().take(5).enumerate() {
        output.push_str(&format!(
            "  {} {}\n",
            format!("{}.", idx + 1).yellow(),
            item.display_title().white().bold()
        ));
        output.push_str(&format!("     {}\n", item.url.cyan().underline()));
    }
    if result.items.len() > 5 {
        output.push_str(&format!(
            "  {}\n",
            format!("... and {} more", result.items.len() - 5).bright_black()
        ));
    }

    output.push_str(&format!(
        "{}: {}\n",
        "Report saved to".green(),
        path.display().to_string().bright_white()
    ));

    output
}
