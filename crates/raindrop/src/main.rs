use crate::prelude::*;
use clap::Parser;

mod analytics;
mod bookmarks;
mod mcp;
mod prelude;
mod report;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Search, inspect and audit Raindrop.io bookmarks from the terminal or through MCP"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Raindrop.io API token
    #[clap(long, env = "RAINDROP_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Raindrop.io REST API base URL
    #[clap(
        long,
        env = "RAINDROP_BASE_URL",
        global = true,
        default_value = bookmarks::DEFAULT_BASE_URL
    )]
    base_url: String,

    /// Maximum concurrent requests against the API
    #[clap(long, env = "RAINDROP_MAX_CONCURRENT", global = true, default_value = "10")]
    max_concurrent: usize,

    /// Pause between request batches, in milliseconds
    #[clap(long, env = "RAINDROP_BATCH_DELAY_MS", global = true, default_value = "6000")]
    batch_delay_ms: u64,

    /// Per-request timeout in seconds
    #[clap(long, env = "RAINDROP_TIMEOUT", global = true, default_value = "10")]
    timeout: u64,

    /// Whether to display additional information.
    #[clap(long, env = "RAINDROP_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Search bookmarks and save the results as a report
    Search(crate::bookmarks::search::SearchOptions),

    /// Show a single bookmark
    Get(crate::bookmarks::get::GetOptions),

    /// List collections as a tree
    Collections(crate::bookmarks::collections::CollectionsOptions),

    /// List tags with their usage counts
    Tags(crate::bookmarks::tags::TagsOptions),

    /// Find bookmarks saved more than once
    Duplicates(crate::analytics::duplicates::DuplicatesOptions),

    /// Probe every bookmarked URL and report the broken ones
    CheckLinks(crate::analytics::check_links::CheckLinksOptions),

    /// Library statistics
    Stats(crate::analytics::stats::StatsOptions),

    /// List bookmarks without tags
    Untagged(crate::analytics::untagged::UntaggedOptions),

    /// Model Context Protocol server
    MCP(crate::mcp::App),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Search(options) => crate::bookmarks::search::run(options, app.global).await,
        SubCommands::Get(options) => crate::bookmarks::get::run(options, app.global).await,
        SubCommands::Collections(options) => {
            crate::bookmarks::collections::run(options, app.global).await
        }
        SubCommands::Tags(options) => crate::bookmarks::tags::run(options, app.global).await,
        SubCommands::Duplicates(options) => {
            crate::analytics::duplicates::run(options, app.global).await
        }
        SubCommands::CheckLinks(options) => {
            crate::analytics::check_links::run(options, app.global).await
        }
        SubCommands::Stats(options) => crate::analytics::stats::run(options, app.global).await,
        SubCommands::Untagged(options) => {
            crate::analytics::untagged::run(options, app.global).await
        }
        SubCommands::MCP(sub_app) => crate::mcp::run(sub_app, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}

#[cfg(test)]
pub(crate) fn test_global() -> Global {
    Global {
        token: Some("test-token".to_string()),
        base_url: bookmarks::DEFAULT_BASE_URL.to_string(),
        max_concurrent: 10,
        batch_delay_ms: 6000,
        timeout: 10,
        verbose: false,
    }
}
