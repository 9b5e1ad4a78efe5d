use crate::prelude::{eprintln, println, *};
use colored::Colorize;
use raindrop_core::bookmarks::{collection_label, extract_bookmark_id, Bookmark};

use super::Session;

#[derive(Debug, clap::Args, Clone)]
pub struct GetOptions {
    /// Bookmark ID or Raindrop.io app URL
    #[arg(value_name = "ID_OR_URL")]
    pub bookmark: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(options: GetOptions, global: crate::Global) -> Result<()> {
    let session = Session::connect(&global, super::shutdown_signal())?;

    if global.verbose {
        eprintln!("Fetching bookmark {}...", options.bookmark);
    }

    let id = extract_bookmark_id(&options.bookmark).map_err(|e| eyre!(e))?;
    let bookmark = get_bookmark_data(&session, id).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&bookmark)?);
    } else {
        print!("{}", format_bookmark_text(&bookmark));
    }

    Ok(())
}

pub async fn get_bookmark_data(session: &Session, id: i64) -> Result<Bookmark, ApiError> {
    session.gateway.get_bookmark(id).await
}

fn format_bookmark_text(bookmark: &Bookmark) -> String {
    let mut result = String::new();

    result.push_str(&format!("\n{}\n", "=".repeat(80).bright_cyan()));
    result.push_str(&format!("{}\n", bookmark.display_title().bright_cyan().bold()));
    result.push_str(&format!("{}\n", "=".repeat(80).bright_cyan()));

    result.push_str(&format!(
        "{}: {}\n",
        "URL".green(),
        bookmark.url.cyan().underline()
    ));
    result.push_str(&format!(
        "{}: {} | {}: {}\n",
        "ID".green(),
        bookmark.id.to_string().bright_white(),
        "Collection".green(),
        collection_label(bookmark.collection_id).bright_white()
    ));
    result.push_str(&format!(
        "{}: {}{}\n",
        "Type".green(),
        bookmark.kind.bright_white(),
        if bookmark.favorite {
            format!(" {}", "★ favorite".yellow())
        } else {
            String::new()
        }
    ));

    if !bookmark.tags.is_empty() {
        result.push_str(&format!(
            "{}: {}\n",
            "Tags".green(),
            bookmark.tags.join(", ").bright_magenta()
        ));
    }
    if let Some(domain) = bookmark.domain.as_deref() {
        result.push_str(&format!("{}: {}\n", "Source".green(), domain.bright_white()));
    }
    if let Some(created) = bookmark.created {
        result.push_str(&format!(
            "{}: {}\n",
            "Created".green(),
            created.format("%Y-%m-%d %H:%M").to_string().bright_black()
        ));
    }
    if let Some(updated) = bookmark.updated {
        result.push_str(&format!(
            "{}: {}\n",
            "Updated".green(),
            updated.format("%Y-%m-%d %H:%M").to_string().bright_black()
        ));
    }
    if let Some(excerpt) = bookmark.excerpt.as_deref() {
        result.push_str(&format!("\n{excerpt}\n"));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmarks::fake::{bookmark, FakeGateway};
    use raindrop_core::pagination::Pacing;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn session() -> Session {
        Session::new(
            Arc::new(FakeGateway::with_library(vec![bookmark(
                42,
                "https://example.com/answer",
                &["meaning", "life"],
            )])),
            Pacing::default(),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_get_bookmark_data() {
        let bookmark = get_bookmark_data(&session(), 42).await.unwrap();
        assert_eq!(bookmark.url, "https://example.com/answer");
    }

    #[tokio::test]
    async fn test_get_missing_bookmark_is_http_error() {
        let err = get_bookmark_data(&session(), 7).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Http);
    }

    #[test]
    fn test_format_bookmark_text() {
        let mut item = bookmark(42, "https://example.com/answer", &["meaning", "life"]);
        item.excerpt = Some("Forty two".to_string());
        item.favorite = true;

        let text = format_bookmark_text(&item);

        assert!(text.contains("Bookmark 42"));
        assert!(text.contains("https://example.com/answer"));
        assert!(text.contains("meaning, life"));
        assert!(text.contains("favorite"));
        assert!(text.contains("Forty two"));
    }
}
