use crate::prelude::{eprintln, println, *};
use raindrop_core::analytics::{rank_tags, TagCount};

use super::Session;

#[derive(Debug, clap::Args, Clone)]
pub struct TagsOptions {
    /// Collection to list tags for (0 = all)
    #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
    pub collection: i64,

    /// Hide tags used fewer times than this
    #[arg(long, default_value = "1")]
    pub min_count: u64,

    /// Count tags from the bookmarks themselves instead of the tag index
    #[arg(long)]
    pub scan: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(options: TagsOptions, global: crate::Global) -> Result<()> {
    let session = Session::connect(&global, super::shutdown_signal())?;

    let tags: Vec<TagCount> = if options.scan {
        if global.verbose {
            eprintln!("Scanning bookmarks of collection {}...", options.collection);
        }
        let output = crate::analytics::tag_statistics_data(&session, options.collection).await?;
        super::warn_if_partial(&output.fetch);
        output
            .tags
            .into_iter()
            .filter(|t| t.count >= options.min_count)
            .collect()
    } else {
        list_tags_data(&session, options.collection, options.min_count).await?
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&tags)?);
        return Ok(());
    }

    if tags.is_empty() {
        println!("No tags found.");
        return Ok(());
    }

    println!("Found {} tag(s):\n", tags.len());

    let mut table = new_table();
    table.add_row(prettytable::row!["Tag", "Bookmarks"]);
    for tag in &tags {
        table.add_row(prettytable::row![tag.tag, tag.count]);
    }
    table.printstd();

    Ok(())
}

/// Tags from the service index, most used first
pub async fn list_tags_data(
    session: &Session,
    collection_id: i64,
    min_count: u64,
) -> Result<Vec<TagCount>, ApiError> {
    let tags = session.gateway.list_tags(collection_id).await?;
    Ok(rank_tags(&tags, min_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmarks::fake::FakeGateway;
    use raindrop_core::pagination::Pacing;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_list_tags_ranked_and_filtered() {
        let session = Session::new(
            Arc::new(FakeGateway::default().with_tags(&[
                ("rust", 12),
                ("ai", 3),
                ("tools", 12),
                ("misc", 1),
            ])),
            Pacing::default(),
            CancellationToken::new(),
        );

        let tags = list_tags_data(&session, 0, 2).await.unwrap();
        let names: Vec<&str> = tags.iter().map(|t| t.tag.as_str()).collect();

        assert_eq!(names, vec!["rust", "tools", "ai"]);
    }
}
