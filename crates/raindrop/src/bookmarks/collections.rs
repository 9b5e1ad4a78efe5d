use crate::prelude::{println, *};
use raindrop_core::bookmarks::{collection_tree, CollectionNode};

use super::Session;

#[derive(Debug, clap::Args, Clone)]
pub struct CollectionsOptions {
    /// Only list root collections
    #[arg(long)]
    pub roots_only: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(options: CollectionsOptions, global: crate::Global) -> Result<()> {
    let session = Session::connect(&global, super::shutdown_signal())?;

    let tree = list_collections_data(&session, !options.roots_only).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
        return Ok(());
    }

    if tree.is_empty() {
        println!("No collections found.");
        return Ok(());
    }

    println!("Found {} collection(s):\n", tree.len());

    let mut table = new_table();
    table.add_row(prettytable::row!["ID", "Title", "Bookmarks"]);
    for node in &tree {
        table.add_row(prettytable::row![
            node.collection.id,
            indented_title(node),
            node.collection.count
        ]);
    }
    table.printstd();

    Ok(())
}

/// Collections in tree order with their depth
pub async fn list_collections_data(
    session: &Session,
    include_children: bool,
) -> Result<Vec<CollectionNode>, ApiError> {
    let collections = session.gateway.list_collections(include_children).await?;
    Ok(collection_tree(&collections))
}

fn indented_title(node: &CollectionNode) -> String {
    format!("{}{}", "  ".repeat(node.depth), node.collection.title)
}
