use crate::prelude::{eprintln, println, *};

use crate::bookmarks::Session;

#[derive(Debug, clap::Args, Clone)]
pub struct UntaggedOptions {
    /// Collection to scan (0 = all, -1 = unsorted, -99 = trash)
    #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
    pub collection: i64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(options: UntaggedOptions, global: crate::Global) -> Result<()> {
    let session = Session::connect(&global, crate::bookmarks::shutdown_signal())?;

    if global.verbose {
        eprintln!(
            "Looking for untagged bookmarks in collection {}...",
            options.collection
        );
    }

    let output = super::untagged_data(&session, options.collection).await?;
    crate::bookmarks::warn_if_partial(&output.fetch);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{} of {} bookmark(s) have no tags ({}%)\n",
        output.count, output.scan.scanned, output.percentage
    );

    if output.bookmarks.is_empty() {
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row!["ID", "Title", "URL"]);
    for bookmark in &output.bookmarks {
        table.add_row(prettytable::row![
            bookmark.id,
            bookmark.display_title(),
            bookmark.url
        ]);
    }
    table.printstd();

    Ok(())
}
