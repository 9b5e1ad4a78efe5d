use std::time::Duration;

use crate::prelude::{eprintln, println, *};
use colored::Colorize;
use raindrop_core::analytics::percentage;
use raindrop_core::pagination::Pacing;

use super::{HttpProber, LinkProber, StatisticsOutput};
use crate::bookmarks::Session;

#[derive(Debug, clap::Args, Clone)]
pub struct StatsOptions {
    /// Collection to analyze (0 = all, -1 = unsorted, -99 = trash)
    #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
    pub collection: i64,

    /// Also probe every link (slow)
    #[arg(long)]
    pub check_links: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(options: StatsOptions, global: crate::Global) -> Result<()> {
    let session = Session::connect(&global, crate::bookmarks::shutdown_signal())?;

    if global.verbose {
        eprintln!("Analyzing collection {}...", options.collection);
    }

    let output = if options.check_links {
        let prober = HttpProber::new(Duration::from_secs(global.timeout.max(1)))?;
        let pacing = Pacing::for_probes();
        let prober: &dyn LinkProber = &prober;
        super::statistics_data(&session, Some((prober, &pacing)), options.collection).await?
    } else {
        super::statistics_data(&session, None, options.collection).await?
    };

    crate::bookmarks::warn_if_partial(&output.fetch);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", format_statistics_text(&output));
    }

    Ok(())
}

fn format_statistics_text(output: &StatisticsOutput) -> String {
    let stats = &output.statistics;
    let mut result = String::new();

    result.push_str(&format!("\n{}\n", "=".repeat(80).bright_cyan()));
    result.push_str(&format!(
        "{}\n",
        format!("COLLECTION {} STATISTICS", output.scan.collection_id)
            .bright_cyan()
            .bold()
    ));
    result.push_str(&format!("{}\n\n", "=".repeat(80).bright_cyan()));

    let mut table = new_table();
    table.add_row(prettytable::row!["Total bookmarks", stats.total]);
    table.add_row(prettytable::row!["Duplicate URLs", stats.duplicate_urls]);
    table.add_row(prettytable::row!["Redundant bookmarks", stats.redundant]);
    table.add_row(prettytable::row![
        "Untagged",
        format!("{} ({}%)", stats.untagged, output.untagged_percentage)
    ]);
    if let Some(broken) = stats.broken {
        table.add_row(prettytable::row![
            "Broken links",
            format!("{} ({}%)", broken, percentage(broken, stats.total))
        ]);
    }
    result.push_str(&table.to_string());
    if output.probe_cancelled {
        result.push_str(&format!(
            "{}\n",
            "Link checking was cancelled, broken count is incomplete".yellow()
        ));
    }

    if !stats.content_types.is_empty() {
        result.push_str(&format!("\n{}\n", "Content types".green().bold()));
        let mut types = new_table();
        for entry in &stats.content_types {
            types.add_row(prettytable::row![
                entry.kind,
                entry.count,
                format!("{}%", percentage(entry.count, stats.total))
            ]);
        }
        result.push_str(&types.to_string());
    }

    result
}
