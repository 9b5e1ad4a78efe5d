use std::path::PathBuf;

use crate::prelude::{eprintln, println, *};
use colored::Colorize;
use raindrop_core::report::{format_duplicates_report, ReportFormat};

use super::DuplicatesOutput;
use crate::bookmarks::Session;

#[derive(Debug, clap::Args, Clone)]
pub struct DuplicatesOptions {
    /// Collection to scan (0 = all, -1 = unsorted, -99 = trash)
    #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
    pub collection: i64,

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

pub async fn run(options: DuplicatesOptions, global: crate::Global) -> Result<()> {
    let session = Session::connect(&global, crate::bookmarks::shutdown_signal())?;

    if global.verbose {
        eprintln!(
            "Scanning collection {} for duplicates...",
            options.collection
        );
    }

    let output = super::duplicates_data(&session, options.collection).await?;
    crate::bookmarks::warn_if_partial(&output.fetch);

    let generated = crate::report::now();
    let content = format_duplicates_report(
        options.format,
        options.collection,
        &output.fetch,
        &output.clusters,
        generated,
    )
    .map_err(|e| eyre!(e))?;

    if options.stdout {
        print!("{content}");
        return Ok(());
    }

    let path = crate::report::write_report(
        &options.output_dir,
        "duplicates",
        generated,
        options.format,
        &content,
    )?;

    print!("{}", format_duplicates_summary(&output));
    println!(
        "{}: {}",
        "Report saved to".green(),
        path.display().to_string().bright_white()
    );

    Ok(())
}

fn format_duplicates_summary(output: &DuplicatesOutput) -> String {
    let mut result = String::new();

    result.push_str(&format!(
        "{} {} {}\n",
        "Scanned".green(),
        output.scan.scanned.to_string().bright_cyan().bold(),
        "bookmarks".green()
    ));

    if output.clusters.is_empty() {
        result.push_str(&format!("{}\n", "No duplicates found.".green()));
        return result;
    }

    result.push_str(&format!(
        "{} {} {} {} {}\n",
        "Found".yellow(),
        output.duplicate_urls.to_string().bright_yellow().bold(),
        "duplicated URL(s),".yellow(),
        output.redundant.to_string().bright_yellow().bold(),
        "redundant bookmark(s)".yellow()
    ));

    for cluster in output.clusters.iter().take(10) {
        result.push_str(&format!(
            "  {} {}\n",
            format!("[{}x]", cluster.members.len()).yellow(),
            cluster.key.cyan()
        ));
    }
    if output.clusters.len() > 10 {
        result.push_str(&format!(
            "  {}\n",
            format!("... and {} more", output.clusters.len() - 10).bright_black()
        ));
    }

    result
}
