use std::path::PathBuf;
use std::time::Duration;

use crate::prelude::{eprintln, println, *};
use colored::Colorize;
use raindrop_core::pagination::Pacing;
use raindrop_core::report::{format_broken_links_report, ReportFormat};

use super::{BrokenLinksOutput, HttpProber};
use crate::bookmarks::Session;

#[derive(Debug, clap::Args, Clone)]
pub struct CheckLinksOptions {
    /// Collection to scan (0 = all, -1 = unsorted, -99 = trash)
    #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
    pub collection: i64,

    /// Per-link timeout in seconds
    #[arg(long, default_value = "10")]
    pub timeout: u64,

    /// Links probed at the same time
    #[arg(long, default_value = "20")]
    pub concurrency: usize,

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

pub async fn run(options: CheckLinksOptions, global: crate::Global) -> Result<()> {
    let session = Session::connect(&global, crate::bookmarks::shutdown_signal())?;
    let prober = HttpProber::new(Duration::from_secs(options.timeout.max(1)))?;
    let probe_pacing = Pacing::for_probes().with_concurrency(options.concurrency);

    if global.verbose {
        eprintln!(
            "Checking links in collection {} ({} at a time, {}s timeout)...",
            options.collection,
            probe_pacing.cap(),
            options.timeout
        );
    }

    let output =
        super::broken_links_data(&session, &prober, &probe_pacing, options.collection).await?;
    crate::bookmarks::warn_if_partial(&output.fetch);

    let generated = crate::report::now();
    let content = format_broken_links_report(
        options.format,
        options.collection,
        &output.fetch,
        output.checked,
        &output.broken,
        generated,
    )
    .map_err(|e| eyre!(e))?;

    if options.stdout {
        print!("{content}");
        return Ok(());
    }

    let path = crate::report::write_report(
        &options.output_dir,
        "broken_links",
        generated,
        options.format,
        &content,
    )?;

    print!("{}", format_broken_links_summary(&output));
    println!(
        "{}: {}",
        "Report saved to".green(),
        path.display().to_string().bright_white()
    );

    Ok(())
}

fn format_broken_links_summary(output: &BrokenLinksOutput) -> String {
    let mut result = String::new();

    result.push_str(&format!(
        "{} {} {} {}\n",
        "Checked".green(),
        output.checked.to_string().bright_cyan().bold(),
        "links, success rate".green(),
        format!("{}%", output.success_rate).bright_cyan().bold()
    ));
    if output.probe_cancelled {
        result.push_str(&format!(
            "{}\n",
            format!(
                "Cancelled after {} of {} links",
                output.checked, output.scan.scanned
            )
            .yellow()
        ));
    }

    if output.broken.is_empty() {
        result.push_str(&format!("{}\n", "No broken links found.".green()));
        return result;
    }

    result.push_str(&format!(
        "{} {}\n",
        output.broken_count.to_string().bright_red().bold(),
        "broken link(s):".red()
    ));
    for link in &output.broken {
        result.push_str(&format!(
            "  {} {} {}\n",
            format!("[{}]", link.status.label()).red(),
            link.bookmark.display_title().white().bold(),
            link.bookmark.url.cyan()
        ));
    }

    result
}
