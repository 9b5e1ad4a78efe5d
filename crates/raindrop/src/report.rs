use std::path::{Path, PathBuf};

use crate::prelude::*;
use raindrop_core::report::{report_file_name, ReportFormat};

/// Write a rendered report to `dir/{stem}_{timestamp}.{ext}`, creating `dir`
pub fn write_report(
    dir: &Path,
    stem: &str,
    generated: chrono::NaiveDateTime,
    format: ReportFormat,
    content: &str,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .wrap_err_with(|| format!("Failed to create reports directory {}", dir.display()))?;

    let path = dir.join(report_file_name(stem, generated, format));
    std::fs::write(&path, content)
        .wrap_err_with(|| format!("Failed to write report {}", path.display()))?;

    log::info!("report written to {}", path.display());
    Ok(path)
}

/// Timestamp used for report headers and file names
pub fn now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_write_report_creates_directory() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("nested").join("reports");
        let generated = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();

        let path = write_report(&dir, "UAP", generated, ReportFormat::Text, "hello").unwrap();

        assert_eq!(path, dir.join("UAP_20250601_123000.txt"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }
}
