//! Cache status reporting for the CLI.
//!
//! Walks the two derivative subtrees and tallies entry counts and byte
//! sizes. Formatting is split from I/O: `format_report` is pure and returns
//! lines, `print_report` writes them to stdout.
//!
//! ```text
//! Cache: storage/guided
//!     resized: 12 entries, 3.4 MB
//!     thumbs: 5 entries, 120.1 KB
//!     total: 17 entries, 3.5 MB
//! ```

use serde::Serialize;
use std::path::Path;
use walkdir::WalkDir;

/// Entry count and byte total for one cache subtree.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SubtreeStats {
    pub entries: usize,
    pub bytes: u64,
}

/// Snapshot of the derivative cache on disk.
#[derive(Debug, Serialize)]
pub struct CacheReport {
    pub cache_root: String,
    pub resized: SubtreeStats,
    pub thumbs: SubtreeStats,
}

impl CacheReport {
    pub fn total_entries(&self) -> usize {
        self.resized.entries + self.thumbs.entries
    }

    pub fn total_bytes(&self) -> u64 {
        self.resized.bytes + self.thumbs.bytes
    }
}

/// Tally one subtree. A missing directory reads as empty.
fn survey_subtree(path: &Path) -> SubtreeStats {
    let mut stats = SubtreeStats::default();
    for entry in WalkDir::new(path).into_iter().filter_map(Result::ok) {
        if entry.file_type().is_file() {
            stats.entries += 1;
            stats.bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
        }
    }
    stats
}

/// Survey the cache under `cache_root`.
pub fn survey(cache_root: &Path, resized_dir: &str, thumbs_dir: &str) -> CacheReport {
    CacheReport {
        cache_root: cache_root.display().to_string(),
        resized: survey_subtree(&cache_root.join(resized_dir)),
        thumbs: survey_subtree(&cache_root.join(thumbs_dir)),
    }
}

/// Format a byte count with 1000-based units (KB, MB, GB).
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1000.0 && unit < UNITS.len() - 1 {
        size /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

/// Format the report as display lines.
pub fn format_report(report: &CacheReport) -> Vec<String> {
    vec![
        format!("Cache: {}", report.cache_root),
        format!(
            "    resized: {} entries, {}",
            report.resized.entries,
            human_size(report.resized.bytes)
        ),
        format!(
            "    thumbs: {} entries, {}",
            report.thumbs.entries,
            human_size(report.thumbs.bytes)
        ),
        format!(
            "    total: {} entries, {}",
            report.total_entries(),
            human_size(report.total_bytes())
        ),
    ]
}

/// Print the report to stdout.
pub fn print_report(report: &CacheReport) {
    for line in format_report(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn survey_counts_files_and_bytes() {
        let tmp = TempDir::new().unwrap();
        let resized = tmp.path().join("resized");
        fs::create_dir_all(&resized).unwrap();
        fs::write(resized.join("a"), vec![0u8; 100]).unwrap();
        fs::write(resized.join("b"), vec![0u8; 50]).unwrap();

        let report = survey(tmp.path(), "resized", "thumbs");
        assert_eq!(report.resized.entries, 2);
        assert_eq!(report.resized.bytes, 150);
        assert_eq!(report.thumbs.entries, 0);
        assert_eq!(report.total_entries(), 2);
        assert_eq!(report.total_bytes(), 150);
    }

    #[test]
    fn survey_descends_into_nested_directories() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("thumbs").join("deep");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("entry"), b"x").unwrap();

        let report = survey(tmp.path(), "resized", "thumbs");
        assert_eq!(report.thumbs.entries, 1);
    }

    #[test]
    fn missing_cache_reads_as_empty() {
        let tmp = TempDir::new().unwrap();
        let report = survey(tmp.path(), "resized", "thumbs");
        assert_eq!(report.total_entries(), 0);
        assert_eq!(report.total_bytes(), 0);
    }

    #[test]
    fn human_size_units() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(999), "999 B");
        assert_eq!(human_size(1_500), "1.5 KB");
        assert_eq!(human_size(3_400_000), "3.4 MB");
        assert_eq!(human_size(2_000_000_000), "2.0 GB");
    }

    #[test]
    fn format_report_layout() {
        let report = CacheReport {
            cache_root: "storage/guided".to_string(),
            resized: SubtreeStats {
                entries: 2,
                bytes: 150,
            },
            thumbs: SubtreeStats {
                entries: 1,
                bytes: 50,
            },
        };
        let lines = format_report(&report);
        assert_eq!(lines[0], "Cache: storage/guided");
        assert_eq!(lines[1], "    resized: 2 entries, 150 B");
        assert_eq!(lines[2], "    thumbs: 1 entries, 50 B");
        assert_eq!(lines[3], "    total: 3 entries, 200 B");
    }

    #[test]
    fn report_serializes_for_json_output() {
        let report = CacheReport {
            cache_root: "x".to_string(),
            resized: SubtreeStats::default(),
            thumbs: SubtreeStats::default(),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["cache_root"], "x");
        assert_eq!(value["resized"]["entries"], 0);
    }
}
