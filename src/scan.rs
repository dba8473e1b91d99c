use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};

use crate::error::Result;

/// CSV names worth picking up; OFX/QFX files always are.
const CSV_NAME_HINTS: &[&str] = &[
    "amex",
    "american express",
    "american_express",
    "chase",
    "discover",
    "capital one",
    "capital_one",
    "capitalone",
    "statement",
    "transaction",
    "activity",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundStatement {
    pub path: PathBuf,
    pub modified: DateTime<Local>,
}

fn looks_like_statement(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let name = name.to_lowercase();
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()) {
        Some(ext) if ext == "ofx" || ext == "qfx" => true,
        Some(ext) if ext == "csv" => CSV_NAME_HINTS.iter().any(|h| name.contains(h)),
        _ => false,
    }
}

/// Statement downloads in `dir` modified within the last `days_back` days,
/// newest first.
pub fn find_recent_statements(dir: &Path, days_back: u32) -> Result<Vec<FoundStatement>> {
    let window = Duration::from_secs(u64::from(days_back) * 24 * 60 * 60);
    let cutoff = SystemTime::now()
        .checked_sub(window)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !looks_like_statement(&path) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if modified >= cutoff {
            found.push(FoundStatement {
                path,
                modified: DateTime::<Local>::from(modified),
            });
        }
    }
    found.sort_by(|a, b| b.modified.cmp(&a.modified).then(a.path.cmp(&b.path)));
    tracing::debug!("found {} recent statements in {}", found.len(), dir.display());
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "Date,Description,Amount\n").unwrap();
        path
    }

    #[test]
    fn test_name_filter() {
        assert!(looks_like_statement(Path::new("/d/Chase1234_Activity.CSV")));
        assert!(looks_like_statement(Path::new("/d/export.qfx")));
        assert!(looks_like_statement(Path::new("/d/download.OFX")));
        assert!(looks_like_statement(Path::new("/d/Statement_2024.csv")));
        assert!(!looks_like_statement(Path::new("/d/recipes.csv")));
        assert!(!looks_like_statement(Path::new("/d/amex.pdf")));
    }

    #[test]
    fn test_finds_recent_statements_only() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "amex_activity.csv");
        touch(dir.path(), "download.qfx");
        touch(dir.path(), "groceries.csv");
        let old = touch(dir.path(), "discover_2019.csv");
        let long_ago = SystemTime::now() - Duration::from_secs(90 * 24 * 60 * 60);
        std::fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(long_ago)
            .unwrap();
        std::fs::create_dir(dir.path().join("statements.csv")).unwrap();

        let found = find_recent_statements(dir.path(), 30).unwrap();
        let mut names: Vec<String> = found
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["amex_activity.csv", "download.qfx"]);

        let wider = find_recent_statements(dir.path(), 365).unwrap();
        assert_eq!(wider.len(), 3);
        assert_eq!(wider.last().unwrap().path, old);
    }

    #[test]
    fn test_missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_recent_statements(&dir.path().join("nope"), 30).is_err());
    }
}
