use std::path::PathBuf;

use cardpivot::error::Result;
use cardpivot::export::{export, ExportFormat};
use cardpivot::models::DateRange;
use cardpivot::settings::load_settings;
use colored::Colorize;

use super::{BatchArgs, FormatArg};

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Xlsx => ExportFormat::Xlsx,
            FormatArg::All => ExportFormat::All,
        }
    }
}

/// `cardpivot_2024-01-01_2024-12-31`, or `cardpivot_all` for every date.
fn file_stem(range: &DateRange) -> String {
    if range.is_unbounded() {
        "cardpivot_all".to_string()
    } else {
        format!("cardpivot_{}_{}", range.start, range.end)
    }
}

pub fn run(batch: &BatchArgs, output_dir: Option<PathBuf>, format: FormatArg) -> Result<()> {
    let settings = load_settings();
    let result = batch.process(&settings)?;

    let dir = output_dir.unwrap_or_else(|| settings.export_dir_path());
    std::fs::create_dir_all(&dir)?;

    let written = export(&result, &dir, format.into(), &file_stem(result.range()))?;
    println!(
        "Exported {} transactions to {} files:",
        result.aggregates.summary.count,
        written.len()
    );
    for path in &written {
        println!("  {}", path.display().to_string().green());
    }
    Ok(())
}
