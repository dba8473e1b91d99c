use std::path::PathBuf;

use cardpivot::error::Result;
use cardpivot::scan::find_recent_statements;
use cardpivot::settings::load_settings;
use comfy_table::{Cell, Table};

pub fn run(dir: Option<PathBuf>, days: Option<u32>) -> Result<()> {
    let settings = load_settings();
    let dir = dir.unwrap_or_else(|| settings.scan_dir_path());
    let days = days.unwrap_or(settings.scan_days);

    let found = find_recent_statements(&dir, days)?;
    if found.is_empty() {
        println!("No statements from the last {days} days in {}", dir.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["File", "Modified"]);
    for statement in &found {
        table.add_row(vec![
            Cell::new(statement.path.display()),
            Cell::new(statement.modified.format("%Y-%m-%d %H:%M")),
        ]);
    }
    println!("Recent statements in {}\n{table}", dir.display());
    Ok(())
}
