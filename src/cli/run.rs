use cardpivot::aggregator::{AggregateView, CategoryMonthPivot};
use cardpivot::error::Result;
use cardpivot::fmt::{money, pct};
use cardpivot::pipeline::{FileReport, FileStatus, PipelineResult};
use cardpivot::settings::load_settings;
use colored::Colorize;
use comfy_table::{Cell, Table};

use super::BatchArgs;

pub fn run(batch: &BatchArgs, json: bool) -> Result<()> {
    let settings = load_settings();
    let result = batch.process(&settings)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    print_result(&result);
    Ok(())
}

fn print_result(result: &PipelineResult) {
    println!("Files\n{}", files_table(&result.files));

    let view = &result.aggregates;
    println!();
    println!("{}", format!("Spending, {}", view.range).bold());
    if view.is_empty() {
        println!("No transactions in range.");
        return;
    }
    println!("{}", summary_line(view));
    println!();
    println!("By category and month\n{}", pivot_table(&view.pivot));
    println!();
    println!("By category\n{}", categories_table(view));
    println!();
    println!("By card\n{}", cards_table(view));

    let uncategorized = result.categorization.uncategorized;
    if uncategorized > 0 {
        println!(
            "\n{} transactions uncategorized. Try `cardpivot rules test \"<description>\"`.",
            uncategorized.to_string().yellow()
        );
    }
}

fn summary_line(view: &AggregateView) -> String {
    let s = &view.summary;
    let span = match (s.first_date, s.last_date) {
        (Some(first), Some(last)) => format!(", {first} to {last}"),
        _ => String::new(),
    };
    format!(
        "{} transactions, total {}, average {}{span}",
        s.count,
        money(s.total).green().bold(),
        money(s.average)
    )
}

fn status_cell(file: &FileReport) -> Cell {
    match &file.status {
        FileStatus::Imported => Cell::new("imported".green()),
        FileStatus::Duplicate { .. } => Cell::new("duplicate".yellow()),
        FileStatus::Unrecognized { .. } => Cell::new("unrecognized".red()),
    }
}

fn files_table(files: &[FileReport]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["File", "Format", "Layout", "Imported", "Skipped", "Status"]);
    for file in files {
        table.add_row(vec![
            Cell::new(&file.name),
            Cell::new(file.format.map(|f| f.to_string()).unwrap_or_default()),
            Cell::new(file.normalizer.as_deref().unwrap_or("")),
            Cell::new(file.imported),
            Cell::new(file.skipped.len()),
            status_cell(file),
        ]);
    }
    table
}

fn pivot_table(pivot: &CategoryMonthPivot) -> Table {
    let mut table = Table::new();
    let mut header = vec!["Category".to_string()];
    header.extend(pivot.months.iter().cloned());
    header.push("Total".to_string());
    table.set_header(header);

    for row in &pivot.rows {
        let mut cells = vec![Cell::new(&row.category)];
        cells.extend(row.cells.iter().map(|v| Cell::new(money(*v))));
        cells.push(Cell::new(money(row.total)));
        table.add_row(cells);
    }

    let mut totals = vec![Cell::new("Total".bold())];
    totals.extend(pivot.month_totals.iter().map(|v| Cell::new(money(*v).bold())));
    totals.push(Cell::new(money(pivot.grand_total).bold()));
    table.add_row(totals);
    table
}

fn categories_table(view: &AggregateView) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Category", "Count", "Total", "Share"]);
    for share in &view.categories {
        table.add_row(vec![
            Cell::new(&share.category),
            Cell::new(share.count),
            Cell::new(money(share.total)),
            Cell::new(pct(share.pct)),
        ]);
    }
    table
}

fn cards_table(view: &AggregateView) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Source Card", "Count", "Total"]);
    for card in &view.cards {
        table.add_row(vec![
            Cell::new(&card.source_card),
            Cell::new(card.count),
            Cell::new(money(card.total)),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardpivot::categorizer::RuleTable;
    use cardpivot::models::{Bank, DateRange};
    use cardpivot::normalizer::NormalizeOptions;
    use cardpivot::pipeline::{Pipeline, StatementFile};

    fn sample() -> PipelineResult {
        let rules = RuleTable::builtin().unwrap();
        let amex = StatementFile::new(
            "amex.csv",
            b"Date,Description,Amount\n01/15/2024,AMAZON.COM*123ABC,-45.99\n02/03/2024,XYZ UNKNOWN CORP 99887,-10.00\n"
                .to_vec(),
            Some(Bank::Amex),
        );
        let junk = StatementFile::new("notes.txt", b"".to_vec(), None);
        Pipeline::new(&rules, NormalizeOptions::default()).run(&[amex, junk], &DateRange::all())
    }

    #[test]
    fn test_pivot_table_has_month_columns_and_total_row() {
        colored::control::set_override(false);
        let result = sample();
        let rendered = pivot_table(&result.aggregates.pivot).to_string();
        assert!(rendered.contains("2024-01"));
        assert!(rendered.contains("2024-02"));
        assert!(rendered.contains("Shopping"));
        assert!(rendered.contains("Uncategorized"));
        assert!(rendered.contains("$55.99"));
    }

    #[test]
    fn test_files_table_lists_every_file() {
        colored::control::set_override(false);
        let result = sample();
        let rendered = files_table(&result.files).to_string();
        assert!(rendered.contains("amex.csv"));
        assert!(rendered.contains("notes.txt"));
        assert!(rendered.contains("unrecognized"));
    }

    #[test]
    fn test_summary_line() {
        colored::control::set_override(false);
        let result = sample();
        let line = summary_line(&result.aggregates);
        assert_eq!(
            line,
            "2 transactions, total $55.99, average $28.00, 2024-01-15 to 2024-02-03"
        );
    }
}
