use std::io::Write;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;

use crate::aggregator::{CardItem, CategoryMonthPivot, MerchantItem};
use crate::error::{CardPivotError, Result};
use crate::models::Transaction;
use crate::pipeline::PipelineResult;

pub const TRANSACTION_COLUMNS: &[&str] = &[
    "Date",
    "Month",
    "Source Card",
    "Description",
    "Merchant",
    "Category",
    "Original Category",
    "Amount",
];
pub const MERCHANT_COLUMNS: &[&str] = &["Category", "Merchant", "Count", "Total"];
pub const CARD_COLUMNS: &[&str] = &["Source Card", "Count", "Total"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
    All,
}

fn amount(value: Decimal) -> String {
    format!("{value:.2}")
}

fn pivot_header(pivot: &CategoryMonthPivot) -> Vec<String> {
    let mut header = vec!["Category".to_string()];
    header.extend(pivot.months.iter().cloned());
    header.push("Total".to_string());
    header
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

pub fn write_transactions_csv<W: Write>(out: W, txns: &[&Transaction]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(TRANSACTION_COLUMNS)?;
    for t in txns {
        wtr.write_record([
            t.date.to_string(),
            t.month(),
            t.source_card.clone(),
            t.description.clone(),
            t.merchant_name().to_string(),
            t.category_name().to_string(),
            t.raw_category.clone().unwrap_or_default(),
            amount(t.amount),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_pivot_csv<W: Write>(out: W, pivot: &CategoryMonthPivot) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(pivot_header(pivot))?;
    for row in &pivot.rows {
        let mut record = vec![row.category.clone()];
        record.extend(row.cells.iter().map(|c| amount(*c)));
        record.push(amount(row.total));
        wtr.write_record(&record)?;
    }
    let mut totals = vec!["Total".to_string()];
    totals.extend(pivot.month_totals.iter().map(|c| amount(*c)));
    totals.push(amount(pivot.grand_total));
    wtr.write_record(&totals)?;
    wtr.flush()?;
    Ok(())
}

pub fn write_merchants_csv<W: Write>(out: W, merchants: &[MerchantItem]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(MERCHANT_COLUMNS)?;
    for m in merchants {
        wtr.write_record([
            m.category.clone(),
            m.merchant.clone(),
            m.count.to_string(),
            amount(m.total),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_cards_csv<W: Write>(out: W, cards: &[CardItem]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(CARD_COLUMNS)?;
    for c in cards {
        wtr.write_record([c.source_card.clone(), c.count.to_string(), amount(c.total)])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `<stem>_transactions.csv`, `_pivot.csv`, `_merchants.csv` and
/// `_cards.csv` into `dir`.
pub fn export_csv(result: &PipelineResult, dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let open = |suffix: &str| -> Result<(PathBuf, std::fs::File)> {
        let path = dir.join(format!("{stem}_{suffix}.csv"));
        let file = std::fs::File::create(&path)?;
        Ok((path, file))
    };

    let (tx_path, file) = open("transactions")?;
    write_transactions_csv(file, &result.in_range())?;
    let (pivot_path, file) = open("pivot")?;
    write_pivot_csv(file, &result.aggregates.pivot)?;
    let (merchant_path, file) = open("merchants")?;
    write_merchants_csv(file, &result.aggregates.merchants)?;
    let (card_path, file) = open("cards")?;
    write_cards_csv(file, &result.aggregates.cards)?;

    Ok(vec![tx_path, pivot_path, merchant_path, card_path])
}

// ---------------------------------------------------------------------------
// XLSX
// ---------------------------------------------------------------------------

#[cfg(feature = "xlsx")]
pub fn export_xlsx(result: &PipelineResult, path: &Path) -> Result<PathBuf> {
    use rust_decimal::prelude::ToPrimitive;
    use rust_xlsxwriter::{Format, Workbook};

    fn num(value: Decimal) -> f64 {
        value.to_f64().unwrap_or_default()
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let bold = Format::new().set_bold();
    let money = Format::new().set_num_format("#,##0.00");
    let bold_money = Format::new().set_bold().set_num_format("#,##0.00");
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet().set_name("Transactions")?;
    for (col, name) in TRANSACTION_COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &bold)?;
    }
    for (i, t) in result.in_range().iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, t.date.to_string())?;
        sheet.write_string(row, 1, t.month())?;
        sheet.write_string(row, 2, &t.source_card)?;
        sheet.write_string(row, 3, &t.description)?;
        sheet.write_string(row, 4, t.merchant_name())?;
        sheet.write_string(row, 5, t.category_name())?;
        sheet.write_string(row, 6, t.raw_category.as_deref().unwrap_or_default())?;
        sheet.write_number_with_format(row, 7, num(t.amount), &money)?;
    }

    let pivot = &result.aggregates.pivot;
    let sheet = workbook.add_worksheet().set_name("Pivot")?;
    for (col, name) in pivot_header(pivot).iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, name, &bold)?;
    }
    let total_col = pivot.months.len() as u16 + 1;
    for (i, r) in pivot.rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &r.category)?;
        for (j, cell) in r.cells.iter().enumerate() {
            sheet.write_number_with_format(row, j as u16 + 1, num(*cell), &money)?;
        }
        sheet.write_number_with_format(row, total_col, num(r.total), &bold_money)?;
    }
    let total_row = pivot.rows.len() as u32 + 1;
    sheet.write_string_with_format(total_row, 0, "Total", &bold)?;
    for (j, cell) in pivot.month_totals.iter().enumerate() {
        sheet.write_number_with_format(total_row, j as u16 + 1, num(*cell), &bold_money)?;
    }
    sheet.write_number_with_format(total_row, total_col, num(pivot.grand_total), &bold_money)?;

    let sheet = workbook.add_worksheet().set_name("Merchants")?;
    for (col, name) in MERCHANT_COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &bold)?;
    }
    for (i, m) in result.aggregates.merchants.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &m.category)?;
        sheet.write_string(row, 1, &m.merchant)?;
        sheet.write_number(row, 2, m.count as f64)?;
        sheet.write_number_with_format(row, 3, num(m.total), &money)?;
    }

    let sheet = workbook.add_worksheet().set_name("Cards")?;
    for (col, name) in CARD_COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &bold)?;
    }
    for (i, c) in result.aggregates.cards.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &c.source_card)?;
        sheet.write_number(row, 1, c.count as f64)?;
        sheet.write_number_with_format(row, 2, num(c.total), &money)?;
    }

    workbook.save(path)?;
    Ok(path.to_path_buf())
}

/// Write the requested formats into `dir`, returning every file created.
pub fn export(
    result: &PipelineResult,
    dir: &Path,
    format: ExportFormat,
    stem: &str,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    if matches!(format, ExportFormat::Csv | ExportFormat::All) {
        written.extend(export_csv(result, dir, stem)?);
    }
    if matches!(format, ExportFormat::Xlsx | ExportFormat::All) {
        #[cfg(feature = "xlsx")]
        written.push(export_xlsx(result, &dir.join(format!("{stem}.xlsx")))?);
        #[cfg(not(feature = "xlsx"))]
        return Err(CardPivotError::Other(
            "spreadsheet export needs the `xlsx` feature".to_string(),
        ));
    }
    if written.is_empty() {
        return Err(CardPivotError::Other("nothing to export".to_string()));
    }
    Ok(written)
}
