use encoding_rs::{UTF_16BE, UTF_16LE, WINDOWS_1252};

use crate::error::{CardPivotError, Result};
use crate::models::{Bank, FileFormat, RawRow, RawTable, RowIssue};
use crate::normalizer::{parse_amount, parse_date};
use crate::ofx;

const DELIMITERS: &[u8] = b",;\t|";
const SNIFF_LINES: usize = 20;
const HEADER_SEARCH_RECORDS: usize = 20;

const DATE_HEADER_HINTS: &[&str] = &["date", "time", "when", "day"];
const AMOUNT_HEADER_HINTS: &[&str] = &[
    "amount", "sum", "value", "price", "cost", "debit", "credit", "payment",
];

/// A parsed statement plus the bank its content points at.
#[derive(Debug, Clone)]
pub struct Detected {
    pub table: RawTable,
    pub bank: Option<Bank>,
}

/// Decode, sniff and split one statement file.
pub fn detect(name: &str, bytes: &[u8]) -> Result<Detected> {
    let text = decode_text(bytes);
    let format = sniff_format(name, &text)?;
    let table = match format {
        FileFormat::Csv => read_csv(&text)?,
        FileFormat::Ofx | FileFormat::Qfx => ofx::read_ofx(&text, format),
    };
    let bank = detect_bank(&text, &table);
    Ok(Detected { table, bank })
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Bytes to text. Honors UTF-8 and UTF-16 BOMs; anything that is not valid
/// UTF-8 is read as Windows-1252, which is what older bank exports use.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        let (decoded, _, _) = UTF_16LE.decode(bytes);
        return decoded.into_owned();
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let (decoded, _, _) = UTF_16BE.decode(bytes);
        return decoded.into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

// ---------------------------------------------------------------------------
// Format sniffing
// ---------------------------------------------------------------------------

pub fn sniff_format(name: &str, text: &str) -> Result<FileFormat> {
    if text.trim().is_empty() {
        return Err(CardPivotError::UnrecognizedFormat("file is empty".to_string()));
    }
    if text.contains('\0') {
        return Err(CardPivotError::UnrecognizedFormat("binary content".to_string()));
    }
    if ofx::is_ofx(text) {
        let qfx = ofx::is_qfx(text) || name.to_lowercase().ends_with(".qfx");
        return Ok(if qfx { FileFormat::Qfx } else { FileFormat::Ofx });
    }
    let head = text.trim_start().get(..64).unwrap_or(text.trim_start()).to_lowercase();
    if head.starts_with("<!doctype") || head.starts_with("<html") || head.starts_with("<?xml") {
        return Err(CardPivotError::UnrecognizedFormat(
            "markup that is not an OFX statement".to_string(),
        ));
    }
    if sniff_delimiter(text).is_none() {
        return Err(CardPivotError::UnrecognizedFormat(
            "no delimited columns found".to_string(),
        ));
    }
    Ok(FileFormat::Csv)
}

/// The delimiter that splits the most of the leading lines into columns.
pub fn sniff_delimiter(text: &str) -> Option<u8> {
    let lines: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();
    DELIMITERS
        .iter()
        .map(|&d| {
            let hits = lines.iter().filter(|l| l.as_bytes().contains(&d)).count();
            (d, hits)
        })
        .filter(|(_, hits)| *hits > 0)
        // max_by_key keeps the last maximum; iterate reversed so ',' wins ties
        .rev()
        .max_by_key(|(_, hits)| *hits)
        .map(|(d, _)| d)
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn is_header_record(fields: &[String]) -> bool {
    let lower: Vec<String> = fields.iter().map(|f| f.trim().to_lowercase()).collect();
    let has_date = lower
        .iter()
        .any(|f| DATE_HEADER_HINTS.iter().any(|h| f.contains(h)));
    let has_amount = lower
        .iter()
        .any(|f| AMOUNT_HEADER_HINTS.iter().any(|h| f.contains(h)));
    let has_values = fields
        .iter()
        .any(|f| parse_date(f).is_some() || parse_amount(f).is_some());
    has_date && has_amount && !has_values
}

/// Split CSV text into rows, skipping any preamble before the header row.
pub fn read_csv(text: &str) -> Result<RawTable> {
    let delimiter = sniff_delimiter(text).unwrap_or(b',');
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut records: Vec<RawRow> = Vec::new();
    let mut unreadable: Vec<RowIssue> = Vec::new();
    for result in rdr.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("unreadable CSV record: {e}");
                unreadable.push(RowIssue {
                    line: e.position().map(|p| p.line()).unwrap_or(0),
                    reason: format!("unreadable CSV record: {e}"),
                });
                continue;
            }
        };
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        records.push(RawRow {
            line,
            values: record.iter().map(|f| f.trim().to_string()).collect(),
        });
    }

    let header_idx = records
        .iter()
        .take(HEADER_SEARCH_RECORDS)
        .position(|r| is_header_record(&r.values));

    let (headers, rows) = match header_idx {
        Some(idx) => {
            let mut rest = records.split_off(idx);
            let header = rest.remove(0);
            // preamble noise above the header is not a statement row
            unreadable.retain(|issue| issue.line > header.line);
            (header.values, rest)
        }
        None => (Vec::new(), records),
    };

    Ok(RawTable {
        format: FileFormat::Csv,
        headers,
        rows,
        account_id: None,
        unreadable,
    })
}

// ---------------------------------------------------------------------------
// Bank detection
// ---------------------------------------------------------------------------

const BRAND_KEYWORDS: &[(Bank, &[&str])] = &[
    (Bank::Amex, &["american express", "amex"]),
    (Bank::Chase, &["chase", "jpmcb", "jpmorgan"]),
    (Bank::Discover, &["discover"]),
    (Bank::CapitalOne, &["capital one", "capitalone"]),
];

pub fn detect_bank(text: &str, table: &RawTable) -> Option<Bank> {
    match table.format {
        FileFormat::Csv => detect_csv_bank(text, &table.headers),
        FileFormat::Ofx | FileFormat::Qfx => detect_ofx_bank(text),
    }
}

fn detect_csv_bank(text: &str, headers: &[String]) -> Option<Bank> {
    let h: Vec<String> = headers.iter().map(|s| s.trim().to_lowercase()).collect();
    let has = |name: &str| h.iter().any(|c| c == name);
    let joined = h.join(",");

    if has("card member") || has("extended details") || has("appears on your statement as") {
        return Some(Bank::Amex);
    }
    if joined.starts_with("transaction date,post date,description,category,type,amount")
        || joined.starts_with("details,posting date,description,amount,type,balance")
    {
        return Some(Bank::Chase);
    }
    if joined.starts_with("trans. date,post date,description,amount,category")
        || joined.starts_with("transaction date,posted date,description,amount,category")
    {
        return Some(Bank::Discover);
    }
    if has("card no.") && has("debit") && has("credit") {
        return Some(Bank::CapitalOne);
    }

    let preamble = text
        .lines()
        .take(5)
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase();
    brand_in(&preamble)
}

fn detect_ofx_bank(text: &str) -> Option<Bank> {
    let mut head: String = text.chars().take(1000).collect::<String>().to_lowercase();
    if let Some(org) = ofx::institution(text) {
        head.push('\n');
        head.push_str(&org.to_lowercase());
    }
    brand_in(&head)
}

fn brand_in(haystack: &str) -> Option<Bank> {
    BRAND_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| contains_word(haystack, k)))
        .map(|(bank, _)| *bank)
}

/// Substring match that refuses to land inside a longer word ("purchase").
fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(idx, _)| {
        let before = haystack[..idx].chars().next_back();
        let after = haystack[idx + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
