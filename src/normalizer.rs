use std::collections::HashMap;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{CardPivotError, Result};
use crate::models::{
    Bank, FileFormat, RawRow, RawTable, RowIssue, SignConvention, Transaction,
};

pub const UNKNOWN_DESCRIPTION: &str = "Unknown";

const CONTENT_SAMPLE: usize = 20;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const CURRENCY_MARKS: &[&str] = &["usd", "eur", "gbp", "cad", "$", "€", "£", "¥"];

/// Largest magnitude accepted for a single transaction. Anything bigger is a
/// corrupt cell, and keeps aggregate sums far from `Decimal` overflow.
const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Lenient money parser: currency marks, thousands separators, quotes, a
/// leading `+`, `(12.00)` and `12.00-` negatives, and decimal commas.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let mut s = raw.trim().trim_matches('"').trim().to_lowercase();
    for mark in CURRENCY_MARKS {
        s = s.replace(mark, "");
    }
    let mut s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit() || ".,-+()".contains(c)) {
        return None;
    }

    let mut negative = false;
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        negative = true;
        s = inner.to_string();
    }
    if let Some(inner) = s.strip_suffix('-') {
        negative = !negative;
        s = inner.to_string();
    }
    if let Some(inner) = s.strip_prefix('-') {
        negative = !negative;
        s = inner.to_string();
    } else if let Some(inner) = s.strip_prefix('+') {
        s = inner.to_string();
    }
    if !s.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let s = normalize_separators(&s);
    let value: Decimal = s.parse().ok()?;
    if value > Decimal::from(MAX_AMOUNT) {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// `1,234.56` and `1.234,56` both become `1234.56`; a lone comma followed by
/// one or two digits is a decimal comma.
fn normalize_separators(s: &str) -> String {
    match (s.rfind(','), s.rfind('.')) {
        (Some(c), Some(d)) if c > d => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(c), None) if s.matches(',').count() == 1 && matches!(s.len() - c - 1, 1 | 2) => {
            s.replace(',', ".")
        }
        (Some(_), None) => s.replace(',', ""),
        _ => s.to_string(),
    }
}

const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%m/%d/%y",
    "%m-%d-%y",
];

/// Parse the date formats card issuers export, including OFX datetimes
/// (`20240115120000.000[-5:EST]`). A trailing time of day is ignored.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim().trim_matches('"').trim();
    if s.is_empty() {
        return None;
    }
    if s.len() >= 8 && s.as_bytes()[..8].iter().all(u8::is_ascii_digit) {
        return NaiveDate::parse_from_str(&s[..8], "%Y%m%d")
            .ok()
            .filter(plausible);
    }
    if let Some(date) = parse_date_text(s) {
        return Some(date);
    }
    // "01/15/2024 10:32 AM", "2024-01-15T10:32:00"
    let head = s.split(|c: char| c.is_whitespace() || c == 'T').next()?;
    if head.len() < s.len() {
        return parse_date_text(head);
    }
    None
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .find(plausible)
}

/// Rejects `%Y` swallowing a two-digit year as year 24.
fn plausible(date: &NaiveDate) -> bool {
    (1900..=2100).contains(&date.year())
}

fn last_four(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    (digits.len() >= 4).then(|| digits[digits.len() - 4..].to_string())
}

// ---------------------------------------------------------------------------
// Column maps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountColumns {
    Single(usize),
    /// Money out in one column, money in in another.
    DebitCredit { debit: usize, credit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub date: usize,
    pub amount: AmountColumns,
    pub description: Option<usize>,
    pub memo: Option<usize>,
    pub raw_category: Option<usize>,
    pub card: Option<usize>,
}

impl ColumnMap {
    const fn positional(date: usize, amount: AmountColumns, description: usize) -> Self {
        Self {
            date,
            amount,
            description: Some(description),
            memo: None,
            raw_category: None,
            card: None,
        }
    }
}

struct BankProfile {
    date: &'static [&'static str],
    description: &'static [&'static str],
    amount: &'static [&'static str],
    debit: &'static [&'static str],
    credit: &'static [&'static str],
    category: &'static [&'static str],
    card: &'static [&'static str],
    /// Layout used for headerless exports.
    positional: ColumnMap,
    sign: SignConvention,
}

const AMEX: BankProfile = BankProfile {
    date: &["date", "transaction date"],
    description: &["description", "appears on your statement as"],
    amount: &["amount"],
    debit: &["debit", "charges"],
    credit: &["credit", "credits"],
    category: &["category"],
    card: &[],
    positional: ColumnMap::positional(0, AmountColumns::Single(2), 1),
    sign: SignConvention::SpendNegative,
};

const CHASE: BankProfile = BankProfile {
    date: &["transaction date", "posting date", "date"],
    description: &["description"],
    amount: &["amount"],
    debit: &[],
    credit: &[],
    category: &["category"],
    card: &[],
    positional: ColumnMap::positional(0, AmountColumns::Single(5), 2),
    sign: SignConvention::SpendNegative,
};

const DISCOVER: BankProfile = BankProfile {
    date: &["trans. date", "transaction date", "date"],
    description: &["description"],
    amount: &["amount"],
    debit: &[],
    credit: &[],
    category: &["category"],
    card: &[],
    positional: ColumnMap::positional(0, AmountColumns::Single(3), 2),
    sign: SignConvention::SpendPositive,
};

const CAPITAL_ONE: BankProfile = BankProfile {
    date: &["transaction date", "posted date", "date"],
    description: &["description"],
    amount: &["amount"],
    debit: &["debit"],
    credit: &["credit"],
    category: &["category"],
    card: &["card no."],
    positional: ColumnMap::positional(0, AmountColumns::DebitCredit { debit: 5, credit: 6 }, 3),
    sign: SignConvention::SpendPositive,
};

fn profile(bank: Bank) -> &'static BankProfile {
    match bank {
        Bank::Amex => &AMEX,
        Bank::Chase => &CHASE,
        Bank::Discover => &DISCOVER,
        Bank::CapitalOne => &CAPITAL_ONE,
    }
}

fn find_column(table: &RawTable, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|alias| table.column(alias))
}

fn bank_columns(p: &BankProfile, table: &RawTable) -> Option<ColumnMap> {
    if !table.has_headers() {
        return Some(p.positional);
    }
    let date = find_column(table, p.date)?;
    let amount = match (
        find_column(table, p.amount),
        find_column(table, p.debit),
        find_column(table, p.credit),
    ) {
        (Some(idx), _, _) => AmountColumns::Single(idx),
        (None, Some(debit), Some(credit)) => AmountColumns::DebitCredit { debit, credit },
        _ => return None,
    };
    Some(ColumnMap {
        date,
        amount,
        description: find_column(table, p.description),
        memo: find_column(table, &["memo", "extended details"]),
        raw_category: find_column(table, p.category),
        card: find_column(table, p.card),
    })
}

// ---------------------------------------------------------------------------
// Generic column guessing
// ---------------------------------------------------------------------------

const GENERIC_DATE: &[&str] = &["date", "time", "when", "day"];
const GENERIC_DESCRIPTION: &[&str] = &[
    "description", "desc", "narrative", "details", "merchant", "vendor", "payee", "memo",
];
const GENERIC_AMOUNT: &[&str] = &[
    "amount", "sum", "value", "price", "cost", "debit", "credit", "payment",
];

/// Exact alias beats prefix beats substring.
fn header_score(header: &str, aliases: &[&str]) -> u8 {
    let h = header.trim().to_lowercase();
    aliases
        .iter()
        .map(|a| {
            if h == *a {
                3
            } else if h.starts_with(a) {
                2
            } else if h.contains(a) {
                1
            } else {
                0
            }
        })
        .max()
        .unwrap_or(0)
}

/// More than half of the non-blank sampled values satisfy `check`.
fn content_matches(table: &RawTable, col: usize, check: fn(&str) -> bool) -> bool {
    let sample: Vec<&str> = table
        .rows
        .iter()
        .filter_map(|r| r.get(col))
        .filter(|v| !v.is_empty())
        .take(CONTENT_SAMPLE)
        .collect();
    !sample.is_empty() && sample.iter().filter(|v| check(v)).count() * 2 > sample.len()
}

fn is_date(v: &str) -> bool {
    parse_date(v).is_some()
}

fn is_amount(v: &str) -> bool {
    parse_amount(v).is_some()
}

fn is_text(v: &str) -> bool {
    !is_amount(v) && !is_date(v)
}

fn column_count(table: &RawTable) -> usize {
    let rows = table.rows.iter().map(|r| r.values.len()).max().unwrap_or(0);
    rows.max(table.headers.len())
}

/// Best-scoring header for `aliases` whose content passes `check`.
fn best_header(
    table: &RawTable,
    aliases: &[&str],
    check: fn(&str) -> bool,
    exclude: &[usize],
) -> Option<usize> {
    let mut scored: Vec<(u8, usize)> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(i, _)| !exclude.contains(i))
        .map(|(i, h)| (header_score(h, aliases), i))
        .filter(|(score, _)| *score > 0)
        .collect();
    // highest score, then leftmost
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored
        .into_iter()
        .map(|(_, i)| i)
        .find(|&i| content_matches(table, i, check))
}

fn first_by_content(table: &RawTable, check: fn(&str) -> bool, exclude: &[usize]) -> Option<usize> {
    (0..column_count(table))
        .filter(|i| !exclude.contains(i))
        .find(|&i| content_matches(table, i, check))
}

fn guess_columns(table: &RawTable) -> std::result::Result<ColumnMap, String> {
    let date = best_header(table, GENERIC_DATE, is_date, &[])
        .or_else(|| first_by_content(table, is_date, &[]))
        .ok_or_else(|| "no date column found".to_string())?;

    let single = best_header(table, &["amount"], is_amount, &[date]);
    let debit = table.column("debit").filter(|&i| i != date);
    let credit = table.column("credit").filter(|&i| i != date);

    let amount = match (single, debit, credit) {
        (Some(idx), _, _) => AmountColumns::Single(idx),
        (None, Some(debit), Some(credit)) => AmountColumns::DebitCredit { debit, credit },
        _ => best_header(table, GENERIC_AMOUNT, is_amount, &[date])
            .or_else(|| first_by_content(table, is_amount, &[date]))
            .map(AmountColumns::Single)
            .ok_or_else(|| "no amount column found".to_string())?,
    };

    let mut used = vec![date];
    match amount {
        AmountColumns::Single(i) => used.push(i),
        AmountColumns::DebitCredit { debit, credit } => used.extend([debit, credit]),
    }
    let description = best_header(table, GENERIC_DESCRIPTION, |_| true, &used)
        .or_else(|| first_by_content(table, is_text, &used));
    if let Some(d) = description {
        used.push(d);
    }
    let memo = table.column("memo").filter(|i| !used.contains(i));

    Ok(ColumnMap {
        date,
        amount,
        description,
        memo,
        raw_category: table.column("category"),
        card: None,
    })
}

// ---------------------------------------------------------------------------
// Normalizers: enum dispatch over the supported sources
// ---------------------------------------------------------------------------

/// Per-bank sign corrections applied on top of the built-in conventions.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    pub sign_overrides: HashMap<Bank, SignConvention>,
    pub generic_sign: SignConvention,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            sign_overrides: HashMap::new(),
            generic_sign: SignConvention::SpendPositive,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizeOutcome {
    pub transactions: Vec<Transaction>,
    pub skipped: Vec<RowIssue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    Bank(Bank),
    /// OFX/QFX with fixed tag names; the bank only labels the source card.
    Ofx(Option<Bank>),
    Generic,
}

impl Normalizer {
    /// OFX content always uses the OFX variant; otherwise a known bank wins
    /// over the generic guesser.
    pub fn select(format: FileFormat, bank: Option<Bank>) -> Self {
        match (format, bank) {
            (FileFormat::Ofx | FileFormat::Qfx, bank) => Self::Ofx(bank),
            (FileFormat::Csv, Some(bank)) => Self::Bank(bank),
            (FileFormat::Csv, None) => Self::Generic,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Bank(bank) => bank.name().to_string(),
            Self::Ofx(Some(bank)) => format!("OFX ({})", bank.name()),
            Self::Ofx(None) => "OFX".to_string(),
            Self::Generic => "Generic".to_string(),
        }
    }

    pub fn sign(&self, opts: &NormalizeOptions) -> SignConvention {
        match self {
            Self::Bank(bank) => opts
                .sign_overrides
                .get(bank)
                .copied()
                .unwrap_or(profile(*bank).sign),
            Self::Ofx(_) => SignConvention::SpendNegative,
            Self::Generic => opts.generic_sign,
        }
    }

    /// Resolve which column holds each field. Bank layouts fall back to the
    /// generic guesser when their headers are not where expected.
    pub fn column_map(&self, table: &RawTable) -> std::result::Result<ColumnMap, String> {
        match self {
            Self::Bank(bank) => match bank_columns(profile(*bank), table) {
                Some(map) => Ok(map),
                None => guess_columns(table),
            },
            Self::Ofx(_) => Ok(ColumnMap {
                date: 0,
                amount: AmountColumns::Single(1),
                description: Some(2),
                memo: Some(3),
                raw_category: None,
                card: None,
            }),
            Self::Generic => guess_columns(table),
        }
    }

    pub fn parse_date(&self, row: &RawRow, map: &ColumnMap) -> Result<NaiveDate> {
        let raw = row.get(map.date).unwrap_or("");
        parse_date(raw).ok_or_else(|| CardPivotError::FieldParse {
            field: "date",
            value: raw.to_string(),
        })
    }

    /// Amount with spending positive.
    pub fn parse_amount(
        &self,
        row: &RawRow,
        map: &ColumnMap,
        sign: SignConvention,
    ) -> Result<Decimal> {
        match map.amount {
            AmountColumns::Single(idx) => {
                let raw = row.get(idx).unwrap_or("");
                let value = parse_amount(raw).ok_or_else(|| CardPivotError::FieldParse {
                    field: "amount",
                    value: raw.to_string(),
                })?;
                Ok(sign.to_spend(value))
            }
            AmountColumns::DebitCredit { debit, credit } => {
                let debit_raw = row.get(debit).unwrap_or("");
                let credit_raw = row.get(credit).unwrap_or("");
                let debit_value = parse_amount(debit_raw);
                let credit_value = parse_amount(credit_raw);
                if debit_value.is_none() && credit_value.is_none() {
                    return Err(CardPivotError::FieldParse {
                        field: "amount",
                        value: format!("{debit_raw}/{credit_raw}"),
                    });
                }
                Ok(debit_value.unwrap_or_default().abs() - credit_value.unwrap_or_default().abs())
            }
        }
    }

    pub fn extract_description(&self, row: &RawRow, map: &ColumnMap) -> String {
        [map.description, map.memo]
            .into_iter()
            .flatten()
            .filter_map(|idx| row.get(idx))
            .find(|v| !v.is_empty())
            .unwrap_or(UNKNOWN_DESCRIPTION)
            .to_string()
    }

    /// Bank name plus the last four digits of the account when the file
    /// reveals them; generic files are labelled by file stem.
    pub fn source_card(
        &self,
        table: &RawTable,
        row: &RawRow,
        map: &ColumnMap,
        source_name: &str,
    ) -> String {
        let account = map
            .card
            .and_then(|idx| row.get(idx))
            .and_then(last_four)
            .or_else(|| table.account_id.as_deref().and_then(last_four));
        let base = match self {
            Self::Bank(bank) | Self::Ofx(Some(bank)) => bank.name().to_string(),
            Self::Ofx(None) => "OFX".to_string(),
            Self::Generic => Path::new(source_name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(source_name)
                .to_string(),
        };
        match account {
            Some(digits) => format!("{base} ****{digits}"),
            None => base,
        }
    }

    /// Turn every raw row into a transaction, collecting the rows that could
    /// not be read instead of failing the file.
    pub fn normalize(
        &self,
        table: &RawTable,
        source_name: &str,
        opts: &NormalizeOptions,
    ) -> NormalizeOutcome {
        let mut outcome = NormalizeOutcome {
            transactions: Vec::new(),
            skipped: table.unreadable.clone(),
        };
        let map = match self.column_map(table) {
            Ok(map) => map,
            Err(reason) => {
                tracing::warn!("{source_name}: {reason}, skipping {} rows", table.rows.len());
                outcome.skipped.extend(table.rows.iter().map(|r| RowIssue {
                    line: r.line,
                    reason: reason.clone(),
                }));
                outcome.skipped.sort_by_key(|issue| issue.line);
                return outcome;
            }
        };
        let sign = self.sign(opts);

        for row in &table.rows {
            let parsed = self.parse_date(row, &map).and_then(|date| {
                let amount = self.parse_amount(row, &map, sign)?;
                Ok((date, amount))
            });
            match parsed {
                Ok((date, amount)) => {
                    let description = self.extract_description(row, &map);
                    let card = self.source_card(table, row, &map, source_name);
                    let raw_category = map
                        .raw_category
                        .and_then(|idx| row.get(idx))
                        .map(str::to_string);
                    outcome.transactions.push(
                        Transaction::new(date, amount, &description, &card)
                            .with_raw_category(raw_category),
                    );
                }
                Err(e) => {
                    tracing::debug!("{source_name}:{}: skipped row: {e}", row.line);
                    outcome.skipped.push(RowIssue {
                        line: row.line,
                        reason: e.to_string(),
                    });
                }
            }
        }
        outcome.skipped.sort_by_key(|issue| issue.line);
        outcome
    }
}
