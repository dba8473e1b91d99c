use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CardPivotError, Result};

pub const UNCATEGORIZED: &str = "Uncategorized";

// ---------------------------------------------------------------------------
// Banks and sign conventions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bank {
    Amex,
    Chase,
    Discover,
    CapitalOne,
}

pub const ALL_BANKS: &[Bank] = &[Bank::Amex, Bank::Chase, Bank::Discover, Bank::CapitalOne];

impl Bank {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Amex => "amex",
            Self::Chase => "chase",
            Self::Discover => "discover",
            Self::CapitalOne => "capital_one",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Amex => "American Express",
            Self::Chase => "Chase",
            Self::Discover => "Discover",
            Self::CapitalOne => "Capital One",
        }
    }

    /// Accepts the key, the display name, or a few common spellings.
    pub fn from_key(key: &str) -> Result<Bank> {
        let k = key.trim().to_lowercase().replace(['-', ' '], "_");
        match k.as_str() {
            "amex" | "american_express" => Ok(Bank::Amex),
            "chase" => Ok(Bank::Chase),
            "discover" => Ok(Bank::Discover),
            "capital_one" | "capitalone" => Ok(Bank::CapitalOne),
            _ => Err(CardPivotError::UnknownBank(key.to_string())),
        }
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How an export writes money that left the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignConvention {
    SpendPositive,
    SpendNegative,
}

impl SignConvention {
    /// Convert a raw amount to the normalized convention (positive = spent).
    pub fn to_spend(&self, raw: Decimal) -> Decimal {
        match self {
            Self::SpendPositive => raw,
            Self::SpendNegative => -raw,
        }
    }
}

// ---------------------------------------------------------------------------
// Raw tables produced by format detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Ofx,
    Qfx,
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "CSV",
            Self::Ofx => "OFX",
            Self::Qfx => "QFX",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based line in the source file.
    pub line: u64,
    pub values: Vec<String>,
}

impl RawRow {
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).map(|s| s.trim())
    }
}

/// A source row that could not be turned into a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    pub line: u64,
    pub reason: String,
}

/// Rows of string fields exactly as they appeared in a statement file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub format: FileFormat,
    /// Empty for headerless CSV files.
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    pub account_id: Option<String>,
    /// Records the reader itself could not split into fields.
    pub unreadable: Vec<RowIssue>,
}

impl RawTable {
    pub fn has_headers(&self) -> bool {
        !self.headers.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// One normalized card transaction. `amount` is positive when money was spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    pub source_card: String,
    pub category: Option<String>,
    pub merchant: Option<String>,
    pub raw_category: Option<String>,
}

impl Transaction {
    pub fn new(date: NaiveDate, amount: Decimal, description: &str, source_card: &str) -> Self {
        Self {
            date,
            amount,
            description: description.to_string(),
            source_card: source_card.to_string(),
            category: None,
            merchant: None,
            raw_category: None,
        }
    }

    pub fn with_raw_category(mut self, raw_category: Option<String>) -> Self {
        self.raw_category = raw_category.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn classified(self, category: &str, merchant: &str) -> Self {
        Self {
            category: Some(category.to_string()),
            merchant: Some(merchant.to_string()),
            ..self
        }
    }

    pub fn category_name(&self) -> &str {
        self.category.as_deref().unwrap_or(UNCATEGORIZED)
    }

    pub fn merchant_name(&self) -> &str {
        self.merchant.as_deref().unwrap_or(&self.description)
    }

    /// Pivot column key, `YYYY-MM`.
    pub fn month(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}

// ---------------------------------------------------------------------------
// Date ranges
// ---------------------------------------------------------------------------

/// Inclusive on both ends. A range whose start is after its end is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn all() -> Self {
        Self {
            start: NaiveDate::MIN,
            end: NaiveDate::MAX,
        }
    }

    /// From `days` days before `today` through `today`.
    pub fn trailing_days(today: NaiveDate, days: u32) -> Self {
        let start = today - chrono::Duration::days(i64::from(days));
        Self { start, end: today }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_unbounded(&self) -> bool {
        self.start == NaiveDate::MIN && self.end == NaiveDate::MAX
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            f.write_str("all dates")
        } else {
            write!(f, "{} to {}", self.start, self.end)
        }
    }
}
