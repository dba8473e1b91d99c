use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::aggregator::{aggregate, AggregateView};
use crate::categorizer::{CategorizeResult, Categorizer, RuleTable};
use crate::detect;
use crate::error::Result;
use crate::models::{Bank, DateRange, FileFormat, RowIssue, Transaction};
use crate::normalizer::{NormalizeOptions, Normalizer};

/// Row problems listed individually per file before being summarized.
const MAX_ROW_WARNINGS: usize = 5;

#[derive(Debug, Clone)]
pub struct StatementFile {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Forces the bank instead of sniffing it.
    pub bank: Option<Bank>,
}

impl StatementFile {
    pub fn new(name: &str, bytes: Vec<u8>, bank: Option<Bank>) -> Self {
        Self {
            name: name.to_string(),
            bytes,
            bank,
        }
    }

    pub fn read(path: &Path, bank: Option<Bank>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self { name, bytes, bank })
    }
}

fn compute_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Imported,
    /// Byte-identical to an earlier file in the batch.
    Duplicate { of: String },
    Unrecognized { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub name: String,
    #[serde(flatten)]
    pub status: FileStatus,
    pub format: Option<FileFormat>,
    pub bank: Option<Bank>,
    pub normalizer: Option<String>,
    pub imported: usize,
    pub skipped: Vec<RowIssue>,
}

impl FileReport {
    fn new(name: &str, status: FileStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
            format: None,
            bank: None,
            normalizer: None,
            imported: 0,
            skipped: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// Every imported transaction, sorted by date, card, description, amount.
    pub transactions: Vec<Transaction>,
    pub aggregates: AggregateView,
    pub files: Vec<FileReport>,
    pub categorization: CategorizeResult,
}

impl PipelineResult {
    pub fn range(&self) -> &DateRange {
        &self.aggregates.range
    }

    pub fn in_range(&self) -> Vec<&Transaction> {
        let range = self.range();
        self.transactions
            .iter()
            .filter(|t| range.contains(t.date))
            .collect()
    }

    /// Per-file problems as user-facing lines.
    pub fn warnings(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for file in &self.files {
            match &file.status {
                FileStatus::Unrecognized { reason } => {
                    lines.push(format!("{}: {reason}", file.name));
                    continue;
                }
                FileStatus::Duplicate { of } => {
                    lines.push(format!("{}: identical to {of}, skipped", file.name));
                    continue;
                }
                FileStatus::Imported => {}
            }
            if file.imported == 0 && file.skipped.is_empty() {
                lines.push(format!("{}: no transactions found", file.name));
            }
            for issue in file.skipped.iter().take(MAX_ROW_WARNINGS) {
                lines.push(format!("{} line {}: {}", file.name, issue.line, issue.reason));
            }
            if file.skipped.len() > MAX_ROW_WARNINGS {
                lines.push(format!(
                    "{}: {} more rows skipped",
                    file.name,
                    file.skipped.len() - MAX_ROW_WARNINGS
                ));
            }
        }
        if !self.transactions.is_empty() && self.aggregates.is_empty() {
            lines.push(format!("No transactions in range ({})", self.range()));
        }
        lines
    }
}

pub struct Pipeline<'a> {
    rules: &'a RuleTable,
    options: NormalizeOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(rules: &'a RuleTable, options: NormalizeOptions) -> Self {
        Self { rules, options }
    }

    /// Process a batch. A file that cannot be read never stops the others.
    pub fn run(&self, files: &[StatementFile], range: &DateRange) -> PipelineResult {
        let categorizer = Categorizer::new(self.rules);
        let mut seen: HashMap<String, String> = HashMap::new();
        let mut transactions = Vec::new();
        let mut reports = Vec::new();
        let mut categorization = CategorizeResult::default();

        for file in files {
            let checksum = compute_checksum(&file.bytes);
            if let Some(original) = seen.get(&checksum) {
                tracing::warn!("{}: identical to {original}, skipping", file.name);
                reports.push(FileReport::new(
                    &file.name,
                    FileStatus::Duplicate {
                        of: original.clone(),
                    },
                ));
                continue;
            }
            seen.insert(checksum, file.name.clone());

            let (report, txns) = self.process_file(file);
            let (classified, counts) = categorizer.categorize(txns);
            categorization.add(counts);
            transactions.extend(classified);
            reports.push(report);
        }

        transactions.sort_by(|a: &Transaction, b: &Transaction| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.source_card.cmp(&b.source_card))
                .then_with(|| a.description.cmp(&b.description))
                .then_with(|| a.amount.cmp(&b.amount))
                .then_with(|| a.raw_category.cmp(&b.raw_category))
                .then_with(|| a.category.cmp(&b.category))
                .then_with(|| a.merchant.cmp(&b.merchant))
        });
        let aggregates = aggregate(&transactions, range);

        PipelineResult {
            transactions,
            aggregates,
            files: reports,
            categorization,
        }
    }

    fn process_file(&self, file: &StatementFile) -> (FileReport, Vec<Transaction>) {
        let detected = match detect::detect(&file.name, &file.bytes) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("{}: {e}", file.name);
                let status = FileStatus::Unrecognized {
                    reason: e.to_string(),
                };
                return (FileReport::new(&file.name, status), Vec::new());
            }
        };

        let bank = file.bank.or(detected.bank);
        let normalizer = Normalizer::select(detected.table.format, bank);
        let outcome = normalizer.normalize(&detected.table, &file.name, &self.options);

        tracing::info!(
            "{}: {} via {} normalizer, {} imported, {} skipped",
            file.name,
            detected.table.format,
            normalizer.label(),
            outcome.transactions.len(),
            outcome.skipped.len()
        );
        if !outcome.skipped.is_empty() {
            tracing::warn!("{}: skipped {} unreadable rows", file.name, outcome.skipped.len());
        }

        let report = FileReport {
            name: file.name.clone(),
            status: FileStatus::Imported,
            format: Some(detected.table.format),
            bank,
            normalizer: Some(normalizer.label()),
            imported: outcome.transactions.len(),
            skipped: outcome.skipped,
        };
        (report, outcome.transactions)
    }
}
