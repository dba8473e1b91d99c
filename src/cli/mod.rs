pub mod export;
pub mod init;
pub mod rules;
pub mod run;
pub mod scan;

use std::path::PathBuf;

use cardpivot::error::{CardPivotError, Result};
use cardpivot::models::{Bank, DateRange};
use cardpivot::pipeline::{Pipeline, PipelineResult, StatementFile};
use cardpivot::settings::Settings;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;

#[derive(Parser)]
#[command(
    name = "cardpivot",
    version,
    about = "Categorize credit-card statements and pivot spending by category and month."
)]
pub struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import statements and print the category/month pivot.
    Run {
        #[command(flatten)]
        batch: BatchArgs,
        /// Print the full result as JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Import statements and write CSV and/or spreadsheet exports.
    Export {
        #[command(flatten)]
        batch: BatchArgs,
        /// Directory for the exported files (default from settings)
        #[arg(long = "output-dir")]
        output_dir: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = FormatArg::All)]
        format: FormatArg,
    },
    /// Inspect the categorization rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// List recently downloaded statement files.
    Scan {
        /// Directory to look in (default from settings)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// How many days back to look (default from settings)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Write a default settings file.
    Init {
        /// Also write the built-in rules to an editable rules.json
        #[arg(long = "write-rules")]
        write_rules: bool,
    },
    /// Print shell completions.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// List rules in the order they are tried.
    List,
    /// Show how a description would be categorized.
    Test {
        /// Raw transaction description, e.g. "AMAZON.COM*123ABC"
        description: String,
    },
}

#[derive(Args)]
pub struct BatchArgs {
    /// Statement files (CSV, OFX or QFX)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    /// Treat every file as this bank (amex, chase, discover, capital_one)
    #[arg(long)]
    pub bank: Option<String>,
    /// First date to include (YYYY-MM-DD)
    #[arg(long = "from")]
    pub from_date: Option<String>,
    /// Last date to include (YYYY-MM-DD)
    #[arg(long = "to")]
    pub to_date: Option<String>,
    /// Include every date instead of the default lookback window
    #[arg(long, conflicts_with_all = ["from_date", "to_date"])]
    pub all: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Csv,
    Xlsx,
    All,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| CardPivotError::Other(format!("Invalid date '{s}', expected YYYY-MM-DD")))
}

impl BatchArgs {
    pub fn bank_hint(&self) -> Result<Option<Bank>> {
        self.bank.as_deref().map(Bank::from_key).transpose()
    }

    /// `--from`/`--to` must come together; neither means the trailing
    /// lookback window ending today.
    pub fn date_range(&self, settings: &Settings) -> Result<DateRange> {
        if self.all {
            return Ok(DateRange::all());
        }
        match (&self.from_date, &self.to_date) {
            (Some(from), Some(to)) => {
                let (start, end) = (parse_date_arg(from)?, parse_date_arg(to)?);
                if start > end {
                    return Err(CardPivotError::Other(format!(
                        "--from {start} is after --to {end}"
                    )));
                }
                Ok(DateRange::new(start, end))
            }
            (Some(_), None) => Err(CardPivotError::Other("--from requires --to".into())),
            (None, Some(_)) => Err(CardPivotError::Other("--to requires --from".into())),
            (None, None) => Ok(DateRange::trailing_days(
                Local::now().date_naive(),
                settings.lookback_days,
            )),
        }
    }

    /// Read every file and run the pipeline. Files that cannot be read are
    /// reported and left out; the batch only fails when none are readable.
    pub fn process(&self, settings: &Settings) -> Result<PipelineResult> {
        let bank = self.bank_hint()?;
        let range = self.date_range(settings)?;
        let rules = settings.rule_table()?;
        let options = settings.normalize_options()?;

        let mut files = Vec::new();
        for path in &self.files {
            match StatementFile::read(path, bank) {
                Ok(file) => files.push(file),
                Err(e) => print_warning(&format!("{}: {e}", path.display())),
            }
        }
        if files.is_empty() {
            return Err(CardPivotError::Other("No readable statement files".into()));
        }

        let result = Pipeline::new(&rules, options).run(&files, &range);
        for line in result.warnings() {
            print_warning(&line);
        }
        Ok(result)
    }
}

pub(crate) fn print_warning(line: &str) {
    eprintln!("{} {line}", "Warning:".yellow().bold());
}
