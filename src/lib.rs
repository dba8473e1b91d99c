pub mod aggregator;
pub mod categorizer;
pub mod detect;
pub mod error;
pub mod export;
pub mod fmt;
pub mod models;
pub mod normalizer;
pub mod ofx;
pub mod pipeline;
pub mod rules;
pub mod scan;
pub mod settings;

pub use error::{CardPivotError, Result};
pub use models::{Bank, DateRange, Transaction};
pub use pipeline::{Pipeline, PipelineResult, StatementFile};
