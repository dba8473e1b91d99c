use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardPivotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unrecognized format: {0}")]
    UnrecognizedFormat(String),

    #[error("Could not parse {field} from '{value}'")]
    FieldParse { field: &'static str, value: String },

    #[error("Unknown bank: {0}")]
    UnknownBank(String),

    #[error("Invalid rule '{pattern}': {reason}")]
    InvalidRule { pattern: String, reason: String },

    #[error("Settings error: {0}")]
    Settings(String),

    #[cfg(feature = "xlsx")]
    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CardPivotError>;
