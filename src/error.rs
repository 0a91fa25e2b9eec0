use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Input file is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Template error: {0}")]
    Template(String),
}

pub type Result<T> = std::result::Result<T, ReportError>;
