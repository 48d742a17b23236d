use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReferendumError {
    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Column collision: renaming '{from}' to '{to}' would overwrite an existing column")]
    ColumnCollision { from: String, to: String },

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error("{0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, ReferendumError>;
