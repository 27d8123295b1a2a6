use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Insufficient pool: {available} usable numbers, need {needed}")]
    InsufficientPool { available: usize, needed: usize },

    #[error("Source not found: {path}")]
    SourceNotFound { path: String },

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl CoreError {
    /// Whether the enclosing phase may degrade to a no-op instead of
    /// aborting the cycle. Only missing sources qualify; everything
    /// else leaves state in doubt and must stop the cycle.
    pub fn is_degradable(&self) -> bool {
        matches!(self, CoreError::SourceNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
