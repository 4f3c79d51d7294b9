use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (no stages, bad delimiter, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Missing required column in delimited input.
    #[error("{dataset}: missing column '{column}'")]
    MissingColumn { dataset: String, column: String },
    /// A supplied record lacks a required value or breaks id uniqueness.
    #[error("{dataset}, record {record}: {reason}")]
    MalformedInput {
        dataset: String,
        record: String,
        reason: String,
    },
    /// Delimited-text read error.
    #[error("{dataset}: CSV error: {message}")]
    Csv { dataset: String, message: String },
    /// IO error (file read, etc.).
    #[error("IO error: {0}")]
    Io(String),
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The dedicated rayon pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

impl ReconError {
    pub(crate) fn malformed(
        dataset: &str,
        record: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedInput {
            dataset: dataset.into(),
            record: record.into(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by the content of the supplied records.
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Self::MalformedInput { .. } | Self::MissingColumn { .. })
    }
}
