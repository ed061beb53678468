use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("{stage}: degenerate input, need at least {required} data points, got {actual}")]
    DegenerateInput {
        stage: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("Schema violation at row {row}, field '{field}': {reason}")]
    SchemaViolation {
        row: usize,
        field: &'static str,
        reason: String,
    },

    #[error("Invalid configuration for '{param}': {reason}")]
    InvalidConfig { param: &'static str, reason: String },

    #[error("{stage}: clustering backend failed: {message}")]
    Clustering { stage: &'static str, message: String },
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
