use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(
        "Transaction time {occurred_at} is before simulation start {sim_start}. \
         Choose a datetime >= simulation start."
    )]
    BeforeEpoch {
        occurred_at: NaiveDateTime,
        sim_start:   NaiveDateTime,
    },

    #[error("Model not loaded: place the model artifact in the artifact directory")]
    Unavailable,

    #[error("Prediction failed: {0}")]
    PredictionFailed(String),

    #[error("Failed to write audit log: {0}")]
    LogWriteFailed(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScoreError {
    /// `LogWriteFailed` is advisory: the decision it accompanies stands.
    pub fn is_request_fatal(&self) -> bool {
        !matches!(self, Self::LogWriteFailed(_))
    }
}

pub type ScoreResult<T> = Result<T, ScoreError>;
