use thiserror::Error;

use rebound_model::ModelError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid backoff strategy: {0}")]
    InvalidStrategy(#[from] ModelError),

    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),

    #[error("retry cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

pub type CoreResult<T> = Result<T, CoreError>;
