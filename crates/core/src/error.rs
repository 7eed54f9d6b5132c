use thiserror::Error;

pub type PlannerResult<T> = Result<T, PlannerError>;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Invalid mutation: {0}")]
    InvalidMutation(String),

    #[error("Invalid wizard transition: {0}")]
    InvalidTransition(String),

    #[error("Planning session not found: {0}")]
    SessionNotFound(String),

    #[error("Benchmark data unavailable: {0}")]
    BenchmarkUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PlannerError {
    /// Mutation errors are recoverable by the caller (usually a UI no-op).
    pub fn is_invalid_mutation(&self) -> bool {
        matches!(self, Self::UnknownPlatform(_) | Self::InvalidMutation(_))
    }
}

impl From<config::ConfigError> for PlannerError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
