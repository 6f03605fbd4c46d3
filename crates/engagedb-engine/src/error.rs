use engagedb_core::Metric;
use thiserror::Error;

/// A formula that cannot be parsed into an expression over the known metrics.
///
/// Offsets are byte positions into the formula text.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FormulaError {
    #[error("formula is empty")]
    Empty,

    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unknown identifier '{name}' at offset {offset}; expected one of like, comment, view, share, save, follower")]
    UnknownIdentifier { name: String, offset: usize },

    #[error("invalid number '{literal}' at offset {offset}")]
    InvalidNumber { literal: String, offset: usize },

    #[error("unexpected {found} at offset {offset}")]
    UnexpectedToken { found: String, offset: usize },

    #[error("unexpected end of formula")]
    UnexpectedEnd,

    #[error("unclosed '(' opened at offset {offset}")]
    UnclosedParen { offset: usize },

    #[error("formula nests deeper than {max} levels")]
    TooDeep { max: usize },
}

/// Input the engine refuses to act on. Surfaced to the caller as-is.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("target engagement must be a positive number, got {0}")]
    NonPositiveTarget(f64),

    #[error("a target of {current} is already set; reset it before setting a new one")]
    TargetAlreadySet { current: f64 },

    #[error("{metric} cannot be negative (got {value})")]
    NegativeMetric { metric: Metric, value: i64 },

    #[error("invalid post id: {0}")]
    InvalidPostId(i64),

    #[error("post {0} not found")]
    PostNotFound(i64),

    #[error("formula name must be non-empty")]
    EmptyFormulaName,

    #[error(transparent)]
    Calendar(#[from] engagedb_core::CoreError),

    #[error("cannot compare {requested} months; the limit is {max}")]
    TooManyMonths { requested: u32, max: u32 },
}

/// Failure reported by the storage collaborator. Never retried by the engine.
#[derive(Debug, Error)]
#[error("storage error: {source}")]
pub struct StorageError {
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl StorageError {
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Build a storage error from a plain message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(message.into())
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<engagedb_core::CoreError> for EngineError {
    fn from(value: engagedb_core::CoreError) -> Self {
        EngineError::Validation(ValidationError::Calendar(value))
    }
}
