use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Expected {expected}, got {found}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
    },
    #[error("Expected a statement, got bare expression {found}")]
    ExpectedStatement { found: String },
    #[error("Cannot assign to {target}")]
    InvalidAssignmentTarget { target: String },
    #[error("Only element swaps of the form `a[i], a[j] = a[j], a[i]` are supported")]
    UnsupportedTupleAssignment,
    #[error("range() takes 1 to 3 arguments, got {found}")]
    RangeArity { found: usize },
    #[error("Parser invariant violated: token stream is not terminated by EOF")]
    MissingEof,
}

pub type ParseResult<T> = Result<T, ParseError>;
