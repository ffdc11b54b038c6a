use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodegenError {
    #[error("Cannot translate {construct} {context}")]
    UnsupportedExpression {
        construct: &'static str,
        context: &'static str,
    },
    #[error("Nested function definitions are not supported (found '{name}')")]
    NestedFunction { name: String },
    #[error("Cannot declare '{name}' outside the block that first assigns it: its type is unknown")]
    UntypedHoistedVariable { name: String },
    #[error("Return outside of function")]
    ReturnOutsideFunction,
    #[error("{name}() expected {expected} arguments, got {found}")]
    BuiltinArity {
        name: &'static str,
        expected: String,
        found: usize,
    },
    #[error("Variable '{name}' is declared as {declared} but assigned a {found} value")]
    TypeMismatch {
        name: String,
        declared: &'static str,
        found: &'static str,
    },
}

pub type CodegenResult<T> = Result<T, CodegenError>;
