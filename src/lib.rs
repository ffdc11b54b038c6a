//! Translates a small, statically typeable subset of Python into a single
//! C++17 translation unit.
//!
//! The pipeline runs three stages in order and stops at the first fault:
//! [`lexer::tokenize`], [`parser::parse_tokens`], then [`codegen::generate`].

use thiserror::Error;

pub mod ast;
pub mod builtins;
pub mod codegen;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod toolchain;

pub use codegen::{CodeGenerator, CodegenError};
pub use lexer::LexError;
pub use parser::ParseError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

impl CompileError {
    /// Lexing and parsing faults, as opposed to translation faults.
    pub fn is_frontend(&self) -> bool {
        matches!(self, Self::Lex(_) | Self::Parse(_))
    }
}

pub fn compile(source: &str) -> Result<String, CompileError> {
    let tokens = lexer::tokenize(source)?;
    let program = parser::parse_tokens(tokens)?;
    Ok(codegen::generate(&program)?)
}
