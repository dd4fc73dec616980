//! Blitz compiler library: lexing, parsing, semantic checking and x86-64
//! assembly generation for the Blitz language.
//!
//! ```
//! use blitz::codegen::Target;
//!
//! let asm = blitz::compile("fn main() -> i32 { return 42; }", Target::x86_64_linux).unwrap();
//! assert!(asm.contains("mov eax, 42"));
//! ```

use crate::{
    codegen::Target,
    token::{Position, Spanned},
};

/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into an AST.
pub mod parser;

/// The checker takes an untyped AST, checks the soundness of its names and
/// types, and maps it into a typed AST.
pub mod checker;

/// The code generator takes a typed AST, mapping it into assembly text.
pub mod codegen;

pub mod ast;
pub mod token;
pub mod types;

pub mod util {
    pub mod fmt;
    #[cfg(test)]
    pub(crate) mod test_utils;
}

/// Runs the whole pipeline over `src`, returning the assembly text for
/// `target`. Stops at the first error.
pub fn compile(src: &str, target: Target) -> Result<String, Error> {
    let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY);
    let program = parser::parse_program(src, &mut tokens)?;
    let program = checker::check(program)?;
    Ok(codegen::generate(&program, target))
}

/// A user-facing compilation error, one variant per stage.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Lexical(Spanned<lexer::Error>),
    #[error("{0}")]
    Syntax(Spanned<parser::Error>),
    #[error("{0}")]
    Semantic(Spanned<checker::Error>),
}

impl Error {
    pub fn position(&self) -> Position {
        match self {
            Error::Lexical(e) => e.position(),
            Error::Syntax(e) => e.position(),
            Error::Semantic(e) => e.position(),
        }
    }

    /// The stage that rejected the input.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Lexical(_) => "lexical",
            Error::Syntax(_) => "syntax",
            Error::Semantic(_) => "semantic",
        }
    }

    /// The error message, without its position.
    pub fn message(&self) -> String {
        match self {
            Error::Lexical(e) => e.inner.to_string(),
            Error::Syntax(e) => e.inner.to_string(),
            Error::Semantic(e) => e.inner.to_string(),
        }
    }
}

impl From<Spanned<lexer::Error>> for Error {
    fn from(value: Spanned<lexer::Error>) -> Self {
        Error::Lexical(value)
    }
}

impl From<Spanned<parser::Error>> for Error {
    fn from(value: Spanned<parser::Error>) -> Self {
        Error::Syntax(value)
    }
}

impl From<Spanned<checker::Error>> for Error {
    fn from(value: Spanned<checker::Error>) -> Self {
        Error::Semantic(value)
    }
}
