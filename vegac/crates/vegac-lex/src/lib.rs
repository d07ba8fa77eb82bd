//! vegac-lex - Lexical analyzer for Vega source code.
//!
//! Transforms a source string into a stream of [`Token`]s with source
//! locations. The lexer scans without backtracking apart from the one-token
//! [`Lexer::peek_token`]; whitespace and comments are skipped between
//! tokens, and escape sequences in string literals are left raw for the
//! emitter to process exactly once.
//!
//! On a malformed input the lexer returns an [`TokenKind::Error`] token,
//! records the first error message, and stays safe to call again.

pub mod cursor;
mod edge_cases;
pub mod lexer;
pub mod token;

pub use lexer::Lexer;
pub use token::{keyword_from_ident, Token, TokenKind};
