//! vegac-util - Shared infrastructure for the Vega compiler.
//!
//! This crate provides the types every compiler phase depends on:
//!
//! - [`Span`] - source location tracking (byte offset, line, column)
//! - [`Symbol`] - interned string handles for identifiers and literals
//! - [`Diagnostic`] / [`Handler`] - error and warning reporting
//!
//! The phase crates (`vegac-lex`, `vegac-par`, `vegac-sem`, `vegac-gen`)
//! communicate exclusively through these types; none of them defines its
//! own location or name representation.

pub mod diagnostic;
pub mod span;
pub mod symbol;

pub use diagnostic::{Diagnostic, Handler, Level};
pub use span::Span;
pub use symbol::Symbol;
