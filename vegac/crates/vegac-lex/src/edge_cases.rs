//! Edge case tests for vegac-lex.
