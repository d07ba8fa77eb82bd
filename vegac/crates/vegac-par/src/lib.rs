//! vegac-par - Parser for the Vega language.
//!
//! Recursive descent for declarations and statements, Pratt-style operator
//! precedence for expressions. The parser pulls tokens from the lexer
//! through a current/peek buffer (one token of lookahead) and reports
//! syntax errors into a shared [`Handler`].
//!
//! # Error recovery
//!
//! On the first syntax error the parser records the location and message,
//! then enters *panic mode*: further errors are suppressed until the parser
//! synchronizes on a statement-start token (`let`, `if`, `while`, `return`,
//! `fn`, `agent`) or past a `;` or `}`. Each synchronized region may report
//! one error. The tree returned after any error is partial and must only be
//! used for error reporting.

pub mod ast;
mod edge_cases;
mod expr;
mod items;
mod stmt;

pub use ast::*;

use vegac_lex::{Lexer, Token, TokenKind};
use vegac_util::{Diagnostic, Handler, Span};

/// The Vega parser.
///
/// # Example
///
/// ```
/// use vegac_lex::Lexer;
/// use vegac_par::Parser;
/// use vegac_util::Handler;
///
/// let handler = Handler::new();
/// let lexer = Lexer::new("fn main() { print(\"hi\"); }", "main.vega");
/// let program = Parser::new(lexer, &handler).parse_program();
///
/// assert!(!handler.has_errors());
/// assert_eq!(program.decls.len(), 1);
/// ```
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    handler: &'a Handler,
    file: String,
    current: Token,
    peek: Token,
    first_error: Option<(String, Span)>,
    panic_mode: bool,
    /// Tokens consumed so far; recovery uses it to guarantee progress.
    consumed: usize,
}

impl<'a> Parser<'a> {
    /// Create a parser over `lexer`, reporting into `handler`.
    pub fn new(mut lexer: Lexer<'a>, handler: &'a Handler) -> Self {
        let file = lexer.filename().to_owned();
        let current = lexer.next_token();
        let peek = lexer.next_token();
        Self {
            lexer,
            handler,
            file,
            current,
            peek,
            first_error: None,
            panic_mode: false,
            consumed: 0,
        }
    }

    /// Parse a whole program: a sequence of declarations up to end of file.
    pub fn parse_program(&mut self) -> Program {
        let mut decls = Vec::new();

        while !self.current.is_eof() {
            match self.parse_declaration() {
                Some(decl) => decls.push(decl),
                None => self.recover(),
            }
        }

        Program {
            file: self.file.clone(),
            decls,
        }
    }

    /// Whether a syntax error has been recorded.
    pub fn has_error(&self) -> bool {
        self.first_error.is_some()
    }

    /// The first recorded error message.
    pub fn error_message(&self) -> Option<&str> {
        self.first_error.as_ref().map(|(message, _)| message.as_str())
    }

    /// Location of the first recorded error.
    pub fn error_location(&self) -> Option<Span> {
        self.first_error.as_ref().map(|(_, span)| *span)
    }

    // =========================================================================
    // Token plumbing
    // =========================================================================

    pub(crate) fn current_kind(&self) -> TokenKind {
        self.current.kind
    }

    pub(crate) fn current_span(&self) -> Span {
        self.current.span
    }

    pub(crate) fn peek_kind(&self) -> TokenKind {
        self.peek.kind
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.current;
        self.current = self.peek;
        self.peek = self.lexer.next_token();
        self.consumed += 1;
        token
    }

    /// Consume the current token if it has exactly this kind.
    pub(crate) fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.current.kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Require a token of exactly this kind; error and return `None` otherwise.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if self.current.kind == kind {
            Some(self.advance())
        } else {
            self.error_at_current(format!(
                "Expected {}, found {}",
                kind.describe(),
                self.describe_current()
            ));
            None
        }
    }

    /// Require an identifier and return its symbol.
    pub(crate) fn expect_ident(&mut self, what: &str) -> Option<vegac_util::Symbol> {
        match self.current.kind {
            TokenKind::Ident(sym) => {
                self.advance();
                Some(sym)
            }
            _ => {
                self.error_at_current(format!(
                    "Expected {}, found {}",
                    what,
                    self.describe_current()
                ));
                None
            }
        }
    }

    /// Require a string literal and return its raw payload.
    pub(crate) fn expect_string(&mut self, what: &str) -> Option<vegac_util::Symbol> {
        match self.current.kind {
            TokenKind::Str(sym) => {
                self.advance();
                Some(sym)
            }
            _ => {
                self.error_at_current(format!(
                    "Expected {}, found {}",
                    what,
                    self.describe_current()
                ));
                None
            }
        }
    }

    fn describe_current(&self) -> &'static str {
        self.current.kind.describe()
    }

    // =========================================================================
    // Error reporting and recovery
    // =========================================================================

    /// Report a syntax error at the current token.
    ///
    /// In panic mode the report is suppressed; the first call records the
    /// message and location and enters panic mode.
    pub(crate) fn error_at_current(&mut self, message: impl Into<String>) {
        let span = self.current.span;
        self.error_at(message, span);
    }

    pub(crate) fn error_at(&mut self, message: impl Into<String>, span: Span) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;

        // A lexical error carries its own message; prefer it over the
        // generic "unexpected token" the parser would otherwise produce.
        let message = if self.current.kind == TokenKind::Error {
            self.lexer
                .error_message()
                .unwrap_or("Invalid token")
                .to_owned()
        } else {
            message.into()
        };

        if self.first_error.is_none() {
            self.first_error = Some((message.clone(), span));
        }
        self.handler
            .emit(Diagnostic::error(&self.file, message, span));
    }

    /// Skip tokens until a likely statement boundary, leaving panic mode.
    pub(crate) fn synchronize(&mut self) {
        self.panic_mode = false;

        while !self.current.is_eof() {
            match self.current.kind {
                TokenKind::Semicolon | TokenKind::RBrace => {
                    self.advance();
                    return;
                }
                TokenKind::Let
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Return
                | TokenKind::Fn
                | TokenKind::Agent => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Synchronize after a failed parse, guaranteeing at least one token
    /// of progress. A parse that fails on its very first token would
    /// otherwise meet a synchronization point immediately and loop.
    pub(crate) fn recover(&mut self) {
        let before = self.consumed;
        self.synchronize();
        if self.consumed == before && !self.current.is_eof() {
            self.advance();
        }
    }
}
