//! Main lexer implementation for the Vega language.
//!
//! The lexer scans a source string front to back, dispatching on the first
//! character of each token. Multi-character operators (`->`, `=>`, `==`,
//! `!=`, `<=`, `>=`, `<-`, `<~`, `::`, `&&`, `||`) are recognized with one
//! character of lookahead. Only the first error is retained; the lexer
//! keeps producing tokens after reporting one.

use vegac_util::{Span, Symbol};

use crate::cursor::Cursor;
use crate::token::{keyword_from_ident, Token, TokenKind};

/// The Vega lexer.
///
/// # Example
///
/// ```
/// use vegac_lex::{Lexer, TokenKind};
///
/// let mut lexer = Lexer::new("let x = 42;", "main.vega");
/// assert_eq!(lexer.next_token().kind, TokenKind::Let);
/// assert_eq!(lexer.next_token().kind, TokenKind::Ident(vegac_util::Symbol::intern("x")));
/// ```
pub struct Lexer<'a> {
    /// Character cursor over the source.
    cursor: Cursor<'a>,

    /// Name of the file being lexed, for diagnostics.
    filename: String,

    /// First error encountered, if any.
    error: Option<(String, Span)>,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over `source`, reporting against `filename`.
    pub fn new(source: &'a str, filename: impl Into<String>) -> Self {
        Self {
            cursor: Cursor::new(source),
            filename: filename.into(),
            error: None,
        }
    }

    /// The file this lexer reads from.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The source text.
    pub fn source(&self) -> &'a str {
        self.cursor.source()
    }

    /// Whether a lexical error has been recorded.
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// The first recorded error message.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|(message, _)| message.as_str())
    }

    /// Location of the first recorded error.
    pub fn error_span(&self) -> Option<Span> {
        self.error.as_ref().map(|(_, span)| *span)
    }

    /// Look at the next token without consuming it.
    ///
    /// The full lexer state (cursor and error state) is saved and restored,
    /// so a later [`next_token`](Self::next_token) returns an equal token.
    pub fn peek_token(&mut self) -> Token {
        let saved_cursor = self.cursor;
        let saved_error = self.error.clone();
        let token = self.next_token();
        self.cursor = saved_cursor;
        self.error = saved_error;
        token
    }

    /// Scan and return the next token.
    pub fn next_token(&mut self) -> Token {
        if let Some((message, span)) = self.skip_whitespace_and_comments() {
            return self.error_token(message, span);
        }

        let start = self.start_span();

        if self.cursor.is_at_end() {
            return Token::new(TokenKind::Eof, self.finish_span(start));
        }

        match self.cursor.current_char() {
            '(' => self.single(TokenKind::LParen, start),
            ')' => self.single(TokenKind::RParen, start),
            '{' => self.single(TokenKind::LBrace, start),
            '}' => self.single(TokenKind::RBrace, start),
            '[' => self.single(TokenKind::LBracket, start),
            ']' => self.single(TokenKind::RBracket, start),
            ',' => self.single(TokenKind::Comma, start),
            ';' => self.single(TokenKind::Semicolon, start),
            '.' => self.single(TokenKind::Dot, start),
            '+' => self.single(TokenKind::Plus, start),
            '*' => self.single(TokenKind::Star, start),
            '/' => self.single(TokenKind::Slash, start),
            '%' => self.single(TokenKind::Percent, start),
            '-' => {
                self.cursor.advance();
                if self.cursor.match_char('>') {
                    Token::new(TokenKind::Arrow, self.finish_span(start))
                } else {
                    Token::new(TokenKind::Minus, self.finish_span(start))
                }
            }
            '=' => {
                self.cursor.advance();
                if self.cursor.match_char('=') {
                    Token::new(TokenKind::EqEq, self.finish_span(start))
                } else if self.cursor.match_char('>') {
                    Token::new(TokenKind::FatArrow, self.finish_span(start))
                } else {
                    Token::new(TokenKind::Eq, self.finish_span(start))
                }
            }
            '!' => {
                self.cursor.advance();
                if self.cursor.match_char('=') {
                    Token::new(TokenKind::NotEq, self.finish_span(start))
                } else {
                    Token::new(TokenKind::Not, self.finish_span(start))
                }
            }
            '<' => {
                self.cursor.advance();
                if self.cursor.match_char('=') {
                    Token::new(TokenKind::LtEq, self.finish_span(start))
                } else if self.cursor.match_char('-') {
                    Token::new(TokenKind::Send, self.finish_span(start))
                } else if self.cursor.match_char('~') {
                    Token::new(TokenKind::SendAsync, self.finish_span(start))
                } else {
                    Token::new(TokenKind::Lt, self.finish_span(start))
                }
            }
            '>' => {
                self.cursor.advance();
                if self.cursor.match_char('=') {
                    Token::new(TokenKind::GtEq, self.finish_span(start))
                } else {
                    Token::new(TokenKind::Gt, self.finish_span(start))
                }
            }
            ':' => {
                self.cursor.advance();
                if self.cursor.match_char(':') {
                    Token::new(TokenKind::ColonColon, self.finish_span(start))
                } else {
                    Token::new(TokenKind::Colon, self.finish_span(start))
                }
            }
            '&' => {
                self.cursor.advance();
                if self.cursor.match_char('&') {
                    Token::new(TokenKind::AndAnd, self.finish_span(start))
                } else {
                    let span = self.finish_span(start);
                    self.error_token("Expected '&&'", span)
                }
            }
            '|' => {
                self.cursor.advance();
                if self.cursor.match_char('|') {
                    Token::new(TokenKind::OrOr, self.finish_span(start))
                } else {
                    let span = self.finish_span(start);
                    self.error_token("Expected '||'", span)
                }
            }
            '"' => self.lex_string(start),
            c if c.is_ascii_alphabetic() || c == '_' => self.lex_identifier(start),
            c if c.is_ascii_digit() => self.lex_number(start),
            c => {
                self.cursor.advance();
                let span = self.finish_span(start);
                self.error_token(format!("Unexpected character '{}'", c), span)
            }
        }
    }

    /// Scan an identifier or keyword.
    fn lex_identifier(&mut self, start: SpanStart) -> Token {
        while matches!(self.cursor.current_char(), c if c.is_ascii_alphanumeric() || c == '_') {
            self.cursor.advance();
        }

        let span = self.finish_span(start);
        let text = span.text(self.cursor.source());
        let kind = keyword_from_ident(text).unwrap_or_else(|| TokenKind::Ident(Symbol::intern(text)));
        Token::new(kind, span)
    }

    /// Scan an integer or float literal.
    ///
    /// A `.` is only consumed when a digit follows, so `a.len()`-style
    /// member access after an integer stays intact.
    fn lex_number(&mut self, start: SpanStart) -> Token {
        while self.cursor.current_char().is_ascii_digit() {
            self.cursor.advance();
        }

        let mut is_float = false;
        if self.cursor.current_char() == '.' && self.cursor.peek_next().is_ascii_digit() {
            is_float = true;
            self.cursor.advance();
            while self.cursor.current_char().is_ascii_digit() {
                self.cursor.advance();
            }
        }

        let span = self.finish_span(start);
        let text = span.text(self.cursor.source());

        if is_float {
            match text.parse::<f64>() {
                Ok(value) => Token::new(TokenKind::Float(value), span),
                Err(_) => self.error_token("Invalid float literal", span),
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => Token::new(TokenKind::Int(value), span),
                Err(_) => self.error_token("Integer literal too large", span),
            }
        }
    }

    /// Scan a string literal.
    ///
    /// The token payload is the raw content between the quotes; a `\x`
    /// sequence is consumed as two characters and left un-decoded. A raw
    /// newline or end of input before the closing quote is an error.
    fn lex_string(&mut self, start: SpanStart) -> Token {
        self.cursor.advance(); // opening quote
        let content_start = self.cursor.position();

        loop {
            match self.cursor.current_char() {
                '"' => {
                    let content = &self.cursor.source()[content_start..self.cursor.position()];
                    self.cursor.advance(); // closing quote
                    let span = self.finish_span(start);
                    return Token::new(TokenKind::Str(Symbol::intern(content)), span);
                }
                '\n' | '\0' => {
                    let span = self.finish_span(start);
                    return self.error_token("Unterminated string", span);
                }
                '\\' => {
                    self.cursor.advance();
                    if self.cursor.is_at_end() {
                        let span = self.finish_span(start);
                        return self.error_token("Unterminated string", span);
                    }
                    self.cursor.advance();
                }
                _ => self.cursor.advance(),
            }
        }
    }

    /// Skip whitespace, line comments, and non-nesting block comments.
    ///
    /// Returns the error for an unterminated block comment.
    fn skip_whitespace_and_comments(&mut self) -> Option<(String, Span)> {
        loop {
            let c = self.cursor.current_char();
            match c {
                ' ' | '\t' | '\r' | '\n' => self.cursor.advance(),
                '/' if self.cursor.peek_next() == '/' => {
                    while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                        self.cursor.advance();
                    }
                }
                '/' if self.cursor.peek_next() == '*' => {
                    let start = self.start_span();
                    self.cursor.advance();
                    self.cursor.advance();
                    loop {
                        if self.cursor.is_at_end() {
                            return Some(("Unterminated block comment".into(), self.finish_span(start)));
                        }
                        if self.cursor.current_char() == '*' && self.cursor.peek_next() == '/' {
                            self.cursor.advance();
                            self.cursor.advance();
                            break;
                        }
                        self.cursor.advance();
                    }
                }
                _ => return None,
            }
        }
    }

    fn single(&mut self, kind: TokenKind, start: SpanStart) -> Token {
        self.cursor.advance();
        Token::new(kind, self.finish_span(start))
    }

    fn start_span(&self) -> SpanStart {
        SpanStart {
            offset: self.cursor.position(),
            line: self.cursor.line(),
            column: self.cursor.column(),
        }
    }

    fn finish_span(&self, start: SpanStart) -> Span {
        Span::new(
            start.offset as u32,
            (self.cursor.position() - start.offset) as u32,
            start.line,
            start.column,
        )
    }

    fn error_token(&mut self, message: impl Into<String>, span: Span) -> Token {
        let message = message.into();
        if self.error.is_none() {
            self.error = Some((message, span));
        }
        Token::new(TokenKind::Error, span)
    }
}

/// Saved start position of a token in progress.
#[derive(Clone, Copy)]
struct SpanStart {
    offset: usize,
    line: u32,
    column: u32,
}

/// Iterate over tokens until end of input.
impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.is_eof() {
            None
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> Vec<Token> {
        Lexer::new(source, "test.vega").collect()
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex_all(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_let_binding() {
        assert_eq!(
            kinds("let x = 42;"),
            vec![
                TokenKind::Let,
                TokenKind::Ident(Symbol::intern("x")),
                TokenKind::Eq,
                TokenKind::Int(42),
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn test_lex_keywords() {
        assert_eq!(
            kinds("agent tool spawn async await supervised by"),
            vec![
                TokenKind::Agent,
                TokenKind::Tool,
                TokenKind::Spawn,
                TokenKind::Async,
                TokenKind::Await,
                TokenKind::Supervised,
                TokenKind::By,
            ]
        );
    }

    #[test]
    fn test_lex_type_keywords() {
        assert_eq!(
            kinds("int float bool str void Result"),
            vec![
                TokenKind::TyInt,
                TokenKind::TyFloat,
                TokenKind::TyBool,
                TokenKind::TyStr,
                TokenKind::TyVoid,
                TokenKind::TyResult,
            ]
        );
    }

    #[test]
    fn test_lex_multichar_operators() {
        assert_eq!(
            kinds("-> => == != <= >= <- <~ :: && ||"),
            vec![
                TokenKind::Arrow,
                TokenKind::FatArrow,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::Send,
                TokenKind::SendAsync,
                TokenKind::ColonColon,
                TokenKind::AndAnd,
                TokenKind::OrOr,
            ]
        );
    }

    #[test]
    fn test_lex_send_vs_less() {
        assert_eq!(
            kinds("a < b <- c"),
            vec![
                TokenKind::Ident(Symbol::intern("a")),
                TokenKind::Lt,
                TokenKind::Ident(Symbol::intern("b")),
                TokenKind::Send,
                TokenKind::Ident(Symbol::intern("c")),
            ]
        );
    }

    #[test]
    fn test_lex_float_and_int() {
        assert_eq!(
            kinds("3.14 7 0.5"),
            vec![
                TokenKind::Float(3.14),
                TokenKind::Int(7),
                TokenKind::Float(0.5),
            ]
        );
    }

    #[test]
    fn test_lex_dot_not_consumed_without_digit() {
        assert_eq!(
            kinds("5.len"),
            vec![
                TokenKind::Int(5),
                TokenKind::Dot,
                TokenKind::Ident(Symbol::intern("len")),
            ]
        );
    }

    #[test]
    fn test_lex_string_raw_payload() {
        let tokens = lex_all(r#""a\nb""#);
        assert_eq!(tokens.len(), 1);
        // The payload keeps the backslash; decoding happens at emission.
        assert_eq!(tokens[0].kind, TokenKind::Str(Symbol::intern("a\\nb")));
    }

    #[test]
    fn test_lex_string_escaped_quote_does_not_close() {
        let tokens = lex_all(r#""a\"b""#);
        assert_eq!(tokens[0].kind, TokenKind::Str(Symbol::intern("a\\\"b")));
    }

    #[test]
    fn test_lex_unterminated_string() {
        let mut lexer = Lexer::new("\"abc\nrest", "test.vega");
        let token = lexer.next_token();
        assert_eq!(token.kind, TokenKind::Error);
        assert!(lexer.has_error());
        assert_eq!(lexer.error_message(), Some("Unterminated string"));
        // Still safe to keep lexing.
        assert_eq!(lexer.next_token().kind, TokenKind::Ident(Symbol::intern("rest")));
    }

    #[test]
    fn test_lex_lone_ampersand() {
        let mut lexer = Lexer::new("a & b", "test.vega");
        lexer.next_token();
        let token = lexer.next_token();
        assert_eq!(token.kind, TokenKind::Error);
        assert_eq!(lexer.error_message(), Some("Expected '&&'"));
    }

    #[test]
    fn test_lex_lone_pipe() {
        let mut lexer = Lexer::new("|", "test.vega");
        assert_eq!(lexer.next_token().kind, TokenKind::Error);
        assert_eq!(lexer.error_message(), Some("Expected '||'"));
    }

    #[test]
    fn test_lex_unexpected_character() {
        let mut lexer = Lexer::new("@", "test.vega");
        assert_eq!(lexer.next_token().kind, TokenKind::Error);
        assert_eq!(lexer.error_message(), Some("Unexpected character '@'"));
    }

    #[test]
    fn test_lex_first_error_wins() {
        let mut lexer = Lexer::new("@ #", "test.vega");
        lexer.next_token();
        lexer.next_token();
        assert_eq!(lexer.error_message(), Some("Unexpected character '@'"));
    }

    #[test]
    fn test_lex_comments_skipped() {
        assert_eq!(
            kinds("1 // comment\n2 /* block\ncomment */ 3"),
            vec![TokenKind::Int(1), TokenKind::Int(2), TokenKind::Int(3)]
        );
    }

    #[test]
    fn test_lex_unterminated_block_comment() {
        let mut lexer = Lexer::new("1 /* never closed", "test.vega");
        assert_eq!(lexer.next_token().kind, TokenKind::Int(1));
        assert_eq!(lexer.next_token().kind, TokenKind::Error);
        assert_eq!(lexer.error_message(), Some("Unterminated block comment"));
    }

    #[test]
    fn test_lex_line_and_column_tracking() {
        let tokens = lex_all("a\n  b");
        assert_eq!((tokens[0].span.line, tokens[0].span.column), (1, 1));
        assert_eq!((tokens[1].span.line, tokens[1].span.column), (2, 3));
    }

    #[test]
    fn test_lex_peek_equals_next() {
        let source = "fn main() { let x = 1.5; x <- \"hi\"; }";
        let mut lexer = Lexer::new(source, "test.vega");
        loop {
            let peeked = lexer.peek_token();
            let next = lexer.next_token();
            assert_eq!(peeked, next);
            if next.is_eof() {
                break;
            }
        }
    }

    #[test]
    fn test_lex_span_matches_source_text() {
        let source = "fn greet(name: str) -> str { return name; }";
        for token in Lexer::new(source, "test.vega") {
            let text = token.span.text(source);
            match token.kind {
                TokenKind::Ident(sym) => assert_eq!(text, sym.as_str()),
                TokenKind::Fn => assert_eq!(text, "fn"),
                TokenKind::Return => assert_eq!(text, "return"),
                TokenKind::Arrow => assert_eq!(text, "->"),
                TokenKind::TyStr => assert_eq!(text, "str"),
                _ => {}
            }
        }
    }

    #[test]
    fn test_lex_eof_is_stable() {
        let mut lexer = Lexer::new("", "test.vega");
        assert!(lexer.next_token().is_eof());
        assert!(lexer.next_token().is_eof());
        assert!(!lexer.has_error());
    }
}
