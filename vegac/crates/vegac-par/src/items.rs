//! Declaration parsing: imports, agents, functions, tools, and types.

use crate::ast::*;
use crate::Parser;
use vegac_lex::TokenKind;

impl<'a> Parser<'a> {
    /// Parse a top-level declaration: `import`, `agent`, or `fn`.
    pub fn parse_declaration(&mut self) -> Option<Decl> {
        let span = self.current_span();
        match self.current_kind() {
            TokenKind::Import => {
                let kind = self.parse_import()?;
                Some(Decl { kind, span })
            }
            TokenKind::Agent => {
                let kind = self.parse_agent()?;
                Some(Decl { kind, span })
            }
            TokenKind::Fn => {
                self.advance();
                let func = self.parse_callable(span)?;
                Some(Decl {
                    kind: DeclKind::Function(func),
                    span,
                })
            }
            _ => {
                self.error_at_current(format!(
                    "Expected declaration, found {}",
                    self.current_kind().describe()
                ));
                None
            }
        }
    }

    /// `import "path" [as alias];`
    fn parse_import(&mut self) -> Option<DeclKind> {
        self.advance(); // import
        let path = self.expect_string("import path")?;
        let alias = if self.match_token(TokenKind::As) {
            Some(self.expect_ident("import alias")?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;
        Some(DeclKind::Import(ImportDecl { path, alias }))
    }

    /// `agent Name { … }` with an unordered body of `model`, `system`,
    /// `temperature`, and `tool` forms.
    fn parse_agent(&mut self) -> Option<DeclKind> {
        self.advance(); // agent
        let name = self.expect_ident("agent name")?;
        self.expect(TokenKind::LBrace)?;

        let mut model = None;
        let mut system = None;
        let mut temperature = 0.7;
        let mut tools = Vec::new();

        while !matches!(self.current_kind(), TokenKind::RBrace | TokenKind::Eof) {
            match self.current_kind() {
                TokenKind::Model => {
                    self.advance();
                    model = Some(self.expect_string("model string")?);
                    self.expect(TokenKind::Semicolon)?;
                }
                TokenKind::System => {
                    self.advance();
                    system = Some(self.expect_string("system prompt string")?);
                    self.expect(TokenKind::Semicolon)?;
                }
                TokenKind::Temperature => {
                    self.advance();
                    temperature = self.parse_number_literal("temperature value")?;
                    self.expect(TokenKind::Semicolon)?;
                }
                TokenKind::Tool => {
                    let span = self.current_span();
                    self.advance();
                    tools.push(self.parse_callable(span)?);
                }
                _ => {
                    self.error_at_current(format!(
                        "Expected 'model', 'system', 'temperature', or 'tool' in agent body, found {}",
                        self.current_kind().describe()
                    ));
                    return None;
                }
            }
        }

        self.expect(TokenKind::RBrace)?;
        Some(DeclKind::Agent(AgentDecl {
            name,
            model,
            system,
            temperature,
            tools,
        }))
    }

    /// Shared body of `fn` and `tool`: name, parameter list, optional
    /// return annotation, block. The keyword has already been consumed.
    pub(crate) fn parse_callable(&mut self, span: vegac_util::Span) -> Option<FunctionDecl> {
        let name = self.expect_ident("function name")?;
        self.expect(TokenKind::LParen)?;

        let mut params = Vec::new();
        if self.current_kind() != TokenKind::RParen {
            loop {
                let param_span = self.current_span();
                let param_name = self.expect_ident("parameter name")?;
                self.expect(TokenKind::Colon)?;
                let ty = self.parse_type()?;
                params.push(Param {
                    name: param_name,
                    ty,
                    span: param_span,
                });
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        let ret = if self.match_token(TokenKind::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let body = self.parse_block()?;
        Some(FunctionDecl {
            name,
            params,
            ret,
            body,
            span,
        })
    }

    /// Parse a type annotation: a built-in or agent name, optional
    /// `Result(ok, err)` inner types, optional `[]` array suffix.
    pub(crate) fn parse_type(&mut self) -> Option<TypeAnn> {
        let span = self.current_span();

        let (name, result_inner) = match self.current_kind() {
            TokenKind::TyInt => {
                self.advance();
                (TypeName::Int, None)
            }
            TokenKind::TyFloat => {
                self.advance();
                (TypeName::Float, None)
            }
            TokenKind::TyBool => {
                self.advance();
                (TypeName::Bool, None)
            }
            TokenKind::TyStr => {
                self.advance();
                (TypeName::Str, None)
            }
            TokenKind::TyVoid => {
                self.advance();
                (TypeName::Void, None)
            }
            TokenKind::TyResult => {
                self.advance();
                let inner = if self.match_token(TokenKind::LParen) {
                    let ok = self.parse_type()?;
                    self.expect(TokenKind::Comma)?;
                    let err = self.parse_type()?;
                    self.expect(TokenKind::RParen)?;
                    Some(Box::new((ok, err)))
                } else {
                    None
                };
                (TypeName::Result, inner)
            }
            TokenKind::Ident(sym) => {
                self.advance();
                (TypeName::Agent(sym), None)
            }
            _ => {
                self.error_at_current(format!(
                    "Expected type, found {}",
                    self.current_kind().describe()
                ));
                return None;
            }
        };

        let is_array = if self.current_kind() == TokenKind::LBracket
            && self.peek_kind() == TokenKind::RBracket
        {
            self.advance();
            self.advance();
            true
        } else {
            false
        };

        Some(TypeAnn {
            name,
            is_array,
            result_inner,
            span,
        })
    }

    /// An integer or float literal read as f64.
    pub(crate) fn parse_number_literal(&mut self, what: &str) -> Option<f64> {
        match self.current_kind() {
            TokenKind::Int(v) => {
                self.advance();
                Some(v as f64)
            }
            TokenKind::Float(v) => {
                self.advance();
                Some(v)
            }
            _ => {
                self.error_at_current(format!(
                    "Expected {}, found {}",
                    what,
                    self.current_kind().describe()
                ));
                None
            }
        }
    }

    /// An integer literal.
    pub(crate) fn parse_int_literal(&mut self, what: &str) -> Option<i64> {
        match self.current_kind() {
            TokenKind::Int(v) => {
                self.advance();
                Some(v)
            }
            _ => {
                self.error_at_current(format!(
                    "Expected {}, found {}",
                    what,
                    self.current_kind().describe()
                ));
                None
            }
        }
    }
}
