//! Expression parsing using Pratt-style operator precedence.
//!
//! # Precedence (lowest to highest)
//!
//! | Level | Operators | Associativity |
//! |-------|-----------|---------------|
//! | 1 | `\|\|` | Left |
//! | 2 | `&&` | Left |
//! | 3 | `==`, `!=` | Left |
//! | 4 | `<`, `<=`, `>`, `>=` | Left |
//! | 5 | `+`, `-` | Left |
//! | 6 | `*`, `/`, `%` | Left |
//! | 7 | unary `-`, `!`, `await` | Prefix |
//! | 8 | `<-`, `<~` (message send) | Left |
//! | 9 | call, `.`, index | Postfix |
//!
//! Assignment is not an expression operator; it is handled at statement
//! level. `module::function` is collapsed at primary level into a single
//! identifier carrying the qualified name.

use crate::ast::*;
use crate::Parser;
use vegac_lex::TokenKind;
use vegac_util::{Span, Symbol};

/// Binding power levels for Pratt parsing.
/// Higher numbers bind tighter.
pub mod bp {
    /// Minimum binding power (start of expression).
    pub const MIN: u8 = 0;

    /// Logical OR: `||`
    pub const OR: u8 = 2;

    /// Logical AND: `&&`
    pub const AND: u8 = 4;

    /// Equality: `==`, `!=`
    pub const EQUALITY: u8 = 6;

    /// Comparison: `<`, `<=`, `>`, `>=`
    pub const COMPARISON: u8 = 8;

    /// Additive: `+`, `-`
    pub const ADDITIVE: u8 = 10;

    /// Multiplicative: `*`, `/`, `%`
    pub const MULTIPLICATIVE: u8 = 12;

    /// Prefix operators: unary `-`, `!`, `await`
    pub const UNARY: u8 = 14;

    /// Message send: `<-`, `<~` (between unary and call)
    pub const SEND: u8 = 16;
}

/// An infix operator recognized by the Pratt loop.
enum InfixOp {
    Binary(BinOp),
    Send { is_async: bool },
}

impl<'a> Parser<'a> {
    /// Parse a complete expression.
    pub fn parse_expression(&mut self) -> Option<Expr> {
        self.parse_expr_bp(bp::MIN)
    }

    /// Pratt core: parse an expression consuming only operators whose left
    /// binding power is at least `min_bp`. Left-associative operators use
    /// `right_bp = left_bp + 1`.
    fn parse_expr_bp(&mut self, min_bp: u8) -> Option<Expr> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let Some((lbp, rbp, op)) = self.infix_binding_power() else {
                break;
            };
            if lbp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expr_bp(rbp)?;

            let span = lhs.span;
            lhs = match op {
                InfixOp::Binary(op) => Expr {
                    kind: ExprKind::Binary(BinaryExpr {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    }),
                    span,
                },
                InfixOp::Send { is_async } => Expr {
                    kind: ExprKind::Send(SendExpr {
                        target: Box::new(lhs),
                        payload: Box::new(rhs),
                        is_async,
                    }),
                    span,
                },
            };
        }

        Some(lhs)
    }

    /// Binding powers for the current token as an infix operator.
    fn infix_binding_power(&self) -> Option<(u8, u8, InfixOp)> {
        let (lbp, op) = match self.current_kind() {
            TokenKind::OrOr => (bp::OR, InfixOp::Binary(BinOp::Or)),
            TokenKind::AndAnd => (bp::AND, InfixOp::Binary(BinOp::And)),
            TokenKind::EqEq => (bp::EQUALITY, InfixOp::Binary(BinOp::Eq)),
            TokenKind::NotEq => (bp::EQUALITY, InfixOp::Binary(BinOp::Ne)),
            TokenKind::Lt => (bp::COMPARISON, InfixOp::Binary(BinOp::Lt)),
            TokenKind::LtEq => (bp::COMPARISON, InfixOp::Binary(BinOp::Le)),
            TokenKind::Gt => (bp::COMPARISON, InfixOp::Binary(BinOp::Gt)),
            TokenKind::GtEq => (bp::COMPARISON, InfixOp::Binary(BinOp::Ge)),
            TokenKind::Plus => (bp::ADDITIVE, InfixOp::Binary(BinOp::Add)),
            TokenKind::Minus => (bp::ADDITIVE, InfixOp::Binary(BinOp::Sub)),
            TokenKind::Star => (bp::MULTIPLICATIVE, InfixOp::Binary(BinOp::Mul)),
            TokenKind::Slash => (bp::MULTIPLICATIVE, InfixOp::Binary(BinOp::Div)),
            TokenKind::Percent => (bp::MULTIPLICATIVE, InfixOp::Binary(BinOp::Mod)),
            TokenKind::Send => (bp::SEND, InfixOp::Send { is_async: false }),
            TokenKind::SendAsync => (bp::SEND, InfixOp::Send { is_async: true }),
            _ => return None,
        };
        Some((lbp, lbp + 1, op))
    }

    /// A prefix expression: unary operator, `await`, or a primary followed
    /// by its postfix chain.
    fn parse_prefix(&mut self) -> Option<Expr> {
        let span = self.current_span();
        match self.current_kind() {
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_expr_bp(bp::UNARY)?;
                Some(Expr {
                    kind: ExprKind::Unary(UnaryExpr {
                        op: UnOp::Neg,
                        operand: Box::new(operand),
                    }),
                    span,
                })
            }
            TokenKind::Not => {
                self.advance();
                let operand = self.parse_expr_bp(bp::UNARY)?;
                Some(Expr {
                    kind: ExprKind::Unary(UnaryExpr {
                        op: UnOp::Not,
                        operand: Box::new(operand),
                    }),
                    span,
                })
            }
            TokenKind::Await => {
                self.advance();
                let operand = self.parse_expr_bp(bp::UNARY)?;
                Some(Expr {
                    kind: ExprKind::Await(Box::new(operand)),
                    span,
                })
            }
            _ => {
                let primary = self.parse_primary()?;
                self.parse_postfix(primary)
            }
        }
    }

    /// Postfix chain: calls, method calls, field access, indexing.
    fn parse_postfix(&mut self, mut expr: Expr) -> Option<Expr> {
        loop {
            let span = expr.span;
            match self.current_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_args()?;
                    expr = Expr {
                        kind: ExprKind::Call(CallExpr {
                            callee: Box::new(expr),
                            args,
                        }),
                        span,
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_ident("method or field name after '.'")?;
                    if self.match_token(TokenKind::LParen) {
                        let args = self.parse_args()?;
                        expr = Expr {
                            kind: ExprKind::MethodCall(MethodCallExpr {
                                object: Box::new(expr),
                                method: name,
                                args,
                            }),
                            span,
                        };
                    } else {
                        expr = Expr {
                            kind: ExprKind::Field(FieldExpr {
                                object: Box::new(expr),
                                field: name,
                            }),
                            span,
                        };
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RBracket)?;
                    expr = Expr {
                        kind: ExprKind::Index(IndexExpr {
                            object: Box::new(expr),
                            index: Box::new(index),
                        }),
                        span,
                    };
                }
                _ => break,
            }
        }
        Some(expr)
    }

    /// A comma-separated argument list; the opening `(` is consumed.
    fn parse_args(&mut self) -> Option<Vec<Expr>> {
        let mut args = Vec::new();
        if self.current_kind() != TokenKind::RParen {
            loop {
                args.push(self.parse_expression()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        Some(args)
    }

    /// A primary expression.
    fn parse_primary(&mut self) -> Option<Expr> {
        let span = self.current_span();
        match self.current_kind() {
            TokenKind::Int(value) => {
                self.advance();
                Some(Expr {
                    kind: ExprKind::Int(value),
                    span,
                })
            }
            TokenKind::Float(value) => {
                self.advance();
                Some(Expr {
                    kind: ExprKind::Float(value),
                    span,
                })
            }
            TokenKind::Str(value) => {
                self.advance();
                Some(Expr {
                    kind: ExprKind::Str(value),
                    span,
                })
            }
            TokenKind::True => {
                self.advance();
                Some(Expr {
                    kind: ExprKind::Bool(true),
                    span,
                })
            }
            TokenKind::False => {
                self.advance();
                Some(Expr {
                    kind: ExprKind::Bool(false),
                    span,
                })
            }
            TokenKind::Null => {
                self.advance();
                Some(Expr {
                    kind: ExprKind::Null,
                    span,
                })
            }
            TokenKind::Ident(sym) => {
                self.advance();
                let name = self.collapse_qualified(sym)?;
                Some(Expr {
                    kind: ExprKind::Ident(name),
                    span,
                })
            }
            // A type keyword can head a std-lib call such as `str::len`.
            TokenKind::TyInt
            | TokenKind::TyFloat
            | TokenKind::TyBool
            | TokenKind::TyStr
            | TokenKind::TyVoid
            | TokenKind::TyResult
                if self.peek_kind() == TokenKind::ColonColon =>
            {
                let head = match self.current_kind() {
                    TokenKind::TyInt => "int",
                    TokenKind::TyFloat => "float",
                    TokenKind::TyBool => "bool",
                    TokenKind::TyStr => "str",
                    TokenKind::TyVoid => "void",
                    _ => "Result",
                };
                self.advance();
                let name = self.collapse_qualified(Symbol::intern(head))?;
                Some(Expr {
                    kind: ExprKind::Ident(name),
                    span,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Some(expr)
            }
            TokenKind::LBracket => self.parse_array_literal(span),
            TokenKind::Spawn => self.parse_spawn(span),
            TokenKind::Ok => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let value = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Some(Expr {
                    kind: ExprKind::ResultOk(Box::new(value)),
                    span,
                })
            }
            TokenKind::Err => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let value = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Some(Expr {
                    kind: ExprKind::ResultErr(Box::new(value)),
                    span,
                })
            }
            TokenKind::Match => self.parse_match(span),
            _ => {
                self.error_at_current(format!(
                    "Expected expression, found {}",
                    self.current_kind().describe()
                ));
                None
            }
        }
    }

    /// Collapse `a::b` (and further `::` segments) into one identifier
    /// symbol carrying the qualified name.
    fn collapse_qualified(&mut self, first: Symbol) -> Option<Symbol> {
        let mut name = first;
        while self.current_kind() == TokenKind::ColonColon {
            self.advance();
            let next = self.expect_ident("function name after '::'")?;
            name = Symbol::intern(&format!("{}::{}", name.as_str(), next.as_str()));
        }
        Some(name)
    }

    /// `[e1, e2, …]` with optional trailing comma.
    fn parse_array_literal(&mut self, span: Span) -> Option<Expr> {
        self.advance(); // [
        let mut elements = Vec::new();
        while self.current_kind() != TokenKind::RBracket {
            elements.push(self.parse_expression()?);
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;
        Some(Expr {
            kind: ExprKind::Array(elements),
            span,
        })
    }

    /// `spawn [async] Agent [supervised by { … }]`, where `async` may
    /// appear before or after the agent name but not both.
    fn parse_spawn(&mut self, span: Span) -> Option<Expr> {
        self.advance(); // spawn
        let mut is_async = self.match_token(TokenKind::Async);
        let agent = self.expect_ident("agent name after 'spawn'")?;

        if self.current_kind() == TokenKind::Async {
            if is_async {
                self.error_at_current("Duplicate 'async' in spawn");
                return None;
            }
            self.advance();
            is_async = true;
        }

        let supervision = if self.match_token(TokenKind::Supervised) {
            self.expect(TokenKind::By)?;
            Some(self.parse_supervision_config()?)
        } else {
            None
        };

        Some(Expr {
            kind: ExprKind::Spawn(SpawnExpr {
                agent,
                is_async,
                supervision,
            }),
            span,
        })
    }

    /// `{ strategy: …, max_restarts: N, window: N }` with defaults for
    /// omitted keys; a repeated key takes its last occurrence.
    fn parse_supervision_config(&mut self) -> Option<SupervisionConfig> {
        self.expect(TokenKind::LBrace)?;
        let mut config = SupervisionConfig::default();

        while self.current_kind() != TokenKind::RBrace {
            let key_span = self.current_span();
            let key = self.expect_ident("supervision key")?;
            self.expect(TokenKind::Colon)?;

            match key.as_str() {
                "strategy" => {
                    let value_span = self.current_span();
                    let value = self.expect_ident("supervision strategy")?;
                    config.strategy = match value.as_str() {
                        "restart" => SupervisionStrategy::Restart,
                        "stop" => SupervisionStrategy::Stop,
                        "escalate" => SupervisionStrategy::Escalate,
                        "restart_all" => SupervisionStrategy::RestartAll,
                        other => {
                            self.error_at(
                                format!("Unknown supervision strategy '{}'", other),
                                value_span,
                            );
                            return None;
                        }
                    };
                }
                "max_restarts" => {
                    config.max_restarts = self.parse_int_literal("'max_restarts' value")? as u32;
                }
                "window" => {
                    config.window_ms = self.parse_int_literal("'window' value")? as u32;
                }
                other => {
                    self.error_at(format!("Unknown supervision key '{}'", other), key_span);
                    return None;
                }
            }

            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }

        self.expect(TokenKind::RBrace)?;
        Some(config)
    }

    /// `match scrutinee { Ok(x) => expr, Err(e) => expr }` with an optional
    /// trailing comma.
    fn parse_match(&mut self, span: Span) -> Option<Expr> {
        self.advance(); // match
        let scrutinee = self.parse_expression()?;
        self.expect(TokenKind::LBrace)?;

        let mut arms = Vec::new();
        while !matches!(self.current_kind(), TokenKind::RBrace | TokenKind::Eof) {
            let arm_span = self.current_span();
            let is_ok = match self.current_kind() {
                TokenKind::Ok => true,
                TokenKind::Err => false,
                _ => {
                    self.error_at_current(format!(
                        "Expected 'Ok' or 'Err' match arm, found {}",
                        self.current_kind().describe()
                    ));
                    return None;
                }
            };
            self.advance();
            self.expect(TokenKind::LParen)?;
            let binding = self.expect_ident("match arm binding")?;
            self.expect(TokenKind::RParen)?;
            self.expect(TokenKind::FatArrow)?;
            let body = self.parse_expression()?;
            arms.push(MatchArm {
                is_ok,
                binding,
                body,
                span: arm_span,
            });

            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }

        self.expect(TokenKind::RBrace)?;
        Some(Expr {
            kind: ExprKind::Match(MatchExpr {
                scrutinee: Box::new(scrutinee),
                arms,
            }),
            span,
        })
    }
}
