//! Statement parsing: let, if, while, for, return, break, continue,
//! blocks, expression statements, and statement-level assignment.

use crate::ast::*;
use crate::Parser;
use vegac_lex::TokenKind;

impl<'a> Parser<'a> {
    /// Parse a statement.
    pub fn parse_statement(&mut self) -> Option<Stmt> {
        let span = self.current_span();
        match self.current_kind() {
            TokenKind::Let => {
                let kind = self.parse_let()?;
                Some(Stmt { kind, span })
            }
            TokenKind::If => {
                let kind = self.parse_if()?;
                Some(Stmt { kind, span })
            }
            TokenKind::While => {
                let kind = self.parse_while()?;
                Some(Stmt { kind, span })
            }
            TokenKind::For => {
                let kind = self.parse_for()?;
                Some(Stmt { kind, span })
            }
            TokenKind::Return => {
                let kind = self.parse_return()?;
                Some(Stmt { kind, span })
            }
            TokenKind::Break => {
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Some(Stmt {
                    kind: StmtKind::Break,
                    span,
                })
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Some(Stmt {
                    kind: StmtKind::Continue,
                    span,
                })
            }
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                Some(Stmt {
                    kind: StmtKind::Block(block),
                    span,
                })
            }
            _ => self.parse_expr_or_assign(span),
        }
    }

    /// `let name [: ty] [= init];`
    fn parse_let(&mut self) -> Option<StmtKind> {
        self.advance(); // let
        let name = self.expect_ident("variable name after 'let'")?;

        let ty = if self.match_token(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let init = if self.match_token(TokenKind::Eq) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        self.expect(TokenKind::Semicolon)?;
        Some(StmtKind::Let(LetStmt { name, ty, init }))
    }

    /// `if cond { … } [else if … | else { … }]`
    fn parse_if(&mut self) -> Option<StmtKind> {
        self.advance(); // if
        let cond = self.parse_expression()?;
        let then_block = self.parse_block()?;

        let else_branch = if self.match_token(TokenKind::Else) {
            if self.current_kind() == TokenKind::If {
                // `else if` chains as a nested if statement.
                let nested = self.parse_statement()?;
                Some(ElseBranch::If(Box::new(nested)))
            } else {
                Some(ElseBranch::Block(self.parse_block()?))
            }
        } else {
            None
        };

        Some(StmtKind::If(IfStmt {
            cond,
            then_block,
            else_branch,
        }))
    }

    /// `while cond { … }`
    fn parse_while(&mut self) -> Option<StmtKind> {
        self.advance(); // while
        let cond = self.parse_expression()?;
        let body = self.parse_block()?;
        Some(StmtKind::While(WhileStmt { cond, body }))
    }

    /// `for (init; cond; update) { … }` - each header slot may be empty.
    fn parse_for(&mut self) -> Option<StmtKind> {
        self.advance(); // for
        self.expect(TokenKind::LParen)?;

        let init = if self.match_token(TokenKind::Semicolon) {
            None
        } else {
            let span = self.current_span();
            let stmt = if self.current_kind() == TokenKind::Let {
                let kind = self.parse_let()?;
                Stmt { kind, span }
            } else {
                // An expression or assignment; consumes its semicolon.
                self.parse_expr_or_assign(span)?
            };
            Some(Box::new(stmt))
        };

        let cond = if self.current_kind() == TokenKind::Semicolon {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon)?;

        let update = if self.current_kind() == TokenKind::RParen {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::RParen)?;

        let body = self.parse_block()?;
        Some(StmtKind::For(ForStmt {
            init,
            cond,
            update,
            body,
        }))
    }

    /// `return [value];`
    fn parse_return(&mut self) -> Option<StmtKind> {
        self.advance(); // return
        let value = if self.current_kind() == TokenKind::Semicolon {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon)?;
        Some(StmtKind::Return(value))
    }

    /// A brace-delimited statement list.
    pub(crate) fn parse_block(&mut self) -> Option<Block> {
        let span = self.current_span();
        self.expect(TokenKind::LBrace)?;

        let mut stmts = Vec::new();
        while !matches!(self.current_kind(), TokenKind::RBrace | TokenKind::Eof) {
            match self.parse_statement() {
                Some(stmt) => stmts.push(stmt),
                None => self.recover(),
            }
        }

        self.expect(TokenKind::RBrace)?;
        Some(Block { stmts, span })
    }

    /// An expression statement, or a statement-level assignment when the
    /// expression is followed by `=`.
    ///
    /// A `match` in statement position does not require a trailing
    /// semicolon; every other expression statement does. Chained
    /// assignment is rejected here because the assigned value is a plain
    /// expression, which `=` can never continue.
    pub(crate) fn parse_expr_or_assign(&mut self, span: vegac_util::Span) -> Option<Stmt> {
        let expr = self.parse_expression()?;

        if self.match_token(TokenKind::Eq) {
            let value = self.parse_expression()?;
            self.expect(TokenKind::Semicolon)?;
            return Some(Stmt {
                kind: StmtKind::Assign(AssignStmt {
                    target: expr,
                    value,
                }),
                span,
            });
        }

        if matches!(expr.kind, ExprKind::Match(_)) {
            self.match_token(TokenKind::Semicolon);
        } else {
            self.expect(TokenKind::Semicolon)?;
        }

        Some(Stmt {
            kind: StmtKind::Expr(expr),
            span,
        })
    }
}
