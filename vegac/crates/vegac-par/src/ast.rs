//! AST node definitions for the Vega language.
//!
//! Three node families: declarations, statements, and expressions, each a
//! `{ kind, span }` struct over a tagged kind enum. The [`Program`] root
//! owns the whole tree; later stages borrow it and never mutate it.

use std::fmt;
use vegac_util::{Span, Symbol};

/// A parsed source file: the tree root.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// File the program was parsed from, for diagnostics.
    pub file: String,
    /// Top-level declarations in source order.
    pub decls: Vec<Decl>,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub kind: DeclKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    /// `import "path" [as alias];`
    Import(ImportDecl),
    /// `agent Name { model "…"; system "…"; temperature N; tool … }`
    Agent(AgentDecl),
    /// `fn name(params) [-> T] { … }`
    Function(FunctionDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    /// Import path as written, without the `.vega` suffix.
    pub path: Symbol,
    /// Optional `as` alias.
    pub alias: Option<Symbol>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentDecl {
    pub name: Symbol,
    /// Model identifier; required for a well-formed agent, checked during
    /// semantic analysis.
    pub model: Option<Symbol>,
    /// Optional system prompt.
    pub system: Option<Symbol>,
    /// Sampling temperature, 0.7 unless declared.
    pub temperature: f64,
    /// Tools in declaration order.
    pub tools: Vec<FunctionDecl>,
}

/// A function or tool declaration. Tools share this shape and live in
/// [`AgentDecl::tools`].
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Symbol,
    pub params: Vec<Param>,
    pub ret: Option<TypeAnn>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Symbol,
    pub ty: TypeAnn,
    pub span: Span,
}

/// A written type annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAnn {
    pub name: TypeName,
    /// `[]` suffix.
    pub is_array: bool,
    /// Inner `(ok, err)` types of a `Result(T, E)` annotation.
    pub result_inner: Option<Box<(TypeAnn, TypeAnn)>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeName {
    Int,
    Float,
    Bool,
    Str,
    Void,
    Result,
    /// A user agent type, by declared name.
    Agent(Symbol),
}

impl fmt::Display for TypeAnn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            TypeName::Int => write!(f, "int")?,
            TypeName::Float => write!(f, "float")?,
            TypeName::Bool => write!(f, "bool")?,
            TypeName::Str => write!(f, "str")?,
            TypeName::Void => write!(f, "void")?,
            TypeName::Result => write!(f, "Result")?,
            TypeName::Agent(name) => write!(f, "{}", name)?,
        }
        if self.is_array {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

/// A brace-delimited statement list.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// An expression in statement position.
    Expr(Expr),
    /// `let name [: ty] [= init];`
    Let(LetStmt),
    /// `target = value;` - assignment is statement-level, not an operator.
    Assign(AssignStmt),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    /// `return [value];`
    Return(Option<Expr>),
    Break,
    Continue,
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LetStmt {
    pub name: Symbol,
    pub ty: Option<TypeAnn>,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub target: Expr,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_block: Block,
    pub else_branch: Option<ElseBranch>,
}

/// The `else` side of an `if`: either a chained `else if` or a block.
#[derive(Debug, Clone, PartialEq)]
pub enum ElseBranch {
    If(Box<Stmt>),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Block,
}

/// `for (init; cond; update) { … }` - every header slot optional.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub init: Option<Box<Stmt>>,
    pub cond: Option<Expr>,
    pub update: Option<Expr>,
    pub body: Block,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Float(f64),
    /// Raw un-escaped string payload; decoded at emission.
    Str(Symbol),
    Bool(bool),
    Null,
    /// `[e1, e2, …]`
    Array(Vec<Expr>),
    /// An identifier; also carries collapsed `module::function` names.
    Ident(Symbol),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Call(CallExpr),
    MethodCall(MethodCallExpr),
    Field(FieldExpr),
    Index(IndexExpr),
    Spawn(SpawnExpr),
    Send(SendExpr),
    /// `await operand`
    Await(Box<Expr>),
    /// `Ok(value)`
    ResultOk(Box<Expr>),
    /// `Err(value)`
    ResultErr(Box<Expr>),
    Match(MatchExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnOp,
    pub operand: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodCallExpr {
    pub object: Box<Expr>,
    pub method: Symbol,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldExpr {
    pub object: Box<Expr>,
    pub field: Symbol,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpr {
    pub object: Box<Expr>,
    pub index: Box<Expr>,
}

/// `spawn [async] Agent [supervised by { … }]`
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnExpr {
    pub agent: Symbol,
    pub is_async: bool,
    pub supervision: Option<SupervisionConfig>,
}

/// `target <- payload` (sync) or `target <~ payload` (async).
#[derive(Debug, Clone, PartialEq)]
pub struct SendExpr {
    pub target: Box<Expr>,
    pub payload: Box<Expr>,
    pub is_async: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchExpr {
    pub scrutinee: Box<Expr>,
    pub arms: Vec<MatchArm>,
}

/// One arm of a `match`: `Ok(binding) => body` or `Err(binding) => body`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub is_ok: bool,
    pub binding: Symbol,
    pub body: Expr,
    pub span: Span,
}

/// Restart policy attached to a supervised spawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupervisionConfig {
    pub strategy: SupervisionStrategy,
    pub max_restarts: u32,
    pub window_ms: u32,
}

impl Default for SupervisionConfig {
    fn default() -> Self {
        Self {
            strategy: SupervisionStrategy::Restart,
            max_restarts: 3,
            window_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisionStrategy {
    Restart,
    Stop,
    Escalate,
    RestartAll,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ann_display() {
        let span = Span::DUMMY;
        let ann = TypeAnn {
            name: TypeName::Str,
            is_array: false,
            result_inner: None,
            span,
        };
        assert_eq!(ann.to_string(), "str");

        let arr = TypeAnn {
            name: TypeName::Int,
            is_array: true,
            result_inner: None,
            span,
        };
        assert_eq!(arr.to_string(), "int[]");

        let agent = TypeAnn {
            name: TypeName::Agent(Symbol::intern("Greeter")),
            is_array: false,
            result_inner: None,
            span,
        };
        assert_eq!(agent.to_string(), "Greeter");
    }

    #[test]
    fn test_supervision_defaults() {
        let config = SupervisionConfig::default();
        assert_eq!(config.strategy, SupervisionStrategy::Restart);
        assert_eq!(config.max_restarts, 3);
        assert_eq!(config.window_ms, 60_000);
    }
}
