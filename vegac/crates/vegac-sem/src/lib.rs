//! vegac-sem - Semantic analysis for the Vega language.
//!
//! The analyzer runs two passes over a parsed program. A pre-pass
//! registers every top-level function and agent in the global scope so
//! forward and mutual references resolve without ordering constraints;
//! the typing pass then walks declaration bodies with a scope stack,
//! checking the typing rules and recording only the first error (the
//! `unknown` type suppresses cascades after that).
//!
//! Imports are resolved before either pass: each `import` is looked up
//! against the importing file's directory or the ordered search paths,
//! read, parsed, and cached under its canonical path. A module whose
//! `analyzing` flag is still set when imported again is a circular import.
//! Loaded module trees are retained for the emitter.

pub mod modules;
pub mod scope;
pub mod types;

pub use modules::{resolve_import, Module, ModuleCache};
pub use scope::{ScopeStack, SymbolKind, SymbolRecord};
pub use types::Type;

use std::fs;
use std::path::{Path, PathBuf};

use vegac_lex::Lexer;
use vegac_par::{
    AgentDecl, Block, DeclKind, ElseBranch, Expr, ExprKind, FunctionDecl, ImportDecl, Parser,
    Program, Stmt, StmtKind,
};
use vegac_util::{Diagnostic, Handler, Span, Symbol};

/// Return type of a `module::function` standard-library call.
///
/// The module prefix selects a small table; the function component is
/// matched by substring. Unknown modules stay polymorphic.
pub fn stdlib_return_type(name: &str) -> Type {
    let Some((module, func)) = name.split_once("::") else {
        return Type::Unknown;
    };
    match module {
        "str" => {
            if func.contains("len") {
                Type::Int
            } else if func.contains("split") {
                Type::Array(Box::new(Type::Str))
            } else {
                Type::Str
            }
        }
        "json" => {
            if func.contains("int") {
                Type::Int
            } else if func.contains("float") {
                Type::Float
            } else {
                Type::Str
            }
        }
        "http" => Type::Str,
        _ => Type::Unknown,
    }
}

/// The semantic analyzer.
///
/// One analyzer checks one main program (plus its imported modules); a
/// fresh compilation builds a fresh analyzer.
pub struct Analyzer<'a> {
    handler: &'a Handler,

    /// Scope stack; frame 0 is the global scope.
    pub scopes: ScopeStack,

    /// Loaded modules, keyed by canonical path.
    cache: ModuleCache,

    /// Ordered module search paths.
    search_paths: Vec<PathBuf>,

    /// Declared return type of the function being checked.
    current_ret: Option<Type>,

    /// Nesting depth of loops in the current function.
    loop_depth: usize,

    /// File the typing pass attributes diagnostics to.
    file: String,

    /// First error of this stage, if any.
    first_error: Option<(String, Span)>,
}

impl<'a> Analyzer<'a> {
    /// Create an analyzer reporting into `handler`.
    pub fn new(handler: &'a Handler) -> Self {
        Self {
            handler,
            scopes: ScopeStack::new(),
            cache: ModuleCache::new(),
            search_paths: Vec::new(),
            current_ret: None,
            loop_depth: 0,
            file: String::new(),
            first_error: None,
        }
    }

    /// Append a module search path. Paths are tried in insertion order.
    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    /// Analyze `program`, read from `source_path`.
    ///
    /// Returns `true` when no semantic error was found. Warnings (such as
    /// a missing `main`) do not fail the analysis.
    pub fn analyze(&mut self, program: &Program, source_path: &Path) -> bool {
        self.file = program.file.clone();
        let current_dir = source_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        if !self.process_imports(program, &current_dir, &program.file) {
            return false;
        }

        self.register_globals(program);

        for decl in &program.decls {
            match &decl.kind {
                DeclKind::Import(_) => {}
                DeclKind::Function(func) => self.check_function(func),
                DeclKind::Agent(agent) => self.check_agent(agent, decl.span),
            }
        }

        let has_main = matches!(
            self.scopes.lookup(Symbol::intern("main")),
            Some(record) if record.kind == SymbolKind::Function
        );
        if !has_main {
            self.handler.emit(Diagnostic::warning(
                &self.file,
                "no 'main' function defined",
                Span::DUMMY,
            ));
        }

        self.first_error.is_none()
    }

    /// Imported module trees, in load order, for subsequent emission.
    pub fn module_programs(&self) -> Vec<&Program> {
        self.cache.programs()
    }

    /// Whether a semantic error has been recorded.
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
    // Error reporting
    // =========================================================================

    /// Record an error against the current file. Only the first error of
    /// the stage is reported; `unknown` results keep later checks quiet.
    fn error(&mut self, message: impl Into<String>, span: Span) {
        let file = self.file.clone();
        self.error_in(&file, message, span);
    }

    fn error_in(&mut self, file: &str, message: impl Into<String>, span: Span) {
        if self.first_error.is_some() {
            return;
        }
        let message = message.into();
        self.first_error = Some((message.clone(), span));
        self.handler.emit(Diagnostic::error(file, message, span));
    }

    /// Mark the stage failed after a module failed to parse. The parser
    /// already emitted its own diagnostics.
    fn fail_from_parser(&mut self, parser: &Parser<'_>) {
        if self.first_error.is_none() {
            self.first_error = Some((
                parser.error_message().unwrap_or("parse error").to_owned(),
                parser.error_location().unwrap_or(Span::DUMMY),
            ));
        }
    }

    // =========================================================================
    // Module resolution
    // =========================================================================

    fn process_imports(&mut self, program: &Program, current_dir: &Path, importer: &str) -> bool {
        for decl in &program.decls {
            let DeclKind::Import(import) = &decl.kind else {
                continue;
            };
            if !self.load_module(import, decl.span, current_dir, importer) {
                return false;
            }
        }
        true
    }

    fn load_module(
        &mut self,
        import: &ImportDecl,
        span: Span,
        current_dir: &Path,
        importer: &str,
    ) -> bool {
        let path_str = import.path.as_str();
        let Some(canonical) = resolve_import(path_str, current_dir, &self.search_paths) else {
            self.error_in(importer, format!("Module not found: {}", path_str), span);
            return false;
        };

        if let Some(module) = self.cache.get(&canonical) {
            if module.analyzing {
                self.error_in(
                    importer,
                    format!("Circular import detected: {}", path_str),
                    span,
                );
                return false;
            }
            // Already loaded and registered.
            return true;
        }

        let source = match fs::read_to_string(&canonical) {
            Ok(source) => source,
            Err(err) => {
                self.error_in(
                    importer,
                    format!("Cannot read module '{}': {}", path_str, err),
                    span,
                );
                return false;
            }
        };

        let module_file = canonical.display().to_string();
        let program = {
            let lexer = Lexer::new(&source, module_file);
            let mut parser = Parser::new(lexer, self.handler);
            let program = parser.parse_program();
            if parser.has_error() {
                self.fail_from_parser(&parser);
                return false;
            }
            program
        };

        // Insert before recursing so a cycle back into this module is
        // caught by the `analyzing` flag.
        self.cache.insert_analyzing(canonical.clone(), source);

        let module_dir = canonical
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        if !self.process_imports(&program, &module_dir, &program.file) {
            return false;
        }

        self.register_globals(&program);

        let module = self
            .cache
            .get_mut(&canonical)
            .expect("module inserted above");
        module.program = Some(program);
        module.analyzing = false;
        module.analyzed = true;
        true
    }

    /// Register top-level functions and agents in the global scope. Later
    /// registrations silently shadow earlier ones.
    fn register_globals(&mut self, program: &Program) {
        for decl in &program.decls {
            match &decl.kind {
                DeclKind::Function(func) => {
                    self.scopes.define_global(function_record(
                        func,
                        SymbolKind::Function,
                        decl.span,
                    ));
                }
                DeclKind::Agent(agent) => {
                    self.scopes.define_global(SymbolRecord {
                        name: agent.name,
                        kind: SymbolKind::Agent,
                        ty: Type::Agent(Some(agent.name)),
                        span: decl.span,
                        ret: None,
                        params: Vec::new(),
                        tools: agent.tools.iter().map(|tool| tool.name).collect(),
                    });
                }
                DeclKind::Import(_) => {}
            }
        }
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn check_function(&mut self, func: &FunctionDecl) {
        let ret = func.ret.as_ref().map(Type::from_ann).unwrap_or(Type::Void);

        self.scopes.push();
        for param in &func.params {
            let ty = Type::from_ann(&param.ty);
            let record =
                SymbolRecord::variable(param.name, SymbolKind::Parameter, ty, param.span);
            if !self.scopes.define(record) {
                self.error(
                    format!("Redefinition of parameter '{}'", param.name),
                    param.span,
                );
            }
        }

        let saved_ret = self.current_ret.replace(ret);
        let saved_depth = std::mem::take(&mut self.loop_depth);
        self.check_block(&func.body);
        self.loop_depth = saved_depth;
        self.current_ret = saved_ret;

        self.scopes.pop();
    }

    fn check_agent(&mut self, agent: &AgentDecl, span: Span) {
        if agent.model.is_none() {
            self.error(format!("Agent '{}' is missing a model", agent.name), span);
        }
        if !(0.0..=1.0).contains(&agent.temperature) {
            self.error(
                format!(
                    "Agent '{}' temperature must be between 0.0 and 1.0",
                    agent.name
                ),
                span,
            );
        }

        // Tools resolve through the owning agent: visible to each other
        // inside the agent scope, never at global scope.
        self.scopes.push();
        for tool in &agent.tools {
            let record = function_record(tool, SymbolKind::Tool, tool.span);
            if !self.scopes.define(record) {
                self.error(format!("Redefinition of tool '{}'", tool.name), tool.span);
            }
        }
        for tool in &agent.tools {
            self.check_function(tool);
        }
        self.scopes.pop();
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn check_block(&mut self, block: &Block) {
        self.scopes.push();
        for stmt in &block.stmts {
            self.check_stmt(stmt);
        }
        self.scopes.pop();
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.check_expr(expr);
            }
            StmtKind::Let(let_stmt) => {
                let declared = let_stmt.ty.as_ref().map(Type::from_ann);
                let init_ty = let_stmt.init.as_ref().map(|init| self.check_expr(init));

                let ty = match (declared, init_ty) {
                    (Some(declared), Some(init_ty)) => {
                        if !declared.compatible(&init_ty) {
                            self.error(
                                format!(
                                    "Type mismatch in 'let {}': expected {}, found {}",
                                    let_stmt.name, declared, init_ty
                                ),
                                stmt.span,
                            );
                        }
                        declared
                    }
                    (Some(declared), None) => declared,
                    (None, Some(init_ty)) => init_ty,
                    (None, None) => Type::Unknown,
                };

                let record =
                    SymbolRecord::variable(let_stmt.name, SymbolKind::Variable, ty, stmt.span);
                if !self.scopes.define(record) {
                    self.error(format!("Redefinition of '{}'", let_stmt.name), stmt.span);
                }
            }
            StmtKind::Assign(assign) => {
                if !matches!(
                    assign.target.kind,
                    ExprKind::Ident(_) | ExprKind::Index(_) | ExprKind::Field(_)
                ) {
                    self.error("Invalid assignment target", assign.target.span);
                }
                let target_ty = self.check_expr(&assign.target);
                let value_ty = self.check_expr(&assign.value);
                if !target_ty.compatible(&value_ty) {
                    self.error(
                        format!(
                            "Type mismatch in assignment: expected {}, found {}",
                            target_ty, value_ty
                        ),
                        stmt.span,
                    );
                }
            }
            StmtKind::If(if_stmt) => {
                let cond_ty = self.check_expr(&if_stmt.cond);
                if !cond_ty.is_boolish() {
                    self.error("Condition of 'if' must be a boolean", if_stmt.cond.span);
                }
                self.check_block(&if_stmt.then_block);
                match &if_stmt.else_branch {
                    Some(ElseBranch::If(nested)) => self.check_stmt(nested),
                    Some(ElseBranch::Block(block)) => self.check_block(block),
                    None => {}
                }
            }
            StmtKind::While(while_stmt) => {
                let cond_ty = self.check_expr(&while_stmt.cond);
                if !cond_ty.is_boolish() {
                    self.error("Condition of 'while' must be a boolean", while_stmt.cond.span);
                }
                self.loop_depth += 1;
                self.check_block(&while_stmt.body);
                self.loop_depth -= 1;
            }
            StmtKind::For(for_stmt) => {
                // The init statement scopes over the whole loop header.
                self.scopes.push();
                if let Some(init) = &for_stmt.init {
                    self.check_stmt(init);
                }
                if let Some(cond) = &for_stmt.cond {
                    let cond_ty = self.check_expr(cond);
                    if !cond_ty.is_boolish() {
                        self.error("Condition of 'for' must be a boolean", cond.span);
                    }
                }
                if let Some(update) = &for_stmt.update {
                    self.check_expr(update);
                }
                self.loop_depth += 1;
                self.check_block(&for_stmt.body);
                self.loop_depth -= 1;
                self.scopes.pop();
            }
            StmtKind::Return(value) => {
                let expected = self.current_ret.clone().unwrap_or(Type::Void);
                match value {
                    Some(value) => {
                        let found = self.check_expr(value);
                        if !expected.compatible(&found) {
                            self.error(
                                format!(
                                    "Return type mismatch: expected {}, found {}",
                                    expected, found
                                ),
                                stmt.span,
                            );
                        }
                    }
                    None => {
                        if expected != Type::Void && expected != Type::Unknown {
                            self.error(
                                format!("Missing return value: expected {}", expected),
                                stmt.span,
                            );
                        }
                    }
                }
            }
            StmtKind::Break => {
                if self.loop_depth == 0 {
                    self.error("'break' outside of a loop", stmt.span);
                }
            }
            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    self.error("'continue' outside of a loop", stmt.span);
                }
            }
            StmtKind::Block(block) => self.check_block(block),
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn check_expr(&mut self, expr: &Expr) -> Type {
        match &expr.kind {
            ExprKind::Int(_) => Type::Int,
            ExprKind::Float(_) => Type::Float,
            ExprKind::Str(_) => Type::Str,
            ExprKind::Bool(_) => Type::Bool,
            ExprKind::Null => Type::Unknown,
            ExprKind::Array(elements) => {
                let mut elem_ty = Type::Unknown;
                for element in elements {
                    let ty = self.check_expr(element);
                    if elem_ty == Type::Unknown {
                        elem_ty = ty;
                    } else if !elem_ty.compatible(&ty) {
                        self.error("Array elements must have the same type", element.span);
                    }
                }
                Type::Array(Box::new(elem_ty))
            }
            ExprKind::Ident(name) => {
                if name.as_str().contains("::") {
                    // A bare qualified name; only meaningful as a callee.
                    return Type::Unknown;
                }
                match self.scopes.lookup(*name).map(|record| record.ty.clone()) {
                    Some(ty) => ty,
                    None => {
                        self.error(format!("Undefined variable '{}'", name), expr.span);
                        Type::Unknown
                    }
                }
            }
            ExprKind::Binary(binary) => self.check_binary(binary, expr.span),
            ExprKind::Unary(unary) => {
                let operand = self.check_expr(&unary.operand);
                match unary.op {
                    vegac_par::UnOp::Neg => {
                        if !operand.is_numeric() {
                            self.error("Operand of unary '-' must be numeric", expr.span);
                            return Type::Unknown;
                        }
                        operand
                    }
                    vegac_par::UnOp::Not => {
                        if !operand.is_boolish() {
                            self.error("Operand of '!' must be a boolean", expr.span);
                        }
                        Type::Bool
                    }
                }
            }
            ExprKind::Call(call) => {
                for arg in &call.args {
                    self.check_expr(arg);
                }
                self.check_callee(call, expr.span)
            }
            ExprKind::MethodCall(method) => {
                self.check_expr(&method.object);
                for arg in &method.args {
                    self.check_expr(arg);
                }
                Type::Unknown
            }
            ExprKind::Field(field) => {
                self.check_expr(&field.object);
                Type::Unknown
            }
            ExprKind::Index(index) => {
                let object_ty = self.check_expr(&index.object);
                let index_ty = self.check_expr(&index.index);
                if !matches!(index_ty, Type::Int | Type::Unknown) {
                    self.error("Array index must be an integer", index.index.span);
                }
                match object_ty {
                    Type::Array(elem) => *elem,
                    Type::Unknown => Type::Unknown,
                    other => {
                        self.error(format!("Cannot index a value of type {}", other), expr.span);
                        Type::Unknown
                    }
                }
            }
            ExprKind::Spawn(spawn) => {
                let kind = self.scopes.lookup(spawn.agent).map(|record| record.kind);
                match kind {
                    None => {
                        self.error(format!("Undefined agent '{}'", spawn.agent), expr.span);
                    }
                    Some(SymbolKind::Agent) => {}
                    Some(_) => {
                        self.error(format!("'{}' is not an agent", spawn.agent), expr.span);
                    }
                }
                // The async flag changes message-send semantics at runtime,
                // not the handle's type.
                Type::Agent(Some(spawn.agent))
            }
            ExprKind::Send(send) => {
                let target_ty = self.check_expr(&send.target);
                if !matches!(target_ty, Type::Agent(_) | Type::Unknown) {
                    self.error("Message target must be an agent", send.target.span);
                }
                self.check_expr(&send.payload);
                Type::Str
            }
            ExprKind::Await(operand) => {
                let operand_ty = self.check_expr(operand);
                if !matches!(operand_ty, Type::Future | Type::Str | Type::Unknown) {
                    self.error(
                        format!("Cannot await a value of type {}", operand_ty),
                        expr.span,
                    );
                }
                Type::Str
            }
            ExprKind::ResultOk(value) | ExprKind::ResultErr(value) => {
                self.check_expr(value);
                Type::Result
            }
            ExprKind::Match(match_expr) => {
                self.check_expr(&match_expr.scrutinee);
                for arm in &match_expr.arms {
                    self.scopes.push();
                    let record = SymbolRecord::variable(
                        arm.binding,
                        SymbolKind::Variable,
                        Type::Unknown,
                        arm.span,
                    );
                    self.scopes.define(record);
                    self.check_expr(&arm.body);
                    self.scopes.pop();
                }
                Type::Void
            }
        }
    }

    fn check_binary(&mut self, binary: &vegac_par::BinaryExpr, span: Span) -> Type {
        use vegac_par::BinOp;

        let lhs = self.check_expr(&binary.lhs);
        let rhs = self.check_expr(&binary.rhs);

        match binary.op {
            BinOp::Add => {
                // `+` is overloaded: string concatenation wins, then array
                // concatenation, then numeric addition with widening.
                if lhs == Type::Str || rhs == Type::Str {
                    return Type::Str;
                }
                if lhs == Type::Unknown || rhs == Type::Unknown {
                    return Type::Unknown;
                }
                if let (Type::Array(left_elem), Type::Array(right_elem)) = (&lhs, &rhs) {
                    let elem = if **left_elem != Type::Unknown {
                        left_elem.clone()
                    } else {
                        right_elem.clone()
                    };
                    return Type::Array(elem);
                }
                if lhs == Type::Int && rhs == Type::Int {
                    return Type::Int;
                }
                if lhs.is_numeric() && rhs.is_numeric() {
                    return Type::Float;
                }
                self.error(format!("Invalid operands for '+': {} and {}", lhs, rhs), span);
                Type::Unknown
            }
            BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
                if lhs == Type::Unknown || rhs == Type::Unknown {
                    return Type::Unknown;
                }
                if !lhs.is_numeric() || !rhs.is_numeric() {
                    self.error(
                        format!("Operands of '{}' must be numeric", binary.op),
                        span,
                    );
                    return Type::Unknown;
                }
                if lhs == Type::Float || rhs == Type::Float {
                    Type::Float
                } else {
                    Type::Int
                }
            }
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => Type::Bool,
            BinOp::And | BinOp::Or => {
                if !lhs.is_boolish() || !rhs.is_boolish() {
                    self.error(
                        format!("Operands of '{}' must be boolean", binary.op),
                        span,
                    );
                }
                Type::Bool
            }
        }
    }

    fn check_callee(&mut self, call: &vegac_par::CallExpr, span: Span) -> Type {
        let ExprKind::Ident(name) = &call.callee.kind else {
            self.check_expr(&call.callee);
            return Type::Unknown;
        };

        let name_str = name.as_str();
        if name_str == "print" {
            // Variadic builtin.
            return Type::Void;
        }
        if name_str.contains("::") {
            return stdlib_return_type(name_str);
        }

        let info = self
            .scopes
            .lookup(*name)
            .map(|record| (record.kind, record.params.len(), record.ret.clone()));
        match info {
            None => {
                self.error(format!("Undefined function '{}'", name_str), call.callee.span);
                Type::Unknown
            }
            Some((SymbolKind::Function | SymbolKind::Tool, arity, ret)) => {
                if call.args.len() != arity {
                    self.error(
                        format!(
                            "Wrong number of arguments to '{}': expected {}, found {}",
                            name_str,
                            arity,
                            call.args.len()
                        ),
                        span,
                    );
                }
                ret.unwrap_or(Type::Unknown)
            }
            Some(_) => {
                self.error(format!("'{}' is not a function", name_str), call.callee.span);
                Type::Unknown
            }
        }
    }
}

/// Build the symbol record for a function or tool declaration.
fn function_record(func: &FunctionDecl, kind: SymbolKind, span: Span) -> SymbolRecord {
    SymbolRecord {
        name: func.name,
        kind,
        ty: Type::Unknown,
        span,
        ret: Some(func.ret.as_ref().map(Type::from_ann).unwrap_or(Type::Void)),
        params: func.params.iter().map(|p| Type::from_ann(&p.ty)).collect(),
        tools: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(source: &str, handler: &Handler) -> Program {
        let lexer = Lexer::new(source, "test.vega");
        let mut parser = Parser::new(lexer, handler);
        let program = parser.parse_program();
        assert!(!parser.has_error(), "parse failed for {:?}", source);
        program
    }

    fn analyze_source(source: &str) -> (bool, Handler) {
        let handler = Handler::new();
        let ok = {
            let program = parse(source, &handler);
            let mut analyzer = Analyzer::new(&handler);
            analyzer.analyze(&program, Path::new("test.vega"))
        };
        (ok, handler)
    }

    fn first_error_message(handler: &Handler) -> String {
        handler.first_error().expect("expected an error").message
    }

    #[test]
    fn test_well_typed_program_passes() {
        let source = r#"
            fn add(a: int, b: int) -> int {
                return a + b;
            }

            fn main() {
                let total = add(1, 2);
                print(total);
            }
        "#;
        let (ok, handler) = analyze_source(source);
        assert!(ok, "errors: {:?}", handler.diagnostics());
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_forward_reference_resolves() {
        let source = r#"
            fn main() {
                helper();
            }

            fn helper() { }
        "#;
        let (ok, _) = analyze_source(source);
        assert!(ok);
    }

    #[test]
    fn test_undefined_variable() {
        let (ok, handler) = analyze_source("fn main() { print(nope); }");
        assert!(!ok);
        assert_eq!(first_error_message(&handler), "Undefined variable 'nope'");
    }

    #[test]
    fn test_undefined_function() {
        let (ok, handler) = analyze_source("fn main() { nope(); }");
        assert!(!ok);
        assert_eq!(first_error_message(&handler), "Undefined function 'nope'");
    }

    #[test]
    fn test_arity_mismatch() {
        let source = "fn f(a: int) { } fn main() { f(1, 2); }";
        let (ok, handler) = analyze_source(source);
        assert!(!ok);
        assert!(first_error_message(&handler).contains("Wrong number of arguments"));
    }

    #[test]
    fn test_spawn_undefined_agent() {
        let (ok, handler) = analyze_source("fn main() { let a = spawn Ghost; }");
        assert!(!ok);
        assert_eq!(first_error_message(&handler), "Undefined agent 'Ghost'");
    }

    #[test]
    fn test_spawn_non_agent() {
        let source = "fn Worker() { } fn main() { let a = spawn Worker; }";
        let (ok, handler) = analyze_source(source);
        assert!(!ok);
        assert_eq!(first_error_message(&handler), "'Worker' is not an agent");
    }

    #[test]
    fn test_spawn_and_send_type_as_expected() {
        let source = r#"
            agent Greeter { model "m"; }

            fn main() {
                let a = spawn Greeter;
                let r: str = a <- "hello";
                let rr: str = await r;
                print(rr);
            }
        "#;
        let (ok, handler) = analyze_source(source);
        assert!(ok, "errors: {:?}", handler.diagnostics());
    }

    #[test]
    fn test_async_spawn_still_types_as_agent() {
        let source = r#"
            agent Greeter { model "m"; }

            fn main() {
                let a = spawn async Greeter;
                let r = a <~ "hello";
                print(r);
            }
        "#;
        let (ok, _) = analyze_source(source);
        assert!(ok);
    }

    #[test]
    fn test_send_to_non_agent() {
        let (ok, handler) = analyze_source("fn main() { let r = 1 <- \"x\"; }");
        assert!(!ok);
        assert_eq!(first_error_message(&handler), "Message target must be an agent");
    }

    #[test]
    fn test_await_rejects_int() {
        let (ok, handler) = analyze_source("fn main() { let r = await 3; }");
        assert!(!ok);
        assert!(first_error_message(&handler).contains("Cannot await"));
    }

    #[test]
    fn test_break_outside_loop() {
        let (ok, handler) = analyze_source("fn main() { break; }");
        assert!(!ok);
        assert_eq!(first_error_message(&handler), "'break' outside of a loop");
    }

    #[test]
    fn test_continue_inside_loop_ok() {
        let (ok, _) = analyze_source("fn main() { while true { continue; } }");
        assert!(ok);
    }

    #[test]
    fn test_condition_must_be_boolean() {
        let (ok, handler) = analyze_source("fn main() { if 1 { } }");
        assert!(!ok);
        assert_eq!(first_error_message(&handler), "Condition of 'if' must be a boolean");
    }

    #[test]
    fn test_return_type_mismatch() {
        let source = "fn f() -> int { return \"no\"; }";
        let (ok, handler) = analyze_source(source);
        assert!(!ok);
        assert!(first_error_message(&handler).contains("Return type mismatch"));
    }

    #[test]
    fn test_string_concat_overload() {
        let source = r#"
            fn main() {
                let s: str = "n = " + 42;
                let t: str = 42 + "!";
                print(s + t);
            }
        "#;
        let (ok, _) = analyze_source(source);
        assert!(ok);
    }

    #[test]
    fn test_numeric_widening() {
        let source = r#"
            fn main() {
                let a: int = 1 + 2;
                let b: float = 1 + 2.5;
                let c: float = 2.5 * 2;
                print(a + b + c);
            }
        "#;
        let (ok, handler) = analyze_source(source);
        assert!(ok, "errors: {:?}", handler.diagnostics());
    }

    #[test]
    fn test_stdlib_return_types() {
        let source = r#"
            fn main() {
                let n: int = str::len("abc");
                let parts: str[] = str::split("a,b", ",");
                let v: int = json::get_int("{}", "k");
                let body: str = http::get("https://example.com");
                print(n);
                print(parts[0]);
                print(v);
                print(body);
            }
        "#;
        let (ok, handler) = analyze_source(source);
        assert!(ok, "errors: {:?}", handler.diagnostics());
    }

    #[test]
    fn test_stdlib_unknown_module_is_polymorphic() {
        assert_eq!(stdlib_return_type("vec::push"), Type::Unknown);
        assert_eq!(stdlib_return_type("str::upper"), Type::Str);
        assert_eq!(stdlib_return_type("json::get_int"), Type::Int);
        assert_eq!(stdlib_return_type("http::post"), Type::Str);
    }

    #[test]
    fn test_agent_missing_model() {
        let (ok, handler) = analyze_source("agent A { } fn main() { }");
        assert!(!ok);
        assert_eq!(first_error_message(&handler), "Agent 'A' is missing a model");
    }

    #[test]
    fn test_agent_temperature_out_of_range() {
        let (ok, handler) =
            analyze_source("agent A { model \"m\"; temperature 1.5; } fn main() { }");
        assert!(!ok);
        assert!(first_error_message(&handler).contains("temperature"));
    }

    #[test]
    fn test_tool_not_visible_globally() {
        let source = r#"
            agent A {
                model "m";
                tool t() { }
            }

            fn main() {
                t();
            }
        "#;
        let (ok, handler) = analyze_source(source);
        assert!(!ok);
        assert_eq!(first_error_message(&handler), "Undefined function 't'");
    }

    #[test]
    fn test_tools_see_each_other() {
        let source = r#"
            agent A {
                model "m";
                tool first() -> str { return second(); }
                tool second() -> str { return "x"; }
            }

            fn main() { }
        "#;
        let (ok, handler) = analyze_source(source);
        assert!(ok, "errors: {:?}", handler.diagnostics());
    }

    #[test]
    fn test_match_binding_in_arm_scope() {
        let source = r#"
            fn f() -> Result { return Ok(1); }

            fn main() {
                match f() {
                    Ok(v) => print(v),
                    Err(e) => print(e)
                }
            }
        "#;
        let (ok, handler) = analyze_source(source);
        assert!(ok, "errors: {:?}", handler.diagnostics());
    }

    #[test]
    fn test_redefinition_in_same_scope() {
        let (ok, handler) = analyze_source("fn main() { let x = 1; let x = 2; }");
        assert!(!ok);
        assert_eq!(first_error_message(&handler), "Redefinition of 'x'");
    }

    #[test]
    fn test_shadowing_across_scopes_allowed() {
        let (ok, _) = analyze_source("fn main() { let x = 1; { let x = \"s\"; print(x); } }");
        assert!(ok);
    }

    #[test]
    fn test_single_error_reported() {
        // Two independent problems; only the first is reported.
        let (ok, handler) = analyze_source("fn main() { print(a); print(b); }");
        assert!(!ok);
        assert_eq!(handler.error_count(), 1);
    }

    #[test]
    fn test_missing_main_is_warning_only() {
        let (ok, handler) = analyze_source("fn helper() { }");
        assert!(ok);
        assert!(!handler.has_errors());
        assert_eq!(handler.warning_count(), 1);
        let warning = &handler.diagnostics()[0];
        assert_eq!(warning.message, "no 'main' function defined");
    }

    #[test]
    fn test_idempotence() {
        let source = r#"
            agent A { model "m"; tool t() -> str { return "x"; } }
            fn helper(n: int) -> int { return n; }
            fn main() { let a = spawn A; print(helper(1)); }
        "#;

        let handler_a = Handler::new();
        let handler_b = Handler::new();
        let program_a = parse(source, &handler_a);
        let program_b = parse(source, &handler_b);

        let mut analyzer_a = Analyzer::new(&handler_a);
        let mut analyzer_b = Analyzer::new(&handler_b);
        let ok_a = analyzer_a.analyze(&program_a, Path::new("test.vega"));
        let ok_b = analyzer_b.analyze(&program_b, Path::new("test.vega"));

        assert_eq!(ok_a, ok_b);
        assert_eq!(handler_a.error_count(), handler_b.error_count());

        let globals_a: Vec<_> = analyzer_a
            .scopes
            .globals()
            .into_iter()
            .map(|r| (r.name.as_str(), r.kind, r.params.len()))
            .collect();
        let globals_b: Vec<_> = analyzer_b
            .scopes
            .globals()
            .into_iter()
            .map(|r| (r.name.as_str(), r.kind, r.params.len()))
            .collect();
        assert_eq!(globals_a, globals_b);
    }

    #[test]
    fn test_module_import_registers_symbols() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("helpers.vega"),
            "fn twice(n: int) -> int { return n + n; }",
        )
        .unwrap();
        let main_path = dir.path().join("main.vega");
        let source = "import \"./helpers\";\nfn main() { print(twice(2)); }";
        fs::write(&main_path, source).unwrap();

        let handler = Handler::new();
        let program = parse(source, &handler);
        let mut analyzer = Analyzer::new(&handler);
        let ok = analyzer.analyze(&program, &main_path);

        assert!(ok, "errors: {:?}", handler.diagnostics());
        assert_eq!(analyzer.module_programs().len(), 1);
    }

    #[test]
    fn test_module_search_path() {
        let lib_dir = TempDir::new().unwrap();
        fs::write(lib_dir.path().join("util.vega"), "fn id(s: str) -> str { return s; }")
            .unwrap();

        let handler = Handler::new();
        let source = "import \"util\";\nfn main() { print(id(\"x\")); }";
        let program = parse(source, &handler);
        let mut analyzer = Analyzer::new(&handler);
        analyzer.add_search_path(lib_dir.path());
        let ok = analyzer.analyze(&program, Path::new("main.vega"));

        assert!(ok, "errors: {:?}", handler.diagnostics());
    }

    #[test]
    fn test_module_not_found() {
        let handler = Handler::new();
        let source = "import \"missing_module\";\nfn main() { }";
        let program = parse(source, &handler);
        let mut analyzer = Analyzer::new(&handler);
        let ok = analyzer.analyze(&program, Path::new("main.vega"));

        assert!(!ok);
        assert!(first_error_message(&handler).contains("Module not found"));
    }

    #[test]
    fn test_circular_import_single_diagnostic() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("A.vega"), "import \"./B\";\nfn a() { }").unwrap();
        fs::write(dir.path().join("B.vega"), "import \"./A\";\nfn b() { }").unwrap();
        let main_path = dir.path().join("main.vega");
        let source = "import \"./A\";\nfn main() { }";
        fs::write(&main_path, source).unwrap();

        let handler = Handler::new();
        let program = parse(source, &handler);
        let mut analyzer = Analyzer::new(&handler);
        let ok = analyzer.analyze(&program, &main_path);

        assert!(!ok);
        assert_eq!(handler.error_count(), 1);
        let message = first_error_message(&handler);
        assert!(
            message.contains("Circular import"),
            "unexpected message: {}",
            message
        );
    }

    #[test]
    fn test_diamond_import_is_not_circular() {
        // main imports A and B; both import C. C is loaded once.
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("C.vega"), "fn c() { }").unwrap();
        fs::write(dir.path().join("A.vega"), "import \"./C\";\nfn a() { }").unwrap();
        fs::write(dir.path().join("B.vega"), "import \"./C\";\nfn b() { }").unwrap();
        let main_path = dir.path().join("main.vega");
        let source = "import \"./A\";\nimport \"./B\";\nfn main() { a(); b(); c(); }";
        fs::write(&main_path, source).unwrap();

        let handler = Handler::new();
        let program = parse(source, &handler);
        let mut analyzer = Analyzer::new(&handler);
        let ok = analyzer.analyze(&program, &main_path);

        assert!(ok, "errors: {:?}", handler.diagnostics());
        assert_eq!(analyzer.module_programs().len(), 3);
    }

    #[test]
    fn test_module_shadowing_is_silent() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("lib.vega"), "fn f() -> int { return 1; }").unwrap();
        let main_path = dir.path().join("main.vega");
        let source = "import \"./lib\";\nfn f() -> str { return \"s\"; }\nfn main() { let s: str = f(); }";
        fs::write(&main_path, source).unwrap();

        let handler = Handler::new();
        let program = parse(source, &handler);
        let mut analyzer = Analyzer::new(&handler);
        let ok = analyzer.analyze(&program, &main_path);

        assert!(ok, "errors: {:?}", handler.diagnostics());
    }
}
