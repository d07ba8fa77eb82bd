//! vegac-gen - Bytecode emission for the Vega language.
//!
//! The generator walks a checked tree and accumulates one artifact: a
//! stack-machine instruction stream, a constant pool with interned
//! strings, a function table, and an agent table. [`CodeGenerator::generate`]
//! is callable repeatedly, once per imported module and finally for the
//! main program; [`CodeGenerator::write_file`] then lays the accumulated
//! artifact out on disk.
//!
//! Control flow uses two-byte jump placeholders patched once the target
//! is known, with per-loop contexts collecting `break` patches. String
//! literals are escape-processed and deduplicated at interning time.

pub mod artifact;
pub mod disasm;
pub mod error;
pub mod opcode;
pub mod pool;

pub use artifact::{AgentRecord, Artifact, FuncRecord, MAGIC, VERSION};
pub use error::EmitError;
pub use opcode::Opcode;
pub use pool::{process_escapes, ConstantPool, TAG_FLOAT, TAG_INT, TAG_STRING};

use std::io::Write;
use std::path::Path;

use vegac_par::{
    AgentDecl, Block, DeclKind, ElseBranch, Expr, ExprKind, FunctionDecl, Program, Stmt,
    StmtKind, SupervisionStrategy,
};
use vegac_util::{Diagnostic, Handler, Span, Symbol};

/// Inline-push range: integers in [-128, 127] use `PUSH_INT` directly;
/// anything else goes through the constant pool.
const SMALL_INT_MIN: i64 = -128;
const SMALL_INT_MAX: i64 = 127;

/// An open loop: where its condition starts, and the `break` jumps that
/// still need their exit target.
struct LoopContext {
    start_offset: usize,
    break_patches: Vec<usize>,
}

/// The bytecode generator.
///
/// # Example
///
/// ```
/// use vegac_gen::CodeGenerator;
/// use vegac_lex::Lexer;
/// use vegac_par::Parser;
/// use vegac_util::Handler;
///
/// let handler = Handler::new();
/// let lexer = Lexer::new("fn main() { print(\"hi\"); }", "main.vega");
/// let program = Parser::new(lexer, &handler).parse_program();
///
/// let mut generator = CodeGenerator::new(&handler);
/// assert!(generator.generate(&program));
/// let artifact = generator.artifact();
/// assert_eq!(artifact.functions.len(), 1);
/// ```
pub struct CodeGenerator<'a> {
    handler: &'a Handler,

    /// File diagnostics are attributed to; set per `generate` call.
    file: String,

    code: Vec<u8>,
    pool: ConstantPool,
    functions: Vec<FuncRecord>,
    agents: Vec<AgentRecord>,

    /// Ordered local names of the function being emitted; a name's
    /// position is its slot.
    locals: Vec<Symbol>,

    /// Stack of open loops.
    loops: Vec<LoopContext>,

    /// Last opcode emitted, for the implicit-return check.
    last_op: Option<Opcode>,

    /// First error of this stage, if any.
    first_error: Option<(String, Span)>,
}

impl<'a> CodeGenerator<'a> {
    /// Create a generator reporting into `handler`.
    pub fn new(handler: &'a Handler) -> Self {
        Self {
            handler,
            file: String::new(),
            code: Vec::new(),
            pool: ConstantPool::new(),
            functions: Vec::new(),
            agents: Vec::new(),
            locals: Vec::new(),
            loops: Vec::new(),
            last_op: None,
            first_error: None,
        }
    }

    /// Emit code for one program, accumulating into the artifact.
    ///
    /// Call once per imported module, then for the main program. Returns
    /// `false` once any emission error has been recorded.
    pub fn generate(&mut self, program: &Program) -> bool {
        self.file = program.file.clone();

        for decl in &program.decls {
            match &decl.kind {
                DeclKind::Import(_) => {}
                DeclKind::Function(func) => {
                    let name = func.name.as_str().to_owned();
                    self.gen_function(&name, func);
                }
                DeclKind::Agent(agent) => self.gen_agent(agent),
            }
        }

        self.first_error.is_none()
    }

    /// The accumulated artifact.
    pub fn artifact(&self) -> Artifact {
        Artifact {
            flags: 0,
            functions: self.functions.clone(),
            agents: self.agents.clone(),
            pool: self.pool.bytes().to_vec(),
            code: self.code.clone(),
        }
    }

    /// Write the accumulated artifact to `path`.
    pub fn write_file(&self, path: &Path) -> Result<(), EmitError> {
        std::fs::write(path, self.artifact().to_bytes()).map_err(|source| EmitError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the textual disassembly of the accumulated artifact.
    pub fn disassemble(&self, w: &mut impl Write) -> std::io::Result<()> {
        disasm::disassemble(&self.artifact(), w)
    }

    /// Whether an emission error has been recorded.
    pub fn has_error(&self) -> bool {
        self.first_error.is_some()
    }

    /// The first recorded error message.
    pub fn error_message(&self) -> Option<&str> {
        self.first_error.as_ref().map(|(message, _)| message.as_str())
    }

    fn error(&mut self, message: impl Into<String>, span: Span) {
        if self.first_error.is_some() {
            return;
        }
        let message = message.into();
        self.first_error = Some((message.clone(), span));
        self.handler
            .emit(Diagnostic::error(&self.file, message, span));
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// Emit one function body and record its table entry. `name` differs
    /// from the declaration name for tools, which are mangled.
    fn gen_function(&mut self, name: &str, func: &FunctionDecl) {
        let name_idx = self.intern(name, func.span);
        let code_offset = self.code.len();

        self.locals.clear();
        self.last_op = None;
        for param in &func.params {
            self.add_local(param.name, param.span);
        }

        self.gen_block(&func.body);

        // Implicit return for bodies not already ending in one.
        if self.last_op != Some(Opcode::Return) {
            self.emit_op(Opcode::PushNull);
            self.emit_op(Opcode::Return);
        }

        self.functions.push(FuncRecord {
            name_idx,
            param_count: func.params.len() as u16,
            local_count: self.locals.len() as u16,
            code_offset: code_offset as u32,
            code_length: (self.code.len() - code_offset) as u32,
        });
    }

    /// Emit an agent: its tools first (under mangled names), then the
    /// agent record itself.
    fn gen_agent(&mut self, agent: &AgentDecl) {
        for tool in &agent.tools {
            let mangled = format!("{}${}", agent.name, tool.name);
            self.gen_function(&mangled, tool);

            // A parameterized tool also gets a serialized descriptor so
            // the runtime can describe it to external callees.
            if !tool.params.is_empty() {
                let key = format!("{}${}$params", agent.name, tool.name);
                let descriptor = tool
                    .params
                    .iter()
                    .map(|param| format!("{}:{}", param.name, param.ty))
                    .collect::<Vec<_>>()
                    .join(",");
                self.intern(&key, tool.span);
                self.intern(&descriptor, tool.span);
            }
        }

        let name_idx = self.intern(agent.name.as_str(), Span::DUMMY);
        let model = agent.model.map(|sym| sym.as_str()).unwrap_or("");
        let model_idx = self.intern(model, Span::DUMMY);
        let system = agent.system.map(|sym| sym.as_str()).unwrap_or("");
        let system_idx = self.intern(system, Span::DUMMY);

        self.agents.push(AgentRecord {
            name_idx,
            model_idx,
            system_idx,
            tool_count: agent.tools.len() as u16,
            temperature_x100: (agent.temperature * 100.0).round() as u16,
        });
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn gen_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.gen_stmt(stmt);
        }
    }

    fn gen_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.gen_expr(expr);
                // `print` pushes nothing, so there is nothing to pop.
                if !is_print_call(expr) {
                    self.emit_op(Opcode::Pop);
                }
            }
            StmtKind::Let(let_stmt) => {
                match &let_stmt.init {
                    Some(init) => self.gen_expr(init),
                    None => self.emit_op(Opcode::PushNull),
                }
                let slot = self.add_local(let_stmt.name, stmt.span);
                self.emit_op(Opcode::StoreLocal);
                self.emit_u8(slot);
            }
            StmtKind::Assign(assign) => self.gen_assign(assign, stmt.span),
            StmtKind::If(if_stmt) => {
                self.gen_expr(&if_stmt.cond);
                let else_jump = self.emit_jump(Opcode::JumpIfNot);
                self.gen_block(&if_stmt.then_block);

                match &if_stmt.else_branch {
                    Some(branch) => {
                        let end_jump = self.emit_jump(Opcode::Jump);
                        self.patch_jump(else_jump, stmt.span);
                        match branch {
                            ElseBranch::If(nested) => self.gen_stmt(nested),
                            ElseBranch::Block(block) => self.gen_block(block),
                        }
                        self.patch_jump(end_jump, stmt.span);
                    }
                    None => self.patch_jump(else_jump, stmt.span),
                }
            }
            StmtKind::While(while_stmt) => {
                let start_offset = self.code.len();
                self.gen_expr(&while_stmt.cond);
                let exit_jump = self.emit_jump(Opcode::JumpIfNot);

                self.loops.push(LoopContext {
                    start_offset,
                    break_patches: Vec::new(),
                });
                self.gen_block(&while_stmt.body);
                self.emit_back_jump(start_offset, stmt.span);

                self.patch_jump(exit_jump, stmt.span);
                let context = self.loops.pop().expect("loop context pushed above");
                for patch in context.break_patches {
                    self.patch_jump(patch, stmt.span);
                }
            }
            StmtKind::For(for_stmt) => {
                if let Some(init) = &for_stmt.init {
                    self.gen_stmt(init);
                }

                let start_offset = self.code.len();
                let exit_jump = for_stmt.cond.as_ref().map(|cond| {
                    self.gen_expr(cond);
                    self.emit_jump(Opcode::JumpIfNot)
                });

                // `continue` jumps back to the condition, not the update.
                self.loops.push(LoopContext {
                    start_offset,
                    break_patches: Vec::new(),
                });
                self.gen_block(&for_stmt.body);
                if let Some(update) = &for_stmt.update {
                    self.gen_expr(update);
                    self.emit_op(Opcode::Pop);
                }
                self.emit_back_jump(start_offset, stmt.span);

                if let Some(exit_jump) = exit_jump {
                    self.patch_jump(exit_jump, stmt.span);
                }
                let context = self.loops.pop().expect("loop context pushed above");
                for patch in context.break_patches {
                    self.patch_jump(patch, stmt.span);
                }
            }
            StmtKind::Return(value) => {
                match value {
                    Some(value) => self.gen_expr(value),
                    None => self.emit_op(Opcode::PushNull),
                }
                self.emit_op(Opcode::Return);
            }
            StmtKind::Break => {
                if self.loops.is_empty() {
                    self.error("'break' outside of a loop", stmt.span);
                    return;
                }
                let patch = self.emit_jump(Opcode::Jump);
                self.loops
                    .last_mut()
                    .expect("checked non-empty above")
                    .break_patches
                    .push(patch);
            }
            StmtKind::Continue => {
                let Some(context) = self.loops.last() else {
                    self.error("'continue' outside of a loop", stmt.span);
                    return;
                };
                let start_offset = context.start_offset;
                self.emit_back_jump(start_offset, stmt.span);
            }
            StmtKind::Block(block) => self.gen_block(block),
        }
    }

    fn gen_assign(&mut self, assign: &vegac_par::AssignStmt, span: Span) {
        match &assign.target.kind {
            ExprKind::Ident(name) => {
                self.gen_expr(&assign.value);
                match self.find_local(*name) {
                    Some(slot) => {
                        self.emit_op(Opcode::StoreLocal);
                        self.emit_u8(slot);
                    }
                    None => {
                        let name_idx = self.intern(name.as_str(), span);
                        self.emit_op(Opcode::StoreGlobal);
                        self.emit_u16(name_idx);
                    }
                }
            }
            ExprKind::Index(index) => {
                self.gen_expr(&index.object);
                self.gen_expr(&index.index);
                self.gen_expr(&assign.value);
                self.emit_op(Opcode::ArraySet);
            }
            _ => self.error("Invalid assignment target", assign.target.span),
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn gen_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Int(value) => self.gen_int(*value, expr.span),
            ExprKind::Float(value) => {
                let Some(idx) = self.pool.add_float(*value) else {
                    self.error("Constant pool overflow", expr.span);
                    return;
                };
                self.emit_op(Opcode::PushConst);
                self.emit_u16(idx);
            }
            ExprKind::Str(raw) => {
                let idx = self.intern(raw.as_str(), expr.span);
                self.emit_op(Opcode::PushConst);
                self.emit_u16(idx);
            }
            ExprKind::Bool(true) => self.emit_op(Opcode::PushTrue),
            ExprKind::Bool(false) => self.emit_op(Opcode::PushFalse),
            ExprKind::Null => self.emit_op(Opcode::PushNull),
            ExprKind::Array(elements) => {
                self.emit_op(Opcode::ArrayNew);
                self.emit_u16(elements.len() as u16);
                for element in elements {
                    self.gen_expr(element);
                    self.emit_op(Opcode::ArrayPush);
                }
            }
            ExprKind::Ident(name) => match self.find_local(*name) {
                Some(slot) => {
                    self.emit_op(Opcode::LoadLocal);
                    self.emit_u8(slot);
                }
                None => {
                    let name_idx = self.intern(name.as_str(), expr.span);
                    self.emit_op(Opcode::LoadGlobal);
                    self.emit_u16(name_idx);
                }
            },
            ExprKind::Binary(binary) => {
                self.gen_expr(&binary.lhs);
                self.gen_expr(&binary.rhs);
                self.emit_op(binary_opcode(binary.op));
            }
            ExprKind::Unary(unary) => {
                self.gen_expr(&unary.operand);
                self.emit_op(match unary.op {
                    vegac_par::UnOp::Neg => Opcode::Neg,
                    vegac_par::UnOp::Not => Opcode::Not,
                });
            }
            ExprKind::Call(call) => self.gen_call(call, expr.span),
            ExprKind::MethodCall(method) => {
                self.gen_expr(&method.object);
                for arg in &method.args {
                    self.gen_expr(arg);
                }
                let name_idx = self.intern(method.method.as_str(), expr.span);
                self.emit_op(Opcode::CallMethod);
                self.emit_u16(name_idx);
                self.emit_u8(method.args.len() as u8);
            }
            ExprKind::Field(field) => {
                self.gen_expr(&field.object);
                let name_idx = self.intern(field.field.as_str(), expr.span);
                self.emit_op(Opcode::GetField);
                self.emit_u16(name_idx);
            }
            ExprKind::Index(index) => {
                self.gen_expr(&index.object);
                self.gen_expr(&index.index);
                self.emit_op(Opcode::ArrayGet);
            }
            ExprKind::Spawn(spawn) => {
                let name_idx = self.intern(spawn.agent.as_str(), expr.span);
                match &spawn.supervision {
                    Some(config) => {
                        // No async form exists for supervised spawns; the
                        // supervision config wins.
                        self.emit_op(Opcode::SpawnSupervised);
                        self.emit_u16(name_idx);
                        self.emit_u8(strategy_code(config.strategy));
                        self.emit_u32(config.max_restarts);
                        self.emit_u32(config.window_ms);
                    }
                    None => {
                        self.emit_op(if spawn.is_async {
                            Opcode::SpawnAsync
                        } else {
                            Opcode::SpawnAgent
                        });
                        self.emit_u16(name_idx);
                    }
                }
            }
            ExprKind::Send(send) => {
                self.gen_expr(&send.target);
                self.gen_expr(&send.payload);
                self.emit_op(if send.is_async {
                    Opcode::SendAsync
                } else {
                    Opcode::SendMsg
                });
            }
            ExprKind::Await(operand) => {
                self.gen_expr(operand);
                self.emit_op(Opcode::Await);
            }
            ExprKind::ResultOk(value) => {
                self.gen_expr(value);
                self.emit_op(Opcode::ResultOk);
            }
            ExprKind::ResultErr(value) => {
                self.gen_expr(value);
                self.emit_op(Opcode::ResultErr);
            }
            ExprKind::Match(match_expr) => self.gen_match(match_expr, expr.span),
        }
    }

    /// Integer literal: inline `PUSH_INT` for small values, pool entry
    /// otherwise. The pool entry is 4 bytes, so an i64 outside i32 range
    /// cannot be represented.
    fn gen_int(&mut self, value: i64, span: Span) {
        if (SMALL_INT_MIN..=SMALL_INT_MAX).contains(&value) {
            self.emit_op(Opcode::PushInt);
            self.emit_i32(value as i32);
            return;
        }

        let Ok(value) = i32::try_from(value) else {
            self.error("Integer constant out of range", span);
            return;
        };
        let Some(idx) = self.pool.add_int(value) else {
            self.error("Constant pool overflow", span);
            return;
        };
        self.emit_op(Opcode::PushConst);
        self.emit_u16(idx);
    }

    /// Calls: arguments left-to-right, then the callee. `print` is a
    /// builtin, qualified names dispatch natively, everything else loads
    /// the callee and emits `CALL`.
    fn gen_call(&mut self, call: &vegac_par::CallExpr, span: Span) {
        for arg in &call.args {
            self.gen_expr(arg);
        }

        if let ExprKind::Ident(name) = &call.callee.kind {
            let name_str = name.as_str();
            if name_str == "print" {
                self.emit_op(Opcode::Print);
                return;
            }
            if name_str.contains("::") {
                let name_idx = self.intern(name_str, span);
                self.emit_op(Opcode::CallNative);
                self.emit_u16(name_idx);
                return;
            }
        }

        self.gen_expr(&call.callee);
        self.emit_op(Opcode::Call);
        self.emit_u8(call.args.len() as u8);
    }

    /// Match lowering: test once, unwrap per arm.
    ///
    /// The scrutinee is duplicated for the `RESULT_IS_OK` test, then each
    /// taken arm unwraps into its binding slot and runs its body. Exactly
    /// one `Ok` and one `Err` arm are consumed; extras are ignored.
    fn gen_match(&mut self, match_expr: &vegac_par::MatchExpr, span: Span) {
        let ok_arm = match_expr.arms.iter().find(|arm| arm.is_ok);
        let err_arm = match_expr.arms.iter().find(|arm| !arm.is_ok);
        let (Some(ok_arm), Some(err_arm)) = (ok_arm, err_arm) else {
            self.error("Match must have an Ok arm and an Err arm", span);
            return;
        };

        self.gen_expr(&match_expr.scrutinee);
        self.emit_op(Opcode::Dup);
        self.emit_op(Opcode::ResultIsOk);
        let else_jump = self.emit_jump(Opcode::JumpIfNot);

        self.emit_op(Opcode::ResultUnwrap);
        let ok_slot = self.add_local(ok_arm.binding, ok_arm.span);
        self.emit_op(Opcode::StoreLocal);
        self.emit_u8(ok_slot);
        self.gen_expr(&ok_arm.body);
        let end_jump = self.emit_jump(Opcode::Jump);

        self.patch_jump(else_jump, span);
        self.emit_op(Opcode::ResultUnwrap);
        let err_slot = self.add_local(err_arm.binding, err_arm.span);
        self.emit_op(Opcode::StoreLocal);
        self.emit_u8(err_slot);
        self.gen_expr(&err_arm.body);

        self.patch_jump(end_jump, span);
    }

    // =========================================================================
    // Locals
    // =========================================================================

    /// Append a local, returning its slot. The list is per-function and
    /// only grows; block scoping is the analyzer's concern.
    fn add_local(&mut self, name: Symbol, span: Span) -> u8 {
        if self.locals.len() >= 256 {
            self.error("Too many local variables", span);
            return 0;
        }
        self.locals.push(name);
        (self.locals.len() - 1) as u8
    }

    /// Linear slot lookup; the latest definition of a name wins.
    fn find_local(&self, name: Symbol) -> Option<u8> {
        self.locals
            .iter()
            .rposition(|&local| local == name)
            .map(|slot| slot as u8)
    }

    // =========================================================================
    // Emission primitives
    // =========================================================================

    fn emit_op(&mut self, op: Opcode) {
        self.code.push(op as u8);
        self.last_op = Some(op);
    }

    fn emit_u8(&mut self, value: u8) {
        self.code.push(value);
    }

    fn emit_u16(&mut self, value: u16) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    fn emit_u32(&mut self, value: u32) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    fn emit_i32(&mut self, value: i32) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    /// Intern a string constant, escape-processing it first.
    fn intern(&mut self, raw: &str, span: Span) -> u16 {
        let processed = process_escapes(raw);
        match self.pool.intern_string(processed.as_bytes()) {
            Some(idx) => idx,
            None => {
                self.error("Constant pool overflow", span);
                0
            }
        }
    }

    /// Emit a forward jump with a zero placeholder; returns the
    /// placeholder's offset for [`patch_jump`](Self::patch_jump).
    fn emit_jump(&mut self, op: Opcode) -> usize {
        self.emit_op(op);
        let at = self.code.len();
        self.emit_u16(0);
        at
    }

    /// Patch a placeholder to jump to the current end of code. The delta
    /// is relative to the end of the operand.
    fn patch_jump(&mut self, at: usize, span: Span) {
        let target = self.code.len() as isize;
        let delta = target - (at as isize + 2);
        let Ok(delta) = i16::try_from(delta) else {
            self.error("Jump distance out of range", span);
            return;
        };
        self.code[at..at + 2].copy_from_slice(&delta.to_le_bytes());
    }

    /// Emit a `JUMP` back to `target` (a loop start).
    fn emit_back_jump(&mut self, target: usize, span: Span) {
        self.emit_op(Opcode::Jump);
        let at = self.code.len() as isize;
        let delta = target as isize - (at + 2);
        let Ok(delta) = i16::try_from(delta) else {
            self.error("Jump distance out of range", span);
            self.emit_u16(0);
            return;
        };
        self.code.extend_from_slice(&delta.to_le_bytes());
    }
}

/// Whether an expression is a direct `print(…)` call, which emits the
/// `PRINT` opcode and leaves nothing on the stack.
fn is_print_call(expr: &Expr) -> bool {
    let ExprKind::Call(call) = &expr.kind else {
        return false;
    };
    matches!(&call.callee.kind, ExprKind::Ident(name) if name.as_str() == "print")
}

fn binary_opcode(op: vegac_par::BinOp) -> Opcode {
    use vegac_par::BinOp;
    match op {
        BinOp::Add => Opcode::Add,
        BinOp::Sub => Opcode::Sub,
        BinOp::Mul => Opcode::Mul,
        BinOp::Div => Opcode::Div,
        BinOp::Mod => Opcode::Mod,
        BinOp::Eq => Opcode::Eq,
        BinOp::Ne => Opcode::Ne,
        BinOp::Lt => Opcode::Lt,
        BinOp::Le => Opcode::Le,
        BinOp::Gt => Opcode::Gt,
        BinOp::Ge => Opcode::Ge,
        BinOp::And => Opcode::And,
        BinOp::Or => Opcode::Or,
    }
}

fn strategy_code(strategy: SupervisionStrategy) -> u8 {
    match strategy {
        SupervisionStrategy::Restart => 0,
        SupervisionStrategy::Stop => 1,
        SupervisionStrategy::Escalate => 2,
        SupervisionStrategy::RestartAll => 3,
    }
}
