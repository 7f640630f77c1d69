//! AST to IR lowering
//!
//! One [`Function`] per declaration, one per implementation method
//! (named `Struct.method`), and an implicit `main` collecting the
//! free statements at program scope. `main`'s variables become module
//! globals; every other function records its declared names as frame
//! locals. Fresh temps and `L0, L1, ...` labels are allocated per
//! function.

use thiserror::Error;

use super::ir::{
    Block, Constant, Function, Instruction, Module, Opcode, StructLayout, Temp, ValueRef,
};
use crate::frontend::parser::ast::{
    AssignOp, BinOp, Block as AstBlock, Expr, FunctionDecl, MethodDecl, Program, Stmt, StmtKind,
    UnOp,
};
use crate::frontend::typecheck::CheckResult;
use crate::util::span::Span;

/// Lowering failure; these indicate constructs that survived checking
/// but have no lowering, so they are internal rather than user errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IrGenError {
    #[error("unsupported callee at {}", .span.start)]
    UnsupportedCallee { span: Span },

    #[error("'{word}' outside of a loop at {}", .span.start)]
    OutsideLoop { word: String, span: Span },

    #[error("unsupported assignment target at {}", .span.start)]
    BadAssignTarget { span: Span },
}

/// Lower a checked program to an IR module
pub fn generate(program: &Program, check: &CheckResult) -> Result<Module, Vec<IrGenError>> {
    let mut generator = Generator::new(check);
    generator.run(program);
    if generator.errors.is_empty() {
        Ok(generator.module)
    } else {
        Err(generator.errors)
    }
}

struct Generator<'a> {
    check: &'a CheckResult,
    module: Module,
    errors: Vec<IrGenError>,
}

impl<'a> Generator<'a> {
    fn new(check: &'a CheckResult) -> Self {
        let mut module = Module::default();
        for info in check.structs.values() {
            let methods = info
                .methods
                .keys()
                .map(|m| (m.clone(), format!("{}.{m}", info.name)))
                .collect();
            module.structs.insert(
                info.name.clone(),
                StructLayout {
                    name: info.name.clone(),
                    fields: info.fields.keys().cloned().collect(),
                    methods,
                },
            );
        }
        Self {
            check,
            module,
            errors: Vec::new(),
        }
    }

    fn run(&mut self, program: &Program) {
        // Declarations lower to their own functions wherever they sit
        // in the tree; only the remaining free statements execute in
        // `main`.
        for stmt in &program.body {
            self.collect_decls(stmt);
        }

        let mut main = FunctionBuilder::new("main", true);
        for stmt in &program.body {
            match &stmt.kind {
                StmtKind::Function(_)
                | StmtKind::Impl(_)
                | StmtKind::Struct(_)
                | StmtKind::TypeAlias { .. } => {}
                _ => main.lower_stmt(stmt, &mut self.errors),
            }
        }
        main.finish_open_block();

        for name in &main.global_decls {
            self.module
                .globals
                .insert(name.clone(), ValueRef::Const(Constant::Null));
        }
        self.module.functions.insert(0, main.into_function());
    }

    /// Find function and implementation declarations at any statement
    /// depth and lower each to a module function
    fn collect_decls(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Function(decl) => {
                self.lower_function(decl);
                for inner in &decl.body.stmts {
                    self.collect_decls(inner);
                }
            }
            StmtKind::Impl(decl) => {
                for method in &decl.methods {
                    self.lower_method(&decl.target, method);
                    for inner in &method.body.stmts {
                        self.collect_decls(inner);
                    }
                }
            }
            StmtKind::If {
                then_block,
                else_branch,
                ..
            } => {
                for inner in &then_block.stmts {
                    self.collect_decls(inner);
                }
                if let Some(else_stmt) = else_branch {
                    self.collect_decls(else_stmt);
                }
            }
            StmtKind::While { body, .. }
            | StmtKind::DoWhile { body, .. }
            | StmtKind::For { body, .. }
            | StmtKind::ForIn { body, .. } => {
                for inner in &body.stmts {
                    self.collect_decls(inner);
                }
            }
            StmtKind::Switch { cases, default, .. } => {
                for case in cases {
                    for inner in &case.body.stmts {
                        self.collect_decls(inner);
                    }
                }
                if let Some(default) = default {
                    for inner in &default.stmts {
                        self.collect_decls(inner);
                    }
                }
            }
            StmtKind::Block(block) => {
                for inner in &block.stmts {
                    self.collect_decls(inner);
                }
            }
            _ => {}
        }
    }

    fn lower_function(&mut self, decl: &FunctionDecl) {
        let mut builder = FunctionBuilder::new(&decl.name, false);
        for param in &decl.params {
            builder.func.params.push(param.name.clone());
            builder.func.locals.push(param.name.clone());
        }
        collect_declared(&decl.body, &mut builder.func.locals);
        for stmt in &decl.body.stmts {
            builder.lower_stmt(stmt, &mut self.errors);
        }
        builder.finish_open_block();
        self.module.functions.push(builder.into_function());
    }

    fn lower_method(&mut self, target: &str, method: &MethodDecl) {
        let mut builder = FunctionBuilder::new(format!("{target}.{}", method.name), false);
        builder.func.params.push("self".to_string());
        builder.func.locals.push("self".to_string());
        for param in &method.params {
            builder.func.params.push(param.name.clone());
            builder.func.locals.push(param.name.clone());
        }
        collect_declared(&method.body, &mut builder.func.locals);
        for stmt in &method.body.stmts {
            builder.lower_stmt(stmt, &mut self.errors);
        }
        // `init` hands the receiver back so `new` can use the call
        // result directly.
        if method.name == "init" && !builder.block_terminated() {
            let receiver = builder.fresh_temp();
            builder.emit(Instruction::new(
                Opcode::Load,
                Some(receiver),
                vec![ValueRef::Symbol("self".to_string())],
            ));
            builder.emit(Instruction::new(
                Opcode::Return,
                None,
                vec![ValueRef::Temp(receiver)],
            ));
        }
        builder.finish_open_block();
        self.module.functions.push(builder.into_function());
    }
}

/// Collect names declared directly in a body (not inside nested
/// function declarations); they become frame locals.
fn collect_declared(block: &AstBlock, out: &mut Vec<String>) {
    fn walk_stmt(stmt: &Stmt, out: &mut Vec<String>) {
        match &stmt.kind {
            StmtKind::Var { name, .. } => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            StmtKind::If {
                then_block,
                else_branch,
                ..
            } => {
                walk_block(then_block, out);
                if let Some(else_stmt) = else_branch {
                    walk_stmt(else_stmt, out);
                }
            }
            StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => walk_block(body, out),
            StmtKind::For { init, body, .. } => {
                if let Some(init) = init {
                    walk_stmt(init, out);
                }
                walk_block(body, out);
            }
            StmtKind::ForIn {
                index, item, body, ..
            } => {
                if let Some(index) = index {
                    if !out.contains(index) {
                        out.push(index.clone());
                    }
                }
                if !out.contains(item) {
                    out.push(item.clone());
                }
                walk_block(body, out);
            }
            StmtKind::Switch { cases, default, .. } => {
                for case in cases {
                    walk_block(&case.body, out);
                }
                if let Some(default) = default {
                    walk_block(default, out);
                }
            }
            StmtKind::Block(block) => walk_block(block, out),
            _ => {}
        }
    }
    fn walk_block(block: &AstBlock, out: &mut Vec<String>) {
        for stmt in &block.stmts {
            walk_stmt(stmt, out);
        }
    }
    walk_block(block, out);
}

/// Per-function lowering state
struct FunctionBuilder {
    func: Function,
    current: usize,
    next_temp: usize,
    next_label: usize,
    next_hidden: usize,
    /// (continue target, break target)
    loop_stack: Vec<(String, String)>,
    is_main: bool,
    /// Variable names declared at program scope; they become globals
    global_decls: Vec<String>,
}

impl FunctionBuilder {
    fn new(name: impl Into<String>, is_main: bool) -> Self {
        let mut func = Function::new(name);
        func.blocks.push(Block::new("L0"));
        Self {
            func,
            current: 0,
            next_temp: 0,
            next_label: 1,
            next_hidden: 0,
            loop_stack: Vec::new(),
            is_main,
            global_decls: Vec::new(),
        }
    }

    fn into_function(self) -> Function {
        self.func
    }

    fn fresh_temp(&mut self) -> Temp {
        let t = self.next_temp;
        self.next_temp += 1;
        t
    }

    fn fresh_label(&mut self) -> String {
        let label = format!("L{}", self.next_label);
        self.next_label += 1;
        label
    }

    /// Hidden frame-local used as merge storage for short-circuit and
    /// ternary lowering; temps stay single-assignment this way.
    fn hidden_symbol(&mut self) -> String {
        let name = format!(".v{}", self.next_hidden);
        self.next_hidden += 1;
        self.func.locals.push(name.clone());
        name
    }

    fn emit(&mut self, instruction: Instruction) {
        self.func.blocks[self.current].instructions.push(instruction);
    }

    /// Append a new block and make it current
    fn start_block(&mut self, label: String) {
        self.func.blocks.push(Block::new(label));
        self.current = self.func.blocks.len() - 1;
    }

    fn block_terminated(&self) -> bool {
        self.func.blocks[self.current]
            .instructions
            .last()
            .map(|i| i.op.is_terminator() || i.op == Opcode::Branch)
            .unwrap_or(false)
    }

    /// Close the function: a block that falls off the end returns null
    fn finish_open_block(&mut self) {
        if !self.block_terminated() {
            self.emit(Instruction::new(Opcode::Return, None, Vec::new()));
        }
    }

    fn declare_var(&mut self, name: &str) {
        if self.is_main {
            if !self.global_decls.contains(&name.to_string()) {
                self.global_decls.push(name.to_string());
            }
        }
        // Non-main locals were pre-collected into func.locals.
    }

    // =====================================================================
    // Statements
    // =====================================================================

    fn lower_stmt(&mut self, stmt: &Stmt, errors: &mut Vec<IrGenError>) {
        match &stmt.kind {
            StmtKind::Var { name, init, .. } => {
                self.declare_var(name);
                let value = match init {
                    Some(expr) => self.lower_expr(expr, errors),
                    None => {
                        let t = self.fresh_temp();
                        self.emit(Instruction::new(
                            Opcode::Const,
                            Some(t),
                            vec![ValueRef::Const(Constant::Null)],
                        ));
                        t
                    }
                };
                self.emit(Instruction::new(
                    Opcode::Store,
                    None,
                    vec![ValueRef::Symbol(name.clone()), ValueRef::Temp(value)],
                ));
            }
            StmtKind::Expr(expr) => {
                self.lower_expr(expr, errors);
            }
            StmtKind::If {
                cond,
                then_block,
                else_branch,
            } => {
                let cond_temp = self.lower_expr(cond, errors);
                let then_label = self.fresh_label();
                let end_label = self.fresh_label();
                let else_label = if else_branch.is_some() {
                    self.fresh_label()
                } else {
                    end_label.clone()
                };

                self.emit(Instruction::new(
                    Opcode::Branch,
                    None,
                    vec![
                        ValueRef::Temp(cond_temp),
                        ValueRef::Symbol(then_label.clone()),
                        ValueRef::Symbol(else_label.clone()),
                    ],
                ));

                self.start_block(then_label);
                for stmt in &then_block.stmts {
                    self.lower_stmt(stmt, errors);
                }
                if !self.block_terminated() {
                    self.emit(Instruction::new(
                        Opcode::Jump,
                        None,
                        vec![ValueRef::Symbol(end_label.clone())],
                    ));
                }

                if let Some(else_stmt) = else_branch {
                    self.start_block(else_label);
                    self.lower_stmt(else_stmt, errors);
                    if !self.block_terminated() {
                        self.emit(Instruction::new(
                            Opcode::Jump,
                            None,
                            vec![ValueRef::Symbol(end_label.clone())],
                        ));
                    }
                }

                self.start_block(end_label);
            }
            StmtKind::While { cond, body } => {
                let cond_label = self.fresh_label();
                let body_label = self.fresh_label();
                let end_label = self.fresh_label();

                self.emit(Instruction::new(
                    Opcode::Jump,
                    None,
                    vec![ValueRef::Symbol(cond_label.clone())],
                ));

                self.start_block(cond_label.clone());
                let cond_temp = self.lower_expr(cond, errors);
                self.emit(Instruction::new(
                    Opcode::Branch,
                    None,
                    vec![
                        ValueRef::Temp(cond_temp),
                        ValueRef::Symbol(body_label.clone()),
                        ValueRef::Symbol(end_label.clone()),
                    ],
                ));

                self.start_block(body_label);
                self.loop_stack
                    .push((cond_label.clone(), end_label.clone()));
                for stmt in &body.stmts {
                    self.lower_stmt(stmt, errors);
                }
                self.loop_stack.pop();
                if !self.block_terminated() {
                    self.emit(Instruction::new(
                        Opcode::Jump,
                        None,
                        vec![ValueRef::Symbol(cond_label)],
                    ));
                }

                self.start_block(end_label);
            }
            StmtKind::DoWhile { body, cond } => {
                let body_label = self.fresh_label();
                let cond_label = self.fresh_label();
                let end_label = self.fresh_label();

                self.emit(Instruction::new(
                    Opcode::Jump,
                    None,
                    vec![ValueRef::Symbol(body_label.clone())],
                ));

                self.start_block(body_label.clone());
                self.loop_stack
                    .push((cond_label.clone(), end_label.clone()));
                for stmt in &body.stmts {
                    self.lower_stmt(stmt, errors);
                }
                self.loop_stack.pop();
                if !self.block_terminated() {
                    self.emit(Instruction::new(
                        Opcode::Jump,
                        None,
                        vec![ValueRef::Symbol(cond_label.clone())],
                    ));
                }

                self.start_block(cond_label);
                let cond_temp = self.lower_expr(cond, errors);
                self.emit(Instruction::new(
                    Opcode::Branch,
                    None,
                    vec![
                        ValueRef::Temp(cond_temp),
                        ValueRef::Symbol(body_label),
                        ValueRef::Symbol(end_label.clone()),
                    ],
                ));

                self.start_block(end_label);
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                if let Some(init) = init {
                    self.lower_stmt(init, errors);
                }
                let cond_label = self.fresh_label();
                let body_label = self.fresh_label();
                let post_label = self.fresh_label();
                let end_label = self.fresh_label();

                self.emit(Instruction::new(
                    Opcode::Jump,
                    None,
                    vec![ValueRef::Symbol(cond_label.clone())],
                ));

                self.start_block(cond_label.clone());
                let cond_temp = match cond {
                    Some(cond) => self.lower_expr(cond, errors),
                    None => {
                        let t = self.fresh_temp();
                        self.emit(Instruction::new(
                            Opcode::Const,
                            Some(t),
                            vec![ValueRef::Const(Constant::Bool(true))],
                        ));
                        t
                    }
                };
                self.emit(Instruction::new(
                    Opcode::Branch,
                    None,
                    vec![
                        ValueRef::Temp(cond_temp),
                        ValueRef::Symbol(body_label.clone()),
                        ValueRef::Symbol(end_label.clone()),
                    ],
                ));

                self.start_block(body_label);
                self.loop_stack
                    .push((post_label.clone(), end_label.clone()));
                for stmt in &body.stmts {
                    self.lower_stmt(stmt, errors);
                }
                self.loop_stack.pop();
                if !self.block_terminated() {
                    self.emit(Instruction::new(
                        Opcode::Jump,
                        None,
                        vec![ValueRef::Symbol(post_label.clone())],
                    ));
                }

                self.start_block(post_label);
                if let Some(post) = post {
                    self.lower_expr(post, errors);
                }
                self.emit(Instruction::new(
                    Opcode::Jump,
                    None,
                    vec![ValueRef::Symbol(cond_label)],
                ));

                self.start_block(end_label);
            }
            StmtKind::ForIn {
                index,
                item,
                iterable,
                body,
            } => self.lower_for_in(index.as_deref(), item, iterable, body, errors),
            StmtKind::Switch {
                disc,
                cases,
                default,
            } => {
                let disc_temp = self.lower_expr(disc, errors);
                let end_label = self.fresh_label();
                let body_labels: Vec<String> =
                    cases.iter().map(|_| self.fresh_label()).collect();
                let test_labels: Vec<String> = cases
                    .iter()
                    .skip(1)
                    .map(|_| self.fresh_label())
                    .collect();
                let default_label = default.as_ref().map(|_| self.fresh_label());
                let fallthrough = default_label.clone().unwrap_or_else(|| end_label.clone());

                for (i, case) in cases.iter().enumerate() {
                    if i > 0 {
                        self.start_block(test_labels[i - 1].clone());
                    }
                    let value_temp = self.lower_expr(&case.value, errors);
                    let matched = self.fresh_temp();
                    self.emit(Instruction::new(
                        Opcode::CmpEq,
                        Some(matched),
                        vec![ValueRef::Temp(disc_temp), ValueRef::Temp(value_temp)],
                    ));
                    let next = if i + 1 < cases.len() {
                        test_labels[i].clone()
                    } else {
                        fallthrough.clone()
                    };
                    self.emit(Instruction::new(
                        Opcode::Branch,
                        None,
                        vec![
                            ValueRef::Temp(matched),
                            ValueRef::Symbol(body_labels[i].clone()),
                            ValueRef::Symbol(next),
                        ],
                    ));
                }
                if cases.is_empty() {
                    self.emit(Instruction::new(
                        Opcode::Jump,
                        None,
                        vec![ValueRef::Symbol(fallthrough.clone())],
                    ));
                }

                for (case, label) in cases.iter().zip(&body_labels) {
                    self.start_block(label.clone());
                    for stmt in &case.body.stmts {
                        self.lower_stmt(stmt, errors);
                    }
                    if !self.block_terminated() {
                        self.emit(Instruction::new(
                            Opcode::Jump,
                            None,
                            vec![ValueRef::Symbol(end_label.clone())],
                        ));
                    }
                }

                if let (Some(default), Some(label)) = (default, default_label) {
                    self.start_block(label);
                    for stmt in &default.stmts {
                        self.lower_stmt(stmt, errors);
                    }
                    if !self.block_terminated() {
                        self.emit(Instruction::new(
                            Opcode::Jump,
                            None,
                            vec![ValueRef::Symbol(end_label.clone())],
                        ));
                    }
                }

                self.start_block(end_label);
            }
            StmtKind::Return(value) => {
                let args = match value {
                    Some(expr) => vec![ValueRef::Temp(self.lower_expr(expr, errors))],
                    None => Vec::new(),
                };
                self.emit(Instruction::new(Opcode::Return, None, args));
            }
            StmtKind::Break => match self.loop_stack.last().cloned() {
                Some((_, break_label)) => {
                    self.emit(Instruction::new(
                        Opcode::Jump,
                        None,
                        vec![ValueRef::Symbol(break_label)],
                    ));
                }
                None => errors.push(IrGenError::OutsideLoop {
                    word: "break".to_string(),
                    span: stmt.span,
                }),
            },
            StmtKind::Continue => match self.loop_stack.last().cloned() {
                Some((continue_label, _)) => {
                    self.emit(Instruction::new(
                        Opcode::Jump,
                        None,
                        vec![ValueRef::Symbol(continue_label)],
                    ));
                }
                None => errors.push(IrGenError::OutsideLoop {
                    word: "continue".to_string(),
                    span: stmt.span,
                }),
            },
            StmtKind::Block(block) => {
                for stmt in &block.stmts {
                    self.lower_stmt(stmt, errors);
                }
            }
            // Declarations are lowered separately by the generator;
            // nothing executes here.
            StmtKind::Function(_)
            | StmtKind::Struct(_)
            | StmtKind::TypeAlias { .. }
            | StmtKind::Impl(_) => {}
        }
    }

    /// For-in desugars to an integer-index loop over `length` of the
    /// iterable; position-based access is marked on the `IndexGet`.
    fn lower_for_in(
        &mut self,
        index: Option<&str>,
        item: &str,
        iterable: &Expr,
        body: &AstBlock,
        errors: &mut Vec<IrGenError>,
    ) {
        let iter_sym = self.hidden_symbol();
        let iter_temp = self.lower_expr(iterable, errors);
        self.emit(Instruction::new(
            Opcode::Store,
            None,
            vec![ValueRef::Symbol(iter_sym.clone()), ValueRef::Temp(iter_temp)],
        ));

        let index_sym = match index {
            Some(name) => {
                self.declare_var(name);
                name.to_string()
            }
            None => self.hidden_symbol(),
        };
        self.declare_var(item);

        let zero = self.fresh_temp();
        self.emit(Instruction::new(
            Opcode::Const,
            Some(zero),
            vec![ValueRef::Const(Constant::Int(0))],
        ));
        self.emit(Instruction::new(
            Opcode::Store,
            None,
            vec![ValueRef::Symbol(index_sym.clone()), ValueRef::Temp(zero)],
        ));

        let cond_label = self.fresh_label();
        let body_label = self.fresh_label();
        let post_label = self.fresh_label();
        let end_label = self.fresh_label();

        self.emit(Instruction::new(
            Opcode::Jump,
            None,
            vec![ValueRef::Symbol(cond_label.clone())],
        ));

        self.start_block(cond_label.clone());
        let idx = self.fresh_temp();
        self.emit(Instruction::new(
            Opcode::Load,
            Some(idx),
            vec![ValueRef::Symbol(index_sym.clone())],
        ));
        let container = self.fresh_temp();
        self.emit(Instruction::new(
            Opcode::Load,
            Some(container),
            vec![ValueRef::Symbol(iter_sym.clone())],
        ));
        let len = self.fresh_temp();
        self.emit(Instruction::new(
            Opcode::Call,
            Some(len),
            vec![
                ValueRef::Symbol("length".to_string()),
                ValueRef::Temp(container),
            ],
        ));
        let in_bounds = self.fresh_temp();
        self.emit(Instruction::new(
            Opcode::CmpLt,
            Some(in_bounds),
            vec![ValueRef::Temp(idx), ValueRef::Temp(len)],
        ));
        self.emit(Instruction::new(
            Opcode::Branch,
            None,
            vec![
                ValueRef::Temp(in_bounds),
                ValueRef::Symbol(body_label.clone()),
                ValueRef::Symbol(end_label.clone()),
            ],
        ));

        self.start_block(body_label);
        let container = self.fresh_temp();
        self.emit(Instruction::new(
            Opcode::Load,
            Some(container),
            vec![ValueRef::Symbol(iter_sym.clone())],
        ));
        let position = self.fresh_temp();
        self.emit(Instruction::new(
            Opcode::Load,
            Some(position),
            vec![ValueRef::Symbol(index_sym.clone())],
        ));
        let element = self.fresh_temp();
        self.emit(
            Instruction::new(
                Opcode::IndexGet,
                Some(element),
                vec![ValueRef::Temp(container), ValueRef::Temp(position)],
            )
            .with_meta("iter"),
        );
        self.emit(Instruction::new(
            Opcode::Store,
            None,
            vec![ValueRef::Symbol(item.to_string()), ValueRef::Temp(element)],
        ));
        self.loop_stack
            .push((post_label.clone(), end_label.clone()));
        for stmt in &body.stmts {
            self.lower_stmt(stmt, errors);
        }
        self.loop_stack.pop();
        if !self.block_terminated() {
            self.emit(Instruction::new(
                Opcode::Jump,
                None,
                vec![ValueRef::Symbol(post_label.clone())],
            ));
        }

        self.start_block(post_label);
        let old = self.fresh_temp();
        self.emit(Instruction::new(
            Opcode::Load,
            Some(old),
            vec![ValueRef::Symbol(index_sym.clone())],
        ));
        let one = self.fresh_temp();
        self.emit(Instruction::new(
            Opcode::Const,
            Some(one),
            vec![ValueRef::Const(Constant::Int(1))],
        ));
        let bumped = self.fresh_temp();
        self.emit(Instruction::new(
            Opcode::Add,
            Some(bumped),
            vec![ValueRef::Temp(old), ValueRef::Temp(one)],
        ));
        self.emit(Instruction::new(
            Opcode::Store,
            None,
            vec![ValueRef::Symbol(index_sym), ValueRef::Temp(bumped)],
        ));
        self.emit(Instruction::new(
            Opcode::Jump,
            None,
            vec![ValueRef::Symbol(cond_label)],
        ));

        self.start_block(end_label);
    }

    // =====================================================================
    // Expressions
    // =====================================================================

    fn lower_expr(&mut self, expr: &Expr, errors: &mut Vec<IrGenError>) -> Temp {
        match expr {
            Expr::Int(n, _) => self.emit_const(Constant::Int(*n)),
            Expr::Float(n, _) => self.emit_const(Constant::Float(*n)),
            Expr::Str(s, _) => self.emit_const(Constant::Str(s.clone())),
            Expr::Bool(b, _) => self.emit_const(Constant::Bool(*b)),
            Expr::Null(_) => self.emit_const(Constant::Null),
            Expr::Ident(name, _) => {
                let dst = self.fresh_temp();
                self.emit(Instruction::new(
                    Opcode::Load,
                    Some(dst),
                    vec![ValueRef::Symbol(name.clone())],
                ));
                dst
            }
            Expr::SelfValue(_) => {
                let dst = self.fresh_temp();
                self.emit(Instruction::new(
                    Opcode::Load,
                    Some(dst),
                    vec![ValueRef::Symbol("self".to_string())],
                ));
                dst
            }
            Expr::Unary {
                op,
                expr: operand,
                postfix,
                span,
            } => self.lower_unary(*op, operand, *postfix, *span, errors),
            Expr::Binary {
                op,
                left,
                right,
                ..
            } => match op {
                BinOp::And | BinOp::Or => self.lower_logical(*op, left, right, errors),
                _ => {
                    let l = self.lower_expr(left, errors);
                    let r = self.lower_expr(right, errors);
                    let dst = self.fresh_temp();
                    self.emit(Instruction::new(
                        binop_opcode(*op),
                        Some(dst),
                        vec![ValueRef::Temp(l), ValueRef::Temp(r)],
                    ));
                    dst
                }
            },
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
                ..
            } => {
                let result_sym = self.hidden_symbol();
                let cond_temp = self.lower_expr(cond, errors);
                let then_label = self.fresh_label();
                let else_label = self.fresh_label();
                let end_label = self.fresh_label();
                self.emit(Instruction::new(
                    Opcode::Branch,
                    None,
                    vec![
                        ValueRef::Temp(cond_temp),
                        ValueRef::Symbol(then_label.clone()),
                        ValueRef::Symbol(else_label.clone()),
                    ],
                ));

                self.start_block(then_label);
                let then_temp = self.lower_expr(then_expr, errors);
                self.emit(Instruction::new(
                    Opcode::Store,
                    None,
                    vec![
                        ValueRef::Symbol(result_sym.clone()),
                        ValueRef::Temp(then_temp),
                    ],
                ));
                self.emit(Instruction::new(
                    Opcode::Jump,
                    None,
                    vec![ValueRef::Symbol(end_label.clone())],
                ));

                self.start_block(else_label);
                let else_temp = self.lower_expr(else_expr, errors);
                self.emit(Instruction::new(
                    Opcode::Store,
                    None,
                    vec![
                        ValueRef::Symbol(result_sym.clone()),
                        ValueRef::Temp(else_temp),
                    ],
                ));
                self.emit(Instruction::new(
                    Opcode::Jump,
                    None,
                    vec![ValueRef::Symbol(end_label.clone())],
                ));

                self.start_block(end_label);
                let dst = self.fresh_temp();
                self.emit(Instruction::new(
                    Opcode::Load,
                    Some(dst),
                    vec![ValueRef::Symbol(result_sym)],
                ));
                dst
            }
            Expr::Assign {
                op,
                target,
                value,
                span,
            } => self.lower_assign(*op, target, value, *span, errors),
            Expr::Call { callee, args, span } => self.lower_call(callee, args, *span, errors),
            Expr::ArrayLit(elems, _) => {
                let args = elems
                    .iter()
                    .map(|e| ValueRef::Temp(self.lower_expr(e, errors)))
                    .collect();
                let dst = self.fresh_temp();
                self.emit(Instruction::new(Opcode::MakeArray, Some(dst), args));
                dst
            }
            Expr::MapLit(entries, _) => {
                let mut args = Vec::new();
                for (key, value) in entries {
                    args.push(ValueRef::Temp(self.lower_expr(key, errors)));
                    args.push(ValueRef::Temp(self.lower_expr(value, errors)));
                }
                let dst = self.fresh_temp();
                self.emit(Instruction::new(Opcode::MakeMap, Some(dst), args));
                dst
            }
            Expr::SetLit(elems, _) => {
                let args = elems
                    .iter()
                    .map(|e| ValueRef::Temp(self.lower_expr(e, errors)))
                    .collect();
                let dst = self.fresh_temp();
                self.emit(Instruction::new(Opcode::MakeSet, Some(dst), args));
                dst
            }
            Expr::StructLit { name, fields, .. } => {
                let dst = self.fresh_temp();
                self.emit(
                    Instruction::new(Opcode::MakeStruct, Some(dst), Vec::new()).with_meta(name),
                );
                for (field, value) in fields {
                    let value_temp = self.lower_expr(value, errors);
                    self.emit(
                        Instruction::new(
                            Opcode::MemberSet,
                            None,
                            vec![ValueRef::Temp(dst), ValueRef::Temp(value_temp)],
                        )
                        .with_meta(field),
                    );
                }
                dst
            }
            Expr::Index { object, index, .. } => {
                let object_temp = self.lower_expr(object, errors);
                let index_temp = self.lower_expr(index, errors);
                let dst = self.fresh_temp();
                self.emit(Instruction::new(
                    Opcode::IndexGet,
                    Some(dst),
                    vec![ValueRef::Temp(object_temp), ValueRef::Temp(index_temp)],
                ));
                dst
            }
            Expr::Member { object, name, .. } => {
                let object_temp = self.lower_expr(object, errors);
                let dst = self.fresh_temp();
                self.emit(
                    Instruction::new(
                        Opcode::MemberGet,
                        Some(dst),
                        vec![ValueRef::Temp(object_temp)],
                    )
                    .with_meta(name),
                );
                dst
            }
            // Pointers carry no runtime representation of their own;
            // the referenced value flows through.
            Expr::Reference(inner, _) => self.lower_expr(inner, errors),
            Expr::New {
                type_name, args, ..
            } => {
                let dst = self.fresh_temp();
                self.emit(
                    Instruction::new(Opcode::MakeStruct, Some(dst), Vec::new())
                        .with_meta(type_name),
                );
                // The init call is marked so the VM treats a struct
                // without an implementation as a no-op construction.
                let mut call_args = vec![
                    ValueRef::Symbol(format!("{type_name}.init")),
                    ValueRef::Temp(dst),
                ];
                for arg in args {
                    call_args.push(ValueRef::Temp(self.lower_expr(arg, errors)));
                }
                let ignored = self.fresh_temp();
                self.emit(
                    Instruction::new(Opcode::Call, Some(ignored), call_args).with_meta("init"),
                );
                dst
            }
            Expr::Specialize { callee, .. } => self.lower_expr(callee, errors),
        }
    }

    fn emit_const(&mut self, constant: Constant) -> Temp {
        let dst = self.fresh_temp();
        self.emit(Instruction::new(
            Opcode::Const,
            Some(dst),
            vec![ValueRef::Const(constant)],
        ));
        dst
    }

    fn lower_unary(
        &mut self,
        op: UnOp,
        operand: &Expr,
        postfix: bool,
        span: Span,
        errors: &mut Vec<IrGenError>,
    ) -> Temp {
        match op {
            UnOp::Neg => {
                let value = self.lower_expr(operand, errors);
                let dst = self.fresh_temp();
                self.emit(Instruction::new(
                    Opcode::Neg,
                    Some(dst),
                    vec![ValueRef::Temp(value)],
                ));
                dst
            }
            UnOp::Pos => self.lower_expr(operand, errors),
            UnOp::Not => {
                let value = self.lower_expr(operand, errors);
                let dst = self.fresh_temp();
                self.emit(Instruction::new(
                    Opcode::Not,
                    Some(dst),
                    vec![ValueRef::Temp(value)],
                ));
                dst
            }
            UnOp::Inc | UnOp::Dec => {
                let delta = if op == UnOp::Inc {
                    Constant::Int(1)
                } else {
                    Constant::Int(-1)
                };
                let old = self.lower_read_target(operand, span, errors);
                let delta_temp = self.emit_const(delta);
                let new = self.fresh_temp();
                self.emit(Instruction::new(
                    Opcode::Add,
                    Some(new),
                    vec![ValueRef::Temp(old), ValueRef::Temp(delta_temp)],
                ));
                self.lower_write_target(operand, new, span, errors);
                if postfix {
                    old
                } else {
                    new
                }
            }
        }
    }

    /// Short-circuit `&&` / `||` via a hidden merge local; the result
    /// is always a bool regardless of the operand kinds.
    fn lower_logical(
        &mut self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
        errors: &mut Vec<IrGenError>,
    ) -> Temp {
        let result_sym = self.hidden_symbol();
        let init = self.emit_const(Constant::Bool(false));
        self.emit(Instruction::new(
            Opcode::Store,
            None,
            vec![ValueRef::Symbol(result_sym.clone()), ValueRef::Temp(init)],
        ));

        let rhs_label = self.fresh_label();
        let true_label = self.fresh_label();
        let end_label = self.fresh_label();

        let left_temp = self.lower_expr(left, errors);
        let (on_true, on_false) = match op {
            BinOp::And => (rhs_label.clone(), end_label.clone()),
            _ => (true_label.clone(), rhs_label.clone()),
        };
        self.emit(Instruction::new(
            Opcode::Branch,
            None,
            vec![
                ValueRef::Temp(left_temp),
                ValueRef::Symbol(on_true),
                ValueRef::Symbol(on_false),
            ],
        ));

        self.start_block(rhs_label);
        let right_temp = self.lower_expr(right, errors);
        self.emit(Instruction::new(
            Opcode::Branch,
            None,
            vec![
                ValueRef::Temp(right_temp),
                ValueRef::Symbol(true_label.clone()),
                ValueRef::Symbol(end_label.clone()),
            ],
        ));

        self.start_block(true_label);
        let true_temp = self.emit_const(Constant::Bool(true));
        self.emit(Instruction::new(
            Opcode::Store,
            None,
            vec![
                ValueRef::Symbol(result_sym.clone()),
                ValueRef::Temp(true_temp),
            ],
        ));
        self.emit(Instruction::new(
            Opcode::Jump,
            None,
            vec![ValueRef::Symbol(end_label.clone())],
        ));

        self.start_block(end_label);
        let dst = self.fresh_temp();
        self.emit(Instruction::new(
            Opcode::Load,
            Some(dst),
            vec![ValueRef::Symbol(result_sym)],
        ));
        dst
    }

    fn lower_assign(
        &mut self,
        op: AssignOp,
        target: &Expr,
        value: &Expr,
        span: Span,
        errors: &mut Vec<IrGenError>,
    ) -> Temp {
        let result = match op.binary() {
            None => self.lower_expr(value, errors),
            Some(binary) => {
                let old = self.lower_read_target(target, span, errors);
                let rhs = self.lower_expr(value, errors);
                let dst = self.fresh_temp();
                self.emit(Instruction::new(
                    binop_opcode(binary),
                    Some(dst),
                    vec![ValueRef::Temp(old), ValueRef::Temp(rhs)],
                ));
                dst
            }
        };
        self.lower_write_target(target, result, span, errors);
        result
    }

    /// Read the current value of an assignable expression
    fn lower_read_target(
        &mut self,
        target: &Expr,
        span: Span,
        errors: &mut Vec<IrGenError>,
    ) -> Temp {
        match target {
            Expr::Ident(..) | Expr::Member { .. } | Expr::Index { .. } | Expr::SelfValue(_) => {
                self.lower_expr(target, errors)
            }
            _ => {
                errors.push(IrGenError::BadAssignTarget { span });
                self.emit_const(Constant::Null)
            }
        }
    }

    /// Store a temp into an assignable expression
    fn lower_write_target(
        &mut self,
        target: &Expr,
        value: Temp,
        span: Span,
        errors: &mut Vec<IrGenError>,
    ) {
        match target {
            Expr::Ident(name, _) => {
                self.emit(Instruction::new(
                    Opcode::Store,
                    None,
                    vec![ValueRef::Symbol(name.clone()), ValueRef::Temp(value)],
                ));
            }
            Expr::Member { object, name, .. } => {
                let object_temp = self.lower_expr(object, errors);
                self.emit(
                    Instruction::new(
                        Opcode::MemberSet,
                        None,
                        vec![ValueRef::Temp(object_temp), ValueRef::Temp(value)],
                    )
                    .with_meta(name),
                );
            }
            Expr::Index { object, index, .. } => {
                let object_temp = self.lower_expr(object, errors);
                let index_temp = self.lower_expr(index, errors);
                self.emit(Instruction::new(
                    Opcode::IndexSet,
                    None,
                    vec![
                        ValueRef::Temp(object_temp),
                        ValueRef::Temp(index_temp),
                        ValueRef::Temp(value),
                    ],
                ));
            }
            _ => errors.push(IrGenError::BadAssignTarget { span }),
        }
    }

    fn lower_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        span: Span,
        errors: &mut Vec<IrGenError>,
    ) -> Temp {
        match callee {
            Expr::Ident(name, _) => {
                let mut call_args = vec![ValueRef::Symbol(name.clone())];
                for arg in args {
                    call_args.push(ValueRef::Temp(self.lower_expr(arg, errors)));
                }
                let dst = self.fresh_temp();
                self.emit(Instruction::new(Opcode::Call, Some(dst), call_args));
                dst
            }
            // Method calls resolve dynamically: the VM maps the
            // receiver's struct to `Struct.method`.
            Expr::Member { object, name, .. } => {
                let receiver = self.lower_expr(object, errors);
                let mut call_args = vec![
                    ValueRef::Symbol(format!("method:{name}")),
                    ValueRef::Temp(receiver),
                ];
                for arg in args {
                    call_args.push(ValueRef::Temp(self.lower_expr(arg, errors)));
                }
                let dst = self.fresh_temp();
                self.emit(Instruction::new(Opcode::Call, Some(dst), call_args));
                dst
            }
            Expr::Specialize { callee: inner, .. } => self.lower_call(inner, args, span, errors),
            _ => {
                errors.push(IrGenError::UnsupportedCallee { span });
                self.emit_const(Constant::Null)
            }
        }
    }
}

fn binop_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Add => Opcode::Add,
        BinOp::Sub => Opcode::Sub,
        BinOp::Mul => Opcode::Mul,
        BinOp::Div => Opcode::Div,
        BinOp::Mod => Opcode::Mod,
        BinOp::Eq => Opcode::CmpEq,
        BinOp::Ne => Opcode::CmpNe,
        BinOp::Lt => Opcode::CmpLt,
        BinOp::Le => Opcode::CmpLe,
        BinOp::Gt => Opcode::CmpGt,
        BinOp::Ge => Opcode::CmpGe,
        BinOp::And | BinOp::Or => unreachable!("logical operators lower to control flow"),
    }
}
