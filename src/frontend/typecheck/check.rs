//! Statement and expression checking

use indexmap::IndexMap;

use super::super::parser::ast::*;
use super::scope::{ScopeStack, Symbol, SymbolKind};
use super::types::{compatible, conditionable, widen};
use super::{CheckResult, FuncSig, MethodSig, StructInfo, TypeError};
use crate::util::span::Span;

/// Builtin functions available in every scope
pub const BUILTINS: &[&str] = &["print", "length", "append", "remove", "removeIndex"];

/// Depth guard for alias expansion
const MAX_ALIAS_DEPTH: usize = 8;

/// The type checker
///
/// Owns the scope chain, the struct/function tables, and the error
/// list. `check_program` drives a depth-first walk; expression
/// checking returns the `error` sentinel on failure so one broken
/// subexpression reports once.
#[derive(Debug)]
pub struct Checker {
    scopes: ScopeStack,
    errors: Vec<TypeError>,
    structs: IndexMap<String, StructInfo>,
    functions: IndexMap<String, FuncSig>,
    aliases: IndexMap<String, Type>,
    /// Declared return type of the enclosing function, `None` at
    /// program scope
    current_return: Option<Type>,
    loop_depth: usize,
    /// Struct bound to `self` inside an implementation block
    current_impl: Option<String>,
}

impl Checker {
    pub fn new() -> Self {
        let mut scopes = ScopeStack::new();
        for name in BUILTINS {
            let _ = scopes.define(Symbol::new(
                *name,
                SymbolKind::Function,
                None,
                Span::dummy(),
            ));
        }
        Self {
            scopes,
            errors: Vec::new(),
            structs: IndexMap::new(),
            functions: IndexMap::new(),
            aliases: IndexMap::new(),
            current_return: None,
            loop_depth: 0,
            current_impl: None,
        }
    }

    pub fn into_result(self) -> CheckResult {
        CheckResult {
            errors: self.errors,
            structs: self.structs,
            functions: self.functions,
        }
    }

    fn error(&mut self, error: TypeError) {
        self.errors.push(error);
    }

    /// Check a whole program in the root scope
    pub fn check_program(&mut self, program: &mut Program) {
        for stmt in &mut program.body {
            self.check_stmt(stmt);
        }
    }

    // =====================================================================
    // Statements
    // =====================================================================

    fn check_stmt(&mut self, stmt: &mut Stmt) {
        let span = stmt.span;
        match &mut stmt.kind {
            StmtKind::Var { .. } => self.check_var_decl(stmt),
            StmtKind::Expr(expr) => {
                let expr = expr.clone();
                self.check_expr(&expr);
            }
            StmtKind::If {
                cond,
                then_block,
                else_branch,
            } => {
                let cond = cond.clone();
                let cond_ty = self.check_expr(&cond);
                if !conditionable(&cond_ty) {
                    self.error(TypeError::BadCondition {
                        found: cond_ty.to_string(),
                        span: cond.span(),
                    });
                }
                self.check_block(then_block);
                if let Some(else_stmt) = else_branch {
                    // The else branch is its own scope whether it is a
                    // block or a chained if.
                    self.scopes.push();
                    self.check_stmt(else_stmt);
                    self.scopes.pop();
                }
            }
            StmtKind::While { cond, body } => {
                let cond = cond.clone();
                let cond_ty = self.check_expr(&cond);
                if !conditionable(&cond_ty) {
                    self.error(TypeError::BadCondition {
                        found: cond_ty.to_string(),
                        span: cond.span(),
                    });
                }
                self.loop_depth += 1;
                self.check_block(body);
                self.loop_depth -= 1;
            }
            StmtKind::DoWhile { body, cond } => {
                self.loop_depth += 1;
                self.check_block(body);
                self.loop_depth -= 1;
                // Stricter than if/while: the source insists on bool.
                let cond = cond.clone();
                let cond_ty = self.check_expr(&cond);
                if !cond_ty.is_bool() && !cond_ty.is_error() {
                    self.error(TypeError::BadCondition {
                        found: cond_ty.to_string(),
                        span: cond.span(),
                    });
                }
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                // The initializer introduces its own scope that the
                // condition, post, and body all see.
                self.scopes.push();
                if let Some(init) = init {
                    self.check_stmt(init);
                }
                if let Some(cond) = cond {
                    let cond = cond.clone();
                    let cond_ty = self.check_expr(&cond);
                    if !cond_ty.is_bool() && !cond_ty.is_error() {
                        self.error(TypeError::BadCondition {
                            found: cond_ty.to_string(),
                            span: cond.span(),
                        });
                    }
                }
                if let Some(post) = post {
                    let post = post.clone();
                    self.check_expr(&post);
                }
                self.loop_depth += 1;
                self.check_block(body);
                self.loop_depth -= 1;
                self.scopes.pop();
            }
            StmtKind::ForIn {
                index,
                item,
                iterable,
                body,
            } => {
                let iterable = iterable.clone();
                let iter_ty = self.check_expr(&iterable);
                let item_ty = self.element_type(&iter_ty, iterable.span());

                self.scopes.push();
                if let Some(index_name) = index {
                    self.define(Symbol::new(
                        index_name.clone(),
                        SymbolKind::Var,
                        Some(Type::Primitive("int".to_string())),
                        span,
                    ));
                }
                self.define(Symbol::new(
                    item.clone(),
                    SymbolKind::Var,
                    Some(item_ty),
                    span,
                ));
                self.loop_depth += 1;
                self.check_block(body);
                self.loop_depth -= 1;
                self.scopes.pop();
            }
            StmtKind::Switch {
                disc,
                cases,
                default,
            } => {
                let disc = disc.clone();
                let disc_ty = self.check_expr(&disc);
                for case in cases.iter_mut() {
                    let value = case.value.clone();
                    let value_ty = self.check_expr(&value);
                    if !compatible(&disc_ty, &value_ty) && !compatible(&value_ty, &disc_ty) {
                        self.error(TypeError::AssignMismatch {
                            src: value_ty.to_string(),
                            dst: disc_ty.to_string(),
                            span: value.span(),
                        });
                    }
                    self.check_block(&mut case.body);
                }
                if let Some(default) = default {
                    self.check_block(default);
                }
            }
            StmtKind::Return(value) => {
                let value = value.clone();
                match self.current_return.clone() {
                    None => self.error(TypeError::ReturnOutsideFunction { span }),
                    Some(declared) => {
                        let is_void = matches!(&declared, Type::Primitive(n) if n == "void");
                        match value {
                            Some(expr) => {
                                let value_ty = self.check_expr(&expr);
                                if is_void {
                                    self.error(TypeError::ReturnValueInVoid { span });
                                } else if !compatible(&declared, &value_ty) {
                                    self.error(TypeError::AssignMismatch {
                                        src: value_ty.to_string(),
                                        dst: declared.to_string(),
                                        span: expr.span(),
                                    });
                                }
                            }
                            None => {
                                if !is_void {
                                    self.error(TypeError::MissingReturnValue { span });
                                }
                            }
                        }
                    }
                }
            }
            StmtKind::Break => {
                if self.loop_depth == 0 {
                    self.error(TypeError::OutsideLoop {
                        word: "break".to_string(),
                        span,
                    });
                }
            }
            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    self.error(TypeError::OutsideLoop {
                        word: "continue".to_string(),
                        span,
                    });
                }
            }
            StmtKind::Block(block) => self.check_block(block),
            StmtKind::Function(decl) => self.check_function(decl),
            StmtKind::Struct(decl) => self.check_struct(decl),
            StmtKind::TypeAlias { name, ty } => {
                let name = name.clone();
                let ty = ty.clone();
                let resolved = self.resolve_type(&ty, span);
                self.define(Symbol::new(
                    name.clone(),
                    SymbolKind::TypeAlias,
                    None,
                    span,
                ));
                self.aliases.insert(name, resolved);
            }
            StmtKind::Impl(decl) => self.check_impl(decl),
        }
    }

    /// Variable or constant declaration, annotating the resolved type
    fn check_var_decl(&mut self, stmt: &mut Stmt) {
        let span = stmt.span;
        let StmtKind::Var {
            name,
            ty,
            init,
            is_const,
            resolved,
        } = &mut stmt.kind
        else {
            return;
        };
        let name = name.clone();
        let declared = ty.clone();
        let init = init.clone();
        let is_const = *is_const;

        let init_ty = init.as_ref().map(|expr| self.check_expr(expr));

        let final_ty = match (declared, init_ty) {
            (Some(declared), Some(init_ty)) => {
                let declared = self.resolve_type(&declared, span);
                if !compatible(&declared, &init_ty) {
                    self.error(TypeError::AssignMismatch {
                        src: init_ty.to_string(),
                        dst: declared.to_string(),
                        span: init.as_ref().map(|e| e.span()).unwrap_or(span),
                    });
                }
                declared
            }
            (Some(declared), None) => self.resolve_type(&declared, span),
            (None, Some(init_ty)) => init_ty,
            (None, None) => {
                self.error(TypeError::CannotInfer {
                    name: name.clone(),
                    span,
                });
                Type::error()
            }
        };

        *resolved = Some(final_ty.clone());

        let kind = if is_const {
            SymbolKind::Const
        } else {
            SymbolKind::Var
        };
        self.define(Symbol::new(name, kind, Some(final_ty), span));
    }

    /// Function declaration: symbol in the enclosing scope (before the
    /// body, so recursion resolves), generics and parameters in the
    /// body scope
    fn check_function(&mut self, decl: &mut FunctionDecl) {
        let span = decl.span;

        self.define(
            Symbol::new(
                decl.name.clone(),
                SymbolKind::Function,
                Some(Type::Function {
                    params: decl.params.iter().map(|p| p.ty.clone()).collect(),
                    ret: Box::new(decl.ret.clone()),
                }),
                span,
            )
            .with_generics(decl.generics.len()),
        );

        self.scopes.push();
        for generic in &decl.generics {
            self.define(Symbol::new(
                generic.clone(),
                SymbolKind::GenericParam,
                None,
                span,
            ));
        }
        let ret = self.resolve_type(&decl.ret, span);
        let mut params = Vec::new();
        for param in &decl.params {
            let param_ty = self.resolve_type(&param.ty, param.span);
            params.push((param.name.clone(), param_ty.clone()));
            self.define(Symbol::new(
                param.name.clone(),
                SymbolKind::Var,
                Some(param_ty),
                param.span,
            ));
        }

        let sig = FuncSig {
            generics: decl.generics.clone(),
            params,
            ret: ret.clone(),
        };
        self.functions.insert(decl.name.clone(), sig);

        let previous_return = self.current_return.replace(ret);
        let previous_depth = std::mem::take(&mut self.loop_depth);
        self.check_block_stmts(&mut decl.body);
        self.loop_depth = previous_depth;
        self.current_return = previous_return;
        self.scopes.pop();
    }

    /// Struct declaration: duplicate fields, resolvable field types
    fn check_struct(&mut self, decl: &mut StructDecl) {
        let span = decl.span;

        self.scopes.push();
        for generic in &decl.generics {
            self.define(Symbol::new(
                generic.clone(),
                SymbolKind::GenericParam,
                None,
                span,
            ));
        }

        let mut fields: IndexMap<String, Type> = IndexMap::new();
        for field in &decl.fields {
            if fields.contains_key(&field.name) {
                self.error(TypeError::DuplicateField {
                    name: decl.name.clone(),
                    field: field.name.clone(),
                    span: field.span,
                });
                continue;
            }
            let field_ty = self.resolve_type(&field.ty, field.span);
            fields.insert(field.name.clone(), field_ty);
        }
        self.scopes.pop();

        self.structs.insert(
            decl.name.clone(),
            StructInfo {
                name: decl.name.clone(),
                generics: decl.generics.clone(),
                fields,
                methods: IndexMap::new(),
            },
        );
        self.define(Symbol::new(
            decl.name.clone(),
            SymbolKind::Struct,
            None,
            span,
        ));
    }

    /// Implementation block: methods checked with `self` pre-bound
    fn check_impl(&mut self, decl: &mut ImplDecl) {
        let span = decl.span;
        if !self.structs.contains_key(&decl.target) {
            self.error(TypeError::NotAStruct {
                name: decl.target.clone(),
                span,
            });
            return;
        }

        let previous_impl = self.current_impl.replace(decl.target.clone());
        for method in &mut decl.methods {
            // Record the signature before checking the body so methods
            // can call each other and themselves.
            let params: Vec<(String, Type)> = method
                .params
                .iter()
                .map(|p| (p.name.clone(), self.resolve_type(&p.ty, p.span)))
                .collect();
            let ret = self.resolve_type(&method.ret, method.span);
            if let Some(info) = self.structs.get_mut(&decl.target) {
                info.methods.insert(
                    method.name.clone(),
                    MethodSig {
                        params: params.clone(),
                        ret: ret.clone(),
                    },
                );
            }

            self.scopes.push();
            self.define(Symbol::new(
                "self",
                SymbolKind::Var,
                Some(Type::Named(decl.target.clone())),
                method.span,
            ));
            for generic in &method.generics {
                self.define(Symbol::new(
                    generic.clone(),
                    SymbolKind::GenericParam,
                    None,
                    method.span,
                ));
            }
            for (param, (_, param_ty)) in method.params.iter().zip(&params) {
                self.define(Symbol::new(
                    param.name.clone(),
                    SymbolKind::Var,
                    Some(param_ty.clone()),
                    param.span,
                ));
            }
            let previous_return = self.current_return.replace(ret);
            let previous_depth = std::mem::take(&mut self.loop_depth);
            self.check_block_stmts(&mut method.body);
            self.loop_depth = previous_depth;
            self.current_return = previous_return;
            self.scopes.pop();
        }
        self.current_impl = previous_impl;
    }

    /// Check a block in a fresh scope
    fn check_block(&mut self, block: &mut Block) {
        self.scopes.push();
        self.check_block_stmts(block);
        self.scopes.pop();
    }

    /// Check block statements in the current scope
    fn check_block_stmts(&mut self, block: &mut Block) {
        for stmt in &mut block.stmts {
            self.check_stmt(stmt);
        }
    }

    // =====================================================================
    // Expressions
    // =====================================================================

    /// Check an expression, returning its type. Failures report once
    /// and yield the `error` sentinel.
    pub fn check_expr(&mut self, expr: &Expr) -> Type {
        match expr {
            Expr::Int(..) => Type::Primitive("int".to_string()),
            Expr::Float(..) => Type::Primitive("float".to_string()),
            Expr::Str(..) => Type::Primitive("string".to_string()),
            Expr::Bool(..) => Type::Primitive("bool".to_string()),
            Expr::Null(_) => Type::Primitive("null".to_string()),
            Expr::Ident(name, span) => match self.scopes.resolve(name) {
                Some(symbol) => symbol.ty.clone().unwrap_or_else(Type::error),
                None => {
                    self.error(TypeError::Undeclared {
                        name: name.clone(),
                        span: *span,
                    });
                    Type::error()
                }
            },
            Expr::SelfValue(span) => match &self.current_impl {
                Some(target) => Type::Named(target.clone()),
                None => {
                    self.error(TypeError::SelfOutsideImpl { span: *span });
                    Type::error()
                }
            },
            Expr::Unary {
                op,
                expr: operand,
                postfix: _,
                span,
            } => self.check_unary(*op, operand, *span),
            Expr::Binary {
                op,
                left,
                right,
                span,
            } => self.check_binary(*op, left, right, *span),
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
                ..
            } => {
                let cond_ty = self.check_expr(cond);
                if !conditionable(&cond_ty) {
                    self.error(TypeError::BadCondition {
                        found: cond_ty.to_string(),
                        span: cond.span(),
                    });
                }
                let then_ty = self.check_expr(then_expr);
                let else_ty = self.check_expr(else_expr);
                if !compatible(&then_ty, &else_ty) && !compatible(&else_ty, &then_ty) {
                    self.error(TypeError::AssignMismatch {
                        src: else_ty.to_string(),
                        dst: then_ty.to_string(),
                        span: else_expr.span(),
                    });
                }
                then_ty
            }
            Expr::Assign {
                op,
                target,
                value,
                span,
            } => self.check_assign(*op, target, value, *span),
            Expr::Call { callee, args, span } => self.check_call(callee, args, *span),
            Expr::ArrayLit(elems, _) => {
                let mut elem_ty = Type::Any;
                for (i, elem) in elems.iter().enumerate() {
                    let ty = self.check_expr(elem);
                    if i == 0 {
                        elem_ty = ty;
                    } else if !compatible(&elem_ty, &ty) && !compatible(&ty, &elem_ty) {
                        self.error(TypeError::AssignMismatch {
                            src: ty.to_string(),
                            dst: elem_ty.to_string(),
                            span: elem.span(),
                        });
                    }
                }
                Type::Array {
                    elem: Box::new(elem_ty),
                    size: None,
                }
            }
            Expr::MapLit(entries, _) => {
                let mut key_ty = Type::Any;
                let mut value_ty = Type::Any;
                for (i, (key, value)) in entries.iter().enumerate() {
                    let k = self.check_expr(key);
                    let v = self.check_expr(value);
                    if i == 0 {
                        key_ty = k;
                        value_ty = v;
                    } else {
                        if !compatible(&key_ty, &k) && !compatible(&k, &key_ty) {
                            self.error(TypeError::AssignMismatch {
                                src: k.to_string(),
                                dst: key_ty.to_string(),
                                span: key.span(),
                            });
                        }
                        if !compatible(&value_ty, &v) && !compatible(&v, &value_ty) {
                            self.error(TypeError::AssignMismatch {
                                src: v.to_string(),
                                dst: value_ty.to_string(),
                                span: value.span(),
                            });
                        }
                    }
                }
                Type::Map {
                    key: Box::new(key_ty),
                    value: Box::new(value_ty),
                }
            }
            Expr::SetLit(elems, _) => {
                let mut elem_ty = Type::Any;
                for (i, elem) in elems.iter().enumerate() {
                    let ty = self.check_expr(elem);
                    if i == 0 {
                        elem_ty = ty;
                    } else if !compatible(&elem_ty, &ty) && !compatible(&ty, &elem_ty) {
                        self.error(TypeError::AssignMismatch {
                            src: ty.to_string(),
                            dst: elem_ty.to_string(),
                            span: elem.span(),
                        });
                    }
                }
                Type::Set(Box::new(elem_ty))
            }
            Expr::StructLit { name, fields, span } => {
                let Some(info) = self.structs.get(name).cloned() else {
                    self.error(TypeError::NotAStruct {
                        name: name.clone(),
                        span: *span,
                    });
                    return Type::error();
                };
                for (field_name, value) in fields {
                    let value_ty = self.check_expr(value);
                    match info.fields.get(field_name) {
                        Some(field_ty) => {
                            if !compatible(field_ty, &value_ty) {
                                self.error(TypeError::AssignMismatch {
                                    src: value_ty.to_string(),
                                    dst: field_ty.to_string(),
                                    span: value.span(),
                                });
                            }
                        }
                        None => self.error(TypeError::UnknownField {
                            name: name.clone(),
                            field: field_name.clone(),
                            span: value.span(),
                        }),
                    }
                }
                Type::Named(name.clone())
            }
            Expr::Index {
                object,
                index,
                span,
            } => {
                let object_ty = self.check_expr(object);
                let index_ty = self.check_expr(index);
                match &object_ty {
                    Type::Array { elem, .. } => {
                        if !index_ty.is_error()
                            && !matches!(&index_ty, Type::Primitive(n) if n == "int")
                        {
                            self.error(TypeError::AssignMismatch {
                                src: index_ty.to_string(),
                                dst: "int".to_string(),
                                span: index.span(),
                            });
                        }
                        (**elem).clone()
                    }
                    Type::Map { key, value } => {
                        if !compatible(key, &index_ty) {
                            self.error(TypeError::AssignMismatch {
                                src: index_ty.to_string(),
                                dst: key.to_string(),
                                span: index.span(),
                            });
                        }
                        (**value).clone()
                    }
                    Type::Primitive(name) if name == "string" => {
                        Type::Primitive("string".to_string())
                    }
                    ty if ty.is_error() => Type::error(),
                    other => {
                        self.error(TypeError::NotIndexable {
                            found: other.to_string(),
                            span: *span,
                        });
                        Type::error()
                    }
                }
            }
            Expr::Member { object, name, span } => self.check_member(object, name, *span),
            Expr::Reference(inner, _) => {
                let inner_ty = self.check_expr(inner);
                Type::Pointer(Box::new(inner_ty))
            }
            Expr::New {
                type_name,
                type_args,
                args,
                span,
            } => self.check_new(type_name, type_args, args, *span),
            Expr::Specialize {
                callee,
                type_args,
                span,
            } => {
                // Standalone specialization; normally consumed by a
                // call. Validate arity and surface the function type.
                if let Expr::Ident(name, _) = callee.as_ref() {
                    if let Some(sig) = self.functions.get(name).cloned() {
                        if sig.generics.len() != type_args.len() {
                            self.error(TypeError::TypeArgArity {
                                expected: sig.generics.len(),
                                found: type_args.len(),
                                span: *span,
                            });
                        }
                    }
                }
                self.check_expr(callee)
            }
        }
    }

    fn check_unary(&mut self, op: UnOp, operand: &Expr, span: Span) -> Type {
        let operand_ty = self.check_expr(operand);
        match op {
            UnOp::Not => {
                if !operand_ty.is_bool() && !operand_ty.is_error() {
                    self.error(TypeError::InvalidOperands {
                        op: "!".to_string(),
                        left: operand_ty.to_string(),
                        right: "-".to_string(),
                        span,
                    });
                }
                Type::Primitive("bool".to_string())
            }
            UnOp::Neg | UnOp::Pos => {
                if !operand_ty.is_numeric() && !operand_ty.is_error() {
                    self.error(TypeError::NotNumeric {
                        op: if op == UnOp::Neg { "-" } else { "+" }.to_string(),
                        found: operand_ty.to_string(),
                        span,
                    });
                }
                operand_ty
            }
            UnOp::Inc | UnOp::Dec => {
                let op_text = if op == UnOp::Inc { "++" } else { "--" };
                if !operand.is_lvalue() {
                    self.error(TypeError::NotLValue { span });
                } else if let Expr::Ident(name, _) = operand {
                    let is_const = self
                        .scopes
                        .resolve(name)
                        .map(|s| s.kind == SymbolKind::Const)
                        .unwrap_or(false);
                    if is_const {
                        let name = name.clone();
                        self.error(TypeError::AssignToConst { name, span });
                    }
                }
                if !operand_ty.is_numeric() && !operand_ty.is_error() {
                    self.error(TypeError::NotNumeric {
                        op: op_text.to_string(),
                        found: operand_ty.to_string(),
                        span,
                    });
                }
                operand_ty
            }
        }
    }

    fn check_binary(&mut self, op: BinOp, left: &Expr, right: &Expr, span: Span) -> Type {
        let left_ty = self.check_expr(left);
        let right_ty = self.check_expr(right);
        if left_ty.is_error() || right_ty.is_error() {
            return match op {
                op if op.is_comparison() => Type::Primitive("bool".to_string()),
                _ => Type::error(),
            };
        }

        match op {
            BinOp::Add if left_ty.is_string() && right_ty.is_string() => {
                Type::Primitive("string".to_string())
            }
            op if op.is_arithmetic() => {
                if !left_ty.is_numeric() || !right_ty.is_numeric() {
                    self.error(TypeError::InvalidOperands {
                        op: op.as_str().to_string(),
                        left: left_ty.to_string(),
                        right: right_ty.to_string(),
                        span,
                    });
                    return Type::error();
                }
                widen(&left_ty, &right_ty)
            }
            op if op.is_comparison() => {
                let cross_numeric = left_ty.is_numeric() && right_ty.is_numeric();
                if !cross_numeric
                    && !compatible(&left_ty, &right_ty)
                    && !compatible(&right_ty, &left_ty)
                {
                    self.error(TypeError::InvalidOperands {
                        op: op.as_str().to_string(),
                        left: left_ty.to_string(),
                        right: right_ty.to_string(),
                        span,
                    });
                }
                Type::Primitive("bool".to_string())
            }
            BinOp::And | BinOp::Or => {
                for (side, ty) in [(left, &left_ty), (right, &right_ty)] {
                    if !conditionable(ty) {
                        self.error(TypeError::BadCondition {
                            found: ty.to_string(),
                            span: side.span(),
                        });
                    }
                }
                Type::Primitive("bool".to_string())
            }
            _ => unreachable!("binary operator handled above"),
        }
    }

    fn check_assign(&mut self, op: AssignOp, target: &Expr, value: &Expr, span: Span) -> Type {
        if !target.is_lvalue() {
            self.error(TypeError::NotLValue { span });
            self.check_expr(value);
            return Type::error();
        }
        if let Expr::Ident(name, _) = target {
            let is_const = self
                .scopes
                .resolve(name)
                .map(|s| s.kind == SymbolKind::Const)
                .unwrap_or(false);
            if is_const {
                let name = name.clone();
                self.error(TypeError::AssignToConst { name, span });
            }
        }

        let target_ty = self.check_expr(target);
        let value_ty = self.check_expr(value);

        if let Some(binary) = op.binary() {
            // Compound assignment: the expansion must type like the
            // matching arithmetic, with string append allowed for `+=`.
            let string_append =
                binary == BinOp::Add && target_ty.is_string() && value_ty.is_string();
            if !string_append
                && !(target_ty.is_numeric() && value_ty.is_numeric())
                && !target_ty.is_error()
                && !value_ty.is_error()
            {
                self.error(TypeError::InvalidOperands {
                    op: binary.as_str().to_string(),
                    left: target_ty.to_string(),
                    right: value_ty.to_string(),
                    span,
                });
                return Type::error();
            }
        } else if !compatible(&target_ty, &value_ty) {
            self.error(TypeError::AssignMismatch {
                src: value_ty.to_string(),
                dst: target_ty.to_string(),
                span,
            });
        }
        target_ty
    }

    fn check_call(&mut self, callee: &Expr, args: &[Expr], span: Span) -> Type {
        let arg_types: Vec<Type> = args.iter().map(|a| self.check_expr(a)).collect();

        match callee {
            Expr::Ident(name, _) if BUILTINS.contains(&name.as_str()) => {
                self.check_builtin_call(name, args, &arg_types, span)
            }
            Expr::Ident(name, ident_span) => {
                if self.scopes.resolve(name).is_none() {
                    self.error(TypeError::Undeclared {
                        name: name.clone(),
                        span: *ident_span,
                    });
                    return Type::error();
                }
                match self.functions.get(name).cloned() {
                    Some(sig) => self.check_args_against(&sig.params, &arg_types, args, span, &sig.ret),
                    None => {
                        // A variable holding a function type is callable;
                        // anything else is not.
                        match self.scopes.resolve(name).and_then(|s| s.ty.clone()) {
                            Some(Type::Function { ret, .. }) => (*ret).clone(),
                            Some(ty) if ty.is_error() => Type::error(),
                            _ => {
                                self.error(TypeError::NotCallable {
                                    name: name.clone(),
                                    span,
                                });
                                Type::error()
                            }
                        }
                    }
                }
            }
            Expr::Member { object, name, .. } => {
                let object_ty = self.check_expr(object);
                let struct_name = match self.struct_of(&object_ty) {
                    Some(n) => n,
                    None => {
                        if !object_ty.is_error() {
                            self.error(TypeError::NoMember {
                                found: object_ty.to_string(),
                                member: name.clone(),
                                span,
                            });
                        }
                        return Type::error();
                    }
                };
                match self
                    .structs
                    .get(&struct_name)
                    .and_then(|info| info.methods.get(name))
                    .cloned()
                {
                    Some(sig) => {
                        let params = sig.params.clone();
                        self.check_args_against(&params, &arg_types, args, span, &sig.ret)
                    }
                    None => {
                        self.error(TypeError::NoMember {
                            found: struct_name,
                            member: name.clone(),
                            span,
                        });
                        Type::error()
                    }
                }
            }
            Expr::Specialize {
                callee: inner,
                type_args,
                span: spec_span,
            } => {
                let Expr::Ident(name, _) = inner.as_ref() else {
                    self.check_expr(callee);
                    return Type::error();
                };
                match self.functions.get(name).cloned() {
                    Some(sig) => {
                        if sig.generics.len() != type_args.len() {
                            self.error(TypeError::TypeArgArity {
                                expected: sig.generics.len(),
                                found: type_args.len(),
                                span: *spec_span,
                            });
                            return Type::error();
                        }
                        // Substitute the type arguments through the
                        // signature before positional checking.
                        let map: IndexMap<String, Type> = sig
                            .generics
                            .iter()
                            .cloned()
                            .zip(type_args.iter().cloned())
                            .collect();
                        let params: Vec<(String, Type)> = sig
                            .params
                            .iter()
                            .map(|(n, t)| (n.clone(), substitute(t, &map)))
                            .collect();
                        let ret = substitute(&sig.ret, &map);
                        self.check_args_against(&params, &arg_types, args, span, &ret)
                    }
                    None => {
                        self.error(TypeError::NotCallable {
                            name: name.clone(),
                            span,
                        });
                        Type::error()
                    }
                }
            }
            other => {
                let ty = self.check_expr(other);
                match ty {
                    Type::Function { ret, .. } => (*ret).clone(),
                    ty if ty.is_error() => Type::error(),
                    other_ty => {
                        self.error(TypeError::NotCallable {
                            name: other_ty.to_string(),
                            span,
                        });
                        Type::error()
                    }
                }
            }
        }
    }

    fn check_builtin_call(
        &mut self,
        name: &str,
        args: &[Expr],
        arg_types: &[Type],
        span: Span,
    ) -> Type {
        let require = |checker: &mut Self, count: usize| {
            if args.len() != count {
                checker.error(TypeError::ArityMismatch {
                    expected: count,
                    found: args.len(),
                    span,
                });
                false
            } else {
                true
            }
        };
        match name {
            // print takes anything, any arity
            "print" => Type::Primitive("void".to_string()),
            "length" => {
                if require(self, 1) {
                    let ty = &arg_types[0];
                    let ok = matches!(
                        ty,
                        Type::Array { .. } | Type::Map { .. } | Type::Set(_)
                    ) || ty.is_string()
                        || ty.is_error();
                    if !ok {
                        self.error(TypeError::NotIterable {
                            found: ty.to_string(),
                            span,
                        });
                    }
                }
                Type::Primitive("int".to_string())
            }
            "append" => {
                if require(self, 2) {
                    match &arg_types[0] {
                        Type::Array { elem, .. } => {
                            if !compatible(elem, &arg_types[1]) {
                                self.error(TypeError::AssignMismatch {
                                    src: arg_types[1].to_string(),
                                    dst: elem.to_string(),
                                    span,
                                });
                            }
                        }
                        ty if ty.is_error() => {}
                        other => self.error(TypeError::NotIterable {
                            found: other.to_string(),
                            span,
                        }),
                    }
                }
                arg_types.first().cloned().unwrap_or_else(Type::error)
            }
            "remove" => {
                if require(self, 2) {
                    let ok = matches!(
                        &arg_types[0],
                        Type::Array { .. } | Type::Map { .. } | Type::Set(_)
                    ) || arg_types[0].is_error();
                    if !ok {
                        self.error(TypeError::NotIterable {
                            found: arg_types[0].to_string(),
                            span,
                        });
                    }
                }
                Type::Primitive("void".to_string())
            }
            "removeIndex" => {
                if require(self, 2) {
                    if !matches!(&arg_types[0], Type::Array { .. }) && !arg_types[0].is_error() {
                        self.error(TypeError::NotIterable {
                            found: arg_types[0].to_string(),
                            span,
                        });
                    }
                    if !matches!(&arg_types[1], Type::Primitive(n) if n == "int")
                        && !arg_types[1].is_error()
                    {
                        self.error(TypeError::AssignMismatch {
                            src: arg_types[1].to_string(),
                            dst: "int".to_string(),
                            span,
                        });
                    }
                }
                Type::Primitive("void".to_string())
            }
            _ => Type::error(),
        }
    }

    fn check_args_against(
        &mut self,
        params: &[(String, Type)],
        arg_types: &[Type],
        args: &[Expr],
        span: Span,
        ret: &Type,
    ) -> Type {
        if params.len() != arg_types.len() {
            self.error(TypeError::ArityMismatch {
                expected: params.len(),
                found: arg_types.len(),
                span,
            });
            return ret.clone();
        }
        for ((_, param_ty), (arg_ty, arg)) in params.iter().zip(arg_types.iter().zip(args)) {
            if !compatible(param_ty, arg_ty) {
                self.error(TypeError::AssignMismatch {
                    src: arg_ty.to_string(),
                    dst: param_ty.to_string(),
                    span: arg.span(),
                });
            }
        }
        ret.clone()
    }

    fn check_member(&mut self, object: &Expr, name: &str, span: Span) -> Type {
        let object_ty = self.check_expr(object);
        if object_ty.is_error() {
            return Type::error();
        }
        match self.struct_of(&object_ty) {
            Some(struct_name) => {
                let info = self.structs.get(&struct_name).cloned();
                match info {
                    Some(info) => {
                        if let Some(field_ty) = info.fields.get(name) {
                            return field_ty.clone();
                        }
                        if let Some(sig) = info.methods.get(name) {
                            return Type::Function {
                                params: sig.params.iter().map(|(_, t)| t.clone()).collect(),
                                ret: Box::new(sig.ret.clone()),
                            };
                        }
                        self.error(TypeError::UnknownField {
                            name: struct_name,
                            field: name.to_string(),
                            span,
                        });
                        Type::error()
                    }
                    None => {
                        self.error(TypeError::NotAStruct {
                            name: struct_name,
                            span,
                        });
                        Type::error()
                    }
                }
            }
            None => {
                self.error(TypeError::NoMember {
                    found: object_ty.to_string(),
                    member: name.to_string(),
                    span,
                });
                Type::error()
            }
        }
    }

    fn check_new(
        &mut self,
        type_name: &str,
        type_args: &[Type],
        args: &[Expr],
        span: Span,
    ) -> Type {
        let arg_types: Vec<Type> = args.iter().map(|a| self.check_expr(a)).collect();

        let Some(info) = self.structs.get(type_name).cloned() else {
            self.error(TypeError::NotAStruct {
                name: type_name.to_string(),
                span,
            });
            return Type::error();
        };

        if info.generics.len() != type_args.len() && !(type_args.is_empty()) {
            self.error(TypeError::TypeArgArity {
                expected: info.generics.len(),
                found: type_args.len(),
                span,
            });
        }

        if let Some(init) = info.methods.get("init") {
            let params = init.params.clone();
            self.check_args_against(
                &params,
                &arg_types,
                args,
                span,
                &Type::Named(type_name.to_string()),
            )
        } else {
            if !args.is_empty() {
                self.error(TypeError::ArityMismatch {
                    expected: 0,
                    found: args.len(),
                    span,
                });
            }
            Type::Named(type_name.to_string())
        }
    }

    // =====================================================================
    // Helpers
    // =====================================================================

    fn define(&mut self, symbol: Symbol) {
        let name = symbol.name.clone();
        let span = symbol.span;
        if self.scopes.define(symbol).is_err() {
            self.error(TypeError::AlreadyDeclared { name, span });
        }
    }

    /// Expand aliases and validate that named types exist
    fn resolve_type(&mut self, ty: &Type, span: Span) -> Type {
        self.resolve_type_depth(ty, span, 0)
    }

    fn resolve_type_depth(&mut self, ty: &Type, span: Span, depth: usize) -> Type {
        if depth > MAX_ALIAS_DEPTH {
            return Type::error();
        }
        match ty {
            Type::Named(name) => {
                if let Some(alias) = self.aliases.get(name).cloned() {
                    return self.resolve_type_depth(&alias, span, depth + 1);
                }
                if self.structs.contains_key(name) {
                    return ty.clone();
                }
                match self.scopes.resolve(name).map(|s| s.kind) {
                    Some(SymbolKind::Struct) | Some(SymbolKind::TypeAlias) => ty.clone(),
                    _ => {
                        self.error(TypeError::UnknownType {
                            name: name.clone(),
                            span,
                        });
                        Type::error()
                    }
                }
            }
            Type::GenericParam(name) => {
                match self.scopes.resolve(name).map(|s| s.kind) {
                    Some(SymbolKind::GenericParam) => ty.clone(),
                    _ => {
                        self.error(TypeError::UnknownType {
                            name: name.clone(),
                            span,
                        });
                        Type::error()
                    }
                }
            }
            Type::Array { elem, size } => Type::Array {
                elem: Box::new(self.resolve_type_depth(elem, span, depth + 1)),
                size: size.clone(),
            },
            Type::Nullable(inner) => {
                Type::Nullable(Box::new(self.resolve_type_depth(inner, span, depth + 1)))
            }
            Type::Pointer(inner) => {
                Type::Pointer(Box::new(self.resolve_type_depth(inner, span, depth + 1)))
            }
            Type::Set(elem) => Type::Set(Box::new(self.resolve_type_depth(elem, span, depth + 1))),
            Type::Map { key, value } => Type::Map {
                key: Box::new(self.resolve_type_depth(key, span, depth + 1)),
                value: Box::new(self.resolve_type_depth(value, span, depth + 1)),
            },
            Type::Union(members) => Type::Union(
                members
                    .iter()
                    .map(|m| self.resolve_type_depth(m, span, depth + 1))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// The struct a member access goes through, unwrapping pointers
    fn struct_of(&self, ty: &Type) -> Option<String> {
        match ty {
            Type::Named(name) => Some(name.clone()),
            Type::Pointer(inner) => self.struct_of(inner),
            _ => None,
        }
    }

    /// Element type yielded by iterating a value
    fn element_type(&mut self, iterable: &Type, span: Span) -> Type {
        match iterable {
            Type::Array { elem, .. } => (**elem).clone(),
            Type::Set(elem) => (**elem).clone(),
            Type::Map { key, .. } => (**key).clone(),
            Type::Primitive(name) if name == "string" => Type::Primitive("string".to_string()),
            ty if ty.is_error() => Type::error(),
            other => {
                self.error(TypeError::NotIterable {
                    found: other.to_string(),
                    span,
                });
                Type::error()
            }
        }
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace generic parameters by their bound arguments
fn substitute(ty: &Type, map: &IndexMap<String, Type>) -> Type {
    match ty {
        Type::GenericParam(name) => map.get(name).cloned().unwrap_or_else(|| ty.clone()),
        Type::Array { elem, size } => Type::Array {
            elem: Box::new(substitute(elem, map)),
            size: size.clone(),
        },
        Type::Nullable(inner) => Type::Nullable(Box::new(substitute(inner, map))),
        Type::Pointer(inner) => Type::Pointer(Box::new(substitute(inner, map))),
        Type::Set(elem) => Type::Set(Box::new(substitute(elem, map))),
        Type::Map { key, value } => Type::Map {
            key: Box::new(substitute(key, map)),
            value: Box::new(substitute(value, map)),
        },
        Type::Union(members) => Type::Union(members.iter().map(|m| substitute(m, map)).collect()),
        Type::Function { params, ret } => Type::Function {
            params: params.iter().map(|p| substitute(p, map)).collect(),
            ret: Box::new(substitute(ret, map)),
        },
        other => other.clone(),
    }
}
