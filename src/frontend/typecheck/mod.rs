//! Semantic analysis
//!
//! Walks the parsed program depth-first against a lexical scope chain,
//! records every semantic error, and annotates inference sites
//! (`var`/`const` declarations) with their resolved types. Later
//! phases run only when this one reports no errors.

mod check;
pub mod scope;
pub mod types;

pub use check::Checker;

use indexmap::IndexMap;
use thiserror::Error;

use super::parser::ast::{Program, Type};
use crate::util::span::Span;

/// Method signature recorded for a struct implementation
#[derive(Debug, Clone)]
pub struct MethodSig {
    pub params: Vec<(String, Type)>,
    pub ret: Type,
}

/// Struct metadata collected during checking and consumed by the IR
/// generator
#[derive(Debug, Clone)]
pub struct StructInfo {
    pub name: String,
    pub generics: Vec<String>,
    pub fields: IndexMap<String, Type>,
    pub methods: IndexMap<String, MethodSig>,
}

/// Free function signature
#[derive(Debug, Clone)]
pub struct FuncSig {
    pub generics: Vec<String>,
    pub params: Vec<(String, Type)>,
    pub ret: Type,
}

/// Everything the checker learned about the program
#[derive(Debug, Default)]
pub struct CheckResult {
    pub errors: Vec<TypeError>,
    pub structs: IndexMap<String, StructInfo>,
    pub functions: IndexMap<String, FuncSig>,
}

impl CheckResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check a program, annotating its inference sites in place
pub fn check_program(program: &mut Program) -> CheckResult {
    let mut checker = Checker::new();
    checker.check_program(program);
    checker.into_result()
}

/// Semantic error with source position
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("Undeclared identifier '{name}' at {}", .span.start)]
    Undeclared { name: String, span: Span },

    #[error("'{name}' already declared at {}", .span.start)]
    AlreadyDeclared { name: String, span: Span },

    #[error("Cannot assign type '{src}' to '{dst}' at {}", .span.start)]
    AssignMismatch {
        src: String,
        dst: String,
        span: Span,
    },

    #[error("Cannot assign to constant '{name}' at {}", .span.start)]
    AssignToConst { name: String, span: Span },

    #[error("Expression is not assignable at {}", .span.start)]
    NotLValue { span: Span },

    #[error("Operator '{op}' requires numeric operands, found '{found}' at {}", .span.start)]
    NotNumeric {
        op: String,
        found: String,
        span: Span,
    },

    #[error("Invalid operands '{left}' and '{right}' for '{op}' at {}", .span.start)]
    InvalidOperands {
        op: String,
        left: String,
        right: String,
        span: Span,
    },

    #[error("Condition of type '{found}' is not allowed here at {}", .span.start)]
    BadCondition { found: String, span: Span },

    #[error("Unknown type '{name}' at {}", .span.start)]
    UnknownType { name: String, span: Span },

    #[error("'{name}' is not callable at {}", .span.start)]
    NotCallable { name: String, span: Span },

    #[error("Expected {expected} argument(s), found {found} at {}", .span.start)]
    ArityMismatch {
        expected: usize,
        found: usize,
        span: Span,
    },

    #[error("Expected {expected} type argument(s), found {found} at {}", .span.start)]
    TypeArgArity {
        expected: usize,
        found: usize,
        span: Span,
    },

    #[error("Struct '{name}' has no field '{field}' at {}", .span.start)]
    UnknownField {
        name: String,
        field: String,
        span: Span,
    },

    #[error("Duplicate field '{field}' in struct '{name}' at {}", .span.start)]
    DuplicateField {
        name: String,
        field: String,
        span: Span,
    },

    #[error("Type '{found}' has no member '{member}' at {}", .span.start)]
    NoMember {
        found: String,
        member: String,
        span: Span,
    },

    #[error("Type '{found}' is not iterable at {}", .span.start)]
    NotIterable { found: String, span: Span },

    #[error("Type '{found}' cannot be indexed at {}", .span.start)]
    NotIndexable { found: String, span: Span },

    #[error("return outside of a function at {}", .span.start)]
    ReturnOutsideFunction { span: Span },

    #[error("Cannot return a value from a void function at {}", .span.start)]
    ReturnValueInVoid { span: Span },

    #[error("Missing return value at {}", .span.start)]
    MissingReturnValue { span: Span },

    #[error("'{word}' outside of a loop at {}", .span.start)]
    OutsideLoop { word: String, span: Span },

    #[error("Cannot infer a type for '{name}' without an initializer at {}", .span.start)]
    CannotInfer { name: String, span: Span },

    #[error("'self' outside of an implementation block at {}", .span.start)]
    SelfOutsideImpl { span: Span },

    #[error("'{name}' is not a struct at {}", .span.start)]
    NotAStruct { name: String, span: Span },
}

#[cfg(test)]
mod tests;
