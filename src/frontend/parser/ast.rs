//! Abstract Syntax Tree types
//!
//! Three disjoint node families: types, expressions, statements. All
//! nodes are plain tagged variants; the tree is acyclic and owned
//! top-down from [`Program`].

use std::fmt;

use crate::util::span::Span;

/// Type expression
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Built-in primitive named by its keyword (`int`, `string`, ...).
    /// `error` doubles as the checker's cascade-suppression sentinel.
    Primitive(String),
    /// User-defined type referenced by name
    Named(String),
    /// Single-uppercase-letter type parameter
    GenericParam(String),
    /// `T[]` or `T[n]`
    Array {
        elem: Box<Type>,
        size: Option<Box<Expr>>,
    },
    /// `T?`
    Nullable(Box<Type>),
    /// `T*`
    Pointer(Box<Type>),
    /// `set<T>`
    Set(Box<Type>),
    /// `map<K, V>`
    Map { key: Box<Type>, value: Box<Type> },
    /// `A | B | ...`, at least two members
    Union(Vec<Type>),
    /// `function(params) ret`
    Function { params: Vec<Type>, ret: Box<Type> },
    /// Anonymous struct shape
    Struct(Vec<(String, Type)>),
    /// Inferred placeholder for empty literals
    Any,
}

impl Type {
    /// Shorthand for the checker's sentinel type
    pub fn error() -> Type {
        Type::Primitive("error".to_string())
    }

    /// True for the sentinel
    pub fn is_error(&self) -> bool {
        matches!(self, Type::Primitive(name) if name == "error")
    }

    /// True for `int`, `float`, `byte`, `double`
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Type::Primitive(name) if matches!(name.as_str(), "int" | "float" | "byte" | "double")
        )
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Primitive(name) if name == "bool")
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Type::Primitive(name) if name == "string")
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, Type::Nullable(_))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(name) | Type::Named(name) | Type::GenericParam(name) => {
                f.write_str(name)
            }
            Type::Array { elem, .. } => write!(f, "{elem}[]"),
            Type::Nullable(base) => write!(f, "{base}?"),
            Type::Pointer(base) => write!(f, "{base}*"),
            Type::Set(elem) => write!(f, "set<{elem}>"),
            Type::Map { key, value } => write!(f, "map<{key},{value}>"),
            Type::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
            Type::Function { params, ret } => {
                f.write_str("function(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, "):{ret}")
            }
            Type::Struct(fields) => {
                f.write_str("struct{")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{name}:{ty}")?;
                }
                f.write_str("}")
            }
            Type::Any => f.write_str("any"),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
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

impl BinOp {
    pub fn as_str(&self) -> &'static str {
        match self {
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
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Neg,
    Pos,
    Not,
    Inc,
    Dec,
}

/// Assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

impl AssignOp {
    /// The arithmetic op a compound assignment expands to
    pub fn binary(&self) -> Option<BinOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinOp::Add),
            AssignOp::SubAssign => Some(BinOp::Sub),
            AssignOp::MulAssign => Some(BinOp::Mul),
            AssignOp::DivAssign => Some(BinOp::Div),
        }
    }
}

/// Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64, Span),
    Float(f64, Span),
    Str(String, Span),
    Bool(bool, Span),
    Null(Span),
    Ident(String, Span),
    Unary {
        op: UnOp,
        expr: Box<Expr>,
        postfix: bool,
        span: Span,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Ternary {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
        span: Span,
    },
    ArrayLit(Vec<Expr>, Span),
    MapLit(Vec<(Expr, Expr)>, Span),
    SetLit(Vec<Expr>, Span),
    StructLit {
        name: String,
        fields: Vec<(String, Expr)>,
        span: Span,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    Member {
        object: Box<Expr>,
        name: String,
        span: Span,
    },
    /// `&expr`
    Reference(Box<Expr>, Span),
    /// `self` inside an implementation block
    SelfValue(Span),
    /// `new Type<...>(...)`
    New {
        type_name: String,
        type_args: Vec<Type>,
        args: Vec<Expr>,
        span: Span,
    },
    /// `callee<T, ...>` immediately before a call
    Specialize {
        callee: Box<Expr>,
        type_args: Vec<Type>,
        span: Span,
    },
}

impl Expr {
    /// Span of the expression
    pub fn span(&self) -> Span {
        match self {
            Expr::Int(_, span)
            | Expr::Float(_, span)
            | Expr::Str(_, span)
            | Expr::Bool(_, span)
            | Expr::Null(span)
            | Expr::Ident(_, span)
            | Expr::ArrayLit(_, span)
            | Expr::MapLit(_, span)
            | Expr::SetLit(_, span)
            | Expr::Reference(_, span)
            | Expr::SelfValue(span) => *span,
            Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Ternary { span, .. }
            | Expr::Call { span, .. }
            | Expr::Assign { span, .. }
            | Expr::StructLit { span, .. }
            | Expr::Index { span, .. }
            | Expr::Member { span, .. }
            | Expr::New { span, .. }
            | Expr::Specialize { span, .. } => *span,
        }
    }

    /// An l-value denotes a storage location: identifier, member
    /// access, or index.
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self,
            Expr::Ident(..) | Expr::Member { .. } | Expr::Index { .. }
        )
    }
}

/// Function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub span: Span,
}

/// Statement block with its own scope
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// One `case value { ... }` arm of a switch
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub value: Expr,
    pub body: Block,
    pub span: Span,
}

/// Function declaration: `RetType function name(params) { ... }`,
/// optionally preceded by a `<T, U>` generic header.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub generics: Vec<String>,
    pub params: Vec<Param>,
    pub ret: Type,
    pub body: Block,
    pub span: Span,
}

/// Struct field declaration
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: Type,
    pub span: Span,
}

/// Struct declaration
#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: String,
    pub generics: Vec<String>,
    pub fields: Vec<FieldDecl>,
    pub span: Span,
}

/// Method inside an `implement` block; `init` is modeled as a method
/// named `init` with a void return.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub generics: Vec<String>,
    pub params: Vec<Param>,
    pub ret: Type,
    pub body: Block,
    pub span: Span,
}

/// `implement TypeName { init(...) {...} methods... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ImplDecl {
    pub target: String,
    pub methods: Vec<MethodDecl>,
    pub span: Span,
}

/// Statement
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// Statement kind
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `Type name = expr`, `var name = expr`, or `const name = expr`.
    /// `resolved` is written once by the checker when `ty` is absent.
    Var {
        name: String,
        ty: Option<Type>,
        init: Option<Box<Expr>>,
        is_const: bool,
        resolved: Option<Type>,
    },
    Expr(Box<Expr>),
    If {
        cond: Box<Expr>,
        then_block: Block,
        /// Either a `Block` statement or a chained `If`
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Box<Expr>,
        body: Block,
    },
    DoWhile {
        body: Block,
        cond: Box<Expr>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Box<Expr>>,
        post: Option<Box<Expr>>,
        body: Block,
    },
    ForIn {
        index: Option<String>,
        item: String,
        iterable: Box<Expr>,
        body: Block,
    },
    Switch {
        disc: Box<Expr>,
        cases: Vec<SwitchCase>,
        default: Option<Block>,
    },
    Return(Option<Box<Expr>>),
    Break,
    Continue,
    Block(Block),
    Function(FunctionDecl),
    Struct(StructDecl),
    TypeAlias {
        name: String,
        ty: Type,
    },
    Impl(ImplDecl),
}

/// Parsed program: the ordered top-level statements
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
}
