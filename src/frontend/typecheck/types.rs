//! Type compatibility rules
//!
//! Types compare by their stringified form; compatibility is the
//! directed relation used for assignment, argument passing, and
//! returns. The `error` sentinel is compatible with everything so one
//! failed subexpression does not cascade.

use super::super::parser::ast::Type;

/// Syntactic equality of stringified types
pub fn same(a: &Type, b: &Type) -> bool {
    a.to_string() == b.to_string()
}

/// Whether a value of type `src` is acceptable where `dst` is expected.
///
/// Rules, in order: identity; `error` suppresses; `float` widens from
/// `int`; `T?` accepts `T` and `null`; `T*` accepts only `T*`; a union
/// accepts anything one of its members accepts.
pub fn compatible(dst: &Type, src: &Type) -> bool {
    if same(dst, src) {
        return true;
    }
    if dst.is_error() || src.is_error() {
        return true;
    }

    match dst {
        Type::Primitive(name) if name == "float" || name == "double" => {
            matches!(src, Type::Primitive(s) if s == "int" || s == "byte")
        }
        Type::Nullable(inner) => {
            is_null(src) || compatible(inner, src) || same(inner, strip_nullable(src))
        }
        Type::Pointer(inner) => match src {
            Type::Pointer(src_inner) => same(inner, src_inner),
            _ => false,
        },
        Type::Union(members) => members.iter().any(|member| compatible(member, src)),
        Type::Any => true,
        Type::Array { elem, .. } => match src {
            // An empty literal types as T[] of `any`.
            Type::Array { elem: src_elem, .. } => {
                compatible(elem, src_elem) || matches!(**src_elem, Type::Any)
            }
            _ => false,
        },
        Type::Map { key, value } => match src {
            Type::Map {
                key: sk,
                value: sv,
            } => {
                (compatible(key, sk) || matches!(**sk, Type::Any))
                    && (compatible(value, sv) || matches!(**sv, Type::Any))
            }
            _ => false,
        },
        Type::Set(elem) => match src {
            Type::Set(src_elem) => compatible(elem, src_elem) || matches!(**src_elem, Type::Any),
            _ => false,
        },
        _ => false,
    }
}

/// `null` literal type
pub fn is_null(ty: &Type) -> bool {
    matches!(ty, Type::Primitive(name) if name == "null")
}

fn strip_nullable(ty: &Type) -> &Type {
    match ty {
        Type::Nullable(inner) => inner,
        other => other,
    }
}

/// Condition positions accept bool, numeric, and nullable operands
pub fn conditionable(ty: &Type) -> bool {
    ty.is_bool() || ty.is_numeric() || ty.is_nullable() || ty.is_error() || is_null(ty)
}

/// Result type of arithmetic over two numeric operands: `float` wins
/// over `int`
pub fn widen(a: &Type, b: &Type) -> Type {
    let float = Type::Primitive("float".to_string());
    if same(a, &float) || same(b, &float) {
        return float;
    }
    let double = Type::Primitive("double".to_string());
    if same(a, &double) || same(b, &double) {
        return double;
    }
    a.clone()
}
