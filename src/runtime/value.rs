//! Runtime value type system
//!
//! `Value` is the unified representation of every Alpha value at
//! runtime. Scalars are stored directly; containers share through
//! `Rc<RefCell<...>>` so member and element mutation through any alias
//! is visible everywhere (execution is single-threaded throughout, so
//! `Rc` suffices). Map and set keys go through the scalar [`Key`]
//! projection, which hashes floats by their bit pattern.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

/// Struct instance: its declared type name and named fields
#[derive(Debug, Clone, PartialEq)]
pub struct StructObj {
    pub name: String,
    pub fields: IndexMap<String, Value>,
}

/// A runtime value
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<IndexMap<Key, Value>>>),
    Set(Rc<RefCell<IndexSet<Key>>>),
    Struct(Rc<RefCell<StructObj>>),
}

/// Hashable projection of scalar values, used as map/set keys
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Null,
    Int(i64),
    Bool(bool),
    Str(String),
    /// Float keyed by bit pattern
    FloatBits(u64),
}

impl Key {
    /// Project a value to a key; containers are not hashable
    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::Null => Some(Key::Null),
            Value::Int(n) => Some(Key::Int(*n)),
            Value::Bool(b) => Some(Key::Bool(*b)),
            Value::Str(s) => Some(Key::Str(s.clone())),
            Value::Float(f) => Some(Key::FloatBits(f.to_bits())),
            _ => None,
        }
    }

    /// Back to a value, for iteration and printing
    pub fn to_value(&self) -> Value {
        match self {
            Key::Null => Value::Null,
            Key::Int(n) => Value::Int(*n),
            Key::Bool(b) => Value::Bool(*b),
            Key::Str(s) => Value::Str(s.clone()),
            Key::FloatBits(bits) => Value::Float(f64::from_bits(*bits)),
        }
    }
}

impl Value {
    /// Build an array value
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    /// Build a map value
    pub fn map(entries: IndexMap<Key, Value>) -> Value {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    /// Build a set value
    pub fn set(items: IndexSet<Key>) -> Value {
        Value::Set(Rc::new(RefCell::new(items)))
    }

    /// Build a struct instance with all fields null
    pub fn empty_struct(name: &str, fields: &[String]) -> Value {
        let fields = fields
            .iter()
            .map(|f| (f.clone(), Value::Null))
            .collect::<IndexMap<_, _>>();
        Value::Struct(Rc::new(RefCell::new(StructObj {
            name: name.to_string(),
            fields,
        })))
    }

    /// Condition coercion: null is falsy, numbers are compared against
    /// zero, bools are themselves. Other kinds are not conditionable.
    pub fn truthy(&self) -> Option<bool> {
        match self {
            Value::Null => Some(false),
            Value::Bool(b) => Some(*b),
            Value::Int(n) => Some(*n != 0),
            Value::Float(f) => Some(*f != 0.0),
            _ => None,
        }
    }

    /// Short name of the value's runtime kind, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Struct(_) => "struct",
        }
    }

    /// Structural equality with numeric cross-kind coercion; mismatched
    /// kinds compare unequal rather than failing.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
            (Value::Struct(a), Value::Struct(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.loose_eq(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{n:.1}")
                } else {
                    write!(f, "{n}")
                }
            }
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => f.write_str(s),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {value}", key.to_value())?;
                }
                f.write_str("}")
            }
            Value::Set(items) => {
                f.write_str("{")?;
                for (i, key) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", key.to_value())?;
                }
                f.write_str("}")
            }
            Value::Struct(obj) => {
                let obj = obj.borrow();
                write!(f, "{} {{", obj.name)?;
                for (i, (field, value)) in obj.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{field}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Str("hi".to_string()).to_string(), "hi");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
    }

    #[test]
    fn test_truthiness() {
        assert_eq!(Value::Null.truthy(), Some(false));
        assert_eq!(Value::Int(0).truthy(), Some(false));
        assert_eq!(Value::Int(7).truthy(), Some(true));
        assert_eq!(Value::Bool(false).truthy(), Some(false));
        assert_eq!(Value::Str("x".to_string()).truthy(), None);
    }

    #[test]
    fn test_loose_eq_numeric_coercion() {
        assert!(Value::Int(2).loose_eq(&Value::Float(2.0)));
        assert!(!Value::Int(2).loose_eq(&Value::Str("2".to_string())));
        assert!(Value::Null.loose_eq(&Value::Null));
    }

    #[test]
    fn test_container_identity() {
        let a = Value::array(vec![Value::Int(1)]);
        let b = a.clone();
        assert!(a.loose_eq(&b));
        if let (Value::Array(items), Value::Array(_)) = (&a, &b) {
            items.borrow_mut().push(Value::Int(2));
        }
        if let Value::Array(items) = &b {
            assert_eq!(items.borrow().len(), 2);
        }
    }

    #[test]
    fn test_key_roundtrip() {
        let key = Key::from_value(&Value::Float(1.5)).unwrap();
        assert!(key.to_value().loose_eq(&Value::Float(1.5)));
        assert!(Key::from_value(&Value::array(vec![])).is_none());
    }
}
