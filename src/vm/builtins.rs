//! Builtin functions
//!
//! The registry the VM consults before module functions: `print` plus
//! the utility builtins of the surface language (`length`, `append`,
//! `remove`, `removeIndex`). Each takes already-evaluated values and
//! returns a value; `print` writes through the VM's output sink.

use std::fmt::Write as _;

use crate::runtime::value::{Key, Value};

use super::errors::{VmError, VmResult};

/// Names the VM treats as builtins
pub const BUILTIN_NAMES: &[&str] = &["print", "length", "append", "remove", "removeIndex"];

/// Is this callee a builtin?
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Render the `print` line: space-joined formatted values plus a
/// trailing newline
pub fn format_print(args: &[Value]) -> String {
    let mut line = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        let _ = write!(line, "{arg}");
    }
    line.push('\n');
    line
}

/// Invoke a non-print builtin
pub fn call(name: &str, args: &[Value]) -> VmResult<Value> {
    match name {
        "length" => length(args),
        "append" => append(args),
        "remove" => remove(args),
        "removeIndex" => remove_index(args),
        other => Err(VmError::UnknownCallee(other.to_string())),
    }
}

fn arity(name: &str, args: &[Value], expected: usize) -> VmResult<()> {
    if args.len() != expected {
        return Err(VmError::InvalidInstruction(format!(
            "{name} expects {expected} argument(s), got {}",
            args.len()
        )));
    }
    Ok(())
}

fn length(args: &[Value]) -> VmResult<Value> {
    arity("length", args, 1)?;
    let len = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::Array(items) => items.borrow().len(),
        Value::Map(entries) => entries.borrow().len(),
        Value::Set(items) => items.borrow().len(),
        other => {
            return Err(VmError::UnsupportedTypes {
                op: "length".to_string(),
                left: other.kind().to_string(),
                right: "-".to_string(),
            })
        }
    };
    Ok(Value::Int(len as i64))
}

fn append(args: &[Value]) -> VmResult<Value> {
    arity("append", args, 2)?;
    match &args[0] {
        Value::Array(items) => {
            items.borrow_mut().push(args[1].clone());
            Ok(args[0].clone())
        }
        Value::Set(items) => {
            let key = Key::from_value(&args[1])
                .ok_or_else(|| VmError::InvalidKey(args[1].kind().to_string()))?;
            items.borrow_mut().insert(key);
            Ok(args[0].clone())
        }
        other => Err(VmError::UnsupportedTypes {
            op: "append".to_string(),
            left: other.kind().to_string(),
            right: args[1].kind().to_string(),
        }),
    }
}

fn remove(args: &[Value]) -> VmResult<Value> {
    arity("remove", args, 2)?;
    match &args[0] {
        Value::Map(entries) => {
            if let Some(key) = Key::from_value(&args[1]) {
                entries.borrow_mut().shift_remove(&key);
            }
            Ok(Value::Null)
        }
        Value::Set(items) => {
            if let Some(key) = Key::from_value(&args[1]) {
                items.borrow_mut().shift_remove(&key);
            }
            Ok(Value::Null)
        }
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            if let Some(position) = items.iter().position(|v| v.loose_eq(&args[1])) {
                items.remove(position);
            }
            Ok(Value::Null)
        }
        other => Err(VmError::UnsupportedTypes {
            op: "remove".to_string(),
            left: other.kind().to_string(),
            right: args[1].kind().to_string(),
        }),
    }
}

fn remove_index(args: &[Value]) -> VmResult<Value> {
    arity("removeIndex", args, 2)?;
    let Value::Array(items) = &args[0] else {
        return Err(VmError::UnsupportedTypes {
            op: "removeIndex".to_string(),
            left: args[0].kind().to_string(),
            right: args[1].kind().to_string(),
        });
    };
    let Value::Int(index) = &args[1] else {
        return Err(VmError::UnsupportedTypes {
            op: "removeIndex".to_string(),
            left: args[0].kind().to_string(),
            right: args[1].kind().to_string(),
        });
    };
    let mut items = items.borrow_mut();
    let len = items.len();
    if *index < 0 || *index as usize >= len {
        return Err(VmError::IndexOutOfBounds { index: *index, len });
    }
    items.remove(*index as usize);
    Ok(Value::Null)
}
