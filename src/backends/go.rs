//! Textual Go emission
//!
//! Secondary backend: renders the optimized IR module as Go source
//! against a tiny `rt*` helper runtime. The interpreted VM stays the
//! authoritative execution path; this emitter does no analysis beyond
//! a used-temp scan, so the generated code declares no variable Go
//! would reject as unused.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::middle::ir::{Constant, Function, Instruction, Module, Opcode, ValueRef};

/// Emit a whole module as Go source text
pub fn emit_module(module: &Module) -> String {
    let mut out = String::new();
    out.push_str("package main\n\n");
    out.push_str("var env = map[string]any{}\n\n");
    for function in &module.functions {
        emit_function(&mut out, function);
        out.push('\n');
    }
    out
}

/// Go-safe function name; IR method names carry a dot
fn go_name(name: &str) -> String {
    name.replace('.', "_")
}

fn emit_function(out: &mut String, function: &Function) {
    let used = used_temps(function);
    let targets = jump_targets(function);

    let params = function
        .params
        .iter()
        .map(|p| format!("p_{p} any"))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "func {}({params}) any {{", go_name(&function.name));
    let _ = writeln!(out, "\tlocals := map[string]any{{}}");
    for param in &function.params {
        let _ = writeln!(out, "\tlocals[{:?}] = p_{param}", param);
    }

    let declared: Vec<usize> = {
        let mut temps: Vec<usize> = used.iter().copied().collect();
        temps.sort_unstable();
        temps
    };
    for temp in &declared {
        let _ = writeln!(out, "\tvar t{temp} any");
        let _ = writeln!(out, "\t_ = t{temp}");
    }

    for block in &function.blocks {
        if targets.contains(&block.label) {
            let _ = writeln!(out, "{}:", block.label);
        }
        for instruction in &block.instructions {
            emit_instruction(out, function, instruction, &used);
        }
    }
    let _ = writeln!(out, "\treturn nil");
    let _ = writeln!(out, "}}");
}

/// Temps read anywhere in the function; assignments to the rest are
/// discarded with `_`.
fn used_temps(function: &Function) -> HashSet<usize> {
    let mut used = HashSet::new();
    for instruction in function.all_instructions() {
        for arg in &instruction.args {
            if let ValueRef::Temp(t) = arg {
                used.insert(*t);
            }
        }
    }
    used
}

fn jump_targets(function: &Function) -> HashSet<String> {
    let mut targets = HashSet::new();
    for instruction in function.all_instructions() {
        match instruction.op {
            Opcode::Jump | Opcode::Branch => {
                for arg in &instruction.args {
                    if let ValueRef::Symbol(label) = arg {
                        targets.insert(label.clone());
                    }
                }
            }
            _ => {}
        }
    }
    targets
}

fn value_ref(function: &Function, arg: &ValueRef) -> String {
    match arg {
        ValueRef::Temp(t) => format!("t{t}"),
        ValueRef::Const(c) => constant(c),
        ValueRef::Symbol(name) => {
            if function.locals.iter().any(|l| l == name) {
                format!("locals[{name:?}]")
            } else {
                format!("env[{name:?}]")
            }
        }
    }
}

fn constant(c: &Constant) -> String {
    match c {
        Constant::Null => "nil".to_string(),
        Constant::Int(n) => format!("int64({n})"),
        Constant::Float(n) => {
            if n.fract() == 0.0 && n.is_finite() {
                format!("float64({n:.1})")
            } else {
                format!("float64({n})")
            }
        }
        Constant::Bool(b) => b.to_string(),
        Constant::Str(s) => format!("{s:?}"),
    }
}

/// Destination prefix: a used temp assigns, everything else discards
fn dst(instruction: &Instruction, used: &HashSet<usize>) -> String {
    match instruction.dst {
        Some(t) if used.contains(&t) => format!("t{t} = "),
        Some(_) => "_ = ".to_string(),
        None => String::new(),
    }
}

fn emit_instruction(
    out: &mut String,
    function: &Function,
    instruction: &Instruction,
    used: &HashSet<usize>,
) {
    let arg = |i: usize| {
        instruction
            .args
            .get(i)
            .map(|a| value_ref(function, a))
            .unwrap_or_else(|| "nil".to_string())
    };
    let prefix = dst(instruction, used);

    match instruction.op {
        Opcode::Nop => {}
        Opcode::Const | Opcode::Load => {
            let _ = writeln!(out, "\t{prefix}{}", arg(0));
        }
        Opcode::Store => {
            let target = arg(0);
            let _ = writeln!(out, "\t{target} = {}", arg(1));
        }
        Opcode::Add
        | Opcode::Sub
        | Opcode::Mul
        | Opcode::Div
        | Opcode::Mod
        | Opcode::CmpEq
        | Opcode::CmpNe
        | Opcode::CmpLt
        | Opcode::CmpLe
        | Opcode::CmpGt
        | Opcode::CmpGe => {
            let helper = match instruction.op {
                Opcode::Add => "rtAdd",
                Opcode::Sub => "rtSub",
                Opcode::Mul => "rtMul",
                Opcode::Div => "rtDiv",
                Opcode::Mod => "rtMod",
                Opcode::CmpEq => "rtEq",
                Opcode::CmpNe => "rtNe",
                Opcode::CmpLt => "rtLt",
                Opcode::CmpLe => "rtLe",
                Opcode::CmpGt => "rtGt",
                Opcode::CmpGe => "rtGe",
                _ => unreachable!(),
            };
            let _ = writeln!(out, "\t{prefix}{helper}({}, {})", arg(0), arg(1));
        }
        Opcode::Neg => {
            let _ = writeln!(out, "\t{prefix}rtNeg({})", arg(0));
        }
        Opcode::Not => {
            let _ = writeln!(out, "\t{prefix}rtNot({})", arg(0));
        }
        Opcode::Jump => {
            if let Some(ValueRef::Symbol(label)) = instruction.args.first() {
                let _ = writeln!(out, "\tgoto {label}");
            }
        }
        Opcode::Branch => {
            if let (Some(ValueRef::Symbol(then_label)), Some(ValueRef::Symbol(else_label))) =
                (instruction.args.get(1), instruction.args.get(2))
            {
                let _ = writeln!(out, "\tif rtTruthy({}) {{\n\t\tgoto {then_label}\n\t}}", arg(0));
                let _ = writeln!(out, "\tgoto {else_label}");
            }
        }
        Opcode::Call => {
            let callee = instruction
                .args
                .first()
                .and_then(|a| a.as_symbol())
                .unwrap_or("?");
            let call_args: Vec<String> = (1..instruction.args.len()).map(arg).collect();
            let joined = call_args.join(", ");
            if joined.is_empty() {
                let _ = writeln!(out, "\t{prefix}rtCall({callee:?})");
            } else {
                let _ = writeln!(out, "\t{prefix}rtCall({callee:?}, {joined})");
            }
        }
        Opcode::Return => {
            if instruction.args.is_empty() {
                let _ = writeln!(out, "\treturn nil");
            } else {
                let _ = writeln!(out, "\treturn {}", arg(0));
            }
        }
        Opcode::MakeArray | Opcode::MakeSet => {
            let helper = if instruction.op == Opcode::MakeArray {
                "rtArray"
            } else {
                "rtSet"
            };
            let items: Vec<String> = (0..instruction.args.len()).map(arg).collect();
            let _ = writeln!(out, "\t{prefix}{helper}({})", items.join(", "));
        }
        Opcode::MakeMap => {
            let items: Vec<String> = (0..instruction.args.len()).map(arg).collect();
            let _ = writeln!(out, "\t{prefix}rtMap({})", items.join(", "));
        }
        Opcode::MakeStruct => {
            let name = instruction.meta.as_deref().unwrap_or("?");
            let _ = writeln!(out, "\t{prefix}rtStruct({name:?})");
        }
        Opcode::IndexGet => {
            let helper = if instruction.meta.as_deref() == Some("iter") {
                "rtIndexAt"
            } else {
                "rtIndex"
            };
            let _ = writeln!(out, "\t{prefix}{helper}({}, {})", arg(0), arg(1));
        }
        Opcode::IndexSet => {
            let _ = writeln!(out, "\trtSetIndex({}, {}, {})", arg(0), arg(1), arg(2));
        }
        Opcode::MemberGet => {
            let field = instruction.meta.as_deref().unwrap_or("?");
            let _ = writeln!(out, "\t{prefix}rtMember({}, {field:?})", arg(0));
        }
        Opcode::MemberSet => {
            let field = instruction.meta.as_deref().unwrap_or("?");
            let _ = writeln!(out, "\trtSetMember({}, {field:?}, {})", arg(0), arg(1));
        }
    }
}
