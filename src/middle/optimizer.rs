//! IR optimization passes
//!
//! Two passes per function, applied in place: constant folding (with
//! temp-to-constant tracking so folded chains collapse) and
//! unreachable-instruction elimination. A trivial dead-`Const` sweep
//! drops definitions the folding orphaned. Module invariants are
//! preserved: temps stay single-assignment and every control transfer
//! still targets an existing label.

use std::collections::{HashMap, HashSet};

use super::ir::{Constant, Function, Instruction, Module, Opcode, Temp, ValueRef};

/// Run all passes over every function
pub fn optimize(module: &mut Module) {
    for function in &mut module.functions {
        fold_constants(function);
        remove_unreachable(function);
        remove_dead_consts(function);
    }
}

/// Fold arithmetic and comparisons whose operands are known constants
/// of the same kind. Division and modulo by zero are left for the VM
/// to report at runtime.
pub fn fold_constants(function: &mut Function) {
    // Temps are single-assignment per function, so one map suffices:
    // wherever an instruction executes, its operands' definitions hold.
    let mut known: HashMap<Temp, Constant> = HashMap::new();

    for block in &mut function.blocks {
        for instruction in &mut block.instructions {
            match instruction.op {
                Opcode::Const => {
                    if let (Some(dst), Some(ValueRef::Const(c))) =
                        (instruction.dst, instruction.args.first())
                    {
                        known.insert(dst, c.clone());
                    }
                }
                op if op.is_arithmetic() || op.is_comparison() => {
                    let lhs = resolve(&known, instruction.args.first());
                    let rhs = resolve(&known, instruction.args.get(1));
                    let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
                        continue;
                    };
                    let Some(folded) = fold(op, &lhs, &rhs) else {
                        continue;
                    };
                    let dst = instruction.dst;
                    *instruction = Instruction::new(
                        Opcode::Const,
                        dst,
                        vec![ValueRef::Const(folded.clone())],
                    );
                    if let Some(dst) = dst {
                        known.insert(dst, folded);
                    }
                }
                _ => {}
            }
        }
    }
}

fn resolve(known: &HashMap<Temp, Constant>, arg: Option<&ValueRef>) -> Option<Constant> {
    match arg? {
        ValueRef::Const(c) => Some(c.clone()),
        ValueRef::Temp(t) => known.get(t).cloned(),
        ValueRef::Symbol(_) => None,
    }
}

/// Fold one operation over same-kind constants
fn fold(op: Opcode, lhs: &Constant, rhs: &Constant) -> Option<Constant> {
    use Constant::*;
    match (lhs, rhs) {
        (Int(a), Int(b)) => match op {
            Opcode::Add => Some(Int(a.wrapping_add(*b))),
            Opcode::Sub => Some(Int(a.wrapping_sub(*b))),
            Opcode::Mul => Some(Int(a.wrapping_mul(*b))),
            Opcode::Div if *b != 0 => Some(Int(a.wrapping_div(*b))),
            Opcode::Mod if *b != 0 => Some(Int(a.wrapping_rem(*b))),
            Opcode::CmpEq => Some(Bool(a == b)),
            Opcode::CmpNe => Some(Bool(a != b)),
            Opcode::CmpLt => Some(Bool(a < b)),
            Opcode::CmpLe => Some(Bool(a <= b)),
            Opcode::CmpGt => Some(Bool(a > b)),
            Opcode::CmpGe => Some(Bool(a >= b)),
            _ => None,
        },
        (Float(a), Float(b)) => match op {
            Opcode::Add => Some(Float(a + b)),
            Opcode::Sub => Some(Float(a - b)),
            Opcode::Mul => Some(Float(a * b)),
            Opcode::Div if *b != 0.0 => Some(Float(a / b)),
            Opcode::CmpEq => Some(Bool(a == b)),
            Opcode::CmpNe => Some(Bool(a != b)),
            Opcode::CmpLt => Some(Bool(a < b)),
            Opcode::CmpLe => Some(Bool(a <= b)),
            Opcode::CmpGt => Some(Bool(a > b)),
            Opcode::CmpGe => Some(Bool(a >= b)),
            _ => None,
        },
        (Str(a), Str(b)) => match op {
            Opcode::Add => Some(Str(format!("{a}{b}"))),
            Opcode::CmpEq => Some(Bool(a == b)),
            Opcode::CmpNe => Some(Bool(a != b)),
            Opcode::CmpLt => Some(Bool(a < b)),
            Opcode::CmpLe => Some(Bool(a <= b)),
            Opcode::CmpGt => Some(Bool(a > b)),
            Opcode::CmpGe => Some(Bool(a >= b)),
            _ => None,
        },
        (Bool(a), Bool(b)) => match op {
            Opcode::CmpEq => Some(Bool(a == b)),
            Opcode::CmpNe => Some(Bool(a != b)),
            _ => None,
        },
        (Null, Null) => match op {
            Opcode::CmpEq => Some(Bool(true)),
            Opcode::CmpNe => Some(Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

/// Drop instructions that follow a terminator inside a block; the
/// label boundary resumes reachability.
pub fn remove_unreachable(function: &mut Function) {
    for block in &mut function.blocks {
        let cut = block
            .instructions
            .iter()
            .position(|i| i.op.is_terminator() || i.op == Opcode::Branch);
        if let Some(cut) = cut {
            block.instructions.truncate(cut + 1);
        }
    }
}

/// Remove `Const` definitions whose temp is never read
pub fn remove_dead_consts(function: &mut Function) {
    let mut used: HashSet<Temp> = HashSet::new();
    for instruction in function.all_instructions() {
        for arg in &instruction.args {
            if let ValueRef::Temp(t) = arg {
                used.insert(*t);
            }
        }
    }
    for block in &mut function.blocks {
        block
            .instructions
            .retain(|i| i.op != Opcode::Const || i.dst.map(|d| used.contains(&d)).unwrap_or(true));
    }
}
