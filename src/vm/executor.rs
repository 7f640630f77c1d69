//! Virtual machine executor
//!
//! Tree-walking interpreter over the IR. `run_main` looks up `main`,
//! builds a frame per call with its own temp and local tables, and
//! executes block by block. Module globals live exclusively in the VM
//! for the duration of a run; `IndexMap` keeps their order (and
//! therefore all observable output) deterministic.

use indexmap::IndexMap;
use tracing::trace;

use crate::middle::ir::{Function, Instruction, Module, Opcode, ValueRef};
use crate::runtime::value::{Key, Value};

use super::builtins;
use super::errors::{VmError, VmResult};
use super::frames::Frame;

/// VM configuration
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Maximum call depth before aborting
    pub max_call_depth: usize,
    /// Log every executed instruction at trace level
    pub trace_execution: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 1024,
            trace_execution: false,
        }
    }
}

/// Where `print` output goes
#[derive(Debug)]
enum Sink {
    Stdout,
    Capture(String),
}

/// The virtual machine
#[derive(Debug)]
pub struct Vm {
    config: VmConfig,
    globals: IndexMap<String, Value>,
    sink: Sink,
    depth: usize,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    /// VM printing to stdout
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            config,
            globals: IndexMap::new(),
            sink: Sink::Stdout,
            depth: 0,
        }
    }

    /// VM capturing `print` output, for tests and the demo harness
    pub fn with_capture() -> Self {
        let mut vm = Self::new();
        vm.sink = Sink::Capture(String::new());
        vm
    }

    /// Captured output so far (empty for a stdout VM)
    pub fn output(&self) -> &str {
        match &self.sink {
            Sink::Capture(buffer) => buffer,
            Sink::Stdout => "",
        }
    }

    /// Globals after a run
    pub fn globals(&self) -> &IndexMap<String, Value> {
        &self.globals
    }

    /// Look up `main` and execute it
    pub fn run_main(&mut self, module: &Module) -> VmResult<Value> {
        for (name, initial) in &module.globals {
            let value = match initial {
                ValueRef::Const(c) => constant_value(c),
                _ => Value::Null,
            };
            self.globals.insert(name.clone(), value);
        }
        let main = module.function("main").ok_or(VmError::NoMain)?;
        self.call_function(module, main, Vec::new())
    }

    /// Execute one function activation
    fn call_function(
        &mut self,
        module: &Module,
        function: &Function,
        args: Vec<Value>,
    ) -> VmResult<Value> {
        if self.depth >= self.config.max_call_depth {
            return Err(VmError::CallDepthExceeded(self.config.max_call_depth));
        }
        self.depth += 1;
        let result = self.run_frame(module, function, args);
        self.depth -= 1;
        result
    }

    fn run_frame(
        &mut self,
        module: &Module,
        function: &Function,
        args: Vec<Value>,
    ) -> VmResult<Value> {
        let mut frame = Frame::new(&function.name);
        // Positional argument-to-parameter wiring; missing arguments
        // bind null, extras are dropped.
        for (i, param) in function.params.iter().enumerate() {
            frame
                .locals
                .insert(param.clone(), args.get(i).cloned().unwrap_or(Value::Null));
        }

        let mut block_idx = function.entry;
        let mut ip = 0usize;

        loop {
            let block = match function.blocks.get(block_idx) {
                Some(block) => block,
                None => return Ok(Value::Null),
            };
            let Some(instruction) = block.instructions.get(ip) else {
                // A block that runs off its end returns null.
                return Ok(Value::Null);
            };
            if self.config.trace_execution {
                trace!("{}: {}", function.name, instruction);
            }
            ip += 1;

            match instruction.op {
                Opcode::Nop => {}
                Opcode::Const => {
                    let value = match instruction.args.first() {
                        Some(ValueRef::Const(c)) => constant_value(c),
                        _ => {
                            return Err(VmError::InvalidInstruction(
                                "Const requires a literal argument".to_string(),
                            ))
                        }
                    };
                    self.write_dst(&mut frame, instruction, value)?;
                }
                Opcode::Load => {
                    let value = match instruction.args.first() {
                        Some(ValueRef::Symbol(name)) => self.load_var(&frame, function, name),
                        Some(other) => self.read(&frame, other)?,
                        None => {
                            return Err(VmError::InvalidInstruction(
                                "Load requires an argument".to_string(),
                            ))
                        }
                    };
                    self.write_dst(&mut frame, instruction, value)?;
                }
                Opcode::Store => {
                    let name = instruction
                        .args
                        .first()
                        .and_then(|a| a.as_symbol())
                        .ok_or_else(|| {
                            VmError::InvalidInstruction("Store requires a symbol".to_string())
                        })?
                        .to_string();
                    let value = self.read_arg(&frame, instruction, 1)?;
                    self.store_var(&mut frame, function, &name, value);
                }
                Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Mod => {
                    let lhs = self.read_arg(&frame, instruction, 0)?;
                    let rhs = self.read_arg(&frame, instruction, 1)?;
                    let value = arithmetic(instruction.op, &lhs, &rhs)?;
                    self.write_dst(&mut frame, instruction, value)?;
                }
                Opcode::Neg => {
                    let operand = self.read_arg(&frame, instruction, 0)?;
                    let value = match operand {
                        Value::Int(n) => Value::Int(-n),
                        Value::Float(n) => Value::Float(-n),
                        other => {
                            return Err(VmError::UnsupportedTypes {
                                op: "-".to_string(),
                                left: other.kind().to_string(),
                                right: "-".to_string(),
                            })
                        }
                    };
                    self.write_dst(&mut frame, instruction, value)?;
                }
                Opcode::Not => {
                    let operand = self.read_arg(&frame, instruction, 0)?;
                    let flag = operand.truthy().ok_or(VmError::BadCondition {
                        found: operand.kind().to_string(),
                    })?;
                    self.write_dst(&mut frame, instruction, Value::Bool(!flag))?;
                }
                Opcode::CmpEq | Opcode::CmpNe => {
                    let lhs = self.read_arg(&frame, instruction, 0)?;
                    let rhs = self.read_arg(&frame, instruction, 1)?;
                    let mut equal = lhs.loose_eq(&rhs);
                    if instruction.op == Opcode::CmpNe {
                        equal = !equal;
                    }
                    self.write_dst(&mut frame, instruction, Value::Bool(equal))?;
                }
                Opcode::CmpLt | Opcode::CmpLe | Opcode::CmpGt | Opcode::CmpGe => {
                    let lhs = self.read_arg(&frame, instruction, 0)?;
                    let rhs = self.read_arg(&frame, instruction, 1)?;
                    let value = compare(instruction.op, &lhs, &rhs)?;
                    self.write_dst(&mut frame, instruction, value)?;
                }
                Opcode::Jump => {
                    let label = instruction
                        .args
                        .first()
                        .and_then(|a| a.as_symbol())
                        .ok_or_else(|| {
                            VmError::InvalidInstruction("Jump requires a label".to_string())
                        })?;
                    block_idx = resolve_label(function, label)?;
                    ip = 0;
                }
                Opcode::Branch => {
                    let cond = self.read_arg(&frame, instruction, 0)?;
                    let flag = cond.truthy().ok_or(VmError::BadCondition {
                        found: cond.kind().to_string(),
                    })?;
                    let target_idx = if flag { 1 } else { 2 };
                    let label = instruction
                        .args
                        .get(target_idx)
                        .and_then(|a| a.as_symbol())
                        .ok_or_else(|| {
                            VmError::InvalidInstruction("Branch requires two labels".to_string())
                        })?;
                    block_idx = resolve_label(function, label)?;
                    ip = 0;
                }
                Opcode::Call => {
                    let value = self.execute_call(module, &frame, instruction)?;
                    if instruction.dst.is_some() {
                        self.write_dst(&mut frame, instruction, value)?;
                    }
                }
                Opcode::Return => {
                    return match instruction.args.first() {
                        Some(arg) => self.read(&frame, arg),
                        None => Ok(Value::Null),
                    };
                }
                Opcode::MakeArray => {
                    let items = self.read_all(&frame, instruction)?;
                    self.write_dst(&mut frame, instruction, Value::array(items))?;
                }
                Opcode::MakeMap => {
                    let flat = self.read_all(&frame, instruction)?;
                    let mut entries = IndexMap::new();
                    for pair in flat.chunks(2) {
                        let key = Key::from_value(&pair[0])
                            .ok_or_else(|| VmError::InvalidKey(pair[0].kind().to_string()))?;
                        entries.insert(key, pair.get(1).cloned().unwrap_or(Value::Null));
                    }
                    self.write_dst(&mut frame, instruction, Value::map(entries))?;
                }
                Opcode::MakeSet => {
                    let items = self.read_all(&frame, instruction)?;
                    let mut set = indexmap::IndexSet::new();
                    for item in &items {
                        let key = Key::from_value(item)
                            .ok_or_else(|| VmError::InvalidKey(item.kind().to_string()))?;
                        set.insert(key);
                    }
                    self.write_dst(&mut frame, instruction, Value::set(set))?;
                }
                Opcode::MakeStruct => {
                    let name = instruction.meta.as_deref().ok_or_else(|| {
                        VmError::InvalidInstruction("MakeStruct requires a name".to_string())
                    })?;
                    let layout = module
                        .structs
                        .get(name)
                        .ok_or_else(|| VmError::UnknownStruct(name.to_string()))?;
                    let value = Value::empty_struct(&layout.name, &layout.fields);
                    self.write_dst(&mut frame, instruction, value)?;
                }
                Opcode::IndexGet => {
                    let object = self.read_arg(&frame, instruction, 0)?;
                    let index = self.read_arg(&frame, instruction, 1)?;
                    let positional = instruction.meta.as_deref() == Some("iter");
                    let value = index_get(&object, &index, positional)?;
                    self.write_dst(&mut frame, instruction, value)?;
                }
                Opcode::IndexSet => {
                    let object = self.read_arg(&frame, instruction, 0)?;
                    let index = self.read_arg(&frame, instruction, 1)?;
                    let value = self.read_arg(&frame, instruction, 2)?;
                    index_set(&object, &index, value)?;
                }
                Opcode::MemberGet => {
                    let object = self.read_arg(&frame, instruction, 0)?;
                    let field = instruction.meta.as_deref().ok_or_else(|| {
                        VmError::InvalidInstruction("MemberGet requires a field".to_string())
                    })?;
                    let value = member_get(&object, field)?;
                    self.write_dst(&mut frame, instruction, value)?;
                }
                Opcode::MemberSet => {
                    let object = self.read_arg(&frame, instruction, 0)?;
                    let value = self.read_arg(&frame, instruction, 1)?;
                    let field = instruction.meta.as_deref().ok_or_else(|| {
                        VmError::InvalidInstruction("MemberSet requires a field".to_string())
                    })?;
                    member_set(&object, field, value)?;
                }
            }
        }
    }

    /// Resolve and execute a `Call`
    fn execute_call(
        &mut self,
        module: &Module,
        frame: &Frame,
        instruction: &Instruction,
    ) -> VmResult<Value> {
        let callee = instruction
            .args
            .first()
            .and_then(|a| a.as_symbol())
            .ok_or_else(|| VmError::InvalidInstruction("Call requires a callee".to_string()))?
            .to_string();
        let mut args = Vec::new();
        for arg in &instruction.args[1..] {
            args.push(self.read(frame, arg)?);
        }

        if callee == "print" {
            let line = builtins::format_print(&args);
            match &mut self.sink {
                Sink::Stdout => print!("{line}"),
                Sink::Capture(buffer) => buffer.push_str(&line),
            }
            return Ok(Value::Null);
        }
        if builtins::is_builtin(&callee) {
            return builtins::call(&callee, &args);
        }

        // Dynamic method dispatch: resolve by the receiver's struct.
        if let Some(method) = callee.strip_prefix("method:") {
            let receiver = args.first().cloned().unwrap_or(Value::Null);
            let Value::Struct(obj) = &receiver else {
                return Err(VmError::NotAStruct {
                    found: receiver.kind().to_string(),
                });
            };
            let struct_name = obj.borrow().name.clone();
            let target = module
                .structs
                .get(&struct_name)
                .and_then(|layout| layout.methods.get(method))
                .cloned()
                .ok_or_else(|| VmError::UnknownCallee(format!("{struct_name}.{method}")))?;
            let function = module
                .function(&target)
                .ok_or_else(|| VmError::UnknownCallee(target.clone()))?;
            return self.call_function(module, function, args);
        }

        match module.function(&callee) {
            Some(function) => self.call_function(module, function, args),
            // `new` on a struct without an implementation emits an
            // init call that resolves to nothing; that is a no-op.
            None if instruction.meta.as_deref() == Some("init") => Ok(Value::Null),
            None => Err(VmError::UnknownCallee(callee)),
        }
    }

    fn write_dst(
        &mut self,
        frame: &mut Frame,
        instruction: &Instruction,
        value: Value,
    ) -> VmResult<()> {
        let dst = instruction.dst.ok_or_else(|| {
            VmError::InvalidInstruction(format!("{} requires a destination", instruction.op))
        })?;
        frame.temps.insert(dst, value);
        Ok(())
    }

    fn read(&self, frame: &Frame, arg: &ValueRef) -> VmResult<Value> {
        match arg {
            ValueRef::Const(c) => Ok(constant_value(c)),
            ValueRef::Temp(t) => frame.temps.get(t).cloned().ok_or_else(|| {
                VmError::InvalidInstruction(format!("read of undefined temp t{t}"))
            }),
            ValueRef::Symbol(name) => Ok(frame
                .locals
                .get(name)
                .or_else(|| self.globals.get(name))
                .cloned()
                .unwrap_or(Value::Null)),
        }
    }

    fn read_arg(&self, frame: &Frame, instruction: &Instruction, index: usize) -> VmResult<Value> {
        let arg = instruction.args.get(index).ok_or_else(|| {
            VmError::InvalidInstruction(format!(
                "{} requires {} argument(s)",
                instruction.op,
                index + 1
            ))
        })?;
        self.read(frame, arg)
    }

    fn read_all(&self, frame: &Frame, instruction: &Instruction) -> VmResult<Vec<Value>> {
        instruction
            .args
            .iter()
            .map(|arg| self.read(frame, arg))
            .collect()
    }

    /// Variable read: frame locals shadow globals; a missing name
    /// reads as null.
    fn load_var(&self, frame: &Frame, _function: &Function, name: &str) -> Value {
        frame
            .locals
            .get(name)
            .or_else(|| self.globals.get(name))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Variable write: names the function declares go to the frame,
    /// everything else to the module globals.
    fn store_var(&mut self, frame: &mut Frame, function: &Function, name: &str, value: Value) {
        if function.locals.iter().any(|l| l == name) {
            frame.locals.insert(name.to_string(), value);
        } else {
            self.globals.insert(name.to_string(), value);
        }
    }
}

fn resolve_label(function: &Function, label: &str) -> VmResult<usize> {
    function
        .block_index(label)
        .ok_or_else(|| VmError::UnknownLabel {
            function: function.name.clone(),
            label: label.to_string(),
        })
}

fn constant_value(constant: &crate::middle::ir::Constant) -> Value {
    use crate::middle::ir::Constant;
    match constant {
        Constant::Null => Value::Null,
        Constant::Int(n) => Value::Int(*n),
        Constant::Float(n) => Value::Float(*n),
        Constant::Bool(b) => Value::Bool(*b),
        Constant::Str(s) => Value::Str(s.clone()),
    }
}

/// Arithmetic with implicit int-to-float widening; `+` additionally
/// concatenates strings.
fn arithmetic(op: Opcode, lhs: &Value, rhs: &Value) -> VmResult<Value> {
    if op == Opcode::Add {
        if let (Value::Str(a), Value::Str(b)) = (lhs, rhs) {
            return Ok(Value::Str(format!("{a}{b}")));
        }
    }
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => match op {
            Opcode::Add => Ok(Value::Int(a.wrapping_add(*b))),
            Opcode::Sub => Ok(Value::Int(a.wrapping_sub(*b))),
            Opcode::Mul => Ok(Value::Int(a.wrapping_mul(*b))),
            Opcode::Div => {
                if *b == 0 {
                    Err(VmError::DivisionByZero)
                } else {
                    Ok(Value::Int(a.wrapping_div(*b)))
                }
            }
            Opcode::Mod => {
                if *b == 0 {
                    Err(VmError::DivisionByZero)
                } else {
                    Ok(Value::Int(a.wrapping_rem(*b)))
                }
            }
            _ => unreachable!("arithmetic opcode"),
        },
        _ => {
            let (a, b) = match (as_float(lhs), as_float(rhs)) {
                (Some(a), Some(b)) => (a, b),
                _ => {
                    return Err(VmError::UnsupportedTypes {
                        op: op.to_string(),
                        left: lhs.kind().to_string(),
                        right: rhs.kind().to_string(),
                    })
                }
            };
            match op {
                Opcode::Add => Ok(Value::Float(a + b)),
                Opcode::Sub => Ok(Value::Float(a - b)),
                Opcode::Mul => Ok(Value::Float(a * b)),
                Opcode::Div => {
                    if b == 0.0 {
                        Err(VmError::DivisionByZero)
                    } else {
                        Ok(Value::Float(a / b))
                    }
                }
                Opcode::Mod => {
                    if b == 0.0 {
                        Err(VmError::DivisionByZero)
                    } else {
                        Ok(Value::Float(a % b))
                    }
                }
                _ => unreachable!("arithmetic opcode"),
            }
        }
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(n) => Some(*n),
        _ => None,
    }
}

/// Ordering comparisons: numeric with coercion, or lexicographic over
/// two strings; other pairs fail.
fn compare(op: Opcode, lhs: &Value, rhs: &Value) -> VmResult<Value> {
    let ordering = if let (Value::Str(a), Value::Str(b)) = (lhs, rhs) {
        a.cmp(b)
    } else {
        match (as_float(lhs), as_float(rhs)) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal),
            _ => {
                return Err(VmError::UnsupportedTypes {
                    op: op.to_string(),
                    left: lhs.kind().to_string(),
                    right: rhs.kind().to_string(),
                })
            }
        }
    };
    let flag = match op {
        Opcode::CmpLt => ordering.is_lt(),
        Opcode::CmpLe => ordering.is_le(),
        Opcode::CmpGt => ordering.is_gt(),
        Opcode::CmpGe => ordering.is_ge(),
        _ => unreachable!("comparison opcode"),
    };
    Ok(Value::Bool(flag))
}

/// Element read. Positional mode serves the for-in desugaring: arrays
/// by offset, maps yield the key at the offset, sets the element,
/// strings a one-byte substring.
fn index_get(object: &Value, index: &Value, positional: bool) -> VmResult<Value> {
    match object {
        Value::Array(items) => {
            let items = items.borrow();
            let idx = int_index(index, items.len())?;
            Ok(items[idx].clone())
        }
        Value::Str(s) => {
            let idx = int_index(index, s.chars().count())?;
            let ch = s.chars().nth(idx).expect("index checked");
            Ok(Value::Str(ch.to_string()))
        }
        Value::Map(entries) => {
            let entries = entries.borrow();
            if positional {
                let idx = int_index(index, entries.len())?;
                let (key, _) = entries.get_index(idx).expect("index checked");
                Ok(key.to_value())
            } else {
                let key = Key::from_value(index)
                    .ok_or_else(|| VmError::InvalidKey(index.kind().to_string()))?;
                Ok(entries.get(&key).cloned().unwrap_or(Value::Null))
            }
        }
        Value::Set(items) => {
            let items = items.borrow();
            if positional {
                let idx = int_index(index, items.len())?;
                Ok(items.get_index(idx).expect("index checked").to_value())
            } else {
                let key = Key::from_value(index)
                    .ok_or_else(|| VmError::InvalidKey(index.kind().to_string()))?;
                Ok(Value::Bool(items.contains(&key)))
            }
        }
        other => Err(VmError::NotIndexable {
            found: other.kind().to_string(),
        }),
    }
}

fn index_set(object: &Value, index: &Value, value: Value) -> VmResult<()> {
    match object {
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            let len = items.len();
            let idx = int_index(index, len)?;
            items[idx] = value;
            Ok(())
        }
        Value::Map(entries) => {
            let key = Key::from_value(index)
                .ok_or_else(|| VmError::InvalidKey(index.kind().to_string()))?;
            entries.borrow_mut().insert(key, value);
            Ok(())
        }
        other => Err(VmError::NotIndexable {
            found: other.kind().to_string(),
        }),
    }
}

fn int_index(index: &Value, len: usize) -> VmResult<usize> {
    let Value::Int(i) = index else {
        return Err(VmError::UnsupportedTypes {
            op: "index".to_string(),
            left: index.kind().to_string(),
            right: "int".to_string(),
        });
    };
    if *i < 0 || *i as usize >= len {
        return Err(VmError::IndexOutOfBounds { index: *i, len });
    }
    Ok(*i as usize)
}

fn member_get(object: &Value, field: &str) -> VmResult<Value> {
    let Value::Struct(obj) = object else {
        return Err(VmError::NotAStruct {
            found: object.kind().to_string(),
        });
    };
    let obj = obj.borrow();
    obj.fields
        .get(field)
        .cloned()
        .ok_or_else(|| VmError::UnknownField {
            name: obj.name.clone(),
            field: field.to_string(),
        })
}

fn member_set(object: &Value, field: &str, value: Value) -> VmResult<()> {
    let Value::Struct(obj) = object else {
        return Err(VmError::NotAStruct {
            found: object.kind().to_string(),
        });
    };
    let mut obj = obj.borrow_mut();
    let name = obj.name.clone();
    match obj.fields.get_mut(field) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(VmError::UnknownField {
            name,
            field: field.to_string(),
        }),
    }
}
