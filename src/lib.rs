//! Alpha Programming Language
//!
//! Front-end and mid-end of a compiler for Alpha, a small
//! statically-typed imperative language with C-family syntax:
//! source → tokens → AST → typed AST → IR → optimized IR → VM
//! execution, plus a secondary Go-text emission backend over the same
//! IR.
//!
//! # Example
//!
//! ```no_run
//! use alpha::{run, Result};
//!
//! fn main() -> Result<()> {
//!     run("int a = 1 + 2 print(a)")?;
//!     Ok(())
//! }
//! ```

#![warn(rust_2018_idioms)]

pub mod backends;
pub mod demos;
pub mod frontend;
pub mod middle;
pub mod runtime;
pub mod util;
pub mod vm;

// Re-exports
pub use anyhow::{Context, Result};

use tracing::debug;

/// Language version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Language name
pub const NAME: &str = "Alpha";

/// Compile and execute source code, printing to stdout
pub fn run(source: &str) -> Result<()> {
    let mut compiler = frontend::Compiler::new();
    let module = compiler.compile(source)?;
    debug!("starting VM");
    let mut vm = vm::Vm::new();
    vm.run_main(&module)?;
    debug!("VM finished");
    Ok(())
}

/// Compile and execute, capturing `print` output. Used by tests and
/// the demo harness.
pub fn run_captured(source: &str) -> Result<String> {
    let mut compiler = frontend::Compiler::new();
    let module = compiler.compile(source)?;
    let mut vm = vm::Vm::with_capture();
    vm.run_main(&module)?;
    Ok(vm.output().to_string())
}

use ::std::fs;
use ::std::path::Path;

/// Run a source file
pub fn run_file(path: &Path) -> Result<()> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    run(&source)
}

/// Check a source string, returning each recorded error as a line
pub fn check(source: &str) -> Vec<String> {
    let analysis = frontend::analyze(source);
    let mut errors: Vec<String> = analysis
        .parse_errors
        .iter()
        .map(|e| e.to_string())
        .collect();
    errors.extend(analysis.check.errors.iter().map(|e| e.to_string()));
    errors
}

/// Compile to IR and render the Go emission
pub fn emit_go(source: &str) -> Result<String> {
    let mut compiler = frontend::Compiler::new();
    let module = compiler.compile(source)?;
    Ok(backends::emit_module(&module))
}
