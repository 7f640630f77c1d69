//! Frontend compilation pipeline
//!
//! Scanner, parser, and checker, driven in order by [`Compiler`]. Each
//! phase fully consumes its predecessor's output; later phases are
//! skipped as soon as one reports errors.

use thiserror::Error;
use tracing::debug;

use crate::middle;

pub mod config;
pub mod lexer;
pub mod parser;
pub mod typecheck;

pub use config::CompileConfig;

/// Result of running the front half only (used by `check` and the
/// demo harness, which want the errors as data rather than strings)
#[derive(Debug)]
pub struct Analysis {
    pub program: parser::ast::Program,
    pub parse_errors: Vec<parser::ParseError>,
    pub check: typecheck::CheckResult,
}

impl Analysis {
    pub fn is_ok(&self) -> bool {
        self.parse_errors.is_empty() && self.check.is_ok()
    }
}

/// Tokenize, parse, and check a source string. Total: always returns,
/// with whatever errors were accumulated.
pub fn analyze(source: &str) -> Analysis {
    let tokens = lexer::tokenize(source);
    debug!("tokenized {} tokens", tokens.len());
    let (mut program, parse_errors) = parser::parse(&tokens);
    debug!(
        "parsed {} statement(s), {} parse error(s)",
        program.body.len(),
        parse_errors.len()
    );
    let check = if parse_errors.is_empty() {
        typecheck::check_program(&mut program)
    } else {
        // Checking a broken tree would double-report; surface the
        // parse errors alone.
        typecheck::CheckResult::default()
    };
    Analysis {
        program,
        parse_errors,
        check,
    }
}

/// Compiler context
#[derive(Debug, Default)]
pub struct Compiler {
    config: CompileConfig,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CompileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    /// Compile source text all the way to an optimized IR module
    pub fn compile(&mut self, source: &str) -> Result<middle::Module, CompileError> {
        debug!("compiling {} bytes", source.len());
        let analysis = analyze(source);
        if !analysis.parse_errors.is_empty() {
            return Err(CompileError::Parse(join(&analysis.parse_errors)));
        }
        if !analysis.check.is_ok() {
            return Err(CompileError::Type(join(&analysis.check.errors)));
        }

        let mut module = middle::generate(&analysis.program, &analysis.check)
            .map_err(|errors| CompileError::Lower(join(&errors)))?;
        debug!("lowered {} function(s)", module.functions.len());

        if self.config.optimize {
            middle::optimize(&mut module);
            debug!("optimization passes complete");
        }
        Ok(module)
    }
}

fn join<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compilation errors, one variant per phase
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Lowering error: {0}")]
    Lower(String),
}
