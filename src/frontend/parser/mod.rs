//! Parser module
//!
//! Recursive descent for statements combined with a Pratt
//! (precedence-climbing) loop for expressions, over the token stream
//! from the lexer. Errors are accumulated with their positions and the
//! parser always returns a (possibly partial) [`ast::Program`].

pub mod ast;
mod expr;
mod led;
mod nud;
mod state;
mod stmt;
mod type_parser;

pub use state::{ParserState, BP_HIGHEST, BP_LOWEST};

use thiserror::Error;

use crate::frontend::lexer::tokens::{Op, Token, TokenKind};

/// Parse error with source position
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("expected {expected} at {line}:{column}")]
    Expected {
        expected: String,
        line: usize,
        column: usize,
    },

    #[error("unexpected token '{found}' at {line}:{column}")]
    Unexpected {
        found: String,
        line: usize,
        column: usize,
    },

    #[error("invalid expression at {line}:{column}")]
    InvalidExpression { line: usize, column: usize },

    #[error("{message} at {line}:{column}")]
    Lexical {
        message: String,
        line: usize,
        column: usize,
    },
}

/// Parse a token stream into a program.
///
/// Never aborts: on failure the statement is skipped to the next
/// plausible boundary and parsing resumes, so the result is always a
/// partial [`ast::Program`] plus the recorded errors.
pub fn parse(tokens: &[Token]) -> (ast::Program, Vec<ParseError>) {
    let mut state = ParserState::new(tokens);
    let mut body = Vec::new();

    while !state.at_end() {
        // Stray semicolons between statements are skipped silently.
        if state.skip_op(Op::Semicolon) {
            continue;
        }
        if matches!(state.current().map(|t| &t.kind), Some(TokenKind::Error(_))) {
            state.consume_error_token();
            continue;
        }

        let before = state.mark();
        match state.parse_stmt() {
            Some(stmt) => {
                body.push(stmt);
                // A statement rule that consumed nothing would loop
                // forever; force progress through recovery.
                if state.mark() == before {
                    state.synchronize();
                }
            }
            None => state.synchronize(),
        }
    }

    (ast::Program { body }, state.into_errors())
}

/// Parse a single expression, mainly for tests and the REPL-style
/// `eval` path.
pub fn parse_expression(tokens: &[Token]) -> Result<ast::Expr, ParseError> {
    let mut state = ParserState::new(tokens);
    let expr = state.parse_expression(BP_LOWEST);
    let mut errors = state.into_errors();
    match expr {
        Some(e) if errors.is_empty() => Ok(e),
        _ => Err(errors.drain(..).next().unwrap_or(ParseError::InvalidExpression {
            line: 0,
            column: 0,
        })),
    }
}

#[cfg(test)]
mod tests;
