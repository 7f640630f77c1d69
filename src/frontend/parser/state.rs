//! Parser state and token stream management

use super::super::lexer::tokens::{Keyword, Op, Token, TokenKind};
use super::ParseError;
use crate::util::span::Span;

/// Binding power levels for the Pratt loop, low to high
pub const BP_LOWEST: u8 = 0;
pub const BP_TERNARY: u8 = 5;
pub const BP_ASSIGN: u8 = 10;
pub const BP_OR: u8 = 20;
pub const BP_AND: u8 = 30;
pub const BP_EQ: u8 = 40;
pub const BP_CMP: u8 = 50;
pub const BP_ADD: u8 = 60;
pub const BP_MUL: u8 = 70;
pub const BP_UNARY: u8 = 80;
pub const BP_CALL: u8 = 90;
pub const BP_POSTFIX: u8 = 95;
pub const BP_HIGHEST: u8 = 100;

/// Keywords that can begin a statement; recovery stops at these
const SYNC_KEYWORDS: &[Keyword] = &[
    Keyword::Var,
    Keyword::Const,
    Keyword::Function,
    Keyword::Type,
    Keyword::Struct,
    Keyword::Implement,
    Keyword::If,
    Keyword::While,
    Keyword::Do,
    Keyword::For,
    Keyword::Switch,
    Keyword::Return,
    Keyword::Break,
    Keyword::Continue,
];

/// Parser state: token slice, cursor, and accumulated errors
#[derive(Debug)]
pub struct ParserState<'a> {
    tokens: &'a [Token],
    pos: usize,
    errors: Vec<ParseError>,
}

impl<'a> ParserState<'a> {
    /// Create a new parser state
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Check if at end of token stream
    #[inline]
    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
            || matches!(self.tokens[self.pos].kind, TokenKind::Eof)
    }

    /// Current token
    #[inline]
    pub fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// One-token lookahead
    #[inline]
    pub fn next(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    /// N-token lookahead for bounded speculation
    #[inline]
    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    /// Raw cursor, for save/restore around speculative scans
    #[inline]
    pub fn mark(&self) -> usize {
        self.pos
    }

    /// Restore a saved cursor
    #[inline]
    pub fn rewind(&mut self, mark: usize) {
        self.pos = mark;
    }

    /// Advance to next token
    #[inline]
    pub fn bump(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Span of the current token (dummy at end of stream)
    #[inline]
    pub fn span(&self) -> Span {
        self.current().map(|t| t.span).unwrap_or_else(Span::dummy)
    }

    /// Current token matches an operator
    #[inline]
    pub fn at_op(&self, op: Op) -> bool {
        matches!(self.current(), Some(t) if t.is_op(op))
    }

    /// Current token matches a keyword
    #[inline]
    pub fn at_kw(&self, kw: Keyword) -> bool {
        matches!(self.current(), Some(t) if t.is_kw(kw))
    }

    /// Consume an operator if present
    #[inline]
    pub fn skip_op(&mut self, op: Op) -> bool {
        if self.at_op(op) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume a keyword if present
    #[inline]
    pub fn skip_kw(&mut self, kw: Keyword) -> bool {
        if self.at_kw(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Expect an operator, recording an error on mismatch
    pub fn expect_op(&mut self, op: Op) -> bool {
        if self.at_op(op) {
            self.bump();
            true
        } else {
            self.error_expected(format!("'{op}'"));
            false
        }
    }

    /// Expect a keyword, recording an error on mismatch
    pub fn expect_kw(&mut self, kw: Keyword) -> bool {
        if self.at_kw(kw) {
            self.bump();
            true
        } else {
            self.error_expected(format!("'{kw}'"));
            false
        }
    }

    /// Expect and return an identifier name
    pub fn expect_ident(&mut self) -> Option<String> {
        match self.current().map(|t| &t.kind) {
            Some(TokenKind::Identifier(name)) => {
                let name = name.clone();
                self.bump();
                Some(name)
            }
            _ => {
                self.error_expected("identifier".to_string());
                None
            }
        }
    }

    /// Record an `expected X at line:col` error at the current token
    pub fn error_expected(&mut self, expected: String) {
        let pos = self
            .current()
            .map(|t| t.span.start)
            .unwrap_or_else(crate::util::span::Position::dummy);
        self.errors.push(ParseError::Expected {
            expected,
            line: pos.line,
            column: pos.column,
        });
    }

    /// Record an arbitrary parse error
    pub fn error(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    /// Check whether any error was recorded
    #[inline]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Error count, for save/restore around speculative parses
    #[inline]
    pub fn errors_len(&self) -> usize {
        self.errors.len()
    }

    /// Drop errors recorded by an abandoned speculation
    #[inline]
    pub fn truncate_errors(&mut self, len: usize) {
        self.errors.truncate(len);
    }

    /// Take ownership of the accumulated errors
    #[inline]
    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    /// Skip forward to a plausible statement boundary: `;`, `}`, end of
    /// input, or a statement-starter keyword. Always consumes at least
    /// one token so recovery makes progress.
    pub fn synchronize(&mut self) {
        self.bump();
        while let Some(token) = self.current() {
            match &token.kind {
                TokenKind::Eof => break,
                TokenKind::Operator(Op::Semicolon) | TokenKind::Operator(Op::RBrace) => break,
                TokenKind::Keyword(kw) if SYNC_KEYWORDS.contains(kw) => break,
                _ => self.bump(),
            }
        }
    }

    /// Surface a lexical error token as a parse error and step past it
    pub fn consume_error_token(&mut self) {
        if let Some(token) = self.current() {
            if let TokenKind::Error(message) = &token.kind {
                let error = ParseError::Lexical {
                    message: message.clone(),
                    line: token.span.start.line,
                    column: token.span.start.column,
                };
                self.errors.push(error);
                self.bump();
            }
        }
    }
}
