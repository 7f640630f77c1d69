//! Type parsing
//!
//! `parse_type` parses a base form, then zero or more wrapping
//! modifiers (`?`, `*`, `[size?]`), then folds a top-level `|` chain
//! into a flat union.

use super::super::lexer::tokens::{Keyword, Op, TokenKind};
use super::ast::Type;
use super::state::{ParserState, BP_LOWEST};

impl<'a> ParserState<'a> {
    /// Parse a full type, including unions
    pub fn parse_type(&mut self) -> Option<Type> {
        let first = self.parse_single_type()?;
        if !self.at_op(Op::Pipe) {
            return Some(first);
        }

        // Left-associative flattening: a | b | c is one union of three.
        let mut members = vec![first];
        while self.skip_op(Op::Pipe) {
            members.push(self.parse_single_type()?);
        }
        Some(Type::Union(members))
    }

    /// Parse one type without union alternatives
    pub fn parse_single_type(&mut self) -> Option<Type> {
        let mut ty = self.parse_base_type()?;
        loop {
            if self.skip_op(Op::Question) {
                ty = Type::Nullable(Box::new(ty));
            } else if self.skip_op(Op::Star) {
                ty = Type::Pointer(Box::new(ty));
            } else if self.skip_op(Op::LBracket) {
                let size = if self.at_op(Op::RBracket) {
                    None
                } else {
                    Some(Box::new(self.parse_expression(BP_LOWEST)?))
                };
                if !self.expect_op(Op::RBracket) {
                    return None;
                }
                ty = Type::Array {
                    elem: Box::new(ty),
                    size,
                };
            } else {
                break;
            }
        }
        Some(ty)
    }

    /// Base forms: primitive keyword, `set<T>`, `map<K,V>`, user type
    /// name (generic arguments are erased), generic parameter.
    fn parse_base_type(&mut self) -> Option<Type> {
        let token = match self.current() {
            Some(t) => t.clone(),
            None => {
                self.error_expected("type".to_string());
                return None;
            }
        };

        match &token.kind {
            TokenKind::Keyword(kw) if kw.is_primitive() => {
                self.bump();
                let base = Type::Primitive(kw.as_str().to_string());
                // The scanner absorbs `int?` into one lexeme; reuse it
                // as the first nullable wrapper.
                if token.absorbed_question() {
                    Some(Type::Nullable(Box::new(base)))
                } else {
                    Some(base)
                }
            }
            TokenKind::GenericParam(letter) => {
                self.bump();
                let base = Type::GenericParam(letter.to_string());
                if token.absorbed_question() {
                    Some(Type::Nullable(Box::new(base)))
                } else {
                    Some(base)
                }
            }
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.bump();
                let base = match name.as_str() {
                    "set" if self.at_op(Op::Lt) => {
                        self.bump();
                        let elem = self.parse_type()?;
                        if !self.expect_op(Op::Gt) {
                            return None;
                        }
                        Type::Set(Box::new(elem))
                    }
                    "map" if self.at_op(Op::Lt) => {
                        self.bump();
                        let key = self.parse_type()?;
                        if !self.expect_op(Op::Comma) {
                            return None;
                        }
                        let value = self.parse_type()?;
                        if !self.expect_op(Op::Gt) {
                            return None;
                        }
                        Type::Map {
                            key: Box::new(key),
                            value: Box::new(value),
                        }
                    }
                    _ => {
                        // Generic application on a user type is parsed
                        // and erased; the checker enforces arity at
                        // `new` sites where the arguments survive.
                        if self.at_op(Op::Lt) && self.generic_args_ahead() {
                            self.parse_type_args();
                        }
                        Type::Named(name)
                    }
                };
                if token.absorbed_question() {
                    Some(Type::Nullable(Box::new(base)))
                } else {
                    Some(base)
                }
            }
            _ => {
                self.error_expected("type".to_string());
                None
            }
        }
    }

    /// Parse `<T, U, ...>`; the caller has verified the opening `<`
    pub fn parse_type_args(&mut self) -> Vec<Type> {
        let mut args = Vec::new();
        if !self.expect_op(Op::Lt) {
            return args;
        }
        if self.skip_op(Op::Gt) {
            return args;
        }
        loop {
            match self.parse_type() {
                Some(ty) => args.push(ty),
                None => break,
            }
            if !self.skip_op(Op::Comma) {
                break;
            }
        }
        self.expect_op(Op::Gt);
        args
    }

    /// Parse `<T, U>` generic parameter names for declarations
    pub fn parse_generic_params(&mut self) -> Vec<String> {
        let mut params = Vec::new();
        if !self.expect_op(Op::Lt) {
            return params;
        }
        loop {
            match self.current().map(|t| &t.kind) {
                Some(TokenKind::GenericParam(letter)) => {
                    params.push(letter.to_string());
                    self.bump();
                }
                _ => {
                    self.error_expected("generic parameter".to_string());
                    break;
                }
            }
            if !self.skip_op(Op::Comma) {
                break;
            }
        }
        self.expect_op(Op::Gt);
        params
    }

    /// Bounded token-level scan from an opening `<`: true when a
    /// matching `>` closes over type-shaped tokens. Consumes nothing.
    pub fn generic_args_ahead(&self) -> bool {
        debug_assert!(self.at_op(Op::Lt));
        let mut depth = 0usize;
        for i in 0..super::led::GENERIC_SCAN_LIMIT {
            let Some(token) = self.peek_nth(i) else {
                return false;
            };
            match &token.kind {
                TokenKind::Operator(Op::Lt) => depth += 1,
                TokenKind::Operator(Op::Gt) => {
                    depth -= 1;
                    if depth == 0 {
                        return true;
                    }
                }
                TokenKind::Operator(Op::Comma)
                | TokenKind::Operator(Op::Question)
                | TokenKind::Operator(Op::Star)
                | TokenKind::Operator(Op::LBracket)
                | TokenKind::Operator(Op::RBracket)
                | TokenKind::Operator(Op::Pipe)
                | TokenKind::GenericParam(_)
                | TokenKind::Identifier(_) => {}
                TokenKind::Keyword(kw) if kw.is_primitive() => {}
                _ => return false,
            }
        }
        false
    }

    /// True when the current keyword is a primitive type keyword
    pub fn at_primitive(&self) -> bool {
        matches!(
            self.current().map(|t| &t.kind),
            Some(TokenKind::Keyword(kw)) if kw.is_primitive()
        )
    }

    /// Helper used by statement dispatch: does a `function` keyword
    /// follow the upcoming type? Scans `Type` shaped tokens without
    /// consuming, bounded by the same limit as generic scans.
    pub fn function_keyword_after_type(&self) -> bool {
        let mut i = 0usize;
        let mut depth = 0usize;
        while i < super::led::GENERIC_SCAN_LIMIT {
            let Some(token) = self.peek_nth(i) else {
                return false;
            };
            match &token.kind {
                TokenKind::Keyword(Keyword::Function) => return depth == 0 && i > 0,
                TokenKind::Keyword(kw) if kw.is_primitive() => {}
                TokenKind::Identifier(_) | TokenKind::GenericParam(_) => {}
                TokenKind::Operator(Op::Lt) => depth += 1,
                TokenKind::Operator(Op::Gt) => depth = depth.saturating_sub(1),
                TokenKind::Operator(Op::Question)
                | TokenKind::Operator(Op::Star)
                | TokenKind::Operator(Op::LBracket)
                | TokenKind::Operator(Op::RBracket)
                | TokenKind::Operator(Op::Pipe)
                | TokenKind::Operator(Op::Comma) => {}
                _ => return false,
            }
            i += 1;
        }
        false
    }
}
