//! Prefix expression parsing (nud - null denotation)

use super::super::lexer::tokens::{Keyword, Op, TokenKind};
use super::ast::{Expr, UnOp};
use super::state::*;

impl<'a> ParserState<'a> {
    /// Prefix parser for the current token, if it can begin an
    /// expression
    pub(crate) fn prefix_info(&self) -> Option<fn(&mut Self) -> Option<Expr>> {
        match self.current().map(|t| &t.kind) {
            Some(TokenKind::IntLiteral(_))
            | Some(TokenKind::FloatLiteral(_))
            | Some(TokenKind::StringLiteral(_)) => Some(Self::parse_literal),
            Some(TokenKind::Identifier(_)) | Some(TokenKind::GenericParam(_)) => {
                Some(Self::parse_identifier)
            }
            Some(TokenKind::Keyword(kw)) => match kw {
                Keyword::True | Keyword::False | Keyword::Null => Some(Self::parse_literal),
                Keyword::SelfValue => Some(Self::parse_self),
                kw if kw.is_utility() => Some(Self::parse_utility),
                _ => None,
            },
            Some(TokenKind::Operator(op)) => match op {
                Op::Minus | Op::Plus | Op::Not | Op::PlusPlus | Op::MinusMinus => {
                    Some(Self::parse_prefix_unary)
                }
                Op::Amp => Some(Self::parse_reference),
                Op::LParen => Some(Self::parse_group),
                Op::LBracket => Some(Self::parse_array_literal),
                Op::LBrace => Some(Self::parse_map_literal),
                _ => None,
            },
            _ => None,
        }
    }

    /// Literals: int, float, string, true/false, null
    fn parse_literal(&mut self) -> Option<Expr> {
        let span = self.span();
        let expr = match self.current().map(|t| &t.kind) {
            Some(TokenKind::IntLiteral(n)) => Expr::Int(*n, span),
            Some(TokenKind::FloatLiteral(n)) => Expr::Float(*n, span),
            Some(TokenKind::StringLiteral(s)) => Expr::Str(s.clone(), span),
            Some(TokenKind::Keyword(Keyword::True)) => Expr::Bool(true, span),
            Some(TokenKind::Keyword(Keyword::False)) => Expr::Bool(false, span),
            Some(TokenKind::Keyword(Keyword::Null)) => Expr::Null(span),
            _ => return None,
        };
        self.bump();
        Some(expr)
    }

    /// Identifier and everything an identifier can open: `new`
    /// expressions, `set`/`map` constructor literals, struct literals,
    /// and the ternary that the scanner glued onto the name as `x?`.
    fn parse_identifier(&mut self) -> Option<Expr> {
        let span = self.span();
        let token = self.current()?.clone();
        let name = match &token.kind {
            TokenKind::Identifier(n) => n.clone(),
            TokenKind::GenericParam(c) => c.to_string(),
            _ => return None,
        };
        self.bump();

        if name == "new" && !token.absorbed_question() {
            if let Some(expr) = self.parse_new(span) {
                return Some(expr);
            }
            return None;
        }

        if (name == "set" || name == "map") && self.at_op(Op::Lt) && self.generic_args_ahead() {
            if let Some(expr) = self.parse_constructor_literal(&name, span) {
                return Some(expr);
            }
        }

        // `Type { field: value }` — one-token lookahead inside the
        // brace (IDENT followed by `:`) separates this from a block or
        // a map literal in the same position.
        if self.at_op(Op::LBrace) && self.struct_fields_ahead() {
            return self.parse_struct_literal(name, span);
        }

        let ident = Expr::Ident(name, span);

        // The scanner absorbed a trailing `?`; re-expand it here as the
        // ternary the writer meant.
        if token.absorbed_question() {
            return self.parse_ternary_rest(ident, span);
        }

        Some(ident)
    }

    /// `self`
    fn parse_self(&mut self) -> Option<Expr> {
        let span = self.span();
        let token = self.current()?.clone();
        self.bump();
        let expr = Expr::SelfValue(span);
        if token.absorbed_question() {
            return self.parse_ternary_rest(expr, span);
        }
        Some(expr)
    }

    /// Utility keywords (`length`, `append`, ...) read as plain callees
    fn parse_utility(&mut self) -> Option<Expr> {
        let span = self.span();
        let name = match self.current().map(|t| &t.kind) {
            Some(TokenKind::Keyword(kw)) if kw.is_utility() => kw.as_str().to_string(),
            _ => return None,
        };
        self.bump();
        Some(Expr::Ident(name, span))
    }

    /// Prefix unary: `- ! + ++ -- `
    fn parse_prefix_unary(&mut self) -> Option<Expr> {
        let span = self.span();
        let op = match self.current().map(|t| &t.kind) {
            Some(TokenKind::Operator(Op::Minus)) => UnOp::Neg,
            Some(TokenKind::Operator(Op::Plus)) => UnOp::Pos,
            Some(TokenKind::Operator(Op::Not)) => UnOp::Not,
            Some(TokenKind::Operator(Op::PlusPlus)) => UnOp::Inc,
            Some(TokenKind::Operator(Op::MinusMinus)) => UnOp::Dec,
            _ => return None,
        };
        self.bump();
        let operand = self.parse_expression(BP_UNARY)?;
        Some(Expr::Unary {
            op,
            expr: Box::new(operand),
            postfix: false,
            span,
        })
    }

    /// `&expr` address-of
    fn parse_reference(&mut self) -> Option<Expr> {
        let span = self.span();
        self.bump();
        let operand = self.parse_expression(BP_UNARY)?;
        Some(Expr::Reference(Box::new(operand), span))
    }

    /// Parenthesized expression
    fn parse_group(&mut self) -> Option<Expr> {
        self.bump();
        let inner = self.parse_expression(BP_LOWEST)?;
        if !self.expect_op(Op::RParen) {
            return None;
        }
        Some(inner)
    }

    /// `[a, b, c]`
    fn parse_array_literal(&mut self) -> Option<Expr> {
        let span = self.span();
        self.bump();
        let mut elems = Vec::new();
        while !self.at_op(Op::RBracket) && !self.at_end() {
            if !elems.is_empty() && !self.expect_op(Op::Comma) {
                return None;
            }
            elems.push(self.parse_expression(BP_LOWEST)?);
        }
        if !self.expect_op(Op::RBracket) {
            return None;
        }
        Some(Expr::ArrayLit(elems, span))
    }

    /// `{ key: value, ... }` in expression position
    fn parse_map_literal(&mut self) -> Option<Expr> {
        let span = self.span();
        self.bump();
        let mut entries = Vec::new();
        while !self.at_op(Op::RBrace) && !self.at_end() {
            if !entries.is_empty() && !self.expect_op(Op::Comma) {
                return None;
            }
            let key = self.parse_expression(BP_LOWEST)?;
            if !self.expect_op(Op::Colon) {
                return None;
            }
            let value = self.parse_expression(BP_LOWEST)?;
            entries.push((key, value));
        }
        if !self.expect_op(Op::RBrace) {
            return None;
        }
        Some(Expr::MapLit(entries, span))
    }

    /// `set<T>{...}` and `map<K,V>{...}` constructor literals. Falls
    /// back to a plain identifier when no brace follows the arguments.
    fn parse_constructor_literal(
        &mut self,
        which: &str,
        span: crate::util::span::Span,
    ) -> Option<Expr> {
        let mark = self.mark();
        let _args = self.parse_type_args();
        if !self.at_op(Op::LBrace) {
            self.rewind(mark);
            return None;
        }
        self.bump();

        if which == "set" {
            let mut elems = Vec::new();
            while !self.at_op(Op::RBrace) && !self.at_end() {
                if !elems.is_empty() && !self.expect_op(Op::Comma) {
                    return None;
                }
                elems.push(self.parse_expression(BP_LOWEST)?);
            }
            if !self.expect_op(Op::RBrace) {
                return None;
            }
            Some(Expr::SetLit(elems, span))
        } else {
            let mut entries = Vec::new();
            while !self.at_op(Op::RBrace) && !self.at_end() {
                if !entries.is_empty() && !self.expect_op(Op::Comma) {
                    return None;
                }
                let key = self.parse_expression(BP_LOWEST)?;
                if !self.expect_op(Op::Colon) {
                    return None;
                }
                let value = self.parse_expression(BP_LOWEST)?;
                entries.push((key, value));
            }
            if !self.expect_op(Op::RBrace) {
                return None;
            }
            Some(Expr::MapLit(entries, span))
        }
    }

    /// One-token lookahead: is the brace ahead opening struct-literal
    /// fields (`{ ident :`) rather than a map literal or block?
    pub(crate) fn struct_fields_ahead(&self) -> bool {
        debug_assert!(self.at_op(Op::LBrace));
        match (
            self.peek_nth(1).map(|t| &t.kind),
            self.peek_nth(2).map(|t| &t.kind),
        ) {
            (Some(TokenKind::Identifier(_)), Some(TokenKind::Operator(Op::Colon))) => true,
            _ => false,
        }
    }

    /// `TypeName { field: expr, ... }`
    fn parse_struct_literal(
        &mut self,
        name: String,
        span: crate::util::span::Span,
    ) -> Option<Expr> {
        self.bump(); // consume '{'
        let mut fields = Vec::new();
        while !self.at_op(Op::RBrace) && !self.at_end() {
            if !fields.is_empty() && !self.expect_op(Op::Comma) {
                return None;
            }
            let field = self.expect_ident()?;
            if !self.expect_op(Op::Colon) {
                return None;
            }
            let value = self.parse_expression(BP_LOWEST)?;
            fields.push((field, value));
        }
        if !self.expect_op(Op::RBrace) {
            return None;
        }
        Some(Expr::StructLit { name, fields, span })
    }

    /// `new Type<...>(args)`
    fn parse_new(&mut self, span: crate::util::span::Span) -> Option<Expr> {
        let type_name = match self.current().map(|t| &t.kind) {
            Some(TokenKind::Identifier(n)) => {
                let n = n.clone();
                self.bump();
                n
            }
            _ => {
                self.error_expected("type name after 'new'".to_string());
                return None;
            }
        };

        let type_args = if self.at_op(Op::Lt) && self.generic_args_ahead() {
            self.parse_type_args()
        } else {
            Vec::new()
        };

        if !self.expect_op(Op::LParen) {
            return None;
        }
        let mut args = Vec::new();
        while !self.at_op(Op::RParen) && !self.at_end() {
            if !args.is_empty() && !self.expect_op(Op::Comma) {
                return None;
            }
            args.push(self.parse_expression(BP_LOWEST)?);
        }
        if !self.expect_op(Op::RParen) {
            return None;
        }

        Some(Expr::New {
            type_name,
            type_args,
            args,
            span,
        })
    }

    /// Shared tail for the ternary: `<cond> ? then : else` where the
    /// `?` was already consumed (either as an operator or absorbed into
    /// the condition's lexeme).
    pub(crate) fn parse_ternary_rest(
        &mut self,
        cond: Expr,
        span: crate::util::span::Span,
    ) -> Option<Expr> {
        let then_expr = self.parse_expression(BP_LOWEST)?;
        if !self.expect_op(Op::Colon) {
            return None;
        }
        let else_expr = self.parse_expression(BP_TERNARY)?;
        Some(Expr::Ternary {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
            span,
        })
    }
}
