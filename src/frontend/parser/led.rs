//! Infix expression parsing (led - left denotation)

use super::super::lexer::tokens::{Op, TokenKind};
use super::ast::{AssignOp, BinOp, Expr};
use super::state::*;

/// Bound for speculative token scans (generic arguments, method
/// detection). Anything longer is treated as not-a-generic.
pub(crate) const GENERIC_SCAN_LIMIT: usize = 64;

impl<'a> ParserState<'a> {
    /// Infix binding powers and parser for the current token.
    ///
    /// Returns `(left_bp, right_bp, f)`; left-associative operators use
    /// `right_bp = left_bp + 1`, right-associative ones reuse
    /// `left_bp`.
    #[allow(clippy::type_complexity)]
    pub(crate) fn infix_info(
        &self,
    ) -> Option<(u8, u8, fn(&mut Self, Expr, u8) -> Option<Expr>)> {
        let op = match self.current().map(|t| &t.kind) {
            Some(TokenKind::Operator(op)) => *op,
            _ => return None,
        };
        let info: (u8, u8, fn(&mut Self, Expr, u8) -> Option<Expr>) = match op {
            Op::Question => (BP_TERNARY, BP_TERNARY, Self::parse_ternary_op),
            Op::Eq | Op::PlusEq | Op::MinusEq | Op::StarEq | Op::SlashEq => {
                (BP_ASSIGN, BP_ASSIGN, Self::parse_assign)
            }
            Op::OrOr => (BP_OR, BP_OR + 1, Self::parse_binary),
            Op::AndAnd => (BP_AND, BP_AND + 1, Self::parse_binary),
            Op::EqEq | Op::Neq => (BP_EQ, BP_EQ + 1, Self::parse_binary),
            Op::Lt => {
                if self.generic_call_ahead() {
                    (BP_CALL, BP_CALL + 1, Self::parse_specialize)
                } else {
                    (BP_CMP, BP_CMP + 1, Self::parse_binary)
                }
            }
            Op::Le | Op::Gt | Op::Ge => (BP_CMP, BP_CMP + 1, Self::parse_binary),
            Op::Plus | Op::Minus => (BP_ADD, BP_ADD + 1, Self::parse_binary),
            Op::Star | Op::Slash | Op::Percent => (BP_MUL, BP_MUL + 1, Self::parse_binary),
            Op::LParen => (BP_CALL, BP_CALL + 1, Self::parse_call),
            Op::Dot => (BP_CALL, BP_CALL + 1, Self::parse_member),
            Op::LBracket => (BP_CALL, BP_CALL + 1, Self::parse_index),
            Op::PlusPlus | Op::MinusMinus => (BP_POSTFIX, BP_POSTFIX + 1, Self::parse_postfix),
            _ => return None,
        };
        Some(info)
    }

    /// Binary operator expression
    fn parse_binary(&mut self, lhs: Expr, right_bp: u8) -> Option<Expr> {
        let span = self.span();
        let op = match self.current().map(|t| &t.kind) {
            Some(TokenKind::Operator(Op::Plus)) => BinOp::Add,
            Some(TokenKind::Operator(Op::Minus)) => BinOp::Sub,
            Some(TokenKind::Operator(Op::Star)) => BinOp::Mul,
            Some(TokenKind::Operator(Op::Slash)) => BinOp::Div,
            Some(TokenKind::Operator(Op::Percent)) => BinOp::Mod,
            Some(TokenKind::Operator(Op::EqEq)) => BinOp::Eq,
            Some(TokenKind::Operator(Op::Neq)) => BinOp::Ne,
            Some(TokenKind::Operator(Op::Lt)) => BinOp::Lt,
            Some(TokenKind::Operator(Op::Le)) => BinOp::Le,
            Some(TokenKind::Operator(Op::Gt)) => BinOp::Gt,
            Some(TokenKind::Operator(Op::Ge)) => BinOp::Ge,
            Some(TokenKind::Operator(Op::AndAnd)) => BinOp::And,
            Some(TokenKind::Operator(Op::OrOr)) => BinOp::Or,
            _ => {
                let pos = self.span().start;
                self.error(super::ParseError::InvalidExpression {
                    line: pos.line,
                    column: pos.column,
                });
                return None;
            }
        };
        self.bump();
        let rhs = self.parse_expression(right_bp)?;
        Some(Expr::Binary {
            op,
            left: Box::new(lhs),
            right: Box::new(rhs),
            span,
        })
    }

    /// Assignment; the l-value rule is enforced by the checker so a
    /// bad target still parses and gets a semantic error.
    fn parse_assign(&mut self, lhs: Expr, right_bp: u8) -> Option<Expr> {
        let span = self.span();
        let op = match self.current().map(|t| &t.kind) {
            Some(TokenKind::Operator(Op::Eq)) => AssignOp::Assign,
            Some(TokenKind::Operator(Op::PlusEq)) => AssignOp::AddAssign,
            Some(TokenKind::Operator(Op::MinusEq)) => AssignOp::SubAssign,
            Some(TokenKind::Operator(Op::StarEq)) => AssignOp::MulAssign,
            Some(TokenKind::Operator(Op::SlashEq)) => AssignOp::DivAssign,
            _ => return None,
        };
        self.bump();
        let value = self.parse_expression(right_bp)?;
        Some(Expr::Assign {
            op,
            target: Box::new(lhs),
            value: Box::new(value),
            span,
        })
    }

    /// `cond ? then : else` with a standalone `?` operator
    fn parse_ternary_op(&mut self, lhs: Expr, _right_bp: u8) -> Option<Expr> {
        let span = self.span();
        self.bump(); // consume '?'
        self.parse_ternary_rest(lhs, span)
    }

    /// Call argument list
    fn parse_call(&mut self, lhs: Expr, _right_bp: u8) -> Option<Expr> {
        let span = self.span();
        self.bump(); // consume '('
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
        Some(Expr::Call {
            callee: Box::new(lhs),
            args,
            span,
        })
    }

    /// Member access
    fn parse_member(&mut self, lhs: Expr, _right_bp: u8) -> Option<Expr> {
        let span = self.span();
        self.bump(); // consume '.'
        let name = self.expect_ident()?;
        Some(Expr::Member {
            object: Box::new(lhs),
            name,
            span,
        })
    }

    /// Index access
    fn parse_index(&mut self, lhs: Expr, _right_bp: u8) -> Option<Expr> {
        let span = self.span();
        self.bump(); // consume '['
        let index = self.parse_expression(BP_LOWEST)?;
        if !self.expect_op(Op::RBracket) {
            return None;
        }
        Some(Expr::Index {
            object: Box::new(lhs),
            index: Box::new(index),
            span,
        })
    }

    /// Postfix `++` / `--`
    fn parse_postfix(&mut self, lhs: Expr, _right_bp: u8) -> Option<Expr> {
        let span = self.span();
        let op = match self.current().map(|t| &t.kind) {
            Some(TokenKind::Operator(Op::PlusPlus)) => super::ast::UnOp::Inc,
            Some(TokenKind::Operator(Op::MinusMinus)) => super::ast::UnOp::Dec,
            _ => return None,
        };
        self.bump();
        Some(Expr::Unary {
            op,
            expr: Box::new(lhs),
            postfix: true,
            span,
        })
    }

    /// `callee<T, ...>` — only reached when the speculative scan saw a
    /// matching `>` directly followed by `(`; the call itself is picked
    /// up by the next loop iteration.
    fn parse_specialize(&mut self, lhs: Expr, _right_bp: u8) -> Option<Expr> {
        let span = self.span();
        let type_args = self.parse_type_args();
        Some(Expr::Specialize {
            callee: Box::new(lhs),
            type_args,
            span,
        })
    }

    /// Speculative scan for generic specialization at a `<` in
    /// expression position: consume only type-shaped tokens and commas
    /// up to the matching `>`, and require the very next token to be
    /// `(`. Consumes nothing.
    pub(crate) fn generic_call_ahead(&self) -> bool {
        if !self.at_op(Op::Lt) {
            return false;
        }
        let mut depth = 0usize;
        for i in 0..GENERIC_SCAN_LIMIT {
            let Some(token) = self.peek_nth(i) else {
                return false;
            };
            match &token.kind {
                TokenKind::Operator(Op::Lt) => depth += 1,
                TokenKind::Operator(Op::Gt) => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            self.peek_nth(i + 1).map(|t| &t.kind),
                            Some(TokenKind::Operator(Op::LParen))
                        );
                    }
                }
                TokenKind::Operator(Op::Comma)
                | TokenKind::Operator(Op::Question)
                | TokenKind::Operator(Op::Star)
                | TokenKind::Operator(Op::LBracket)
                | TokenKind::Operator(Op::RBracket)
                | TokenKind::GenericParam(_)
                | TokenKind::Identifier(_) => {}
                TokenKind::Keyword(kw) if kw.is_primitive() => {}
                _ => return false,
            }
        }
        false
    }
}
