//! Pratt expression loop

use super::ast::Expr;
use super::state::ParserState;

impl<'a> ParserState<'a> {
    /// Parse an expression with the given minimum binding power.
    ///
    /// 1. Parse a prefix form (nud).
    /// 2. While the next token is an infix operator binding at least as
    ///    tightly as `min_bp`, hand the left-hand side to its led
    ///    function; each led parses its right side with the binding
    ///    power that encodes associativity.
    pub fn parse_expression(&mut self, min_bp: u8) -> Option<Expr> {
        let prefix_fn = match self.prefix_info() {
            Some(f) => f,
            None => {
                let pos = self.span().start;
                self.error(super::ParseError::InvalidExpression {
                    line: pos.line,
                    column: pos.column,
                });
                return None;
            }
        };

        let mut lhs = prefix_fn(self)?;

        loop {
            if self.at_end() {
                break;
            }
            let (left_bp, right_bp, infix_fn) = match self.infix_info() {
                Some(info) => info,
                None => break,
            };
            if left_bp < min_bp {
                break;
            }
            lhs = infix_fn(self, lhs, right_bp)?;
        }

        Some(lhs)
    }
}
