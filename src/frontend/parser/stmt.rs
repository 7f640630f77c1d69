//! Statement parsing

use super::super::lexer::tokens::{Keyword, Op, TokenKind};
use super::ast::*;
use super::state::*;
use crate::util::span::Span;

impl<'a> ParserState<'a> {
    /// Parse a statement. Dispatch order matters: declaration keywords
    /// first, then the generic function header, then type-prefixed
    /// forms, then plain expressions.
    pub fn parse_stmt(&mut self) -> Option<Stmt> {
        let span = self.span();

        // User types (aliases, structs, set/map applications) prefix
        // declarations just like the primitive keywords: `Id user =
        // 42`. Deciding needs mutable speculation, so it happens
        // before the keyword dispatch.
        if matches!(
            self.current().map(|t| &t.kind),
            Some(TokenKind::Identifier(_))
        ) {
            if self.function_keyword_after_type() {
                return self.parse_function_decl(span, Vec::new());
            }
            if self.user_type_decl_ahead() {
                return self.parse_typed_var(span);
            }
        }

        match self.current().map(|t| &t.kind) {
            Some(TokenKind::Keyword(Keyword::Var)) => self.parse_inferred_var(span, false),
            Some(TokenKind::Keyword(Keyword::Const)) => self.parse_inferred_var(span, true),
            Some(TokenKind::Keyword(Keyword::Struct)) => self.parse_struct_decl(span, Vec::new()),
            Some(TokenKind::Keyword(Keyword::Type)) => self.parse_type_alias(span),
            Some(TokenKind::Keyword(Keyword::Implement)) => self.parse_impl(span),
            Some(TokenKind::Keyword(Keyword::Generic)) => self.parse_generic_prefixed(span),
            Some(TokenKind::Keyword(Keyword::If)) => self.parse_if(span),
            Some(TokenKind::Keyword(Keyword::While)) => self.parse_while(span),
            Some(TokenKind::Keyword(Keyword::Do)) => self.parse_do_while(span),
            Some(TokenKind::Keyword(Keyword::For)) => self.parse_for(span),
            Some(TokenKind::Keyword(Keyword::Switch)) => self.parse_switch(span),
            Some(TokenKind::Keyword(Keyword::Return)) => self.parse_return(span),
            Some(TokenKind::Keyword(Keyword::Break)) => {
                self.bump();
                self.skip_op(Op::Semicolon);
                Some(Stmt {
                    kind: StmtKind::Break,
                    span,
                })
            }
            Some(TokenKind::Keyword(Keyword::Continue)) => {
                self.bump();
                self.skip_op(Op::Semicolon);
                Some(Stmt {
                    kind: StmtKind::Continue,
                    span,
                })
            }
            // `<T, U> RetType function name(...)`
            Some(TokenKind::Operator(Op::Lt)) => {
                let generics = self.parse_generic_params();
                self.parse_function_decl(span, generics)
            }
            Some(TokenKind::Operator(Op::LBrace)) => {
                let block = self.parse_block()?;
                Some(Stmt {
                    kind: StmtKind::Block(block),
                    span,
                })
            }
            Some(TokenKind::Keyword(kw)) if kw.is_primitive() => {
                if self.function_keyword_after_type() {
                    self.parse_function_decl(span, Vec::new())
                } else {
                    self.parse_typed_var(span)
                }
            }
            Some(_) => self.parse_expr_stmt(span),
            None => None,
        }
    }

    /// `var name [= expr]` / `const name [= expr]`
    fn parse_inferred_var(&mut self, span: Span, is_const: bool) -> Option<Stmt> {
        self.bump(); // consume 'var' / 'const'
        let name = self.expect_ident()?;
        let init = if self.skip_op(Op::Eq) {
            Some(Box::new(self.parse_expression(BP_LOWEST)?))
        } else {
            None
        };
        self.skip_op(Op::Semicolon);
        Some(Stmt {
            kind: StmtKind::Var {
                name,
                ty: None,
                init,
                is_const,
                resolved: None,
            },
            span,
        })
    }

    /// `Type name [= expr]`
    fn parse_typed_var(&mut self, span: Span) -> Option<Stmt> {
        let ty = self.parse_type()?;
        let name = self.expect_ident()?;
        let init = if self.skip_op(Op::Eq) {
            Some(Box::new(self.parse_expression(BP_LOWEST)?))
        } else {
            None
        };
        self.skip_op(Op::Semicolon);
        Some(Stmt {
            kind: StmtKind::Var {
                name,
                ty: Some(ty),
                init,
                is_const: false,
                resolved: None,
            },
            span,
        })
    }

    /// `RetType function name(Type param, ...) { ... }`
    fn parse_function_decl(&mut self, span: Span, generics: Vec<String>) -> Option<Stmt> {
        let ret = self.parse_type()?;
        if !self.expect_kw(Keyword::Function) {
            return None;
        }
        let name = self.expect_ident()?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Some(Stmt {
            kind: StmtKind::Function(FunctionDecl {
                name,
                generics,
                params,
                ret,
                body,
                span,
            }),
            span,
        })
    }

    /// Parenthesized `Type name` parameter list
    fn parse_params(&mut self) -> Option<Vec<Param>> {
        if !self.expect_op(Op::LParen) {
            return None;
        }
        let mut params = Vec::new();
        while !self.at_op(Op::RParen) && !self.at_end() {
            if !params.is_empty() && !self.expect_op(Op::Comma) {
                return None;
            }
            let param_span = self.span();
            let ty = self.parse_type()?;
            let name = self.expect_ident()?;
            params.push(Param {
                name,
                ty,
                span: param_span,
            });
        }
        if !self.expect_op(Op::RParen) {
            return None;
        }
        Some(params)
    }

    /// Control-flow body: a braced block, or a single statement
    /// wrapped into one
    fn parse_body(&mut self) -> Option<Block> {
        if self.at_op(Op::LBrace) {
            return self.parse_block();
        }
        let span = self.span();
        let stmt = self.parse_stmt()?;
        Some(Block {
            stmts: vec![stmt],
            span,
        })
    }

    /// Braced statement list
    pub(crate) fn parse_block(&mut self) -> Option<Block> {
        let span = self.span();
        if !self.expect_op(Op::LBrace) {
            return None;
        }
        let mut stmts = Vec::new();
        while !self.at_op(Op::RBrace) && !self.at_end() {
            if self.skip_op(Op::Semicolon) {
                continue;
            }
            if matches!(self.current().map(|t| &t.kind), Some(TokenKind::Error(_))) {
                self.consume_error_token();
                continue;
            }
            let before = self.mark();
            match self.parse_stmt() {
                Some(stmt) => {
                    stmts.push(stmt);
                    if self.mark() == before {
                        self.synchronize();
                    }
                }
                None => self.synchronize(),
            }
        }
        if !self.expect_op(Op::RBrace) {
            return None;
        }
        Some(Block { stmts, span })
    }

    /// `if (cond) { } [else if ... | else { }]`
    fn parse_if(&mut self, span: Span) -> Option<Stmt> {
        self.bump(); // consume 'if'
        if !self.expect_op(Op::LParen) {
            return None;
        }
        let cond = self.parse_expression(BP_LOWEST)?;
        if !self.expect_op(Op::RParen) {
            return None;
        }
        let then_block = self.parse_body()?;

        let else_branch = if self.skip_kw(Keyword::Else) {
            let else_span = self.span();
            if self.at_kw(Keyword::If) {
                Some(Box::new(self.parse_if(else_span)?))
            } else {
                let block = self.parse_body()?;
                Some(Box::new(Stmt {
                    kind: StmtKind::Block(block),
                    span: else_span,
                }))
            }
        } else {
            None
        };

        Some(Stmt {
            kind: StmtKind::If {
                cond: Box::new(cond),
                then_block,
                else_branch,
            },
            span,
        })
    }

    /// `while (cond) { }`
    fn parse_while(&mut self, span: Span) -> Option<Stmt> {
        self.bump(); // consume 'while'
        if !self.expect_op(Op::LParen) {
            return None;
        }
        let cond = self.parse_expression(BP_LOWEST)?;
        if !self.expect_op(Op::RParen) {
            return None;
        }
        let body = self.parse_body()?;
        Some(Stmt {
            kind: StmtKind::While {
                cond: Box::new(cond),
                body,
            },
            span,
        })
    }

    /// `do { } while (cond)`
    fn parse_do_while(&mut self, span: Span) -> Option<Stmt> {
        self.bump(); // consume 'do'
        let body = self.parse_body()?;
        if !self.expect_kw(Keyword::While) {
            return None;
        }
        if !self.expect_op(Op::LParen) {
            return None;
        }
        let cond = self.parse_expression(BP_LOWEST)?;
        if !self.expect_op(Op::RParen) {
            return None;
        }
        self.skip_op(Op::Semicolon);
        Some(Stmt {
            kind: StmtKind::DoWhile {
                body,
                cond: Box::new(cond),
            },
            span,
        })
    }

    /// `for (init; cond; post) { }`, `for (item in expr) { }`, or
    /// `for (i, item in expr) { }`
    fn parse_for(&mut self, span: Span) -> Option<Stmt> {
        self.bump(); // consume 'for'
        if !self.expect_op(Op::LParen) {
            return None;
        }

        if let Some((index, item)) = self.for_in_head() {
            let iterable = self.parse_expression(BP_LOWEST)?;
            if !self.expect_op(Op::RParen) {
                return None;
            }
            let body = self.parse_body()?;
            return Some(Stmt {
                kind: StmtKind::ForIn {
                    index,
                    item,
                    iterable: Box::new(iterable),
                    body,
                },
                span,
            });
        }

        // C-style header; each part may be empty.
        let init = if self.at_op(Op::Semicolon) {
            self.bump();
            None
        } else {
            let init_span = self.span();
            let stmt = if self.at_kw(Keyword::Var) {
                self.parse_inferred_var(init_span, false)?
            } else if self.at_primitive() {
                self.parse_typed_var(init_span)?
            } else {
                self.parse_expr_stmt(init_span)?
            };
            // The var rules consume an optional ';' themselves.
            Some(Box::new(stmt))
        };

        let cond = if self.at_op(Op::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expression(BP_LOWEST)?))
        };
        self.skip_op(Op::Semicolon);

        let post = if self.at_op(Op::RParen) {
            None
        } else {
            Some(Box::new(self.parse_expression(BP_LOWEST)?))
        };
        if !self.expect_op(Op::RParen) {
            return None;
        }
        let body = self.parse_body()?;
        Some(Stmt {
            kind: StmtKind::For {
                init,
                cond,
                post,
                body,
            },
            span,
        })
    }

    /// Detect and consume a for-in head: `item in` or `i, item in`.
    /// Consumes nothing when the header is C-style.
    fn for_in_head(&mut self) -> Option<(Option<String>, String)> {
        let first = match self.current().map(|t| &t.kind) {
            Some(TokenKind::Identifier(n)) => n.clone(),
            _ => return None,
        };
        match self.next().map(|t| &t.kind) {
            Some(TokenKind::Keyword(Keyword::In)) => {
                self.bump();
                self.bump();
                Some((None, first))
            }
            Some(TokenKind::Operator(Op::Comma)) => {
                let item = match self.peek_nth(2).map(|t| &t.kind) {
                    Some(TokenKind::Identifier(n)) => n.clone(),
                    _ => return None,
                };
                if !matches!(
                    self.peek_nth(3).map(|t| &t.kind),
                    Some(TokenKind::Keyword(Keyword::In))
                ) {
                    return None;
                }
                self.bump();
                self.bump();
                self.bump();
                self.bump();
                Some((Some(first), item))
            }
            _ => None,
        }
    }

    /// `switch (disc) { case v: ... default: ... }`
    fn parse_switch(&mut self, span: Span) -> Option<Stmt> {
        self.bump(); // consume 'switch'
        if !self.expect_op(Op::LParen) {
            return None;
        }
        let disc = self.parse_expression(BP_LOWEST)?;
        if !self.expect_op(Op::RParen) {
            return None;
        }
        if !self.expect_op(Op::LBrace) {
            return None;
        }

        let mut cases = Vec::new();
        let mut default = None;
        while !self.at_op(Op::RBrace) && !self.at_end() {
            if self.skip_kw(Keyword::Case) {
                let case_span = self.span();
                let value = self.parse_expression(BP_LOWEST)?;
                if !self.expect_op(Op::Colon) {
                    return None;
                }
                let body = self.parse_case_body(case_span);
                cases.push(SwitchCase {
                    value,
                    body,
                    span: case_span,
                });
            } else if self.skip_kw(Keyword::Default) {
                let default_span = self.span();
                if !self.expect_op(Op::Colon) {
                    return None;
                }
                default = Some(self.parse_case_body(default_span));
            } else {
                self.error_expected("'case' or 'default'".to_string());
                self.synchronize();
            }
        }
        if !self.expect_op(Op::RBrace) {
            return None;
        }

        Some(Stmt {
            kind: StmtKind::Switch {
                disc: Box::new(disc),
                cases,
                default,
            },
            span,
        })
    }

    /// Case body: statements up to the next `case`, `default`, or `}`.
    /// Each body is its own scope; there is no fall-through.
    fn parse_case_body(&mut self, span: Span) -> Block {
        let mut stmts = Vec::new();
        while !self.at_op(Op::RBrace)
            && !self.at_kw(Keyword::Case)
            && !self.at_kw(Keyword::Default)
            && !self.at_end()
        {
            if self.skip_op(Op::Semicolon) {
                continue;
            }
            let before = self.mark();
            match self.parse_stmt() {
                Some(stmt) => {
                    stmts.push(stmt);
                    if self.mark() == before {
                        self.synchronize();
                    }
                }
                None => self.synchronize(),
            }
        }
        Block { stmts, span }
    }

    /// `return [expr]`
    fn parse_return(&mut self, span: Span) -> Option<Stmt> {
        self.bump(); // consume 'return'
        let value = if self.at_op(Op::Semicolon) || self.at_op(Op::RBrace) || self.at_end() {
            None
        } else {
            Some(Box::new(self.parse_expression(BP_LOWEST)?))
        };
        self.skip_op(Op::Semicolon);
        Some(Stmt {
            kind: StmtKind::Return(value),
            span,
        })
    }

    /// `struct Name { Type field ... }`
    fn parse_struct_decl(&mut self, span: Span, generics: Vec<String>) -> Option<Stmt> {
        self.bump(); // consume 'struct'
        let name = self.expect_ident()?;
        if !self.expect_op(Op::LBrace) {
            return None;
        }
        let mut fields = Vec::new();
        while !self.at_op(Op::RBrace) && !self.at_end() {
            if self.skip_op(Op::Semicolon) || self.skip_op(Op::Comma) {
                continue;
            }
            let field_span = self.span();
            let ty = self.parse_type()?;
            let field_name = self.expect_ident()?;
            fields.push(FieldDecl {
                name: field_name,
                ty,
                span: field_span,
            });
        }
        if !self.expect_op(Op::RBrace) {
            return None;
        }
        Some(Stmt {
            kind: StmtKind::Struct(StructDecl {
                name,
                generics,
                fields,
                span,
            }),
            span,
        })
    }

    /// `type Name = Type`
    fn parse_type_alias(&mut self, span: Span) -> Option<Stmt> {
        self.bump(); // consume 'type'
        let name = self.expect_ident()?;
        if !self.expect_op(Op::Eq) {
            return None;
        }
        let ty = self.parse_type()?;
        self.skip_op(Op::Semicolon);
        Some(Stmt {
            kind: StmtKind::TypeAlias { name, ty },
            span,
        })
    }

    /// `generic<T, U>` prefix on a struct or function declaration
    fn parse_generic_prefixed(&mut self, span: Span) -> Option<Stmt> {
        self.bump(); // consume 'generic'
        let generics = self.parse_generic_params();
        if self.at_kw(Keyword::Struct) {
            self.parse_struct_decl(span, generics)
        } else {
            self.parse_function_decl(span, generics)
        }
    }

    /// `implement TypeName { init(...) { } [methods] }`
    fn parse_impl(&mut self, span: Span) -> Option<Stmt> {
        self.bump(); // consume 'implement'
        let target = self.expect_ident()?;
        if !self.expect_op(Op::LBrace) {
            return None;
        }

        let mut methods = Vec::new();
        while !self.at_op(Op::RBrace) && !self.at_end() {
            if self.skip_op(Op::Semicolon) {
                continue;
            }
            let method_span = self.span();

            if self.skip_kw(Keyword::Init) {
                let params = self.parse_params()?;
                let body = self.parse_block()?;
                methods.push(MethodDecl {
                    name: "init".to_string(),
                    generics: Vec::new(),
                    params,
                    ret: Type::Primitive("void".to_string()),
                    body,
                    span: method_span,
                });
                continue;
            }

            // Method: optional <generics>, a return type with
            // modifiers, then `name(params) { ... }`.
            let generics = if self.at_op(Op::Lt) {
                self.parse_generic_params()
            } else {
                Vec::new()
            };
            let ret = self.parse_type()?;
            let name = self.expect_ident()?;
            let params = self.parse_params()?;
            let body = self.parse_block()?;
            methods.push(MethodDecl {
                name,
                generics,
                params,
                ret,
                body,
                span: method_span,
            });
        }
        if !self.expect_op(Op::RBrace) {
            return None;
        }

        Some(Stmt {
            kind: StmtKind::Impl(ImplDecl {
                target,
                methods,
                span,
            }),
            span,
        })
    }

    /// `Type name [= ...]` with a user-type head (`Id user = 42`,
    /// `set<int> s = ...`). Speculatively parses a type, then requires
    /// an identifier followed by `=`, `;`, `}` or end of input; the
    /// cursor and error list are restored either way.
    fn user_type_decl_ahead(&mut self) -> bool {
        if !matches!(
            self.current().map(|t| &t.kind),
            Some(TokenKind::Identifier(_))
        ) {
            return false;
        }
        let mark = self.mark();
        let errors = self.errors_len();
        let mut ok = self.parse_type().is_some()
            && matches!(self.current().map(|t| &t.kind), Some(TokenKind::Identifier(_)));
        if ok {
            ok = matches!(
                self.next().map(|t| &t.kind),
                None | Some(TokenKind::Eof)
                    | Some(TokenKind::Operator(Op::Eq))
                    | Some(TokenKind::Operator(Op::Semicolon))
                    | Some(TokenKind::Operator(Op::RBrace))
            );
        }
        self.rewind(mark);
        self.truncate_errors(errors);
        ok
    }

    /// Expression statement
    fn parse_expr_stmt(&mut self, span: Span) -> Option<Stmt> {
        let expr = self.parse_expression(BP_LOWEST)?;
        self.skip_op(Op::Semicolon);
        Some(Stmt {
            kind: StmtKind::Expr(Box::new(expr)),
            span,
        })
    }
}
