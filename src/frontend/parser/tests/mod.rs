//! Parser unit tests

use crate::frontend::lexer::tokenize;
use crate::frontend::parser::ast::*;
use crate::frontend::parser::{parse, parse_expression, ParseError};

fn parse_source(source: &str) -> (Program, Vec<ParseError>) {
    parse(&tokenize(source))
}

fn parse_ok(source: &str) -> Program {
    let (program, errors) = parse_source(source);
    assert!(errors.is_empty(), "unexpected errors for {source:?}: {errors:?}");
    program
}

fn expr_of(source: &str) -> Expr {
    parse_expression(&tokenize(source)).expect("expression should parse")
}

mod statements {
    use super::*;

    #[test]
    fn test_typed_var_decl() {
        let program = parse_ok("int a = 1 + 2");
        assert_eq!(program.body.len(), 1);
        let StmtKind::Var { name, ty, init, is_const, .. } = &program.body[0].kind else {
            panic!("expected var decl");
        };
        assert_eq!(name, "a");
        assert_eq!(ty.as_ref().unwrap().to_string(), "int");
        assert!(init.is_some());
        assert!(!is_const);
    }

    #[test]
    fn test_inferred_var_and_const() {
        let program = parse_ok("var s = \"hi\"; const limit = 10");
        assert_eq!(program.body.len(), 2);
        let StmtKind::Var { ty, .. } = &program.body[0].kind else {
            panic!("expected var");
        };
        assert!(ty.is_none());
        let StmtKind::Var { is_const, .. } = &program.body[1].kind else {
            panic!("expected const");
        };
        assert!(is_const);
    }

    #[test]
    fn test_semicolons_are_optional() {
        let with = parse_ok("int a = 1; print(a);");
        let without = parse_ok("int a = 1 print(a)");
        assert_eq!(with.body.len(), without.body.len());
    }

    #[test]
    fn test_stray_semicolons_skipped() {
        let program = parse_ok(";;; int a = 1 ;;");
        assert_eq!(program.body.len(), 1);
    }

    #[test]
    fn test_if_else_chain() {
        let program = parse_ok(
            "if (a > 0) { print(1) } else if (a < 0) { print(2) } else { print(3) }",
        );
        let StmtKind::If { else_branch, .. } = &program.body[0].kind else {
            panic!("expected if");
        };
        let else_stmt = else_branch.as_ref().expect("else branch");
        assert!(matches!(else_stmt.kind, StmtKind::If { .. }));
    }

    #[test]
    fn test_while_and_do_while() {
        let program = parse_ok("while (x < 3) { x = x + 1 } do { x-- } while (x > 0)");
        assert!(matches!(program.body[0].kind, StmtKind::While { .. }));
        assert!(matches!(program.body[1].kind, StmtKind::DoWhile { .. }));
    }

    #[test]
    fn test_c_style_for() {
        let program = parse_ok("for (int i = 0; i < 3; i++) { print(i) }");
        let StmtKind::For { init, cond, post, .. } = &program.body[0].kind else {
            panic!("expected for");
        };
        assert!(init.is_some());
        assert!(cond.is_some());
        assert!(post.is_some());
    }

    #[test]
    fn test_for_with_empty_parts() {
        let program = parse_ok("for (;;) { break }");
        let StmtKind::For { init, cond, post, .. } = &program.body[0].kind else {
            panic!("expected for");
        };
        assert!(init.is_none());
        assert!(cond.is_none());
        assert!(post.is_none());
    }

    #[test]
    fn test_for_in_single() {
        let program = parse_ok("for (item in xs) { print(item) }");
        let StmtKind::ForIn { index, item, .. } = &program.body[0].kind else {
            panic!("expected for-in");
        };
        assert!(index.is_none());
        assert_eq!(item, "item");
    }

    #[test]
    fn test_for_in_indexed() {
        let program = parse_ok("for (i, item in xs) { print(i, item) }");
        let StmtKind::ForIn { index, item, .. } = &program.body[0].kind else {
            panic!("expected for-in");
        };
        assert_eq!(index.as_deref(), Some("i"));
        assert_eq!(item, "item");
    }

    #[test]
    fn test_switch() {
        let program = parse_ok(
            "switch (day) { case 1: print(\"mon\") case 2: print(\"tue\") default: print(\"other\") }",
        );
        let StmtKind::Switch { cases, default, .. } = &program.body[0].kind else {
            panic!("expected switch");
        };
        assert_eq!(cases.len(), 2);
        assert!(default.is_some());
    }

    #[test]
    fn test_function_decl() {
        let program = parse_ok("int function add(int a, int b) { return a + b }");
        let StmtKind::Function(decl) = &program.body[0].kind else {
            panic!("expected function");
        };
        assert_eq!(decl.name, "add");
        assert_eq!(decl.params.len(), 2);
        assert_eq!(decl.ret.to_string(), "int");
        assert!(decl.generics.is_empty());
    }

    #[test]
    fn test_generic_function_header() {
        let program = parse_ok("<T, U> T function pick(T a, U b) { return a }");
        let StmtKind::Function(decl) = &program.body[0].kind else {
            panic!("expected function");
        };
        assert_eq!(decl.generics, vec!["T".to_string(), "U".to_string()]);
    }

    #[test]
    fn test_generic_keyword_prefix() {
        let program = parse_ok("generic<T> struct Box { T value }");
        let StmtKind::Struct(decl) = &program.body[0].kind else {
            panic!("expected struct");
        };
        assert_eq!(decl.generics, vec!["T".to_string()]);
        assert_eq!(decl.fields.len(), 1);
    }

    #[test]
    fn test_struct_decl() {
        let program = parse_ok("struct Point { int x int y }");
        let StmtKind::Struct(decl) = &program.body[0].kind else {
            panic!("expected struct");
        };
        assert_eq!(decl.name, "Point");
        assert_eq!(decl.fields.len(), 2);
        assert_eq!(decl.fields[0].name, "x");
    }

    #[test]
    fn test_impl_block() {
        let program = parse_ok(
            "implement Point { init(int x) { self.x = x } int norm() { return self.x } }",
        );
        let StmtKind::Impl(decl) = &program.body[0].kind else {
            panic!("expected impl");
        };
        assert_eq!(decl.target, "Point");
        assert_eq!(decl.methods.len(), 2);
        assert_eq!(decl.methods[0].name, "init");
        assert_eq!(decl.methods[1].name, "norm");
    }

    #[test]
    fn test_type_alias() {
        let program = parse_ok("type Id = int");
        let StmtKind::TypeAlias { name, ty } = &program.body[0].kind else {
            panic!("expected alias");
        };
        assert_eq!(name, "Id");
        assert_eq!(ty.to_string(), "int");
    }

    #[test]
    fn test_user_type_prefixed_decl() {
        let program = parse_ok("type Id = int Id user = 42");
        assert_eq!(program.body.len(), 2);
        let StmtKind::Var { ty, .. } = &program.body[1].kind else {
            panic!("expected var decl");
        };
        assert_eq!(ty.as_ref().unwrap().to_string(), "Id");
    }

    #[test]
    fn test_block_statement() {
        let program = parse_ok("{ int a = 1 print(a) }");
        assert!(matches!(program.body[0].kind, StmtKind::Block(_)));
    }
}

mod types {
    use super::*;

    fn declared_type(source: &str) -> String {
        let program = parse_ok(source);
        let StmtKind::Var { ty, .. } = &program.body[0].kind else {
            panic!("expected var decl");
        };
        ty.as_ref().unwrap().to_string()
    }

    #[test]
    fn test_nullable_via_absorbed_question() {
        assert_eq!(declared_type("int? n = null"), "int?");
    }

    #[test]
    fn test_pointer() {
        assert_eq!(declared_type("int* p = null"), "int*");
    }

    #[test]
    fn test_arrays() {
        assert_eq!(declared_type("int[] xs = [1]"), "int[]");
        assert_eq!(declared_type("int[3] buf = [0, 0, 0]"), "int[]");
    }

    #[test]
    fn test_union_flattens() {
        assert_eq!(declared_type("int | string | bool u = 1"), "int|string|bool");
    }

    #[test]
    fn test_set_and_map() {
        assert_eq!(declared_type("set<int> s = set<int>{1}"), "set<int>");
        assert_eq!(
            declared_type("map<string, int> m = map<string, int>{}"),
            "map<string,int>"
        );
    }

    #[test]
    fn test_stacked_modifiers() {
        // Modifiers wrap left to right: a nullable, then pointer, then
        // array of it.
        assert_eq!(declared_type("int?*[] xs = []"), "int?*[]");
    }
}

mod expressions {
    use super::*;

    #[test]
    fn test_precedence_mul_over_add() {
        let expr = expr_of("1 + 2 * 3");
        let Expr::Binary { op: BinOp::Add, right, .. } = expr else {
            panic!("expected top-level add");
        };
        assert!(matches!(*right, Expr::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn test_comparison_below_logic() {
        let expr = expr_of("a < b && c > d");
        let Expr::Binary { op: BinOp::And, .. } = expr else {
            panic!("expected && at top, got {expr:?}");
        };
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let expr = expr_of("a = b = 1");
        let Expr::Assign { value, .. } = expr else {
            panic!("expected assignment");
        };
        assert!(matches!(*value, Expr::Assign { .. }));
    }

    #[test]
    fn test_compound_assignment() {
        let expr = expr_of("a += 2");
        assert!(matches!(
            expr,
            Expr::Assign {
                op: AssignOp::AddAssign,
                ..
            }
        ));
    }

    #[test]
    fn test_ternary_with_parenthesized_condition() {
        let expr = expr_of("(a > b) ? 1 : 2");
        assert!(matches!(expr, Expr::Ternary { .. }));
    }

    #[test]
    fn test_ternary_with_absorbed_question() {
        // The scanner glues `a?` into one token; the parser re-expands
        // it into a ternary.
        let expr = expr_of("a? 1 : 2");
        let Expr::Ternary { cond, .. } = expr else {
            panic!("expected ternary");
        };
        assert!(matches!(*cond, Expr::Ident(ref n, _) if n == "a"));
    }

    #[test]
    fn test_prefix_and_postfix() {
        assert!(matches!(
            expr_of("-x"),
            Expr::Unary {
                op: UnOp::Neg,
                postfix: false,
                ..
            }
        ));
        assert!(matches!(
            expr_of("x++"),
            Expr::Unary {
                op: UnOp::Inc,
                postfix: true,
                ..
            }
        ));
        assert!(matches!(
            expr_of("--x"),
            Expr::Unary {
                op: UnOp::Dec,
                postfix: false,
                ..
            }
        ));
    }

    #[test]
    fn test_reference() {
        assert!(matches!(expr_of("&x"), Expr::Reference(..)));
    }

    #[test]
    fn test_call_member_index_chain() {
        let expr = expr_of("a.b[0](1)");
        let Expr::Call { callee, args, .. } = expr else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 1);
        assert!(matches!(*callee, Expr::Index { .. }));
    }

    #[test]
    fn test_array_literal() {
        let Expr::ArrayLit(elems, _) = expr_of("[1, 2, 3]") else {
            panic!("expected array literal");
        };
        assert_eq!(elems.len(), 3);
    }

    #[test]
    fn test_map_literal() {
        let Expr::MapLit(entries, _) = expr_of("{1: 2, 3: 4}") else {
            panic!("expected map literal");
        };
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_struct_literal_lookahead() {
        // `IDENT :` inside the brace selects a struct literal.
        let expr = expr_of("Point { x: 1, y: 2 }");
        let Expr::StructLit { name, fields, .. } = expr else {
            panic!("expected struct literal");
        };
        assert_eq!(name, "Point");
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_set_constructor_literal() {
        let Expr::SetLit(elems, _) = expr_of("set<int>{1, 2}") else {
            panic!("expected set literal");
        };
        assert_eq!(elems.len(), 2);
    }

    #[test]
    fn test_map_constructor_literal() {
        let Expr::MapLit(entries, _) = expr_of("map<string, int>{\"a\": 1}") else {
            panic!("expected map literal");
        };
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_new_expression() {
        let Expr::New { type_name, type_args, args, .. } = expr_of("new Box<int>(3)") else {
            panic!("expected new");
        };
        assert_eq!(type_name, "Box");
        assert_eq!(type_args.len(), 1);
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_generic_call_specialization() {
        let Expr::Call { callee, .. } = expr_of("id<int>(3)") else {
            panic!("expected call");
        };
        assert!(matches!(*callee, Expr::Specialize { .. }));
    }

    #[test]
    fn test_less_than_stays_comparison() {
        let expr = expr_of("a < b");
        assert!(matches!(expr, Expr::Binary { op: BinOp::Lt, .. }));
    }

    #[test]
    fn test_utility_keyword_call() {
        let Expr::Call { callee, .. } = expr_of("length(xs)") else {
            panic!("expected call");
        };
        assert!(matches!(*callee, Expr::Ident(ref n, _) if n == "length"));
    }

    #[test]
    fn test_self_member() {
        let expr = expr_of("self.x");
        let Expr::Member { object, .. } = expr else {
            panic!("expected member");
        };
        assert!(matches!(*object, Expr::SelfValue(_)));
    }
}

mod recovery {
    use super::*;

    #[test]
    fn test_partial_program_with_errors() {
        let (program, errors) = parse_source("int = 3; print(1)");
        assert!(!errors.is_empty());
        // Recovery resumes and still parses the later statement.
        assert!(!program.body.is_empty());
    }

    #[test]
    fn test_error_message_format() {
        let (_, errors) = parse_source("if (x { }");
        assert!(!errors.is_empty());
        let text = errors[0].to_string();
        assert!(text.contains("expected"), "got: {text}");
        assert!(text.contains("at 1:"), "got: {text}");
    }

    #[test]
    fn test_lexical_error_surfaces_as_parse_error() {
        let (_, errors) = parse_source("int a = 1 @ int b = 2");
        assert!(errors
            .iter()
            .any(|e| matches!(e, ParseError::Lexical { .. })));
    }

    #[test]
    fn test_totality_on_garbage() {
        for source in ["@@@@", "((((", "} } }", "case default:", "\"unterminated"] {
            let (_, errors) = parse_source(source);
            assert!(!errors.is_empty(), "expected errors for {source:?}");
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Totality: any input yields a program plus an error list,
            // never a panic.
            #[test]
            fn parser_never_panics(src in "[ -~\\n]{0,200}") {
                let _ = parse_source(&src);
            }
        }
    }
}
