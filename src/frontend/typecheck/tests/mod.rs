//! Checker unit tests

use crate::frontend::lexer::tokenize;
use crate::frontend::parser::parse;
use crate::frontend::typecheck::{check_program, CheckResult, TypeError};

fn check_source(source: &str) -> CheckResult {
    let (mut program, parse_errors) = parse(&tokenize(source));
    assert!(
        parse_errors.is_empty(),
        "parse errors for {source:?}: {parse_errors:?}"
    );
    check_program(&mut program)
}

fn assert_clean(source: &str) {
    let result = check_source(source);
    assert!(
        result.errors.is_empty(),
        "unexpected errors for {source:?}: {:?}",
        result.errors
    );
}

fn first_error(source: &str) -> String {
    let result = check_source(source);
    assert!(
        !result.errors.is_empty(),
        "expected an error for {source:?}"
    );
    result.errors[0].to_string()
}

mod declarations {
    use super::*;

    #[test]
    fn test_typed_and_inferred() {
        assert_clean("int a = 1");
        assert_clean("var b = \"s\"");
        assert_clean("const c = true");
        assert_clean("float f = 1");
    }

    #[test]
    fn test_declared_type_mismatch() {
        let message = first_error("int a = \"x\"");
        assert!(message.contains("Cannot assign type 'string' to 'int'"));
    }

    #[test]
    fn test_int_does_not_accept_float() {
        let message = first_error("int a = 1.5");
        assert!(message.contains("Cannot assign type 'float' to 'int'"));
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        let message = first_error("var a = 1 var a = 2");
        assert!(message.contains("already declared"));
    }

    #[test]
    fn test_shadowing_in_inner_scope_is_allowed() {
        assert_clean("var a = 1 { var a = 2 print(a) } print(a)");
    }

    #[test]
    fn test_cannot_infer_without_initializer() {
        let message = first_error("var a");
        assert!(message.contains("Cannot infer"));
    }

    #[test]
    fn test_undeclared_identifier() {
        let message = first_error("print(zzz)");
        assert!(message.contains("Undeclared identifier 'zzz'"));
    }

    #[test]
    fn test_inferred_reassignment_mismatch() {
        // Spec scenario: inference fixes the type at the declaration.
        let message = first_error("var a = 1 a = \"x\"");
        assert!(message.contains("Cannot assign type 'string' to 'int'"));
    }

    #[test]
    fn test_assign_to_const() {
        let message = first_error("const c = 1 c = 2");
        assert!(message.contains("Cannot assign to constant 'c'"));
    }

    #[test]
    fn test_increment_const() {
        let message = first_error("const c = 1 c++");
        assert!(message.contains("Cannot assign to constant 'c'"));
    }

    #[test]
    fn test_type_alias_resolves() {
        assert_clean("type Id = int Id user = 42");
    }

    #[test]
    fn test_unknown_type() {
        let message = first_error("Mystery m = 1");
        assert!(message.contains("Unknown type 'Mystery'"));
    }
}

mod operators {
    use super::*;

    #[test]
    fn test_arithmetic_widening() {
        assert_clean("var x = 1 + 2");
        assert_clean("float y = 1 + 2.5");
        assert_clean("var m = 7 % 2");
    }

    #[test]
    fn test_string_concatenation() {
        assert_clean("var s = \"a\" + \"b\"");
        let message = first_error("var s = \"a\" - \"b\"");
        assert!(message.contains("'-'"));
    }

    #[test]
    fn test_mixed_arithmetic_rejected() {
        let message = first_error("var x = 1 + true");
        assert!(message.contains("'+'"));
    }

    #[test]
    fn test_comparison_yields_bool() {
        assert_clean("bool b = 1 < 2");
        assert_clean("bool c = \"a\" == \"b\"");
    }

    #[test]
    fn test_incompatible_comparison() {
        let message = first_error("var b = 1 == \"a\"");
        assert!(message.contains("'=='"));
    }

    #[test]
    fn test_logical_operands_conditionable() {
        assert_clean("var b = true && false");
        assert_clean("int? n = null var b = n || true");
        let message = first_error("var b = \"s\" && true");
        assert!(message.contains("not allowed"));
    }

    #[test]
    fn test_not_requires_bool() {
        assert_clean("var b = !true");
        let message = first_error("var b = !1");
        assert!(message.contains("'!'"));
    }

    #[test]
    fn test_negate_requires_numeric() {
        assert_clean("var n = -3");
        let message = first_error("var n = -\"s\"");
        assert!(message.contains("numeric"));
    }

    #[test]
    fn test_increment_requires_lvalue() {
        assert_clean("var n = 1 n++");
        let result = check_source("5++");
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, TypeError::NotLValue { .. })));
    }

    #[test]
    fn test_ternary_branch_compatibility() {
        assert_clean("var x = true ? 1 : 2");
        let message = first_error("var x = true ? 1 : \"s\"");
        assert!(message.contains("Cannot assign"));
    }

    #[test]
    fn test_compound_assignment() {
        assert_clean("var n = 1 n += 2 n *= 3");
        assert_clean("var s = \"a\" s += \"b\"");
        let message = first_error("var n = 1 n += \"s\"");
        assert!(message.contains("'+'"));
    }
}

mod control_flow {
    use super::*;

    #[test]
    fn test_if_condition_is_permissive() {
        assert_clean("if (true) { }");
        assert_clean("int n = 1 if (n) { }");
        assert_clean("int? n = null if (n) { }");
        let message = first_error("if (\"s\") { }");
        assert!(message.contains("not allowed"));
    }

    #[test]
    fn test_while_condition_is_permissive() {
        assert_clean("int n = 3 while (n) { n = n - 1 }");
    }

    #[test]
    fn test_do_while_condition_must_be_bool() {
        assert_clean("int n = 0 do { n++ } while (n < 2)");
        let message = first_error("int n = 0 do { n++ } while (n)");
        assert!(message.contains("not allowed"));
    }

    #[test]
    fn test_for_condition_must_be_bool() {
        assert_clean("for (int i = 0; i < 3; i++) { }");
        let message = first_error("for (int i = 0; i; i++) { }");
        assert!(message.contains("not allowed"));
    }

    #[test]
    fn test_for_initializer_scope() {
        // The loop variable does not leak out of the loop.
        let message = first_error("for (int i = 0; i < 3; i++) { } print(i)");
        assert!(message.contains("Undeclared identifier 'i'"));
    }

    #[test]
    fn test_for_in_over_array() {
        assert_clean("var xs = [1, 2] for (item in xs) { print(item) }");
        assert_clean("var xs = [1, 2] for (i, item in xs) { print(i, item) }");
    }

    #[test]
    fn test_for_in_requires_iterable() {
        let message = first_error("for (item in 5) { }");
        assert!(message.contains("not iterable"));
    }

    #[test]
    fn test_switch_case_types() {
        assert_clean("int d = 1 switch (d) { case 1: print(1) default: print(0) }");
        let message = first_error("int d = 1 switch (d) { case \"a\": print(1) }");
        assert!(message.contains("Cannot assign"));
    }

    #[test]
    fn test_break_and_continue_only_in_loops() {
        assert_clean("while (true) { break }");
        assert_clean("while (true) { continue }");
        let message = first_error("break");
        assert!(message.contains("'break' outside of a loop"));
    }

    #[test]
    fn test_break_in_switch_case_is_not_a_loop() {
        let message = first_error("int d = 1 switch (d) { case 1: break }");
        assert!(message.contains("outside of a loop"));
    }
}

mod functions {
    use super::*;

    #[test]
    fn test_simple_function() {
        assert_clean("int function add(int a, int b) { return a + b } print(add(1, 2))");
    }

    #[test]
    fn test_recursion() {
        assert_clean(
            "int function f(int n) { if (n <= 1) { return 1 } return n * f(n - 1) } print(f(5))",
        );
    }

    #[test]
    fn test_return_outside_function() {
        let message = first_error("return 1");
        assert!(message.contains("outside of a function"));
    }

    #[test]
    fn test_void_function_returning_value() {
        let message = first_error("void function f() { return 1 }");
        assert!(message.contains("void"));
    }

    #[test]
    fn test_missing_return_value() {
        let message = first_error("int function f() { return }");
        assert!(message.contains("Missing return value"));
    }

    #[test]
    fn test_return_type_compatibility() {
        assert_clean("float function f() { return 1 }");
        let message = first_error("int function f() { return \"s\" }");
        assert!(message.contains("Cannot assign type 'string' to 'int'"));
    }

    #[test]
    fn test_call_arity() {
        let message = first_error("int function g(int a) { return a } g(1, 2)");
        assert!(message.contains("Expected 1 argument(s), found 2"));
    }

    #[test]
    fn test_argument_compatibility() {
        let message = first_error("int function g(int a) { return a } g(\"s\")");
        assert!(message.contains("Cannot assign type 'string' to 'int'"));
    }

    #[test]
    fn test_calling_a_non_function() {
        let message = first_error("var x = 1 x(2)");
        assert!(message.contains("not callable"));
    }

    #[test]
    fn test_loop_depth_does_not_cross_function_boundary() {
        let message =
            first_error("while (true) { void function f() { break } }");
        assert!(message.contains("outside of a loop"));
    }
}

mod generics {
    use super::*;

    #[test]
    fn test_generic_function_declaration_and_call() {
        assert_clean("<T> T function id(T x) { return x } print(id<int>(3))");
    }

    #[test]
    fn test_type_argument_arity() {
        let message = first_error("<T> T function id(T x) { return x } id<int, string>(3)");
        assert!(message.contains("type argument"));
    }

    #[test]
    fn test_substitution_checks_arguments() {
        let message = first_error("<T> T function id(T x) { return x } id<int>(\"s\")");
        assert!(message.contains("Cannot assign type 'string' to 'int'"));
    }

    #[test]
    fn test_generic_params_are_opaque_in_body() {
        let message = first_error("<T> T function bad(T x) { return x + 1 }");
        assert!(message.contains("'+'"));
    }

    #[test]
    fn test_unknown_generic_param() {
        let message = first_error("int function f(T x) { return 1 }");
        assert!(message.contains("Unknown type 'T'"));
    }
}

mod structs {
    use super::*;

    const POINT: &str = "struct Point { int x int y } ";

    #[test]
    fn test_struct_literal() {
        assert_clean(&format!("{POINT}var p = Point {{ x: 1, y: 2 }} print(p.x)"));
    }

    #[test]
    fn test_unknown_field_in_literal() {
        let message = first_error(&format!("{POINT}var p = Point {{ z: 1 }}"));
        assert!(message.contains("no field 'z'"));
    }

    #[test]
    fn test_field_type_mismatch() {
        let message = first_error(&format!("{POINT}var p = Point {{ x: \"s\" }}"));
        assert!(message.contains("Cannot assign"));
    }

    #[test]
    fn test_duplicate_fields() {
        let message = first_error("struct Twice { int a int a }");
        assert!(message.contains("Duplicate field 'a'"));
    }

    #[test]
    fn test_member_access_and_assignment() {
        assert_clean(&format!(
            "{POINT}var p = Point {{ x: 1, y: 2 }} p.x = 5 print(p.x + p.y)"
        ));
        let message = first_error(&format!(
            "{POINT}var p = Point {{ x: 1, y: 2 }} print(p.z)"
        ));
        assert!(message.contains("no field 'z'"));
    }

    #[test]
    fn test_impl_and_new() {
        assert_clean(&format!(
            "{POINT}implement Point {{ init(int x, int y) {{ self.x = x self.y = y }} int sum() {{ return self.x + self.y }} }} var p = new Point(1, 2) print(p.sum())"
        ));
    }

    #[test]
    fn test_new_checks_init_arity() {
        let message = first_error(&format!(
            "{POINT}implement Point {{ init(int x, int y) {{ self.x = x self.y = y }} }} var p = new Point(1)"
        ));
        assert!(message.contains("Expected 2 argument(s), found 1"));
    }

    #[test]
    fn test_impl_requires_struct() {
        let message = first_error("implement Ghost { init() { } }");
        assert!(message.contains("not a struct"));
    }

    #[test]
    fn test_self_outside_impl() {
        let message = first_error("print(self)");
        assert!(message.contains("'self' outside"));
    }

    #[test]
    fn test_unknown_method() {
        let message = first_error(&format!(
            "{POINT}var p = Point {{ x: 1, y: 2 }} p.launch()"
        ));
        assert!(message.contains("no member 'launch'") || message.contains("no field 'launch'"));
    }
}

mod types_and_collections {
    use super::*;

    #[test]
    fn test_nullable_accepts_null_and_base() {
        assert_clean("int? n = null n = 3");
        let message = first_error("int n = null");
        assert!(message.contains("Cannot assign type 'null' to 'int'"));
    }

    #[test]
    fn test_union_membership() {
        assert_clean("int | string u = 1 u = \"s\"");
        let message = first_error("int | string u = true");
        assert!(message.contains("Cannot assign type 'bool' to 'int|string'"));
    }

    #[test]
    fn test_pointer_strictness() {
        assert_clean("int a = 1 int* p = &a");
        let message = first_error("int a = 1 float* p = &a");
        assert!(message.contains("Cannot assign type 'int*' to 'float*'"));
    }

    #[test]
    fn test_array_literal_element_agreement() {
        assert_clean("var xs = [1, 2, 3]");
        assert_clean("int[] empty = []");
        let message = first_error("var xs = [1, \"a\"]");
        assert!(message.contains("Cannot assign"));
    }

    #[test]
    fn test_indexing() {
        assert_clean("var xs = [1, 2] print(xs[0])");
        assert_clean("var m = map<string, int>{\"a\": 1} print(m[\"a\"])");
        let message = first_error("var xs = [1, 2] print(xs[\"a\"])");
        assert!(message.contains("Cannot assign type 'string' to 'int'"));
    }

    #[test]
    fn test_indexing_non_indexable() {
        let message = first_error("var n = 1 print(n[0])");
        assert!(message.contains("cannot be indexed"));
    }

    #[test]
    fn test_builtin_length() {
        assert_clean("var xs = [1] print(length(xs))");
        assert_clean("print(length(\"abc\"))");
        let message = first_error("print(length(1))");
        assert!(message.contains("not iterable"));
    }

    #[test]
    fn test_builtin_append() {
        assert_clean("var xs = [1] append(xs, 2)");
        let message = first_error("var xs = [1] append(xs, \"s\")");
        assert!(message.contains("Cannot assign"));
    }

    #[test]
    fn test_error_sentinel_suppresses_cascades() {
        // One undeclared name reports once even though it flows into
        // arithmetic and a call.
        let result = check_source("var x = zzz + 1 print(x + 2)");
        assert_eq!(result.errors.len(), 1);
    }
}
