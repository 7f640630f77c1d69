//! End-to-end pipeline scenarios: source in, observable output out

use alpha::run_captured;

#[test]
fn test_hello_concatenation() {
    let output = run_captured("var s = \"hi\" + \" there\" print(s)").unwrap();
    assert_eq!(output, "hi there\n");
}

#[test]
fn test_branching() {
    let output = run_captured(
        "int x = 5 if (x > 0) { print(\"pos\") } else { print(\"neg\") }",
    )
    .unwrap();
    assert_eq!(output, "pos\n");
}

#[test]
fn test_counting_loop() {
    let output = run_captured("for (int i = 0; i < 3; i++) { print(i) }").unwrap();
    assert_eq!(output, "0\n1\n2\n");
}

#[test]
fn test_factorial() {
    let output = run_captured(
        "int function f(int n) { if (n <= 1) { return 1 } return n * f(n - 1) } print(f(5))",
    )
    .unwrap();
    assert_eq!(output, "120\n");
}

#[test]
fn test_nullable_condition_is_falsy() {
    let output = run_captured("int? n = null if (n) { print(\"y\") }").unwrap();
    assert_eq!(output, "");
}

#[test]
fn test_structs_end_to_end() {
    let source = r#"
        struct Point { int x int y }
        implement Point {
            init(int x, int y) { self.x = x self.y = y }
            int manhattan() { return self.x + self.y }
        }
        var p = new Point(3, 4)
        print(p.manhattan())
    "#;
    assert_eq!(run_captured(source).unwrap(), "7\n");
}

#[test]
fn test_collections_end_to_end() {
    let source = r#"
        var words = ["alpha", "beta"]
        append(words, "gamma")
        for (i, word in words) { print(i, word) }
        var counts = map<string, int>{"a": 1}
        counts["b"] = 2
        print(length(counts))
    "#;
    assert_eq!(run_captured(source).unwrap(), "0 alpha\n1 beta\n2 gamma\n3\n");
}

#[test]
fn test_runtime_error_aborts() {
    let error = run_captured("print(1) print(1 / 0) print(2)").unwrap_err();
    assert!(error.to_string().contains("division by zero"));
}

#[test]
fn test_two_runs_are_identical() {
    let source = r#"
        var total = 0
        for (int i = 1; i < 5; i++) { total += i }
        print(total)
        var tags = set<string>{"x", "y", "x"}
        print(length(tags))
    "#;
    let first = run_captured(source).unwrap();
    let second = run_captured(source).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, "10\n2\n");
}
