//! Go emission over compiled programs

use alpha::emit_go;

#[test]
fn test_emits_go_skeleton() {
    let source = emit_go("int a = 1 + 2 print(a)").unwrap();
    assert!(source.starts_with("package main"));
    assert!(source.contains("func main("));
    assert!(source.contains("rtCall(\"print\""));
}

#[test]
fn test_loops_emit_labels_and_gotos() {
    let source = emit_go("int x = 0 while (x < 3) { x = x + 1 }").unwrap();
    assert!(source.contains("goto L"));
    assert!(source.contains("rtLt("));
    assert!(source.contains("rtTruthy("));
}

#[test]
fn test_functions_and_methods() {
    let source = emit_go(
        "struct P { int x } implement P { init(int x) { self.x = x } } int function one() { return 1 } print(one())",
    )
    .unwrap();
    assert!(source.contains("func one("));
    assert!(source.contains("func P_init("));
}

#[test]
fn test_folded_constant_appears() {
    let source = emit_go("int a = 1 + 2").unwrap();
    assert!(source.contains("int64(3)"));
}
