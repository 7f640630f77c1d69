//! Checker behavior through the public `check` entry point

use alpha::check;

#[test]
fn test_clean_program_reports_nothing() {
    assert!(check("int a = 1 print(a)").is_empty());
}

#[test]
fn test_type_mismatch_message() {
    let errors = check("var a = 1 a = \"x\"");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Cannot assign type 'string' to 'int'"));
}

#[test]
fn test_parse_errors_come_back_positioned() {
    let errors = check("if (x { }");
    assert!(!errors.is_empty());
    assert!(errors[0].contains("at 1:"));
}

#[test]
fn test_multiple_errors_accumulate() {
    let errors = check("var a = zzz var b = yyy");
    assert_eq!(errors.len(), 2);
}

#[test]
fn test_errors_do_not_cascade() {
    // The failed initializer poisons `a` quietly; only the original
    // error is reported.
    let errors = check("var a = zzz print(a + 1)");
    assert_eq!(errors.len(), 1);
}
