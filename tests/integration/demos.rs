//! Demo harness behavior (spec'd CLI surface)

use alpha::demos::{cases_for, run_selector, SELECTORS};

#[test]
fn test_selector_list_is_complete() {
    assert_eq!(
        SELECTORS,
        &[
            "variables",
            "conditions",
            "loops",
            "functions",
            "types",
            "structs",
            "expressions",
        ]
    );
}

#[test]
fn test_reports_contain_banner_source_and_summary() {
    let report = run_selector("loops");
    assert!(report.contains("=== loops / while ==="));
    assert!(report.contains("while (x < 3)"));
    assert!(report.contains("ok:"));
}

#[test]
fn test_unknown_selector_is_none() {
    assert!(cases_for("nonsense").is_none());
}

#[test]
#[should_panic(expected = "Give a correct case name")]
fn test_unknown_selector_aborts_dispatch() {
    run_selector("nonsense");
}
