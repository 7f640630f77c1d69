//! Demo catalog for the CLI harness
//!
//! Each selector names a group of small Alpha snippets. Running a
//! selector prints, per sub-case: a banner, the source, then either a
//! success summary with the statement count or the recorded errors.
//! An unrecognized selector aborts the process; that panic is the one
//! place the pipeline is allowed to do so.

use std::fmt::Write as _;

use crate::frontend;

/// Recognized selectors, in presentation order
pub const SELECTORS: &[&str] = &[
    "variables",
    "conditions",
    "loops",
    "functions",
    "types",
    "structs",
    "expressions",
];

/// One demo snippet
#[derive(Debug, Clone, Copy)]
pub struct DemoCase {
    pub title: &'static str,
    pub source: &'static str,
}

/// Sub-cases for a selector, or `None` when unrecognized
pub fn cases_for(selector: &str) -> Option<&'static [DemoCase]> {
    let cases: &'static [DemoCase] = match selector {
        "variables" => &[
            DemoCase {
                title: "typed declaration",
                source: "int a = 1 + 2\nprint(a)",
            },
            DemoCase {
                title: "inference",
                source: "var s = \"hi\" + \" there\"\nprint(s)",
            },
            DemoCase {
                title: "constants",
                source: "const limit = 10\nprint(limit)",
            },
        ],
        "conditions" => &[
            DemoCase {
                title: "if/else",
                source: "int x = 5\nif (x > 0) { print(\"pos\") } else { print(\"neg\") }",
            },
            DemoCase {
                title: "nullable condition",
                source: "int? n = null\nif (n) { print(\"y\") }",
            },
            DemoCase {
                title: "switch",
                source: "int day = 2\nswitch (day) {\ncase 1: print(\"mon\")\ncase 2: print(\"tue\")\ndefault: print(\"other\")\n}",
            },
        ],
        "loops" => &[
            DemoCase {
                title: "while",
                source: "int x = 0\nwhile (x < 3) { x = x + 1 }\nprint(x)",
            },
            DemoCase {
                title: "c-style for",
                source: "for (int i = 0; i < 3; i++) { print(i) }",
            },
            DemoCase {
                title: "for-in",
                source: "var xs = [10, 20, 30]\nfor (item in xs) { print(item) }",
            },
            DemoCase {
                title: "do-while",
                source: "int n = 0\ndo { n++ } while (n < 2)\nprint(n)",
            },
        ],
        "functions" => &[
            DemoCase {
                title: "declaration and call",
                source: "int function add(int a, int b) { return a + b }\nprint(add(2, 3))",
            },
            DemoCase {
                title: "recursion",
                source: "int function f(int n) { if (n <= 1) { return 1 } return n * f(n - 1) }\nprint(f(5))",
            },
            DemoCase {
                title: "generic function",
                source: "<T> T function first(T[] xs) { return xs[0] }\nprint(first<int>([7, 8]))",
            },
        ],
        "types" => &[
            DemoCase {
                title: "nullable and union",
                source: "int? maybe = null\nint | string either = 3\nprint(either)",
            },
            DemoCase {
                title: "alias",
                source: "type Id = int\nId user = 42\nprint(user)",
            },
            DemoCase {
                title: "collections",
                source: "var m = map<string, int>{\"a\": 1}\nvar s = set<int>{1, 2, 2}\nprint(length(m), length(s))",
            },
        ],
        "structs" => &[
            DemoCase {
                title: "declaration and literal",
                source: "struct Point { int x int y }\nvar p = Point { x: 1, y: 2 }\nprint(p.x + p.y)",
            },
            DemoCase {
                title: "implementation block",
                source: "struct Counter { int value }\nimplement Counter {\ninit(int start) { self.value = start }\nint bump() { self.value = self.value + 1 return self.value }\n}\nvar c = new Counter(5)\nprint(c.bump())",
            },
        ],
        "expressions" => &[
            DemoCase {
                title: "precedence",
                source: "print(1 + 2 * 3)",
            },
            DemoCase {
                title: "ternary",
                source: "int x = 4\nprint((x > 2) ? \"big\" : \"small\")",
            },
            DemoCase {
                title: "logic",
                source: "bool ok = true && !false\nprint(ok || false)",
            },
            DemoCase {
                title: "compound assignment",
                source: "int n = 1\nn += 4\nn *= 2\nprint(n)",
            },
        ],
        _ => return None,
    };
    Some(cases)
}

/// Render a selector's report. Aborts with `Give a correct case name`
/// on an unknown selector.
pub fn run_selector(selector: &str) -> String {
    let Some(cases) = cases_for(selector) else {
        panic!("Give a correct case name");
    };

    let mut out = String::new();
    for case in cases {
        let _ = writeln!(out, "=== {} / {} ===", selector, case.title);
        let _ = writeln!(out, "{}", case.source);
        let analysis = frontend::analyze(case.source);
        if !analysis.parse_errors.is_empty() {
            for error in &analysis.parse_errors {
                let _ = writeln!(out, "parse error: {error}");
            }
        } else if !analysis.check.is_ok() {
            for error in &analysis.check.errors {
                let _ = writeln!(out, "semantic error: {error}");
            }
        } else {
            let _ = writeln!(out, "ok: {} statement(s)", analysis.program.body.len());
        }
        out.push('\n');
    }
    out
}
