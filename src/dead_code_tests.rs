#![cfg(test)]

use std::{collections::BTreeSet, path::Path};

use oxc_span::Span;

use crate::{
    binding::BindingKind,
    dead_code::{Finding, Retention, Settings},
    edit::EditConflict,
    error::Error,
    Analysis,
};

fn run(content: &str) -> Vec<Finding> {
    run_with(content, Settings::default())
}

fn run_with(content: &str, settings: Settings) -> Vec<Finding> {
    settings.analyze(content).expect("analyze").findings
}

fn names(results: &[Finding]) -> Vec<&str> {
    results.iter().map(|finding| finding.name.as_str()).collect()
}

#[test]
fn var_alive() {
    let results = run("const alive = 23; console.log(alive);");
    assert_eq!(0, results.len());
}

#[test]
fn var_dead() {
    let results = run("const dead = 23;");
    assert_eq!(1, results.len());
    assert_eq!(results[0].kind, BindingKind::Variable);
    assert_eq!(results[0].name.as_str(), "dead");
    assert!(results[0].is_removable());
}

#[test]
fn var_alive_in_closure() {
    let results = run("const alive = 23;\nexport const get = () => alive;\n");
    assert_eq!(0, results.len());
}

#[test]
fn function_dead_recursive() {
    let results = run("function dead(n) { return n && dead(n - 1); }");
    assert_eq!(names(&results), ["dead"]);
    assert_eq!(results[0].kind, BindingKind::Function);
}

#[test]
fn var_dead_self_reference() {
    let results = run("const dead = () => dead;");
    assert_eq!(names(&results), ["dead"]);
}

#[test]
fn object_field_dead() {
    let results = run("const { used, unused } = obj; console.log(used);");
    assert_eq!(1, results.len());
    assert_eq!(results[0].kind, BindingKind::ObjectField);
    assert_eq!(results[0].name.as_str(), "unused");
    assert!(results[0].is_removable());
}

#[test]
fn nested_field_dead() {
    let results = run("const { a: { b, c } } = obj; console.log(b);");
    assert_eq!(names(&results), ["c"]);
    assert_eq!(results[0].kind, BindingKind::NestedField);
    assert!(results[0].is_removable());
}

#[test]
fn trailing_param_dead() {
    let results = run("function f(a, b) { return a; }\nf(1, 2);\n");
    assert_eq!(names(&results), ["b"]);
    assert_eq!(results[0].kind, BindingKind::Parameter);
    assert!(results[0].is_removable());
}

#[test]
fn leading_param_not_reported() {
    let results = run("function f(a, b) { return b; }\nf(1, 2);\n");
    assert_eq!(0, results.len());
}

#[test]
fn params_pinned_by_arguments() {
    let results = run("function f(a, b) { return arguments.length; }\nf();\n");
    assert_eq!(0, results.len());
}

#[test]
fn params_unchecked() {
    let settings = Settings {
        allow_unused_trailing_params: false,
        ..Settings::default()
    };
    let results = run_with("function f(a) {}\nf();\n", settings);
    assert_eq!(0, results.len());
}

#[test]
fn param_impure_default() {
    let results = run("function f(a, b = init()) { return a; }\nf(1);\n");
    assert_eq!(names(&results), ["b"]);
    assert_eq!(results[0].retention, Some(Retention::SideEffects));
}

#[test]
fn unparenthesized_arrow_param() {
    let results = run("const f = x => 1;\nf();\n");
    assert_eq!(names(&results), ["x"]);
    assert_eq!(results[0].retention, Some(Retention::Syntax));
}

#[test]
fn array_element_positional() {
    let results = run("const [a, b] = arr; console.log(b);");
    assert_eq!(names(&results), ["a"]);
    assert_eq!(results[0].kind, BindingKind::ArrayElement);
    assert_eq!(results[0].retention, Some(Retention::Positional));
}

#[test]
fn array_element_trailing() {
    let results = run("const [a, b] = arr; console.log(a);");
    assert_eq!(names(&results), ["b"]);
    assert!(results[0].is_removable());
}

#[test]
fn exports_are_used() {
    let results = run("export const x = { y: 1 };\nexport function f() {}\n");
    assert_eq!(0, results.len());
}

#[test]
fn exports_checked() {
    let settings = Settings {
        treat_exports_as_used: false,
        ..Settings::default()
    };
    let results = run_with("export const x = { y: 1 };\nexport function f() {}\n", settings);
    assert_eq!(names(&results), ["x", "f"]);
    assert!(results
        .iter()
        .all(|finding| finding.retention == Some(Retention::Exported)));
}

#[test]
fn rest_sibling() {
    let results = run("const { a, ...rest } = obj; console.log(rest);");
    assert_eq!(names(&results), ["a"]);
    assert_eq!(results[0].retention, Some(Retention::RestSibling));
}

#[test]
fn rest_dead() {
    let content = "const { a, ...rest } = obj; console.log(a);";
    let results = run(content);
    assert_eq!(names(&results), ["rest"]);
    assert!(results[0].is_removable());

    let settings = Settings {
        ignore_rest_captures: true,
        ..Settings::default()
    };
    assert_eq!(0, run_with(content, settings).len());
}

#[test]
fn underscore() {
    let content = "const _unused = 1;";
    assert_eq!(1, run(content).len());

    let settings = Settings {
        ignore_underscore: true,
        ..Settings::default()
    };
    assert_eq!(0, run_with(content, settings).len());
}

#[test]
fn assigned() {
    let results = run("let x = 1;\nx = 2;\n");
    assert_eq!(names(&results), ["x"]);
    assert_eq!(results[0].retention, Some(Retention::Assigned));
}

#[test]
fn compound_assignment_reads() {
    let results = run("let x = 1;\nconsole.log(x += 2);\n");
    assert_eq!(0, results.len());
}

#[test]
fn side_effects() {
    let results = run("const x = compute();");
    assert_eq!(names(&results), ["x"]);
    assert_eq!(results[0].retention, Some(Retention::SideEffects));
}

#[test]
fn pure_initializers() {
    let results = run("const a = [1, { b: 'c' }], d = () => compute(), e = !0;");
    assert_eq!(names(&results), ["a", "d", "e"]);
    assert!(results.iter().all(Finding::is_removable));
}

#[test]
fn catch_param() {
    let results = run("try { risky(); } catch (err) {}");
    assert_eq!(names(&results), ["err"]);
    assert_eq!(results[0].retention, Some(Retention::Syntax));
}

#[test]
fn loop_variable() {
    let results = run("for (const item of items) {}");
    assert_eq!(names(&results), ["item"]);
    assert_eq!(results[0].retention, Some(Retention::Syntax));
}

#[test]
fn import_dead() {
    let results = run("import { a, b } from 'm';\na();\n");
    assert_eq!(names(&results), ["b"]);
    assert_eq!(results[0].kind, BindingKind::Import);
    assert!(results[0].is_removable());
}

#[test]
fn import_used_as_type() {
    let results = run("import { Foo } from 'm';\nlet x: Foo;\nconsole.log(x);\n");
    assert_eq!(0, results.len());
}

#[test]
fn class_dead() {
    let results = run("class Unused {}");
    assert_eq!(names(&results), ["Unused"]);
    assert_eq!(results[0].kind, BindingKind::Class);
    assert!(results[0].is_removable());
}

#[test]
fn class_static_side_effects() {
    let results = run("class Unused { static x = init(); }");
    assert_eq!(names(&results), ["Unused"]);
    assert_eq!(results[0].retention, Some(Retention::SideEffects));
}

#[test]
fn dead_chain() {
    let results = run("const a = 1;\nconst b = a;\n");
    assert_eq!(names(&results), ["a", "b"]);
    assert!(results.iter().all(Finding::is_removable));
}

#[test]
fn dead_function_chain() {
    let results = run("function helper() {}\nfunction unused() { helper(); }\n");
    assert_eq!(names(&results), ["helper", "unused"]);
}

#[test]
fn shadowing() {
    let results = run("const x = 1;\nfunction f() { const x = 2; return x; }\nf();\n");
    assert_eq!(names(&results), ["x"]);
    assert_eq!(results[0].span.start.line, 1);
}

#[test]
fn forward_reference() {
    let results = run("function f() { return g(); }\nfunction g() { return 1; }\nf();\n");
    assert_eq!(0, results.len());
}

#[test]
fn var_hoisting() {
    let results = run("function f() { { var v = 1; } return v; }\nf();\n");
    assert_eq!(0, results.len());
}

#[test]
fn redeclared_var() {
    let results = run("var x = 1;\nvar x = 2;\n");
    assert_eq!(0, results.len());
}

#[test]
fn span() {
    let results = run("\nconst dead = 1;");
    assert_eq!(results[0].span.start.line, 2);
    assert_eq!(results[0].span.start.column, 7);
    assert_eq!(results[0].span.end.column, 11);
}

#[test]
fn display() {
    let results = run("const [a, b] = arr; console.log(b);\nconst { c } = obj;\n");
    let lines = results.iter().map(|finding| finding.to_string()).collect::<Vec<_>>();
    assert_eq!(
        lines,
        ["Unused array element: a (kept: positional)", "Unused object field: c"]
    );
}

#[test]
fn report_only() {
    let settings = Settings {
        report_only: true,
        ..Settings::default()
    };
    let analysis = settings.analyze("const dead = 1;").unwrap();
    assert_eq!(1, analysis.findings.len());
    assert!(analysis.edits.is_empty());
}

#[test]
fn parse_error() {
    let result = Settings::default().analyze("const = 1;");
    assert!(matches!(result, Err(Error::Parse { .. })));
}

#[test]
fn unresolved_names_are_not_findings() {
    let results = run("undeclared();\nwindow.thing = 1;\n");
    assert_eq!(0, results.len());
}

#[test]
fn generic_arrow() {
    let results = run("const x = <T>(y: T) => y; console.log(x);");
    assert_eq!(0, results.len());
}

#[test]
fn unicode_escaped_name() {
    assert_eq!(0, run("const \\u0061b = 1; console.log(ab);").len());
    assert_eq!(names(&run("const \\u0061b = 1;")), ["ab"]);
}

#[test]
fn jsx_references() {
    let content = "import { Button } from './button';\n\
                   import { Icon } from './icon';\n\
                   export const App = () => <Button label=\"x\" />;\n";
    let analysis = Settings::default()
        .analyze_path(content, Path::new("app.tsx"))
        .expect("analyze");
    assert_eq!(names(&analysis.findings), ["Icon"]);
    assert!(analysis.findings[0].is_removable());
}

#[test]
fn class_impure_computed_member() {
    let results = run("class B { [console.log(2)]() {} }");
    assert_eq!(names(&results), ["B"]);
    assert_eq!(results[0].retention, Some(Retention::SideEffects));

    let results = run("class C { ['name']() {} }");
    assert_eq!(names(&results), ["C"]);
    assert!(results[0].is_removable());
}

#[test]
fn pattern_impure_computed_key() {
    let results = run("const { [f()]: v } = o;");
    assert_eq!(names(&results), ["v"]);
    assert_eq!(results[0].retention, Some(Retention::SideEffects));

    let results = run("const { ['k']: w } = o;");
    assert_eq!(names(&results), ["w"]);
    assert!(results[0].is_removable());
}

#[test]
fn block_function_is_block_scoped() {
    let results = run("{ function g() {} }\ng();\n");
    assert_eq!(names(&results), ["g"]);
    assert!(results[0].is_removable());
}

#[test]
fn conflict_keeps_findings() {
    let findings = run("const dead = 1;");
    let conflict = EditConflict {
        first: Span::new(0, 4),
        second: Span::new(2, 6),
    };

    let report = Analysis::conflicted(findings.clone(), conflict.clone(), true);
    assert_eq!(report.findings, findings);
    assert!(report.edits.is_empty());
    assert_eq!(report.conflict, None);

    let rewrite = Analysis::conflicted(findings.clone(), conflict.clone(), false);
    assert_eq!(rewrite.findings, findings);
    assert!(rewrite.edits.is_empty());
    assert_eq!(rewrite.conflict, Some(conflict));
    assert_eq!(rewrite.rewrite("const dead = 1;"), "const dead = 1;");
}

fn outcome(content: &str) -> BTreeSet<(String, String, Option<String>)> {
    run(content)
        .into_iter()
        .map(|finding| {
            (
                finding.name,
                finding.kind.to_string(),
                finding.retention.map(|retention| retention.to_string()),
            )
        })
        .collect()
}

#[test]
fn line_breaks_do_not_matter() {
    let cases = [
        (
            "const a = 1, b = f(), c = 2; console.log(c);\n",
            "const\n  a = 1,\n  b = f(),\n  c = 2;\nconsole.log(c);\n",
        ),
        (
            "const { x, y: [p, q], ...r } = o; console.log(q);\n",
            "const {\n  x,\n  y: [\n    p,\n    q,\n  ],\n  ...r\n} = o;\nconsole.log(q);\n",
        ),
        (
            "function g(a, { b, c }, d = h()) { return b; }\ng();\n",
            "function g(\n  a,\n  {\n    b,\n    c,\n  },\n  d = h(),\n) {\n  return b;\n}\ng();\n",
        ),
    ];
    for (single, multi) in cases {
        let expected = outcome(single);
        assert!(!expected.is_empty(), "{}", single);
        assert_eq!(expected, outcome(multi), "{}", multi);
    }
}
