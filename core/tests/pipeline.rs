mod common;

use common::*;
use modus_core::goal::build::*;
use modus_core::goal::{Determinism, Mode, Module, PredDecl, ProcRef};
use modus_core::reports::Severity;
use modus_core::{check_module, compile_module, CompileError};

#[test]
fn sample_module_checks_clean() {
    let checked = check_module(sample_module()).expect("sample checks");
    assert!(!checked.reports.has_errors(), "{}", checked.reports.render_text());
    assert_eq!(checked.reports.exit_code(), 0);
    assert_eq!(checked.procs.len(), sample_module().bodies.len());
    let refs: Vec<ProcRef> = checked.procs.iter().map(|p| p.proc_ref).collect();
    let mut sorted = refs.clone();
    sorted.sort();
    assert_eq!(refs, sorted);
}

#[test]
fn undeclared_determinism_is_inferred() {
    let checked = check_module(sample_module()).expect("sample checks");
    assert_eq!(checked.table.proc_det(ProcRef::new(COUNT, 0)), Some(Determinism::Det));
    assert_eq!(checked.table.proc_det(ProcRef::new(LEN, 0)), Some(Determinism::Det));
}

#[test]
fn inference_follows_undeclared_callees() {
    // q has no declaration and calls member; r calls q.
    let mut module = sample_module();
    let q = module.preds.len();
    module.preds.push(PredDecl::new("q", vec!["list", "any"], vec![proc_decl(vec![Mode::input(), Mode::output()], None)]));
    module.preds.push(PredDecl::new("r", vec!["list", "any"], vec![proc_decl(vec![Mode::input(), Mode::output()], None)]));
    module.bodies.push(body(q, 0, &[0, 1], &[(0, "list")], call(MEMBER, &[1, 0])));
    module.bodies.push(body(q + 1, 0, &[0, 1], &[(0, "list")], call(q, &[0, 1])));
    let checked = check_module(module).expect("module checks");
    assert_eq!(checked.table.proc_det(ProcRef::new(q, 0)), Some(Determinism::Nondet));
    assert_eq!(checked.table.proc_det(ProcRef::new(q + 1, 0)), Some(Determinism::Nondet));
}

#[test]
fn faulty_procedure_is_dropped_and_the_rest_compile() {
    let mut module = sample_module();
    let bad = module.preds.len();
    module.preds.push(PredDecl::new("bad", vec!["any"], vec![proc_decl(vec![Mode::output()], Some(Determinism::Det))]));
    module.bodies.push(body(bad, 0, &[0], &[], assign(0, 1)));

    let compiled = compile_module(module, &at_level(2)).expect("module compiles");
    assert!(compiled.reports.has_errors());
    assert_eq!(compiled.reports.exit_code(), 1);
    assert_eq!(compiled.reports.with_code(104).len(), 1, "{}", compiled.reports.render_text());
    assert!(compiled.code.proc(ProcRef::new(bad, 0)).is_none());
    assert!(compiled.code.proc(ProcRef::new(LEN, 0)).is_some());
}

#[test]
fn determinism_error_is_reported_with_its_code() {
    let module = small_module(
        vec![PredDecl::new("p", vec!["color"], vec![proc_decl(vec![Mode::input()], Some(Determinism::Det))])],
        vec![body(0, 0, &[0], &[(0, "color")], construct(0, "red", &[]))],
    );
    let checked = check_module(module).expect("module checks");
    let reports = checked.reports.with_code(200);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].severity, Severity::Error);
    assert!(checked.procs.is_empty());
}

#[test]
fn missing_switch_case_is_a_warning() {
    let module = small_module(
        vec![PredDecl::new("p", vec!["color"], vec![proc_decl(vec![Mode::input()], Some(Determinism::Semidet))])],
        vec![body(
            0,
            0,
            &[0],
            &[(0, "color")],
            disj(vec![construct(0, "red", &[]), construct(0, "green", &[])]),
        )],
    );
    let checked = check_module(module).expect("module checks");
    assert!(!checked.reports.has_errors());
    assert!(checked.reports.has_warnings());
    assert_eq!(checked.reports.exit_code(), 0);
    assert_eq!(checked.procs.len(), 1);
}

#[test]
fn body_for_undeclared_procedure_fails_loading() {
    let mut module = sample_module();
    module.bodies.push(body(99, 0, &[0], &[], construct(0, "a", &[])));
    match check_module(module) {
        Err(CompileError::Load(e)) => assert!(e.to_string().contains("undeclared")),
        other => panic!("expected a load error, got {:?}", other.map(|c| c.procs.len())),
    }
}

#[test]
fn module_loads_from_json() {
    let text = r#"{
        "name": "demo",
        "types": [{"name": "list", "constructors": [{"functor": {"name": "[]", "arity": 0}}, {"functor": {"name": "[|]", "arity": 2}}]}],
        "preds": [{"name": "empty", "arg_types": ["list"], "procs": [{"modes": ["in"], "det": "semidet"}]}],
        "bodies": [{
            "pred": 0, "proc": 0, "head_vars": [0],
            "var_names": {"0": "L"},
            "var_types": {"0": "list"},
            "body": {"kind": {"unify": {"lhs": 0, "rhs": {"functor": {"cons": {"functor": {"name": "[]", "arity": 0}}, "args": []}}}}}
        }]
    }"#;
    let module = Module::from_json(text).expect("module parses");
    let compiled = compile_module(module, &at_level(2)).expect("module compiles");
    assert!(compiled.reports.is_empty(), "{}", compiled.reports.render_text());
    let empty = compiled.table.lookup_proc("empty/1").expect("lookup");
    let yes = modus_core::run_proc(&compiled.code, &compiled.table, empty, vec![modus_core::parse_term("[]").expect("term")])
        .expect("runs");
    assert_eq!(yes.len(), 1);
    let no = modus_core::run_proc(&compiled.code, &compiled.table, empty, vec![modus_core::parse_term("[a]").expect("term")])
        .expect("runs");
    assert!(no.is_empty());
}

#[test]
fn malformed_json_is_a_load_error() {
    let err = Module::from_json("{\"name\": \"x\", \"preds\": [").expect_err("truncated");
    assert!(err.to_string().contains("malformed module"));
}
