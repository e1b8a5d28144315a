mod common;

use common::*;
use modus_core::analyzers::{DetError, DetErrorKind, DetOutcome};
use modus_core::goal::build::*;
use modus_core::goal::{Determinism, Goal, Mode, PredDecl};
use modus_core::{analyze_determinism, analyze_modes};

/// Mode-checks and determinism-checks `p`, declared with `modes` and `det`,
/// alongside a nondet `member(out, in)` as predicate 0.
fn check(modes: Vec<Mode>, det: Determinism, typed: &[(u32, &str)], goal: Goal) -> Result<DetOutcome, Vec<DetError>> {
    let member = PredDecl::new(
        "member",
        vec!["any", "list"],
        vec![proc_decl(vec![Mode::output(), Mode::input()], Some(Determinism::Nondet))],
    );
    let arity = modes.len();
    let head: Vec<u32> = (0..arity as u32).collect();
    let p = PredDecl::new("p", vec!["any"; arity], vec![proc_decl(modes, Some(det))]);
    let module = small_module(vec![member, p], vec![body(1, 0, &head, typed, goal)]);
    let (table, proc) = single(module);
    let proc = analyze_modes(proc, &table).unwrap_or_else(|errs| panic!("mode errors: {:?}", errs));
    analyze_determinism(proc, &table).expect("no internal fault")
}

#[test]
fn det_procedure_with_failing_test_names_the_test() {
    let result = check(
        vec![Mode::input(), Mode::output()],
        Determinism::Det,
        &[(0, "color")],
        conj(vec![construct(0, "red", &[]), construct(1, "a", &[])]),
    );
    let errs = result.expect_err("a colour test can fail");
    match errs[0].kind() {
        DetErrorKind::CanFail { declared, inferred, causes } => {
            assert_eq!(*declared, Determinism::Det);
            assert_eq!(*inferred, Determinism::Semidet);
            assert!(!causes.is_empty(), "expected the failing test as a cause");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn det_procedure_with_two_solutions_is_rejected() {
    let result = check(
        vec![Mode::output()],
        Determinism::Det,
        &[],
        disj(vec![construct(0, "a", &[]), construct(0, "b", &[])]),
    );
    let errs = result.expect_err("two solutions");
    assert!(errs.iter().any(|e| matches!(
        e.kind(),
        DetErrorKind::MultipleSolutions { inferred: Determinism::Multi, .. }
    )));
}

#[test]
fn nondet_condition_is_an_error() {
    // p(L, X) :- ( member(Y, L) -> X = Y ; X = none ).
    let result = check(
        vec![Mode::input(), Mode::output()],
        Determinism::Det,
        &[(0, "list")],
        ite(call(0, &[2, 0]), assign(1, 2), construct(1, "none", &[])),
    );
    let errs = result.expect_err("nondet condition");
    assert!(errs.iter().any(|e| matches!(e.kind(), DetErrorKind::NondetCondition { .. })));
}

#[test]
fn condition_that_cannot_fail_is_a_warning() {
    let outcome = check(
        vec![Mode::output()],
        Determinism::Det,
        &[],
        ite(construct(1, "a", &[]), construct(0, "b", &[]), construct(0, "c", &[])),
    )
    .unwrap_or_else(|errs| panic!("determinism errors: {:?}", errs));
    assert!(outcome.warnings.iter().any(|w| matches!(w.kind(), DetErrorKind::CondCannotFail)));
}

#[test]
fn goal_after_failure_is_unreachable() {
    let outcome = check(
        vec![Mode::output()],
        Determinism::Failure,
        &[],
        conj(vec![fail(), construct(0, "a", &[])]),
    )
    .unwrap_or_else(|errs| panic!("determinism errors: {:?}", errs));
    assert_eq!(outcome.proc.inferred_det, Some(Determinism::Failure));
    let unreachable: Vec<_> =
        outcome.warnings.iter().filter(|w| matches!(w.kind(), DetErrorKind::UnreachableCode)).collect();
    assert_eq!(unreachable.len(), 1);
}

#[test]
fn looser_declaration_is_noted() {
    let outcome = check(vec![Mode::input(), Mode::output()], Determinism::Semidet, &[], construct(1, "a", &[]))
        .unwrap_or_else(|errs| panic!("determinism errors: {:?}", errs));
    assert!(outcome.warnings.iter().any(|w| matches!(
        w.kind(),
        DetErrorKind::TighterThanDeclared { declared: Determinism::Semidet, inferred: Determinism::Det }
    )));
}

#[test]
fn erroneous_declaration_with_a_solution_is_rejected() {
    let result = check(vec![Mode::output()], Determinism::Erroneous, &[], construct(0, "a", &[]));
    let errs = result.expect_err("procedure succeeds");
    assert!(errs.iter().any(|e| matches!(e.kind(), DetErrorKind::NotErroneous { .. })));
}

#[test]
fn switch_shaped_disjunction_is_det_before_rewriting() {
    let (table, proc) = single(only(LEN));
    let proc = analyze_modes(proc, &table).unwrap_or_else(|errs| panic!("mode errors: {:?}", errs));
    let outcome = analyze_determinism(proc, &table)
        .expect("no internal fault")
        .unwrap_or_else(|errs| panic!("determinism errors: {:?}", errs));
    assert_eq!(outcome.proc.inferred_det, Some(Determinism::Det));
    assert!(outcome.warnings.is_empty());
}

#[test]
fn committed_choice_caps_solutions() {
    let (table, proc) = single(only(FIRST));
    let proc = analyze_modes(proc, &table).unwrap_or_else(|errs| panic!("mode errors: {:?}", errs));
    let outcome = analyze_determinism(proc, &table)
        .expect("no internal fault")
        .unwrap_or_else(|errs| panic!("determinism errors: {:?}", errs));
    assert_eq!(outcome.proc.inferred_det, Some(Determinism::Semidet));
}

#[test]
fn unmoded_body_is_an_internal_fault() {
    let (table, proc) = single(only(LEN));
    let fault = analyze_determinism(proc, &table).expect_err("body was never mode-checked");
    assert!(fault.to_string().contains("mode annotation"), "{}", fault);
}
