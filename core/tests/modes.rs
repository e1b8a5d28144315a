mod common;

use common::*;
use modus_core::analyze_modes;
use modus_core::analyzers::{ModeError, ModeErrorKind};
use modus_core::goal::build::*;
use modus_core::goal::{Determinism, GoalKind, Mode, PredDecl, Procedure, UnifyKind};

fn len_decl() -> PredDecl {
    PredDecl::new("len", vec!["list", "nat"], vec![proc_decl(vec![Mode::input(), Mode::output()], Some(Determinism::Det))])
}

fn moded(module: modus_core::Module) -> Result<Procedure, Vec<ModeError>> {
    let (table, proc) = single(module);
    analyze_modes(proc, &table)
}

fn kinds(errs: &[ModeError]) -> Vec<&ModeErrorKind> {
    errs.iter().map(|e| e.kind()).collect()
}

#[test]
fn producer_is_scheduled_before_consumer() {
    // p(L, N) :- N = s(M), len(L, M).
    let module = small_module(
        vec![
            len_decl(),
            PredDecl::new("p", vec!["list", "nat"], vec![proc_decl(vec![Mode::input(), Mode::output()], Some(Determinism::Det))]),
        ],
        vec![body(1, 0, &[0, 1], &[(0, "list")], conj(vec![construct(1, "s", &[2]), call(0, &[0, 2])]))],
    );
    let proc = moded(module).unwrap_or_else(|errs| panic!("mode errors: {:?}", errs));
    let GoalKind::Conj(goals) = &proc.body.kind else {
        panic!("body is not a conjunction: {:?}", proc.body.kind);
    };
    assert!(matches!(goals[0].kind, GoalKind::Call { pred: 0, proc: Some(0), .. }));
    assert!(matches!(goals[1].unify_kind(), Some(UnifyKind::Construct { .. })));
}

#[test]
fn call_picks_the_mode_matching_its_arguments() {
    let app = PredDecl::new(
        "app",
        vec!["list", "list", "list"],
        vec![
            proc_decl(vec![Mode::input(), Mode::input(), Mode::output()], Some(Determinism::Det)),
            proc_decl(vec![Mode::output(), Mode::output(), Mode::input()], Some(Determinism::Multi)),
        ],
    );
    let split = PredDecl::new(
        "split",
        vec!["list", "list", "list"],
        vec![proc_decl(vec![Mode::input(), Mode::output(), Mode::output()], Some(Determinism::Multi))],
    );
    let module = small_module(
        vec![app, split],
        vec![body(1, 0, &[0, 1, 2], &[(0, "list")], call(0, &[1, 2, 0]))],
    );
    let proc = moded(module).unwrap_or_else(|errs| panic!("mode errors: {:?}", errs));
    assert!(matches!(proc.body.kind, GoalKind::Call { pred: 0, proc: Some(1), .. }));
}

#[test]
fn unifying_two_free_variables_is_an_error() {
    let module = small_module(
        vec![PredDecl::new("p", vec!["any"], vec![proc_decl(vec![Mode::output()], Some(Determinism::Det))])],
        vec![body(0, 0, &[0], &[], assign(0, 1))],
    );
    let errs = moded(module).expect_err("free-free unification must be rejected");
    assert!(kinds(&errs).iter().any(|k| matches!(k, ModeErrorKind::FreeFreeUnification { .. })));
}

#[test]
fn blocked_conjunction_reports_only_its_first_goal() {
    // Nothing can produce A, so every conjunct is stuck; only the first is blamed.
    let module = small_module(
        vec![
            len_decl(),
            PredDecl::new("p", vec!["nat"], vec![proc_decl(vec![Mode::output()], Some(Determinism::Det))]),
        ],
        vec![body(1, 0, &[0], &[], conj(vec![call(0, &[1, 2]), call(0, &[2, 3]), assign(0, 3)]))],
    );
    let errs = moded(module).expect_err("unschedulable conjunction");
    assert_eq!(errs.len(), 1, "errors: {:?}", errs);
    assert!(matches!(errs[0].kind(), ModeErrorKind::NoMatchingMode { .. }));
}

#[test]
fn call_matching_none_of_three_modes_is_one_error() {
    let q = PredDecl::new(
        "q",
        vec!["any", "any"],
        vec![
            proc_decl(vec![Mode::input(), Mode::input()], Some(Determinism::Semidet)),
            proc_decl(vec![Mode::input(), Mode::output()], Some(Determinism::Det)),
            proc_decl(vec![Mode::output(), Mode::input()], Some(Determinism::Det)),
        ],
    );
    // p(X) :- q(Y, Z), with neither Y nor Z bound.
    let module = small_module(
        vec![q, PredDecl::new("p", vec!["any"], vec![proc_decl(vec![Mode::input()], Some(Determinism::Semidet))])],
        vec![body(1, 0, &[0], &[], call(0, &[1, 2]))],
    );
    let errs = moded(module).expect_err("no mode accepts two free arguments");
    assert_eq!(errs.len(), 1, "errors: {:?}", errs);
    match errs[0].kind() {
        ModeErrorKind::NoMatchingMode { callee, args } => {
            assert_eq!(callee, "q/2");
            assert_eq!(args.len(), 2);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn two_matching_modes_are_ambiguous() {
    let q = PredDecl::new(
        "q",
        vec!["any"],
        vec![
            proc_decl(vec![Mode::input()], Some(Determinism::Semidet)),
            proc_decl(vec![Mode::input()], Some(Determinism::Det)),
        ],
    );
    let module = small_module(
        vec![q, PredDecl::new("p", vec!["any"], vec![proc_decl(vec![Mode::input()], Some(Determinism::Semidet))])],
        vec![body(1, 0, &[0], &[], call(0, &[0]))],
    );
    let errs = moded(module).expect_err("ambiguous call");
    match errs[0].kind() {
        ModeErrorKind::AmbiguousMode { candidates, .. } => assert_eq!(candidates, &vec![0, 1]),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn negation_may_not_bind_outside_variables() {
    let module = small_module(
        vec![PredDecl::new("p", vec!["any"], vec![proc_decl(vec![Mode::output()], Some(Determinism::Semidet))])],
        vec![body(0, 0, &[0], &[], not(construct(0, "a", &[])))],
    );
    let errs = moded(module).expect_err("binding inside a negation");
    assert!(kinds(&errs).iter().any(|k| matches!(k, ModeErrorKind::BoundInNegation { .. })));
}

#[test]
fn destructive_input_cannot_be_used_again() {
    let consume = PredDecl::new("consume", vec!["any"], vec![proc_decl(vec![Mode::di()], Some(Determinism::Det))]);
    let module = small_module(
        vec![
            consume,
            PredDecl::new("p", vec!["any", "any"], vec![proc_decl(vec![Mode::di(), Mode::output()], Some(Determinism::Det))]),
        ],
        vec![body(1, 0, &[0, 1], &[], conj(vec![call(0, &[0]), assign(1, 0)]))],
    );
    let errs = moded(module).expect_err("use after clobber");
    assert!(kinds(&errs).iter().any(|k| matches!(k, ModeErrorKind::ClobberedUse { .. })));
}

#[test]
fn sample_procedures_are_mode_correct() {
    let (table, procs) = sample_module().into_parts().expect("sample loads");
    for proc in procs {
        let name = table.proc_name(proc.proc_ref);
        if let Err(errs) = analyze_modes(proc, &table) {
            panic!("{} has mode errors: {:?}", name, errs);
        }
    }
}
