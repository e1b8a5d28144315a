mod common;

use common::*;
use modus_core::goal::build::*;
use modus_core::goal::{Determinism, Mode, Module, ModuleTable, PredDecl};
use modus_core::ir::{check_storage, ModuleCode};
use modus_core::OptTuple;

/// (predicate, procedure, inputs, expected solutions in order)
type Query = (usize, usize, &'static [&'static str], &'static [&'static str]);

const QUERIES: &[Query] = &[
    (LEN, 0, &["[a, b, c]"], &["s(s(s(z)))"]),
    (LEN, 0, &["[]"], &["z"]),
    (COUNT, 0, &["[x, y]"], &["s(s(z))"]),
    (APP, 0, &["[1]", "[2, 3]"], &["[1, 2, 3]"]),
    (APP, 1, &["[1, 2]"], &["[], [1, 2]", "[1], [2]", "[1, 2], []"]),
    (MEMBER, 0, &["[a, b, c]"], &["a", "b", "c"]),
    (MEMBER, 0, &["[]"], &[]),
    (IS_RED, 0, &["red"], &[""]),
    (IS_RED, 0, &["blue"], &[]),
    (FLIP, 0, &["red"], &["blue"]),
    (FLIP, 0, &["green"], &["red"]),
    (TURN, 0, &["north"], &["east"]),
    (TURN, 0, &["west"], &["north"]),
    (DRAIN, 0, &["[a, b, c]"], &[""]),
    (MK, 0, &[], &["a"]),
    (WRAP, 0, &[], &["f(a)"]),
    (APPLY_MK, 0, &[], &["a"]),
    (APPLY_WRAPF, 0, &["x"], &["f(x)"]),
    (FIRST, 0, &["[a, b]"], &["a"]),
    (FIRST, 0, &["[]"], &[]),
    (NOT_RED, 0, &["blue"], &[""]),
    (NOT_RED, 0, &["red"], &[]),
    (ABSENT, 0, &["c", "[a, b]"], &[""]),
    (ABSENT, 0, &["a", "[a, b]"], &[]),
    (USE_MK, 0, &[], &["g(a)"]),
];

fn check_all(table: &ModuleTable, code: &ModuleCode, label: &str) {
    for (pred, proc, inputs, expected) in QUERIES {
        let got = run(table, code, *pred, *proc, inputs);
        let name = table.proc_name(modus_core::ProcRef::new(*pred, *proc));
        assert_eq!(got, expected.to_vec(), "{} on {:?} under {}", name, inputs, label);
    }
}

#[test]
fn every_level_computes_the_same_answers() {
    for level in 0..=6 {
        let (table, code) = compile(&at_level(level));
        check_all(&table, &code, &format!("-O{}", level));
    }
}

#[test]
fn each_pass_alone_keeps_the_answers() {
    let passes = [
        "peephole",
        "jumps",
        "labels",
        "dupelim",
        "excess-assign",
        "inline",
        "tailcall-loops",
        "licm",
        "jump-tables",
    ];
    for pass in passes {
        let opts = OptTuple::from_args(0, &[pass]).expect("valid override");
        let (table, code) = compile(&opts);
        check_all(&table, &code, pass);
    }
}

#[test]
fn each_pass_removed_keeps_the_answers() {
    let passes = ["no-peephole", "no-jumps", "no-labels", "no-dupelim", "no-licm", "no-tailcall-loops"];
    for pass in passes {
        let opts = OptTuple::from_args(6, &[pass]).expect("valid override");
        let (table, code) = compile(&opts);
        check_all(&table, &code, pass);
    }
}

#[test]
fn aggressive_thresholds_keep_the_answers() {
    let opts = OptTuple::from_args(
        6,
        &["inline-simple-threshold=100", "inline-compound-threshold=100", "jump-table-min-cases=2", "repeat=10"],
    )
    .expect("valid override");
    let (table, code) = compile(&opts);
    check_all(&table, &code, "aggressive");
}

#[test]
fn wrong_input_count_is_a_runtime_error() {
    let (table, code) = compile(&at_level(2));
    let err = modus_core::run_proc(&code, &table, modus_core::ProcRef::new(LEN, 0), Vec::new())
        .expect_err("len needs its list");
    assert!(err.to_string().contains("input"));
}

fn option_sets() -> Vec<(String, OptTuple)> {
    let mut sets: Vec<(String, OptTuple)> = (0..=6).map(|l| (format!("-O{}", l), at_level(l))).collect();
    let tables = OptTuple::from_args(6, &["jump-table-min-cases=2"]).expect("valid override");
    sets.push(("jump tables".to_string(), tables));
    let no_inline = OptTuple::from_args(6, &["no-inline"]).expect("valid override");
    sets.push(("no inlining".to_string(), no_inline));
    sets
}

fn assert_storage_ok(code: &ModuleCode, label: &str) {
    for proc in &code.procs {
        if let Err(fault) = check_storage(proc) {
            panic!("{} under {}: {}", proc.name, label, fault);
        }
    }
}

/// `t/2` leaves `member` choice points behind in a disjunct that then
/// fails; `v/1` backtracks across a call to it.
fn failed_branch_module() -> Module {
    use Determinism::*;
    let (i, o) = (Mode::input, Mode::output);
    let preds = vec![
        member_decl(),
        PredDecl::new("is_red", vec!["color"], vec![proc_decl(vec![i()], Some(Semidet))]),
        PredDecl::new("t", vec!["color", "any"], vec![proc_decl(vec![i(), o()], Some(Det))]),
        PredDecl::new("v", vec!["any"], vec![proc_decl(vec![o()], Some(Multi))]),
    ];
    // t(C, R) :- ( L = [a, b], (is_red(C) -> member(Z, L) ; Z = x), fail ; true ), R = done.
    let t = conj(vec![
        disj(vec![
            conj(vec![ab_list(2, 4), ite(call(1, &[0]), call(0, &[3, 2]), construct(3, "x", &[])), fail()]),
            succeed(),
        ]),
        construct(1, "done", &[]),
    ]);
    // v(R) :- (R = one ; R = two), C = red, t(C, _).
    let v = conj(vec![
        disj(vec![construct(0, "one", &[]), construct(0, "two", &[])]),
        construct(1, "red", &[]),
        call(2, &[1, 2]),
    ]);
    small_module(
        preds,
        vec![
            member_body(0),
            body(1, 0, &[0], &[(0, "color")], construct(0, "red", &[])),
            body(2, 0, &[0, 1], &[(0, "color"), (2, "list"), (6, "list"), (7, "list")], t),
            body(3, 0, &[0], &[(1, "color")], v),
        ],
    )
}

/// `p/1` is a switch with a missing colour whose `red` arm fails after
/// calling `member`; `q/2` tests it in a condition.
fn switch_condition_module() -> Module {
    use Determinism::*;
    let (i, o) = (Mode::input, Mode::output);
    let preds = vec![
        member_decl(),
        PredDecl::new("p", vec!["color"], vec![proc_decl(vec![i()], Some(Semidet))]),
        PredDecl::new("q", vec!["color", "any"], vec![proc_decl(vec![i(), o()], Some(Det))]),
    ];
    // p(C) :- ( C = red, L = [a, b], member(_, L), fail ; C = green ).
    let p = disj(vec![
        conj(vec![construct(0, "red", &[]), ab_list(1, 3), call(0, &[2, 1]), fail()]),
        conj(vec![construct(0, "green", &[])]),
    ]);
    // q(C, R) :- ( p(C) -> R = yes ; R = no ).
    let q = ite(call(1, &[0]), construct(1, "yes", &[]), construct(1, "no", &[]));
    small_module(
        preds,
        vec![
            member_body(0),
            body(1, 0, &[0], &[(0, "color"), (1, "list"), (5, "list"), (6, "list")], p),
            body(2, 0, &[0, 1], &[(0, "color")], q),
        ],
    )
}

#[test]
fn choice_points_of_a_failed_disjunct_are_gone() {
    for (label, opts) in option_sets() {
        let (table, code) = compile_small(failed_branch_module(), &opts);
        assert_storage_ok(&code, &label);
        assert_eq!(run(&table, &code, 3, 0, &[]), vec!["one", "two"], "v/1 under {}", label);
        assert_eq!(run(&table, &code, 2, 0, &["red"]), vec!["done"], "t/2 under {}", label);
        assert_eq!(run(&table, &code, 2, 0, &["blue"]), vec!["done"], "t/2 under {}", label);
    }
}

#[test]
fn every_switch_arm_fails_to_the_enclosing_condition() {
    for (label, opts) in option_sets() {
        let (table, code) = compile_small(switch_condition_module(), &opts);
        assert_storage_ok(&code, &label);
        for (colour, answer) in [("red", "no"), ("green", "yes"), ("blue", "no")] {
            assert_eq!(run(&table, &code, 2, 0, &[colour]), vec![answer], "q({}) under {}", colour, label);
        }
        assert_eq!(run(&table, &code, 1, 0, &["blue"]), Vec::<String>::new(), "p(blue) under {}", label);
        assert_eq!(run(&table, &code, 1, 0, &["green"]), vec![""], "p(green) under {}", label);
    }
}

#[test]
fn sample_code_keeps_saved_slots_intact() {
    for (label, opts) in option_sets() {
        let (_, code) = compile(&opts);
        assert_storage_ok(&code, &label);
    }
}
