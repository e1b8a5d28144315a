// Shared fixtures for the integration tests: a sample module built with the
// goal-tree shorthand, plus helpers to compile and run it.
#![allow(dead_code)]

use std::collections::BTreeMap;

use modus_core::goal::build::*;
use modus_core::goal::{
    ConsId, Determinism, Goal, Mode, Module, ModuleTable, PredDecl, ProcBody, ProcDecl, ProcRef, Procedure,
    TypeDefn, VarId,
};
use modus_core::ir::ModuleCode;
use modus_core::{compile_module, run_proc, OptTuple, Value};

pub const LEN: usize = 0;
pub const APP: usize = 1;
pub const MEMBER: usize = 2;
pub const IS_RED: usize = 3;
pub const FLIP: usize = 4;
pub const TURN: usize = 5;
pub const DRAIN: usize = 6;
pub const MK: usize = 7;
pub const WRAP: usize = 8;
pub const APPLY_MK: usize = 9;
pub const WRAPF: usize = 10;
pub const APPLY_WRAPF: usize = 11;
pub const FIRST: usize = 12;
pub const NOT_RED: usize = 13;
pub const ABSENT: usize = 14;
pub const COUNT: usize = 15;
pub const USE_MK: usize = 16;

pub fn nil() -> ConsId {
    ConsId::atom("[]")
}

pub fn cons() -> ConsId {
    ConsId::functor("[|]", 2)
}

pub fn types() -> Vec<TypeDefn> {
    vec![
        TypeDefn::new("list", vec![cons(), nil()]),
        TypeDefn::new("color", vec![ConsId::atom("red"), ConsId::atom("green"), ConsId::atom("blue")]),
        TypeDefn::new(
            "dir",
            vec![ConsId::atom("north"), ConsId::atom("east"), ConsId::atom("south"), ConsId::atom("west")],
        ),
    ]
}

pub fn proc_decl(modes: Vec<Mode>, det: Option<Determinism>) -> ProcDecl {
    ProcDecl::new(modes, det)
}

pub fn body(pred: usize, proc: usize, head: &[u32], typed: &[(u32, &str)], goal: Goal) -> ProcBody {
    ProcBody {
        pred,
        proc,
        head_vars: head.iter().map(|v| VarId(*v)).collect(),
        var_names: BTreeMap::new(),
        var_types: typed.iter().map(|(v, t)| (VarId(*v), t.to_string())).collect(),
        body: goal,
    }
}

/// `len(L, N)`: N is the length of L in successor notation.
fn len_body(pred: usize) -> Goal {
    disj(vec![
        conj(vec![unify_cons(0, nil(), &[]), construct(1, "z", &[])]),
        conj(vec![unify_cons(0, cons(), &[2, 3]), call(pred, &[3, 4]), construct(1, "s", &[4])]),
    ])
}

pub fn sample_module() -> Module {
    use Determinism::*;
    let i = Mode::input;
    let o = Mode::output;
    let preds = vec![
        PredDecl::new("len", vec!["list", "nat"], vec![proc_decl(vec![i(), o()], Some(Det))]),
        PredDecl::new(
            "app",
            vec!["list", "list", "list"],
            vec![proc_decl(vec![i(), i(), o()], Some(Det)), proc_decl(vec![o(), o(), i()], Some(Multi))],
        ),
        PredDecl::new("member", vec!["any", "list"], vec![proc_decl(vec![o(), i()], Some(Nondet))]),
        PredDecl::new("is_red", vec!["color"], vec![proc_decl(vec![i()], Some(Semidet))]),
        PredDecl::new("flip", vec!["color", "color"], vec![proc_decl(vec![i(), o()], Some(Det))]),
        PredDecl::new("turn", vec!["dir", "dir"], vec![proc_decl(vec![i(), o()], Some(Det))]),
        PredDecl::new("drain", vec!["list"], vec![proc_decl(vec![i()], Some(Det))]),
        PredDecl::new("mk", vec!["any"], vec![proc_decl(vec![o()], Some(Det))]),
        PredDecl::new("wrap", vec!["any"], vec![proc_decl(vec![o()], Some(Det))]),
        PredDecl::new("apply_mk", vec!["any"], vec![proc_decl(vec![o()], Some(Det))]),
        PredDecl::new("wrapf", vec!["any", "any"], vec![proc_decl(vec![i(), o()], Some(Det))]),
        PredDecl::new("apply_wrapf", vec!["any", "any"], vec![proc_decl(vec![i(), o()], Some(Det))]),
        PredDecl::new("first", vec!["list", "any"], vec![proc_decl(vec![i(), o()], Some(Semidet))]),
        PredDecl::new("not_red", vec!["color"], vec![proc_decl(vec![i()], Some(Semidet))]),
        PredDecl::new("absent", vec!["any", "list"], vec![proc_decl(vec![i(), i()], Some(Semidet))]),
        PredDecl::new("count", vec!["list", "nat"], vec![proc_decl(vec![i(), o()], None)]),
        PredDecl::new("use_mk", vec!["any"], vec![proc_decl(vec![o()], Some(Det))]),
    ];

    let bodies = vec![
        body(LEN, 0, &[0, 1], &[(0, "list"), (3, "list")], len_body(LEN)),
        // app(in, in, out)
        body(
            APP,
            0,
            &[0, 1, 2],
            &[(0, "list"), (1, "list"), (2, "list")],
            disj(vec![
                conj(vec![unify_cons(0, nil(), &[]), assign(2, 1)]),
                conj(vec![unify_cons(0, cons(), &[3, 4]), call(APP, &[4, 1, 5]), unify_cons(2, cons(), &[3, 5])]),
            ]),
        ),
        // app(out, out, in)
        body(
            APP,
            1,
            &[0, 1, 2],
            &[(0, "list"), (1, "list"), (2, "list")],
            disj(vec![
                conj(vec![unify_cons(0, nil(), &[]), assign(1, 2)]),
                conj(vec![unify_cons(2, cons(), &[3, 5]), call(APP, &[4, 1, 5]), unify_cons(0, cons(), &[3, 4])]),
            ]),
        ),
        body(
            MEMBER,
            0,
            &[0, 1],
            &[(1, "list")],
            disj(vec![
                unify_cons(1, cons(), &[0, 2]),
                conj(vec![unify_cons(1, cons(), &[3, 4]), call(MEMBER, &[0, 4])]),
            ]),
        ),
        body(IS_RED, 0, &[0], &[(0, "color")], construct(0, "red", &[])),
        body(
            FLIP,
            0,
            &[0, 1],
            &[(0, "color"), (1, "color")],
            ite(construct(0, "red", &[]), construct(1, "blue", &[]), construct(1, "red", &[])),
        ),
        body(
            TURN,
            0,
            &[0, 1],
            &[(0, "dir"), (1, "dir")],
            disj(vec![
                conj(vec![construct(0, "north", &[]), construct(1, "east", &[])]),
                conj(vec![construct(0, "east", &[]), construct(1, "south", &[])]),
                conj(vec![construct(0, "south", &[]), construct(1, "west", &[])]),
                conj(vec![construct(0, "west", &[]), construct(1, "north", &[])]),
            ]),
        ),
        body(
            DRAIN,
            0,
            &[0],
            &[(0, "list"), (2, "list")],
            disj(vec![unify_cons(0, nil(), &[]), conj(vec![unify_cons(0, cons(), &[1, 2]), call(DRAIN, &[2])])]),
        ),
        body(MK, 0, &[0], &[], construct(0, "a", &[])),
        // wrap(W) :- A = a, B = A, W = f(B).
        body(WRAP, 0, &[0], &[], conj(vec![construct(1, "a", &[]), assign(2, 1), construct(0, "f", &[2])])),
        body(APPLY_MK, 0, &[0], &[], conj(vec![closure(1, MK, 0, &[]), ho_call(1, &[0])])),
        body(WRAPF, 0, &[0, 1], &[], construct(1, "f", &[0])),
        body(APPLY_WRAPF, 0, &[0, 1], &[], conj(vec![closure(2, WRAPF, 0, &[0]), ho_call(2, &[1])])),
        body(FIRST, 0, &[0, 1], &[(0, "list")], commit(call(MEMBER, &[1, 0]))),
        body(NOT_RED, 0, &[0], &[(0, "color")], not(construct(0, "red", &[]))),
        // absent(X, L) :- not (member(Y, L), Y = X).
        body(ABSENT, 0, &[0, 1], &[(1, "list")], not(conj(vec![call(MEMBER, &[2, 1]), assign(2, 0)]))),
        body(COUNT, 0, &[0, 1], &[(0, "list"), (3, "list")], len_body(COUNT)),
        // use_mk(W) :- mk(A), W = g(A).
        body(USE_MK, 0, &[0], &[], conj(vec![call(MK, &[1]), construct(0, "g", &[1])])),
    ];

    Module { name: "sample".into(), types: types(), preds, bodies }
}

/// A module over the sample types with the given declarations and bodies.
pub fn small_module(preds: Vec<PredDecl>, bodies: Vec<ProcBody>) -> Module {
    Module { name: "t".into(), types: types(), preds, bodies }
}

/// The sample module cut down to the bodies of `pred`.
pub fn only(pred: usize) -> Module {
    let mut module = sample_module();
    module.bodies.retain(|b| b.pred == pred);
    module
}

/// One procedure body of a single-procedure module, ready for analysis.
pub fn single(module: Module) -> (ModuleTable, Procedure) {
    let (table, mut procs) = module.into_parts().expect("module loads");
    assert_eq!(procs.len(), 1, "expected exactly one body");
    let proc = procs.remove(0);
    (table, proc)
}

pub fn compile(opts: &OptTuple) -> (ModuleTable, ModuleCode) {
    let compiled = compile_module(sample_module(), opts).expect("sample compiles");
    assert!(!compiled.reports.has_errors(), "unexpected errors:\n{}", compiled.reports.render_text());
    (compiled.table, compiled.code)
}

/// Compiles a module that must load and check cleanly.
pub fn compile_small(module: Module, opts: &OptTuple) -> (ModuleTable, ModuleCode) {
    let compiled = compile_module(module, opts).expect("module compiles");
    assert!(!compiled.reports.has_errors(), "unexpected errors:\n{}", compiled.reports.render_text());
    (compiled.table, compiled.code)
}

/// `member(X, L)` for a module where it is predicate `pred`.
pub fn member_body(pred: usize) -> ProcBody {
    body(
        pred,
        0,
        &[0, 1],
        &[(1, "list")],
        disj(vec![unify_cons(1, cons(), &[0, 2]), conj(vec![unify_cons(1, cons(), &[3, 4]), call(pred, &[0, 4])])]),
    )
}

pub fn member_decl() -> PredDecl {
    PredDecl::new("member", vec!["any", "list"], vec![proc_decl(vec![Mode::output(), Mode::input()], Some(Determinism::Nondet))])
}

/// `L = [a, b]` using `first` and the three variables after it as
/// scratch.
pub fn ab_list(list: u32, first: u32) -> Goal {
    let (a, b, nil_var, tail) = (first, first + 1, first + 2, first + 3);
    conj(vec![
        construct(a, "a", &[]),
        construct(b, "b", &[]),
        unify_cons(nil_var, nil(), &[]),
        unify_cons(tail, cons(), &[b, nil_var]),
        unify_cons(list, cons(), &[a, tail]),
    ])
}

pub fn at_level(level: u8) -> OptTuple {
    OptTuple::from_level(level).expect("valid level")
}

pub fn run(table: &ModuleTable, code: &ModuleCode, pred: usize, proc: usize, inputs: &[&str]) -> Vec<String> {
    let inputs: Vec<Value> = inputs.iter().map(|t| modus_core::parse_term(t).expect("term parses")).collect();
    let solutions = run_proc(code, table, ProcRef::new(pred, proc), inputs).expect("procedure runs");
    solutions
        .into_iter()
        .map(|s| s.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "))
        .collect()
}
