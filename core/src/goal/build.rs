//! Shorthand constructors for goal trees, used by front ends that build
//! bodies in code and by tests. Variables are given by number.
use crate::goal::cons::ConsId;
use crate::goal::kind::{GoalKind, PredId, ProcIndex, Purity, ScopeReason, UnifyRhs};
use crate::goal::node::Goal;
use crate::goal::var::VarId;

fn vars(ns: &[u32]) -> Vec<VarId> {
    ns.iter().map(|n| VarId(*n)).collect()
}

/// `A = B`; mode analysis decides which side is produced.
pub fn assign(a: u32, b: u32) -> Goal {
    Goal::new(GoalKind::Unify { lhs: VarId(a), rhs: UnifyRhs::Var(VarId(b)), kind: None })
}

/// `X = name(Args...)`.
pub fn construct(var: u32, name: &str, args: &[u32]) -> Goal {
    unify_cons(var, ConsId::functor(name, args.len()), args)
}

pub fn unify_int(var: u32, value: i64) -> Goal {
    unify_cons(var, ConsId::Int(value), &[])
}

pub fn unify_str(var: u32, value: &str) -> Goal {
    unify_cons(var, ConsId::Str(value.to_string()), &[])
}

pub fn unify_cons(var: u32, cons: ConsId, args: &[u32]) -> Goal {
    Goal::new(GoalKind::Unify {
        lhs: VarId(var),
        rhs: UnifyRhs::Functor { cons, args: vars(args) },
        kind: None,
    })
}

/// `X = closure(pred-proc, Curried...)`.
pub fn closure(var: u32, pred: PredId, proc: ProcIndex, args: &[u32]) -> Goal {
    Goal::new(GoalKind::Unify {
        lhs: VarId(var),
        rhs: UnifyRhs::Closure { pred, proc, args: vars(args) },
        kind: None,
    })
}

pub fn call(pred: PredId, args: &[u32]) -> Goal {
    Goal::new(GoalKind::Call { pred, args: vars(args), proc: None, purity: Purity::Pure })
}

pub fn impure_call(pred: PredId, args: &[u32]) -> Goal {
    Goal::new(GoalKind::Call { pred, args: vars(args), proc: None, purity: Purity::Impure })
}

pub fn foreign(pred: PredId, args: &[u32], code: &str) -> Goal {
    Goal::new(GoalKind::ForeignCall { pred, args: vars(args), code: code.to_string(), proc: None })
}

pub fn ho_call(closure: u32, args: &[u32]) -> Goal {
    Goal::new(GoalKind::HigherOrderCall { closure: VarId(closure), args: vars(args) })
}

pub fn conj(goals: Vec<Goal>) -> Goal {
    Goal::new(GoalKind::Conj(goals))
}

pub fn disj(goals: Vec<Goal>) -> Goal {
    Goal::new(GoalKind::Disj(goals))
}

pub fn not(goal: Goal) -> Goal {
    Goal::new(GoalKind::Not(Box::new(goal)))
}

pub fn ite(cond: Goal, then: Goal, els: Goal) -> Goal {
    Goal::new(GoalKind::IfThenElse { cond: Box::new(cond), then: Box::new(then), els: Box::new(els) })
}

pub fn commit(goal: Goal) -> Goal {
    Goal::new(GoalKind::Scope { reason: ScopeReason::Commit, goal: Box::new(goal) })
}

pub fn exists(locals: &[u32], goal: Goal) -> Goal {
    Goal::new(GoalKind::Scope { reason: ScopeReason::Exists(vars(locals)), goal: Box::new(goal) })
}

/// The goal that always fails.
pub fn fail() -> Goal {
    disj(Vec::new())
}

/// The goal that always succeeds.
pub fn succeed() -> Goal {
    conj(Vec::new())
}
