//! file: core/src/goal/quantify.rs
//! description: non-local variable sets.
//!
//! A variable is non-local to a goal when it occurs both inside the goal and
//! somewhere outside it in the procedure (the head counts as outside).
use std::collections::BTreeSet;

use crate::goal::kind::{GoalKind, ScopeReason};
use crate::goal::node::Goal;
use crate::goal::var::VarId;

/// Recomputes the non-locals of every goal in a procedure body.
pub fn quantify_body(head_vars: &[VarId], body: &mut Goal) {
    let outside: BTreeSet<VarId> = head_vars.iter().copied().collect();
    quantify(body, &outside);
}

fn quantify(goal: &mut Goal, outside: &BTreeSet<VarId>) {
    let mut nonlocals: BTreeSet<VarId> = goal.vars().intersection(outside).copied().collect();
    match &mut goal.kind {
        GoalKind::Conj(goals) => {
            let vars: Vec<BTreeSet<VarId>> = goals.iter().map(Goal::vars).collect();
            for (i, g) in goals.iter_mut().enumerate() {
                let mut out = outside.clone();
                for (j, v) in vars.iter().enumerate() {
                    if i != j {
                        out.extend(v.iter().copied());
                    }
                }
                quantify(g, &out);
            }
        }
        GoalKind::Disj(goals) => {
            for g in goals.iter_mut() {
                quantify(g, outside);
            }
        }
        GoalKind::Not(inner) => quantify(inner, outside),
        GoalKind::IfThenElse { cond, then, els } => {
            let mut cond_out = outside.clone();
            cond_out.extend(then.vars());
            let mut then_out = outside.clone();
            then_out.extend(cond.vars());
            quantify(cond, &cond_out);
            quantify(then, &then_out);
            quantify(els, outside);
        }
        GoalKind::Scope { reason, goal: inner } => {
            let mut out = outside.clone();
            if let ScopeReason::Exists(locals) = reason {
                for v in locals.iter() {
                    out.remove(v);
                    nonlocals.remove(v);
                }
            }
            quantify(inner, &out);
        }
        GoalKind::Switch { var, cases, .. } => {
            let mut out = outside.clone();
            out.insert(*var);
            for case in cases.iter_mut() {
                quantify(&mut case.goal, &out);
            }
        }
        GoalKind::Unify { .. }
        | GoalKind::Call { .. }
        | GoalKind::ForeignCall { .. }
        | GoalKind::HigherOrderCall { .. } => {}
    }
    goal.info.nonlocals = nonlocals;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::build::*;

    #[test]
    fn locals_of_a_conjunction_are_not_nonlocal() {
        // p(X, Y) :- Z = f(X), q(Z, Y).
        let mut body = conj(vec![construct(2, "f", &[0]), call(1, &[2, 1])]);
        quantify_body(&[VarId(0), VarId(1)], &mut body);
        assert_eq!(body.info.nonlocals, BTreeSet::from([VarId(0), VarId(1)]));
        let GoalKind::Conj(goals) = &body.kind else { panic!("not a conjunction") };
        assert_eq!(goals[0].info.nonlocals, BTreeSet::from([VarId(0), VarId(2)]));
        assert_eq!(goals[1].info.nonlocals, BTreeSet::from([VarId(1), VarId(2)]));
    }

    #[test]
    fn disjunct_locals_stay_inside_the_branch() {
        // p(X) :- (Y = a, X = Y ; X = b).
        let mut body = disj(vec![
            conj(vec![construct(1, "a", &[]), assign(0, 1)]),
            construct(0, "b", &[]),
        ]);
        quantify_body(&[VarId(0)], &mut body);
        let GoalKind::Disj(branches) = &body.kind else { panic!("not a disjunction") };
        assert_eq!(branches[0].info.nonlocals, BTreeSet::from([VarId(0)]));
    }
}
