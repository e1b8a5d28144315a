use std::collections::{BTreeMap, BTreeSet};

use crate::goal::kind::{GoalKind, ScopeReason, UnifyKind, UnifyRhs};
use crate::goal::node::Goal;
use crate::goal::var::VarId;

/// Applies a variable substitution to every occurrence in the subtree,
/// annotations included. Variables absent from `map` are left alone.
pub fn rename_goal(goal: &mut Goal, map: &BTreeMap<VarId, VarId>) {
    let r = |v: &mut VarId| {
        if let Some(to) = map.get(v) {
            *v = *to;
        }
    };
    match &mut goal.kind {
        GoalKind::Unify { lhs, rhs, kind } => {
            r(lhs);
            match rhs {
                UnifyRhs::Var(v) => r(v),
                UnifyRhs::Functor { args, .. } | UnifyRhs::Closure { args, .. } => args.iter_mut().for_each(r),
            }
            if let Some(kind) = kind {
                match kind {
                    UnifyKind::Assign { dest, src } => {
                        r(dest);
                        r(src);
                    }
                    UnifyKind::Construct { dest, args, .. } | UnifyKind::MakeClosure { dest, args, .. } => {
                        r(dest);
                        args.iter_mut().for_each(r);
                    }
                    UnifyKind::Deconstruct { src, args, .. } => {
                        r(src);
                        args.iter_mut().for_each(|(v, _)| r(v));
                    }
                    UnifyKind::Test { left, right } => {
                        r(left);
                        r(right);
                    }
                }
            }
        }
        GoalKind::Call { args, .. } | GoalKind::ForeignCall { args, .. } => args.iter_mut().for_each(r),
        GoalKind::HigherOrderCall { closure, args } => {
            r(closure);
            args.iter_mut().for_each(r);
        }
        GoalKind::Scope { reason: ScopeReason::Exists(vars), .. } => vars.iter_mut().for_each(r),
        GoalKind::Switch { var, .. } => r(var),
        _ => {}
    }

    let nonlocals: BTreeSet<VarId> = goal
        .info
        .nonlocals
        .iter()
        .map(|v| map.get(v).copied().unwrap_or(*v))
        .collect();
    goal.info.nonlocals = nonlocals;
    let old_modes = std::mem::take(&mut goal.info.modes);
    for (v, m) in old_modes {
        goal.info.modes.entry(map.get(&v).copied().unwrap_or(v)).or_insert(m);
    }

    for child in goal.children_mut() {
        rename_goal(child, map);
    }
}
