//! file: core/src/transform/excess.rs
//! description: excess assignment elimination.
//!
//! `X = Y` where `X` is local to the enclosing conjunction only copies a
//! value. The unification is dropped and `Y` is used for `X` in the
//! conjuncts that follow.
use std::collections::BTreeMap;

use log::trace;

use crate::goal::{Goal, GoalKind, Procedure, UnifyKind, VarId, rename::rename_goal};

/// Returns the number of assignments removed.
pub fn eliminate_excess_assigns(proc: &mut Procedure) -> usize {
    let removed = eliminate_in(&mut proc.body);
    if removed > 0 {
        proc.requantify();
    }
    removed
}

fn eliminate_in(goal: &mut Goal) -> usize {
    let mut removed = 0;
    for child in goal.children_mut() {
        removed += eliminate_in(child);
    }
    let nonlocals = goal.info.nonlocals.clone();
    let GoalKind::Conj(goals) = &mut goal.kind else {
        return removed;
    };

    let mut i = 0;
    while i < goals.len() {
        let excess = match goals[i].unify_kind() {
            Some(UnifyKind::Assign { dest, src }) if !nonlocals.contains(dest) => Some((*dest, *src)),
            _ => None,
        };
        let Some((dest, src)) = excess else {
            i += 1;
            continue;
        };
        trace!("excess: replacing {} with {}", dest, src);
        goals.remove(i);
        let map: BTreeMap<VarId, VarId> = BTreeMap::from([(dest, src)]);
        for later in goals[i..].iter_mut() {
            rename_goal(later, &map);
        }
        removed += 1;
    }
    removed
}
