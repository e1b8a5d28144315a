//! file: core/src/ir/lower/liveness.rs
//! description: backward liveness over an annotated goal tree.
//!
//! For every goal we record the variables live when it starts and when it
//! succeeds. A variable stays live while any later code, or any code that a
//! failure inside the goal may resume at (later disjuncts, an else branch),
//! still needs it. Deaths are derived from these two sets.
use std::collections::{BTreeSet, HashMap};

use crate::goal::{Goal, GoalId, GoalKind, VarId};

#[derive(Debug, Default, Clone)]
pub struct Liveness {
    before: HashMap<GoalId, BTreeSet<VarId>>,
    after: HashMap<GoalId, BTreeSet<VarId>>,
    /// Variables later disjuncts or an else branch resume with.
    resume: HashMap<GoalId, BTreeSet<VarId>>,
}

impl Liveness {
    /// `outputs` are live at the end of the body.
    pub fn compute(body: &Goal, outputs: &BTreeSet<VarId>) -> Self {
        let mut lv = Liveness::default();
        lv.annotate(body, outputs);
        lv
    }

    pub fn live_before(&self, goal: GoalId) -> Option<&BTreeSet<VarId>> {
        self.before.get(&goal)
    }

    pub fn live_after(&self, goal: GoalId) -> Option<&BTreeSet<VarId>> {
        self.after.get(&goal)
    }

    /// Variables saved for resumption when a failure inside `goal` moves
    /// on to the next alternative.
    pub fn resume_vars(&self, goal: GoalId) -> Option<&BTreeSet<VarId>> {
        self.resume.get(&goal)
    }

    /// Of the variables holding storage when `goal` starts, the ones it and
    /// everything after it never need.
    pub fn pre_deaths<'a>(&self, goal: GoalId, live: impl IntoIterator<Item = &'a VarId>) -> Vec<VarId> {
        match self.before.get(&goal) {
            Some(before) => live.into_iter().filter(|v| !before.contains(v)).copied().collect(),
            None => Vec::new(),
        }
    }

    /// Of the variables holding storage when `goal` finishes, the ones no
    /// later code needs.
    pub fn post_deaths<'a>(&self, goal: GoalId, live: impl IntoIterator<Item = &'a VarId>) -> Vec<VarId> {
        match self.after.get(&goal) {
            Some(after) => live.into_iter().filter(|v| !after.contains(v)).copied().collect(),
            None => Vec::new(),
        }
    }

    fn annotate(&mut self, goal: &Goal, after: &BTreeSet<VarId>) -> BTreeSet<VarId> {
        self.after.insert(goal.id, after.clone());
        match &goal.kind {
            GoalKind::Conj(goals) => {
                let mut cur = after.clone();
                for g in goals.iter().rev() {
                    cur = self.annotate(g, &cur);
                }
            }
            GoalKind::Disj(goals) => {
                let mut later: BTreeSet<VarId> = BTreeSet::new();
                for g in goals.iter().rev() {
                    self.resume.insert(g.id, later.clone());
                    let branch_after: BTreeSet<VarId> = after.union(&later).copied().collect();
                    let before = self.annotate(g, &branch_after);
                    later.extend(before);
                }
            }
            GoalKind::Switch { cases, .. } => {
                for case in cases {
                    self.annotate(&case.goal, after);
                }
            }
            GoalKind::IfThenElse { cond, then, els } => {
                let then_before = self.annotate(then, after);
                let else_before = self.annotate(els, after);
                self.resume.insert(cond.id, else_before.clone());
                let cond_after: BTreeSet<VarId> = then_before.union(&else_before).copied().collect();
                self.annotate(cond, &cond_after);
            }
            GoalKind::Not(inner) => {
                self.resume.insert(inner.id, after.clone());
                self.annotate(inner, after);
            }
            GoalKind::Scope { goal: inner, .. } => {
                self.annotate(inner, after);
            }
            GoalKind::Unify { .. }
            | GoalKind::Call { .. }
            | GoalKind::ForeignCall { .. }
            | GoalKind::HigherOrderCall { .. } => {}
        }

        let outputs = goal.outputs();
        let mut before: BTreeSet<VarId> = after.difference(&outputs).copied().collect();
        for (v, mode) in &goal.info.modes {
            if !mode.initial.is_free() && (goal.info.nonlocals.contains(v) || goal.is_atomic()) {
                before.insert(*v);
            }
        }
        self.before.insert(goal.id, before.clone());
        before
    }
}
