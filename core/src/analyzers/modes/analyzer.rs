//! file: core/src/analyzers/modes/analyzer.rs
//! description: per-goal mode checking and conjunction scheduling.
use std::collections::{BTreeMap, BTreeSet};

use log::trace;

use crate::analyzers::modes::err::{ModeError, ModeErrorKind};
use crate::analyzers::modes::instmap::InstMap;
use crate::goal::{Case, Goal, GoalId, GoalInfo, GoalKind, Inst, Mode, ModuleTable, Uniqueness, VarId, VarSet};

/// Read-only context for checking one procedure body.
pub(crate) struct ModeCtx<'a> {
    pub table: &'a ModuleTable,
    pub varset: &'a VarSet,
    pub var_types: &'a BTreeMap<VarId, String>,
    pub proc_name: String,
}

impl<'a> ModeCtx<'a> {
    pub(crate) fn error(&self, goal: GoalId, info: &GoalInfo, kind: ModeErrorKind) -> ModeError {
        ModeError::new(kind, goal, info.context.clone(), &self.proc_name, self.varset)
    }

    /// Checks `goal` against `instmap`, leaving the outgoing insts in it.
    pub(crate) fn check_goal(&self, goal: Goal, instmap: &mut InstMap, errors: &mut Vec<ModeError>) -> Goal {
        let before = instmap.clone();
        let atomic = goal.is_atomic();
        let direct = goal.direct_vars();
        let Goal { id, kind, mut info } = goal;

        let kind = match kind {
            GoalKind::Unify { lhs, rhs, .. } => self.check_unify(id, &info, lhs, rhs, instmap, errors),
            GoalKind::Call { pred, args, purity, .. } => {
                let proc = self.check_call(id, &info, pred, &args, instmap, errors);
                GoalKind::Call { pred, args, proc, purity }
            }
            GoalKind::ForeignCall { pred, args, code, .. } => {
                let proc = self.check_call(id, &info, pred, &args, instmap, errors);
                GoalKind::ForeignCall { pred, args, code, proc }
            }
            GoalKind::HigherOrderCall { closure, args } => {
                self.check_ho_call(id, &info, closure, &args, instmap, errors);
                GoalKind::HigherOrderCall { closure, args }
            }
            GoalKind::Conj(goals) => GoalKind::Conj(self.check_conj(goals, instmap, errors)),
            GoalKind::Disj(goals) => {
                let entry = instmap.clone();
                let mut maps = Vec::with_capacity(goals.len());
                let mut out = Vec::with_capacity(goals.len());
                for g in goals {
                    let mut m = entry.clone();
                    out.push(self.check_goal(g, &mut m, errors));
                    maps.push(m);
                }
                self.merge(id, &info, &entry, &maps, None, instmap, errors);
                GoalKind::Disj(out)
            }
            GoalKind::Switch { var, cases, coverage } => {
                let entry = instmap.clone();
                let mut maps = Vec::with_capacity(cases.len());
                let mut out = Vec::with_capacity(cases.len());
                for case in cases {
                    let mut m = entry.clone();
                    let narrowed = entry
                        .lookup(var)
                        .meet(&Inst::bound_any(Uniqueness::Shared, case.cons_ids.iter().cloned()));
                    m.set(var, narrowed);
                    let goal = self.check_goal(case.goal, &mut m, errors);
                    out.push(Case { cons_ids: case.cons_ids, goal });
                    maps.push(m);
                }
                self.merge(id, &info, &entry, &maps, None, instmap, errors);
                GoalKind::Switch { var, cases: out, coverage }
            }
            GoalKind::Not(inner) => {
                let entry = instmap.clone();
                let mut inner_map = entry.clone();
                let inner = self.check_goal(*inner, &mut inner_map, errors);
                if inner_map.is_reachable() {
                    for v in &info.nonlocals {
                        let after = inner_map.lookup(*v);
                        if entry.lookup(*v).is_free() && !after.is_free() {
                            errors.push(self.error(id, &info, ModeErrorKind::BoundInNegation { var: *v, inst: after }));
                        }
                    }
                }
                *instmap = entry;
                GoalKind::Not(Box::new(inner))
            }
            GoalKind::IfThenElse { cond, then, els } => {
                let entry = instmap.clone();
                let mut then_map = entry.clone();
                let cond = self.check_goal(*cond, &mut then_map, errors);
                let cond_map = then_map.clone();
                let then = self.check_goal(*then, &mut then_map, errors);
                let mut else_map = entry.clone();
                let els = self.check_goal(*els, &mut else_map, errors);
                self.merge(id, &info, &entry, &[then_map, else_map], Some(&cond_map), instmap, errors);
                GoalKind::IfThenElse { cond: Box::new(cond), then: Box::new(then), els: Box::new(els) }
            }
            GoalKind::Scope { reason, goal } => {
                GoalKind::Scope { reason, goal: Box::new(self.check_goal(*goal, instmap, errors)) }
            }
        };

        let mut vars: BTreeSet<VarId> = info.nonlocals.clone();
        if atomic {
            vars.extend(direct);
        }
        info.modes = vars
            .into_iter()
            .map(|v| (v, Mode::new(before.lookup(v), instmap.lookup(v))))
            .collect();
        Goal { id, kind, info }
    }

    /// Schedules conjuncts: repeatedly picks the first pending conjunct, in
    /// source order, that checks cleanly. Impure goals are barriers.
    fn check_conj(&self, goals: Vec<Goal>, instmap: &mut InstMap, errors: &mut Vec<ModeError>) -> Vec<Goal> {
        let mut pending = goals;
        let mut scheduled = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            if !instmap.is_reachable() {
                for g in pending.drain(..) {
                    let mut dead = InstMap::unreachable();
                    scheduled.push(self.check_goal(g, &mut dead, &mut Vec::new()));
                }
                break;
            }

            let mut chosen = None;
            let mut blocked = None;
            for (i, g) in pending.iter().enumerate() {
                if i > 0 && (g.is_impure() || pending[i - 1].is_impure()) {
                    break;
                }
                let mut trial = instmap.clone();
                let mut trial_errors = Vec::new();
                let checked = self.check_goal(g.clone(), &mut trial, &mut trial_errors);
                if trial_errors.is_empty() {
                    chosen = Some((i, checked, trial));
                    break;
                }
                if i == 0 {
                    blocked = Some((checked, trial_errors));
                }
            }

            match (chosen, blocked) {
                (Some((i, checked, trial)), _) => {
                    if i > 0 {
                        trace!("{}: scheduled goal {} ahead of {} conjunct(s)", self.proc_name, checked.id, i);
                    }
                    pending.remove(i);
                    scheduled.push(checked);
                    *instmap = trial;
                }
                (None, Some((checked, first_errors))) => {
                    errors.extend(first_errors);
                    pending.remove(0);
                    scheduled.push(checked);
                    instmap.set_unreachable();
                }
                (None, None) => break,
            }
        }
        scheduled
    }

    /// Joins branch results over the goal's non-locals. With `cond` set
    /// (if-then-else), a conflict on a variable the condition bound is
    /// reported as a binding in a negated context.
    #[allow(clippy::too_many_arguments)]
    fn merge(
        &self,
        id: GoalId,
        info: &GoalInfo,
        entry: &InstMap,
        branches: &[InstMap],
        cond: Option<&InstMap>,
        instmap: &mut InstMap,
        errors: &mut Vec<ModeError>,
    ) {
        let (merged, conflicts) = InstMap::merge(entry, branches, &info.nonlocals);
        let failed = !conflicts.is_empty();
        for (var, conflict) in conflicts {
            let bound_by_cond = cond.is_some_and(|c| !c.lookup(var).is_free()) && entry.lookup(var).is_free();
            let kind = if bound_by_cond {
                ModeErrorKind::BoundInNegation { var, inst: cond.map(|c| c.lookup(var)).unwrap_or(Inst::Free) }
            } else {
                ModeErrorKind::MergeConflict { var, conflict }
            };
            errors.push(self.error(id, info, kind));
        }
        *instmap = merged;
        if failed {
            instmap.set_unreachable();
        }
    }
}
