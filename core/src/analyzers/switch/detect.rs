//! file: core/src/analyzers/switch/detect.rs
//! description: rewrites switch-shaped disjunctions and if-then-elses.
use std::collections::{BTreeMap, BTreeSet};

use log::trace;

use crate::analyzers::switch::candidate::{
    closed_constructors, deconstruct_det, mark_leading_test, switch_candidate, SwitchCandidate,
};
use crate::analyzers::switch::err::SwitchWarning;
use crate::error::InternalFault;
use crate::goal::{
    ArgUnify, Case, ConsId, Coverage, Determinism, Goal, GoalId, GoalInfo, GoalKind, Mode, ModuleTable, ProcRef,
    UnifyKind, VarId, VarSet,
};

const ISSUER: &str = "modus.analyzers.switch";

pub(crate) struct SwitchCtx<'a> {
    pub table: &'a ModuleTable,
    pub varset: &'a VarSet,
    pub var_types: &'a BTreeMap<VarId, String>,
    pub proc_ref: ProcRef,
    pub proc_name: String,
    /// Next unused goal id; new goals are numbered past the existing ones.
    pub next_id: u32,
    pub warnings: Vec<SwitchWarning>,
    pub rewritten: usize,
}

impl<'a> SwitchCtx<'a> {
    fn fresh_id(&mut self) -> GoalId {
        let id = GoalId(self.next_id);
        self.next_id += 1;
        id
    }

    fn fault(&self, goal: GoalId, message: String) -> InternalFault {
        InternalFault::new(ISSUER, message).in_proc(self.proc_ref).at_goal(Some(goal))
    }

    pub(crate) fn detect(&mut self, goal: Goal) -> Result<Goal, InternalFault> {
        let Goal { id, kind, info } = goal;
        let kind = match kind {
            GoalKind::Disj(goals) => {
                match switch_candidate(&goals, &info, self.table, self.var_types) {
                    Some(candidate) => {
                        let goals = self.detect_all(goals)?;
                        return self.disj_to_switch(id, info, goals, candidate);
                    }
                    None => GoalKind::Disj(self.detect_all(goals)?),
                }
            }
            GoalKind::IfThenElse { cond, then, els } => {
                let then = Box::new(self.detect(*then)?);
                let els = Box::new(self.detect(*els)?);
                if let Some((var, cons, rest)) = self.ite_switch_test(&cond, &info) {
                    return self.ite_to_switch(id, info, var, cons, rest, *cond, *then, *els);
                }
                let cond = Box::new(self.detect(*cond)?);
                GoalKind::IfThenElse { cond, then, els }
            }
            GoalKind::Conj(goals) => GoalKind::Conj(self.detect_all(goals)?),
            GoalKind::Not(inner) => GoalKind::Not(Box::new(self.detect(*inner)?)),
            GoalKind::Scope { reason, goal: inner } => {
                GoalKind::Scope { reason, goal: Box::new(self.detect(*inner)?) }
            }
            GoalKind::Switch { var, cases, coverage } => {
                let mut out = Vec::with_capacity(cases.len());
                for case in cases {
                    out.push(Case { cons_ids: case.cons_ids, goal: self.detect(case.goal)? });
                }
                GoalKind::Switch { var, cases: out, coverage }
            }
            atomic => atomic,
        };
        Ok(Goal { id, kind, info })
    }

    fn detect_all(&mut self, goals: Vec<Goal>) -> Result<Vec<Goal>, InternalFault> {
        goals.into_iter().map(|g| self.detect(g)).collect()
    }

    fn check_det(&self, id: GoalId, old: Option<Determinism>, new: Determinism) -> Result<(), InternalFault> {
        match old {
            Some(old) if old == new => Ok(()),
            Some(old) => Err(self.fault(id, format!("switch rewrite changed determinism from {} to {}", old, new))),
            None => Err(self.fault(id, "goal has no determinism annotation".into())),
        }
    }

    fn note_coverage(&mut self, id: GoalId, info: &GoalInfo, var: VarId, coverage: &Coverage) {
        if let Coverage::Missing(missing) = coverage {
            self.warnings.push(SwitchWarning {
                goal: id,
                context: info.context.clone(),
                proc_name: self.proc_name.clone(),
                var_name: self.varset.name(var),
                missing: missing.clone(),
            });
        }
    }

    fn disj_to_switch(
        &mut self,
        id: GoalId,
        info: GoalInfo,
        goals: Vec<Goal>,
        candidate: SwitchCandidate,
    ) -> Result<Goal, InternalFault> {
        let SwitchCandidate { var, conses, coverage } = candidate;
        let mut cases = Vec::with_capacity(goals.len());
        let mut det = Determinism::Erroneous;
        for (mut arm, cons) in goals.into_iter().zip(conses) {
            mark_leading_test(&mut arm);
            let arm_det = arm.det().ok_or_else(|| self.fault(arm.id, "switch arm without determinism".into()))?;
            det = det.switch_join(arm_det);
            cases.push(Case { cons_ids: vec![cons], goal: arm });
        }
        if !coverage.is_exhaustive() {
            det = det.with_can_fail();
        }
        self.check_det(id, info.determinism, det)?;
        trace!("switch: disjunction {} on {} becomes a {}-arm switch", id, var, cases.len());
        self.note_coverage(id, &info, var, &coverage);
        self.rewritten += 1;
        Ok(Goal { id, kind: GoalKind::Switch { var, cases, coverage }, info })
    }

    /// An if-then-else whose condition is one constructor test of a bound
    /// variable with a known, finite set of other constructors.
    fn ite_switch_test(&self, cond: &Goal, info: &GoalInfo) -> Option<(VarId, ConsId, Vec<ConsId>)> {
        let UnifyKind::Deconstruct { src, cons, args, can_fail } = cond.unify_kind()? else {
            return None;
        };
        if !*can_fail || args.iter().any(|(_, a)| *a == ArgUnify::Test) || cond.ends_unreachable() {
            return None;
        }
        let entry = &info.modes.get(src)?.initial;
        let all = closed_constructors(self.table, self.var_types, *src, entry)?;
        if !all.contains(cons) {
            return None;
        }
        let rest: Vec<ConsId> = all.into_iter().filter(|c| c != cons).collect();
        if rest.is_empty() {
            return None;
        }
        Some((*src, cons.clone(), rest))
    }

    #[allow(clippy::too_many_arguments)]
    fn ite_to_switch(
        &mut self,
        id: GoalId,
        info: GoalInfo,
        var: VarId,
        cons: ConsId,
        rest: Vec<ConsId>,
        mut cond: Goal,
        then: Goal,
        els: Goal,
    ) -> Result<Goal, InternalFault> {
        mark_leading_test(&mut cond);
        let cond_det = match cond.unify_kind() {
            Some(UnifyKind::Deconstruct { args, .. }) => deconstruct_det(false, args),
            _ => return Err(self.fault(cond.id, "condition is not a deconstruction".into())),
        };
        let then_det = then.det().ok_or_else(|| self.fault(then.id, "goal has no determinism annotation".into()))?;
        let else_det = els.det().ok_or_else(|| self.fault(els.id, "goal has no determinism annotation".into()))?;

        let arm_modes = sequence_modes(&cond.info.modes, &then.info.modes);
        let arm_context = then.info.context.clone();
        let mut arm = Goal::new(GoalKind::Conj(vec![cond, then]));
        arm.id = self.fresh_id();
        arm.info.modes = arm_modes;
        arm.info.context = arm_context;
        arm.info.determinism = Some(cond_det.conjoin(then_det));

        let det = cond_det.conjoin(then_det).switch_join(else_det);
        self.check_det(id, info.determinism, det)?;
        trace!("switch: if-then-else {} on {} becomes a switch", id, var);
        self.rewritten += 1;
        let cases = vec![Case { cons_ids: vec![cons], goal: arm }, Case { cons_ids: rest, goal: els }];
        Ok(Goal { id, kind: GoalKind::Switch { var, cases, coverage: Coverage::Exhaustive }, info })
    }
}

/// Modes of `first` followed by `second`.
fn sequence_modes(first: &BTreeMap<VarId, Mode>, second: &BTreeMap<VarId, Mode>) -> BTreeMap<VarId, Mode> {
    let vars: BTreeSet<VarId> = first.keys().chain(second.keys()).copied().collect();
    vars.into_iter()
        .filter_map(|v| {
            let initial = first.get(&v).or_else(|| second.get(&v))?.initial.clone();
            let final_ = second.get(&v).or_else(|| first.get(&v))?.final_.clone();
            Some((v, Mode::new(initial, final_)))
        })
        .collect()
}
