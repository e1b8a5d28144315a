//! Recognition of disjunctions that are really switches. Shared by the
//! determinism analyzer (which must already treat such a disjunction as a
//! switch) and the switch detector (which rewrites it).
use std::collections::BTreeMap;

use crate::goal::{
    ArgUnify, ConsId, Coverage, Determinism, Goal, GoalInfo, GoalKind, Inst, ModuleTable, UnifyKind, VarId,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SwitchCandidate {
    pub var: VarId,
    /// Constructor tested by each disjunct, in order.
    pub conses: Vec<ConsId>,
    pub coverage: Coverage,
}

/// The deconstruction a goal starts with, looking through conjunctions.
pub(crate) fn leading_test(goal: &Goal) -> Option<(VarId, &ConsId)> {
    match &goal.kind {
        GoalKind::Unify { kind: Some(UnifyKind::Deconstruct { src, cons, .. }), .. } => Some((*src, cons)),
        GoalKind::Conj(goals) => goals.first().and_then(leading_test),
        _ => None,
    }
}

/// The complete constructor set a bound variable can have, if finite.
pub(crate) fn closed_constructors(
    table: &ModuleTable,
    var_types: &BTreeMap<VarId, String>,
    var: VarId,
    inst: &Inst,
) -> Option<Vec<ConsId>> {
    match inst {
        Inst::Bound(_, functors) => Some(functors.iter().map(|f| f.cons.clone()).collect()),
        Inst::Ground(..) => var_types
            .get(&var)
            .and_then(|ty| table.constructors_of(ty))
            .map(|cs| cs.to_vec()),
        Inst::Free | Inst::NotReached => None,
    }
}

pub(crate) fn coverage_of(closed: Option<Vec<ConsId>>, covered: &[ConsId]) -> Coverage {
    match closed {
        None => Coverage::Open,
        Some(all) => {
            let missing: Vec<ConsId> = all.into_iter().filter(|c| !covered.contains(c)).collect();
            if missing.is_empty() { Coverage::Exhaustive } else { Coverage::Missing(missing) }
        }
    }
}

/// A disjunction is a switch when every disjunct starts by deconstructing
/// the same variable, bound on entry, against pairwise distinct
/// constructors.
pub(crate) fn switch_candidate(
    disjuncts: &[Goal],
    info: &GoalInfo,
    table: &ModuleTable,
    var_types: &BTreeMap<VarId, String>,
) -> Option<SwitchCandidate> {
    if disjuncts.len() < 2 {
        return None;
    }
    let mut var = None;
    let mut conses: Vec<ConsId> = Vec::with_capacity(disjuncts.len());
    for d in disjuncts {
        let (v, cons) = leading_test(d)?;
        if var.is_some_and(|w| w != v) || conses.contains(cons) {
            return None;
        }
        var = Some(v);
        conses.push(cons.clone());
    }
    let var = var?;
    let entry = &info.modes.get(&var)?.initial;
    if entry.is_free() {
        return None;
    }
    let coverage = coverage_of(closed_constructors(table, var_types, var, entry), &conses);
    Some(SwitchCandidate { var, conses, coverage })
}

/// Determinism of a deconstruction whose constructor test is `can_fail`.
pub(crate) fn deconstruct_det(can_fail: bool, args: &[(VarId, ArgUnify)]) -> Determinism {
    if can_fail || args.iter().any(|(_, a)| *a == ArgUnify::Test) {
        Determinism::Semidet
    } else {
        Determinism::Det
    }
}

/// Determinism of an already-analysed disjunct once it is a switch arm,
/// i.e. with its leading constructor test known to succeed.
pub(crate) fn arm_det(goal: &Goal) -> Option<Determinism> {
    match &goal.kind {
        GoalKind::Unify { kind: Some(UnifyKind::Deconstruct { args, .. }), .. } => {
            if goal.ends_unreachable() {
                Some(Determinism::Failure)
            } else {
                Some(deconstruct_det(false, args))
            }
        }
        GoalKind::Conj(goals) => {
            let (first, rest) = goals.split_first()?;
            let mut det = arm_det(first)?;
            for g in rest {
                det = det.conjoin(g.det()?);
            }
            Some(det)
        }
        _ => goal.det(),
    }
}

/// Marks the leading test of a switch arm as unable to fail and refreshes
/// the determinism annotations along the way.
pub(crate) fn mark_leading_test(goal: &mut Goal) {
    let unreachable_after = goal.ends_unreachable();
    match &mut goal.kind {
        GoalKind::Unify { kind: Some(UnifyKind::Deconstruct { can_fail, args, .. }), .. } => {
            *can_fail = false;
            let det = if unreachable_after { Determinism::Failure } else { deconstruct_det(false, args) };
            goal.info.determinism = Some(det);
        }
        GoalKind::Conj(goals) => {
            if let Some(first) = goals.first_mut() {
                mark_leading_test(first);
            }
            let det = goals
                .iter()
                .try_fold(Determinism::Det, |acc, g| g.det().map(|d| acc.conjoin(d)));
            if det.is_some() {
                goal.info.determinism = det;
            }
        }
        _ => {}
    }
}
