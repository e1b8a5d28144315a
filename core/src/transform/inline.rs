//! file: core/src/transform/inline.rs
//! description: goal-level inlining of small procedures.
use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};

use crate::goal::rename::rename_goal;
use crate::goal::{Goal, GoalId, GoalInfo, GoalKind, Procedure, ProcRef, Purity, ScopeReason, VarId};
use crate::policy::OptTuple;

/// Analysed procedure bodies that calls may be replaced with.
#[derive(Debug, Default, Clone)]
pub struct InlineSource {
    procs: BTreeMap<ProcRef, Procedure>,
}

impl InlineSource {
    pub fn new(procs: impl IntoIterator<Item = Procedure>) -> Self {
        InlineSource { procs: procs.into_iter().map(|p| (p.proc_ref, p)).collect() }
    }

    pub fn get(&self, proc: ProcRef) -> Option<&Procedure> {
        self.procs.get(&proc)
    }

    pub fn len(&self) -> usize {
        self.procs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }
}

fn calls_of(goal: &Goal) -> BTreeSet<ProcRef> {
    let mut out = BTreeSet::new();
    goal.walk(&mut |g| {
        if let GoalKind::Call { pred, proc: Some(index), .. } = &g.kind {
            out.insert(ProcRef::new(*pred, *index));
        }
    });
    out
}

fn only_atomic(goal: &Goal) -> bool {
    match &goal.kind {
        GoalKind::Conj(goals) => goals.iter().all(only_atomic),
        _ => goal.is_atomic(),
    }
}

/// Whether `callee` may be inlined into `caller` under `opts`.
fn inlinable(caller: ProcRef, callee: &Procedure, opts: &OptTuple) -> bool {
    let calls = calls_of(&callee.body);
    if calls.contains(&callee.proc_ref) || calls.contains(&caller) {
        return false;
    }
    let size = callee.body.size();
    if only_atomic(&callee.body) && size <= opts.inline_simple_threshold() {
        return true;
    }
    size <= opts.inline_compound_threshold()
}

/// Replaces calls to small non-recursive procedures with copies of their
/// bodies. Returns the number of calls inlined.
pub fn inline_calls(proc: &mut Procedure, source: &InlineSource, opts: &OptTuple) -> usize {
    if !opts.inline() {
        return 0;
    }
    let mut count = 0;
    let body = std::mem::replace(&mut proc.body, Goal::new(GoalKind::Conj(Vec::new())));
    proc.body = inline_in(body, proc, source, opts, &mut count);
    if count > 0 {
        proc.renumber();
        proc.requantify();
        debug!("inline: {} call(s) inlined into {}", count, proc.proc_ref);
    }
    count
}

fn inline_in(goal: Goal, proc: &mut Procedure, source: &InlineSource, opts: &OptTuple, count: &mut usize) -> Goal {
    let Goal { id, kind, info } = goal;
    let kind = match kind {
        GoalKind::Call { pred, args, proc: Some(index), purity } if purity == Purity::Pure => {
            let callee_ref = ProcRef::new(pred, index);
            match source.get(callee_ref) {
                Some(callee) if inlinable(proc.proc_ref, callee, opts) => {
                    *count += 1;
                    trace!("inline: {} at {}", callee_ref, id);
                    return inline_body(id, info, &args, callee, proc);
                }
                _ => GoalKind::Call { pred, args, proc: Some(index), purity },
            }
        }
        GoalKind::Conj(goals) => {
            GoalKind::Conj(goals.into_iter().map(|g| inline_in(g, proc, source, opts, count)).collect())
        }
        GoalKind::Disj(goals) => {
            GoalKind::Disj(goals.into_iter().map(|g| inline_in(g, proc, source, opts, count)).collect())
        }
        GoalKind::Not(inner) => GoalKind::Not(Box::new(inline_in(*inner, proc, source, opts, count))),
        GoalKind::IfThenElse { cond, then, els } => GoalKind::IfThenElse {
            cond: Box::new(inline_in(*cond, proc, source, opts, count)),
            then: Box::new(inline_in(*then, proc, source, opts, count)),
            els: Box::new(inline_in(*els, proc, source, opts, count)),
        },
        GoalKind::Scope { reason, goal: inner } => {
            GoalKind::Scope { reason, goal: Box::new(inline_in(*inner, proc, source, opts, count)) }
        }
        GoalKind::Switch { var, cases, coverage } => {
            let cases = cases
                .into_iter()
                .map(|mut c| {
                    c.goal = inline_in(c.goal, proc, source, opts, count);
                    c
                })
                .collect();
            GoalKind::Switch { var, cases, coverage }
        }
        other => other,
    };
    Goal { id, kind, info }
}

/// A renamed copy of the callee body, wrapped in an existential scope over
/// the callee's locals.
fn inline_body(id: GoalId, info: GoalInfo, args: &[VarId], callee: &Procedure, proc: &mut Procedure) -> Goal {
    let mut map: BTreeMap<VarId, VarId> = callee.head_vars.iter().copied().zip(args.iter().copied()).collect();
    let mut locals = Vec::new();
    for v in callee.body.vars() {
        if map.contains_key(&v) {
            continue;
        }
        let name = callee.varset.name(v);
        let fresh = proc.varset.new_var(Some(&name));
        if let Some(ty) = callee.var_types.get(&v) {
            proc.var_types.insert(fresh, ty.clone());
        }
        map.insert(v, fresh);
        locals.push(fresh);
    }
    let mut body = callee.body.clone();
    rename_goal(&mut body, &map);
    Goal { id, kind: GoalKind::Scope { reason: ScopeReason::Exists(locals), goal: Box::new(body) }, info }
}
