//! file: core/src/analyzers/determinism/analyzer.rs
//! description: bottom-up determinism inference over an annotated body.
use std::collections::BTreeMap;

use log::{trace, warn};

use crate::analyzers::determinism::err::{DetError, DetErrorKind};
use crate::analyzers::switch::candidate::{arm_det, deconstruct_det, switch_candidate};
use crate::error::InternalFault;
use crate::goal::{
    Determinism, Goal, GoalKind, MaxSolns, ModuleTable, ProcRef, ScopeReason, UnifyKind, VarId, VarSet,
};

const ISSUER: &str = "modus.analyzers.determinism";

pub(crate) struct DetCtx<'a> {
    pub table: &'a ModuleTable,
    pub varset: &'a VarSet,
    pub var_types: &'a BTreeMap<VarId, String>,
    pub proc_ref: ProcRef,
    pub proc_name: String,
}

/// Diagnostics gathered while inferring.
#[derive(Default)]
pub(crate) struct DetSink {
    pub errors: Vec<DetError>,
    pub warnings: Vec<DetError>,
}

impl<'a> DetCtx<'a> {
    fn note(&self, goal: &Goal, kind: DetErrorKind) -> DetError {
        DetError::new(kind, goal.id, goal.info.context.clone(), &self.proc_name)
    }

    fn fault(&self, goal: &Goal, message: &str) -> InternalFault {
        InternalFault::new(ISSUER, message).in_proc(self.proc_ref).at_goal(Some(goal.id))
    }

    pub(crate) fn callee_det(&self, callee: ProcRef) -> Determinism {
        self.table.proc_det(callee).unwrap_or_else(|| {
            warn!("determinism: no determinism known for {}, assuming nondet", self.table.proc_name(callee));
            Determinism::Nondet
        })
    }

    /// Infers the determinism of `goal` and of all its sub-goals, storing
    /// the result in each goal's info.
    pub(crate) fn infer(&self, goal: &mut Goal, sink: &mut DetSink) -> Result<Determinism, InternalFault> {
        let unreachable_after = goal.ends_unreachable();
        let det = match &mut goal.kind {
            GoalKind::Unify { kind, .. } => match kind {
                Some(UnifyKind::Assign { .. } | UnifyKind::Construct { .. } | UnifyKind::MakeClosure { .. }) => {
                    Determinism::Det
                }
                Some(UnifyKind::Deconstruct { can_fail, args, .. }) => {
                    if unreachable_after {
                        Determinism::Failure
                    } else {
                        deconstruct_det(*can_fail, args)
                    }
                }
                Some(UnifyKind::Test { .. }) => {
                    if unreachable_after {
                        Determinism::Failure
                    } else {
                        Determinism::Semidet
                    }
                }
                None => return Err(self.fault(goal, "unification has no mode annotation")),
            },
            GoalKind::Call { pred, proc, .. } | GoalKind::ForeignCall { pred, proc, .. } => match proc {
                Some(index) => self.callee_det(ProcRef::new(*pred, *index)),
                None => return Err(self.fault(goal, "call has no selected procedure")),
            },
            GoalKind::HigherOrderCall { closure, .. } => {
                let info = goal.info.modes.get(closure).and_then(|m| m.initial.higher_order_info());
                match info {
                    Some(ho) => ho.det,
                    None => {
                        warn!("determinism: closure {} has no higher-order inst, assuming nondet", closure);
                        Determinism::Nondet
                    }
                }
            }
            GoalKind::Conj(goals) => {
                let mut acc = Determinism::Det;
                let mut reported = false;
                for g in goals.iter_mut() {
                    if acc.max_solns() == MaxSolns::Zero && !reported {
                        sink.warnings.push(self.note(g, DetErrorKind::UnreachableCode));
                        reported = true;
                    }
                    let d = self.infer(g, sink)?;
                    acc = acc.conjoin(d);
                }
                acc
            }
            GoalKind::Disj(goals) => {
                let mut dets = Vec::with_capacity(goals.len());
                for g in goals.iter_mut() {
                    dets.push(self.infer(g, sink)?);
                }
                match switch_candidate(goals, &goal.info, self.table, self.var_types) {
                    Some(candidate) => {
                        trace!("determinism: disjunction {} is a switch on {}", goal.id, candidate.var);
                        let mut acc = Determinism::Erroneous;
                        for g in goals.iter() {
                            let arm = arm_det(g).ok_or_else(|| self.fault(g, "switch arm without determinism"))?;
                            acc = acc.switch_join(arm);
                        }
                        if candidate.coverage.is_exhaustive() { acc } else { acc.with_can_fail() }
                    }
                    None => dets.into_iter().fold(Determinism::Failure, Determinism::disjoin),
                }
            }
            GoalKind::Switch { cases, coverage, .. } => {
                let mut acc = Determinism::Erroneous;
                for case in cases.iter_mut() {
                    acc = acc.switch_join(self.infer(&mut case.goal, sink)?);
                }
                if coverage.is_exhaustive() { acc } else { acc.with_can_fail() }
            }
            GoalKind::Not(inner) => {
                self.infer(inner, sink)?;
                Determinism::Semidet
            }
            GoalKind::IfThenElse { cond, then, els } => {
                let c = self.infer(cond, sink)?;
                if c.max_solns() == MaxSolns::Many {
                    let err = self.note(cond, DetErrorKind::NondetCondition { inferred: c });
                    sink.errors.push(err);
                } else if !c.can_fail() && c.max_solns() != MaxSolns::Zero {
                    sink.warnings.push(self.note(cond, DetErrorKind::CondCannotFail));
                }
                let t = self.infer(then, sink)?;
                let e = self.infer(els, sink)?;
                Determinism::if_then_else(c.commit(), t, e)
            }
            GoalKind::Scope { reason, goal: inner } => {
                let d = self.infer(inner, sink)?;
                match reason {
                    ScopeReason::Commit => d.commit(),
                    ScopeReason::Exists(_) => d,
                }
            }
        };
        goal.info.determinism = Some(det);
        Ok(det)
    }
}
