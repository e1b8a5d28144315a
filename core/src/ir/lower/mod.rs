//! file: core/src/ir/lower/mod.rs
//! description: lowering of annotated goal trees to the instruction set.
//!
//! A procedure becomes one instruction sequence:
//!
//! ```text
//! incr_sp N          frame for every slot the body ever occupies
//! L_head:            target of self tail calls
//! sv.. := r..        inputs copied out of registers
//! <body>
//! r.. := sv..        outputs
//! decr_sp N          (not for nondet code: the frame stays for redo)
//! proceed
//! ```
//!
//! Semidet procedures set the success flag on exit and clear it on the
//! failure path. Nondet procedures report "no more solutions" with `fail`.
use std::collections::BTreeSet;

use log::debug;

use crate::error::InternalFault;
use crate::goal::{CodeModel, Goal, GoalKind, MaxSolns, ModuleTable, ProcRef, Procedure, ScopeReason, VarId};
use crate::ir::module::ProcCode;
use crate::ir::op::{Const, Instr, Lval, Rval};
use crate::ir::opt;
use crate::policy::OptTuple;
use crate::transform::eliminate_excess_assigns;

mod branch_gen;
mod call_gen;
pub(crate) mod code_info;
pub mod liveness;
mod switch_gen;
mod unify_gen;

use code_info::{CodeInfo, FailCont, ISSUER};
use liveness::Liveness;

/// Generates and optimises code for one analysed procedure.
pub fn generate(proc: Procedure, table: &ModuleTable, opts: &OptTuple) -> Result<ProcCode, InternalFault> {
    let mut proc = proc;
    if opts.excess_assign() {
        eliminate_excess_assigns(&mut proc);
    }
    let mut code = generate_unoptimized(&proc, table, opts)?;
    opt::optimize(&mut code, opts);
    debug!("lower: {} -> {} instruction(s), frame {}", code.name, code.instrs.len(), code.frame_size);
    Ok(code)
}

/// Code exactly as emitted, before any instruction-level pass.
pub fn generate_unoptimized(proc: &Procedure, table: &ModuleTable, opts: &OptTuple) -> Result<ProcCode, InternalFault> {
    let fault = |msg: &str| InternalFault::new(ISSUER, msg).in_proc(proc.proc_ref);
    let decl = table.proc(proc.proc_ref).ok_or_else(|| fault("procedure is not declared"))?;
    let det = table
        .proc_det(proc.proc_ref)
        .or(proc.inferred_det)
        .ok_or_else(|| fault("procedure has no determinism"))?;
    let model = det.code_model();

    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    for (v, m) in proc.head_vars.iter().zip(&decl.modes) {
        if m.is_input() {
            inputs.push(*v);
        } else if m.is_output() {
            outputs.push(*v);
        }
    }

    let out_set: BTreeSet<VarId> = outputs.iter().copied().collect();
    let liveness = Liveness::compute(&proc.body, &out_set);
    let mut ci = CodeInfo::new(table, opts, proc, liveness);
    ci.head_outputs = outputs.clone();

    ci.emit(Instr::IncrSp(0));
    let head = ci.new_label();
    ci.loop_head = Some(head);
    ci.emit(Instr::Label(head));

    let needed: BTreeSet<VarId> = ci.liveness.live_before(proc.body.id).cloned().unwrap_or_default();
    for (k, v) in inputs.iter().enumerate() {
        if needed.contains(v) {
            let dest = ci.bind_var(*v);
            ci.emit(Instr::Assign { dest, src: Rval::reg(k + 1) });
        }
    }

    let fail_label = match model {
        CodeModel::Semi => Some(ci.new_label()),
        _ => None,
    };
    ci.fail_cont = match (model, fail_label) {
        (CodeModel::Semi, Some(l)) => FailCont::Label(l),
        (CodeModel::Non, _) => FailCont::Redo,
        _ => FailCont::None,
    };
    ci.entry_fail = ci.fail_cont;

    let reachable = ci.gen_goal(&proc.body, true)?;
    ci.set_origin(None);
    if reachable {
        for (k, v) in outputs.iter().enumerate() {
            let src = ci.var_rval(*v)?;
            ci.emit(Instr::Assign { dest: Lval::Reg(k + 1), src });
        }
        if model == CodeModel::Semi {
            ci.emit(Instr::Assign { dest: Lval::SuccessFlag, src: Rval::Const(Const::Bool(true)) });
        }
        if model != CodeModel::Non {
            ci.emit(Instr::DecrSp(0));
        }
        ci.emit(Instr::Proceed);
    }
    if let Some(l) = fail_label {
        ci.emit(Instr::Label(l));
        ci.emit(Instr::Assign { dest: Lval::SuccessFlag, src: Rval::Const(Const::Bool(false)) });
        ci.emit(Instr::DecrSp(0));
        ci.emit(Instr::Proceed);
    }
    let trailer = ci.take_trailer();
    ci.instrs.extend(trailer);

    let frame_size = ci.frame_size();
    let mut instrs = std::mem::take(&mut ci.instrs);
    for ins in instrs.iter_mut() {
        match &mut ins.instr {
            Instr::IncrSp(n) | Instr::DecrSp(n) => *n = frame_size,
            _ => {}
        }
    }

    Ok(ProcCode { proc: proc.proc_ref, name: table.proc_name(proc.proc_ref), model, frame_size, instrs })
}

impl<'a> CodeInfo<'a> {
    /// Emits code for `goal`. Returns whether control can reach its end;
    /// code after a goal that cannot succeed is never generated.
    pub(crate) fn gen_goal(&mut self, goal: &Goal, tail: bool) -> Result<bool, InternalFault> {
        let prev = self.set_origin(Some(goal.id));
        let reachable = match &goal.kind {
            GoalKind::Unify { kind: Some(kind), .. } => self.gen_unify(goal, kind)?,
            GoalKind::Unify { kind: None, .. } => return Err(self.fault("unification has no mode annotation")),
            GoalKind::Call { pred, args, proc: Some(index), .. } => {
                self.gen_call(goal, ProcRef::new(*pred, *index), args, None, tail)?
            }
            GoalKind::ForeignCall { pred, args, code, proc: Some(index) } => {
                self.gen_call(goal, ProcRef::new(*pred, *index), args, Some(code), false)?
            }
            GoalKind::Call { .. } | GoalKind::ForeignCall { .. } => {
                return Err(self.fault("call has no selected procedure"));
            }
            GoalKind::HigherOrderCall { closure, args } => self.gen_ho_call(goal, *closure, args)?,
            GoalKind::Conj(goals) => self.gen_conj(goals, tail)?,
            GoalKind::Disj(goals) => self.gen_disj(goal, goals, tail)?,
            GoalKind::Switch { var, cases, coverage } => self.gen_switch(goal, *var, cases, coverage, tail)?,
            GoalKind::IfThenElse { cond, then, els } => self.gen_ite(goal, cond, then, els, tail)?,
            GoalKind::Not(inner) => self.gen_not(inner)?,
            GoalKind::Scope { reason: ScopeReason::Exists(_), goal: inner } => self.gen_goal(inner, tail)?,
            GoalKind::Scope { reason: ScopeReason::Commit, goal: inner } => self.gen_commit(inner)?,
        };
        self.apply_post_deaths(goal.id);
        self.set_origin(prev);
        Ok(reachable)
    }

    fn gen_conj(&mut self, goals: &[Goal], tail: bool) -> Result<bool, InternalFault> {
        let last = goals.len().saturating_sub(1);
        for (i, g) in goals.iter().enumerate() {
            if !self.gen_goal(g, tail && i == last)? {
                return Ok(false);
            }
            if g.det().is_some_and(|d| d.max_solns() == MaxSolns::Zero) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Outputs of a branched goal that later code reads.
    pub(crate) fn live_outputs(&self, goal: &Goal) -> Vec<VarId> {
        goal.outputs().into_iter().filter(|v| self.is_live_after(goal.id, *v)).collect()
    }
}
