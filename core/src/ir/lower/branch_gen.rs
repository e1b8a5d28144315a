//! Disjunctions, if-then-elses, negations and commits.
//!
//! Each branch starts from the slot state at entry to the branched goal.
//! Outputs live after the goal are store-mapped before the first branch so
//! every branch leaves them in the same slot.
use crate::error::InternalFault;
use crate::goal::{CodeModel, Goal, VarId};
use crate::ir::lower::code_info::{CodeInfo, FailCont};
use crate::ir::op::{Instr, Lval, Rval};

impl<'a> CodeInfo<'a> {
    pub(crate) fn gen_disj(&mut self, goal: &Goal, branches: &[Goal], tail: bool) -> Result<bool, InternalFault> {
        match branches {
            [] => {
                self.emit_fail()?;
                return Ok(false);
            }
            [only] => return self.gen_goal(only, tail),
            _ => {}
        }
        let model = goal.det().map(|d| d.code_model()).unwrap_or(CodeModel::Non);
        let outputs = self.live_outputs(goal);
        let reservation = self.reserve_outputs(outputs);
        let entry = self.save_slots();
        let end = self.new_label();
        let mut reachable = false;

        if model == CodeModel::Non {
            self.ensure_redo();
            let outer = self.fail_cont;
            let last = branches.len() - 1;
            let resumes: Vec<_> = (0..last).map(|_| self.new_label()).collect();
            for (i, branch) in branches.iter().enumerate() {
                self.restore_slots(entry.clone());
                if i > 0 {
                    self.emit(Instr::Label(resumes[i - 1]));
                }
                self.apply_pre_deaths(branch.id);
                let saved = self.resume_list(branch);
                self.pin(&saved);
                if i == 0 {
                    self.emit_live(Instr::PushChoicePoint { resume: resumes[0] }, saved);
                } else if i < last {
                    self.emit_live(Instr::RetargetChoicePoint { resume: resumes[i] }, saved);
                } else {
                    self.emit(Instr::PopChoicePoint);
                }
                self.fail_cont = if i < last { FailCont::Redo } else { outer };
                if self.gen_goal(branch, false)? {
                    reachable = true;
                    self.emit(Instr::Goto(end));
                }
            }
            self.fail_cont = FailCont::Redo;
        } else {
            let outer = self.fail_cont;
            for (i, branch) in branches.iter().enumerate() {
                self.restore_slots(entry.clone());
                self.apply_pre_deaths(branch.id);
                let next = if i + 1 < branches.len() { Some(self.new_label()) } else { None };
                self.fail_cont = match next {
                    Some(l) => self.label_cont(l, branch.id),
                    None => outer,
                };
                if self.gen_goal(branch, tail)? {
                    reachable = true;
                    self.emit(Instr::Goto(end));
                }
                if let Some(l) = next {
                    self.emit(Instr::Label(l));
                }
            }
            self.fail_cont = outer;
        }

        self.emit(Instr::Label(end));
        self.merge_outputs(entry, &reservation);
        Ok(reachable)
    }

    pub(crate) fn gen_ite(
        &mut self,
        goal: &Goal,
        cond: &Goal,
        then: &Goal,
        els: &Goal,
        tail: bool,
    ) -> Result<bool, InternalFault> {
        let model = goal.det().map(|d| d.code_model()).unwrap_or(CodeModel::Non);
        let outputs = self.live_outputs(goal);
        let reservation = self.reserve_outputs(outputs);
        let entry = self.save_slots();
        // either branch may leave choice points behind, so both share one
        // redo continuation
        if model == CodeModel::Non {
            self.ensure_redo();
        }
        let outer = self.fail_cont;
        let else_label = self.new_label();
        let end = self.new_label();
        let mut reachable = false;

        self.fail_cont = self.label_cont(else_label, cond.id);
        let cond_ok = self.gen_goal(cond, false)?;
        self.fail_cont = outer;
        if cond_ok && self.gen_goal(then, tail)? {
            reachable = true;
            self.emit(Instr::Goto(end));
        }

        self.emit(Instr::Label(else_label));
        self.restore_slots(entry.clone());
        self.fail_cont = outer;
        self.apply_pre_deaths(els.id);
        if self.gen_goal(els, tail)? {
            reachable = true;
        }

        self.emit(Instr::Label(end));
        self.fail_cont = outer;
        self.merge_outputs(entry, &reservation);
        Ok(reachable)
    }

    /// Negation succeeds exactly when the inner goal fails. Nothing the inner
    /// goal binds is visible afterwards.
    pub(crate) fn gen_not(&mut self, inner: &Goal) -> Result<bool, InternalFault> {
        let entry = self.save_slots();
        let outer = self.fail_cont;
        let after = self.new_label();
        let model = inner.det().map(|d| d.code_model()).unwrap_or(CodeModel::Non);

        if model == CodeModel::Non {
            let mark = self.alloc_temp();
            self.emit(Instr::MarkChoiceStack { dest: Lval::StackVar(mark) });
            let live = self.resume_list(inner);
            self.emit_live(Instr::PushChoicePoint { resume: after }, live);
            self.fail_cont = FailCont::Redo;
            if self.gen_goal(inner, false)? {
                self.emit(Instr::CutChoiceStack { mark: Rval::stack(mark) });
                self.fail_cont = outer;
                self.emit_fail()?;
            }
            self.emit(Instr::Label(after));
            self.emit(Instr::PopChoicePoint);
            self.release_temp(mark);
        } else {
            self.fail_cont = self.label_cont(after, inner.id);
            if self.gen_goal(inner, false)? {
                self.fail_cont = outer;
                self.emit_fail()?;
            }
            self.emit(Instr::Label(after));
        }

        self.restore_slots(entry);
        self.fail_cont = outer;
        Ok(true)
    }

    /// Keeps the first solution of a nondet inner goal and discards the
    /// choice points it left.
    pub(crate) fn gen_commit(&mut self, inner: &Goal) -> Result<bool, InternalFault> {
        let inner_det = inner.det();
        if inner_det.map(|d| d.code_model()) != Some(CodeModel::Non) {
            return self.gen_goal(inner, false);
        }
        let outer = self.fail_cont;
        let mark = self.alloc_temp();
        let on_fail = self.new_label();
        let after = self.new_label();

        self.emit(Instr::MarkChoiceStack { dest: Lval::StackVar(mark) });
        let live = self.resume_needs(outer);
        self.emit_live(Instr::PushChoicePoint { resume: on_fail }, live);
        self.fail_cont = FailCont::Redo;
        let reachable = self.gen_goal(inner, false)?;
        if reachable {
            self.emit(Instr::CutChoiceStack { mark: Rval::stack(mark) });
            self.emit(Instr::Goto(after));
        }

        self.emit(Instr::Label(on_fail));
        self.emit(Instr::PopChoicePoint);
        self.fail_cont = outer;
        if inner_det.is_some_and(|d| d.can_fail()) {
            self.emit_fail()?;
        } else {
            self.emit(Instr::Unreachable("committed goal cannot fail".to_string()));
        }
        self.emit(Instr::Label(after));
        self.release_temp(mark);
        Ok(reachable)
    }

    fn resume_list(&self, branch: &Goal) -> Vec<VarId> {
        self.liveness.resume_vars(branch.id).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }
}
