use crate::error::InternalFault;
use crate::goal::{Case, CodeModel, ConsId, Coverage, Goal, VarId};
use crate::ir::lower::code_info::{CodeInfo, FailCont, SlotState};
use crate::ir::op::{Cond, Instr, LabelId, Rval};

impl<'a> CodeInfo<'a> {
    /// A switch is dispatched either through a computed jump or through a
    /// chain of functor tests, one per arm.
    pub(crate) fn gen_switch(
        &mut self,
        goal: &Goal,
        var: VarId,
        cases: &[Case],
        coverage: &Coverage,
        tail: bool,
    ) -> Result<bool, InternalFault> {
        let exhaustive = coverage.is_exhaustive();
        if cases.is_empty() {
            if exhaustive {
                self.emit(Instr::Unreachable("switch with no cases".to_string()));
            } else {
                self.emit_fail()?;
            }
            return Ok(false);
        }
        let model = goal.det().map(|d| d.code_model()).unwrap_or(CodeModel::Non);
        let outputs = self.live_outputs(goal);
        let reservation = self.reserve_outputs(outputs);
        let entry = self.save_slots();
        if model == CodeModel::Non {
            self.ensure_redo();
        }
        let outer = self.fail_cont;
        let src = self.var_rval(var)?;
        let end = self.new_label();
        let mut reachable = false;

        let cons_count: usize = cases.iter().map(|c| c.cons_ids.len()).sum();
        if self.opts.jump_tables() && cons_count >= self.opts.jump_table_min_cases() {
            let arm_labels: Vec<LabelId> = cases.iter().map(|_| self.new_label()).collect();
            let default = self.new_label();
            let table = cases
                .iter()
                .zip(&arm_labels)
                .flat_map(|(case, l)| case.cons_ids.iter().map(move |c| (c.clone(), *l)))
                .collect();
            self.emit(Instr::ComputedGoto { src, cases: table, default });
            for (case, label) in cases.iter().zip(&arm_labels) {
                self.emit(Instr::Label(*label));
                if self.gen_arm(case, &entry, outer, tail)? {
                    reachable = true;
                    self.emit(Instr::Goto(end));
                }
            }
            self.emit(Instr::Label(default));
            self.restore_slots(entry.clone());
            self.fail_cont = outer;
            if exhaustive {
                let name = self.proc.var_name(var);
                self.emit(Instr::Unreachable(format!("no case of switch on {}", name)));
            } else {
                self.emit_fail()?;
            }
        } else {
            let last = cases.len() - 1;
            for (i, case) in cases.iter().enumerate() {
                let miss = if exhaustive && i == last { None } else { Some(self.new_label()) };
                if let Some(miss) = miss {
                    self.emit_functor_test(&src, &case.cons_ids, miss);
                }
                if self.gen_arm(case, &entry, outer, tail)? {
                    reachable = true;
                    self.emit(Instr::Goto(end));
                }
                if let Some(miss) = miss {
                    self.emit(Instr::Label(miss));
                }
            }
            if !exhaustive {
                self.restore_slots(entry.clone());
                self.fail_cont = outer;
                self.emit_fail()?;
            }
        }

        self.emit(Instr::Label(end));
        self.fail_cont = outer;
        self.merge_outputs(entry, &reservation);
        Ok(reachable)
    }

    /// Every arm starts from the failure continuation in force at the switch.
    fn gen_arm(&mut self, case: &Case, entry: &SlotState, outer: FailCont, tail: bool) -> Result<bool, InternalFault> {
        self.restore_slots(entry.clone());
        self.fail_cont = outer;
        self.apply_pre_deaths(case.goal.id);
        self.gen_goal(&case.goal, tail)
    }

    /// Falls through when `src` has one of `conses`, jumps to `miss` otherwise.
    fn emit_functor_test(&mut self, src: &Rval, conses: &[ConsId], miss: LabelId) {
        let Some((final_cons, rest)) = conses.split_last() else {
            self.emit(Instr::Goto(miss));
            return;
        };
        let hit = if rest.is_empty() { None } else { Some(self.new_label()) };
        for cons in rest {
            let next = self.new_label();
            self.emit(Instr::IfNot { cond: Cond::HasFunctor(src.clone(), cons.clone()), target: next });
            if let Some(hit) = hit {
                self.emit(Instr::Goto(hit));
            }
            self.emit(Instr::Label(next));
        }
        self.emit(Instr::IfNot { cond: Cond::HasFunctor(src.clone(), final_cons.clone()), target: miss });
        if let Some(hit) = hit {
            self.emit(Instr::Label(hit));
        }
    }
}
