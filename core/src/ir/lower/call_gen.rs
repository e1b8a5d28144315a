//! Calls pass inputs in `r1..` and receive outputs in `r1..`, both numbered
//! by position among the inputs or outputs of the callee's mode.
use crate::error::InternalFault;
use crate::goal::{CodeModel, Determinism, Goal, MaxSolns, Mode, ProcRef, VarId};
use crate::ir::lower::code_info::{CodeInfo, FailCont};
use crate::ir::op::{Cond, Instr, Lval, Rval};

fn split_args(args: &[VarId], modes: &[Mode]) -> (Vec<VarId>, Vec<VarId>) {
    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    for (v, m) in args.iter().zip(modes) {
        if m.is_input() {
            inputs.push(*v);
        } else if m.is_output() {
            outputs.push(*v);
        }
    }
    (inputs, outputs)
}

impl<'a> CodeInfo<'a> {
    /// Plain and foreign calls. `foreign` carries the foreign code.
    pub(crate) fn gen_call(
        &mut self,
        goal: &Goal,
        callee: ProcRef,
        args: &[VarId],
        foreign: Option<&String>,
        tail: bool,
    ) -> Result<bool, InternalFault> {
        let decl = self.table.proc(callee).ok_or_else(|| self.fault(format!("unknown procedure {}", callee)))?;
        let det = self
            .table
            .proc_det(callee)
            .or_else(|| goal.det())
            .ok_or_else(|| self.fault(format!("procedure {} has no determinism", callee)))?;
        let (inputs, outputs) = split_args(args, &decl.modes);
        let model = det.code_model();

        if foreign.is_none() && self.is_tail_call(callee, model, &outputs, tail) {
            self.load_inputs(&inputs)?;
            if let Some(head) = self.loop_head {
                self.emit(Instr::Goto(head));
            }
            return Ok(false);
        }

        self.load_inputs(&inputs)?;
        let call = match foreign {
            Some(code) => Instr::Foreign { code: code.clone(), model },
            None => Instr::Call { proc: callee, model },
        };
        self.emit_call(goal, call, model);
        self.finish_call(goal, det, &outputs)
    }

    pub(crate) fn gen_ho_call(&mut self, goal: &Goal, closure: VarId, args: &[VarId]) -> Result<bool, InternalFault> {
        let info = goal
            .info
            .modes
            .get(&closure)
            .and_then(|m| m.initial.higher_order_info())
            .cloned()
            .ok_or_else(|| self.fault("higher-order call on a value with no closure inst"))?;
        let (inputs, outputs) = split_args(args, &info.modes);
        let model = info.det.code_model();
        self.load_inputs(&inputs)?;
        let closure = self.var_rval(closure)?;
        self.emit_call(goal, Instr::CallClosure { closure, model }, model);
        self.finish_call(goal, info.det, &outputs)
    }

    /// A self call in tail position whose outputs are exactly the head
    /// outputs becomes a jump back to the top of the procedure.
    fn is_tail_call(&self, callee: ProcRef, model: CodeModel, outputs: &[VarId], tail: bool) -> bool {
        tail && self.opts.tailcall_loops()
            && callee == self.proc_ref()
            && model != CodeModel::Non
            && self.loop_head.is_some()
            && self.fail_cont == self.entry_fail
            && outputs == self.head_outputs.as_slice()
    }

    fn emit_call(&mut self, goal: &Goal, call: Instr, model: CodeModel) {
        if model != CodeModel::Non {
            self.emit(call);
            return;
        }
        self.ensure_redo();
        let kept = self.kept_across(goal.id);
        self.pin(&kept);
        self.emit_live(call, kept);
    }

    fn load_inputs(&mut self, inputs: &[VarId]) -> Result<(), InternalFault> {
        for (k, v) in inputs.iter().enumerate() {
            let src = self.var_rval(*v)?;
            self.emit(Instr::Assign { dest: Lval::Reg(k + 1), src });
        }
        Ok(())
    }

    fn finish_call(&mut self, goal: &Goal, det: Determinism, outputs: &[VarId]) -> Result<bool, InternalFault> {
        match det.code_model() {
            CodeModel::Det => {}
            CodeModel::Semi => {
                let target = self.fail_label()?;
                self.emit(Instr::IfNot { cond: Cond::Succeeded, target });
            }
            CodeModel::Non => self.fail_cont = FailCont::Redo,
        }
        if det.max_solns() == MaxSolns::Zero {
            self.emit(Instr::Unreachable("call cannot succeed".to_string()));
            return Ok(false);
        }
        for (k, v) in outputs.iter().enumerate() {
            if self.is_live_after(goal.id, *v) {
                let dest = self.bind_var(*v);
                self.emit(Instr::Assign { dest, src: Rval::reg(k + 1) });
            }
        }
        Ok(true)
    }
}
