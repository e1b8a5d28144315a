use crate::error::InternalFault;
use crate::goal::{ArgUnify, ConsId, Goal, UnifyKind};
use crate::ir::lower::code_info::CodeInfo;
use crate::ir::op::{Cond, Const, Instr, Rval};

impl<'a> CodeInfo<'a> {
    pub(crate) fn gen_unify(&mut self, goal: &Goal, kind: &UnifyKind) -> Result<bool, InternalFault> {
        if goal.ends_unreachable() {
            self.emit_fail()?;
            return Ok(false);
        }
        match kind {
            UnifyKind::Assign { dest, src } => {
                if self.is_live_after(goal.id, *dest) {
                    let src = self.var_rval(*src)?;
                    let dest = self.bind_var(*dest);
                    self.emit(Instr::Assign { dest, src });
                }
            }
            UnifyKind::Construct { dest, cons, args } => {
                if self.is_live_after(goal.id, *dest) {
                    let args = args.iter().map(|a| self.var_rval(*a)).collect::<Result<Vec<_>, _>>()?;
                    let dest = self.bind_var(*dest);
                    let instr = match cons {
                        ConsId::Int(i) => Instr::Assign { dest, src: Rval::Const(Const::Int(*i)) },
                        ConsId::Str(s) => Instr::Assign { dest, src: Rval::Const(Const::Str(s.clone())) },
                        ConsId::Functor { .. } => Instr::Construct { dest, cons: cons.clone(), args },
                    };
                    self.emit(instr);
                }
            }
            UnifyKind::Deconstruct { src, cons, args, can_fail } => {
                let base = self.var_lval(*src)?;
                if *can_fail {
                    let target = self.fail_label()?;
                    self.emit(Instr::IfNot { cond: Cond::HasFunctor(Rval::Lval(base), cons.clone()), target });
                }
                for (index, (arg, how)) in args.iter().enumerate() {
                    let field = Rval::Field { base, cons: cons.clone(), index };
                    match how {
                        ArgUnify::Bind => {
                            if self.is_live_after(goal.id, *arg) {
                                let dest = self.bind_var(*arg);
                                self.emit(Instr::Assign { dest, src: field });
                            }
                        }
                        ArgUnify::Test => {
                            let value = self.var_rval(*arg)?;
                            let target = self.fail_label()?;
                            self.emit(Instr::IfNot { cond: Cond::Equal(value, field), target });
                        }
                        ArgUnify::Unused => {}
                    }
                }
            }
            UnifyKind::Test { left, right } => {
                let (left, right) = (self.var_rval(*left)?, self.var_rval(*right)?);
                let target = self.fail_label()?;
                self.emit(Instr::IfNot { cond: Cond::Equal(left, right), target });
            }
            UnifyKind::MakeClosure { dest, proc, args } => {
                if self.is_live_after(goal.id, *dest) {
                    let args = args.iter().map(|a| self.var_rval(*a)).collect::<Result<Vec<_>, _>>()?;
                    let dest = self.bind_var(*dest);
                    self.emit(Instr::MakeClosure { dest, proc: *proc, args });
                }
            }
        }
        Ok(true)
    }
}
