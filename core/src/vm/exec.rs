//! file: core/src/vm/exec.rs
//! description: interpreter for generated procedure code.
//!
//! Stack slots are addressed relative to the frame pointer `fp`, which
//! `incr_sp` sets to the top of the stack. A choice point snapshots the
//! whole stack, the return stack and `fp`, so resuming it rebuilds the
//! exact state at the time it was pushed, including frames of callees
//! that have since returned.
use std::collections::HashMap;

use log::trace;

use crate::goal::{CodeModel, ProcRef};
use crate::ir::module::{ModuleCode, ProcCode};
use crate::ir::op::{Cond, Instr, LabelId, Lval, Rval};
use crate::vm::value::Value;
use crate::vm::VmError;

pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

struct Loaded<'m> {
    code: &'m ProcCode,
    labels: HashMap<LabelId, usize>,
}

#[derive(Debug, Clone)]
struct Frame {
    proc: usize,
    ret_pc: usize,
    fp: usize,
}

#[derive(Debug, Clone)]
struct ChoicePoint {
    proc: usize,
    resume: usize,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    fp: usize,
}

pub(crate) struct Machine<'m> {
    procs: Vec<Loaded<'m>>,
    index: HashMap<ProcRef, usize>,
    regs: Vec<Value>,
    success: bool,
    stack: Vec<Value>,
    fp: usize,
    frames: Vec<Frame>,
    choices: Vec<ChoicePoint>,
    cur: usize,
    pc: usize,
    steps: usize,
    step_limit: usize,
}

impl<'m> Machine<'m> {
    pub(crate) fn new(module: &'m ModuleCode, step_limit: usize) -> Self {
        let procs: Vec<Loaded> =
            module.procs.iter().map(|code| Loaded { code, labels: code.label_positions() }).collect();
        let index = procs.iter().enumerate().map(|(i, p)| (p.code.proc, i)).collect();
        Machine {
            procs,
            index,
            regs: vec![Value::Unset],
            success: false,
            stack: Vec::new(),
            fp: 0,
            frames: Vec::new(),
            choices: Vec::new(),
            cur: 0,
            pc: 0,
            steps: 0,
            step_limit,
        }
    }

    fn error(&self, message: impl Into<String>) -> VmError {
        let name = self.procs.get(self.cur).map(|p| p.code.name.clone());
        VmError::new(message).at(name, self.pc)
    }

    /// Runs `entry` with `inputs` in `r1..` and collects every solution as
    /// the first `outputs` registers.
    pub(crate) fn run(&mut self, entry: ProcRef, inputs: Vec<Value>, outputs: usize) -> Result<Vec<Vec<Value>>, VmError> {
        let start = *self.index.get(&entry).ok_or_else(|| VmError::new(format!("no code for procedure {}", entry)))?;
        let model = self.procs[start].code.model;
        self.regs = std::iter::once(Value::Unset).chain(inputs).collect();
        self.cur = start;
        self.pc = 0;
        let mut solutions = Vec::new();

        loop {
            self.steps += 1;
            if self.steps > self.step_limit {
                return Err(self.error(format!("step limit of {} exceeded", self.step_limit)));
            }
            let code = self.procs[self.cur].code;
            let ins = code.instrs.get(self.pc).ok_or_else(|| self.error("control ran off the end of the code"))?;
            trace!("vm: {}@{:04} {}", code.name, self.pc, ins.instr);
            match &ins.instr {
                Instr::Comment(_) | Instr::Label(_) => self.pc += 1,
                Instr::Assign { dest, src } => {
                    let v = self.eval(src)?;
                    self.store(*dest, v)?;
                    self.pc += 1;
                }
                Instr::Construct { dest, cons, args } => {
                    let args = args.iter().map(|a| self.eval(a)).collect::<Result<Vec<_>, _>>()?;
                    self.store(*dest, Value::of_cons(cons, args))?;
                    self.pc += 1;
                }
                Instr::MakeClosure { dest, proc, args } => {
                    let args = args.iter().map(|a| self.eval(a)).collect::<Result<Vec<_>, _>>()?;
                    self.store(*dest, Value::Closure(*proc, args))?;
                    self.pc += 1;
                }
                Instr::IfNot { cond, target } => {
                    if self.test(cond)? {
                        self.pc += 1;
                    } else {
                        self.jump(*target)?;
                    }
                }
                Instr::ComputedGoto { src, cases, default } => {
                    let v = self.eval(src)?;
                    let target = cases.iter().find(|(c, _)| v.has_functor(c)).map(|(_, l)| *l).unwrap_or(*default);
                    self.jump(target)?;
                }
                Instr::Goto(target) => self.jump(*target)?,
                Instr::Call { proc, .. } => self.enter(*proc)?,
                Instr::CallClosure { closure, .. } => match self.eval(closure)? {
                    Value::Closure(proc, curried) => {
                        let args = self.regs.split_off(1);
                        self.regs.extend(curried);
                        self.regs.extend(args);
                        self.enter(proc)?;
                    }
                    other => return Err(self.error(format!("call of non-closure value {}", other))),
                },
                Instr::Foreign { code, .. } => {
                    return Err(self.error(format!("foreign code cannot be interpreted: {}", code)));
                }
                Instr::IncrSp(n) => {
                    self.fp = self.stack.len();
                    self.stack.resize(self.fp + n, Value::Unset);
                    self.pc += 1;
                }
                Instr::DecrSp(_) => {
                    self.stack.truncate(self.fp);
                    self.pc += 1;
                }
                Instr::Proceed => match self.frames.pop() {
                    Some(frame) => {
                        self.cur = frame.proc;
                        self.pc = frame.ret_pc;
                        self.fp = frame.fp;
                    }
                    None => {
                        let solution = self.regs.iter().skip(1).take(outputs).cloned().collect::<Vec<_>>();
                        match model {
                            CodeModel::Det => {
                                solutions.push(solution);
                                return Ok(solutions);
                            }
                            CodeModel::Semi => {
                                if self.success {
                                    solutions.push(solution);
                                }
                                return Ok(solutions);
                            }
                            CodeModel::Non => {
                                solutions.push(solution);
                                if !self.backtrack() {
                                    return Ok(solutions);
                                }
                            }
                        }
                    }
                },
                Instr::PushChoicePoint { resume } => {
                    let resume = self.label(*resume)?;
                    self.choices.push(ChoicePoint {
                        proc: self.cur,
                        resume,
                        stack: self.stack.clone(),
                        frames: self.frames.clone(),
                        fp: self.fp,
                    });
                    self.pc += 1;
                }
                Instr::RetargetChoicePoint { resume } => {
                    let resume = self.label(*resume)?;
                    match self.choices.last_mut() {
                        Some(cp) => cp.resume = resume,
                        None => return Err(self.error("retarget with no choice point")),
                    }
                    self.pc += 1;
                }
                Instr::PopChoicePoint => {
                    if self.choices.pop().is_none() {
                        return Err(self.error("pop with no choice point"));
                    }
                    self.pc += 1;
                }
                Instr::MarkChoiceStack { dest } => {
                    let mark = Value::Int(self.choices.len() as i64);
                    self.store(*dest, mark)?;
                    self.pc += 1;
                }
                Instr::CutChoiceStack { mark } => match self.eval(mark)? {
                    Value::Int(n) if n >= 0 => {
                        self.choices.truncate(n as usize);
                        self.pc += 1;
                    }
                    other => return Err(self.error(format!("bad choice stack mark {}", other))),
                },
                Instr::Fail => {
                    if !self.backtrack() {
                        return Ok(solutions);
                    }
                }
                Instr::Unreachable(why) => return Err(self.error(format!("reached unreachable code: {}", why))),
            }
        }
    }

    fn enter(&mut self, proc: ProcRef) -> Result<(), VmError> {
        let callee = *self.index.get(&proc).ok_or_else(|| self.error(format!("call of unknown procedure {}", proc)))?;
        self.frames.push(Frame { proc: self.cur, ret_pc: self.pc + 1, fp: self.fp });
        self.cur = callee;
        self.pc = 0;
        Ok(())
    }

    /// Resumes the top choice point, leaving it in place.
    fn backtrack(&mut self) -> bool {
        match self.choices.last() {
            Some(cp) => {
                self.stack = cp.stack.clone();
                self.frames = cp.frames.clone();
                self.fp = cp.fp;
                self.cur = cp.proc;
                self.pc = cp.resume;
                true
            }
            None => false,
        }
    }

    fn label(&self, label: LabelId) -> Result<usize, VmError> {
        self.procs[self.cur].labels.get(&label).copied().ok_or_else(|| self.error(format!("no label L{}", label)))
    }

    fn jump(&mut self, label: LabelId) -> Result<(), VmError> {
        self.pc = self.label(label)?;
        Ok(())
    }

    fn read(&self, lval: Lval) -> Result<Value, VmError> {
        let v = match lval {
            Lval::Reg(n) => self.regs.get(n).cloned().unwrap_or(Value::Unset),
            Lval::StackVar(i) => self.stack.get(self.fp + i).cloned().unwrap_or(Value::Unset),
            Lval::SuccessFlag => Value::Bool(self.success),
        };
        if v == Value::Unset {
            return Err(self.error(format!("read of unset location {}", lval)));
        }
        Ok(v)
    }

    fn eval(&self, rval: &Rval) -> Result<Value, VmError> {
        match rval {
            Rval::Lval(l) => self.read(*l),
            Rval::Const(c) => Ok(Value::from(c)),
            Rval::Field { base, cons, index } => match self.read(*base)? {
                Value::Term(c, args) if &c == cons => {
                    args.get(*index).cloned().ok_or_else(|| self.error(format!("{} has no field {}", cons, index)))
                }
                other => Err(self.error(format!("field of {} read from {}", cons, other))),
            },
        }
    }

    fn store(&mut self, lval: Lval, value: Value) -> Result<(), VmError> {
        match lval {
            Lval::Reg(n) => {
                if n >= self.regs.len() {
                    self.regs.resize(n + 1, Value::Unset);
                }
                self.regs[n] = value;
            }
            Lval::StackVar(i) => {
                let at = self.fp + i;
                match self.stack.get_mut(at) {
                    Some(cell) => *cell = value,
                    None => return Err(self.error(format!("write outside the frame: {}", lval))),
                }
            }
            Lval::SuccessFlag => match value {
                Value::Bool(b) => self.success = b,
                other => return Err(self.error(format!("success flag set to {}", other))),
            },
        }
        Ok(())
    }

    fn test(&self, cond: &Cond) -> Result<bool, VmError> {
        match cond {
            Cond::HasFunctor(r, cons) => Ok(self.eval(r)?.has_functor(cons)),
            Cond::Equal(a, b) => Ok(self.eval(a)? == self.eval(b)?),
            Cond::Succeeded => Ok(self.success),
        }
    }
}
