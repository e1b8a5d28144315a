//! file: core/src/ir/op.rs
//! description: the low-level instruction set.
//!
//! Instructions address general registers `r1..`, slots of the current
//! stack frame and the success flag. Control flow uses numbered labels
//! local to one procedure.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::goal::{CodeModel, ConsId, GoalId, ProcRef, VarId};

pub type LabelId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lval {
    Reg(usize),
    StackVar(usize),
    SuccessFlag,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Const {
    Int(i64),
    Str(String),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rval {
    Lval(Lval),
    Const(Const),
    /// Argument `index` of the term in `base`, known to have functor `cons`.
    Field { base: Lval, cons: ConsId, index: usize },
}

impl Rval {
    pub fn stack(slot: usize) -> Rval {
        Rval::Lval(Lval::StackVar(slot))
    }

    pub fn reg(n: usize) -> Rval {
        Rval::Lval(Lval::Reg(n))
    }

    fn lvals(&self) -> Vec<Lval> {
        match self {
            Rval::Lval(l) => vec![*l],
            Rval::Const(_) => Vec::new(),
            Rval::Field { base, .. } => vec![*base],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cond {
    HasFunctor(Rval, ConsId),
    Equal(Rval, Rval),
    /// The success flag is set.
    Succeeded,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instr {
    Comment(String),
    Label(LabelId),
    Assign { dest: Lval, src: Rval },
    Construct { dest: Lval, cons: ConsId, args: Vec<Rval> },
    MakeClosure { dest: Lval, proc: ProcRef, args: Vec<Rval> },
    /// Jump to `target` unless `cond` holds.
    IfNot { cond: Cond, target: LabelId },
    ComputedGoto { src: Rval, cases: Vec<(ConsId, LabelId)>, default: LabelId },
    Goto(LabelId),
    Call { proc: ProcRef, model: CodeModel },
    CallClosure { closure: Rval, model: CodeModel },
    Foreign { code: String, model: CodeModel },
    IncrSp(usize),
    DecrSp(usize),
    Proceed,
    PushChoicePoint { resume: LabelId },
    RetargetChoicePoint { resume: LabelId },
    PopChoicePoint,
    MarkChoiceStack { dest: Lval },
    CutChoiceStack { mark: Rval },
    Fail,
    Unreachable(String),
}

impl Instr {
    /// Locations the instruction reads.
    pub fn reads(&self) -> Vec<Lval> {
        match self {
            Instr::Assign { src, .. } => src.lvals(),
            Instr::Construct { args, .. } | Instr::MakeClosure { args, .. } => {
                args.iter().flat_map(Rval::lvals).collect()
            }
            Instr::IfNot { cond, .. } => match cond {
                Cond::HasFunctor(r, _) => r.lvals(),
                Cond::Equal(a, b) => a.lvals().into_iter().chain(b.lvals()).collect(),
                Cond::Succeeded => vec![Lval::SuccessFlag],
            },
            Instr::ComputedGoto { src, .. } => src.lvals(),
            Instr::CallClosure { closure, .. } => closure.lvals(),
            Instr::CutChoiceStack { mark } => mark.lvals(),
            _ => Vec::new(),
        }
    }

    /// Location the instruction writes, if any.
    pub fn writes(&self) -> Option<Lval> {
        match self {
            Instr::Assign { dest, .. }
            | Instr::Construct { dest, .. }
            | Instr::MakeClosure { dest, .. }
            | Instr::MarkChoiceStack { dest } => Some(*dest),
            _ => None,
        }
    }

    /// Labels the instruction may transfer control to.
    pub fn targets(&self) -> Vec<LabelId> {
        match self {
            Instr::IfNot { target, .. } | Instr::Goto(target) => vec![*target],
            Instr::ComputedGoto { cases, default, .. } => {
                cases.iter().map(|(_, l)| *l).chain(std::iter::once(*default)).collect()
            }
            Instr::PushChoicePoint { resume } | Instr::RetargetChoicePoint { resume } => vec![*resume],
            _ => Vec::new(),
        }
    }

    pub fn targets_mut(&mut self) -> Vec<&mut LabelId> {
        match self {
            Instr::IfNot { target, .. } | Instr::Goto(target) => vec![target],
            Instr::ComputedGoto { cases, default, .. } => {
                cases.iter_mut().map(|(_, l)| l).chain(std::iter::once(default)).collect()
            }
            Instr::PushChoicePoint { resume } | Instr::RetargetChoicePoint { resume } => vec![resume],
            _ => Vec::new(),
        }
    }

    /// Control never falls through to the next instruction.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instr::Goto(_) | Instr::ComputedGoto { .. } | Instr::Proceed | Instr::Fail | Instr::Unreachable(_)
        )
    }

    /// Touches the choice-point stack.
    pub fn is_choice_op(&self) -> bool {
        matches!(
            self,
            Instr::PushChoicePoint { .. }
                | Instr::RetargetChoicePoint { .. }
                | Instr::PopChoicePoint
                | Instr::MarkChoiceStack { .. }
                | Instr::CutChoiceStack { .. }
        )
    }
}

/// A location a choice point preserves for resumption. `var` is the
/// variable it holds; choice stack marks have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveVal {
    pub lval: Lval,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var: Option<VarId>,
}

impl fmt::Display for LiveVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.var {
            Some(v) => write!(f, "{}={}", self.lval, v),
            None => write!(f, "{}", self.lval),
        }
    }
}

/// An instruction with the goal it came from and, where a choice point is
/// pushed or retargeted or a nondet call may return again, the locations
/// that must keep their value until then.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub instr: Instr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<GoalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live: Option<Vec<LiveVal>>,
}

impl Instruction {
    pub fn new(instr: Instr) -> Self {
        Instruction { instr, origin: None, live: None }
    }
}

impl From<Instr> for Instruction {
    fn from(instr: Instr) -> Self {
        Instruction::new(instr)
    }
}

impl fmt::Display for Lval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lval::Reg(n) => write!(f, "r{}", n),
            Lval::StackVar(n) => write!(f, "sv{}", n),
            Lval::SuccessFlag => write!(f, "succ"),
        }
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::Int(i) => write!(f, "{}", i),
            Const::Str(s) => write!(f, "{:?}", s),
            Const::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl fmt::Display for Rval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rval::Lval(l) => write!(f, "{}", l),
            Rval::Const(c) => write!(f, "{}", c),
            Rval::Field { base, cons, index } => write!(f, "field({}, {}, {})", base, cons, index),
        }
    }
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cond::HasFunctor(r, c) => write!(f, "{} has {}", r, c),
            Cond::Equal(a, b) => write!(f, "{} == {}", a, b),
            Cond::Succeeded => write!(f, "succ"),
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Comment(text) => write!(f, "% {}", text),
            Instr::Label(l) => write!(f, "L{}:", l),
            Instr::Assign { dest, src } => write!(f, "{} := {}", dest, src),
            Instr::Construct { dest, cons, args } => write!(f, "{} := new {}({})", dest, cons, join(args)),
            Instr::MakeClosure { dest, proc, args } => write!(f, "{} := closure {}({})", dest, proc, join(args)),
            Instr::IfNot { cond, target } => write!(f, "if not ({}) goto L{}", cond, target),
            Instr::ComputedGoto { src, cases, default } => {
                let arms: Vec<String> = cases.iter().map(|(c, l)| format!("{} -> L{}", c, l)).collect();
                write!(f, "switch {} [{}] else L{}", src, arms.join(", "), default)
            }
            Instr::Goto(l) => write!(f, "goto L{}", l),
            Instr::Call { proc, model } => write!(f, "call {} ({})", proc, model),
            Instr::CallClosure { closure, model } => write!(f, "call_closure {} ({})", closure, model),
            Instr::Foreign { code, model } => write!(f, "foreign {:?} ({})", code, model),
            Instr::IncrSp(n) => write!(f, "incr_sp {}", n),
            Instr::DecrSp(n) => write!(f, "decr_sp {}", n),
            Instr::Proceed => write!(f, "proceed"),
            Instr::PushChoicePoint { resume } => write!(f, "push_choice resume L{}", resume),
            Instr::RetargetChoicePoint { resume } => write!(f, "retarget_choice resume L{}", resume),
            Instr::PopChoicePoint => write!(f, "pop_choice"),
            Instr::MarkChoiceStack { dest } => write!(f, "{} := mark_choice", dest),
            Instr::CutChoiceStack { mark } => write!(f, "cut_choice {}", mark),
            Instr::Fail => write!(f, "fail"),
            Instr::Unreachable(why) => write!(f, "unreachable {:?}", why),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.instr)?;
        if let Some(live) = &self.live {
            write!(f, "  live [{}]", join(live))?;
        }
        Ok(())
    }
}
