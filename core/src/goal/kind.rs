use serde::{Deserialize, Serialize};

use crate::goal::cons::ConsId;
use crate::goal::node::Goal;
use crate::goal::var::VarId;

pub type PredId = usize;
pub type ProcIndex = usize;

/// One procedure (mode) of one predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcRef {
    pub pred: PredId,
    pub proc: ProcIndex,
}

impl ProcRef {
    pub fn new(pred: PredId, proc: ProcIndex) -> Self {
        ProcRef { pred, proc }
    }
}

impl std::fmt::Display for ProcRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.pred, self.proc)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnifyRhs {
    Var(VarId),
    Functor { cons: ConsId, args: Vec<VarId> },
    Closure { pred: PredId, proc: ProcIndex, args: Vec<VarId> },
}

/// How one argument of a deconstruction is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgUnify {
    /// The argument variable is free and receives the field.
    Bind,
    /// Both are bound; the field is compared with the variable.
    Test,
    /// Both are free; nothing happens.
    Unused,
}

/// Concrete operation chosen for a unification by mode analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnifyKind {
    Assign { dest: VarId, src: VarId },
    Construct { dest: VarId, cons: ConsId, args: Vec<VarId> },
    Deconstruct { src: VarId, cons: ConsId, args: Vec<(VarId, ArgUnify)>, can_fail: bool },
    Test { left: VarId, right: VarId },
    MakeClosure { dest: VarId, proc: ProcRef, args: Vec<VarId> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purity {
    #[default]
    Pure,
    Semipure,
    Impure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeReason {
    /// Existential quantification of the listed variables.
    Exists(Vec<VarId>),
    /// Only the first solution of the inner goal is wanted.
    Commit,
}

/// Which constructors of the switched-on variable the cases cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    Exhaustive,
    /// A closed constructor set with the listed constructors uncovered.
    Missing(Vec<ConsId>),
    /// The constructor set is not known to be finite.
    Open,
}

impl Coverage {
    pub fn is_exhaustive(&self) -> bool {
        matches!(self, Coverage::Exhaustive)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub cons_ids: Vec<ConsId>,
    pub goal: Goal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    Unify {
        lhs: VarId,
        rhs: UnifyRhs,
        #[serde(default)]
        kind: Option<UnifyKind>,
    },
    Call {
        pred: PredId,
        args: Vec<VarId>,
        #[serde(default)]
        proc: Option<ProcIndex>,
        #[serde(default)]
        purity: Purity,
    },
    ForeignCall {
        pred: PredId,
        args: Vec<VarId>,
        code: String,
        #[serde(default)]
        proc: Option<ProcIndex>,
    },
    HigherOrderCall {
        closure: VarId,
        args: Vec<VarId>,
    },
    Conj(Vec<Goal>),
    Disj(Vec<Goal>),
    Not(Box<Goal>),
    IfThenElse {
        cond: Box<Goal>,
        then: Box<Goal>,
        els: Box<Goal>,
    },
    Scope {
        reason: ScopeReason,
        goal: Box<Goal>,
    },
    Switch {
        var: VarId,
        cases: Vec<Case>,
        coverage: Coverage,
    },
}
