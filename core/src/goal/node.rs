use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::goal::det::Determinism;
use crate::goal::kind::{GoalKind, Purity, UnifyKind, UnifyRhs};
use crate::goal::mode::Mode;
use crate::goal::var::VarId;
use crate::location::Context;

/// Identity of a goal within one procedure body, assigned in preorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoalId(pub u32);

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Annotations filled in by the passes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalInfo {
    #[serde(default)]
    pub nonlocals: BTreeSet<VarId>,
    /// Before/after insts of every variable the goal touches.
    #[serde(default)]
    pub modes: BTreeMap<VarId, Mode>,
    #[serde(default)]
    pub determinism: Option<Determinism>,
    #[serde(default)]
    pub context: Option<Context>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    #[serde(default)]
    pub id: GoalId,
    pub kind: GoalKind,
    #[serde(default)]
    pub info: GoalInfo,
}

impl Goal {
    pub fn new(kind: GoalKind) -> Self {
        Goal { id: GoalId::default(), kind, info: GoalInfo::default() }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.info.context = Some(context);
        self
    }

    /// A conjunction of `goals`, flattening nested conjunctions.
    pub fn conj(goals: Vec<Goal>) -> Goal {
        let mut flat = Vec::with_capacity(goals.len());
        for g in goals {
            match g.kind {
                GoalKind::Conj(inner) if g.info.context.is_none() => flat.extend(inner),
                _ => flat.push(g),
            }
        }
        if flat.len() == 1 {
            if let Some(only) = flat.pop() {
                return only;
            }
        }
        Goal::new(GoalKind::Conj(flat))
    }

    pub fn det(&self) -> Option<Determinism> {
        self.info.determinism
    }

    pub fn is_atomic(&self) -> bool {
        matches!(
            self.kind,
            GoalKind::Unify { .. }
                | GoalKind::Call { .. }
                | GoalKind::ForeignCall { .. }
                | GoalKind::HigherOrderCall { .. }
        )
    }

    pub fn is_impure(&self) -> bool {
        match &self.kind {
            GoalKind::Call { purity, .. } => *purity == Purity::Impure,
            GoalKind::ForeignCall { .. } | GoalKind::Unify { .. } | GoalKind::HigherOrderCall { .. } => false,
            _ => self.children().iter().any(|c| c.is_impure()),
        }
    }

    pub fn children(&self) -> Vec<&Goal> {
        match &self.kind {
            GoalKind::Conj(goals) | GoalKind::Disj(goals) => goals.iter().collect(),
            GoalKind::Not(goal) | GoalKind::Scope { goal, .. } => vec![goal.as_ref()],
            GoalKind::IfThenElse { cond, then, els } => vec![cond.as_ref(), then.as_ref(), els.as_ref()],
            GoalKind::Switch { cases, .. } => cases.iter().map(|c| &c.goal).collect(),
            _ => Vec::new(),
        }
    }

    pub fn children_mut(&mut self) -> Vec<&mut Goal> {
        match &mut self.kind {
            GoalKind::Conj(goals) | GoalKind::Disj(goals) => goals.iter_mut().collect(),
            GoalKind::Not(goal) | GoalKind::Scope { goal, .. } => vec![goal.as_mut()],
            GoalKind::IfThenElse { cond, then, els } => vec![cond.as_mut(), then.as_mut(), els.as_mut()],
            GoalKind::Switch { cases, .. } => cases.iter_mut().map(|c| &mut c.goal).collect(),
            _ => Vec::new(),
        }
    }

    /// Assigns fresh ids to the whole subtree in preorder.
    pub fn renumber(&mut self, next: &mut u32) {
        self.id = GoalId(*next);
        *next += 1;
        for child in self.children_mut() {
            child.renumber(next);
        }
    }

    /// Number of goals in the subtree.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|c| c.size()).sum::<usize>()
    }

    /// Variables this node refers to directly, not counting its children.
    pub fn direct_vars(&self) -> Vec<VarId> {
        match &self.kind {
            GoalKind::Unify { lhs, rhs, .. } => {
                let mut vars = vec![*lhs];
                match rhs {
                    UnifyRhs::Var(v) => vars.push(*v),
                    UnifyRhs::Functor { args, .. } | UnifyRhs::Closure { args, .. } => {
                        vars.extend(args.iter().copied())
                    }
                }
                vars
            }
            GoalKind::Call { args, .. } | GoalKind::ForeignCall { args, .. } => args.clone(),
            GoalKind::HigherOrderCall { closure, args } => {
                let mut vars = vec![*closure];
                vars.extend(args.iter().copied());
                vars
            }
            GoalKind::Switch { var, .. } => vec![*var],
            _ => Vec::new(),
        }
    }

    /// Every variable occurring anywhere in the subtree.
    pub fn vars(&self) -> BTreeSet<VarId> {
        let mut out = BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut BTreeSet<VarId>) {
        out.extend(self.direct_vars());
        for child in self.children() {
            child.collect_vars(out);
        }
    }

    /// Variables the goal binds: free before it and bound after it.
    pub fn outputs(&self) -> BTreeSet<VarId> {
        self.info
            .modes
            .iter()
            .filter(|(_, m)| m.initial.is_free() && !m.final_.is_free())
            .map(|(v, _)| *v)
            .collect()
    }

    /// The goal makes its program point unreachable.
    pub fn ends_unreachable(&self) -> bool {
        self.info.modes.values().any(|m| m.initial.is_reachable() && !m.final_.is_reachable())
    }

    pub fn find(&self, id: GoalId) -> Option<&Goal> {
        if self.id == id {
            return Some(self);
        }
        self.children().into_iter().find_map(|c| c.find(id))
    }

    /// Preorder traversal.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Goal)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    pub fn unify_kind(&self) -> Option<&UnifyKind> {
        match &self.kind {
            GoalKind::Unify { kind, .. } => kind.as_ref(),
            _ => None,
        }
    }
}
