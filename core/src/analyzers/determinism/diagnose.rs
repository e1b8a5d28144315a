//! Walks an analysed body down to the innermost goals responsible for a
//! determinism violation.
use crate::analyzers::determinism::analyzer::DetCtx;
use crate::analyzers::determinism::err::DetCause;
use crate::analyzers::switch::candidate::{leading_test, switch_candidate};
use crate::goal::{ConsId, Coverage, Goal, GoalKind, MaxSolns, ProcRef, ScopeReason, UnifyKind, VarId};

impl<'a> DetCtx<'a> {
    fn cause(&self, goal: &Goal, description: String) -> DetCause {
        DetCause { goal: goal.id, context: goal.info.context.clone(), description }
    }

    fn can_fail(goal: &Goal) -> bool {
        goal.det().is_some_and(|d| d.can_fail())
    }

    fn many(goal: &Goal) -> bool {
        goal.det().is_some_and(|d| d.max_solns() == MaxSolns::Many)
    }

    fn coverage_cause(&self, goal: &Goal, var: VarId, coverage: &Coverage) -> Option<DetCause> {
        let text = match coverage {
            Coverage::Exhaustive => return None,
            Coverage::Open => format!("switch on `{}` cannot cover every value of its type", self.varset.name(var)),
            Coverage::Missing(missing) => {
                let names: Vec<String> = missing.iter().map(ConsId::to_string).collect();
                format!("switch on `{}` does not cover {}", self.varset.name(var), names.join(", "))
            }
        };
        Some(self.cause(goal, text))
    }

    /// Goals that make `goal` able to fail.
    pub(crate) fn failing_goals(&self, goal: &Goal, out: &mut Vec<DetCause>) {
        self.failing_goals_in(goal, false, out)
    }

    fn failing_goals_in(&self, goal: &Goal, skip_leading: bool, out: &mut Vec<DetCause>) {
        let before = out.len();
        match &goal.kind {
            GoalKind::Conj(goals) => {
                for (i, g) in goals.iter().enumerate() {
                    let skip = skip_leading && i == 0;
                    if Self::can_fail(g) || skip {
                        self.failing_goals_in(g, skip, out);
                    }
                    if g.det().is_some_and(|d| d.max_solns() == MaxSolns::Zero) {
                        break;
                    }
                }
            }
            GoalKind::Disj(goals) => match switch_candidate(goals, &goal.info, self.table, self.var_types) {
                Some(candidate) => {
                    out.extend(self.coverage_cause(goal, candidate.var, &candidate.coverage));
                    for g in goals.iter() {
                        self.failing_goals_in(g, true, out);
                    }
                }
                None => {
                    for g in goals.iter() {
                        self.failing_goals_in(g, false, out);
                    }
                }
            },
            GoalKind::Switch { var, cases, coverage } => {
                out.extend(self.coverage_cause(goal, *var, coverage));
                for case in cases.iter().filter(|c| Self::can_fail(&c.goal)) {
                    self.failing_goals_in(&case.goal, false, out);
                }
            }
            GoalKind::IfThenElse { then, els, .. } => {
                for g in [then.as_ref(), els.as_ref()] {
                    if Self::can_fail(g) {
                        self.failing_goals_in(g, false, out);
                    }
                }
            }
            GoalKind::Scope { goal: inner, .. } => self.failing_goals_in(inner, false, out),
            GoalKind::Not(_) => {
                out.push(self.cause(goal, "negated goal can succeed, so the negation can fail".into()));
            }
            _ if skip_leading && leading_test(goal).is_some() => {}
            _ => {
                if Self::can_fail(goal) {
                    out.push(self.cause(goal, self.describe_atomic(goal, "fail")));
                }
            }
        }
        if out.len() == before && !skip_leading && Self::can_fail(goal) && !goal.is_atomic() {
            out.push(self.cause(goal, "goal can fail".into()));
        }
    }

    /// Goals that make `goal` able to succeed more than once.
    pub(crate) fn multi_goals(&self, goal: &Goal, out: &mut Vec<DetCause>) {
        let before = out.len();
        match &goal.kind {
            GoalKind::Conj(goals) => {
                for g in goals.iter().filter(|g| Self::many(g)) {
                    self.multi_goals(g, out);
                }
            }
            GoalKind::Disj(goals) => match switch_candidate(goals, &goal.info, self.table, self.var_types) {
                Some(_) => {
                    for g in goals.iter().filter(|g| Self::many(g)) {
                        self.multi_goals(g, out);
                    }
                }
                None => {
                    out.push(self.cause(goal, "disjunction can succeed in more than one branch".into()));
                }
            },
            GoalKind::Switch { cases, .. } => {
                for case in cases.iter().filter(|c| Self::many(&c.goal)) {
                    self.multi_goals(&case.goal, out);
                }
            }
            GoalKind::IfThenElse { cond, then, els } => {
                for g in [cond.as_ref(), then.as_ref(), els.as_ref()] {
                    if Self::many(g) {
                        self.multi_goals(g, out);
                    }
                }
            }
            GoalKind::Scope { reason: ScopeReason::Exists(_), goal: inner } => self.multi_goals(inner, out),
            GoalKind::Scope { reason: ScopeReason::Commit, .. } | GoalKind::Not(_) => {}
            _ => {
                if Self::many(goal) {
                    out.push(self.cause(goal, self.describe_atomic(goal, "succeed more than once")));
                }
            }
        }
        if out.len() == before && Self::many(goal) && !goal.is_atomic() {
            out.push(self.cause(goal, "goal can succeed more than once".into()));
        }
    }

    /// Goals through which a body declared to have no solutions can succeed.
    pub(crate) fn succeeding_goals(&self, goal: &Goal, out: &mut Vec<DetCause>) {
        match &goal.kind {
            GoalKind::Conj(goals) => {
                if let Some(last) = goals.last() {
                    self.succeeding_goals(last, out);
                } else {
                    out.push(self.cause(goal, "empty conjunction always succeeds".into()));
                }
            }
            _ => out.push(self.cause(goal, "goal can succeed".into())),
        }
    }

    fn describe_atomic(&self, goal: &Goal, what: &str) -> String {
        let n = |v: &VarId| self.varset.name(*v);
        match &goal.kind {
            GoalKind::Unify { kind: Some(UnifyKind::Deconstruct { src, cons, .. }), .. } => {
                format!("unification of `{}` with `{}` can {}", n(src), cons, what)
            }
            GoalKind::Unify { kind: Some(UnifyKind::Test { left, right }), .. } => {
                format!("test of `{}` against `{}` can {}", n(left), n(right), what)
            }
            GoalKind::Call { pred, proc: Some(index), .. } | GoalKind::ForeignCall { pred, proc: Some(index), .. } => {
                let callee = ProcRef::new(*pred, *index);
                format!(
                    "call to `{}` can {} (it is {})",
                    self.table.proc_name(callee),
                    what,
                    self.callee_det(callee)
                )
            }
            GoalKind::HigherOrderCall { closure, .. } => {
                format!("higher-order call of `{}` can {}", n(closure), what)
            }
            _ => format!("goal can {}", what),
        }
    }
}
