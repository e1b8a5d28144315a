use crate::error::{DiagnosticExt, Level};
use crate::goal::{GoalId, Inst, InstConflict, PredId, ProcIndex, VarId, VarSet};
use crate::location::Context;

#[derive(Debug, Clone, PartialEq)]
pub enum ModeErrorKind {
    /// No declared mode of the callee accepts the actual insts.
    NoMatchingMode { callee: String, args: Vec<(VarId, Inst)> },
    /// More than one declared mode accepts them.
    AmbiguousMode { callee: String, candidates: Vec<ProcIndex> },
    MergeConflict { var: VarId, conflict: InstConflict },
    BoundInNegation { var: VarId, inst: Inst },
    FreeFreeUnification { left: VarId, right: VarId },
    PartialConstruction { var: VarId, free_args: Vec<VarId> },
    NonGroundTest { var: VarId, inst: Inst },
    HigherOrderTest { var: VarId },
    ClobberedUse { var: VarId },
    NotHigherOrder { var: VarId, inst: Inst },
    ArityMismatch { callee: String, expected: usize, actual: usize },
    UnknownPredicate { pred: PredId },
    FinalInstMismatch { var: VarId, expected: Inst, actual: Inst },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModeError {
    kind: ModeErrorKind,
    goal: GoalId,
    context: Option<Context>,
    proc_name: String,
    message: String,
}

impl ModeError {
    pub(crate) fn new(
        kind: ModeErrorKind,
        goal: GoalId,
        context: Option<Context>,
        proc_name: &str,
        names: &VarSet,
    ) -> Self {
        let message = render(&kind, names);
        ModeError { kind, goal, context, proc_name: proc_name.to_string(), message }
    }

    pub fn kind(&self) -> &ModeErrorKind {
        &self.kind
    }

    pub fn goal_id(&self) -> GoalId {
        self.goal
    }

    pub fn proc_name(&self) -> &str {
        &self.proc_name
    }
}

fn render(kind: &ModeErrorKind, names: &VarSet) -> String {
    let n = |v: &VarId| names.name(*v);
    match kind {
        ModeErrorKind::NoMatchingMode { callee, args } => {
            let insts: Vec<String> = args.iter().map(|(v, i)| format!("{}::{}", n(v), i)).collect();
            format!("no mode of `{}` matches the call with arguments ({})", callee, insts.join(", "))
        }
        ModeErrorKind::AmbiguousMode { callee, candidates } => {
            let procs: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
            format!("call to `{}` matches several modes ({})", callee, procs.join(", "))
        }
        ModeErrorKind::MergeConflict { var, conflict } => {
            format!("branches disagree about `{}`: {}", n(var), conflict)
        }
        ModeErrorKind::BoundInNegation { var, inst } => {
            format!("`{}` is bound to `{}` inside a negated context", n(var), inst)
        }
        ModeErrorKind::FreeFreeUnification { left, right } => {
            format!("unification of two free variables `{}` and `{}`", n(left), n(right))
        }
        ModeErrorKind::PartialConstruction { var, free_args } => {
            let free: Vec<String> = free_args.iter().map(n).collect();
            format!("construction of `{}` with free arguments {}", n(var), free.join(", "))
        }
        ModeErrorKind::NonGroundTest { var, inst } => {
            format!("test unification of `{}` which is only `{}`", n(var), inst)
        }
        ModeErrorKind::HigherOrderTest { var } => {
            format!("higher-order value `{}` cannot be compared", n(var))
        }
        ModeErrorKind::ClobberedUse { var } => format!("`{}` is used after being clobbered", n(var)),
        ModeErrorKind::NotHigherOrder { var, inst } => {
            format!("`{}` is called but its inst `{}` has no higher-order information", n(var), inst)
        }
        ModeErrorKind::ArityMismatch { callee, expected, actual } => {
            format!("`{}` expects {} arguments, got {}", callee, expected, actual)
        }
        ModeErrorKind::UnknownPredicate { pred } => format!("unknown predicate {}", pred),
        ModeErrorKind::FinalInstMismatch { var, expected, actual } => {
            format!("head variable `{}` ends as `{}` but its mode requires `{}`", n(var), actual, expected)
        }
    }
}

impl std::fmt::Display for ModeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.context {
            Some(ctx) => write!(f, "{}: in {}: {}", ctx, self.proc_name, self.message),
            None => write!(f, "in {}: {}", self.proc_name, self.message),
        }
    }
}

impl std::error::Error for ModeError {}

impl DiagnosticExt for ModeError {
    fn level(&self) -> Level {
        Level::Error
    }

    fn message(&self) -> String {
        format!("in {}: {}", self.proc_name, self.message)
    }

    fn issuer(&self) -> String {
        "modus.analyzers.modes".into()
    }

    fn context(&self) -> Option<Context> {
        self.context.clone()
    }

    fn goal(&self) -> Option<GoalId> {
        Some(self.goal)
    }

    fn code(&self) -> u32 {
        match self.kind {
            ModeErrorKind::NoMatchingMode { .. } => 100,
            ModeErrorKind::AmbiguousMode { .. } => 101,
            ModeErrorKind::MergeConflict { .. } => 102,
            ModeErrorKind::BoundInNegation { .. } => 103,
            ModeErrorKind::FreeFreeUnification { .. } => 104,
            ModeErrorKind::PartialConstruction { .. } => 105,
            ModeErrorKind::NonGroundTest { .. } => 106,
            ModeErrorKind::HigherOrderTest { .. } => 107,
            ModeErrorKind::ClobberedUse { .. } => 108,
            ModeErrorKind::NotHigherOrder { .. } => 109,
            ModeErrorKind::ArityMismatch { .. } => 110,
            ModeErrorKind::UnknownPredicate { .. } => 111,
            ModeErrorKind::FinalInstMismatch { .. } => 112,
        }
    }
}
