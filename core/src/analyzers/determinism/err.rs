use crate::error::{DiagnosticExt, Level};
use crate::goal::{Determinism, GoalId};
use crate::location::Context;

/// A goal found responsible for a determinism violation.
#[derive(Debug, Clone, PartialEq)]
pub struct DetCause {
    pub goal: GoalId,
    pub context: Option<Context>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetErrorKind {
    /// Declared unable to fail, but can.
    CanFail { declared: Determinism, inferred: Determinism, causes: Vec<DetCause> },
    /// Declared at most one solution, but can have more.
    MultipleSolutions { declared: Determinism, inferred: Determinism, causes: Vec<DetCause> },
    /// Declared to have no solutions, but can succeed.
    NotErroneous { declared: Determinism, inferred: Determinism, causes: Vec<DetCause> },
    NondetCondition { inferred: Determinism },
    UnreachableCode,
    CondCannotFail,
    TighterThanDeclared { declared: Determinism, inferred: Determinism },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetError {
    kind: DetErrorKind,
    goal: GoalId,
    context: Option<Context>,
    proc_name: String,
}

impl DetError {
    pub(crate) fn new(kind: DetErrorKind, goal: GoalId, context: Option<Context>, proc_name: &str) -> Self {
        DetError { kind, goal, context, proc_name: proc_name.to_string() }
    }

    pub fn kind(&self) -> &DetErrorKind {
        &self.kind
    }

    pub fn goal_id(&self) -> GoalId {
        self.goal
    }

    pub fn proc_name(&self) -> &str {
        &self.proc_name
    }

    /// The sub-goals blamed for a violation, innermost first.
    pub fn causes(&self) -> &[DetCause] {
        match &self.kind {
            DetErrorKind::CanFail { causes, .. }
            | DetErrorKind::MultipleSolutions { causes, .. }
            | DetErrorKind::NotErroneous { causes, .. } => causes,
            _ => &[],
        }
    }

    fn render(&self) -> String {
        let mut text = match &self.kind {
            DetErrorKind::CanFail { declared, inferred, .. } => {
                format!("declared {} but inferred {}: the procedure can fail", declared, inferred)
            }
            DetErrorKind::MultipleSolutions { declared, inferred, .. } => {
                format!("declared {} but inferred {}: the procedure can succeed more than once", declared, inferred)
            }
            DetErrorKind::NotErroneous { declared, inferred, .. } => {
                format!("declared {} but inferred {}: the procedure can succeed", declared, inferred)
            }
            DetErrorKind::NondetCondition { inferred } => format!(
                "condition of if-then-else is {} and may succeed more than once; wrap it in a commit scope",
                inferred
            ),
            DetErrorKind::UnreachableCode => "goal is unreachable: a previous goal cannot succeed".to_string(),
            DetErrorKind::CondCannotFail => "condition of if-then-else cannot fail".to_string(),
            DetErrorKind::TighterThanDeclared { declared, inferred } => {
                format!("declared {} but the body is {}", declared, inferred)
            }
        };
        for cause in self.causes() {
            match &cause.context {
                Some(ctx) => text.push_str(&format!("\n  {}: {}", ctx, cause.description)),
                None => text.push_str(&format!("\n  {}: {}", cause.goal, cause.description)),
            }
        }
        text
    }
}

impl std::fmt::Display for DetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.context {
            Some(ctx) => write!(f, "{}: in {}: {}", ctx, self.proc_name, self.render()),
            None => write!(f, "in {}: {}", self.proc_name, self.render()),
        }
    }
}

impl std::error::Error for DetError {}

impl DiagnosticExt for DetError {
    fn level(&self) -> Level {
        match self.kind {
            DetErrorKind::CanFail { .. }
            | DetErrorKind::MultipleSolutions { .. }
            | DetErrorKind::NotErroneous { .. }
            | DetErrorKind::NondetCondition { .. } => Level::Error,
            DetErrorKind::UnreachableCode | DetErrorKind::CondCannotFail => Level::Warning,
            DetErrorKind::TighterThanDeclared { .. } => Level::Info,
        }
    }

    fn message(&self) -> String {
        format!("in {}: {}", self.proc_name, self.render())
    }

    fn issuer(&self) -> String {
        "modus.analyzers.determinism".into()
    }

    fn context(&self) -> Option<Context> {
        self.context.clone()
    }

    fn goal(&self) -> Option<GoalId> {
        Some(self.goal)
    }

    fn code(&self) -> u32 {
        match self.kind {
            DetErrorKind::CanFail { .. } => 200,
            DetErrorKind::MultipleSolutions { .. } => 201,
            DetErrorKind::NotErroneous { .. } => 202,
            DetErrorKind::NondetCondition { .. } => 203,
            DetErrorKind::UnreachableCode => 210,
            DetErrorKind::CondCannotFail => 211,
            DetErrorKind::TighterThanDeclared { .. } => 220,
        }
    }
}
