use crate::error::{DiagnosticExt, Level};
use crate::goal::{ConsId, GoalId};
use crate::location::Context;

/// A switch over a closed type that leaves some constructors uncovered.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchWarning {
    pub goal: GoalId,
    pub context: Option<Context>,
    pub proc_name: String,
    pub var_name: String,
    pub missing: Vec<ConsId>,
}

impl std::fmt::Display for SwitchWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ctx) = &self.context {
            write!(f, "{}: ", ctx)?;
        }
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for SwitchWarning {}

impl DiagnosticExt for SwitchWarning {
    fn level(&self) -> Level {
        Level::Warning
    }

    fn message(&self) -> String {
        let missing: Vec<String> = self.missing.iter().map(ConsId::to_string).collect();
        format!(
            "in {}: switch on `{}` does not cover {}",
            self.proc_name,
            self.var_name,
            missing.join(", ")
        )
    }

    fn issuer(&self) -> String {
        "modus.analyzers.switch".into()
    }

    fn context(&self) -> Option<Context> {
        self.context.clone()
    }

    fn goal(&self) -> Option<GoalId> {
        Some(self.goal)
    }

    fn code(&self) -> u32 {
        300
    }
}
