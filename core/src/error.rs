use std::fmt;

use serde::{Deserialize, Serialize};

use crate::goal::{GoalId, ProcRef};
use crate::location::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level_str = match self {
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        };
        write!(f, "{}", level_str)
    }
}

/// Common surface of every collectible diagnostic the passes produce.
pub trait DiagnosticExt: Send + Sync {
    fn level(&self) -> Level;
    fn message(&self) -> String;
    fn issuer(&self) -> String;
    fn context(&self) -> Option<Context>;
    fn goal(&self) -> Option<GoalId>;
    /// Stable numeric code used by the report layer.
    fn code(&self) -> u32;
}

impl fmt::Debug for dyn DiagnosticExt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ctx_str = match self.context() {
            Some(ctx) => ctx.to_string(),
            None => "unknown".to_string(),
        };
        let goal_str = match self.goal() {
            Some(goal) => goal.to_string(),
            None => "goal:none".to_string(),
        };

        write!(
            f,
            "MODUS | {} | {} | {} | {} | {}",
            self.level(),
            ctx_str,
            self.issuer(),
            goal_str,
            self.message()
        )
    }
}

impl fmt::Display for dyn DiagnosticExt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// An invariant violation inside the compiler. Never caused by user input;
/// aborts compilation of the whole module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalFault {
    message: String,
    issuer: String,
    proc: Option<ProcRef>,
    goal: Option<GoalId>,
}

impl InternalFault {
    pub fn new(issuer: impl Into<String>, message: impl Into<String>) -> Self {
        InternalFault {
            message: message.into(),
            issuer: issuer.into(),
            proc: None,
            goal: None,
        }
    }

    pub fn in_proc(mut self, proc: ProcRef) -> Self {
        self.proc = Some(proc);
        self
    }

    pub fn at_goal(mut self, goal: Option<GoalId>) -> Self {
        if self.goal.is_none() {
            self.goal = goal;
        }
        self
    }

    pub fn proc(&self) -> Option<ProcRef> {
        self.proc
    }
}

impl fmt::Display for InternalFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "internal fault in {}: {}", self.issuer, self.message)?;
        if let Some(proc) = self.proc {
            write!(f, " (procedure {})", proc)?;
        }
        if let Some(goal) = self.goal {
            write!(f, " (goal {})", goal)?;
        }
        Ok(())
    }
}

impl std::error::Error for InternalFault {}

impl DiagnosticExt for InternalFault {
    fn level(&self) -> Level {
        Level::Critical
    }

    fn message(&self) -> String {
        self.to_string()
    }

    fn issuer(&self) -> String {
        self.issuer.clone()
    }

    fn context(&self) -> Option<Context> {
        None
    }

    fn goal(&self) -> Option<GoalId> {
        self.goal
    }

    fn code(&self) -> u32 {
        999
    }
}
