// Reporting of diagnostics produced while compiling a module.
// Every pass returns its own error types; this module flattens them into
// serialisable reports that can be printed, styled or exported as JSON.

use console::Style;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt;

use crate::error::{DiagnosticExt, Level};
use crate::goal::GoalId;
use crate::location::Context;

/// Severity levels for reports
///
/// # Examples
/// ```
/// use modus_core::reports::Severity;
/// let severity = Severity::Error;
/// assert!(severity.is_failure());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Fatal,
    Error,
    Warning,
    Info,
}

impl Severity {
    /// The module cannot be used as compiled.
    pub fn is_failure(self) -> bool {
        matches!(self, Severity::Fatal | Severity::Error)
    }
}

impl From<Level> for Severity {
    fn from(level: Level) -> Self {
        match level {
            Level::Critical => Severity::Fatal,
            Level::Error => Severity::Error,
            Level::Warning => Severity::Warning,
            Level::Info => Severity::Info,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Fatal => "FATAL",
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        };
        write!(f, "{}", s)
    }
}

/// Stable diagnostic code for programmatic handling
///
/// # Examples
/// ```
/// use modus_core::reports::ErrorCode;
/// assert_eq!(ErrorCode(200).as_str(), "E_200");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub u32);

impl ErrorCode {
    pub fn as_str(&self) -> String {
        format!("E_{}", self.0)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One diagnostic, detached from the pass that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub message: String,
    pub severity: Severity,
    pub code: ErrorCode,
    pub issuer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<GoalId>,
}

impl Report {
    pub fn new(message: &str, severity: Severity, code: ErrorCode, issuer: &str) -> Self {
        Report { message: message.to_string(), severity, code, issuer: issuer.to_string(), context: None, goal: None }
    }

    pub fn from_diagnostic(diag: &dyn DiagnosticExt) -> Self {
        Report {
            message: diag.message(),
            severity: diag.level().into(),
            code: ErrorCode(diag.code()),
            issuer: diag.issuer(),
            context: diag.context(),
            goal: diag.goal(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    fn styled(&self) -> String {
        let sev = match self.severity {
            Severity::Fatal => Style::new().on_red().white().bold(),
            Severity::Error => Style::new().red().bold(),
            Severity::Warning => Style::new().yellow().bold(),
            Severity::Info => Style::new().blue().bold(),
        };
        let mut out = format!("{} {}", sev.apply_to(format!("[{}]", self.severity)), Style::new().bold().apply_to(&self.message));
        if let Some(ctx) = &self.context {
            out.push_str(&format!("\n --> {}", ctx));
        }
        let tail = match self.goal {
            Some(goal) => format!("{} {} in {}", self.code, self.issuer, goal),
            None => format!("{} {}", self.code, self.issuer),
        };
        out.push_str(&format!("\n     {}", Style::new().dim().apply_to(tail)));
        out
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loc = match &self.context {
            Some(ctx) => format!(" at {}", ctx),
            None => String::new(),
        };
        write!(f, "[{}]{} ({}): {}", self.severity, loc, self.code, self.message)
    }
}

impl Error for Report {}

/// Collector that aggregates reports, drops duplicates and exports them.
///
/// # Examples
/// ```
/// use modus_core::reports::{ErrorCode, Report, ReportCollector, Severity};
/// let mut collector = ReportCollector::new();
/// collector.push(Report::new("an error", Severity::Error, ErrorCode(1), "doc"));
/// collector.push(Report::new("an error", Severity::Error, ErrorCode(1), "doc"));
/// assert_eq!(collector.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReportCollector {
    reports: Vec<Report>,
    // dedupe key: (message, code, goal)
    seen: HashSet<(String, ErrorCode, Option<GoalId>)>,
}

impl ReportCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, r: Report) {
        let key = (r.message.clone(), r.code, r.goal);
        if self.seen.insert(key) {
            self.reports.push(r);
        }
    }

    pub fn push_diagnostic(&mut self, diag: &dyn DiagnosticExt) {
        self.push(Report::from_diagnostic(diag));
    }

    pub fn extend(&mut self, others: impl IntoIterator<Item = Report>) {
        for r in others {
            self.push(r);
        }
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn has_fatal(&self) -> bool {
        self.reports.iter().any(|r| r.severity == Severity::Fatal)
    }

    pub fn has_errors(&self) -> bool {
        self.reports.iter().any(|r| r.severity.is_failure())
    }

    pub fn has_warnings(&self) -> bool {
        self.reports.iter().any(|r| r.severity == Severity::Warning)
    }

    /// Reports with the given code, in insertion order.
    pub fn with_code(&self, code: u32) -> Vec<&Report> {
        self.reports.iter().filter(|r| r.code.0 == code).collect()
    }

    /// (fatal, error, warning, info)
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        let mut f = 0;
        let mut e = 0;
        let mut w = 0;
        let mut i = 0;
        for r in &self.reports {
            match r.severity {
                Severity::Fatal => f += 1,
                Severity::Error => e += 1,
                Severity::Warning => w += 1,
                Severity::Info => i += 1,
            }
        }
        (f, e, w, i)
    }

    /// 0 = nothing worse than warnings, 1 = errors, 2 = fatal
    pub fn exit_code(&self) -> i32 {
        let (f, e, _, _) = self.counts();
        if f > 0 {
            2
        } else if e > 0 {
            1
        } else {
            0
        }
    }

    /// Most severe first, then by position.
    pub fn sort(&mut self) {
        self.reports.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| a.context.as_ref().map(|c| (&c.file, c.line)).cmp(&b.context.as_ref().map(|c| (&c.file, c.line))))
        });
    }

    pub fn render_text(&self) -> String {
        self.reports.iter().map(|r| format!("{}\n", r)).collect()
    }

    pub fn render_styled(&self) -> String {
        self.reports.iter().map(|r| format!("{}\n", r.styled())).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.reports)
    }
}
