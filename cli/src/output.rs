/// cli/src/output.rs
/// Output utilities for the CLI
/// description: where diagnostics, notes, solutions and the progress bar go,
/// in either styled text or JSON.

use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use modus_core::reports::ReportCollector;
use modus_core::{CompileError, Value};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

/// Prints to the terminal in one output format.
///
/// Diagnostics always go to stderr; listings and solutions to stdout.
pub struct Printer {
    format: Format,
    styled: bool,
}

impl Printer {
    pub fn new(format: Format) -> Self {
        Printer { format, styled: Term::stderr().features().colors_supported() }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn reports(&self, reports: &ReportCollector) {
        if reports.is_empty() {
            return;
        }
        match self.format {
            Format::Json => match reports.to_json() {
                Ok(json) => eprintln!("{}", json),
                Err(e) => eprintln!("cannot serialise reports: {}", e),
            },
            Format::Text if self.styled => eprint!("{}", reports.render_styled()),
            Format::Text => eprint!("{}", reports.render_text()),
        }
    }

    pub fn compile_error(&self, e: &CompileError) {
        let mut reports = ReportCollector::new();
        reports.push(e.report());
        self.reports(&reports);
    }

    /// One line tallying the diagnostics of a check.
    pub fn summary(&self, reports: &ReportCollector, clean: usize) {
        let (fatal, errors, warnings, _) = reports.counts();
        let line = format!(
            "{} procedure(s) passed, {} error(s), {} warning(s)",
            clean,
            fatal + errors,
            warnings
        );
        if !self.styled {
            eprintln!("{}", line);
        } else if fatal + errors > 0 {
            eprintln!("{}", style(line).red().bold());
        } else {
            eprintln!("{}", style(line).green().bold());
        }
    }

    pub fn note(&self, text: &str) {
        if self.format == Format::Text {
            eprintln!("{}", style(text).dim());
        }
    }

    /// A bar over `total` procedures, or nothing when stderr is not a
    /// terminal or the output is JSON.
    pub fn progress(&self, total: usize) -> Option<ProgressBar> {
        if self.format != Format::Text || total == 0 || !Term::stderr().is_term() {
            return None;
        }
        let bar = ProgressBar::new(total as u64);
        if let Ok(bar_style) = ProgressStyle::with_template("{bar:30.cyan/blue} {pos:>3}/{len:3} {msg}") {
            bar.set_style(bar_style.progress_chars("█▒░"));
        }
        Some(bar)
    }

    pub fn solutions(&self, solutions: &[Vec<Value>]) {
        match self.format {
            Format::Json => {
                #[derive(Serialize)]
                struct Solutions<'a> {
                    count: usize,
                    solutions: &'a [Vec<Value>],
                }
                match serde_json::to_string_pretty(&Solutions { count: solutions.len(), solutions }) {
                    Ok(json) => println!("{}", json),
                    Err(e) => eprintln!("cannot serialise solutions: {}", e),
                }
            }
            Format::Text => {
                if solutions.is_empty() {
                    println!("no");
                    return;
                }
                for solution in solutions {
                    let shown: Vec<String> = solution.iter().map(|v| v.to_string()).collect();
                    if shown.is_empty() {
                        println!("yes");
                    } else {
                        println!("{}", shown.join(", "));
                    }
                }
            }
        }
    }
}
