//! file: core/src/policy.rs
//! description: optimisation policy.
//!
//! One `OptTuple` is built per compilation from a numeric level (0..=6) and
//! an ordered list of overrides, then only read. Later stages never look at
//! raw flags.
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::error::{DiagnosticExt, Level};
use crate::goal::GoalId;
use crate::location::Context;

pub const MAX_LEVEL: u8 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptTuple {
    level: u8,
    peephole: bool,
    jumps: bool,
    labels: bool,
    dupelim: bool,
    excess_assign: bool,
    inline: bool,
    inline_simple_threshold: usize,
    inline_compound_threshold: usize,
    tailcall_loops: bool,
    licm: bool,
    jump_tables: bool,
    jump_table_min_cases: usize,
    repeat: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptFlag {
    Peephole,
    Jumps,
    Labels,
    Dupelim,
    ExcessAssign,
    Inline,
    TailcallLoops,
    Licm,
    JumpTables,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptValue {
    InlineSimpleThreshold,
    InlineCompoundThreshold,
    JumpTableMinCases,
    Repeat,
}

/// One explicit setting layered over the level defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptOverride {
    Flag(OptFlag, bool),
    Value(OptValue, usize),
}

const FLAG_NAMES: &[(&str, OptFlag)] = &[
    ("peephole", OptFlag::Peephole),
    ("jumps", OptFlag::Jumps),
    ("labels", OptFlag::Labels),
    ("dupelim", OptFlag::Dupelim),
    ("excess-assign", OptFlag::ExcessAssign),
    ("inline", OptFlag::Inline),
    ("tailcall-loops", OptFlag::TailcallLoops),
    ("licm", OptFlag::Licm),
    ("jump-tables", OptFlag::JumpTables),
];

const VALUE_NAMES: &[(&str, OptValue)] = &[
    ("inline-simple-threshold", OptValue::InlineSimpleThreshold),
    ("inline-compound-threshold", OptValue::InlineCompoundThreshold),
    ("jump-table-min-cases", OptValue::JumpTableMinCases),
    ("repeat", OptValue::Repeat),
];

lazy_static! {
    static ref LEVEL_DEFAULTS: Vec<OptTuple> = (0..=MAX_LEVEL).map(level_defaults).collect();
}

fn level_defaults(level: u8) -> OptTuple {
    let (simple, compound) = match level {
        0 | 1 => (0, 0),
        2 => (5, 0),
        3 => (5, 10),
        4 => (8, 20),
        5 => (10, 30),
        _ => (12, 40),
    };
    OptTuple {
        level,
        peephole: level >= 1,
        jumps: level >= 1,
        labels: level >= 1,
        dupelim: level >= 3,
        excess_assign: level >= 2,
        inline: level >= 2,
        inline_simple_threshold: simple,
        inline_compound_threshold: compound,
        tailcall_loops: level >= 2,
        licm: level >= 4,
        jump_tables: level >= 2,
        jump_table_min_cases: 4,
        repeat: match level {
            0..=2 => 1,
            3 | 4 => 3,
            5 => 4,
            _ => 5,
        },
    }
}

impl OptTuple {
    pub fn from_level(level: u8) -> Result<OptTuple, PolicyError> {
        LEVEL_DEFAULTS
            .get(level as usize)
            .cloned()
            .ok_or_else(|| PolicyError::new(format!("optimisation level {} is above {}", level, MAX_LEVEL)))
    }

    /// Level defaults with `overrides` applied in order; the last override
    /// of a given switch wins.
    pub fn build(level: u8, overrides: &[OptOverride]) -> Result<OptTuple, PolicyError> {
        let mut tuple = OptTuple::from_level(level)?;
        for o in overrides {
            match *o {
                OptOverride::Flag(flag, on) => match flag {
                    OptFlag::Peephole => tuple.peephole = on,
                    OptFlag::Jumps => tuple.jumps = on,
                    OptFlag::Labels => tuple.labels = on,
                    OptFlag::Dupelim => tuple.dupelim = on,
                    OptFlag::ExcessAssign => tuple.excess_assign = on,
                    OptFlag::Inline => tuple.inline = on,
                    OptFlag::TailcallLoops => tuple.tailcall_loops = on,
                    OptFlag::Licm => tuple.licm = on,
                    OptFlag::JumpTables => tuple.jump_tables = on,
                },
                OptOverride::Value(value, n) => match value {
                    OptValue::InlineSimpleThreshold => tuple.inline_simple_threshold = n,
                    OptValue::InlineCompoundThreshold => tuple.inline_compound_threshold = n,
                    OptValue::JumpTableMinCases => tuple.jump_table_min_cases = n,
                    OptValue::Repeat => tuple.repeat = n,
                },
            }
        }
        Ok(tuple)
    }

    /// Parses override strings and builds the tuple in one step.
    pub fn from_args<S: AsRef<str>>(level: u8, overrides: &[S]) -> Result<OptTuple, PolicyError> {
        let parsed = overrides
            .iter()
            .map(|s| s.as_ref().parse::<OptOverride>())
            .collect::<Result<Vec<_>, _>>()?;
        OptTuple::build(level, &parsed)
    }

    pub fn level(&self) -> u8 {
        self.level
    }
    pub fn peephole(&self) -> bool {
        self.peephole
    }
    pub fn jumps(&self) -> bool {
        self.jumps
    }
    pub fn labels(&self) -> bool {
        self.labels
    }
    pub fn dupelim(&self) -> bool {
        self.dupelim
    }
    pub fn excess_assign(&self) -> bool {
        self.excess_assign
    }
    pub fn inline(&self) -> bool {
        self.inline
    }
    pub fn inline_simple_threshold(&self) -> usize {
        self.inline_simple_threshold
    }
    pub fn inline_compound_threshold(&self) -> usize {
        self.inline_compound_threshold
    }
    pub fn tailcall_loops(&self) -> bool {
        self.tailcall_loops
    }
    pub fn licm(&self) -> bool {
        self.licm
    }
    pub fn jump_tables(&self) -> bool {
        self.jump_tables
    }
    pub fn jump_table_min_cases(&self) -> usize {
        self.jump_table_min_cases
    }
    /// How many times the instruction-level passes are iterated at most.
    pub fn repeat(&self) -> usize {
        self.repeat
    }

    fn flags(&self) -> Vec<(&'static str, bool)> {
        FLAG_NAMES
            .iter()
            .map(|(name, flag)| {
                let on = match flag {
                    OptFlag::Peephole => self.peephole,
                    OptFlag::Jumps => self.jumps,
                    OptFlag::Labels => self.labels,
                    OptFlag::Dupelim => self.dupelim,
                    OptFlag::ExcessAssign => self.excess_assign,
                    OptFlag::Inline => self.inline,
                    OptFlag::TailcallLoops => self.tailcall_loops,
                    OptFlag::Licm => self.licm,
                    OptFlag::JumpTables => self.jump_tables,
                };
                (*name, on)
            })
            .collect()
    }
}

impl Default for OptTuple {
    fn default() -> Self {
        level_defaults(0)
    }
}

impl fmt::Display for OptTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-O{}", self.level)?;
        for (name, on) in self.flags() {
            if on {
                write!(f, " {}", name)?;
            }
        }
        write!(
            f,
            " inline-simple-threshold={} inline-compound-threshold={} jump-table-min-cases={} repeat={}",
            self.inline_simple_threshold, self.inline_compound_threshold, self.jump_table_min_cases, self.repeat
        )
    }
}

impl FromStr for OptOverride {
    type Err = PolicyError;

    /// `flag`, `no-flag` or `name=n`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((name, value)) = s.split_once('=') {
            let Some((_, which)) = VALUE_NAMES.iter().find(|(n, _)| *n == name) else {
                return Err(PolicyError::new(format!("unknown optimisation setting `{}`", name)));
            };
            let n = value
                .parse::<usize>()
                .map_err(|_| PolicyError::new(format!("`{}` expects a number, got `{}`", name, value)))?;
            return Ok(OptOverride::Value(*which, n));
        }
        let (name, on) = match s.strip_prefix("no-") {
            Some(rest) => (rest, false),
            None => (s, true),
        };
        FLAG_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, flag)| OptOverride::Flag(*flag, on))
            .ok_or_else(|| PolicyError::new(format!("unknown optimisation flag `{}`", name)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyError {
    message: String,
}

impl PolicyError {
    pub fn new(message: String) -> Self {
        PolicyError { message }
    }
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PolicyError {}

impl DiagnosticExt for PolicyError {
    fn level(&self) -> Level {
        Level::Error
    }

    fn message(&self) -> String {
        self.message.clone()
    }

    fn issuer(&self) -> String {
        "modus.policy".into()
    }

    fn context(&self) -> Option<Context> {
        None
    }

    fn goal(&self) -> Option<GoalId> {
        None
    }

    fn code(&self) -> u32 {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_only_add_optimisations() {
        let mut prev = OptTuple::from_level(0).unwrap();
        assert!(prev.flags().iter().all(|(_, on)| !on));
        for level in 1..=MAX_LEVEL {
            let cur = OptTuple::from_level(level).unwrap();
            for ((name, was), (_, now)) in prev.flags().into_iter().zip(cur.flags()) {
                assert!(!was || now, "{} switched off at level {}", name, level);
            }
            assert!(cur.inline_compound_threshold >= prev.inline_compound_threshold);
            prev = cur;
        }
    }

    #[test]
    fn repeat_grows_with_level() {
        let repeats: Vec<usize> = (0..=MAX_LEVEL).map(|l| OptTuple::from_level(l).unwrap().repeat()).collect();
        assert_eq!(repeats, vec![1, 1, 1, 3, 3, 4, 5]);
    }

    #[test]
    fn last_override_wins() {
        let t = OptTuple::from_args(2, &["no-peephole", "repeat=7", "peephole", "repeat=2"]).unwrap();
        assert!(t.peephole());
        assert_eq!(t.repeat(), 2);
        assert!(t.inline());
    }

    #[test]
    fn rejects_unknown_names_and_levels() {
        assert!(OptTuple::from_level(7).is_err());
        assert!("no-such-pass".parse::<OptOverride>().is_err());
        assert!("repeat=lots".parse::<OptOverride>().is_err());
        assert!("depth=3".parse::<OptOverride>().is_err());
    }
}
