use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::goal::{CodeModel, ProcRef};
use crate::ir::op::{Instr, Instruction, LabelId};

/// Generated code of one procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcCode {
    pub proc: ProcRef,
    pub name: String,
    pub model: CodeModel,
    pub frame_size: usize,
    pub instrs: Vec<Instruction>,
}

impl ProcCode {
    /// Index of every label in `instrs`.
    pub fn label_positions(&self) -> HashMap<LabelId, usize> {
        self.instrs
            .iter()
            .enumerate()
            .filter_map(|(i, ins)| match ins.instr {
                Instr::Label(l) => Some((l, i)),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// Instructions other than labels and comments.
    pub fn op_count(&self) -> usize {
        self.instrs
            .iter()
            .filter(|i| !matches!(i.instr, Instr::Label(_) | Instr::Comment(_)))
            .count()
    }

    pub fn count(&self, pred: impl Fn(&Instr) -> bool) -> usize {
        self.instrs.iter().filter(|i| pred(&i.instr)).count()
    }
}

impl fmt::Display for ProcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}, frame {}):", self.name, self.model, self.frame_size)?;
        for (i, ins) in self.instrs.iter().enumerate() {
            writeln!(f, "{:04}: {}", i, ins)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleCode {
    pub name: String,
    pub procs: Vec<ProcCode>,
}

impl ModuleCode {
    pub fn new(name: &str) -> Self {
        ModuleCode { name: name.to_string(), procs: Vec::new() }
    }

    pub fn proc(&self, proc: ProcRef) -> Option<&ProcCode> {
        self.procs.iter().find(|p| p.proc == proc)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for ModuleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module {}", self.name)?;
        for proc in &self.procs {
            writeln!(f)?;
            write!(f, "{}", proc)?;
        }
        Ok(())
    }
}
