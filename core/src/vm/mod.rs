//! A small interpreter for generated code, used to check that code produced
//! under different optimization settings computes the same solutions.
use std::fmt;

use crate::goal::{ModuleTable, ProcRef};
use crate::ir::module::ModuleCode;

mod exec;
pub mod term;
pub mod value;

pub use exec::DEFAULT_STEP_LIMIT;
pub use term::parse_term;
pub use value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmError {
    message: String,
    proc: Option<String>,
    pc: Option<usize>,
}

impl VmError {
    pub fn new(message: impl Into<String>) -> Self {
        VmError { message: message.into(), proc: None, pc: None }
    }

    pub(crate) fn at(mut self, proc: Option<String>, pc: usize) -> Self {
        self.proc = proc;
        self.pc = Some(pc);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "runtime error: {}", self.message)?;
        if let (Some(proc), Some(pc)) = (&self.proc, self.pc) {
            write!(f, " (in {} at {:04})", proc, pc)?;
        }
        Ok(())
    }
}

impl std::error::Error for VmError {}

/// Runs `proc` on `inputs` and returns its solutions in order, each as the
/// values of its output arguments.
pub fn run_proc(
    module: &ModuleCode,
    table: &ModuleTable,
    proc: ProcRef,
    inputs: Vec<Value>,
) -> Result<Vec<Vec<Value>>, VmError> {
    run_proc_with_limit(module, table, proc, inputs, DEFAULT_STEP_LIMIT)
}

pub fn run_proc_with_limit(
    module: &ModuleCode,
    table: &ModuleTable,
    proc: ProcRef,
    inputs: Vec<Value>,
    step_limit: usize,
) -> Result<Vec<Vec<Value>>, VmError> {
    let decl = table.proc(proc).ok_or_else(|| VmError::new(format!("unknown procedure {}", proc)))?;
    let expected = decl.modes.iter().filter(|m| m.is_input()).count();
    if inputs.len() != expected {
        return Err(VmError::new(format!(
            "{} takes {} input(s), {} given",
            table.proc_name(proc),
            expected,
            inputs.len()
        )));
    }
    let outputs = decl.modes.iter().filter(|m| m.is_output()).count();
    exec::Machine::new(module, step_limit).run(proc, inputs, outputs)
}
