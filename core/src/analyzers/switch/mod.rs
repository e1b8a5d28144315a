//! file: core/src/analyzers/switch/mod.rs
//! description: switch detection.
//!
//! Turns disjunctions whose branches test one bound variable against
//! distinct constructors into explicit switches, and if-then-elses testing
//! one constructor of a closed type into two-arm switches. The rewrite
//! never changes determinism.
use log::debug;

use crate::error::InternalFault;
use crate::goal::{ModuleTable, Procedure};

pub(crate) mod candidate;
mod detect;
mod err;

pub use err::SwitchWarning;

use detect::SwitchCtx;

#[derive(Debug)]
pub struct SwitchOutcome {
    pub proc: Procedure,
    pub warnings: Vec<SwitchWarning>,
}

pub fn detect_switches(proc: Procedure, table: &ModuleTable) -> Result<SwitchOutcome, InternalFault> {
    let Procedure { proc_ref, head_vars, varset, var_types, body, inferred_det } = proc;
    let proc_name = table.proc_name(proc_ref);
    let mut next_id = 0;
    body.walk(&mut |g| next_id = next_id.max(g.id.0 + 1));

    let mut ctx = SwitchCtx {
        table,
        varset: &varset,
        var_types: &var_types,
        proc_ref,
        proc_name: proc_name.clone(),
        next_id,
        warnings: Vec::new(),
        rewritten: 0,
    };
    let body = ctx.detect(body)?;
    let SwitchCtx { warnings, rewritten, .. } = ctx;
    debug!("switch: {} rewrote {} goal(s)", proc_name, rewritten);

    let mut proc = Procedure { proc_ref, head_vars, varset, var_types, body, inferred_det };
    if rewritten > 0 {
        proc.requantify();
    }
    Ok(SwitchOutcome { proc, warnings })
}
