//! file: core/src/analyzers/determinism/mod.rs
//! description: determinism inference and checking.
//!
//! Infers the determinism of every goal bottom-up, checks the body against
//! the declared determinism of the procedure and diagnoses violations down
//! to the sub-goals responsible. Requires a mode-correct body.
use log::debug;

use crate::error::InternalFault;
use crate::goal::{Determinism, MaxSolns, ModuleTable, Procedure};

mod analyzer;
mod diagnose;
mod err;

pub use err::{DetCause, DetError, DetErrorKind};

use analyzer::{DetCtx, DetSink};

/// A procedure that passed determinism checking, with its non-fatal notes.
#[derive(Debug)]
pub struct DetOutcome {
    pub proc: Procedure,
    pub warnings: Vec<DetError>,
}

/// Annotates `proc` and returns the determinism of its body, without
/// comparing it against any declaration. Used by the driver's inference of
/// undeclared procedures.
pub fn infer_determinism(mut proc: Procedure, table: &ModuleTable) -> Result<(Procedure, Determinism), InternalFault> {
    let proc_name = table.proc_name(proc.proc_ref);
    let det = {
        let ctx = DetCtx {
            table,
            varset: &proc.varset,
            var_types: &proc.var_types,
            proc_ref: proc.proc_ref,
            proc_name,
        };
        ctx.infer(&mut proc.body, &mut DetSink::default())?
    };
    proc.inferred_det = Some(det);
    Ok((proc, det))
}

/// Checks the body of `proc` against its declared determinism. The outer
/// `Err` is an internal fault (a body that was not mode-checked) and aborts
/// the compile; the inner one carries the user's errors.
pub fn analyze_determinism(
    proc: Procedure,
    table: &ModuleTable,
) -> Result<Result<DetOutcome, Vec<DetError>>, InternalFault> {
    let Procedure { proc_ref, head_vars, varset, var_types, mut body, .. } = proc;
    let proc_name = table.proc_name(proc_ref);
    let ctx = DetCtx { table, varset: &varset, var_types: &var_types, proc_ref, proc_name: proc_name.clone() };

    let mut sink = DetSink::default();
    let inferred = ctx.infer(&mut body, &mut sink)?;

    let declared = table.proc(proc_ref).and_then(|d| d.det);
    if let Some(declared) = declared {
        let (decl_cf, decl_ms) = declared.components();
        let (inf_cf, inf_ms) = inferred.components();
        let at = |kind| DetError::new(kind, body.id, body.info.context.clone(), &proc_name);
        if inf_cf > decl_cf {
            let mut causes = Vec::new();
            ctx.failing_goals(&body, &mut causes);
            sink.errors.push(at(DetErrorKind::CanFail { declared, inferred, causes }));
        }
        if decl_ms == MaxSolns::Zero && inf_ms > MaxSolns::Zero {
            let mut causes = Vec::new();
            ctx.succeeding_goals(&body, &mut causes);
            sink.errors.push(at(DetErrorKind::NotErroneous { declared, inferred, causes }));
        } else if inf_ms > decl_ms {
            let mut causes = Vec::new();
            ctx.multi_goals(&body, &mut causes);
            sink.errors.push(at(DetErrorKind::MultipleSolutions { declared, inferred, causes }));
        }
        if sink.errors.is_empty() && inferred != declared {
            sink.warnings.push(at(DetErrorKind::TighterThanDeclared { declared, inferred }));
        }
    }

    debug!(
        "determinism: {} inferred {} with {} error(s), {} note(s)",
        proc_name,
        inferred,
        sink.errors.len(),
        sink.warnings.len()
    );
    if !sink.errors.is_empty() {
        return Ok(Err(sink.errors));
    }
    let proc = Procedure { proc_ref, head_vars, varset, var_types, body, inferred_det: Some(inferred) };
    Ok(Ok(DetOutcome { proc, warnings: sink.warnings }))
}
