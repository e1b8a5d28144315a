//! file: core/src/analyzers/modes/mod.rs
//! description: mode analysis.
//!
//! Threads an inst map through the body of a procedure, choosing the
//! concrete operation of every unification, the callee mode of every call,
//! and an order for every conjunction in which producers precede consumers.
//! Errors are collected; after an error the inst map becomes unreachable so
//! that dependent goals do not report again.
use log::debug;

use crate::goal::{Inst, ModuleTable, Procedure, Uniqueness};

mod analyzer;
mod call;
mod err;
mod instmap;
mod unify;

pub use err::{ModeError, ModeErrorKind};
pub use instmap::InstMap;

use analyzer::ModeCtx;

pub fn analyze_modes(proc: Procedure, table: &ModuleTable) -> Result<Procedure, Vec<ModeError>> {
    let Procedure { proc_ref, head_vars, varset, var_types, body, inferred_det } = proc;
    let proc_name = table.proc_name(proc_ref);
    let ctx = ModeCtx { table, varset: &varset, var_types: &var_types, proc_name: proc_name.clone() };

    let Some(decl) = table.proc(proc_ref) else {
        let err = ctx.error(
            body.id,
            &body.info,
            ModeErrorKind::UnknownPredicate { pred: proc_ref.pred },
        );
        return Err(vec![err]);
    };

    let mut instmap = InstMap::new();
    for (v, m) in head_vars.iter().zip(&decl.modes) {
        instmap.set(*v, m.initial.clone());
    }

    let mut errors = Vec::new();
    let body = ctx.check_goal(body, &mut instmap, &mut errors);

    if instmap.is_reachable() {
        for (v, m) in head_vars.iter().zip(&decl.modes) {
            let actual = instmap.lookup(*v);
            if !matches_final(&actual, &m.final_) {
                errors.push(ctx.error(
                    body.id,
                    &body.info,
                    ModeErrorKind::FinalInstMismatch { var: *v, expected: m.final_.clone(), actual },
                ));
            }
        }
    }

    debug!("modes: {} checked with {} error(s)", proc_name, errors.len());
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(Procedure { proc_ref, head_vars, varset, var_types, body, inferred_det })
}

/// Whether a head variable ending with `actual` satisfies the declared
/// final inst of its mode.
fn matches_final(actual: &Inst, expected: &Inst) -> bool {
    match expected {
        Inst::Free => actual.is_free(),
        Inst::Ground(Uniqueness::Clobbered, None) => !actual.is_free(),
        _ => actual.matches_initial(expected),
    }
}
