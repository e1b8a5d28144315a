//! Instruction-level optimizer: passes over the code of one procedure.
//!
//! Every pass preserves the observable behaviour of the procedure. Each is
//! gated by its own flag of the optimization policy.
use log::debug;

use crate::ir::module::ProcCode;
use crate::policy::OptTuple;

mod dupelim;
mod jumps;
mod labels;
mod licm;
mod peephole;

pub use dupelim::merge_duplicate_blocks;
pub use jumps::short_circuit_jumps;
pub use labels::remove_dead_code;
pub use licm::hoist_loop_invariants;
pub use peephole::peephole;

/// Run the enabled passes in-place until nothing changes, at most
/// `repeat` rounds.
pub fn optimize(code: &mut ProcCode, opts: &OptTuple) {
    let before = code.instrs.len();
    if opts.licm() {
        hoist_loop_invariants(code);
    }
    for round in 0..opts.repeat().max(1) {
        let mut changed = false;
        if opts.jumps() {
            changed |= short_circuit_jumps(code);
        }
        if opts.peephole() {
            changed |= peephole(code);
        }
        if opts.labels() {
            changed |= remove_dead_code(code);
        }
        if opts.dupelim() {
            changed |= merge_duplicate_blocks(code);
        }
        if !changed {
            debug!("opt: {} settled after {} round(s)", code.name, round + 1);
            break;
        }
    }
    debug!("opt: {} {} -> {} instruction(s)", code.name, before, code.instrs.len());
}
