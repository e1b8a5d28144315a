//! file: core/src/ir/opt/jumps.rs
//! description: jump-chain collapsing.
//!
//! A transfer to a label whose first real instruction is `goto M` is
//! retargeted to `M` directly.
use std::collections::{HashMap, HashSet};

use crate::ir::module::ProcCode;
use crate::ir::op::{Instr, LabelId};

pub fn short_circuit_jumps(code: &mut ProcCode) -> bool {
    let forward = goto_after_labels(code);
    if forward.is_empty() {
        return false;
    }
    let mut changed = false;
    for ins in code.instrs.iter_mut() {
        for target in ins.instr.targets_mut() {
            let last = final_target(&forward, *target);
            if last != *target {
                *target = last;
                changed = true;
            }
        }
    }
    changed
}

/// Labels whose code starts with an unconditional jump, and its target.
fn goto_after_labels(code: &ProcCode) -> HashMap<LabelId, LabelId> {
    let mut forward = HashMap::new();
    let mut pending: Vec<LabelId> = Vec::new();
    for ins in &code.instrs {
        match ins.instr {
            Instr::Label(l) => pending.push(l),
            Instr::Comment(_) => {}
            Instr::Goto(target) => {
                for l in pending.drain(..) {
                    if l != target {
                        forward.insert(l, target);
                    }
                }
            }
            _ => pending.clear(),
        }
    }
    forward
}

fn final_target(forward: &HashMap<LabelId, LabelId>, start: LabelId) -> LabelId {
    let mut seen = HashSet::new();
    let mut cur = start;
    while let Some(next) = forward.get(&cur) {
        if !seen.insert(cur) {
            // a cycle of empty jumps; leave it alone
            return start;
        }
        cur = *next;
    }
    cur
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::{CodeModel, ProcRef};
    use crate::ir::op::Instruction;

    #[test]
    fn follows_chains() {
        let mut code = ProcCode {
            proc: ProcRef::new(0, 0),
            name: "p/0".into(),
            model: CodeModel::Det,
            frame_size: 0,
            instrs: vec![
                Instr::Goto(1),
                Instr::Label(1),
                Instr::Goto(2),
                Instr::Label(2),
                Instr::Goto(3),
                Instr::Label(3),
                Instr::Proceed,
            ]
            .into_iter()
            .map(Instruction::new)
            .collect(),
        };
        assert!(short_circuit_jumps(&mut code));
        assert_eq!(code.instrs[0].instr, Instr::Goto(3));
        assert_eq!(code.instrs[2].instr, Instr::Goto(3));
        assert!(!short_circuit_jumps(&mut code));
    }
}
