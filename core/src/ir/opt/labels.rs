//! file: core/src/ir/opt/labels.rs
//! description: unreferenced label and unreachable code removal.
use std::collections::HashSet;

use crate::ir::module::ProcCode;
use crate::ir::op::{Instr, LabelId};

/// Drops labels nothing refers to, then code that follows a terminator
/// and precedes the next label.
pub fn remove_dead_code(code: &mut ProcCode) -> bool {
    let old_len = code.instrs.len();
    let referenced: HashSet<LabelId> = code.instrs.iter().flat_map(|i| i.instr.targets()).collect();
    code.instrs.retain(|i| match i.instr {
        Instr::Label(l) => referenced.contains(&l),
        _ => true,
    });

    let mut reachable = true;
    code.instrs.retain(|i| {
        if let Instr::Label(_) = i.instr {
            reachable = true;
        }
        let keep = reachable;
        if i.instr.is_terminator() {
            reachable = false;
        }
        keep
    });
    code.instrs.len() != old_len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::{CodeModel, ProcRef};
    use crate::ir::op::Instruction;

    #[test]
    fn removes_orphans() {
        let mut code = ProcCode {
            proc: ProcRef::new(0, 0),
            name: "p/0".into(),
            model: CodeModel::Det,
            frame_size: 0,
            instrs: vec![
                Instr::Goto(2),
                Instr::Label(1),
                Instr::Proceed,
                Instr::Label(2),
                Instr::Proceed,
                Instr::Fail,
            ]
            .into_iter()
            .map(Instruction::new)
            .collect(),
        };
        assert!(remove_dead_code(&mut code));
        let left: Vec<Instr> = code.instrs.into_iter().map(|i| i.instr).collect();
        assert_eq!(left, vec![Instr::Goto(2), Instr::Label(2), Instr::Proceed]);
    }
}
