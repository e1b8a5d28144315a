//! file: core/src/ir/opt/dupelim.rs
//! description: duplicate block merging.
//!
//! A block here is a label followed by straight-line code ending in a
//! terminator. When two blocks have the same code, the later one becomes
//! a jump to the earlier one.
use std::collections::HashMap;

use log::trace;

use crate::ir::module::ProcCode;
use crate::ir::op::{Instr, Instruction, LabelId};

struct Block {
    label: LabelId,
    /// Index of the first instruction after the label.
    start: usize,
    /// One past the terminator.
    end: usize,
}

fn blocks(instrs: &[Instruction]) -> Vec<Block> {
    let mut found = Vec::new();
    let mut i = 0;
    while i < instrs.len() {
        let Instr::Label(label) = instrs[i].instr else {
            i += 1;
            continue;
        };
        let start = i + 1;
        let mut j = start;
        while j < instrs.len() && !matches!(instrs[j].instr, Instr::Label(_)) && !instrs[j].instr.is_terminator() {
            j += 1;
        }
        if j < instrs.len() && instrs[j].instr.is_terminator() {
            found.push(Block { label, start, end: j + 1 });
        }
        i = j.max(start);
    }
    found
}

pub fn merge_duplicate_blocks(code: &mut ProcCode) -> bool {
    let mut first_seen: HashMap<Vec<Instr>, LabelId> = HashMap::new();
    let mut replace: Vec<(Block, LabelId)> = Vec::new();
    for block in blocks(&code.instrs) {
        let body = &code.instrs[block.start..block.end];
        if body.len() < 2 || body.iter().any(|i| i.live.is_some()) {
            continue;
        }
        let key: Vec<Instr> = body.iter().map(|i| i.instr.clone()).collect();
        match first_seen.get(&key) {
            Some(original) => replace.push((block, *original)),
            None => {
                first_seen.insert(key, block.label);
            }
        }
    }
    if replace.is_empty() {
        return false;
    }
    // back to front so earlier indices stay valid
    for (block, original) in replace.into_iter().rev() {
        trace!("opt: block L{} duplicates L{}", block.label, original);
        let jump = Instruction { instr: Instr::Goto(original), origin: code.instrs[block.start].origin, live: None };
        code.instrs.splice(block.start..block.end, std::iter::once(jump));
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::{CodeModel, ProcRef};
    use crate::ir::op::{Const, Lval, Rval};

    #[test]
    fn later_copy_jumps_to_first() {
        let exit = || vec![Instr::Assign { dest: Lval::Reg(1), src: Rval::Const(Const::Int(0)) }, Instr::Proceed];
        let mut instrs = vec![Instr::Label(1)];
        instrs.extend(exit());
        instrs.push(Instr::Label(2));
        instrs.extend(exit());
        let mut code = ProcCode {
            proc: ProcRef::new(0, 0),
            name: "p/0".into(),
            model: CodeModel::Det,
            frame_size: 0,
            instrs: instrs.into_iter().map(Instruction::new).collect(),
        };
        assert!(merge_duplicate_blocks(&mut code));
        assert_eq!(code.instrs[4].instr, Instr::Goto(1));
        assert_eq!(code.instrs.len(), 5);
        assert!(!merge_duplicate_blocks(&mut code));
    }
}
