//! file: core/src/ir/opt/licm.rs
//! description: loop-invariant hoisting for tail-recursive loops.
//!
//! A self tail call jumps back to the label right after `incr_sp`. A slot
//! that is written exactly once, with a value built only from constants,
//! holds the same value on every trip round that loop, so its write can
//! move in front of the loop head.
use std::collections::HashMap;

use log::trace;

use crate::ir::module::ProcCode;
use crate::ir::op::{Instr, Lval, Rval};

fn is_constant(instr: &Instr) -> bool {
    match instr {
        Instr::Assign { dest: Lval::StackVar(_), src: Rval::Const(_) } => true,
        Instr::Construct { dest: Lval::StackVar(_), args, .. } => args.iter().all(|a| matches!(a, Rval::Const(_))),
        _ => false,
    }
}

pub fn hoist_loop_invariants(code: &mut ProcCode) -> bool {
    let head = match code.instrs.get(1).map(|i| &i.instr) {
        Some(Instr::Label(l)) if matches!(code.instrs[0].instr, Instr::IncrSp(_)) => *l,
        _ => return false,
    };
    if !code.instrs.iter().any(|i| i.instr == Instr::Goto(head)) {
        return false;
    }

    let mut writes: HashMap<Lval, usize> = HashMap::new();
    for ins in &code.instrs {
        if let Some(dest) = ins.instr.writes() {
            *writes.entry(dest).or_default() += 1;
        }
    }
    let hoist: Vec<usize> = code
        .instrs
        .iter()
        .enumerate()
        .skip(2)
        .filter(|(_, ins)| is_constant(&ins.instr) && ins.instr.writes().is_some_and(|d| writes.get(&d) == Some(&1)))
        .map(|(i, _)| i)
        .collect();
    if hoist.is_empty() {
        return false;
    }
    let mut moved = Vec::with_capacity(hoist.len());
    for i in hoist.into_iter().rev() {
        moved.push(code.instrs.remove(i));
    }
    moved.reverse();
    trace!("opt: {} hoisted {} invariant write(s) above L{}", code.name, moved.len(), head);
    let at = 1;
    code.instrs.splice(at..at, moved);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::{CodeModel, ConsId, ProcRef};
    use crate::ir::op::{Const, Instruction};

    #[test]
    fn hoists_constant_term_above_loop() {
        let nil = Instr::Construct { dest: Lval::StackVar(1), cons: ConsId::atom("[]"), args: vec![] };
        let mut code = ProcCode {
            proc: ProcRef::new(0, 0),
            name: "loop/1".into(),
            model: CodeModel::Det,
            frame_size: 2,
            instrs: vec![
                Instr::IncrSp(2),
                Instr::Label(0),
                Instr::Assign { dest: Lval::StackVar(0), src: Rval::reg(1) },
                nil.clone(),
                Instr::Assign { dest: Lval::Reg(1), src: Rval::Const(Const::Int(1)) },
                Instr::Goto(0),
            ]
            .into_iter()
            .map(Instruction::new)
            .collect(),
        };
        assert!(hoist_loop_invariants(&mut code));
        assert_eq!(code.instrs[1].instr, nil);
        assert_eq!(code.instrs[2].instr, Instr::Label(0));
    }
}
