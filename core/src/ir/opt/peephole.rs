//! file: core/src/ir/opt/peephole.rs
//! description: local rewrites over short instruction windows.
use crate::ir::module::ProcCode;
use crate::ir::op::{Instr, Instruction, LabelId, Rval};

/// - a `goto` to a label among the labels directly after it is dropped
/// - `x := x` is dropped
/// - `b := a` directly after `a := b` is dropped
pub fn peephole(code: &mut ProcCode) -> bool {
    let old_len = code.instrs.len();
    let mut out = Vec::with_capacity(old_len);
    for (i, ins) in code.instrs.iter().enumerate() {
        let drop = match &ins.instr {
            Instr::Goto(target) => falls_into(&code.instrs[i + 1..], *target),
            Instr::Assign { dest, src: Rval::Lval(src) } if dest == src => true,
            Instr::Assign { dest, src: Rval::Lval(src) } => out.last().is_some_and(|prev: &Instruction| {
                matches!(&prev.instr, Instr::Assign { dest: d, src: Rval::Lval(s) } if d == src && s == dest)
            }),
            _ => false,
        };
        if !drop {
            out.push(ins.clone());
        }
    }
    code.instrs = out;
    code.instrs.len() != old_len
}

fn falls_into(rest: &[Instruction], target: LabelId) -> bool {
    for ins in rest {
        match ins.instr {
            Instr::Label(l) if l == target => return true,
            Instr::Label(_) | Instr::Comment(_) => continue,
            _ => return false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::{CodeModel, ProcRef};
    use crate::ir::op::Lval;

    fn code(instrs: Vec<Instr>) -> ProcCode {
        ProcCode {
            proc: ProcRef::new(0, 0),
            name: "p/0".into(),
            model: CodeModel::Det,
            frame_size: 2,
            instrs: instrs.into_iter().map(Instruction::new).collect(),
        }
    }

    #[test]
    fn drops_jump_to_next_label() {
        let mut c = code(vec![Instr::Goto(3), Instr::Label(2), Instr::Label(3), Instr::Proceed]);
        assert!(peephole(&mut c));
        assert_eq!(c.instrs[0].instr, Instr::Label(2));
    }

    #[test]
    fn drops_reverse_move() {
        let a = Lval::StackVar(0);
        let b = Lval::Reg(1);
        let mut c = code(vec![
            Instr::Assign { dest: b, src: Rval::Lval(a) },
            Instr::Assign { dest: a, src: Rval::Lval(b) },
            Instr::Assign { dest: a, src: Rval::Lval(a) },
        ]);
        assert!(peephole(&mut c));
        assert_eq!(c.instrs.len(), 1);
    }
}
