//! file: core/src/ir/verify.rs
//! description: storage checks over generated code.
//!
//! An instruction with a live set is a resumption point: a choice point
//! resumes at its label, a nondet call may return again. Either way the
//! code that runs then finds only the listed slots intact, plus slots that
//! are stored to once in the whole procedure.
//!
//! Two checks follow. Every slot read must hold a value on every path to
//! the read, which catches reads after a variable's death. No slot in a
//! live set may be stored to while its resumption point can still be
//! taken, which catches a slot handed to a new variable too early.
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use crate::error::InternalFault;
use crate::ir::module::ProcCode;
use crate::ir::op::{Instr, Instruction, LabelId, Lval, Rval};

const ISSUER: &str = "modus.ir.verify";

type Slots = BTreeSet<usize>;

fn slot_of(lval: Lval) -> Option<usize> {
    match lval {
        Lval::StackVar(n) => Some(n),
        _ => None,
    }
}

fn saved_slots(ins: &Instruction) -> Slots {
    ins.live.iter().flatten().filter_map(|lv| slot_of(lv.lval)).collect()
}

struct Checker<'c> {
    code: &'c ProcCode,
    labels: HashMap<LabelId, usize>,
    /// Slots with a single store; they cannot change once set.
    stable: Slots,
}

/// Checks the slot discipline of `code`. See the module docs.
pub fn check_storage(code: &ProcCode) -> Result<(), InternalFault> {
    let mut stores: HashMap<usize, usize> = HashMap::new();
    for ins in &code.instrs {
        if let Some(slot) = ins.instr.writes().and_then(slot_of) {
            *stores.entry(slot).or_default() += 1;
        }
    }
    let checker = Checker {
        code,
        labels: code.label_positions(),
        stable: stores.into_iter().filter(|(_, n)| *n == 1).map(|(s, _)| s).collect(),
    };
    checker.check_live_sets()?;
    checker.check_reads()?;
    for (pc, ins) in code.instrs.iter().enumerate() {
        if ins.live.is_some() {
            checker.check_saved_until_resumed(pc)?;
        }
    }
    Ok(())
}

impl<'c> Checker<'c> {
    fn fault(&self, pc: usize, message: String) -> InternalFault {
        InternalFault::new(ISSUER, format!("{} at {:04}: {}", self.code.name, pc, message))
            .in_proc(self.code.proc)
            .at_goal(self.code.instrs.get(pc).and_then(|i| i.origin))
    }

    fn target(&self, label: LabelId, pc: usize) -> Result<usize, InternalFault> {
        self.labels.get(&label).copied().ok_or_else(|| self.fault(pc, format!("jump to undefined label L{}", label)))
    }

    /// Two variables saved at one point never share a slot.
    fn check_live_sets(&self) -> Result<(), InternalFault> {
        for (pc, ins) in self.code.instrs.iter().enumerate() {
            let mut seen = BTreeSet::new();
            for lv in ins.live.iter().flatten() {
                if !seen.insert(lv.lval) {
                    return Err(self.fault(pc, format!("{} saved twice at one point", lv.lval)));
                }
            }
        }
        Ok(())
    }

    /// Forward must-hold analysis over stack slots.
    fn check_reads(&self) -> Result<(), InternalFault> {
        let instrs = &self.code.instrs;
        if instrs.is_empty() {
            return Ok(());
        }
        let mut state: Vec<Option<Slots>> = vec![None; instrs.len()];
        let mut work = VecDeque::new();
        state[0] = Some(Slots::new());
        work.push_back(0);

        while let Some(pc) = work.pop_front() {
            let Some(mut slots) = state[pc].clone() else {
                continue;
            };
            let ins = &instrs[pc];
            for slot in ins.instr.reads().into_iter().filter_map(slot_of) {
                if !slots.contains(&slot) {
                    return Err(self.fault(pc, format!("sv{} is read but holds no value here", slot)));
                }
            }
            match &ins.instr {
                Instr::IncrSp(_) => slots.clear(),
                other => {
                    if let Some(slot) = other.writes().and_then(slot_of) {
                        slots.insert(slot);
                    }
                }
            }
            // what a resumption finds
            let resumed = || -> Slots {
                saved_slots(ins).into_iter().chain(self.stable.iter().copied()).filter(|s| slots.contains(s)).collect()
            };

            let mut next: Vec<(usize, Slots)> = Vec::new();
            match &ins.instr {
                Instr::PushChoicePoint { resume } | Instr::RetargetChoicePoint { resume } => {
                    next.push((self.target(*resume, pc)?, resumed()));
                    if pc + 1 < instrs.len() {
                        next.push((pc + 1, slots.clone()));
                    }
                }
                Instr::Call { .. } | Instr::CallClosure { .. } | Instr::Foreign { .. } if ins.live.is_some() => {
                    if pc + 1 < instrs.len() {
                        next.push((pc + 1, resumed()));
                    }
                }
                other => {
                    for label in other.targets() {
                        next.push((self.target(label, pc)?, slots.clone()));
                    }
                    if !other.is_terminator() && pc + 1 < instrs.len() {
                        next.push((pc + 1, slots.clone()));
                    }
                }
            }

            for (to, incoming) in next {
                let merged = match &state[to] {
                    Some(prev) => prev.intersection(&incoming).copied().collect(),
                    None => incoming,
                };
                if state[to].as_ref() != Some(&merged) {
                    state[to] = Some(merged);
                    work.push_back(to);
                }
            }
        }
        Ok(())
    }

    /// Follows every path on which the resumption point at `origin` can
    /// still be taken and rejects stores to the slots it saves.
    ///
    /// `depth` counts choice points pushed above it on the path. A pop or
    /// retarget at depth zero ends its life, as does failing or leaving the
    /// procedure. Choice stack marks taken on the path are tracked so a cut
    /// returns to the depth of its mark; a cut to an older mark removes it.
    fn check_saved_until_resumed(&self, origin: usize) -> Result<(), InternalFault> {
        let instrs = &self.code.instrs;
        let saved = saved_slots(&instrs[origin]);
        if saved.is_empty() {
            return Ok(());
        }
        type Marks = BTreeMap<usize, usize>;
        let mut seen: HashSet<(usize, usize, Marks)> = HashSet::new();
        let mut work: Vec<(usize, usize, Marks)> = vec![(origin + 1, 0, Marks::new())];

        while let Some((pc, depth, mut marks)) = work.pop() {
            if pc >= instrs.len() || depth > instrs.len() || !seen.insert((pc, depth, marks.clone())) {
                continue;
            }
            let instr = &instrs[pc].instr;
            if let Some(slot) = instr.writes().and_then(slot_of) {
                if saved.contains(&slot) {
                    return Err(self.fault(
                        pc,
                        format!("sv{} is overwritten while the point at {:04} that saved it can resume", slot, origin),
                    ));
                }
            }
            match instr {
                Instr::PushChoicePoint { resume } => {
                    let resume = self.target(*resume, pc)?;
                    work.push((resume, depth + 1, marks.clone()));
                    work.push((pc + 1, depth + 1, marks));
                }
                Instr::RetargetChoicePoint { resume } => {
                    if depth > 0 {
                        let resume = self.target(*resume, pc)?;
                        work.push((resume, depth, marks.clone()));
                        work.push((pc + 1, depth, marks));
                    }
                }
                Instr::PopChoicePoint => {
                    if depth > 0 {
                        work.push((pc + 1, depth - 1, marks));
                    }
                }
                Instr::MarkChoiceStack { dest } => {
                    if let Some(slot) = slot_of(*dest) {
                        marks.insert(slot, depth);
                    }
                    work.push((pc + 1, depth, marks));
                }
                Instr::CutChoiceStack { mark: Rval::Lval(Lval::StackVar(slot)) } => {
                    if let Some(to) = marks.get(slot).copied() {
                        work.push((pc + 1, to, marks));
                    }
                }
                Instr::CutChoiceStack { .. } => {}
                Instr::Fail | Instr::Proceed | Instr::Unreachable(_) => {}
                other => {
                    for label in other.targets() {
                        work.push((self.target(label, pc)?, depth, marks.clone()));
                    }
                    if !other.is_terminator() {
                        work.push((pc + 1, depth, marks));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::{CodeModel, ProcRef, VarId};
    use crate::ir::op::{Cond, Const, LiveVal};

    fn proc(instrs: Vec<Instruction>) -> ProcCode {
        ProcCode { proc: ProcRef::new(0, 0), name: "p/1-0".into(), model: CodeModel::Non, frame_size: 3, instrs }
    }

    fn saving(instr: Instr, slots: &[usize]) -> Instruction {
        let mut ins = Instruction::new(instr);
        ins.live = Some(
            slots.iter().map(|s| LiveVal { lval: Lval::StackVar(*s), var: Some(VarId(*s as u32)) }).collect(),
        );
        ins
    }

    fn push(resume: LabelId, slots: &[usize]) -> Instruction {
        saving(Instr::PushChoicePoint { resume }, slots)
    }

    fn set(slot: usize, value: i64) -> Instruction {
        Instr::Assign { dest: Lval::StackVar(slot), src: Rval::Const(Const::Int(value)) }.into()
    }

    fn copy_out(slot: usize) -> Instruction {
        Instr::Assign { dest: Lval::Reg(1), src: Rval::stack(slot) }.into()
    }

    #[test]
    fn resume_sees_saved_slots() {
        let code = proc(vec![
            Instr::IncrSp(3).into(),
            set(0, 1),
            set(1, 2),
            set(1, 3),
            push(0, &[0]),
            copy_out(0),
            Instr::Proceed.into(),
            Instr::Label(0).into(),
            Instr::PopChoicePoint.into(),
            copy_out(0),
            Instr::Proceed.into(),
        ]);
        assert!(check_storage(&code).is_ok());
    }

    #[test]
    fn resume_read_of_unsaved_slot_is_reported() {
        // sv1 is stored twice, so the value at resumption is not the one
        // it held at the push
        let code = proc(vec![
            Instr::IncrSp(3).into(),
            set(0, 1),
            set(1, 2),
            push(0, &[0]),
            set(1, 3),
            Instr::Fail.into(),
            Instr::Label(0).into(),
            Instr::PopChoicePoint.into(),
            copy_out(1),
            Instr::Proceed.into(),
        ]);
        let err = check_storage(&code).expect_err("sv1 was not saved");
        assert!(err.to_string().contains("sv1 is read"), "{}", err);
    }

    #[test]
    fn slot_with_a_single_store_survives_resumption() {
        let code = proc(vec![
            Instr::IncrSp(3).into(),
            set(1, 7),
            push(0, &[]),
            Instr::Fail.into(),
            Instr::Label(0).into(),
            Instr::PopChoicePoint.into(),
            copy_out(1),
            Instr::Proceed.into(),
        ]);
        assert!(check_storage(&code).is_ok());
    }

    #[test]
    fn read_on_one_branch_only_is_reported() {
        let code = proc(vec![
            Instr::IncrSp(3).into(),
            Instr::IfNot { cond: Cond::Succeeded, target: 0 }.into(),
            set(0, 1),
            Instr::Label(0).into(),
            copy_out(0),
            Instr::Proceed.into(),
        ]);
        assert!(check_storage(&code).is_err());
    }

    #[test]
    fn duplicate_saved_slot_is_reported() {
        let mut ins = push(0, &[0]);
        if let Some(live) = ins.live.as_mut() {
            live.push(LiveVal { lval: Lval::StackVar(0), var: Some(VarId(9)) });
        }
        let code = proc(vec![
            Instr::IncrSp(3).into(),
            set(0, 1),
            ins,
            Instr::Proceed.into(),
            Instr::Label(0).into(),
            Instr::Proceed.into(),
        ]);
        let err = check_storage(&code).expect_err("two variables in one slot");
        assert!(err.to_string().contains("saved twice"));
    }

    #[test]
    fn saved_slot_reused_after_the_disjunction_is_reported() {
        let code = proc(vec![
            Instr::IncrSp(3).into(),
            set(0, 1),
            push(0, &[0]),
            Instr::Goto(1).into(),
            Instr::Label(0).into(),
            Instr::PopChoicePoint.into(),
            copy_out(0),
            Instr::Label(1).into(),
            set(0, 2),
            Instr::Proceed.into(),
        ]);
        let err = check_storage(&code).expect_err("sv0 is still needed by the resume path");
        assert!(err.to_string().contains("overwritten"), "{}", err);
    }

    #[test]
    fn nondet_call_keeps_its_live_slots() {
        let call = || saving(Instr::Call { proc: ProcRef::new(1, 0), model: CodeModel::Non }, &[0]);
        let clobbers = proc(vec![
            Instr::IncrSp(3).into(),
            set(0, 1),
            call(),
            copy_out(0),
            set(0, 2),
            Instr::Proceed.into(),
        ]);
        assert!(check_storage(&clobbers).is_err());

        let unsaved = proc(vec![
            Instr::IncrSp(3).into(),
            set(0, 1),
            set(1, 1),
            set(1, 2),
            call(),
            copy_out(1),
            Instr::Proceed.into(),
        ]);
        assert!(check_storage(&unsaved).is_err());
    }

    #[test]
    fn cut_ends_the_saved_region() {
        let code = proc(vec![
            Instr::IncrSp(3).into(),
            Instr::MarkChoiceStack { dest: Lval::StackVar(2) }.into(),
            set(0, 1),
            saving(Instr::PushChoicePoint { resume: 0 }, &[0, 2]),
            Instr::CutChoiceStack { mark: Rval::stack(2) }.into(),
            set(0, 2),
            copy_out(0),
            Instr::Proceed.into(),
            Instr::Label(0).into(),
            Instr::PopChoicePoint.into(),
            Instr::Fail.into(),
        ]);
        assert!(check_storage(&code).is_ok());
    }

    #[test]
    fn inner_cut_keeps_the_outer_point_alive() {
        let code = proc(vec![
            Instr::IncrSp(3).into(),
            set(0, 1),
            push(0, &[0]),
            Instr::MarkChoiceStack { dest: Lval::StackVar(2) }.into(),
            saving(Instr::PushChoicePoint { resume: 1 }, &[2]),
            Instr::CutChoiceStack { mark: Rval::stack(2) }.into(),
            set(0, 2),
            Instr::Proceed.into(),
            Instr::Label(1).into(),
            Instr::PopChoicePoint.into(),
            Instr::Fail.into(),
            Instr::Label(0).into(),
            Instr::PopChoicePoint.into(),
            copy_out(0),
            Instr::Proceed.into(),
        ]);
        let err = check_storage(&code).expect_err("outer point still resumes with sv0");
        assert!(err.to_string().contains("sv0 is overwritten"), "{}", err);
    }
}
