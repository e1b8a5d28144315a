//! file: core/src/ir/lower/code_info.rs
//! description: state threaded through code generation of one procedure.
//!
//! `CodeInfo` owns the instruction buffer, the label counter, the mapping
//! of variables to stack slots and the current failure continuation. Slot
//! state is a compile-time picture of the frame at the current program
//! point; branched goals save and restore it around each branch.
use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::trace;

use crate::error::InternalFault;
use crate::goal::{GoalId, ModuleTable, Procedure, ProcRef, VarId};
use crate::ir::lower::liveness::Liveness;
use crate::ir::op::{Instr, Instruction, LabelId, LiveVal, Lval, Rval};
use crate::policy::OptTuple;

pub(crate) const ISSUER: &str = "modus.ir.lower";

/// Where control goes when the current goal fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailCont {
    /// No choice point has been pushed since the label was established.
    Label(LabelId),
    /// Resume at the top choice point.
    Redo,
    /// The context cannot fail.
    None,
}

/// Compile-time picture of slot usage.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SlotState {
    var_slot: BTreeMap<VarId, usize>,
    in_use: BTreeSet<usize>,
}

/// Outputs of a branched goal given fixed slots.
#[derive(Debug, Default)]
pub(crate) struct Reservation {
    vars: Vec<VarId>,
    /// Entered into the store map by this goal rather than an outer one.
    added: Vec<VarId>,
}

pub(crate) struct CodeInfo<'a> {
    pub table: &'a ModuleTable,
    pub opts: &'a OptTuple,
    pub proc: &'a Procedure,
    pub liveness: Liveness,
    pub instrs: Vec<Instruction>,
    pub fail_cont: FailCont,
    /// Failure continuation of the procedure body itself.
    pub entry_fail: FailCont,
    pub loop_head: Option<LabelId>,
    /// Head outputs in argument order, for tail-call recognition.
    pub head_outputs: Vec<VarId>,
    next_label: LabelId,
    slots: SlotState,
    /// Slots pre-assigned to variables bound by branched goals.
    store_map: BTreeMap<VarId, usize>,
    frame_size: usize,
    /// Slots holding choice stack marks.
    temps: BTreeSet<usize>,
    /// Slots saved by a choice point that may outlive the goal that pushed
    /// it. They are never handed to another variable.
    pinned: BTreeSet<usize>,
    /// Variables the code at each failure label reads.
    label_needs: HashMap<LabelId, BTreeSet<VarId>>,
    origin: Option<GoalId>,
    redo_stub: Option<LabelId>,
    /// Code emitted after the procedure body.
    trailer: Vec<Instruction>,
}

impl<'a> CodeInfo<'a> {
    pub(crate) fn new(table: &'a ModuleTable, opts: &'a OptTuple, proc: &'a Procedure, liveness: Liveness) -> Self {
        CodeInfo {
            table,
            opts,
            proc,
            liveness,
            instrs: Vec::new(),
            fail_cont: FailCont::None,
            entry_fail: FailCont::None,
            loop_head: None,
            head_outputs: Vec::new(),
            next_label: 0,
            slots: SlotState { var_slot: BTreeMap::new(), in_use: BTreeSet::new() },
            store_map: BTreeMap::new(),
            frame_size: 0,
            temps: BTreeSet::new(),
            pinned: BTreeSet::new(),
            label_needs: HashMap::new(),
            origin: None,
            redo_stub: None,
            trailer: Vec::new(),
        }
    }

    pub(crate) fn proc_ref(&self) -> ProcRef {
        self.proc.proc_ref
    }

    pub(crate) fn fault(&self, message: impl Into<String>) -> InternalFault {
        InternalFault::new(ISSUER, message).in_proc(self.proc.proc_ref).at_goal(self.origin)
    }

    pub(crate) fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub(crate) fn set_origin(&mut self, goal: Option<GoalId>) -> Option<GoalId> {
        std::mem::replace(&mut self.origin, goal)
    }

    pub(crate) fn new_label(&mut self) -> LabelId {
        let l = self.next_label;
        self.next_label += 1;
        l
    }

    pub(crate) fn emit(&mut self, instr: Instr) {
        self.instrs.push(Instruction { instr, origin: self.origin, live: None });
    }

    /// Emits `instr` recording the storage of `vars` and of every choice
    /// stack mark still in use as the locations it preserves.
    pub(crate) fn emit_live(&mut self, instr: Instr, vars: Vec<VarId>) {
        let mut live: Vec<LiveVal> = vars
            .into_iter()
            .filter_map(|v| {
                let slot = self.slots.var_slot.get(&v)?;
                Some(LiveVal { lval: Lval::StackVar(*slot), var: Some(v) })
            })
            .collect();
        live.extend(self.temps.iter().map(|t| LiveVal { lval: Lval::StackVar(*t), var: None }));
        self.instrs.push(Instruction { instr, origin: self.origin, live: Some(live) });
    }

    pub(crate) fn emit_trailer(&mut self, instr: Instr) {
        self.trailer.push(Instruction { instr, origin: None, live: None });
    }

    pub(crate) fn take_trailer(&mut self) -> Vec<Instruction> {
        std::mem::take(&mut self.trailer)
    }

    // ---- storage ---------------------------------------------------------

    fn alloc_slot(&mut self) -> usize {
        let mut slot = 0;
        while self.slots.in_use.contains(&slot) || self.pinned.contains(&slot) {
            slot += 1;
        }
        self.slots.in_use.insert(slot);
        self.frame_size = self.frame_size.max(slot + 1);
        slot
    }

    /// A slot outside any variable, e.g. for a choice stack mark.
    pub(crate) fn alloc_temp(&mut self) -> usize {
        let slot = self.alloc_slot();
        self.temps.insert(slot);
        slot
    }

    pub(crate) fn release_temp(&mut self, slot: usize) {
        self.temps.remove(&slot);
        self.slots.in_use.remove(&slot);
    }

    /// Gives `var` its storage as it becomes bound.
    pub(crate) fn bind_var(&mut self, var: VarId) -> Lval {
        if let Some(slot) = self.slots.var_slot.get(&var) {
            return Lval::StackVar(*slot);
        }
        let slot = match self.store_map.get(&var) {
            Some(slot) => *slot,
            None => self.alloc_slot(),
        };
        trace!("lower: {} -> sv{}", var, slot);
        self.slots.var_slot.insert(var, slot);
        Lval::StackVar(slot)
    }

    pub(crate) fn var_lval(&self, var: VarId) -> Result<Lval, InternalFault> {
        match self.slots.var_slot.get(&var) {
            Some(slot) => Ok(Lval::StackVar(*slot)),
            None => Err(self.fault(format!("variable {} has no location", self.proc.var_name(var)))),
        }
    }

    pub(crate) fn var_rval(&self, var: VarId) -> Result<Rval, InternalFault> {
        self.var_lval(var).map(Rval::Lval)
    }

    /// Variables with storage that code after `goal` reads. A nondet call
    /// may return again on backtracking and they must still be in place.
    pub(crate) fn kept_across(&self, goal: GoalId) -> Vec<VarId> {
        self.slots.var_slot.keys().filter(|v| self.is_live_after(goal, **v)).copied().collect()
    }

    /// Keeps the slots of `vars` out of reuse for the rest of the procedure.
    pub(crate) fn pin(&mut self, vars: &[VarId]) {
        for v in vars {
            if let Some(slot) = self.slots.var_slot.get(v) {
                self.pinned.insert(*slot);
            }
        }
    }

    fn release(&mut self, vars: Vec<VarId>) {
        for v in vars {
            if let Some(slot) = self.slots.var_slot.remove(&v) {
                let reserved = self.store_map.values().any(|s| *s == slot);
                if !reserved {
                    self.slots.in_use.remove(&slot);
                }
            }
        }
    }

    /// Releases the variables that die before `goal` starts.
    pub(crate) fn apply_pre_deaths(&mut self, goal: GoalId) {
        let dead = self.liveness.pre_deaths(goal, self.slots.var_slot.keys());
        self.release(dead);
    }

    /// Releases the variables that die once `goal` has succeeded.
    pub(crate) fn apply_post_deaths(&mut self, goal: GoalId) {
        let dead = self.liveness.post_deaths(goal, self.slots.var_slot.keys());
        self.release(dead);
    }

    pub(crate) fn is_live_after(&self, goal: GoalId, var: VarId) -> bool {
        self.liveness.live_after(goal).is_some_and(|s| s.contains(&var))
    }

    pub(crate) fn save_slots(&self) -> SlotState {
        self.slots.clone()
    }

    pub(crate) fn restore_slots(&mut self, state: SlotState) {
        self.slots = state;
    }

    /// Pre-assigns slots to the variables in `vars` that have none yet, so
    /// every branch of a branched goal leaves them in the same place.
    pub(crate) fn reserve_outputs(&mut self, vars: impl IntoIterator<Item = VarId>) -> Reservation {
        let mut reservation = Reservation::default();
        for v in vars {
            if self.slots.var_slot.contains_key(&v) {
                continue;
            }
            if !self.store_map.contains_key(&v) {
                let slot = self.alloc_slot();
                self.store_map.insert(v, slot);
                reservation.added.push(v);
            }
            reservation.vars.push(v);
        }
        reservation
    }

    /// State after a branched goal: the entry state plus the store-mapped
    /// outputs at their assigned slots.
    pub(crate) fn merge_outputs(&mut self, entry: SlotState, reservation: &Reservation) {
        self.slots = entry;
        for v in &reservation.vars {
            if let Some(slot) = self.store_map.get(v).copied() {
                self.slots.in_use.insert(slot);
                self.slots.var_slot.insert(*v, slot);
            }
        }
        for v in &reservation.added {
            self.store_map.remove(v);
        }
    }

    // ---- failure ---------------------------------------------------------

    /// A failure continuation at `label`, where the code resumes with the
    /// variables a failure inside `goal` must leave intact.
    pub(crate) fn label_cont(&mut self, label: LabelId, goal: GoalId) -> FailCont {
        let needs = self.liveness.resume_vars(goal).cloned().unwrap_or_default();
        self.label_needs.insert(label, needs);
        FailCont::Label(label)
    }

    /// Variables with storage that the failure continuation `cont` reads.
    pub(crate) fn resume_needs(&self, cont: FailCont) -> Vec<VarId> {
        match cont {
            FailCont::Label(l) => self
                .label_needs
                .get(&l)
                .map(|needs| needs.iter().filter(|v| self.slots.var_slot.contains_key(v)).copied().collect())
                .unwrap_or_default(),
            FailCont::Redo | FailCont::None => Vec::new(),
        }
    }

    /// A label to jump to on failure.
    pub(crate) fn fail_label(&mut self) -> Result<LabelId, InternalFault> {
        match self.fail_cont {
            FailCont::Label(l) => Ok(l),
            FailCont::Redo => Ok(self.redo_label()),
            FailCont::None => Err(self.fault("failure in a context that cannot fail")),
        }
    }

    fn redo_label(&mut self) -> LabelId {
        match self.redo_stub {
            Some(l) => l,
            None => {
                let l = self.new_label();
                self.redo_stub = Some(l);
                self.emit_trailer(Instr::Label(l));
                self.emit_trailer(Instr::Fail);
                l
            }
        }
    }

    pub(crate) fn emit_fail(&mut self) -> Result<(), InternalFault> {
        match self.fail_cont {
            FailCont::Label(l) => self.emit(Instr::Goto(l)),
            FailCont::Redo => self.emit(Instr::Fail),
            FailCont::None => return Err(self.fault("failure in a context that cannot fail")),
        }
        Ok(())
    }

    /// Before code that may leave choice points behind, make sure failure
    /// is signalled through the choice stack. A label continuation is
    /// turned into a choice point that resumes at that label.
    pub(crate) fn ensure_redo(&mut self) {
        if let FailCont::Label(l) = self.fail_cont {
            let stub = self.new_label();
            let live = self.resume_needs(self.fail_cont);
            self.pin(&live);
            self.emit_live(Instr::PushChoicePoint { resume: stub }, live);
            self.emit_trailer(Instr::Label(stub));
            self.emit_trailer(Instr::PopChoicePoint);
            self.emit_trailer(Instr::Goto(l));
            self.fail_cont = FailCont::Redo;
        }
    }
}
