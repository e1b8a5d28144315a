use std::collections::{BTreeMap, BTreeSet};

use crate::goal::{Inst, InstConflict, VarId};

/// Insts of all variables at one program point. Variables never mentioned
/// are free. An unreachable map answers `NotReached` for everything.
#[derive(Debug, Clone, PartialEq)]
pub struct InstMap {
    reachable: bool,
    insts: BTreeMap<VarId, Inst>,
}

impl InstMap {
    pub fn new() -> Self {
        InstMap { reachable: true, insts: BTreeMap::new() }
    }

    pub fn unreachable() -> Self {
        InstMap { reachable: false, insts: BTreeMap::new() }
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    pub fn set_unreachable(&mut self) {
        self.reachable = false;
        self.insts.clear();
    }

    pub fn lookup(&self, var: VarId) -> Inst {
        if !self.reachable {
            return Inst::NotReached;
        }
        self.insts.get(&var).cloned().unwrap_or(Inst::Free)
    }

    pub fn set(&mut self, var: VarId, inst: Inst) {
        if !self.reachable {
            return;
        }
        if inst.is_reachable() {
            self.insts.insert(var, inst);
        } else {
            self.set_unreachable();
        }
    }

    /// Joins `vars` across the reachable `branches`; everything else keeps
    /// its inst from `entry`.
    pub fn merge(
        entry: &InstMap,
        branches: &[InstMap],
        vars: &BTreeSet<VarId>,
    ) -> (InstMap, Vec<(VarId, InstConflict)>) {
        let live: Vec<&InstMap> = branches.iter().filter(|m| m.is_reachable()).collect();
        let Some((first, rest)) = live.split_first() else {
            return (InstMap::unreachable(), Vec::new());
        };
        let mut out = entry.clone();
        let mut conflicts = Vec::new();
        for var in vars {
            let mut acc = first.lookup(*var);
            for m in rest {
                match acc.join(&m.lookup(*var)) {
                    Ok(joined) => acc = joined,
                    Err(conflict) => {
                        conflicts.push((*var, conflict));
                        break;
                    }
                }
            }
            out.insts.insert(*var, acc);
        }
        (out, conflicts)
    }
}

impl Default for InstMap {
    fn default() -> Self {
        InstMap::new()
    }
}
