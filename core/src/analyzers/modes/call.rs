//! Mode selection for first-order and higher-order calls.
use crate::analyzers::modes::analyzer::ModeCtx;
use crate::analyzers::modes::err::{ModeError, ModeErrorKind};
use crate::analyzers::modes::instmap::InstMap;
use crate::goal::{GoalId, GoalInfo, Inst, Mode, PredId, ProcIndex, VarId};

impl<'a> ModeCtx<'a> {
    /// Picks the single declared mode whose initial insts the actual
    /// arguments satisfy. Returns `None` after reporting an error.
    pub(crate) fn check_call(
        &self,
        id: GoalId,
        info: &GoalInfo,
        pred: PredId,
        args: &[VarId],
        instmap: &mut InstMap,
        errors: &mut Vec<ModeError>,
    ) -> Option<ProcIndex> {
        let Some(decl) = self.table.pred(pred) else {
            errors.push(self.error(id, info, ModeErrorKind::UnknownPredicate { pred }));
            instmap.set_unreachable();
            return None;
        };
        let callee = self.table.pred_name(pred);
        if let Some(bad) = decl.procs.iter().find(|p| p.modes.len() != args.len()) {
            errors.push(self.error(
                id,
                info,
                ModeErrorKind::ArityMismatch { callee, expected: bad.modes.len(), actual: args.len() },
            ));
            instmap.set_unreachable();
            return None;
        }
        if !instmap.is_reachable() {
            return if decl.procs.is_empty() { None } else { Some(0) };
        }

        let actual: Vec<Inst> = args.iter().map(|a| instmap.lookup(*a)).collect();
        let matching: Vec<ProcIndex> = decl
            .procs
            .iter()
            .enumerate()
            .filter(|(_, p)| actual.iter().zip(&p.modes).all(|(a, m)| a.matches_initial(&m.initial)))
            .map(|(i, _)| i)
            .collect();

        match matching.as_slice() {
            [only] => {
                apply_modes(args, &decl.procs[*only].modes, &actual, instmap);
                Some(*only)
            }
            [] => {
                let args = args.iter().copied().zip(actual).collect();
                errors.push(self.error(id, info, ModeErrorKind::NoMatchingMode { callee, args }));
                instmap.set_unreachable();
                None
            }
            _ => {
                errors.push(self.error(id, info, ModeErrorKind::AmbiguousMode { callee, candidates: matching.clone() }));
                instmap.set_unreachable();
                None
            }
        }
    }

    pub(crate) fn check_ho_call(
        &self,
        id: GoalId,
        info: &GoalInfo,
        closure: VarId,
        args: &[VarId],
        instmap: &mut InstMap,
        errors: &mut Vec<ModeError>,
    ) {
        if !instmap.is_reachable() {
            return;
        }
        let inst = instmap.lookup(closure);
        let Some(ho) = inst.higher_order_info() else {
            errors.push(self.error(id, info, ModeErrorKind::NotHigherOrder { var: closure, inst: inst.clone() }));
            instmap.set_unreachable();
            return;
        };
        let callee = format!("closure {}", self.varset.name(closure));
        if ho.modes.len() != args.len() {
            errors.push(self.error(
                id,
                info,
                ModeErrorKind::ArityMismatch { callee, expected: ho.modes.len(), actual: args.len() },
            ));
            instmap.set_unreachable();
            return;
        }
        let actual: Vec<Inst> = args.iter().map(|a| instmap.lookup(*a)).collect();
        if actual.iter().zip(&ho.modes).all(|(a, m)| a.matches_initial(&m.initial)) {
            apply_modes(args, &ho.modes, &actual, instmap);
        } else {
            let args = args.iter().copied().zip(actual).collect();
            errors.push(self.error(id, info, ModeErrorKind::NoMatchingMode { callee, args }));
            instmap.set_unreachable();
        }
    }
}

/// Gives each argument the final inst of its mode. Arguments whose mode
/// leaves them unchanged keep their (more precise) actual inst, now shared
/// with the callee.
fn apply_modes(args: &[VarId], modes: &[Mode], actual: &[Inst], instmap: &mut InstMap) {
    for ((arg, mode), inst) in args.iter().zip(modes).zip(actual) {
        let after = if mode.initial == mode.final_ { inst.shared() } else { mode.final_.clone() };
        instmap.set(*arg, after);
    }
}
