//! Mode checking of unifications in super-homogeneous form.
use crate::analyzers::modes::analyzer::ModeCtx;
use crate::analyzers::modes::err::{ModeError, ModeErrorKind};
use crate::analyzers::modes::instmap::InstMap;
use crate::goal::{
    ArgUnify, ConsId, Determinism, GoalId, GoalInfo, GoalKind, Inst, PredId, ProcIndex, ProcRef, UnifyKind,
    UnifyRhs, Uniqueness, VarId,
};

impl<'a> ModeCtx<'a> {
    pub(crate) fn check_unify(
        &self,
        id: GoalId,
        info: &GoalInfo,
        lhs: VarId,
        rhs: UnifyRhs,
        instmap: &mut InstMap,
        errors: &mut Vec<ModeError>,
    ) -> GoalKind {
        let kind = match &rhs {
            UnifyRhs::Var(y) => self.unify_vars(id, info, lhs, *y, instmap, errors),
            UnifyRhs::Functor { cons, args } => self.unify_functor(id, info, lhs, cons, args, instmap, errors),
            UnifyRhs::Closure { pred, proc, args } => {
                self.unify_closure(id, info, lhs, *pred, *proc, args, instmap, errors)
            }
        };
        GoalKind::Unify { lhs, rhs, kind: Some(kind) }
    }

    /// Reports a use of a clobbered variable among `vars`.
    fn check_clobbered(
        &self,
        id: GoalId,
        info: &GoalInfo,
        vars: &[VarId],
        instmap: &mut InstMap,
        errors: &mut Vec<ModeError>,
    ) -> bool {
        let clobbered: Vec<VarId> = vars.iter().copied().filter(|v| instmap.lookup(*v).is_clobbered()).collect();
        for var in &clobbered {
            errors.push(self.error(id, info, ModeErrorKind::ClobberedUse { var: *var }));
        }
        if !clobbered.is_empty() {
            instmap.set_unreachable();
        }
        !clobbered.is_empty()
    }

    fn unify_vars(
        &self,
        id: GoalId,
        info: &GoalInfo,
        x: VarId,
        y: VarId,
        instmap: &mut InstMap,
        errors: &mut Vec<ModeError>,
    ) -> UnifyKind {
        if !instmap.is_reachable() || self.check_clobbered(id, info, &[x, y], instmap, errors) {
            return UnifyKind::Test { left: x, right: y };
        }
        let ix = instmap.lookup(x);
        let iy = instmap.lookup(y);
        match (ix.is_free(), iy.is_free()) {
            (true, true) => {
                errors.push(self.error(id, info, ModeErrorKind::FreeFreeUnification { left: x, right: y }));
                instmap.set_unreachable();
                UnifyKind::Assign { dest: x, src: y }
            }
            (true, false) => {
                let shared = iy.shared();
                instmap.set(x, shared.clone());
                instmap.set(y, shared);
                UnifyKind::Assign { dest: x, src: y }
            }
            (false, true) => {
                let shared = ix.shared();
                instmap.set(x, shared.clone());
                instmap.set(y, shared);
                UnifyKind::Assign { dest: y, src: x }
            }
            (false, false) => {
                if ix.higher_order_info().is_some() || iy.higher_order_info().is_some() {
                    errors.push(self.error(id, info, ModeErrorKind::HigherOrderTest { var: x }));
                    instmap.set_unreachable();
                } else if !ix.is_ground() || !iy.is_ground() {
                    let (var, inst) = if ix.is_ground() { (y, iy) } else { (x, ix) };
                    errors.push(self.error(id, info, ModeErrorKind::NonGroundTest { var, inst }));
                    instmap.set_unreachable();
                } else {
                    let both = ix.meet(&iy);
                    instmap.set(x, both.clone());
                    instmap.set(y, both);
                }
                UnifyKind::Test { left: x, right: y }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn unify_functor(
        &self,
        id: GoalId,
        info: &GoalInfo,
        x: VarId,
        cons: &ConsId,
        args: &[VarId],
        instmap: &mut InstMap,
        errors: &mut Vec<ModeError>,
    ) -> UnifyKind {
        let construct = || UnifyKind::Construct { dest: x, cons: cons.clone(), args: args.to_vec() };
        if !instmap.is_reachable() {
            return construct();
        }
        let mut touched = vec![x];
        touched.extend_from_slice(args);
        if self.check_clobbered(id, info, &touched, instmap, errors) {
            return construct();
        }

        let ix = instmap.lookup(x);
        if ix.is_free() {
            let free_args: Vec<VarId> = args.iter().copied().filter(|a| instmap.lookup(*a).is_free()).collect();
            if !free_args.is_empty() {
                errors.push(self.error(id, info, ModeErrorKind::PartialConstruction { var: x, free_args }));
                instmap.set_unreachable();
                return construct();
            }
            let arg_insts: Vec<Inst> = args.iter().map(|a| instmap.lookup(*a).shared()).collect();
            for (a, inst) in args.iter().zip(&arg_insts) {
                instmap.set(*a, inst.clone());
            }
            instmap.set(x, Inst::bound_to(Uniqueness::Unique, cons.clone(), arg_insts));
            return construct();
        }

        let can_fail = self.may_have_other_constructor(x, &ix, cons);
        let Some(fields) = ix.arg_insts(cons) else {
            // The inst rules the constructor out: the unification always fails.
            instmap.set_unreachable();
            return UnifyKind::Deconstruct {
                src: x,
                cons: cons.clone(),
                args: args.iter().map(|a| (*a, ArgUnify::Bind)).collect(),
                can_fail: true,
            };
        };

        let mut arg_modes = Vec::with_capacity(args.len());
        let mut new_fields = Vec::with_capacity(args.len());
        for (a, field) in args.iter().zip(fields) {
            let ia = instmap.lookup(*a);
            match (ia.is_free(), field.is_free()) {
                (true, true) => {
                    arg_modes.push((*a, ArgUnify::Unused));
                    new_fields.push(Inst::Free);
                }
                (true, false) => {
                    let shared = field.shared();
                    instmap.set(*a, shared.clone());
                    arg_modes.push((*a, ArgUnify::Bind));
                    new_fields.push(shared);
                }
                (false, _) if ia.is_ground() && field.is_ground() => {
                    let both = ia.meet(&field);
                    instmap.set(*a, both.clone());
                    arg_modes.push((*a, ArgUnify::Test));
                    new_fields.push(both);
                }
                (false, _) => {
                    errors.push(self.error(id, info, ModeErrorKind::NonGroundTest { var: *a, inst: ia }));
                    instmap.set_unreachable();
                    arg_modes.push((*a, ArgUnify::Test));
                    new_fields.push(Inst::NotReached);
                }
            }
        }
        let uniq = ix.uniqueness().unwrap_or(Uniqueness::Shared);
        instmap.set(x, Inst::bound_to(uniq, cons.clone(), new_fields));
        UnifyKind::Deconstruct { src: x, cons: cons.clone(), args: arg_modes, can_fail }
    }

    /// Whether a bound `x` with inst `ix` may have an outer constructor
    /// other than `cons`.
    fn may_have_other_constructor(&self, x: VarId, ix: &Inst, cons: &ConsId) -> bool {
        match ix {
            Inst::NotReached => false,
            Inst::Free => true,
            Inst::Bound(_, functors) => !(functors.len() == 1 && &functors[0].cons == cons),
            Inst::Ground(..) => {
                let closed = self.var_types.get(&x).and_then(|ty| self.table.constructors_of(ty));
                !matches!(closed, Some([only]) if only == cons)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn unify_closure(
        &self,
        id: GoalId,
        info: &GoalInfo,
        x: VarId,
        pred: PredId,
        proc: ProcIndex,
        args: &[VarId],
        instmap: &mut InstMap,
        errors: &mut Vec<ModeError>,
    ) -> UnifyKind {
        let proc_ref = ProcRef::new(pred, proc);
        let make = UnifyKind::MakeClosure { dest: x, proc: proc_ref, args: args.to_vec() };
        if !instmap.is_reachable() {
            return make;
        }
        let Some(decl) = self.table.proc(proc_ref) else {
            errors.push(self.error(id, info, ModeErrorKind::UnknownPredicate { pred }));
            instmap.set_unreachable();
            return make;
        };
        if !instmap.lookup(x).is_free() {
            errors.push(self.error(id, info, ModeErrorKind::HigherOrderTest { var: x }));
            instmap.set_unreachable();
            return make;
        }
        if args.len() > decl.modes.len() {
            errors.push(self.error(
                id,
                info,
                ModeErrorKind::ArityMismatch {
                    callee: self.table.proc_name(proc_ref),
                    expected: decl.modes.len(),
                    actual: args.len(),
                },
            ));
            instmap.set_unreachable();
            return make;
        }
        let actual: Vec<Inst> = args.iter().map(|a| instmap.lookup(*a)).collect();
        let curried_ok = actual
            .iter()
            .zip(&decl.modes)
            .all(|(inst, mode)| mode.is_input() && inst.matches_initial(&mode.initial));
        if !curried_ok {
            errors.push(self.error(
                id,
                info,
                ModeErrorKind::NoMatchingMode {
                    callee: self.table.proc_name(proc_ref),
                    args: args.iter().copied().zip(actual).collect(),
                },
            ));
            instmap.set_unreachable();
            return make;
        }
        for a in args {
            let shared = instmap.lookup(*a).shared();
            instmap.set(*a, shared);
        }
        let det = self.table.proc_det(proc_ref).unwrap_or(Determinism::Nondet);
        instmap.set(x, Inst::higher_order(decl.modes[args.len()..].to_vec(), det));
        make
    }
}
