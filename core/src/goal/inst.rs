//! file: core/src/goal/inst.rs
//! description: the instantiation lattice.
//!
//! An `Inst` says, for one variable at one program point, whether the point
//! is reachable, how much of the value is bound, whether it may be aliased,
//! and which outer constructors it can have. `join` is the merge used at the
//! end of branched control flow; `matches_initial` is the subsumption check
//! used when selecting a callee mode.
use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::goal::cons::ConsId;
use crate::goal::det::Determinism;
use crate::goal::mode::Mode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Uniqueness {
    Unique,
    Shared,
    Clobbered,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundFunctor {
    pub cons: ConsId,
    pub args: Vec<Inst>,
}

/// Argument modes and determinism of a closure value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HigherOrderInst {
    pub modes: Vec<Mode>,
    pub det: Determinism,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inst {
    NotReached,
    Free,
    /// Functors are kept sorted by constructor with no duplicates.
    Bound(Uniqueness, Vec<BoundFunctor>),
    Ground(Uniqueness, Option<HigherOrderInst>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Free,
    Partial,
    Ground,
}

/// Two insts that cannot meet at a merge point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstConflict {
    pub left: Inst,
    pub right: Inst,
}

impl fmt::Display for InstConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot merge `{}` with `{}`", self.left, self.right)
    }
}

impl std::error::Error for InstConflict {}

impl Inst {
    pub fn ground() -> Inst {
        Inst::Ground(Uniqueness::Shared, None)
    }

    pub fn unique() -> Inst {
        Inst::Ground(Uniqueness::Unique, None)
    }

    pub fn clobbered() -> Inst {
        Inst::Ground(Uniqueness::Clobbered, None)
    }

    pub fn higher_order(modes: Vec<Mode>, det: Determinism) -> Inst {
        Inst::Ground(Uniqueness::Shared, Some(HigherOrderInst { modes, det }))
    }

    /// Builds a `Bound` inst, sorting and merging the functor list.
    /// An empty list describes no value at all and becomes `NotReached`.
    pub fn bound(uniq: Uniqueness, functors: Vec<BoundFunctor>) -> Inst {
        let mut sorted: Vec<BoundFunctor> = Vec::with_capacity(functors.len());
        let mut functors = functors;
        functors.sort_by(|a, b| a.cons.cmp(&b.cons));
        for f in functors {
            match sorted.last_mut() {
                Some(last) if last.cons == f.cons => {
                    if let Ok(args) = join_args(&last.args, &f.args) {
                        last.args = args;
                    }
                }
                _ => sorted.push(f),
            }
        }
        if sorted.is_empty() {
            Inst::NotReached
        } else {
            Inst::Bound(uniq, sorted)
        }
    }

    /// Bound to exactly `cons` with the given argument insts.
    pub fn bound_to(uniq: Uniqueness, cons: ConsId, args: Vec<Inst>) -> Inst {
        Inst::bound(uniq, vec![BoundFunctor { cons, args }])
    }

    /// Bound to one of `conses`, each with ground arguments.
    pub fn bound_any(uniq: Uniqueness, conses: impl IntoIterator<Item = ConsId>) -> Inst {
        let functors = conses
            .into_iter()
            .map(|cons| {
                let args = vec![Inst::ground(); cons.arity()];
                BoundFunctor { cons, args }
            })
            .collect();
        Inst::bound(uniq, functors)
    }

    pub fn is_reachable(&self) -> bool {
        !matches!(self, Inst::NotReached)
    }

    pub fn binding(&self) -> Binding {
        match self {
            Inst::NotReached | Inst::Ground(..) => Binding::Ground,
            Inst::Free => Binding::Free,
            Inst::Bound(_, functors) => {
                let all_ground = functors
                    .iter()
                    .all(|f| f.args.iter().all(|a| a.binding() == Binding::Ground));
                if all_ground { Binding::Ground } else { Binding::Partial }
            }
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, Inst::Free)
    }

    pub fn is_ground(&self) -> bool {
        self.binding() == Binding::Ground
    }

    pub fn uniqueness(&self) -> Option<Uniqueness> {
        match self {
            Inst::Bound(u, _) | Inst::Ground(u, _) => Some(*u),
            Inst::NotReached | Inst::Free => None,
        }
    }

    pub fn is_clobbered(&self) -> bool {
        self.uniqueness() == Some(Uniqueness::Clobbered)
    }

    /// Possible outer constructors, if the inst restricts them.
    pub fn functors(&self) -> Option<Vec<&ConsId>> {
        match self {
            Inst::Bound(_, functors) => Some(functors.iter().map(|f| &f.cons).collect()),
            _ => None,
        }
    }

    /// Argument insts the value has if its outer constructor is `cons`.
    /// `None` means the inst excludes `cons` (or the value is free).
    pub fn arg_insts(&self, cons: &ConsId) -> Option<Vec<Inst>> {
        match self {
            Inst::NotReached => Some(vec![Inst::NotReached; cons.arity()]),
            Inst::Free => None,
            Inst::Ground(u, _) => Some(vec![Inst::Ground(*u, None); cons.arity()]),
            Inst::Bound(_, functors) => functors
                .iter()
                .find(|f| &f.cons == cons)
                .map(|f| f.args.clone()),
        }
    }

    pub fn higher_order_info(&self) -> Option<&HigherOrderInst> {
        match self {
            Inst::Ground(_, Some(ho)) => Some(ho),
            _ => None,
        }
    }

    /// The same inst once a second reference to the value exists.
    pub fn shared(&self) -> Inst {
        match self {
            Inst::Ground(Uniqueness::Unique, ho) => Inst::Ground(Uniqueness::Shared, ho.clone()),
            Inst::Bound(u, functors) => {
                let u = if *u == Uniqueness::Unique { Uniqueness::Shared } else { *u };
                let functors = functors
                    .iter()
                    .map(|f| BoundFunctor {
                        cons: f.cons.clone(),
                        args: f.args.iter().map(Inst::shared).collect(),
                    })
                    .collect();
                Inst::Bound(u, functors)
            }
            other => other.clone(),
        }
    }

    /// Least upper bound of two insts reaching the same merge point.
    pub fn join(&self, other: &Inst) -> Result<Inst, InstConflict> {
        let conflict = || InstConflict { left: self.clone(), right: other.clone() };
        match (self, other) {
            (Inst::NotReached, x) | (x, Inst::NotReached) => Ok(x.clone()),
            (Inst::Free, Inst::Free) => Ok(Inst::Free),
            (Inst::Free, _) | (_, Inst::Free) => Err(conflict()),
            (Inst::Ground(u1, h1), Inst::Ground(u2, h2)) => {
                let ho = if h1 == h2 { h1.clone() } else { None };
                Ok(Inst::Ground((*u1).max(*u2), ho))
            }
            (Inst::Bound(u1, f1), Inst::Bound(u2, f2)) => {
                let mut out = Vec::with_capacity(f1.len() + f2.len());
                let (mut i, mut j) = (0, 0);
                while i < f1.len() || j < f2.len() {
                    let order = match (f1.get(i), f2.get(j)) {
                        (Some(a), Some(b)) => a.cons.cmp(&b.cons),
                        (Some(_), None) => Ordering::Less,
                        _ => Ordering::Greater,
                    };
                    match order {
                        Ordering::Less => {
                            out.push(f1[i].clone());
                            i += 1;
                        }
                        Ordering::Greater => {
                            out.push(f2[j].clone());
                            j += 1;
                        }
                        Ordering::Equal => {
                            let args = join_args(&f1[i].args, &f2[j].args).map_err(|_| conflict())?;
                            out.push(BoundFunctor { cons: f1[i].cons.clone(), args });
                            i += 1;
                            j += 1;
                        }
                    }
                }
                Ok(Inst::Bound((*u1).max(*u2), out))
            }
            (Inst::Bound(u1, _), Inst::Ground(u2, _)) | (Inst::Ground(u2, _), Inst::Bound(u1, _)) => {
                if self.is_ground() && other.is_ground() {
                    Ok(Inst::Ground((*u1).max(*u2), None))
                } else {
                    Err(conflict())
                }
            }
        }
    }

    /// Whether a value with inst `self` may be passed where `required` is
    /// the initial inst of the callee's argument mode.
    pub fn matches_initial(&self, required: &Inst) -> bool {
        match (self, required) {
            (Inst::NotReached, _) => true,
            (_, Inst::NotReached) => false,
            (Inst::Free, Inst::Free) => true,
            (_, Inst::Free) | (Inst::Free, _) => false,
            (actual, Inst::Ground(ru, rho)) => {
                if !actual.is_ground() {
                    return false;
                }
                if actual.uniqueness().is_some_and(|au| au > *ru) {
                    return false;
                }
                match rho {
                    None => true,
                    Some(required_ho) => match actual.higher_order_info() {
                        Some(ho) => {
                            ho.modes == required_ho.modes && ho.det.is_tighter_or_equal(required_ho.det)
                        }
                        None => false,
                    },
                }
            }
            (Inst::Bound(au, afs), Inst::Bound(ru, rfs)) => {
                au <= ru
                    && afs.iter().all(|af| {
                        rfs.iter().find(|rf| rf.cons == af.cons).is_some_and(|rf| {
                            af.args.len() == rf.args.len()
                                && af.args.iter().zip(&rf.args).all(|(a, r)| a.matches_initial(r))
                        })
                    })
            }
            (Inst::Ground(..), Inst::Bound(..)) => false,
        }
    }

    /// What both sides of a successful test unification are known to be.
    pub fn meet(&self, other: &Inst) -> Inst {
        match (self, other) {
            (Inst::NotReached, _) | (_, Inst::NotReached) => Inst::NotReached,
            (Inst::Free, x) | (x, Inst::Free) => x.shared(),
            (Inst::Ground(_, h1), Inst::Ground(_, h2)) => {
                Inst::Ground(Uniqueness::Shared, h1.clone().or_else(|| h2.clone()))
            }
            (b @ Inst::Bound(..), Inst::Ground(..)) | (Inst::Ground(..), b @ Inst::Bound(..)) => b.shared(),
            (Inst::Bound(_, f1), Inst::Bound(_, f2)) => {
                let mut out = Vec::new();
                for a in f1 {
                    let Some(b) = f2.iter().find(|b| b.cons == a.cons) else {
                        continue;
                    };
                    let args: Vec<Inst> = a.args.iter().zip(&b.args).map(|(x, y)| x.meet(y)).collect();
                    if args.iter().all(Inst::is_reachable) {
                        out.push(BoundFunctor { cons: a.cons.clone(), args });
                    }
                }
                Inst::bound(Uniqueness::Shared, out)
            }
        }
    }
}

fn join_args(a: &[Inst], b: &[Inst]) -> Result<Vec<Inst>, InstConflict> {
    a.iter().zip(b).map(|(x, y)| x.join(y)).collect()
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::NotReached => write!(f, "not_reached"),
            Inst::Free => write!(f, "free"),
            Inst::Ground(u, None) => match u {
                Uniqueness::Unique => write!(f, "unique"),
                Uniqueness::Shared => write!(f, "ground"),
                Uniqueness::Clobbered => write!(f, "clobbered"),
            },
            Inst::Ground(_, Some(ho)) => {
                write!(f, "pred(")?;
                for (i, m) in ho.modes.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", m)?;
                }
                write!(f, ") is {}", ho.det)
            }
            Inst::Bound(u, functors) => {
                let head = match u {
                    Uniqueness::Unique => "unique",
                    Uniqueness::Shared => "bound",
                    Uniqueness::Clobbered => "clobbered",
                };
                write!(f, "{}(", head)?;
                for (i, func) in functors.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ; ")?;
                    }
                    match &func.cons {
                        ConsId::Functor { name, .. } => write!(f, "{}", name)?,
                        other => write!(f, "{}", other)?,
                    }
                    if !func.args.is_empty() {
                        write!(f, "(")?;
                        for (k, a) in func.args.iter().enumerate() {
                            if k > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{}", a)?;
                        }
                        write!(f, ")")?;
                    }
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ab() -> Inst {
        Inst::bound_any(Uniqueness::Shared, [ConsId::atom("a"), ConsId::atom("b")])
    }

    #[test]
    fn join_unions_constructor_sets() {
        let a = Inst::bound_any(Uniqueness::Unique, [ConsId::atom("a")]);
        let b = Inst::bound_any(Uniqueness::Shared, [ConsId::atom("b")]);
        assert_eq!(a.join(&b), Ok(ab()));
        assert_eq!(a.join(&Inst::NotReached), Ok(a.clone()));
    }

    #[test]
    fn join_rejects_free_against_bound() {
        assert!(Inst::Free.join(&Inst::ground()).is_err());
        let partial = Inst::bound_to(Uniqueness::Unique, ConsId::functor("f", 1), vec![Inst::Free]);
        assert_eq!(partial.binding(), Binding::Partial);
        assert!(partial.join(&Inst::ground()).is_err());
    }

    #[test]
    fn ground_bound_join_is_ground() {
        assert_eq!(ab().join(&Inst::unique()), Ok(Inst::ground()));
    }

    #[test]
    fn subsumption_respects_uniqueness() {
        assert!(Inst::unique().matches_initial(&Inst::ground()));
        assert!(Inst::unique().matches_initial(&Inst::unique()));
        assert!(!Inst::ground().matches_initial(&Inst::unique()));
        assert!(!Inst::clobbered().matches_initial(&Inst::ground()));
        assert!(!Inst::Free.matches_initial(&Inst::ground()));
        assert!(!Inst::ground().matches_initial(&Inst::Free));
        assert!(ab().matches_initial(&Inst::ground()));
        assert!(!Inst::ground().matches_initial(&ab()));
    }

    #[test]
    fn meet_intersects_constructor_sets() {
        let bc = Inst::bound_any(Uniqueness::Shared, [ConsId::atom("b"), ConsId::atom("c")]);
        let b = Inst::bound_any(Uniqueness::Shared, [ConsId::atom("b")]);
        assert_eq!(ab().meet(&bc), b);
        let c = Inst::bound_any(Uniqueness::Shared, [ConsId::atom("c")]);
        assert_eq!(ab().meet(&c), Inst::NotReached);
    }

    #[test]
    fn display_forms() {
        assert_eq!(Inst::ground().to_string(), "ground");
        assert_eq!(ab().to_string(), "bound(a ; b)");
        let f = Inst::bound_to(Uniqueness::Unique, ConsId::functor("f", 1), vec![Inst::Free]);
        assert_eq!(f.to_string(), "unique(f(free))");
    }
}
