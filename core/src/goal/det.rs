use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CanFail {
    CannotFail,
    CanFail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MaxSolns {
    Zero,
    One,
    Many,
}

/// How many solutions a goal can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Determinism {
    Det,
    Semidet,
    Multi,
    Nondet,
    Failure,
    Erroneous,
}

/// Calling convention a goal is compiled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeModel {
    Det,
    Semi,
    Non,
}

impl Determinism {
    pub fn from_components(can_fail: CanFail, max_solns: MaxSolns) -> Self {
        match (can_fail, max_solns) {
            (CanFail::CannotFail, MaxSolns::Zero) => Determinism::Erroneous,
            (CanFail::CannotFail, MaxSolns::One) => Determinism::Det,
            (CanFail::CannotFail, MaxSolns::Many) => Determinism::Multi,
            (CanFail::CanFail, MaxSolns::Zero) => Determinism::Failure,
            (CanFail::CanFail, MaxSolns::One) => Determinism::Semidet,
            (CanFail::CanFail, MaxSolns::Many) => Determinism::Nondet,
        }
    }

    pub fn components(self) -> (CanFail, MaxSolns) {
        match self {
            Determinism::Erroneous => (CanFail::CannotFail, MaxSolns::Zero),
            Determinism::Det => (CanFail::CannotFail, MaxSolns::One),
            Determinism::Multi => (CanFail::CannotFail, MaxSolns::Many),
            Determinism::Failure => (CanFail::CanFail, MaxSolns::Zero),
            Determinism::Semidet => (CanFail::CanFail, MaxSolns::One),
            Determinism::Nondet => (CanFail::CanFail, MaxSolns::Many),
        }
    }

    pub fn can_fail(self) -> bool {
        self.components().0 == CanFail::CanFail
    }

    pub fn max_solns(self) -> MaxSolns {
        self.components().1
    }

    /// The partial order: `self` promises at least as much as `other`.
    pub fn is_tighter_or_equal(self, other: Determinism) -> bool {
        let (cf1, ms1) = self.components();
        let (cf2, ms2) = other.components();
        cf1 <= cf2 && ms1 <= ms2
    }

    pub fn code_model(self) -> CodeModel {
        match self.components() {
            (_, MaxSolns::Many) => CodeModel::Non,
            (CanFail::CanFail, _) => CodeModel::Semi,
            (CanFail::CannotFail, _) => CodeModel::Det,
        }
    }

    /// `self` followed by `next`.
    pub fn conjoin(self, next: Determinism) -> Determinism {
        let (cf1, ms1) = self.components();
        if ms1 == MaxSolns::Zero {
            return self;
        }
        let (cf2, ms2) = next.components();
        let ms = if ms2 == MaxSolns::Zero { MaxSolns::Zero } else { ms1.max(ms2) };
        Determinism::from_components(cf1.max(cf2), ms)
    }

    /// Alternatives that may both succeed for the same bindings.
    pub fn disjoin(self, other: Determinism) -> Determinism {
        let (cf1, ms1) = self.components();
        let (cf2, ms2) = other.components();
        let ms = match (ms1, ms2) {
            (MaxSolns::Zero, m) | (m, MaxSolns::Zero) => m,
            _ => MaxSolns::Many,
        };
        Determinism::from_components(cf1.min(cf2), ms)
    }

    /// Mutually exclusive alternatives.
    pub fn switch_join(self, other: Determinism) -> Determinism {
        let (cf1, ms1) = self.components();
        let (cf2, ms2) = other.components();
        Determinism::from_components(cf1.max(cf2), ms1.max(ms2))
    }

    /// Keep only the first solution.
    pub fn commit(self) -> Determinism {
        let (cf, ms) = self.components();
        Determinism::from_components(cf, ms.min(MaxSolns::One))
    }

    pub fn with_can_fail(self) -> Determinism {
        Determinism::from_components(CanFail::CanFail, self.max_solns())
    }

    /// `cond -> then ; else`, treated as `(cond, then ; not(cond), else)`
    /// where the branches exclude each other.
    pub fn if_then_else(cond: Determinism, then: Determinism, els: Determinism) -> Determinism {
        let (cond_cf, cond_ms) = cond.components();
        if cond_ms == MaxSolns::Zero {
            return if cond_cf == CanFail::CannotFail { cond } else { els };
        }
        if cond_cf == CanFail::CannotFail {
            return cond.conjoin(then);
        }
        let then_part = cond.conjoin(then);
        let cf = then.components().0.max(els.components().0);
        Determinism::from_components(cf, then_part.max_solns().max(els.max_solns()))
    }
}

impl fmt::Display for Determinism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Determinism::Det => "det",
            Determinism::Semidet => "semidet",
            Determinism::Multi => "multi",
            Determinism::Nondet => "nondet",
            Determinism::Failure => "failure",
            Determinism::Erroneous => "erroneous",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for CodeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CodeModel::Det => "det",
            CodeModel::Semi => "semi",
            CodeModel::Non => "non",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::Determinism::*;
    use super::*;

    #[test]
    fn order_is_componentwise() {
        assert!(Det.is_tighter_or_equal(Semidet));
        assert!(Det.is_tighter_or_equal(Multi));
        assert!(!Semidet.is_tighter_or_equal(Multi));
        assert!(Erroneous.is_tighter_or_equal(Failure));
        assert!(Failure.is_tighter_or_equal(Nondet));
        assert!(!Nondet.is_tighter_or_equal(Semidet));
    }

    #[test]
    fn conjunction_stops_at_failure() {
        assert_eq!(Det.conjoin(Semidet), Semidet);
        assert_eq!(Semidet.conjoin(Multi), Nondet);
        assert_eq!(Failure.conjoin(Nondet), Failure);
        assert_eq!(Det.conjoin(Erroneous), Erroneous);
    }

    #[test]
    fn disjunction_sums_solutions() {
        assert_eq!(Semidet.disjoin(Semidet), Nondet);
        assert_eq!(Det.disjoin(Failure), Det);
        assert_eq!(Failure.disjoin(Failure), Failure);
        assert_eq!(Semidet.switch_join(Det), Semidet);
    }

    #[test]
    fn switch_of_det_arms_is_det() {
        let arms = [Det, Det, Det, Det];
        assert_eq!(arms.iter().fold(Erroneous, |acc, d| acc.switch_join(*d)), Det);
        assert_eq!([Det, Multi].iter().fold(Erroneous, |acc, d| acc.switch_join(*d)), Multi);
        assert_eq!([Det, Failure].iter().fold(Erroneous, |acc, d| acc.switch_join(*d)), Semidet);
        assert_eq!(Erroneous.switch_join(Nondet), Nondet);
    }

    #[test]
    fn if_then_else_matches_disjunction_reading() {
        assert_eq!(Determinism::if_then_else(Semidet, Det, Det), Det);
        assert_eq!(Determinism::if_then_else(Semidet, Semidet, Det), Semidet);
        assert_eq!(Determinism::if_then_else(Semidet, Multi, Det), Multi);
        assert_eq!(Determinism::if_then_else(Failure, Det, Semidet), Semidet);
        assert_eq!(Determinism::if_then_else(Det, Semidet, Det), Semidet);
    }

    #[test]
    fn code_models() {
        assert_eq!(Det.code_model(), CodeModel::Det);
        assert_eq!(Erroneous.code_model(), CodeModel::Det);
        assert_eq!(Failure.code_model(), CodeModel::Semi);
        assert_eq!(Multi.code_model(), CodeModel::Non);
        assert_eq!(Nondet.commit(), Semidet);
    }
}
