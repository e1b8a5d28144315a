//! file: core/src/goal/table.rs
//! description: read-only declaration table shared by every pass.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::goal::cons::{ConsId, TypeDefn};
use crate::goal::det::Determinism;
use crate::goal::kind::{PredId, ProcRef};
use crate::goal::mode::Mode;

/// One declared mode of a predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcDecl {
    pub modes: Vec<Mode>,
    #[serde(default)]
    pub det: Option<Determinism>,
}

impl ProcDecl {
    pub fn new(modes: Vec<Mode>, det: Option<Determinism>) -> Self {
        ProcDecl { modes, det }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredDecl {
    pub name: String,
    #[serde(default)]
    pub arg_types: Vec<String>,
    pub procs: Vec<ProcDecl>,
}

impl PredDecl {
    pub fn new(name: &str, arg_types: Vec<&str>, procs: Vec<ProcDecl>) -> Self {
        PredDecl {
            name: name.to_string(),
            arg_types: arg_types.into_iter().map(String::from).collect(),
            procs,
        }
    }

    pub fn arity(&self) -> usize {
        match self.procs.first() {
            Some(p) => p.modes.len(),
            None => self.arg_types.len(),
        }
    }
}

/// Types and predicate declarations of a module, plus the determinisms
/// inferred for procedures that declare none. Built once and then only
/// read; a snapshot with more inferred entries is a new value.
#[derive(Debug, Clone, Default)]
pub struct ModuleTable {
    name: String,
    types: BTreeMap<String, TypeDefn>,
    preds: Vec<PredDecl>,
    inferred: BTreeMap<ProcRef, Determinism>,
}

impl ModuleTable {
    pub fn new(name: &str, types: Vec<TypeDefn>, preds: Vec<PredDecl>) -> Self {
        ModuleTable {
            name: name.to_string(),
            types: types.into_iter().map(|t| (t.name.clone(), t)).collect(),
            preds,
            inferred: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn preds(&self) -> &[PredDecl] {
        &self.preds
    }

    pub fn pred(&self, id: PredId) -> Option<&PredDecl> {
        self.preds.get(id)
    }

    pub fn proc(&self, proc: ProcRef) -> Option<&ProcDecl> {
        self.pred(proc.pred).and_then(|p| p.procs.get(proc.proc))
    }

    /// Declared determinism, else the one inferred earlier in this compile.
    pub fn proc_det(&self, proc: ProcRef) -> Option<Determinism> {
        self.proc(proc)
            .and_then(|p| p.det)
            .or_else(|| self.inferred.get(&proc).copied())
    }

    pub fn proc_refs(&self) -> Vec<ProcRef> {
        self.preds
            .iter()
            .enumerate()
            .flat_map(|(pred, decl)| (0..decl.procs.len()).map(move |proc| ProcRef { pred, proc }))
            .collect()
    }

    pub fn type_defn(&self, name: &str) -> Option<&TypeDefn> {
        self.types.get(name)
    }

    /// Closed constructor set of a declared type. Builtin types are open.
    pub fn constructors_of(&self, type_name: &str) -> Option<&[ConsId]> {
        self.types.get(type_name).map(|t| t.constructors.as_slice())
    }

    pub fn proc_name(&self, proc: ProcRef) -> String {
        match self.pred(proc.pred) {
            Some(p) => format!("{}/{}-{}", p.name, p.arity(), proc.proc),
            None => format!("<unknown>-{}", proc),
        }
    }

    pub fn pred_name(&self, pred: PredId) -> String {
        match self.pred(pred) {
            Some(p) => format!("{}/{}", p.name, p.arity()),
            None => format!("<unknown pred {}>", pred),
        }
    }

    /// Finds a procedure by `name/arity-index`, `name/arity` or bare `name`
    /// (the last two pick the first procedure).
    pub fn lookup_proc(&self, name: &str) -> Option<ProcRef> {
        let (head, index) = match name.rsplit_once('-') {
            Some((h, i)) => match i.parse::<usize>() {
                Ok(i) => (h, i),
                Err(_) => (name, 0),
            },
            None => (name, 0),
        };
        let (name, arity) = match head.split_once('/') {
            Some((n, a)) => (n, a.parse::<usize>().ok()),
            None => (head, None),
        };
        self.preds.iter().enumerate().find_map(|(pred, decl)| {
            let arity_ok = arity.is_none_or(|a| a == decl.arity());
            (decl.name == name && arity_ok && index < decl.procs.len()).then_some(ProcRef { pred, proc: index })
        })
    }

    pub fn with_inferred(&self, inferred: BTreeMap<ProcRef, Determinism>) -> ModuleTable {
        ModuleTable { inferred, ..self.clone() }
    }

    pub fn inferred(&self) -> &BTreeMap<ProcRef, Determinism> {
        &self.inferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ModuleTable {
        ModuleTable::new(
            "m",
            vec![TypeDefn::new("color", vec![ConsId::atom("red"), ConsId::atom("blue")])],
            vec![PredDecl::new(
                "p",
                vec!["int", "int"],
                vec![
                    ProcDecl::new(vec![Mode::input(), Mode::output()], Some(Determinism::Det)),
                    ProcDecl::new(vec![Mode::output(), Mode::input()], None),
                ],
            )],
        )
    }

    #[test]
    fn lookup_by_name_forms() {
        let t = table();
        assert_eq!(t.lookup_proc("p"), Some(ProcRef::new(0, 0)));
        assert_eq!(t.lookup_proc("p/2-1"), Some(ProcRef::new(0, 1)));
        assert_eq!(t.lookup_proc("p/3"), None);
        assert_eq!(t.proc_name(ProcRef::new(0, 1)), "p/2-1");
    }

    #[test]
    fn inferred_determinism_fills_gaps_only() {
        let t = table().with_inferred(BTreeMap::from([
            (ProcRef::new(0, 0), Determinism::Semidet),
            (ProcRef::new(0, 1), Determinism::Multi),
        ]));
        assert_eq!(t.proc_det(ProcRef::new(0, 0)), Some(Determinism::Det));
        assert_eq!(t.proc_det(ProcRef::new(0, 1)), Some(Determinism::Multi));
        assert!(t.constructors_of("int").is_none());
        assert_eq!(t.constructors_of("color").map(|c| c.len()), Some(2));
    }
}
