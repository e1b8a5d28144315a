use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::goal::det::Determinism;
use crate::goal::kind::ProcRef;
use crate::goal::node::Goal;
use crate::goal::quantify::quantify_body;
use crate::goal::var::{VarId, VarSet};

/// One procedure body as it flows through the passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    pub proc_ref: ProcRef,
    pub head_vars: Vec<VarId>,
    pub varset: VarSet,
    pub var_types: BTreeMap<VarId, String>,
    pub body: Goal,
    /// Set by determinism analysis.
    pub inferred_det: Option<Determinism>,
}

impl Procedure {
    /// Numbers the goals and computes non-locals.
    pub fn new(
        proc_ref: ProcRef,
        head_vars: Vec<VarId>,
        varset: VarSet,
        var_types: BTreeMap<VarId, String>,
        body: Goal,
    ) -> Self {
        let mut varset = varset;
        for v in body.vars().into_iter().chain(head_vars.iter().copied()) {
            varset.reserve(v);
        }
        let mut proc = Procedure { proc_ref, head_vars, varset, var_types, body, inferred_det: None };
        proc.renumber();
        proc.requantify();
        proc
    }

    pub fn renumber(&mut self) {
        let mut next = 0;
        self.body.renumber(&mut next);
    }

    pub fn requantify(&mut self) {
        quantify_body(&self.head_vars, &mut self.body);
    }

    pub fn var_type(&self, var: VarId) -> Option<&str> {
        self.var_types.get(&var).map(String::as_str)
    }

    pub fn var_name(&self, var: VarId) -> String {
        self.varset.name(var)
    }
}
