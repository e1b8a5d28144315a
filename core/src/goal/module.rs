//! file: core/src/goal/module.rs
//! description: the front end's module dump and its loader.
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DiagnosticExt, Level};
use crate::goal::cons::TypeDefn;
use crate::goal::kind::{PredId, ProcIndex, ProcRef};
use crate::goal::node::{Goal, GoalId};
use crate::goal::proc::Procedure;
use crate::goal::table::{ModuleTable, PredDecl};
use crate::goal::var::{VarId, VarSet};
use crate::location::Context;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcBody {
    pub pred: PredId,
    pub proc: ProcIndex,
    pub head_vars: Vec<VarId>,
    #[serde(default)]
    pub var_names: BTreeMap<VarId, String>,
    #[serde(default)]
    pub var_types: BTreeMap<VarId, String>,
    pub body: Goal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub types: Vec<TypeDefn>,
    pub preds: Vec<PredDecl>,
    #[serde(default)]
    pub bodies: Vec<ProcBody>,
}

#[derive(Debug, Clone)]
pub struct LoadError {
    message: String,
    context: Option<Context>,
}

impl LoadError {
    pub fn new(message: impl Into<String>, context: Option<Context>) -> Self {
        LoadError { message: message.into(), context }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(ctx) => write!(f, "{} at {}", self.message, ctx),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for LoadError {}

impl DiagnosticExt for LoadError {
    fn level(&self) -> Level {
        Level::Error
    }

    fn message(&self) -> String {
        self.message.clone()
    }

    fn issuer(&self) -> String {
        "modus.goal.module".into()
    }

    fn context(&self) -> Option<Context> {
        self.context.clone()
    }

    fn goal(&self) -> Option<GoalId> {
        None
    }

    fn code(&self) -> u32 {
        1
    }
}

impl Module {
    pub fn from_json(text: &str) -> Result<Module, LoadError> {
        serde_json::from_str(text).map_err(|e| {
            LoadError::new(format!("malformed module: {}", e), Some(Context::new("<json>", e.line())))
        })
    }

    pub fn load(path: &Path) -> Result<Module, LoadError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LoadError::new(format!("cannot read {}: {}", path.display(), e), None))?;
        Module::from_json(&text).map_err(|e| match e.context {
            Some(ctx) => LoadError::new(e.message, Some(Context::new(path.display().to_string(), ctx.line))),
            None => e,
        })
    }

    /// Splits the dump into the shared declaration table and the bodies to
    /// compile, checking that every body belongs to a declared procedure.
    pub fn into_parts(self) -> Result<(ModuleTable, Vec<Procedure>), LoadError> {
        let table = ModuleTable::new(&self.name, self.types, self.preds);
        let mut procs = Vec::with_capacity(self.bodies.len());
        let mut seen = std::collections::BTreeSet::new();
        for body in self.bodies {
            let proc_ref = ProcRef::new(body.pred, body.proc);
            let context = body.body.info.context.clone();
            let Some(decl) = table.proc(proc_ref) else {
                return Err(LoadError::new(format!("body for undeclared procedure {}", proc_ref), context));
            };
            if decl.modes.len() != body.head_vars.len() {
                return Err(LoadError::new(
                    format!(
                        "{} has {} head variables but {} declared modes",
                        table.proc_name(proc_ref),
                        body.head_vars.len(),
                        decl.modes.len()
                    ),
                    context,
                ));
            }
            if !seen.insert(proc_ref) {
                return Err(LoadError::new(format!("{} has two bodies", table.proc_name(proc_ref)), context));
            }
            let varset = VarSet::from_names(body.var_names);
            procs.push(Procedure::new(proc_ref, body.head_vars, varset, body.var_types, body.body));
        }
        Ok((table, procs))
    }
}
