pub mod analyzers;
pub mod error;
pub mod goal;
pub mod ir;
pub mod location;
pub mod policy;
pub mod reports;
pub mod transform;
pub mod vm;

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, info, warn};
use rayon::prelude::*;

pub use analyzers::{analyze_determinism, analyze_modes, detect_switches, infer_determinism};
pub use error::{DiagnosticExt, InternalFault, Level};
pub use goal::{Module, ModuleTable, ProcRef, Procedure};
pub use ir::{generate, ModuleCode, ProcCode};
pub use location::Context;
pub use policy::{OptOverride, OptTuple, PolicyError};
pub use reports::{Report, ReportCollector, Severity};
pub use vm::{parse_term, run_proc, Value, VmError};

use goal::{Determinism, LoadError};
use transform::{inline_calls, InlineSource};

/// Rounds of determinism inference before the driver gives up on reaching
/// a fixpoint, per undeclared procedure.
const INFERENCE_ROUNDS_PER_PROC: usize = 4;

/// Failures that stop compilation of the whole module.
#[derive(Debug, Clone)]
pub enum CompileError {
    Load(LoadError),
    Fault(InternalFault),
}

impl CompileError {
    pub fn report(&self) -> Report {
        match self {
            CompileError::Load(e) => Report::from_diagnostic(e),
            CompileError::Fault(e) => Report::from_diagnostic(e),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Load(e) => write!(f, "{}", e),
            CompileError::Fault(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<LoadError> for CompileError {
    fn from(e: LoadError) -> Self {
        CompileError::Load(e)
    }
}

impl From<InternalFault> for CompileError {
    fn from(e: InternalFault) -> Self {
        CompileError::Fault(e)
    }
}

/// Procedures that passed every check, ready for code generation.
#[derive(Debug)]
pub struct CheckedModule {
    /// The declarations, with inferred determinisms filled in.
    pub table: ModuleTable,
    pub procs: Vec<Procedure>,
    pub reports: ReportCollector,
}

#[derive(Debug)]
pub struct CompiledModule {
    pub table: ModuleTable,
    pub code: ModuleCode,
    pub reports: ReportCollector,
}

enum Checked {
    Clean(Procedure, Vec<Report>),
    Rejected(Vec<Report>),
}

/// Mode analysis, determinism analysis and switch detection for every
/// procedure of `module`.
pub fn check_module(module: Module) -> Result<CheckedModule, CompileError> {
    let (table, procs) = module.into_parts()?;
    info!("checking module {} ({} procedure(s))", table.name(), procs.len());
    let mut reports = ReportCollector::new();

    let moded: Vec<Result<Procedure, Vec<Report>>> = procs
        .into_par_iter()
        .map(|p| {
            analyze_modes(p, &table)
                .map_err(|errs| errs.iter().map(|e| Report::from_diagnostic(e)).collect())
        })
        .collect();
    let mut mode_correct = Vec::with_capacity(moded.len());
    for r in moded {
        match r {
            Ok(p) => mode_correct.push(p),
            Err(rs) => reports.extend(rs),
        }
    }

    let table = infer_undeclared(&table, &mode_correct)?;

    let checked: Vec<Result<Checked, InternalFault>> =
        mode_correct.into_par_iter().map(|p| check_proc(p, &table)).collect();
    let mut clean = Vec::new();
    for r in checked {
        match r? {
            Checked::Clean(p, rs) => {
                reports.extend(rs);
                clean.push(p);
            }
            Checked::Rejected(rs) => reports.extend(rs),
        }
    }
    clean.sort_by_key(|p| p.proc_ref);
    debug!("{} of {} procedure(s) passed checking", clean.len(), table.proc_refs().len());
    Ok(CheckedModule { table, procs: clean, reports })
}

fn check_proc(proc: Procedure, table: &ModuleTable) -> Result<Checked, InternalFault> {
    let outcome = match analyze_determinism(proc, table)? {
        Ok(outcome) => outcome,
        Err(errs) => return Ok(Checked::Rejected(errs.iter().map(|e| Report::from_diagnostic(e)).collect())),
    };
    let mut reports: Vec<Report> = outcome.warnings.iter().map(|w| Report::from_diagnostic(w)).collect();
    let switched = detect_switches(outcome.proc, table)?;
    reports.extend(switched.warnings.iter().map(|w| Report::from_diagnostic(w)));
    Ok(Checked::Clean(switched.proc, reports))
}

/// Determinism of procedures declared without one, by fixpoint iteration
/// starting from `erroneous` for all of them.
fn infer_undeclared(table: &ModuleTable, procs: &[Procedure]) -> Result<ModuleTable, InternalFault> {
    let undeclared: Vec<&Procedure> =
        procs.iter().filter(|p| table.proc(p.proc_ref).is_some_and(|d| d.det.is_none())).collect();
    if undeclared.is_empty() {
        return Ok(table.clone());
    }
    let mut inferred: BTreeMap<ProcRef, Determinism> =
        undeclared.iter().map(|p| (p.proc_ref, Determinism::Erroneous)).collect();
    let max_rounds = undeclared.len() * INFERENCE_ROUNDS_PER_PROC + 1;
    for round in 0..max_rounds {
        let current = table.with_inferred(inferred.clone());
        let mut changed = false;
        for p in &undeclared {
            let (_, det) = infer_determinism((*p).clone(), &current)?;
            if inferred.get(&p.proc_ref) != Some(&det) {
                debug!("inferred {} as {} in round {}", table.proc_name(p.proc_ref), det, round);
                inferred.insert(p.proc_ref, det);
                changed = true;
            }
        }
        if !changed {
            return Ok(table.with_inferred(inferred));
        }
    }
    warn!("determinism inference did not settle after {} round(s)", max_rounds);
    Ok(table.with_inferred(inferred))
}

/// Checks `module` and generates code for every procedure that passed.
pub fn compile_module(module: Module, opts: &OptTuple) -> Result<CompiledModule, CompileError> {
    compile_module_observed(module, opts, |_| {})
}

/// As [`compile_module`], calling `observe` with the name of each
/// procedure once its code is ready.
pub fn compile_module_observed<F>(module: Module, opts: &OptTuple, observe: F) -> Result<CompiledModule, CompileError>
where
    F: Fn(&str) + Sync,
{
    let CheckedModule { table, procs, reports } = check_module(module)?;
    let source = InlineSource::new(procs.iter().cloned());

    let generated: Vec<Result<ProcCode, InternalFault>> = procs
        .into_par_iter()
        .map(|mut p| {
            inline_calls(&mut p, &source, opts);
            let code = generate(p, &table, opts)?;
            observe(&code.name);
            Ok(code)
        })
        .collect();

    let mut code = ModuleCode::new(table.name());
    for r in generated {
        code.procs.push(r?);
    }
    code.procs.sort_by_key(|p| p.proc);
    info!("compiled {} procedure(s) of {} at -O{}", code.procs.len(), table.name(), opts.level());
    Ok(CompiledModule { table, code, reports })
}
