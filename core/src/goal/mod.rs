//! file: core/src/goal/mod.rs
//! description: the annotated goal tree shared by every pass.
pub mod build;
pub mod cons;
pub mod det;
pub mod inst;
pub mod kind;
pub mod mode;
pub mod module;
pub mod node;
pub mod proc;
pub mod quantify;
pub mod rename;
pub mod table;
pub mod var;

pub use cons::{ConsId, TypeDefn};
pub use det::{CanFail, CodeModel, Determinism, MaxSolns};
pub use inst::{Binding, BoundFunctor, HigherOrderInst, Inst, InstConflict, Uniqueness};
pub use kind::{
    ArgUnify, Case, Coverage, GoalKind, PredId, ProcIndex, ProcRef, Purity, ScopeReason, UnifyKind, UnifyRhs,
};
pub use mode::Mode;
pub use module::{LoadError, Module, ProcBody};
pub use node::{Goal, GoalId, GoalInfo};
pub use proc::Procedure;
pub use table::{ModuleTable, PredDecl, ProcDecl};
pub use var::{VarId, VarSet};
