//! file: core/src/ir/mod.rs
//! description: the low-level instruction set and its producers.
pub mod lower;
pub mod module;
pub mod op;
pub mod opt;
pub mod verify;

pub use lower::{generate, generate_unoptimized};
pub use module::{ModuleCode, ProcCode};
pub use op::{Cond, Const, Instr, Instruction, LabelId, LiveVal, Lval, Rval};
pub use opt::optimize;
pub use verify::check_storage;
