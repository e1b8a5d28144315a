//! Goal-level rewrites run between switch detection and code generation.
//! Both keep every annotation valid, so the code generator can consume the
//! result directly.
pub mod excess;
pub mod inline;

pub use excess::eliminate_excess_assigns;
pub use inline::{inline_calls, InlineSource};
