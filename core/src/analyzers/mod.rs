pub mod determinism;
pub mod modes;
pub mod switch;

pub use determinism::{analyze_determinism, infer_determinism, DetError, DetErrorKind, DetOutcome};
pub use modes::{analyze_modes, ModeError, ModeErrorKind};
pub use switch::{detect_switches, SwitchOutcome, SwitchWarning};
