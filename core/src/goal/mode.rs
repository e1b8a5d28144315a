use std::fmt;

use serde::{Deserialize, Serialize};

use crate::goal::inst::{Binding, Inst};

/// Before/after insts of one argument or variable occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "ModeRepr")]
pub struct Mode {
    pub initial: Inst,
    #[serde(rename = "final")]
    pub final_: Inst,
}

/// Accepts the standard mode names as well as explicit inst pairs.
#[derive(Deserialize)]
#[serde(untagged)]
enum ModeRepr {
    Named(StandardMode),
    Full {
        initial: Inst,
        #[serde(rename = "final")]
        final_: Inst,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum StandardMode {
    In,
    Out,
    Di,
    Uo,
}

impl From<ModeRepr> for Mode {
    fn from(repr: ModeRepr) -> Self {
        match repr {
            ModeRepr::Named(StandardMode::In) => Mode::input(),
            ModeRepr::Named(StandardMode::Out) => Mode::output(),
            ModeRepr::Named(StandardMode::Di) => Mode::di(),
            ModeRepr::Named(StandardMode::Uo) => Mode::uo(),
            ModeRepr::Full { initial, final_ } => Mode { initial, final_ },
        }
    }
}

impl Mode {
    pub fn new(initial: Inst, final_: Inst) -> Self {
        Mode { initial, final_ }
    }

    pub fn input() -> Self {
        Mode::new(Inst::ground(), Inst::ground())
    }

    pub fn output() -> Self {
        Mode::new(Inst::Free, Inst::ground())
    }

    /// Destructive input: the value is unique on entry and dead afterwards.
    pub fn di() -> Self {
        Mode::new(Inst::unique(), Inst::clobbered())
    }

    /// Unique output.
    pub fn uo() -> Self {
        Mode::new(Inst::Free, Inst::unique())
    }

    /// The caller supplies the value.
    pub fn is_input(&self) -> bool {
        self.initial.binding() != Binding::Free
    }

    /// The callee binds the value.
    pub fn is_output(&self) -> bool {
        self.initial.is_free() && !self.final_.is_free()
    }

    fn standard_name(&self) -> Option<&'static str> {
        if *self == Mode::input() {
            Some("in")
        } else if *self == Mode::output() {
            Some("out")
        } else if *self == Mode::di() {
            Some("di")
        } else if *self == Mode::uo() {
            Some("uo")
        } else {
            None
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.standard_name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{} >> {}", self.initial, self.final_),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_modes_parse_from_names() {
        let modes: Vec<Mode> = serde_json::from_str(r#"["in", "out", "di", "uo"]"#).unwrap();
        assert_eq!(modes, vec![Mode::input(), Mode::output(), Mode::di(), Mode::uo()]);
        assert!(modes[0].is_input() && !modes[0].is_output());
        assert!(modes[3].is_output());
        assert_eq!(modes[2].to_string(), "di");
    }

    #[test]
    fn explicit_modes_parse_from_inst_pairs() {
        let m: Mode = serde_json::from_str(r#"{"initial": "free", "final": "free"}"#).unwrap();
        assert!(!m.is_input() && !m.is_output());
        assert_eq!(m.to_string(), "free >> free");
    }
}
