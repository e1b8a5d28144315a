use std::fmt;

use serde::{Deserialize, Serialize};

/// Outer constructor of a term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsId {
    Functor { name: String, arity: usize },
    Int(i64),
    Str(String),
}

impl ConsId {
    pub fn functor(name: &str, arity: usize) -> Self {
        ConsId::Functor { name: name.to_string(), arity }
    }

    pub fn atom(name: &str) -> Self {
        ConsId::functor(name, 0)
    }

    pub fn arity(&self) -> usize {
        match self {
            ConsId::Functor { arity, .. } => *arity,
            ConsId::Int(_) | ConsId::Str(_) => 0,
        }
    }
}

impl fmt::Display for ConsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsId::Functor { name, arity } => write!(f, "{}/{}", name, arity),
            ConsId::Int(i) => write!(f, "{}", i),
            ConsId::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// A declared discriminated union type. Its constructor set is closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDefn {
    pub name: String,
    pub constructors: Vec<ConsId>,
}

impl TypeDefn {
    pub fn new(name: &str, constructors: Vec<ConsId>) -> Self {
        TypeDefn { name: name.to_string(), constructors }
    }
}
