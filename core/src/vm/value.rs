use std::fmt;

use serde::{Deserialize, Serialize};

use crate::goal::{ConsId, ProcRef};
use crate::ir::op::Const;

pub const LIST_CONS: &str = "[|]";
pub const LIST_NIL: &str = "[]";

/// A runtime value held in a register or a stack slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Int(i64),
    Str(String),
    Bool(bool),
    Term(ConsId, Vec<Value>),
    Closure(ProcRef, Vec<Value>),
    /// A slot that has not been written since the frame was allocated.
    Unset,
}

impl Value {
    pub fn atom(name: &str) -> Value {
        Value::Term(ConsId::atom(name), Vec::new())
    }

    pub fn compound(name: &str, args: Vec<Value>) -> Value {
        Value::Term(ConsId::functor(name, args.len()), args)
    }

    pub fn list(items: Vec<Value>) -> Value {
        items
            .into_iter()
            .rev()
            .fold(Value::atom(LIST_NIL), |tail, head| Value::compound(LIST_CONS, vec![head, tail]))
    }

    /// The value built by a constructor with the given arguments.
    pub fn of_cons(cons: &ConsId, args: Vec<Value>) -> Value {
        match cons {
            ConsId::Int(i) => Value::Int(*i),
            ConsId::Str(s) => Value::Str(s.clone()),
            ConsId::Functor { .. } => Value::Term(cons.clone(), args),
        }
    }

    pub fn has_functor(&self, cons: &ConsId) -> bool {
        match (self, cons) {
            (Value::Int(a), ConsId::Int(b)) => a == b,
            (Value::Str(a), ConsId::Str(b)) => a == b,
            (Value::Term(c, _), _) => c == cons,
            _ => false,
        }
    }

    fn list_items(&self) -> Option<Vec<&Value>> {
        let mut items = Vec::new();
        let mut cur = self;
        loop {
            match cur {
                Value::Term(ConsId::Functor { name, arity: 0 }, _) if name == LIST_NIL => return Some(items),
                Value::Term(ConsId::Functor { name, arity: 2 }, args) if name == LIST_CONS => {
                    items.push(&args[0]);
                    cur = &args[1];
                }
                _ => return None,
            }
        }
    }
}

impl From<&Const> for Value {
    fn from(c: &Const) -> Self {
        match c {
            Const::Int(i) => Value::Int(*i),
            Const::Str(s) => Value::Str(s.clone()),
            Const::Bool(b) => Value::Bool(*b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Term(cons, args) => {
                if let Some(items) = self.list_items() {
                    let shown: Vec<String> = items.iter().map(ToString::to_string).collect();
                    return write!(f, "[{}]", shown.join(", "));
                }
                match cons {
                    ConsId::Functor { name, .. } if args.is_empty() => write!(f, "{}", name),
                    ConsId::Functor { name, .. } => {
                        let shown: Vec<String> = args.iter().map(ToString::to_string).collect();
                        write!(f, "{}({})", name, shown.join(", "))
                    }
                    other => write!(f, "{}", other),
                }
            }
            Value::Closure(proc, args) => write!(f, "<closure {}/{}>", proc, args.len()),
            Value::Unset => write!(f, "_"),
        }
    }
}
