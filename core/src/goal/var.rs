use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarId(pub u32);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.0)
    }
}

/// Variable names of one procedure body plus the allocator for fresh ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VarSet {
    names: BTreeMap<VarId, String>,
    next: u32,
}

impl VarSet {
    pub fn new() -> Self {
        VarSet::default()
    }

    pub fn from_names(names: BTreeMap<VarId, String>) -> Self {
        let next = names.keys().map(|v| v.0 + 1).max().unwrap_or(0);
        VarSet { names, next }
    }

    /// Display name of `var`, falling back to its numeric form.
    pub fn name(&self, var: VarId) -> String {
        match self.names.get(&var) {
            Some(name) => name.clone(),
            None => var.to_string(),
        }
    }

    pub fn new_var(&mut self, name: Option<&str>) -> VarId {
        let var = VarId(self.next);
        self.next += 1;
        if let Some(name) = name {
            self.names.insert(var, name.to_string());
        }
        var
    }

    /// Make sure future `new_var` calls never hand out `var`.
    pub fn reserve(&mut self, var: VarId) {
        if var.0 >= self.next {
            self.next = var.0 + 1;
        }
    }

    pub fn len(&self) -> usize {
        self.next as usize
    }

    pub fn is_empty(&self) -> bool {
        self.next == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_vars_skip_reserved_ids() {
        let mut vs = VarSet::from_names(BTreeMap::from([(VarId(3), "X".to_string())]));
        vs.reserve(VarId(7));
        let v = vs.new_var(Some("Tmp"));
        assert_eq!(v, VarId(8));
        assert_eq!(vs.name(v), "Tmp");
        assert_eq!(vs.name(VarId(3)), "X");
        assert_eq!(vs.name(VarId(5)), "V5");
    }
}
