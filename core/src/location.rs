use serde::{Deserialize, Serialize};

/// Source position of a goal, as recorded by the front end.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Context {
    /// The file in which the goal appears.
    pub file: String,
    /// The line number of the goal (1-based).
    pub line: usize,
}

impl Context {
    /// Creates a new `Context`.
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self { file: file.into(), line }
    }
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}
