//! Paths from the root of a value tree to a nested node

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// One step of a [`CtyPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathStep {
    /// Object attribute access
    GetAttr(String),
    /// List or tuple position
    Index(i64),
    /// Map key
    Key(String),
}

impl PathStep {
    pub fn attr(name: impl Into<String>) -> Self {
        Self::GetAttr(name.into())
    }

    pub fn index(index: usize) -> Self {
        Self::Index(i64::try_from(index).unwrap_or(i64::MAX))
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }
}

/// Location of a node inside a value, rendered like `config[1]['retries']`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CtyPath {
    steps: SmallVec<[PathStep; 4]>,
}

impl CtyPath {
    /// The empty path addressing the root value
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: impl IntoIterator<Item = PathStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Append a step at the leaf end
    pub fn push(&mut self, step: PathStep) {
        self.steps.push(step);
    }

    /// Insert a step at the root end, used while an error unwinds out of
    /// nested containers
    pub fn prepend(&mut self, step: PathStep) {
        self.steps.insert(0, step);
    }

    pub fn child_attr(&self, name: impl Into<String>) -> Self {
        self.child(PathStep::attr(name))
    }

    pub fn child_index(&self, index: usize) -> Self {
        self.child(PathStep::index(index))
    }

    pub fn child_key(&self, key: impl Into<String>) -> Self {
        self.child(PathStep::key(key))
    }

    fn child(&self, step: PathStep) -> Self {
        let mut path = self.clone();
        path.push(step);
        path
    }
}

impl fmt::Display for CtyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "(root)");
        }
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::GetAttr(name) if i == 0 => write!(f, "{name}")?,
                PathStep::GetAttr(name) => write!(f, ".{name}")?,
                PathStep::Index(index) => write!(f, "[{index}]")?,
                PathStep::Key(key) => write!(f, "['{key}']")?,
            }
        }
        Ok(())
    }
}

impl FromIterator<PathStep> for CtyPath {
    fn from_iter<I: IntoIterator<Item = PathStep>>(iter: I) -> Self {
        Self::from_steps(iter)
    }
}
