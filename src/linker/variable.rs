//! Stage parameters and name-keyed variable sets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{LinkError, Result};
use super::types::{Direction, GlslType};

fn is_zero(v: &u32) -> bool {
    *v == 0
}

/// A named, typed value a stage reads or writes.
///
/// Identity is `(name, ty, array_size)`. Direction and the attribute flag
/// describe how one particular stage touches the value, so two stages may
/// declare the same variable with different directions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: GlslType,
    #[serde(rename = "dir", default = "default_direction")]
    pub direction: Direction,
    #[serde(rename = "attribute", default)]
    pub is_attribute: bool,
    /// 0 for a plain value, N > 0 for a fixed-size array.
    #[serde(rename = "array", default, skip_serializing_if = "is_zero")]
    pub array_size: u32,
}

fn default_direction() -> Direction {
    Direction::In
}

impl Variable {
    pub fn new(direction: Direction, ty: GlslType, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            direction,
            is_attribute: false,
            array_size: 0,
        }
    }

    pub fn input(ty: GlslType, name: impl Into<String>) -> Self {
        Self::new(Direction::In, ty, name)
    }

    pub fn output(ty: GlslType, name: impl Into<String>) -> Self {
        Self::new(Direction::Out, ty, name)
    }

    pub fn in_out(ty: GlslType, name: impl Into<String>) -> Self {
        Self::new(Direction::InOut, ty, name)
    }

    /// Per-vertex input read from the vertex stream.
    pub fn attribute(ty: GlslType, name: impl Into<String>) -> Self {
        Self {
            is_attribute: true,
            ..Self::input(ty, name)
        }
    }

    pub fn array(mut self, size: u32) -> Self {
        self.array_size = size;
        self
    }

    pub fn is_array(&self) -> bool {
        self.array_size > 0
    }

    /// Human-readable type, used in conflict messages (`sampler2D[4]`).
    pub fn type_label(&self) -> String {
        if self.is_array() {
            format!("{}[{}]", self.ty, self.array_size)
        } else {
            self.ty.to_string()
        }
    }

    /// Declarator suffix for arrays (`[4]`), empty otherwise.
    pub fn array_suffix(&self) -> String {
        if self.is_array() {
            format!("[{}]", self.array_size)
        } else {
            String::new()
        }
    }

    /// `T name` or `T name[N]`.
    pub fn declarator(&self) -> String {
        format!("{} {}{}", self.ty, self.name, self.array_suffix())
    }

    /// Same name but different type or arity.
    pub fn conflicts_with(&self, other: &Variable) -> bool {
        self.name == other.name && (self.ty != other.ty || self.array_size != other.array_size)
    }

    pub(crate) fn conflict_error(&self, other: &Variable) -> LinkError {
        LinkError::TypeConflict {
            name: self.name.clone(),
            first: self.type_label(),
            second: other.type_label(),
        }
    }

    /// Channel width when written to a color output (arrays never qualify).
    pub fn channel_width(&self) -> u32 {
        if self.is_array() {
            0
        } else {
            self.ty.components()
        }
    }

    /// Stable declaration order key: smaller types first, then by name.
    pub(crate) fn sort_key(&self) -> (u32, u32, &str) {
        (self.ty.size_key(), self.array_size, self.name.as_str())
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.ty == other.ty && self.array_size == other.array_size
    }
}

impl Eq for Variable {}

impl std::hash::Hash for Variable {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.ty.hash(state);
        self.array_size.hash(state);
    }
}

/// Insertion-ordered set of variables keyed by name.
///
/// Inserting a variable whose name is already present with a different type
/// or arity is a [`LinkError::TypeConflict`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariableSet {
    items: Vec<Variable>,
    index_by_name: HashMap<String, usize>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `var`; returns `Ok(true)` when the name was not present yet.
    pub fn insert(&mut self, var: &Variable) -> Result<bool> {
        if let Some(&idx) = self.index_by_name.get(&var.name) {
            let existing = &self.items[idx];
            if existing.conflicts_with(var) {
                return Err(existing.conflict_error(var));
            }
            return Ok(false);
        }
        self.index_by_name.insert(var.name.clone(), self.items.len());
        self.items.push(var.clone());
        Ok(true)
    }

    /// Remove by name, keeping the order of the remaining entries.
    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        let idx = self.index_by_name.remove(name)?;
        let removed = self.items.remove(idx);
        for slot in self.index_by_name.values_mut() {
            if *slot > idx {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.index_by_name.get(name).map(|&idx| &self.items[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.items.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|v| v.name.as_str()).collect()
    }

    /// Entries in declaration order (size key, then name).
    pub fn sorted(&self) -> Vec<&Variable> {
        let mut out: Vec<&Variable> = self.items.iter().collect();
        out.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        out
    }

    /// Insert every entry of `other`, in its order.
    pub fn extend_from(&mut self, other: &VariableSet) -> Result<()> {
        for var in other.iter() {
            self.insert(var)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a VariableSet {
    type Item = &'a Variable;
    type IntoIter = std::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
