//! Key-deduplicated function definitions owned by one pass.

use std::collections::HashMap;

use crate::error::{LinkError, Result};
use super::stage::ShaderFunction;

/// Insertion-ordered map from function key to definition.
///
/// Re-registering a key with an identical body is a no-op; a different body
/// is a [`LinkError::FunctionKeyConflict`].
#[derive(Clone, Debug, Default)]
pub struct FunctionTable {
    entries: Vec<ShaderFunction>,
    index_by_key: HashMap<String, usize>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, func: &ShaderFunction) -> Result<()> {
        if let Some(&idx) = self.index_by_key.get(&func.key) {
            if self.entries[idx].body.trim() != func.body.trim() {
                return Err(LinkError::FunctionKeyConflict {
                    key: func.key.clone(),
                });
            }
            return Ok(());
        }
        self.index_by_key.insert(func.key.clone(), self.entries.len());
        self.entries.push(func.clone());
        Ok(())
    }

    /// Check that every function of `funcs` could be inserted without
    /// modifying the table.
    pub fn check(&self, funcs: &[ShaderFunction]) -> Result<()> {
        let mut scratch: HashMap<&str, &str> = HashMap::new();
        for func in funcs {
            let existing = self
                .index_by_key
                .get(&func.key)
                .map(|&idx| self.entries[idx].body.as_str())
                .or_else(|| scratch.get(func.key.as_str()).copied());
            match existing {
                Some(body) if body.trim() != func.body.trim() => {
                    return Err(LinkError::FunctionKeyConflict {
                        key: func.key.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    scratch.insert(func.key.as_str(), func.body.as_str());
                }
            }
        }
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index_by_key.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Definitions in first-seen key order.
    pub fn iter(&self) -> impl Iterator<Item = &ShaderFunction> {
        self.entries.iter()
    }
}
