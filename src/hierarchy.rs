//! Indentation-derived nesting and one-time attribute inheritance for
//! hierarchical Ra files.

use crate::error::RaError;
use crate::stanza::RaStanza;

/// Compute a block's nesting depth from its leading whitespace.
///
/// Every line of the block must carry the same number of leading space
/// characters; disagreement is a [`RaError::InconsistentIndent`]. The depth is
/// the shared count divided by `indent_unit`.
pub fn block_depth(lines: &[String], indent_unit: usize) -> Result<usize, RaError> {
    let mut indent: Option<usize> = None;
    for line in lines {
        let count = line.chars().take_while(|c| *c == ' ').count();
        match indent {
            None => indent = Some(count),
            Some(prev) if prev != count => return Err(RaError::InconsistentIndent),
            Some(_) => {}
        }
    }
    match indent {
        None => Err(RaError::EmptyStanza),
        Some(count) => Ok(count / indent_unit),
    }
}

/// Tracks the chain of enclosing scopes while parsing a hierarchical file.
///
/// Scopes are arena indices into the owning collection's stanza storage. A
/// stanza at depth `d` replaces the scope at `d`; any deeper scopes are then
/// stale and are dropped so they cannot be referenced again.
#[derive(Debug, Default)]
pub struct ScopeTracker {
    scopes: Vec<usize>,
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the stanza at `arena[idx]`, parsed at `depth`, to the scope
    /// chain, setting its parent link and copying every parent key absent
    /// from it.
    ///
    /// The copy happens once, here: mutating the parent afterwards does not
    /// propagate to the child.
    pub fn attach(
        &mut self,
        arena: &mut [RaStanza],
        idx: usize,
        depth: usize,
    ) -> Result<(), RaError> {
        if depth == self.scopes.len() {
            self.scopes.push(idx);
        } else if depth < self.scopes.len() {
            self.scopes[depth] = idx;
            self.scopes.truncate(depth + 1);
        } else {
            return Err(RaError::SkippedDepth {
                found: depth,
                max: self.scopes.len(),
            });
        }

        if depth > 0 {
            let parent_idx = self.scopes[depth - 1];
            let inherited: Vec<(String, String)> = arena[parent_idx]
                .iter_pairs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            let child = &mut arena[idx];
            child.set_parent(parent_idx);
            for (key, value) in inherited {
                if !child.contains_key(&key) {
                    child.set(key, value);
                }
            }
        }
        Ok(())
    }
}
