// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory tag. Used for server rendering and when there is no container.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::RuleError;
use crate::options::InsertMode;
use crate::tag::Tag;

/// Tag backed by a plain vector of rule strings.
#[derive(Clone, Debug, Default)]
pub struct VirtualTag {
    rules: Vec<String>,
}

impl VirtualTag {
    /// Creates an empty tag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tag for VirtualTag {
    fn insert_rule(&mut self, index: usize, rule: &str) -> Result<(), RuleError> {
        if index > self.rules.len() {
            return Err(RuleError::OutOfBounds {
                index,
                len: self.rules.len(),
            });
        }
        self.rules.insert(index, rule.to_string());
        Ok(())
    }

    fn fill_rule(&mut self, index: usize, rule: &str) -> Result<(), RuleError> {
        let len = self.rules.len();
        let slot = self
            .rules
            .get_mut(index)
            .ok_or(RuleError::OutOfBounds { index, len })?;
        debug_assert!(slot.is_empty(), "filling a live slot at {index}");
        *slot = rule.to_string();
        Ok(())
    }

    fn delete_rule(&mut self, index: usize) {
        if let Some(slot) = self.rules.get_mut(index) {
            slot.clear();
        }
    }

    fn len(&self) -> usize {
        self.rules.len()
    }

    fn rule(&self, index: usize) -> String {
        self.rules.get(index).cloned().unwrap_or_default()
    }

    fn mode(&self) -> InsertMode {
        InsertMode::Text
    }
}
