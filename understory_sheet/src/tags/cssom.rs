// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fast-path tag: one container rule per live slot.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use crate::element::StyleElement;
use crate::error::RuleError;
use crate::options::{InsertMode, SheetOptions};
use crate::tag::Tag;

/// Tag that inserts each rule through the container's rule API.
///
/// Containers cannot hold empty rules, so placeholders exist only in the
/// liveness map: a slot's container index is the number of live slots before it.
#[derive(Debug)]
pub struct CssomTag {
    element: Box<dyn StyleElement>,
    live: Vec<bool>,
}

impl CssomTag {
    /// Wraps `element`, marking it as a fast-path container.
    pub fn new(mut element: Box<dyn StyleElement>, options: &SheetOptions) -> Self {
        super::mark_element(&mut *element, options, InsertMode::Cssom);
        Self {
            element,
            live: Vec::new(),
        }
    }

    fn physical_index(&self, index: usize) -> usize {
        self.live[..index].iter().filter(|&&live| live).count()
    }
}

impl Tag for CssomTag {
    fn insert_rule(&mut self, index: usize, rule: &str) -> Result<(), RuleError> {
        if index > self.live.len() {
            return Err(RuleError::OutOfBounds {
                index,
                len: self.live.len(),
            });
        }
        let physical = self.physical_index(index);
        self.element.insert_rule(rule, physical)?;
        self.live.insert(index, true);
        Ok(())
    }

    fn fill_rule(&mut self, index: usize, rule: &str) -> Result<(), RuleError> {
        if index >= self.live.len() {
            return Err(RuleError::OutOfBounds {
                index,
                len: self.live.len(),
            });
        }
        debug_assert!(!self.live[index], "filling a live slot at {index}");
        let physical = self.physical_index(index);
        self.element.insert_rule(rule, physical)?;
        self.live[index] = true;
        Ok(())
    }

    fn delete_rule(&mut self, index: usize) {
        if self.live.get(index).copied().unwrap_or(false) {
            let physical = self.physical_index(index);
            self.element.delete_rule(physical);
            self.live[index] = false;
        }
    }

    fn len(&self) -> usize {
        self.live.len()
    }

    fn rule(&self, index: usize) -> String {
        if !self.live.get(index).copied().unwrap_or(false) {
            return String::new();
        }
        self.element
            .rule_text(self.physical_index(index))
            .unwrap_or_default()
    }

    fn element_mut(&mut self) -> Option<&mut dyn StyleElement> {
        Some(&mut *self.element)
    }

    fn mode(&self) -> InsertMode {
        InsertMode::Cssom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::MemoryElement;

    #[test]
    fn rejected_rules_allocate_nothing() {
        let mut tag = CssomTag::new(Box::new(MemoryElement::new()), &SheetOptions::default());
        assert!(tag.insert_rule(0, ".a{color:red;}").is_ok());
        assert!(tag.insert_rule(1, ".broken{color:").is_err());
        assert_eq!(tag.len(), 1);
        assert_eq!(tag.rule(0), ".a{color:red;}");
    }

    #[test]
    fn placeholders_map_to_container_indices() {
        let mut tag = CssomTag::new(Box::new(MemoryElement::new()), &SheetOptions::default());
        for (i, rule) in [".a{}", ".b{}", ".c{}"].into_iter().enumerate() {
            tag.insert_rule(i, rule).unwrap();
        }
        tag.delete_rule(0);
        tag.delete_rule(1);
        tag.insert_rule(1, ".x{}").unwrap();
        assert_eq!(tag.len(), 4);
        assert_eq!(tag.rule(1), ".x{}");
        assert_eq!(tag.rule(3), ".c{}");
        assert_eq!(tag.css(), ".x{}\n.c{}\n");
    }
}
