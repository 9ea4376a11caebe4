// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compatibility tag: the container's text is the source of truth.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::element::StyleElement;
use crate::error::RuleError;
use crate::options::{InsertMode, SheetOptions};
use crate::tag::Tag;

/// Tag that keeps a shadow copy of its rules and rewrites the container text.
///
/// Rewrites are batched: mutations only mark the tag dirty and the text is
/// written once per [`Tag::flush`].
#[derive(Debug)]
pub struct TextTag {
    element: Box<dyn StyleElement>,
    rules: Vec<String>,
    dirty: bool,
}

impl TextTag {
    /// Wraps `element`, marking it as a text-mode container.
    pub fn new(mut element: Box<dyn StyleElement>, options: &SheetOptions) -> Self {
        super::mark_element(&mut *element, options, InsertMode::Text);
        Self {
            element,
            rules: Vec::new(),
            dirty: false,
        }
    }

}

impl Tag for TextTag {
    fn insert_rule(&mut self, index: usize, rule: &str) -> Result<(), RuleError> {
        if index > self.rules.len() {
            return Err(RuleError::OutOfBounds {
                index,
                len: self.rules.len(),
            });
        }
        self.rules.insert(index, rule.to_string());
        self.dirty = true;
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
        self.dirty = true;
        Ok(())
    }

    fn delete_rule(&mut self, index: usize) {
        if let Some(slot) = self.rules.get_mut(index)
            && !slot.is_empty()
        {
            slot.clear();
            self.dirty = true;
        }
    }

    fn len(&self) -> usize {
        self.rules.len()
    }

    fn rule(&self, index: usize) -> String {
        self.rules.get(index).cloned().unwrap_or_default()
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn flush(&mut self, text: &str) {
        if self.dirty {
            self.element.set_text_content(text);
            self.dirty = false;
        }
    }

    fn element_mut(&mut self) -> Option<&mut dyn StyleElement> {
        Some(&mut *self.element)
    }

    fn mode(&self) -> InsertMode {
        InsertMode::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::MemoryElement;

    #[test]
    fn text_is_written_once_per_flush() {
        let mut tag = TextTag::new(Box::new(MemoryElement::text_only()), &SheetOptions::default());
        tag.insert_rule(0, ".a{}").unwrap();
        tag.insert_rule(1, ".b{}").unwrap();
        assert!(tag.is_dirty());
        tag.flush("/* sc-component-id:a */\n.a{}\n.b{}\n");
        assert!(!tag.is_dirty());
        assert_eq!(tag.css(), ".a{}\n.b{}\n");
        assert_eq!(
            tag.element_mut().map(|el| el.text_content()).as_deref(),
            Some("/* sc-component-id:a */\n.a{}\n.b{}\n")
        );

        // Deleting a placeholder twice does not dirty the tag again.
        tag.delete_rule(0);
        tag.flush("/* sc-component-id:a */\n.b{}\n");
        tag.delete_rule(0);
        assert!(!tag.is_dirty());
    }
}
