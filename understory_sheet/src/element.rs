// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The live style container capability.
//!
//! A [`StyleElement`] is whatever the host renders styles into: a `<style>`
//! element in a browser, or a [`MemoryElement`] in headless hosts and tests.
//! Tags own their element exclusively.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::error::RuleError;

/// A style container that rules can be written into.
pub trait StyleElement: Debug {
    /// Returns the value of an attribute.
    fn attribute(&self, name: &str) -> Option<String>;

    /// Sets an attribute.
    fn set_attribute(&mut self, name: &str, value: &str);

    /// Returns the container's text content.
    fn text_content(&self) -> String;

    /// Replaces the container's text content.
    fn set_text_content(&mut self, text: &str);

    /// Returns `true` if the per-rule API below is available.
    fn supports_cssom(&self) -> bool;

    /// Inserts a parsed rule at `index` in the container's rule list.
    fn insert_rule(&mut self, rule: &str, index: usize) -> Result<(), RuleError>;

    /// Removes the rule at `index` from the container's rule list.
    fn delete_rule(&mut self, index: usize);

    /// Returns the serialized text of the rule at `index`.
    fn rule_text(&self, index: usize) -> Option<String>;

    /// Returns the number of rules in the container's rule list.
    fn rule_count(&self) -> usize;

    /// Detaches the container from its document.
    fn remove(&mut self);
}

/// Checks that `rule` looks like a single complete CSS rule.
///
/// This is deliberately shallow: it catches the broken output of a bad
/// interpolation (empty text, a missing block, stray braces) the way a
/// browser's rule parser would reject it.
pub fn validate_rule(rule: &str) -> Result<(), RuleError> {
    let trimmed = rule.trim();
    if trimmed.is_empty() {
        return Err(RuleError::Rejected {
            reason: "empty rule".to_string(),
        });
    }
    let Some(open) = trimmed.find('{') else {
        return Err(RuleError::Rejected {
            reason: "rule has no block".to_string(),
        });
    };
    if open == 0 {
        return Err(RuleError::Rejected {
            reason: "rule has no prelude".to_string(),
        });
    }
    let mut depth = 0_i32;
    for c in trimmed.chars() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    break;
                }
            }
            _ => {}
        }
    }
    if depth != 0 || !trimmed.ends_with('}') {
        return Err(RuleError::Rejected {
            reason: "unbalanced braces".to_string(),
        });
    }
    Ok(())
}

/// An in-memory style container.
///
/// Behaves like a detached `<style>` element: it has attributes, text content
/// and (unless built with [`MemoryElement::text_only`]) a rule list that
/// rejects malformed rules.
///
/// ```rust
/// use understory_sheet::{MemoryElement, StyleElement};
///
/// let mut el = MemoryElement::new();
/// assert!(el.insert_rule(".a{color:red;}", 0).is_ok());
/// assert!(el.insert_rule("color:red;", 1).is_err());
/// assert_eq!(el.rule_count(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryElement {
    attributes: Vec<(String, String)>,
    text: String,
    rules: Vec<String>,
    text_only: bool,
    removed: bool,
}

impl MemoryElement {
    /// Creates an empty container with a rule list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty container without a rule list.
    #[must_use]
    pub fn text_only() -> Self {
        Self {
            text_only: true,
            ..Self::default()
        }
    }

    /// Creates a container holding `text`, with the given attributes.
    #[must_use]
    pub fn with_content<'a>(
        attributes: impl IntoIterator<Item = (&'a str, &'a str)>,
        text: &str,
    ) -> Self {
        Self {
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            text: text.to_string(),
            ..Self::default()
        }
    }

    /// Returns all attributes in insertion order.
    #[must_use]
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Returns the current rule list.
    #[must_use]
    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    /// Returns `true` once [`StyleElement::remove`] has been called.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.removed
    }
}

impl StyleElement for MemoryElement {
    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        if let Some(slot) = self.attributes.iter_mut().find(|(k, _)| k == name) {
            slot.1 = value.to_string();
        } else {
            self.attributes.push((name.to_string(), value.to_string()));
        }
    }

    fn text_content(&self) -> String {
        self.text.clone()
    }

    fn set_text_content(&mut self, text: &str) {
        // Replacing the text re-parses the sheet, dropping inserted rules.
        self.text = text.to_string();
        self.rules.clear();
    }

    fn supports_cssom(&self) -> bool {
        !self.text_only
    }

    fn insert_rule(&mut self, rule: &str, index: usize) -> Result<(), RuleError> {
        if self.text_only {
            return Err(RuleError::Rejected {
                reason: "container has no rule list".to_string(),
            });
        }
        if index > self.rules.len() {
            return Err(RuleError::OutOfBounds {
                index,
                len: self.rules.len(),
            });
        }
        validate_rule(rule)?;
        self.rules.insert(index, rule.trim().to_string());
        Ok(())
    }

    fn delete_rule(&mut self, index: usize) {
        if index < self.rules.len() {
            self.rules.remove(index);
        }
    }

    fn rule_text(&self, index: usize) -> Option<String> {
        self.rules.get(index).cloned()
    }

    fn rule_count(&self) -> usize {
        self.rules.len()
    }

    fn remove(&mut self) {
        self.removed = true;
    }
}
