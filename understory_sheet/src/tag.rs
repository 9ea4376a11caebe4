// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tag trait: indexed, append-only rule storage.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::element::StyleElement;
use crate::error::RuleError;
use crate::options::{InsertMode, SheetOptions};
use crate::tags::{CssomTag, TextTag, VirtualTag};

/// Ordered rule storage addressed by index.
///
/// Indices are never reclaimed: [`Tag::delete_rule`] leaves an empty
/// placeholder, so `len()` counts every slot ever allocated.
pub trait Tag: Debug {
    /// Inserts `rule` at `index`, shifting later slots up by one.
    fn insert_rule(&mut self, index: usize, rule: &str) -> Result<(), RuleError>;

    /// Writes `rule` into the placeholder at `index`.
    ///
    /// Calling this on a slot that still holds a rule is a contract violation.
    fn fill_rule(&mut self, index: usize, rule: &str) -> Result<(), RuleError>;

    /// Replaces the rule at `index` with a placeholder.
    fn delete_rule(&mut self, index: usize);

    /// Number of slots, placeholders included.
    fn len(&self) -> usize;

    /// Returns `true` if no slot was ever allocated.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the rule text at `index`; empty for placeholders and past the end.
    fn rule(&self, index: usize) -> String;

    /// Returns `true` if the container text no longer matches the rules.
    fn is_dirty(&self) -> bool {
        false
    }

    /// Writes `text`, the marker encoding of every group, as the container
    /// text. Backends that store rules individually ignore it.
    fn flush(&mut self, _text: &str) {}

    /// The container this tag writes into, if any.
    fn element_mut(&mut self) -> Option<&mut dyn StyleElement> {
        None
    }

    /// How this tag writes into its medium.
    fn mode(&self) -> InsertMode;

    /// All non-placeholder rules, one per line.
    fn css(&self) -> String {
        let mut out = String::new();
        for index in 0..self.len() {
            let rule = self.rule(index);
            if !rule.is_empty() {
                out.push_str(&rule);
                out.push('\n');
            }
        }
        out
    }
}

/// Builds the tag backend selected by `options`.
///
/// Server sheets, and sheets without a target container, store rules in
/// memory. Otherwise the per-rule fast path is used when enabled and
/// supported by the container, with full text rewrites as the fallback.
pub fn make_tag(options: &SheetOptions, target: Option<Box<dyn StyleElement>>) -> Box<dyn Tag> {
    match target {
        Some(element) if !options.is_server => {
            if options.use_cssom && element.supports_cssom() {
                Box::new(CssomTag::new(element, options))
            } else {
                Box::new(TextTag::new(element, options))
            }
        }
        _ => Box::new(VirtualTag::new()),
    }
}

#[cfg(test)]
pub(crate) fn rules_of(tag: &dyn Tag) -> Vec<String> {
    (0..tag.len()).map(|i| tag.rule(i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::MemoryElement;

    #[test]
    fn backend_selection_follows_options() {
        let client = SheetOptions::default();
        let server = SheetOptions::server();
        let text = SheetOptions::default().with_cssom(false);

        assert_eq!(make_tag(&client, Some(Box::new(MemoryElement::new()))).mode(), InsertMode::Cssom);
        assert_eq!(make_tag(&text, Some(Box::new(MemoryElement::new()))).mode(), InsertMode::Text);
        assert_eq!(
            make_tag(&client, Some(Box::new(MemoryElement::text_only()))).mode(),
            InsertMode::Text
        );
        // In-memory tags report text mode: their output is plain text.
        assert_eq!(make_tag(&server, Some(Box::new(MemoryElement::new()))).mode(), InsertMode::Text);
        assert_eq!(make_tag(&client, None).mode(), InsertMode::Text);
    }

    #[test]
    fn every_backend_keeps_indices_stable() {
        let options = SheetOptions::default();
        let backends: [Box<dyn Tag>; 3] = [
            make_tag(&options, None),
            make_tag(&options, Some(Box::new(MemoryElement::new()))),
            make_tag(&options.clone().with_cssom(false), Some(Box::new(MemoryElement::new()))),
        ];
        for mut tag in backends {
            tag.insert_rule(0, ".b{}").unwrap();
            tag.insert_rule(0, ".a{}").unwrap();
            tag.insert_rule(2, ".c{}").unwrap();
            tag.delete_rule(1);
            let text = tag.css();
            tag.flush(&text);
            assert_eq!(tag.len(), 3, "{tag:?}");
            assert_eq!(rules_of(&*tag), [".a{}", "", ".c{}"], "{tag:?}");
            assert_eq!(tag.css(), ".a{}\n.c{}\n", "{tag:?}");

            tag.fill_rule(1, ".b2{}").unwrap();
            let text = tag.css();
            tag.flush(&text);
            assert_eq!(rules_of(&*tag), [".a{}", ".b2{}", ".c{}"], "{tag:?}");
            assert!(tag.insert_rule(9, ".z{}").is_err(), "{tag:?}");
        }
    }
}
