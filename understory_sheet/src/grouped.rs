// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Group ranges over a single [`Tag`].
//!
//! Every group owns one contiguous run of slots, and runs are laid out in
//! ascending group order. Inserting into a group grows its run in place, which
//! shifts every later run. A later-registered component therefore never
//! appears before an earlier one, whatever order they render in.
//!
//! Within a run, live rules come first and placeholders left behind by
//! [`GroupedTag::clear_group`] follow. New rules fill placeholders before the
//! run grows.
//!
//! Mutations only touch the tag. Text containers are rewritten by
//! [`GroupedTag::flush`], which needs the identity of each group to write the
//! [`markers`](crate::markers) encoding.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{InsertOutcome, RejectedRule, RuleError};
use crate::markers::{GroupBlock, encode_blocks};
use crate::options::{GROUP_MARKER_PREFIX, InsertMode};
use crate::registry::GroupId;
use crate::tag::Tag;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
struct Range {
    /// Slots owned, placeholders included.
    slots: usize,
    /// Live rules, always the first `live` slots.
    live: usize,
}

/// A [`Tag`] partitioned into per-group ranges.
#[derive(Debug)]
pub struct GroupedTag {
    tag: Box<dyn Tag>,
    ranges: Vec<Range>,
}

impl GroupedTag {
    /// Wraps `tag`, which must be empty.
    #[must_use]
    pub fn new(tag: Box<dyn Tag>) -> Self {
        debug_assert!(tag.is_empty(), "grouped tags start from an empty tag");
        Self {
            tag,
            ranges: Vec::new(),
        }
    }

    /// Returns the underlying tag.
    #[must_use]
    pub fn tag(&self) -> &dyn Tag {
        &*self.tag
    }

    /// How the underlying tag writes into its medium.
    #[must_use]
    pub fn mode(&self) -> InsertMode {
        self.tag.mode()
    }

    /// Index of the first slot of `group`: the slots of all lower groups.
    #[must_use]
    pub fn index_of_group(&self, group: GroupId) -> usize {
        self.ranges
            .iter()
            .take(group.as_usize())
            .map(|r| r.slots)
            .sum()
    }

    /// Number of live rules in `group`.
    #[must_use]
    pub fn length(&self, group: GroupId) -> usize {
        self.range(group).live
    }

    /// Number of slots owned by `group`, placeholders included.
    #[must_use]
    pub fn slots(&self, group: GroupId) -> usize {
        self.range(group).slots
    }

    /// Number of groups with a recorded range.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.ranges.len()
    }

    fn range(&self, group: GroupId) -> Range {
        self.ranges.get(group.as_usize()).copied().unwrap_or_default()
    }

    /// Appends `rules` to the end of `group`'s live rules.
    ///
    /// Blank rules and rules the tag refuses are skipped and reported; they
    /// take no slot.
    pub fn insert_rules<I, S>(&mut self, group: GroupId, rules: I) -> InsertOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let g = group.as_usize();
        if g >= self.ranges.len() {
            self.ranges.resize_with(g + 1, Range::default);
        }
        let start = self.index_of_group(group);
        let mut outcome = InsertOutcome::default();

        for rule in rules {
            let rule = rule.as_ref();
            let range = self.ranges[g];
            let result = if rule.trim().is_empty() {
                Err(RuleError::Rejected {
                    reason: "empty rule".into(),
                })
            } else if range.live < range.slots {
                self.tag.fill_rule(start + range.live, rule)
            } else {
                self.tag.insert_rule(start + range.slots, rule).map(|()| {
                    self.ranges[g].slots += 1;
                })
            };
            match result {
                Ok(()) => {
                    self.ranges[g].live += 1;
                    outcome.inserted += 1;
                }
                Err(error) => {
                    log::warn!("skipping rule in group {}: {error}", group.as_u32());
                    outcome.rejected.push(RejectedRule {
                        rule: rule.into(),
                        error,
                    });
                }
            }
        }

        log::trace!(
            "group {} now holds {} rules at {start}",
            group.as_u32(),
            self.ranges[g].live
        );
        self.debug_check();
        outcome
    }

    /// Removes every live rule of `group`.
    ///
    /// Slots stay allocated as placeholders, so other groups keep their
    /// indices. Clearing an unknown group is a no-op.
    pub fn clear_group(&mut self, group: GroupId) {
        let Some(range) = self.ranges.get(group.as_usize()).copied() else {
            return;
        };
        let start = self.index_of_group(group);
        for index in start..start + range.live {
            self.tag.delete_rule(index);
        }
        self.ranges[group.as_usize()].live = 0;
        self.debug_check();
    }

    /// Live rules of `group`, in order.
    #[must_use]
    pub fn group_rules(&self, group: GroupId) -> Vec<String> {
        let start = self.index_of_group(group);
        (start..start + self.length(group))
            .map(|i| self.tag.rule(i))
            .collect()
    }

    /// Text of `group`'s live rules, one per line.
    #[must_use]
    pub fn group_css(&self, group: GroupId) -> String {
        let mut out = String::new();
        for rule in self.group_rules(group) {
            out.push_str(&rule);
            out.push('\n');
        }
        out
    }

    /// Text of every live rule, in slot order.
    #[must_use]
    pub fn css(&self) -> String {
        self.tag.css()
    }

    /// One block per group in `groups` that holds live rules.
    ///
    /// `groups` pairs each group with its identity in ascending group order,
    /// as [`Registry::groups`](crate::Registry::groups) returns them.
    #[must_use]
    pub fn blocks(&self, groups: &[(GroupId, String)]) -> Vec<GroupBlock> {
        groups
            .iter()
            .filter_map(|(group, id)| {
                let rules = self.group_rules(*group);
                (!rules.is_empty()).then(|| GroupBlock::new(id.as_str(), rules))
            })
            .collect()
    }

    /// Rewrites a stale text container with the marker encoding of `groups`.
    pub fn flush(&mut self, groups: &[(GroupId, String)]) {
        if self.tag.is_dirty() {
            let text = encode_blocks(GROUP_MARKER_PREFIX, &self.blocks(groups));
            self.tag.flush(&text);
        }
    }

    /// Writes the value `names` builds into the container's `attr`
    /// attribute. Tags without a container never call `names`.
    pub fn write_names(&mut self, attr: &str, names: impl FnOnce() -> String) {
        if let Some(element) = self.tag.element_mut() {
            element.set_attribute(attr, &names());
        }
    }

    fn debug_check(&self) {
        debug_assert_eq!(
            self.ranges.iter().map(|r| r.slots).sum::<usize>(),
            self.tag.len(),
            "group ranges must tile the tag exactly"
        );
        debug_assert!(
            self.ranges.iter().all(|r| r.live <= r.slots),
            "a group cannot have more live rules than slots"
        );
    }
}
