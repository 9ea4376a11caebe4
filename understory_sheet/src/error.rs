// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error and diagnostic types.

use alloc::string::String;
use alloc::vec::Vec;

/// A single rule could not be stored.
///
/// Rule errors are never fatal: the rule is skipped and every other rule keeps
/// its slot.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// The style medium refused the rule text (typically malformed CSS).
    #[error("rule rejected by style medium: {reason}")]
    Rejected {
        /// Medium-provided reason.
        reason: String,
    },
    /// The target index lies past the end of the tag.
    #[error("rule index {index} is out of bounds for a tag of length {len}")]
    OutOfBounds {
        /// Requested index.
        index: usize,
        /// Length of the tag at the time of the call.
        len: usize,
    },
}

/// Previously rendered markup could not be read back.
///
/// Rehydration treats a container that fails with one of these as absent.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RehydrateError {
    /// The container has no marker attribute.
    #[error("style container is missing the `{0}` attribute")]
    MissingAttribute(String),
    /// A marker comment was opened but never closed.
    #[error("unterminated comment starting at byte {offset}")]
    UnterminatedComment {
        /// Byte offset of the opening `/*`.
        offset: usize,
    },
    /// Rule text appeared before the first group marker.
    #[error("rule text at byte {offset} does not belong to any group")]
    OrphanRule {
        /// Byte offset of the rule.
        offset: usize,
    },
    /// A group marker names no identity.
    #[error("group marker at byte {offset} has an empty identity")]
    EmptyIdentity {
        /// Byte offset of the marker.
        offset: usize,
    },
    /// A rule's braces never balance.
    #[error("unbalanced braces in a rule of group `{id}`")]
    UnbalancedBraces {
        /// Identity of the group being parsed.
        id: String,
    },
}

/// A rule that was skipped during insertion, with the reason.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedRule {
    /// The rule text as passed in.
    pub rule: String,
    /// Why it was skipped.
    pub error: RuleError,
}

/// Result of inserting a batch of rules into a group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct InsertOutcome {
    /// Number of rules that were stored.
    pub inserted: usize,
    /// Rules that were skipped.
    pub rejected: Vec<RejectedRule>,
}

impl InsertOutcome {
    /// Returns `true` if every rule was stored.
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Folds another outcome into this one.
    pub fn merge(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.rejected.extend(other.rejected);
    }
}
