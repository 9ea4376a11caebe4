// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text encoding of sheet contents for server output and rehydration.
//!
//! A serialized sheet is a sequence of group blocks. Each block opens with a
//! comment marker naming the component identity, followed by that group's
//! rules one per line:
//!
//! ```text
//! /* sc-component-id:Button-bZz */
//! .kQmbyb{color:red;}
//! /* sc-component-id:Title-fJtQwd */
//! .jYtMnk{font-size:2em;}
//! ```
//!
//! The names already injected travel separately, as a whitespace-separated
//! attribute value. Nothing here touches a sheet or a container.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::RehydrateError;

/// One group's identity and rules.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupBlock {
    /// Component identity owning the group.
    pub id: String,
    /// Rules in slot order.
    pub rules: Vec<String>,
}

impl GroupBlock {
    /// Creates a block.
    #[must_use]
    pub fn new(id: impl Into<String>, rules: Vec<String>) -> Self {
        Self {
            id: id.into(),
            rules,
        }
    }
}

/// Serializes `blocks` with `prefix` markers.
///
/// Blocks without rules are still written so an identity's position survives.
#[must_use]
pub fn encode_blocks(prefix: &str, blocks: &[GroupBlock]) -> String {
    let mut out = String::new();
    for block in blocks {
        debug_assert!(
            !block.id.contains("*/"),
            "identity `{}` would end its marker early",
            block.id
        );
        out.push_str("/* ");
        out.push_str(prefix);
        out.push(':');
        out.push_str(&block.id);
        out.push_str(" */\n");
        for rule in &block.rules {
            out.push_str(rule.trim());
            out.push('\n');
        }
    }
    out
}

/// Parses text produced by [`encode_blocks`].
///
/// Comments that are not group markers are skipped. Rule text before the
/// first marker, unterminated comments and unbalanced braces are errors.
pub fn decode_blocks(prefix: &str, text: &str) -> Result<Vec<GroupBlock>, RehydrateError> {
    let bytes = text.as_bytes();
    let mut blocks: Vec<GroupBlock> = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos].is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        if text[pos..].starts_with("/*") {
            let end = text[pos + 2..]
                .find("*/")
                .map(|i| pos + 2 + i)
                .ok_or(RehydrateError::UnterminatedComment { offset: pos })?;
            let body = text[pos + 2..end].trim();
            if let Some(id) = body
                .strip_prefix(prefix)
                .and_then(|rest| rest.trim_start().strip_prefix(':'))
            {
                let id = id.trim();
                if id.is_empty() {
                    return Err(RehydrateError::EmptyIdentity { offset: pos });
                }
                blocks.push(GroupBlock::new(id, Vec::new()));
            }
            pos = end + 2;
            continue;
        }

        let Some(block) = blocks.last_mut() else {
            return Err(RehydrateError::OrphanRule { offset: pos });
        };
        let end = rule_end(text, pos).ok_or_else(|| RehydrateError::UnbalancedBraces {
            id: block.id.clone(),
        })?;
        block.rules.push(text[pos..end].trim().to_string());
        pos = end;
    }

    Ok(blocks)
}

/// Returns the byte offset just past the rule starting at `start`.
///
/// Braces inside quoted strings and comments do not count.
fn rule_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0_usize;
    let mut i = start;
    let mut quote: Option<u8> = None;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let close = text[i + 2..].find("*/")?;
                i += 2 + close + 2;
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            // A statement at-rule such as `@import url(x);` ends at depth zero.
            b';' if depth == 0 => return Some(i + 1),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Serializes names as a single attribute value.
#[must_use]
pub fn encode_names<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for name in names {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(name);
    }
    out
}

/// Splits an attribute value back into names, dropping the `active` marker
/// a fresh container carries.
#[must_use]
pub fn decode_names(value: &str) -> Vec<String> {
    value
        .split_whitespace()
        .filter(|name| *name != crate::options::ACTIVE_VALUE)
        .map(ToString::to_string)
        .collect()
}
