// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recovering sheet state from earlier output, and producing that output.
//!
//! Server output is one `<style>` container per response whose text is the
//! [`markers`](crate::markers) encoding of the sheet and whose attributes
//! carry the injected names. Rehydration reads such containers back into a
//! client sheet so nothing rendered on the server is injected twice.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::element::{MemoryElement, StyleElement};
use crate::error::RehydrateError;
use crate::markers::{GroupBlock, decode_blocks, decode_names, encode_blocks, encode_names};
use crate::options::{GROUP_MARKER_PREFIX, InsertMode, SheetOptions, VERSION};
use crate::sheet::Sheet;

/// What a readable container holds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContainerContents {
    /// Group blocks in document order.
    pub blocks: Vec<GroupBlock>,
    /// Names listed in the marker attribute.
    pub names: Vec<String>,
}

/// Counters describing one rehydration pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RehydrateSummary {
    /// Containers that were read.
    pub containers: usize,
    /// Containers left untouched: unreadable, or written through the rule API.
    pub skipped: usize,
    /// Group blocks replayed.
    pub groups: usize,
    /// Rules replayed.
    pub rules: usize,
    /// Names recovered.
    pub names: usize,
    /// Whether a container became the sheet's medium.
    pub adopted: bool,
}

/// Reads a marker-tagged container.
///
/// Returns `Ok(None)` for containers written through the rule API: their
/// text does not reflect their rules, so there is nothing to read.
pub fn read_container(
    element: &dyn StyleElement,
    options: &SheetOptions,
) -> Result<Option<ContainerContents>, RehydrateError> {
    let names = element
        .attribute(&options.attr)
        .ok_or_else(|| RehydrateError::MissingAttribute(options.attr.clone()))?;

    if let Some(mode) = element.attribute(&options.mode_attr()) {
        match mode.parse::<InsertMode>() {
            Ok(InsertMode::Cssom) => return Ok(None),
            Ok(InsertMode::Text) => {}
            Err(err) => log::warn!("{err}; reading the container as text"),
        }
    }
    if let Some(version) = element.attribute(&options.version_attr())
        && version != VERSION
    {
        log::debug!("rehydrating a container written by version {version}");
    }

    let blocks = decode_blocks(GROUP_MARKER_PREFIX, &element.text_content())?;
    Ok(Some(ContainerContents {
        blocks,
        names: decode_names(&names),
    }))
}

/// Replays `containers` into `sheet`.
///
/// Unreadable containers are skipped and left in place, so their styles keep
/// applying and the sheet simply starts cold for them. The first readable
/// container becomes the sheet's medium when the sheet has none yet; every
/// other readable container is removed once its rules are replayed.
pub fn rehydrate(sheet: &mut Sheet, containers: Vec<Box<dyn StyleElement>>) -> RehydrateSummary {
    let mut summary = RehydrateSummary::default();
    let mut readable = Vec::new();

    for element in containers {
        match read_container(&*element, sheet.options()) {
            Ok(Some(contents)) => readable.push((element, contents)),
            Ok(None) => {
                log::debug!("leaving a rule-API container alone");
                summary.skipped += 1;
            }
            Err(err) => {
                log::warn!("ignoring unreadable style container: {err}");
                summary.skipped += 1;
            }
        }
    }

    let mut contents = Vec::with_capacity(readable.len());
    for (mut element, read) in readable {
        if !summary.adopted && sheet.can_adopt() {
            element.set_text_content("");
            sheet.set_target(element);
            summary.adopted = true;
        } else {
            element.remove();
        }
        summary.containers += 1;
        contents.push(read);
    }

    let mut position = 0_u32;
    for read in &contents {
        for block in &read.blocks {
            let group = sheet.registry().adopt_group(&block.id, position);
            position = position.saturating_add(1);
            let outcome = sheet.get_tag().insert_rules(group, &block.rules);
            sheet.mark_deferred_injected(&block.id);
            summary.groups += 1;
            summary.rules += outcome.inserted;
        }
    }

    for read in &contents {
        for name in &read.names {
            match owner_of(name, &contents) {
                Some(id) => sheet.register_name(id, name),
                None => sheet.register_unowned_name(name),
            }
            summary.names += 1;
        }
    }

    sheet.sync_container();
    log::debug!("rehydrated {summary:?}");
    summary
}

/// The identity whose rules use `name` as a class or an animation name.
fn owner_of<'a>(name: &str, contents: &'a [ContainerContents]) -> Option<&'a str> {
    let class = format!(".{name}");
    let animation = format!("keyframes {name}");
    contents
        .iter()
        .flat_map(|c| &c.blocks)
        .find(|block| {
            block.id == name
                || block
                    .rules
                    .iter()
                    .any(|rule| mentions(rule, &class) || mentions(rule, &animation))
        })
        .map(|block| block.id.as_str())
}

/// Returns `true` if `needle` occurs in `rule` as a whole identifier.
fn mentions(rule: &str, needle: &str) -> bool {
    rule.match_indices(needle).any(|(at, _)| {
        !rule[at + needle.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

/// Serializes `sheet` in the marker format.
///
/// Groups are written in group order; groups without live rules are left out.
#[must_use]
pub fn output_sheet(sheet: &Sheet) -> String {
    let Some(tag) = sheet.tag() else {
        return String::new();
    };
    encode_blocks(GROUP_MARKER_PREFIX, &tag.blocks(&sheet.registry().groups()))
}

/// Renders `sheet` as a `<style>` element.
#[must_use]
pub fn style_tag(sheet: &Sheet) -> String {
    let options = sheet.options();
    let mut out = format!(
        "<style {}=\"{}\" {}=\"{}\" {}=\"{}\"",
        options.attr,
        escape_attribute(&encode_names(sheet.names())),
        options.version_attr(),
        VERSION,
        options.mode_attr(),
        InsertMode::Text,
    );
    if let Some(nonce) = &options.nonce {
        out.push_str(&format!(" nonce=\"{}\"", escape_attribute(nonce)));
    }
    out.push('>');
    out.push_str(&output_sheet(sheet).replace("</", "<\\/"));
    out.push_str("</style>");
    out
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_attribute(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Finds the `<style>` elements in `html` that carry `attr`.
///
/// This is a scanner for markup this crate produced, not an HTML parser.
#[must_use]
pub fn parse_style_tags(html: &str, attr: &str) -> Vec<MemoryElement> {
    let lower = html.to_ascii_lowercase();
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(offset) = lower[pos..].find("<style") {
        let start = pos + offset + "<style".len();
        let Some(open_end) = tag_end(html, start) else {
            break;
        };
        let Some(close) = lower[open_end..].find("</style").map(|i| open_end + i) else {
            break;
        };
        let attributes = parse_attributes(&html[start..open_end - 1]);
        if attributes.iter().any(|(name, _)| name.eq_ignore_ascii_case(attr)) {
            found.push(MemoryElement::with_content(
                attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                &html[open_end..close],
            ));
        }
        pos = close + "</style".len();
    }
    found
}

/// Returns the offset just past the `>` closing a start tag.
fn tag_end(html: &str, from: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in html[from..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(from + i + 1),
            _ => {}
        }
    }
    None
}

fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut rest = raw.trim_start_matches('/').trim();
    while !rest.is_empty() {
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_string();
        rest = rest[name_end..].trim_start();
        let mut value = String::new();
        if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let (raw_value, remaining) = match after_eq.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    let end = body.find(q).unwrap_or(body.len());
                    (&body[..end], body.get(end + 1..).unwrap_or(""))
                }
                _ => {
                    let end = after_eq
                        .find(char::is_whitespace)
                        .unwrap_or(after_eq.len());
                    (&after_eq[..end], &after_eq[end..])
                }
            };
            value = unescape_attribute(raw_value);
            rest = remaining;
        }
        if !name.is_empty() {
            out.push((name, value));
        } else {
            rest = rest.get(1..).unwrap_or("");
        }
        rest = rest.trim_start_matches('/').trim_start();
    }
    out
}
