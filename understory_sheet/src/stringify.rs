// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Turning flattened CSS text into final rules.
//!
//! The sheet treats stringification as a black box behind [`Stringifier`].
//! [`BasicStringifier`] covers what component styles need day to day:
//! top-level declarations, `&` and descendant nesting, comma-separated
//! selectors, conditional group at-rules and keyframes. Vendor prefixing and
//! full CSS parsing are left to richer implementations.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use smallvec::SmallVec;

/// Converts raw CSS text scoped to `selector` into insertable rules.
///
/// `group_id` is the component identity the rules are generated for, when
/// there is one.
pub trait Stringifier {
    /// Produces final rule strings.
    fn stringify(&self, css: &str, selector: &str, group_id: Option<&str>) -> Vec<String>;
}

impl<F> Stringifier for F
where
    F: Fn(&str, &str, Option<&str>) -> Vec<String>,
{
    fn stringify(&self, css: &str, selector: &str, group_id: Option<&str>) -> Vec<String> {
        self(css, selector, group_id)
    }
}

/// A small nesting-aware stringifier.
///
/// ```rust
/// use understory_sheet::{BasicStringifier, Stringifier};
///
/// let rules = BasicStringifier.stringify(
///     "color: red; &:hover { color: blue; } @media (min-width: 40em) { padding: 0 1em; }",
///     ".abc",
///     None,
/// );
/// assert_eq!(
///     rules,
///     [
///         ".abc{color:red;}",
///         ".abc:hover{color:blue;}",
///         "@media (min-width: 40em){.abc{padding:0 1em;}}",
///     ]
/// );
/// ```
#[derive(Copy, Clone, Debug, Default)]
pub struct BasicStringifier;

impl Stringifier for BasicStringifier {
    fn stringify(&self, css: &str, selector: &str, _group_id: Option<&str>) -> Vec<String> {
        let css = strip_comments(css);
        let selector = selector.trim();
        if selector.starts_with("@keyframes") || selector.starts_with("@-webkit-keyframes") {
            return Vec::from([format!("{selector}{{{}}}", compact_keyframes(&css))]);
        }
        let mut out = Vec::new();
        emit(&css, selector, &mut out);
        out
    }
}

enum Item<'a> {
    Declaration(&'a str),
    Block { prelude: &'a str, body: &'a str },
}

fn emit(css: &str, selector: &str, out: &mut Vec<String>) {
    let items = parse_items(css);

    let mut declarations = String::new();
    for item in &items {
        if let Item::Declaration(decl) = item {
            declarations.push_str(&normalize_declaration(decl));
        }
    }
    if !declarations.is_empty() {
        if selector.is_empty() {
            log::debug!("dropping declarations without a selector: {declarations}");
        } else {
            out.push(format!("{selector}{{{declarations}}}"));
        }
    }

    for item in items {
        let Item::Block { prelude, body } = item else {
            continue;
        };
        if is_conditional_group(prelude) {
            let mut inner = Vec::new();
            emit(body, selector, &mut inner);
            if !inner.is_empty() {
                out.push(format!("{prelude}{{{}}}", inner.concat()));
            }
        } else if prelude.starts_with("@keyframes") || prelude.starts_with("@-webkit-keyframes") {
            out.push(format!("{prelude}{{{}}}", compact_keyframes(body)));
        } else if prelude.starts_with('@') {
            out.push(format!("{prelude}{{{}}}", compact_declarations(body)));
        } else {
            let nested = nest_selector(selector, prelude);
            emit(body, &nested, out);
        }
    }
}

fn is_conditional_group(prelude: &str) -> bool {
    ["@media", "@supports", "@container", "@layer", "@document"]
        .iter()
        .any(|at| prelude.starts_with(*at))
}

/// Resolves a nested selector list against its parent.
fn nest_selector(parent: &str, nested: &str) -> String {
    let parents: SmallVec<[&str; 4]> = parent
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let mut parts: SmallVec<[String; 4]> = SmallVec::new();
    for child in nested.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if parents.is_empty() {
            parts.push(child.replace('&', ""));
            continue;
        }
        for p in &parents {
            if child.contains('&') {
                parts.push(child.replace('&', p));
            } else {
                parts.push(format!("{p} {child}"));
            }
        }
    }
    parts.join(",")
}

fn parse_items(css: &str) -> Vec<Item<'_>> {
    let bytes = css.as_bytes();
    let mut items = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let mut quote: Option<u8> = None;
    let mut paren = 0_usize;

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
            b'(' => paren += 1,
            b')' => paren = paren.saturating_sub(1),
            b';' if paren == 0 => {
                push_declaration(&css[start..i], &mut items);
                start = i + 1;
            }
            b'{' if paren == 0 => {
                let close = matching_brace(bytes, i).unwrap_or(bytes.len());
                let prelude = css[start..i].trim();
                let body = &css[i + 1..close.min(bytes.len())];
                if !prelude.is_empty() {
                    items.push(Item::Block { prelude, body });
                }
                i = close + 1;
                start = i;
                continue;
            }
            b'}' if paren == 0 => {
                // Stray closer from a broken interpolation; drop what came before.
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < bytes.len() {
        push_declaration(&css[start..], &mut items);
    }
    items
}

fn push_declaration<'a>(raw: &'a str, items: &mut Vec<Item<'a>>) {
    let decl = raw.trim();
    if decl.contains(':') {
        items.push(Item::Declaration(decl));
    }
}

fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0_usize;
    let mut quote: Option<u8> = None;
    let mut i = open;
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
        } else {
            match b {
                b'"' | b'\'' => quote = Some(b),
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

fn normalize_declaration(decl: &str) -> String {
    match decl.split_once(':') {
        Some((prop, value)) => format!("{}:{};", prop.trim(), value.trim()),
        None => String::new(),
    }
}

fn compact_declarations(body: &str) -> String {
    parse_items(body)
        .into_iter()
        .filter_map(|item| match item {
            Item::Declaration(decl) => Some(normalize_declaration(decl)),
            Item::Block { .. } => None,
        })
        .collect()
}

fn compact_keyframes(body: &str) -> String {
    parse_items(body)
        .into_iter()
        .filter_map(|item| match item {
            Item::Block { prelude, body } => {
                Some(format!("{prelude}{{{}}}", compact_declarations(body)))
            }
            Item::Declaration(_) => None,
        })
        .collect()
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(open) = rest.find("/*") {
        out.push_str(&rest[..open]);
        match rest[open + 2..].find("*/") {
            Some(close) => rest = &rest[open + 2 + close + 2..],
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
