// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rule sets and flattening.
//!
//! A [`RuleSet`] is the parsed form of an authored style: a list of
//! [`Interpolation`] chunks, some of which depend on a render context `C`
//! (props, theme). [`flatten`] resolves a rule set against a context into a
//! flat list of CSS fragments, ready to be hashed and stringified.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::hash::{hash, name_from_hash};
use crate::sheet::Sheet;
use crate::stringify::Stringifier;

/// A context-dependent chunk.
pub type DynamicFn<C> = Arc<dyn Fn(&C) -> Interpolation<C> + Send + Sync>;

/// One chunk of an authored rule set.
pub enum Interpolation<C> {
    /// Literal CSS text.
    Css(String),
    /// A nested rule set, flattened in place.
    Rules(RuleSet<C>),
    /// A function of the render context.
    Dynamic(DynamicFn<C>),
    /// A reference to another component, rendered as its class selector.
    Component(String),
    /// Object-style declarations; `camelCase` properties are hyphenated.
    Declarations(Vec<(String, String)>),
    /// Keyframes, injected on use and rendered as their name.
    Keyframes(Keyframes),
    /// Renders nothing.
    Empty,
}

impl<C> Clone for Interpolation<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Css(css) => Self::Css(css.clone()),
            Self::Rules(rules) => Self::Rules(rules.clone()),
            Self::Dynamic(f) => Self::Dynamic(Arc::clone(f)),
            Self::Component(id) => Self::Component(id.clone()),
            Self::Declarations(decls) => Self::Declarations(decls.clone()),
            Self::Keyframes(k) => Self::Keyframes(k.clone()),
            Self::Empty => Self::Empty,
        }
    }
}

impl<C> fmt::Debug for Interpolation<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(css) => f.debug_tuple("Css").field(css).finish(),
            Self::Rules(rules) => f.debug_tuple("Rules").field(rules).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
            Self::Component(id) => f.debug_tuple("Component").field(id).finish(),
            Self::Declarations(decls) => f.debug_tuple("Declarations").field(decls).finish(),
            Self::Keyframes(k) => f.debug_tuple("Keyframes").field(k).finish(),
            Self::Empty => f.write_str("Empty"),
        }
    }
}

impl<C> From<&str> for Interpolation<C> {
    fn from(css: &str) -> Self {
        Self::Css(css.to_string())
    }
}

impl<C> From<String> for Interpolation<C> {
    fn from(css: String) -> Self {
        Self::Css(css)
    }
}

impl<C> From<RuleSet<C>> for Interpolation<C> {
    fn from(rules: RuleSet<C>) -> Self {
        Self::Rules(rules)
    }
}

impl<C> From<Keyframes> for Interpolation<C> {
    fn from(keyframes: Keyframes) -> Self {
        Self::Keyframes(keyframes)
    }
}

impl<C, T: Into<Self>> From<Option<T>> for Interpolation<C> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

/// An ordered list of [`Interpolation`]s.
///
/// ```rust
/// use understory_sheet::RuleSet;
///
/// struct Props {
///     primary: bool,
/// }
///
/// let rules = RuleSet::<Props>::new()
///     .css("padding: 4px;")
///     .dynamic(|p| if p.primary { "color: white;".into() } else { "color: black;".into() });
/// assert!(!rules.is_static());
/// ```
pub struct RuleSet<C> {
    chunks: Vec<Interpolation<C>>,
}

impl<C> Clone for RuleSet<C> {
    fn clone(&self) -> Self {
        Self {
            chunks: self.chunks.clone(),
        }
    }
}

impl<C> fmt::Debug for RuleSet<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.chunks).finish()
    }
}

impl<C> Default for RuleSet<C> {
    fn default() -> Self {
        Self { chunks: Vec::new() }
    }
}

impl<C> FromIterator<Interpolation<C>> for RuleSet<C> {
    fn from_iter<I: IntoIterator<Item = Interpolation<C>>>(iter: I) -> Self {
        Self {
            chunks: iter.into_iter().collect(),
        }
    }
}

impl<C> RuleSet<C> {
    /// Creates an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends any chunk.
    #[must_use]
    pub fn push(mut self, chunk: impl Into<Interpolation<C>>) -> Self {
        self.chunks.push(chunk.into());
        self
    }

    /// Appends literal CSS.
    #[must_use]
    pub fn css(self, css: impl Into<String>) -> Self {
        self.push(Interpolation::Css(css.into()))
    }

    /// Appends a function of the render context.
    #[must_use]
    pub fn dynamic(
        mut self,
        f: impl Fn(&C) -> Interpolation<C> + Send + Sync + 'static,
    ) -> Self {
        self.chunks.push(Interpolation::Dynamic(Arc::new(f)));
        self
    }

    /// Appends a reference to another component's class.
    #[must_use]
    pub fn component(self, component_id: impl Into<String>) -> Self {
        self.push(Interpolation::Component(component_id.into()))
    }

    /// Appends object-style declarations.
    #[must_use]
    pub fn declarations<K, V>(self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.push(Interpolation::Declarations(
            pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        ))
    }

    /// Returns the chunks.
    #[must_use]
    pub fn chunks(&self) -> &[Interpolation<C>] {
        &self.chunks
    }

    /// Returns `true` if nothing in the set depends on the render context.
    ///
    /// Component references are static: they only contribute a class name.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.chunks.iter().all(|chunk| match chunk {
            Interpolation::Dynamic(_) => false,
            Interpolation::Rules(rules) => rules.is_static(),
            _ => true,
        })
    }
}

/// A named `@keyframes` block.
///
/// The name is derived from the body, so identical animations share one rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keyframes {
    name: String,
    body: String,
}

impl Keyframes {
    /// Creates keyframes from their body, e.g. `from { opacity: 0; } to { opacity: 1; }`.
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        let body = body.into();
        let name = name_from_hash(hash(&body));
        Self { name, body }
    }

    /// Returns the generated animation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity under which the keyframes are stored in a sheet.
    #[must_use]
    pub fn id(&self) -> String {
        format!("sc-keyframes-{}", self.name)
    }

    /// Inserts the keyframes into `sheet` unless it already has them.
    pub fn inject(&self, sheet: &mut Sheet, stringifier: &dyn Stringifier) {
        let id = self.id();
        if sheet.has_name_for_id(&id, &self.name) {
            return;
        }
        let rules = stringifier.stringify(&self.body, &format!("@keyframes {}", self.name), None);
        let outcome = sheet.insert_rules(&id, &self.name, rules);
        if !outcome.is_complete() {
            log::warn!("keyframes `{}` were only partially injected", self.name);
        }
    }
}

fn hyphenate(property: &str) -> String {
    let mut out = String::with_capacity(property.len() + 4);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    if out.starts_with("ms-") {
        out.insert(0, '-');
    }
    out
}

fn declarations_to_css(pairs: &[(String, String)]) -> String {
    let mut out = String::new();
    for (property, value) in pairs {
        if value.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&format!("{}: {};", hyphenate(property), value));
    }
    out
}

/// Resolves `rules` into flat CSS fragments.
///
/// Dynamic chunks are evaluated against `context`; without one they are
/// dropped. Keyframes are injected into `sheet` when given.
pub fn flatten<C>(
    rules: &RuleSet<C>,
    context: Option<&C>,
    mut sheet: Option<&mut Sheet>,
    stringifier: &dyn Stringifier,
) -> Vec<String> {
    let mut out = Vec::new();
    for chunk in &rules.chunks {
        flatten_chunk(chunk, context, sheet.as_deref_mut(), stringifier, &mut out);
    }
    out
}

fn flatten_chunk<C>(
    chunk: &Interpolation<C>,
    context: Option<&C>,
    sheet: Option<&mut Sheet>,
    stringifier: &dyn Stringifier,
    out: &mut Vec<String>,
) {
    match chunk {
        Interpolation::Css(css) => {
            if !css.is_empty() {
                out.push(css.clone());
            }
        }
        Interpolation::Rules(nested) => out.extend(flatten(nested, context, sheet, stringifier)),
        Interpolation::Dynamic(f) => match context {
            Some(cx) => flatten_chunk(&f(cx), context, sheet, stringifier, out),
            None => log::debug!("dropping a dynamic interpolation flattened without context"),
        },
        Interpolation::Component(id) => out.push(format!(".{id}")),
        Interpolation::Declarations(pairs) => {
            let css = declarations_to_css(pairs);
            if !css.is_empty() {
                out.push(css);
            }
        }
        Interpolation::Keyframes(keyframes) => {
            if let Some(sheet) = sheet {
                keyframes.inject(sheet, stringifier);
            }
            out.push(keyframes.name().to_string());
        }
        Interpolation::Empty => {}
    }
}
