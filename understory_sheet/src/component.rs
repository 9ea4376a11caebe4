// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-definition style state for scoped components.

use alloc::format;
use alloc::string::String;
use core::fmt;
use std::sync::OnceLock;

use crate::hash::{hash_parts, name_from_hash};
use crate::registry::Registry;
use crate::rules::{RuleSet, flatten};
use crate::sheet::Sheet;
use crate::stringify::Stringifier;

/// The rule set and identity of one component definition.
///
/// Created once per definition and shared by every render of it.
///
/// ```rust
/// use understory_sheet::{BasicStringifier, ComponentStyle, Registry, RuleSet, Sheet};
///
/// struct Props {
///     wide: bool,
/// }
///
/// let registry = Registry::new();
/// let id = registry.generate_component_id("Button");
/// let rules = RuleSet::<Props>::new()
///     .css("color: red;")
///     .dynamic(|p| if p.wide { "width: 100%;".into() } else { "".into() });
/// let button = ComponentStyle::new(rules, id, &registry);
///
/// let mut sheet = Sheet::server(registry);
/// let narrow = button.generate_and_inject_styles(&Props { wide: false }, &mut sheet, &BasicStringifier);
/// let wide = button.generate_and_inject_styles(&Props { wide: true }, &mut sheet, &BasicStringifier);
/// assert_ne!(narrow, wide);
/// assert!(sheet.css().contains(&format!(".{wide}{{color:red;width:100%;}}")));
/// ```
pub struct ComponentStyle<C> {
    rules: RuleSet<C>,
    component_id: String,
    is_static: bool,
    static_name: OnceLock<String>,
    #[cfg(test)]
    flattens: core::sync::atomic::AtomicUsize,
}

impl<C> fmt::Debug for ComponentStyle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentStyle")
            .field("component_id", &self.component_id)
            .field("is_static", &self.is_static)
            .field("static_name", &self.static_name.get())
            .finish_non_exhaustive()
    }
}

impl<C> ComponentStyle<C> {
    /// Creates the style of a component and registers its identity, fixing
    /// the position of its rules in every sheet.
    pub fn new(rules: RuleSet<C>, component_id: impl Into<String>, registry: &Registry) -> Self {
        let component_id = component_id.into();
        registry.group_for_id(&component_id);
        let is_static = rules.is_static();
        Self {
            rules,
            component_id,
            is_static,
            static_name: OnceLock::new(),
            #[cfg(test)]
            flattens: core::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Returns the component identity.
    #[must_use]
    pub fn component_id(&self) -> &str {
        &self.component_id
    }

    /// Returns `true` if the rules never depend on the render context.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Returns the rule set.
    #[must_use]
    pub fn rules(&self) -> &RuleSet<C> {
        &self.rules
    }

    /// Renders the rules for `context`, injects them into `sheet` if they are
    /// new, and returns the class name.
    ///
    /// The name is a pure function of the identity and the flattened CSS, so
    /// equal output always maps to one rule block.
    pub fn generate_and_inject_styles(
        &self,
        context: &C,
        sheet: &mut Sheet,
        stringifier: &dyn Stringifier,
    ) -> String {
        if self.is_static
            && let Some(name) = self.static_name.get()
            && sheet.has_name_for_id(&self.component_id, name)
        {
            return name.clone();
        }

        #[cfg(test)]
        self.flattens
            .fetch_add(1, core::sync::atomic::Ordering::Relaxed);
        let css = flatten(&self.rules, Some(context), Some(&mut *sheet), stringifier).concat();
        let name = name_from_hash(hash_parts(&[self.component_id.as_str(), css.as_str()]));

        if !sheet.has_name_for_id(&self.component_id, &name) {
            let rules = stringifier.stringify(&css, &format!(".{name}"), Some(&self.component_id));
            let outcome = sheet.insert_rules(&self.component_id, &name, rules);
            if !outcome.is_complete() {
                log::warn!(
                    "{} of the rules for `{}` were skipped",
                    outcome.rejected.len(),
                    self.component_id
                );
            }
        }

        if self.is_static {
            let _ = self.static_name.set(name.clone());
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash;
    use crate::stringify::BasicStringifier;
    use core::sync::atomic::Ordering;

    #[test]
    fn static_styles_skip_work_after_first_injection() {
        let registry = Registry::new();
        let style = ComponentStyle::new(RuleSet::<()>::new().css("color: red;"), "sc-a", &registry);
        let mut sheet = Sheet::server(registry);

        let first = style.generate_and_inject_styles(&(), &mut sheet, &BasicStringifier);
        let second = style.generate_and_inject_styles(&(), &mut sheet, &BasicStringifier);
        assert_eq!(first, second);
        assert_eq!(style.flattens.load(Ordering::Relaxed), 1);
        assert_eq!(sheet.css(), format!(".{first}{{color:red;}}\n"));

        // A fresh sheet has not seen the name, so the rules are injected again.
        let mut other = sheet.fork();
        assert_eq!(style.generate_and_inject_styles(&(), &mut other, &BasicStringifier), first);
        assert_eq!(style.flattens.load(Ordering::Relaxed), 2);
        assert_eq!(other.css(), sheet.css());
    }

    #[test]
    fn names_hash_identity_and_css() {
        let registry = Registry::new();
        let style = ComponentStyle::new(RuleSet::<()>::new().css("top: 0;"), "sc-a", &registry);
        let mut sheet = Sheet::server(registry);
        let name = style.generate_and_inject_styles(&(), &mut sheet, &BasicStringifier);
        assert_eq!(name, name_from_hash(hash("sc-atop: 0;")));
    }

    #[test]
    fn dynamic_styles_dedupe_by_name() {
        let registry = Registry::new();
        let rules = RuleSet::<u32>::new().dynamic(|n| alloc::format!("z-index: {n};").into());
        let style = ComponentStyle::new(rules, "sc-z", &registry);
        let mut sheet = Sheet::server(registry);
        for n in [1, 2, 1, 2, 1] {
            let _ = style.generate_and_inject_styles(&n, &mut sheet, &BasicStringifier);
        }
        assert_eq!(sheet.css().lines().count(), 2);
        assert_eq!(style.flattens.load(Ordering::Relaxed), 5);
    }
}
