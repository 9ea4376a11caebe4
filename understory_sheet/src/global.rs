// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Global styles: unscoped rules owned by a mounted instance.

use alloc::format;
use alloc::string::String;
use core::fmt;

use crate::registry::Registry;
use crate::rules::{RuleSet, flatten};
use crate::sheet::Sheet;
use crate::stringify::Stringifier;

/// Unscoped rules rendered once per mounted instance.
///
/// Each instance gets its own identity, `component_id` followed by the
/// instance number, which doubles as the rule name. Removing an instance
/// clears exactly its rules.
pub struct GlobalStyle<C> {
    rules: RuleSet<C>,
    component_id: String,
    is_static: bool,
}

impl<C> fmt::Debug for GlobalStyle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalStyle")
            .field("component_id", &self.component_id)
            .field("is_static", &self.is_static)
            .finish_non_exhaustive()
    }
}

impl<C> GlobalStyle<C> {
    /// Creates a global style and registers its first instance.
    pub fn new(rules: RuleSet<C>, component_id: impl Into<String>, registry: &Registry) -> Self {
        let component_id = component_id.into();
        registry.group_for_id(&format!("{component_id}1"));
        let is_static = rules.is_static();
        Self {
            rules,
            component_id,
            is_static,
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

    /// Identity of `instance`.
    #[must_use]
    pub fn instance_id(&self, instance: u32) -> String {
        format!("{}{instance}", self.component_id)
    }

    /// Injects the rules of `instance`.
    pub fn create_styles(
        &self,
        instance: u32,
        context: &C,
        sheet: &mut Sheet,
        stringifier: &dyn Stringifier,
    ) {
        let css = flatten(&self.rules, Some(context), Some(&mut *sheet), stringifier).concat();
        let rules = stringifier.stringify(&css, "", None);
        let id = self.instance_id(instance);
        let outcome = sheet.insert_rules(&id, &id, rules);
        if !outcome.is_complete() {
            log::warn!("{} global rules of `{id}` were skipped", outcome.rejected.len());
        }
    }

    /// Removes the rules of `instance`.
    pub fn remove_styles(&self, instance: u32, sheet: &mut Sheet) {
        sheet.clear_rules(&self.instance_id(instance));
    }

    /// Replaces the rules of `instance` with ones rendered for `context`.
    ///
    /// Static rules are left alone once present.
    pub fn render_styles(
        &self,
        instance: u32,
        context: &C,
        sheet: &mut Sheet,
        stringifier: &dyn Stringifier,
    ) {
        let id = self.instance_id(instance);
        sheet.register_id(&id);
        if self.is_static && sheet.has_name_for_id(&id, &id) {
            return;
        }
        self.remove_styles(instance, sheet);
        self.create_styles(instance, context, sheet, stringifier);
    }
}
