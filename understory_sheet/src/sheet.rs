// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The sheet façade.

use alloc::boxed::Box;
use alloc::collections::BTreeSet;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use hashbrown::{HashMap, HashSet};

use crate::element::StyleElement;
use crate::error::InsertOutcome;
use crate::grouped::GroupedTag;
use crate::markers::encode_names;
use crate::options::{ACTIVE_VALUE, SheetOptions};
use crate::registry::{GroupId, Registry};
use crate::rehydrate::{self, RehydrateSummary};
use crate::tag::make_tag;

/// A style sheet: a lazily created [`GroupedTag`] plus a cache of the rule
/// names already injected per component identity.
///
/// A sheet is single-owner. Concurrent renders each need their own, usually
/// obtained with [`Sheet::fork`]; all forks share one [`Registry`].
///
/// ```rust
/// use understory_sheet::{Registry, Sheet};
///
/// let registry = Registry::new();
/// registry.group_for_id("sc-a");
/// registry.group_for_id("sc-b");
///
/// let mut sheet = Sheet::server(registry);
/// let _ = sheet.insert_rules("sc-b", "b", [".b{color:blue;}"]);
/// let _ = sheet.insert_rules("sc-a", "a", [".a{color:red;}"]);
/// assert_eq!(sheet.css(), ".a{color:red;}\n.b{color:blue;}\n");
/// assert!(sheet.has_name_for_id("sc-a", "a"));
/// ```
pub struct Sheet {
    options: SheetOptions,
    registry: Registry,
    names: HashMap<String, BTreeSet<String>>,
    rehydrated_names: HashSet<String>,
    injected_deferred: HashSet<String>,
    target: Option<Box<dyn StyleElement>>,
    tag: Option<GroupedTag>,
}

impl fmt::Debug for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sheet")
            .field("options", &self.options)
            .field("ids", &self.names.len())
            .field("rehydrated_names", &self.rehydrated_names.len())
            .field("tag", &self.tag.as_ref().map(GroupedTag::mode))
            .finish_non_exhaustive()
    }
}

impl Sheet {
    /// Creates an empty sheet.
    #[must_use]
    pub fn new(options: SheetOptions, registry: Registry) -> Self {
        Self {
            options,
            registry,
            names: HashMap::new(),
            rehydrated_names: HashSet::new(),
            injected_deferred: HashSet::new(),
            target: None,
            tag: None,
        }
    }

    /// Creates an in-memory sheet for rendering one server response.
    #[must_use]
    pub fn server(registry: Registry) -> Self {
        Self::new(SheetOptions::server(), registry)
    }

    /// Creates a sheet that writes into `target` once its tag is created.
    #[must_use]
    pub fn with_target(
        options: SheetOptions,
        registry: Registry,
        target: Box<dyn StyleElement>,
    ) -> Self {
        let mut sheet = Self::new(options, registry);
        sheet.target = Some(target);
        sheet
    }

    /// Sets the container the tag will be created over.
    ///
    /// Has no effect once the tag exists.
    pub fn set_target(&mut self, target: Box<dyn StyleElement>) {
        if self.tag.is_some() {
            log::warn!("ignoring a new target for a sheet whose tag already exists");
            return;
        }
        self.target = Some(target);
    }

    /// Returns the sheet's options.
    #[must_use]
    pub fn options(&self) -> &SheetOptions {
        &self.options
    }

    /// Returns the shared registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns `true` for in-memory server sheets.
    #[must_use]
    pub fn is_server(&self) -> bool {
        self.options.is_server
    }

    /// Registers `id`, fixing its position in output.
    pub fn register_id(&self, id: &str) -> GroupId {
        self.registry.group_for_id(id)
    }

    /// Returns the tag, creating it on first use.
    pub fn get_tag(&mut self) -> &mut GroupedTag {
        self.tag
            .get_or_insert_with(|| GroupedTag::new(make_tag(&self.options, self.target.take())))
    }

    /// Returns the tag if it was created.
    #[must_use]
    pub fn tag(&self) -> Option<&GroupedTag> {
        self.tag.as_ref()
    }

    /// Returns `true` if `name` is known to be injected for `id`.
    ///
    /// Names recovered by rehydration without a clear owner count for every
    /// identity.
    #[must_use]
    pub fn has_name_for_id(&self, id: &str, name: &str) -> bool {
        self.names.get(id).is_some_and(|names| names.contains(name))
            || self.rehydrated_names.contains(name)
    }

    /// Records `name` as injected for `id`.
    pub fn register_name(&mut self, id: &str, name: &str) {
        self.registry.group_for_id(id);
        match self.names.get_mut(id) {
            Some(names) => {
                names.insert(name.to_string());
            }
            None => {
                self.names
                    .insert(id.to_string(), BTreeSet::from([name.to_string()]));
            }
        }
    }

    /// Records `name` for `id` and appends `rules` to `id`'s group.
    ///
    /// The first insertion for an id also injects the base rules declared
    /// with [`Registry::defer`]. Rules the medium refuses are reported in the
    /// outcome and skipped.
    pub fn insert_rules<I, S>(&mut self, id: &str, name: &str, rules: I) -> InsertOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.register_name(id, name);
        let group = self.registry.group_for_id(id);
        let mut outcome = InsertOutcome::default();
        if self.injected_deferred.insert(id.to_string())
            && let Some(base) = self.registry.deferred(id)
        {
            outcome.merge(self.get_tag().insert_rules(group, &base));
        }
        outcome.merge(self.get_tag().insert_rules(group, rules));
        self.sync_container();
        outcome
    }

    /// Forgets the names cached for `id` without touching its rules.
    pub fn clear_names(&mut self, id: &str) {
        self.names.remove(id);
    }

    /// Removes every rule and cached name of `id`.
    ///
    /// Other groups keep their rules and positions. Unknown ids are ignored
    /// and never allocate a group.
    pub fn clear_rules(&mut self, id: &str) {
        if let Some(group) = self.registry.get_group(id)
            && let Some(tag) = self.tag.as_mut()
        {
            tag.clear_group(group);
        }
        self.clear_names(id);
        self.injected_deferred.remove(id);
        self.sync_container();
    }

    /// Drops the tag, keeping the name cache.
    ///
    /// Used between chunks of streamed server output: the next insertion
    /// starts a fresh tag holding only new rules.
    pub fn clear_tag(&mut self) {
        self.tag = None;
        self.injected_deferred.clear();
    }

    /// Creates an isolated sheet sharing this sheet's registry.
    ///
    /// The fork starts with no tag and no cached names.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self::new(self.options.clone(), self.registry.clone())
    }

    /// Creates a sheet with new options over the same registry, optionally
    /// carrying the name cache across.
    #[must_use]
    pub fn reconstruct_with_options(&self, options: SheetOptions, keep_names: bool) -> Self {
        let mut sheet = Self::new(options, self.registry.clone());
        if keep_names {
            sheet.names = self.names.clone();
            sheet.rehydrated_names = self.rehydrated_names.clone();
        }
        sheet
    }

    /// Every cached name, sorted and deduplicated.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        all_names(&self.names, &self.rehydrated_names)
    }

    /// Names cached for `id`, sorted.
    pub fn names_for_id(&self, id: &str) -> impl Iterator<Item = &str> + '_ {
        self.names
            .get(id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Text of every live rule.
    #[must_use]
    pub fn css(&self) -> String {
        self.tag.as_ref().map(GroupedTag::css).unwrap_or_default()
    }

    /// Serializes the sheet as a complete `<style>` element for HTML output.
    #[must_use]
    pub fn to_style_tag(&self) -> String {
        rehydrate::style_tag(self)
    }

    /// Rehydrates from `containers` unless this is a server sheet or the
    /// registry was already rehydrated.
    pub fn rehydrate_once(
        &mut self,
        containers: Vec<Box<dyn StyleElement>>,
    ) -> Option<RehydrateSummary> {
        if self.is_server() || !self.registry.claim_rehydration() {
            return None;
        }
        Some(rehydrate::rehydrate(self, containers))
    }

    /// Brings a live container up to date: marker text for text containers
    /// and the injected names in the marker attribute.
    pub(crate) fn sync_container(&mut self) {
        if self.is_server() {
            return;
        }
        let Some(tag) = self.tag.as_mut() else {
            return;
        };
        if tag.tag().is_dirty() {
            tag.flush(&self.registry.groups());
        }
        let (names, rehydrated) = (&self.names, &self.rehydrated_names);
        tag.write_names(&self.options.attr, || {
            let names = all_names(names, rehydrated);
            if names.is_empty() {
                ACTIVE_VALUE.to_string()
            } else {
                encode_names(names)
            }
        });
    }

    pub(crate) fn can_adopt(&self) -> bool {
        self.tag.is_none() && self.target.is_none()
    }

    pub(crate) fn register_unowned_name(&mut self, name: &str) {
        self.rehydrated_names.insert(name.to_string());
    }

    pub(crate) fn mark_deferred_injected(&mut self, id: &str) {
        self.injected_deferred.insert(id.to_string());
    }
}

fn all_names<'a>(
    names: &'a HashMap<String, BTreeSet<String>>,
    rehydrated: &'a HashSet<String>,
) -> Vec<&'a str> {
    let all: BTreeSet<&str> = names
        .values()
        .flatten()
        .chain(rehydrated)
        .map(String::as_str)
        .collect();
    all.into_iter().collect()
}

impl fmt::Display for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&rehydrate::output_sheet(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::MemoryElement;
    use alloc::vec;

    #[test]
    fn insertion_registers_name_and_group() {
        let registry = Registry::new();
        let mut sheet = Sheet::server(registry.clone());
        assert!(!sheet.has_name_for_id("sc-a", "x"));
        let outcome = sheet.insert_rules("sc-a", "x", [".x{top:0;}"]);
        assert!(outcome.is_complete());
        assert!(sheet.has_name_for_id("sc-a", "x"));
        assert!(!sheet.has_name_for_id("sc-b", "x"));
        assert_eq!(registry.get_group("sc-a"), Some(GroupId::new(0)));
    }

    #[test]
    fn clear_rules_is_local_to_the_group() {
        let mut sheet = Sheet::server(Registry::new());
        let _ = sheet.insert_rules("a", "a1", [".a1{}"]);
        let _ = sheet.insert_rules("b", "b1", [".b1{}"]);
        sheet.clear_rules("a");
        assert_eq!(sheet.css(), ".b1{}\n");
        assert!(!sheet.has_name_for_id("a", "a1"));
        assert!(sheet.has_name_for_id("b", "b1"));
    }

    #[test]
    fn clearing_unknown_id_allocates_nothing() {
        let registry = Registry::new();
        let mut sheet = Sheet::server(registry.clone());
        sheet.clear_rules("ghost");
        assert!(!registry.has_id("ghost"));
        assert!(sheet.tag().is_none());
    }

    #[test]
    fn deferred_rules_lead_the_first_insertion() {
        let registry = Registry::new();
        registry.defer("sc-base", vec![".sc-base{display:flex;}".into()]);
        let mut sheet = Sheet::server(registry);
        let _ = sheet.insert_rules("sc-base", "n1", [".n1{color:red;}"]);
        let _ = sheet.insert_rules("sc-base", "n2", [".n2{color:blue;}"]);
        assert_eq!(
            sheet.css(),
            ".sc-base{display:flex;}\n.n1{color:red;}\n.n2{color:blue;}\n"
        );
    }

    #[test]
    fn clear_tag_keeps_names() {
        let mut sheet = Sheet::server(Registry::new());
        let _ = sheet.insert_rules("a", "a1", [".a1{}"]);
        sheet.clear_tag();
        assert_eq!(sheet.css(), "");
        assert!(sheet.has_name_for_id("a", "a1"));
        assert_eq!(sheet.names(), ["a1"]);
    }

    #[test]
    fn reconstruct_can_carry_names() {
        let mut sheet = Sheet::server(Registry::new());
        let _ = sheet.insert_rules("a", "a1", [".a1{}"]);
        let kept = sheet.reconstruct_with_options(SheetOptions::server(), true);
        let dropped = sheet.reconstruct_with_options(SheetOptions::server(), false);
        assert!(kept.has_name_for_id("a", "a1"));
        assert!(!dropped.has_name_for_id("a", "a1"));
        assert!(kept.registry().ptr_eq(sheet.registry()));
        assert_eq!(kept.css(), "");
    }

    #[test]
    fn target_is_used_when_the_tag_is_created() {
        let mut sheet = Sheet::with_target(
            SheetOptions::default(),
            Registry::new(),
            Box::new(MemoryElement::new()),
        );
        let _ = sheet.insert_rules("a", "a1", [".a1{}"]);
        assert_eq!(sheet.get_tag().mode(), crate::InsertMode::Cssom);
        sheet.set_target(Box::new(MemoryElement::new()));
        assert_eq!(sheet.css(), ".a1{}\n");
    }

    #[test]
    fn server_sheets_never_rehydrate() {
        let registry = Registry::new();
        let mut sheet = Sheet::server(registry.clone());
        assert!(sheet.rehydrate_once(Vec::new()).is_none());
        assert!(!registry.is_rehydrated());
    }
}
