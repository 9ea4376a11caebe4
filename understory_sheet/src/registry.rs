// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Group allocation and the state shared by every sheet of a process.
//!
//! [`GroupIdAllocator`] hands out dense [`GroupId`]s for component identities,
//! in first-request order. That order is the order in which groups appear in
//! every sheet's output, whatever order components render in.
//!
//! [`Registry`] wraps the allocator together with the deferred-registration
//! table behind a cheap, cloneable handle. Every sheet (and every fork of a
//! sheet) holds a clone; none of them owns it.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::hash::{escape_identifier, hash, name_from_hash};
use crate::options::VERSION;

/// A dense group number identifying one component identity.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct GroupId(u32);

impl GroupId {
    /// Creates a group id from its raw number.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns this id as a `usize` index.
    #[inline]
    #[must_use]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw group number.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Bijective map between identity strings and [`GroupId`]s.
///
/// ```rust
/// use understory_sheet::{GroupId, GroupIdAllocator};
///
/// let mut groups = GroupIdAllocator::new();
/// let a = groups.group_for_id("sc-a");
/// let b = groups.group_for_id("sc-b");
/// assert_eq!((a, b), (GroupId::new(0), GroupId::new(1)));
/// assert_eq!(groups.group_for_id("sc-a"), a);
/// assert_eq!(groups.id_for_group(b), Some("sc-b"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct GroupIdAllocator {
    by_id: HashMap<String, GroupId>,
    by_group: HashMap<GroupId, String>,
    next_free: u32,
}

impl GroupIdAllocator {
    /// Creates an empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns `true` if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Returns the group for `id`, allocating the next free one on first use.
    pub fn group_for_id(&mut self, id: &str) -> GroupId {
        if let Some(&group) = self.by_id.get(id) {
            return group;
        }
        let group = GroupId(self.next_free);
        self.next_free = self
            .next_free
            .checked_add(1)
            .expect("group id space exhausted");
        self.by_id.insert(id.to_string(), group);
        self.by_group.insert(group, id.to_string());
        group
    }

    /// Returns the group for `id` without allocating.
    #[must_use]
    pub fn get_group(&self, id: &str) -> Option<GroupId> {
        self.by_id.get(id).copied()
    }

    /// Returns the identity that owns `group`.
    #[must_use]
    pub fn id_for_group(&self, group: GroupId) -> Option<&str> {
        self.by_group.get(&group).map(String::as_str)
    }

    /// Returns `true` if `group` has no owner yet.
    #[must_use]
    pub fn is_free(&self, group: GroupId) -> bool {
        !self.by_group.contains_key(&group)
    }

    /// Assigns `group` to `id` explicitly, as observed in earlier output.
    ///
    /// Automatic allocation continues above the highest assigned group. If
    /// either side was already mapped, the stale pairing is dropped so the map
    /// stays one-to-one.
    pub fn set_group_for_id(&mut self, id: &str, group: GroupId) {
        if group.0 >= self.next_free {
            self.next_free = group.0.saturating_add(1);
        }
        if let Some(previous) = self.by_id.get(id).copied()
            && previous != group
        {
            log::warn!("moving identity `{id}` from group {} to {}", previous.0, group.0);
            self.by_group.remove(&previous);
        }
        if let Some(owner) = self.by_group.get(&group)
            && owner != id
        {
            log::warn!("group {} reassigned from `{owner}` to `{id}`", group.0);
            self.by_id.remove(owner.as_str());
        }
        self.by_id.insert(id.to_string(), group);
        self.by_group.insert(group, id.to_string());
    }

    /// Iterates `(group, identity)` pairs in ascending group order.
    pub fn iter(&self) -> impl Iterator<Item = (GroupId, &str)> + '_ {
        let mut pairs: Vec<_> = self
            .by_group
            .iter()
            .map(|(&g, id)| (g, id.as_str()))
            .collect();
        pairs.sort_unstable_by_key(|&(g, _)| g);
        pairs.into_iter()
    }

    /// Forgets every assignment and restarts numbering at zero.
    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_group.clear();
        self.next_free = 0;
    }
}

#[derive(Debug, Default)]
struct RegistryData {
    groups: GroupIdAllocator,
    deferred: HashMap<String, Vec<String>>,
    display_names: HashMap<String, u32>,
}

/// Process-wide state shared by a sheet and all of its forks.
///
/// Starts empty and is only ever appended to during normal operation.
/// Cloning yields another handle to the same state; use [`Registry::new`]
/// (or [`Registry::reset`]) for an isolated one, e.g. between tests.
///
/// Writes take a lock, so concurrent renders on different threads may
/// register new identities safely. Each concurrent render still needs its
/// own [`Sheet`](crate::Sheet).
#[derive(Clone, Debug, Default)]
pub struct Registry {
    data: Arc<RwLock<RegistryData>>,
    rehydrated: Arc<AtomicBool>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if both handles share the same state.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Returns the group for `id`, allocating one on first use.
    pub fn group_for_id(&self, id: &str) -> GroupId {
        if let Some(group) = self.data.read().groups.get_group(id) {
            return group;
        }
        self.data.write().groups.group_for_id(id)
    }

    /// Returns the group for `id` without allocating.
    #[must_use]
    pub fn get_group(&self, id: &str) -> Option<GroupId> {
        self.data.read().groups.get_group(id)
    }

    /// Returns `true` if `id` has a group.
    #[must_use]
    pub fn has_id(&self, id: &str) -> bool {
        self.get_group(id).is_some()
    }

    /// Returns the identity owning `group`.
    #[must_use]
    pub fn id_for_group(&self, group: GroupId) -> Option<String> {
        self.data.read().groups.id_for_group(group).map(ToString::to_string)
    }

    /// See [`GroupIdAllocator::set_group_for_id`].
    pub fn set_group_for_id(&self, id: &str, group: GroupId) {
        self.data.write().groups.set_group_for_id(id, group);
    }

    /// Claims a group for an identity observed at `position` in earlier output.
    ///
    /// An identity that already has a group keeps it. Otherwise it receives
    /// `position` when that group is free, or the next free group.
    pub fn adopt_group(&self, id: &str, position: u32) -> GroupId {
        let mut data = self.data.write();
        if let Some(group) = data.groups.get_group(id) {
            return group;
        }
        let wanted = GroupId(position);
        if data.groups.is_free(wanted) {
            data.groups.set_group_for_id(id, wanted);
            wanted
        } else {
            data.groups.group_for_id(id)
        }
    }

    /// Snapshot of all `(group, identity)` pairs in group order.
    #[must_use]
    pub fn groups(&self) -> Vec<(GroupId, String)> {
        self.data
            .read()
            .groups
            .iter()
            .map(|(g, id)| (g, id.to_string()))
            .collect()
    }

    /// Declares `id` ahead of its first render, with base rules.
    ///
    /// The id is registered immediately, fixing its position in every sheet.
    /// Each sheet injects `rules` ahead of the first rules it inserts for the
    /// id. A later call replaces the stored rules.
    pub fn defer(&self, id: &str, rules: Vec<String>) {
        let mut data = self.data.write();
        data.groups.group_for_id(id);
        data.deferred.insert(id.to_string(), rules);
    }

    /// Returns the deferred base rules for `id`.
    #[must_use]
    pub fn deferred(&self, id: &str) -> Option<Vec<String>> {
        self.data.read().deferred.get(id).cloned()
    }

    /// Returns `true` exactly once per registry; used to rehydrate only once.
    pub fn claim_rehydration(&self) -> bool {
        self.rehydrated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Returns `true` once rehydration has been claimed.
    #[must_use]
    pub fn is_rehydrated(&self) -> bool {
        self.rehydrated.load(Ordering::Acquire)
    }

    /// Generates a unique component identity from a human-readable name.
    ///
    /// The result is stable for the n-th definition with the same name, so
    /// server and client agree on it when definitions run in the same order.
    ///
    /// ```rust
    /// use understory_sheet::Registry;
    ///
    /// let registry = Registry::new();
    /// let first = registry.generate_component_id("Button");
    /// let second = registry.generate_component_id("Button");
    /// assert!(first.starts_with("Button-"));
    /// assert_ne!(first, second);
    /// assert_eq!(first, Registry::new().generate_component_id("Button"));
    /// ```
    pub fn generate_component_id(&self, display_name: &str) -> String {
        let escaped = escape_identifier(display_name);
        let name = if escaped.is_empty() {
            String::from("sc")
        } else {
            escaped
        };
        let count = {
            let mut data = self.data.write();
            let counter = data.display_names.entry(name.clone()).or_insert(0);
            *counter += 1;
            *counter
        };
        let suffix = name_from_hash(hash(&format!("{VERSION}{name}{count}")));
        format!("{name}-{suffix}")
    }

    /// Drops all shared state, including the rehydration flag.
    pub fn reset(&self) {
        let mut data = self.data.write();
        data.groups.clear();
        data.deferred.clear();
        data.display_names.clear();
        self.rehydrated.store(false, Ordering::Release);
    }
}
