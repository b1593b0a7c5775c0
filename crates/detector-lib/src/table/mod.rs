//! Immutable indexed tables over measurements and symptoms
//!
//! A table is built once from a collection and indexed by type, then by
//! instance id. Each (type, instance) group is kept in chronological order.
//! Lookups of unknown types or instances yield empty views, never errors.

mod measurements;
mod symptoms;

pub use measurements::MeasurementsTable;
pub use symptoms::SymptomsTable;

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Entries that can be indexed by an [`IndexedTable`]
pub trait TableEntry {
    /// Metric name for measurements, symptom type for symptoms
    fn entry_type(&self) -> &str;

    fn instance_id(&self) -> &str;

    fn recorded_at(&self) -> DateTime<Utc>;
}

type InstanceIndex<T> = BTreeMap<String, Vec<T>>;

/// Read-only index: type -> instance -> entries, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedTable<T> {
    index: BTreeMap<String, InstanceIndex<T>>,
    size: usize,
}

impl<T> Default for IndexedTable<T> {
    fn default() -> Self {
        Self {
            index: BTreeMap::new(),
            size: 0,
        }
    }
}

impl<T: TableEntry> IndexedTable<T> {
    /// Build a table from a collection of entries
    ///
    /// Groups are sorted by timestamp with a stable sort, so entries sharing a
    /// timestamp keep their input order and chronological input is kept as is.
    pub fn of<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut index: BTreeMap<String, InstanceIndex<T>> = BTreeMap::new();
        let mut size = 0;

        for entry in entries {
            let entry_type = entry.entry_type().to_owned();
            let instance = entry.instance_id().to_owned();
            index
                .entry(entry_type)
                .or_default()
                .entry(instance)
                .or_default()
                .push(entry);
            size += 1;
        }

        for group in index.values_mut().flat_map(|instances| instances.values_mut()) {
            let chronological = group
                .windows(2)
                .all(|pair| pair[0].recorded_at() <= pair[1].recorded_at());
            if !chronological {
                group.sort_by_key(|entry| entry.recorded_at());
            }
        }

        Self { index, size }
    }

    /// View scoped to one type; empty if the type is unknown
    pub fn of_type(&self, name: &str) -> TypeView<'_, T> {
        TypeView {
            instances: self.index.get(name),
        }
    }

    /// Total number of entries
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Distinct types present, in sorted order
    pub fn types(&self) -> impl Iterator<Item = &str> + '_ {
        self.index.keys().map(String::as_str)
    }

    /// Distinct instance ids across all types
    pub fn instances(&self) -> BTreeSet<&str> {
        self.index
            .values()
            .flat_map(|instances| instances.keys().map(String::as_str))
            .collect()
    }

    /// All entries, grouped by type then instance, oldest first within a group
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.index
            .values()
            .flat_map(|instances| instances.values())
            .flatten()
    }
}

impl<T: TableEntry + Clone> IndexedTable<T> {
    /// New table holding the entries with `start <= timestamp <= end`
    pub fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.filtered(|entry| {
            let at = entry.recorded_at();
            start <= at && at <= end
        })
    }

    pub(crate) fn filtered<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&T) -> bool,
    {
        Self::of(self.iter().filter(|entry| keep(*entry)).cloned())
    }
}

impl<T: TableEntry> FromIterator<T> for IndexedTable<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::of(iter)
    }
}

/// Read-only view of a single type within an [`IndexedTable`]
#[derive(Debug)]
pub struct TypeView<'a, T> {
    instances: Option<&'a InstanceIndex<T>>,
}

impl<T> Clone for TypeView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TypeView<'_, T> {}

impl<'a, T: TableEntry> TypeView<'a, T> {
    /// Entries recorded for an instance, oldest first; empty if none
    pub fn instance(&self, id: &str) -> &'a [T] {
        self.instances
            .and_then(|instances| instances.get(id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Entries recorded for an instance at or before `cutoff`
    pub fn instance_until(&self, id: &str, cutoff: DateTime<Utc>) -> &'a [T] {
        let entries = self.instance(id);
        let end = entries.partition_point(|entry| entry.recorded_at() <= cutoff);
        &entries[..end]
    }

    /// Most recent entry for an instance
    pub fn last(&self, id: &str) -> Option<&'a T> {
        self.instance(id).last()
    }

    /// Instance ids present for this type, in sorted order
    pub fn instances(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.instances
            .into_iter()
            .flat_map(|instances| instances.keys().map(String::as_str))
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a T> + 'a {
        self.instances
            .into_iter()
            .flat_map(|instances| instances.values())
            .flatten()
    }

    /// Number of entries of this type
    pub fn size(&self) -> usize {
        self.instances
            .map(|instances| instances.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_none()
    }
}
