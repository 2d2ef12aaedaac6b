//! Local read cache of an entity handle.
//!
//! Populated only by reads. Each entry remembers whether the store returned
//! a value or reported the attribute absent; names that were never fetched
//! have no entry at all. A prefix read also covers every property name
//! under its prefix, so names it did not return read as absent.

use adl_types::ListItem;
use std::collections::{BTreeSet, HashMap};

/// The outcome of looking up a cached attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// No read has covered this attribute yet.
    NotFetched,
    /// A read covered it and the store held nothing.
    Absent,
    /// A read returned this value.
    Present(T),
}

impl<T> Lookup<T> {
    /// The value if present.
    pub fn present(self) -> Option<T> {
        match self {
            Lookup::Present(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: Default> Lookup<T> {
    /// The value, or the type's zero value when absent or not fetched.
    pub fn or_zero(self) -> T {
        self.present().unwrap_or_default()
    }
}

fn lookup<'a, V>(map: &'a HashMap<String, Option<V>>, name: &str) -> Lookup<&'a V> {
    match map.get(name) {
        None => Lookup::NotFetched,
        Some(None) => Lookup::Absent,
        Some(Some(v)) => Lookup::Present(v),
    }
}

/// One decoded cache write produced from a read response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    /// A prefix read covered every property starting with this prefix.
    /// Precedes the properties the read returned.
    PropertyPrefix(String),
    Property(String, Option<String>),
    Metadata(String, Option<String>),
    Counter(String, Option<i64>),
    Set(String, Option<BTreeSet<String>>),
    List(String, Option<Vec<ListItem>>),
}

/// The decoded result of one read, ready to merge into a cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheUpdate {
    pub entries: Vec<CacheEntry>,
}

impl CacheUpdate {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cached attribute values of one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeCache {
    properties: HashMap<String, Option<String>>,
    property_prefixes: BTreeSet<String>,
    metadata: HashMap<String, Option<String>>,
    counters: HashMap<String, Option<i64>>,
    sets: HashMap<String, Option<BTreeSet<String>>>,
    lists: HashMap<String, Option<Vec<ListItem>>>,
}

impl AttributeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the entries named by `update`; every other entry keeps
    /// its previous state.
    pub fn merge(&mut self, update: CacheUpdate) {
        for entry in update.entries {
            match entry {
                CacheEntry::PropertyPrefix(prefix) => {
                    // older per-name state under the prefix is superseded
                    self.properties.retain(|name, _| !name.starts_with(prefix.as_str()));
                    self.property_prefixes.insert(prefix);
                }
                CacheEntry::Property(name, value) => {
                    self.properties.insert(name, value);
                }
                CacheEntry::Metadata(name, value) => {
                    self.metadata.insert(name, value);
                }
                CacheEntry::Counter(name, value) => {
                    self.counters.insert(name, value);
                }
                CacheEntry::Set(name, members) => {
                    self.sets.insert(name, members);
                }
                CacheEntry::List(name, items) => {
                    self.lists.insert(name, items);
                }
            }
        }
    }

    /// Returns a new cache with `update` merged in.
    #[must_use]
    pub fn merged(&self, update: CacheUpdate) -> Self {
        let mut next = self.clone();
        next.merge(update);
        next
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
            && self.property_prefixes.is_empty()
            && self.metadata.is_empty()
            && self.counters.is_empty()
            && self.sets.is_empty()
            && self.lists.is_empty()
    }

    pub fn property(&self, name: &str) -> Lookup<&str> {
        match lookup(&self.properties, name) {
            Lookup::Present(v) => Lookup::Present(v.as_str()),
            Lookup::Absent => Lookup::Absent,
            Lookup::NotFetched if self.covered_by_prefix(name) => Lookup::Absent,
            Lookup::NotFetched => Lookup::NotFetched,
        }
    }

    fn covered_by_prefix(&self, name: &str) -> bool {
        self.property_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }

    pub fn metadata(&self, name: &str) -> Lookup<&str> {
        match lookup(&self.metadata, name) {
            Lookup::Present(v) => Lookup::Present(v.as_str()),
            Lookup::Absent => Lookup::Absent,
            Lookup::NotFetched => Lookup::NotFetched,
        }
    }

    pub fn counter(&self, name: &str) -> Lookup<i64> {
        match lookup(&self.counters, name) {
            Lookup::Present(v) => Lookup::Present(*v),
            Lookup::Absent => Lookup::Absent,
            Lookup::NotFetched => Lookup::NotFetched,
        }
    }

    pub fn set(&self, name: &str) -> Lookup<&BTreeSet<String>> {
        lookup(&self.sets, name)
    }

    pub fn list(&self, name: &str) -> Lookup<&[ListItem]> {
        match lookup(&self.lists, name) {
            Lookup::Present(v) => Lookup::Present(v.as_slice()),
            Lookup::Absent => Lookup::Absent,
            Lookup::NotFetched => Lookup::NotFetched,
        }
    }
}
