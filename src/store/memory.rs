//! In-memory [`Store`] implementation for tests and dry runs.
//!
//! One `BTreeMap` per namespace behind a `std::sync::RwLock`, so scans come
//! back in key order like the SQLite backend's.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use super::{Namespace, Store};

pub struct InMemoryStore {
    buckets: RwLock<HashMap<Namespace, BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        let buckets = Namespace::ALL
            .iter()
            .map(|ns| (*ns, BTreeMap::new()))
            .collect();
        Self {
            buckets: RwLock::new(buckets),
        }
    }

    /// Number of keys in a namespace.
    pub fn count(&self, ns: Namespace) -> usize {
        let buckets = self.buckets.read().unwrap();
        buckets.get(&ns).map(|b| b.len()).unwrap_or(0)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn put(&self, ns: Namespace, key: &str, value: &[u8]) -> Result<()> {
        let mut buckets = self.buckets.write().unwrap();
        buckets
            .entry(ns)
            .or_default()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get(&self, ns: Namespace, key: &str) -> Result<Option<Vec<u8>>> {
        let buckets = self.buckets.read().unwrap();
        Ok(buckets.get(&ns).and_then(|b| b.get(key)).cloned())
    }

    async fn scan(&self, ns: Namespace) -> Result<Vec<(String, Vec<u8>)>> {
        let buckets = self.buckets.read().unwrap();
        Ok(buckets
            .get(&ns)
            .map(|b| b.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }
}
