//! In-memory [`ObjectStore`] used by the pipeline tests.

use super::{
    CopyOptions, ObjectHead, ObjectLocation, ObjectStore, ObjectSummary, StorageError,
    StorageResult,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Head,
    Copy,
    Delete,
}

#[derive(Default)]
struct Inner {
    objects: BTreeMap<(String, String), ObjectHead>,
    failures: HashSet<(Op, String)>,
    deletes: Vec<String>,
    copies: Vec<(String, String)>,
}

#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, bucket: &str, key: &str, size: u64) {
        self.put_head(
            bucket,
            key,
            ObjectHead {
                size,
                ..ObjectHead::default()
            },
        );
    }

    pub fn put_head(&self, bucket: &str, key: &str, head: ObjectHead) {
        self.inner
            .lock()
            .unwrap()
            .objects
            .insert((bucket.to_string(), key.to_string()), head);
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<ObjectHead> {
        self.inner
            .lock()
            .unwrap()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.get(bucket, key).is_some()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    /// Makes every later `op` on `key` fail until [`Self::heal`] is called.
    pub fn fail_on(&self, op: Op, key: &str) {
        self.inner.lock().unwrap().failures.insert((op, key.to_string()));
    }

    pub fn heal(&self) {
        self.inner.lock().unwrap().failures.clear();
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.inner.lock().unwrap().deletes.clone()
    }

    pub fn copy_count(&self) -> usize {
        self.inner.lock().unwrap().copies.len()
    }

    fn check(&self, op: Op, key: &str) -> StorageResult<()> {
        if self.inner.lock().unwrap().failures.contains(&(op, key.to_string())) {
            return Err(StorageError::Backend(format!("injected {:?} failure on {}", op, key)));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectSummary>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .objects
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, key), head)| ObjectSummary {
                key: key.clone(),
                size: head.size,
                last_modified: Some(Utc::now()),
            })
            .collect())
    }

    async fn head_object(&self, location: &ObjectLocation) -> StorageResult<Option<ObjectHead>> {
        self.check(Op::Head, &location.key)?;
        Ok(self.get(&location.bucket, &location.key))
    }

    async fn copy_object(
        &self,
        source: &ObjectLocation,
        destination: &ObjectLocation,
        options: Option<CopyOptions>,
    ) -> StorageResult<()> {
        self.check(Op::Copy, &destination.key)?;
        let mut head = self
            .get(&source.bucket, &source.key)
            .ok_or_else(|| StorageError::NotFound(source.to_string()))?;
        if let Some(options) = options {
            head.content_type = options.content_type;
            head.metadata = options.metadata;
        }
        self.put_head(&destination.bucket, &destination.key, head);
        self.inner
            .lock()
            .unwrap()
            .copies
            .push((source.to_string(), destination.to_string()));
        Ok(())
    }

    async fn delete_object(&self, location: &ObjectLocation) -> StorageResult<()> {
        self.check(Op::Delete, &location.key)?;
        let mut inner = self.inner.lock().unwrap();
        inner
            .objects
            .remove(&(location.bucket.clone(), location.key.clone()));
        inner.deletes.push(location.to_string());
        Ok(())
    }
}
