use crate::RunesError;
use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Ordered set of writes applied by [`KeyValueStore::write`] as one unit.
/// `None` deletes the key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<(Vec<u8>, Option<Vec<u8>>)>,
}

impl WriteBatch {
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push((key, Some(value)));
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.ops.push((key, None));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[(Vec<u8>, Option<Vec<u8>>)] {
        &self.ops
    }
}

impl IntoIterator for WriteBatch {
    type Item = (Vec<u8>, Option<Vec<u8>>);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

/// Backing storage for the ledger. Writes must be all-or-nothing per batch.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn write(&self, batch: WriteBatch) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        (**self).write(batch)
    }
}

/// In-memory store. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemStore {
    db: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Full copy of the contents, used to compare ledger states.
    pub fn snapshot(&self) -> Result<BTreeMap<Vec<u8>, Vec<u8>>> {
        Ok(self.read()?.clone())
    }

    pub fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        Ok(self
            .read()?
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>>> {
        self.db
            .read()
            .map_err(|_| RunesError::Store("memory store lock poisoned".into()).into())
    }
}

impl KeyValueStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        let mut db = self
            .db
            .write()
            .map_err(|_| RunesError::Store("memory store lock poisoned".into()))?;
        for (key, value) in batch {
            match value {
                Some(value) => {
                    db.insert(key, value);
                }
                None => {
                    db.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_applies_in_order() {
        let store = MemStore::new();
        let mut batch = WriteBatch::default();
        batch.put(b"a".to_vec(), b"1".to_vec());
        batch.put(b"b".to_vec(), b"2".to_vec());
        batch.delete(b"a".to_vec());
        batch.put(b"c".to_vec(), b"3".to_vec());
        store.write(batch).unwrap();

        assert_eq!(store.get(b"a").unwrap(), None);
        assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn prefix_scan() {
        let store = MemStore::new();
        let mut batch = WriteBatch::default();
        batch.put(b"/journal/1".to_vec(), vec![1]);
        batch.put(b"/journal/2".to_vec(), vec![2]);
        batch.put(b"/tip".to_vec(), vec![3]);
        store.write(batch).unwrap();

        assert_eq!(
            store.keys_with_prefix(b"/journal/").unwrap(),
            vec![b"/journal/1".to_vec(), b"/journal/2".to_vec()]
        );
    }

    #[test]
    fn clones_share_state() {
        let store = MemStore::new();
        let shared = Arc::new(store.clone());
        let mut batch = WriteBatch::default();
        batch.put(vec![0], vec![1]);
        shared.write(batch).unwrap();
        assert_eq!(store.get(&[0]).unwrap(), Some(vec![1]));
    }
}
