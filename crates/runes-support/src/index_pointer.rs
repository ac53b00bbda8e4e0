use crate::byte_view::ByteView;
use crate::journal::UndoJournal;
use crate::store::{KeyValueStore, WriteBatch};
use crate::RunesError;
use anyhow::{anyhow, Result};
use log::debug;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Key construction shared by plain and atomic pointers.
pub trait KeyValuePointer: Sized {
    fn unwrap(&self) -> Arc<Vec<u8>>;
    /// Same pointer context, different key.
    fn rekey(&self, key: Vec<u8>) -> Self;

    fn select(&self, word: &[u8]) -> Self {
        let mut key = (*self.unwrap()).clone();
        key.extend_from_slice(word);
        self.rekey(key)
    }
    fn keyword(&self, word: &str) -> Self {
        self.select(word.as_bytes())
    }
    fn select_value<T: ByteView>(&self, key: T) -> Self {
        self.select(&key.to_bytes())
    }
    fn select_index(&self, index: u32) -> Self {
        self.keyword(&format!("/{}", index))
    }
    fn length_key(&self) -> Self {
        self.keyword("/length")
    }
}

/// A bare key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexPointer {
    key: Arc<Vec<u8>>,
}

impl IndexPointer {
    pub fn wrap(word: &[u8]) -> Self {
        Self {
            key: Arc::new(word.to_vec()),
        }
    }

    pub fn from_keyword(word: &str) -> Self {
        Self::wrap(word.as_bytes())
    }
}

impl KeyValuePointer for IndexPointer {
    fn unwrap(&self) -> Arc<Vec<u8>> {
        self.key.clone()
    }
    fn rekey(&self, key: Vec<u8>) -> Self {
        Self { key: Arc::new(key) }
    }
}

/// Pending writes of one checkpoint level. An empty value is a delete.
#[derive(Clone, Default, Debug)]
pub struct IndexCheckpoint(pub BTreeMap<Arc<Vec<u8>>, Arc<Vec<u8>>>);

impl IndexCheckpoint {
    fn pipe_to(self, target: &mut IndexCheckpoint) {
        target.0.extend(self.0);
    }
}

#[derive(Clone, Debug)]
pub struct IndexCheckpointStack(pub Arc<Mutex<Vec<IndexCheckpoint>>>);

impl Default for IndexCheckpointStack {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(vec![IndexCheckpoint::default()])))
    }
}

impl IndexCheckpointStack {
    fn lock(&self) -> Result<MutexGuard<'_, Vec<IndexCheckpoint>>> {
        self.0
            .lock()
            .map_err(|_| RunesError::Store("checkpoint stack poisoned".into()).into())
    }

    pub fn depth(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }
}

/// Pointer whose writes are buffered in a checkpoint stack shared by every
/// pointer derived from it, and only reach the store on [`AtomicPointer::flush`].
#[derive(Debug)]
pub struct AtomicPointer<S: KeyValueStore> {
    pointer: IndexPointer,
    store: Arc<S>,
    checkpoints: IndexCheckpointStack,
}

impl<S: KeyValueStore> Clone for AtomicPointer<S> {
    fn clone(&self) -> Self {
        Self {
            pointer: self.pointer.clone(),
            store: self.store.clone(),
            checkpoints: self.checkpoints.clone(),
        }
    }
}

impl<S: KeyValueStore> KeyValuePointer for AtomicPointer<S> {
    fn unwrap(&self) -> Arc<Vec<u8>> {
        self.pointer.unwrap()
    }
    fn rekey(&self, key: Vec<u8>) -> Self {
        Self {
            pointer: self.pointer.rekey(key),
            store: self.store.clone(),
            checkpoints: self.checkpoints.clone(),
        }
    }
}

impl<S: KeyValueStore> AtomicPointer<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            pointer: IndexPointer::default(),
            store,
            checkpoints: IndexCheckpointStack::default(),
        }
    }

    /// Pointer at `pointer`'s key sharing this pointer's pending writes.
    pub fn derive(&self, pointer: &IndexPointer) -> Self {
        Self {
            pointer: pointer.clone(),
            store: self.store.clone(),
            checkpoints: self.checkpoints.clone(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn get(&self) -> Result<Arc<Vec<u8>>> {
        let key = self.unwrap();
        if let Some(value) = self
            .checkpoints
            .lock()?
            .iter()
            .rev()
            .find_map(|checkpoint| checkpoint.0.get(&key).cloned())
        {
            return Ok(value);
        }
        Ok(Arc::new(self.store.get(&key)?.unwrap_or_default()))
    }

    pub fn set(&mut self, value: Arc<Vec<u8>>) -> Result<()> {
        let key = self.unwrap();
        self.checkpoints
            .lock()?
            .last_mut()
            .ok_or_else(|| anyhow!("set() called without checkpoints"))?
            .0
            .insert(key, value);
        Ok(())
    }

    pub fn delete(&mut self) -> Result<()> {
        self.set(Arc::new(Vec::new()))
    }

    pub fn get_value<T: ByteView>(&self) -> Result<T> {
        let value = self.get()?;
        Ok(if value.is_empty() {
            T::zero()
        } else {
            T::from_bytes(value.as_ref().clone())
        })
    }

    pub fn set_value<T: ByteView>(&mut self, value: T) -> Result<()> {
        self.set(Arc::new(value.to_bytes()))
    }

    pub fn length(&self) -> Result<u32> {
        self.length_key().get_value::<u32>()
    }

    pub fn append(&mut self, value: Arc<Vec<u8>>) -> Result<()> {
        let mut length_key = self.length_key();
        let length = length_key.get_value::<u32>()?;
        length_key.set_value::<u32>(length + 1)?;
        self.select_index(length).set(value)
    }

    pub fn get_list(&self) -> Result<Vec<Arc<Vec<u8>>>> {
        (0..self.length()?)
            .map(|i| self.select_index(i).get())
            .collect()
    }

    pub fn checkpoint(&mut self) -> Result<()> {
        self.checkpoints.lock()?.push(IndexCheckpoint::default());
        Ok(())
    }

    /// Folds the innermost checkpoint into its parent.
    pub fn commit(&mut self) -> Result<()> {
        let mut checkpoints = self.checkpoints.lock()?;
        if checkpoints.len() < 2 {
            return Err(anyhow!("commit() called without an open checkpoint"));
        }
        if let Some(top) = checkpoints.pop() {
            if let Some(parent) = checkpoints.last_mut() {
                top.pipe_to(parent);
            }
        }
        Ok(())
    }

    /// Drops the innermost checkpoint.
    pub fn rollback(&mut self) -> Result<()> {
        let mut checkpoints = self.checkpoints.lock()?;
        if checkpoints.len() < 2 {
            return Err(anyhow!("rollback() called without an open checkpoint"));
        }
        checkpoints.pop();
        Ok(())
    }

    pub fn checkpoint_depth(&self) -> Result<usize> {
        self.checkpoints.depth()
    }

    /// Writes the base level to the store as a single batch and clears it.
    ///
    /// With `journal` set, the previous value of every touched key is stored
    /// there in the same batch so the writes can be undone later.
    pub fn flush(&mut self, journal: Option<&IndexPointer>) -> Result<usize> {
        let base = {
            let mut checkpoints = self.checkpoints.lock()?;
            if checkpoints.len() != 1 {
                return Err(anyhow!(
                    "flush() called with {} open checkpoints",
                    checkpoints.len().saturating_sub(1)
                ));
            }
            std::mem::take(&mut checkpoints[0])
        };

        let mut batch = WriteBatch::default();
        let mut undo = UndoJournal::default();

        for (key, value) in base.0 {
            if journal.is_some() {
                undo.record(key.to_vec(), self.store.get(&key)?);
            }
            if value.is_empty() {
                batch.delete(key.to_vec());
            } else {
                batch.put(key.to_vec(), value.to_vec());
            }
        }

        match journal {
            Some(journal) => {
                let key = journal.unwrap();
                debug!(
                    "flushing {} writes, journal {} ({} keys)",
                    batch.len(),
                    hex::encode(key.as_slice()),
                    undo.entries.len()
                );
                batch.put(key.to_vec(), undo.encode());
            }
            None => debug!("flushing {} writes", batch.len()),
        }

        let writes = batch.len();
        self.store.write(batch)?;
        Ok(writes)
    }
}
