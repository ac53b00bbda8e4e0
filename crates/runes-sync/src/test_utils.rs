//! In-memory datasource and processor for driver tests.

use crate::{
    async_trait, BlockHeader, BlockLike, Datasource, Processor, Subscription, SyncError,
    SyncResult,
};
use bitcoin::hashes::Hash;
use bitcoin::BlockHash;
use std::sync::RwLock;
use tokio::sync::watch;

/// Deterministic hash for a synthetic block; `seed` tells branches apart.
pub fn header_hash(height: u64, seed: u8) -> BlockHash {
    let mut bytes = [0xab; 32];
    bytes[..8].copy_from_slice(&height.to_le_bytes());
    bytes[8] = seed;
    BlockHash::from_byte_array(bytes)
}

/// `count` linked headers starting at `start`. The first one points at
/// `parent`, or at the previous height of the same branch when `None`.
pub fn chain(seed: u8, start: u64, count: usize, parent: Option<BlockHash>) -> Vec<BlockHeader> {
    let mut prev_hash = parent.unwrap_or_else(|| match start.checked_sub(1) {
        Some(height) => header_hash(height, seed),
        None => BlockHash::all_zeros(),
    });
    (start..start + count as u64)
        .map(|height| {
            let header = BlockHeader {
                height,
                hash: header_hash(height, seed),
                prev_hash,
            };
            prev_hash = header.hash;
            header
        })
        .collect()
}

/// Branch of `count` headers leaving `original` at height `at`.
pub fn fork(original: &[BlockHeader], at: u64, count: usize, seed: u8) -> Vec<BlockHeader> {
    let parent = at
        .checked_sub(1)
        .and_then(|height| original.get(height as usize))
        .map(|header| header.hash);
    chain(seed, at, count, parent.or(Some(BlockHash::all_zeros())))
}

/// Chain held in memory, served in batches of `batch_size`. Blocks are
/// indexed by height starting at genesis.
pub struct MemoryChain<T> {
    blocks: RwLock<Vec<T>>,
    batch_size: usize,
}

impl<T: BlockLike + Clone> MemoryChain<T> {
    pub fn new(blocks: Vec<T>, batch_size: usize) -> Self {
        Self {
            blocks: RwLock::new(blocks),
            batch_size: batch_size.max(1),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<T>> {
        self.blocks.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, block: T) {
        self.blocks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(block);
    }

    /// Drops every block at `height` and above and appends `blocks`.
    pub fn replace_from(&self, height: u64, blocks: Vec<T>) {
        let mut chain = self
            .blocks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        chain.truncate(height as usize);
        chain.extend(blocks);
    }

    pub fn headers_from(&self, height: u64) -> Vec<BlockHeader> {
        self.read()
            .iter()
            .skip(height as usize)
            .map(|block| block.header().clone())
            .collect()
    }

    pub fn tip(&self) -> Option<BlockHeader> {
        self.read().last().map(|block| block.header().clone())
    }
}

#[async_trait]
impl<T: BlockLike + Clone> Datasource<T> for MemoryChain<T> {
    async fn fetch_async(&self, from: u64, to: Option<u64>) -> SyncResult<Subscription<T>> {
        let blocks: Vec<T> = self
            .read()
            .iter()
            .filter(|block| {
                let height = block.header().height;
                height >= from && to.map_or(true, |to| height <= to)
            })
            .cloned()
            .collect();
        let batch_size = self.batch_size;

        let (sender, subscription) = Subscription::channel(2);
        tokio::spawn(async move {
            let mut blocks = blocks.into_iter().peekable();
            while blocks.peek().is_some() {
                let batch: Vec<T> = blocks.by_ref().take(batch_size).collect();
                if !sender.send(batch).await {
                    return;
                }
            }
            sender.done().await;
        });
        Ok(subscription)
    }

    async fn get_block_header(&self, height: u64) -> SyncResult<BlockHeader> {
        self.read()
            .get(height as usize)
            .map(|block| block.header().clone())
            .ok_or_else(|| SyncError::NotFound(format!("block {height}")))
    }
}

/// Processor that only remembers headers.
#[derive(Debug, Default)]
pub struct MemoryProcessor {
    pub blocks: Vec<BlockHeader>,
    pub reverts: Vec<u64>,
    pub shut_down: bool,
    tip: Option<watch::Sender<Option<u64>>>,
}

impl MemoryProcessor {
    /// Processor that publishes the last processed height.
    pub fn with_progress() -> (Self, watch::Receiver<Option<u64>>) {
        let (sender, receiver) = watch::channel(None);
        let processor = Self {
            tip: Some(sender),
            ..Default::default()
        };
        (processor, receiver)
    }

    pub fn heights(&self) -> Vec<u64> {
        self.blocks.iter().map(|header| header.height).collect()
    }
}

#[async_trait]
impl<T: BlockLike> Processor<T> for MemoryProcessor {
    fn name(&self) -> &str {
        "memory"
    }

    async fn process(&mut self, inputs: Vec<T>) -> SyncResult<()> {
        self.blocks
            .extend(inputs.iter().map(|block| block.header().clone()));
        if let (Some(tip), Some(last)) = (&self.tip, self.blocks.last()) {
            tip.send_replace(Some(last.height));
        }
        Ok(())
    }

    async fn current_block(&self) -> SyncResult<BlockHeader> {
        self.blocks
            .last()
            .cloned()
            .ok_or_else(|| SyncError::NotFound("no blocks indexed".into()))
    }

    async fn get_indexed_block(&self, height: u64) -> SyncResult<BlockHeader> {
        self.blocks
            .get(height as usize)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("block {height}")))
    }

    async fn revert_data(&mut self, from_height: u64) -> SyncResult<()> {
        self.reverts.push(from_height);
        self.blocks.truncate(from_height as usize);
        Ok(())
    }

    async fn verify_states(&self) -> SyncResult<()> {
        if self
            .blocks
            .windows(2)
            .all(|pair| pair[1].extends(&pair[0]))
        {
            Ok(())
        } else {
            Err(SyncError::Processor("stored chain is not linked".into()))
        }
    }

    async fn shutdown(&mut self) -> SyncResult<()> {
        self.shut_down = true;
        Ok(())
    }
}
