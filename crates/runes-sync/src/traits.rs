//! Seams between the driver, the block source and the indexer.

use crate::{BlockHeader, BlockLike, Subscription, SyncResult};
use async_trait::async_trait;

/// Source of blocks, usually a node or a block archive.
#[async_trait]
pub trait Datasource<T: BlockLike>: Send + Sync {
    /// Streams blocks `from..=to` (open-ended when `to` is `None`) in
    /// ascending, gap-free batches.
    async fn fetch_async(&self, from: u64, to: Option<u64>) -> SyncResult<Subscription<T>>;

    /// Fails with `NotFound` above the source's tip.
    async fn get_block_header(&self, height: u64) -> SyncResult<BlockHeader>;
}

/// Consumer that owns the indexed state.
#[async_trait]
pub trait Processor<T: BlockLike>: Send + Sync {
    fn name(&self) -> &str;

    /// Indexes `inputs` in order. A block is either fully stored or not at all.
    async fn process(&mut self, inputs: Vec<T>) -> SyncResult<()>;

    /// Last indexed header; `NotFound` before the first block.
    async fn current_block(&self) -> SyncResult<BlockHeader>;

    async fn get_indexed_block(&self, height: u64) -> SyncResult<BlockHeader>;

    /// Drops everything indexed at `from_height` and above.
    async fn revert_data(&mut self, from_height: u64) -> SyncResult<()>;

    /// Startup consistency check.
    async fn verify_states(&self) -> SyncResult<()>;

    async fn shutdown(&mut self) -> SyncResult<()>;
}
