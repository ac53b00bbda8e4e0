use bitcoin::Block;
use runes_sync::{BlockHeader, BlockLike};

/// A block as delivered to the indexer, with its height attached.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedBlock {
    pub header: BlockHeader,
    pub block: Block,
}

impl IndexedBlock {
    pub fn new(height: u64, block: Block) -> Self {
        Self {
            header: BlockHeader {
                height,
                hash: block.block_hash(),
                prev_hash: block.header.prev_blockhash,
            },
            block,
        }
    }
}

impl BlockLike for IndexedBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }
}
