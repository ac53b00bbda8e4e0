use bitcoin::BlockHash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The link the driver checks between consecutive blocks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockHeader {
    pub height: u64,
    pub hash: BlockHash,
    pub prev_hash: BlockHash,
}

impl BlockHeader {
    pub fn extends(&self, parent: &BlockHeader) -> bool {
        self.prev_hash == parent.hash && Some(self.height) == parent.height.checked_add(1)
    }
}

impl fmt::Display for BlockHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.height, self.hash)
    }
}

/// Anything the datasource delivers: a block plus its header.
pub trait BlockLike: Send + Sync + 'static {
    fn header(&self) -> &BlockHeader;
}

impl BlockLike for BlockHeader {
    fn header(&self) -> &BlockHeader {
        self
    }
}
