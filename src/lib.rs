//! Runes indexer: wires the allocation engine in [`runes`] to the
//! reorg-aware driver in [`runes_sync`].
//!
//! [`RunesIndexer`] is the [`runes_sync::Processor`]: every block is applied
//! inside one checkpoint, stamped with a chained event hash and flushed
//! together with its undo journal, so the driver can revert it later.

pub mod block;
pub mod config;
pub mod indexer;
pub mod logging;

pub use block::IndexedBlock;
pub use config::IndexerConfig;
pub use indexer::RunesIndexer;
