//! Ledger primitives shared by the runes indexer: key/value storage with
//! checkpointed writes and an undo journal, balance sheets, rune entries and
//! the [`host::RuneHost`] repository interface the allocation engine runs
//! against.

pub mod balance_sheet;
pub mod byte_view;
pub mod error;
pub mod host;
pub mod index_pointer;
pub mod journal;
pub mod rune_entry;
pub mod store;
pub mod utils;

pub use error::{RunesError, RunesResult};
