//! Generic synchronization driver for the runes indexer.
//!
//! A [`Datasource`] streams blocks, a [`Processor`] persists them, and
//! [`RunesSync`] sits between the two: it polls for new blocks, checks that
//! each batch extends the indexed chain, and walks back to the fork point
//! when it does not.

pub mod config;
pub mod error;
pub mod subscription;
pub mod sync;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use subscription::{Subscription, SubscriptionSender};
pub use sync::{RunesSync, SyncHandle, SyncState};
pub use traits::{Datasource, Processor};
pub use types::{BlockHeader, BlockLike};

/// Re-export commonly used types
pub use async_trait::async_trait;
