//! Sync configuration

use crate::{SyncError, SyncResult};
use std::time::Duration;

/// Sync configuration for blockchain synchronization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    /// Most blocks handed to one `Processor::process` call.
    pub batch_size: usize,
    pub max_reorg_depth: u64,
    pub shutdown_timeout: Duration,
    /// Stop once this height has been indexed.
    pub exit_at: Option<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            batch_size: 10,
            max_reorg_depth: 100,
            shutdown_timeout: Duration::from_secs(30),
            exit_at: None,
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_reorg_depth(mut self, max_reorg_depth: u64) -> Self {
        self.max_reorg_depth = max_reorg_depth;
        self
    }

    pub fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    pub fn with_exit_at(mut self, exit_at: Option<u64>) -> Self {
        self.exit_at = exit_at;
        self
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.poll_interval.is_zero() {
            return Err(SyncError::Config(
                "poll interval must be greater than 0".into(),
            ));
        }

        if self.batch_size == 0 {
            return Err(SyncError::Config("batch size must be greater than 0".into()));
        }

        if self.max_reorg_depth == 0 {
            return Err(SyncError::Config(
                "max reorg depth must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SyncConfig::new();
        assert_eq!(config.max_reorg_depth, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_values() {
        assert!(SyncConfig::new().with_batch_size(0).validate().is_err());
        assert!(SyncConfig::new().with_max_reorg_depth(0).validate().is_err());
        assert!(SyncConfig::new()
            .with_poll_interval(Duration::ZERO)
            .validate()
            .is_err());
    }
}
