use anyhow::{anyhow, Result};
use bitcoin::Network;
use runes_sync::SyncConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerConfig {
    pub network: Network,
    /// Name used in logs; defaults to `runes-<network>`.
    pub label: Option<String>,
    /// Blocks whose undo journal is kept. Older blocks cannot be reverted.
    pub journal_depth: u64,
}

impl IndexerConfig {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            label: None,
            journal_depth: 100,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_journal_depth(mut self, journal_depth: u64) -> Self {
        self.journal_depth = journal_depth;
        self
    }

    pub fn name(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("runes-{}", self.network))
    }

    pub fn validate(&self) -> Result<()> {
        if self.journal_depth == 0 {
            return Err(anyhow!("journal depth must be greater than 0"));
        }
        if matches!(&self.label, Some(label) if label.trim().is_empty()) {
            return Err(anyhow!("label must not be blank"));
        }
        Ok(())
    }

    /// The driver may only walk back as far as journals reach.
    pub fn validate_with(&self, sync: &SyncConfig) -> Result<()> {
        self.validate()?;
        sync.validate()?;
        if sync.max_reorg_depth > self.journal_depth {
            return Err(anyhow!(
                "max reorg depth {} exceeds journal depth {}",
                sync.max_reorg_depth,
                self.journal_depth
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_defaults_to_network() {
        assert_eq!(IndexerConfig::new(Network::Regtest).name(), "runes-regtest");
        assert_eq!(
            IndexerConfig::new(Network::Bitcoin).with_label("main").name(),
            "main"
        );
    }

    #[test]
    fn journal_must_cover_reorg_depth() {
        let config = IndexerConfig::new(Network::Regtest).with_journal_depth(10);
        assert!(config.validate().is_ok());
        assert!(config
            .validate_with(&SyncConfig::new().with_max_reorg_depth(10))
            .is_ok());
        assert!(config.validate_with(&SyncConfig::new()).is_err());
        assert!(IndexerConfig::new(Network::Regtest)
            .with_journal_depth(0)
            .validate()
            .is_err());
        assert!(IndexerConfig::new(Network::Regtest)
            .with_label(" ")
            .validate()
            .is_err());
    }
}
