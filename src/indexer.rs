use crate::logging::log_block_summary;
use crate::{IndexedBlock, IndexerConfig};
use anyhow::{anyhow, Context, Result};
use log::info;
use runes::{index_block, AtomicLedger, BlockStats, EventHasher};
use runes_support::host::{IndexedHeader, RuneHost};
use runes_support::store::KeyValueStore;
use runes_sync::{async_trait, BlockHeader, Processor, SyncError, SyncResult};
use std::sync::Arc;
use std::time::Instant;

/// Indexes blocks into a [`KeyValueStore`], one atomic write per block.
pub struct RunesIndexer<S: KeyValueStore> {
    ledger: AtomicLedger<S>,
    config: IndexerConfig,
    name: String,
}

impl<S: KeyValueStore> RunesIndexer<S> {
    /// Opens the ledger in `store`, stamping it with the configured network
    /// on first use.
    pub fn new(store: Arc<S>, config: IndexerConfig) -> Result<Self> {
        config.validate()?;
        let mut ledger = AtomicLedger::new(store);
        let network = config.network.to_string();
        match ledger.network()? {
            None => ledger.init_network(&network)?,
            Some(stored) if stored == network => {}
            Some(stored) => {
                return Err(anyhow!(
                    "store was indexed for {stored}, configured for {network}"
                ))
            }
        }
        Ok(Self {
            ledger,
            name: config.name(),
            config,
        })
    }

    pub fn ledger(&self) -> &AtomicLedger<S> {
        &self.ledger
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Applies `block` on top of the current tip and persists it.
    pub fn index_block(&mut self, block: &IndexedBlock) -> Result<BlockStats> {
        let started = Instant::now();
        let height = block.header.height;
        let tip = self.ledger.tip()?;

        if let Some(tip) = &tip {
            if tip.height + 1 != height || tip.hash != block.header.prev_hash {
                return Err(anyhow!(
                    "block {} ({}) does not extend tip {} ({})",
                    height,
                    block.header.hash,
                    tip.height,
                    tip.hash
                ));
            }
        }

        self.ledger.checkpoint()?;
        let (header, stats) = match self.apply(block, tip.as_ref()) {
            Ok(applied) => applied,
            Err(err) => {
                self.ledger.rollback()?;
                return Err(err.context(format!("indexing block {height}")));
            }
        };
        self.ledger.commit()?;
        self.ledger
            .flush(height)
            .with_context(|| format!("writing block {height}"))?;

        log_block_summary(&stats, &header, started.elapsed());
        Ok(stats)
    }

    fn apply(
        &mut self,
        block: &IndexedBlock,
        tip: Option<&IndexedHeader>,
    ) -> Result<(IndexedHeader, BlockStats)> {
        let height = block.header.height;
        let outcome = index_block(&mut self.ledger, self.config.network, height, &block.block)?;

        let previous = tip.map_or([0; 32], |tip| tip.cumulative_event_hash);
        let header = IndexedHeader {
            height,
            hash: block.header.hash,
            prev_hash: block.header.prev_hash,
            event_hash: outcome.event_hash,
            cumulative_event_hash: EventHasher::chain(&previous, &outcome.event_hash),
        };
        self.ledger.append_header(&header)?;

        // the deletion is journaled under this height, so reverting this
        // block brings the old journal back
        if let Some(stale) = height.checked_sub(self.config.journal_depth) {
            self.ledger.prune_journal(stale)?;
        }

        Ok((header, outcome.stats))
    }

    /// Checks the network marker and that the tip links to its parent
    /// through both the block hash and the cumulative event hash.
    pub fn check_consistency(&self) -> Result<()> {
        let network = self.config.network.to_string();
        match self.ledger.network()? {
            Some(stored) if stored == network => {}
            stored => {
                return Err(anyhow!(
                    "network marker {stored:?} does not match {network}"
                ))
            }
        }

        let Some(tip) = self.ledger.tip()? else {
            return Ok(());
        };

        if self.ledger.header_at(tip.height)?.as_ref() != Some(&tip) {
            return Err(anyhow!("tip {} is not stored at its height", tip.height));
        }

        let previous = match tip.height.checked_sub(1) {
            Some(parent) => {
                let parent = self
                    .ledger
                    .header_at(parent)?
                    .ok_or_else(|| anyhow!("missing header {parent} below tip"))?;
                if parent.hash != tip.prev_hash {
                    return Err(anyhow!(
                        "tip {} does not link to header {}",
                        tip.height,
                        parent.height
                    ));
                }
                parent.cumulative_event_hash
            }
            None => [0; 32],
        };

        if EventHasher::chain(&previous, &tip.event_hash) != tip.cumulative_event_hash {
            return Err(anyhow!(
                "cumulative event hash mismatch at {}",
                tip.height
            ));
        }

        Ok(())
    }
}

fn block_header(header: IndexedHeader) -> BlockHeader {
    BlockHeader {
        height: header.height,
        hash: header.hash,
        prev_hash: header.prev_hash,
    }
}

#[async_trait]
impl<S: KeyValueStore + 'static> Processor<IndexedBlock> for RunesIndexer<S> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&mut self, inputs: Vec<IndexedBlock>) -> SyncResult<()> {
        for block in &inputs {
            self.index_block(block)
                .map_err(|err| SyncError::Persist {
                    height: block.header.height,
                    reason: format!("{err:#}"),
                })?;
        }
        Ok(())
    }

    async fn current_block(&self) -> SyncResult<BlockHeader> {
        self.ledger
            .tip()?
            .map(block_header)
            .ok_or_else(|| SyncError::NotFound("no block indexed yet".into()))
    }

    async fn get_indexed_block(&self, height: u64) -> SyncResult<BlockHeader> {
        self.ledger
            .header_at(height)?
            .map(block_header)
            .ok_or_else(|| SyncError::NotFound(format!("block {height} not indexed")))
    }

    async fn revert_data(&mut self, from_height: u64) -> SyncResult<()> {
        let reverted = self
            .ledger
            .revert_to(from_height)
            .map_err(|err| SyncError::Persist {
                height: from_height,
                reason: format!("revert failed: {err:#}"),
            })?;
        info!(
            "{}: reverted {} block(s) from height {from_height}",
            self.name,
            reverted.len()
        );
        Ok(())
    }

    async fn verify_states(&self) -> SyncResult<()> {
        Ok(self.check_consistency()?)
    }

    async fn shutdown(&mut self) -> SyncResult<()> {
        let tip = self.ledger.tip()?;
        info!(
            "{}: stopped at {}",
            self.name,
            tip.map_or_else(|| "genesis".to_string(), |tip| tip.height.to_string())
        );
        Ok(())
    }
}
