//! Per-block digest over every ledger change, chained block to block so two
//! indexers can compare state by comparing one hash.

use anyhow::Result;
use bitcoin::hashes::{sha256d, Hash, HashEngine};
use bitcoin::OutPoint;
use ordinals::RuneId;
use runes_support::balance_sheet::BalanceSheet;
use runes_support::host::RuneTransaction;
use runes_support::rune_entry::RuneEntry;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RuneEvent<'a> {
    Etching { entry: &'a RuneEntry },
    Mint { id: RuneId, amount: u128, mints: u128 },
    Credit { outpoint: OutPoint, balances: &'a BalanceSheet },
    Burn { id: RuneId, amount: u128 },
    Transaction { record: &'a RuneTransaction },
}

pub struct EventHasher {
    engine: <sha256d::Hash as Hash>::Engine,
    count: usize,
}

impl Default for EventHasher {
    fn default() -> Self {
        Self {
            engine: sha256d::Hash::engine(),
            count: 0,
        }
    }
}

impl EventHasher {
    pub fn record(&mut self, event: &RuneEvent) -> Result<()> {
        self.engine.input(&serde_json::to_vec(event)?);
        self.count += 1;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn finish(self) -> [u8; 32] {
        sha256d::Hash::from_engine(self.engine).to_byte_array()
    }

    /// `sha256d(previous || event_hash)`.
    pub fn chain(previous: &[u8; 32], event_hash: &[u8; 32]) -> [u8; 32] {
        let mut engine = sha256d::Hash::engine();
        engine.input(previous);
        engine.input(event_hash);
        sha256d::Hash::from_engine(engine).to_byte_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_matters() {
        let id = RuneId::new(1, 0).unwrap();
        let mut a = EventHasher::default();
        a.record(&RuneEvent::Burn { id, amount: 1 }).unwrap();
        a.record(&RuneEvent::Burn { id, amount: 2 }).unwrap();

        let mut b = EventHasher::default();
        b.record(&RuneEvent::Burn { id, amount: 2 }).unwrap();
        b.record(&RuneEvent::Burn { id, amount: 1 }).unwrap();

        assert_eq!(a.count(), 2);
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn empty_block_hash_is_stable() {
        assert_eq!(
            EventHasher::default().finish(),
            sha256d::Hash::hash(&[]).to_byte_array()
        );
        let zero = [0; 32];
        assert_eq!(
            EventHasher::chain(&zero, &zero),
            sha256d::Hash::hash(&[0; 64]).to_byte_array()
        );
    }
}
