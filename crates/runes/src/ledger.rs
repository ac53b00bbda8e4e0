use crate::tables::RuneTable;
use anyhow::{anyhow, Result};
use bitcoin::hashes::Hash;
use bitcoin::{OutPoint, Script, Txid};
use log::debug;
use ordinals::{Rune, RuneId};
use runes_support::balance_sheet::BalanceSheet;
use runes_support::host::{IndexedHeader, OutputRecord, RuneHost, RuneTransaction};
use runes_support::index_pointer::{AtomicPointer, IndexPointer, KeyValuePointer};
use runes_support::journal::UndoJournal;
use runes_support::rune_entry::RuneEntry;
use runes_support::store::KeyValueStore;
use runes_support::utils::outpoint_encode;
use runes_support::RunesError;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

pub fn rune_id_key(id: &RuneId) -> Vec<u8> {
    let mut key = id.block.to_be_bytes().to_vec();
    key.extend_from_slice(&id.tx.to_be_bytes());
    key
}

pub fn rune_id_from_key(bytes: &[u8]) -> Result<RuneId> {
    let block: [u8; 8] = bytes
        .get(0..8)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| RunesError::Decode("rune id key".into()))?;
    let tx: [u8; 4] = bytes
        .get(8..12)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| RunesError::Decode("rune id key".into()))?;
    let (block, tx) = (u64::from_be_bytes(block), u32::from_be_bytes(tx));
    RuneId::new(block, tx)
        .ok_or_else(|| RunesError::Decode(format!("rune id {block}:{tx}")).into())
}

/// [`RuneHost`] backed by an [`AtomicPointer`]: every write stays buffered
/// until [`AtomicLedger::flush`] persists the block together with its undo
/// journal.
pub struct AtomicLedger<S: KeyValueStore> {
    atomic: AtomicPointer<S>,
    table: RuneTable,
}

impl<S: KeyValueStore> AtomicLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            atomic: AtomicPointer::new(store),
            table: RuneTable::new(),
        }
    }

    pub fn table(&self) -> &RuneTable {
        &self.table
    }

    fn ptr(&self, pointer: &IndexPointer) -> AtomicPointer<S> {
        self.atomic.derive(pointer)
    }

    fn get_json<T: DeserializeOwned>(&self, pointer: &IndexPointer) -> Result<Option<T>> {
        let bytes = self.ptr(pointer).get()?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&bytes).map_err(|e| {
            RunesError::Decode(format!(
                "{}: {e}",
                String::from_utf8_lossy(&pointer.unwrap())
            ))
        })?))
    }

    fn set_json<T: Serialize>(&mut self, pointer: &IndexPointer, value: &T) -> Result<()> {
        self.ptr(pointer).set(Arc::new(serde_json::to_vec(value)?))
    }

    /// Persists the pending block writes, journaled under `height`.
    pub fn flush(&mut self, height: u64) -> Result<usize> {
        let journal = self.table.journal_at(height);
        self.atomic.flush(Some(&journal))
    }

    /// Drops the undo journal of `height`; that block can no longer be
    /// reverted.
    pub fn prune_journal(&mut self, height: u64) -> Result<()> {
        let journal = self.table.journal_at(height);
        self.ptr(&journal).delete()
    }

    pub fn network(&self) -> Result<Option<String>> {
        let bytes = self.ptr(&self.table.NETWORK).get()?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8(bytes.to_vec())?))
    }

    /// Writes the network marker straight to the store.
    pub fn init_network(&mut self, network: &str) -> Result<()> {
        let mut pointer = self.ptr(&self.table.NETWORK);
        pointer.set(Arc::new(network.as_bytes().to_vec()))?;
        self.atomic.flush(None)?;
        Ok(())
    }

    /// Undoes every indexed block at or above `height`, newest first, and
    /// returns the reverted heights.
    pub fn revert_to(&mut self, height: u64) -> Result<Vec<u64>> {
        if self.atomic.checkpoint_depth()? != 1 {
            return Err(anyhow!("revert with open checkpoints"));
        }
        let store = self.atomic.store().clone();
        let mut reverted = Vec::new();
        while let Some(tip) = self.tip()? {
            if tip.height < height {
                break;
            }
            let journal_key = self.table.journal_at(tip.height).unwrap();
            let bytes = store.get(&journal_key)?.ok_or_else(|| {
                anyhow!("no undo journal for height {}, cannot revert", tip.height)
            })?;
            let mut batch = UndoJournal::decode(&bytes)?.undo_batch();
            batch.delete(journal_key.to_vec());
            debug!("reverting height {} ({} writes)", tip.height, batch.len());
            store.write(batch)?;
            reverted.push(tip.height);

            if let Some(next) = self.tip()? {
                if next.height >= tip.height {
                    return Err(anyhow!(
                        "tip did not move below {} after revert",
                        tip.height
                    ));
                }
            }
        }
        Ok(reverted)
    }

    pub fn runes_etched_at(&self, height: u64) -> Result<Vec<RuneId>> {
        self.ptr(&self.table.HEIGHT_TO_RUNE_IDS.select(&height.to_be_bytes()))
            .get_list()?
            .iter()
            .map(|bytes| rune_id_from_key(bytes))
            .collect()
    }

    pub fn transaction(&self, txid: &Txid) -> Result<Option<RuneTransaction>> {
        self.get_json(&self.table.TXID_TO_TRANSACTION.select(&txid.to_byte_array()))
    }

    pub fn rune_count(&self) -> Result<u64> {
        self.ptr(&self.table.RUNE_COUNT).get_value::<u64>()
    }

    fn outpoint_script(&self, outpoint_key: &[u8]) -> Result<Vec<u8>> {
        Ok(self
            .ptr(&self.table.OUTPOINT_TO_RUNES.select(outpoint_key).keyword("/script"))
            .get()?
            .to_vec())
    }
}

impl<S: KeyValueStore> RuneHost for AtomicLedger<S> {
    fn checkpoint(&mut self) -> Result<()> {
        self.atomic.checkpoint()
    }

    fn commit(&mut self) -> Result<()> {
        self.atomic.commit()
    }

    fn rollback(&mut self) -> Result<()> {
        self.atomic.rollback()
    }

    fn rune_entry(&self, id: &RuneId) -> Result<Option<RuneEntry>> {
        let bytes = self
            .ptr(&self.table.RUNE_ID_TO_ENTRY.select(&rune_id_key(id)))
            .get()?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(RuneEntry::from_bytes(&bytes)?))
    }

    fn save_rune_entry(&mut self, entry: &RuneEntry) -> Result<()> {
        let key = rune_id_key(&entry.rune_id);
        self.ptr(&self.table.RUNE_ID_TO_ENTRY.select(&key))
            .set(Arc::new(entry.to_bytes()?))?;
        self.ptr(
            &self
                .table
                .RUNE_TO_RUNE_ID
                .select(&entry.spaced_rune.rune.0.to_le_bytes()),
        )
        .set(Arc::new(key))
    }

    fn rune_id_by_name(&self, rune: Rune) -> Result<Option<RuneId>> {
        let bytes = self
            .ptr(&self.table.RUNE_TO_RUNE_ID.select(&rune.0.to_le_bytes()))
            .get()?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(rune_id_from_key(&bytes)?))
    }

    fn next_rune_number(&mut self) -> Result<u64> {
        let mut counter = self.ptr(&self.table.RUNE_COUNT);
        let number = counter.get_value::<u64>()?;
        counter.set_value::<u64>(number + 1)?;
        Ok(number)
    }

    fn balances_at(&self, outpoint: &OutPoint) -> Result<BalanceSheet> {
        let bytes = self
            .ptr(&self.table.OUTPOINT_TO_RUNES.select(&outpoint_encode(outpoint)?))
            .get()?;
        Ok(BalanceSheet::decode(&bytes)?)
    }

    fn balances_by_script(&self, script: &Script) -> Result<BalanceSheet> {
        let bytes = self
            .ptr(&self.table.SCRIPT_TO_RUNES.select(script.as_bytes()))
            .get()?;
        Ok(BalanceSheet::decode(&bytes)?)
    }

    fn save_balances(
        &mut self,
        outpoint: &OutPoint,
        script: &Script,
        sheet: &BalanceSheet,
    ) -> Result<()> {
        if sheet.is_empty() {
            return Ok(());
        }
        let key = outpoint_encode(outpoint)?;
        let merged = self.balances_at(outpoint)?.merge(sheet)?;
        self.ptr(&self.table.OUTPOINT_TO_RUNES.select(&key))
            .set(Arc::new(merged.encode()))?;
        self.ptr(&self.table.OUTPOINT_TO_RUNES.select(&key).keyword("/script"))
            .set(Arc::new(script.as_bytes().to_vec()))?;

        let owned = self.balances_by_script(script)?.merge(sheet)?;
        self.ptr(&self.table.SCRIPT_TO_RUNES.select(script.as_bytes()))
            .set(Arc::new(owned.encode()))
    }

    fn spend_balances(&mut self, outpoint: &OutPoint) -> Result<BalanceSheet> {
        let key = outpoint_encode(outpoint)?;
        let sheet = self.balances_at(outpoint)?;
        if sheet.is_empty() {
            return Ok(sheet);
        }

        let script = self.outpoint_script(&key)?;
        let mut owned = BalanceSheet::decode(
            &self
                .ptr(&self.table.SCRIPT_TO_RUNES.select(&script))
                .get()?,
        )?;
        for (id, amount) in sheet.iter() {
            owned.decrease(id, *amount)?;
        }
        let mut owner = self.ptr(&self.table.SCRIPT_TO_RUNES.select(&script));
        if owned.is_empty() {
            owner.delete()?;
        } else {
            owner.set(Arc::new(owned.encode()))?;
        }

        self.ptr(&self.table.OUTPOINT_TO_RUNES.select(&key)).delete()?;
        self.ptr(&self.table.OUTPOINT_TO_RUNES.select(&key).keyword("/script"))
            .delete()?;
        Ok(sheet)
    }

    fn output(&self, outpoint: &OutPoint) -> Result<Option<OutputRecord>> {
        self.get_json(&self.table.OUTPOINT_TO_OUTPUT.select(&outpoint_encode(outpoint)?))
    }

    fn save_output(&mut self, outpoint: &OutPoint, record: &OutputRecord) -> Result<()> {
        let pointer = self.table.OUTPOINT_TO_OUTPUT.select(&outpoint_encode(outpoint)?);
        self.set_json(&pointer, record)
    }

    fn remove_output(&mut self, outpoint: &OutPoint) -> Result<()> {
        self.ptr(&self.table.OUTPOINT_TO_OUTPUT.select(&outpoint_encode(outpoint)?))
            .delete()
    }

    fn save_transaction(&mut self, record: &RuneTransaction) -> Result<()> {
        let pointer = self
            .table
            .TXID_TO_TRANSACTION
            .select(&record.txid.to_byte_array());
        self.set_json(&pointer, record)
    }

    fn record_etching(&mut self, height: u64, id: &RuneId) -> Result<()> {
        self.ptr(&self.table.HEIGHT_TO_RUNE_IDS.select(&height.to_be_bytes()))
            .append(Arc::new(rune_id_key(id)))
    }

    fn tip(&self) -> Result<Option<IndexedHeader>> {
        self.get_json(&self.table.TIP)
    }

    fn header_at(&self, height: u64) -> Result<Option<IndexedHeader>> {
        self.get_json(&self.table.header_at(height))
    }

    fn append_header(&mut self, header: &IndexedHeader) -> Result<()> {
        let at = self.table.header_at(header.height);
        self.set_json(&at, header)?;
        let tip = self.table.TIP.clone();
        self.set_json(&tip, header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::{BlockHash, ScriptBuf};
    use runes_support::store::{MemStore, WriteBatch};

    fn ledger() -> (Arc<MemStore>, AtomicLedger<MemStore>) {
        let store = Arc::new(MemStore::new());
        (store.clone(), AtomicLedger::new(store))
    }

    fn outpoint(n: u8) -> OutPoint {
        OutPoint {
            txid: Txid::from_byte_array([n; 32]),
            vout: 0,
        }
    }

    fn header(height: u64) -> IndexedHeader {
        IndexedHeader {
            height,
            hash: BlockHash::from_byte_array([height as u8 + 1; 32]),
            prev_hash: BlockHash::from_byte_array([height as u8; 32]),
            event_hash: [0; 32],
            cumulative_event_hash: [0; 32],
        }
    }

    #[test]
    fn rune_id_keys_sort_by_id() {
        let a = rune_id_key(&RuneId::new(1, 300).unwrap());
        let b = rune_id_key(&RuneId::new(2, 0).unwrap());
        assert!(a < b);
        assert_eq!(rune_id_from_key(&a).unwrap(), RuneId::new(1, 300).unwrap());
        assert!(rune_id_from_key(&a[..11]).is_err());
    }

    #[test]
    fn owner_script_projection_follows_spends() {
        let (_, mut ledger) = ledger();
        let id = RuneId::new(5, 1).unwrap();
        let script = ScriptBuf::from_bytes(vec![0x51, 0x20, 7]);
        let sheet = BalanceSheet::from_pairs(vec![id], vec![10]).unwrap();

        ledger.save_balances(&outpoint(1), &script, &sheet).unwrap();
        ledger.save_balances(&outpoint(2), &script, &sheet).unwrap();
        assert_eq!(ledger.balances_by_script(&script).unwrap().get(&id), 20);

        assert_eq!(ledger.spend_balances(&outpoint(1)).unwrap(), sheet);
        assert_eq!(ledger.balances_by_script(&script).unwrap().get(&id), 10);
        assert!(ledger.balances_at(&outpoint(1)).unwrap().is_empty());

        ledger.spend_balances(&outpoint(2)).unwrap();
        assert!(ledger.balances_by_script(&script).unwrap().is_empty());
        assert!(ledger.spend_balances(&outpoint(3)).unwrap().is_empty());
    }

    #[test]
    fn revert_restores_previous_blocks() {
        let (store, mut ledger) = ledger();

        ledger.append_header(&header(0)).unwrap();
        ledger.next_rune_number().unwrap();
        ledger.flush(0).unwrap();
        let after_zero = store.snapshot().unwrap();

        ledger.append_header(&header(1)).unwrap();
        ledger.next_rune_number().unwrap();
        ledger.flush(1).unwrap();

        ledger.append_header(&header(2)).unwrap();
        ledger.next_rune_number().unwrap();
        ledger.flush(2).unwrap();

        assert_eq!(ledger.rune_count().unwrap(), 3);
        assert_eq!(ledger.revert_to(1).unwrap(), vec![2, 1]);
        assert_eq!(ledger.tip().unwrap().map(|h| h.height), Some(0));
        assert_eq!(ledger.rune_count().unwrap(), 1);
        assert_eq!(store.snapshot().unwrap(), after_zero);
    }

    #[test]
    fn revert_without_journal_fails() {
        let (store, mut ledger) = ledger();
        ledger.append_header(&header(0)).unwrap();
        ledger.flush(0).unwrap();
        ledger.append_header(&header(1)).unwrap();
        ledger.flush(1).unwrap();

        let mut batch = WriteBatch::default();
        batch.delete(ledger.table().journal_at(0).unwrap().to_vec());
        store.write(batch).unwrap();

        assert_eq!(ledger.revert_to(1).unwrap(), vec![1]);
        assert!(ledger.revert_to(0).is_err());
    }

    #[test]
    fn pruned_journal_comes_back_on_revert() {
        let (store, mut ledger) = ledger();
        ledger.append_header(&header(0)).unwrap();
        ledger.flush(0).unwrap();
        ledger.append_header(&header(1)).unwrap();
        ledger.prune_journal(0).unwrap();
        ledger.flush(1).unwrap();

        let journal_zero = ledger.table().journal_at(0).unwrap().to_vec();
        assert_eq!(store.get(&journal_zero).unwrap(), None);
        ledger.revert_to(1).unwrap();
        assert!(store.get(&journal_zero).unwrap().is_some());
    }

    #[test]
    fn etched_ids_by_height() {
        let (_, mut ledger) = ledger();
        let a = RuneId::new(7, 1).unwrap();
        let b = RuneId::new(7, 4).unwrap();
        ledger.record_etching(7, &a).unwrap();
        ledger.record_etching(7, &b).unwrap();
        assert_eq!(ledger.runes_etched_at(7).unwrap(), vec![a, b]);
        assert!(ledger.runes_etched_at(8).unwrap().is_empty());
    }

    #[test]
    fn network_marker() {
        let (store, mut ledger) = ledger();
        assert_eq!(ledger.network().unwrap(), None);
        ledger.init_network("regtest").unwrap();
        assert_eq!(store.get(b"/network").unwrap(), Some(b"regtest".to_vec()));
        assert_eq!(ledger.network().unwrap().as_deref(), Some("regtest"));
    }
}
