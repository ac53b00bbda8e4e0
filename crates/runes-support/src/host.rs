use crate::balance_sheet::BalanceSheet;
use crate::rune_entry::RuneEntry;
use anyhow::Result;
use bitcoin::{BlockHash, OutPoint, Script, ScriptBuf, Txid};
use ordinals::{Rune, RuneId};
use serde::{Deserialize, Serialize};

/// What the indexer remembers about every output it has seen: enough to
/// check commitments made by a later spend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub script_pubkey: ScriptBuf,
    pub height: u64,
}

/// Indexed block header with the running digest of ledger changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedHeader {
    pub height: u64,
    pub hash: BlockHash,
    pub prev_hash: BlockHash,
    pub event_hash: [u8; 32],
    pub cumulative_event_hash: [u8; 32],
}

/// Rune activity of one transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuneTransaction {
    pub txid: Txid,
    pub height: u64,
    pub index: u32,
    pub mint: Option<(RuneId, u128)>,
    pub etching: Option<RuneId>,
    pub inputs: BalanceSheet,
    pub outputs: Vec<(u32, BalanceSheet)>,
    pub burned: BalanceSheet,
    pub cenotaph: bool,
}

/// Ledger repository the allocation engine reads and writes. Writes are
/// buffered until the block is committed; `checkpoint`/`commit`/`rollback`
/// nest inside that buffer.
pub trait RuneHost {
    fn checkpoint(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;

    fn rune_entry(&self, id: &RuneId) -> Result<Option<RuneEntry>>;
    fn save_rune_entry(&mut self, entry: &RuneEntry) -> Result<()>;
    fn rune_id_by_name(&self, rune: Rune) -> Result<Option<RuneId>>;
    /// Returns the next rune number and advances the counter.
    fn next_rune_number(&mut self) -> Result<u64>;

    fn balances_at(&self, outpoint: &OutPoint) -> Result<BalanceSheet>;
    fn balances_by_script(&self, script: &Script) -> Result<BalanceSheet>;
    /// Credits `sheet` to a new output and to its owner script.
    fn save_balances(&mut self, outpoint: &OutPoint, script: &Script, sheet: &BalanceSheet)
        -> Result<()>;
    /// Removes the balances of a spent output, debiting its owner script.
    fn spend_balances(&mut self, outpoint: &OutPoint) -> Result<BalanceSheet>;

    fn output(&self, outpoint: &OutPoint) -> Result<Option<OutputRecord>>;
    fn save_output(&mut self, outpoint: &OutPoint, record: &OutputRecord) -> Result<()>;
    fn remove_output(&mut self, outpoint: &OutPoint) -> Result<()>;

    fn save_transaction(&mut self, record: &RuneTransaction) -> Result<()>;
    fn record_etching(&mut self, height: u64, id: &RuneId) -> Result<()>;

    fn tip(&self) -> Result<Option<IndexedHeader>>;
    fn header_at(&self, height: u64) -> Result<Option<IndexedHeader>>;
    /// Stores `header` and makes it the tip.
    fn append_header(&mut self, header: &IndexedHeader) -> Result<()>;
}
