//! Runes allocation engine: applies each transaction's runestone to the
//! ledger, moving balances from spent outputs to new ones, minting, etching
//! and burning.

pub mod event;
pub mod ledger;
pub mod stats;
pub mod tables;

use anyhow::Result;
use bitcoin::{Block, Network, OutPoint, Transaction, Txid};
use log::debug;
use ordinals::{Rune, RuneId, Runestone, RunestoneEtching, SpacedRune, COMMIT_CONFIRMATIONS};
use runes_support::balance_sheet::BalanceSheet;
use runes_support::host::{OutputRecord, RuneHost, RuneTransaction};
use runes_support::rune_entry::RuneEntry;
use runes_support::RunesError;
use std::collections::BTreeMap;

pub use event::{EventHasher, RuneEvent};
pub use ledger::AtomicLedger;
pub use stats::BlockStats;

/// Mainnet blocks whose coinbase reuses the txid of an earlier coinbase.
pub const DUPLICATE_COINBASE_HEIGHTS: [u64; 2] = [91_842, 91_880];

pub fn default_output(tx: &Transaction) -> Option<usize> {
    tx.output
        .iter()
        .position(|output| !output.script_pubkey.is_op_return())
}

pub fn non_op_return_outputs(tx: &Transaction) -> Vec<usize> {
    tx.output
        .iter()
        .enumerate()
        .filter(|(_, output)| !output.script_pubkey.is_op_return())
        .map(|(vout, _)| vout)
        .collect()
}

/// vout : the vout to transfer runes to
/// amount : the amount to transfer to the vout
/// max_amount : max amount available to transfer
///
/// `vout == tx.output.len()` targets every non-OP_RETURN output. There an
/// amount of zero splits `max_amount` evenly with the remainder going to the
/// earliest outputs, and a non-zero amount is handed to each output in turn
/// until `max_amount` runs out. Zero transfers are left out.
pub fn handle_transfer_runes_to_vout(
    vout: usize,
    amount: u128,
    max_amount: u128,
    tx: &Transaction,
) -> Vec<(usize, u128)> {
    let mut transfers = Vec::new();
    if vout == tx.output.len() {
        let destinations = non_op_return_outputs(tx);
        if destinations.is_empty() {
            return transfers;
        }
        if amount == 0 {
            let count = destinations.len() as u128;
            let each = max_amount / count;
            let remainder = max_amount % count;
            for (i, output) in destinations.into_iter().enumerate() {
                transfers.push((output, each + u128::from((i as u128) < remainder)));
            }
        } else {
            let mut remaining = max_amount;
            for output in destinations {
                let share = amount.min(remaining);
                remaining -= share;
                transfers.push((output, share));
            }
        }
    } else {
        let share = if amount == 0 {
            max_amount
        } else {
            amount.min(max_amount)
        };
        transfers.push((vout, share));
    }
    transfers.retain(|(_, share)| *share > 0);
    transfers
}

/// Whether `tx` reveals `commitment` in a tapscript spending a taproot
/// output with at least [`COMMIT_CONFIRMATIONS`] confirmations at `height`.
pub fn validate_rune_etch<H: RuneHost>(
    host: &H,
    tx: &Transaction,
    commitment: &[u8],
    height: u64,
) -> Result<bool> {
    for input in &tx.input {
        // a tapscript in the witness does not mean the spent output was
        // taproot; that is checked against the stored output below
        let Some(tapscript) = input.witness.tapscript() else {
            continue;
        };

        for instruction in tapscript.instructions() {
            let Ok(instruction) = instruction else {
                break;
            };

            let Some(pushbytes) = instruction.push_bytes() else {
                continue;
            };

            if pushbytes.as_bytes() != commitment {
                continue;
            }

            let Some(output) = host.output(&input.previous_output)? else {
                continue;
            };

            if !output.script_pubkey.is_p2tr() {
                continue;
            }

            let Some(confirmations) = height
                .checked_sub(output.height)
                .map(|depth| depth + 1)
            else {
                continue;
            };

            if confirmations >= u64::from(COMMIT_CONFIRMATIONS) {
                return Ok(true);
            }
        }
    }

    Ok(false)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOutcome {
    pub stats: BlockStats,
    pub event_hash: [u8; 32],
}

/// Indexes every transaction of `block` at `height` into `host`.
pub fn index_block<H: RuneHost>(
    host: &mut H,
    network: Network,
    height: u64,
    block: &Block,
) -> Result<BlockOutcome> {
    RuneUpdater::new(host, network, height, u64::from(block.header.time)).index_block(block)
}

pub struct RuneUpdater<'a, H: RuneHost> {
    host: &'a mut H,
    network: Network,
    height: u64,
    block_time: u64,
    minimum: Rune,
    burned: BTreeMap<RuneId, u128>,
    events: EventHasher,
    stats: BlockStats,
}

impl<'a, H: RuneHost> RuneUpdater<'a, H> {
    pub fn new(host: &'a mut H, network: Network, height: u64, block_time: u64) -> Self {
        Self {
            host,
            network,
            height,
            block_time,
            minimum: Rune::minimum_at_height(network, u32::try_from(height).unwrap_or(u32::MAX)),
            burned: BTreeMap::new(),
            events: EventHasher::default(),
            stats: BlockStats::new(height),
        }
    }

    pub fn index_block(mut self, block: &Block) -> Result<BlockOutcome> {
        for (index, tx) in block.txdata.iter().enumerate() {
            self.index_transaction(u32::try_from(index)?, tx)?;
        }
        self.update()?;
        self.stats.events = self.events.count();
        Ok(BlockOutcome {
            stats: self.stats,
            event_hash: self.events.finish(),
        })
    }

    pub fn index_transaction(&mut self, tx_index: u32, tx: &Transaction) -> Result<()> {
        let txid = tx.compute_txid();
        self.stats.transactions += 1;

        let runestone = Runestone::decipher(tx);

        let inputs = self.unallocated(tx)?;
        let mut unallocated = inputs.clone();
        let mut allocated = vec![BalanceSheet::default(); tx.output.len()];
        let mut mint = None;
        let mut etched = None;

        if let Some(runestone) = &runestone {
            self.stats.runestones += 1;

            if runestone.cenotaph {
                self.stats.cenotaphs += 1;
                debug!(
                    "cenotaph in {txid}: {}",
                    runestone
                        .flaws
                        .iter()
                        .map(|flaw| flaw.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }

            if let Some(id) = runestone.mint {
                if let Some(amount) = self.mint(id)? {
                    unallocated.increase(&id, amount)?;
                    mint = Some((id, amount));
                }
            }

            etched = self.etched(tx_index, tx, runestone)?;

            if !runestone.cenotaph {
                let etching = runestone
                    .etching
                    .as_ref()
                    .and_then(RunestoneEtching::full);

                if let (Some((id, _)), Some(etching)) = (etched, etching) {
                    unallocated.increase(&id, etching.premine.unwrap_or_default())?;
                }

                for edict in &runestone.edicts {
                    self.stats.edicts += 1;

                    // the zero id refers to the rune etched by this transaction
                    let id = if edict.id == RuneId::default() {
                        let Some((id, _)) = etched else {
                            continue;
                        };
                        id
                    } else {
                        edict.id
                    };

                    let balance = unallocated.get(&id);
                    if balance == 0 {
                        continue;
                    }

                    let output = usize::try_from(edict.output)?;
                    for (vout, amount) in
                        handle_transfer_runes_to_vout(output, edict.amount, balance, tx)
                    {
                        unallocated.decrease(&id, amount)?;
                        allocated[vout].increase(&id, amount)?;
                    }
                }
            }

            if let Some((id, rune)) = etched {
                self.create_rune_entry(txid, runestone, id, rune)?;
            }
        }

        let cenotaph = runestone.as_ref().map_or(false, |runestone| runestone.cenotaph);
        let mut burned = BalanceSheet::default();

        if cenotaph {
            unallocated.pipe(&mut burned)?;
        } else {
            let pointer = runestone
                .as_ref()
                .and_then(|runestone| runestone.pointer)
                .map(usize::try_from)
                .transpose()?;

            // an OP_RETURN pointer target is burned at settlement below
            match pointer.or_else(|| default_output(tx)) {
                Some(vout) => unallocated.pipe(&mut allocated[vout])?,
                None => unallocated.pipe(&mut burned)?,
            }
        }

        let mut outputs = Vec::new();
        for (vout, balances) in allocated.into_iter().enumerate() {
            if balances.is_empty() {
                continue;
            }

            let output = &tx.output[vout];
            if output.script_pubkey.is_op_return() {
                balances.pipe(&mut burned)?;
                continue;
            }

            let outpoint = OutPoint {
                txid,
                vout: u32::try_from(vout)?,
            };
            self.host
                .save_balances(&outpoint, &output.script_pubkey, &balances)?;
            self.events.record(&RuneEvent::Credit {
                outpoint,
                balances: &balances,
            })?;
            self.stats.outputs_credited += 1;
            outputs.push((outpoint.vout, balances));
        }

        for (id, amount) in burned.iter() {
            let total = self.burned.entry(*id).or_default();
            *total = total
                .checked_add(*amount)
                .ok_or(RunesError::OverflowU128)?;
        }

        for input in &tx.input {
            if !input.previous_output.is_null() {
                self.host.remove_output(&input.previous_output)?;
            }
        }
        self.record_outputs(tx_index, txid, tx)?;

        if runestone.is_some() || !inputs.is_empty() {
            let record = RuneTransaction {
                txid,
                height: self.height,
                index: tx_index,
                mint,
                etching: etched.map(|(id, _)| id),
                inputs,
                outputs,
                burned,
                cenotaph,
            };
            self.host.save_transaction(&record)?;
            self.events.record(&RuneEvent::Transaction { record: &record })?;
        }

        Ok(())
    }

    fn unallocated(&mut self, tx: &Transaction) -> Result<BalanceSheet> {
        let mut unallocated = BalanceSheet::default();
        for input in &tx.input {
            if input.previous_output.is_null() {
                continue;
            }
            self.host
                .spend_balances(&input.previous_output)?
                .pipe(&mut unallocated)?;
        }
        Ok(unallocated)
    }

    fn mint(&mut self, id: RuneId) -> Result<Option<u128>> {
        let Some(mut entry) = self.host.rune_entry(&id)? else {
            return Ok(None);
        };

        let amount = match entry.mintable_amount(self.height) {
            Ok(amount) => amount,
            Err(err) => {
                debug!("mint of {id} at {} rejected: {err}", self.height);
                return Ok(None);
            }
        };

        entry.mints += 1;

        if entry.is_cap_reached() {
            entry.completed_at = Some(self.block_time);
            entry.completed_at_height = Some(self.height);
        }

        self.host.save_rune_entry(&entry)?;
        self.events.record(&RuneEvent::Mint {
            id,
            amount,
            mints: entry.mints,
        })?;
        self.stats.mints += 1;

        Ok(Some(amount))
    }

    fn etched(
        &self,
        tx_index: u32,
        tx: &Transaction,
        runestone: &Runestone,
    ) -> Result<Option<(RuneId, Rune)>> {
        let Some(etching) = &runestone.etching else {
            return Ok(None);
        };

        let rune = if let Some(rune) = etching.rune() {
            if rune < self.minimum
                || rune.is_reserved()
                || self.host.rune_id_by_name(rune)?.is_some()
                || !validate_rune_etch(&*self.host, tx, &rune.commitment(), self.height)?
            {
                return Ok(None);
            }
            rune
        } else if runestone.cenotaph {
            return Ok(None);
        } else {
            Rune::reserved(self.height, tx_index)
        };

        Ok(Some((
            RuneId {
                block: self.height,
                tx: tx_index,
            },
            rune,
        )))
    }

    fn create_rune_entry(
        &mut self,
        txid: Txid,
        runestone: &Runestone,
        id: RuneId,
        rune: Rune,
    ) -> Result<()> {
        let number = self.host.next_rune_number()?;

        let entry = match runestone.etching.as_ref().and_then(RunestoneEtching::full) {
            Some(etching) if !runestone.cenotaph => RuneEntry {
                rune_id: id,
                number,
                divisibility: etching.divisibility.unwrap_or_default(),
                premine: etching.premine.unwrap_or_default(),
                spaced_rune: SpacedRune::new(rune, etching.spacers.unwrap_or_default()),
                symbol: etching.symbol,
                terms: etching.terms,
                turbo: etching.turbo,
                etching_tx_hash: txid,
                etched_at: self.block_time,
                etching_block: self.height,
                mints: 0,
                burned_amount: 0,
                completed_at: None,
                completed_at_height: None,
            },
            _ => RuneEntry::blank(id, number, SpacedRune::new(rune, 0), txid, self.block_time),
        };

        self.host.save_rune_entry(&entry)?;
        self.host.record_etching(self.height, &id)?;
        self.events.record(&RuneEvent::Etching { entry: &entry })?;
        self.stats.etchings.push((id, entry.spaced_rune));

        debug!(
            "etched {} {} as {id} (#{number})",
            entry.symbol_or_default(),
            entry.spaced_rune
        );

        Ok(())
    }

    fn record_outputs(&mut self, tx_index: u32, txid: Txid, tx: &Transaction) -> Result<()> {
        if tx_index == 0
            && self.network == Network::Bitcoin
            && DUPLICATE_COINBASE_HEIGHTS.contains(&self.height)
        {
            return Ok(());
        }

        for (vout, output) in tx.output.iter().enumerate() {
            // only taproot outputs can carry a rune commitment
            if !output.script_pubkey.is_p2tr() {
                continue;
            }
            self.host.save_output(
                &OutPoint {
                    txid,
                    vout: u32::try_from(vout)?,
                },
                &OutputRecord {
                    script_pubkey: output.script_pubkey.clone(),
                    height: self.height,
                },
            )?;
        }

        Ok(())
    }

    /// Adds this block's burns to the rune entries.
    fn update(&mut self) -> Result<()> {
        for (id, amount) in std::mem::take(&mut self.burned) {
            let Some(mut entry) = self.host.rune_entry(&id)? else {
                return Err(RunesError::NotFound(format!("rune entry {id}")).into());
            };
            entry.burned_amount = entry
                .burned_amount
                .checked_add(amount)
                .ok_or(RunesError::OverflowU128)?;
            self.host.save_rune_entry(&entry)?;
            self.events.record(&RuneEvent::Burn { id, amount })?;
            self.stats.burned.insert(id, amount);
        }
        Ok(())
    }
}
