use crate::utils::{decode_varint_list, encode_varint_list};
use crate::{RunesError, RunesResult};
use ordinals::RuneId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rune amounts held by one output (or pending for one transaction).
/// Zero balances are never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub balances: BTreeMap<RuneId, u128>,
}

impl BalanceSheet {
    pub fn get(&self, rune: &RuneId) -> u128 {
        self.balances.get(rune).copied().unwrap_or_default()
    }

    pub fn set(&mut self, rune: &RuneId, amount: u128) {
        if amount == 0 {
            self.balances.remove(rune);
        } else {
            self.balances.insert(*rune, amount);
        }
    }

    pub fn increase(&mut self, rune: &RuneId, amount: u128) -> RunesResult<()> {
        let total = self
            .get(rune)
            .checked_add(amount)
            .ok_or(RunesError::OverflowU128)?;
        self.set(rune, total);
        Ok(())
    }

    pub fn decrease(&mut self, rune: &RuneId, amount: u128) -> RunesResult<()> {
        let remaining = self
            .get(rune)
            .checked_sub(amount)
            .ok_or(RunesError::Underflow(*rune))?;
        self.set(rune, remaining);
        Ok(())
    }

    /// Removes and returns the balance of `rune`.
    pub fn get_and_update(&mut self, rune: &RuneId) -> u128 {
        self.balances.remove(rune).unwrap_or_default()
    }

    pub fn from_pairs(runes: Vec<RuneId>, balances: Vec<u128>) -> RunesResult<Self> {
        let mut sheet = BalanceSheet::default();
        for (rune, balance) in runes.into_iter().zip(balances) {
            sheet.increase(&rune, balance)?;
        }
        Ok(sheet)
    }

    /// Adds every balance of `self` into `other`.
    pub fn pipe(&self, other: &mut Self) -> RunesResult<()> {
        for (rune, balance) in &self.balances {
            other.increase(rune, *balance)?;
        }
        Ok(())
    }

    pub fn concat(sheets: Vec<Self>) -> RunesResult<Self> {
        let mut result = BalanceSheet::default();
        for sheet in sheets {
            sheet.pipe(&mut result)?;
        }
        Ok(result)
    }

    pub fn merge(&self, other: &Self) -> RunesResult<Self> {
        let mut result = self.clone();
        other.pipe(&mut result)?;
        Ok(result)
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RuneId, &u128)> {
        self.balances.iter()
    }

    /// `block tx amount` triples as a varint list.
    pub fn encode(&self) -> Vec<u8> {
        let mut values = Vec::with_capacity(self.balances.len() * 3);
        for (id, amount) in &self.balances {
            values.push(id.block.into());
            values.push(id.tx.into());
            values.push(*amount);
        }
        encode_varint_list(&values)
    }

    pub fn decode(bytes: &[u8]) -> RunesResult<Self> {
        let values = decode_varint_list(bytes)?;
        if values.len() % 3 != 0 {
            return Err(RunesError::Decode(format!(
                "balance sheet has {} integers",
                values.len()
            )));
        }
        let mut sheet = BalanceSheet::default();
        for chunk in values.chunks(3) {
            let block = u64::try_from(chunk[0])
                .map_err(|_| RunesError::Decode("rune id block".into()))?;
            let tx =
                u32::try_from(chunk[1]).map_err(|_| RunesError::Decode("rune id tx".into()))?;
            let id = RuneId::new(block, tx)
                .ok_or_else(|| RunesError::Decode(format!("rune id {block}:{tx}")))?;
            sheet.increase(&id, chunk[2])?;
        }
        Ok(sheet)
    }
}
