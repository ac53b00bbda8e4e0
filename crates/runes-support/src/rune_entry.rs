use crate::{RunesError, RunesResult};
use bitcoin::Txid;
use ordinals::{RuneId, SpacedRune, Terms};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum MintError {
    #[error("rune has no mint terms")]
    Unmintable,
    #[error("mint starts at height {0}")]
    MintBeforeStart(u64),
    #[error("mint ended at height {0}")]
    MintAfterEnd(u64),
    #[error("mint cap of {0} reached")]
    MintCapReached(u128),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MintState {
    Unmintable,
    BeforeStart,
    Minting,
    Ended,
}

/// Ledger record of an etched rune.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct RuneEntry {
    pub rune_id: RuneId,
    pub number: u64,
    pub divisibility: u8,
    pub premine: u128,
    #[serde(with = "raw_spaced_rune")]
    pub spaced_rune: SpacedRune,
    pub symbol: Option<char>,
    pub terms: Option<Terms>,
    pub turbo: bool,
    pub etching_tx_hash: Txid,
    /// Block timestamp of the etching.
    pub etched_at: u64,
    pub etching_block: u64,
    pub mints: u128,
    pub burned_amount: u128,
    /// Block timestamp of the mint that reached the cap.
    pub completed_at: Option<u64>,
    pub completed_at_height: Option<u64>,
}

impl RuneEntry {
    pub const DEFAULT_SYMBOL: char = '\u{A4}';

    /// Entry recorded for a cenotaph etching: the name is claimed but nothing
    /// can be minted and nothing was premined.
    pub fn blank(
        rune_id: RuneId,
        number: u64,
        spaced_rune: SpacedRune,
        etching_tx_hash: Txid,
        etched_at: u64,
    ) -> Self {
        Self {
            rune_id,
            number,
            divisibility: 0,
            premine: 0,
            spaced_rune,
            symbol: None,
            terms: None,
            turbo: false,
            etching_tx_hash,
            etched_at,
            etching_block: rune_id.block,
            mints: 0,
            burned_amount: 0,
            completed_at: None,
            completed_at_height: None,
        }
    }

    pub fn symbol_or_default(&self) -> char {
        self.symbol.unwrap_or(Self::DEFAULT_SYMBOL)
    }

    /// First height at which minting is open.
    pub fn start(&self) -> Option<u64> {
        let terms = self.terms?;

        let relative = terms
            .offset
            .0
            .map(|offset| self.etching_block.saturating_add(offset));

        let absolute = terms.height.0;

        relative
            .zip(absolute)
            .map(|(relative, absolute)| relative.max(absolute))
            .or(relative)
            .or(absolute)
    }

    /// First height at which minting is closed.
    pub fn end(&self) -> Option<u64> {
        let terms = self.terms?;

        let relative = terms
            .offset
            .1
            .map(|offset| self.etching_block.saturating_add(offset));

        let absolute = terms.height.1;

        relative
            .zip(absolute)
            .map(|(relative, absolute)| relative.min(absolute))
            .or(relative)
            .or(absolute)
    }

    pub fn is_mint_started(&self, height: u64) -> bool {
        self.start().map_or(true, |start| height >= start)
    }

    pub fn is_mint_ended(&self, height: u64) -> bool {
        self.end().map_or(false, |end| height >= end)
    }

    pub fn mintable_amount(&self, height: u64) -> Result<u128, MintError> {
        let Some(terms) = self.terms else {
            return Err(MintError::Unmintable);
        };

        if let Some(start) = self.start() {
            if height < start {
                return Err(MintError::MintBeforeStart(start));
            }
        }

        if let Some(end) = self.end() {
            if height >= end {
                return Err(MintError::MintAfterEnd(end));
            }
        }

        let cap = terms.cap.unwrap_or_default();

        if self.mints >= cap {
            return Err(MintError::MintCapReached(cap));
        }

        Ok(terms.amount.unwrap_or_default())
    }

    pub fn mint_state(&self, height: u64) -> MintState {
        match self.mintable_amount(height) {
            Ok(_) => MintState::Minting,
            Err(MintError::Unmintable) => MintState::Unmintable,
            Err(MintError::MintBeforeStart(_)) => MintState::BeforeStart,
            Err(MintError::MintAfterEnd(_) | MintError::MintCapReached(_)) => MintState::Ended,
        }
    }

    /// Whether the last possible mint has happened.
    pub fn is_cap_reached(&self) -> bool {
        self.terms
            .map(|terms| self.mints >= terms.cap.unwrap_or_default())
            .unwrap_or_default()
    }

    /// Maximum supply: `amount * cap + premine`.
    pub fn supply(&self) -> RunesResult<u128> {
        let (amount, cap) = self
            .terms
            .map(|terms| {
                (
                    terms.amount.unwrap_or_default(),
                    terms.cap.unwrap_or_default(),
                )
            })
            .unwrap_or_default();
        amount
            .checked_mul(cap)
            .and_then(|minted| minted.checked_add(self.premine))
            .ok_or(RunesError::OverflowU128)
    }

    /// `mints * amount + premine`.
    pub fn minted_amount(&self) -> RunesResult<u128> {
        let amount = self
            .terms
            .and_then(|terms| terms.amount)
            .unwrap_or_default();
        self.mints
            .checked_mul(amount)
            .and_then(|minted| minted.checked_add(self.premine))
            .ok_or(RunesError::OverflowU128)
    }

    pub fn circulating_supply(&self) -> RunesResult<u128> {
        self.minted_amount()?
            .checked_sub(self.burned_amount)
            .ok_or(RunesError::Underflow(self.rune_id))
    }

    pub fn to_bytes(&self) -> RunesResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| RunesError::Decode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> RunesResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| RunesError::Decode(e.to_string()))
    }
}

/// Stores the rune and its spacer bitmap as numbers. The display form drops
/// spacer bits past the end of the name.
mod raw_spaced_rune {
    use ordinals::{Rune, SpacedRune};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Raw {
        rune: u128,
        spacers: u32,
    }

    pub fn serialize<S: Serializer>(value: &SpacedRune, serializer: S) -> Result<S::Ok, S::Error> {
        Raw {
            rune: value.rune.0,
            spacers: value.spacers,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SpacedRune, D::Error> {
        let raw = Raw::deserialize(deserializer)?;
        Ok(SpacedRune::new(Rune(raw.rune), raw.spacers))
    }
}
