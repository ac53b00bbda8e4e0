use {super::*, std::num::ParseIntError, thiserror::Error};

/// Block height and transaction index of the transaction that etched a rune.
#[derive(
    Debug,
    PartialEq,
    Copy,
    Clone,
    Hash,
    Eq,
    Ord,
    PartialOrd,
    Default,
    DeserializeFromStr,
    SerializeDisplay,
)]
pub struct RuneId {
    pub block: u64,
    pub tx: u32,
}

#[derive(Debug, PartialEq, Eq, Clone, Error)]
pub enum Error {
    #[error("rune id `{0}` is missing a `:` separator")]
    Separator(String),
    #[error("invalid block height: {0}")]
    Block(ParseIntError),
    #[error("invalid transaction index: {0}")]
    Transaction(ParseIntError),
    #[error("rune id has transaction index without block height")]
    Zero,
}

impl RuneId {
    /// Returns `None` for `0:n` with `n > 0`; block zero only holds the
    /// placeholder id `0:0`.
    pub fn new(block: u64, tx: u32) -> Option<RuneId> {
        let id = RuneId { block, tx };

        if id.block == 0 && id.tx > 0 {
            return None;
        }

        Some(id)
    }

    /// Delta from `self` to a later id: same block yields the tx index
    /// difference, a later block yields the absolute tx index.
    pub fn delta(self, next: RuneId) -> Option<(u128, u128)> {
        let block = next.block.checked_sub(self.block)?;

        let tx = if block == 0 {
            next.tx.checked_sub(self.tx)?
        } else {
            next.tx
        };

        Some((block.into(), tx.into()))
    }

    /// Inverse of [`RuneId::delta`]. Fails when either delta does not fit the
    /// field width or the addition overflows.
    pub fn next(self, block: u128, tx: u128) -> Option<RuneId> {
        let block = u64::try_from(block).ok()?;
        let tx = u32::try_from(tx).ok()?;

        RuneId::new(
            self.block.checked_add(block)?,
            if block == 0 {
                self.tx.checked_add(tx)?
            } else {
                tx
            },
        )
    }
}

impl Display for RuneId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.block, self.tx)
    }
}

impl FromStr for RuneId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (height, index) = s
            .split_once(':')
            .ok_or_else(|| Error::Separator(s.into()))?;

        let block = height.parse().map_err(Error::Block)?;
        let tx = index.parse().map_err(Error::Transaction)?;

        Self::new(block, tx).ok_or(Error::Zero)
    }
}
