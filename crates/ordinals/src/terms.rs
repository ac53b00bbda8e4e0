use super::*;

/// Open-mint rules attached to an etching.
#[derive(Default, Serialize, Deserialize, Debug, PartialEq, Copy, Clone, Eq)]
pub struct Terms {
    pub amount: Option<u128>,
    pub cap: Option<u128>,
    /// Absolute `(start, end)` block heights.
    pub height: (Option<u64>, Option<u64>),
    /// `(start, end)` relative to the etching block.
    pub offset: (Option<u64>, Option<u64>),
}
