use super::*;

/// Moves `amount` of rune `id` to output `output`.
///
/// `output == tx.output.len()` splits the amount across every non-`OP_RETURN`
/// output. An `amount` of zero means "everything still unallocated".
#[derive(Default, Serialize, Deserialize, Debug, PartialEq, Copy, Clone, Eq)]
pub struct Edict {
    pub id: RuneId,
    pub amount: u128,
    pub output: u32,
}

impl Edict {
    /// Builds an edict from an already delta-decoded id. Returns `None` when
    /// the output does not fit a `u32` or exceeds the output count.
    pub fn from_integers(tx: &Transaction, id: RuneId, amount: u128, output: u128) -> Option<Self> {
        let Ok(output) = u32::try_from(output) else {
            return None;
        };

        // output == tx.output.len() is the split-across-outputs form
        if output > u32::try_from(tx.output.len()).ok()? {
            return None;
        }

        Some(Self { id, amount, output })
    }
}
