use ordinals::{RuneId, SpacedRune};
use std::collections::BTreeMap;

/// Summary of one indexed block, logged after it is committed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BlockStats {
    pub height: u64,
    pub transactions: u32,
    pub runestones: u32,
    pub cenotaphs: u32,
    pub etchings: Vec<(RuneId, SpacedRune)>,
    pub mints: u32,
    pub edicts: u32,
    pub outputs_credited: u32,
    pub burned: BTreeMap<RuneId, u128>,
    pub events: usize,
}

impl BlockStats {
    pub fn new(height: u64) -> Self {
        Self {
            height,
            ..Default::default()
        }
    }
}
