use runes_support::index_pointer::{IndexPointer, KeyValuePointer};

#[allow(non_snake_case)]
#[derive(Clone, Debug)]
pub struct RuneTable {
    pub HEIGHT_TO_HEADER: IndexPointer,
    pub TIP: IndexPointer,
    pub NETWORK: IndexPointer,
    pub JOURNAL: IndexPointer,
    pub OUTPOINT_TO_RUNES: IndexPointer,
    pub OUTPOINT_TO_OUTPUT: IndexPointer,
    pub SCRIPT_TO_RUNES: IndexPointer,
    pub RUNE_ID_TO_ENTRY: IndexPointer,
    pub RUNE_TO_RUNE_ID: IndexPointer,
    pub RUNE_COUNT: IndexPointer,
    pub HEIGHT_TO_RUNE_IDS: IndexPointer,
    pub TXID_TO_TRANSACTION: IndexPointer,
}

impl Default for RuneTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RuneTable {
    pub fn new() -> Self {
        RuneTable {
            HEIGHT_TO_HEADER: IndexPointer::default().keyword("/header/byheight/"),
            TIP: IndexPointer::default().keyword("/tip"),
            NETWORK: IndexPointer::default().keyword("/network"),
            JOURNAL: IndexPointer::default().keyword("/journal/"),
            OUTPOINT_TO_RUNES: IndexPointer::default().keyword("/runes/byoutpoint/"),
            OUTPOINT_TO_OUTPUT: IndexPointer::default().keyword("/output/byoutpoint/"),
            SCRIPT_TO_RUNES: IndexPointer::default().keyword("/runes/byscript/"),
            RUNE_ID_TO_ENTRY: IndexPointer::default().keyword("/runes/entry/byruneid/"),
            RUNE_TO_RUNE_ID: IndexPointer::default().keyword("/runeid/byrune/"),
            RUNE_COUNT: IndexPointer::default().keyword("/runes/count"),
            HEIGHT_TO_RUNE_IDS: IndexPointer::default().keyword("/runes/byheight/"),
            TXID_TO_TRANSACTION: IndexPointer::default().keyword("/transactions/bytxid/"),
        }
    }

    /// Big-endian so journal keys sort by height.
    pub fn journal_at(&self, height: u64) -> IndexPointer {
        self.JOURNAL.select(&height.to_be_bytes())
    }

    pub fn header_at(&self, height: u64) -> IndexPointer {
        self.HEIGHT_TO_HEADER.select(&height.to_be_bytes())
    }
}
