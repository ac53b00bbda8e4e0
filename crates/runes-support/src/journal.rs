//! Undo journal written alongside every committed block.
//!
//! Each entry is the value a key held before the block touched it (`None` if
//! the key did not exist). Replaying a journal restores the pre-block state.

use crate::{store::WriteBatch, RunesError, RunesResult};
use ordinals::varint;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UndoJournal {
    pub entries: Vec<(Vec<u8>, Option<Vec<u8>>)>,
}

impl UndoJournal {
    pub fn record(&mut self, key: Vec<u8>, previous: Option<Vec<u8>>) {
        self.entries.push((key, previous));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `len key (0 | 1 len value)` per entry, lengths as varints.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (key, previous) in &self.entries {
            varint::encode_to_vec(key.len() as u128, &mut out);
            out.extend_from_slice(key);
            match previous {
                Some(value) => {
                    varint::encode_to_vec(1, &mut out);
                    varint::encode_to_vec(value.len() as u128, &mut out);
                    out.extend_from_slice(value);
                }
                None => varint::encode_to_vec(0, &mut out),
            }
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> RunesResult<Self> {
        let mut journal = Self::default();
        let mut cursor = 0;
        while cursor < bytes.len() {
            let key = take_bytes(bytes, &mut cursor)?;
            let previous = match take_varint(bytes, &mut cursor)? {
                0 => None,
                1 => Some(take_bytes(bytes, &mut cursor)?),
                flag => {
                    return Err(RunesError::Decode(format!(
                        "undo journal entry flag {flag}"
                    )))
                }
            };
            journal.record(key, previous);
        }
        Ok(journal)
    }

    /// Batch restoring every recorded key, newest write undone first.
    pub fn undo_batch(&self) -> WriteBatch {
        let mut batch = WriteBatch::default();
        for (key, previous) in self.entries.iter().rev() {
            match previous {
                Some(value) => batch.put(key.clone(), value.clone()),
                None => batch.delete(key.clone()),
            }
        }
        batch
    }
}

fn take_varint(bytes: &[u8], cursor: &mut usize) -> RunesResult<u128> {
    let (value, len) = varint::decode(&bytes[*cursor..])
        .map_err(|e| RunesError::Decode(format!("undo journal varint: {e}")))?;
    *cursor += len;
    Ok(value)
}

fn take_bytes(bytes: &[u8], cursor: &mut usize) -> RunesResult<Vec<u8>> {
    let len = usize::try_from(take_varint(bytes, cursor)?)
        .map_err(|_| RunesError::Decode("undo journal length".into()))?;
    let end = cursor
        .checked_add(len)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| RunesError::Decode("undo journal truncated".into()))?;
    let out = bytes[*cursor..end].to_vec();
    *cursor = end;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_matches_recorded_entries() {
        let mut journal = UndoJournal::default();
        journal.record(b"/tip".to_vec(), Some(vec![9; 200]));
        journal.record(b"/runes/count".to_vec(), None);
        journal.record(Vec::new(), Some(Vec::new()));

        assert_eq!(UndoJournal::decode(&journal.encode()).unwrap(), journal);
    }

    #[test]
    fn truncated_input_is_an_error() {
        let mut journal = UndoJournal::default();
        journal.record(b"key".to_vec(), Some(b"value".to_vec()));
        let bytes = journal.encode();
        assert!(matches!(
            UndoJournal::decode(&bytes[..bytes.len() - 1]),
            Err(RunesError::Decode(_))
        ));
    }

    #[test]
    fn undo_batch_restores_in_reverse() {
        let mut journal = UndoJournal::default();
        journal.record(b"a".to_vec(), None);
        journal.record(b"b".to_vec(), Some(b"old".to_vec()));

        let batch = journal.undo_batch();
        assert_eq!(
            batch.ops(),
            &[
                (b"b".to_vec(), Some(b"old".to_vec())),
                (b"a".to_vec(), None),
            ]
        );
    }
}
