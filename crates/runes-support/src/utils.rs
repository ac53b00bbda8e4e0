use crate::{RunesError, RunesResult};
use anyhow::Result;
use bitcoin::consensus::{deserialize_partial, encode::Encodable};
use bitcoin::OutPoint;
use ordinals::varint;

pub fn consensus_encode<T: Encodable>(v: &T) -> Result<Vec<u8>> {
    let mut result = Vec::<u8>::new();
    v.consensus_encode(&mut result)?;
    Ok(result)
}

pub fn outpoint_encode(v: &OutPoint) -> Result<Vec<u8>> {
    consensus_encode(v)
}

pub fn outpoint_decode(bytes: &[u8]) -> Result<OutPoint> {
    let (outpoint, _) = deserialize_partial::<OutPoint>(bytes)?;
    Ok(outpoint)
}

pub fn decode_varint_list(bytes: &[u8]) -> RunesResult<Vec<u128>> {
    let mut result = Vec::new();
    let mut cursor = 0;
    while cursor < bytes.len() {
        let (n, sz) = varint::decode(&bytes[cursor..])
            .map_err(|e| RunesError::Decode(format!("varint list: {e}")))?;
        cursor += sz;
        result.push(n);
    }
    Ok(result)
}

/// returns the values in a LEB encoded stream
pub fn encode_varint_list(values: &[u128]) -> Vec<u8> {
    let mut result = Vec::<u8>::new();
    for value in values {
        varint::encode_to_vec(*value, &mut result);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;
    use bitcoin::Txid;

    #[test]
    fn varint_list() {
        let values = vec![0, 1, 127, 128, u128::MAX];
        assert_eq!(decode_varint_list(&encode_varint_list(&values)).unwrap(), values);
        assert!(decode_varint_list(&[0x80]).is_err());
    }

    #[test]
    fn outpoint_bytes() {
        let outpoint = OutPoint {
            txid: Txid::from_byte_array([3; 32]),
            vout: 9,
        };
        let bytes = outpoint_encode(&outpoint).unwrap();
        assert_eq!(bytes.len(), 36);
        assert_eq!(outpoint_decode(&bytes).unwrap(), outpoint);
    }
}
