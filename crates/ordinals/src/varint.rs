//! LEB128 variable-length integers, at most 19 bytes / 128 bits.

use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Error)]
pub enum Error {
    #[error("varint input is empty")]
    Empty,
    #[error("varint is not terminated")]
    Unterminated,
    #[error("varint overflows u128")]
    OverflowU128,
}

pub fn encode_to_vec(mut n: u128, v: &mut Vec<u8>) {
    while n >> 7 > 0 {
        v.push(n.to_le_bytes()[0] | 0b1000_0000);
        n >>= 7;
    }
    v.push(n.to_le_bytes()[0]);
}

pub fn encode(n: u128) -> Vec<u8> {
    let mut v = Vec::new();
    encode_to_vec(n, &mut v);
    v
}

/// Decodes one integer from the front of `buffer`, returning it together with
/// the number of bytes consumed.
pub fn decode(buffer: &[u8]) -> Result<(u128, usize), Error> {
    if buffer.is_empty() {
        return Err(Error::Empty);
    }

    let mut n = 0u128;

    for (i, &byte) in buffer.iter().enumerate() {
        if i > 18 {
            return Err(Error::OverflowU128);
        }

        let value = u128::from(byte) & 0b0111_1111;

        // the 19th group may only carry the two remaining bits
        if i == 18 && value & 0b0111_1100 != 0 {
            return Err(Error::OverflowU128);
        }

        n |= value << (7 * i);

        if byte & 0b1000_0000 == 0 {
            return Ok((n, i + 1));
        }
    }

    Err(Error::Unterminated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_a_single_byte() {
        assert_eq!(encode(0), [0x00]);
        assert_eq!(decode(&[0x00]).unwrap(), (0, 1));
    }

    #[test]
    fn round_trip_powers_and_neighbours() {
        for i in 0..128 {
            for n in [(1u128 << i) - 1, 1u128 << i, (1u128 << i) + 1] {
                let encoded = encode(n);
                assert_eq!(decode(&encoded).unwrap(), (n, encoded.len()));
            }
        }
        let encoded = encode(u128::MAX);
        assert_eq!(encoded.len(), 19);
        assert_eq!(decode(&encoded).unwrap(), (u128::MAX, 19));
    }

    #[test]
    fn empty_input() {
        assert_eq!(decode(&[]), Err(Error::Empty));
    }

    #[test]
    fn unterminated() {
        assert_eq!(decode(&[0x80]), Err(Error::Unterminated));
        assert_eq!(decode(&[0xFF, 0xFF]), Err(Error::Unterminated));
    }

    #[test]
    fn nineteen_bytes_is_the_limit() {
        let mut max = vec![0xFF; 18];
        max.push(0x03);
        assert_eq!(decode(&max).unwrap(), (u128::MAX, 19));

        let mut overlong = vec![0x80; 19];
        overlong.push(0x00);
        assert_eq!(overlong.len(), 20);
        assert_eq!(decode(&overlong), Err(Error::OverflowU128));
    }

    #[test]
    fn last_group_overflow() {
        let mut too_big = vec![0xFF; 18];
        too_big.push(0x04);
        assert_eq!(decode(&too_big), Err(Error::OverflowU128));
    }

    #[test]
    fn trailing_bytes_are_not_consumed() {
        assert_eq!(decode(&[0x81, 0x01, 0x7F]).unwrap(), (129, 2));
    }
}
