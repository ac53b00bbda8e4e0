use std::mem::size_of;

/// Fixed-width little-endian view of a value stored under a key. Missing
/// keys read back as zero.
pub trait ByteView: Sized {
    fn from_bytes(bytes: Vec<u8>) -> Self;
    fn to_bytes(&self) -> Vec<u8>;
    fn zero() -> Self;
}

macro_rules! byte_view {
    ($($t:ty),*) => {
        $(
            impl ByteView for $t {
                fn from_bytes(bytes: Vec<u8>) -> Self {
                    let mut buffer = [0u8; size_of::<$t>()];
                    let len = bytes.len().min(buffer.len());
                    buffer[..len].copy_from_slice(&bytes[..len]);
                    <$t>::from_le_bytes(buffer)
                }
                fn to_bytes(&self) -> Vec<u8> {
                    self.to_le_bytes().to_vec()
                }
                fn zero() -> Self {
                    0
                }
            }
        )*
    };
}

byte_view!(u8, u32, u64, u128);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        assert_eq!(u32::from_bytes(7u32.to_bytes()), 7);
        assert_eq!(u64::from_bytes(u64::MAX.to_bytes()), u64::MAX);
        assert_eq!(u128::from_bytes((1u128 << 100).to_bytes()), 1 << 100);
    }

    #[test]
    fn short_input_is_zero_extended() {
        assert_eq!(u64::from_bytes(Vec::new()), 0);
        assert_eq!(u64::from_bytes(vec![1, 1]), 257);
    }
}
