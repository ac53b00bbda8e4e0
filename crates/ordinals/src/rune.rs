use super::*;

use thiserror::Error;

/// A rune name: a `u128` rendered in bijective base-26, so `A` is 0, `Z` is
/// 25 and `AA` is 26.
#[derive(
    Default,
    Debug,
    PartialEq,
    Copy,
    Clone,
    PartialOrd,
    Ord,
    Eq,
    Hash,
    DeserializeFromStr,
    SerializeDisplay,
)]
pub struct Rune(pub u128);

#[derive(Debug, PartialEq, Eq, Clone, Error)]
pub enum Error {
    #[error("invalid base-26 character `{0}`")]
    InvalidBase26(char),
    #[error("rune name out of range")]
    Range,
    #[error("empty rune name")]
    Empty,
}

impl Rune {
    /// Smallest name of each length from 1 to 13 characters (`A`, `AA`, ...).
    const STEPS: [u128; 13] = [
        0,
        26,
        702,
        18278,
        475254,
        12356630,
        321272406,
        8353082582,
        217180147158,
        5646683826134,
        146813779479510,
        3817158266467286,
        99246114928149462,
    ];

    /// `AAAAAAAAAAAAAAAAAAAAAAAAAAA`, the first name handed out to etchings
    /// that do not pick one.
    pub const FIRST_RESERVED: u128 = 6402364363415443603228541259936211926;

    pub fn n(self) -> u128 {
        self.0
    }

    pub fn first_rune_height(network: Network) -> u32 {
        match network {
            Network::Bitcoin => SUBSIDY_HALVING_INTERVAL * 4,
            Network::Testnet => SUBSIDY_HALVING_INTERVAL * 12,
            _ => 0,
        }
    }

    pub fn minimum_at_height(network: Network, height: u32) -> Self {
        let offset = height.saturating_add(1);

        const INTERVAL: u32 = SUBSIDY_HALVING_INTERVAL / 12;

        let start = Self::first_rune_height(network);
        let end = start + SUBSIDY_HALVING_INTERVAL;

        if offset < start {
            return Rune(Self::STEPS[12]);
        }

        if offset >= end {
            return Rune(0);
        }

        let progress = offset.saturating_sub(start);

        // progress < 12 * INTERVAL here, so length is in 1..=12
        let length = 12u32.saturating_sub(progress / INTERVAL) as usize;

        let end = Self::STEPS[length - 1];
        let start = Self::STEPS[length];

        let remainder = u128::from(progress % INTERVAL);

        Rune(start - ((start - end) * remainder / u128::from(INTERVAL)))
    }

    pub fn is_reserved(self) -> bool {
        self.0 >= Self::FIRST_RESERVED
    }

    pub fn reserved(block: u64, tx: u32) -> Self {
        Self(
            Self::FIRST_RESERVED
                .checked_add(u128::from(block) << 32 | u128::from(tx))
                .unwrap_or(u128::MAX),
        )
    }

    /// Little-endian bytes of the name with trailing zeros trimmed; this is
    /// what an etching transaction must push in a taproot witness.
    pub fn commitment(self) -> Vec<u8> {
        let bytes = self.0.to_le_bytes();

        let mut end = bytes.len();

        while end > 0 && bytes[end - 1] == 0 {
            end -= 1;
        }

        bytes[..end].into()
    }
}

impl Display for Rune {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let mut n = self.0;
        let mut symbol = Vec::new();

        loop {
            symbol.push(b'A' + (n % 26) as u8);
            n /= 26;
            if n == 0 {
                break;
            }
            n -= 1;
        }

        for byte in symbol.iter().rev() {
            write!(f, "{}", *byte as char)?;
        }

        Ok(())
    }
}

impl FromStr for Rune {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        if s.is_empty() {
            return Err(Error::Empty);
        }

        let mut x = 0u128;
        for (i, c) in s.chars().enumerate() {
            if i > 0 {
                x = x.checked_add(1).ok_or(Error::Range)?;
            }
            x = x.checked_mul(26).ok_or(Error::Range)?;
            match c {
                'A'..='Z' => {
                    x = x
                        .checked_add(c as u128 - 'A' as u128)
                        .ok_or(Error::Range)?;
                }
                _ => return Err(Error::InvalidBase26(c)),
            }
        }
        Ok(Rune(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse() {
        assert_eq!(Rune(0).to_string(), "A");
        assert_eq!(Rune(1).to_string(), "B");
        assert_eq!(Rune(25).to_string(), "Z");
        assert_eq!(Rune(26).to_string(), "AA");
        assert_eq!(Rune(27).to_string(), "AB");
        assert_eq!(Rune(51).to_string(), "AZ");
        assert_eq!(Rune(52).to_string(), "BA");
        assert_eq!(Rune(701).to_string(), "ZZ");
        assert_eq!(Rune(702).to_string(), "AAA");
        assert_eq!(
            Rune(u128::MAX).to_string(),
            "BCGDENLQRQWDSLRUGSNLBTMFIJAV"
        );
        assert_eq!(
            "BCGDENLQRQWDSLRUGSNLBTMFIJAV".parse::<Rune>().unwrap(),
            Rune(u128::MAX)
        );
        assert_eq!(
            "BCGDENLQRQWDSLRUGSNLBTMFIJAW".parse::<Rune>(),
            Err(Error::Range)
        );
    }

    #[test]
    fn round_trip_small_values() {
        for n in 0..(1u128 << 20) {
            assert_eq!(Rune(n).to_string().parse::<Rune>().unwrap(), Rune(n));
        }
    }

    #[test]
    fn rejects_non_letters() {
        assert_eq!("a".parse::<Rune>(), Err(Error::InvalidBase26('a')));
        assert_eq!("A-B".parse::<Rune>(), Err(Error::InvalidBase26('-')));
        assert_eq!("".parse::<Rune>(), Err(Error::Empty));
    }

    #[test]
    fn steps_are_first_names_of_each_length() {
        for (i, step) in Rune::STEPS.iter().enumerate() {
            assert_eq!(Rune(*step).to_string(), "A".repeat(i + 1));
        }
        assert_eq!(
            Rune(Rune::FIRST_RESERVED).to_string(),
            "AAAAAAAAAAAAAAAAAAAAAAAAAAA"
        );
    }

    #[test]
    fn minimum_at_height_mainnet() {
        let start = Rune::first_rune_height(Network::Bitcoin);
        assert_eq!(start, 840_000);
        assert_eq!(
            Rune::minimum_at_height(Network::Bitcoin, 0).to_string(),
            "AAAAAAAAAAAAA"
        );
        assert_eq!(
            Rune::minimum_at_height(Network::Bitcoin, start - 2).to_string(),
            "AAAAAAAAAAAAA"
        );
        assert_eq!(
            Rune::minimum_at_height(Network::Bitcoin, start - 1).to_string(),
            "AAAAAAAAAAAAA"
        );
        assert!(Rune::minimum_at_height(Network::Bitcoin, start) < Rune(Rune::STEPS[12]));
        assert_eq!(
            Rune::minimum_at_height(Network::Bitcoin, start + 17_500 - 1).to_string(),
            "AAAAAAAAAAAA"
        );
        assert_eq!(
            Rune::minimum_at_height(Network::Bitcoin, start + SUBSIDY_HALVING_INTERVAL - 2),
            Rune(1)
        );
        assert_eq!(
            Rune::minimum_at_height(Network::Bitcoin, start + SUBSIDY_HALVING_INTERVAL - 1),
            Rune(0)
        );
        assert_eq!(
            Rune::minimum_at_height(Network::Bitcoin, start + SUBSIDY_HALVING_INTERVAL * 2),
            Rune(0)
        );
    }

    #[test]
    fn minimum_is_monotonic() {
        let mut previous = Rune(u128::MAX);
        for height in (0..1_100_000).step_by(977) {
            let minimum = Rune::minimum_at_height(Network::Bitcoin, height);
            assert!(minimum <= previous);
            previous = minimum;
        }
    }

    #[test]
    fn reserved_names() {
        assert!(!Rune(Rune::FIRST_RESERVED - 1).is_reserved());
        assert!(Rune(Rune::FIRST_RESERVED).is_reserved());
        assert_eq!(Rune::reserved(0, 0), Rune(Rune::FIRST_RESERVED));
        assert_eq!(Rune::reserved(0, 1), Rune(Rune::FIRST_RESERVED + 1));
        assert_eq!(
            Rune::reserved(1, 0),
            Rune(Rune::FIRST_RESERVED + (1 << 32))
        );
        assert_eq!(
            Rune::reserved(u64::MAX, u32::MAX),
            Rune(Rune::FIRST_RESERVED + (u128::from(u64::MAX) << 32 | u128::from(u32::MAX)))
        );
    }

    #[test]
    fn commitment() {
        assert_eq!(Rune(0).commitment(), Vec::<u8>::new());
        assert_eq!(Rune(1).commitment(), [1]);
        assert_eq!(Rune(255).commitment(), [255]);
        assert_eq!(Rune(256).commitment(), [0, 1]);
        assert_eq!(Rune(u128::MAX).commitment(), [255; 16]);
    }

    #[test]
    fn serde_uses_the_name() {
        let rune = Rune(26);
        let json = serde_json::to_string(&rune).unwrap();
        assert_eq!(json, "\"AA\"");
        assert_eq!(serde_json::from_str::<Rune>(&json).unwrap(), rune);
    }
}
