use super::*;

use thiserror::Error;

/// A rune plus a bitmap of the boundaries that render a `•` spacer: bit `i`
/// set means a spacer follows character `i`.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Ord,
    PartialOrd,
    Eq,
    Default,
    DeserializeFromStr,
    SerializeDisplay,
)]
pub struct SpacedRune {
    pub rune: Rune,
    pub spacers: u32,
}

#[derive(Debug, PartialEq, Eq, Clone, Error)]
pub enum Error {
    #[error("invalid character `{0}`")]
    Character(char),
    #[error("double spacer")]
    DoubleSpacer,
    #[error("leading spacer")]
    LeadingSpacer,
    #[error("trailing spacer")]
    TrailingSpacer,
    #[error(transparent)]
    Rune(#[from] rune::Error),
}

impl SpacedRune {
    pub fn new(rune: Rune, spacers: u32) -> Self {
        Self { rune, spacers }
    }
}

impl FromStr for SpacedRune {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rune = String::new();
        let mut spacers = 0u32;

        for c in s.chars() {
            match c {
                'A'..='Z' => rune.push(c),
                '.' | '•' => {
                    let index = rune.len().checked_sub(1).ok_or(Error::LeadingSpacer)?;
                    let flag = u32::try_from(index)
                        .ok()
                        .and_then(|index| 1u32.checked_shl(index))
                        .ok_or(Error::Rune(rune::Error::Range))?;
                    if spacers & flag != 0 {
                        return Err(Error::DoubleSpacer);
                    }
                    spacers |= flag;
                }
                _ => return Err(Error::Character(c)),
            }
        }

        if rune.is_empty() {
            return Err(Error::Rune(rune::Error::Empty));
        }

        if 32 - spacers.leading_zeros() >= rune.len() as u32 {
            return Err(Error::TrailingSpacer);
        }

        Ok(SpacedRune {
            rune: rune.parse()?,
            spacers,
        })
    }
}

impl Display for SpacedRune {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let rune = self.rune.to_string();

        for (i, c) in rune.chars().enumerate() {
            write!(f, "{c}")?;

            if i < rune.len() - 1 && self.spacers & 1 << i != 0 {
                f.write_str("•")?;
            }
        }

        Ok(())
    }
}
