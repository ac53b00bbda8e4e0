use super::*;

/// Declaration of a new rune inside a runestone. Missing fields count as
/// zero for every supply calculation.
#[derive(Default, Serialize, Deserialize, Debug, PartialEq, Copy, Clone, Eq)]
pub struct Etching {
    pub divisibility: Option<u8>,
    pub premine: Option<u128>,
    pub rune: Option<Rune>,
    pub spacers: Option<u32>,
    pub symbol: Option<char>,
    pub terms: Option<Terms>,
    pub turbo: bool,
}

impl Etching {
    pub const MAX_DIVISIBILITY: u8 = 38;
    pub const MAX_SPACERS: u32 = 0b00000111_11111111_11111111_11111111;

    /// `premine + cap * amount`, or `None` on overflow.
    pub fn supply(&self) -> Option<u128> {
        let premine = self.premine.unwrap_or_default();
        let cap = self.terms.and_then(|terms| terms.cap).unwrap_or_default();
        let amount = self
            .terms
            .and_then(|terms| terms.amount)
            .unwrap_or_default();
        premine.checked_add(cap.checked_mul(amount)?)
    }
}

/// Etching as carried by a decoded runestone. Cenotaphs keep only the name so
/// the rune can be reserved without any of its other parameters leaking into
/// ledger state.
#[derive(Serialize, Deserialize, Debug, PartialEq, Copy, Clone, Eq)]
pub enum RunestoneEtching {
    Full(Etching),
    NameOnly(Rune),
}

impl RunestoneEtching {
    pub fn rune(&self) -> Option<Rune> {
        match self {
            Self::Full(etching) => etching.rune,
            Self::NameOnly(rune) => Some(*rune),
        }
    }

    /// Full etching parameters, unavailable on cenotaphs.
    pub fn full(&self) -> Option<&Etching> {
        match self {
            Self::Full(etching) => Some(etching),
            Self::NameOnly(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_spacers() {
        let mut rune = String::new();

        for (i, c) in Rune(u128::MAX).to_string().chars().enumerate() {
            if i > 0 {
                rune.push('•');
            }
            rune.push(c);
        }

        assert_eq!(
            Etching::MAX_SPACERS,
            rune.parse::<SpacedRune>().unwrap().spacers
        );
    }

    #[test]
    fn supply() {
        #[track_caller]
        fn case(premine: Option<u128>, terms: Option<Terms>, supply: Option<u128>) {
            assert_eq!(
                Etching {
                    premine,
                    terms,
                    ..Default::default()
                }
                .supply(),
                supply,
            );
        }

        case(None, None, Some(0));
        case(Some(0), None, Some(0));
        case(Some(1), None, Some(1));
        case(
            Some(1),
            Some(Terms {
                amount: None,
                cap: None,
                ..Default::default()
            }),
            Some(1),
        );
        case(
            Some(1000),
            Some(Terms {
                amount: Some(10),
                cap: Some(100),
                ..Default::default()
            }),
            Some(2000),
        );
        case(
            Some(u128::MAX),
            Some(Terms {
                amount: Some(1),
                cap: Some(1),
                ..Default::default()
            }),
            None,
        );
        case(
            Some(0),
            Some(Terms {
                amount: Some(u128::MAX),
                cap: Some(2),
                ..Default::default()
            }),
            None,
        );
    }

    #[test]
    fn name_only_hides_parameters() {
        let etching = RunestoneEtching::NameOnly(Rune(7));
        assert_eq!(etching.rune(), Some(Rune(7)));
        assert_eq!(etching.full(), None);

        let full = RunestoneEtching::Full(Etching {
            premine: Some(3),
            ..Default::default()
        });
        assert_eq!(full.rune(), None);
        assert_eq!(full.full().and_then(|e| e.premine), Some(3));
    }
}
