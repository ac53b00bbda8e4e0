#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum Flag {
    Etching = 0,
    Terms = 1,
    Turbo = 2,
    #[allow(unused)]
    Cenotaph = 127,
}

impl Flag {
    pub(super) fn mask(self) -> u128 {
        1 << self as u128
    }
}

/// Flag bits read from the `Flags` field. Known bits are cleared as they are
/// taken so anything left over is unrecognized.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(super) struct Flags(u128);

impl Flags {
    pub(super) fn new(bits: u128) -> Self {
        Self(bits)
    }

    /// Clears `flag` and reports whether it was set.
    pub(super) fn take(&mut self, flag: Flag) -> bool {
        let mask = flag.mask();
        let set = self.0 & mask != 0;
        self.0 &= !mask;
        set
    }

    pub(super) fn set(&mut self, flag: Flag) {
        self.0 |= flag.mask();
    }

    pub(super) fn bits(self) -> u128 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask() {
        assert_eq!(Flag::Etching.mask(), 0b1);
        assert_eq!(Flag::Terms.mask(), 0b10);
        assert_eq!(Flag::Turbo.mask(), 0b100);
        assert_eq!(Flag::Cenotaph.mask(), 1 << 127);
    }

    #[test]
    fn take() {
        let mut flags = Flags::new(1);
        assert!(flags.take(Flag::Etching));
        assert_eq!(flags.bits(), 0);

        let mut flags = Flags::new(0);
        assert!(!flags.take(Flag::Etching));
        assert_eq!(flags.bits(), 0);

        let mut flags = Flags::new(0b1000 | 0b10);
        assert!(flags.take(Flag::Terms));
        assert!(!flags.take(Flag::Turbo));
        assert_eq!(flags.bits(), 0b1000);
    }

    #[test]
    fn set() {
        let mut flags = Flags::default();
        flags.set(Flag::Turbo);
        flags.set(Flag::Etching);
        assert_eq!(flags.bits(), 0b101);
    }
}
