use super::*;

/// One reason a runestone is a cenotaph.
#[derive(Debug, PartialEq, Copy, Clone, Hash, Eq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flaw {
    EdictOutput,
    EdictRuneId,
    InvalidScript,
    OpCode,
    SupplyOverflow,
    TrailingIntegers,
    TruncatedField,
    UnrecognizedEvenTag,
    UnrecognizedFlag,
    VarInt,
}

impl Flaw {
    pub const ALL: [Flaw; 10] = [
        Flaw::EdictOutput,
        Flaw::EdictRuneId,
        Flaw::InvalidScript,
        Flaw::OpCode,
        Flaw::SupplyOverflow,
        Flaw::TrailingIntegers,
        Flaw::TruncatedField,
        Flaw::UnrecognizedEvenTag,
        Flaw::UnrecognizedFlag,
        Flaw::VarInt,
    ];

    pub fn mask(self) -> u32 {
        1 << self as u32
    }
}

impl Display for Flaw {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::EdictOutput => write!(f, "edict output greater than transaction output count"),
            Self::EdictRuneId => write!(f, "invalid rune ID in edict"),
            Self::InvalidScript => write!(f, "invalid script in OP_RETURN"),
            Self::OpCode => write!(f, "non-pushdata opcode in OP_RETURN"),
            Self::SupplyOverflow => write!(f, "supply overflows u128"),
            Self::TrailingIntegers => write!(f, "trailing integers in body"),
            Self::TruncatedField => write!(f, "field with missing value"),
            Self::UnrecognizedEvenTag => write!(f, "unrecognized even tag"),
            Self::UnrecognizedFlag => write!(f, "unrecognized field"),
            Self::VarInt => write!(f, "invalid varint"),
        }
    }
}

/// Set of [`Flaw`]s found while deciphering a runestone.
#[derive(Debug, Default, PartialEq, Copy, Clone, Hash, Eq)]
pub struct Flaws(u32);

impl Flaws {
    pub fn insert(&mut self, flaw: Flaw) {
        self.0 |= flaw.mask();
    }

    pub fn contains(self, flaw: Flaw) -> bool {
        self.0 & flaw.mask() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Flaw> {
        Flaw::ALL.into_iter().filter(move |flaw| self.contains(*flaw))
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl From<Flaw> for Flaws {
    fn from(flaw: Flaw) -> Self {
        let mut flaws = Self::default();
        flaws.insert(flaw);
        flaws
    }
}

impl FromIterator<Flaw> for Flaws {
    fn from_iter<I: IntoIterator<Item = Flaw>>(iter: I) -> Self {
        let mut flaws = Self::default();
        for flaw in iter {
            flaws.insert(flaw);
        }
        flaws
    }
}

impl Serialize for Flaws {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for Flaws {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Vec::<Flaw>::deserialize(deserializer)?.into_iter().collect())
    }
}
