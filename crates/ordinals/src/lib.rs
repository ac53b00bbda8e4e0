//! Types for interoperating with runes.
//!
//! This crate holds the consensus-critical pieces of the runes protocol: the
//! LEB128 [`varint`] codec, [`Rune`] names and their unlock schedule,
//! [`RuneId`] references, and the [`Runestone`] decoder/encoder that turns a
//! transaction's `OP_RETURN OP_13` output into a structured message.

use {
    bitcoin::{
        constants::MAX_SCRIPT_ELEMENT_SIZE,
        opcodes,
        script::{self, Instruction},
        Network, ScriptBuf, Transaction,
    },
    serde::{Deserialize, Serialize},
    serde_with::{DeserializeFromStr, SerializeDisplay},
    std::{
        collections::{HashMap, VecDeque},
        fmt::{self, Display, Formatter},
        str::FromStr,
    },
};

use self::{
    flag::{Flag, Flags},
    message::Message,
    tag::Tag,
};

pub use {
    edict::Edict,
    etching::{Etching, RunestoneEtching},
    flaw::{Flaw, Flaws},
    rune::Rune,
    rune_id::RuneId,
    runestone::Runestone,
    spaced_rune::SpacedRune,
    terms::Terms,
};

pub const SUBSIDY_HALVING_INTERVAL: u32 = 210_000;

pub const COMMIT_CONFIRMATIONS: u16 = 6;

mod edict;
mod etching;
mod flag;
mod flaw;
mod message;
pub mod rune;
pub mod rune_id;
mod runestone;
pub mod spaced_rune;
mod tag;
mod terms;
pub mod varint;
