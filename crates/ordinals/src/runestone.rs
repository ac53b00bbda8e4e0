use super::*;

/// The runes message carried by one transaction.
///
/// A runestone with any [`Flaw`] is a cenotaph: its edicts and pointer are
/// dropped, its etching is reduced to a bare name, and every rune it touches
/// is burned by the indexer.
#[derive(Default, Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Runestone {
    pub edicts: Vec<Edict>,
    pub etching: Option<RunestoneEtching>,
    pub mint: Option<RuneId>,
    pub pointer: Option<u32>,
    pub cenotaph: bool,
    pub flaws: Flaws,
}

#[derive(Debug, PartialEq)]
enum Payload {
    Valid(Vec<u8>),
    Invalid(Flaw),
}

impl Runestone {
    pub const MAGIC_NUMBER: opcodes::Opcode = opcodes::all::OP_PUSHNUM_13;

    /// Returns `None` when no output starts with `OP_RETURN OP_13`.
    pub fn decipher(transaction: &Transaction) -> Option<Self> {
        let payload = match Runestone::payload(transaction)? {
            Payload::Valid(payload) => payload,
            Payload::Invalid(flaw) => return Some(Self::cenotaph(flaw.into(), None, None)),
        };

        let Ok(integers) = Runestone::integers(&payload) else {
            return Some(Self::cenotaph(Flaw::VarInt.into(), None, None));
        };

        let Message {
            mut flaws,
            edicts,
            mut fields,
        } = Message::from_integers(transaction, &integers);

        let mut flags = Tag::Flags
            .take(&mut fields, |[flags]| Some(flags))
            .map(Flags::new)
            .unwrap_or_default();

        let etching = flags.take(Flag::Etching).then(|| Etching {
            divisibility: Tag::Divisibility.take(&mut fields, |[divisibility]| {
                let divisibility = u8::try_from(divisibility).ok()?;
                (divisibility <= Etching::MAX_DIVISIBILITY).then_some(divisibility)
            }),
            premine: Tag::Premine.take(&mut fields, |[premine]| Some(premine)),
            rune: Tag::Rune.take(&mut fields, |[rune]| Some(Rune(rune))),
            spacers: Tag::Spacers.take(&mut fields, |[spacers]| {
                let spacers = u32::try_from(spacers).ok()?;
                (spacers <= Etching::MAX_SPACERS).then_some(spacers)
            }),
            symbol: Tag::Symbol.take(&mut fields, |[symbol]| {
                char::from_u32(u32::try_from(symbol).ok()?)
            }),
            terms: flags.take(Flag::Terms).then(|| Terms {
                cap: Tag::Cap.take(&mut fields, |[cap]| Some(cap)),
                height: (
                    Tag::HeightStart.take(&mut fields, |[start]| u64::try_from(start).ok()),
                    Tag::HeightEnd.take(&mut fields, |[end]| u64::try_from(end).ok()),
                ),
                amount: Tag::Amount.take(&mut fields, |[amount]| Some(amount)),
                offset: (
                    Tag::OffsetStart.take(&mut fields, |[start]| u64::try_from(start).ok()),
                    Tag::OffsetEnd.take(&mut fields, |[end]| u64::try_from(end).ok()),
                ),
            }),
            turbo: flags.take(Flag::Turbo),
        });

        let mint = Tag::Mint.take(&mut fields, |[block, tx]| {
            RuneId::new(block.try_into().ok()?, tx.try_into().ok()?)
        });

        let pointer = Tag::Pointer.take(&mut fields, |[pointer]| {
            let pointer = u32::try_from(pointer).ok()?;
            (usize::try_from(pointer).ok()? < transaction.output.len()).then_some(pointer)
        });

        if etching
            .map(|etching| etching.supply().is_none())
            .unwrap_or_default()
        {
            flaws.insert(Flaw::SupplyOverflow);
        }

        if flags.bits() != 0 {
            flaws.insert(Flaw::UnrecognizedFlag);
        }

        if fields.keys().any(|tag| tag % 2 == 0) {
            flaws.insert(Flaw::UnrecognizedEvenTag);
        }

        if !flaws.is_empty() {
            return Some(Self::cenotaph(
                flaws,
                etching.and_then(|etching| etching.rune),
                mint,
            ));
        }

        Some(Self {
            edicts,
            etching: etching.map(RunestoneEtching::Full),
            mint,
            pointer,
            cenotaph: false,
            flaws,
        })
    }

    fn cenotaph(flaws: Flaws, rune: Option<Rune>, mint: Option<RuneId>) -> Self {
        Self {
            edicts: Vec::new(),
            etching: rune.map(RunestoneEtching::NameOnly),
            mint,
            pointer: None,
            cenotaph: true,
            flaws,
        }
    }

    /// Encodes the runestone as an `OP_RETURN OP_13 <payload>` script.
    pub fn encipher(&self) -> ScriptBuf {
        let mut payload = Vec::new();

        match &self.etching {
            Some(RunestoneEtching::Full(etching)) => {
                let mut flags = Flags::default();
                flags.set(Flag::Etching);

                if etching.terms.is_some() {
                    flags.set(Flag::Terms);
                }

                if etching.turbo {
                    flags.set(Flag::Turbo);
                }

                Tag::Flags.encode([flags.bits()], &mut payload);

                Tag::Rune.encode_option(etching.rune.map(|rune| rune.0), &mut payload);
                Tag::Divisibility.encode_option(etching.divisibility, &mut payload);
                Tag::Spacers.encode_option(etching.spacers, &mut payload);
                Tag::Symbol.encode_option(etching.symbol, &mut payload);
                Tag::Premine.encode_option(etching.premine, &mut payload);

                if let Some(terms) = etching.terms {
                    Tag::Amount.encode_option(terms.amount, &mut payload);
                    Tag::Cap.encode_option(terms.cap, &mut payload);
                    Tag::HeightStart.encode_option(terms.height.0, &mut payload);
                    Tag::HeightEnd.encode_option(terms.height.1, &mut payload);
                    Tag::OffsetStart.encode_option(terms.offset.0, &mut payload);
                    Tag::OffsetEnd.encode_option(terms.offset.1, &mut payload);
                }
            }
            Some(RunestoneEtching::NameOnly(rune)) => {
                let mut flags = Flags::default();
                flags.set(Flag::Etching);
                Tag::Flags.encode([flags.bits()], &mut payload);
                Tag::Rune.encode([rune.0], &mut payload);
            }
            None => {}
        }

        if let Some(RuneId { block, tx }) = self.mint {
            Tag::Mint.encode([block.into(), tx.into()], &mut payload);
        }

        Tag::Pointer.encode_option(self.pointer, &mut payload);

        if !self.edicts.is_empty() {
            varint::encode_to_vec(Tag::Body.into(), &mut payload);

            let mut edicts = self.edicts.clone();
            edicts.sort_by_key(|edict| edict.id);

            let mut previous = RuneId::default();
            for edict in edicts {
                // sorted ascending, so the delta always exists
                let Some((block, tx)) = previous.delta(edict.id) else {
                    continue;
                };
                varint::encode_to_vec(block, &mut payload);
                varint::encode_to_vec(tx, &mut payload);
                varint::encode_to_vec(edict.amount, &mut payload);
                varint::encode_to_vec(edict.output.into(), &mut payload);
                previous = edict.id;
            }
        }

        let mut builder = script::Builder::new()
            .push_opcode(opcodes::all::OP_RETURN)
            .push_opcode(Runestone::MAGIC_NUMBER);

        for chunk in payload.chunks(MAX_SCRIPT_ELEMENT_SIZE) {
            let Ok(push) = <&script::PushBytes>::try_from(chunk) else {
                continue;
            };
            builder = builder.push_slice(push);
        }

        builder.into_script()
    }

    fn payload(transaction: &Transaction) -> Option<Payload> {
        for output in &transaction.output {
            let mut instructions = output.script_pubkey.instructions();

            if instructions.next() != Some(Ok(Instruction::Op(opcodes::all::OP_RETURN))) {
                continue;
            }

            if instructions.next() != Some(Ok(Instruction::Op(Runestone::MAGIC_NUMBER))) {
                continue;
            }

            let mut payload = Vec::new();

            for result in instructions {
                match result {
                    Ok(Instruction::PushBytes(push)) => {
                        payload.extend_from_slice(push.as_bytes());
                    }
                    Ok(Instruction::Op(_)) => {
                        return Some(Payload::Invalid(Flaw::OpCode));
                    }
                    Err(_) => {
                        return Some(Payload::Invalid(Flaw::InvalidScript));
                    }
                }
            }

            return Some(Payload::Valid(payload));
        }

        None
    }

    fn integers(payload: &[u8]) -> Result<Vec<u128>, varint::Error> {
        let mut integers = Vec::new();
        let mut i = 0;

        while i < payload.len() {
            let (integer, length) = varint::decode(&payload[i..])?;
            integers.push(integer);
            i += length;
        }

        Ok(integers)
    }
}
