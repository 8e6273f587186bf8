//! The binary argument-encoding bitmap.
//!
//! Binary e-expressions precede their arguments with two presence bits per
//! signature parameter, telling the reader whether each parameter was
//! omitted, supplied as a single expression, or supplied as an expression
//! group. Text encodings have no bitmap; absence is syntactic there.
//!
//! Required (`!`) parameters still occupy a slot, with bits that read as
//! `Expression`, so the bitmap maps one-to-one with the
//! signature and nobody tracks a separate bit index. Bits are packed into
//! four 64-bit words, capping signatures at 128 parameters; nothing has
//! justified supporting more.

use serde::{Deserialize, Serialize};

use crate::macros::definition::Parameter;
use crate::VellumError;

const BITS_PER_SLOT: usize = 2;
const SLOTS_PER_BYTE: usize = 4;
const SLOTS_PER_WORD: usize = 32;
const WORD_COUNT: usize = 4;

/// The largest signature a binary invocation can carry presence bits for.
pub const MAX_PARAMETERS: usize = SLOTS_PER_WORD * WORD_COUNT;

/// The presence of one parameter's arguments in a binary invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgPresence {
    /// `0b00`: the parameter was omitted.
    Void,
    /// `0b01`: a single expression follows.
    Expression,
    /// `0b10`: an expression group follows.
    Group,
    /// `0b11`: reserved; always malformed.
    Reserved,
}

impl ArgPresence {
    fn from_bits(bits: u64) -> ArgPresence {
        match bits & 0b11 {
            0b00 => ArgPresence::Void,
            0b01 => ArgPresence::Expression,
            0b10 => ArgPresence::Group,
            _ => ArgPresence::Reserved,
        }
    }

    fn to_bits(self) -> u64 {
        match self {
            ArgPresence::Void => 0b00,
            ArgPresence::Expression => 0b01,
            ArgPresence::Group => 0b10,
            ArgPresence::Reserved => 0b11,
        }
    }
}

/// A bit-packed record of every parameter's [`ArgPresence`] for one binary
/// invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceBitmap {
    words: [u64; WORD_COUNT],
    parameter_count: usize,
}

impl PresenceBitmap {
    /// An all-void bitmap sized for a signature.
    ///
    /// # Errors
    /// Fails for signatures beyond [`MAX_PARAMETERS`].
    pub fn for_signature(signature: &[Parameter]) -> Result<Self, VellumError> {
        if signature.len() > MAX_PARAMETERS {
            return Err(VellumError::malformed_bitmap(format!(
                "signatures with more than {} parameters are not supported",
                MAX_PARAMETERS
            )));
        }
        Ok(PresenceBitmap { words: [0; WORD_COUNT], parameter_count: signature.len() })
    }

    /// Builds a bitmap for a signature from explicit presences, the shape
    /// test fixtures and writers use.
    pub fn of(
        signature: &[Parameter],
        presences: &[ArgPresence],
    ) -> Result<Self, VellumError> {
        let mut bitmap = PresenceBitmap::for_signature(signature)?;
        if presences.len() != signature.len() {
            return Err(VellumError::malformed_bitmap(format!(
                "{} presences for a {}-parameter signature",
                presences.len(),
                signature.len()
            )));
        }
        for (index, presence) in presences.iter().enumerate() {
            bitmap.set(index, *presence);
        }
        Ok(bitmap)
    }

    /// Decodes a bitmap from its wire bytes.
    ///
    /// # Errors
    /// Fails when the byte count disagrees with the signature's
    /// [`byte_size`](Self::byte_size).
    pub fn read_from(signature: &[Parameter], bytes: &[u8]) -> Result<Self, VellumError> {
        let mut bitmap = PresenceBitmap::for_signature(signature)?;
        let expected = bitmap.byte_size();
        if bytes.len() != expected {
            return Err(VellumError::malformed_bitmap(format!(
                "expected {} byte(s) of presence bits, found {}",
                expected,
                bytes.len()
            )));
        }
        for (byte_index, byte) in bytes.iter().enumerate() {
            let word = byte_index / 8;
            let shift = (byte_index % 8) * 8;
            bitmap.words[word] |= (*byte as u64) << shift;
        }
        Ok(bitmap)
    }

    /// The number of bytes this bitmap occupies on the wire. Zero only for
    /// empty signatures; required parameters still occupy slots.
    pub fn byte_size(&self) -> usize {
        self.parameter_count.div_ceil(SLOTS_PER_BYTE)
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    /// The presence bits for one parameter, by signature index.
    pub fn get(&self, index: usize) -> ArgPresence {
        if index >= self.parameter_count {
            return ArgPresence::Reserved;
        }
        let word = index / SLOTS_PER_WORD;
        let shift = (index % SLOTS_PER_WORD) * BITS_PER_SLOT;
        ArgPresence::from_bits(self.words[word] >> shift)
    }

    pub fn set(&mut self, index: usize, presence: ArgPresence) {
        if index >= self.parameter_count {
            return;
        }
        let word = index / SLOTS_PER_WORD;
        let shift = (index % SLOTS_PER_WORD) * BITS_PER_SLOT;
        self.words[word] &= !(0b11u64 << shift);
        self.words[word] |= presence.to_bits() << shift;
    }

    /// Checks every slot against the signature's cardinalities: required
    /// parameters must read `Expression`, `Void` needs a voidable
    /// cardinality, `Group` needs a multi cardinality, and `Reserved` is
    /// always malformed.
    pub fn validate(&self, signature: &[Parameter]) -> Result<(), VellumError> {
        if signature.len() != self.parameter_count {
            return Err(VellumError::malformed_bitmap(format!(
                "bitmap sized for {} parameters checked against {}",
                self.parameter_count,
                signature.len()
            )));
        }
        for (index, parameter) in signature.iter().enumerate() {
            let presence = self.get(index);
            let cardinality = parameter.cardinality();
            let ok = match presence {
                ArgPresence::Expression => true,
                ArgPresence::Void => cardinality.can_be_void(),
                ArgPresence::Group => cardinality.can_be_multi(),
                ArgPresence::Reserved => false,
            };
            if !ok {
                return Err(VellumError::malformed_bitmap(format!(
                    "presence {:?} is invalid for parameter '{}' with cardinality {}",
                    presence,
                    parameter.name(),
                    parameter.cardinality().sigil()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::definition::Parameter;

    fn signature(n: usize) -> Vec<Parameter> {
        (0..n).map(|i| Parameter::zero_or_more(format!("p{}", i))).collect()
    }

    #[test]
    fn get_and_set_round_trip_across_word_boundaries() {
        let signature = signature(100);
        let mut bitmap = PresenceBitmap::for_signature(&signature).unwrap();
        for index in 0..100 {
            let presence = match index % 3 {
                0 => ArgPresence::Void,
                1 => ArgPresence::Expression,
                _ => ArgPresence::Group,
            };
            bitmap.set(index, presence);
        }
        for index in 0..100 {
            let expected = match index % 3 {
                0 => ArgPresence::Void,
                1 => ArgPresence::Expression,
                _ => ArgPresence::Group,
            };
            assert_eq!(bitmap.get(index), expected, "slot {}", index);
        }
    }

    #[test]
    fn byte_size_rounds_up() {
        assert_eq!(PresenceBitmap::for_signature(&signature(1)).unwrap().byte_size(), 1);
        assert_eq!(PresenceBitmap::for_signature(&signature(4)).unwrap().byte_size(), 1);
        assert_eq!(PresenceBitmap::for_signature(&signature(5)).unwrap().byte_size(), 2);
        assert_eq!(PresenceBitmap::for_signature(&signature(0)).unwrap().byte_size(), 0);
    }

    #[test]
    fn read_from_rejects_wrong_byte_counts() {
        let signature = signature(3);
        assert!(PresenceBitmap::read_from(&signature, &[]).is_err());
        assert!(PresenceBitmap::read_from(&signature, &[0, 0]).is_err());
        let bitmap = PresenceBitmap::read_from(&signature, &[0b10_01_00]).unwrap();
        assert_eq!(bitmap.get(0), ArgPresence::Void);
        assert_eq!(bitmap.get(1), ArgPresence::Expression);
        assert_eq!(bitmap.get(2), ArgPresence::Group);
    }

    #[test]
    fn validate_enforces_cardinalities() {
        let signature = vec![Parameter::required("a"), Parameter::zero_or_one("b")];
        let ok = PresenceBitmap::of(
            &signature,
            &[ArgPresence::Expression, ArgPresence::Void],
        )
        .unwrap();
        assert!(ok.validate(&signature).is_ok());

        // Void for a required parameter.
        let void_required =
            PresenceBitmap::of(&signature, &[ArgPresence::Void, ArgPresence::Void]).unwrap();
        assert!(void_required.validate(&signature).is_err());

        // Group for a zero-or-one parameter.
        let group_single =
            PresenceBitmap::of(&signature, &[ArgPresence::Expression, ArgPresence::Group])
                .unwrap();
        assert!(group_single.validate(&signature).is_err());

        // Reserved bits anywhere.
        let mut reserved = PresenceBitmap::for_signature(&signature).unwrap();
        reserved.set(0, ArgPresence::Reserved);
        assert!(reserved.validate(&signature).is_err());
    }

    #[test]
    fn oversized_signatures_are_rejected() {
        assert!(PresenceBitmap::for_signature(&signature(MAX_PARAMETERS)).is_ok());
        assert!(PresenceBitmap::for_signature(&signature(MAX_PARAMETERS + 1)).is_err());
    }
}
