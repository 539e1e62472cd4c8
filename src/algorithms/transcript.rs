//! Transcript hasher for Fiat-Shamir challenges and commitments
//!
//! A [`Transcript`] is an incremental SHA-512/256 state. Every value is absorbed with a one byte type tag and its length, so that
//! distinct sequences of values never produce the same input to the hash function.
//!
//! Transcripts are cheap to clone. A session starts with a base transcript bound to the protocol and its participants,
//! and every proof clones it before absorbing its own public data.

use crate::protocol::PartyIndex;
use curv::arithmetic::traits::Converter;
use curv::elliptic::curves::traits::{ECPoint, ECScalar};
use curv::{BigInt, FE, GE};
use sha2::{Digest, Sha512Trunc256};

/// Output of the hash function
pub type HashOutput = [u8; 32];

const TAG_BYTES: u8 = 1;
const TAG_INTEGER: u8 = 2;
const TAG_POINT: u8 = 3;
const TAG_SCALAR: u8 = 4;
const TAG_PARTY: u8 = 5;
const TAG_LABEL: u8 = 6;

#[derive(Clone)]
pub struct Transcript {
    hasher: Sha512Trunc256,
}

/// Values which can be absorbed into a transcript
pub trait TranscriptWrite {
    fn write_to(&self, transcript: &mut Transcript);
}

impl Transcript {
    /// creates new transcript separated from other usages by `domain`
    pub fn new(domain: &[u8]) -> Self {
        let mut transcript = Transcript {
            hasher: Sha512Trunc256::new(),
        };
        transcript.absorb(TAG_LABEL, domain);
        transcript
    }

    fn absorb(&mut self, tag: u8, bytes: &[u8]) {
        self.hasher.input(&[tag]);
        self.hasher.input(&(bytes.len() as u64).to_le_bytes());
        self.hasher.input(bytes);
    }

    /// absorbs a name of a proof or a step of a protocol
    pub fn write_label(&mut self, label: &str) -> &mut Self {
        self.absorb(TAG_LABEL, label.as_bytes());
        self
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.absorb(TAG_BYTES, bytes);
        self
    }

    pub fn write_u64(&mut self, x: u64) -> &mut Self {
        self.absorb(TAG_BYTES, &x.to_le_bytes());
        self
    }

    /// absorbs an integer of any sign; the sign goes before the magnitude
    pub fn write_bigint(&mut self, x: &BigInt) -> &mut Self {
        let mut bytes = vec![if *x < BigInt::zero() { 1u8 } else { 0u8 }];
        bytes.extend_from_slice(&BigInt::to_vec(&x.abs()));
        self.absorb(TAG_INTEGER, &bytes);
        self
    }

    pub fn write_point(&mut self, p: &GE) -> &mut Self {
        self.absorb(TAG_POINT, &p.pk_to_key_slice());
        self
    }

    pub fn write_scalar(&mut self, x: &FE) -> &mut Self {
        let mut bytes = [0u8; 32];
        let value = BigInt::to_vec(&x.to_big_int());
        bytes[32 - value.len()..].copy_from_slice(&value);
        self.absorb(TAG_SCALAR, &bytes);
        self
    }

    pub fn write_party(&mut self, party: &PartyIndex) -> &mut Self {
        self.absorb(TAG_PARTY, party.as_bytes());
        self
    }

    pub fn write<T: TranscriptWrite + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.write_to(self);
        self
    }

    /// hash of everything absorbed so far; the transcript can be extended afterwards
    pub fn digest(&self) -> HashOutput {
        let result = self.hasher.clone().result();
        let mut output = [0u8; 32];
        output.copy_from_slice(&result[..]);
        output
    }

    /// Fiat-Shamir challenge in $`[0, q)`$
    pub fn challenge(&self) -> BigInt {
        BigInt::from(&self.digest()[..]).mod_floor(&FE::q())
    }
}

impl TranscriptWrite for BigInt {
    fn write_to(&self, transcript: &mut Transcript) {
        transcript.write_bigint(self);
    }
}

impl TranscriptWrite for GE {
    fn write_to(&self, transcript: &mut Transcript) {
        transcript.write_point(self);
    }
}

impl TranscriptWrite for FE {
    fn write_to(&self, transcript: &mut Transcript) {
        transcript.write_scalar(self);
    }
}

impl TranscriptWrite for PartyIndex {
    fn write_to(&self, transcript: &mut Transcript) {
        transcript.write_party(self);
    }
}

impl TranscriptWrite for HashOutput {
    fn write_to(&self, transcript: &mut Transcript) {
        transcript.write_bytes(self);
    }
}

impl TranscriptWrite for paillier::EncryptionKey {
    fn write_to(&self, transcript: &mut Transcript) {
        transcript.write_bigint(&self.n);
    }
}

impl<T: TranscriptWrite> TranscriptWrite for [T] {
    fn write_to(&self, transcript: &mut Transcript) {
        transcript.write_u64(self.len() as u64);
        self.iter().for_each(|x| x.write_to(transcript));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_are_independent() {
        let mut base = Transcript::new(b"test");
        base.write_u64(7);
        let mut a = base.clone();
        let mut b = base.clone();
        a.write_party(&PartyIndex::from(1));
        b.write_party(&PartyIndex::from(2));
        assert_ne!(a.digest(), b.digest());
        assert_ne!(a.digest(), base.digest());
        assert_eq!(base.digest(), base.clone().digest());
    }

    #[test]
    fn sign_and_framing_are_absorbed() {
        let mut plus = Transcript::new(b"test");
        plus.write_bigint(&BigInt::from(5));
        let mut minus = Transcript::new(b"test");
        minus.write_bigint(&BigInt::from(-5));
        assert_ne!(plus.digest(), minus.digest());

        let mut joined = Transcript::new(b"test");
        joined.write_bytes(b"ab").write_bytes(b"c");
        let mut split = Transcript::new(b"test");
        split.write_bytes(b"a").write_bytes(b"bc");
        assert_ne!(joined.digest(), split.digest());
    }

    #[test]
    fn challenge_is_reduced() {
        let mut t = Transcript::new(b"test");
        for i in 0..50u64 {
            t.write_u64(i);
            let e = t.challenge();
            assert!(e >= BigInt::zero() && e < FE::q());
        }
    }
}
