//! Defines some common data types: party identifiers, protocol identifiers and message envelopes

#![allow(clippy::large_enum_variant)]
use core::cmp::Ordering;
use core::fmt::{Error, Formatter};
use hex::FromHexError;
use serde::de::Visitor;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::round::ProtocolError;
use anyhow::bail;
use std::collections::BTreeSet;
use std::fmt::{Debug, Display};

/// Index of a party in multi-party computation
///
/// Abstract index whose binding to a network address has to be defined outside of the crate.
/// Uses 32 byte slice to fit a public 256 bit key of an elliptic curve schema.
/// The bytes are little endian, so that indices built from integers are ordered numerically.
#[derive(Clone, Copy, Hash, Eq, PartialEq)]
pub struct PartyIndex(pub [u8; 32]);

impl PartyIndex {
    pub fn from_slice(slice: &[u8]) -> anyhow::Result<Self> {
        if slice.len() != 32 {
            bail!("Slice is required to be 32 bytes long");
        }
        let mut result = [0u8; 32];
        result.clone_from_slice(slice);
        Ok(PartyIndex(result))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn write_as_hex_str(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        self.0.iter().rev().try_for_each(|x| write!(f, "{:02X}", x))
    }
}

impl Default for PartyIndex {
    fn default() -> Self {
        PartyIndex([0u8; 32])
    }
}

impl Display for PartyIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        self.write_as_hex_str(f)
    }
}

impl Debug for PartyIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        self.write_as_hex_str(f)
    }
}

impl From<usize> for PartyIndex {
    fn from(x: usize) -> Self {
        let mut result = [0u8; 32];
        let bytes = x.to_le_bytes();
        result[..bytes.len()].clone_from_slice(&bytes);
        PartyIndex(result)
    }
}

impl Ord for PartyIndex {
    fn cmp(&self, other: &Self) -> Ordering {
        // most significant byte is the last one
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl PartialOrd for PartyIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for PartyIndex {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}", self))
    }
}

impl<'a> Deserialize<'a> for PartyIndex {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'a>,
    {
        struct HexVisitor;

        impl<'a> Visitor<'a> for HexVisitor {
            type Value = PartyIndex;

            fn expecting(&self, formatter: &mut Formatter) -> Result<(), Error> {
                formatter.write_str("a 32 byte array in hex notation")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let mut bytes = hex::decode(v).map_err(|e| match e {
                    FromHexError::InvalidHexCharacter { c, index } => E::invalid_value(
                        de::Unexpected::Char(c),
                        &format!("Unexpected character {:?} as position {}", c, index).as_str(),
                    ),
                    FromHexError::InvalidStringLength => {
                        E::invalid_length(v.len(), &"Unexpected length of hex string")
                    }
                    FromHexError::OddLength => {
                        E::invalid_length(v.len(), &"Odd length of hex string")
                    }
                })?;
                if bytes.len() != 32 {
                    return Err(E::invalid_length(bytes.len(), &"32 bytes"));
                }
                bytes.reverse();
                let mut result = [0u8; 32];
                result.clone_from_slice(&bytes);
                Ok(PartyIndex(result))
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}

/// Sorted list of distinct parties taking part in a session
///
/// Every participant must build the same list, hence duplicates are rejected rather than merged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyList(Vec<PartyIndex>);

impl PartyList {
    pub fn new(parties: &[PartyIndex]) -> Result<Self, ProtocolError> {
        if parties.is_empty() {
            return Err(ProtocolError::Setup("empty list of parties".to_string()));
        }
        let sorted = parties.iter().cloned().collect::<BTreeSet<_>>();
        if sorted.len() != parties.len() {
            return Err(ProtocolError::Setup(
                "duplicate entries in the list of parties".to_string(),
            ));
        }
        Ok(PartyList(sorted.into_iter().collect()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, party: &PartyIndex) -> bool {
        self.0.binary_search(party).is_ok()
    }

    /// position of the party in the sorted list
    pub fn position(&self, party: &PartyIndex) -> Option<usize> {
        self.0.binary_search(party).ok()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PartyIndex> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[PartyIndex] {
        &self.0
    }

    /// all parties except `party`, in sorted order
    pub fn others(&self, party: &PartyIndex) -> Vec<PartyIndex> {
        self.0.iter().filter(|p| *p != party).cloned().collect()
    }
}

/// Identifies a protocol so that messages and challenges of different protocols never mix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolId {
    /// threshold keygen with echo broadcast
    #[serde(rename = "cmp/keygen-threshold-echo")]
    Keygen,
    /// threshold refresh with echo broadcast
    #[serde(rename = "cmp/refresh-threshold-echo")]
    Refresh,
    #[serde(rename = "cmp/sign-threshold-echo")]
    Sign,
}

impl ProtocolId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolId::Keygen => "cmp/keygen-threshold-echo",
            ProtocolId::Refresh => "cmp/refresh-threshold-echo",
            ProtocolId::Sign => "cmp/sign-threshold-echo",
        }
    }
}

impl Display for ProtocolId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        f.write_str(self.as_str())
    }
}

/// Number of a round within a protocol, starting from 1
pub type RoundNumber = u16;

/// Message destination address type
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum Address {
    Peer(PartyIndex),
    Broadcast,
}

/// Incoming message wrapper
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputMessage<BodyType> {
    pub sender: PartyIndex,
    pub body: BodyType,
}

/// Outgoing message wrapper
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputMessage<BodyType> {
    pub recipient: Address,
    pub body: BodyType,
}

/// The body of every message exchanged by a round based protocol
///
/// The sender and the recipient are carried by [`InputMessage`] and [`OutputMessage`] respectively.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoundMessage<C> {
    pub protocol: ProtocolId,
    pub round: RoundNumber,
    pub content: C,
}

/// Special wrapper for an input of a state machine. Enables termination of the machine via sending a message to it
#[derive(Debug, Clone)]
pub enum Instruction<T> {
    Data(T),
    Terminate,
}
