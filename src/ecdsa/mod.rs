//!  Multiparty threshold signature scheme
//!
//!  Threshold ECDSA of the CMP family, ["UC Non-Interactive, Proactive, Threshold ECDSA with Identifiable Aborts"](https://eprint.iacr.org/2021/060.pdf),
//!  with broadcasts replaced by the echo rounds of [`round::broadcast`](../round/broadcast/index.html).
//!
//!  The module implements following algorithms:
//! * Key generation
//! * Key refresh, which renews the shares and the Paillier keys of the same key
//! * Signing by any `threshold + 1` holders of the shares
//!
use crate::algorithms::encryption::PaillierKeys;
use crate::algorithms::pedersen::PedersenParameters;
use crate::algorithms::transcript::{HashOutput, Transcript};
use crate::algorithms::zkp::ZkError;
use crate::algorithms::{add_points, to_scalar};
use crate::protocol::{PartyIndex, PartyList, RoundNumber};
use crate::round::{InMsg, ProtocolError};
use curv::arithmetic::traits::Modulo;
use curv::elliptic::curves::traits::{ECPoint, ECScalar};
use curv::{BigInt, FE, GE};
use paillier::EncryptionKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use trace::trace;
use zeroize::Zeroize;

pub mod keygen;
pub mod messages;
pub mod signature;

pub use keygen::{start_keygen, start_refresh, Keygen, KeygenOutput};
pub use signature::{start_sign, Sign};

/// Parameters associated with shared key in threshold schema
///
/// # Key Attributes
///
/// * `share count` - number of parties which hold shards of the key
/// * `threshold` - number of parties required to produce a signature minus 1 so that $` \min N_{required} = threshold + 1 `$
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Parameters {
    threshold: usize,   //t
    share_count: usize, //n
}

impl Parameters {
    /// Constructs new Parameters conditioned they satisfy `2 <= min_signers <= share_count`.
    ///
    /// Parameters are used for Shamir secret sharing, so that the threshold sharing parameter
    /// is equal to the degree of the polynomial used in sharing.
    ///
    /// That is, `threshold` = `min_signers` - 1
    pub fn new(min_signers: usize, share_count: usize) -> Result<Self, ProtocolError> {
        if share_count < 2 {
            return Err(ProtocolError::Setup(format!(
                "Number of shares must be at least 2, got {}",
                share_count
            )));
        }
        // share_count >= 2

        if min_signers < 2 {
            return Err(ProtocolError::Setup(format!(
                "Number of signers must be at least 2, got: {}",
                min_signers
            )));
        }
        // min_signers >= 2

        if min_signers > share_count {
            return Err(ProtocolError::Setup(format!(
                "Number of signers {} cannot be greater than number of shares {}",
                min_signers, share_count
            )));
        }

        //
        // 1 <= min_signers - 1 = threshold < share_count

        Ok(Parameters {
            threshold: min_signers - 1,
            share_count,
        })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn share_count(&self) -> usize {
        self.share_count
    }

    pub fn signers(&self) -> usize {
        self.threshold + 1
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{threshold: {}, share_count: {}}}",
            self.threshold, self.share_count
        )
    }
}

pub type MessageHashType = FE;

/// The result of ECDSA signing algorithm
///
/// The signature the schema with
///
/// * cyclic group $` \mathcal{G} `$ of prime order $`q`$ and generator $` g `$
/// * message $` m `$ , private key $` x `$
/// * mapping $` F : \mathcal{G} \to \mathbb{Z}_q `$, hash function $` H(t) `$
/// * random  $` k \in \mathbb{Z}_{q} `$
///
/// The signature contains
/// ```math
///    r = F(g^k) , \space s = k^{-1}(H(m) + x r) \mod q
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub r: FE,
    pub s: FE,
}

impl Signature {
    /// verifies the signature using public key and the hash of the message
    pub fn verify(&self, pubkey: &GE, message: &MessageHashType) -> bool {
        let zero = BigInt::zero();
        if self.s.to_big_int() == zero || self.r.to_big_int() == zero {
            return false;
        }
        let g: GE = ECPoint::generator();

        let s_invert = self.s.invert();
        let u1 = (*message) * s_invert;
        let u2 = self.r * s_invert;

        match add_points(&(g * u1), &(pubkey * &u2)).and_then(|p| p.x_coor()) {
            Some(x) => self.r.to_big_int() == x.mod_floor(&FE::q()),
            None => false,
        }
    }
}

/// Map of `PartyIndex` of each party into the x-coordinate of its share
///
/// The point of a party is its position in the sorted list of parties plus one.
/// Used in the calculation of Lagrange's coefficients in the signing protocol as only some parties take part in it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Party2PointMap {
    pub points: BTreeMap<PartyIndex, usize>,
}

impl Party2PointMap {
    pub fn new(parties: &PartyList) -> Self {
        Party2PointMap {
            points: parties
                .iter()
                .enumerate()
                .map(|(i, p)| (*p, i + 1))
                .collect(),
        }
    }

    /// the x-coordinate of the share of `party`
    pub fn point(&self, party: &PartyIndex) -> Option<FE> {
        self.points
            .get(party)
            .map(|x| ECScalar::from(&BigInt::from(*x as u64)))
    }

    /// Lagrange's coefficient of `party` for the interpolation at zero over the points of `signing_parties`
    #[trace(pretty, prefix = "Party2PointMap::")]
    pub fn calculate_lagrange_multiplier(
        &self,
        signing_parties: &[PartyIndex],
        party: &PartyIndex,
    ) -> Result<FE, ProtocolError> {
        let absent = signing_parties
            .iter()
            .chain(std::iter::once(party))
            .filter(|p| !self.points.contains_key(*p))
            .collect::<Vec<_>>();
        if !absent.is_empty() {
            return Err(ProtocolError::Setup(format!(
                "parties without shares: {:?}",
                absent
            )));
        }

        let q = FE::q();
        let own_x = BigInt::from(self.points[party] as u64);
        let (num, denom) = signing_parties
            .iter()
            .filter(|p| *p != party)
            .map(|p| BigInt::from(self.points[p] as u64))
            .fold(
                (BigInt::one(), BigInt::one()),
                |(num, denom), x| {
                    let diff = BigInt::mod_sub(&x, &own_x, &q);
                    (
                        BigInt::mod_mul(&num, &x, &q),
                        BigInt::mod_mul(&denom, &diff, &q),
                    )
                },
            );
        let denom = BigInt::mod_inv(&denom, &q);
        to_scalar(&BigInt::mod_mul(&num, &denom, &q))
            .ok_or_else(|| ProtocolError::Setup("degenerate set of signers".to_string()))
    }
}

/// Public data of a party bound to the shared key
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicShare {
    /// $`X_j = [x_j] \cdot G`$
    pub ecdsa: GE,
    pub paillier: EncryptionKey,
    pub pedersen: PedersenParameters,
}

/// Public result of key generation, the same for all parties
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub threshold: usize,
    pub public_key: GE,
    pub parties: PartyList,
    pub points: Party2PointMap,
    pub public: BTreeMap<PartyIndex, PublicShare>,
    /// common randomness of the key generation
    pub rid: HashOutput,
}

impl Session {
    /// extends the transcript with the data identifying the key
    pub(crate) fn absorb_into(&self, transcript: &mut Transcript) {
        transcript
            .write_label("session")
            .write_point(&self.public_key)
            .write_bytes(&self.rid);
        for (party, share) in &self.public {
            transcript
                .write_party(party)
                .write_point(&share.ecdsa)
                .write(&share.paillier)
                .write(&share.pedersen);
        }
    }
}

/// Secret result of key generation
#[derive(Clone, Serialize, Deserialize)]
pub struct Secret {
    pub id: PartyIndex,
    /// $`x_i`$
    pub ecdsa: FE,
    pub paillier: PaillierKeys,
}

impl Zeroize for Secret {
    fn zeroize(&mut self) {
        self.ecdsa.zeroize();
        self.paillier.zeroize();
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.ecdsa.zeroize();
    }
}

impl Display for Secret {
    /// hides the secret share
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("id", &self.id)
            .field("ecdsa", &"[***]".to_owned())
            .field("paillier", &self.paillier)
            .finish()
    }
}

impl Debug for Secret {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// converts the error of a prover into the error of the round
pub(crate) fn proving_error(round: RoundNumber) -> impl Fn(ZkError) -> ProtocolError {
    move |e| match e {
        ZkError::Proving { proof, reason } => ProtocolError::Proving {
            proof,
            round,
            reason,
        },
        ZkError::Fixture(reason) => ProtocolError::Setup(reason),
    }
}

pub(crate) fn unexpected<C: Display>(msg: &InMsg<C>, round: RoundNumber) -> ProtocolError {
    ProtocolError::UnexpectedContent {
        content: msg.body.content.to_string(),
        round,
        party: msg.sender,
    }
}

/// unwraps the variant of the content expected by the round
pub(crate) fn take_content<T, C>(
    msg: InMsg<C>,
    round: RoundNumber,
) -> Result<(PartyIndex, T), ProtocolError>
where
    C: Display + Into<Option<T>>,
{
    let content = msg.body.content.to_string();
    let party = msg.sender;
    Into::<Option<T>>::into(msg.body.content)
        .map(|value| (party, value))
        .ok_or(ProtocolError::UnexpectedContent {
            content,
            round,
            party,
        })
}

pub(crate) fn consistency(round: RoundNumber, reason: &str) -> ProtocolError {
    ProtocolError::Consistency {
        round,
        reason: reason.to_string(),
    }
}

/// data of a party is absent though the round is complete
pub(crate) fn missing(round: RoundNumber, party: &PartyIndex) -> ProtocolError {
    ProtocolError::Consistency {
        round,
        reason: format!("no data of party {}", party),
    }
}

/// $`\sum x_i \mod q`$ as a scalar; `None` for a zero sum
pub(crate) fn sum_scalars<'a, I: Iterator<Item = &'a BigInt>>(values: I) -> Option<FE> {
    let q = FE::q();
    let sum = values.fold(BigInt::zero(), |acc, x| BigInt::mod_add(&acc, x, &q));
    to_scalar(&sum)
}

/// $`\sum X_i`$; `None` if an intermediate sum is the point at infinity
pub(crate) fn sum_points<'a, I: Iterator<Item = &'a GE>>(mut points: I) -> Option<GE> {
    let first = *points.next()?;
    points.try_fold(first, |acc, p| add_points(&acc, p))
}
