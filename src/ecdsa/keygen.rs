//! Multi-party key generation and key refresh
//!
//! Threshold key generation of CMP, chapter 3 of ["UC Non-Interactive, Proactive, Threshold ECDSA with Identifiable Aborts"](https://eprint.iacr.org/2021/060.pdf),
//! with Feldman's secret sharing in place of the additive one.
//!
//! * Every party samples a polynomial of degree `threshold`, a Paillier key pair and Pedersen parameters, and commits to all of them.
//! * Commitments are broadcast with an echo round, so that a party cannot open different values to different parties.
//! * Decommitments carry the proofs of the Paillier modulus and the Pedersen parameters.
//! * Shares are encrypted with the Paillier key of the recipient and checked against the commitments to the polynomials.
//! * Each party proves the knowledge of its new secret share with Schnorr's proof, whose commitment was part of the first message.
//!
//! Key refresh runs the same rounds with polynomials sharing zero and adds the result to the previous shares, so that the public key stays the same
//! while all shares and Paillier keys change.
//!
//! # Example
//!
//! ```text
//!   let (protocol_sink, protocol_stream) = crossbeam_channel::unbounded();
//!   let (state_machine_sink, state_machine_stream) = crossbeam_channel::unbounded();
//!
//!   let (driver, info) = round::start(start_keygen(parties, threshold, myself, RoundConfig::default()))?;
//!   // to do: share protocol_sink and state_machine_stream with a network layer, using info.party_ids
//!   let mut machine = StateMachine::new(Box::new(driver), &protocol_stream, &state_machine_sink);
//!   let result = machine.execute(); // .await if the machine is async
//! ```

use crate::algorithms::encryption::{PaillierKeys, PaillierPublic};
use crate::algorithms::pedersen;
use crate::algorithms::polynomial::{ExponentPolynomial, Polynomial};
use crate::algorithms::transcript::{HashOutput, Transcript, TranscriptWrite};
use crate::algorithms::zkp::{modulus, prm, sch};
use crate::algorithms::{add_points, base_mul};
use crate::ecdsa::messages::keygen::{Commitment, Decommitment, EncryptedShare, Message};
use crate::ecdsa::{
    consistency, missing, proving_error, sum_scalars, take_content, unexpected, Party2PointMap,
    PublicShare, Secret, Session,
};
use crate::protocol::{PartyIndex, ProtocolId, RoundNumber};
use crate::round::broadcast::{Broadcast, Echo, EchoProtocol};
use crate::round::{
    ErrorState, Helper, InMsg, OutMsg, Outcome, Protocol, ProtocolError, Round, RoundConfig,
    StartFunc,
};
use curv::arithmetic::traits::ZeroizeBN;
use curv::elliptic::curves::traits::{ECPoint, ECScalar};
use curv::{FE, GE};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const FINAL_ROUND: RoundNumber = 6;

/// Key generation and key refresh
pub struct Keygen;

/// The result of key generation: the public data shared by all parties and the secret of this party
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeygenOutput {
    pub session: Session,
    pub secret: Secret,
}

impl Protocol for Keygen {
    type Content = Message;
    type Output = KeygenOutput;
    type Round = KeygenRound;
}

impl EchoProtocol for Keygen {
    fn broadcast_part(content: &Message) -> Option<&dyn TranscriptWrite> {
        match content {
            Message::Commitment(c) => Some(c as &dyn TranscriptWrite),
            _ => None,
        }
    }

    fn echo(digest: HashOutput) -> Message {
        Message::Echo(digest)
    }

    fn as_echo(content: &Message) -> Option<&HashOutput> {
        match content {
            Message::Echo(digest) => Some(digest),
            _ => None,
        }
    }
}

round_enum! {
    #[allow(clippy::large_enum_variant)]
    pub enum KeygenRound for Keygen {
        Round1(Round1),
        Round2(Broadcast<Round2>),
        Round3(Echo<Round2>),
        Round4(Round4),
        Round5(Round5),
        Round6(Round6),
    }
}

/// Starts key generation of `self_id` with the parties `party_ids`; any `threshold + 1` of them can sign
pub fn start_keygen(
    party_ids: Vec<PartyIndex>,
    threshold: usize,
    self_id: PartyIndex,
    config: RoundConfig,
) -> StartFunc<Keygen> {
    Box::new(move || {
        if threshold == 0 {
            return Err(ProtocolError::Setup(
                "threshold must be at least 1".to_string(),
            ));
        }
        let helper = Helper::new(
            ProtocolId::Keygen,
            FINAL_ROUND,
            self_id,
            &party_ids,
            threshold,
            &config,
        )?;
        let info = helper.info();
        Ok((
            Round1 {
                helper,
                previous: None,
            }
            .into(),
            info,
        ))
    })
}

/// Starts the refresh of the shares of the key described by `session`
pub fn start_refresh(session: Session, secret: Secret, config: RoundConfig) -> StartFunc<Keygen> {
    Box::new(move || {
        if session.threshold == 0 {
            return Err(ProtocolError::Setup(
                "threshold must be at least 1".to_string(),
            ));
        }
        let own = session.public.get(&secret.id).ok_or_else(|| {
            ProtocolError::Setup(format!("party {} has no share of the key", secret.id))
        })?;
        let g: GE = ECPoint::generator();
        if own.ecdsa != g * secret.ecdsa {
            return Err(ProtocolError::Setup(
                "secret share does not match the session".to_string(),
            ));
        }
        let mut helper = Helper::new(
            ProtocolId::Refresh,
            FINAL_ROUND,
            secret.id,
            session.parties.as_slice(),
            session.threshold,
            &config,
        )?;
        helper.absorb(|t| session.absorb_into(t));
        let info = helper.info();
        Ok((
            Round1 {
                helper,
                previous: Some(Previous { session, secret }),
            }
            .into(),
            info,
        ))
    })
}

/// The key being refreshed
struct Previous {
    session: Session,
    secret: Secret,
}

/// Secrets of the party carried through the rounds
struct Context {
    keys: PaillierKeys,
    polynomial: Polynomial,
    schnorr: sch::Randomness,
    decommitment: Decommitment,
    previous: Option<Previous>,
}

/// Samples the secrets and sends the commitment to them
pub struct Round1 {
    helper: Helper,
    previous: Option<Previous>,
}

impl Round<Keygen> for Round1 {
    fn number(&self) -> RoundNumber {
        1
    }

    fn helper(&self) -> &Helper {
        &self.helper
    }

    fn expects_messages(&self) -> bool {
        false
    }

    fn verify_message(&self, msg: &InMsg<Message>) -> Result<(), ProtocolError> {
        Err(unexpected(msg, 1))
    }

    fn store_message(&mut self, msg: InMsg<Message>) -> Result<(), ProtocolError> {
        Err(unexpected(&msg, 1))
    }

    fn finalize(self, out: &mut Vec<OutMsg<Message>>) -> Result<Outcome<Keygen>, ErrorState> {
        let helper = self.helper;
        let own_transcript = helper.hash_for_id(&helper.self_id());

        let keys = PaillierKeys::random();
        let (pedersen, mut lambda) = pedersen::generate(&keys);
        let prm = prm::Proof::new(&own_transcript, &pedersen, &lambda, &keys.phi())
            .map_err(proving_error(1));
        lambda.zeroize_bn();
        let prm = prm?;
        let modulus = modulus::Proof::new(&own_transcript, &keys.dk).map_err(|e| {
            log::error!("{}", e);
            ProtocolError::Proving {
                proof: "modulus",
                round: 1,
                reason: "no N-th root of the derived points",
            }
        })?;

        let constant = match &self.previous {
            Some(_) => None,
            None => Some(FE::new_random()),
        };
        let polynomial = Polynomial::sample(helper.threshold(), constant);
        let schnorr = sch::Randomness::new();

        let mut rng = rand::thread_rng();
        let mut rid = HashOutput::default();
        rng.fill_bytes(&mut rid);
        let mut salt = HashOutput::default();
        rng.fill_bytes(&mut salt);

        let decommitment = Decommitment {
            rid,
            vss: polynomial.exponent(),
            schnorr: schnorr.commitment().clone(),
            paillier: keys.ek.clone(),
            pedersen,
            prm,
            modulus,
            salt,
        };
        let commitment = Commitment {
            v: decommitment.hash(&own_transcript),
        };
        helper.broadcast(out, 2, Message::Commitment(commitment.clone()));

        let next = Round2 {
            helper,
            context: Box::new(Context {
                keys,
                polynomial,
                schnorr,
                decommitment,
                previous: self.previous,
            }),
            commitments: BTreeMap::new(),
        };
        Ok(Outcome::Next(
            Broadcast::new::<Keygen>(next, &commitment).into(),
        ))
    }
}

/// Collects the commitments; finalized after the echo round
pub struct Round2 {
    helper: Helper,
    context: Box<Context>,
    commitments: BTreeMap<PartyIndex, HashOutput>,
}

impl Round<Keygen> for Round2 {
    fn number(&self) -> RoundNumber {
        2
    }

    fn helper(&self) -> &Helper {
        &self.helper
    }

    fn verify_message(&self, msg: &InMsg<Message>) -> Result<(), ProtocolError> {
        match msg.body.content {
            Message::Commitment(_) => Ok(()),
            _ => Err(unexpected(msg, 2)),
        }
    }

    fn store_message(&mut self, msg: InMsg<Message>) -> Result<(), ProtocolError> {
        let (party, commitment) = take_content::<Commitment, _>(msg, 2)?;
        self.commitments.insert(party, commitment.v);
        Ok(())
    }

    fn finalize(self, out: &mut Vec<OutMsg<Message>>) -> Result<Outcome<Keygen>, ErrorState> {
        let Round2 {
            helper,
            context,
            commitments,
        } = self;
        helper.broadcast(
            out,
            4,
            Message::Decommitment(Box::new(context.decommitment.clone())),
        );
        Ok(Outcome::Next(
            Round4 {
                helper,
                context,
                commitments,
                decommitments: BTreeMap::new(),
            }
            .into(),
        ))
    }
}

/// Verifies the decommitments and sends the shares
pub struct Round4 {
    helper: Helper,
    context: Box<Context>,
    commitments: BTreeMap<PartyIndex, HashOutput>,
    decommitments: BTreeMap<PartyIndex, Box<Decommitment>>,
}

impl Round<Keygen> for Round4 {
    fn number(&self) -> RoundNumber {
        4
    }

    fn helper(&self) -> &Helper {
        &self.helper
    }

    fn verify_message(&self, msg: &InMsg<Message>) -> Result<(), ProtocolError> {
        let party = msg.sender;
        let d = match &msg.body.content {
            Message::Decommitment(d) => d,
            _ => return Err(unexpected(msg, 4)),
        };
        let invalid = |reason: &str| ProtocolError::InvalidMessage {
            round: 4,
            party,
            reason: reason.to_string(),
        };
        let failed = |proof: &'static str| ProtocolError::ProofFailed {
            proof,
            round: 4,
            party,
        };

        let transcript = self.helper.hash_for_id(&party);
        match self.commitments.get(&party) {
            Some(v) if *v == d.hash(&transcript) => {}
            _ => return Err(invalid("decommitment does not match the commitment")),
        }
        if d.vss.degree() != self.helper.threshold() {
            return Err(invalid("wrong degree of the secret sharing"));
        }
        if d.vss.constant().is_some() == self.context.previous.is_some() {
            return Err(invalid("wrong constant term of the secret sharing"));
        }
        if *d.pedersen.n() != d.paillier.n {
            return Err(invalid("Pedersen parameters are not bound to the Paillier key"));
        }
        if !d.prm.verify(&transcript, &d.pedersen) {
            return Err(failed("prm"));
        }
        if let Err(e) = d.modulus.verify(&transcript, &d.paillier) {
            log::trace!("{} of party {}", e, party);
            return Err(failed("modulus"));
        }
        Ok(())
    }

    fn store_message(&mut self, msg: InMsg<Message>) -> Result<(), ProtocolError> {
        let (party, decommitment) = take_content::<Box<Decommitment>, _>(msg, 4)?;
        self.decommitments.insert(party, decommitment);
        Ok(())
    }

    fn finalize(self, out: &mut Vec<OutMsg<Message>>) -> Result<Outcome<Keygen>, ErrorState> {
        let Round4 {
            helper,
            context,
            mut decommitments,
            ..
        } = self;
        decommitments.insert(helper.self_id(), Box::new(context.decommitment.clone()));

        let rid = decommitments.values().fold([0u8; 32], |mut acc, d| {
            acc.iter_mut().zip(d.rid.iter()).for_each(|(a, b)| *a ^= b);
            acc
        });

        let points = Party2PointMap::new(helper.parties());
        let shares = helper.map_others(|j| {
            let point = points.point(j).ok_or_else(|| missing(4, j))?;
            let recipient = decommitments.get(j).ok_or_else(|| missing(4, j))?;
            let value = context.polynomial.evaluate(&point);
            let (share, _) = recipient.paillier.encrypt(&value);
            Ok(EncryptedShare { share })
        })?;
        for (j, share) in shares {
            helper.send(out, 5, j, Message::Share(share));
        }

        Ok(Outcome::Next(
            Round5 {
                helper,
                context,
                decommitments,
                rid,
                points,
                shares: BTreeMap::new(),
            }
            .into(),
        ))
    }
}

/// Checks the received shares and computes the new key shares
pub struct Round5 {
    helper: Helper,
    context: Box<Context>,
    decommitments: BTreeMap<PartyIndex, Box<Decommitment>>,
    rid: HashOutput,
    points: Party2PointMap,
    shares: BTreeMap<PartyIndex, EncryptedShare>,
}

fn schnorr_transcript(helper: &Helper, party: &PartyIndex, rid: &HashOutput) -> Transcript {
    let mut t = helper.hash_for_id(party);
    t.write_label("rid").write_bytes(rid);
    t
}

impl Round<Keygen> for Round5 {
    fn number(&self) -> RoundNumber {
        5
    }

    fn helper(&self) -> &Helper {
        &self.helper
    }

    fn verify_message(&self, msg: &InMsg<Message>) -> Result<(), ProtocolError> {
        match &msg.body.content {
            Message::Share(s) if self.context.keys.ek.validate_ciphertext(&s.share) => Ok(()),
            Message::Share(_) => Err(ProtocolError::Decryption {
                round: 5,
                party: msg.sender,
            }),
            _ => Err(unexpected(msg, 5)),
        }
    }

    fn store_message(&mut self, msg: InMsg<Message>) -> Result<(), ProtocolError> {
        let (party, share) = take_content::<EncryptedShare, _>(msg, 5)?;
        self.shares.insert(party, share);
        Ok(())
    }

    fn finalize(self, out: &mut Vec<OutMsg<Message>>) -> Result<Outcome<Keygen>, ErrorState> {
        let Round5 {
            helper,
            context,
            decommitments,
            rid,
            points,
            shares,
        } = self;
        let self_id = helper.self_id();
        let own_point = points
            .point(&self_id)
            .ok_or_else(|| missing(5, &self_id))?;

        let received = helper.map_others(|j| {
            let share = shares.get(j).ok_or_else(|| missing(5, j))?;
            let dealer = decommitments.get(j).ok_or_else(|| missing(5, j))?;
            let value = context.keys.decrypt(&share.share);
            match (base_mul(&value), dealer.vss.evaluate(&own_point)) {
                (Some(actual), Some(expected)) if actual == expected => Ok(value),
                _ => Err(ProtocolError::ProofFailed {
                    proof: "vss",
                    round: 5,
                    party: *j,
                }),
            }
        })?;

        let own_share = context.polynomial.evaluate(&own_point);
        let previous_share = context
            .previous
            .as_ref()
            .map(|p| p.secret.ecdsa.to_big_int());
        let secret_share = sum_scalars(
            std::iter::once(&own_share)
                .chain(received.values())
                .chain(previous_share.iter()),
        )
        .ok_or_else(|| consistency(5, "secret share is zero"))?;

        let vss = ExponentPolynomial::sum(decommitments.values().map(|d| &d.vss))
            .ok_or_else(|| consistency(5, "sum of the secret sharings is degenerate"))?;

        let public = helper
            .parties()
            .iter()
            .map(|l| {
                let point = points.point(l).ok_or_else(|| missing(5, l))?;
                let dealer = decommitments.get(l).ok_or_else(|| missing(5, l))?;
                let share = vss.evaluate(&point);
                let share = match &context.previous {
                    Some(p) => share.and_then(|s| {
                        p.session
                            .public
                            .get(l)
                            .and_then(|old| add_points(&old.ecdsa, &s))
                    }),
                    None => share,
                }
                .ok_or_else(|| consistency(5, "public share is the point at infinity"))?;
                Ok((
                    *l,
                    PublicShare {
                        ecdsa: share,
                        paillier: dealer.paillier.clone(),
                        pedersen: dealer.pedersen.clone(),
                    },
                ))
            })
            .collect::<Result<BTreeMap<_, _>, ProtocolError>>()?;

        let public_key = match &context.previous {
            Some(p) => p.session.public_key,
            None => *vss
                .constant()
                .ok_or_else(|| consistency(5, "no public key in the secret sharing"))?,
        };

        let g: GE = ECPoint::generator();
        let own_public = public
            .get(&self_id)
            .map(|s| s.ecdsa)
            .ok_or_else(|| missing(5, &self_id))?;
        if own_public != g * secret_share {
            return Err(consistency(5, "secret share does not match the public share").into());
        }

        let Context { keys, schnorr, .. } = *context;
        let response = schnorr.prove(
            &schnorr_transcript(&helper, &self_id, &rid),
            &own_public,
            &secret_share,
        );
        helper.broadcast(out, 6, Message::Proof(response));

        let schnorr = decommitments
            .iter()
            .map(|(p, d)| (*p, d.schnorr.clone()))
            .collect();
        let session = Session {
            threshold: helper.threshold(),
            public_key,
            parties: helper.parties().clone(),
            points,
            public,
            rid,
        };
        let secret = Secret {
            id: self_id,
            ecdsa: secret_share,
            paillier: keys,
        };
        Ok(Outcome::Next(
            Round6 {
                helper,
                session,
                secret,
                schnorr,
            }
            .into(),
        ))
    }
}

/// Verifies the proofs of knowledge of the new shares
pub struct Round6 {
    helper: Helper,
    session: Session,
    secret: Secret,
    schnorr: BTreeMap<PartyIndex, sch::Commitment>,
}

impl Round<Keygen> for Round6 {
    fn number(&self) -> RoundNumber {
        6
    }

    fn helper(&self) -> &Helper {
        &self.helper
    }

    fn verify_message(&self, msg: &InMsg<Message>) -> Result<(), ProtocolError> {
        let party = msg.sender;
        let response = match &msg.body.content {
            Message::Proof(response) => response,
            _ => return Err(unexpected(msg, 6)),
        };
        let commitment = self.schnorr.get(&party).ok_or_else(|| missing(6, &party))?;
        let public = self
            .session
            .public
            .get(&party)
            .ok_or_else(|| missing(6, &party))?;
        let transcript = schnorr_transcript(&self.helper, &party, &self.session.rid);
        if response.verify(&transcript, &public.ecdsa, commitment) {
            Ok(())
        } else {
            Err(ProtocolError::ProofFailed {
                proof: "sch",
                round: 6,
                party,
            })
        }
    }

    fn store_message(&mut self, msg: InMsg<Message>) -> Result<(), ProtocolError> {
        take_content::<sch::Response, _>(msg, 6).map(|_| ())
    }

    fn finalize(self, _out: &mut Vec<OutMsg<Message>>) -> Result<Outcome<Keygen>, ErrorState> {
        log::info!(
            "{} party {} holds a share of {}",
            self.helper.protocol(),
            self.secret.id,
            self.session
                .public_key
                .bytes_compressed_to_big_int()
                .to_str_radix(16)
        );
        Ok(Outcome::Done(KeygenOutput {
            session: self.session,
            secret: self.secret,
        }))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::protocol::RoundMessage;
    use crate::round::testing::{run_parties, Tamper};
    use anyhow::anyhow;
    use curv::arithmetic::traits::Modulo;
    use curv::BigInt;
    use std::sync::Arc;
    use std::time::Duration;

    pub(crate) fn config() -> RoundConfig {
        RoundConfig {
            timeout: Some(Duration::from_secs(600)),
            workers: 2,
        }
    }

    pub(crate) fn outputs(
        results: BTreeMap<PartyIndex, Option<Result<KeygenOutput, ErrorState>>>,
    ) -> anyhow::Result<BTreeMap<PartyIndex, KeygenOutput>> {
        results
            .into_iter()
            .map(|(party, result)| match result {
                Some(Ok(output)) => Ok((party, output)),
                Some(Err(e)) => Err(anyhow!("party {} failed: {:?}", party, e)),
                None => Err(anyhow!("party {} terminated without result", party)),
            })
            .collect()
    }

    /// runs key generation of `count` parties
    pub(crate) fn keygen(
        count: usize,
        threshold: usize,
    ) -> anyhow::Result<BTreeMap<PartyIndex, KeygenOutput>> {
        let parties = (1..=count).map(PartyIndex::from).collect::<Vec<_>>();
        let starts = parties
            .iter()
            .map(|p| (*p, start_keygen(parties.clone(), threshold, *p, config())))
            .collect();
        outputs(run_parties(starts, None))
    }

    /// checks that the shares of `signers` interpolate the secret key
    fn interpolates(outputs: &BTreeMap<PartyIndex, KeygenOutput>, signers: &[PartyIndex]) -> bool {
        let q = FE::q();
        let session = &outputs[&signers[0]].session;
        let secret = signers.iter().fold(BigInt::zero(), |acc, p| {
            let lambda = session
                .points
                .calculate_lagrange_multiplier(signers, p)
                .expect("signer has a share");
            let x = outputs[p].secret.ecdsa.to_big_int();
            BigInt::mod_add(&acc, &BigInt::mod_mul(&lambda.to_big_int(), &x, &q), &q)
        });
        base_mul(&secret) == Some(session.public_key)
    }

    fn check_shares(outputs: &BTreeMap<PartyIndex, KeygenOutput>) {
        let g: GE = ECPoint::generator();
        let first = outputs.values().next().expect("at least one output");
        for (party, output) in outputs {
            assert_eq!(output.session, first.session, "party {}", party);
            assert_eq!(output.secret.id, *party);
            assert_eq!(
                output.session.public[party].ecdsa,
                g * output.secret.ecdsa
            );
            assert_eq!(
                output.session.public[party].paillier,
                output.secret.paillier.ek
            );
        }
    }

    #[test]
    fn keygen_and_refresh() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let parties = (1..=3).map(PartyIndex::from).collect::<Vec<_>>();
        let generated = keygen(3, 1)?;
        check_shares(&generated);
        assert_eq!(generated[&parties[0]].session.threshold, 1);
        assert!(interpolates(&generated, &parties[0..2]));
        assert!(interpolates(&generated, &parties[1..3]));
        assert!(interpolates(&generated, &parties));

        let first = &generated[&parties[0]];
        let mut degenerate = first.session.clone();
        degenerate.threshold = 0;
        let start = start_refresh(degenerate, first.secret.clone(), config());
        assert!(matches!(start(), Err(ProtocolError::Setup(_))));

        let starts = generated
            .values()
            .map(|o| {
                (
                    o.secret.id,
                    start_refresh(o.session.clone(), o.secret.clone(), config()),
                )
            })
            .collect();
        let refreshed = outputs(run_parties(starts, None))?;
        check_shares(&refreshed);
        for party in &parties {
            let old = &generated[party];
            let new = &refreshed[party];
            assert_eq!(new.session.public_key, old.session.public_key);
            assert_ne!(new.secret.ecdsa, old.secret.ecdsa);
            assert_ne!(new.secret.paillier.ek, old.secret.paillier.ek);
        }
        assert_ne!(
            refreshed[&parties[0]].session.rid,
            generated[&parties[0]].session.rid
        );
        assert!(interpolates(&refreshed, &[parties[0], parties[2]]));
        Ok(())
    }

    #[test]
    fn setup_errors() {
        let parties = (1..=3).map(PartyIndex::from).collect::<Vec<_>>();
        for (threshold, me) in &[(0, 1), (3, 1), (1, 7)] {
            let start = start_keygen(parties.clone(), *threshold, PartyIndex::from(*me), config());
            assert!(matches!(start(), Err(ProtocolError::Setup(_))));
        }
    }

    #[test]
    fn equivocating_commitment() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let parties = (1..=3).map(PartyIndex::from).collect::<Vec<_>>();
        let starts = parties
            .iter()
            .map(|p| (*p, start_keygen(parties.clone(), 1, *p, config())))
            .collect();
        // party 3 sends another commitment to party 2
        let tamper: Tamper<Message> = Arc::new(
            |from: &PartyIndex, to: &PartyIndex, body: &mut RoundMessage<Message>| {
                if *from == PartyIndex::from(3) && *to == PartyIndex::from(2) {
                    if let Message::Commitment(c) = &mut body.content {
                        c.v[0] ^= 1;
                    }
                }
            },
        );
        let results = run_parties(starts, Some(tamper));
        for (party, result) in results {
            let errors = match result {
                Some(Err(e)) => e.errors().to_vec(),
                _ => return Err(anyhow!("party {} must abort", party)),
            };
            // party 2 receives two different echoes, the others one each
            assert!(!errors.is_empty());
            assert!(errors
                .iter()
                .all(|e| matches!(e, ProtocolError::Equivocation { round: 3, .. })));
        }
        Ok(())
    }
}
