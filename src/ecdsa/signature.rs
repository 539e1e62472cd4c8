//! Multi-party signing
//!
//! Signing protocol of CMP, chapter 4 of ["UC Non-Interactive, Proactive, Threshold ECDSA with Identifiable Aborts"](https://eprint.iacr.org/2021/060.pdf),
//! run by any `threshold + 1` holders of shares. Each signer converts its share $`x_i`$ into an additive one
//! $`\lambda_i x_i`$ with Lagrange's coefficient of the set of signers.
//!
//! | round | sent                                                                          |
//! |-------|-------------------------------------------------------------------------------|
//! | 1     | $`K_i = Enc_i(k_i)`$, $`G_i = Enc_i(\gamma_i)`$, `enc` proof for each receiver |
//! | 2     | digest of all nonce commitments                                               |
//! | 3     | $`\Gamma_i`$, MtA for $`\gamma_i k_j`$ and $`\lambda_i x_i k_j`$ with `affg` proofs, `logstar` proof of $`\Gamma_i`$ |
//! | 4     | $`\delta_i`$, $`\Delta_i = [k_i] \cdot \Gamma`$ with `logstar` proof           |
//! | 5     | $`\sigma_i = k_i m + r \chi_i`$                                                |
//!
//! The output of all parties is the same signature, verified against the public key of the session.

use crate::algorithms::encryption::PaillierPublic;
use crate::algorithms::pedersen::PedersenParameters;
use crate::algorithms::transcript::{HashOutput, TranscriptWrite};
use crate::algorithms::zkp::{affg, enc, logstar, L_PRIME};
use crate::algorithms::{sample_interval, to_scalar};
use crate::ecdsa::messages::sign::{
    DeltaMessage, Message, MtaMessage, NonceCommitments, NonceMessage, SignatureShare,
};
use crate::ecdsa::{
    consistency, missing, proving_error, sum_points, sum_scalars, take_content, unexpected,
    MessageHashType, PublicShare, Secret, Session, Signature,
};
use crate::protocol::{PartyIndex, ProtocolId, RoundNumber};
use crate::round::broadcast::{Broadcast, Echo, EchoProtocol};
use crate::round::{
    ErrorState, Helper, InMsg, OutMsg, Outcome, Protocol, ProtocolError, Round, RoundConfig,
    StartFunc,
};
use curv::arithmetic::traits::{Modulo, ZeroizeBN};
use curv::elliptic::curves::traits::{ECPoint, ECScalar};
use curv::{BigInt, FE, GE};
use paillier::EncryptionKey;
use std::collections::BTreeMap;
use zeroize::Zeroize;

const FINAL_ROUND: RoundNumber = 6;

/// Threshold signing
pub struct Sign;

impl Protocol for Sign {
    type Content = Message;
    type Output = Signature;
    type Round = SignRound;
}

impl EchoProtocol for Sign {
    fn broadcast_part(content: &Message) -> Option<&dyn TranscriptWrite> {
        match content {
            Message::Commitments(m) => Some(&m.broadcast as &dyn TranscriptWrite),
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
    pub enum SignRound for Sign {
        Round1(Round1),
        Round2(Broadcast<Round2>),
        Round3(Echo<Round2>),
        Round4(Round4),
        Round5(Round5),
        Round6(Round6),
    }
}

/// Starts signing of `message_hash` by `signers`, which must include the party of `secret`
pub fn start_sign(
    session: Session,
    secret: Secret,
    signers: Vec<PartyIndex>,
    message_hash: MessageHashType,
    config: RoundConfig,
) -> StartFunc<Sign> {
    Box::new(move || {
        if let Some(stranger) = signers.iter().find(|p| !session.parties.contains(*p)) {
            return Err(ProtocolError::Setup(format!(
                "signer {} has no share of the key",
                stranger
            )));
        }
        let mut helper = Helper::new(
            ProtocolId::Sign,
            FINAL_ROUND,
            secret.id,
            &signers,
            session.threshold,
            &config,
        )?;
        helper.absorb(|t| {
            session.absorb_into(t);
            t.write_label("message").write_scalar(&message_hash);
        });

        let signing_parties = helper.parties().as_slice();
        let public = signing_parties
            .iter()
            .map(|p| {
                let lambda = session
                    .points
                    .calculate_lagrange_multiplier(signing_parties, p)?;
                let share = session.public.get(p).ok_or_else(|| missing(1, p))?;
                Ok((*p, share.ecdsa * lambda))
            })
            .collect::<Result<BTreeMap<_, _>, ProtocolError>>()?;
        let lambda = session
            .points
            .calculate_lagrange_multiplier(signing_parties, &secret.id)?;
        let g: GE = ECPoint::generator();
        if public.get(&secret.id) != Some(&(g * (secret.ecdsa * lambda))) {
            return Err(ProtocolError::Setup(
                "secret share does not match the session".to_string(),
            ));
        }

        let info = helper.info();
        let context = Context {
            additive_share: secret.ecdsa * lambda,
            public,
            message: message_hash,
            session,
            secret,
        };
        Ok((
            Round1 {
                helper,
                context: Box::new(context),
            }
            .into(),
            info,
        ))
    })
}

/// Key material of the signer
struct Context {
    session: Session,
    secret: Secret,
    /// $`\lambda_i x_i`$
    additive_share: FE,
    /// $`[\lambda_j x_j] \cdot G`$ of all signers
    public: BTreeMap<PartyIndex, GE>,
    message: MessageHashType,
}

impl Context {
    fn share_of(&self, party: &PartyIndex, round: RoundNumber) -> Result<&PublicShare, ProtocolError> {
        self.session
            .public
            .get(party)
            .ok_or_else(|| missing(round, party))
    }

    fn own_key(&self) -> &EncryptionKey {
        &self.secret.paillier.ek
    }

    fn own_pedersen(&self, round: RoundNumber) -> Result<&PedersenParameters, ProtocolError> {
        self.share_of(&self.secret.id, round).map(|s| &s.pedersen)
    }
}

/// Nonces of the signer and their encryptions
struct Nonces {
    k: FE,
    gamma: FE,
    rho: BigInt,
    nu: BigInt,
    commitments: NonceCommitments,
}

impl Drop for Nonces {
    fn drop(&mut self) {
        self.k.zeroize();
        self.gamma.zeroize();
        self.rho.zeroize_bn();
        self.nu.zeroize_bn();
    }
}

/// Samples the nonces and proves the range of $`k_i`$ to every other signer
pub struct Round1 {
    helper: Helper,
    context: Box<Context>,
}

impl Round<Sign> for Round1 {
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

    fn finalize(self, out: &mut Vec<OutMsg<Message>>) -> Result<Outcome<Sign>, ErrorState> {
        let Round1 { helper, context } = self;
        let ek = context.own_key();
        let k: FE = FE::new_random();
        let gamma: FE = FE::new_random();
        let (big_k, rho) = ek.encrypt(&k.to_big_int());
        let (big_g, nu) = ek.encrypt(&gamma.to_big_int());
        let nonces = Nonces {
            k,
            gamma,
            rho,
            nu,
            commitments: NonceCommitments { k: big_k, g: big_g },
        };

        let own_transcript = helper.hash_for_id(&helper.self_id());
        let k_value = nonces.k.to_big_int();
        let proofs = helper.map_others(|j| {
            let aux = &context.share_of(j, 1)?.pedersen;
            enc::Proof::new(
                &own_transcript,
                enc::Public {
                    k: &nonces.commitments.k,
                    prover: ek,
                    aux,
                },
                enc::Private {
                    k: &k_value,
                    rho: &nonces.rho,
                },
            )
            .map_err(proving_error(1))
        })?;
        for (j, proof) in proofs {
            helper.send(
                out,
                2,
                j,
                Message::Commitments(NonceMessage {
                    broadcast: nonces.commitments.clone(),
                    proof,
                }),
            );
        }

        let own = nonces.commitments.clone();
        let next = Round2 {
            helper,
            context,
            nonces,
            received: BTreeMap::new(),
        };
        Ok(Outcome::Next(Broadcast::new::<Sign>(next, &own).into()))
    }
}

/// Collects the encrypted nonces; finalized after the echo round with the multiplicative-to-additive conversions
pub struct Round2 {
    helper: Helper,
    context: Box<Context>,
    nonces: Nonces,
    received: BTreeMap<PartyIndex, NonceCommitments>,
}

/// The additive masks of the conversions with a party
struct Masks {
    beta: BigInt,
    beta_hat: BigInt,
}

impl Drop for Masks {
    fn drop(&mut self) {
        self.beta.zeroize_bn();
        self.beta_hat.zeroize_bn();
    }
}

impl Round<Sign> for Round2 {
    fn number(&self) -> RoundNumber {
        2
    }

    fn helper(&self) -> &Helper {
        &self.helper
    }

    fn verify_message(&self, msg: &InMsg<Message>) -> Result<(), ProtocolError> {
        let party = msg.sender;
        let m = match &msg.body.content {
            Message::Commitments(m) => m,
            _ => return Err(unexpected(msg, 2)),
        };
        let ek = &self.context.share_of(&party, 2)?.paillier;
        if !ek.validate_ciphertext(&m.broadcast.k) || !ek.validate_ciphertext(&m.broadcast.g) {
            return Err(ProtocolError::InvalidMessage {
                round: 2,
                party,
                reason: "invalid ciphertext".to_string(),
            });
        }
        let public = enc::Public {
            k: &m.broadcast.k,
            prover: ek,
            aux: self.context.own_pedersen(2)?,
        };
        if m.proof.verify(&self.helper.hash_for_id(&party), public) {
            Ok(())
        } else {
            Err(ProtocolError::ProofFailed {
                proof: "enc",
                round: 2,
                party,
            })
        }
    }

    fn store_message(&mut self, msg: InMsg<Message>) -> Result<(), ProtocolError> {
        let (party, m) = take_content::<NonceMessage, _>(msg, 2)?;
        self.received.insert(party, m.broadcast);
        Ok(())
    }

    fn finalize(self, out: &mut Vec<OutMsg<Message>>) -> Result<Outcome<Sign>, ErrorState> {
        let Round2 {
            helper,
            context,
            nonces,
            received,
        } = self;
        let g: GE = ECPoint::generator();
        let gamma_point = g * nonces.gamma;
        let own_transcript = helper.hash_for_id(&helper.self_id());
        let ek = context.own_key();
        let gamma = nonces.gamma.to_big_int();
        let mut additive_share = context.additive_share.to_big_int();
        let own_public = *context
            .public
            .get(&helper.self_id())
            .ok_or_else(|| missing(3, &helper.self_id()))?;

        let conversions = helper.map_others(|j| {
            let other = context.share_of(j, 3)?;
            let ek_j = &other.paillier;
            let k_j = &received.get(j).ok_or_else(|| missing(3, j))?.k;
            let masks = Masks {
                beta: sample_interval(L_PRIME),
                beta_hat: sample_interval(L_PRIME),
            };

            let convert = |x: &BigInt, beta: &BigInt| {
                let (y, r) = ek.encrypt(beta);
                let (masked, s) = ek_j.encrypt(beta);
                let d = ek_j
                    .mul(k_j, x)
                    .map(|product| ek_j.add(&product, &masked))
                    .ok_or_else(|| consistency(3, "ciphertext is not invertible"))?;
                Ok::<_, ProtocolError>((d, y, s, r))
            };
            let (d, f, s, r) = convert(&gamma, &masks.beta)?;
            let (d_hat, f_hat, s_hat, r_hat) = convert(&additive_share, &masks.beta_hat)?;

            let psi = affg::Proof::new(
                &own_transcript,
                affg::Public {
                    c: k_j,
                    d: &d,
                    y: &f,
                    x: &gamma_point,
                    verifier: ek_j,
                    prover: ek,
                    aux: &other.pedersen,
                },
                affg::Private {
                    x: &gamma,
                    y: &masks.beta,
                    rho: &s,
                    rho_y: &r,
                },
            )
            .map_err(proving_error(3))?;
            let psi_hat = affg::Proof::new(
                &own_transcript,
                affg::Public {
                    c: k_j,
                    d: &d_hat,
                    y: &f_hat,
                    x: &own_public,
                    verifier: ek_j,
                    prover: ek,
                    aux: &other.pedersen,
                },
                affg::Private {
                    x: &additive_share,
                    y: &masks.beta_hat,
                    rho: &s_hat,
                    rho_y: &r_hat,
                },
            )
            .map_err(proving_error(3))?;
            let psi_prime = logstar::Proof::new(
                &own_transcript,
                logstar::Public {
                    c: &nonces.commitments.g,
                    x: &gamma_point,
                    g: None,
                    prover: ek,
                    aux: &other.pedersen,
                },
                logstar::Private {
                    x: &gamma,
                    rho: &nonces.nu,
                },
            )
            .map_err(proving_error(3))?;

            let message = MtaMessage {
                gamma: gamma_point,
                d,
                f,
                d_hat,
                f_hat,
                psi,
                psi_hat,
                psi_prime,
            };
            Ok((message, masks))
        });
        additive_share.zeroize_bn();

        let mut masks = BTreeMap::new();
        for (j, (message, mask)) in conversions? {
            helper.send(out, 4, j, Message::MtA(Box::new(message)));
            masks.insert(j, mask);
        }
        log::debug!(
            "party {} sent the conversions to {} parties",
            helper.self_id(),
            masks.len()
        );

        Ok(Outcome::Next(
            Round4 {
                helper,
                context,
                nonces,
                gamma_point,
                received,
                masks,
                conversions: BTreeMap::new(),
            }
            .into(),
        ))
    }
}

/// Completes the conversions and sends $`\delta_i`$
pub struct Round4 {
    helper: Helper,
    context: Box<Context>,
    nonces: Nonces,
    gamma_point: GE,
    received: BTreeMap<PartyIndex, NonceCommitments>,
    masks: BTreeMap<PartyIndex, Masks>,
    conversions: BTreeMap<PartyIndex, Box<MtaMessage>>,
}

impl Round<Sign> for Round4 {
    fn number(&self) -> RoundNumber {
        4
    }

    fn helper(&self) -> &Helper {
        &self.helper
    }

    fn verify_message(&self, msg: &InMsg<Message>) -> Result<(), ProtocolError> {
        let party = msg.sender;
        let m = match &msg.body.content {
            Message::MtA(m) => m,
            _ => return Err(unexpected(msg, 4)),
        };
        let failed = |proof: &'static str| ProtocolError::ProofFailed {
            proof,
            round: 4,
            party,
        };

        let ek = self.context.own_key();
        let ek_j = &self.context.share_of(&party, 4)?.paillier;
        let aux = self.context.own_pedersen(4)?;
        let g_j = &self.received.get(&party).ok_or_else(|| missing(4, &party))?.g;
        let public_j = self
            .context
            .public
            .get(&party)
            .ok_or_else(|| missing(4, &party))?;
        if !ek.validate_ciphertext(&m.d)
            || !ek.validate_ciphertext(&m.d_hat)
            || !ek_j.validate_ciphertext(&m.f)
            || !ek_j.validate_ciphertext(&m.f_hat)
        {
            return Err(ProtocolError::InvalidMessage {
                round: 4,
                party,
                reason: "invalid ciphertext".to_string(),
            });
        }

        let transcript = self.helper.hash_for_id(&party);
        let own_k = &self.nonces.commitments.k;
        let psi = affg::Public {
            c: own_k,
            d: &m.d,
            y: &m.f,
            x: &m.gamma,
            verifier: ek,
            prover: ek_j,
            aux,
        };
        if !m.psi.verify(&transcript, psi) {
            return Err(failed("affg"));
        }
        let psi_hat = affg::Public {
            c: own_k,
            d: &m.d_hat,
            y: &m.f_hat,
            x: public_j,
            verifier: ek,
            prover: ek_j,
            aux,
        };
        if !m.psi_hat.verify(&transcript, psi_hat) {
            return Err(failed("affg"));
        }
        let psi_prime = logstar::Public {
            c: g_j,
            x: &m.gamma,
            g: None,
            prover: ek_j,
            aux,
        };
        if !m.psi_prime.verify(&transcript, psi_prime) {
            return Err(failed("logstar"));
        }
        Ok(())
    }

    fn store_message(&mut self, msg: InMsg<Message>) -> Result<(), ProtocolError> {
        let (party, m) = take_content::<Box<MtaMessage>, _>(msg, 4)?;
        self.conversions.insert(party, m);
        Ok(())
    }

    fn finalize(self, out: &mut Vec<OutMsg<Message>>) -> Result<Outcome<Sign>, ErrorState> {
        let Round4 {
            helper,
            context,
            nonces,
            gamma_point,
            received,
            masks,
            conversions,
        } = self;
        let q = FE::q();
        let keys = &context.secret.paillier;

        let big_gamma = sum_points(
            std::iter::once(&gamma_point).chain(conversions.values().map(|m| &m.gamma)),
        )
        .ok_or_else(|| consistency(4, "sum of the nonce points is at infinity"))?;
        let big_delta = big_gamma * nonces.k;

        // alpha - beta for both conversions with every other party
        let shares = helper.map_others(|j| {
            let m = conversions.get(j).ok_or_else(|| missing(4, j))?;
            let mask = masks.get(j).ok_or_else(|| missing(4, j))?;
            let alpha = keys.decrypt(&m.d);
            let alpha_hat = keys.decrypt(&m.d_hat);
            Ok((
                BigInt::mod_sub(&alpha, &mask.beta, &q),
                BigInt::mod_sub(&alpha_hat, &mask.beta_hat, &q),
            ))
        })?;
        let k = nonces.k.to_big_int();
        let own_delta = BigInt::mod_mul(&nonces.gamma.to_big_int(), &k, &q);
        let mut own_chi = BigInt::mod_mul(&context.additive_share.to_big_int(), &k, &q);
        let delta = sum_scalars(std::iter::once(&own_delta).chain(shares.values().map(|s| &s.0)))
            .ok_or_else(|| consistency(4, "delta share is zero"))?;
        let chi = sum_scalars(std::iter::once(&own_chi).chain(shares.values().map(|s| &s.1)))
            .ok_or_else(|| consistency(4, "chi share is zero"))?;
        own_chi.zeroize_bn();

        let own_transcript = helper.hash_for_id(&helper.self_id());
        let ek = context.own_key();
        let proofs = helper.map_others(|j| {
            let aux = &context.share_of(j, 4)?.pedersen;
            logstar::Proof::new(
                &own_transcript,
                logstar::Public {
                    c: &nonces.commitments.k,
                    x: &big_delta,
                    g: Some(&big_gamma),
                    prover: ek,
                    aux,
                },
                logstar::Private {
                    x: &k,
                    rho: &nonces.rho,
                },
            )
            .map_err(proving_error(4))
        })?;
        for (j, proof) in proofs {
            helper.send(
                out,
                5,
                j,
                Message::Delta(DeltaMessage {
                    delta,
                    big_delta,
                    proof,
                }),
            );
        }

        Ok(Outcome::Next(
            Round5 {
                helper,
                context,
                nonces,
                received,
                big_gamma,
                delta,
                big_delta,
                chi,
                deltas: BTreeMap::new(),
            }
            .into(),
        ))
    }
}

/// Verifies $`\Delta_j`$ and sends the share of the signature
pub struct Round5 {
    helper: Helper,
    context: Box<Context>,
    nonces: Nonces,
    received: BTreeMap<PartyIndex, NonceCommitments>,
    big_gamma: GE,
    delta: FE,
    big_delta: GE,
    chi: FE,
    deltas: BTreeMap<PartyIndex, DeltaMessage>,
}

impl Drop for Round5 {
    fn drop(&mut self) {
        self.chi.zeroize();
    }
}

impl Round<Sign> for Round5 {
    fn number(&self) -> RoundNumber {
        5
    }

    fn helper(&self) -> &Helper {
        &self.helper
    }

    fn verify_message(&self, msg: &InMsg<Message>) -> Result<(), ProtocolError> {
        let party = msg.sender;
        let m = match &msg.body.content {
            Message::Delta(m) => m,
            _ => return Err(unexpected(msg, 5)),
        };
        let k_j = &self.received.get(&party).ok_or_else(|| missing(5, &party))?.k;
        let public = logstar::Public {
            c: k_j,
            x: &m.big_delta,
            g: Some(&self.big_gamma),
            prover: &self.context.share_of(&party, 5)?.paillier,
            aux: self.context.own_pedersen(5)?,
        };
        if m.proof.verify(&self.helper.hash_for_id(&party), public) {
            Ok(())
        } else {
            Err(ProtocolError::ProofFailed {
                proof: "logstar",
                round: 5,
                party,
            })
        }
    }

    fn store_message(&mut self, msg: InMsg<Message>) -> Result<(), ProtocolError> {
        let (party, m) = take_content::<DeltaMessage, _>(msg, 5)?;
        self.deltas.insert(party, m);
        Ok(())
    }

    fn finalize(self, out: &mut Vec<OutMsg<Message>>) -> Result<Outcome<Sign>, ErrorState> {
        let q = FE::q();
        let delta_values = std::iter::once(self.delta.to_big_int())
            .chain(self.deltas.values().map(|m| m.delta.to_big_int()))
            .collect::<Vec<_>>();
        let delta = sum_scalars(delta_values.iter())
            .ok_or_else(|| consistency(5, "delta is zero"))?;
        let big_delta = sum_points(
            std::iter::once(&self.big_delta).chain(self.deltas.values().map(|m| &m.big_delta)),
        )
        .ok_or_else(|| consistency(5, "sum of the delta points is at infinity"))?;
        let g: GE = ECPoint::generator();
        if g * delta != big_delta {
            return Err(consistency(5, "delta does not match the delta points").into());
        }

        let big_r = self.big_gamma * delta.invert();
        let r = big_r
            .x_coor()
            .and_then(|x| to_scalar(&x.mod_floor(&q)))
            .ok_or_else(|| consistency(5, "r is zero"))?;
        let sigma = sum_scalars(
            vec![
                (self.nonces.k * self.context.message).to_big_int(),
                (r * self.chi).to_big_int(),
            ]
            .iter(),
        )
        .ok_or_else(|| consistency(5, "signature share is zero"))?;
        self.helper
            .broadcast(out, 6, Message::Share(SignatureShare { sigma }));

        Ok(Outcome::Next(
            Round6 {
                helper: self.helper.clone(),
                public_key: self.context.session.public_key,
                message: self.context.message,
                r,
                sigma,
                shares: BTreeMap::new(),
            }
            .into(),
        ))
    }
}

/// Combines the shares of the signature
pub struct Round6 {
    helper: Helper,
    public_key: GE,
    message: MessageHashType,
    r: FE,
    sigma: FE,
    shares: BTreeMap<PartyIndex, FE>,
}

impl Round<Sign> for Round6 {
    fn number(&self) -> RoundNumber {
        6
    }

    fn helper(&self) -> &Helper {
        &self.helper
    }

    fn verify_message(&self, msg: &InMsg<Message>) -> Result<(), ProtocolError> {
        match msg.body.content {
            Message::Share(_) => Ok(()),
            _ => Err(unexpected(msg, 6)),
        }
    }

    fn store_message(&mut self, msg: InMsg<Message>) -> Result<(), ProtocolError> {
        let (party, share) = take_content::<SignatureShare, _>(msg, 6)?;
        self.shares.insert(party, share.sigma);
        Ok(())
    }

    fn finalize(self, _out: &mut Vec<OutMsg<Message>>) -> Result<Outcome<Sign>, ErrorState> {
        let values = std::iter::once(&self.sigma)
            .chain(self.shares.values())
            .map(|s| s.to_big_int())
            .collect::<Vec<_>>();
        let s = sum_scalars(values.iter()).ok_or_else(|| consistency(6, "s is zero"))?;
        let signature = Signature { r: self.r, s };
        if !signature.verify(&self.public_key, &self.message) {
            return Err(consistency(6, "signature does not verify").into());
        }
        log::info!(
            "party {} signed with r = {}",
            self.helper.self_id(),
            self.r.to_big_int().to_str_radix(16)
        );
        Ok(Outcome::Done(signature))
    }
}
