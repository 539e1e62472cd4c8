//! Proof that a Paillier plaintext is the discrete logarithm of a curve point
//!
//! The prover knows $`x \in \pm 2^{\ell}`$ and $`\rho`$ such that $`C = Enc_0(x; \rho)`$ and $`X = [x] \cdot B`$,
//! where $`B`$ is a public base point, the generator unless specified otherwise.
//!
//! ```math
//! \begin{array}{ll}
//! \alpha \in_R \pm 2^{\ell + \varepsilon}, \; \mu \in_R \pm 2^{\ell} \hat{N}, \; r \in_R Z^*_{N_0}, \; \gamma \in_R \pm 2^{\ell + \varepsilon} \hat{N} & \\
//! S = s^{x} t^{\mu}, \; A = Enc_0(\alpha; r), \; Y = [\alpha] \cdot B, \; D = s^{\alpha} t^{\gamma} & \\
//! z_1 = \alpha + e x, \; z_2 = r \rho^{e} \mod N_0, \; z_3 = \gamma + e \mu & \\
//! \end{array}
//! ```
//!
//! The verifier checks $`z_1 \in \pm 2^{\ell + \varepsilon}`$, $`Enc_0(z_1; z_2) = A \oplus (e \odot C)`$, $`[z_1] \cdot B = Y + [e] \cdot X`$ and $`s^{z_1} t^{z_3} = D S^{e}`$

use crate::algorithms::encryption::{Ciphertext, PaillierPublic};
use crate::algorithms::pedersen::PedersenParameters;
use crate::algorithms::transcript::Transcript;
use crate::algorithms::zkp::{ZkError, EPSILON, L};
use crate::algorithms::{
    add_points, is_in_interval, point_mul, pow_mod, sample_interval, sample_interval_scaled,
    sample_unit,
};
use curv::arithmetic::traits::{Modulo, ZeroizeBN};
use curv::elliptic::curves::traits::ECPoint;
use curv::{BigInt, GE};
use paillier::EncryptionKey;
use serde::{Deserialize, Serialize};

const NAME: &str = "logstar";

#[derive(Clone, Copy, Debug)]
pub struct Public<'a> {
    pub c: &'a Ciphertext,
    pub x: &'a GE,
    /// base point $`B`$; `None` stands for the generator
    pub g: Option<&'a GE>,
    pub prover: &'a EncryptionKey,
    pub aux: &'a PedersenParameters,
}

impl<'a> Public<'a> {
    fn base(&self) -> GE {
        match self.g {
            Some(g) => *g,
            None => ECPoint::generator(),
        }
    }
}

pub struct Private<'a> {
    pub x: &'a BigInt,
    pub rho: &'a BigInt,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    pub s: BigInt,
    pub a: Ciphertext,
    pub y: GE,
    pub d: BigInt,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    pub commitment: Commitment,
    pub z1: BigInt,
    pub z2: BigInt,
    pub z3: BigInt,
}

impl Proof {
    pub fn new(transcript: &Transcript, public: Public, private: Private) -> Result<Self, ZkError> {
        let n0 = public.prover.modulus();
        let n_hat = public.aux.n();

        let mut alpha = sample_interval(L + EPSILON);
        let mut mu = sample_interval_scaled(L, n_hat);
        let mut r = sample_unit(n0);
        let mut gamma = sample_interval_scaled(L + EPSILON, n_hat);

        let commitment = Commitment {
            s: public
                .aux
                .commit(private.x, &mu)
                .ok_or_else(|| ZkError::proving(NAME, "invalid Pedersen parameters"))?,
            a: public.prover.encrypt_with_nonce(&alpha, &r),
            y: point_mul(&public.base(), &alpha)
                .ok_or_else(|| ZkError::proving(NAME, "zero mask"))?,
            d: public
                .aux
                .commit(&alpha, &gamma)
                .ok_or_else(|| ZkError::proving(NAME, "invalid Pedersen parameters"))?,
        };

        let e = challenge(transcript, &public, &commitment);

        let z1 = &e * private.x + &alpha;
        let rho_e =
            pow_mod(private.rho, &e, n0).ok_or_else(|| ZkError::proving(NAME, "invalid nonce"))?;
        let z2 = BigInt::mod_mul(&rho_e, &r, n0);
        let z3 = &e * &mu + &gamma;

        alpha.zeroize_bn();
        mu.zeroize_bn();
        r.zeroize_bn();
        gamma.zeroize_bn();

        Ok(Proof {
            commitment,
            z1,
            z2,
            z3,
        })
    }

    pub fn is_valid(&self, public: &Public) -> bool {
        public.prover.validate_ciphertext(&self.commitment.a)
            && public.prover.is_valid_mod_n(&self.z2)
    }

    pub fn verify(&self, transcript: &Transcript, public: Public) -> bool {
        if !self.is_valid(&public) {
            reject!(NAME, "malformed proof");
        }
        if !public.prover.validate_ciphertext(public.c) {
            reject!(NAME, "malformed C");
        }
        if !is_in_interval(&self.z1, L + EPSILON) {
            reject!(NAME, "z1 out of range");
        }

        let e = challenge(transcript, &public, &self.commitment);

        {
            let lhs = public.prover.encrypt_with_nonce(&self.z1, &self.z2);
            let ec = require!(public.prover.mul(public.c, &e), NAME, "C is not invertible");
            let rhs = public.prover.add(&self.commitment.a, &ec);
            if lhs != rhs {
                reject!(NAME, "Paillier equation");
            }
        }

        {
            let lhs = require!(
                point_mul(&public.base(), &self.z1),
                NAME,
                "z1 is a multiple of q"
            );
            let rhs = match point_mul(public.x, &e) {
                Some(ex) => require!(
                    add_points(&self.commitment.y, &ex),
                    NAME,
                    "Y is the inverse of [e]X"
                ),
                None => self.commitment.y,
            };
            if lhs.get_element() != rhs.get_element() {
                reject!(NAME, "curve equation");
            }
        }

        if !public
            .aux
            .verify(&self.z1, &self.z3, &self.commitment.d, &self.commitment.s, &e)
        {
            reject!(NAME, "Pedersen equation");
        }

        true
    }
}

fn challenge(transcript: &Transcript, public: &Public, commitment: &Commitment) -> BigInt {
    let mut t = transcript.clone();
    t.write_label(NAME)
        .write(public.aux)
        .write(public.prover)
        .write_bigint(public.c.value())
        .write_point(public.x)
        .write_point(&public.base())
        .write_bigint(&commitment.s)
        .write_bigint(commitment.a.value())
        .write_point(&commitment.y)
        .write_bigint(&commitment.d);
    t.challenge()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::base_mul;
    use crate::algorithms::zkp::fixtures::fixtures;
    use curv::elliptic::curves::traits::ECScalar;
    use curv::FE;

    #[test]
    fn completeness_with_generator() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let f = fixtures()?;
        let x = sample_interval(L);
        let (c, rho) = f.prover.ek.encrypt(&x);
        let big_x = base_mul(&x).expect("non zero");
        let public = Public {
            c: &c,
            x: &big_x,
            g: None,
            prover: &f.prover.ek,
            aux: &f.pedersen,
        };
        let transcript = Transcript::new(b"logstar test");
        let proof = Proof::new(&transcript, public, Private { x: &x, rho: &rho })?;
        assert!(proof.verify(&transcript, public));

        let mut p = proof.clone();
        p.z1 = &p.z1 + &BigInt::one();
        assert!(!p.verify(&transcript, public));

        let mut p = proof;
        p.commitment.y = p.commitment.y + big_x;
        assert!(!p.verify(&transcript, public));
        Ok(())
    }

    #[test]
    fn other_base_point() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let f = fixtures()?;
        let b = base_mul(&BigInt::from(1234567)).expect("non zero");
        let x: FE = FE::new_random();
        let x_int = x.to_big_int();
        let (c, rho) = f.prover.ek.encrypt(&x_int);
        let big_x = b * x;
        let public = Public {
            c: &c,
            x: &big_x,
            g: Some(&b),
            prover: &f.prover.ek,
            aux: &f.pedersen,
        };
        let transcript = Transcript::new(b"logstar test");
        let proof = Proof::new(
            &transcript,
            public,
            Private {
                x: &x_int,
                rho: &rho,
            },
        )?;
        assert!(proof.verify(&transcript, public));

        // the same statement relative to the generator is false
        let wrong_base = Public { g: None, ..public };
        assert!(!proof.verify(&transcript, wrong_base));
        Ok(())
    }

    #[test]
    fn tampered_fields_are_rejected() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let f = fixtures()?;
        let x = sample_interval(L);
        let (c, rho) = f.prover.ek.encrypt(&x);
        let big_x = base_mul(&x).expect("non zero");
        let public = Public {
            c: &c,
            x: &big_x,
            g: None,
            prover: &f.prover.ek,
            aux: &f.pedersen,
        };
        let transcript = Transcript::new(b"logstar test");
        let proof = Proof::new(&transcript, public, Private { x: &x, rho: &rho })?;

        let n0 = &f.prover.ek.n;
        let tampers: Vec<(&str, Box<dyn Fn(&mut Proof) + '_>)> = vec![
            ("z1", Box::new(|p: &mut Proof| p.z1 = &p.z1 - &BigInt::one())),
            (
                "z2",
                Box::new(|p: &mut Proof| p.z2 = BigInt::mod_mul(&p.z2, &BigInt::from(2), n0)),
            ),
            ("z3", Box::new(|p: &mut Proof| p.z3 = &p.z3 + &BigInt::one())),
            (
                "S",
                Box::new(|p: &mut Proof| {
                    p.commitment.s =
                        BigInt::mod_mul(&p.commitment.s, f.pedersen.t(), f.pedersen.n())
                }),
            ),
            (
                "A",
                Box::new(|p: &mut Proof| p.commitment.a = f.prover.ek.add(&p.commitment.a, &c)),
            ),
            ("Y", Box::new(|p: &mut Proof| p.commitment.y = p.commitment.y + big_x)),
            (
                "D",
                Box::new(|p: &mut Proof| {
                    p.commitment.d =
                        BigInt::mod_mul(&p.commitment.d, f.pedersen.s(), f.pedersen.n())
                }),
            ),
        ];
        for (field, tamper) in tampers.iter() {
            let mut p = proof.clone();
            tamper(&mut p);
            assert!(!p.verify(&transcript, public), "tampered {}", field);
        }
        Ok(())
    }

    #[test]
    fn proof_is_bound_to_public_inputs() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let f = fixtures()?;
        let x = sample_interval(L);
        let (c, rho) = f.prover.ek.encrypt(&x);
        let big_x = base_mul(&x).expect("non zero");
        let public = Public {
            c: &c,
            x: &big_x,
            g: None,
            prover: &f.prover.ek,
            aux: &f.pedersen,
        };
        let transcript = Transcript::new(b"logstar test");
        let proof = Proof::new(&transcript, public, Private { x: &x, rho: &rho })?;

        let y = sample_interval(L);
        let (other_c, _) = f.prover.ek.encrypt(&y);
        let other_x = base_mul(&y).expect("non zero");
        let other_b = base_mul(&BigInt::from(7)).expect("non zero");

        assert!(!proof.verify(&transcript, Public { c: &other_c, ..public }));
        assert!(!proof.verify(&transcript, Public { x: &other_x, ..public }));
        assert!(!proof.verify(&transcript, Public { g: Some(&other_b), ..public }));
        Ok(())
    }

    #[test]
    fn out_of_range_witness_is_rejected() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let f = fixtures()?;
        let transcript = Transcript::new(b"logstar test");
        let bound = BigInt::from(2).pow((L + EPSILON + 1) as u32);
        for x in vec![bound.clone(), -bound] {
            let (c, rho) = f.prover.ek.encrypt(&x);
            let big_x = base_mul(&x).expect("non zero");
            let public = Public {
                c: &c,
                x: &big_x,
                g: None,
                prover: &f.prover.ek,
                aux: &f.pedersen,
            };
            let proof = Proof::new(&transcript, public, Private { x: &x, rho: &rho })?;
            assert!(proof.is_valid(&public));
            assert!(!is_in_interval(&proof.z1, L + EPSILON));
            assert!(!proof.verify(&transcript, public));
        }
        Ok(())
    }
}
