//! Proof of an affine operation on a ciphertext, with the multiplier committed on the curve
//!
//! Used by the multiplicative-to-additive conversion of signing. The prover knows $`x \in \pm 2^{\ell}`$, $`y \in \pm 2^{\ell'}`$ and nonces
//! $`\rho, \rho_y`$ such that
//! ```math
//! D = (x \odot C) \oplus Enc_0(y; \rho), \quad Y = Enc_1(y; \rho_y), \quad X = [x] \cdot G
//! ```
//! where $`C`$ and $`D`$ are encrypted under the key $`N_0`$ of the verifier and $`Y`$ under the key $`N_1`$ of the prover.
//!
//! ## Algorithm
//!
//! ```math
//! \begin{array}{ll}
//! \alpha \in_R \pm 2^{\ell + \varepsilon}, \; \beta \in_R \pm 2^{\ell' + \varepsilon}, \; r \in_R Z^*_{N_0}, \; r_y \in_R Z^*_{N_1} & \\
//! \gamma, \delta \in_R \pm 2^{\ell + \varepsilon} \hat{N}, \; m, \mu \in_R \pm 2^{\ell} \hat{N} & \\
//! A = (\alpha \odot C) \oplus Enc_0(\beta; r), \; B_x = [\alpha] \cdot G, \; B_y = Enc_1(\beta; r_y) & \\
//! E = s^{\alpha} t^{\gamma}, \; S = s^{x} t^{m}, \; F = s^{\beta} t^{\delta}, \; T = s^{y} t^{\mu} & \\
//! z_1 = \alpha + e x, \; z_2 = \beta + e y, \; z_3 = \gamma + e m, \; z_4 = \delta + e \mu & \\
//! w = r \rho^{e} \mod N_0, \; w_y = r_y \rho_y^{e} \mod N_1 & \\
//! \end{array}
//! ```
//!
//! The verifier checks the ranges $`z_1 \in \pm 2^{\ell + \varepsilon}`$, $`z_2 \in \pm 2^{\ell' + \varepsilon}`$ and
//! ```math
//! \begin{array}{l}
//! (z_1 \odot C) \oplus Enc_0(z_2; w) = A \oplus (e \odot D) \\
//! [z_1] \cdot G = B_x + [e] \cdot X \\
//! Enc_1(z_2; w_y) = B_y \oplus (e \odot Y) \\
//! s^{z_1} t^{z_3} = E S^{e}, \; s^{z_2} t^{z_4} = F T^{e} \\
//! \end{array}
//! ```

use crate::algorithms::encryption::{Ciphertext, PaillierPublic};
use crate::algorithms::pedersen::PedersenParameters;
use crate::algorithms::transcript::Transcript;
use crate::algorithms::zkp::{ZkError, EPSILON, L, L_PRIME};
use crate::algorithms::{
    add_points, base_mul, is_in_interval, point_mul, pow_mod, sample_interval,
    sample_interval_scaled, sample_unit,
};
use curv::arithmetic::traits::{Modulo, ZeroizeBN};
use curv::elliptic::curves::traits::ECPoint;
use curv::{BigInt, GE};
use paillier::EncryptionKey;
use serde::{Deserialize, Serialize};

const NAME: &str = "affg";

#[derive(Clone, Copy, Debug)]
pub struct Public<'a> {
    /// ciphertext of the verifier, under $`N_0`$
    pub c: &'a Ciphertext,
    /// $`(x \odot C) \oplus Enc_0(y; \rho)`$
    pub d: &'a Ciphertext,
    /// $`Enc_1(y; \rho_y)`$
    pub y: &'a Ciphertext,
    pub x: &'a GE,
    /// $`N_0`$
    pub verifier: &'a EncryptionKey,
    /// $`N_1`$
    pub prover: &'a EncryptionKey,
    pub aux: &'a PedersenParameters,
}

pub struct Private<'a> {
    pub x: &'a BigInt,
    pub y: &'a BigInt,
    pub rho: &'a BigInt,
    pub rho_y: &'a BigInt,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    pub a: Ciphertext,
    pub bx: GE,
    pub by: Ciphertext,
    pub e: BigInt,
    pub s: BigInt,
    pub f: BigInt,
    pub t: BigInt,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    pub commitment: Commitment,
    pub z1: BigInt,
    pub z2: BigInt,
    pub z3: BigInt,
    pub z4: BigInt,
    pub w: BigInt,
    pub wy: BigInt,
}

impl Proof {
    pub fn new(transcript: &Transcript, public: Public, private: Private) -> Result<Self, ZkError> {
        let n0 = public.verifier.modulus();
        let n1 = public.prover.modulus();
        let n_hat = public.aux.n();
        let pedersen_error = || ZkError::proving(NAME, "invalid Pedersen parameters");

        let mut alpha = sample_interval(L + EPSILON);
        let mut beta = sample_interval(L_PRIME + EPSILON);
        let mut r = sample_unit(n0);
        let mut ry = sample_unit(n1);
        let mut gamma = sample_interval_scaled(L + EPSILON, n_hat);
        let mut m = sample_interval_scaled(L, n_hat);
        let mut delta = sample_interval_scaled(L + EPSILON, n_hat);
        let mut mu = sample_interval_scaled(L, n_hat);

        let alpha_c = public
            .verifier
            .mul(public.c, &alpha)
            .ok_or_else(|| ZkError::proving(NAME, "C is not invertible"))?;
        let commitment = Commitment {
            a: public
                .verifier
                .add(&alpha_c, &public.verifier.encrypt_with_nonce(&beta, &r)),
            bx: base_mul(&alpha).ok_or_else(|| ZkError::proving(NAME, "zero mask"))?,
            by: public.prover.encrypt_with_nonce(&beta, &ry),
            e: public.aux.commit(&alpha, &gamma).ok_or_else(pedersen_error)?,
            s: public.aux.commit(private.x, &m).ok_or_else(pedersen_error)?,
            f: public.aux.commit(&beta, &delta).ok_or_else(pedersen_error)?,
            t: public.aux.commit(private.y, &mu).ok_or_else(pedersen_error)?,
        };

        let e = challenge(transcript, &public, &commitment);
        let nonce_error = || ZkError::proving(NAME, "invalid nonce");

        let z1 = &e * private.x + &alpha;
        let z2 = &e * private.y + &beta;
        let z3 = &e * &m + &gamma;
        let z4 = &e * &mu + &delta;
        let w = BigInt::mod_mul(
            &pow_mod(private.rho, &e, n0).ok_or_else(nonce_error)?,
            &r,
            n0,
        );
        let wy = BigInt::mod_mul(
            &pow_mod(private.rho_y, &e, n1).ok_or_else(nonce_error)?,
            &ry,
            n1,
        );

        for secret in &mut [
            &mut alpha, &mut beta, &mut r, &mut ry, &mut gamma, &mut m, &mut delta, &mut mu,
        ] {
            secret.zeroize_bn();
        }

        Ok(Proof {
            commitment,
            z1,
            z2,
            z3,
            z4,
            w,
            wy,
        })
    }

    pub fn is_valid(&self, public: &Public) -> bool {
        public.verifier.validate_ciphertext(&self.commitment.a)
            && public.prover.validate_ciphertext(&self.commitment.by)
            && public.verifier.is_valid_mod_n(&self.w)
            && public.prover.is_valid_mod_n(&self.wy)
    }

    pub fn verify(&self, transcript: &Transcript, public: Public) -> bool {
        if !self.is_valid(&public) {
            reject!(NAME, "malformed proof");
        }
        if !public.verifier.validate_ciphertext(public.c)
            || !public.verifier.validate_ciphertext(public.d)
            || !public.prover.validate_ciphertext(public.y)
        {
            reject!(NAME, "malformed statement");
        }
        if !is_in_interval(&self.z1, L + EPSILON) {
            reject!(NAME, "z1 out of range");
        }
        if !is_in_interval(&self.z2, L_PRIME + EPSILON) {
            reject!(NAME, "z2 out of range");
        }

        let e = challenge(transcript, &public, &self.commitment);

        if !public
            .aux
            .verify(&self.z1, &self.z3, &self.commitment.e, &self.commitment.s, &e)
        {
            reject!(NAME, "Pedersen equation for x");
        }
        if !public
            .aux
            .verify(&self.z2, &self.z4, &self.commitment.f, &self.commitment.t, &e)
        {
            reject!(NAME, "Pedersen equation for y");
        }

        {
            let verifier = public.verifier;
            let z1c = require!(verifier.mul(public.c, &self.z1), NAME, "C is not invertible");
            let lhs = verifier.add(&z1c, &verifier.encrypt_with_nonce(&self.z2, &self.w));
            let ed = require!(verifier.mul(public.d, &e), NAME, "D is not invertible");
            let rhs = verifier.add(&self.commitment.a, &ed);
            if lhs != rhs {
                reject!(NAME, "Paillier equation under the key of the verifier");
            }
        }

        {
            let prover = public.prover;
            let lhs = prover.encrypt_with_nonce(&self.z2, &self.wy);
            let ey = require!(prover.mul(public.y, &e), NAME, "Y is not invertible");
            let rhs = prover.add(&self.commitment.by, &ey);
            if lhs != rhs {
                reject!(NAME, "Paillier equation under the key of the prover");
            }
        }

        {
            let lhs = require!(base_mul(&self.z1), NAME, "z1 is a multiple of q");
            let rhs = match point_mul(public.x, &e) {
                Some(ex) => require!(
                    add_points(&self.commitment.bx, &ex),
                    NAME,
                    "Bx is the inverse of [e]X"
                ),
                None => self.commitment.bx,
            };
            if lhs.get_element() != rhs.get_element() {
                reject!(NAME, "curve equation");
            }
        }

        true
    }
}

fn challenge(transcript: &Transcript, public: &Public, commitment: &Commitment) -> BigInt {
    let mut t = transcript.clone();
    t.write_label(NAME)
        .write(public.aux)
        .write(public.verifier)
        .write(public.prover)
        .write_bigint(public.c.value())
        .write_bigint(public.d.value())
        .write_bigint(public.y.value())
        .write_point(public.x)
        .write_bigint(commitment.a.value())
        .write_point(&commitment.bx)
        .write_bigint(commitment.by.value())
        .write_bigint(&commitment.e)
        .write_bigint(&commitment.s)
        .write_bigint(&commitment.f)
        .write_bigint(&commitment.t);
    t.challenge()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::zkp::fixtures::{fixtures, Fixtures};

    struct Statement {
        c: Ciphertext,
        d: Ciphertext,
        y: Ciphertext,
        x: GE,
        x_int: BigInt,
        y_int: BigInt,
        rho: BigInt,
        rho_y: BigInt,
    }

    /// the prover of the fixtures plays the role of the party which knows x and y
    fn statement(f: &Fixtures, x_int: BigInt, y_int: BigInt) -> Statement {
        let verifier = &f.verifier.ek;
        let prover = &f.prover.ek;
        let (c, _) = verifier.encrypt(&sample_interval(L));
        let (enc_y, rho) = verifier.encrypt(&y_int);
        let d = verifier.add(&verifier.mul(&c, &x_int).expect("valid C"), &enc_y);
        let (y, rho_y) = prover.encrypt(&y_int);
        let x = base_mul(&x_int).expect("non zero");
        Statement {
            c,
            d,
            y,
            x,
            x_int,
            y_int,
            rho,
            rho_y,
        }
    }

    fn public<'a>(f: &'a Fixtures, s: &'a Statement) -> Public<'a> {
        Public {
            c: &s.c,
            d: &s.d,
            y: &s.y,
            x: &s.x,
            verifier: &f.verifier.ek,
            prover: &f.prover.ek,
            aux: &f.pedersen,
        }
    }

    fn prove(f: &Fixtures, s: &Statement, transcript: &Transcript) -> Result<Proof, ZkError> {
        Proof::new(
            transcript,
            public(f, s),
            Private {
                x: &s.x_int,
                y: &s.y_int,
                rho: &s.rho,
                rho_y: &s.rho_y,
            },
        )
    }

    #[test]
    fn completeness() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let f = fixtures()?;
        let s = statement(&f, sample_interval(L), sample_interval(L_PRIME));
        let transcript = Transcript::new(b"affg test");
        let proof = prove(&f, &s, &transcript)?;
        assert!(proof.verify(&transcript, public(&f, &s)));

        let mut other = transcript.clone();
        other.write_label("another statement");
        assert!(!proof.verify(&other, public(&f, &s)));
        Ok(())
    }

    #[test]
    fn tampered_fields_are_rejected() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let f = fixtures()?;
        let s = statement(&f, sample_interval(L), sample_interval(L_PRIME));
        let transcript = Transcript::new(b"affg test");
        let proof = prove(&f, &s, &transcript)?;

        let n0 = &f.verifier.ek.n;
        let n1 = &f.prover.ek.n;
        let n_hat = f.pedersen.n();
        let t = f.pedersen.t();
        let two = BigInt::from(2);
        let one = BigInt::one();
        let tampers: Vec<(&str, Box<dyn Fn(&mut Proof) + '_>)> = vec![
            ("z1", Box::new(|p: &mut Proof| p.z1 = &p.z1 + &one)),
            ("z2", Box::new(|p: &mut Proof| p.z2 = &p.z2 + &one)),
            ("z3", Box::new(|p: &mut Proof| p.z3 = &p.z3 + &one)),
            ("z4", Box::new(|p: &mut Proof| p.z4 = &p.z4 + &one)),
            ("w", Box::new(|p: &mut Proof| p.w = BigInt::mod_mul(&p.w, &two, n0))),
            ("wy", Box::new(|p: &mut Proof| p.wy = BigInt::mod_mul(&p.wy, &two, n1))),
            (
                "A",
                Box::new(|p: &mut Proof| p.commitment.a = f.verifier.ek.add(&p.commitment.a, &s.c)),
            ),
            ("Bx", Box::new(|p: &mut Proof| p.commitment.bx = p.commitment.bx + s.x)),
            (
                "By",
                Box::new(|p: &mut Proof| p.commitment.by = f.prover.ek.add(&p.commitment.by, &s.y)),
            ),
            (
                "E",
                Box::new(|p: &mut Proof| p.commitment.e = BigInt::mod_mul(&p.commitment.e, t, n_hat)),
            ),
            (
                "S",
                Box::new(|p: &mut Proof| p.commitment.s = BigInt::mod_mul(&p.commitment.s, t, n_hat)),
            ),
            (
                "F",
                Box::new(|p: &mut Proof| p.commitment.f = BigInt::mod_mul(&p.commitment.f, t, n_hat)),
            ),
            (
                "T",
                Box::new(|p: &mut Proof| p.commitment.t = BigInt::mod_mul(&p.commitment.t, t, n_hat)),
            ),
        ];
        for (field, tamper) in tampers {
            let mut p = proof.clone();
            tamper(&mut p);
            assert!(!p.verify(&transcript, public(&f, &s)), "tampered {}", field);
        }
        Ok(())
    }

    #[test]
    fn proof_is_bound_to_public_inputs() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let f = fixtures()?;
        let s = statement(&f, sample_interval(L), sample_interval(L_PRIME));
        let other = statement(&f, sample_interval(L), sample_interval(L_PRIME));
        let transcript = Transcript::new(b"affg test");
        let proof = prove(&f, &s, &transcript)?;
        assert!(proof.verify(&transcript, public(&f, &s)));

        let mut swapped = public(&f, &s);
        swapped.c = &other.c;
        assert!(!proof.verify(&transcript, swapped));

        let mut swapped = public(&f, &s);
        swapped.d = &other.d;
        assert!(!proof.verify(&transcript, swapped));

        let mut swapped = public(&f, &s);
        swapped.y = &other.y;
        assert!(!proof.verify(&transcript, swapped));

        let mut swapped = public(&f, &s);
        swapped.x = &other.x;
        assert!(!proof.verify(&transcript, swapped));
        Ok(())
    }

    #[test]
    fn multiplier_out_of_range() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let f = fixtures()?;
        let x = BigInt::from(2).pow((L + EPSILON + 1) as u32);
        let s = statement(&f, x, sample_interval(L_PRIME));
        let transcript = Transcript::new(b"affg test");
        let proof = prove(&f, &s, &transcript)?;
        assert!(proof.is_valid(&public(&f, &s)));
        assert!(!is_in_interval(&proof.z1, L + EPSILON));
        assert!(!proof.verify(&transcript, public(&f, &s)));
        Ok(())
    }

    #[test]
    fn additive_share_out_of_range() -> anyhow::Result<()> {
        let f = fixtures()?;
        let y = BigInt::from(2).pow((L_PRIME + EPSILON + 1) as u32);
        let s = statement(&f, sample_interval(L), y);
        let transcript = Transcript::new(b"affg test");
        let proof = prove(&f, &s, &transcript)?;
        assert!(proof.is_valid(&public(&f, &s)));
        assert!(!is_in_interval(&proof.z2, L_PRIME + EPSILON));
        assert!(!proof.verify(&transcript, public(&f, &s)));
        Ok(())
    }
}
