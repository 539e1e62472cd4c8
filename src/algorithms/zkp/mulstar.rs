//! Proof of scalar multiplication of a ciphertext, with the scalar committed on the curve
//!
//! The prover knows $`x \in \pm 2^{\ell}`$ and $`\rho \in Z^*_{N_0}`$ such that
//! ```math
//! D = (x \odot C) \cdot \rho^{N_0} \mod N_0^2, \quad X = [x] \cdot G
//! ```
//! for a ciphertext $`C`$ under the key $`N_0`$ of the verifier.
//!
//! ## Algorithm
//!
//! ```math
//! \begin{array}{lcl}
//! \textrm{\underline{Prover}}                                                                   &  & \textrm{\underline{Verifier}} \\ \\
//! \alpha \in_R \pm 2^{\ell + \varepsilon}, \; r \in_R Z^*_{N_0}                                  &  & \\
//! \gamma, m \in_R \pm 2^{\ell + \varepsilon} \hat{N}                                            &  & \\
//! A = (\alpha \odot C) \cdot r^{N_0}, \; B_x = [\alpha] \cdot G                                 &  & \\
//! E = s^{\alpha} t^{\gamma}, \; S = s^{x} t^{m} \mod \hat{N}                                   & \xrightarrow{A, B_x, E, S} & \\
//! & & e = H(\ldots) \\
//! z_1 = \alpha + e x, \; z_2 = \gamma + e m, \; w = r \rho^{e} \mod N_0                        & \xrightarrow{z_1, z_2, w} & \\
//! & & z_1 \in \pm 2^{\ell + \varepsilon} \\
//! & & s^{z_1} t^{z_2} = E S^{e} \mod \hat{N} \\
//! & & (z_1 \odot C) \cdot w^{N_0} = A \oplus (e \odot D) \\
//! & & [z_1] \cdot G = B_x + [e] \cdot X \\
//! \end{array}
//! ```

use crate::algorithms::encryption::{Ciphertext, PaillierPublic};
use crate::algorithms::pedersen::PedersenParameters;
use crate::algorithms::transcript::Transcript;
use crate::algorithms::zkp::{ZkError, EPSILON, L};
use crate::algorithms::{
    add_points, base_mul, is_in_interval, point_mul, pow_mod, sample_interval, sample_interval_scaled,
    sample_unit,
};
use curv::arithmetic::traits::{Modulo, ZeroizeBN};
use curv::elliptic::curves::traits::ECPoint;
use curv::{BigInt, GE};
use paillier::EncryptionKey;
use serde::{Deserialize, Serialize};

const NAME: &str = "mulstar";

#[derive(Clone, Copy, Debug)]
pub struct Public<'a> {
    pub c: &'a Ciphertext,
    /// $`D = (x \odot C) \oplus Enc_0(0; \rho)`$
    pub d: &'a Ciphertext,
    pub x: &'a GE,
    pub verifier: &'a EncryptionKey,
    pub aux: &'a PedersenParameters,
}

pub struct Private<'a> {
    /// $`x \in \pm 2^{\ell}`$
    pub x: &'a BigInt,
    /// nonce of $`D`$
    pub rho: &'a BigInt,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    pub a: Ciphertext,
    pub bx: GE,
    pub e: BigInt,
    pub s: BigInt,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    pub commitment: Commitment,
    pub z1: BigInt,
    pub z2: BigInt,
    pub w: BigInt,
}

impl Proof {
    pub fn new(transcript: &Transcript, public: Public, private: Private) -> Result<Self, ZkError> {
        let n0 = public.verifier.modulus();

        let mut alpha = sample_interval(L + EPSILON);
        let mut r = sample_unit(n0);
        let mut gamma = sample_interval_scaled(L + EPSILON, public.aux.n());
        let mut m = sample_interval_scaled(L + EPSILON, public.aux.n());

        let a = public
            .verifier
            .mul(public.c, &alpha)
            .ok_or_else(|| ZkError::proving(NAME, "C is not invertible"))?;
        let commitment = Commitment {
            a: public.verifier.randomize(&a, &r),
            bx: base_mul(&alpha).ok_or_else(|| ZkError::proving(NAME, "zero mask"))?,
            e: public
                .aux
                .commit(&alpha, &gamma)
                .ok_or_else(|| ZkError::proving(NAME, "invalid Pedersen parameters"))?,
            s: public
                .aux
                .commit(private.x, &m)
                .ok_or_else(|| ZkError::proving(NAME, "invalid Pedersen parameters"))?,
        };

        let e = challenge(transcript, &public, &commitment);

        let z1 = &e * private.x + &alpha;
        let z2 = &e * &m + &gamma;
        let rho_e = pow_mod(private.rho, &e, n0)
            .ok_or_else(|| ZkError::proving(NAME, "invalid nonce"))?;
        let w = BigInt::mod_mul(&rho_e, &r, n0);

        alpha.zeroize_bn();
        r.zeroize_bn();
        gamma.zeroize_bn();
        m.zeroize_bn();

        Ok(Proof {
            commitment,
            z1,
            z2,
            w,
        })
    }

    /// structural checks which do not depend on the challenge
    pub fn is_valid(&self, public: &Public) -> bool {
        public.verifier.is_valid_mod_n(&self.w)
            && public.verifier.validate_ciphertext(&self.commitment.a)
    }

    pub fn verify(&self, transcript: &Transcript, public: Public) -> bool {
        if !self.is_valid(&public) {
            reject!(NAME, "malformed proof");
        }
        if !is_in_interval(&self.z1, L + EPSILON) {
            reject!(NAME, "z1 out of range");
        }

        let e = challenge(transcript, &public, &self.commitment);

        if !public
            .aux
            .verify(&self.z1, &self.z2, &self.commitment.e, &self.commitment.s, &e)
        {
            reject!(NAME, "Pedersen equation");
        }

        {
            let lhs = require!(
                public.verifier.mul(public.c, &self.z1),
                NAME,
                "C is not invertible"
            );
            let lhs = public.verifier.randomize(&lhs, &self.w);
            let ed = require!(public.verifier.mul(public.d, &e), NAME, "D is not invertible");
            let rhs = public.verifier.add(&ed, &self.commitment.a);
            if lhs != rhs {
                reject!(NAME, "Paillier equation");
            }
        }

        {
            let lhs = require!(base_mul(&self.z1), NAME, "z1 is a multiple of q");
            let rhs = match point_mul(public.x, &e) {
                Some(ex) => require!(
                    add_points(&ex, &self.commitment.bx),
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
        .write_bigint(public.c.value())
        .write_bigint(public.d.value())
        .write_point(public.x)
        .write_bigint(commitment.a.value())
        .write_point(&commitment.bx)
        .write_bigint(&commitment.e)
        .write_bigint(&commitment.s);
    t.challenge()
}
