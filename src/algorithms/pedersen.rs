//! Pedersen commitments in the ring of integers modulo an RSA modulus $`\hat{N}`$
//!
//! Parameters are $`(\hat{N}, s, t)`$ where $`s = t^{\lambda}`$ for a secret $`\lambda`$ known to the party which generated them.
//! A commitment to $`(x, y)`$ is $`s^{x} t^{y} \mod \hat{N}`$, for integers of any sign.
//!
//! The parameters are derived from a Paillier key pair, so that $`\hat{N}`$ is the Paillier modulus:
//!  * $`\tau \in_R Z^*_N`$, $`t = \tau^2 \mod N`$
//!  * $`\lambda \in_R Z_{\phi(N)}`$, $`s = t^{\lambda} \mod N`$

use crate::algorithms::encryption::PaillierKeys;
use crate::algorithms::transcript::{Transcript, TranscriptWrite};
use crate::algorithms::{is_unit, pow_mod, sample_unit};
use curv::arithmetic::traits::{Modulo, Samplable, ZeroizeBN};
use curv::BigInt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use trace::trace;

#[derive(Debug, Error, PartialEq)]
pub enum PedersenError {
    #[error("Pedersen parameters: {0} is not an element of Z*_N")]
    NotAUnit(&'static str),
    #[error("Pedersen parameters: s and t must be distinct and different from 1")]
    Degenerate,
    #[error("Pedersen parameters: modulus is even or too small")]
    Modulus,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PedersenParameters {
    n: BigInt,
    s: BigInt,
    t: BigInt,
}

#[trace(pretty, prefix = "PedersenParameters::", disable(n, s, t, commit, verify))]
impl PedersenParameters {
    /// creates parameters from public values, checking their structure
    pub fn new(n: BigInt, s: BigInt, t: BigInt) -> Result<Self, PedersenError> {
        let params = PedersenParameters { n, s, t };
        params.validate()?;
        Ok(params)
    }

    /// checks that $`s, t \in Z^*_N`$ and neither of them is trivial
    pub fn validate(&self) -> Result<(), PedersenError> {
        if self.n.bit_length() < 3 || self.n.mod_floor(&BigInt::from(2)) == BigInt::zero() {
            return Err(PedersenError::Modulus);
        }
        if !is_unit(&self.s, &self.n) {
            return Err(PedersenError::NotAUnit("s"));
        }
        if !is_unit(&self.t, &self.n) {
            return Err(PedersenError::NotAUnit("t"));
        }
        if self.s == BigInt::one() || self.t == BigInt::one() || self.s == self.t {
            return Err(PedersenError::Degenerate);
        }
        Ok(())
    }

    pub fn n(&self) -> &BigInt {
        &self.n
    }

    pub fn s(&self) -> &BigInt {
        &self.s
    }

    pub fn t(&self) -> &BigInt {
        &self.t
    }

    /// $`s^{x} t^{y} \mod \hat{N}`$
    pub fn commit(&self, x: &BigInt, y: &BigInt) -> Option<BigInt> {
        let sx = pow_mod(&self.s, x, &self.n)?;
        let ty = pow_mod(&self.t, y, &self.n)?;
        Some(BigInt::mod_mul(&sx, &ty, &self.n))
    }

    /// checks $`s^{a} t^{b} = E \cdot S^{e} \mod \hat{N}`$
    pub fn verify(
        &self,
        a: &BigInt,
        b: &BigInt,
        e_commit: &BigInt,
        s_commit: &BigInt,
        e: &BigInt,
    ) -> bool {
        if !is_unit(e_commit, &self.n) || !is_unit(s_commit, &self.n) {
            return false;
        }
        let lhs = match self.commit(a, b) {
            Some(lhs) => lhs,
            None => return false,
        };
        match pow_mod(s_commit, e, &self.n) {
            Some(se) => lhs == BigInt::mod_mul(e_commit, &se, &self.n),
            None => false,
        }
    }
}

impl TranscriptWrite for PedersenParameters {
    fn write_to(&self, transcript: &mut Transcript) {
        transcript
            .write_bigint(&self.n)
            .write_bigint(&self.s)
            .write_bigint(&self.t);
    }
}

/// Samples Pedersen parameters over the modulus of the Paillier key pair
///
/// Returns the parameters and the secret exponent $`\lambda`$, which is needed to prove that $`s \in \langle t \rangle`$
pub fn generate(keys: &PaillierKeys) -> (PedersenParameters, BigInt) {
    let n = keys.ek.n.clone();
    let phi = keys.phi();
    loop {
        let mut tau = sample_unit(&n);
        let t = BigInt::mod_mul(&tau, &tau, &n);
        tau.zeroize_bn();
        let lambda = BigInt::sample_below(&phi);
        let s = t.powm_sec(&lambda, &n);
        let params = PedersenParameters {
            n: n.clone(),
            s,
            t,
        };
        if params.validate().is_ok() {
            return (params, lambda);
        }
    }
}
