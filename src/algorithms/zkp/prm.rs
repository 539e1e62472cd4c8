//! Proof that Pedersen parameters are well formed, i.e. $`s = t^{\lambda} \mod \hat{N}`$
//!
//! Signature scheme for a discrete logarithm in a composite group with unknown order,
//! "Composite discrete logarithm and secure authentication", D. Pointcheval, section 3.2.
//!
//! ```math
//! r \in_R [0, 2^{|\phi(N)| + 256 + 128}), \; x = t^{r}, \; c = H(\ldots, x), \; y = r - c \lambda
//! ```
//! The verifier recomputes $`x = t^{y} s^{c} \mod \hat{N}`$ and checks the challenge.

use crate::algorithms::pedersen::PedersenParameters;
use crate::algorithms::pow_mod;
use crate::algorithms::transcript::Transcript;
use crate::algorithms::zkp::ZkError;
use curv::arithmetic::traits::{Modulo, Samplable, ZeroizeBN};
use curv::BigInt;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

const NAME: &str = "prm";
const DIGEST_BIT_LENGTH: u32 = 256;
const SECURITY_PARAMETER: u32 = 128;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    y: BigInt,
    c: BigInt,
}

#[allow(clippy::many_single_char_names)]
impl Proof {
    /// proves knowledge of `lambda` for the parameters, where `phi` is the order of $`Z^*_N`$
    pub fn new(
        transcript: &Transcript,
        params: &PedersenParameters,
        lambda: &BigInt,
        phi: &BigInt,
    ) -> Result<Self, ZkError> {
        let max_secret_length = phi.bit_length() as u32;
        let log_r = max_secret_length + DIGEST_BIT_LENGTH + SECURITY_PARAMETER;
        let bound = BigInt::from(2).pow(log_r);
        let mut r = BigInt::sample_below(&bound);
        let x = pow_mod(params.t(), &r, params.n())
            .ok_or_else(|| ZkError::proving(NAME, "invalid Pedersen parameters"))?;
        let c = challenge(transcript, params, &x);

        let y = r.borrow() - c.borrow() * lambda;
        r.zeroize_bn();
        Ok(Proof { y, c })
    }

    pub fn verify(&self, transcript: &Transcript, params: &PedersenParameters) -> bool {
        if let Err(e) = params.validate() {
            reject!(NAME, e);
        }
        let n = params.n();
        let ty = require!(pow_mod(params.t(), &self.y, n), NAME, "t is not invertible");
        let sc = require!(pow_mod(params.s(), &self.c, n), NAME, "s is not invertible");
        let x = BigInt::mod_mul(&ty, &sc, n);
        if challenge(transcript, params, &x) != self.c {
            reject!(NAME, "challenge mismatch");
        }
        true
    }
}

fn challenge(transcript: &Transcript, params: &PedersenParameters, x: &BigInt) -> BigInt {
    let mut t = transcript.clone();
    t.write_label(NAME).write(params).write_bigint(x);
    BigInt::from(&t.digest()[..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::pedersen::generate;
    use crate::algorithms::zkp::fixtures::fixtures;

    #[test]
    fn valid_parameters() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let keys = fixtures()?.prover;
        let (params, lambda) = generate(&keys);
        let transcript = Transcript::new(b"prm test");
        let proof = Proof::new(&transcript, &params, &lambda, &keys.phi())?;
        assert!(proof.verify(&transcript, &params));

        let mut other = transcript.clone();
        other.write_u64(3);
        assert!(!proof.verify(&other, &params));
        Ok(())
    }

    #[test]
    fn wrong_exponent() -> anyhow::Result<()> {
        let keys = fixtures()?.prover;
        let (params, lambda) = generate(&keys);
        let transcript = Transcript::new(b"prm test");
        let wrong = lambda + BigInt::one();
        let proof = Proof::new(&transcript, &params, &wrong, &keys.phi())?;
        assert!(!proof.verify(&transcript, &params));
        Ok(())
    }
}
