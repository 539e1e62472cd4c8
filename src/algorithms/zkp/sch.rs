//! Schnorr proof of knowledge of a discrete logarithm
//!
//! Key generation publishes the commitment $`A = [a] \cdot G`$ before the secret $`x`$ is known, and sends the response $`z = a + e x \mod q`$
//! once the secret share is computed. Therefore the commitment and the response are separate messages here.
//!
//! The verifier checks $`[z] \cdot G = A + [e] \cdot X`$.

use crate::algorithms::transcript::Transcript;
use crate::algorithms::{add_points, point_mul, to_scalar};
use curv::elliptic::curves::traits::{ECPoint, ECScalar};
use curv::{BigInt, FE, GE};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

const NAME: &str = "sch";

/// $`A = [a] \cdot G`$
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    pub a: GE,
}

/// $`z = a + e x \mod q`$
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub z: FE,
}

/// Secret nonce $`a`$ together with its commitment
pub struct Randomness {
    a: FE,
    commitment: Commitment,
}

impl Randomness {
    pub fn new() -> Self {
        let a: FE = FE::new_random();
        let g: GE = ECPoint::generator();
        Randomness {
            a,
            commitment: Commitment { a: g * a },
        }
    }

    pub fn commitment(&self) -> &Commitment {
        &self.commitment
    }

    /// proves knowledge of `secret` for `public` $`= [secret] \cdot G`$
    pub fn prove(&self, transcript: &Transcript, public: &GE, secret: &FE) -> Response {
        let e = challenge(transcript, public, &self.commitment);
        let z = match to_scalar(&e) {
            Some(e) => self.a + e * secret,
            None => self.a,
        };
        Response { z }
    }
}

impl Default for Randomness {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Randomness {
    fn drop(&mut self) {
        self.a.zeroize();
    }
}

impl Response {
    pub fn verify(&self, transcript: &Transcript, public: &GE, commitment: &Commitment) -> bool {
        let e = challenge(transcript, public, commitment);
        let g: GE = ECPoint::generator();
        let lhs = g * self.z;
        let rhs = match point_mul(public, &e) {
            Some(ex) => require!(
                add_points(&commitment.a, &ex),
                NAME,
                "A is the inverse of [e]X"
            ),
            None => commitment.a,
        };
        if lhs.get_element() != rhs.get_element() {
            reject!(NAME, "curve equation");
        }
        true
    }
}

/// Non-interactive proof with the commitment and the response in one message
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    pub commitment: Commitment,
    pub response: Response,
}

impl Proof {
    pub fn new(transcript: &Transcript, public: &GE, secret: &FE) -> Self {
        let randomness = Randomness::new();
        let response = randomness.prove(transcript, public, secret);
        Proof {
            commitment: randomness.commitment().clone(),
            response,
        }
    }

    pub fn verify(&self, transcript: &Transcript, public: &GE) -> bool {
        self.response.verify(transcript, public, &self.commitment)
    }
}

fn challenge(transcript: &Transcript, public: &GE, commitment: &Commitment) -> BigInt {
    let mut t = transcript.clone();
    t.write_label(NAME).write_point(public).write_point(&commitment.a);
    t.challenge()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_ahead_of_secret() {
        let _ = env_logger::builder().is_test(true).try_init();
        let transcript = Transcript::new(b"sch test");
        let randomness = Randomness::new();
        let commitment = randomness.commitment().clone();

        let x: FE = FE::new_random();
        let g: GE = ECPoint::generator();
        let public = g * x;
        let response = randomness.prove(&transcript, &public, &x);
        assert!(response.verify(&transcript, &public, &commitment));

        let other: FE = FE::new_random();
        assert!(!response.verify(&transcript, &(g * other), &commitment));

        let one: FE = ECScalar::from(&BigInt::one());
        let tampered = Response {
            z: response.z + one,
        };
        assert!(!tampered.verify(&transcript, &public, &commitment));
    }

    #[test]
    fn one_shot_proof() {
        let transcript = Transcript::new(b"sch test");
        let x: FE = FE::new_random();
        let g: GE = ECPoint::generator();
        let public = g * x;
        let proof = Proof::new(&transcript, &public, &x);
        assert!(proof.verify(&transcript, &public));

        let mut other = transcript.clone();
        other.write_u64(2);
        assert!(!proof.verify(&other, &public));
    }
}
