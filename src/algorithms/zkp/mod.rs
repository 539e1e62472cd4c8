//! Zero knowledge proofs
//!
//! # Introduction
//!
//! The protocols use a family of non-interactive sigma protocols over Paillier ciphertexts, Pedersen commitments and the curve.
//! All of them have the same shape:
//!
//! * `Public` holds the statement, `Private` holds the witness
//! * the prover samples masks from intervals which are $`2^{\varepsilon}`$ times wider than the range of the witness and publishes a `Commitment`
//! * the challenge $`e`$ is the hash of the transcript extended with the statement and the commitment
//! * the responses are linear combinations of masks and witnesses over the integers, so that the verifier can check their range
//!
//! | proof      | statement                                                                                       |
//! |------------|-------------------------------------------------------------------------------------------------|
//! | `mulstar`  | $`D = (x \odot C) \oplus Enc_0(\cdot; \rho)`$, $`X = [x] G`$                                    |
//! | `enc`      | $`K = Enc_0(k; \rho)`$, $`k \in \pm 2^{\ell}`$                                                  |
//! | `logstar`  | $`C = Enc_0(x; \rho)`$, $`X = [x] B`$                                                            |
//! | `affg`     | $`D = (x \odot C) \oplus Enc_0(y; \rho)`$, $`Y = Enc_1(y; \rho_y)`$, $`X = [x] G`$               |
//! | `sch`      | $`X = [x] G`$                                                                                   |
//! | `prm`      | $`s = t^{\lambda} \mod \hat{N}`$                                                                |
//! | `modulus`  | $`gcd(N, \phi(N)) = 1`$ and $`N`$ has no small factors                                          |
//!
//! Every verifier logs the check which failed at `trace` level.

use thiserror::Error;

/// logs the failed check and returns `false` from the verifier
macro_rules! reject {
    ($proof:expr, $check:expr) => {{
        log::trace!("{} proof rejected: {}", $proof, $check);
        return false;
    }};
}

/// unwraps the value or rejects the proof
macro_rules! require {
    ($value:expr, $proof:expr, $check:expr) => {
        match $value {
            Some(v) => v,
            None => reject!($proof, $check),
        }
    };
}

pub mod affg;
pub mod enc;
pub mod fixtures;
pub mod logstar;
pub mod modulus;
pub mod mulstar;
pub mod prm;
pub mod sch;

/// bit length of the curve order
pub const L: usize = 256;
/// slack of the range proofs
pub const EPSILON: usize = 2 * L;
/// bit length of the additive masks of MtA
pub const L_PRIME: usize = 5 * L;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ZkError {
    #[error("{proof} proof cannot be built: {reason}")]
    Proving {
        proof: &'static str,
        reason: &'static str,
    },
    #[error("invalid fixture: {0}")]
    Fixture(String),
}

impl ZkError {
    pub(crate) fn proving(proof: &'static str, reason: &'static str) -> Self {
        ZkError::Proving { proof, reason }
    }
}
