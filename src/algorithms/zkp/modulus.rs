//!  Non interactive zero knowledge proof that a Paillier modulus is square-free and coprime with its totient,
//!  as described in *"Efficient Noninteractive Certification of RSA Moduli and Beyond"*, chapter 3.2,
//!  [`link`](https://eprint.iacr.org/2018/057.pdf).
//!
//!  The prover takes $`N`$th roots of [`M2`] points derived from the session transcript; the verifier
//!  raises them back to the power $`N`$ and checks that $`N`$ has no small prime factors.

use crate::algorithms::encryption::PRIME_BIT_LENGTH_IN_PAILLIER_SCHEMA;
use crate::algorithms::transcript::Transcript;
use curv::BigInt;
use paillier::{extract_nroot, DecryptionKey, EncryptionKey};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::ops::Shl;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModulusError {
    #[error("modulus proof: wrong size {0}")]
    WrongSizeOfProof(usize),
    #[error("modulus proof: incorrect rho at {0}")]
    IncorrectRho(usize),
    #[error("modulus proof: N has a small factor")]
    SmallFactor,
    #[error("modulus proof: N can be too small: {0}")]
    WrongSizeOfN(usize),
    #[error("modulus proof: no rho found for index {0}")]
    RhoNotFound(usize),
}

/// Parameters are as suggested in 6.2.3 of [link](https://eprint.iacr.org/2018/987.pdf)
pub(crate) const M2: usize = 11;

/// Corresponds to $`\alpha = 6370 `$ (as in the whitepaper)
const ALPHA: usize = 6370;

/// The output size of the hash function used in the algorithm
const DIGEST_SIZE: usize = 256;

/// the lower bound for the bit size of modulo N
///
/// Paillier crate generates primes with both MSB and LSB set to 1,
/// so the bit size of the product is in $`[( 2 * prime\_size -1 ).. (2 * prime\_size) ] `$
pub(crate) const N_MIN_SIZE: usize = 2 * PRIME_BIT_LENGTH_IN_PAILLIER_SCHEMA - 1;

/// attempts per $`\rho_i`$ before giving up; never hit unless the mask is longer than N
const MAX_ATTEMPTS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    sigmas: Vec<BigInt>,
}

impl Proof {
    /// proves the modulus of `dk`, binding the points to `transcript`
    pub fn new(transcript: &Transcript, dk: &DecryptionKey) -> Result<Self, ModulusError> {
        let n = dk.q.borrow() * dk.p.borrow();
        let sigmas = get_rho_vec(transcript, &n)?
            .into_iter()
            .map(|rho| extract_nroot(dk, &rho))
            .collect();
        Ok(Proof { sigmas })
    }

    /// Verifies the proof and checks that the public key has the expected bit size
    pub fn verify(&self, transcript: &Transcript, ek: &EncryptionKey) -> Result<(), ModulusError> {
        if self.sigmas.len() != M2 {
            return Err(ModulusError::WrongSizeOfProof(self.sigmas.len()));
        }

        let n = &ek.n;
        let bit_length_of_n = n.bit_length();
        if bit_length_of_n < N_MIN_SIZE {
            return Err(ModulusError::WrongSizeOfN(bit_length_of_n));
        }

        check_divisibility(n)?;

        for (i, (sigma, rho)) in self
            .sigmas
            .iter()
            .zip(get_rho_vec(transcript, n)?.into_iter())
            .enumerate()
        {
            if sigma <= &BigInt::zero() || sigma >= n || rho != sigma.powm_sec(n, n) {
                return Err(ModulusError::IncorrectRho(i));
            }
        }
        Ok(())
    }
}

/// generates the vector of $` \rho_{i} `$ of size M2
///
/// implements rejection sampling algorithm for $`\rho`$ as described in the [whitepaper](https://eprint.iacr.org/2018/057.pdf), section C.4
fn get_rho_vec(transcript: &Transcript, n: &BigInt) -> Result<Vec<BigInt>, ModulusError> {
    let one = BigInt::one();
    let key_length = n.bit_length();

    (0..M2)
        .map(|i| {
            (1..MAX_ATTEMPTS)
                .map(|j| {
                    let mut seed = transcript.clone();
                    seed.write_label("modulus")
                        .write_bigint(n)
                        .write_u64(i as u64)
                        .write_u64(j);
                    gen_mask(key_length, &seed)
                })
                .find(|rho| !rho.is_zero() && rho < n && rho.gcd(n) == one)
                .ok_or(ModulusError::RhoNotFound(i))
        })
        .collect()
}

/// Mask generation function, as described in [rfc8017](https://tools.ietf.org/html/rfc8017/#appendix-B.2.1), section B.2.1
///
/// The mask is truncated to `mask_length` bits so that rejection against N succeeds with probability at least 1/2.
fn gen_mask(mask_length: usize, seed: &Transcript) -> BigInt {
    let counter = (mask_length - 1) / DIGEST_SIZE;

    let mask = (0..=counter as u64)
        .map(|i| {
            let mut t = seed.clone();
            t.write_u64(i);
            BigInt::from(&t.digest()[..])
        })
        .fold(BigInt::zero(), |acc, v| acc.shl(DIGEST_SIZE) + v);

    let excess = (counter + 1) * DIGEST_SIZE - mask_length;
    mask >> excess
}

/// product of all primes up to [`ALPHA`]
fn primorial() -> BigInt {
    let mut sieve = vec![true; ALPHA + 1];
    let mut product = BigInt::one();
    for p in 2..=ALPHA {
        if sieve[p] {
            product = product * BigInt::from(p as u64);
            let mut multiple = p * p;
            while multiple <= ALPHA {
                sieve[multiple] = false;
                multiple += p;
            }
        }
    }
    product
}

pub fn check_divisibility(n: &BigInt) -> Result<(), ModulusError> {
    if primorial().gcd(n) == BigInt::one() {
        Ok(())
    } else {
        Err(ModulusError::SmallFactor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::encryption::PaillierKeys;
    use crate::algorithms::zkp::fixtures::fixtures;

    #[test]
    fn correct_proof() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let keys = fixtures()?.prover;
        let transcript = Transcript::new(b"modulus test");
        let proof = Proof::new(&transcript, &keys.dk)?;
        proof.verify(&transcript, &keys.ek)?;

        let mut other = transcript.clone();
        other.write_u64(7);
        assert_eq!(
            proof.verify(&other, &keys.ek),
            Err(ModulusError::IncorrectRho(0))
        );
        Ok(())
    }

    #[test]
    fn proof_of_another_key() -> anyhow::Result<()> {
        let f = fixtures()?;
        let transcript = Transcript::new(b"modulus test");
        let proof = Proof::new(&transcript, &f.prover.dk)?;
        assert!(proof.verify(&transcript, &f.verifier.ek).is_err());

        let mut short = proof.clone();
        short.sigmas.pop();
        assert_eq!(
            short.verify(&transcript, &f.prover.ek),
            Err(ModulusError::WrongSizeOfProof(M2 - 1))
        );
        Ok(())
    }

    #[test]
    fn small_factors() {
        assert_eq!(
            check_divisibility(&BigInt::from(6361 * 7)),
            Err(ModulusError::SmallFactor)
        );
        assert!(check_divisibility(&BigInt::from(6373 * 6379)).is_ok());
    }

    #[test]
    #[ignore]
    fn key_size() {
        for _ in 0..10 {
            let keys = PaillierKeys::random();
            assert!(keys.ek.n.bit_length() >= N_MIN_SIZE);
        }
    }
}
