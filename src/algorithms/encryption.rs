//! Paillier encryption with signed plaintexts
//!
//! Keys come from the `paillier` crate. On top of them the module provides operations needed by the proofs:
//!
//! * encryption of plaintexts of any sign with a known nonce $`\rho`$: $`Enc(m; \rho) = (1 + N)^{m} \rho^{N} \mod N^2`$
//! * homomorphic addition $`\oplus`$ and multiplication by a signed scalar $`\odot`$
//! * decryption into the symmetric range $`(-N/2, N/2]`$
//!
//! Multiplication by a scalar uses the signed exponent as is, negative exponents are applied to the inverse of the ciphertext.

use crate::algorithms::transcript::{Transcript, TranscriptWrite};
use crate::algorithms::{is_unit, pow_mod, sample_unit};
use curv::arithmetic::traits::{Modulo, ZeroizeBN};
use curv::BigInt;
use paillier::{
    is_prime, Add, Decrypt, DecryptionKey, EncryptWithChosenRandomness, EncryptionKey,
    KeyGeneration, Paillier, Randomness, RawCiphertext, RawPlaintext,
};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use trace::trace;
use zeroize::Zeroize;

/// current recommended bit size for the primes in Paillier schema
pub const PRIME_BIT_LENGTH_IN_PAILLIER_SCHEMA: usize = 1024;

/// Paillier ciphertext, an element of $`Z^*_{N^2}`$
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ciphertext(BigInt);

impl Ciphertext {
    pub fn from_bigint(c: BigInt) -> Self {
        Ciphertext(c)
    }

    pub fn value(&self) -> &BigInt {
        &self.0
    }
}

impl TranscriptWrite for Ciphertext {
    fn write_to(&self, transcript: &mut Transcript) {
        transcript.write_bigint(&self.0);
    }
}

/// Homomorphic operations with a public Paillier key
pub trait PaillierPublic {
    fn modulus(&self) -> &BigInt;

    /// encrypts `m` with a fresh nonce, returns the ciphertext and the nonce
    fn encrypt(&self, m: &BigInt) -> (Ciphertext, BigInt);

    fn encrypt_with_nonce(&self, m: &BigInt, nonce: &BigInt) -> Ciphertext;

    /// $`c \odot k = c^{k} \mod N^2`$; `None` if `k` is negative and `c` is not invertible
    fn mul(&self, c: &Ciphertext, k: &BigInt) -> Option<Ciphertext>;

    /// $`a \oplus b`$
    fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Ciphertext;

    /// $`c \cdot \rho^{N} \mod N^2`$
    fn randomize(&self, c: &Ciphertext, nonce: &BigInt) -> Ciphertext;

    /// checks $`0 < c < N^2`$ and $`gcd(c, N) = 1`$
    fn validate_ciphertext(&self, c: &Ciphertext) -> bool;

    /// checks that `x` is an element of $`Z^*_N`$
    fn is_valid_mod_n(&self, x: &BigInt) -> bool;
}

impl PaillierPublic for EncryptionKey {
    fn modulus(&self) -> &BigInt {
        &self.n
    }

    fn encrypt(&self, m: &BigInt) -> (Ciphertext, BigInt) {
        let nonce = sample_unit(&self.n);
        (self.encrypt_with_nonce(m, &nonce), nonce)
    }

    fn encrypt_with_nonce(&self, m: &BigInt, nonce: &BigInt) -> Ciphertext {
        let c = Paillier::encrypt_with_chosen_randomness(
            self,
            RawPlaintext::from(m.mod_floor(&self.n)),
            &Randomness::from(nonce),
        );
        Ciphertext(c.0.into_owned())
    }

    fn mul(&self, c: &Ciphertext, k: &BigInt) -> Option<Ciphertext> {
        pow_mod(&c.0, k, &self.nn).map(Ciphertext)
    }

    fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Ciphertext {
        let c = Paillier::add(self, RawCiphertext::from(&a.0), RawCiphertext::from(&b.0));
        Ciphertext(c.0.into_owned())
    }

    fn randomize(&self, c: &Ciphertext, nonce: &BigInt) -> Ciphertext {
        let mask = nonce.powm_sec(&self.n, &self.nn);
        Ciphertext(BigInt::mod_mul(&c.0, &mask, &self.nn))
    }

    fn validate_ciphertext(&self, c: &Ciphertext) -> bool {
        c.0 > BigInt::zero() && c.0 < self.nn && c.0.gcd(&self.n) == BigInt::one()
    }

    fn is_valid_mod_n(&self, x: &BigInt) -> bool {
        is_unit(x, &self.n)
    }
}

/// Public/private key pair for additive homomorphic encryption schema
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct PaillierKeys {
    pub dk: DecryptionKey,
    pub ek: EncryptionKey,
}

impl Zeroize for PaillierKeys {
    fn zeroize(&mut self) {
        self.dk.p.zeroize_bn();
        self.dk.q.zeroize_bn();
        self.ek.n.zeroize_bn();
        self.ek.nn.zeroize_bn();
    }
}

impl Drop for PaillierKeys {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl PaillierKeys {
    /// produces new Paillier key pair
    pub fn random() -> Self {
        let (ek, dk) =
            Paillier::keypair_with_modulus_size(2 * PRIME_BIT_LENGTH_IN_PAILLIER_SCHEMA).keys();
        Self { ek, dk }
    }

    /// builds the key pair from known primes
    pub fn from_primes(p: &BigInt, q: &BigInt) -> Self {
        let n = p * q;
        let nn = &n * &n;
        Self {
            dk: DecryptionKey {
                p: p.clone(),
                q: q.clone(),
            },
            ek: EncryptionKey { n, nn },
        }
    }

    /// $`\phi(N) = (p-1)(q-1)`$
    pub fn phi(&self) -> BigInt {
        (self.dk.p.borrow() - BigInt::one()) * (self.dk.q.borrow() - BigInt::one())
    }

    /// decrypts `c` into the range $`(-N/2, N/2]`$
    pub fn decrypt(&self, c: &Ciphertext) -> BigInt {
        let m: BigInt = Paillier::decrypt(&self.dk, RawCiphertext::from(&c.0))
            .0
            .into_owned();
        let n = &self.ek.n;
        if m > n.div_floor(&BigInt::from(2)) {
            m - n
        } else {
            m
        }
    }

    /// checks whether Paillier's setup is valid and consistent
    #[trace(pretty, prefix = "PaillierKeys::")]
    pub fn is_valid(ek: &EncryptionKey, dk: &DecryptionKey) -> bool {
        is_prime(&dk.p)
            && is_prime(&dk.q)
            && ek.n == dk.p.borrow() * dk.q.borrow()
            && ek.nn == ek.n.pow(2)
    }
}

impl Display for PaillierKeys {
    /// hides private key of the schema
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaillierKeys")
            .field("dk", &"[***]".to_owned())
            .field("ek", &self.ek)
            .finish()
    }
}

impl Debug for PaillierKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::sample_interval;
    use crate::algorithms::zkp::fixtures::fixtures;

    #[test]
    fn signed_plaintexts() -> anyhow::Result<()> {
        let keys = fixtures()?.prover;
        for m in &[BigInt::from(-12345), BigInt::zero(), BigInt::from(777)] {
            let (c, _) = keys.ek.encrypt(m);
            assert!(keys.ek.validate_ciphertext(&c));
            assert_eq!(&keys.decrypt(&c), m);
        }
        Ok(())
    }

    #[test]
    fn homomorphic_operations() -> anyhow::Result<()> {
        let keys = fixtures()?.prover;
        let a = sample_interval(256);
        let b = sample_interval(256);
        let k = sample_interval(256);
        let (ca, _) = keys.ek.encrypt(&a);
        let (cb, _) = keys.ek.encrypt(&b);

        let sum = keys.ek.add(&ca, &cb);
        assert_eq!(keys.decrypt(&sum), &a + &b);

        let product = keys.ek.mul(&ca, &k).expect("valid ciphertext");
        assert_eq!(keys.decrypt(&product), &a * &k);

        let negated = keys.ek.mul(&ca, &BigInt::from(-1)).expect("valid ciphertext");
        assert_eq!(keys.decrypt(&negated), -a.clone());

        let nonce = sample_unit(&keys.ek.n);
        let randomized = keys.ek.randomize(&ca, &nonce);
        assert_ne!(randomized, ca);
        assert_eq!(keys.decrypt(&randomized), a);
        Ok(())
    }

    #[test]
    fn nonce_determines_ciphertext() -> anyhow::Result<()> {
        let keys = fixtures()?.prover;
        let m = BigInt::from(42);
        let (c, nonce) = keys.ek.encrypt(&m);
        assert_eq!(keys.ek.encrypt_with_nonce(&m, &nonce), c);
        assert!(!keys.ek.validate_ciphertext(&Ciphertext::from_bigint(BigInt::zero())));
        assert!(!keys
            .ek
            .validate_ciphertext(&Ciphertext::from_bigint(keys.ek.nn.clone())));
        assert!(!keys
            .ek
            .validate_ciphertext(&Ciphertext::from_bigint(keys.dk.p.clone())));
        Ok(())
    }

    #[test]
    fn generated_keys_are_valid() {
        let keys = PaillierKeys::random();
        assert!(PaillierKeys::is_valid(&keys.ek, &keys.dk));
        assert!(keys.ek.n.bit_length() >= 2 * PRIME_BIT_LENGTH_IN_PAILLIER_SCHEMA - 1);
    }
}
