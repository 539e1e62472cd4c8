//! Range proof of a Paillier plaintext
//!
//! The prover knows $`k \in \pm 2^{\ell}`$ and $`\rho`$ such that $`K = Enc_0(k; \rho)`$ under its own key $`N_0`$.
//!
//! ```math
//! \begin{array}{ll}
//! \alpha \in_R \pm 2^{\ell + \varepsilon}, \; \mu \in_R \pm 2^{\ell} \hat{N}, \; r \in_R Z^*_{N_0}, \; \gamma \in_R \pm 2^{\ell + \varepsilon} \hat{N} & \\
//! S = s^{k} t^{\mu}, \; A = Enc_0(\alpha; r), \; C = s^{\alpha} t^{\gamma} & \\
//! z_1 = \alpha + e k, \; z_2 = r \rho^{e} \mod N_0, \; z_3 = \gamma + e \mu & \\
//! \textrm{verifier: } z_1 \in \pm 2^{\ell + \varepsilon}, \; Enc_0(z_1; z_2) = A \oplus (e \odot K), \; s^{z_1} t^{z_3} = C S^{e} &
//! \end{array}
//! ```

use crate::algorithms::encryption::{Ciphertext, PaillierPublic};
use crate::algorithms::pedersen::PedersenParameters;
use crate::algorithms::transcript::Transcript;
use crate::algorithms::zkp::{ZkError, EPSILON, L};
use crate::algorithms::{
    is_in_interval, pow_mod, sample_interval, sample_interval_scaled, sample_unit,
};
use curv::arithmetic::traits::{Modulo, ZeroizeBN};
use curv::BigInt;
use paillier::EncryptionKey;
use serde::{Deserialize, Serialize};

const NAME: &str = "enc";

#[derive(Clone, Copy, Debug)]
pub struct Public<'a> {
    pub k: &'a Ciphertext,
    pub prover: &'a EncryptionKey,
    pub aux: &'a PedersenParameters,
}

pub struct Private<'a> {
    pub k: &'a BigInt,
    pub rho: &'a BigInt,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    pub s: BigInt,
    pub a: Ciphertext,
    pub c: BigInt,
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
                .commit(private.k, &mu)
                .ok_or_else(|| ZkError::proving(NAME, "invalid Pedersen parameters"))?,
            a: public.prover.encrypt_with_nonce(&alpha, &r),
            c: public
                .aux
                .commit(&alpha, &gamma)
                .ok_or_else(|| ZkError::proving(NAME, "invalid Pedersen parameters"))?,
        };

        let e = challenge(transcript, &public, &commitment);

        let z1 = &e * private.k + &alpha;
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
        if !public.prover.validate_ciphertext(public.k) {
            reject!(NAME, "malformed K");
        }
        if !is_in_interval(&self.z1, L + EPSILON) {
            reject!(NAME, "z1 out of range");
        }

        let e = challenge(transcript, &public, &self.commitment);

        if !public
            .aux
            .verify(&self.z1, &self.z3, &self.commitment.c, &self.commitment.s, &e)
        {
            reject!(NAME, "Pedersen equation");
        }

        let lhs = public.prover.encrypt_with_nonce(&self.z1, &self.z2);
        let ek = require!(public.prover.mul(public.k, &e), NAME, "K is not invertible");
        let rhs = public.prover.add(&self.commitment.a, &ek);
        if lhs != rhs {
            reject!(NAME, "Paillier equation");
        }

        true
    }
}

fn challenge(transcript: &Transcript, public: &Public, commitment: &Commitment) -> BigInt {
    let mut t = transcript.clone();
    t.write_label(NAME)
        .write(public.aux)
        .write(public.prover)
        .write_bigint(public.k.value())
        .write_bigint(&commitment.s)
        .write_bigint(commitment.a.value())
        .write_bigint(&commitment.c);
    t.challenge()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::zkp::fixtures::{fixtures, Fixtures};

    fn prove(f: &Fixtures, k: &BigInt, transcript: &Transcript) -> anyhow::Result<(Ciphertext, Proof)> {
        let (big_k, rho) = f.prover.ek.encrypt(k);
        let public = Public {
            k: &big_k,
            prover: &f.prover.ek,
            aux: &f.pedersen,
        };
        let proof = Proof::new(transcript, public, Private { k, rho: &rho })?;
        Ok((big_k, proof))
    }

    #[test]
    fn completeness_and_tampering() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let f = fixtures()?;
        let transcript = Transcript::new(b"enc test");
        let (big_k, proof) = prove(&f, &sample_interval(L), &transcript)?;
        let public = Public {
            k: &big_k,
            prover: &f.prover.ek,
            aux: &f.pedersen,
        };
        assert!(proof.verify(&transcript, public));

        let mut p = proof.clone();
        p.z1 = &p.z1 + &BigInt::one();
        assert!(!p.verify(&transcript, public));

        let mut p = proof.clone();
        p.z2 = BigInt::mod_mul(&p.z2, &BigInt::from(3), &f.prover.ek.n);
        assert!(!p.verify(&transcript, public));

        let mut p = proof.clone();
        p.z3 = &p.z3 - &BigInt::one();
        assert!(!p.verify(&transcript, public));

        let mut p = proof.clone();
        p.commitment.s = BigInt::mod_mul(&p.commitment.s, f.pedersen.t(), f.pedersen.n());
        assert!(!p.verify(&transcript, public));

        let mut p = proof.clone();
        p.commitment.a = f.prover.ek.add(&p.commitment.a, &big_k);
        assert!(!p.verify(&transcript, public));

        let mut p = proof.clone();
        p.commitment.c = BigInt::mod_mul(&p.commitment.c, f.pedersen.s(), f.pedersen.n());
        assert!(!p.verify(&transcript, public));

        let mut other = transcript.clone();
        other.write_u64(1);
        assert!(!proof.verify(&other, public));
        Ok(())
    }

    #[test]
    fn proof_is_bound_to_ciphertext() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let f = fixtures()?;
        let transcript = Transcript::new(b"enc test");
        let k = sample_interval(L);
        let (_, proof) = prove(&f, &k, &transcript)?;

        // the same plaintext under a fresh nonce
        let (another_k, _) = f.prover.ek.encrypt(&k);
        let swapped = Public {
            k: &another_k,
            prover: &f.prover.ek,
            aux: &f.pedersen,
        };
        assert!(!proof.verify(&transcript, swapped));
        Ok(())
    }

    #[test]
    fn plaintext_out_of_range() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let f = fixtures()?;
        let transcript = Transcript::new(b"enc test");
        let k = BigInt::from(2).pow((L + EPSILON + 1) as u32);
        for k in vec![k.clone(), -k] {
            let (big_k, proof) = prove(&f, &k, &transcript)?;
            let public = Public {
                k: &big_k,
                prover: &f.prover.ek,
                aux: &f.pedersen,
            };
            assert!(proof.is_valid(&public));
            assert!(!is_in_interval(&proof.z1, L + EPSILON));
            assert!(!proof.verify(&transcript, public));
        }
        Ok(())
    }
}
