//!   Message types used by MPC algorithms in the crate
//!
#![allow(clippy::large_enum_variant)]
use crate::algorithms::transcript::{HashOutput, Transcript, TranscriptWrite};

/// key generation and key refresh related message data types
pub mod keygen {
    use super::{HashOutput, Transcript, TranscriptWrite};
    use crate::algorithms::encryption::Ciphertext;
    use crate::algorithms::pedersen::PedersenParameters;
    use crate::algorithms::polynomial::ExponentPolynomial;
    use crate::algorithms::zkp::{modulus, prm, sch};
    use paillier::EncryptionKey;
    use serde::{Deserialize, Serialize};

    /// Enumerates messages used by key generation algorithm
    #[derive(Debug, Clone, Deserialize, Serialize, Display)]
    pub enum Message {
        Commitment(Commitment),
        Echo(HashOutput),
        Decommitment(Box<Decommitment>),
        Share(EncryptedShare),
        Proof(sch::Response),
    }

    // Conversion helpers : unwrap MessageType variant to one of its inner structs
    impl From<Message> for Option<Commitment> {
        fn from(m: Message) -> Option<Commitment> {
            match m {
                Message::Commitment(msg) => Some(msg),
                _ => None,
            }
        }
    }

    impl From<Message> for Option<Box<Decommitment>> {
        fn from(m: Message) -> Option<Box<Decommitment>> {
            match m {
                Message::Decommitment(msg) => Some(msg),
                _ => None,
            }
        }
    }

    impl From<Message> for Option<EncryptedShare> {
        fn from(m: Message) -> Option<EncryptedShare> {
            match m {
                Message::Share(msg) => Some(msg),
                _ => None,
            }
        }
    }

    impl From<Message> for Option<sch::Response> {
        fn from(m: Message) -> Option<sch::Response> {
            match m {
                Message::Proof(msg) => Some(msg),
                _ => None,
            }
        }
    }

    /// Hash commitment $`V_i`$ to the decommitment of the party
    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
    pub struct Commitment {
        pub v: HashOutput,
    }

    impl TranscriptWrite for Commitment {
        fn write_to(&self, transcript: &mut Transcript) {
            transcript.write_bytes(&self.v);
        }
    }

    /// Public data of the party opened after all commitments are agreed upon
    ///
    /// Contains:
    /// * share of the common randomness
    /// * commitment to the polynomial of the secret sharing
    /// * commitment of the Schnorr proof for the new secret share
    /// * Paillier key and Pedersen parameters with the proofs of their correctness
    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
    pub struct Decommitment {
        pub rid: HashOutput,
        pub vss: ExponentPolynomial,
        pub schnorr: sch::Commitment,
        pub paillier: EncryptionKey,
        pub pedersen: PedersenParameters,
        pub prm: prm::Proof,
        pub modulus: modulus::Proof,
        pub salt: HashOutput,
    }

    impl Decommitment {
        /// $`V_i`$, the hash of the decommitment in the transcript of its sender
        ///
        /// The proofs are bound to the same transcript, so that they are excluded.
        pub fn hash(&self, transcript: &Transcript) -> HashOutput {
            let mut t = transcript.clone();
            t.write_label("decommitment")
                .write_bytes(&self.rid)
                .write(&self.vss)
                .write_point(&self.schnorr.a)
                .write(&self.paillier)
                .write(&self.pedersen)
                .write_bytes(&self.salt);
            t.digest()
        }
    }

    /// The share $`f_i(x_j)`$ encrypted with the Paillier key of the recipient
    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
    pub struct EncryptedShare {
        pub share: Ciphertext,
    }
}

/// signing related message data types
pub mod sign {
    use super::{HashOutput, Transcript, TranscriptWrite};
    use crate::algorithms::encryption::Ciphertext;
    use crate::algorithms::zkp::{affg, enc, logstar};
    use curv::{FE, GE};
    use serde::{Deserialize, Serialize};

    /// Enumerates messages used by signing algorithm
    #[derive(Debug, Clone, Deserialize, Serialize, Display)]
    pub enum Message {
        Commitments(NonceMessage),
        Echo(HashOutput),
        MtA(Box<MtaMessage>),
        Delta(DeltaMessage),
        Share(SignatureShare),
    }

    impl From<Message> for Option<NonceMessage> {
        fn from(m: Message) -> Option<NonceMessage> {
            match m {
                Message::Commitments(msg) => Some(msg),
                _ => None,
            }
        }
    }

    impl From<Message> for Option<Box<MtaMessage>> {
        fn from(m: Message) -> Option<Box<MtaMessage>> {
            match m {
                Message::MtA(msg) => Some(msg),
                _ => None,
            }
        }
    }

    impl From<Message> for Option<DeltaMessage> {
        fn from(m: Message) -> Option<DeltaMessage> {
            match m {
                Message::Delta(msg) => Some(msg),
                _ => None,
            }
        }
    }

    impl From<Message> for Option<SignatureShare> {
        fn from(m: Message) -> Option<SignatureShare> {
            match m {
                Message::Share(msg) => Some(msg),
                _ => None,
            }
        }
    }

    /// $`K_i = Enc_i(k_i)`$ and $`G_i = Enc_i(\gamma_i)`$, the same for all recipients
    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
    pub struct NonceCommitments {
        pub k: Ciphertext,
        pub g: Ciphertext,
    }

    impl TranscriptWrite for NonceCommitments {
        fn write_to(&self, transcript: &mut Transcript) {
            transcript.write(&self.k).write(&self.g);
        }
    }

    /// Nonce commitments with the range proof of $`k_i`$ made for the recipient
    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
    pub struct NonceMessage {
        pub broadcast: NonceCommitments,
        pub proof: enc::Proof,
    }

    /// Both multiplicative-to-additive conversions with the recipient
    ///
    /// * `d`, `f` with `psi` convert $`\gamma_i k_j`$
    /// * `d_hat`, `f_hat` with `psi_hat` convert $`x_i k_j`$
    /// * `psi_prime` proves that $`\Gamma_i`$ is the exponent of the content of $`G_i`$
    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
    pub struct MtaMessage {
        pub gamma: GE,
        pub d: Ciphertext,
        pub f: Ciphertext,
        pub d_hat: Ciphertext,
        pub f_hat: Ciphertext,
        pub psi: affg::Proof,
        pub psi_hat: affg::Proof,
        pub psi_prime: logstar::Proof,
    }

    /// $`\delta_i`$ and $`\Delta_i = [k_i] \cdot \Gamma`$
    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
    pub struct DeltaMessage {
        pub delta: FE,
        pub big_delta: GE,
        pub proof: logstar::Proof,
    }

    /// $`\sigma_i = k_i m + r \chi_i`$
    #[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
    pub struct SignatureShare {
        pub sigma: FE,
    }
}
