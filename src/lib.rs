//! The crate contains the implementation of a multiparty threshold signature scheme
//! of the CMP family, ["UC Non-Interactive, Proactive, Threshold ECDSA with Identifiable Aborts"](https://eprint.iacr.org/2021/060.pdf)
//! by Ran Canetti, Rosario Gennaro, Steven Goldfeder, Nikolaos Makriyannis and Udi Peled.
//!
//! The scheme comprises
//!  * key generation performed in the distributed setup with `N` players
//!  * key refresh, which renews the shares of the same key
//!  * message signing carried out by subgroup of `(t+1, N)` players
//! The scheme is based on ECDSA standard with the elliptic curve secp256k1.
//!
//! Protocols are sequences of rounds run by the engine of [`round`](./round/index.html) module,
//! which emulates broadcast over point-to-point channels with echo rounds and computes per party proofs in parallel.
//! Cryptographic protocols are implemented by [`ecdsa`](./ecdsa/index.html) module.
//! Zero knowledge proofs and other algorithms can be found in [`algorithms`](./algorithms/index.html) module.
//! The general purpose state machine is implemented in [`state_machine`](./state_machine/index.html) module.
#![allow(
    clippy::must_use_candidate,
    clippy::items_after_statements,
    clippy::module_name_repetitions,
    clippy::unseparated_literal_suffix,
    //
    clippy::missing_errors_doc, // remove at some point
    clippy::used_underscore_binding // if turned on, seems to generate a lot of false positive
)]
pub mod protocol;
pub mod state_machine;
#[macro_use]
pub mod round;
pub mod algorithms;
pub mod ecdsa;

#[macro_use]
extern crate strum_macros;

pub use ecdsa::{Parameters, Signature};
pub use round::{ErrorState, ProtocolError, RoundConfig};
