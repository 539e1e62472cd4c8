//! Session context shared by all rounds of a protocol

use crate::algorithms::transcript::Transcript;
use crate::protocol::{
    Address, OutputMessage, PartyIndex, PartyList, ProtocolId, RoundMessage, RoundNumber,
};
use crate::round::pool::Pool;
use crate::round::{ErrorState, InMsg, OutMsg, ProtocolError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Domain separator of all transcripts of the crate
const DOMAIN: &[u8] = b"cmp-ecdsa";

/// Execution settings of a protocol instance
#[derive(Debug, Clone, PartialEq)]
pub struct RoundConfig {
    /// maximum time to wait for the messages of a single round
    pub timeout: Option<Duration>,
    /// number of threads computing per party tasks
    pub workers: usize,
}

impl Default for RoundConfig {
    fn default() -> Self {
        RoundConfig {
            timeout: None,
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// Public description of a protocol instance, e.g. for the setup of the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub protocol: ProtocolId,
    pub final_round: RoundNumber,
    pub self_id: PartyIndex,
    pub party_ids: Vec<PartyIndex>,
}

/// Read-mostly context embedded into every round
///
/// The transcript is seeded with the protocol id, the number of rounds, the sorted list of parties and the threshold,
/// so that challenges of different sessions never coincide. Further session data is absorbed before the first round.
#[derive(Clone)]
pub struct Helper {
    protocol: ProtocolId,
    final_round: RoundNumber,
    self_id: PartyIndex,
    parties: PartyList,
    others: Vec<PartyIndex>,
    threshold: usize,
    transcript: Transcript,
    pool: Pool,
    timeout: Option<Duration>,
}

impl Helper {
    pub fn new(
        protocol: ProtocolId,
        final_round: RoundNumber,
        self_id: PartyIndex,
        party_ids: &[PartyIndex],
        threshold: usize,
        config: &RoundConfig,
    ) -> Result<Self, ProtocolError> {
        let parties = PartyList::new(party_ids)?;
        if parties.len() < 2 {
            return Err(ProtocolError::Setup(format!(
                "at least two parties are required, {} given",
                parties.len()
            )));
        }
        if !parties.contains(&self_id) {
            return Err(ProtocolError::Setup(format!(
                "party {} is not in the list of parties",
                self_id
            )));
        }
        if threshold >= parties.len() {
            return Err(ProtocolError::Setup(format!(
                "threshold {} requires more than {} parties",
                threshold,
                parties.len()
            )));
        }

        let mut transcript = Transcript::new(DOMAIN);
        transcript
            .write_label(protocol.as_str())
            .write_u64(u64::from(final_round))
            .write(parties.as_slice())
            .write_u64(threshold as u64);

        let others = parties.others(&self_id);
        Ok(Helper {
            protocol,
            final_round,
            self_id,
            parties,
            others,
            threshold,
            transcript,
            pool: Pool::new(config.workers),
            timeout: config.timeout,
        })
    }

    /// Extends the session transcript with session specific data
    pub fn absorb<F: FnOnce(&mut Transcript)>(&mut self, f: F) {
        f(&mut self.transcript)
    }

    pub fn protocol(&self) -> ProtocolId {
        self.protocol
    }

    pub fn final_round(&self) -> RoundNumber {
        self.final_round
    }

    pub fn self_id(&self) -> PartyIndex {
        self.self_id
    }

    pub fn parties(&self) -> &PartyList {
        &self.parties
    }

    /// all parties except self, sorted
    pub fn others(&self) -> &[PartyIndex] {
        &self.others
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Copy of the session transcript
    pub fn hash(&self) -> Transcript {
        self.transcript.clone()
    }

    /// Copy of the session transcript bound to the party `id`, used for the proofs created by this party
    pub fn hash_for_id(&self, id: &PartyIndex) -> Transcript {
        let mut t = self.transcript.clone();
        t.write_label("party").write_party(id);
        t
    }

    pub fn info(&self) -> Info {
        Info {
            protocol: self.protocol,
            final_round: self.final_round,
            self_id: self.self_id,
            party_ids: self.parties.as_slice().to_vec(),
        }
    }

    pub fn message<C>(&self, round: RoundNumber, content: C) -> RoundMessage<C> {
        RoundMessage {
            protocol: self.protocol,
            round,
            content,
        }
    }

    /// Appends the message for all other parties
    pub fn broadcast<C>(&self, out: &mut Vec<OutMsg<C>>, round: RoundNumber, content: C) {
        out.push(OutputMessage {
            recipient: Address::Broadcast,
            body: self.message(round, content),
        });
    }

    pub fn send<C>(&self, out: &mut Vec<OutMsg<C>>, round: RoundNumber, to: PartyIndex, content: C) {
        out.push(OutputMessage {
            recipient: Address::Peer(to),
            body: self.message(round, content),
        });
    }

    /// Checks protocol, round and sender of the message
    pub fn check_envelope<C>(&self, msg: &InMsg<C>, round: RoundNumber) -> Result<(), ProtocolError> {
        if msg.body.protocol != self.protocol {
            return Err(ProtocolError::WrongProtocol {
                expected: self.protocol,
                received: msg.body.protocol,
                party: msg.sender,
            });
        }
        if msg.body.round != round {
            return Err(ProtocolError::RoundMismatch {
                expected: round,
                received: msg.body.round,
                party: msg.sender,
            });
        }
        if !self.others.contains(&msg.sender) {
            return Err(ProtocolError::UnknownSender {
                party: msg.sender,
                round,
            });
        }
        Ok(())
    }

    /// Runs `task` for every other party on the pool and collects the results by party
    pub fn map_others<T, F>(&self, task: F) -> Result<BTreeMap<PartyIndex, T>, ErrorState>
    where
        T: Send,
        F: Fn(&PartyIndex) -> Result<T, ProtocolError> + Sync,
    {
        let others = &self.others;
        let results = self
            .pool
            .parallelize(others.len(), |i| task(&others[i]));
        let values = ErrorState::collect(results)?;
        Ok(others.iter().cloned().zip(values.into_iter()).collect())
    }
}
