//! Test support: a toy protocol with an echo broadcast and a router which runs parties in threads

use crate::algorithms::transcript::{HashOutput, Transcript, TranscriptWrite};
use crate::protocol::{Address, InputMessage, PartyIndex, ProtocolId, RoundMessage, RoundNumber};
use crate::round::broadcast::{Broadcast, EchoProtocol, Echo};
use crate::round::{
    start, ErrorState, Helper, InMsg, OutMsg, Outcome, Protocol, ProtocolError, ProtocolTraits,
    Round, RoundConfig, StartFunc,
};
use crate::state_machine::sync_channels::StateMachine;
use crossbeam_channel::unbounded;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Modifies the message sent from the first party to the second one
pub(crate) type Tamper<C> =
    Arc<dyn Fn(&PartyIndex, &PartyIndex, &mut RoundMessage<C>) + Send + Sync>;

/// Runs the parties until all of them terminate, routing their messages through a forwarder thread per party
pub(crate) fn run_parties<P: Protocol>(
    starts: Vec<(PartyIndex, StartFunc<P>)>,
    tamper: Option<Tamper<P::Content>>,
) -> BTreeMap<PartyIndex, Option<Result<P::Output, ErrorState>>> {
    let mut ingress = BTreeMap::new();
    let mut egresses = Vec::new();
    let mut handles = Vec::new();

    for (party, start_func) in starts {
        let (in_tx, in_rx) = unbounded::<InMsg<P::Content>>();
        let (out_tx, out_rx) = unbounded::<OutMsg<P::Content>>();
        ingress.insert(party, in_tx);
        egresses.push((party, out_rx));
        let handle = thread::spawn(move || {
            let (driver, info) = match start(start_func) {
                Ok(started) => started,
                Err(e) => return Some(Err(e)),
            };
            log::info!("party {} runs {}", info.self_id, info.protocol);
            let mut machine =
                StateMachine::<ProtocolTraits<P>>::new(Box::new(driver), &in_rx, &out_tx);
            machine.execute()
        });
        handles.push((party, handle));
    }

    for (source, egress) in egresses {
        let ingress = ingress.clone();
        let tamper = tamper.clone();
        thread::spawn(move || {
            for msg in egress.iter() {
                let recipients = match &msg.recipient {
                    Address::Broadcast => ingress
                        .keys()
                        .filter(|p| **p != source)
                        .cloned()
                        .collect::<Vec<_>>(),
                    Address::Peer(p) => vec![*p],
                };
                for to in recipients {
                    let mut body = msg.body.clone();
                    if let Some(tamper) = &tamper {
                        tamper(&source, &to, &mut body);
                    }
                    if let Some(tx) = ingress.get(&to) {
                        // the recipient may have terminated already
                        let _ = tx.send(InputMessage {
                            sender: source,
                            body,
                        });
                    }
                }
            }
        });
    }

    handles
        .into_iter()
        .map(|(party, handle)| (party, handle.join().unwrap_or(None)))
        .collect()
}

pub(crate) struct Toy;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Value(pub u64);

impl TranscriptWrite for Value {
    fn write_to(&self, transcript: &mut Transcript) {
        transcript.write_u64(self.0);
    }
}

#[derive(Debug, Clone)]
pub(crate) enum ToyContent {
    Value(Value),
    Echo(HashOutput),
}

impl Protocol for Toy {
    type Content = ToyContent;
    type Output = BTreeMap<PartyIndex, u64>;
    type Round = ToyRound;
}

impl EchoProtocol for Toy {
    fn broadcast_part(content: &ToyContent) -> Option<&dyn TranscriptWrite> {
        match content {
            ToyContent::Value(v) => Some(v as &dyn TranscriptWrite),
            ToyContent::Echo(_) => None,
        }
    }

    fn echo(digest: HashOutput) -> ToyContent {
        ToyContent::Echo(digest)
    }

    fn as_echo(content: &ToyContent) -> Option<&HashOutput> {
        match content {
            ToyContent::Echo(digest) => Some(digest),
            ToyContent::Value(_) => None,
        }
    }
}

round_enum! {
    pub(crate) enum ToyRound for Toy {
        Announce(Announce),
        Collect(Broadcast<Collect>),
        Compare(Echo<Collect>),
    }
}

/// Broadcasts the value of the party
pub(crate) struct Announce {
    helper: Helper,
    value: u64,
}

fn unexpected(msg: &InMsg<ToyContent>, round: RoundNumber) -> ProtocolError {
    ProtocolError::UnexpectedContent {
        content: format!("{:?}", msg.body.content),
        round,
        party: msg.sender,
    }
}

impl Round<Toy> for Announce {
    fn number(&self) -> RoundNumber {
        1
    }

    fn helper(&self) -> &Helper {
        &self.helper
    }

    fn expects_messages(&self) -> bool {
        false
    }

    fn verify_message(&self, msg: &InMsg<ToyContent>) -> Result<(), ProtocolError> {
        Err(unexpected(msg, 1))
    }

    fn store_message(&mut self, msg: InMsg<ToyContent>) -> Result<(), ProtocolError> {
        Err(unexpected(&msg, 1))
    }

    fn finalize(self, out: &mut Vec<OutMsg<ToyContent>>) -> Result<Outcome<Toy>, ErrorState> {
        let value = Value(self.value);
        self.helper
            .broadcast(out, 2, ToyContent::Value(value));
        let mut values = BTreeMap::new();
        values.insert(self.helper.self_id(), self.value);
        let next = Collect {
            helper: self.helper,
            values,
        };
        Ok(Outcome::Next(Broadcast::new::<Toy>(next, &value).into()))
    }
}

/// Collects the values of all parties
pub(crate) struct Collect {
    helper: Helper,
    values: BTreeMap<PartyIndex, u64>,
}

impl Round<Toy> for Collect {
    fn number(&self) -> RoundNumber {
        2
    }

    fn helper(&self) -> &Helper {
        &self.helper
    }

    fn verify_message(&self, msg: &InMsg<ToyContent>) -> Result<(), ProtocolError> {
        match msg.body.content {
            ToyContent::Value(_) => Ok(()),
            ToyContent::Echo(_) => Err(unexpected(msg, 2)),
        }
    }

    fn store_message(&mut self, msg: InMsg<ToyContent>) -> Result<(), ProtocolError> {
        match msg.body.content {
            ToyContent::Value(v) => {
                self.values.insert(msg.sender, v.0);
                Ok(())
            }
            ToyContent::Echo(_) => Err(unexpected(&msg, 2)),
        }
    }

    fn finalize(self, _out: &mut Vec<OutMsg<ToyContent>>) -> Result<Outcome<Toy>, ErrorState> {
        Ok(Outcome::Done(self.values))
    }
}

/// Toy party `index` of `1..=count`
pub(crate) fn toy_start(index: usize, count: usize, value: u64) -> StartFunc<Toy> {
    Box::new(move || {
        let parties = (1..=count).map(PartyIndex::from).collect::<Vec<_>>();
        let config = RoundConfig {
            timeout: Some(Duration::from_secs(30)),
            workers: 2,
        };
        let helper = Helper::new(
            ProtocolId::Keygen,
            3,
            PartyIndex::from(index),
            &parties,
            1,
            &config,
        )?;
        let info = helper.info();
        Ok((Announce { helper, value }.into(), info))
    })
}
