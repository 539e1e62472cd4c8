//! Broadcast over point-to-point channels
//!
//! A sender may send different values to different parties while claiming a broadcast. To detect this,
//! [`Broadcast`] wraps a round which receives broadcast content and records a digest of the broadcast part of every message.
//! Instead of finalizing the wrapped round, it sends the digest of all received parts, its own included, to every other party
//! and turns into [`Echo`], which occupies the next round number. The echo round compares the digests of all parties
//! and finalizes the wrapped round only if all of them are equal.
//!
//! A mismatch aborts the protocol with [`ProtocolError::Equivocation`]. The check does not reveal which party equivocated.
//!
//! [`ProtocolError::Equivocation`]: ../enum.ProtocolError.html#variant.Equivocation

use crate::algorithms::transcript::{HashOutput, Transcript, TranscriptWrite};
use crate::protocol::{PartyIndex, RoundNumber};
use crate::round::{ErrorState, Helper, InMsg, OutMsg, Outcome, Protocol, ProtocolError, Round};
use std::collections::BTreeMap;

/// Protocol which carries echo messages in its content
pub trait EchoProtocol: Protocol {
    /// The part of the content which has to be the same for all recipients, if the content is a broadcast
    fn broadcast_part(content: &Self::Content) -> Option<&dyn TranscriptWrite>;

    fn echo(digest: HashOutput) -> Self::Content;

    fn as_echo(content: &Self::Content) -> Option<&HashOutput>;
}

fn digest_of_part(
    helper: &Helper,
    round: RoundNumber,
    sender: &PartyIndex,
    part: &dyn TranscriptWrite,
) -> HashOutput {
    let mut t: Transcript = helper.hash();
    t.write_label("broadcast")
        .write_u64(u64::from(round))
        .write_party(sender);
    part.write_to(&mut t);
    t.digest()
}

/// Round which receives broadcast content
pub struct Broadcast<R> {
    inner: R,
    received: BTreeMap<PartyIndex, HashOutput>,
}

impl<R> Broadcast<R> {
    /// Wraps `inner`; `own` is the part this party has broadcast to the others in the same round
    pub fn new<P>(inner: R, own: &dyn TranscriptWrite) -> Self
    where
        P: EchoProtocol,
        R: Round<P>,
    {
        let helper = inner.helper();
        let digest = digest_of_part(helper, inner.number(), &helper.self_id(), own);
        let mut received = BTreeMap::new();
        received.insert(helper.self_id(), digest);
        Broadcast { inner, received }
    }
}

impl<P, R> Round<P> for Broadcast<R>
where
    P: EchoProtocol,
    R: Round<P>,
    P::Round: From<Echo<R>>,
{
    fn number(&self) -> RoundNumber {
        self.inner.number()
    }

    fn helper(&self) -> &Helper {
        self.inner.helper()
    }

    fn verify_message(&self, msg: &InMsg<P::Content>) -> Result<(), ProtocolError> {
        if P::broadcast_part(&msg.body.content).is_none() {
            return Err(ProtocolError::UnexpectedContent {
                content: format!("{:?}", msg.body.content),
                round: self.number(),
                party: msg.sender,
            });
        }
        self.inner.verify_message(msg)
    }

    fn store_message(&mut self, msg: InMsg<P::Content>) -> Result<(), ProtocolError> {
        let round = self.number();
        let part = P::broadcast_part(&msg.body.content).ok_or_else(|| {
            ProtocolError::UnexpectedContent {
                content: format!("{:?}", msg.body.content),
                round,
                party: msg.sender,
            }
        })?;
        let digest = digest_of_part(self.inner.helper(), round, &msg.sender, part);
        if self.received.insert(msg.sender, digest).is_some() {
            return Err(ProtocolError::DuplicateMessage {
                party: msg.sender,
                round,
            });
        }
        self.inner.store_message(msg)
    }

    fn finalize(self, out: &mut Vec<OutMsg<P::Content>>) -> Result<Outcome<P>, ErrorState> {
        let number = self.inner.number();
        let helper = self.inner.helper();
        let mut t = helper.hash();
        t.write_label("echo").write_u64(u64::from(number));
        for (party, digest) in &self.received {
            t.write_party(party).write_bytes(digest);
        }
        let digest = t.digest();
        helper.broadcast(out, number + 1, P::echo(digest));
        log::debug!(
            "party {} echoes {} in round {}",
            helper.self_id(),
            hex::encode(&digest),
            number
        );

        Ok(Outcome::Next(
            Echo {
                inner: self.inner,
                digest,
            }
            .into(),
        ))
    }
}

/// Round which compares the views of the broadcast of the previous round
pub struct Echo<R> {
    inner: R,
    digest: HashOutput,
}

impl<P, R> Round<P> for Echo<R>
where
    P: EchoProtocol,
    R: Round<P>,
{
    fn number(&self) -> RoundNumber {
        self.inner.number() + 1
    }

    fn helper(&self) -> &Helper {
        self.inner.helper()
    }

    fn verify_message(&self, msg: &InMsg<P::Content>) -> Result<(), ProtocolError> {
        match P::as_echo(&msg.body.content) {
            Some(digest) if *digest == self.digest => Ok(()),
            Some(_) => Err(ProtocolError::Equivocation {
                round: self.number(),
                party: msg.sender,
            }),
            None => Err(ProtocolError::UnexpectedContent {
                content: format!("{:?}", msg.body.content),
                round: self.number(),
                party: msg.sender,
            }),
        }
    }

    fn store_message(&mut self, _msg: InMsg<P::Content>) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn finalize(self, out: &mut Vec<OutMsg<P::Content>>) -> Result<Outcome<P>, ErrorState> {
        self.inner.finalize(out)
    }
}

#[cfg(test)]
mod tests {
    use crate::protocol::{PartyIndex, RoundMessage};
    use crate::round::testing::{run_parties, toy_start, ToyContent, Value};
    use crate::round::ProtocolError;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    #[test]
    fn consistent_broadcast() {
        let _ = env_logger::builder().is_test(true).try_init();
        let starts = (1..=3)
            .map(|i| (PartyIndex::from(i), toy_start(i, 3, 100 + i as u64)))
            .collect();
        let results = run_parties(starts, None);

        let expected = (1..=3)
            .map(|i| (PartyIndex::from(i), 100 + i as u64))
            .collect::<BTreeMap<_, _>>();
        for (party, result) in results {
            match result {
                Some(Ok(values)) => assert_eq!(values, expected, "party {}", party),
                other => panic!("party {} failed: {:?}", party, other.map(|r| r.err())),
            }
        }
    }

    #[test]
    fn equivocation_is_detected() {
        let _ = env_logger::builder().is_test(true).try_init();
        let starts = (1..=3)
            .map(|i| (PartyIndex::from(i), toy_start(i, 3, 100 + i as u64)))
            .collect();
        // party 1 sends another value to party 3
        let tamper = Arc::new(
            |from: &PartyIndex, to: &PartyIndex, body: &mut RoundMessage<ToyContent>| {
                if *from == PartyIndex::from(1) && *to == PartyIndex::from(3) {
                    if let ToyContent::Value(v) = &mut body.content {
                        *v = Value(v.0 + 1);
                    }
                }
            },
        );
        let results = run_parties(starts, Some(tamper));

        for party in &[PartyIndex::from(2), PartyIndex::from(3)] {
            let errors = match &results[party] {
                Some(Err(e)) => e.errors().to_vec(),
                other => panic!(
                    "party {} must abort, got {:?}",
                    party,
                    other.as_ref().map(|r| r.is_ok())
                ),
            };
            assert!(!errors.is_empty());
            assert!(errors
                .iter()
                .all(|e| matches!(e, ProtocolError::Equivocation { round: 3, .. })));
        }
    }
}
