//! Round based protocols
//!
//! A protocol is a closed sequence of rounds. Each round
//!  * validates incoming messages one by one with [`Round::verify_message`], which does not mutate the round
//!  * records validated messages with [`Round::store_message`]
//!  * once all parties have sent their message, consumes itself in [`Round::finalize`], producing outgoing messages and either the next round or the output of the protocol
//!
//! The rounds of a protocol are the variants of an enum generated by [`round_enum!`], so the driver dispatches with an exhaustive `match`.
//! [`RoundDriver`] adapts the current round to the [`State`] interface of the finite state machine, which deals with the transport.
//!
//! Messages are tagged with the number of the round which consumes them. A round which does not expect any input, typically the first one,
//! is finalized by the driver as soon as it becomes current.
//!
//! [`State`]: ../state_machine/trait.State.html
//! [`round_enum!`]: ../macro.round_enum.html

use crate::protocol::{InputMessage, OutputMessage, PartyIndex, ProtocolId, RoundMessage, RoundNumber};
use crate::state_machine::{State, StateMachineTraits, Transition};
use std::fmt::Debug;
use std::marker::PhantomData;
use std::time::Duration;
use thiserror::Error;

/// Generates the closed set of rounds of a protocol
///
/// ```ignore
/// round_enum! {
///     pub enum KeygenRound for Keygen {
///         Round1(Round1),
///         Round2(Broadcast<Round2>),
///     }
/// }
/// ```
/// expands to the enum, a `From` conversion for every variant and the implementation of [`Round`] which delegates to the variant.
macro_rules! round_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident for $protocol:ty { $($variant:ident($round:ty)),+ $(,)? }) => {
        $(#[$meta])*
        $vis enum $name {
            $($variant($round)),+
        }

        $(
            impl From<$round> for $name {
                fn from(round: $round) -> Self {
                    $name::$variant(round)
                }
            }
        )+

        impl $crate::round::Round<$protocol> for $name {
            fn number(&self) -> $crate::protocol::RoundNumber {
                match self {
                    $($name::$variant(r) => $crate::round::Round::<$protocol>::number(r)),+
                }
            }

            fn helper(&self) -> &$crate::round::Helper {
                match self {
                    $($name::$variant(r) => $crate::round::Round::<$protocol>::helper(r)),+
                }
            }

            fn expects_messages(&self) -> bool {
                match self {
                    $($name::$variant(r) => $crate::round::Round::<$protocol>::expects_messages(r)),+
                }
            }

            fn verify_message(
                &self,
                msg: &$crate::round::InMsg<<$protocol as $crate::round::Protocol>::Content>,
            ) -> Result<(), $crate::round::ProtocolError> {
                match self {
                    $($name::$variant(r) => $crate::round::Round::<$protocol>::verify_message(r, msg)),+
                }
            }

            fn store_message(
                &mut self,
                msg: $crate::round::InMsg<<$protocol as $crate::round::Protocol>::Content>,
            ) -> Result<(), $crate::round::ProtocolError> {
                match self {
                    $($name::$variant(r) => $crate::round::Round::<$protocol>::store_message(r, msg)),+
                }
            }

            fn finalize(
                self,
                out: &mut Vec<$crate::round::OutMsg<<$protocol as $crate::round::Protocol>::Content>>,
            ) -> Result<$crate::round::Outcome<$protocol>, $crate::round::ErrorState> {
                match self {
                    $($name::$variant(r) => $crate::round::Round::<$protocol>::finalize(r, out)),+
                }
            }
        }
    };
}

pub mod broadcast;
pub mod helper;
pub mod pool;
#[cfg(test)]
pub(crate) mod testing;

pub use helper::{Helper, Info, RoundConfig};

pub type InMsg<C> = InputMessage<RoundMessage<C>>;
pub type OutMsg<C> = OutputMessage<RoundMessage<C>>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("protocol cannot be started: {0}")]
    Setup(String),
    #[error("message of protocol {received} from {party}, expected {expected}")]
    WrongProtocol {
        expected: ProtocolId,
        received: ProtocolId,
        party: PartyIndex,
    },
    #[error("message for round {received} from {party} in round {expected}")]
    RoundMismatch {
        expected: RoundNumber,
        received: RoundNumber,
        party: PartyIndex,
    },
    #[error("unknown sender {party} in round {round}")]
    UnknownSender { party: PartyIndex, round: RoundNumber },
    #[error("duplicate message from {party} in round {round}")]
    DuplicateMessage { party: PartyIndex, round: RoundNumber },
    #[error("unexpected content {content} from {party} in round {round}")]
    UnexpectedContent {
        content: String,
        round: RoundNumber,
        party: PartyIndex,
    },
    #[error("invalid message from {party} in round {round}: {reason}")]
    InvalidMessage {
        round: RoundNumber,
        party: PartyIndex,
        reason: String,
    },
    #[error("{proof} proof from {party} failed in round {round}")]
    ProofFailed {
        proof: &'static str,
        round: RoundNumber,
        party: PartyIndex,
    },
    #[error("{party} reported a different view of the broadcast in round {round}")]
    Equivocation { round: RoundNumber, party: PartyIndex },
    #[error("consistency check failed in round {round}: {reason}")]
    Consistency { round: RoundNumber, reason: String },
    #[error("{proof} proof cannot be built in round {round}: {reason}")]
    Proving {
        proof: &'static str,
        round: RoundNumber,
        reason: &'static str,
    },
    #[error("timeout in round {round}")]
    Timeout { round: RoundNumber },
    #[error("cannot decrypt the message from {party} in round {round}")]
    Decryption { round: RoundNumber, party: PartyIndex },
}

/// The error outcome of a protocol: all errors found in the round which aborted
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorState {
    errors: Vec<ProtocolError>,
}

impl ErrorState {
    pub fn new(errors: Vec<ProtocolError>) -> Self {
        ErrorState { errors }
    }

    pub fn errors(&self) -> &[ProtocolError] {
        &self.errors
    }

    /// Unpacks the results if all of them are `Ok`, otherwise returns all errors
    pub fn collect<T>(results: Vec<Result<T, ProtocolError>>) -> Result<Vec<T>, ErrorState> {
        let (values, errors) = results.into_iter().fold(
            (Vec::new(), Vec::new()),
            |(mut values, mut errors), r| {
                match r {
                    Ok(v) => values.push(v),
                    Err(e) => errors.push(e),
                }
                (values, errors)
            },
        );
        if errors.is_empty() {
            Ok(values)
        } else {
            Err(ErrorState::new(errors))
        }
    }
}

impl From<ProtocolError> for ErrorState {
    fn from(e: ProtocolError) -> Self {
        ErrorState::new(vec![e])
    }
}

/// Binds the content of messages, the output and the rounds of a protocol
pub trait Protocol: Sized + 'static {
    type Content: Clone + Debug + Send + 'static;
    type Output: Send + 'static;
    type Round: Round<Self> + Send + 'static;
}

pub enum Outcome<P: Protocol> {
    Next(P::Round),
    Done(P::Output),
}

/// A single round of the protocol `P`
pub trait Round<P: Protocol> {
    fn number(&self) -> RoundNumber;

    fn helper(&self) -> &Helper;

    /// `false` for rounds which are finalized without waiting for input
    fn expects_messages(&self) -> bool {
        true
    }

    /// Validates the message against the state of the round. The envelope is checked by the driver beforehand.
    fn verify_message(&self, msg: &InMsg<P::Content>) -> Result<(), ProtocolError>;

    fn store_message(&mut self, msg: InMsg<P::Content>) -> Result<(), ProtocolError>;

    /// Consumes the round. Messages for the following rounds are appended to `out`.
    fn finalize(self, out: &mut Vec<OutMsg<P::Content>>) -> Result<Outcome<P>, ErrorState>;
}

/// Constructs the first round of a protocol
pub type StartFunc<P> = Box<
    dyn FnOnce() -> Result<(<P as Protocol>::Round, Info), ProtocolError> + Send,
>;

pub struct ProtocolTraits<P>(PhantomData<P>);

impl<P: Protocol> StateMachineTraits for ProtocolTraits<P> {
    type InMsg = InMsg<P::Content>;
    type OutMsg = OutMsg<P::Content>;
    type FinalState = P::Output;
    type ErrorState = ErrorState;
}

/// State object of the finite state machine which runs a single round of the protocol
pub struct RoundDriver<P: Protocol> {
    round: Option<P::Round>,
    pending: Vec<OutMsg<P::Content>>,
    timeout: Option<Duration>,
}

enum Advanced<P: Protocol> {
    Waiting(RoundDriver<P>),
    Done(P::Output),
}

/// Runs the start function and finalizes the rounds which do not expect input
///
/// Returns the state object for [`StateMachine`] together with the session info.
///
/// [`StateMachine`]: ../state_machine/sync_channels/struct.StateMachine.html
pub fn start<P: Protocol>(start: StartFunc<P>) -> Result<(RoundDriver<P>, Info), ErrorState> {
    let (round, info) = start()?;
    log::info!(
        "{} party {} starts, {} rounds",
        info.protocol,
        info.self_id,
        info.final_round
    );
    match RoundDriver::advance(round, Vec::new())? {
        Advanced::Waiting(driver) => Ok((driver, info)),
        Advanced::Done(_) => Err(ProtocolError::Setup(
            "protocol finished without receiving input".to_string(),
        )
        .into()),
    }
}

impl<P: Protocol> RoundDriver<P> {
    /// Number of the round waiting for input
    pub fn round_number(&self) -> Option<RoundNumber> {
        self.round.as_ref().map(|r| r.number())
    }

    /// Finalizes rounds until one of them expects messages or the protocol completes
    fn advance(
        mut round: P::Round,
        mut pending: Vec<OutMsg<P::Content>>,
    ) -> Result<Advanced<P>, ErrorState> {
        loop {
            if round.expects_messages() {
                log::info!(
                    "{} party {} enters round {}",
                    round.helper().protocol(),
                    round.helper().self_id(),
                    round.number()
                );
                let timeout = round.helper().timeout();
                return Ok(Advanced::Waiting(RoundDriver {
                    round: Some(round),
                    pending,
                    timeout,
                }));
            }
            match round.finalize(&mut pending)? {
                Outcome::Next(next) => round = next,
                Outcome::Done(output) => return Ok(Advanced::Done(output)),
            }
        }
    }

    /// Checks the envelope and lets the round validate the content
    pub fn verify(&self, msg: &InMsg<P::Content>) -> Result<(), ProtocolError> {
        match &self.round {
            Some(round) => {
                round.helper().check_envelope(msg, round.number())?;
                round.verify_message(msg)
            }
            None => Err(ProtocolError::Setup("round is already consumed".to_string())),
        }
    }

    fn consume_round(
        &mut self,
        current_msg_set: Vec<InMsg<P::Content>>,
    ) -> Result<Advanced<P>, ErrorState> {
        let mut round = self
            .round
            .take()
            .ok_or_else(|| ProtocolError::Setup("round is already consumed".to_string()))?;

        let admissions = current_msg_set
            .iter()
            .enumerate()
            .map(|(i, m)| admit::<P>(&round, m, &current_msg_set[..i]))
            .collect::<Vec<_>>();

        let mut errors = Vec::new();
        for (msg, admission) in current_msg_set.into_iter().zip(admissions) {
            let result = match admission {
                Admission::Accept => round
                    .verify_message(&msg)
                    .and_then(|_| round.store_message(msg)),
                Admission::Defer(e) | Admission::Reject(e) => Err(e),
            };
            if let Err(e) = result {
                errors.push(e);
            }
        }
        if !errors.is_empty() {
            return Err(ErrorState::new(errors));
        }

        let mut pending = Vec::new();
        match round.finalize(&mut pending)? {
            Outcome::Next(next) => Self::advance(next, pending),
            Outcome::Done(output) => Ok(Advanced::Done(output)),
        }
    }
}

/// What the driver does with an incoming message in the current round
enum Admission {
    Accept,
    /// the message belongs to a later round of the same protocol
    Defer(ProtocolError),
    Reject(ProtocolError),
}

fn admit<P: Protocol>(
    round: &P::Round,
    msg: &InMsg<P::Content>,
    received: &[InMsg<P::Content>],
) -> Admission {
    let number = round.number();
    match round.helper().check_envelope(msg, number) {
        Err(e @ ProtocolError::RoundMismatch { .. }) if msg.body.round > number => {
            Admission::Defer(e)
        }
        Err(e) => Admission::Reject(e),
        Ok(()) if received.iter().any(|m| m.sender == msg.sender) => {
            Admission::Reject(ProtocolError::DuplicateMessage {
                party: msg.sender,
                round: number,
            })
        }
        Ok(()) => Admission::Accept,
    }
}

impl<P: Protocol> State<ProtocolTraits<P>> for RoundDriver<P> {
    fn start(&mut self) -> Option<Vec<OutMsg<P::Content>>> {
        Some(self.pending.drain(..).collect())
    }

    fn is_message_expected(
        &self,
        msg: &InMsg<P::Content>,
        current_msg_set: &[InMsg<P::Content>],
    ) -> bool {
        let round = match &self.round {
            Some(round) => round,
            None => return false,
        };
        match admit::<P>(round, msg, current_msg_set) {
            Admission::Accept => true,
            Admission::Defer(e) => {
                log::debug!("deferred: {}", e);
                false
            }
            // retained, so that the round fails with the error
            Admission::Reject(e) => {
                log::warn!("rejected: {}", e);
                true
            }
        }
    }

    fn is_input_complete(&self, current_msg_set: &[InMsg<P::Content>]) -> bool {
        let round = match &self.round {
            Some(round) => round,
            None => return false,
        };
        let rejected = current_msg_set.iter().enumerate().any(|(i, m)| {
            matches!(
                admit::<P>(round, m, &current_msg_set[..i]),
                Admission::Reject(_)
            )
        });
        rejected
            || round
                .helper()
                .others()
                .iter()
                .all(|p| current_msg_set.iter().any(|m| m.sender == *p))
    }

    fn consume(&mut self, current_msg_set: Vec<InMsg<P::Content>>) -> Transition<ProtocolTraits<P>> {
        let number = self.round_number().unwrap_or_default();
        match self.consume_round(current_msg_set) {
            Ok(Advanced::Waiting(driver)) => Transition::NewState(Box::new(driver)),
            Ok(Advanced::Done(output)) => {
                log::info!("protocol completed in round {}", number);
                Transition::FinalState(Ok(output))
            }
            Err(error_state) => {
                log::error!("round {} returns {:?}", number, error_state);
                Transition::FinalState(Err(error_state))
            }
        }
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn timeout_outcome(
        &self,
        _current_msg_set: Vec<InMsg<P::Content>>,
    ) -> Result<P::Output, ErrorState> {
        Err(ErrorState::new(vec![ProtocolError::Timeout {
            round: self.round_number().unwrap_or_default(),
        }]))
    }
}
