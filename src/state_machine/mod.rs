//!  Finite state machine
//!
//!  Finite state machine which executes a round based protocol as a sequence of states.
//!  Each state has to be mapped to a state object, which implements trait [`State`].
//!  For the protocols of this crate the only state object is [`RoundDriver`], which wraps the current round of a protocol.
//!  The machine sends/receives output/input to/from a networking layer, which is not included in this library. Instead, the machine gets two channels at the start to receive and to send messages respectively.
//!
//! At the high level the machine performs following steps for each state:
//!  * it sends the output produced by the previous state to a network
//!  * it receives and collects input until the state indicates that all messages for the current round are received
//!  * the machine lets the state consume the collected input. Messages the state does not accept, e.g. those of a later round, are deferred into the discarded deck.
//!  * the result of consumption is either the new state object or the final outcome. The former substitutes current state object in the machine, while the latter causes the machine to terminate.
//!  * if the discarded deck is not empty and the machine continues, it processes messages from this deck first with the new state object.
//!
//! # Async model and futures
//!
//! The module contains two implementations of the state machine, one which deals with async queues and another, which uses synchronous queues from `crossbeam_channel` crate. All remaining properties of these machines are identical.
//!
//! # Timeouts
//!
//! The `timeout` method of a state object may return `Some` duration. The machine then stops if the state does not receive its complete input within this duration
//! and returns the value provided by `timeout_outcome` method of the current state object.
//!
//! [`State`]: trait.State.html
//! [`RoundDriver`]: ../round/struct.RoundDriver.html
//!
pub mod async_channels;
pub mod sync_channels;

use std::fmt::{Debug, Error, Formatter};
use std::time::Duration;

pub trait StateMachineTraits {
    type InMsg;
    type OutMsg;
    type FinalState;
    type ErrorState;
}

#[derive(Debug)]
pub enum Transition<T>
where
    T: StateMachineTraits,
{
    NewState(BoxedState<T>),
    FinalState(Result<T::FinalState, T::ErrorState>),
}

// State has to be `Send` to be used with asynchronous channels,
// because it will be sent between threads in tokio pool.
pub type BoxedState<T> = Box<dyn State<T> + Send>;

impl<T> Debug for BoxedState<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "BoxedState")
    }
}

///   State interface
///
/// `consume` is called at most once per state object and may move data out of it.
pub trait State<T>
where
    T: StateMachineTraits,
{
    fn start(&mut self) -> Option<Vec<T::OutMsg>>;
    fn is_message_expected(&self, msg: &T::InMsg, current_msg_set: &[T::InMsg]) -> bool;
    fn is_input_complete(&self, current_msg_set: &[T::InMsg]) -> bool;
    fn consume(&mut self, current_msg_set: Vec<T::InMsg>) -> Transition<T>;

    fn timeout(&self) -> Option<Duration> {
        None
    }
    fn timeout_outcome(
        &self,
        current_msg_set: Vec<T::InMsg>,
    ) -> Result<T::FinalState, T::ErrorState>;
}
