//!  Finite state machine
//!
//!  Finite state machine which executes a protocol as a sequence of states.
//!  Unlike its async version, this machine uses receiver and sender queue types from crate `crossbeam_channel`
//!  See details in similar [`Async state machine`]
//!
//! [`Async state machine`]: ../async_channels/index.html
//!
use crate::state_machine::{BoxedState, StateMachineTraits, Transition};
use crossbeam_channel::{after, Receiver, Sender};
use std::collections::VecDeque;
use std::time::Instant;

/// Finite state machine
///
/// See [`async_channels::StateMachine`](../async_channels/struct.StateMachine.html)
pub struct StateMachine<'a, T>
where
    T: StateMachineTraits,
{
    state: BoxedState<T>,
    inqueue: &'a Receiver<T::InMsg>,
    outqueue: &'a Sender<T::OutMsg>,
    timeout: Option<Receiver<Instant>>,
    retained: Vec<T::InMsg>,
    deferred: DeferredDeck<T::InMsg>,
}

/// container for messages which arrived ahead of their state
///
/// See [`async_channels::DeferredDeck`](../async_channels/struct.DeferredDeck.html)
struct DeferredDeck<T> {
    current: VecDeque<T>,
    next_state: VecDeque<T>,
}

impl<T> DeferredDeck<T> {
    fn new() -> Self {
        Self {
            current: VecDeque::new(),
            next_state: VecDeque::new(),
        }
    }
    fn save(&mut self, m: T) {
        self.next_state.push_back(m);
    }
    fn pop(&mut self) -> Option<T> {
        self.current.pop_front()
    }
    /// makes messages deferred by the previous state available to the current one
    fn flip(&mut self) {
        self.current.extend(self.next_state.drain(..));
    }
}

impl<'a, T: StateMachineTraits> StateMachine<'a, T> {
    pub fn new(
        start_state: BoxedState<T>,
        inqueue: &'a Receiver<T::InMsg>,
        outqueue: &'a Sender<T::OutMsg>,
    ) -> Self {
        StateMachine {
            state: start_state,
            inqueue,
            outqueue,
            timeout: None,
            retained: Vec::new(),
            deferred: DeferredDeck::new(),
        }
    }

    /// Runs the machine until the final state, a timeout, or the closure of the input channel
    pub fn execute(&mut self) -> Option<Result<T::FinalState, T::ErrorState>> {
        log::trace!("starting State Machine");

        self.state_prepare();

        loop {
            let transition = match self.deferred.pop() {
                Some(m) => self.process_message(m),
                None => match self.timeout.as_ref() {
                    Some(timeout_receiver) => crossbeam_channel::select! {
                        recv(self.inqueue) -> result => match result {
                            Ok(m) => self.process_message(m),
                            Err(e) => {
                                log::error!("SM with timeout: receive error {:?}", e);
                                return None;
                            }
                        },
                        recv(timeout_receiver) -> _ => return Some(self.state.timeout_outcome(self.retained.drain(..).collect()))
                    },
                    None => match self.inqueue.recv() {
                        Ok(m) => self.process_message(m),
                        Err(e) => {
                            log::error!("SM with no timeout: receive error {:?}", e);
                            // the channel is closed for good
                            return None;
                        }
                    },
                },
            };
            match transition {
                Some(Transition::NewState(state)) => {
                    self.state = state;
                    self.state_prepare();
                    self.deferred.flip();
                }
                Some(Transition::FinalState(outcome)) => return Some(outcome),
                None => {}
            }
        }
    }

    fn process_message(&mut self, message: T::InMsg) -> Option<Transition<T>> {
        if !self.state.is_message_expected(&message, &self.retained) {
            self.deferred.save(message);
            return None;
        }
        self.retained.push(message);

        if self.state.is_input_complete(&self.retained) {
            let input = self.retained.drain(..).collect();
            Some(self.state.consume(input))
        } else {
            None
        }
    }

    fn state_prepare(&mut self) {
        self.timeout = self.state.timeout().map(after);
        if let Some(output) = self.state.start() {
            for m in output {
                if let Err(err) = self.outqueue.send(m) {
                    log::error!("State machine cannot send out message: {:?}", err);
                }
            }
        }
    }
}
