//! Finite state machine
//!
//! Finite state machine which executes a protocol as a sequence of states.
//!
//! This version of the machine utilizes async/await model of RUST. The input and output queue types are from [`futures::channel::mpsc`]

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender};
use futures::{SinkExt, StreamExt};
use tokio::time;

use crate::protocol::Instruction;
use crate::state_machine::{BoxedState, StateMachineTraits, Transition};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Finite state machine
///
///  The machine is parameterized by [`StateMachineTraits`] which define
///  * the type of machine input
///  * the type of machine output
///  * the types of the final state and of the error state
///
/// The input queue carries [`Instruction`] so that the owner of the machine can terminate it.
///
/// [`StateMachineTraits`]: ../trait.StateMachineTraits.html
/// [`Instruction`]: ../../protocol/enum.Instruction.html
pub struct StateMachine<T>
where
    T: StateMachineTraits,
{
    state: BoxedState<T>,
    inqueue: UnboundedReceiver<Instruction<T::InMsg>>,
    outqueue: UnboundedSender<T::OutMsg>,
    deadline: Option<Instant>,
    retained: Vec<T::InMsg>,
    deferred: DeferredDeck<T::InMsg>,
}

/// container for deferred messages
///
/// Parties of a protocol do not progress through rounds with the same pace, so that messages of a faster party may arrive
/// before the local state is ready for them. The machine collects all messages rejected by the current state object into this container.
/// The contents of the container becomes available for the *next* state object as priority input.
///
/// To prevent a state from checking already deferred messages more than once, the container has two decks, one for the input of the current state object and another for collecting deferred messages.
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
    fn flip(&mut self) {
        self.current.extend(self.next_state.drain(..));
    }
}

/// Outcome of waiting for the next input
enum Received<M> {
    Message(M),
    Stop,
    TimedOut,
}

impl<T> StateMachine<T>
where
    T: StateMachineTraits,
{
    /// Create and initialize new machine
    pub fn new(
        start_state: BoxedState<T>,
        inqueue: UnboundedReceiver<Instruction<T::InMsg>>,
        outqueue: UnboundedSender<T::OutMsg>,
    ) -> Self {
        StateMachine {
            state: start_state,
            inqueue,
            outqueue,
            deadline: None,
            retained: Vec::new(),
            deferred: DeferredDeck::new(),
        }
    }

    /// Execute main loop of the machine.
    ///
    /// Returns `None` if the machine was terminated or its input stream was closed.
    pub async fn execute(&mut self) -> Option<Result<T::FinalState, T::ErrorState>> {
        log::trace!("starting State Machine");

        self.state_post_transition().await;

        loop {
            let message = match self.deferred.pop() {
                Some(m) => m,
                None => match self.receive().await {
                    Received::Message(m) => m,
                    Received::Stop => return None,
                    Received::TimedOut => {
                        return Some(
                            self.state
                                .timeout_outcome(self.retained.drain(..).collect()),
                        )
                    }
                },
            };

            match self.process_message(message) {
                Some(Transition::NewState(state)) => {
                    self.state = state;
                    self.state_post_transition().await;
                    self.deferred.flip();
                }
                Some(Transition::FinalState(outcome)) => return Some(outcome),
                None => {}
            }
        }
    }

    /// Waits for the next message, honouring the deadline of the current state
    async fn receive(&mut self) -> Received<T::InMsg> {
        let next = match self.deadline {
            Some(deadline) => {
                let remaining = deadline
                    .checked_duration_since(Instant::now())
                    .unwrap_or_else(|| Duration::from_secs(0));
                match time::timeout(remaining, self.inqueue.next()).await {
                    Ok(next) => next,
                    Err(_) => return Received::TimedOut,
                }
            }
            None => self.inqueue.next().await,
        };
        match next {
            Some(Instruction::Data(m)) => Received::Message(m),
            Some(Instruction::Terminate) => {
                log::debug!("State machine: termination requested");
                Received::Stop
            }
            None => {
                log::error!("State machine: stream terminated");
                Received::Stop
            }
        }
    }

    /// internal function which processes the message according to the state machine algorithm
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

    /// Sends out all messages generated by the transition and arms the timer of the new state.
    async fn state_post_transition(&mut self) {
        self.deadline = self.state.timeout().map(|t| Instant::now() + t);
        if let Some(output) = self.state.start() {
            for m in output {
                if let Err(err) = self.outqueue.send(m).await {
                    log::error!("State machine cannot send out message: {:?}", err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Address, InputMessage, OutputMessage};

    use crate::state_machine::State;
    use crate::state_machine::Transition::*;

    #[derive(Debug)]
    struct Final(u8);
    #[derive(Debug)]
    enum MachineError {
        TimeoutError(u8),
    }

    struct TestTraits;

    impl StateMachineTraits for TestTraits {
        type InMsg = InputMessage<u8>;
        type OutMsg = OutputMessage<u8>;
        type FinalState = Final;
        type ErrorState = MachineError;
    }

    type In = InputMessage<u8>;
    type Out = OutputMessage<u8>;

    /// waits for three messages equal to its phase number
    struct Phase {
        number: u8,
        last: u8,
        timeout: Option<Duration>,
    }

    impl State<TestTraits> for Phase {
        fn start(&mut self) -> Option<Vec<Out>> {
            Some(vec![OutputMessage {
                recipient: Address::Broadcast,
                body: self.number,
            }])
        }

        fn is_message_expected(&self, msg: &In, _current_msg_set: &[In]) -> bool {
            msg.body == self.number
        }

        fn is_input_complete(&self, current_msg_set: &[In]) -> bool {
            current_msg_set.len() == 3
        }

        fn consume(&mut self, _current_msg_set: Vec<In>) -> Transition<TestTraits> {
            if self.number == self.last {
                FinalState(Ok(Final(self.number)))
            } else {
                NewState(Box::new(Phase {
                    number: self.number + 1,
                    last: self.last,
                    timeout: self.timeout,
                }))
            }
        }

        fn timeout(&self) -> Option<Duration> {
            self.timeout
        }

        fn timeout_outcome(&self, _current_msg_set: Vec<In>) -> Result<Final, MachineError> {
            Err(MachineError::TimeoutError(self.number))
        }
    }

    fn data(body: u8) -> Instruction<In> {
        Instruction::Data(InputMessage {
            sender: Default::default(),
            body,
        })
    }

    #[tokio::test]
    async fn three_phases_out_of_order() {
        let _ = env_logger::builder().is_test(true).try_init();

        let (mut ingress, rx) = futures::channel::mpsc::unbounded();
        let (tx, _egress) = futures::channel::mpsc::unbounded();

        let start_state = Box::new(Phase {
            number: 1,
            last: 3,
            timeout: None,
        });

        let (tx_result, rx_result) = futures::channel::oneshot::channel();

        tokio::spawn(async {
            let mut machine = StateMachine::<TestTraits>::new(start_state, rx, tx);
            let result = machine.execute().await;
            let _ = tx_result.send(result);
        });

        for body in vec![1, 2, 3, 1, 2, 1, 3, 2, 3] {
            let _ = ingress.send(data(body)).await;
        }

        let result = rx_result.await.expect("machine dropped its result");
        assert!(matches!(result, Some(Ok(Final(3)))));
    }

    #[tokio::test]
    async fn termination() {
        let _ = env_logger::builder().is_test(true).try_init();

        let (mut ingress, rx) = futures::channel::mpsc::unbounded();
        let (tx, _egress) = futures::channel::mpsc::unbounded();

        let start_state = Box::new(Phase {
            number: 1,
            last: 3,
            timeout: None,
        });
        let (tx_result, rx_result) = futures::channel::oneshot::channel();

        tokio::spawn(async {
            let mut machine = StateMachine::<TestTraits>::new(start_state, rx, tx);
            let result = machine.execute().await;
            let _ = tx_result.send(result);
        });

        // enough to pass the first phase only
        for body in vec![1, 2, 1, 2, 1] {
            let _ = ingress.send(data(body)).await;
        }
        let _ = ingress.send(Instruction::Terminate).await;

        assert!(matches!(rx_result.await, Ok(None)));
    }

    #[tokio::test]
    async fn timeout_of_second_phase() {
        let _ = env_logger::builder().is_test(true).try_init();

        let (mut ingress, rx) = futures::channel::mpsc::unbounded();
        let (tx, _egress) = futures::channel::mpsc::unbounded();

        let start_state = Box::new(Phase {
            number: 1,
            last: 2,
            timeout: Some(Duration::from_millis(200)),
        });
        let mut machine = StateMachine::<TestTraits>::new(start_state, rx, tx);

        for body in vec![1, 1, 1, 2] {
            let _ = ingress.send(data(body)).await;
        }
        let result = machine.execute().await;
        assert!(matches!(result, Some(Err(MachineError::TimeoutError(2)))));
    }
}
