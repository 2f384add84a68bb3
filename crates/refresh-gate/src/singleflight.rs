//! Single-flight execution with a FIFO waiter queue
//!
//! The first caller of `run` becomes the leader and executes the operation.
//! Callers arriving while it is in flight are queued and receive a clone of
//! the leader's outcome, in arrival order, once it settles. The flag and the
//! queue live behind one std Mutex that is never held across an await, so
//! check-then-act on the flag is atomic.
//!
//! If the leader's future is dropped before the operation settles, a guard
//! resets the flag and drops the queued senders; waiters then observe
//! `FlightError::Abandoned`.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

/// Outcome seen by a caller that did not get a success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlightError<E> {
    /// The operation ran and failed
    Failed(E),
    /// The leader was cancelled before the operation settled
    Abandoned,
}

/// Whether a call led the flight or waited on someone else's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Leader,
    Follower,
}

type Waiter<T, E> = oneshot::Sender<Result<T, E>>;

struct FlightState<T, E> {
    in_flight: bool,
    waiters: Vec<Waiter<T, E>>,
}

pub struct SingleFlight<T, E> {
    state: Mutex<FlightState<T, E>>,
}

impl<T: Clone, E: Clone> SingleFlight<T, E> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FlightState {
                in_flight: false,
                waiters: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FlightState<T, E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_in_flight(&self) -> bool {
        self.lock().in_flight
    }

    /// Number of callers currently queued behind the leader.
    pub fn waiting(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Run `op` unless a run is already in flight, in which case wait for
    /// that run's outcome instead.
    pub async fn run<F, Fut>(&self, op: F) -> (Role, Result<T, FlightError<E>>)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let follower = {
            let mut state = self.lock();
            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Some(rx)
            } else {
                state.in_flight = true;
                None
            }
        };

        if let Some(rx) = follower {
            let outcome = match rx.await {
                Ok(result) => result.map_err(FlightError::Failed),
                Err(_) => Err(FlightError::Abandoned),
            };
            return (Role::Follower, outcome);
        }

        let guard = FlightGuard { flight: self };
        let outcome = op().await;
        guard.settle(&outcome);
        (Role::Leader, outcome.map_err(FlightError::Failed))
    }
}

impl<T: Clone, E: Clone> Default for SingleFlight<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Resets the flight when the leader finishes or is dropped mid-flight.
struct FlightGuard<'a, T: Clone, E: Clone> {
    flight: &'a SingleFlight<T, E>,
}

impl<T: Clone, E: Clone> FlightGuard<'_, T, E> {
    /// Hand the outcome to every waiter in arrival order, then clear the flag.
    fn settle(self, outcome: &Result<T, E>) {
        let flight = self.flight;
        std::mem::forget(self);

        let mut state = flight.lock();
        for waiter in state.waiters.drain(..) {
            // a waiter whose task was dropped has nobody to tell
            let _ = waiter.send(outcome.clone());
        }
        state.in_flight = false;
    }
}

impl<T: Clone, E: Clone> Drop for FlightGuard<'_, T, E> {
    fn drop(&mut self) {
        let mut state = self.flight.lock();
        state.waiters.clear();
        state.in_flight = false;
    }
}
