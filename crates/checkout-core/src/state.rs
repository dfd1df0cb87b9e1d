//! # Checkout State Machine
//!
//! ```text
//!           submit              ok
//!   Idle ──────────▶ Submitting ──────▶ Succeeded
//!    ▲                │     ▲               │
//!    │            err │     │ retry         │
//!    │                ▼     │               │
//!    ├───── reset ─── Failed                │
//!    └─────────────── reset ────────────────┘
//! ```
//!
//! Only the submission workflow moves the machine forward; the host may
//! reset a finished session back to `Idle`. Observers subscribe to the
//! published state instead of polling.

use crate::error::{CheckoutError, CheckoutResult, FailureReason};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

/// Screen-level checkout state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum CheckoutState {
    /// Waiting for the customer
    Idle,
    /// A payment is in flight; front ends block interaction
    Submitting,
    /// The payment went through
    Succeeded,
    /// The payment failed; the customer may retry
    Failed(FailureReason),
}

impl CheckoutState {
    pub fn is_busy(&self) -> bool {
        matches!(self, CheckoutState::Submitting)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Idle => "idle",
            CheckoutState::Submitting => "submitting",
            CheckoutState::Succeeded => "succeeded",
            CheckoutState::Failed(_) => "failed",
        }
    }
}

impl Default for CheckoutState {
    fn default() -> Self {
        CheckoutState::Idle
    }
}

/// Owns the current `CheckoutState` and publishes every transition
pub struct CheckoutStateMachine {
    tx: watch::Sender<CheckoutState>,
}

impl CheckoutStateMachine {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(CheckoutState::Idle);
        Self { tx }
    }

    pub fn current(&self) -> CheckoutState {
        self.tx.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.tx.borrow().is_busy()
    }

    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.tx.subscribe()
    }

    /// `Idle | Failed -> Submitting`, checked and applied atomically
    pub(crate) fn begin_submission(&self) -> CheckoutResult<()> {
        let mut outcome = Ok(());
        self.tx.send_if_modified(|state| match state {
            CheckoutState::Idle | CheckoutState::Failed(_) => {
                *state = CheckoutState::Submitting;
                true
            }
            CheckoutState::Submitting => {
                outcome = Err(CheckoutError::AlreadyInProgress);
                false
            }
            CheckoutState::Succeeded => {
                outcome = Err(CheckoutError::AlreadyCompleted);
                false
            }
        });
        if outcome.is_ok() {
            debug!("Checkout state -> submitting");
        }
        outcome
    }

    /// `Submitting -> Succeeded`; returns false from any other state
    pub(crate) fn succeed(&self) -> bool {
        self.finish(CheckoutState::Succeeded)
    }

    /// `Submitting -> Failed(reason)`; returns false from any other state
    pub(crate) fn fail(&self, reason: FailureReason) -> bool {
        self.finish(CheckoutState::Failed(reason))
    }

    fn finish(&self, next: CheckoutState) -> bool {
        let label = next.as_str();
        let moved = self.tx.send_if_modified(|state| {
            if state.is_busy() {
                *state = next;
                true
            } else {
                false
            }
        });
        if moved {
            debug!("Checkout state -> {}", label);
        }
        moved
    }

    /// Return a finished session to `Idle`.
    ///
    /// Refused while a payment is in flight. Resetting an idle session is
    /// a no-op and publishes nothing.
    pub fn reset(&self) -> CheckoutResult<()> {
        let mut outcome = Ok(());
        self.tx.send_if_modified(|state| match state {
            CheckoutState::Submitting => {
                outcome = Err(CheckoutError::AlreadyInProgress);
                false
            }
            CheckoutState::Idle => false,
            CheckoutState::Succeeded | CheckoutState::Failed(_) => {
                *state = CheckoutState::Idle;
                true
            }
        });
        outcome
    }
}

impl Default for CheckoutStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declined() -> FailureReason {
        FailureReason::new("checkout.error.declined", "card declined")
    }

    #[test]
    fn test_happy_path() {
        let machine = CheckoutStateMachine::new();
        assert_eq!(machine.current(), CheckoutState::Idle);

        machine.begin_submission().unwrap();
        assert!(machine.is_busy());

        assert!(machine.succeed());
        assert_eq!(machine.current(), CheckoutState::Succeeded);
    }

    #[test]
    fn test_second_submission_rejected_while_submitting() {
        let machine = CheckoutStateMachine::new();
        machine.begin_submission().unwrap();

        assert_eq!(machine.begin_submission(), Err(CheckoutError::AlreadyInProgress));
        assert_eq!(machine.current(), CheckoutState::Submitting);
    }

    #[test]
    fn test_failed_allows_retry() {
        let machine = CheckoutStateMachine::new();
        machine.begin_submission().unwrap();
        assert!(machine.fail(declined()));
        assert_eq!(machine.current(), CheckoutState::Failed(declined()));

        machine.begin_submission().unwrap();
        assert_eq!(machine.current(), CheckoutState::Submitting);
    }

    #[test]
    fn test_succeeded_is_final_until_reset() {
        let machine = CheckoutStateMachine::new();
        machine.begin_submission().unwrap();
        machine.succeed();

        assert_eq!(machine.begin_submission(), Err(CheckoutError::AlreadyCompleted));
        assert!(!machine.fail(declined()));
        assert_eq!(machine.current(), CheckoutState::Succeeded);

        machine.reset().unwrap();
        assert_eq!(machine.current(), CheckoutState::Idle);
    }

    #[test]
    fn test_terminal_transitions_need_submitting() {
        let machine = CheckoutStateMachine::new();
        assert!(!machine.succeed());
        assert!(!machine.fail(declined()));
        assert_eq!(machine.current(), CheckoutState::Idle);
    }

    #[test]
    fn test_reset_refused_while_submitting() {
        let machine = CheckoutStateMachine::new();
        machine.begin_submission().unwrap();

        assert_eq!(machine.reset(), Err(CheckoutError::AlreadyInProgress));
        assert!(machine.is_busy());
    }

    #[test]
    fn test_observers_see_each_transition() {
        let machine = CheckoutStateMachine::new();
        let mut rx = machine.subscribe();

        machine.reset().unwrap();
        assert!(!rx.has_changed().unwrap());

        machine.begin_submission().unwrap();
        assert_eq!(*rx.borrow_and_update(), CheckoutState::Submitting);

        machine.fail(declined());
        assert_eq!(*rx.borrow_and_update(), CheckoutState::Failed(declined()));
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_value(CheckoutState::Failed(declined())).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"]["message"], "card declined");

        let json = serde_json::to_value(CheckoutState::Submitting).unwrap();
        assert_eq!(json["status"], "submitting");
    }
}
