//! Single-slot completion channel
//!
//! Hands a "the device is done" event from the interrupt context to a caller
//! blocked in the command context.
//!
//! ```text
//!           arm()              signal()            ticket dropped
//!   Idle ──────────▶ Armed ──────────────▶ Completed ──────────────▶ Idle
//!                      │                                              ▲
//!                      └───────── timeout, then ticket dropped ───────┘
//! ```
//!
//! At most one command may be outstanding per channel: a second [`arm`] while
//! the slot is not idle fails with [`EduError::Busy`]. Because of that
//! invariant [`signal`] wakes a single waiter. A signal that arrives before the
//! caller starts waiting is kept in the `Completed` state, so there is no lost
//! wake-up. A signal on an idle channel is spurious and dropped.
//!
//! [`arm`]: CompletionChannel::arm
//! [`signal`]: CompletionChannel::signal

use crate::error::{EduError, Result};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Observable slot state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No command outstanding
    Idle,
    /// A command was issued and its completion has not arrived
    Armed,
    /// Completion arrived and has not been consumed yet
    Completed,
}

/// Wait/signal rendezvous between the command and interrupt contexts
#[derive(Debug)]
pub struct CompletionChannel {
    name: &'static str,
    state: Mutex<SlotState>,
    done: Condvar,
}

impl CompletionChannel {
    /// Create an idle channel. `name` identifies it in logs and errors.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(SlotState::Idle),
            done: Condvar::new(),
        }
    }

    /// Channel name
    pub const fn name(&self) -> &'static str {
        self.name
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // The state is a plain enum and is valid even after a panic elsewhere
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state
    pub fn state(&self) -> SlotState {
        *self.lock()
    }

    /// Reserve the slot for one command
    ///
    /// Must be called before the device is told to start, so that a fast
    /// completion finds the slot armed.
    ///
    /// # Errors
    ///
    /// Returns [`EduError::Busy`] if a command is already outstanding.
    pub fn arm(&self) -> Result<Armed<'_>> {
        let mut state = self.lock();
        if *state != SlotState::Idle {
            return Err(EduError::busy(self.name));
        }
        *state = SlotState::Armed;
        Ok(Armed { channel: self })
    }

    /// Report completion from the interrupt context
    ///
    /// Takes the lock only long enough to flip the state and wake one waiter;
    /// never allocates. Returns `false` if no command was armed.
    pub fn signal(&self) -> bool {
        let mut state = self.lock();
        match *state {
            SlotState::Armed => {
                *state = SlotState::Completed;
                drop(state);
                self.done.notify_one();
                true
            }
            SlotState::Idle | SlotState::Completed => false,
        }
    }

    fn reset(&self) {
        *self.lock() = SlotState::Idle;
    }
}

/// Ticket for one outstanding command
///
/// Dropping it returns the channel to idle, whether or not the completion
/// arrived.
#[derive(Debug)]
#[must_use = "the channel stays reserved until the ticket is dropped"]
pub struct Armed<'a> {
    channel: &'a CompletionChannel,
}

impl Armed<'_> {
    /// Block until the completion is signalled
    ///
    /// `None` waits forever, matching a device that is trusted to answer. The
    /// slot stays reserved until the ticket is dropped, so the caller can read
    /// the result registers before another command may start.
    ///
    /// # Errors
    ///
    /// Returns [`EduError::Timeout`] if `timeout` elapses first.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<()> {
        let channel = self.channel;
        let mut state = channel.lock();

        // A limit too large to represent as an instant is no limit at all
        let deadline = timeout.and_then(|limit| Instant::now().checked_add(limit).map(|d| (limit, d)));

        match deadline {
            None => {
                while *state == SlotState::Armed {
                    state = channel.done.wait(state).unwrap_or_else(PoisonError::into_inner);
                }
            }
            Some((limit, deadline)) => {
                while *state == SlotState::Armed {
                    let now = Instant::now();
                    if now >= deadline {
                        tracing::warn!("{}: no completion after {limit:?}", channel.name);
                        return Err(EduError::timeout(limit));
                    }
                    state = channel
                        .done
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }

        Ok(())
    }
}

impl Drop for Armed<'_> {
    fn drop(&mut self) {
        self.channel.reset();
    }
}
