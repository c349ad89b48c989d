//! Stateful wrapper around the transition table.
//!
//! Holds the current [`SessionState`] and publishes every assignment on a
//! broadcast channel. Publishing never runs subscriber code, so a subscriber
//! may call back into the session (e.g. `reload`) without deadlocking.

use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::state::{next_state, Recovery, SessionState, TrackingSignal};

/// Default capacity of the state event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Published on every state assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    /// State before the assignment.
    pub previous: SessionState,
    /// State after the assignment.
    pub current: SessionState,
}

impl SessionEvent {
    /// Whether the state actually changed.
    pub fn is_change(&self) -> bool {
        self.previous != self.current
    }
}

/// Result of feeding one signal into the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The state now active.
    pub state: SessionState,
    /// Recovery action the session owner must perform.
    pub recovery: Recovery,
}

/// Tracking-quality state machine.
///
/// Thread-safe via interior mutability; handlers may be invoked from the
/// tracking subsystem's delivery thread.
#[derive(Debug)]
pub struct TrackingStateMachine {
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for TrackingStateMachine {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl TrackingStateMachine {
    /// Create a machine in [`SessionState::LimitedInitializing`].
    pub fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            state: Mutex::new(SessionState::default()),
            events,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state.lock().clone()
    }

    /// Subscribe to state events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Feed a signal; returns the new state and any recovery to perform.
    pub fn handle(&self, signal: &TrackingSignal, has_anchors: bool) -> Transition {
        let (next, recovery) = next_state(signal, has_anchors);
        self.assign(next.clone());
        Transition {
            state: next,
            recovery,
        }
    }

    /// Assign a state and publish it.
    ///
    /// Publishing happens under the state lock so events leave in assignment
    /// order. `broadcast::Sender::send` only enqueues.
    fn assign(&self, next: SessionState) {
        let mut state = self.state.lock();
        let previous = std::mem::replace(&mut *state, next.clone());

        if previous != next {
            tracing::info!(
                from = %previous,
                to = %next,
                hint = %next.hint(),
                "Tracking state transition"
            );
        } else {
            tracing::trace!(state = %next, "Tracking state re-asserted");
        }

        // No receivers is fine: nobody is listening yet
        let _ = self.events.send(SessionEvent {
            previous,
            current: next,
        });
    }
}
