//! Tracking-quality state machine.
//!
//! Maps raw signals from the visual tracking subsystem into a discrete
//! [`SessionState`] with a user-facing hint, and tells the session owner
//! when the session has to be reloaded.
//!
//! # Transition Table
//!
//! ```text
//! Quality(Normal)            + anchors  -> Normal
//! Quality(Normal)            + none     -> NormalNoAnchors
//! Quality(NotAvailable)                 -> Unavailable
//! Quality(Limited(motion))              -> LimitedExcessiveMotion
//! Quality(Limited(features))            -> LimitedInsufficientFeatures
//! Quality(Limited(initializing))        -> LimitedInitializing
//! Quality(Limited(relocalizing))        -> Relocalizing
//! Interrupted                           -> Interrupted
//! InterruptionEnded                     -> InterruptionEnded + reload
//! Failed(reason)                        -> Failed(reason)    + reload
//! ```
//!
//! # Example
//!
//! ```
//! use arnav::tracking::{SessionState, TrackingQuality, TrackingSignal, TrackingStateMachine};
//!
//! let machine = TrackingStateMachine::default();
//! let mut events = machine.subscribe();
//!
//! machine.handle(&TrackingSignal::Quality(TrackingQuality::Normal), true);
//!
//! let event = events.try_recv().unwrap();
//! assert_eq!(event.current, SessionState::Normal);
//! assert_eq!(event.current.hint(), "AR session prepared.");
//! ```

mod machine;
mod state;

pub use machine::{SessionEvent, Transition, TrackingStateMachine, DEFAULT_EVENT_CAPACITY};
pub use state::{
    classify, next_state, LimitedReason, Recovery, SessionState, TrackingQuality, TrackingSignal,
};
