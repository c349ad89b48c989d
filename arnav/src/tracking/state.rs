//! Tracking signals, session states and the pure transition table.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Why the tracking subsystem reports limited quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitedReason {
    /// The device is moving too fast.
    ExcessiveMotion,
    /// The scene lacks visible texture or light.
    InsufficientFeatures,
    /// The session has just started.
    Initializing,
    /// The session is recovering after an interruption.
    Relocalizing,
}

impl LimitedReason {
    /// All reasons, for exhaustive iteration.
    pub const ALL: [LimitedReason; 4] = [
        LimitedReason::ExcessiveMotion,
        LimitedReason::InsufficientFeatures,
        LimitedReason::Initializing,
        LimitedReason::Relocalizing,
    ];
}

/// Raw tracking-quality classification of the current camera pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingQuality {
    /// Pose estimate is reliable.
    Normal,
    /// No pose estimate at all.
    NotAvailable,
    /// Pose estimate exists but is degraded.
    Limited(LimitedReason),
}

/// Everything the tracking subsystem can tell the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingSignal {
    /// Camera tracking quality changed (or was re-sampled).
    Quality(TrackingQuality),
    /// Session was interrupted (e.g. camera taken away).
    Interrupted,
    /// Interruption is over.
    InterruptionEnded,
    /// Session failed with the given reason.
    Failed(String),
}

/// Discrete session state shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Tracking normal and at least one surface anchor known.
    Normal,
    /// Tracking normal but no surfaces detected yet.
    NormalNoAnchors,
    /// Tracking unavailable.
    Unavailable,
    /// Limited: device moving too fast.
    LimitedExcessiveMotion,
    /// Limited: not enough visual detail.
    LimitedInsufficientFeatures,
    /// Limited: session starting up.
    #[default]
    LimitedInitializing,
    /// Recovering tracking after an interruption.
    Relocalizing,
    /// Session interrupted.
    Interrupted,
    /// Interruption over, session is being reloaded.
    InterruptionEnded,
    /// Session failed, session is being reloaded.
    Failed(String),
}

impl SessionState {
    /// Human-readable hint for the user interface.
    pub fn hint(&self) -> Cow<'static, str> {
        match self {
            SessionState::Normal => Cow::Borrowed("AR session prepared."),
            SessionState::NormalNoAnchors => {
                Cow::Borrowed("Move the device around to detect horizontal surfaces.")
            }
            SessionState::Unavailable => Cow::Borrowed("Tracking unavailable."),
            SessionState::LimitedExcessiveMotion => {
                Cow::Borrowed("Tracking limited - Move the device more slowly.")
            }
            SessionState::LimitedInsufficientFeatures => Cow::Borrowed(
                "Tracking limited - Point the device at an area with visible surface detail, \
                 or improve lighting conditions.",
            ),
            SessionState::LimitedInitializing => Cow::Borrowed("Initializing AR session."),
            SessionState::Relocalizing => Cow::Borrowed("Relocalizing AR session."),
            SessionState::Interrupted => Cow::Borrowed("Session was interrupted."),
            SessionState::InterruptionEnded => Cow::Borrowed("Session interruption ended."),
            SessionState::Failed(reason) if reason.is_empty() => {
                Cow::Borrowed("Session failed.")
            }
            SessionState::Failed(reason) => Cow::Owned(format!("Session failed: {}", reason)),
        }
    }

    /// Whether placed content can be trusted in this state.
    pub fn is_trustworthy(&self) -> bool {
        matches!(self, SessionState::Normal | SessionState::NormalNoAnchors)
    }

    /// Short identifier for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Normal => "normal",
            SessionState::NormalNoAnchors => "normal_no_anchors",
            SessionState::Unavailable => "unavailable",
            SessionState::LimitedExcessiveMotion => "limited_excessive_motion",
            SessionState::LimitedInsufficientFeatures => "limited_insufficient_features",
            SessionState::LimitedInitializing => "limited_initializing",
            SessionState::Relocalizing => "relocalizing",
            SessionState::Interrupted => "interrupted",
            SessionState::InterruptionEnded => "interruption_ended",
            SessionState::Failed(_) => "failed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the session owner must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Nothing.
    None,
    /// Reset tracking and discard all anchors.
    Reload,
}

/// Map a signal to the next state.
///
/// Total over every (signal, anchor presence) pair; no input is rejected.
pub fn next_state(signal: &TrackingSignal, has_anchors: bool) -> (SessionState, Recovery) {
    match signal {
        TrackingSignal::Quality(quality) => (classify(*quality, has_anchors), Recovery::None),
        TrackingSignal::Interrupted => (SessionState::Interrupted, Recovery::None),
        TrackingSignal::InterruptionEnded => (SessionState::InterruptionEnded, Recovery::Reload),
        TrackingSignal::Failed(reason) => (SessionState::Failed(reason.clone()), Recovery::Reload),
    }
}

/// Map a tracking quality to a state.
pub fn classify(quality: TrackingQuality, has_anchors: bool) -> SessionState {
    match quality {
        TrackingQuality::Normal if has_anchors => SessionState::Normal,
        TrackingQuality::Normal => SessionState::NormalNoAnchors,
        TrackingQuality::NotAvailable => SessionState::Unavailable,
        TrackingQuality::Limited(LimitedReason::ExcessiveMotion) => {
            SessionState::LimitedExcessiveMotion
        }
        TrackingQuality::Limited(LimitedReason::InsufficientFeatures) => {
            SessionState::LimitedInsufficientFeatures
        }
        TrackingQuality::Limited(LimitedReason::Initializing) => SessionState::LimitedInitializing,
        TrackingQuality::Limited(LimitedReason::Relocalizing) => SessionState::Relocalizing,
    }
}
