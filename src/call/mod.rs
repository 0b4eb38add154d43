//! Call session core for the phone overlay
//!
//! This module owns the lifecycle of the one call a device can have:
//! - State machine with guarded transitions (ringing, accepted, ended)
//! - Elapsed-time timer driven by a cancellable one-second ticker
//! - Inbound bridge events folded into the machine
//! - Single-consumer controller publishing read-only snapshots
//! - Presentation projections consumed by the call screen

mod clock;
mod controller;
mod events;
mod machine;
mod presentation;
pub(crate) mod runtime;
mod timer;


#[cfg(test)]
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use controller::{CallCommand, CallController, CallHandle, CallSnapshot};
pub use events::{BridgeMessage, InboundAdapter, InboundCallEvent};
pub use presentation::{CallControls, CallView, IslandView, ScreenKind};

use thiserror::Error;

use crate::models::{CallPhase, CallRole};

/// Call-related errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallError {
    #[error("Cannot {action} while {phase}")]
    InvalidTransition { action: &'static str, phase: CallPhase },

    #[error("Cannot {action} as {role:?}")]
    RoleMismatch { action: &'static str, role: CallRole },

    #[error("Phone number is required")]
    EmptyNumber,

    #[error("Phone service unavailable: {0}")]
    TransportUnavailable(String),

    #[error("No contact for {0}")]
    UnresolvedContact(String),

    #[error("Invalid bridge event: {0}")]
    InvalidEvent(String),

    #[error("Call controller is not running")]
    QueueClosed,
}

impl CallError {
    /// Guard failures are dropped silently; duplicate and late events land here.
    pub fn is_ignorable(&self) -> bool {
        matches!(self, CallError::InvalidTransition { .. } | CallError::RoleMismatch { .. })
    }
}

/// Result type for call operations
pub type CallResult<T> = Result<T, CallError>;
