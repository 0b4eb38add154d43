use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Which side of the call this device is on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallRole {
    /// We dialed (transmitter)
    Caller,
    /// We are being called (receiver)
    Callee,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallPhase {
    #[default]
    Idle,
    Ringing,
    Accepted,
    Ended,
}

impl CallPhase {
    /// Position in the lifecycle. Only `Ended -> Idle` may go backwards.
    pub fn rank(&self) -> u8 {
        match self {
            CallPhase::Idle => 0,
            CallPhase::Ringing => 1,
            CallPhase::Accepted => 2,
            CallPhase::Ended => 3,
        }
    }
}

impl std::fmt::Display for CallPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallPhase::Idle => write!(f, "Idle"),
            CallPhase::Ringing => write!(f, "Ringing"),
            CallPhase::Accepted => write!(f, "Accepted"),
            CallPhase::Ended => write!(f, "Ended"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndedReason {
    LocalHangup,
    RemoteHangup,
    LocalReject,
    RemoteReject,
    Unanswered,
}

impl EndedReason {
    pub fn display_name(&self) -> &str {
        match self {
            EndedReason::LocalHangup => "Call ended",
            EndedReason::RemoteHangup => "Call ended",
            EndedReason::LocalReject => "Call declined",
            EndedReason::RemoteReject => "Call rejected",
            EndedReason::Unanswered => "No answer",
        }
    }
}

/// The single call on this device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallSession {
    pub id: Uuid,
    pub role: CallRole,
    pub phase: CallPhase,
    /// `None` when the caller withheld their number
    #[serde(rename = "transmitterNumber")]
    pub transmitter_number: Option<String>,
    #[serde(rename = "receiverNumber")]
    pub receiver_number: String,
    #[serde(rename = "isAnonymous")]
    pub is_anonymous: bool,
    #[serde(rename = "isMuted")]
    pub is_muted: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "endedAt")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(rename = "endedReason")]
    pub ended_reason: Option<EndedReason>,
}

impl CallSession {
    /// Outgoing call placed from this device
    pub fn outgoing(self_number: String, receiver_number: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: CallRole::Caller,
            phase: CallPhase::Ringing,
            // Unknown until the device number is configured
            transmitter_number: Some(self_number).filter(|n| !n.is_empty()),
            receiver_number,
            is_anonymous: false,
            is_muted: false,
            created_at: now,
            started_at: None,
            ended_at: None,
            ended_reason: None,
        }
    }

    /// Incoming call; the transmitter is withheld when `anonymous` is set
    pub fn incoming(from: String, self_number: String, anonymous: bool, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: CallRole::Callee,
            phase: CallPhase::Ringing,
            transmitter_number: if anonymous { None } else { Some(from) },
            receiver_number: self_number,
            is_anonymous: anonymous,
            is_muted: false,
            created_at: now,
            started_at: None,
            ended_at: None,
            ended_reason: None,
        }
    }

    /// Number of the party on the other end, if known
    pub fn other_party_number(&self) -> Option<&str> {
        match self.role {
            CallRole::Caller => Some(self.receiver_number.as_str()),
            CallRole::Callee => self.transmitter_number.as_deref(),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, CallPhase::Ringing | CallPhase::Accepted)
    }
}

/// Requests sent to the game client over the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundRequest {
    StartCall { number: String },
    AcceptCall,
    RejectCall,
    EndCall,
    SetMuted(bool),
}

impl std::fmt::Display for OutboundRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutboundRequest::StartCall { number } => write!(f, "startCall({})", number),
            OutboundRequest::AcceptCall => write!(f, "acceptCall"),
            OutboundRequest::RejectCall => write!(f, "rejectCall"),
            OutboundRequest::EndCall => write!(f, "endCall"),
            OutboundRequest::SetMuted(muted) => write!(f, "setMuted({})", muted),
        }
    }
}
