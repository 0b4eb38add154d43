//! Inbound Event Adapter
//!
//! The game client pushes call-state changes as NUI messages
//! (`{"method": "...", "data": {...}}`). They are decoded here and folded
//! into the state machine through the controller queue.

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use super::controller::CallHandle;
use super::machine::{CallMachine, Transition};
use super::{CallError, CallResult};

/// Raw message as pushed by the bridge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeMessage {
    pub method: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Call-state events delivered by the game client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundCallEvent {
    IncomingCall { from: String, anonymous: bool },
    RemoteAccepted,
    RemoteRejected,
    RemoteEnded,
    CallFailed { reason: Option<String> },
    Unanswered,
}

#[derive(Debug, Deserialize)]
struct IncomingCallData {
    #[serde(alias = "from")]
    transmitter: String,
    #[serde(default, alias = "anonymous", rename = "isAnonymous")]
    is_anonymous: bool,
}

#[derive(Debug, Default, Deserialize)]
struct CallFailedData {
    #[serde(default)]
    reason: Option<String>,
}

impl InboundCallEvent {
    /// Method name used on the wire
    pub fn method(&self) -> &'static str {
        match self {
            InboundCallEvent::IncomingCall { .. } => "incomingCall",
            InboundCallEvent::RemoteAccepted => "remoteAccepted",
            InboundCallEvent::RemoteRejected => "remoteRejected",
            InboundCallEvent::RemoteEnded => "remoteEnded",
            InboundCallEvent::CallFailed { .. } => "callFailed",
            InboundCallEvent::Unanswered => "unanswered",
        }
    }

    /// Decode a raw JSON message
    pub fn from_json(raw: &str) -> CallResult<Self> {
        let message: BridgeMessage =
            serde_json::from_str(raw).map_err(|e| CallError::InvalidEvent(e.to_string()))?;
        Self::try_from(message)
    }

    /// Fold this event into the machine
    pub fn apply_to(&self, machine: &mut CallMachine) -> CallResult<Transition> {
        match self {
            InboundCallEvent::IncomingCall { from, anonymous } => machine.incoming_call(from, *anonymous),
            InboundCallEvent::RemoteAccepted => machine.remote_accepted(),
            InboundCallEvent::RemoteRejected => machine.remote_rejected(),
            InboundCallEvent::RemoteEnded => machine.remote_ended(),
            InboundCallEvent::CallFailed { reason } => {
                if let Some(reason) = reason {
                    tracing::warn!("Call failed on the game client: {}", reason);
                }
                machine.call_failed()
            }
            InboundCallEvent::Unanswered => machine.unanswered(),
        }
    }
}

impl TryFrom<BridgeMessage> for InboundCallEvent {
    type Error = CallError;

    fn try_from(message: BridgeMessage) -> Result<Self, Self::Error> {
        let event = match message.method.as_str() {
            "incomingCall" => {
                let data: IncomingCallData = serde_json::from_value(message.data)
                    .map_err(|e| CallError::InvalidEvent(format!("incomingCall: {}", e)))?;
                InboundCallEvent::IncomingCall {
                    from: data.transmitter,
                    anonymous: data.is_anonymous,
                }
            }
            "remoteAccepted" => InboundCallEvent::RemoteAccepted,
            "remoteRejected" => InboundCallEvent::RemoteRejected,
            "remoteEnded" => InboundCallEvent::RemoteEnded,
            "callFailed" => {
                let data: CallFailedData = if message.data.is_null() {
                    CallFailedData::default()
                } else {
                    serde_json::from_value(message.data).unwrap_or_default()
                };
                InboundCallEvent::CallFailed { reason: data.reason }
            }
            "unanswered" => InboundCallEvent::Unanswered,
            other => return Err(CallError::InvalidEvent(format!("unknown method '{}'", other))),
        };
        Ok(event)
    }
}

/// Feeds bridge messages into a running controller
#[derive(Clone)]
pub struct InboundAdapter {
    calls: CallHandle,
}

impl InboundAdapter {
    pub fn new(calls: CallHandle) -> Self {
        Self { calls }
    }

    pub fn dispatch(&self, message: BridgeMessage) -> CallResult<()> {
        let method = message.method.clone();
        let event = InboundCallEvent::try_from(message).map_err(|e| {
            tracing::warn!("Dropping bridge message '{}': {}", method, e);
            e
        })?;
        tracing::debug!("Inbound call event: {:?}", event);
        self.calls.inbound(event)
    }

    pub fn dispatch_raw(&self, raw: &str) -> CallResult<()> {
        let event = InboundCallEvent::from_json(raw).map_err(|e| {
            tracing::warn!("Dropping raw bridge message: {}", e);
            e
        })?;
        tracing::debug!("Inbound call event: {:?}", event);
        self.calls.inbound(event)
    }

    /// Forward every raw message from `messages` until it ends or the controller stops.
    /// Returns how many events were forwarded.
    pub async fn pump<S>(self, messages: S) -> usize
    where
        S: Stream<Item = String>,
    {
        futures::pin_mut!(messages);
        let mut forwarded = 0;
        while let Some(raw) = messages.next().await {
            match self.dispatch_raw(&raw) {
                Ok(()) => forwarded += 1,
                Err(CallError::QueueClosed) => break,
                Err(_) => {}
            }
        }
        forwarded
    }
}
