//! Outbound call requests over the NUI bridge

use serde::Serialize;

use super::client::{ApiClient, ApiError};
use crate::models::OutboundRequest;

/// NUI callback names registered by the game client script
pub mod events {
    pub const START_CALL: &str = "phone:startCall";
    pub const ACCEPT_CALL: &str = "phone:acceptCall";
    pub const REJECT_CALL: &str = "phone:rejectCall";
    pub const END_CALL: &str = "phone:endCall";
    pub const TOGGLE_MUTE: &str = "phone:toggleMute";
    pub const GET_CONTACTS: &str = "phone:getContacts";
}

/// Requests the call machine can ask of the game client.
/// Replies are not inspected; outcomes arrive as inbound events.
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
pub trait CallTransport: Send + Sync {
    async fn start_call(&self, number: &str) -> Result<(), ApiError>;
    async fn accept_call(&self) -> Result<(), ApiError>;
    async fn reject_call(&self) -> Result<(), ApiError>;
    async fn end_call(&self) -> Result<(), ApiError>;
    async fn set_muted(&self, muted: bool) -> Result<(), ApiError>;
}

impl OutboundRequest {
    /// Deliver this request through `transport`
    pub async fn send(&self, transport: &dyn CallTransport) -> Result<(), ApiError> {
        match self {
            OutboundRequest::StartCall { number } => transport.start_call(number).await,
            OutboundRequest::AcceptCall => transport.accept_call().await,
            OutboundRequest::RejectCall => transport.reject_call().await,
            OutboundRequest::EndCall => transport.end_call().await,
            OutboundRequest::SetMuted(muted) => transport.set_muted(*muted).await,
        }
    }
}

#[derive(Serialize)]
struct StartCallRequest<'a> {
    #[serde(rename = "receiverNumber")]
    receiver_number: &'a str,
}

#[derive(Serialize)]
struct MuteRequest {
    muted: bool,
}

#[derive(Serialize)]
struct EmptyRequest {}

/// `CallTransport` backed by NUI callbacks
#[derive(Clone)]
pub struct NuiCallTransport {
    client: ApiClient,
}

impl NuiCallTransport {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
impl CallTransport for NuiCallTransport {
    async fn start_call(&self, number: &str) -> Result<(), ApiError> {
        self.client
            .post_no_response(events::START_CALL, &StartCallRequest { receiver_number: number })
            .await
    }

    async fn accept_call(&self) -> Result<(), ApiError> {
        self.client.post_no_response(events::ACCEPT_CALL, &EmptyRequest {}).await
    }

    async fn reject_call(&self) -> Result<(), ApiError> {
        self.client.post_no_response(events::REJECT_CALL, &EmptyRequest {}).await
    }

    async fn end_call(&self) -> Result<(), ApiError> {
        self.client.post_no_response(events::END_CALL, &EmptyRequest {}).await
    }

    async fn set_muted(&self, muted: bool) -> Result<(), ApiError> {
        self.client.post_no_response(events::TOGGLE_MUTE, &MuteRequest { muted }).await
    }
}
