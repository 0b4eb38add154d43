//! Local event bridge server
//!
//! HTTP surface for the call core on native builds:
//! - Game client (or a dev tool) pushes call events
//! - Current call view for external overlays and debugging
//! - User commands for headless runs
//! - Contact list updates

use axum::{
    extract::State,
    http::{Method, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::ContactDirectory;
use crate::call::{BridgeMessage, CallCommand, CallError, CallHandle, CallSnapshot, CallView, InboundAdapter};
use crate::models::Contact;

/// State shared across all routes
#[derive(Clone)]
pub struct BridgeState {
    pub adapter: InboundAdapter,
    pub calls: CallHandle,
    pub contacts: Arc<ContactDirectory>,
}

impl BridgeState {
    pub fn new(calls: CallHandle, contacts: Arc<ContactDirectory>) -> Self {
        Self {
            adapter: InboundAdapter::new(calls.clone()),
            calls,
            contacts,
        }
    }
}

/// Create the Axum router with all bridge routes
pub fn create_router(state: BridgeState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/api/health", get(health_check))

        // Call routes
        .route("/api/call/events", post(push_event))
        .route("/api/call/commands", post(push_command))
        .route("/api/call/state", get(get_call_state))

        // Contacts
        .route("/api/contacts", put(replace_contacts))

        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

// Health check
async fn health_check() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize, Deserialize)]
struct BridgeResponse {
    success: bool,
    error: Option<String>,
}

impl BridgeResponse {
    fn accepted() -> (StatusCode, Json<Self>) {
        (StatusCode::ACCEPTED, Json(Self { success: true, error: None }))
    }

    fn failed(error: CallError) -> (StatusCode, Json<Self>) {
        let status = match error {
            CallError::InvalidEvent(_) | CallError::EmptyNumber => StatusCode::UNPROCESSABLE_ENTITY,
            CallError::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, Json(Self { success: false, error: Some(error.to_string()) }))
    }
}

async fn push_event(
    State(state): State<Arc<BridgeState>>,
    Json(message): Json<BridgeMessage>,
) -> (StatusCode, Json<BridgeResponse>) {
    tracing::debug!("Received bridge event: {}", message.method);

    match state.adapter.dispatch(message) {
        Ok(()) => BridgeResponse::accepted(),
        Err(e) => BridgeResponse::failed(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
enum CommandRequest {
    Initiate { number: String },
    Accept,
    Reject,
    Cancel,
    End,
    SetMuted { muted: bool },
    ToggleMute,
    Acknowledge,
}

impl From<CommandRequest> for CallCommand {
    fn from(req: CommandRequest) -> Self {
        match req {
            CommandRequest::Initiate { number } => CallCommand::Initiate(number),
            CommandRequest::Accept => CallCommand::Accept,
            CommandRequest::Reject => CallCommand::Reject,
            CommandRequest::Cancel => CallCommand::Cancel,
            CommandRequest::End => CallCommand::End,
            CommandRequest::SetMuted { muted } => CallCommand::SetMuted(muted),
            CommandRequest::ToggleMute => CallCommand::ToggleMute,
            CommandRequest::Acknowledge => CallCommand::Acknowledge,
        }
    }
}

async fn push_command(
    State(state): State<Arc<BridgeState>>,
    Json(req): Json<CommandRequest>,
) -> (StatusCode, Json<BridgeResponse>) {
    if let CommandRequest::Initiate { number } = &req {
        if number.trim().is_empty() {
            return BridgeResponse::failed(CallError::EmptyNumber);
        }
    }

    match state.calls.command(req.into()) {
        Ok(()) => BridgeResponse::accepted(),
        Err(e) => BridgeResponse::failed(e),
    }
}

#[derive(Debug, Serialize)]
struct CallStateResponse {
    snapshot: CallSnapshot,
    view: CallView,
}

async fn get_call_state(State(state): State<Arc<BridgeState>>) -> Json<CallStateResponse> {
    let snapshot = state.calls.current();
    let view = CallView::project(&snapshot, state.contacts.as_ref());
    Json(CallStateResponse { snapshot, view })
}

#[derive(Debug, Serialize, Deserialize)]
struct ContactsResponse {
    count: usize,
}

async fn replace_contacts(
    State(state): State<Arc<BridgeState>>,
    Json(contacts): Json<Vec<Contact>>,
) -> Json<ContactsResponse> {
    state.contacts.replace_all(contacts);
    if state.contacts.is_empty() {
        tracing::warn!("Contact list cleared, calls will show raw numbers");
    } else {
        tracing::info!("Contact list replaced ({} entries)", state.contacts.len());
    }
    Json(ContactsResponse { count: state.contacts.len() })
}

/// Run the bridge server
pub async fn run_server(port: u16, state: BridgeState) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Event bridge running on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
