//! Call Controller
//!
//! Sole owner of the call machine. User commands, inbound events, timer
//! ticks and transport failures all go through one queue and are applied
//! one at a time. Consumers read immutable snapshots from a watch channel.

use std::sync::Arc;
use std::time::Duration;

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use super::clock::Clock;
use super::events::InboundCallEvent;
use super::machine::{CallMachine, Transition};
use super::runtime::spawn_task;
use super::timer::Ticker;
use super::{CallError, CallResult};
use crate::api::CallTransport;
use crate::config::PhoneConfig;
use crate::models::{CallPhase, CallSession, OutboundRequest};

/// Actions a user can take on the call
#[derive(Debug, Clone, PartialEq)]
pub enum CallCommand {
    Initiate(String),
    Accept,
    Reject,
    Cancel,
    End,
    SetMuted(bool),
    ToggleMute,
    Acknowledge,
    DismissNotice,
}

#[derive(Debug)]
enum Message {
    Command(CallCommand),
    Inbound(InboundCallEvent),
    Tick(Uuid),
    RingTimeout(Uuid),
    TransportFailed(CallError),
    Shutdown,
}

/// Read-only view of the call state at one point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallSnapshot {
    pub session: Option<CallSession>,
    #[serde(rename = "elapsedSecs")]
    pub elapsed_secs: u64,
    /// Transient transport problem to surface to the user
    pub notice: Option<String>,
    pub revision: u64,
}

impl CallSnapshot {
    pub fn phase(&self) -> CallPhase {
        self.session.as_ref().map(|s| s.phase).unwrap_or_default()
    }

    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        self.session.is_none()
    }
}

/// Cloneable front door to a running controller
#[derive(Clone)]
pub struct CallHandle {
    tx: UnboundedSender<Message>,
    snapshots: watch::Receiver<CallSnapshot>,
}

impl CallHandle {
    fn send(&self, message: Message) -> CallResult<()> {
        self.tx.unbounded_send(message).map_err(|_| CallError::QueueClosed)
    }

    pub fn command(&self, command: CallCommand) -> CallResult<()> {
        self.send(Message::Command(command))
    }

    pub fn initiate(&self, number: impl Into<String>) -> CallResult<()> {
        self.command(CallCommand::Initiate(number.into()))
    }

    pub fn accept(&self) -> CallResult<()> {
        self.command(CallCommand::Accept)
    }

    pub fn reject(&self) -> CallResult<()> {
        self.command(CallCommand::Reject)
    }

    pub fn cancel(&self) -> CallResult<()> {
        self.command(CallCommand::Cancel)
    }

    pub fn end(&self) -> CallResult<()> {
        self.command(CallCommand::End)
    }

    #[cfg(test)]
    pub fn set_muted(&self, muted: bool) -> CallResult<()> {
        self.command(CallCommand::SetMuted(muted))
    }

    pub fn toggle_mute(&self) -> CallResult<()> {
        self.command(CallCommand::ToggleMute)
    }

    pub fn acknowledge(&self) -> CallResult<()> {
        self.command(CallCommand::Acknowledge)
    }

    /// Hand an event pushed by the game client to the controller
    pub fn inbound(&self, event: InboundCallEvent) -> CallResult<()> {
        self.send(Message::Inbound(event))
    }

    /// Latest published snapshot
    pub fn current(&self) -> CallSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CallSnapshot> {
        self.snapshots.clone()
    }

    /// Stop the controller after it drains what is already queued
    pub fn shutdown(&self) {
        let _ = self.send(Message::Shutdown);
    }
}

pub struct CallController {
    machine: CallMachine,
    transport: Arc<dyn CallTransport>,
    rx: UnboundedReceiver<Message>,
    /// Outbound requests, delivered one at a time by `deliver_requests`
    requests: UnboundedSender<OutboundRequest>,
    pending: Option<UnboundedReceiver<OutboundRequest>>,
    /// Used by background tasks to feed results back into the queue
    tx: UnboundedSender<Message>,
    snapshot_tx: watch::Sender<CallSnapshot>,
    tick_interval: Duration,
    ring_timeout: Option<Duration>,
    ticker: Option<Ticker>,
    ring_timer: Option<Ticker>,
    notice: Option<String>,
    revision: u64,
}

impl CallController {
    pub fn new(
        config: &PhoneConfig,
        transport: Arc<dyn CallTransport>,
        clock: Arc<dyn Clock>,
    ) -> (Self, CallHandle) {
        let (tx, rx) = mpsc::unbounded();
        let (snapshot_tx, snapshots) = watch::channel(CallSnapshot::default());
        let (requests, pending) = mpsc::unbounded();

        let controller = Self {
            machine: CallMachine::new(config.self_number.clone(), clock),
            transport,
            rx,
            requests,
            pending: Some(pending),
            tx: tx.clone(),
            snapshot_tx,
            tick_interval: config.tick_interval(),
            ring_timeout: config.ring_timeout(),
            ticker: None,
            ring_timer: None,
            notice: None,
            revision: 0,
        };

        (controller, CallHandle { tx, snapshots })
    }

    /// Process the queue until shutdown
    pub async fn run(mut self) {
        tracing::info!("Call controller started");

        if let Some(pending) = self.pending.take() {
            spawn_task(deliver_requests(Arc::clone(&self.transport), pending, self.tx.clone()));
        }

        while let Some(message) = self.rx.next().await {
            if matches!(message, Message::Shutdown) {
                break;
            }
            self.handle(message);
        }

        self.ticker = None;
        self.ring_timer = None;
        tracing::info!("Call controller stopped");
    }

    fn handle(&mut self, message: Message) {
        let outcome = match message {
            Message::Command(CallCommand::DismissNotice) => {
                self.notice = None;
                Ok(None)
            }
            Message::Command(command) => self.apply_command(command).map(Some),
            Message::Inbound(event) => {
                tracing::debug!("Applying inbound event {}", event.method());
                event.apply_to(&mut self.machine).map(Some)
            }
            Message::RingTimeout(session_id) => {
                tracing::info!(session = %session_id, "Ring timeout elapsed");
                self.machine.ring_timeout(session_id).map(Some)
            }
            Message::Tick(session_id) => {
                if self.machine.tick(session_id).is_none() {
                    tracing::trace!(session = %session_id, "Dropping stale tick");
                }
                Ok(None)
            }
            Message::TransportFailed(error) => {
                tracing::warn!("Call request not delivered: {}", error);
                self.notice = Some(error.to_string());
                Ok(None)
            }
            Message::Shutdown => Ok(None),
        };

        match outcome {
            Ok(Some(transition)) => self.on_transition(transition),
            Ok(None) => {}
            Err(error) if error.is_ignorable() => {
                tracing::debug!("Ignoring call input: {}", error);
            }
            Err(error) => {
                tracing::warn!("Rejected call input: {}", error);
            }
        }

        self.sync_background_tasks();
        self.publish();
    }

    fn apply_command(&mut self, command: CallCommand) -> CallResult<Transition> {
        match command {
            CallCommand::Initiate(number) => self.machine.initiate(&number),
            CallCommand::Accept => self.machine.accept(),
            CallCommand::Reject => self.machine.reject(),
            CallCommand::Cancel => self.machine.cancel(),
            CallCommand::End => self.machine.end(),
            CallCommand::SetMuted(muted) => self.machine.set_muted(muted),
            CallCommand::ToggleMute => self.machine.toggle_mute(),
            CallCommand::Acknowledge => self.machine.acknowledge(),
            CallCommand::DismissNotice => Err(CallError::InvalidTransition {
                action: "dismiss a notice",
                phase: self.machine.phase(),
            }),
        }
    }

    fn on_transition(&mut self, transition: Transition) {
        debug_assert!(
            transition.to.rank() >= transition.from.rank() || transition.to == CallPhase::Idle,
            "call phase moved backwards"
        );
        if transition.from != transition.to {
            tracing::info!(
                session = %transition.session_id,
                "Call phase {} -> {}",
                transition.from,
                transition.to
            );
        }
        if transition.to == CallPhase::Idle {
            self.notice = None;
        }
        if let Some(request) = transition.request {
            self.dispatch(request);
        }
    }

    /// Queue a request for the delivery worker without waiting for it
    fn dispatch(&self, request: OutboundRequest) {
        tracing::debug!("Queueing {}", request);
        if self.requests.unbounded_send(request).is_err() {
            tracing::warn!("Request worker stopped, dropping call request");
        }
    }

    /// Start or stop the ticker and ring timeout to match the current phase
    fn sync_background_tasks(&mut self) {
        let session = self.machine.session();
        let accepted = session.filter(|s| s.phase == CallPhase::Accepted).map(|s| s.id);
        let ringing = session.filter(|s| s.phase == CallPhase::Ringing).map(|s| s.id);

        if self.ticker.as_ref().map(Ticker::session_id) != accepted {
            // Dropping the old ticker cancels it
            self.ticker = accepted.map(|id| {
                let tx = self.tx.clone();
                Ticker::spawn(id, self.tick_interval, move |id| tx.unbounded_send(Message::Tick(id)).is_ok())
            });
        }

        let armed = ringing.filter(|_| self.ring_timeout.is_some());
        if self.ring_timer.as_ref().map(Ticker::session_id) != armed {
            self.ring_timer = match (armed, self.ring_timeout) {
                (Some(id), Some(timeout)) => {
                    let tx = self.tx.clone();
                    Some(Ticker::once(id, timeout, move |id| {
                        let _ = tx.unbounded_send(Message::RingTimeout(id));
                    }))
                }
                _ => None,
            };
        }
    }

    fn publish(&mut self) {
        self.revision += 1;
        let snapshot = CallSnapshot {
            session: self.machine.session().cloned(),
            elapsed_secs: self.machine.elapsed_secs(),
            notice: self.notice.clone(),
            revision: self.revision,
        };
        self.snapshot_tx.send_replace(snapshot);
    }
}

/// Send queued requests in order, one at a time. Failures come back as `TransportFailed`.
async fn deliver_requests(
    transport: Arc<dyn CallTransport>,
    mut requests: UnboundedReceiver<OutboundRequest>,
    results: UnboundedSender<Message>,
) {
    while let Some(request) = requests.next().await {
        tracing::debug!("Sending {}", request);
        if let Err(e) = request.send(transport.as_ref()).await {
            let error = CallError::TransportUnavailable(e.to_string());
            let _ = results.unbounded_send(Message::TransportFailed(error));
        }
    }
    tracing::debug!("Call request worker stopped");
}
