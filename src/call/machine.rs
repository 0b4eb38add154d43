//! Call Session State Machine
//!
//! Holds the authoritative call record and applies guarded transitions.
//! Phases only move forward (`Idle -> Ringing -> Accepted -> Ended`) except
//! the final `Ended -> Idle` reset done by `acknowledge`.

use std::sync::Arc;

use uuid::Uuid;

use super::clock::Clock;
use super::timer::CallTimer;
use super::{CallError, CallResult};
use crate::models::{CallPhase, CallRole, CallSession, EndedReason, OutboundRequest};

/// A phase change (or in-phase update) that was applied
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub session_id: Uuid,
    pub from: CallPhase,
    pub to: CallPhase,
    /// Request to forward to the game client, if any
    pub request: Option<OutboundRequest>,
}

pub struct CallMachine {
    self_number: String,
    clock: Arc<dyn Clock>,
    session: Option<CallSession>,
    timer: CallTimer,
}

impl CallMachine {
    pub fn new(self_number: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            self_number: self_number.into(),
            clock,
            session: None,
            timer: CallTimer::default(),
        }
    }

    // ==================== Queries ====================

    pub fn session(&self) -> Option<&CallSession> {
        self.session.as_ref()
    }

    pub fn phase(&self) -> CallPhase {
        self.session.as_ref().map(|s| s.phase).unwrap_or_default()
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.timer.elapsed_secs()
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer.is_running()
    }

    // ==================== Local commands ====================

    /// Place an outgoing call
    pub fn initiate(&mut self, number: &str) -> CallResult<Transition> {
        if let Some(session) = &self.session {
            return Err(CallError::InvalidTransition { action: "start a call", phase: session.phase });
        }
        let number = number.trim();
        if number.is_empty() {
            return Err(CallError::EmptyNumber);
        }

        let session = CallSession::outgoing(self.self_number.clone(), number.to_string(), self.clock.now());
        let session_id = session.id;
        self.session = Some(session);

        Ok(Transition {
            session_id,
            from: CallPhase::Idle,
            to: CallPhase::Ringing,
            request: Some(OutboundRequest::StartCall { number: number.to_string() }),
        })
    }

    /// Answer an incoming call
    pub fn accept(&mut self) -> CallResult<Transition> {
        let now = self.clock.now();
        let session = session_in(&mut self.session, CallPhase::Ringing, "accept")?;
        match session.role {
            CallRole::Callee => {}
            CallRole::Caller => return Err(CallError::RoleMismatch { action: "accept", role: session.role }),
        }
        Ok(connect(session, &mut self.timer, now, Some(OutboundRequest::AcceptCall)))
    }

    /// Decline an incoming call
    pub fn reject(&mut self) -> CallResult<Transition> {
        let now = self.clock.now();
        let session = session_in(&mut self.session, CallPhase::Ringing, "reject")?;
        match session.role {
            CallRole::Callee => {}
            CallRole::Caller => return Err(CallError::RoleMismatch { action: "reject", role: session.role }),
        }
        Ok(finish(session, &mut self.timer, now, EndedReason::LocalReject, Some(OutboundRequest::RejectCall)))
    }

    /// Give up on a ringing call
    pub fn cancel(&mut self) -> CallResult<Transition> {
        let now = self.clock.now();
        let session = session_in(&mut self.session, CallPhase::Ringing, "cancel")?;
        let request = hangup_request(session.role);
        Ok(finish(session, &mut self.timer, now, EndedReason::LocalHangup, Some(request)))
    }

    /// Hang up. Also accepted while ringing so a stuck call can always be terminated.
    pub fn end(&mut self) -> CallResult<Transition> {
        let now = self.clock.now();
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => return Err(CallError::InvalidTransition { action: "end", phase: CallPhase::Idle }),
        };

        let (reason, request) = match (session.phase, session.role) {
            (CallPhase::Accepted, _) => (EndedReason::LocalHangup, OutboundRequest::EndCall),
            (CallPhase::Ringing, CallRole::Caller) => (EndedReason::LocalHangup, OutboundRequest::EndCall),
            (CallPhase::Ringing, CallRole::Callee) => (EndedReason::LocalReject, OutboundRequest::RejectCall),
            (phase @ (CallPhase::Idle | CallPhase::Ended), _) => {
                return Err(CallError::InvalidTransition { action: "end", phase });
            }
        };
        Ok(finish(session, &mut self.timer, now, reason, Some(request)))
    }

    /// Update the local mute flag. Only meaningful while connected.
    pub fn set_muted(&mut self, muted: bool) -> CallResult<Transition> {
        let session = session_in(&mut self.session, CallPhase::Accepted, "change mute")?;
        let request = if session.is_muted == muted {
            None
        } else {
            session.is_muted = muted;
            Some(OutboundRequest::SetMuted(muted))
        };

        Ok(Transition {
            session_id: session.id,
            from: CallPhase::Accepted,
            to: CallPhase::Accepted,
            request,
        })
    }

    pub fn toggle_mute(&mut self) -> CallResult<Transition> {
        let muted = self
            .session
            .as_ref()
            .filter(|s| s.phase == CallPhase::Accepted)
            .map(|s| s.is_muted)
            .ok_or(CallError::InvalidTransition { action: "change mute", phase: self.phase() })?;
        self.set_muted(!muted)
    }

    /// Clear an ended call once the UI has shown it
    pub fn acknowledge(&mut self) -> CallResult<Transition> {
        let session_id = session_in(&mut self.session, CallPhase::Ended, "acknowledge")?.id;
        self.session = None;
        self.timer.reset();

        Ok(Transition {
            session_id,
            from: CallPhase::Ended,
            to: CallPhase::Idle,
            request: None,
        })
    }

    // ==================== Remote events ====================

    /// Someone is calling us
    pub fn incoming_call(&mut self, from: &str, anonymous: bool) -> CallResult<Transition> {
        if let Some(session) = &self.session {
            return Err(CallError::InvalidTransition { action: "receive a call", phase: session.phase });
        }

        let session = CallSession::incoming(from.trim().to_string(), self.self_number.clone(), anonymous, self.clock.now());
        let session_id = session.id;
        self.session = Some(session);

        Ok(Transition {
            session_id,
            from: CallPhase::Idle,
            to: CallPhase::Ringing,
            request: None,
        })
    }

    /// The other side picked up our outgoing call
    pub fn remote_accepted(&mut self) -> CallResult<Transition> {
        let now = self.clock.now();
        let session = session_in(&mut self.session, CallPhase::Ringing, "connect")?;
        match session.role {
            CallRole::Caller => {}
            CallRole::Callee => return Err(CallError::RoleMismatch { action: "connect remotely", role: session.role }),
        }
        Ok(connect(session, &mut self.timer, now, None))
    }

    pub fn remote_rejected(&mut self) -> CallResult<Transition> {
        let now = self.clock.now();
        let session = session_in(&mut self.session, CallPhase::Ringing, "be rejected")?;
        Ok(finish(session, &mut self.timer, now, EndedReason::RemoteReject, None))
    }

    pub fn remote_ended(&mut self) -> CallResult<Transition> {
        let now = self.clock.now();
        let session = session_in(&mut self.session, CallPhase::Accepted, "be hung up")?;
        Ok(finish(session, &mut self.timer, now, EndedReason::RemoteHangup, None))
    }

    /// Nobody answered before the game client gave up
    pub fn unanswered(&mut self) -> CallResult<Transition> {
        let now = self.clock.now();
        let session = session_in(&mut self.session, CallPhase::Ringing, "time out")?;
        Ok(finish(session, &mut self.timer, now, EndedReason::Unanswered, None))
    }

    /// Corrective end after a request the game client could not honour
    pub fn call_failed(&mut self) -> CallResult<Transition> {
        let now = self.clock.now();
        let phase = self.phase();
        match self.session.as_mut() {
            Some(session) if session.is_active() => {
                Ok(finish(session, &mut self.timer, now, EndedReason::RemoteHangup, None))
            }
            _ => Err(CallError::InvalidTransition { action: "fail", phase }),
        }
    }

    // ==================== Timer inputs ====================

    /// Local ring timeout for the given session
    pub fn ring_timeout(&mut self, session_id: Uuid) -> CallResult<Transition> {
        let now = self.clock.now();
        let session = session_in(&mut self.session, CallPhase::Ringing, "time out")?;
        if session.id != session_id {
            return Err(CallError::InvalidTransition { action: "time out a previous call", phase: session.phase });
        }
        let request = hangup_request(session.role);
        Ok(finish(session, &mut self.timer, now, EndedReason::Unanswered, Some(request)))
    }

    /// Refresh the elapsed projection. Returns `None` for stale ticks.
    pub fn tick(&mut self, session_id: Uuid) -> Option<u64> {
        let session = self.session.as_ref()?;
        if session.id != session_id || session.phase != CallPhase::Accepted {
            return None;
        }
        Some(self.timer.tick(self.clock.now()))
    }
}

fn session_in<'a>(
    session: &'a mut Option<CallSession>,
    phase: CallPhase,
    action: &'static str,
) -> CallResult<&'a mut CallSession> {
    let current = session.as_ref().map(|s| s.phase).unwrap_or_default();
    match session {
        Some(session) if current == phase => Ok(session),
        _ => Err(CallError::InvalidTransition { action, phase: current }),
    }
}

/// What to tell the game client when we abandon a ringing call
fn hangup_request(role: CallRole) -> OutboundRequest {
    match role {
        CallRole::Caller => OutboundRequest::EndCall,
        CallRole::Callee => OutboundRequest::RejectCall,
    }
}

fn connect(
    session: &mut CallSession,
    timer: &mut CallTimer,
    now: chrono::DateTime<chrono::Utc>,
    request: Option<OutboundRequest>,
) -> Transition {
    debug_assert!(session.started_at.is_none());
    session.phase = CallPhase::Accepted;
    session.started_at = Some(now);
    timer.start(now);

    Transition {
        session_id: session.id,
        from: CallPhase::Ringing,
        to: CallPhase::Accepted,
        request,
    }
}

fn finish(
    session: &mut CallSession,
    timer: &mut CallTimer,
    now: chrono::DateTime<chrono::Utc>,
    reason: EndedReason,
    request: Option<OutboundRequest>,
) -> Transition {
    let from = session.phase;
    session.phase = CallPhase::Ended;
    session.ended_reason = Some(reason);
    session.ended_at = Some(now);
    session.is_muted = false;
    timer.stop(now);

    Transition {
        session_id: session.id,
        from,
        to: CallPhase::Ended,
        request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::ManualClock;
    use std::time::Duration;

    fn machine() -> (CallMachine, ManualClock) {
        let clock = ManualClock::default();
        (CallMachine::new("5550000", Arc::new(clock.clone())), clock)
    }

    fn ringing_callee(anonymous: bool) -> (CallMachine, ManualClock) {
        let (mut machine, clock) = machine();
        machine.incoming_call("5559876", anonymous).unwrap();
        (machine, clock)
    }

    #[test]
    fn test_caller_full_lifecycle() {
        let (mut machine, clock) = machine();

        let t = machine.initiate("5551234").unwrap();
        assert_eq!(t.to, CallPhase::Ringing);
        assert_eq!(t.request, Some(OutboundRequest::StartCall { number: "5551234".into() }));
        let session = machine.session().unwrap();
        assert_eq!(session.role, CallRole::Caller);
        assert_eq!(session.transmitter_number.as_deref(), Some("5550000"));
        assert_eq!(session.receiver_number, "5551234");

        let t = machine.remote_accepted().unwrap();
        assert_eq!(t.to, CallPhase::Accepted);
        assert!(t.request.is_none());
        assert!(machine.session().unwrap().started_at.is_some());
        assert!(machine.is_timer_running());
        let id = t.session_id;

        assert_eq!(machine.elapsed_secs(), 0);
        clock.advance(Duration::from_secs(1));
        assert_eq!(machine.tick(id), Some(1));
        clock.advance(Duration::from_secs(1));
        assert_eq!(machine.tick(id), Some(2));

        let t = machine.end().unwrap();
        assert_eq!(t.to, CallPhase::Ended);
        assert_eq!(t.request, Some(OutboundRequest::EndCall));
        assert_eq!(machine.session().unwrap().ended_reason, Some(EndedReason::LocalHangup));
        assert!(!machine.is_timer_running());

        clock.advance(Duration::from_secs(10));
        assert_eq!(machine.tick(id), None);
        assert_eq!(machine.elapsed_secs(), 2);

        let t = machine.acknowledge().unwrap();
        assert_eq!(t.to, CallPhase::Idle);
        assert!(machine.session().is_none());
        assert_eq!(machine.phase(), CallPhase::Idle);
    }

    #[test]
    fn test_anonymous_callee_rejects() {
        let (mut machine, _) = ringing_callee(true);

        let session = machine.session().unwrap();
        assert_eq!(session.role, CallRole::Callee);
        assert!(session.is_anonymous);
        assert!(session.transmitter_number.is_none());
        assert_eq!(session.receiver_number, "5550000");

        let t = machine.reject().unwrap();
        assert_eq!(t.request, Some(OutboundRequest::RejectCall));
        assert_eq!(machine.session().unwrap().ended_reason, Some(EndedReason::LocalReject));
    }

    #[test]
    fn test_initiate_rejected_while_session_exists() {
        let (mut machine, _) = ringing_callee(false);

        let err = machine.initiate("5551111").unwrap_err();
        assert!(err.is_ignorable());
        assert_eq!(machine.session().unwrap().role, CallRole::Callee);

        machine.reject().unwrap();
        assert!(machine.initiate("5551111").is_err());
    }

    #[test]
    fn test_unconfigured_device_number_is_not_recorded() {
        let mut unconfigured = CallMachine::new("", Arc::new(ManualClock::default()));
        unconfigured.initiate("5551234").unwrap();

        let session = unconfigured.session().unwrap();
        assert_eq!(session.transmitter_number, None);
        assert_eq!(session.other_party_number(), Some("5551234"));
    }

    #[test]
    fn test_initiate_requires_number() {
        let (mut machine, _) = machine();

        assert_eq!(machine.initiate("   ").unwrap_err(), CallError::EmptyNumber);
        assert!(machine.session().is_none());
    }

    #[test]
    fn test_second_incoming_call_is_ignored() {
        let (mut machine, _) = ringing_callee(false);
        let first = machine.session().unwrap().id;

        assert!(machine.incoming_call("5550101", false).is_err());
        assert_eq!(machine.session().unwrap().id, first);
    }

    #[test]
    fn test_accept_outside_ringing_is_noop() {
        let (mut machine, _) = machine();
        assert!(machine.accept().is_err());
        assert!(machine.session().is_none());

        let (mut machine, _) = ringing_callee(false);
        machine.accept().unwrap();
        let before = machine.session().cloned();
        assert!(machine.accept().is_err());
        assert_eq!(machine.session().cloned(), before);
    }

    #[test]
    fn test_caller_cannot_accept_or_reject() {
        let (mut machine, _) = machine();
        machine.initiate("5551234").unwrap();

        assert!(matches!(machine.accept(), Err(CallError::RoleMismatch { .. })));
        assert!(matches!(machine.reject(), Err(CallError::RoleMismatch { .. })));
        assert_eq!(machine.phase(), CallPhase::Ringing);
    }

    #[test]
    fn test_callee_ignores_remote_accepted() {
        let (mut machine, _) = ringing_callee(false);

        assert!(machine.remote_accepted().is_err());
        assert_eq!(machine.phase(), CallPhase::Ringing);
        assert!(machine.session().unwrap().started_at.is_none());
    }

    #[test]
    fn test_started_at_set_once() {
        let (mut machine, clock) = ringing_callee(false);
        machine.accept().unwrap();
        let started = machine.session().unwrap().started_at;

        clock.advance(Duration::from_secs(5));
        let _ = machine.accept();
        let _ = machine.remote_accepted();

        assert_eq!(machine.session().unwrap().started_at, started);
    }

    #[test]
    fn test_mute_only_while_accepted() {
        let (mut machine, _) = ringing_callee(false);

        assert!(machine.set_muted(true).is_err());
        assert!(!machine.session().unwrap().is_muted);

        machine.accept().unwrap();
        let t = machine.set_muted(true).unwrap();
        assert_eq!(t.request, Some(OutboundRequest::SetMuted(true)));
        assert_eq!(t.from, t.to);
        assert!(machine.session().unwrap().is_muted);

        // Same value is not forwarded again
        assert!(machine.set_muted(true).unwrap().request.is_none());

        let t = machine.toggle_mute().unwrap();
        assert_eq!(t.request, Some(OutboundRequest::SetMuted(false)));

        machine.end().unwrap();
        assert!(machine.set_muted(true).is_err());
        assert!(!machine.session().unwrap().is_muted);
    }

    #[test]
    fn test_cancel_ringing_per_role() {
        let (mut machine, _) = machine();
        machine.initiate("5551234").unwrap();
        let t = machine.cancel().unwrap();
        assert_eq!(t.request, Some(OutboundRequest::EndCall));
        assert_eq!(machine.session().unwrap().ended_reason, Some(EndedReason::LocalHangup));

        let (mut machine, _) = ringing_callee(false);
        let t = machine.cancel().unwrap();
        assert_eq!(t.request, Some(OutboundRequest::RejectCall));
    }

    #[test]
    fn test_end_while_ringing_is_escape_hatch() {
        let (mut machine, _) = machine();
        machine.initiate("5551234").unwrap();
        machine.end().unwrap();
        assert_eq!(machine.session().unwrap().ended_reason, Some(EndedReason::LocalHangup));

        let (mut machine, _) = ringing_callee(false);
        let t = machine.end().unwrap();
        assert_eq!(t.request, Some(OutboundRequest::RejectCall));
        assert_eq!(machine.session().unwrap().ended_reason, Some(EndedReason::LocalReject));
    }

    #[test]
    fn test_remote_outcomes() {
        let (mut machine, _) = machine();
        machine.initiate("5551234").unwrap();
        machine.remote_rejected().unwrap();
        assert_eq!(machine.session().unwrap().ended_reason, Some(EndedReason::RemoteReject));

        let (mut machine, _) = ringing_callee(false);
        machine.unanswered().unwrap();
        assert_eq!(machine.session().unwrap().ended_reason, Some(EndedReason::Unanswered));

        let (mut machine, _) = ringing_callee(false);
        assert!(machine.remote_ended().is_err());
        machine.accept().unwrap();
        machine.remote_ended().unwrap();
        assert_eq!(machine.session().unwrap().ended_reason, Some(EndedReason::RemoteHangup));
    }

    #[test]
    fn test_duplicate_remote_ended_is_idempotent() {
        let (mut machine, _) = ringing_callee(false);
        machine.accept().unwrap();
        machine.remote_ended().unwrap();
        let ended = machine.session().cloned();

        assert!(machine.remote_ended().is_err());
        assert!(machine.remote_ended().is_err());
        assert!(machine.end().is_err());
        assert!(machine.reject().is_err());
        assert_eq!(machine.session().cloned(), ended);
    }

    #[test]
    fn test_call_failed_forces_end() {
        let (mut ringing, _) = machine();
        ringing.initiate("5551234").unwrap();
        ringing.call_failed().unwrap();
        assert_eq!(ringing.session().unwrap().ended_reason, Some(EndedReason::RemoteHangup));
        assert!(ringing.call_failed().is_err());

        let (mut idle, _) = machine();
        assert!(idle.call_failed().is_err());
        assert!(idle.session().is_none());
    }

    #[test]
    fn test_ring_timeout_matches_session() {
        let (mut machine, _) = machine();
        machine.initiate("5551234").unwrap();
        let id = machine.session().unwrap().id;

        assert!(machine.ring_timeout(Uuid::new_v4()).is_err());
        assert_eq!(machine.phase(), CallPhase::Ringing);

        let t = machine.ring_timeout(id).unwrap();
        assert_eq!(t.request, Some(OutboundRequest::EndCall));
        assert_eq!(machine.session().unwrap().ended_reason, Some(EndedReason::Unanswered));
    }

    #[test]
    fn test_acknowledge_only_after_end() {
        let (mut machine, _) = ringing_callee(false);
        assert!(machine.acknowledge().is_err());
        machine.accept().unwrap();
        assert!(machine.acknowledge().is_err());
        assert_eq!(machine.phase(), CallPhase::Accepted);
    }

    fn apply(machine: &mut CallMachine, step: usize) -> CallResult<Transition> {
        match step {
            0 => machine.initiate("5551234"),
            1 => machine.incoming_call("5559876", false),
            2 => machine.accept(),
            3 => machine.reject(),
            4 => machine.cancel(),
            5 => machine.end(),
            6 => machine.set_muted(true),
            7 => machine.remote_accepted(),
            8 => machine.remote_rejected(),
            9 => machine.remote_ended(),
            10 => machine.unanswered(),
            11 => machine.call_failed(),
            _ => machine.acknowledge(),
        }
    }

    #[test]
    fn test_phase_never_regresses() {
        const STEPS: usize = 13;

        // Every three-step sequence of inputs
        for first in 0..STEPS {
            for second in 0..STEPS {
                for third in 0..STEPS {
                    let (mut machine, _) = machine();
                    let mut started_at = None;

                    for step in [first, second, third] {
                        let before = machine.phase();
                        let outcome = apply(&mut machine, step);
                        let after = machine.phase();

                        match outcome {
                            Ok(t) => {
                                assert_eq!(t.from, before);
                                assert_eq!(t.to, after);
                                let reset = before == CallPhase::Ended && after == CallPhase::Idle;
                                assert!(reset || after.rank() >= before.rank());
                            }
                            Err(_) => assert_eq!(before, after),
                        }

                        match machine.session().and_then(|s| s.started_at) {
                            Some(at) => {
                                if let Some(prev) = started_at {
                                    assert_eq!(prev, at);
                                }
                                started_at = Some(at);
                            }
                            None if after == CallPhase::Idle => started_at = None,
                            None => {}
                        }
                    }
                }
            }
        }
    }
}
