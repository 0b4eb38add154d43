//! Presentation Binding
//!
//! Pure projections from a `CallSnapshot` to what the call screen and the
//! dynamic island render. Nothing here mutates the session.

use serde::Serialize;

use super::controller::CallSnapshot;
use super::timer::format_elapsed;
use crate::api::ContactResolver;
use crate::models::{CallPhase, CallRole, CallSession, EndedReason};

pub const ANONYMOUS_LABEL: &str = "Anonymous";
pub const DEFAULT_AVATAR: &str =
    "https://www.gravatar.com/avatar/00000000000000000000000000000000?d=mp&f=y&s=256";

const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScreenKind {
    #[default]
    Hidden,
    Outgoing,
    Incoming,
    Connected,
    Ended(EndedReason),
}

/// Who is on the other end, as shown to the user
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PartyDisplay {
    pub label: String,
    /// Raw number; `None` for withheld callers
    pub number: Option<String>,
    #[serde(rename = "avatarUrl")]
    pub avatar_url: String,
    #[serde(rename = "isAnonymous")]
    pub is_anonymous: bool,
}

impl PartyDisplay {
    fn anonymous() -> Self {
        Self {
            label: ANONYMOUS_LABEL.to_string(),
            number: None,
            avatar_url: DEFAULT_AVATAR.to_string(),
            is_anonymous: true,
        }
    }

    fn resolve(session: &CallSession, resolver: &dyn ContactResolver) -> Self {
        if session.role == CallRole::Callee && session.is_anonymous {
            return Self::anonymous();
        }

        let number = session
            .other_party_number()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        let Some(number) = number else {
            return Self {
                label: UNKNOWN_LABEL.to_string(),
                number: None,
                avatar_url: DEFAULT_AVATAR.to_string(),
                is_anonymous: false,
            };
        };

        match resolver.lookup(number) {
            Ok(contact) => Self {
                label: contact.display_name,
                number: Some(number.to_string()),
                avatar_url: contact.avatar_url.unwrap_or_else(|| DEFAULT_AVATAR.to_string()),
                is_anonymous: false,
            },
            Err(e) => {
                tracing::trace!("{}, showing raw number", e);
                Self {
                    label: number.to_string(),
                    number: Some(number.to_string()),
                    avatar_url: DEFAULT_AVATAR.to_string(),
                    is_anonymous: false,
                }
            }
        }
    }
}

/// Which buttons the call screen offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CallControls {
    pub accept: bool,
    pub reject: bool,
    pub end: bool,
    pub mute: bool,
    pub dismiss: bool,
}

impl CallControls {
    fn for_screen(screen: ScreenKind) -> Self {
        match screen {
            ScreenKind::Hidden => Self::default(),
            ScreenKind::Incoming => Self {
                accept: true,
                reject: true,
                ..Self::default()
            },
            ScreenKind::Outgoing => Self {
                end: true,
                ..Self::default()
            },
            ScreenKind::Connected => Self {
                end: true,
                mute: true,
                ..Self::default()
            },
            ScreenKind::Ended(_) => Self {
                dismiss: true,
                ..Self::default()
            },
        }
    }
}

/// Compact indicator shown at the top of the phone frame
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum IslandView {
    #[default]
    Idle,
    Ringing { label: String },
    Active { label: String, elapsed: String },
}

/// Everything the call UI renders for one snapshot
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CallView {
    pub screen: ScreenKind,
    pub party: PartyDisplay,
    #[serde(rename = "directionLabel")]
    pub direction_label: String,
    #[serde(rename = "statusText")]
    pub status_text: String,
    pub controls: CallControls,
    pub island: IslandView,
    #[serde(rename = "isMuted")]
    pub is_muted: bool,
    pub notice: Option<String>,
}

impl CallView {
    pub fn project(snapshot: &CallSnapshot, resolver: &dyn ContactResolver) -> Self {
        let Some(session) = snapshot.session.as_ref() else {
            return Self {
                notice: snapshot.notice.clone(),
                ..Self::default()
            };
        };

        let screen = screen_for(session);
        let party = PartyDisplay::resolve(session, resolver);

        let direction_label = match session.role {
            CallRole::Caller => "Outgoing call",
            CallRole::Callee => "Incoming call",
        }
        .to_string();

        let status_text = match screen {
            ScreenKind::Hidden => String::new(),
            ScreenKind::Outgoing => "Calling...".to_string(),
            ScreenKind::Incoming => "Incoming call".to_string(),
            ScreenKind::Connected => format_elapsed(snapshot.elapsed_secs),
            ScreenKind::Ended(reason) => reason.display_name().to_string(),
        };

        let island = match screen {
            ScreenKind::Outgoing | ScreenKind::Incoming => IslandView::Ringing {
                label: party.label.clone(),
            },
            ScreenKind::Connected => IslandView::Active {
                label: party.label.clone(),
                elapsed: format_elapsed(snapshot.elapsed_secs),
            },
            ScreenKind::Hidden | ScreenKind::Ended(_) => IslandView::Idle,
        };

        Self {
            screen,
            party,
            direction_label,
            status_text,
            controls: CallControls::for_screen(screen),
            island,
            is_muted: session.is_muted,
            notice: snapshot.notice.clone(),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.screen != ScreenKind::Hidden
    }
}

fn screen_for(session: &CallSession) -> ScreenKind {
    match (session.phase, session.role) {
        (CallPhase::Idle, _) => ScreenKind::Hidden,
        (CallPhase::Ringing, CallRole::Caller) => ScreenKind::Outgoing,
        (CallPhase::Ringing, CallRole::Callee) => ScreenKind::Incoming,
        (CallPhase::Accepted, _) => ScreenKind::Connected,
        // Sessions only end through `finish`, which always records a reason
        (CallPhase::Ended, _) => ScreenKind::Ended(session.ended_reason.unwrap_or(EndedReason::LocalHangup)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ContactDirectory;
    use crate::models::Contact;
    use chrono::Utc;

    fn directory() -> ContactDirectory {
        ContactDirectory::from_contacts(vec![Contact {
            id: 7,
            display: "Mia".to_string(),
            number: "555-1234".to_string(),
            avatar: Some("https://cdn.example/mia.png".to_string()),
        }])
    }

    fn snapshot(session: CallSession, elapsed_secs: u64) -> CallSnapshot {
        CallSnapshot {
            session: Some(session),
            elapsed_secs,
            notice: None,
            revision: 1,
        }
    }

    #[test]
    fn test_idle_is_hidden() {
        let view = CallView::project(&CallSnapshot::default(), &directory());
        assert_eq!(view.screen, ScreenKind::Hidden);
        assert_eq!(view.controls, CallControls::default());
        assert_eq!(view.island, IslandView::Idle);
        assert!(!view.is_visible());
    }

    #[test]
    fn test_outgoing_resolves_contact() {
        let session = CallSession::outgoing("5550001".into(), "5551234".into(), Utc::now());
        let view = CallView::project(&snapshot(session, 0), &directory());

        assert_eq!(view.screen, ScreenKind::Outgoing);
        assert_eq!(view.party.label, "Mia");
        assert_eq!(view.party.avatar_url, "https://cdn.example/mia.png");
        assert_eq!(view.direction_label, "Outgoing call");
        assert_eq!(view.status_text, "Calling...");
        assert!(view.controls.end);
        assert!(!view.controls.accept);
        assert_eq!(view.island, IslandView::Ringing { label: "Mia".into() });
    }

    #[test]
    fn test_unknown_number_falls_back_to_raw() {
        let session = CallSession::incoming("5559876".into(), "5550001".into(), false, Utc::now());
        let view = CallView::project(&snapshot(session, 0), &directory());

        assert_eq!(view.screen, ScreenKind::Incoming);
        assert_eq!(view.party.label, "5559876");
        assert_eq!(view.party.avatar_url, DEFAULT_AVATAR);
        assert_eq!(view.direction_label, "Incoming call");
        assert!(view.controls.accept && view.controls.reject);
        assert!(!view.controls.end);
    }

    #[test]
    fn test_anonymous_callee_skips_lookup() {
        // Even a number that is in the directory stays hidden
        let session = CallSession::incoming("5551234".into(), "5550001".into(), true, Utc::now());
        let view = CallView::project(&snapshot(session, 0), &directory());

        assert_eq!(view.party.label, ANONYMOUS_LABEL);
        assert_eq!(view.party.number, None);
        assert_eq!(view.party.avatar_url, DEFAULT_AVATAR);
        assert!(view.party.is_anonymous);
    }

    #[test]
    fn test_connected_shows_elapsed_and_mute() {
        let mut session = CallSession::outgoing("5550001".into(), "5551234".into(), Utc::now());
        session.phase = CallPhase::Accepted;
        session.is_muted = true;
        let view = CallView::project(&snapshot(session, 3725), &directory());

        assert_eq!(view.screen, ScreenKind::Connected);
        assert_eq!(view.status_text, "01:02:05");
        assert!(view.controls.end && view.controls.mute);
        assert!(view.is_muted);
        assert_eq!(
            view.island,
            IslandView::Active { label: "Mia".into(), elapsed: "01:02:05".into() }
        );
    }

    #[test]
    fn test_ended_shows_reason() {
        let mut session = CallSession::incoming("5559876".into(), "5550001".into(), false, Utc::now());
        session.phase = CallPhase::Ended;
        session.ended_reason = Some(EndedReason::Unanswered);
        let view = CallView::project(&snapshot(session, 0), &directory());

        assert_eq!(view.screen, ScreenKind::Ended(EndedReason::Unanswered));
        assert_eq!(view.status_text, "No answer");
        assert_eq!(view.controls, CallControls { dismiss: true, ..CallControls::default() });
        assert_eq!(view.island, IslandView::Idle);
    }

    #[test]
    fn test_empty_number_shows_unknown() {
        let session = CallSession::incoming("  ".into(), "5550001".into(), false, Utc::now());
        let view = CallView::project(&snapshot(session, 0), &directory());
        assert_eq!(view.party.label, "Unknown");
        assert_eq!(view.party.number, None);
    }

    #[test]
    fn test_notice_carried_through() {
        let snapshot = CallSnapshot {
            notice: Some("Phone service unavailable: timeout".into()),
            ..CallSnapshot::default()
        };
        let view = CallView::project(&snapshot, &directory());
        assert_eq!(view.notice.as_deref(), Some("Phone service unavailable: timeout"));
    }
}
