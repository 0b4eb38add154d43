use dioxus::prelude::*;

use crate::call::{CallControls, ScreenKind};
use crate::components::common::RoundButton;
use crate::state::{
    accept_call, cancel_call, dismiss_call, end_call, minimize_call_screen, reject_call, toggle_mute, CALL_VIEW,
};

/// Full-screen call page: who, direction, status and the controls for the current phase
#[component]
pub fn CallScreen() -> Element {
    let view = CALL_VIEW.read().clone();

    if !view.is_visible() {
        return rsx! {};
    }

    let party = view.party;
    // Skip the number line when the label already is the number
    let number = party
        .number
        .clone()
        .filter(|n| *n != party.label)
        .unwrap_or_default();

    let status_class = match view.screen {
        ScreenKind::Connected => "call-status call-status-active",
        ScreenKind::Ended(_) => "call-status call-status-ended",
        _ => "call-status call-status-pending",
    };
    let can_minimize = matches!(view.screen, ScreenKind::Outgoing | ScreenKind::Connected);

    rsx! {
        div { class: "call-screen",
            div { class: "call-header",
                span { class: "call-direction", "{view.direction_label}" }
                if can_minimize {
                    button {
                        class: "call-minimize",
                        title: "Minimize",
                        onclick: move |_| minimize_call_screen(),
                        "\u{2304}"
                    }
                }
            }

            div { class: "call-party",
                img { class: "call-avatar", src: "{party.avatar_url}", alt: "{party.label}" }
                div { class: "call-label", "{party.label}" }
                if !number.is_empty() {
                    div { class: "call-number", "{number}" }
                }
                div { class: "{status_class}", "{view.status_text}" }
            }

            CallActions {
                controls: view.controls,
                is_muted: view.is_muted,
                outgoing: view.screen == ScreenKind::Outgoing,
            }
        }
    }
}

#[component]
fn CallActions(controls: CallControls, is_muted: bool, outgoing: bool) -> Element {
    rsx! {
        div { class: "call-actions",
            if controls.mute {
                RoundButton {
                    variant: if is_muted { "active".to_string() } else { "neutral".to_string() },
                    title: if is_muted { "Unmute".to_string() } else { "Mute".to_string() },
                    onclick: move |_| toggle_mute(),
                    if is_muted { "\u{1F507}" } else { "\u{1F50A}" }
                }
            }
            if controls.reject {
                RoundButton {
                    variant: "reject",
                    title: "Decline",
                    onclick: move |_| reject_call(),
                    "\u{2715}"
                }
            }
            if controls.accept {
                RoundButton {
                    variant: "accept",
                    title: "Answer",
                    onclick: move |_| accept_call(),
                    "\u{1F4DE}"
                }
            }
            if controls.end {
                RoundButton {
                    variant: "reject",
                    title: "Hang up",
                    onclick: move |_| if outgoing { cancel_call() } else { end_call() },
                    "\u{1F4F5}"
                }
            }
            if controls.dismiss {
                RoundButton {
                    title: "Close",
                    onclick: move |_| dismiss_call(),
                    "OK"
                }
            }
        }
    }
}
