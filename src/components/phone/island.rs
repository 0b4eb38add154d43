use dioxus::prelude::*;

use crate::call::IslandView;
use crate::state::{restore_call_screen, CALL_VIEW};

/// Compact call indicator at the top of the phone frame. Tapping it reopens the call screen.
#[component]
pub fn DynamicIsland() -> Element {
    let island = CALL_VIEW.read().island.clone();

    match island {
        IslandView::Idle => rsx! {
            div { class: "island" }
        },
        IslandView::Ringing { label } => rsx! {
            div {
                class: "island island-expanded island-ringing",
                onclick: move |_| restore_call_screen(),
                span { class: "island-dot" }
                span { class: "island-label", "{label}" }
            }
        },
        IslandView::Active { label, elapsed } => rsx! {
            div {
                class: "island island-expanded island-active",
                onclick: move |_| restore_call_screen(),
                span { class: "island-dot" }
                span { class: "island-label", "{label}" }
                span { class: "island-timer", "{elapsed}" }
            }
        },
    }
}
