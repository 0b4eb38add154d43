use dioxus::prelude::*;
use crate::state::{UI_STATE, NotificationType};

/// How long a toast stays up before it clears itself
const NOTIFICATION_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(4);

#[component]
pub fn Notification() -> Element {
    let notification = UI_STATE.read().notification.clone();

    // Auto-dismiss
    {
        let has_notification = notification.is_some();
        use_effect(move || {
            if has_notification {
                spawn(async move {
                    crate::call::runtime::sleep(NOTIFICATION_TIMEOUT).await;
                    crate::state::clear_notification();
                });
            }
        });
    }

    if let Some(notif) = notification {
        let color_class = notif.notification_type.color_class();
        let icon = match notif.notification_type {
            NotificationType::Error => "\u{274C}",
            NotificationType::Warning => "\u{26A0}",
        };
        rsx! {
            div { class: "toast {color_class}",
                span { class: "toast-icon", "{icon}" }
                p { class: "toast-message", "{notif.message}" }
                button {
                    class: "toast-close",
                    onclick: move |_| {
                        crate::state::clear_notification();
                    },
                    "\u{2715}"
                }
            }
        }
    } else {
        rsx! {}
    }
}

/// Round icon button used across the call screen and dial pad
#[component]
pub fn RoundButton(
    onclick: EventHandler<MouseEvent>,
    children: Element,
    #[props(default = "neutral".to_string())]
    variant: String,
    #[props(default = false)]
    disabled: bool,
    #[props(default = "".to_string())]
    title: String,
) -> Element {
    let class = match variant.as_str() {
        "accept" => "round-button round-accept",
        "reject" => "round-button round-reject",
        "active" => "round-button round-active",
        _ => "round-button round-neutral",
    };

    rsx! {
        button {
            class: "{class}",
            disabled: disabled,
            title: "{title}",
            onclick: move |e| onclick.call(e),
            {children}
        }
    }
}
