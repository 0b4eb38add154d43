use dioxus::prelude::*;

/// Global UI state
pub static UI_STATE: GlobalSignal<UiState> = Signal::global(UiState::default);

#[derive(Clone, Default)]
pub struct UiState {
    /// When false an active call collapses into the dynamic island
    pub call_screen_minimized: bool,
    pub notification: Option<Notification>,
}

#[derive(Clone)]
pub struct Notification {
    pub message: String,
    pub notification_type: NotificationType,
}

#[derive(Clone, PartialEq)]
pub enum NotificationType {
    Error,
    Warning,
}

impl NotificationType {
    pub fn color_class(&self) -> &str {
        match self {
            NotificationType::Error => "toast-error",
            NotificationType::Warning => "toast-warning",
        }
    }
}

pub fn minimize_call_screen() {
    UI_STATE.write().call_screen_minimized = true;
}

pub fn restore_call_screen() {
    UI_STATE.write().call_screen_minimized = false;
}

pub fn show_notification(message: &str, notification_type: NotificationType) {
    UI_STATE.write().notification = Some(Notification {
        message: message.to_string(),
        notification_type,
    });
}

pub fn clear_notification() {
    UI_STATE.write().notification = None;
}
