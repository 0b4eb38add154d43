use std::sync::{Arc, OnceLock};

use dioxus::prelude::*;
use tokio_stream::{wrappers::WatchStream, StreamExt};

use super::ui::{restore_call_screen, show_notification, NotificationType};
use crate::api::ContactResolver;
use crate::call::{CallCommand, CallHandle, CallResult, CallView};

/// Read-only projection of the current call, refreshed from controller snapshots
pub static CALL_VIEW: GlobalSignal<CallView> = Signal::global(CallView::default);

struct CallBinding {
    handle: CallHandle,
    contacts: Arc<dyn ContactResolver>,
}

static CALL_BINDING: OnceLock<CallBinding> = OnceLock::new();

/// Connect the UI to a running controller. Only the first call takes effect.
pub fn init_call_binding(handle: CallHandle, contacts: Arc<dyn ContactResolver>) -> bool {
    CALL_BINDING.set(CallBinding { handle, contacts }).is_ok()
}

/// Run a user action against the controller, surfacing failures as a toast
fn with_calls(action: impl FnOnce(&CallHandle) -> CallResult<()>) {
    let Some(binding) = CALL_BINDING.get() else {
        tracing::warn!("Call controller not bound, dropping user action");
        show_notification("Phone is still starting", NotificationType::Warning);
        return;
    };

    if let Err(e) = action(&binding.handle) {
        tracing::error!("Failed to send call command: {}", e);
        show_notification(&e.to_string(), NotificationType::Error);
    }
}

pub fn send_command(command: CallCommand) {
    with_calls(|calls| calls.command(command));
}

pub fn start_call(number: String) {
    with_calls(|calls| calls.initiate(number));
}

pub fn accept_call() {
    with_calls(CallHandle::accept);
}

pub fn reject_call() {
    with_calls(CallHandle::reject);
}

/// Give up on our own outgoing call before it is answered
pub fn cancel_call() {
    with_calls(CallHandle::cancel);
}

pub fn end_call() {
    with_calls(CallHandle::end);
}

pub fn toggle_mute() {
    with_calls(CallHandle::toggle_mute);
}

pub fn dismiss_call() {
    with_calls(CallHandle::acknowledge);
}

/// Mirror controller snapshots into `CALL_VIEW` until the controller stops.
/// Transport notices are shown as a toast once and then cleared.
pub async fn watch_calls() {
    let Some(binding) = CALL_BINDING.get() else {
        tracing::warn!("Call controller not bound, call screen will stay idle");
        return;
    };

    let mut updates = WatchStream::new(binding.handle.subscribe());
    let mut was_visible = false;
    while let Some(snapshot) = updates.next().await {
        let view = CallView::project(&snapshot, binding.contacts.as_ref());

        // A new call always opens the full call screen
        if view.is_visible() && !was_visible {
            restore_call_screen();
        }
        was_visible = view.is_visible();

        if let Some(notice) = &view.notice {
            show_notification(notice, NotificationType::Error);
            send_command(CallCommand::DismissNotice);
        }

        *CALL_VIEW.write() = view;
    }

    tracing::info!("Call snapshot stream closed");
}
