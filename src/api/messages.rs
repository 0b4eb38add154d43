//! Browser listener for NUI messages pushed by the game client

use futures::channel::mpsc;
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::MessageEvent;

use crate::call::{CallError, CallResult, InboundAdapter};

/// Forward `window` message events into the controller through `adapter`
pub fn listen_for_messages(adapter: InboundAdapter) -> CallResult<()> {
    let window = web_sys::window()
        .ok_or_else(|| CallError::TransportUnavailable("no browser window".to_string()))?;
    let (tx, rx) = mpsc::unbounded::<String>();

    let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
        let data = event.data();
        let raw = match data.as_string() {
            Some(raw) => Some(raw),
            None => js_sys::JSON::stringify(&data).ok().map(String::from),
        };
        if let Some(raw) = raw {
            let _ = tx.unbounded_send(raw);
        }
    });

    window
        .add_event_listener_with_callback("message", on_message.as_ref().unchecked_ref())
        .map_err(|e| CallError::TransportUnavailable(format!("{:?}", e)))?;
    // Listener lives as long as the page
    on_message.forget();

    wasm_bindgen_futures::spawn_local(async move {
        let forwarded = adapter.pump(rx).await;
        tracing::info!("NUI message listener stopped after {} events", forwarded);
    });

    Ok(())
}
