//! Phone Overlay - In-game smartphone call screen
//!
//! Dioxus front end for the phone overlay's call lifecycle: dialing,
//! ringing, connected and ended screens driven by a single call controller.
//!
//! Native builds also run a local event bridge server; `--server` runs it headless.

mod api;
mod call;
mod components;
mod config;
mod models;
mod state;

#[cfg(not(target_arch = "wasm32"))]
mod server;

use std::sync::Arc;

use dioxus::prelude::*;

use api::{ApiClient, ApiError, ContactDirectory, NuiCallTransport};
use call::{CallController, CallHandle, SystemClock};
use components::{
    common::Notification,
    phone::{CallScreen, DialPad, DynamicIsland},
};
use config::PhoneConfig;
use state::{CALL_VIEW, UI_STATE};

/// Everything the call core needs, wired from configuration
struct PhoneServices {
    controller: CallController,
    handle: CallHandle,
    client: ApiClient,
    contacts: Arc<ContactDirectory>,
}

fn build_services(config: &PhoneConfig) -> Result<PhoneServices, ApiError> {
    let client = ApiClient::new(&config.nui_base_url, config.request_timeout())?;
    tracing::info!("Phone bridge at {}", client.base_url());
    let transport = Arc::new(NuiCallTransport::new(client.clone()));
    let (controller, handle) = CallController::new(config, transport, Arc::new(SystemClock));

    Ok(PhoneServices {
        controller,
        handle,
        client,
        contacts: Arc::new(ContactDirectory::new()),
    })
}

async fn load_contacts(client: ApiClient, contacts: Arc<ContactDirectory>) {
    if let Err(e) = contacts.load(&client).await {
        tracing::warn!("Contact list unavailable, showing raw numbers: {}", e);
    }
}

fn main() {
    // On wasm, wire the browser message listener and run the app
    #[cfg(target_arch = "wasm32")]
    {
        let config = PhoneConfig::from_page_url();
        if let Err(e) = config.validate() {
            tracing::error!("Invalid phone configuration: {}", e);
            return;
        }
        let services = match build_services(&config) {
            Ok(services) => services,
            Err(e) => {
                tracing::error!("Failed to start phone services: {}", e);
                return;
            }
        };

        state::init_call_binding(services.handle.clone(), services.contacts.clone());
        if let Err(e) = api::messages::listen_for_messages(call::InboundAdapter::new(services.handle)) {
            tracing::error!("Failed to listen for NUI messages: {}", e);
        }

        wasm_bindgen_futures::spawn_local(services.controller.run());
        wasm_bindgen_futures::spawn_local(load_contacts(services.client, services.contacts));

        run_app();
    }

    // On native, handle server vs app mode
    #[cfg(not(target_arch = "wasm32"))]
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = "phone_overlay=info".parse::<tracing_subscriber::filter::Directive>() {
            filter = filter.add_directive(directive);
        }
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(filter)
            .init();

        // Load environment variables
        dotenvy::dotenv().ok();

        let config = PhoneConfig::from_env();
        if let Err(e) = config.validate() {
            tracing::error!("Invalid phone configuration: {}", e);
            std::process::exit(1);
        }

        let services = match build_services(&config) {
            Ok(services) => services,
            Err(e) => {
                tracing::error!("Failed to start phone services: {}", e);
                std::process::exit(1);
            }
        };

        let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!("Failed to start async runtime: {}", e);
                std::process::exit(1);
            }
        };

        // Determine run mode
        let args: Vec<String> = std::env::args().collect();

        if args.contains(&"--server".to_string()) {
            // Run bridge only
            runtime.block_on(async move {
                if let Err(e) = run_services(services, config.bridge_port).await {
                    tracing::error!("Server error: {}", e);
                }
            });
        } else {
            // Run call screen with the call core on a background thread
            state::init_call_binding(services.handle.clone(), services.contacts.clone());

            std::thread::spawn(move || {
                runtime.block_on(async move {
                    tracing::info!("Starting embedded bridge on port {}", config.bridge_port);
                    if let Err(e) = run_services(services, config.bridge_port).await {
                        tracing::error!("Embedded bridge error: {}", e);
                    }
                });
            });

            run_app();
        }
    }
}

/// Run the controller, contact load and bridge server until the server stops
#[cfg(not(target_arch = "wasm32"))]
async fn run_services(services: PhoneServices, port: u16) -> anyhow::Result<()> {
    let PhoneServices { controller, handle, client, contacts } = services;

    tokio::spawn(controller.run());
    tokio::spawn(load_contacts(client, contacts.clone()));

    let result = server::run_server(port, server::BridgeState::new(handle.clone(), contacts)).await;
    handle.shutdown();
    result
}

fn run_app() {
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    // Mirror controller snapshots into the call view signal
    use_hook(|| {
        spawn(state::watch_calls());
    });

    let call_visible = CALL_VIEW.read().is_visible();
    let minimized = UI_STATE.read().call_screen_minimized;

    rsx! {
        // Global styles
        style { {include_str!("../assets/styles.css")} }

        div { class: "phone-frame",
            DynamicIsland {}

            // Notification toast
            Notification {}

            div { class: "phone-screen",
                if call_visible && !minimized {
                    CallScreen {}
                } else {
                    DialPad {}
                }
            }
        }
    }
}
