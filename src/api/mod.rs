pub mod client;
pub mod calls;
pub mod contacts;
#[cfg(target_arch = "wasm32")]
pub mod messages;

pub use client::*;
pub use calls::{CallTransport, NuiCallTransport};
pub use contacts::{ContactDirectory, ContactResolver};
