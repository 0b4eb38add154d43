use dioxus::prelude::*;

use super::calls::start_call;

/// Number being typed on the dial pad
pub static DIAL_BUFFER: GlobalSignal<DialBuffer> = Signal::global(DialBuffer::default);

/// Longest number the pad accepts
pub const MAX_DIAL_LEN: usize = 20;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialBuffer {
    digits: String,
}

impl DialBuffer {
    /// Append a key. Accepts digits, `*` and `#`; `+` only as the first character.
    pub fn push(&mut self, key: char) -> bool {
        if self.digits.chars().count() >= MAX_DIAL_LEN {
            return false;
        }
        let accepted = match key {
            '0'..='9' | '*' | '#' => true,
            '+' => self.digits.is_empty(),
            _ => false,
        };
        if accepted {
            self.digits.push(key);
        }
        accepted
    }

    pub fn backspace(&mut self) {
        self.digits.pop();
    }

    pub fn clear(&mut self) {
        self.digits.clear();
    }

    /// Replace the buffer with pasted or contact-picked text, keeping valid keys
    pub fn set(&mut self, value: &str) {
        self.clear();
        for key in value.trim().chars() {
            self.push(key);
        }
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    /// Take the number for dialing, leaving the buffer empty. `None` when nothing was typed.
    pub fn take_number(&mut self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.digits))
    }
}

pub fn press_key(key: char) {
    DIAL_BUFFER.write().push(key);
}

pub fn backspace() {
    DIAL_BUFFER.write().backspace();
}

pub fn clear_dial() {
    DIAL_BUFFER.write().clear();
}

pub fn set_dial(value: &str) {
    DIAL_BUFFER.write().set(value);
}

/// Dial whatever is in the buffer. Does nothing when it is empty.
pub fn place_call() {
    let number = DIAL_BUFFER.write().take_number();
    if let Some(number) = number {
        tracing::info!("Dialing {}", number);
        start_call(number);
    }
}
