use dioxus::prelude::*;
use crate::state::{backspace, clear_dial, place_call, press_key, set_dial, CALL_VIEW, DIAL_BUFFER};

const DIAL_KEYS: [(char, &str); 12] = [
    ('1', ""),
    ('2', "ABC"),
    ('3', "DEF"),
    ('4', "GHI"),
    ('5', "JKL"),
    ('6', "MNO"),
    ('7', "PQRS"),
    ('8', "TUV"),
    ('9', "WXYZ"),
    ('*', ""),
    ('0', "+"),
    ('#', ""),
];

/// Play the DTMF tone for a key using the Web Audio API
#[cfg(target_arch = "wasm32")]
fn play_dtmf_tone(key: char) {
    use web_sys::{AudioContext, OscillatorType};

    // DTMF frequencies (low, high)
    let (low_freq, high_freq) = match key {
        '1' => (697.0, 1209.0),
        '2' => (697.0, 1336.0),
        '3' => (697.0, 1477.0),
        '4' => (770.0, 1209.0),
        '5' => (770.0, 1336.0),
        '6' => (770.0, 1477.0),
        '7' => (852.0, 1209.0),
        '8' => (852.0, 1336.0),
        '9' => (852.0, 1477.0),
        '*' => (941.0, 1209.0),
        '0' => (941.0, 1336.0),
        '#' => (941.0, 1477.0),
        _ => return,
    };

    let Ok(ctx) = AudioContext::new() else {
        return;
    };
    let stop_at = ctx.current_time() + 0.15;

    if let Ok(gain) = ctx.create_gain() {
        gain.gain().set_value(0.1);
        let _ = gain.connect_with_audio_node(&ctx.destination());

        for freq in [low_freq, high_freq] {
            if let Ok(osc) = ctx.create_oscillator() {
                osc.set_type(OscillatorType::Sine);
                osc.frequency().set_value(freq as f32);
                let _ = osc.connect_with_audio_node(&gain);
                let _ = osc.start();
                let _ = osc.stop_with_when(stop_at);
            }
        }
    }
}

fn key_pressed(key: char) {
    #[cfg(target_arch = "wasm32")]
    play_dtmf_tone(key);
    press_key(key);
}

#[component]
pub fn DialPad() -> Element {
    let number = DIAL_BUFFER.read().as_str().to_string();
    let in_call = CALL_VIEW.read().is_visible();

    rsx! {
        div { class: "dial-pad",
            // Display
            div { class: "dial-display",
                input {
                    class: "dial-input",
                    r#type: "tel",
                    value: "{number}",
                    placeholder: "Enter number",
                    oninput: move |e| set_dial(&e.value()),
                }
            }

            div { class: "dial-grid",
                for (digit, letters) in DIAL_KEYS {
                    DialButton {
                        key: "{digit}",
                        digit: digit,
                        letters: letters,
                        on_click: move |_| key_pressed(digit),
                    }
                }
            }

            div { class: "dial-actions",
                button {
                    class: "dial-secondary",
                    onclick: move |_| clear_dial(),
                    title: "Clear",
                    "C"
                }

                button {
                    class: "dial-call",
                    disabled: number.is_empty() || in_call,
                    onclick: move |_| place_call(),
                    title: "Call",
                    "\u{1F4DE}"
                }

                button {
                    class: "dial-secondary",
                    onclick: move |_| backspace(),
                    title: "Backspace",
                    "\u{232B}"
                }
            }
        }
    }
}

#[component]
fn DialButton(digit: char, letters: &'static str, on_click: EventHandler<MouseEvent>) -> Element {
    rsx! {
        button {
            class: "dial-key",
            onclick: move |e| on_click.call(e),
            span { class: "dial-digit", "{digit}" }
            if !letters.is_empty() {
                span { class: "dial-letters", "{letters}" }
            }
        }
    }
}
