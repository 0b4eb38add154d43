mod call_screen;
mod dialer;
mod island;

pub use call_screen::*;
pub use dialer::*;
pub use island::*;
