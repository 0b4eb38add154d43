pub mod calls;
pub mod dialer;
pub mod ui;

pub use calls::*;
pub use dialer::*;
pub use ui::*;
