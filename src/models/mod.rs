pub mod call;
pub mod contact;

pub use call::*;
pub use contact::*;
