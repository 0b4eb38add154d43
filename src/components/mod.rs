pub mod common;
pub mod phone;
