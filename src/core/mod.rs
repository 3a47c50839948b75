//! Core Module - Leadership decision procedure

pub mod discovery;
pub mod leader;
pub mod majority;

pub use discovery::*;
pub use leader::*;
pub use majority::*;
