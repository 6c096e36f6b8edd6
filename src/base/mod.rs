//! Base types and error handling.
//!
//! Provides the foundation shared by every other module:
//! - [`NetError`]: the crate-wide error type
//! - [`LoadState`]: transfer handle lifecycle states
//! - [`global`]: process-wide engine initialization and capabilities

pub mod context;
pub mod global;
pub mod loadstate;
pub mod neterror;

pub use loadstate::LoadState;
pub use neterror::NetError;

#[cfg(test)]
mod tests;
