//! Concurrent transfers.
//!
//! - [`MultiScheduler`]: drives many attached handles without blocking
//! - [`CompletionEvent`]: `(tag, result code)` of one finished transfer

pub mod message;
pub mod scheduler;

pub use message::CompletionEvent;
pub use scheduler::MultiScheduler;
