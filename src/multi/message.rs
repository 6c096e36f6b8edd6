//! Completion events.

use crate::base::neterror::NetError;
use crate::sys;

/// One finished transfer, as reported by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionEvent {
    /// Correlation tag of the handle, if it had one.
    pub tag: Option<u64>,
    /// Engine result code of the transfer.
    pub code: i32,
}

impl CompletionEvent {
    pub fn is_success(&self) -> bool {
        self.code == sys::CURLE_OK
    }

    /// The transfer outcome as a `Result`.
    pub fn result(&self) -> Result<(), NetError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(NetError::transfer(self.code))
        }
    }
}
