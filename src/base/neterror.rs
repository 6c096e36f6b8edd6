use crate::sys;
use std::ffi::CStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum NetError {
    // Allocation
    #[error("Allocation failed: {0}")]
    OutOfMemory(&'static str),

    // Engine-reported failures
    #[error("Transfer error {code}: {message}")]
    Transfer { code: i32, message: String },
    #[error("Scheduler error {code}: {message}")]
    Scheduler { code: i32, message: String },
    #[error("Engine initialization failed with code {0}")]
    InitFailed(i32),
    #[error("Engine still in use by {0} handle(s)")]
    HandlesOutstanding(usize),

    // Option and info validation
    #[error("String contains an interior NUL byte")]
    InteriorNul,
    #[error("Path is not representable as an engine string")]
    InvalidPath,
    #[error("Option {option} expects a {expected} value, got {actual}")]
    OptionKindMismatch {
        option: u32,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("Option {0} is managed by the handle")]
    ReservedOption(u32),
    #[error("Value {value} does not fit option {option}")]
    ValueOutOfRange { option: u32, value: i64 },
    #[error("Tag {0} does not fit a pointer-sized slot")]
    TagOutOfRange(u64),
    #[error("Info {info} is not a {requested} value")]
    InfoKindMismatch { info: u32, requested: &'static str },

    // Handle state
    #[error("Handle is attached to a scheduler")]
    HandleAttached,
    #[error("Mime tree was created for a different handle")]
    MimeOwnerMismatch,
    #[error("Mime tree contents were already transferred to a handle")]
    MimeTransferred,
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // WebSocket
    #[error("WebSocket support is not available in the linked engine")]
    WsUnsupported,
    #[error("WebSocket upgrade not completed (status {0})")]
    WsNotUpgraded(i64),
}

impl NetError {
    /// Builds a transfer error from an easy-interface result code.
    pub fn transfer(code: i32) -> Self {
        if code == sys::CURLE_OUT_OF_MEMORY {
            return NetError::OutOfMemory("transfer engine");
        }
        // SAFETY: curl_easy_strerror returns a static NUL-terminated string for any code.
        let message = unsafe { CStr::from_ptr(curl_sys::curl_easy_strerror(code as _)) };
        NetError::Transfer {
            code,
            message: message.to_string_lossy().into_owned(),
        }
    }

    /// Builds a scheduler error from a multi-interface result code.
    pub fn scheduler(code: i32) -> Self {
        if code == sys::CURLM_OUT_OF_MEMORY {
            return NetError::OutOfMemory("scheduler");
        }
        // SAFETY: curl_multi_strerror returns a static NUL-terminated string for any code.
        let message = unsafe { CStr::from_ptr(curl_sys::curl_multi_strerror(code as _)) };
        NetError::Scheduler {
            code,
            message: message.to_string_lossy().into_owned(),
        }
    }

    /// The engine's numeric code, for errors the engine reported.
    pub fn code(&self) -> Option<i32> {
        match self {
            NetError::Transfer { code, .. } | NetError::Scheduler { code, .. } => Some(*code),
            NetError::InitFailed(code) => Some(*code),
            _ => None,
        }
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self, NetError::Transfer { .. })
    }

    pub fn is_scheduler(&self) -> bool {
        matches!(self, NetError::Scheduler { .. })
    }

    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, NetError::OutOfMemory(_))
    }
}
