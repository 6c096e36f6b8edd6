//! Process-wide engine state.
//!
//! The engine needs one global initialization before any handle exists and
//! one teardown after the last handle is gone. Initialization happens lazily
//! the first time a handle or scheduler is created; teardown is explicit via
//! [`cleanup`] and is refused while anything still holds the engine.
//!
//! Optional capabilities (currently websocket framing) are probed once and
//! cached for the life of the process.

use crate::base::neterror::NetError;
use crate::sys::{self, WsRecvFn, WsSendFn};
use once_cell::sync::OnceCell;
use std::ffi::CStr;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

static READY: AtomicBool = AtomicBool::new(false);
static LIVE: AtomicUsize = AtomicUsize::new(0);
static LOCK: Mutex<()> = Mutex::new(());
static WS_API: OnceCell<Option<WsApi>> = OnceCell::new();

/// Initializes the engine if it is not initialized yet.
pub fn init() -> Result<(), NetError> {
    if READY.load(Ordering::Acquire) {
        return Ok(());
    }
    let _guard = LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    init_locked()
}

fn init_locked() -> Result<(), NetError> {
    if READY.load(Ordering::Acquire) {
        return Ok(());
    }
    // SAFETY: serialized by LOCK; no handle exists while READY is false.
    let code = unsafe { curl_sys::curl_global_init(sys::CURL_GLOBAL_DEFAULT) } as i32;
    if code != sys::CURLE_OK {
        return Err(NetError::InitFailed(code));
    }
    READY.store(true, Ordering::Release);
    let ws = websocket_api().is_some();
    tracing::debug!(version = %version_info(), websocket = ws, "transfer engine initialized");
    Ok(())
}

/// Tears the engine down.
///
/// Fails with [`NetError::HandlesOutstanding`] while any transfer handle,
/// scheduler or mime tree is alive. Calling it when the engine is not
/// initialized is a no-op. A later handle creation initializes again.
pub fn cleanup() -> Result<(), NetError> {
    let _guard = LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let live = LIVE.load(Ordering::Acquire);
    if live > 0 {
        return Err(NetError::HandlesOutstanding(live));
    }
    if READY.swap(false, Ordering::AcqRel) {
        // SAFETY: serialized by LOCK and no engine object is alive.
        unsafe { curl_sys::curl_global_cleanup() };
        tracing::debug!("transfer engine cleaned up");
    }
    Ok(())
}

pub fn is_initialized() -> bool {
    READY.load(Ordering::Acquire)
}

/// Number of engine objects currently alive.
pub fn live_handles() -> usize {
    LIVE.load(Ordering::Acquire)
}

/// Keeps the engine initialized while held.
#[derive(Debug)]
pub(crate) struct LiveToken(());

impl LiveToken {
    pub(crate) fn acquire() -> Result<Self, NetError> {
        let _guard = LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        init_locked()?;
        LIVE.fetch_add(1, Ordering::AcqRel);
        Ok(Self(()))
    }
}

impl Drop for LiveToken {
    fn drop(&mut self) {
        LIVE.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Resolved websocket entry points.
#[derive(Clone, Copy)]
pub(crate) struct WsApi {
    pub(crate) send: WsSendFn,
    pub(crate) recv: WsRecvFn,
}

impl fmt::Debug for WsApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsApi").finish_non_exhaustive()
    }
}

pub(crate) fn websocket_api() -> Option<&'static WsApi> {
    WS_API.get_or_init(probe_websocket).as_ref()
}

/// Whether the linked engine can carry websocket frames.
pub fn supports_websocket() -> bool {
    websocket_api().is_some()
}

fn probe_websocket() -> Option<WsApi> {
    let info = version_info();
    if !info.protocols.iter().any(|p| p == "ws") {
        return None;
    }
    let send = sys::lookup_symbol(CStr::from_bytes_with_nul(b"curl_ws_send\0").ok()?)?;
    let recv = sys::lookup_symbol(CStr::from_bytes_with_nul(b"curl_ws_recv\0").ok()?)?;
    // SAFETY: the symbols come from the linked engine and have these signatures.
    unsafe {
        Some(WsApi {
            send: std::mem::transmute::<*mut libc::c_void, WsSendFn>(send.as_ptr()),
            recv: std::mem::transmute::<*mut libc::c_void, WsRecvFn>(recv.as_ptr()),
        })
    }
}

/// Build information of the linked engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: String,
    pub ssl_version: Option<String>,
    pub libz_version: Option<String>,
    pub protocols: Vec<String>,
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "libcurl {} (SSL: {}, zlib: {}, protocols: {})",
            self.version,
            self.ssl_version.as_deref().unwrap_or("none"),
            self.libz_version.as_deref().unwrap_or("none"),
            self.protocols.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
        )
    }
}

/// Reads the engine's build information.
pub fn version_info() -> VersionInfo {
    // SAFETY: curl_version_info returns a pointer to static data valid for the process.
    unsafe {
        let data = curl_sys::curl_version_info(sys::CURLVERSION_FOURTH as _);
        if data.is_null() {
            return VersionInfo {
                version: String::new(),
                ssl_version: None,
                libz_version: None,
                protocols: Vec::new(),
            };
        }
        let data = &*data;
        let mut protocols = Vec::new();
        let mut cursor = data.protocols;
        while !cursor.is_null() && !(*cursor).is_null() {
            protocols.push(CStr::from_ptr(*cursor).to_string_lossy().into_owned());
            cursor = cursor.add(1);
        }
        VersionInfo {
            version: opt_string(data.version).unwrap_or_default(),
            ssl_version: opt_string(data.ssl_version),
            libz_version: opt_string(data.libz_version),
            protocols,
        }
    }
}

unsafe fn opt_string(ptr: *const libc::c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}
