//! WebSocket channel over an upgraded transfer handle.

use crate::base::context::EngineCodeExt;
use crate::base::global::{self, WsApi};
use crate::base::neterror::NetError;
use crate::easy::handle::TransferHandle;
use crate::sys::{self, curl_ws_frame};
use crate::ws::frame::{CloseCode, WsFlags, WsFrameMeta, WsRecv, WsSend};
use bytes::Bytes;
use std::ptr;

/// Receive buffer size; larger frames arrive in several fragments.
const RECV_BUFFER_SIZE: usize = 64 * 1024;

/// CURLOPT_CONNECT_ONLY value that stops after the websocket upgrade.
const CONNECT_ONLY_WS: i64 = 2;

/// Frame-level websocket I/O.
///
/// Sends and receives never block: a busy socket yields
/// [`WsSend::WouldBlock`] and an idle one [`WsRecv::Empty`].
pub struct WebSocketChannel {
    handle: TransferHandle,
    api: &'static WsApi,
    buffer: Vec<u8>,
}

impl WebSocketChannel {
    /// Connect and upgrade to `url` (`ws://` or `wss://`).
    pub fn connect(url: &str) -> Result<Self, NetError> {
        let mut handle = TransferHandle::new()?;
        handle.set_url(url)?;
        Ok(Self::connect_with(handle)?)
    }

    /// Run the upgrade on a handle configured by the caller.
    ///
    /// The URL and any extra options must already be set. On failure the
    /// handle comes back inside the error.
    pub fn connect_with(mut handle: TransferHandle) -> Result<Self, UpgradeError> {
        if global::websocket_api().is_none() {
            return Err(UpgradeError::new(NetError::WsUnsupported, handle));
        }
        let upgraded = handle
            .set_long(sys::CURLOPT_CONNECT_ONLY, CONNECT_ONLY_WS)
            .and_then(|()| handle.perform());
        match upgraded {
            Ok(()) => Self::from_upgrade(handle),
            Err(error) => Err(UpgradeError::new(error, handle)),
        }
    }

    /// Wrap a handle whose last transfer completed a websocket upgrade.
    ///
    /// On failure the handle comes back inside the error.
    pub fn from_upgrade(handle: TransferHandle) -> Result<Self, UpgradeError> {
        let Some(api) = global::websocket_api() else {
            return Err(UpgradeError::new(NetError::WsUnsupported, handle));
        };
        if handle.is_attached() {
            return Err(UpgradeError::new(NetError::HandleAttached, handle));
        }
        let status = match handle.response_code() {
            Ok(status) => status,
            Err(error) => return Err(UpgradeError::new(error, handle)),
        };
        if status != 101 {
            return Err(UpgradeError::new(NetError::WsNotUpgraded(status), handle));
        }
        tracing::debug!(url = ?handle.effective_url().ok().flatten(), "websocket upgraded");
        Ok(Self {
            handle,
            api,
            buffer: vec![0; RECV_BUFFER_SIZE],
        })
    }

    /// Send one frame (or fragment) with `flags` passed through verbatim.
    pub fn send(&mut self, payload: &[u8], flags: WsFlags) -> Result<WsSend, NetError> {
        let mut sent = 0;
        // SAFETY: the handle is an upgraded connection; `payload` is read only
        // for the duration of the call.
        let code = unsafe {
            (self.api.send)(
                self.handle.as_raw(),
                payload.as_ptr().cast(),
                payload.len(),
                &mut sent,
                0,
                flags.bits(),
            )
        } as i32;
        if code == sys::CURLE_AGAIN {
            return Ok(WsSend::WouldBlock);
        }
        code.easy_result()?;
        Ok(WsSend::Sent(sent))
    }

    /// Receive whatever frame data is available.
    pub fn recv(&mut self) -> Result<WsRecv, NetError> {
        let mut received = 0;
        let mut frame: *const curl_ws_frame = ptr::null();
        // SAFETY: the buffer is writable for its full length; `frame` points
        // into engine memory valid until the next call and is copied below.
        let code = unsafe {
            (self.api.recv)(
                self.handle.as_raw(),
                self.buffer.as_mut_ptr().cast(),
                self.buffer.len(),
                &mut received,
                &mut frame,
            )
        } as i32;
        if code == sys::CURLE_AGAIN {
            return Ok(WsRecv::Empty);
        }
        code.easy_result()?;

        // SAFETY: see above.
        let meta = unsafe { frame.as_ref() }.map(WsFrameMeta::from);
        self.handle.set_ws_frame(meta);
        let flags = meta.map(|m| m.flags).unwrap_or_default();
        let data = Bytes::copy_from_slice(&self.buffer[..received.min(self.buffer.len())]);
        Ok(WsRecv::Frame { data, flags })
    }

    /// Metadata of the most recent receive.
    pub fn meta(&self) -> Option<WsFrameMeta> {
        self.handle.ws_frame()
    }

    pub fn send_text(&mut self, text: &str) -> Result<WsSend, NetError> {
        self.send(text.as_bytes(), WsFlags::TEXT)
    }

    pub fn send_binary(&mut self, data: &[u8]) -> Result<WsSend, NetError> {
        self.send(data, WsFlags::BINARY)
    }

    pub fn ping(&mut self, payload: &[u8]) -> Result<WsSend, NetError> {
        self.send(payload, WsFlags::PING)
    }

    /// Send a close frame carrying `code` and `reason`.
    pub fn close(&mut self, code: CloseCode, reason: &str) -> Result<WsSend, NetError> {
        self.send(&code.payload(reason), WsFlags::CLOSE)
    }

    pub fn handle(&self) -> &TransferHandle {
        &self.handle
    }

    /// Give the handle back, e.g. to reset and reuse it.
    pub fn into_handle(self) -> TransferHandle {
        self.handle
    }
}

/// A failed upgrade together with the handle it was attempted on.
///
/// The handle can be inspected, reset and reused.
pub struct UpgradeError {
    error: NetError,
    handle: TransferHandle,
}

impl UpgradeError {
    fn new(error: NetError, handle: TransferHandle) -> Self {
        Self { error, handle }
    }

    pub fn error(&self) -> &NetError {
        &self.error
    }

    pub fn handle(&self) -> &TransferHandle {
        &self.handle
    }

    pub fn into_handle(self) -> TransferHandle {
        self.handle
    }

    pub fn into_parts(self) -> (NetError, TransferHandle) {
        (self.error, self.handle)
    }
}

impl From<UpgradeError> for NetError {
    fn from(err: UpgradeError) -> Self {
        err.error
    }
}

impl std::fmt::Display for UpgradeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl std::fmt::Debug for UpgradeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpgradeError")
            .field("error", &self.error)
            .field("handle", &self.handle)
            .finish()
    }
}

impl std::error::Error for UpgradeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl std::fmt::Debug for WebSocketChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketChannel")
            .field("handle", &self.handle)
            .field("meta", &self.meta())
            .finish()
    }
}
