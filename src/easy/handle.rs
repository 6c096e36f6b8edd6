//! Transfer handles.
//!
//! A [`TransferHandle`] is one reusable request/response unit. It owns the
//! native easy handle, the response buffers the engine writes into, and every
//! option value the engine may still read (see [`OptionStore`]).
//!
//! The buffers live in a heap context whose address is registered with the
//! engine's write/header callbacks. The context never moves for the life of
//! the handle, so the handle itself can be moved freely.

use crate::base::context::EngineCodeExt;
use crate::base::global::LiveToken;
use crate::base::loadstate::LoadState;
use crate::base::neterror::NetError;
use crate::easy::buffer::{HeaderBuffer, ResponseBuffer};
use crate::easy::head::ResponseHead;
use crate::easy::headerlist::HeaderList;
use crate::easy::mime::MimeTree;
use crate::easy::options::{self, OptionStore, OptionValue};
use crate::easy::streaming::StreamingController;
use crate::multi::scheduler::MultiShared;
use crate::sys::{self, DataCallback, CURL};
use crate::tls::cabundle;
use crate::ws::frame::WsFrameMeta;
use bytes::Bytes;
use libc::{c_char, c_double, c_int, c_long, c_void, size_t};
use std::ffi::CStr;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::ptr::{self, NonNull};
use std::rc::Rc;
use std::slice;

/// Owned native easy handle.
struct EasyRaw(NonNull<CURL>);

impl Drop for EasyRaw {
    fn drop(&mut self) {
        // SAFETY: the handle was created by curl_easy_init and is released once.
        unsafe { curl_sys::curl_easy_cleanup(self.0.as_ptr()) };
    }
}

/// State the engine callbacks write into.
#[derive(Debug, Default)]
pub(crate) struct TransferState {
    pub(crate) body: ResponseBuffer,
    pub(crate) headers: HeaderBuffer,
    pub(crate) stream: StreamingController,
    pub(crate) alloc_failed: bool,
    pub(crate) load_state: LoadState,
    pub(crate) ws_frame: Option<WsFrameMeta>,
}

impl TransferState {
    fn begin_transfer(&mut self) {
        self.body.truncate();
        self.headers.truncate();
        self.stream.reset();
        self.alloc_failed = false;
        self.ws_frame = None;
    }
}

/// Heap context with a stable address.
///
/// Held as a raw pointer rather than a `Box` because the engine writes
/// through the registered address while the handle is borrowed elsewhere.
struct StateCell(NonNull<TransferState>);

impl StateCell {
    fn new() -> Self {
        let state = Box::into_raw(Box::<TransferState>::default());
        // SAFETY: Box::into_raw never returns null.
        Self(unsafe { NonNull::new_unchecked(state) })
    }

    fn get(&self) -> &TransferState {
        // SAFETY: the pointer is valid until Drop; callbacks only run inside
        // engine calls, during which no reference from here is held.
        unsafe { self.0.as_ref() }
    }

    fn get_mut(&mut self) -> &mut TransferState {
        // SAFETY: see `get`.
        unsafe { self.0.as_mut() }
    }
}

impl Drop for StateCell {
    fn drop(&mut self) {
        // SAFETY: created by Box::into_raw in `new` and released once.
        drop(unsafe { Box::from_raw(self.0.as_ptr()) });
    }
}

fn chunk<'a>(ptr: *const c_char, size: size_t, nmemb: size_t) -> Option<&'a [u8]> {
    let len = size.checked_mul(nmemb)?;
    if len == 0 {
        return Some(&[]);
    }
    if ptr.is_null() {
        return None;
    }
    // SAFETY: the engine guarantees `len` readable bytes at `ptr` for the call.
    Some(unsafe { slice::from_raw_parts(ptr.cast::<u8>(), len) })
}

extern "C" fn body_callback(
    ptr: *mut c_char,
    size: size_t,
    nmemb: size_t,
    userdata: *mut c_void,
) -> size_t {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let state = NonNull::new(userdata.cast::<TransferState>())?;
        let data = chunk(ptr, size, nmemb)?;
        // SAFETY: userdata is the handle's live StateCell.
        let state = unsafe { &mut *state.as_ptr() };
        match state.body.append(data) {
            Ok(()) => Some(data.len()),
            Err(_) => {
                state.alloc_failed = true;
                None
            }
        }
    }));
    // Any short count aborts the transfer with a write error.
    result.ok().flatten().unwrap_or(0)
}

extern "C" fn header_callback(
    ptr: *mut c_char,
    size: size_t,
    nmemb: size_t,
    userdata: *mut c_void,
) -> size_t {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let state = NonNull::new(userdata.cast::<TransferState>())?;
        let data = chunk(ptr, size, nmemb)?;
        // SAFETY: see `body_callback`.
        let state = unsafe { &mut *state.as_ptr() };
        match state.headers.append(data) {
            Ok(_) => Some(data.len()),
            Err(_) => {
                state.alloc_failed = true;
                None
            }
        }
    }));
    result.ok().flatten().unwrap_or(0)
}

fn check_info(info: u32, kind: u32, requested: &'static str) -> Result<(), NetError> {
    if info & sys::INFO_TYPEMASK != kind {
        return Err(NetError::InfoKindMismatch { info, requested });
    }
    Ok(())
}

/// A reusable transfer.
///
/// Handles are neither `Send` nor `Sync`: one logical caller drives a handle
/// at a time, and the scheduler it is attached to lives on the same thread.
pub struct TransferHandle {
    // Field order is release order: native handle first, then the values it
    // referenced, then the buffers.
    raw: EasyRaw,
    options: OptionStore,
    state: StateCell,
    tag: Option<u64>,
    attachment: Option<Rc<MultiShared>>,
    _live: LiveToken,
}

impl TransferHandle {
    /// Create a handle with the default callbacks and trust roots installed.
    pub fn new() -> Result<Self, NetError> {
        let live = LiveToken::acquire()?;
        // SAFETY: the engine is initialized while `live` is held.
        let raw = unsafe { curl_sys::curl_easy_init() };
        let raw = NonNull::new(raw).ok_or(NetError::OutOfMemory("transfer handle"))?;

        let mut handle = Self {
            raw: EasyRaw(raw),
            options: OptionStore::new(),
            state: StateCell::new(),
            tag: None,
            attachment: None,
            _live: live,
        };
        handle.install_defaults()?;
        tracing::debug!(handle = ?raw, "transfer handle created");
        Ok(handle)
    }

    fn install_defaults(&mut self) -> Result<(), NetError> {
        let raw = self.as_raw();
        let context = self.state.0.as_ptr() as *const c_void;
        let body: DataCallback = body_callback;
        let header: DataCallback = header_callback;
        // SAFETY: `raw` is live; `context` outlives the native handle because
        // the StateCell field is dropped after EasyRaw.
        unsafe {
            options::setopt_ptr(raw, sys::CURLOPT_WRITEFUNCTION, body as *const c_void)?;
            options::setopt_ptr(raw, sys::CURLOPT_WRITEDATA, context)?;
            options::setopt_ptr(raw, sys::CURLOPT_HEADERFUNCTION, header as *const c_void)?;
            options::setopt_ptr(raw, sys::CURLOPT_HEADERDATA, context)?;
        }

        if let Some(bundle) = cabundle::resolve() {
            let path = options::path_to_cstring(&bundle)?;
            // SAFETY: `raw` is live and belongs to this store.
            unsafe { self.options.install_string(raw, sys::CURLOPT_CAINFO, path)? };
            tracing::trace!(path = %bundle.display(), "trust roots applied");
        }
        Ok(())
    }

    /// Restore the handle to its freshly created state.
    ///
    /// Releases every owned option value and both buffers' storage.
    pub fn reset(&mut self) -> Result<(), NetError> {
        if self.is_attached() {
            return Err(NetError::HandleAttached);
        }
        // SAFETY: the handle is live and not inside a transfer.
        unsafe { curl_sys::curl_easy_reset(self.as_raw()) };
        // The engine no longer references any owned value.
        self.options.clear();

        let state = self.state.get_mut();
        state.body.clear();
        state.headers.clear();
        state.stream = StreamingController::default();
        state.alloc_failed = false;
        state.load_state = LoadState::Created;
        state.ws_frame = None;
        self.tag = None;
        self.attachment = None;

        self.install_defaults()?;
        tracing::debug!(handle = ?self.raw.0, "transfer handle reset");
        Ok(())
    }

    /// Run the transfer to completion, blocking the calling thread.
    pub fn perform(&mut self) -> Result<(), NetError> {
        if self.is_attached() {
            return Err(NetError::HandleAttached);
        }
        self.begin_transfer();
        // SAFETY: the handle is live; callbacks write into the StateCell.
        let code = unsafe { curl_sys::curl_easy_perform(self.as_raw()) };

        let state = self.state.get_mut();
        let result = if state.alloc_failed {
            Err(NetError::OutOfMemory("response buffer"))
        } else {
            code.easy_result()
        };
        state.load_state = if result.is_ok() {
            LoadState::Performed
        } else {
            LoadState::Failed
        };
        match &result {
            Ok(()) => tracing::debug!(
                body = state.body.len(),
                headers = state.headers.buffer().len(),
                "transfer performed"
            ),
            Err(err) => tracing::debug!(error = %err, "transfer failed"),
        }
        result
    }

    /// Prepare the per-transfer state for a new run.
    pub(crate) fn begin_transfer(&mut self) {
        self.state.get_mut().begin_transfer();
    }

    /// Set any option whose value kind matches the option id.
    ///
    /// While the handle is attached to a scheduler, values the engine reads
    /// by reference (strings, lists, mime trees) cannot be replaced and fail
    /// with [`NetError::HandleAttached`].
    pub fn set_option(&mut self, option: u32, value: OptionValue<'_>) -> Result<(), NetError> {
        options::validate(option, &value)?;
        if value.is_borrowed_by_engine() && self.is_attached() {
            return Err(NetError::HandleAttached);
        }
        let raw = self.as_raw();
        // SAFETY: `raw` is live and this handle's store owns what it installs.
        unsafe {
            match value {
                OptionValue::Long(v) => options::setopt_long(raw, option, v)?,
                OptionValue::OffT(v) => options::setopt_off_t(raw, option, v)?,
                OptionValue::String(s) => self.options.set_string(raw, option, s)?,
                OptionValue::List(list) => self.options.attach_list(raw, option, list)?,
                OptionValue::Blob(b) => options::setopt_blob(raw, option, b)?,
                OptionValue::Mime(tree) => self.options.attach_mime(raw, tree)?,
            }
        }
        let state = self.state.get_mut();
        if state.load_state != LoadState::InFlight {
            state.load_state = LoadState::Configured;
        }
        Ok(())
    }

    pub fn set_string(&mut self, option: u32, value: &str) -> Result<(), NetError> {
        self.set_option(option, OptionValue::String(value))
    }

    pub fn set_long(&mut self, option: u32, value: i64) -> Result<(), NetError> {
        self.set_option(option, OptionValue::Long(value))
    }

    pub fn set_off_t(&mut self, option: u32, value: i64) -> Result<(), NetError> {
        self.set_option(option, OptionValue::OffT(value))
    }

    pub fn set_blob(&mut self, option: u32, value: &[u8]) -> Result<(), NetError> {
        self.set_option(option, OptionValue::Blob(value))
    }

    /// Move `list` into the handle as the value of `option`.
    pub fn attach_header_list(&mut self, option: u32, list: &mut HeaderList) -> Result<(), NetError> {
        self.set_option(option, OptionValue::List(list))
    }

    /// Move `list` into the handle as the request headers.
    pub fn set_headers(&mut self, list: &mut HeaderList) -> Result<(), NetError> {
        self.attach_header_list(sys::CURLOPT_HTTPHEADER, list)
    }

    /// Move `tree` into the handle as the multipart request body.
    pub fn attach_mime(&mut self, tree: &mut MimeTree) -> Result<(), NetError> {
        self.set_option(sys::CURLOPT_MIMEPOST, OptionValue::Mime(tree))
    }

    pub fn set_url(&mut self, url: &str) -> Result<(), NetError> {
        self.set_string(sys::CURLOPT_URL, url)
    }

    /// Set the correlation tag reported on this handle's completion event.
    pub fn set_tag(&mut self, tag: u64) -> Result<(), NetError> {
        let slot = options::tag_slot(tag)?;
        // SAFETY: PRIVATE stores the pointer value and never dereferences it.
        unsafe {
            options::setopt_ptr(self.as_raw(), sys::CURLOPT_PRIVATE, slot as *const c_void)?;
        }
        self.tag = Some(tag);
        if let Some(shared) = self.attached() {
            shared.set_tag(self.as_raw(), tag);
        }
        Ok(())
    }

    pub fn tag(&self) -> Option<u64> {
        self.tag
    }

    /// Copy of the response body received so far.
    pub fn response_body(&self) -> Bytes {
        self.state.get().body.snapshot()
    }

    /// Raw header text received so far, every header block included.
    pub fn response_headers(&self) -> String {
        String::from_utf8_lossy(self.state.get().headers.buffer().as_bytes()).into_owned()
    }

    /// Parsed final header block, once one is available.
    pub fn response_head(&self) -> Option<ResponseHead> {
        ResponseHead::parse(self.state.get().headers.buffer().as_bytes())
    }

    pub fn body_capacity(&self) -> usize {
        self.state.get().body.capacity()
    }

    pub fn header_capacity(&self) -> usize {
        self.state.get().headers.buffer().capacity()
    }

    /// Switch between buffered and streaming consumption of the body.
    ///
    /// Entering streaming mode rewinds the read offset and clears the header
    /// completion flag.
    pub fn set_streaming(&mut self, enabled: bool) {
        let state = self.state.get_mut();
        state.stream.set_enabled(enabled);
        if enabled {
            state.headers.reset_complete();
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.state.get().stream.is_enabled()
    }

    pub fn stream_offset(&self) -> usize {
        self.state.get().stream.read_offset()
    }

    pub fn has_pending_data(&self) -> bool {
        let state = self.state.get();
        state.stream.has_pending(&state.body)
    }

    /// Copy of the body bytes not drained yet. Empty means nothing new.
    pub fn drain_chunk(&mut self) -> Bytes {
        let state = self.state.get_mut();
        state.stream.drain(&state.body)
    }

    /// Whether the blank line ending the header section has arrived.
    pub fn headers_complete(&self) -> bool {
        self.state.get().headers.is_complete()
    }

    /// Rewind the read offset and completion flag, keeping buffer content.
    pub fn reset_streaming(&mut self) {
        let state = self.state.get_mut();
        state.stream.reset();
        state.headers.reset_complete();
    }

    pub fn get_info_long(&self, info: u32) -> Result<i64, NetError> {
        check_info(info, sys::INFO_LONG, "long")?;
        let mut value: c_long = 0;
        // SAFETY: LONG infos write one c_long.
        unsafe { curl_sys::curl_easy_getinfo(self.as_raw(), info as _, &mut value as *mut c_long) }
            .easy_result()?;
        Ok(value as i64)
    }

    pub fn get_info_double(&self, info: u32) -> Result<f64, NetError> {
        check_info(info, sys::INFO_DOUBLE, "double")?;
        let mut value: c_double = 0.0;
        // SAFETY: DOUBLE infos write one c_double.
        unsafe {
            curl_sys::curl_easy_getinfo(self.as_raw(), info as _, &mut value as *mut c_double)
        }
        .easy_result()?;
        Ok(value)
    }

    pub fn get_info_off_t(&self, info: u32) -> Result<i64, NetError> {
        check_info(info, sys::INFO_OFF_T, "off_t")?;
        let mut value: sys::curl_off_t = 0;
        // SAFETY: OFF_T infos write one curl_off_t.
        unsafe {
            curl_sys::curl_easy_getinfo(
                self.as_raw(),
                info as _,
                &mut value as *mut sys::curl_off_t,
            )
        }
        .easy_result()?;
        Ok(value)
    }

    /// String info, `None` when the engine has no value.
    pub fn get_info_string(&self, info: u32) -> Result<Option<String>, NetError> {
        // PRIVATE shares the string type bits but holds the tag.
        if info == sys::CURLINFO_PRIVATE {
            return Err(NetError::InfoKindMismatch {
                info,
                requested: "string",
            });
        }
        check_info(info, sys::INFO_STRING, "string")?;
        let mut value: *const c_char = ptr::null();
        // SAFETY: STRING infos write one pointer to engine-owned text.
        unsafe {
            curl_sys::curl_easy_getinfo(
                self.as_raw(),
                info as _,
                &mut value as *mut *const c_char,
            )
        }
        .easy_result()?;
        if value.is_null() {
            return Ok(None);
        }
        // SAFETY: non-null values are NUL-terminated and valid until the next call.
        Ok(Some(unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned()))
    }

    /// Status code of the last response, 0 if none was received.
    pub fn response_code(&self) -> Result<i64, NetError> {
        self.get_info_long(sys::CURLINFO_RESPONSE_CODE)
    }

    pub fn effective_url(&self) -> Result<Option<String>, NetError> {
        self.get_info_string(sys::CURLINFO_EFFECTIVE_URL)
    }

    /// Percent-encode `input` through the engine.
    pub fn url_encode(&self, input: &[u8]) -> Result<String, NetError> {
        // A zero length makes the engine measure the input with strlen.
        if input.is_empty() {
            return Ok(String::new());
        }
        let len = c_int::try_from(input.len())
            .map_err(|_| NetError::transfer(sys::CURLE_BAD_FUNCTION_ARGUMENT))?;
        // SAFETY: reads exactly `len` bytes; the result is freed below.
        let out = unsafe { curl_sys::curl_easy_escape(self.as_raw(), input.as_ptr().cast(), len) };
        if out.is_null() {
            return Err(NetError::OutOfMemory("url encode"));
        }
        // SAFETY: `out` is a NUL-terminated engine allocation.
        let encoded = unsafe { CStr::from_ptr(out) }.to_string_lossy().into_owned();
        unsafe { curl_sys::curl_free(out.cast()) };
        Ok(encoded)
    }

    /// Percent-decode `input` through the engine.
    pub fn url_decode(&self, input: &str) -> Result<Vec<u8>, NetError> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let len = c_int::try_from(input.len())
            .map_err(|_| NetError::transfer(sys::CURLE_BAD_FUNCTION_ARGUMENT))?;
        let mut out_len: c_int = 0;
        // SAFETY: reads exactly `len` bytes; the result is freed below.
        let out = unsafe {
            curl_sys::curl_easy_unescape(self.as_raw(), input.as_ptr().cast(), len, &mut out_len)
        };
        if out.is_null() {
            return Err(NetError::OutOfMemory("url decode"));
        }
        let len = usize::try_from(out_len).unwrap_or(0);
        // SAFETY: the engine wrote `out_len` bytes at `out`.
        let decoded = unsafe { slice::from_raw_parts(out.cast::<u8>(), len) }.to_vec();
        unsafe { curl_sys::curl_free(out.cast()) };
        Ok(decoded)
    }

    pub fn load_state(&self) -> LoadState {
        self.state.get().load_state
    }

    /// Values the handle currently owns on the engine's behalf.
    pub fn options(&self) -> &OptionStore {
        &self.options
    }

    /// Whether the handle is a member of a live scheduler.
    pub fn is_attached(&self) -> bool {
        self.attached().is_some()
    }

    pub(crate) fn attached(&self) -> Option<&Rc<MultiShared>> {
        self.attachment
            .as_ref()
            .filter(|shared| shared.contains(self.as_raw()))
    }

    pub(crate) fn set_attachment(&mut self, shared: Option<Rc<MultiShared>>) {
        self.attachment = shared;
    }

    pub(crate) fn set_load_state(&mut self, state: LoadState) {
        self.state.get_mut().load_state = state;
    }

    pub(crate) fn state_ptr(&self) -> NonNull<TransferState> {
        self.state.0
    }

    pub(crate) fn ws_frame(&self) -> Option<WsFrameMeta> {
        self.state.get().ws_frame
    }

    pub(crate) fn set_ws_frame(&mut self, meta: Option<WsFrameMeta>) {
        self.state.get_mut().ws_frame = meta;
    }

    pub(crate) fn as_raw(&self) -> *mut CURL {
        self.raw.0.as_ptr()
    }
}

impl fmt::Debug for TransferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.get();
        f.debug_struct("TransferHandle")
            .field("tag", &self.tag)
            .field("load_state", &state.load_state)
            .field("body", &state.body.len())
            .field("headers", &state.headers.buffer().len())
            .field("streaming", &state.stream.is_enabled())
            .field("attached", &self.is_attached())
            .field("options", &self.options)
            .finish()
    }
}

impl Drop for TransferHandle {
    fn drop(&mut self) {
        if let Some(shared) = self.attachment.take() {
            if shared.contains(self.as_raw()) {
                if let Err(err) = shared.detach(self.as_raw()) {
                    tracing::warn!(error = %err, "failed to detach transfer handle on drop");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(callback: DataCallback, handle: &TransferHandle, data: &[u8]) -> size_t {
        callback(
            data.as_ptr() as *mut c_char,
            1,
            data.len(),
            handle.state_ptr().as_ptr().cast(),
        )
    }

    #[test]
    fn test_new_handle_defaults() {
        let handle = TransferHandle::new().unwrap();
        assert_eq!(handle.load_state(), LoadState::Created);
        assert_eq!(handle.tag(), None);
        assert!(!handle.is_streaming());
        assert!(!handle.is_attached());
        assert!(handle.response_body().is_empty());
        assert_eq!(handle.body_capacity(), 0);
        assert_eq!(handle.options().list_count(), 0);
    }

    #[test]
    fn test_header_callback_completes_headers() {
        let handle = TransferHandle::new().unwrap();
        assert_eq!(feed(header_callback, &handle, b"HTTP/1.1 200 OK\r\n"), 17);
        assert!(!handle.headers_complete());
        assert_eq!(feed(header_callback, &handle, b"\r\n"), 2);
        assert!(handle.headers_complete());
        assert_eq!(handle.response_head().unwrap().status, http::StatusCode::OK);
    }

    #[test]
    fn test_body_callback_feeds_streaming() {
        let mut handle = TransferHandle::new().unwrap();
        handle.set_streaming(true);

        feed(body_callback, &handle, b"abc");
        assert!(handle.has_pending_data());
        assert_eq!(&handle.drain_chunk()[..], b"abc");
        assert_eq!(handle.stream_offset(), 3);
        assert!(handle.drain_chunk().is_empty());
        feed(body_callback, &handle, b"de");
        assert_eq!(&handle.drain_chunk()[..], b"de");
        assert_eq!(&handle.response_body()[..], b"abcde");
    }

    #[test]
    fn test_callback_with_null_context_aborts() {
        let data = b"abc";
        assert_eq!(
            body_callback(data.as_ptr() as *mut c_char, 1, 3, ptr::null_mut()),
            0
        );
    }

    #[test]
    fn test_reset_streaming_keeps_content() {
        let mut handle = TransferHandle::new().unwrap();
        handle.set_streaming(true);
        feed(header_callback, &handle, b"\r\n");
        feed(body_callback, &handle, b"abc");
        handle.drain_chunk();

        handle.reset_streaming();
        assert_eq!(handle.stream_offset(), 0);
        assert!(!handle.headers_complete());
        assert_eq!(&handle.drain_chunk()[..], b"abc");
    }

    #[test]
    fn test_set_option_rejects_reserved_and_mismatched() {
        let mut handle = TransferHandle::new().unwrap();
        assert_eq!(
            handle.set_long(sys::CURLOPT_WRITEDATA, 0),
            Err(NetError::ReservedOption(sys::CURLOPT_WRITEDATA))
        );
        assert!(matches!(
            handle.set_long(sys::CURLOPT_URL, 1),
            Err(NetError::OptionKindMismatch { .. })
        ));
        assert_eq!(handle.load_state(), LoadState::Created);
    }

    #[test]
    fn test_set_string_is_owned() {
        let mut handle = TransferHandle::new().unwrap();
        let url = String::from("http://127.0.0.1:1/owned");
        handle.set_url(&url).unwrap();
        drop(url);
        assert_eq!(
            handle.options().string(sys::CURLOPT_URL).unwrap().to_bytes(),
            b"http://127.0.0.1:1/owned"
        );
        assert_eq!(handle.load_state(), LoadState::Configured);
        assert_eq!(handle.set_url("a\0b"), Err(NetError::InteriorNul));
    }

    #[test]
    fn test_attach_list_empties_source() {
        let mut handle = TransferHandle::new().unwrap();
        let mut list = HeaderList::from_lines(["X-Test: 1"]).unwrap();
        handle.set_headers(&mut list).unwrap();
        assert!(list.is_empty());
        drop(list);
        assert_eq!(
            handle.options().list_lines(sys::CURLOPT_HTTPHEADER),
            Some(vec!["X-Test: 1".to_string()])
        );

        let mut resolve = HeaderList::from_lines(["example.test:80:127.0.0.1"]).unwrap();
        handle
            .attach_header_list(sys::CURLOPT_RESOLVE, &mut resolve)
            .unwrap();
        assert_eq!(handle.options().list_count(), 2);

        let mut replacement = HeaderList::from_lines(["X-Test: 2"]).unwrap();
        handle.set_headers(&mut replacement).unwrap();
        assert_eq!(handle.options().list_count(), 2);
        assert_eq!(
            handle.options().list_lines(sys::CURLOPT_HTTPHEADER),
            Some(vec!["X-Test: 2".to_string()])
        );
    }

    #[test]
    fn test_mime_owner_checked() {
        let mut first = TransferHandle::new().unwrap();
        let mut second = TransferHandle::new().unwrap();
        let mut tree = MimeTree::new(&first).unwrap();
        tree.add_part().unwrap().name("a").unwrap().data(b"1").unwrap();

        assert_eq!(second.attach_mime(&mut tree), Err(NetError::MimeOwnerMismatch));
        first.attach_mime(&mut tree).unwrap();
        assert!(tree.is_transferred());
        assert!(first.options().has_mime());
        assert_eq!(first.attach_mime(&mut tree), Err(NetError::MimeTransferred));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut handle = TransferHandle::new().unwrap();
        handle.set_url("http://127.0.0.1:1/").unwrap();
        handle.set_tag(7).unwrap();
        let mut list = HeaderList::from_lines(["X-Test: 1"]).unwrap();
        handle.set_headers(&mut list).unwrap();
        feed(body_callback, &handle, &[b'x'; 5000]);
        assert_eq!(handle.body_capacity(), 8192);

        handle.reset().unwrap();
        assert_eq!(handle.tag(), None);
        assert_eq!(handle.body_capacity(), 0);
        assert!(handle.response_body().is_empty());
        assert!(handle.options().string(sys::CURLOPT_URL).is_none());
        assert_eq!(handle.options().list_count(), 0);
        assert_eq!(handle.load_state(), LoadState::Created);
    }

    #[test]
    fn test_perform_without_url_fails() {
        let mut handle = TransferHandle::new().unwrap();
        let err = handle.perform().unwrap_err();
        assert!(err.is_transfer());
        assert_eq!(handle.load_state(), LoadState::Failed);
    }

    #[test]
    fn test_info_kind_checked() {
        let handle = TransferHandle::new().unwrap();
        assert!(matches!(
            handle.get_info_long(sys::CURLINFO_TOTAL_TIME),
            Err(NetError::InfoKindMismatch { .. })
        ));
        assert!(handle.get_info_string(sys::CURLINFO_PRIVATE).is_err());
        assert_eq!(handle.response_code().unwrap(), 0);
        assert_eq!(handle.get_info_double(sys::CURLINFO_TOTAL_TIME).unwrap(), 0.0);
        assert_eq!(handle.get_info_off_t(sys::CURLINFO_SIZE_DOWNLOAD_T).unwrap(), 0);
    }

    #[test]
    fn test_url_codec() {
        let handle = TransferHandle::new().unwrap();
        assert_eq!(handle.url_encode(b"a b&c").unwrap(), "a%20b%26c");
        assert_eq!(handle.url_decode("a%20b%26c").unwrap(), b"a b&c");
        assert_eq!(handle.url_decode("%00x").unwrap(), b"\0x");
    }

    #[test]
    fn test_url_codec_empty_input() {
        let handle = TransferHandle::new().unwrap();
        assert_eq!(handle.url_encode(b"").unwrap(), "");
        assert_eq!(handle.url_encode(&[]).unwrap(), "");
        assert!(handle.url_decode("").unwrap().is_empty());
    }

    #[test]
    fn test_interim_response_keeps_headers_incomplete() {
        let handle = TransferHandle::new().unwrap();
        feed(header_callback, &handle, b"HTTP/1.1 100 Continue\r\n");
        feed(header_callback, &handle, b"\r\n");
        assert!(!handle.headers_complete());

        feed(header_callback, &handle, b"HTTP/1.1 200 OK\r\n");
        feed(header_callback, &handle, b"Content-Length: 3\r\n");
        assert!(!handle.headers_complete());

        feed(header_callback, &handle, b"\r\n");
        assert!(handle.headers_complete());
        assert_eq!(handle.response_head().unwrap().status().as_u16(), 200);
    }

    #[test]
    fn test_large_tag_round_trips() {
        let mut handle = TransferHandle::new().unwrap();
        match options::tag_slot(u64::MAX) {
            Ok(_) => {
                handle.set_tag(u64::MAX).unwrap();
                assert_eq!(handle.tag(), Some(u64::MAX));
            }
            Err(err) => {
                assert_eq!(handle.set_tag(u64::MAX), Err(err));
                assert_eq!(handle.tag(), None);
            }
        }
    }
}
