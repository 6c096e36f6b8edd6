//! Raw engine declarations used by the adapter.
//!
//! `curl-sys` provides the core easy/multi entry points. The identifiers below
//! are the handful of option, info and result codes this crate drives itself;
//! every other option or info id is passed through untouched. Mime and poll
//! entry points are declared here so the crate does not depend on optional
//! `curl-sys` features, and the websocket entry points are resolved at runtime
//! because not every libcurl build exports them.

#![allow(non_camel_case_types)]

use libc::{c_char, c_int, c_long, c_uint, c_void, size_t};

pub use curl_sys::{curl_off_t, curl_slist, CURLMcode, CURLMsg, CURLcode, CURL, CURLM};

// Option id ranges (CURLOPTTYPE_*).
pub const OPTTYPE_LONG: u32 = 0;
pub const OPTTYPE_OBJECTPOINT: u32 = 10_000;
pub const OPTTYPE_FUNCTIONPOINT: u32 = 20_000;
pub const OPTTYPE_OFF_T: u32 = 30_000;
pub const OPTTYPE_BLOB: u32 = 40_000;

pub const CURLOPT_WRITEDATA: u32 = 10_001;
pub const CURLOPT_URL: u32 = 10_002;
pub const CURLOPT_READDATA: u32 = 10_009;
pub const CURLOPT_ERRORBUFFER: u32 = 10_010;
pub const CURLOPT_POSTFIELDS: u32 = 10_015;
pub const CURLOPT_USERAGENT: u32 = 10_018;
pub const CURLOPT_HTTPHEADER: u32 = 10_023;
pub const CURLOPT_HTTPPOST: u32 = 10_024;
pub const CURLOPT_QUOTE: u32 = 10_028;
pub const CURLOPT_HEADERDATA: u32 = 10_029;
pub const CURLOPT_STDERR: u32 = 10_037;
pub const CURLOPT_POSTQUOTE: u32 = 10_039;
pub const CURLOPT_XFERINFODATA: u32 = 10_057;
pub const CURLOPT_CAINFO: u32 = 10_065;
pub const CURLOPT_TELNETOPTIONS: u32 = 10_070;
pub const CURLOPT_PREQUOTE: u32 = 10_093;
pub const CURLOPT_DEBUGDATA: u32 = 10_095;
pub const CURLOPT_SHARE: u32 = 10_100;
pub const CURLOPT_PRIVATE: u32 = 10_103;
pub const CURLOPT_HTTP200ALIASES: u32 = 10_104;
pub const CURLOPT_SSL_CTX_DATA: u32 = 10_109;
pub const CURLOPT_IOCTLDATA: u32 = 10_131;
pub const CURLOPT_SOCKOPTDATA: u32 = 10_149;
pub const CURLOPT_OPENSOCKETDATA: u32 = 10_164;
pub const CURLOPT_SEEKDATA: u32 = 10_168;
pub const CURLOPT_NOPROXY: u32 = 10_177;
pub const CURLOPT_MAIL_RCPT: u32 = 10_187;
pub const CURLOPT_INTERLEAVEDATA: u32 = 10_195;
pub const CURLOPT_CHUNK_DATA: u32 = 10_201;
pub const CURLOPT_FNMATCH_DATA: u32 = 10_202;
pub const CURLOPT_RESOLVE: u32 = 10_203;
pub const CURLOPT_CLOSESOCKETDATA: u32 = 10_209;
pub const CURLOPT_PROXYHEADER: u32 = 10_228;
pub const CURLOPT_STREAM_DEPENDS: u32 = 10_240;
pub const CURLOPT_STREAM_DEPENDS_E: u32 = 10_241;
pub const CURLOPT_CONNECT_TO: u32 = 10_243;
pub const CURLOPT_MIMEPOST: u32 = 10_269;
pub const CURLOPT_RESOLVER_START_DATA: u32 = 10_273;
pub const CURLOPT_CURLU: u32 = 10_282;
pub const CURLOPT_TRAILERDATA: u32 = 10_284;
pub const CURLOPT_HSTSREADDATA: u32 = 10_302;
pub const CURLOPT_HSTSWRITEDATA: u32 = 10_304;
pub const CURLOPT_PREREQDATA: u32 = 10_313;
pub const CURLOPT_WRITEFUNCTION: u32 = 20_011;
pub const CURLOPT_HEADERFUNCTION: u32 = 20_079;
pub const CURLOPT_VERBOSE: u32 = 41;
pub const CURLOPT_FOLLOWLOCATION: u32 = 52;
pub const CURLOPT_SSL_VERIFYPEER: u32 = 64;
pub const CURLOPT_MAXREDIRS: u32 = 68;
pub const CURLOPT_SSL_VERIFYHOST: u32 = 81;
pub const CURLOPT_CONNECT_ONLY: u32 = 141;
pub const CURLOPT_TIMEOUT_MS: u32 = 155;
pub const CURLOPT_CONNECTTIMEOUT_MS: u32 = 156;

// Info id type bits (CURLINFO_*).
pub const INFO_STRING: u32 = 0x10_0000;
pub const INFO_LONG: u32 = 0x20_0000;
pub const INFO_DOUBLE: u32 = 0x30_0000;
pub const INFO_OFF_T: u32 = 0x60_0000;
pub const INFO_TYPEMASK: u32 = 0xf0_0000;

pub const CURLINFO_EFFECTIVE_URL: u32 = INFO_STRING + 1;
pub const CURLINFO_RESPONSE_CODE: u32 = INFO_LONG + 2;
pub const CURLINFO_TOTAL_TIME: u32 = INFO_DOUBLE + 3;
pub const CURLINFO_CONTENT_TYPE: u32 = INFO_STRING + 18;
pub const CURLINFO_PRIVATE: u32 = INFO_STRING + 21;
pub const CURLINFO_SIZE_DOWNLOAD_T: u32 = INFO_OFF_T + 8;

// Result codes are compared as `i32`; the engine's own code types differ in
// signedness between targets.
pub const CURLE_OK: i32 = 0;
pub const CURLE_WRITE_ERROR: i32 = 23;
pub const CURLE_OUT_OF_MEMORY: i32 = 27;
pub const CURLE_BAD_FUNCTION_ARGUMENT: i32 = 43;
pub const CURLE_AGAIN: i32 = 81;

pub const CURLM_OK: i32 = 0;
pub const CURLM_BAD_EASY_HANDLE: i32 = 2;
pub const CURLM_OUT_OF_MEMORY: i32 = 3;
pub const CURLM_ADDED_ALREADY: i32 = 7;

pub const CURLMSG_DONE: c_int = 1;

pub const CURL_GLOBAL_DEFAULT: c_long = 3;
pub const CURLVERSION_FOURTH: c_int = 3;
pub const CURL_BLOB_COPY: c_uint = 1;

/// Signature shared by the body and header data callbacks.
pub type DataCallback = extern "C" fn(*mut c_char, size_t, size_t, *mut c_void) -> size_t;

pub enum curl_mime {}
pub enum curl_mimepart {}

#[repr(C)]
pub struct curl_blob {
    pub data: *mut c_void,
    pub len: size_t,
    pub flags: c_uint,
}

#[repr(C)]
pub struct curl_ws_frame {
    pub age: c_int,
    pub flags: c_int,
    pub offset: curl_off_t,
    pub bytesleft: curl_off_t,
    pub len: size_t,
}

extern "C" {
    pub fn curl_mime_init(easy: *mut CURL) -> *mut curl_mime;
    pub fn curl_mime_free(mime: *mut curl_mime);
    pub fn curl_mime_addpart(mime: *mut curl_mime) -> *mut curl_mimepart;
    pub fn curl_mime_name(part: *mut curl_mimepart, name: *const c_char) -> CURLcode;
    pub fn curl_mime_filename(part: *mut curl_mimepart, filename: *const c_char) -> CURLcode;
    pub fn curl_mime_type(part: *mut curl_mimepart, mimetype: *const c_char) -> CURLcode;
    pub fn curl_mime_data(part: *mut curl_mimepart, data: *const c_char, size: size_t) -> CURLcode;
    pub fn curl_mime_filedata(part: *mut curl_mimepart, filename: *const c_char) -> CURLcode;

    pub fn curl_multi_poll(
        multi: *mut CURLM,
        extra_fds: *mut c_void,
        extra_nfds: c_uint,
        timeout_ms: c_int,
        numfds: *mut c_int,
    ) -> CURLMcode;
}

pub type WsSendFn = unsafe extern "C" fn(
    *mut CURL,
    *const c_void,
    size_t,
    *mut size_t,
    curl_off_t,
    c_uint,
) -> CURLcode;

pub type WsRecvFn = unsafe extern "C" fn(
    *mut CURL,
    *mut c_void,
    size_t,
    *mut size_t,
    *mut *const curl_ws_frame,
) -> CURLcode;

/// Looks up an exported engine symbol in the already-loaded images.
#[cfg(any(target_os = "linux", target_os = "android", target_os = "macos", target_os = "ios"))]
pub fn lookup_symbol(name: &std::ffi::CStr) -> Option<std::ptr::NonNull<c_void>> {
    // SAFETY: RTLD_DEFAULT searches the global symbol scope; `name` is NUL-terminated.
    let sym = unsafe { libc::dlsym(libc::RTLD_DEFAULT, name.as_ptr()) };
    std::ptr::NonNull::new(sym)
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "macos", target_os = "ios")))]
pub fn lookup_symbol(_name: &std::ffi::CStr) -> Option<std::ptr::NonNull<c_void>> {
    None
}
