//! Option values and the per-handle ownership store.
//!
//! The engine keeps raw pointers to string, list and mime option values
//! without copying most of them. [`OptionStore`] owns every such value for as
//! long as the handle may read it, so callers can drop or reuse their own
//! buffers right after a setter returns.
//!
//! Option ids are the engine's own numbers and are passed through untouched.
//! [`expected_kind`] derives the value kind from the id range plus a small
//! table of ids whose range alone is ambiguous.

use crate::base::context::EngineCodeExt;
use crate::base::neterror::NetError;
use crate::easy::headerlist::HeaderList;
use crate::easy::mime::{MimeData, MimePartInfo, MimeTree};
use crate::sys::{self, curl_blob, curl_off_t, CURL};
use libc::{c_long, c_void};
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::fmt;
use std::path::Path;

/// Value kind an option id expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    Long,
    OffT,
    String,
    List,
    Blob,
    Mime,
    /// Function pointers; only the handle's own callbacks are installed.
    Callback,
    /// Opaque object pointers that cannot be expressed safely.
    Pointer,
}

impl OptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::Long => "long",
            OptionKind::OffT => "off_t",
            OptionKind::String => "string",
            OptionKind::List => "list",
            OptionKind::Blob => "blob",
            OptionKind::Mime => "mime",
            OptionKind::Callback => "callback",
            OptionKind::Pointer => "pointer",
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ids the handle manages itself.
const RESERVED_OPTIONS: &[u32] = &[
    sys::CURLOPT_WRITEDATA,
    sys::CURLOPT_WRITEFUNCTION,
    sys::CURLOPT_HEADERDATA,
    sys::CURLOPT_HEADERFUNCTION,
    sys::CURLOPT_PRIVATE,
];

/// Object-range ids that take a string list.
const LIST_OPTIONS: &[u32] = &[
    sys::CURLOPT_HTTPHEADER,
    sys::CURLOPT_QUOTE,
    sys::CURLOPT_POSTQUOTE,
    sys::CURLOPT_TELNETOPTIONS,
    sys::CURLOPT_PREQUOTE,
    sys::CURLOPT_HTTP200ALIASES,
    sys::CURLOPT_MAIL_RCPT,
    sys::CURLOPT_RESOLVE,
    sys::CURLOPT_PROXYHEADER,
    sys::CURLOPT_CONNECT_TO,
];

/// Object-range ids that take something other than a string.
const POINTER_OPTIONS: &[u32] = &[
    sys::CURLOPT_READDATA,
    sys::CURLOPT_ERRORBUFFER,
    sys::CURLOPT_HTTPPOST,
    sys::CURLOPT_STDERR,
    sys::CURLOPT_XFERINFODATA,
    sys::CURLOPT_DEBUGDATA,
    sys::CURLOPT_SHARE,
    sys::CURLOPT_SSL_CTX_DATA,
    sys::CURLOPT_IOCTLDATA,
    sys::CURLOPT_SOCKOPTDATA,
    sys::CURLOPT_OPENSOCKETDATA,
    sys::CURLOPT_SEEKDATA,
    sys::CURLOPT_INTERLEAVEDATA,
    sys::CURLOPT_CHUNK_DATA,
    sys::CURLOPT_FNMATCH_DATA,
    sys::CURLOPT_CLOSESOCKETDATA,
    sys::CURLOPT_STREAM_DEPENDS,
    sys::CURLOPT_STREAM_DEPENDS_E,
    sys::CURLOPT_RESOLVER_START_DATA,
    sys::CURLOPT_CURLU,
    sys::CURLOPT_TRAILERDATA,
    sys::CURLOPT_HSTSREADDATA,
    sys::CURLOPT_HSTSWRITEDATA,
    sys::CURLOPT_PREREQDATA,
];

/// Whether `option` is owned by the handle and cannot be set by callers.
pub fn is_reserved(option: u32) -> bool {
    RESERVED_OPTIONS.contains(&option)
}

/// Value kind the engine expects for `option`.
pub fn expected_kind(option: u32) -> OptionKind {
    if option == sys::CURLOPT_MIMEPOST {
        return OptionKind::Mime;
    }
    if LIST_OPTIONS.contains(&option) {
        return OptionKind::List;
    }
    if POINTER_OPTIONS.contains(&option) {
        return OptionKind::Pointer;
    }
    match option {
        o if o >= sys::OPTTYPE_BLOB => OptionKind::Blob,
        o if o >= sys::OPTTYPE_OFF_T => OptionKind::OffT,
        o if o >= sys::OPTTYPE_FUNCTIONPOINT => OptionKind::Callback,
        o if o >= sys::OPTTYPE_OBJECTPOINT => OptionKind::String,
        _ => OptionKind::Long,
    }
}

/// A value for one option.
#[derive(Debug)]
pub enum OptionValue<'a> {
    Long(i64),
    OffT(i64),
    /// Copied into the handle.
    String(&'a str),
    /// Moved into the handle; the list is left empty.
    List(&'a mut HeaderList),
    /// Copied by the engine.
    Blob(&'a [u8]),
    /// Moved into the handle; the tree is left empty.
    Mime(&'a mut MimeTree),
}

impl OptionValue<'_> {
    pub fn kind(&self) -> OptionKind {
        match self {
            OptionValue::Long(_) => OptionKind::Long,
            OptionValue::OffT(_) => OptionKind::OffT,
            OptionValue::String(_) => OptionKind::String,
            OptionValue::List(_) => OptionKind::List,
            OptionValue::Blob(_) => OptionKind::Blob,
            OptionValue::Mime(_) => OptionKind::Mime,
        }
    }

    /// Whether the engine keeps reading the installed value by reference.
    pub fn is_borrowed_by_engine(&self) -> bool {
        matches!(
            self,
            OptionValue::String(_) | OptionValue::List(_) | OptionValue::Mime(_)
        )
    }
}

/// Checks `value` against the kind `option` expects.
pub fn validate(option: u32, value: &OptionValue<'_>) -> Result<(), NetError> {
    if is_reserved(option) {
        return Err(NetError::ReservedOption(option));
    }
    let expected = expected_kind(option);
    let actual = value.kind();
    if expected != actual {
        return Err(NetError::OptionKindMismatch {
            option,
            expected: expected.as_str(),
            actual: actual.as_str(),
        });
    }
    Ok(())
}

pub(crate) fn path_to_cstring(path: &Path) -> Result<CString, NetError> {
    #[cfg(unix)]
    let bytes = {
        use std::os::unix::ffi::OsStrExt;
        path.as_os_str().as_bytes().to_vec()
    };
    #[cfg(not(unix))]
    let bytes = path.to_str().ok_or(NetError::InvalidPath)?.as_bytes().to_vec();

    CString::new(bytes).map_err(|_| NetError::InvalidPath)
}

// SAFETY (all setopt helpers): `raw` must be a live easy handle and the
// pointer argument must stay valid for as long as the engine may read it.

pub(crate) unsafe fn setopt_long(raw: *mut CURL, option: u32, value: i64) -> Result<(), NetError> {
    let value = long_value(option, value)?;
    curl_sys::curl_easy_setopt(raw, option as _, value).easy_result()
}

/// `value` as the engine's `long`, which is 32 bits on some 64-bit targets.
pub(crate) fn long_value(option: u32, value: i64) -> Result<c_long, NetError> {
    c_long::try_from(value).map_err(|_| NetError::ValueOutOfRange { option, value })
}

/// The pointer-sized slot `PRIVATE` stores a tag in.
pub(crate) fn tag_slot(tag: u64) -> Result<usize, NetError> {
    usize::try_from(tag).map_err(|_| NetError::TagOutOfRange(tag))
}

pub(crate) unsafe fn setopt_off_t(raw: *mut CURL, option: u32, value: i64) -> Result<(), NetError> {
    curl_sys::curl_easy_setopt(raw, option as _, value as curl_off_t).easy_result()
}

pub(crate) unsafe fn setopt_ptr(
    raw: *mut CURL,
    option: u32,
    value: *const c_void,
) -> Result<(), NetError> {
    curl_sys::curl_easy_setopt(raw, option as _, value).easy_result()
}

/// Installs a blob with the engine's copy flag; nothing is retained.
pub(crate) unsafe fn setopt_blob(raw: *mut CURL, option: u32, data: &[u8]) -> Result<(), NetError> {
    let blob = curl_blob {
        data: data.as_ptr() as *mut c_void,
        len: data.len(),
        flags: sys::CURL_BLOB_COPY,
    };
    setopt_ptr(raw, option, &blob as *const curl_blob as *const c_void)
}

/// Values whose lifetime must match the handle's.
#[derive(Default)]
pub struct OptionStore {
    strings: HashMap<u32, CString>,
    lists: HashMap<u32, HeaderList>,
    mime: Option<MimeData>,
}

impl OptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duplicate `value`, install the duplicate and keep it.
    ///
    /// # Safety
    /// `raw` must be the live handle this store belongs to.
    pub(crate) unsafe fn set_string(
        &mut self,
        raw: *mut CURL,
        option: u32,
        value: &str,
    ) -> Result<(), NetError> {
        let value = CString::new(value).map_err(|_| NetError::InteriorNul)?;
        self.install_string(raw, option, value)
    }

    /// # Safety
    /// See [`OptionStore::set_string`].
    pub(crate) unsafe fn install_string(
        &mut self,
        raw: *mut CURL,
        option: u32,
        value: CString,
    ) -> Result<(), NetError> {
        setopt_ptr(raw, option, value.as_ptr().cast())?;
        // The previous duplicate is released only after the engine moved on.
        self.strings.insert(option, value);
        Ok(())
    }

    /// Install `list` for `option` and move its contents into the store.
    ///
    /// # Safety
    /// See [`OptionStore::set_string`].
    pub(crate) unsafe fn attach_list(
        &mut self,
        raw: *mut CURL,
        option: u32,
        list: &mut HeaderList,
    ) -> Result<(), NetError> {
        setopt_ptr(raw, option, list.as_ptr() as *const c_void)?;
        let owned = list.take();
        if owned.is_empty() {
            self.lists.remove(&option);
        } else {
            self.lists.insert(option, owned);
        }
        Ok(())
    }

    /// Install `tree` as the request body and move it into the store.
    ///
    /// # Safety
    /// See [`OptionStore::set_string`].
    pub(crate) unsafe fn attach_mime(
        &mut self,
        raw: *mut CURL,
        tree: &mut MimeTree,
    ) -> Result<(), NetError> {
        if tree.owner() != raw as usize {
            return Err(NetError::MimeOwnerMismatch);
        }
        let ptr = tree.as_ptr().ok_or(NetError::MimeTransferred)?;
        setopt_ptr(raw, sys::CURLOPT_MIMEPOST, ptr as *const c_void)?;
        self.mime = tree.take();
        Ok(())
    }

    /// Release everything. The handle must no longer reference the values.
    pub(crate) fn clear(&mut self) {
        self.strings.clear();
        self.lists.clear();
        self.mime = None;
    }

    /// Owned duplicate installed for `option`.
    pub fn string(&self, option: u32) -> Option<&CStr> {
        self.strings.get(&option).map(CString::as_c_str)
    }

    /// Lines of the list installed for `option`.
    pub fn list_lines(&self, option: u32) -> Option<Vec<String>> {
        self.lists.get(&option).map(HeaderList::lines)
    }

    /// Parts of the attached mime tree, if any.
    pub fn mime_parts(&self) -> Option<&[MimePartInfo]> {
        self.mime.as_ref().map(MimeData::parts)
    }

    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    pub fn list_count(&self) -> usize {
        self.lists.len()
    }

    pub fn has_mime(&self) -> bool {
        self.mime.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty() && self.lists.is_empty() && self.mime.is_none()
    }
}

impl fmt::Debug for OptionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut strings: Vec<_> = self.strings.keys().copied().collect();
        strings.sort_unstable();
        let mut lists: Vec<_> = self.lists.keys().copied().collect();
        lists.sort_unstable();
        f.debug_struct("OptionStore")
            .field("strings", &strings)
            .field("lists", &lists)
            .field("mime", &self.mime.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_id_range() {
        assert_eq!(expected_kind(sys::CURLOPT_VERBOSE), OptionKind::Long);
        assert_eq!(expected_kind(sys::CURLOPT_URL), OptionKind::String);
        assert_eq!(expected_kind(sys::CURLOPT_WRITEFUNCTION), OptionKind::Callback);
        // CURLOPT_MAX_RECV_SPEED_LARGE
        assert_eq!(expected_kind(30_146), OptionKind::OffT);
        // CURLOPT_SSLCERT_BLOB
        assert_eq!(expected_kind(40_291), OptionKind::Blob);
    }

    #[test]
    fn test_kind_from_table() {
        assert_eq!(expected_kind(sys::CURLOPT_HTTPHEADER), OptionKind::List);
        assert_eq!(expected_kind(sys::CURLOPT_RESOLVE), OptionKind::List);
        assert_eq!(expected_kind(sys::CURLOPT_MIMEPOST), OptionKind::Mime);
        assert_eq!(expected_kind(sys::CURLOPT_SHARE), OptionKind::Pointer);
    }

    #[test]
    fn test_reserved_options_rejected() {
        let err = validate(sys::CURLOPT_WRITEDATA, &OptionValue::Long(0)).unwrap_err();
        assert_eq!(err, NetError::ReservedOption(sys::CURLOPT_WRITEDATA));
        assert!(validate(sys::CURLOPT_PRIVATE, &OptionValue::Long(1)).is_err());
        assert!(validate(sys::CURLOPT_HEADERFUNCTION, &OptionValue::Long(1)).is_err());
    }

    #[test]
    fn test_kind_mismatch() {
        let err = validate(sys::CURLOPT_URL, &OptionValue::Long(1)).unwrap_err();
        assert_eq!(
            err,
            NetError::OptionKindMismatch {
                option: sys::CURLOPT_URL,
                expected: "string",
                actual: "long",
            }
        );
        let mut list = HeaderList::new();
        assert!(validate(sys::CURLOPT_USERAGENT, &OptionValue::List(&mut list)).is_err());
        assert!(validate(sys::CURLOPT_ERRORBUFFER, &OptionValue::String("x")).is_err());
    }

    #[test]
    fn test_matching_kinds_accepted() {
        assert!(validate(sys::CURLOPT_TIMEOUT_MS, &OptionValue::Long(500)).is_ok());
        assert!(validate(sys::CURLOPT_USERAGENT, &OptionValue::String("ua")).is_ok());
        assert!(validate(30_146, &OptionValue::OffT(1 << 20)).is_ok());
        assert!(validate(40_291, &OptionValue::Blob(b"pem")).is_ok());
        let mut list = HeaderList::new();
        assert!(validate(sys::CURLOPT_HTTPHEADER, &OptionValue::List(&mut list)).is_ok());
    }

    #[test]
    fn test_path_to_cstring() {
        let c = path_to_cstring(Path::new("/etc/ssl/cert.pem")).unwrap();
        assert_eq!(c.to_bytes(), b"/etc/ssl/cert.pem");
    }

    #[test]
    fn test_empty_store() {
        let store = OptionStore::new();
        assert!(store.is_empty());
        assert!(store.string(sys::CURLOPT_URL).is_none());
        assert!(store.mime_parts().is_none());
        assert_eq!(
            format!("{:?}", store),
            "OptionStore { strings: [], lists: [], mime: false }"
        );
        assert_eq!(store.string_count(), 0);
    }

    #[test]
    fn test_borrowed_value_kinds() {
        let mut list = HeaderList::new();
        assert!(OptionValue::String("x").is_borrowed_by_engine());
        assert!(OptionValue::List(&mut list).is_borrowed_by_engine());
        assert!(!OptionValue::Long(1).is_borrowed_by_engine());
        assert!(!OptionValue::OffT(1).is_borrowed_by_engine());
        assert!(!OptionValue::Blob(b"copied").is_borrowed_by_engine());
    }

    #[test]
    fn test_long_value_range() {
        assert_eq!(long_value(sys::CURLOPT_TIMEOUT_MS, 500).unwrap(), 500);
        let wide = i64::from(i32::MAX) + 1;
        if c_long::BITS < 64 {
            assert_eq!(
                long_value(sys::CURLOPT_TIMEOUT_MS, wide),
                Err(NetError::ValueOutOfRange {
                    option: sys::CURLOPT_TIMEOUT_MS,
                    value: wide,
                })
            );
        } else {
            assert_eq!(long_value(sys::CURLOPT_TIMEOUT_MS, wide).unwrap() as i64, wide);
        }
    }

    #[test]
    fn test_tag_slot_range() {
        assert_eq!(tag_slot(30).unwrap(), 30);
        if usize::BITS < 64 {
            assert_eq!(tag_slot(u64::MAX), Err(NetError::TagOutOfRange(u64::MAX)));
        } else {
            assert_eq!(tag_slot(u64::MAX).unwrap() as u64, u64::MAX);
        }
    }
}
