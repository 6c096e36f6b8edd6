//! Multipart (MIME) request bodies.
//!
//! A [`MimeTree`] is created for one specific handle and owns its parts.
//! Attaching it moves the native tree into that handle; the tree object is
//! left empty, dropping it afterwards releases nothing, and adding parts to it
//! fails with [`NetError::MimeTransferred`].

use crate::base::context::EngineCodeExt;
use crate::base::global::LiveToken;
use crate::base::neterror::NetError;
use crate::easy::handle::TransferHandle;
use crate::easy::options::path_to_cstring;
use crate::sys::{self, curl_mime, curl_mimepart};
use std::ffi::CString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

/// Where a part's content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimeSource {
    /// In-memory data of the given length, copied into the part.
    Data(usize),
    /// File read by the engine when the body is sent.
    File(PathBuf),
}

/// What has been set on one part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimePartInfo {
    pub name: Option<String>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub source: Option<MimeSource>,
}

/// Native tree plus the description of its parts.
pub(crate) struct MimeData {
    raw: NonNull<curl_mime>,
    parts: Vec<MimePartInfo>,
}

impl MimeData {
    pub(crate) fn as_ptr(&self) -> *mut curl_mime {
        self.raw.as_ptr()
    }

    pub(crate) fn parts(&self) -> &[MimePartInfo] {
        &self.parts
    }
}

impl Drop for MimeData {
    fn drop(&mut self) {
        // SAFETY: the tree is owned here and freed exactly once; freeing the
        // root releases every part.
        unsafe { sys::curl_mime_free(self.raw.as_ptr()) };
    }
}

/// Multipart body under construction.
pub struct MimeTree {
    data: Option<MimeData>,
    owner: usize,
    _live: LiveToken,
}

impl MimeTree {
    /// Create an empty tree bound to `handle`.
    pub fn new(handle: &TransferHandle) -> Result<Self, NetError> {
        let live = LiveToken::acquire()?;
        // SAFETY: the handle pointer is valid for the duration of the call.
        let raw = unsafe { sys::curl_mime_init(handle.as_raw()) };
        let raw = NonNull::new(raw).ok_or(NetError::OutOfMemory("mime tree"))?;
        Ok(Self {
            data: Some(MimeData {
                raw,
                parts: Vec::new(),
            }),
            owner: handle.as_raw() as usize,
            _live: live,
        })
    }

    /// Append a new, empty part and return it for configuration.
    pub fn add_part(&mut self) -> Result<MimePart<'_>, NetError> {
        let data = self.data.as_mut().ok_or(NetError::MimeTransferred)?;
        // SAFETY: the tree is alive and owned by us.
        let raw = unsafe { sys::curl_mime_addpart(data.raw.as_ptr()) };
        let raw = NonNull::new(raw).ok_or(NetError::OutOfMemory("mime part"))?;
        data.parts.push(MimePartInfo::default());
        let index = data.parts.len() - 1;
        Ok(MimePart {
            raw,
            info: &mut data.parts[index],
        })
    }

    /// Parts added so far. Empty once the tree has been attached.
    pub fn parts(&self) -> &[MimePartInfo] {
        self.data.as_ref().map_or(&[][..], |d| d.parts.as_slice())
    }

    pub fn len(&self) -> usize {
        self.parts().len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts().is_empty()
    }

    /// Whether the native tree has moved into a handle.
    pub fn is_transferred(&self) -> bool {
        self.data.is_none()
    }

    pub(crate) fn owner(&self) -> usize {
        self.owner
    }

    pub(crate) fn as_ptr(&self) -> Option<*mut curl_mime> {
        self.data.as_ref().map(MimeData::as_ptr)
    }

    pub(crate) fn take(&mut self) -> Option<MimeData> {
        self.data.take()
    }
}

impl fmt::Debug for MimeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MimeTree")
            .field("parts", &self.parts())
            .field("transferred", &self.is_transferred())
            .finish()
    }
}

/// One part of a [`MimeTree`].
pub struct MimePart<'a> {
    raw: NonNull<curl_mimepart>,
    info: &'a mut MimePartInfo,
}

impl MimePart<'_> {
    /// Form field name.
    pub fn name(&mut self, name: &str) -> Result<&mut Self, NetError> {
        let value = CString::new(name).map_err(|_| NetError::InteriorNul)?;
        // SAFETY: the part is alive while its tree is borrowed; the engine copies the string.
        unsafe { sys::curl_mime_name(self.raw.as_ptr(), value.as_ptr()) }.easy_result()?;
        self.info.name = Some(name.to_owned());
        Ok(self)
    }

    /// In-memory content. The bytes are copied.
    pub fn data(&mut self, data: &[u8]) -> Result<&mut Self, NetError> {
        // SAFETY: the engine copies `data.len()` bytes before returning.
        unsafe { sys::curl_mime_data(self.raw.as_ptr(), data.as_ptr().cast(), data.len()) }
            .easy_result()?;
        self.info.source = Some(MimeSource::Data(data.len()));
        Ok(self)
    }

    /// Remote file name reported in the part's disposition.
    pub fn filename(&mut self, filename: &str) -> Result<&mut Self, NetError> {
        let value = CString::new(filename).map_err(|_| NetError::InteriorNul)?;
        // SAFETY: see `name`.
        unsafe { sys::curl_mime_filename(self.raw.as_ptr(), value.as_ptr()) }.easy_result()?;
        self.info.filename = Some(filename.to_owned());
        Ok(self)
    }

    /// Content type, e.g. `"text/plain"`.
    pub fn content_type(&mut self, content_type: &str) -> Result<&mut Self, NetError> {
        let value = CString::new(content_type).map_err(|_| NetError::InteriorNul)?;
        // SAFETY: see `name`.
        unsafe { sys::curl_mime_type(self.raw.as_ptr(), value.as_ptr()) }.easy_result()?;
        self.info.content_type = Some(content_type.to_owned());
        Ok(self)
    }

    /// Content read from a file when the body is sent.
    ///
    /// The engine also uses the file's base name as the default filename.
    pub fn file_data(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, NetError> {
        let path = path.as_ref();
        let value = path_to_cstring(path)?;
        // SAFETY: see `name`.
        unsafe { sys::curl_mime_filedata(self.raw.as_ptr(), value.as_ptr()) }.easy_result()?;
        self.info.source = Some(MimeSource::File(path.to_path_buf()));
        Ok(self)
    }

    pub fn info(&self) -> &MimePartInfo {
        &*self.info
    }
}
