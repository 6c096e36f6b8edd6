//! Owned header lists.
//!
//! A [`HeaderList`] owns an engine string list. Attaching it to a handle
//! moves the list into the handle: the source is left empty and dropping it
//! afterwards releases nothing.

use crate::base::neterror::NetError;
use crate::sys::curl_slist;
use std::ffi::{CStr, CString};
use std::fmt;
use std::ptr::{self, NonNull};

/// Ordered list of header lines.
pub struct HeaderList {
    head: Option<NonNull<curl_slist>>,
    len: usize,
}

impl HeaderList {
    pub fn new() -> Self {
        Self { head: None, len: 0 }
    }

    /// Build a list from lines, in order.
    pub fn from_lines<I, S>(lines: I) -> Result<Self, NetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        for line in lines {
            list.append(line.as_ref())?;
        }
        Ok(list)
    }

    /// Append one line, e.g. `"Accept: */*"`.
    pub fn append(&mut self, line: &str) -> Result<(), NetError> {
        let line = CString::new(line).map_err(|_| NetError::InteriorNul)?;
        let head = self.head.map_or(ptr::null_mut(), NonNull::as_ptr);
        // SAFETY: `head` is null or a list we own; the engine copies `line`.
        let appended = unsafe { curl_sys::curl_slist_append(head, line.as_ptr()) };
        // On failure the engine leaves the existing list untouched.
        self.head = Some(NonNull::new(appended).ok_or(NetError::OutOfMemory("header list"))?);
        self.len += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Copies of the lines, in order.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.len);
        let mut cursor = self.head.map_or(ptr::null_mut(), NonNull::as_ptr);
        while !cursor.is_null() {
            // SAFETY: every node of a list we own is valid until freed.
            unsafe {
                let node = &*cursor;
                if !node.data.is_null() {
                    lines.push(CStr::from_ptr(node.data).to_string_lossy().into_owned());
                }
                cursor = node.next;
            }
        }
        lines
    }

    pub(crate) fn as_ptr(&self) -> *mut curl_slist {
        self.head.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    /// Move the contents out, leaving `self` empty.
    pub(crate) fn take(&mut self) -> HeaderList {
        HeaderList {
            head: self.head.take(),
            len: std::mem::take(&mut self.len),
        }
    }
}

impl Default for HeaderList {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HeaderList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.lines()).finish()
    }
}

impl Drop for HeaderList {
    fn drop(&mut self) {
        if let Some(head) = self.head.take() {
            // SAFETY: the list is owned by us and freed exactly once here.
            unsafe { curl_sys::curl_slist_free_all(head.as_ptr()) };
        }
    }
}
