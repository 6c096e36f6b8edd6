//! Multi-transfer scheduler.
//!
//! A [`MultiScheduler`] drives every attached handle without blocking and
//! hands completions back as [`CompletionEvent`]s. It tracks membership, not
//! ownership: callers keep their handles and must keep them alive while
//! attached (dropping an attached handle detaches it first).
//!
//! A typical loop:
//!
//! ```ignore
//! loop {
//!     let running = scheduler.perform_step()?;
//!     while let Some(event) = scheduler.harvest_one() {
//!         handle_event(event);
//!     }
//!     if running == 0 {
//!         break;
//!     }
//!     scheduler.poll(Duration::from_millis(100))?;
//! }
//! ```
//!
//! Several transfers may finish within one step, so the completion queue must
//! be drained before the next step.

use crate::base::context::EngineCodeExt;
use crate::base::global::LiveToken;
use crate::base::loadstate::LoadState;
use crate::base::neterror::NetError;
use crate::easy::handle::{TransferHandle, TransferState};
use crate::multi::message::CompletionEvent;
use crate::sys::{self, CURL, CURLM};
use libc::c_int;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ptr::{self, NonNull};
use std::rc::Rc;
use std::time::Duration;

struct Member {
    tag: Option<u64>,
    state: NonNull<TransferState>,
}

/// Native multi handle and its membership table.
///
/// Shared between the scheduler and its attached handles so whichever is
/// dropped last releases the native multi handle.
pub(crate) struct MultiShared {
    raw: NonNull<CURLM>,
    // Keyed by native easy handle address.
    members: RefCell<HashMap<usize, Member>>,
    _live: LiveToken,
}

impl MultiShared {
    pub(crate) fn contains(&self, easy: *mut CURL) -> bool {
        self.members.borrow().contains_key(&(easy as usize))
    }

    pub(crate) fn set_tag(&self, easy: *mut CURL, tag: u64) {
        if let Some(member) = self.members.borrow_mut().get_mut(&(easy as usize)) {
            member.tag = Some(tag);
        }
    }

    /// Remove `easy` from the native multi handle and the table.
    pub(crate) fn detach(&self, easy: *mut CURL) -> Result<(), NetError> {
        // SAFETY: `easy` is a live member of this multi handle.
        unsafe { curl_sys::curl_multi_remove_handle(self.raw.as_ptr(), easy) }.multi_result()?;
        if let Some(mut member) = self.members.borrow_mut().remove(&(easy as usize)) {
            // SAFETY: members are live handles; their state outlives membership.
            let state = unsafe { member.state.as_mut() };
            if state.load_state == LoadState::InFlight {
                state.load_state = LoadState::Configured;
            }
        }
        Ok(())
    }

    fn detach_all(&self) {
        let members: Vec<usize> = self.members.borrow().keys().copied().collect();
        for easy in members {
            if let Err(err) = self.detach(easy as *mut CURL) {
                tracing::warn!(error = %err, "failed to detach transfer handle");
            }
        }
    }
}

impl Drop for MultiShared {
    fn drop(&mut self) {
        // SAFETY: no member remains; the handle is released once.
        unsafe { curl_sys::curl_multi_cleanup(self.raw.as_ptr()) };
    }
}

/// Drives many transfers on the calling thread.
pub struct MultiScheduler {
    shared: Rc<MultiShared>,
}

impl MultiScheduler {
    pub fn new() -> Result<Self, NetError> {
        let live = LiveToken::acquire()?;
        // SAFETY: the engine is initialized while `live` is held.
        let raw = unsafe { curl_sys::curl_multi_init() };
        let raw = NonNull::new(raw).ok_or(NetError::OutOfMemory("scheduler"))?;
        tracing::debug!(scheduler = ?raw, "scheduler created");
        Ok(Self {
            shared: Rc::new(MultiShared {
                raw,
                members: RefCell::new(HashMap::new()),
                _live: live,
            }),
        })
    }

    fn raw(&self) -> *mut CURLM {
        self.shared.raw.as_ptr()
    }

    /// Attach `handle` and prepare it for a fresh transfer.
    ///
    /// A handle already attached to any scheduler is rejected with the
    /// engine's `ADDED_ALREADY` code.
    pub fn add(&mut self, handle: &mut TransferHandle) -> Result<(), NetError> {
        if handle.is_attached() {
            return Err(NetError::scheduler(sys::CURLM_ADDED_ALREADY));
        }
        handle.begin_transfer();
        let easy = handle.as_raw();
        // SAFETY: both handles are live; membership is recorded below.
        unsafe { curl_sys::curl_multi_add_handle(self.raw(), easy) }.multi_result()?;

        self.shared.members.borrow_mut().insert(
            easy as usize,
            Member {
                tag: handle.tag(),
                state: handle.state_ptr(),
            },
        );
        handle.set_attachment(Some(Rc::clone(&self.shared)));
        handle.set_load_state(LoadState::InFlight);
        tracing::debug!(tag = ?handle.tag(), members = self.len(), "transfer attached");
        Ok(())
    }

    /// Detach `handle`, cancelling its transfer if it is still running.
    ///
    /// Detaching a handle that is not attached anywhere does nothing; a
    /// handle attached to a different scheduler is rejected with the
    /// engine's `BAD_EASY_HANDLE` code.
    pub fn remove(&mut self, handle: &mut TransferHandle) -> Result<(), NetError> {
        let ours = match handle.attached() {
            None => return Ok(()),
            Some(shared) => Rc::ptr_eq(shared, &self.shared),
        };
        if !ours {
            return Err(NetError::scheduler(sys::CURLM_BAD_EASY_HANDLE));
        }
        self.shared.detach(handle.as_raw())?;
        handle.set_attachment(None);
        tracing::debug!(tag = ?handle.tag(), members = self.len(), "transfer detached");
        Ok(())
    }

    pub fn contains(&self, handle: &TransferHandle) -> bool {
        self.shared.contains(handle.as_raw())
    }

    pub fn len(&self) -> usize {
        self.shared.members.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advance every attached transfer without blocking.
    ///
    /// Returns how many transfers are still running.
    pub fn perform_step(&mut self) -> Result<usize, NetError> {
        let mut running: c_int = 0;
        // SAFETY: the multi handle is live; callbacks write into member state.
        unsafe { curl_sys::curl_multi_perform(self.raw(), &mut running) }.multi_result()?;
        Ok(usize::try_from(running).unwrap_or(0))
    }

    /// Wait for activity on any attached transfer, at most `timeout`.
    ///
    /// Returns the number of ready descriptors; zero after a timeout.
    pub fn poll(&mut self, timeout: Duration) -> Result<usize, NetError> {
        let timeout_ms = c_int::try_from(timeout.as_millis()).unwrap_or(c_int::MAX);
        let mut ready: c_int = 0;
        // SAFETY: no extra descriptors are passed.
        unsafe { sys::curl_multi_poll(self.raw(), ptr::null_mut(), 0, timeout_ms, &mut ready) }
            .multi_result()?;
        Ok(usize::try_from(ready).unwrap_or(0))
    }

    /// Pop one completion from the engine queue. `None` when it is empty.
    pub fn harvest_one(&mut self) -> Option<CompletionEvent> {
        loop {
            let mut queued: c_int = 0;
            // SAFETY: the returned message is valid until the next call.
            let msg = unsafe { curl_sys::curl_multi_info_read(self.raw(), &mut queued) };
            if msg.is_null() {
                return None;
            }
            // SAFETY: non-null and not yet invalidated by another read.
            let msg = unsafe { &*msg };
            if msg.msg as c_int != sys::CURLMSG_DONE {
                continue;
            }
            // For DONE messages the data union holds the result code.
            let mut code = msg.data as usize as i32;

            let mut members = self.shared.members.borrow_mut();
            let tag = match members.get_mut(&(msg.easy_handle as usize)) {
                Some(member) => {
                    // SAFETY: members are live handles.
                    let state = unsafe { member.state.as_mut() };
                    if state.alloc_failed {
                        code = sys::CURLE_OUT_OF_MEMORY;
                    }
                    state.load_state = if code == sys::CURLE_OK {
                        LoadState::Performed
                    } else {
                        LoadState::Failed
                    };
                    member.tag
                }
                None => None,
            };
            tracing::debug!(tag = ?tag, code, "transfer completed");
            return Some(CompletionEvent { tag, code });
        }
    }

    /// Harvest until the queue is empty.
    pub fn drain_completions(&mut self) -> Vec<CompletionEvent> {
        std::iter::from_fn(|| self.harvest_one()).collect()
    }

    /// Drive every attached transfer to completion.
    ///
    /// Waits at most `poll_timeout` per idle round and returns every
    /// completion harvested along the way.
    pub fn run(&mut self, poll_timeout: Duration) -> Result<Vec<CompletionEvent>, NetError> {
        let mut events = Vec::new();
        loop {
            let running = self.perform_step()?;
            events.extend(self.drain_completions());
            if running == 0 {
                break;
            }
            self.poll(poll_timeout)?;
        }
        events.extend(self.drain_completions());
        Ok(events)
    }
}

impl fmt::Debug for MultiScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiScheduler")
            .field("members", &self.len())
            .finish()
    }
}

impl Drop for MultiScheduler {
    fn drop(&mut self) {
        // Handles outlive the scheduler; they simply become detached.
        self.shared.detach_all();
        tracing::debug!("scheduler dropped");
    }
}
