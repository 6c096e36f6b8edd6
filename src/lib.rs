//! # curlnet
//!
//! Safe, reusable transfer objects over libcurl's easy/multi handle model.
//!
//! `curlnet` keeps the engine doing what it is good at (sockets, TLS, HTTP,
//! connection reuse) and adds the bookkeeping around it: response buffers
//! with deterministic growth, ownership of every option value the engine may
//! still read, incremental body streaming, and a scheduler that drives many
//! transfers and reports each completion exactly once.
//!
//! ## Features
//!
//! - **Reusable handles**: buffers keep their capacity across transfers;
//!   `reset` restores a freshly created handle
//! - **Owned option values**: strings are duplicated, header lists and
//!   multipart trees move into the handle
//! - **Streaming**: drain body bytes while a scheduled transfer is running
//! - **Scheduler**: non-blocking progress, readiness polling, tagged
//!   completion events
//! - **WebSocket**: frame-level send/receive when the linked engine supports it
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use curlnet::easy::{HeaderList, TransferHandle};
//!
//! let mut handle = TransferHandle::new()?;
//! handle.set_url("https://example.com/")?;
//! let mut headers = HeaderList::from_lines(["Accept: text/html"])?;
//! handle.set_headers(&mut headers)?;
//! handle.perform()?;
//! println!("{} bytes", handle.response_body().len());
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Errors, lifecycle states and process-wide engine state
//! - [`easy`] - Transfer handles, buffers and owned option values
//! - [`multi`] - The multi-transfer scheduler
//! - [`ws`] - WebSocket framing over upgraded handles
//! - [`tls`] - CA bundle resolution
//! - [`config`] - Declarative transfer configuration
//!
//! ## Threading
//!
//! Handles and schedulers are `!Send`: drive them from the thread that
//! created them. Use one scheduler per thread for parallelism.

pub mod base;
pub mod config;
pub mod easy;
pub mod multi;
pub mod sys;
pub mod tls;
pub mod ws;

pub use base::{LoadState, NetError};
pub use config::{TransferConfig, TransferConfigBuilder};
pub use easy::{HeaderList, MimeTree, OptionValue, TransferHandle};
pub use multi::{CompletionEvent, MultiScheduler};
pub use ws::{WebSocketChannel, WsFlags};
