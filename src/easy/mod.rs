//! Single transfers.
//!
//! - [`TransferHandle`]: one reusable request/response unit
//! - [`ResponseBuffer`] / [`HeaderBuffer`]: growable response storage
//! - [`HeaderList`] / [`MimeTree`]: option values moved into a handle
//! - [`OptionStore`]: ownership of every value the engine may still read

pub mod buffer;
pub mod handle;
pub mod head;
pub mod headerlist;
pub mod mime;
pub mod options;
pub mod streaming;

pub use buffer::{grown_capacity, HeaderBuffer, ResponseBuffer};
pub use handle::TransferHandle;
pub use head::ResponseHead;
pub use headerlist::HeaderList;
pub use mime::{MimePart, MimePartInfo, MimeSource, MimeTree};
pub use options::{expected_kind, OptionKind, OptionStore, OptionValue};
pub use streaming::StreamingController;
