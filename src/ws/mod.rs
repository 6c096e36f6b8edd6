//! WebSocket framing over an upgraded transfer.
//!
//! Available only when the linked engine exports websocket support; the
//! capability is probed once per process (see
//! [`supports_websocket`](crate::base::global::supports_websocket)).
//!
//! # Example
//! ```ignore
//! use curlnet::ws::{WebSocketChannel, WsRecv};
//!
//! let mut ws = WebSocketChannel::connect("ws://127.0.0.1:9001/")?;
//! ws.send_text("hello")?;
//! loop {
//!     match ws.recv()? {
//!         WsRecv::Frame { data, .. } => break println!("{:?}", data),
//!         WsRecv::Empty => std::thread::sleep(std::time::Duration::from_millis(5)),
//!     }
//! }
//! ```

mod channel;
pub mod frame;

pub use channel::{UpgradeError, WebSocketChannel};
pub use frame::{CloseCode, WsFlags, WsFrameMeta, WsRecv, WsSend};
