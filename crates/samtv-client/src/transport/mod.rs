//! Duplex channel abstraction for the SmartView session.
//!
//! A `Connector` performs whatever bootstrap the transport needs and yields
//! a `Channel`: a reader half owned by the session's background task and a
//! writer half shared with foreground callers.

pub mod websocket;

pub use websocket::WebSocketConnector;

use samtv_core::SamResult;

use crate::device::DeviceAddress;
use crate::BoxFuture;

/// Receiving half of a duplex channel.
pub trait FrameReader: Send {
    /// Read the next text frame. `Ok(None)` means the peer closed the channel.
    fn read_frame(&mut self) -> BoxFuture<'_, SamResult<Option<String>>>;
}

/// Sending half of a duplex channel.
pub trait FrameWriter: Send {
    /// Write one text frame.
    fn write_frame<'a>(&'a mut self, text: &'a str) -> BoxFuture<'a, SamResult<()>>;

    /// Send a close frame and shut the channel down.
    fn close(&mut self) -> BoxFuture<'_, SamResult<()>>;
}

/// An open duplex channel, split into its two halves.
pub struct Channel {
    pub reader: Box<dyn FrameReader>,
    pub writer: Box<dyn FrameWriter>,
}

/// Opens duplex channels to a device.
pub trait Connector: Send + Sync {
    fn connect<'a>(&'a self, address: &'a DeviceAddress) -> BoxFuture<'a, SamResult<Channel>>;
}
