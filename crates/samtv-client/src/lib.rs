//! samtv-client: async client for Samsung SmartView TVs (2014+ models).
//!
//! Pairs with the TV through its PIN-gated HTTP handshake, opens the
//! socket.io WebSocket channel and sends encrypted remote key presses.
//!
//! # Quick Start
//!
//! ```no_run
//! use samtv_client::{DeviceAddress, Session, SessionConfig};
//!
//! # async fn example() -> samtv_core::SamResult<()> {
//! let session = Session::new(DeviceAddress::new("192.168.1.20")?, SessionConfig::default())?;
//! session.restore_session_hex("00112233445566778899aabbccddeeff", 3, "samtv")?;
//!
//! session.init_session().await?;
//! session.send_key("KEY_VOLUP").await?;
//! session.close().await;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;

pub mod device;
pub mod http;
pub mod pairing;
pub mod session;
pub mod transport;

/// Boxed `Send` future returned by the object-safe collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// Re-export primary public types.
pub use device::{DeviceAddress, DeviceDescription};
pub use http::{HttpClient, HttpRequest, ReqwestClient};
pub use pairing::{
    Backend, HelloContext, KeyExchange, Pairing, PairingBackend, PairingOutcome, PairingStatus,
    RemoteConfig, SharedSecret,
};
pub use session::{ConnectionState, Credentials, Session, SessionConfig};
pub use transport::{Channel, Connector, FrameReader, FrameWriter, WebSocketConnector};

// Re-export samtv-core error types for convenience.
pub use samtv_core::{SamError, SamResult};
