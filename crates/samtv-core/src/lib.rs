//! samtv-core: protocol library for the Samsung SmartView remote-control channel.
//!
//! Provides the AES block codec used for command payloads, the socket.io-style
//! frame parser/builder, the key-press command template and the catalogue of
//! known key identifiers. Nothing in this crate performs I/O.

pub mod codec;
pub mod command;
pub mod error;
pub mod frame;
pub mod keys;

// Re-export commonly used items at crate root.
pub use codec::{decrypt, encrypt, session_key_from_hex, to_byte_list, BLOCK_SIZE, KEY_SIZE};
pub use command::{is_success_reply, key_press_command, SUCCESS_REPLY};
pub use error::{SamError, SamResult, SamResultExt};
pub use frame::{envelope_frame, Frame, InboundEnvelope};
pub use keys::{is_known_key, key_codes, KEY_CODES};
