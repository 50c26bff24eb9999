//! socket.io v1 text frames spoken over the SmartView duplex channel.
//!
//! Wire frames:
//! - `1::`: greeting sent by the TV once the socket is open
//! - `1::/com.samsung.companion`: handshake (sent by us, echoed back as the ack)
//! - `2::`: keepalive, echoed verbatim
//! - `5::/com.samsung.companion:{json}`: application envelope

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{SamError, SamResult};

/// Sub-protocol namespace used by the SmartView companion service.
pub const NAMESPACE: &str = "/com.samsung.companion";

pub const GREETING: &str = "1::";
pub const HANDSHAKE: &str = "1::/com.samsung.companion";
pub const KEEPALIVE: &str = "2::";
pub const ENVELOPE_PREFIX: &str = "5::/com.samsung.companion:";

/// The single remote call the device accepts from clients.
pub const COMMON_CALL: &str = "callCommon";

/// The call name the device uses for its own replies and events.
pub const COMMON_REPLY: &str = "receiveCommon";

/// A decoded frame received from the device.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Greeting,
    HandshakeAck,
    Keepalive,
    Envelope(InboundEnvelope),
    Unknown(String),
}

impl Frame {
    /// Classify a text frame. Only a malformed envelope body is an error;
    /// any unrecognised frame is returned as `Frame::Unknown`.
    pub fn parse(text: &str) -> SamResult<Frame> {
        match text {
            GREETING => Ok(Frame::Greeting),
            HANDSHAKE => Ok(Frame::HandshakeAck),
            KEEPALIVE => Ok(Frame::Keepalive),
            _ => match text.strip_prefix(ENVELOPE_PREFIX) {
                Some(json) => {
                    let envelope: InboundEnvelope = serde_json::from_str(json).map_err(|e| {
                        SamError::InvalidResponse(format!("cannot parse envelope JSON: {e}"))
                    })?;
                    Ok(Frame::Envelope(envelope))
                }
                None => Ok(Frame::Unknown(text.to_string())),
            },
        }
    }
}

/// Application envelope sent by the device.
///
/// `args` is usually a string holding a JSON byte array: the AES ciphertext
/// of the reply or event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundEnvelope {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

impl InboundEnvelope {
    /// Extract the encrypted payload bytes.
    pub fn ciphertext(&self) -> SamResult<Vec<u8>> {
        let encoded = self
            .args
            .as_str()
            .ok_or_else(|| SamError::InvalidResponse("unhandled args format".into()))?;
        serde_json::from_str(encoded)
            .map_err(|e| SamError::InvalidResponse(format!("cannot parse encrypted payload: {e}")))
    }

    /// Decrypt the payload with the session key.
    pub fn open(&self, key: &[u8]) -> SamResult<String> {
        let plain = codec::decrypt(key, &self.ciphertext()?)?;
        String::from_utf8(plain)
            .map_err(|e| SamError::InvalidResponse(format!("decrypted payload is not UTF-8: {e}")))
    }
}

#[derive(Serialize)]
struct OutboundEnvelope<'a> {
    name: &'a str,
    args: [CallArgs; 1],
}

#[derive(Serialize)]
struct CallArgs {
    #[serde(rename = "Session_Id")]
    session_id: i64,
    body: String,
}

/// Build the envelope frame carrying an encrypted command.
pub fn envelope_frame(session_id: i64, ciphertext: &[u8]) -> SamResult<String> {
    let envelope = OutboundEnvelope {
        name: COMMON_CALL,
        args: [CallArgs {
            session_id,
            body: format!("[{}]", codec::to_byte_list(ciphertext)),
        }],
    };
    let json = serde_json::to_string(&envelope)
        .map_err(|e| SamError::InvalidResponse(format!("cannot encode envelope: {e}")))?;
    Ok(format!("{ENVELOPE_PREFIX}{json}"))
}
