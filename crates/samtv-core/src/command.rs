//! Plaintext command bodies sent inside envelopes.

use serde::Serialize;

use crate::error::{SamError, SamResult};

/// Acknowledgement the TV returns for a remote key command, as it appears
/// in the last decrypted block.
pub const SUCCESS_REPLY: &str = r#""result":{}}"#;

#[derive(Serialize)]
struct Command<'a> {
    method: &'a str,
    body: RemoteKeyBody<'a>,
}

#[derive(Serialize)]
struct RemoteKeyBody<'a> {
    plugin: &'a str,
    param1: String,
    param2: &'a str,
    param3: &'a str,
    param4: bool,
    api: &'a str,
    version: &'a str,
}

/// Build the `SendRemoteKey` command for a single click of `key`.
pub fn key_press_command(device_id: &str, key: &str) -> SamResult<String> {
    let command = Command {
        method: "POST",
        body: RemoteKeyBody {
            plugin: "RemoteControl",
            param1: format!("uuid:{device_id}"),
            param2: "Click",
            param3: key,
            param4: false,
            api: "SendRemoteKey",
            version: "1.000",
        },
    };
    serde_json::to_string(&command)
        .map_err(|e| SamError::InvalidResponse(format!("cannot encode command: {e}")))
}

/// Whether a decrypted reply acknowledges a remote key command.
///
/// Matches the bare acknowledgement as well as a full reply whose last field
/// is an empty `result` object.
pub fn is_success_reply(reply: &str) -> bool {
    match reply.strip_suffix(SUCCESS_REPLY) {
        Some(head) => head.is_empty() || head.ends_with(&[',', '{'][..]),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_press_template_is_byte_exact() {
        assert_eq!(
            key_press_command("samtv", "KEY_VOLUP").unwrap(),
            r#"{"method":"POST","body":{"plugin":"RemoteControl","param1":"uuid:samtv","param2":"Click","param3":"KEY_VOLUP","param4":false,"api":"SendRemoteKey","version":"1.000"}}"#
        );
    }

    #[test]
    fn key_identifier_is_escaped() {
        let cmd = key_press_command("id", "KEY_\"X").unwrap();
        assert!(cmd.contains(r#""param3":"KEY_\"X""#));
    }

    #[test]
    fn success_reply_detection() {
        assert!(is_success_reply(SUCCESS_REPLY));
        assert!(is_success_reply(r#"{"plugin":"RemoteControl","result":{}}"#));
        assert!(is_success_reply(r#"{"result":{}}"#));
        assert!(!is_success_reply(r#"{"result":{"error":1}}"#));
        assert!(!is_success_reply(""));
        assert!(!is_success_reply(r#"{"error":"result":{}}"#));
        assert!(!is_success_reply(r#"{"noresult":{}}"#));
    }
}
