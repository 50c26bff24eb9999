//! Pairing backend driving a caller-supplied key-exchange primitive.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use samtv_core::{SamError, SamResult, KEY_SIZE};

use super::{
    parse_session_id, AuthData, DeviceSteps, Negotiation, NegotiationState, PairingBackend,
    PairingOutcome,
};
use crate::BoxFuture;

/// App id announced to the device by the local backend.
pub const APP_ID: &str = "samtvcli";
/// User id fed to the server hello.
pub const USER_ID: &str = "654321";

/// Opaque state produced by `server_hello` and consumed by `parse_client_hello`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloContext(pub Vec<u8>);

/// Secret material derived from the client hello.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret {
    pub sk_prime: Vec<u8>,
    pub session_key: Vec<u8>,
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecret").finish_non_exhaustive()
    }
}

/// The SmartView hello/acknowledge computation.
///
/// Implementations report a bad PIN from `parse_client_hello` and a forged
/// acknowledgement from `verify_client_acknowledge`.
pub trait KeyExchange: Send + Sync {
    fn server_hello(&self, user_id: &str, pin: &str) -> SamResult<(Vec<u8>, HelloContext)>;

    fn parse_client_hello(
        &self,
        context: &HelloContext,
        client_hello: &str,
    ) -> SamResult<SharedSecret>;

    fn server_acknowledge(&self, secret: &SharedSecret) -> SamResult<String>;

    fn verify_client_acknowledge(&self, secret: &SharedSecret, client_ack: &str) -> SamResult<()>;
}

#[derive(Serialize)]
struct StepBody<T> {
    auth_data: T,
}

#[derive(Serialize)]
struct ServerHello<'a> {
    auth_type: &'a str,
    #[serde(rename = "GeneratorServerHello")]
    server_hello: &'a str,
}

#[derive(Serialize)]
struct ServerAck<'a> {
    auth_type: &'a str,
    request_id: &'a str,
    #[serde(rename = "ServerAckMsg")]
    server_ack: &'a str,
}

const AUTH_TYPE: &str = "SPC";

/// Runs both device steps locally through a `KeyExchange`.
pub struct LocalBackend {
    exchange: Arc<dyn KeyExchange>,
}

impl LocalBackend {
    pub fn new(exchange: Arc<dyn KeyExchange>) -> Self {
        Self { exchange }
    }

    async fn hello(&self, steps: &DeviceSteps<'_>, pin: u32) -> SamResult<Negotiation> {
        let pin = pin.to_string();
        let (hello, context) = self.exchange.server_hello(USER_ID, &pin)?;
        let hello = hex::encode(hello);
        debug!("ServerHello: {}", hello);

        let body = serde_json::to_string(&StepBody {
            auth_data: ServerHello {
                auth_type: AUTH_TYPE,
                server_hello: &hello,
            },
        })?;
        let reply = AuthData::from_reply(&steps.post_step(1, &body).await?)?;

        let client_hello = reply
            .client_hello
            .as_deref()
            .ok_or_else(|| SamError::HandshakeRejected("could not get TV ClientHello".into()))?;
        debug!("ClientHello: `{}`", client_hello);

        let secret = self
            .exchange
            .parse_client_hello(&context, client_hello)
            .map_err(|e| match e {
                SamError::HandshakeRejected(_) => e,
                other => SamError::HandshakeRejected(format!("could not parse TV ClientHello: {other}")),
            })?;

        Ok(Negotiation {
            state: NegotiationState::Local {
                request_id: reply.request_id().unwrap_or_default(),
                secret,
            },
        })
    }

    async fn ack(&self, steps: &DeviceSteps<'_>, negotiation: Negotiation) -> SamResult<PairingOutcome> {
        let (request_id, secret) = match negotiation.state {
            NegotiationState::Local { request_id, secret } => (request_id, secret),
            NegotiationState::Remote { .. } => {
                return Err(SamError::Configuration(
                    "negotiation was not produced by the local backend".into(),
                ))
            }
        };

        let server_ack = self.exchange.server_acknowledge(&secret)?;
        let body = serde_json::to_string(&StepBody {
            auth_data: ServerAck {
                auth_type: AUTH_TYPE,
                request_id: &request_id,
                server_ack: &server_ack,
            },
        })?;
        let reply = AuthData::from_reply(&steps.post_step(2, &body).await?)?;

        let session_id = reply
            .session_id()
            .ok_or_else(|| SamError::InvalidResponse("TV response has no session ID".into()))?;
        let client_ack = reply
            .client_ack
            .as_deref()
            .ok_or_else(|| SamError::InvalidResponse("could not get TV ClientAcknowledge".into()))?;
        let session_id = parse_session_id(&session_id)?;

        self.exchange
            .verify_client_acknowledge(&secret, client_ack)
            .map_err(|e| match e {
                SamError::AckValidationFailed(_) => e,
                other => SamError::AckValidationFailed(other.to_string()),
            })?;

        let session_key: [u8; KEY_SIZE] = secret
            .session_key
            .as_slice()
            .try_into()
            .map_err(|_| SamError::InvalidKey(secret.session_key.len()))?;

        Ok(PairingOutcome {
            device_id: steps.device_id().to_string(),
            session_id,
            session_key,
        })
    }
}

impl PairingBackend for LocalBackend {
    fn app_id(&self) -> &str {
        APP_ID
    }

    fn negotiate_key<'a>(
        &'a self,
        steps: &'a DeviceSteps<'a>,
        pin: u32,
    ) -> BoxFuture<'a, SamResult<Negotiation>> {
        Box::pin(self.hello(steps, pin))
    }

    fn acknowledge<'a>(
        &'a self,
        steps: &'a DeviceSteps<'a>,
        negotiation: Negotiation,
    ) -> BoxFuture<'a, SamResult<PairingOutcome>> {
        Box::pin(self.ack(steps, negotiation))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::device::DeviceAddress;
    use crate::http::testing::ScriptedHttp;
    use crate::http::{Body, Method};

    fn backend() -> LocalBackend {
        LocalBackend::new(Arc::new(FakeExchange))
    }

    #[tokio::test]
    async fn step_bodies_are_exact() {
        let http = ScriptedHttp::new();
        http.ok(Method::Post, "step=1", &step1_reply("client-hello-1234"))
            .ok(Method::Post, "step=2", &step2_reply("5", "client-ack"));
        let address = DeviceAddress::new("tv").unwrap();
        let steps = DeviceSteps::new(&http, &address, APP_ID, "samtv");

        let backend = backend();
        let negotiation = backend.negotiate_key(&steps, 1234).await.unwrap();
        backend.acknowledge(&steps, negotiation).await.unwrap();

        let requests = http.requests();
        let hello = hex::encode(b"654321:1234");
        assert_eq!(
            requests[0].body,
            Body::Json(format!(
                r#"{{"auth_data":{{"auth_type":"SPC","GeneratorServerHello":"{hello}"}}}}"#
            ))
        );
        assert_eq!(
            requests[1].body,
            Body::Json(
                r#"{"auth_data":{"auth_type":"SPC","request_id":"7","ServerAckMsg":"server-ack"}}"#
                    .into()
            )
        );
        assert!(requests[0].url.contains("app_id=samtvcli&device_id=samtv"));
    }

    #[tokio::test]
    async fn missing_client_hello_is_rejected() {
        let http = ScriptedHttp::new();
        http.ok(Method::Post, "step=1", r#"{"auth_data":"{\"auth_type\":\"SPC\"}"}"#);
        let address = DeviceAddress::new("tv").unwrap();
        let steps = DeviceSteps::new(&http, &address, APP_ID, "samtv");

        let err = backend().negotiate_key(&steps, 1234).await.unwrap_err();
        assert!(matches!(err, SamError::HandshakeRejected(_)));
    }

    #[tokio::test]
    async fn step2_field_errors() {
        let address = DeviceAddress::new("tv").unwrap();
        let cases = [
            (
                r#"{"auth_data":{"auth_type":"SPC","ClientAckMsg":"client-ack"}}"#.to_string(),
                "no session",
            ),
            (
                r#"{"auth_data":{"auth_type":"SPC","session_id":"5"}}"#.to_string(),
                "no ack",
            ),
            (step2_reply("0", "client-ack"), "zero id"),
            (step2_reply("five", "client-ack"), "text id"),
        ];

        for (reply, case) in cases {
            let http = ScriptedHttp::new();
            http.ok(Method::Post, "step=1", &step1_reply("client-hello-1"))
                .ok(Method::Post, "step=2", &reply);
            let steps = DeviceSteps::new(&http, &address, APP_ID, "samtv");
            let backend = backend();
            let negotiation = backend.negotiate_key(&steps, 1).await.unwrap();
            let err = backend.acknowledge(&steps, negotiation).await.unwrap_err();
            assert!(matches!(err, SamError::InvalidResponse(_)), "{case}: {err}");
        }
    }

    #[tokio::test]
    async fn wrong_sized_session_key_is_invalid_key() {
        struct ShortKey;
        impl KeyExchange for ShortKey {
            fn server_hello(&self, _: &str, _: &str) -> SamResult<(Vec<u8>, HelloContext)> {
                Ok((vec![1], HelloContext(vec![])))
            }
            fn parse_client_hello(&self, _: &HelloContext, _: &str) -> SamResult<SharedSecret> {
                Ok(SharedSecret {
                    sk_prime: vec![],
                    session_key: vec![1; 8],
                })
            }
            fn server_acknowledge(&self, _: &SharedSecret) -> SamResult<String> {
                Ok("ack".into())
            }
            fn verify_client_acknowledge(&self, _: &SharedSecret, _: &str) -> SamResult<()> {
                Ok(())
            }
        }

        let http = ScriptedHttp::new();
        http.ok(Method::Post, "step=1", &step1_reply("anything"))
            .ok(Method::Post, "step=2", &step2_reply("3", "anything"));
        let address = DeviceAddress::new("tv").unwrap();
        let steps = DeviceSteps::new(&http, &address, APP_ID, "samtv");

        let backend = LocalBackend::new(Arc::new(ShortKey));
        let negotiation = backend.negotiate_key(&steps, 1).await.unwrap();
        let err = backend.acknowledge(&steps, negotiation).await.unwrap_err();
        assert!(matches!(err, SamError::InvalidKey(8)));
    }
}
