//! Pairing backend delegating the exchange computation to an HTTPS service.
//!
//! The service is stepped in lockstep with the device: service step N yields
//! the body for device step N, and the device's answer feeds service step
//! N + 1. Service step 3 returns the session key and id.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use samtv_core::{SamError, SamResult, KEY_SIZE};

use super::{parse_session_id, DeviceSteps, Negotiation, NegotiationState, PairingBackend, PairingOutcome};
use crate::http::{HttpClient, HttpRequest, ReqwestClient};
use crate::BoxFuture;

/// App id announced to the device by the remote backend.
pub const APP_ID: &str = "com.samsung.companion";

const FINAL_STEP: u32 = 3;

/// Where the exchange service lives and how to authenticate to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub server: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
    /// The public service presents a self-signed certificate.
    pub accept_invalid_certs: bool,
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            server: "https://34.210.190.209:5443".into(),
            username: "orchestrator".into(),
            password: "password".into(),
            user_agent: "CFNetwork/893.7 Darwin/17.3.0".into(),
            accept_invalid_certs: true,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct ServiceRequest<'a> {
    pin: u32,
    payload: &'a str,
    #[serde(rename = "deviceId")]
    device_id: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ServiceStatus {
    status: i64,
    error: String,
    message: String,
}

#[derive(Deserialize)]
struct ServiceResult {
    session_key: String,
    session_id: serde_json::Value,
}

/// What one service step produced.
enum Advance {
    /// Body for the device step of the same number.
    Device(String),
    Done(PairingOutcome),
}

pub struct RemoteBackend {
    config: RemoteConfig,
    client: Arc<dyn HttpClient>,
}

impl RemoteBackend {
    pub fn new(config: RemoteConfig) -> SamResult<Self> {
        let client = ReqwestClient::build(config.timeout, config.accept_invalid_certs)?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    /// Use `client` for the service requests instead of a dedicated one.
    pub fn with_client(config: RemoteConfig, client: Arc<dyn HttpClient>) -> Self {
        Self { config, client }
    }

    async fn service_step(
        &self,
        step: u32,
        pin: u32,
        payload: &str,
        device_id: &str,
    ) -> SamResult<Advance> {
        debug!(step, "starting remote pairing step");
        let body = serde_json::to_string(&ServiceRequest {
            pin,
            payload,
            device_id,
        })?;
        let url = format!("{}/step{step}", self.config.server.trim_end_matches('/'));
        let request = HttpRequest::post_json(url, body)
            .with_basic_auth(&self.config.username, &self.config.password)
            .with_user_agent(&self.config.user_agent);

        let reply = self.client.send(request).await.map_err(|e| {
            SamError::Transport(format!("could not query external server: {}", e.root()))
        })?;
        if reply.is_empty() {
            return Err(SamError::InvalidResponse("empty response from external server".into()));
        }
        debug!(step, "external server returned: `{}`", reply);

        if let Ok(status) = serde_json::from_str::<ServiceStatus>(&reply) {
            if status.status != 0 {
                info!(
                    "external server sent status {} ({}): {}",
                    status.status, status.error, status.message
                );
                return Err(SamError::HandshakeRejected(format!(
                    "step{step}: unexpected reply from external server: [{}] {}",
                    status.error, status.message
                )));
            }
        }

        if step == FINAL_STEP {
            return parse_result(&reply, device_id).map(Advance::Done);
        }
        Ok(Advance::Device(reply))
    }

    /// Run service steps `from..=to`, relaying through the device between them.
    async fn advance(
        &self,
        steps: &DeviceSteps<'_>,
        from: u32,
        to: u32,
        pin: u32,
        mut payload: String,
    ) -> SamResult<Advance> {
        for step in from..=to {
            match self
                .service_step(step, pin, &payload, steps.device_id())
                .await?
            {
                Advance::Done(outcome) => return Ok(Advance::Done(outcome)),
                Advance::Device(body) => {
                    let answer = steps.post_step(step, &body).await?;
                    payload = answer.replace(r#"\""#, "\"");
                }
            }
        }
        Ok(Advance::Device(payload))
    }
}

fn parse_result(reply: &str, device_id: &str) -> SamResult<PairingOutcome> {
    let result: ServiceResult = serde_json::from_str(reply)
        .map_err(|e| SamError::InvalidResponse(format!("step3: cannot parse response: {e}")))?;

    if result.session_key.len() != 2 * KEY_SIZE {
        return Err(SamError::InvalidResponse(format!(
            "step3: wrong session key length: {}",
            result.session_key.len()
        )));
    }
    let mut session_key = [0u8; KEY_SIZE];
    hex::decode_to_slice(&result.session_key, &mut session_key).map_err(|e| {
        SamError::InvalidResponse(format!("step3: cannot convert hex key string: {e}"))
    })?;

    let session_id = match &result.session_id {
        serde_json::Value::String(s) => parse_session_id(s)?,
        serde_json::Value::Number(n) => parse_session_id(&n.to_string())?,
        other => {
            return Err(SamError::InvalidResponse(format!(
                "step3: unexpected session ID: {other}"
            )))
        }
    };

    Ok(PairingOutcome {
        device_id: device_id.to_string(),
        session_id,
        session_key,
    })
}

impl PairingBackend for RemoteBackend {
    fn app_id(&self) -> &str {
        APP_ID
    }

    fn negotiate_key<'a>(
        &'a self,
        steps: &'a DeviceSteps<'a>,
        pin: u32,
    ) -> BoxFuture<'a, SamResult<Negotiation>> {
        Box::pin(async move {
            match self.advance(steps, 1, 1, pin, String::new()).await? {
                Advance::Device(payload) => Ok(Negotiation {
                    state: NegotiationState::Remote { pin, payload },
                }),
                Advance::Done(_) => Err(SamError::InvalidResponse(
                    "external server finished before the hello exchange".into(),
                )),
            }
        })
    }

    fn acknowledge<'a>(
        &'a self,
        steps: &'a DeviceSteps<'a>,
        negotiation: Negotiation,
    ) -> BoxFuture<'a, SamResult<PairingOutcome>> {
        Box::pin(async move {
            let (pin, payload) = match negotiation.state {
                NegotiationState::Remote { pin, payload } => (pin, payload),
                NegotiationState::Local { .. } => {
                    return Err(SamError::Configuration(
                        "negotiation was not produced by the remote backend".into(),
                    ))
                }
            };
            match self.advance(steps, 2, FINAL_STEP, pin, payload).await? {
                Advance::Done(outcome) => Ok(outcome),
                Advance::Device(_) => Err(SamError::InvalidResponse(
                    "external server did not return a session key".into(),
                )),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceAddress;
    use crate::http::testing::ScriptedHttp;
    use crate::http::{Body, Method};

    const KEY_HEX: &str = "00112233445566778899aabbccddeeff";

    fn backend(http: Arc<ScriptedHttp>) -> RemoteBackend {
        RemoteBackend::with_client(RemoteConfig::default(), http)
    }

    async fn run(http: Arc<ScriptedHttp>) -> SamResult<PairingOutcome> {
        let address = DeviceAddress::new("tv").unwrap();
        let backend = backend(http.clone());
        let steps = DeviceSteps::new(&*http, &address, APP_ID, "samtv");
        let negotiation = backend.negotiate_key(&steps, 1234).await?;
        backend.acknowledge(&steps, negotiation).await
    }

    #[tokio::test]
    async fn three_steps_relay_through_device() {
        let http = Arc::new(ScriptedHttp::new());
        http.ok(Method::Post, "5443/step1", "service-1")
            .ok(Method::Post, "pairing?step=1", r#"{\"device\":1}"#)
            .ok(Method::Post, "5443/step2", "service-2")
            .ok(Method::Post, "pairing?step=2", "device-2")
            .ok(
                Method::Post,
                "5443/step3",
                &format!(r#"{{"session_key":"{KEY_HEX}","session_id":"4"}}"#),
            );

        let outcome = run(http.clone()).await.unwrap();
        assert_eq!(outcome.session_id, 4);
        assert_eq!(outcome.session_key_hex(), KEY_HEX);
        assert_eq!(outcome.device_id, "samtv");

        let requests = http.requests();
        assert_eq!(requests.len(), 5);
        assert_eq!(
            requests[0].body,
            Body::Json(r#"{"pin":1234,"payload":"","deviceId":"samtv"}"#.into())
        );
        assert_eq!(
            requests[0].basic_auth,
            Some(("orchestrator".into(), "password".into()))
        );
        assert_eq!(
            requests[0].user_agent.as_deref(),
            Some("CFNetwork/893.7 Darwin/17.3.0")
        );
        assert_eq!(requests[1].body, Body::Json("service-1".into()));
        assert!(requests[1].url.contains("app_id=com.samsung.companion"));
        // The device answer is unescaped before being relayed.
        assert_eq!(
            requests[2].body,
            Body::Json(r#"{"pin":1234,"payload":"{\"device\":1}","deviceId":"samtv"}"#.into())
        );
        assert_eq!(
            requests[4].body,
            Body::Json(r#"{"pin":1234,"payload":"device-2","deviceId":"samtv"}"#.into())
        );
    }

    #[tokio::test]
    async fn service_error_status_is_rejected() {
        let http = Arc::new(ScriptedHttp::new());
        http.ok(
            Method::Post,
            "5443/step1",
            r#"{"status":400,"error":"Bad Request","message":"invalid pin"}"#,
        );

        let err = run(http.clone()).await.unwrap_err();
        assert!(matches!(err, SamError::HandshakeRejected(ref m) if m.contains("invalid pin")));
        assert_eq!(http.count(Method::Post, "pairing?step="), 0);
    }

    #[tokio::test]
    async fn empty_service_reply_is_invalid() {
        let http = Arc::new(ScriptedHttp::new());
        http.ok(Method::Post, "5443/step1", "");
        assert!(matches!(run(http).await, Err(SamError::InvalidResponse(_))));
    }

    #[test]
    fn final_reply_validation() {
        assert!(parse_result(r#"{"session_key":"0011","session_id":"1"}"#, "d").is_err());
        assert!(parse_result(
            &format!(r#"{{"session_key":"{}","session_id":"1"}}"#, "zz".repeat(16)),
            "d"
        )
        .is_err());
        assert!(parse_result(
            &format!(r#"{{"session_key":"{KEY_HEX}","session_id":"x"}}"#),
            "d"
        )
        .is_err());
        let outcome =
            parse_result(&format!(r#"{{"session_key":"{KEY_HEX}","session_id":9}}"#), "d").unwrap();
        assert_eq!(outcome.session_id, 9);
    }
}
