//! PIN pairing with the TV.
//!
//! Pairing is two-phase. `announce` asks the TV to show its PIN popup; once
//! the user reads the code, `complete` runs the key exchange:
//! step 1 ("negotiate key") swaps hello messages, step 2 ("acknowledge")
//! swaps proofs and yields the session id. The popup is dismissed whatever
//! the outcome.
//!
//! The key-exchange computation itself is behind `PairingBackend`, with a
//! local implementation driving a `KeyExchange` primitive and a remote one
//! delegating to an HTTPS exchange service.

pub mod local;
pub mod remote;

pub use local::{HelloContext, KeyExchange, LocalBackend, SharedSecret};
pub use remote::{RemoteBackend, RemoteConfig};

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use samtv_core::{SamError, SamResult, SamResultExt, KEY_SIZE};

use crate::device::DeviceAddress;
use crate::http::{HttpClient, HttpRequest};
use crate::BoxFuture;

const PIN_PAGE_PATH: &str = "/ws/apps/CloudPINPage";

/// Result of a successful pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingOutcome {
    pub device_id: String,
    pub session_id: i64,
    pub session_key: [u8; KEY_SIZE],
}

impl PairingOutcome {
    /// The session key as the 32-character hex string used for storage.
    pub fn session_key_hex(&self) -> String {
        hex::encode(self.session_key)
    }
}

/// What a call to `Session::pair` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingStatus {
    /// The PIN popup was requested; call again with the displayed PIN.
    PinRequested,
    /// The PIN popup was dismissed.
    Cancelled,
    /// A usable key and session id are already present.
    AlreadyPaired,
    Paired(PairingOutcome),
}

/// Which key-exchange backend pairing uses.
#[derive(Clone)]
pub enum Backend {
    Local(Arc<dyn KeyExchange>),
    Remote(RemoteConfig),
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Remote(RemoteConfig::default())
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Local(_) => f.write_str("Local"),
            Backend::Remote(config) => f.debug_tuple("Remote").field(&config.server).finish(),
        }
    }
}

impl Backend {
    /// Instantiate the configured backend.
    pub fn build(&self) -> SamResult<Box<dyn PairingBackend>> {
        Ok(match self {
            Backend::Local(exchange) => Box::new(LocalBackend::new(exchange.clone())),
            Backend::Remote(config) => Box::new(RemoteBackend::new(config.clone())?),
        })
    }
}

/// State carried from the negotiate step to the acknowledge step.
#[derive(Debug)]
pub struct Negotiation {
    state: NegotiationState,
}

#[derive(Debug)]
enum NegotiationState {
    Local {
        request_id: String,
        secret: SharedSecret,
    },
    Remote {
        pin: u32,
        payload: String,
    },
}

/// Key-exchange capability used by `complete`.
pub trait PairingBackend: Send + Sync {
    /// `app_id` query parameter sent to the device pairing endpoint.
    fn app_id(&self) -> &str;

    /// Exchange hello messages and derive the shared secret.
    fn negotiate_key<'a>(
        &'a self,
        steps: &'a DeviceSteps<'a>,
        pin: u32,
    ) -> BoxFuture<'a, SamResult<Negotiation>>;

    /// Exchange acknowledgements and produce the session key and id.
    fn acknowledge<'a>(
        &'a self,
        steps: &'a DeviceSteps<'a>,
        negotiation: Negotiation,
    ) -> BoxFuture<'a, SamResult<PairingOutcome>>;
}

/// Access to the device's numbered pairing steps.
pub struct DeviceSteps<'a> {
    http: &'a dyn HttpClient,
    address: &'a DeviceAddress,
    app_id: &'a str,
    device_id: &'a str,
}

impl<'a> DeviceSteps<'a> {
    pub fn new(
        http: &'a dyn HttpClient,
        address: &'a DeviceAddress,
        app_id: &'a str,
        device_id: &'a str,
    ) -> Self {
        Self {
            http,
            address,
            app_id,
            device_id,
        }
    }

    pub fn device_id(&self) -> &str {
        self.device_id
    }

    pub fn step_url(&self, step: u32) -> String {
        format!(
            "{}/ws/pairing?step={step}&app_id={}&device_id={}&type=1",
            self.address.pairing_base(),
            self.app_id,
            self.device_id
        )
    }

    /// POST a JSON body to a numbered step and return the raw reply.
    pub async fn post_step(&self, step: u32, json: &str) -> SamResult<String> {
        let body = self
            .http
            .send(HttpRequest::post_json(self.step_url(step), json))
            .await?;
        debug!(step, "step response: `{}`", body);
        Ok(body)
    }
}

/// Handshake fields of a step reply's `auth_data`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AuthData {
    #[serde(default)]
    request_id: Option<serde_json::Value>,
    #[serde(default)]
    session_id: Option<serde_json::Value>,
    #[serde(rename = "GeneratorClientHello", default)]
    pub client_hello: Option<String>,
    #[serde(rename = "ClientAckMsg", default)]
    pub client_ack: Option<String>,
}

fn value_text(value: &Option<serde_json::Value>) -> Option<String> {
    match value {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

impl AuthData {
    /// Parse `{"auth_data": ...}` where `auth_data` is either an object or
    /// a string holding JSON.
    pub fn from_reply(body: &str) -> SamResult<Self> {
        #[derive(Deserialize)]
        struct Reply {
            auth_data: Option<serde_json::Value>,
        }

        let reply: Reply = serde_json::from_str(body)
            .map_err(|e| SamError::InvalidResponse(format!("could not decode TV response: {e}")))?;
        let auth = match reply.auth_data {
            Some(serde_json::Value::String(inner)) => serde_json::from_str(&inner),
            Some(value @ serde_json::Value::Object(_)) => serde_json::from_value(value),
            _ => return Err(SamError::InvalidResponse("TV response has no auth_data".into())),
        };
        auth.map_err(|e| SamError::InvalidResponse(format!("could not decode auth_data: {e}")))
    }

    pub fn request_id(&self) -> Option<String> {
        value_text(&self.request_id)
    }

    pub fn session_id(&self) -> Option<String> {
        value_text(&self.session_id)
    }
}

/// Parse a positive numeric session id.
pub(crate) fn parse_session_id(text: &str) -> SamResult<i64> {
    match text.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(SamError::InvalidResponse(format!(
            "cannot convert session ID to a positive number: {text}"
        ))),
    }
}

/// Drives the pairing endpoints of one TV.
pub struct Pairing {
    address: DeviceAddress,
    http: Arc<dyn HttpClient>,
    backend: Box<dyn PairingBackend>,
}

impl Pairing {
    pub fn new(
        address: DeviceAddress,
        http: Arc<dyn HttpClient>,
        backend: Box<dyn PairingBackend>,
    ) -> Self {
        Self {
            address,
            http,
            backend,
        }
    }

    /// Dispatch on the PIN: negative cancels, zero announces, positive completes.
    pub async fn pair(&self, device_id: &str, pin: i32) -> SamResult<PairingStatus> {
        match u32::try_from(pin) {
            Err(_) => {
                self.cancel().await?;
                Ok(PairingStatus::Cancelled)
            }
            Ok(0) => {
                self.announce(device_id).await?;
                Ok(PairingStatus::PinRequested)
            }
            Ok(pin) => Ok(PairingStatus::Paired(self.complete(device_id, pin).await?)),
        }
    }

    /// Show the PIN popup on the TV (unless already shown) and issue step 0.
    pub async fn announce(&self, device_id: &str) -> SamResult<()> {
        if device_id.is_empty() {
            return Err(SamError::Configuration("empty device id".into()));
        }

        debug!("initiating step #0");
        let state = match self.pin_page_state().await {
            Ok(state) => state,
            Err(e) => {
                info!("could not fetch PIN page status: {}", e);
                "stopped".to_string()
            }
        };
        debug!("PIN page is {}", state);

        if state != "running" {
            info!("requesting PIN page popup");
            self.open_pin_page().await.step("open PIN page")?;
        }

        // Step 0 always announces the CLI app id, whichever backend runs the exchange.
        let steps = DeviceSteps::new(&*self.http, &self.address, local::APP_ID, device_id);
        let reply = self
            .http
            .send(HttpRequest::get(steps.step_url(0)))
            .await
            .step("pairing request")?;
        debug!("pairing request response: `{}`", reply);
        Ok(())
    }

    /// Run the key exchange with the user-supplied PIN.
    ///
    /// The PIN popup is dismissed whether or not the exchange succeeds.
    pub async fn complete(&self, device_id: &str, pin: u32) -> SamResult<PairingOutcome> {
        let steps = DeviceSteps::new(&*self.http, &self.address, self.backend.app_id(), device_id);

        let result = async {
            debug!("starting pairing step #1 (hello exchange)");
            let negotiation = self
                .backend
                .negotiate_key(&steps, pin)
                .await
                .step("negotiate key")?;
            debug!("starting pairing step #2 (acknowledge exchange)");
            self.backend
                .acknowledge(&steps, negotiation)
                .await
                .step("acknowledge")
        }
        .await;

        if let Err(e) = self.close_pin_page().await {
            info!("could not close PIN page: {}", e);
        }

        if result.is_ok() {
            info!("pairing successful");
        }
        result
    }

    /// Dismiss the PIN popup.
    pub async fn cancel(&self) -> SamResult<()> {
        self.close_pin_page().await.step("close PIN page")
    }

    fn pin_page_url(&self) -> String {
        format!("{}{PIN_PAGE_PATH}", self.address.pairing_base())
    }

    async fn pin_page_state(&self) -> SamResult<String> {
        let body = self.http.send(HttpRequest::get(self.pin_page_url())).await?;
        parse_pin_page_state(&body)
    }

    async fn open_pin_page(&self) -> SamResult<()> {
        let body = self
            .http
            .send(HttpRequest::post_form(self.pin_page_url(), &[("data", "pin4")]))
            .await?;
        debug!("PIN page response: `{}`", body);
        Ok(())
    }

    async fn close_pin_page(&self) -> SamResult<()> {
        let url = format!("{}/run", self.pin_page_url());
        self.http.send(HttpRequest::delete(url)).await?;
        Ok(())
    }
}

/// Extract `<state>` from the CloudPINPage application status document.
fn parse_pin_page_state(body: &str) -> SamResult<String> {
    if !body.contains("<name>CloudPINPage</name>") {
        return Err(SamError::InvalidResponse("unexpected PIN page status contents".into()));
    }
    let state = body
        .split_once("<state>")
        .and_then(|(_, rest)| rest.split_once("</state>"))
        .map(|(state, _)| state.trim())
        .filter(|state| !state.is_empty())
        .ok_or_else(|| SamError::InvalidResponse("PIN page status has no state".into()))?;
    Ok(state.to_string())
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::http::testing::ScriptedHttp;
    use crate::http::Method;

    const PIN_PAGE_RUNNING: &str =
        "<service><name>CloudPINPage</name><state>running</state></service>";
    const PIN_PAGE_STOPPED: &str =
        "<service><name>CloudPINPage</name><state>stopped</state></service>";

    fn pairing(http: Arc<ScriptedHttp>) -> Pairing {
        let address = DeviceAddress::new("tv").unwrap();
        let backend = Box::new(LocalBackend::new(Arc::new(FakeExchange)));
        Pairing::new(address, http, backend)
    }

    #[test]
    fn pin_page_state_parsing() {
        assert_eq!(parse_pin_page_state(PIN_PAGE_RUNNING).unwrap(), "running");
        assert!(parse_pin_page_state("<name>Other</name><state>x</state>").is_err());
        assert!(parse_pin_page_state("<name>CloudPINPage</name>").is_err());
    }

    #[test]
    fn auth_data_accepts_string_and_object() {
        let from_string = AuthData::from_reply(&step1_reply("h")).unwrap();
        assert_eq!(from_string.client_hello.as_deref(), Some("h"));
        assert_eq!(from_string.request_id().as_deref(), Some("7"));

        let from_object =
            AuthData::from_reply(r#"{"auth_data":{"auth_type":"SPC","request_id":3,"session_id":9}}"#)
                .unwrap();
        assert_eq!(from_object.request_id().as_deref(), Some("3"));
        assert_eq!(from_object.session_id().as_deref(), Some("9"));

        assert!(matches!(
            AuthData::from_reply(r#"{"other":1}"#),
            Err(SamError::InvalidResponse(_))
        ));
        assert!(AuthData::from_reply("not json").is_err());
    }

    #[test]
    fn session_id_must_be_positive() {
        assert_eq!(parse_session_id("12").unwrap(), 12);
        assert!(parse_session_id("0").is_err());
        assert!(parse_session_id("-3").is_err());
        assert!(parse_session_id("abc").is_err());
    }

    #[test]
    fn step_url_format() {
        let http = ScriptedHttp::new();
        let address = DeviceAddress::new("tv").unwrap();
        let steps = DeviceSteps::new(&http, &address, "samtvcli", "samtv");
        assert_eq!(
            steps.step_url(1),
            "http://tv:8080/ws/pairing?step=1&app_id=samtvcli&device_id=samtv&type=1"
        );
    }

    #[tokio::test]
    async fn announce_opens_popup_when_stopped() {
        let http = Arc::new(ScriptedHttp::new());
        http.ok(Method::Get, "/ws/apps/CloudPINPage", PIN_PAGE_STOPPED)
            .ok(Method::Post, "/ws/apps/CloudPINPage", "")
            .ok(Method::Get, "step=0", "");

        let status = pairing(http.clone()).pair("samtv", 0).await.unwrap();
        assert_eq!(status, PairingStatus::PinRequested);
        assert_eq!(http.count(Method::Post, "/ws/apps/CloudPINPage"), 1);
        assert_eq!(http.count(Method::Get, "step=0"), 1);

        let open = http
            .requests()
            .into_iter()
            .find(|r| r.method == Method::Post)
            .unwrap();
        assert_eq!(
            open.body,
            crate::http::Body::Form(vec![("data".into(), "pin4".into())])
        );
    }

    #[tokio::test]
    async fn announce_skips_popup_when_running() {
        let http = Arc::new(ScriptedHttp::new());
        http.ok(Method::Get, "/ws/apps/CloudPINPage", PIN_PAGE_RUNNING)
            .ok(Method::Get, "step=0", "");

        pairing(http.clone()).announce("samtv").await.unwrap();
        assert_eq!(http.count(Method::Post, "/ws/apps/CloudPINPage"), 0);
    }

    #[tokio::test]
    async fn announce_treats_unknown_status_as_stopped() {
        let http = Arc::new(ScriptedHttp::new());
        http.ok(Method::Post, "/ws/apps/CloudPINPage", "")
            .ok(Method::Get, "step=0", "");

        pairing(http.clone()).announce("samtv").await.unwrap();
        assert_eq!(http.count(Method::Post, "/ws/apps/CloudPINPage"), 1);
    }

    #[tokio::test]
    async fn announce_uses_cli_app_id_with_remote_backend() {
        let http = Arc::new(ScriptedHttp::new());
        http.ok(Method::Get, "/ws/apps/CloudPINPage", PIN_PAGE_RUNNING)
            .ok(Method::Get, "step=0", "");
        let backend = RemoteBackend::with_client(RemoteConfig::default(), http.clone());
        let address = DeviceAddress::new("tv").unwrap();
        let pairing = Pairing::new(address, http.clone(), Box::new(backend));

        pairing.announce("samtv").await.unwrap();
        let step0 = http
            .requests()
            .into_iter()
            .find(|r| r.url.contains("step=0"))
            .unwrap();
        assert!(step0.url.contains("app_id=samtvcli&device_id=samtv"));
    }

    #[tokio::test]
    async fn announce_failure_names_the_step() {
        let http = Arc::new(ScriptedHttp::new());
        http.ok(Method::Get, "/ws/apps/CloudPINPage", PIN_PAGE_RUNNING);

        let err = pairing(http).announce("samtv").await.unwrap_err();
        assert!(err.to_string().starts_with("pairing request: "));
        assert!(matches!(err.root(), SamError::Transport(_)));
    }

    #[tokio::test]
    async fn negative_pin_only_closes_popup() {
        let http = Arc::new(ScriptedHttp::new());
        http.ok(Method::Delete, "/ws/apps/CloudPINPage/run", "");

        let status = pairing(http.clone()).pair("samtv", -1).await.unwrap();
        assert_eq!(status, PairingStatus::Cancelled);
        assert_eq!(http.requests().len(), 1);
    }

    #[tokio::test]
    async fn complete_yields_outcome_and_closes_popup() {
        let http = Arc::new(ScriptedHttp::new());
        http.ok(Method::Post, "step=1", &step1_reply("client-hello-1234"))
            .ok(Method::Post, "step=2", &step2_reply("5", "client-ack"))
            .ok(Method::Delete, "/run", "");

        let status = pairing(http.clone()).pair("samtv", 1234).await.unwrap();
        let outcome = match status {
            PairingStatus::Paired(outcome) => outcome,
            other => panic!("expected Paired, got {other:?}"),
        };
        assert_eq!(outcome.device_id, "samtv");
        assert_eq!(outcome.session_id, 5);
        assert_eq!(outcome.session_key, SESSION_KEY);
        assert_eq!(outcome.session_key_hex(), "07".repeat(16));
        assert_eq!(http.count(Method::Delete, "/run"), 1);
    }

    #[tokio::test]
    async fn wrong_pin_is_rejected_and_popup_closed() {
        let http = Arc::new(ScriptedHttp::new());
        http.ok(Method::Post, "step=1", &step1_reply("client-hello-9999"))
            .ok(Method::Delete, "/run", "");

        let err = pairing(http.clone()).complete("samtv", 1234).await.unwrap_err();
        assert!(matches!(err.root(), SamError::HandshakeRejected(_)));
        assert_eq!(http.count(Method::Post, "step=2"), 0);
        assert_eq!(http.count(Method::Delete, "/run"), 1);
    }

    #[tokio::test]
    async fn bad_ack_fails_validation_and_popup_closed() {
        let http = Arc::new(ScriptedHttp::new());
        http.ok(Method::Post, "step=1", &step1_reply("client-hello-1234"))
            .ok(Method::Post, "step=2", &step2_reply("5", "forged"))
            .ok(Method::Delete, "/run", "");

        let err = pairing(http.clone()).complete("samtv", 1234).await.unwrap_err();
        assert!(matches!(err.root(), SamError::AckValidationFailed(_)));
        assert_eq!(http.count(Method::Delete, "/run"), 1);
    }

    #[tokio::test]
    async fn popup_close_failure_is_not_fatal() {
        let http = Arc::new(ScriptedHttp::new());
        http.ok(Method::Post, "step=1", &step1_reply("client-hello-1234"))
            .ok(Method::Post, "step=2", &step2_reply("5", "client-ack"));

        let outcome = pairing(http.clone()).complete("samtv", 1234).await.unwrap();
        assert_eq!(outcome.session_id, 5);
        assert_eq!(http.count(Method::Delete, "/run"), 1);
    }
}
