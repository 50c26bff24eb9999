//! Device addressing and the TV description endpoint.

use serde::{Deserialize, Serialize};

use samtv_core::{SamError, SamResult};

use crate::http::{HttpClient, HttpRequest};

/// Port of the socket.io bootstrap and WebSocket channel.
pub const CHANNEL_PORT: u16 = 8000;
/// Port of the pairing and PIN popup endpoints.
pub const PAIRING_PORT: u16 = 8080;
/// Port of the device description service.
pub const DESCRIPTION_PORT: u16 = 8001;

/// Network endpoint of a TV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAddress {
    host: String,
    pub channel_port: u16,
    pub pairing_port: u16,
    pub description_port: u16,
}

impl DeviceAddress {
    /// Address a TV by host name or IP, using the standard SmartView ports.
    pub fn new(host: &str) -> SamResult<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(SamError::Configuration("empty TV address".into()));
        }
        if host.contains(':') {
            return Err(SamError::Configuration(format!(
                "the TV address should not contain a colon: {host}"
            )));
        }
        Ok(Self {
            host: host.to_string(),
            channel_port: CHANNEL_PORT,
            pairing_port: PAIRING_PORT,
            description_port: DESCRIPTION_PORT,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Base URL of the pairing service.
    pub fn pairing_base(&self) -> String {
        format!("http://{}:{}", self.host, self.pairing_port)
    }

    /// Base URL of the socket.io endpoint for `scheme` (`http` or `ws`).
    pub fn socket_base(&self, scheme: &str) -> String {
        format!("{scheme}://{}:{}/socket.io/1", self.host, self.channel_port)
    }

    pub fn description_url(&self) -> String {
        format!("http://{}:{}/ms/1.0/", self.host, self.description_port)
    }
}

/// A capability advertised in the device description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Capability {
    pub name: String,
    pub port: String,
    pub location: String,
}

/// Description document returned by the TV.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DeviceDescription {
    #[serde(rename = "DUID")]
    pub duid: String,
    pub model: String,
    pub model_name: String,
    pub model_description: String,
    pub network_type: String,
    #[serde(rename = "SSID")]
    pub ssid: String,
    #[serde(rename = "IP")]
    pub ip: String,
    pub firmware_version: String,
    pub device_name: String,
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    #[serde(rename = "UDN")]
    pub udn: String,
    pub resolution: String,
    pub country_code: String,
    pub smart_hub_agreement: String,
    #[serde(rename = "ServiceURI")]
    pub service_uri: String,
    #[serde(rename = "DialURI")]
    pub dial_uri: String,
    pub capabilities: Vec<Capability>,
}

/// Fetch the device description.
pub async fn fetch_description(
    http: &dyn HttpClient,
    address: &DeviceAddress,
) -> SamResult<DeviceDescription> {
    let body = http.send(HttpRequest::get(address.description_url())).await?;
    serde_json::from_str(&body)
        .map_err(|e| SamError::InvalidResponse(format!("cannot parse JSON description: {e}")))
}
