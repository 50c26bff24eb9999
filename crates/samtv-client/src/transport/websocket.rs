//! WebSocket transport for the SmartView channel.
//!
//! Connecting is a two-step socket.io v1 bootstrap:
//! 1. `GET http://{tv}:8000/socket.io/1/?t={epoch_ms}` returns
//!    `{token}:{heartbeat}:{timeout}:{transports}`
//! 2. dial `ws://{tv}:8000/socket.io/1/websocket/{token}`

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace};

use samtv_core::{SamError, SamResult, SamResultExt};

use super::{Channel, Connector, FrameReader, FrameWriter};
use crate::device::DeviceAddress;
use crate::http::{HttpClient, HttpRequest};
use crate::BoxFuture;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build the WebSocket route from the bootstrap response body.
pub fn channel_url(address: &DeviceAddress, bootstrap_body: &str) -> SamResult<String> {
    let token = bootstrap_body.split(':').next().unwrap_or_default().trim();
    if token.is_empty() {
        return Err(SamError::InvalidResponse(
            "socket.io bootstrap returned no session token".into(),
        ));
    }
    Ok(format!("{}/websocket/{token}", address.socket_base("ws")))
}

fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Opens SmartView channels over `tokio-tungstenite`.
pub struct WebSocketConnector {
    http: Arc<dyn HttpClient>,
}

impl WebSocketConnector {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    async fn bootstrap(&self, address: &DeviceAddress) -> SamResult<String> {
        let url = format!("{}/?t={}", address.socket_base("http"), epoch_millis());
        let body = self.http.send(HttpRequest::get(url)).await?;
        channel_url(address, &body)
    }

    async fn dial(&self, address: &DeviceAddress) -> SamResult<Channel> {
        let url = self.bootstrap(address).await.step("websocket request")?;

        let (ws_stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| SamError::Transport(format!("cannot connect to WebSocket: {e}")))?;

        info!("WebSocket connected to {}", url);

        let (sink, stream) = ws_stream.split();
        Ok(Channel {
            reader: Box::new(WebSocketReader { stream }),
            writer: Box::new(WebSocketWriter { sink }),
        })
    }
}

impl Connector for WebSocketConnector {
    fn connect<'a>(&'a self, address: &'a DeviceAddress) -> BoxFuture<'a, SamResult<Channel>> {
        Box::pin(self.dial(address))
    }
}

struct WebSocketReader {
    stream: SplitStream<WsStream>,
}

impl FrameReader for WebSocketReader {
    fn read_frame(&mut self) -> BoxFuture<'_, SamResult<Option<String>>> {
        Box::pin(async move {
            while let Some(msg) = self.stream.next().await {
                match msg.map_err(|e| SamError::Transport(format!("WebSocket read error: {e}")))? {
                    Message::Text(text) => return Ok(Some(text)),
                    Message::Close(_) => {
                        debug!("WebSocket close frame received");
                        return Ok(None);
                    }
                    // Pings are answered by tungstenite itself.
                    other => trace!("ignoring non-text WebSocket message: {:?}", other),
                }
            }
            Ok(None)
        })
    }
}

struct WebSocketWriter {
    sink: SplitSink<WsStream, Message>,
}

impl FrameWriter for WebSocketWriter {
    fn write_frame<'a>(&'a mut self, text: &'a str) -> BoxFuture<'a, SamResult<()>> {
        Box::pin(async move {
            self.sink
                .send(Message::Text(text.to_string()))
                .await
                .map_err(|e| SamError::Transport(format!("WebSocket write error: {e}")))
        })
    }

    fn close(&mut self) -> BoxFuture<'_, SamResult<()>> {
        Box::pin(async move {
            self.sink
                .send(Message::Close(None))
                .await
                .map_err(|e| SamError::Transport(format!("WebSocket close error: {e}")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::ScriptedHttp;
    use crate::http::Method;

    #[test]
    fn channel_url_uses_token_before_first_colon() {
        let addr = DeviceAddress::new("10.0.0.2").unwrap();
        let url = channel_url(&addr, "0Xd2hjS5ebt2kDzYwWGk:60:60:websocket,htmlfile").unwrap();
        assert_eq!(url, "ws://10.0.0.2:8000/socket.io/1/websocket/0Xd2hjS5ebt2kDzYwWGk");
    }

    #[test]
    fn empty_bootstrap_is_rejected() {
        let addr = DeviceAddress::new("10.0.0.2").unwrap();
        assert!(matches!(channel_url(&addr, ""), Err(SamError::InvalidResponse(_))));
        assert!(matches!(channel_url(&addr, ":60:60"), Err(SamError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn bootstrap_queries_socket_io_with_timestamp() {
        let http = Arc::new(ScriptedHttp::new());
        http.ok(Method::Get, ":8000/socket.io/1/?t=", "tok:60:60:websocket");
        let connector = WebSocketConnector::new(http.clone());
        let addr = DeviceAddress::new("tv").unwrap();

        let url = connector.bootstrap(&addr).await.unwrap();
        assert_eq!(url, "ws://tv:8000/socket.io/1/websocket/tok");

        let requests = http.requests();
        assert_eq!(requests.len(), 1);
        let t = requests[0].url.rsplit("?t=").next().unwrap();
        assert!(t.parse::<u128>().unwrap() > 0);
    }

    #[tokio::test]
    async fn bootstrap_failure_is_wrapped() {
        let http = Arc::new(ScriptedHttp::new());
        let connector = WebSocketConnector::new(http);
        let addr = DeviceAddress::new("tv").unwrap();
        let err = connector.connect(&addr).await.err().unwrap();
        assert!(err.to_string().starts_with("websocket request: "));
        assert!(matches!(err.root(), SamError::Transport(_)));
    }
}
