//! SmartView session engine.
//!
//! A `Session` owns at most one open channel to the TV. A background task
//! reads frames from it, answers keepalives and drives the socket.io
//! handshake, and pushes decrypted replies onto an inbox that `send_key`
//! waits on.
//!
//! Connection state and the channel handle live together behind one async
//! mutex that is never held across I/O. Each open/close cycle gets a new
//! generation number so a reader left over from an earlier channel cannot
//! tear down a newer one.

use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, trace, warn};

use samtv_core::frame::{COMMON_REPLY, HANDSHAKE, KEEPALIVE};
use samtv_core::{
    encrypt, envelope_frame, is_success_reply, key_press_command, session_key_from_hex, Frame,
    InboundEnvelope, SamError, SamResult, KEY_SIZE,
};

use crate::device::{fetch_description, DeviceAddress, DeviceDescription};
use crate::http::{HttpClient, ReqwestClient};
use crate::pairing::{Backend, Pairing, PairingBackend, PairingStatus};
use crate::transport::{Connector, FrameReader, FrameWriter, WebSocketConnector};

/// Device id used until one is restored.
pub const DEFAULT_DEVICE_ID: &str = "samtv";

/// Tunables for a `Session`.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle read deadline, refreshed on every keepalive.
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub handshake_timeout: Duration,
    /// How long `send_key` and a blocking `next_message` wait for a reply.
    pub reply_timeout: Duration,
    /// How long a non-blocking `next_message` waits.
    pub poll_timeout: Duration,
    /// Timeout for each HTTP request to the TV.
    pub http_timeout: Duration,
    pub inbox_capacity: usize,
    pub pairing: Backend,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(15),
            handshake_timeout: Duration::from_secs(60),
            reply_timeout: Duration::from_secs(5),
            poll_timeout: Duration::from_millis(1),
            http_timeout: Duration::from_secs(30),
            inbox_capacity: 16,
            pairing: Backend::default(),
        }
    }
}

/// Where the channel is in the socket.io handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// Channel dialled, waiting for the greeting.
    Opening,
    /// Greeting answered, waiting for the namespace acknowledgement.
    HandshakeSent,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkEvent {
    Dial,
    GreetingAnswered,
    HandshakeAcked,
    Lost,
}

impl ConnectionState {
    /// The state reached from `self` on `event`, or `None` if the event does
    /// not apply here.
    pub(crate) fn on(self, event: LinkEvent) -> Option<ConnectionState> {
        use ConnectionState::*;
        match (self, event) {
            (_, LinkEvent::Lost) => Some(Disconnected),
            (Disconnected, LinkEvent::Dial) => Some(Opening),
            (Opening, LinkEvent::GreetingAnswered) => Some(HandshakeSent),
            (HandshakeSent, LinkEvent::HandshakeAcked) => Some(Connected),
            (Disconnected | Opening | HandshakeSent | Connected, _) => None,
        }
    }
}

/// Pairing material needed to talk to the TV.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub device_id: String,
    pub session_key: Option<[u8; KEY_SIZE]>,
    /// Values `<= 0` mean no session id.
    pub session_id: i64,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            device_id: DEFAULT_DEVICE_ID.to_string(),
            session_key: None,
            session_id: 0,
        }
    }
}

impl Credentials {
    pub fn is_valid(&self) -> bool {
        self.session_key.is_some() && self.session_id > 0
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("device_id", &self.device_id)
            .field("session_key", &self.session_key.map(|_| "<redacted>"))
            .field("session_id", &self.session_id)
            .finish()
    }
}

type SharedWriter = Arc<Mutex<Box<dyn FrameWriter>>>;
type SharedCredentials = Arc<std::sync::Mutex<Credentials>>;

struct ChannelHandle {
    writer: SharedWriter,
    task: JoinHandle<()>,
}

struct Link {
    state: ConnectionState,
    channel: Option<ChannelHandle>,
    generation: u64,
}

impl Link {
    fn apply(&mut self, event: LinkEvent) -> bool {
        match self.state.on(event) {
            Some(next) => {
                debug!(from = ?self.state, to = ?next, "connection state change");
                self.state = next;
                true
            }
            None => {
                debug!(state = ?self.state, event = ?event, "ignoring connection event");
                false
            }
        }
    }
}

fn lock_credentials(credentials: &std::sync::Mutex<Credentials>) -> MutexGuard<'_, Credentials> {
    credentials.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn write_with_timeout(writer: &SharedWriter, text: &str, limit: Duration) -> SamResult<()> {
    let mut writer = writer.lock().await;
    match timeout(limit, writer.write_frame(text)).await {
        Ok(result) => result,
        Err(_) => Err(SamError::Transport("write timed out".into())),
    }
}

async fn close_writer(writer: &SharedWriter, limit: Duration) {
    let mut writer = writer.lock().await;
    match timeout(limit, writer.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("closing channel: {}", e),
        Err(_) => debug!("closing channel timed out"),
    }
}

/// A remote-control session with one TV.
pub struct Session {
    address: DeviceAddress,
    config: SessionConfig,
    http: Arc<dyn HttpClient>,
    connector: Arc<dyn Connector>,
    pairing: Pairing,
    link: Arc<Mutex<Link>>,
    credentials: SharedCredentials,
    inbox_tx: mpsc::Sender<String>,
    inbox: Mutex<mpsc::Receiver<String>>,
}

impl Session {
    /// Session using reqwest for HTTP, tungstenite for the channel and the
    /// pairing backend named in `config`.
    pub fn new(address: DeviceAddress, config: SessionConfig) -> SamResult<Self> {
        let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new(config.http_timeout)?);
        let connector = Arc::new(WebSocketConnector::new(http.clone()));
        let backend = config.pairing.build()?;
        Ok(Self::with_parts(address, config, http, connector, backend))
    }

    /// Session with injected collaborators. `config.pairing` is not used.
    pub fn with_parts(
        address: DeviceAddress,
        config: SessionConfig,
        http: Arc<dyn HttpClient>,
        connector: Arc<dyn Connector>,
        backend: Box<dyn PairingBackend>,
    ) -> Self {
        let (inbox_tx, inbox) = mpsc::channel(config.inbox_capacity.max(1));
        let pairing = Pairing::new(address.clone(), http.clone(), backend);
        Self {
            address,
            config,
            http,
            connector,
            pairing,
            link: Arc::new(Mutex::new(Link {
                state: ConnectionState::Disconnected,
                channel: None,
                generation: 0,
            })),
            credentials: Arc::new(std::sync::Mutex::new(Credentials::default())),
            inbox_tx,
            inbox: Mutex::new(inbox),
        }
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    /// Inject previously saved pairing data.
    ///
    /// An absent or empty key, a non-positive id or an empty device id leave
    /// the corresponding field unchanged.
    pub fn restore_session_data(
        &self,
        key: Option<&[u8]>,
        session_id: i64,
        device_id: &str,
    ) -> SamResult<()> {
        let key = match key {
            Some(key) if !key.is_empty() => Some(
                <[u8; KEY_SIZE]>::try_from(key).map_err(|_| SamError::InvalidKey(key.len()))?,
            ),
            _ => None,
        };

        let mut credentials = lock_credentials(&self.credentials);
        if let Some(key) = key {
            credentials.session_key = Some(key);
        }
        if session_id > 0 {
            credentials.session_id = session_id;
        }
        if !device_id.is_empty() {
            credentials.device_id = device_id.to_string();
        }
        debug!(
            device_id = %credentials.device_id,
            session_id = credentials.session_id,
            "session data restored"
        );
        Ok(())
    }

    /// Like `restore_session_data`, taking the key as a 32-character hex string.
    pub fn restore_session_hex(&self, hex_key: &str, session_id: i64, device_id: &str) -> SamResult<()> {
        let hex_key = hex_key.trim();
        let key = if hex_key.is_empty() {
            None
        } else {
            Some(session_key_from_hex(hex_key)?)
        };
        self.restore_session_data(key.as_ref().map(|k| &k[..]), session_id, device_id)
    }

    /// Drop the session key and id, keeping the device id.
    pub fn forget_session_data(&self) {
        let mut credentials = lock_credentials(&self.credentials);
        credentials.session_key = None;
        credentials.session_id = 0;
    }

    pub fn credentials(&self) -> Credentials {
        lock_credentials(&self.credentials).clone()
    }

    pub fn has_valid_credentials(&self) -> bool {
        lock_credentials(&self.credentials).is_valid()
    }

    pub async fn state(&self) -> ConnectionState {
        self.link.lock().await.state
    }

    /// Open the channel and complete the socket.io handshake.
    ///
    /// Does nothing unless the session is disconnected. Once the handshake
    /// is acknowledged, a session without a usable key asks the TV for its
    /// PIN popup and fails with `PairingRequired`.
    pub async fn init_session(&self) -> SamResult<()> {
        let generation = {
            let mut link = self.link.lock().await;
            if link.state != ConnectionState::Disconnected {
                debug!(state = ?link.state, "session already initialized");
                return Ok(());
            }
            link.apply(LinkEvent::Dial);
            link.generation += 1;
            link.generation
        };

        info!("connecting to {}", self.address.host());
        let channel = match self.connector.connect(&self.address).await {
            Ok(channel) => channel,
            Err(e) => {
                self.shut_down(Some(generation)).await;
                return Err(e);
            }
        };

        let (acked_tx, acked_rx) = oneshot::channel();
        let writer: SharedWriter = Arc::new(Mutex::new(channel.writer));
        {
            let mut link = self.link.lock().await;
            if link.generation != generation || link.state != ConnectionState::Opening {
                drop(link);
                close_writer(&writer, self.config.write_timeout).await;
                return Err(SamError::Transport("session closed while connecting".into()));
            }
            let reader = FrameLoop {
                link: self.link.clone(),
                credentials: self.credentials.clone(),
                inbox: self.inbox_tx.clone(),
                writer: writer.clone(),
                generation,
                read_timeout: self.config.read_timeout,
                write_timeout: self.config.write_timeout,
                acked: Some(acked_tx),
            };
            let task = tokio::spawn(reader.run(channel.reader));
            link.channel = Some(ChannelHandle { writer, task });
        }

        match timeout(self.config.handshake_timeout, acked_rx).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                return Err(SamError::Transport("connection lost during handshake".into()));
            }
            Err(_) => {
                warn!("no handshake acknowledgement after {:?}", self.config.handshake_timeout);
                self.shut_down(Some(generation)).await;
                return Err(SamError::HandshakeTimeout);
            }
        }

        if !self.has_valid_credentials() {
            info!("no valid session key, requesting pairing");
            let device_id = self.credentials().device_id;
            self.pairing.announce(&device_id).await?;
            return Err(SamError::PairingRequired);
        }

        info!("session established");
        Ok(())
    }

    /// Send one remote key press and wait for the TV to acknowledge it.
    ///
    /// Calls must be serialized: replies are matched to requests by arrival
    /// order only.
    pub async fn send_key(&self, key: &str) -> SamResult<()> {
        if key.is_empty() {
            debug!("empty key, nothing to send");
            return Ok(());
        }

        if self.state().await == ConnectionState::Disconnected {
            self.init_session().await?;
        }

        let (writer, generation) = {
            let link = self.link.lock().await;
            match (&link.state, &link.channel) {
                (ConnectionState::Connected, Some(handle)) => (handle.writer.clone(), link.generation),
                _ => return Err(SamError::Transport("no active connection".into())),
            }
        };

        let credentials = self.credentials();
        let session_key = match credentials.session_key {
            Some(session_key) if credentials.session_id > 0 => session_key,
            _ => return Err(SamError::PairingRequired),
        };
        let command = key_press_command(&credentials.device_id, key)?;
        let ciphertext = encrypt(&session_key, command.as_bytes())?;
        let frame = envelope_frame(credentials.session_id, &ciphertext)?;

        let mut inbox = self.inbox.lock().await;
        debug!(key = %key, "sending key");
        if let Err(e) = write_with_timeout(&writer, &frame, self.config.write_timeout).await {
            warn!(key = %key, "write failed: {}", e);
            self.shut_down(Some(generation)).await;
            return Err(e);
        }

        match timeout(self.config.reply_timeout, inbox.recv()).await {
            Ok(Some(reply)) if is_success_reply(&reply) => {
                debug!(key = %key, "key acknowledged");
                Ok(())
            }
            Ok(Some(reply)) => Err(SamError::UnexpectedReply {
                key: key.to_string(),
                reply,
            }),
            Ok(None) | Err(_) => Err(SamError::NoReply {
                key: key.to_string(),
            }),
        }
    }

    /// Take the next decrypted message from the TV, if one arrives in time.
    pub async fn next_message(&self, block: bool) -> Option<String> {
        let wait = if block {
            self.config.reply_timeout
        } else {
            self.config.poll_timeout
        };
        timeout(wait, async { self.inbox.lock().await.recv().await })
            .await
            .ok()
            .flatten()
    }

    /// Run a pairing step selected by `pin`.
    ///
    /// A negative PIN dismisses the popup and zero requests it, unless the
    /// session already holds usable credentials and `force` is false. A
    /// positive PIN completes the exchange and stores the result.
    pub async fn pair(&self, pin: i32, force: bool) -> SamResult<PairingStatus> {
        if pin == 0 && !force && self.has_valid_credentials() {
            info!("already paired");
            return Ok(PairingStatus::AlreadyPaired);
        }

        let device_id = self.credentials().device_id;
        let status = self.pairing.pair(&device_id, pin).await?;
        if let PairingStatus::Paired(outcome) = &status {
            self.restore_session_data(
                Some(&outcome.session_key),
                outcome.session_id,
                &outcome.device_id,
            )?;
        }
        Ok(status)
    }

    pub async fn device_description(&self) -> SamResult<DeviceDescription> {
        fetch_description(&*self.http, &self.address).await
    }

    /// Close the channel, if any. The session can be initialized again.
    pub async fn close(&self) {
        self.shut_down(None).await;
    }

    /// Tear down the channel of `generation` (or whatever is open, for `None`).
    ///
    /// Taking a link down retires its generation, so a connect still in
    /// flight for it cannot install a channel afterwards.
    async fn shut_down(&self, generation: Option<u64>) {
        let handle = {
            let mut link = self.link.lock().await;
            if generation.is_some_and(|g| g != link.generation) {
                return;
            }
            if link.state != ConnectionState::Disconnected {
                link.apply(LinkEvent::Lost);
                link.generation += 1;
            }
            link.channel.take()
        };

        if let Some(handle) = handle {
            close_writer(&handle.writer, self.config.write_timeout).await;
            handle.task.abort();
            info!("session closed");
        }
    }
}

/// Background reader for one channel.
struct FrameLoop {
    link: Arc<Mutex<Link>>,
    credentials: SharedCredentials,
    inbox: mpsc::Sender<String>,
    writer: SharedWriter,
    generation: u64,
    read_timeout: Duration,
    write_timeout: Duration,
    acked: Option<oneshot::Sender<()>>,
}

impl FrameLoop {
    async fn run(mut self, mut reader: Box<dyn FrameReader>) {
        let mut deadline = Instant::now() + self.read_timeout;
        loop {
            let text = match timeout_at(deadline, reader.read_frame()).await {
                Ok(Ok(Some(text))) => text,
                Ok(Ok(None)) => {
                    info!("channel closed by the TV");
                    break;
                }
                Ok(Err(e)) => {
                    info!("channel read failed: {}", e);
                    break;
                }
                Err(_) => {
                    warn!("no frame from the TV within {:?}", self.read_timeout);
                    break;
                }
            };
            trace!("frame: `{}`", text);

            match Frame::parse(&text) {
                Ok(Frame::Greeting) => {
                    if let Err(e) = write_with_timeout(&self.writer, HANDSHAKE, self.write_timeout).await {
                        warn!("could not answer greeting: {}", e);
                        break;
                    }
                    self.transition(LinkEvent::GreetingAnswered).await;
                }
                Ok(Frame::HandshakeAck) => {
                    if self.transition(LinkEvent::HandshakeAcked).await {
                        if let Some(acked) = self.acked.take() {
                            let _ = acked.send(());
                        }
                    }
                }
                Ok(Frame::Keepalive) => {
                    deadline = Instant::now() + self.read_timeout;
                    if let Err(e) = write_with_timeout(&self.writer, KEEPALIVE, self.write_timeout).await {
                        warn!("keepalive echo failed: {}", e);
                    }
                }
                Ok(Frame::Envelope(envelope)) => self.deliver(envelope),
                Ok(Frame::Unknown(text)) => debug!("unhandled frame: `{}`", text),
                Err(e) => warn!("dropping malformed frame: {}", e),
            }
        }
        self.collapse().await;
    }

    async fn transition(&self, event: LinkEvent) -> bool {
        let mut link = self.link.lock().await;
        if link.generation != self.generation {
            return false;
        }
        link.apply(event)
    }

    fn deliver(&self, envelope: InboundEnvelope) {
        if envelope.name != COMMON_REPLY {
            debug!(name = %envelope.name, "envelope with unexpected name");
        }

        let Some(session_key) = lock_credentials(&self.credentials).session_key else {
            warn!("dropping envelope: no session key");
            return;
        };
        let message = match envelope.open(&session_key) {
            Ok(message) => message,
            Err(e) => {
                warn!("dropping envelope: {}", e);
                return;
            }
        };
        debug!("received message: `{}`", message);

        match self.inbox.try_send(message) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(message)) => {
                warn!("inbox full, dropping message: `{}`", message);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => debug!("inbox closed"),
        }
    }

    /// Mark the link lost if it still belongs to this channel, then close the writer.
    async fn collapse(&self) {
        let stale = {
            let mut link = self.link.lock().await;
            if link.generation == self.generation {
                link.apply(LinkEvent::Lost);
                link.channel.take()
            } else {
                None
            }
        };
        // Dropping the handle detaches this task rather than aborting it.
        drop(stale);
        close_writer(&self.writer, self.write_timeout).await;
    }
}
