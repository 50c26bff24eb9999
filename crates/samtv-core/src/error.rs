use thiserror::Error;

/// Errors produced by the SmartView protocol layer.
#[derive(Debug, Error)]
pub enum SamError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out waiting for the SmartView handshake")]
    HandshakeTimeout,

    #[error("pairing required: enter the PIN shown on the TV")]
    PairingRequired,

    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),

    #[error("acknowledgement validation failed: {0}")]
    AckValidationFailed(String),

    #[error("invalid key length {0} (expected 16 bytes)")]
    InvalidKey(usize),

    #[error("invalid ciphertext length {0} (not a multiple of the block size)")]
    InvalidLength(usize),

    #[error("invalid padding")]
    InvalidPadding,

    #[error("no reply from TV for key {key}")]
    NoReply { key: String },

    #[error("unexpected TV reply for key {key}: {reply}")]
    UnexpectedReply { key: String, reply: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("{step}: {source}")]
    Step {
        step: String,
        #[source]
        source: Box<SamError>,
    },
}

impl SamError {
    /// Wrap this error with the name of the step that produced it.
    pub fn in_step(self, step: impl Into<String>) -> Self {
        SamError::Step {
            step: step.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through any `Step` wrappers.
    pub fn root(&self) -> &SamError {
        let mut err = self;
        while let SamError::Step { source, .. } = err {
            err = source;
        }
        err
    }

    /// Whether this error only asks the caller to complete pairing with a PIN.
    pub fn is_pairing_required(&self) -> bool {
        matches!(self.root(), SamError::PairingRequired)
    }
}

impl From<serde_json::Error> for SamError {
    fn from(e: serde_json::Error) -> Self {
        SamError::InvalidResponse(e.to_string())
    }
}

pub type SamResult<T> = Result<T, SamError>;

/// Attach step names to fallible results.
pub trait SamResultExt<T> {
    fn step(self, step: &str) -> SamResult<T>;
}

impl<T> SamResultExt<T> for SamResult<T> {
    fn step(self, step: &str) -> SamResult<T> {
        self.map_err(|e| e.in_step(step))
    }
}
