use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::{AskRequest, AskResponse};

pub const DEFAULT_ENDPOINT: &str = "https://nadak-s-ai-chatbot.onrender.com/ask";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport-level failure talking to the answering endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// No complete response arrived within the configured timeout.
    Timeout(Duration),

    /// The endpoint could not be reached at all.
    Connect(String),

    /// The endpoint answered with a non-success status code.
    Status(u16),

    /// Any other failure while sending or reading the exchange.
    Transport(String),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::Timeout(after) => {
                write!(f, "timeout of {}ms exceeded", after.as_millis())
            }
            NetworkError::Connect(detail) => write!(f, "Network Error: {detail}"),
            NetworkError::Status(code) => write!(f, "Request failed with status code {code}"),
            NetworkError::Transport(detail) => f.write_str(detail),
        }
    }
}

impl StdError for NetworkError {}

/// Anything that can turn a question into an answer.
#[async_trait]
pub trait AnswerSource: Send + Sync {
    async fn ask(&self, question: &str) -> Result<String, NetworkError>;
}

/// POSTs `{"question": ...}` to a fixed endpoint.
#[derive(Clone)]
pub struct HttpDispatcher {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpDispatcher {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, timeout)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify(&self, err: reqwest::Error) -> NetworkError {
        if err.is_timeout() {
            NetworkError::Timeout(self.timeout)
        } else if err.is_connect() {
            NetworkError::Connect(root_cause(&err))
        } else if let Some(status) = err.status() {
            NetworkError::Status(status.as_u16())
        } else {
            NetworkError::Transport(root_cause(&err))
        }
    }
}

#[async_trait]
impl AnswerSource for HttpDispatcher {
    async fn ask(&self, question: &str) -> Result<String, NetworkError> {
        let request = AskRequest::new(question);
        debug!(endpoint = %self.endpoint, chars = request.question.len(), "Dispatching question");

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|err| self.classify(err))?;

        let status = response.status();
        if !status.is_success() {
            info!(status = status.as_u16(), "Answering endpoint rejected the request");
            return Err(NetworkError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(|err| self.classify(err))?;
        Ok(AskResponse::from_body(&body).into_answer())
    }
}

fn root_cause(err: &(dyn StdError + 'static)) -> String {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    let detail = current.to_string();
    if detail.is_empty() {
        err.to_string()
    } else {
        detail
    }
}

pub type DispatchResult = Result<String, NetworkError>;

/// Runs dispatches on background tasks and reports `(result, cycle)` pairs.
#[derive(Clone)]
pub struct DispatchService {
    source: Arc<dyn AnswerSource>,
    tx: mpsc::UnboundedSender<(DispatchResult, u64)>,
}

impl DispatchService {
    pub fn new(
        source: Arc<dyn AnswerSource>,
    ) -> (Self, mpsc::UnboundedReceiver<(DispatchResult, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { source, tx }, rx)
    }

    pub fn spawn(&self, question: String, cycle: u64, cancel_token: CancellationToken) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = source.ask(&question) => {
                    let _ = tx.send((result, cycle));
                }
                _ = cancel_token.cancelled() => {
                    debug!(cycle, "Dispatch cancelled");
                }
            }
        });
    }
}
