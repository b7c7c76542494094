use std::error::Error as _;
use std::time::Duration;

use reqwest::Client;
use reqwest::RequestBuilder;
use reqwest::Response;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::config::ProbeConfig;
use crate::endpoints::Endpoint;
use crate::endpoints::Verb;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Failure before any HTTP status was received.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    pub fn classify(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(timeout)
        } else if err.is_connect() {
            TransportError::Connect(error_chain(err))
        } else {
            TransportError::Other(error_chain(err))
        }
    }
}

/// reqwest's top-level message hides the cause, so walk the sources.
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[derive(Debug)]
pub struct CapturedResponse {
    pub status: StatusCode,
    pub body_text: String,
    pub body_json: Option<serde_json::Value>,
}

impl CapturedResponse {
    pub async fn from_response(resp: Response) -> Self {
        let status = resp.status();

        let body_text = match resp.text().await {
            Ok(t) => t,
            Err(err) => format!("Failed to read body: {}", err),
        };

        let body_json = serde_json::from_str::<serde_json::Value>(&body_text).ok();

        Self {
            status,
            body_text,
            body_json,
        }
    }

    /// The root endpoint's greeting, if the body carries one.
    pub fn message(&self) -> Option<String> {
        self.body_json
            .as_ref()?
            .get("message")?
            .as_str()
            .map(str::to_string)
    }
}

/// Client for the NLP service. Every request carries the configured timeout.
#[derive(Debug, Clone)]
pub struct NlpClient {
    base_url: Url,
    client: Client,
    timeout: Duration,
}

impl NlpClient {
    pub fn new(config: &ProbeConfig) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            base_url: config.base_url.clone(),
            client,
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get_root(&self) -> Result<CapturedResponse, TransportError> {
        let url = self.base_url.clone();
        tracing::debug!(%url, "GET root");

        let response = self
            .request(Verb::Get, url)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        Ok(CapturedResponse::from_response(response).await)
    }

    pub async fn call<P: Serialize>(
        &self,
        endpoint: &Endpoint,
        payload: &P,
    ) -> Result<CapturedResponse, TransportError> {
        let url = self.endpoint_url(endpoint)?;
        tracing::debug!(verb = ?endpoint.verb, %url, endpoint = endpoint.label, "sending request");

        let response = self
            .request(endpoint.verb, url)
            .json(payload)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let captured = CapturedResponse::from_response(response).await;
        tracing::debug!(
            endpoint = endpoint.label,
            status = captured.status.as_u16(),
            "response received"
        );

        Ok(captured)
    }

    /// Endpoint paths are relative, so they land under any base path prefix.
    fn endpoint_url(&self, endpoint: &Endpoint) -> Result<Url, TransportError> {
        self.base_url
            .join(endpoint.path)
            .map_err(|e| TransportError::Other(format!("bad path `{}`: {e}", endpoint.path)))
    }

    fn request(&self, verb: Verb, url: Url) -> RequestBuilder {
        self.client.request(verb.as_method(), url)
    }

    fn transport_error(&self, err: &reqwest::Error) -> TransportError {
        let error = TransportError::classify(err, self.timeout);
        tracing::warn!(%error, "request failed");
        error
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use url::Url;

    use crate::client::NlpClient;
    use crate::client::TransportError;
    use crate::config::ProbeConfig;
    use crate::endpoints::SWEEP;

    #[test]
    fn client_keeps_normalized_base() {
        let config = ProbeConfig::new(Url::parse("http://localhost:8000/api").unwrap());
        let client = NlpClient::new(&config).unwrap();

        assert_eq!(client.base_url().as_str(), "http://localhost:8000/api/");
    }

    #[test]
    fn sweep_paths_stay_under_base_prefix() {
        let config = ProbeConfig::new(Url::parse("http://gateway:8000/nlp").unwrap());
        let client = NlpClient::new(&config).unwrap();

        let urls: Vec<String> = SWEEP
            .iter()
            .map(|endpoint| client.endpoint_url(endpoint).unwrap().to_string())
            .collect();
        assert_eq!(
            urls,
            [
                "http://gateway:8000/nlp/tf-idf",
                "http://gateway:8000/nlp/bag-of-words",
                "http://gateway:8000/nlp/text_nltk/tokenize",
                "http://gateway:8000/nlp/text_nltk/pos_tag",
            ]
        );
    }

    #[tokio::test]
    async fn refused_connection_is_connect_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = ProbeConfig::new(Url::parse(&format!("http://{addr}")).unwrap());
        config.timeout = Duration::from_secs(2);
        let client = NlpClient::new(&config).unwrap();

        let err = client.get_root().await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "got {err:?}");
    }
}
