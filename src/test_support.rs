//! In-process stand-in for the NLP service, used by the runner and
//! outputter tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use tokio::time::sleep;
use url::Url;

use crate::config::ProbeConfig;

#[derive(Clone)]
pub struct MockBehavior {
    pub root_status: StatusCode,
    /// Path whose handler sleeps for `delay` before answering.
    pub slow_path: Option<&'static str>,
    pub delay: Duration,
    /// Path answered with a 500.
    pub failing_path: Option<&'static str>,
    /// Root answers with a body that has no `message` key.
    pub bare_root: bool,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            root_status: StatusCode::OK,
            slow_path: None,
            delay: Duration::ZERO,
            failing_path: None,
            bare_root: false,
        }
    }
}

#[derive(Clone)]
struct MockState {
    hits: Arc<Mutex<Vec<String>>>,
    behavior: MockBehavior,
}

pub struct MockService {
    pub base_url: Url,
    hits: Arc<Mutex<Vec<String>>>,
}

impl MockService {
    pub async fn spawn(behavior: MockBehavior) -> Self {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            hits: hits.clone(),
            behavior,
        };

        let app = Router::new()
            .route("/", get(root))
            .route("/tf-idf", post(vectorize))
            .route("/bag-of-words", post(vectorize))
            .route("/text_nltk/tokenize", post(tokenize))
            .route("/text_nltk/pos_tag", post(pos_tag))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}")).unwrap(),
            hits,
        }
    }

    pub fn config(&self) -> ProbeConfig {
        let mut config = ProbeConfig::new(self.base_url.clone());
        config.texts_path = "no/such/dir/texts.txt".into();
        config.timeout = Duration::from_secs(2);
        config
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

#[derive(Deserialize)]
struct VectorizeRequest {
    texts: Vec<String>,
    max_features: u32,
}

#[derive(Deserialize)]
struct TextRequest {
    text: String,
}

async fn record(state: &MockState, uri: &Uri) -> Option<StatusCode> {
    let path = uri.path().to_string();
    state.hits.lock().unwrap().push(path.clone());

    if state.behavior.slow_path == Some(path.as_str()) {
        sleep(state.behavior.delay).await;
    }
    (state.behavior.failing_path == Some(path.as_str())).then_some(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn root(State(state): State<MockState>, uri: Uri) -> (StatusCode, Json<Value>) {
    record(&state, &uri).await;
    let body = if state.behavior.bare_root {
        json!({ "status": "ok" })
    } else {
        json!({ "message": "NLP service is running" })
    };
    (state.behavior.root_status, Json(body))
}

async fn vectorize(
    State(state): State<MockState>,
    uri: Uri,
    Json(req): Json<VectorizeRequest>,
) -> (StatusCode, Json<Value>) {
    if let Some(status) = record(&state, &uri).await {
        return (status, Json(json!({ "detail": "vectorizer exploded" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "shape": [req.texts.len(), req.max_features],
            "feature_names": [],
        })),
    )
}

async fn tokenize(
    State(state): State<MockState>,
    uri: Uri,
    Json(req): Json<TextRequest>,
) -> (StatusCode, Json<Value>) {
    if let Some(status) = record(&state, &uri).await {
        return (status, Json(json!({ "detail": "tokenizer exploded" })));
    }
    let tokens: Vec<&str> = req.text.split_whitespace().collect();
    (StatusCode::OK, Json(json!({ "tokens": tokens })))
}

async fn pos_tag(
    State(state): State<MockState>,
    uri: Uri,
    Json(req): Json<TextRequest>,
) -> (StatusCode, Json<Value>) {
    if let Some(status) = record(&state, &uri).await {
        return (status, Json(json!({ "detail": "tagger exploded" })));
    }
    let tags: Vec<[&str; 2]> = req.text.split_whitespace().map(|t| [t, "NN"]).collect();
    (StatusCode::OK, Json(json!({ "pos_tags": tags })))
}
