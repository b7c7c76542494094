use std::time::Duration;

use flume::Sender;
use reqwest::StatusCode;
use url::Url;

use crate::client::NlpClient;
use crate::client::TransportError;
use crate::config::ProbeConfig;
use crate::corpus::Corpus;
use crate::corpus::CorpusSource;
use crate::corpus::load_texts;
use crate::endpoints::Endpoint;
use crate::endpoints::SWEEP;
use crate::endpoints::Summary;

/// Outcome of the root liveness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connectivity {
    Healthy { message: Option<String> },
    Unhealthy { status: StatusCode },
    Refused { port: u16, start_command: String },
    TimedOut(Duration),
    Unknown(String),
}

impl Connectivity {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Connectivity::Healthy { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Passed(Summary),
    HttpError { status: StatusCode, body: String },
    Transport(TransportError),
    /// 200 response without the field the summary needs.
    UnexpectedBody(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub endpoint: Endpoint,
    pub outcome: StepOutcome,
}

impl StepReport {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, StepOutcome::Passed(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepReport {
    pub corpus_loaded: bool,
    pub steps: Vec<StepReport>,
}

impl SweepReport {
    /// True when the sweep had texts to send. Individual step failures do
    /// not affect this.
    pub fn completed(&self) -> bool {
        self.corpus_loaded
    }

    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| !s.passed()).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub connectivity: Connectivity,
    pub sweep: Option<SweepReport>,
}

/// Progress messages for the outputter, in the order they happen.
#[derive(Debug, Clone)]
pub enum ProbeEvent {
    Checking {
        url: Url,
    },
    Connectivity(Connectivity),
    SweepStarted {
        source: CorpusSource,
        count: usize,
    },
    Step {
        index: usize,
        total: usize,
        report: StepReport,
    },
    SweepFinished {
        base_url: Url,
    },
}

pub struct Runner {
    client: NlpClient,
    config: ProbeConfig,
    tx: Sender<ProbeEvent>,
}

impl Runner {
    pub fn new(client: NlpClient, config: ProbeConfig, tx: Sender<ProbeEvent>) -> Self {
        Self { client, config, tx }
    }

    /// One pass: root check, then the sweep if the root is healthy.
    ///
    /// Consumes the runner so the event channel closes when the run ends.
    pub async fn run(self) -> RunReport {
        self.emit(ProbeEvent::Checking {
            url: self.client.base_url().clone(),
        });

        let connectivity = self.check_connectivity().await;
        self.emit(ProbeEvent::Connectivity(connectivity.clone()));

        if !connectivity.is_healthy() {
            return RunReport {
                connectivity,
                sweep: None,
            };
        }

        let corpus = load_texts(&self.config.texts_path);
        let sweep = self.run_sweep(&corpus).await;

        RunReport {
            connectivity,
            sweep: Some(sweep),
        }
    }

    pub async fn check_connectivity(&self) -> Connectivity {
        match self.client.get_root().await {
            Ok(response) if response.status == StatusCode::OK => Connectivity::Healthy {
                message: response.message(),
            },
            Ok(response) => Connectivity::Unhealthy {
                status: response.status,
            },
            Err(TransportError::Connect(_)) => Connectivity::Refused {
                port: self.config.expected_port(),
                start_command: self.config.start_command.clone(),
            },
            Err(TransportError::Timeout(after)) => Connectivity::TimedOut(after),
            Err(other) => Connectivity::Unknown(other.to_string()),
        }
    }

    /// Calls every sweep endpoint in order. A failing endpoint never stops
    /// the ones after it.
    pub async fn run_sweep(&self, corpus: &Corpus) -> SweepReport {
        if corpus.is_empty() {
            return SweepReport {
                corpus_loaded: false,
                steps: Vec::new(),
            };
        }

        self.emit(ProbeEvent::SweepStarted {
            source: corpus.source().clone(),
            count: corpus.len(),
        });

        let mut steps = Vec::with_capacity(SWEEP.len());
        for (i, endpoint) in SWEEP.iter().enumerate() {
            let report = self.run_step(endpoint, corpus).await;
            self.emit(ProbeEvent::Step {
                index: i + 1,
                total: SWEEP.len(),
                report: report.clone(),
            });
            steps.push(report);
        }

        self.emit(ProbeEvent::SweepFinished {
            base_url: self.client.base_url().clone(),
        });

        let report = SweepReport {
            corpus_loaded: true,
            steps,
        };
        tracing::debug!(
            steps = report.steps.len(),
            failures = report.failures(),
            "sweep finished"
        );
        report
    }

    async fn run_step(&self, endpoint: &Endpoint, corpus: &Corpus) -> StepReport {
        let payload = endpoint.payload(corpus, self.config.sample_size, self.config.max_features);

        let outcome = match self.client.call(endpoint, &payload).await {
            Ok(response) if response.status == StatusCode::OK => {
                match endpoint.summarize(response.body_json.as_ref(), self.config.preview_len) {
                    Ok(summary) => StepOutcome::Passed(summary),
                    Err(message) => StepOutcome::UnexpectedBody(message),
                }
            }
            Ok(response) => StepOutcome::HttpError {
                status: response.status,
                body: response.body_text,
            },
            Err(error) => StepOutcome::Transport(error),
        };

        StepReport {
            endpoint: *endpoint,
            outcome,
        }
    }

    fn emit(&self, event: ProbeEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("output channel closed, event dropped");
        }
    }
}
