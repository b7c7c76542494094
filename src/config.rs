use std::path::PathBuf;
use std::time::Duration;

use miette::Diagnostic;
use miette::NamedSource;
use miette::SourceSpan;
use thiserror::Error;
use url::Url;

use crate::cli::Cli;
use crate::parser::ProbeFile;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TEXTS_PATH: &str = "data/texts.txt";
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_START_COMMAND: &str = "cd server && python main.py";
pub const DEFAULT_SAMPLE_SIZE: usize = 3;
pub const DEFAULT_MAX_FEATURES: u32 = 20;
pub const DEFAULT_PREVIEW_LEN: usize = 5;

/// Fully resolved settings for one probe run.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Always ends with `/` so endpoint paths can be joined onto it.
    pub base_url: Url,
    pub texts_path: PathBuf,
    pub timeout: Duration,
    /// Shown when the service refuses the connection.
    pub start_command: String,
    /// How many texts go into the vectorization payloads.
    pub sample_size: usize,
    pub max_features: u32,
    /// How many tokens/tags are echoed in a summary line.
    pub preview_len: usize,
}

impl ProbeConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url: normalize_base(base_url),
            texts_path: PathBuf::from(DEFAULT_TEXTS_PATH),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            start_command: DEFAULT_START_COMMAND.into(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            max_features: DEFAULT_MAX_FEATURES,
            preview_len: DEFAULT_PREVIEW_LEN,
        }
    }

    /// Port the service is expected to listen on.
    pub fn expected_port(&self) -> u16 {
        self.base_url.port_or_known_default().unwrap_or(8000)
    }
}

#[derive(Debug, Error, Diagnostic)]
#[error("Invalid field `{field}`: {message}")]
pub struct ConfigError {
    field: String,
    message: String,
    #[source_code]
    src: Option<NamedSource<String>>,
    #[label("invalid value here")]
    span: Option<SourceSpan>,
}

/// Merges CLI flags over the config file over built-in defaults.
pub struct ConfigResolver {
    file: ProbeFile,
    toml_src: String,
    file_name: String,
}

impl ConfigResolver {
    pub fn new(file: &ProbeFile, toml_src: &str, file_name: &str) -> Self {
        Self {
            file: file.clone(),
            toml_src: toml_src.into(),
            file_name: file_name.into(),
        }
    }

    pub fn without_file() -> Self {
        Self::new(&ProbeFile::default(), "", "<defaults>")
    }

    pub fn resolve(&self, cli: &Cli) -> Result<ProbeConfig, ConfigError> {
        let service = &self.file.service;
        let corpus = &self.file.corpus;

        let (raw_url, url_from_file) = match (&cli.base_url, &service.base_url) {
            (Some(url), _) => (url.as_str(), false),
            (None, Some(url)) => (url.as_str(), true),
            (None, None) => (DEFAULT_BASE_URL, false),
        };
        let base_url = parse_base_url(raw_url).map_err(|message| {
            self.error("base_url", message, url_from_file.then(|| quoted_span(raw_url)))
        })?;

        let timeout_secs = cli
            .timeout
            .or(service.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(self.error(
                "timeout_secs",
                "must be greater than zero",
                cli.timeout.is_none().then(|| key_span("timeout_secs")),
            ));
        }

        let sample_size = corpus.sample_size.unwrap_or(DEFAULT_SAMPLE_SIZE);
        if sample_size == 0 {
            return Err(self.error(
                "sample_size",
                "must be greater than zero",
                Some(key_span("sample_size")),
            ));
        }

        let max_features = cli
            .max_features
            .or(corpus.max_features)
            .unwrap_or(DEFAULT_MAX_FEATURES);
        if max_features == 0 {
            return Err(self.error(
                "max_features",
                "must be greater than zero",
                cli.max_features.is_none().then(|| key_span("max_features")),
            ));
        }

        let mut config = ProbeConfig::new(base_url);
        config.timeout = Duration::from_secs(timeout_secs);
        config.sample_size = sample_size;
        config.max_features = max_features;

        if let Some(path) = cli.texts.as_ref().or(corpus.path.as_ref()) {
            config.texts_path = PathBuf::from(path);
        }
        if let Some(command) = &service.start_command {
            config.start_command = command.clone();
        }
        if let Some(preview_len) = corpus.preview_len {
            config.preview_len = preview_len;
        }

        Ok(config)
    }

    fn error(&self, field: &str, message: impl Into<String>, span: Option<Needle>) -> ConfigError {
        let span = span.and_then(|needle| needle.find_in(&self.toml_src));

        ConfigError {
            field: field.into(),
            message: message.into(),
            src: span.map(|_| NamedSource::new(self.file_name.clone(), self.toml_src.clone())),
            span,
        }
    }
}

/// Accepts http(s) URLs with an optional path prefix.
pub fn parse_base_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!(
            "unsupported scheme `{}`, expected http or https",
            url.scheme()
        ));
    }
    if url.host_str().is_none() {
        return Err("missing host".into());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("must not contain a query or fragment".into());
    }

    Ok(normalize_base(url))
}

fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

enum Needle {
    Quoted(String),
    Key(&'static str),
}

impl Needle {
    fn find_in(&self, toml_src: &str) -> Option<SourceSpan> {
        match self {
            Needle::Quoted(value) => {
                let pattern = format!("\"{value}\"");
                toml_src
                    .find(&pattern)
                    .map(|start| SourceSpan::new((start + 1).into(), value.len()))
            }
            Needle::Key(key) => toml_src
                .split_inclusive('\n')
                .scan(0, |offset, raw| {
                    let start = *offset;
                    *offset += raw.len();
                    Some((start, raw.trim_end_matches(['\r', '\n'])))
                })
                .find_map(|(start, line)| {
                    let indent = line.len() - line.trim_start().len();
                    let rest = line.trim_start().strip_prefix(*key)?;
                    rest.trim_start()
                        .starts_with('=')
                        .then(|| SourceSpan::new((start + indent).into(), line.trim().len()))
                }),
        }
    }
}

fn quoted_span(value: &str) -> Needle {
    Needle::Quoted(value.into())
}

fn key_span(key: &'static str) -> Needle {
    Needle::Key(key)
}
