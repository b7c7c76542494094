use std::fmt;

use reqwest::Method;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::corpus::Corpus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
}

impl Verb {
    pub fn as_method(self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// `{"texts": [...], "max_features": n}`
    Vectorize,
    /// `{"text": "..."}`
    SingleText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    MatrixShape,
    Items {
        key: &'static str,
        noun: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub label: &'static str,
    /// Relative to the base URL, no leading slash.
    pub path: &'static str,
    pub verb: Verb,
    pub payload: PayloadKind,
    pub summary: SummaryKind,
}

pub const TF_IDF: Endpoint = Endpoint {
    label: "TF-IDF",
    path: "tf-idf",
    verb: Verb::Post,
    payload: PayloadKind::Vectorize,
    summary: SummaryKind::MatrixShape,
};

pub const BAG_OF_WORDS: Endpoint = Endpoint {
    label: "Bag of Words",
    path: "bag-of-words",
    verb: Verb::Post,
    payload: PayloadKind::Vectorize,
    summary: SummaryKind::MatrixShape,
};

pub const TOKENIZE: Endpoint = Endpoint {
    label: "Tokenization",
    path: "text_nltk/tokenize",
    verb: Verb::Post,
    payload: PayloadKind::SingleText,
    summary: SummaryKind::Items {
        key: "tokens",
        noun: "tokens",
    },
};

pub const POS_TAG: Endpoint = Endpoint {
    label: "POS tagging",
    path: "text_nltk/pos_tag",
    verb: Verb::Post,
    payload: PayloadKind::SingleText,
    summary: SummaryKind::Items {
        key: "pos_tags",
        noun: "tags",
    },
};

/// Endpoints exercised once the root check passes, in call order.
pub const SWEEP: [Endpoint; 4] = [TF_IDF, BAG_OF_WORDS, TOKENIZE, POS_TAG];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload<'a> {
    Vectorize {
        texts: &'a [String],
        max_features: u32,
    },
    SingleText {
        text: &'a str,
    },
}

impl Endpoint {
    pub fn payload<'a>(
        &self,
        corpus: &'a Corpus,
        sample_size: usize,
        max_features: u32,
    ) -> Payload<'a> {
        match self.payload {
            PayloadKind::Vectorize => Payload::Vectorize {
                texts: corpus.sample(sample_size),
                max_features,
            },
            PayloadKind::SingleText => Payload::SingleText {
                text: corpus.first(),
            },
        }
    }

    /// Pulls the reported fields out of a 200 response body.
    pub fn summarize(&self, body: Option<&Value>, preview_len: usize) -> Result<Summary, String> {
        let Some(body) = body else {
            return Err("response body is not JSON".into());
        };

        match self.summary {
            SummaryKind::MatrixShape => {
                let shape = body
                    .get("shape")
                    .ok_or_else(|| "missing `shape` field".to_string())?;
                let shape = MatrixShape::deserialize(shape)
                    .map_err(|e| format!("malformed `shape` field: {e}"))?;
                Ok(Summary::Shape(shape))
            }
            SummaryKind::Items { key, noun } => {
                let items = body
                    .get(key)
                    .and_then(Value::as_array)
                    .ok_or_else(|| format!("missing `{key}` list"))?;
                Ok(Summary::Items {
                    noun,
                    count: items.len(),
                    preview: items.iter().take(preview_len).cloned().collect(),
                })
            }
        }
    }
}

/// Row and column count of a document-term matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MatrixShape(pub u64, pub u64);

impl fmt::Display for MatrixShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Summary {
    Shape(MatrixShape),
    Items {
        noun: &'static str,
        count: usize,
        preview: Vec<Value>,
    },
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Summary::Shape(shape) => write!(f, "Success! Matrix shape: {shape}"),
            Summary::Items {
                noun,
                count,
                preview,
            } => {
                let preview: Vec<String> = preview.iter().map(Value::to_string).collect();
                write!(f, "{count} {noun}: [{}]...", preview.join(", "))
            }
        }
    }
}
