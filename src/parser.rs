use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ProbeFile {
    #[serde(default)]
    pub service: Service,
    #[serde(default)]
    pub corpus: CorpusSection,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Service {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub start_command: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct CorpusSection {
    pub path: Option<String>,
    pub sample_size: Option<usize>,
    pub max_features: Option<u32>,
    pub preview_len: Option<usize>,
}
