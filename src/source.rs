use crate::config::AppConfig;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Top-level response key holding evaluator logs rather than results.
pub const LOGS_KEY: &str = "evaluator_logs";
pub const RDA_ALL_PATH: &str = "/v1.0/rda/rda_all";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("reading sample file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid evaluation json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("evaluation api request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("evaluation api returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("invalid evaluation api url: {0}")]
    Url(#[from] url::ParseError),
    #[error("no evaluation data returned")]
    NoData,
}

/// Body sent to the evaluation API.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvaluationRequest {
    pub id: String,
    pub lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oai_base: Option<String>,
}

impl EvaluationRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            lang: "en".to_string(),
            plugin: None,
            repo: None,
            oai_base: None,
        }
    }
}

#[async_trait]
pub trait EvaluationSource: Send + Sync {
    /// Fetch the evaluation object for one identifier.
    async fn fetch(&self, req: &EvaluationRequest) -> Result<Value, SourceError>;
}

/// Calls the FAIR EVA API.
pub struct ApiEvaluationSource {
    endpoint: Url,
    client: reqwest::Client,
}

impl ApiEvaluationSource {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, SourceError> {
        let endpoint = Url::parse(api_base)?.join(RDA_ALL_PATH)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl EvaluationSource for ApiEvaluationSource {
    async fn fetch(&self, req: &EvaluationRequest) -> Result<Value, SourceError> {
        debug!(endpoint = %self.endpoint, id = %req.id, "requesting evaluation");
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(req)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            warn!(%status, id = %req.id, "evaluation api rejected request");
            return Err(SourceError::Status(status));
        }
        let body: Value = resp.json().await?;
        select_evaluation(body)
    }
}

/// Reads a stored API response from disk instead of calling the API.
pub struct SampleFileSource {
    path: PathBuf,
}

impl SampleFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl EvaluationSource for SampleFileSource {
    async fn fetch(&self, req: &EvaluationRequest) -> Result<Value, SourceError> {
        debug!(path = ?self.path, id = %req.id, "loading sample evaluation");
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;
        let body: Value = serde_json::from_str(&raw)?;
        select_evaluation(body)
    }
}

/// The evaluation is the first top-level value that is not the logs entry.
/// Missing or empty values count as no data.
pub fn select_evaluation(body: Value) -> Result<Value, SourceError> {
    let Value::Object(map) = body else {
        return Err(SourceError::NoData);
    };
    let evaluation = map
        .into_iter()
        .find(|(key, _)| key != LOGS_KEY)
        .map(|(_, value)| value)
        .ok_or(SourceError::NoData)?;
    if is_empty(&evaluation) {
        return Err(SourceError::NoData);
    }
    Ok(evaluation)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Sample file in dev mode, the API otherwise.
pub fn source_from_config(config: &AppConfig) -> Result<Arc<dyn EvaluationSource>, SourceError> {
    if config.dev_mode {
        info!(path = ?config.sample_file, "dev mode: serving evaluations from sample file");
        return Ok(Arc::new(SampleFileSource::new(config.sample_file.clone())));
    }
    let source = ApiEvaluationSource::new(&config.api_base(), config.api_timeout)?;
    info!(endpoint = %source.endpoint(), "using FAIR EVA API");
    Ok(Arc::new(source))
}
