//! Remote model backend: POSTs the utterance to an inference endpoint.
//!
//! Accepts either a single prediction object or a pipeline-style list of
//! predictions (the first entry wins). `LABEL_<n>` outputs are translated
//! through the configured id-to-label table.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::traits::{Classification, ClassifierError, IntentClassifier};

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
    context: &'a [String],
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(alias = "intent")]
    label: String,
    #[serde(alias = "confidence")]
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassifyResponse {
    Single(Prediction),
    Batch(Vec<Prediction>),
}

pub struct HttpClassifier {
    endpoint: String,
    client: reqwest::Client,
    id2label: HashMap<String, String>,
}

impl HttpClassifier {
    pub fn new(
        endpoint: &str,
        timeout: Duration,
        id2label: HashMap<String, String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
            id2label,
        })
    }

    fn resolve_label(&self, raw: String) -> String {
        raw.strip_prefix("LABEL_")
            .and_then(|id| self.id2label.get(id))
            .cloned()
            .unwrap_or(raw)
    }
}

#[async_trait]
impl IntentClassifier for HttpClassifier {
    async fn classify(&self, text: &str, context: &[String]) -> Result<Classification> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ClassifyRequest { text, context })
            .send()
            .await
            .map_err(ClassifierError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifierError::Status(status.as_u16()).into());
        }

        let prediction = match response
            .json::<ClassifyResponse>()
            .await
            .map_err(ClassifierError::from)?
        {
            ClassifyResponse::Single(p) => p,
            ClassifyResponse::Batch(batch) => {
                batch.into_iter().next().ok_or(ClassifierError::Empty)?
            }
        };

        Ok(Classification::new(
            self.resolve_label(prediction.label),
            prediction.score,
        ))
    }

    fn name(&self) -> &str {
        "http"
    }
}
