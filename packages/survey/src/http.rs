//! HTTP transport for the survey service.

use async_trait::async_trait;

use crate::{SurveyBounds, SurveyError, SurveyResponse, SurveyTransport};

/// Default survey endpoint of a locally running analysis service.
pub const DEFAULT_SURVEY_URL: &str = "http://localhost:5001/survey";

/// Posts survey requests as JSON.
#[derive(Debug, Clone)]
pub struct HttpSurveyTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpSurveyTransport {
    /// Creates a transport posting to `url`.
    #[must_use]
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// The endpoint requests are posted to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SurveyTransport for HttpSurveyTransport {
    async fn start(&self, bounds: &SurveyBounds) -> Result<SurveyResponse, SurveyError> {
        let resp = self.client.post(&self.url).json(bounds).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SurveyError::Status {
                status: status.as_u16(),
            });
        }

        // A body that is not the expected JSON counts as "not ok".
        let text = resp.text().await?;
        Ok(serde_json::from_str(&text).unwrap_or_else(|e| {
            log::debug!("Unparseable survey response ({e}): {text}");
            SurveyResponse::default()
        }))
    }
}
