//! [`WizardBackend`] over the onboarding HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use bistro_core::backend::WizardBackend;
use bistro_core::error::CoreError;
use bistro_core::navigation::WizardPosition;
use bistro_core::record::{OnboardingRecord, PatchOutcome};
use bistro_core::slices::SliceName;
use bistro_core::types::{JsonMap, RecordId};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ClientConfig;
use crate::error::{ApiErrorBody, ClientError};

/// Timeout for a single request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct PatchEnvelope {
    data: OnboardingRecord,
    applied: bool,
}

#[derive(Debug, Deserialize)]
struct AdvanceData {
    position: WizardPosition,
}

#[derive(Debug, Deserialize)]
struct SubmitData {
    record: OnboardingRecord,
}

/// HTTP client for one onboarding API server.
#[derive(Clone)]
pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for RestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RestBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, config))
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(client: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/onboarding{path}", self.base_url)
    }

    /// `POST /onboarding`: start a fresh draft.
    pub async fn create(&self) -> Result<OnboardingRecord, ClientError> {
        let response = self
            .client
            .post(self.url(""))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let envelope: DataEnvelope<OnboardingRecord> = Self::parse_response(response).await?;
        tracing::debug!(record_id = %envelope.data.id, "Onboarding record created");
        Ok(envelope.data)
    }

    /// `GET /onboarding/{id}`.
    pub async fn fetch(&self, id: RecordId) -> Result<OnboardingRecord, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/{id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let envelope: DataEnvelope<OnboardingRecord> = Self::parse_response(response).await?;
        Ok(envelope.data)
    }

    /// `PATCH /onboarding/{id}?seq=`: merge `fields` into one slice.
    pub async fn patch_slice(
        &self,
        id: RecordId,
        slice: SliceName,
        fields: JsonMap,
        seq: i64,
    ) -> Result<PatchOutcome, ClientError> {
        let mut body = JsonMap::new();
        body.insert(slice.key().to_string(), serde_json::Value::Object(fields));

        let response = self
            .client
            .patch(self.url(&format!("/{id}")))
            .query(&[("seq", seq)])
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let envelope: PatchEnvelope = Self::parse_response(response).await?;
        if !envelope.applied {
            tracing::debug!(record_id = %id, slice = %slice, seq, "Server kept a newer write");
        }
        Ok(PatchOutcome {
            applied: envelope.applied,
            record: envelope.data,
        })
    }

    /// `POST /onboarding/{id}/advance`.
    pub async fn advance(
        &self,
        id: RecordId,
        from: WizardPosition,
    ) -> Result<WizardPosition, ClientError> {
        let response = self
            .client
            .post(self.url(&format!("/{id}/advance")))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "from": from }))
            .send()
            .await?;
        let envelope: DataEnvelope<AdvanceData> = Self::parse_response(response).await?;
        Ok(envelope.data.position)
    }

    /// `POST /onboarding/{id}/submit`.
    pub async fn submit_record(&self, id: RecordId) -> Result<OnboardingRecord, ClientError> {
        let response = self
            .client
            .post(self.url(&format!("/{id}/submit")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let envelope: DataEnvelope<SubmitData> = Self::parse_response(response).await?;
        Ok(envelope.data.record)
    }

    // ---- private helpers ----

    /// Deserialize a 2xx body, or turn the server's error envelope into
    /// [`ClientError::Api`].
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_else(|_| ApiErrorBody {
                error: text,
                ..ApiErrorBody::default()
            });
            return Err(ClientError::Api {
                status: status.as_u16(),
                code: body.code.clone(),
                message: body.error.clone(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl WizardBackend for RestBackend {
    async fn load(&self, id: RecordId) -> Result<OnboardingRecord, CoreError> {
        self.fetch(id).await.map_err(|e| e.into_core(id))
    }

    async fn save_slice(
        &self,
        id: RecordId,
        slice: SliceName,
        fields: JsonMap,
        seq: i64,
    ) -> Result<PatchOutcome, CoreError> {
        self.patch_slice(id, slice, fields, seq)
            .await
            .map_err(|e| e.into_core(id))
    }

    async fn record_advance(
        &self,
        id: RecordId,
        from: WizardPosition,
    ) -> Result<WizardPosition, CoreError> {
        self.advance(id, from).await.map_err(|e| e.into_core(id))
    }

    async fn submit(&self, id: RecordId) -> Result<OnboardingRecord, CoreError> {
        self.submit_record(id).await.map_err(|e| e.into_core(id))
    }
}
