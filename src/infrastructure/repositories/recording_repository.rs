use async_trait::async_trait;
use std::time::Duration;

/// Fetches a sender's original recording so it can serve as a cloning reference
#[async_trait]
pub trait RecordingRepository: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, String>;
}

pub struct HttpRecordingRepository {
    client: reqwest::Client,
}

impl HttpRecordingRepository {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RecordingRepository for HttpRecordingRepository {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Recording download failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("Recording download returned {}", status));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("Failed to read recording: {}", e))?;

        if bytes.is_empty() {
            return Err("Recording is empty".to_string());
        }

        Ok(bytes.to_vec())
    }
}
