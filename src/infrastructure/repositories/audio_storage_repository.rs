use async_trait::async_trait;
use std::path::PathBuf;

/// Durable storage for generated chunk audio.
#[async_trait]
pub trait AudioStorageRepository: Send + Sync {
    /// Persist `bytes` under `key`, overwriting any previous object, and
    /// return the public URL it can be fetched from
    async fn store(&self, key: &str, bytes: &[u8]) -> Result<String, String>;
}

/// Local disk storage served by the HTTP server under `/audio/chunks`
pub struct LocalAudioStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalAudioStorage {
    pub fn new(root: PathBuf, public_base_url: String) -> Self {
        Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl AudioStorageRepository for LocalAudioStorage {
    async fn store(&self, key: &str, bytes: &[u8]) -> Result<String, String> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(format!("Invalid audio key: {}", key));
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| format!("Failed to create audio directory: {}", e))?;

        // Write then rename so readers never see a partial file
        let final_path = self.root.join(key);
        let temp_path = self.root.join(format!(".{}.part", key));
        tokio::fs::write(&temp_path, bytes)
            .await
            .map_err(|e| format!("Failed to write audio file: {}", e))?;
        tokio::fs::rename(&temp_path, &final_path)
            .await
            .map_err(|e| format!("Failed to move audio file into place: {}", e))?;

        Ok(format!(
            "{}/audio/chunks/{}",
            self.public_base_url,
            urlencoding::encode(key)
        ))
    }
}
